//! CLI Checksums
//!
//! Inspect, seed and query the trusted versions registry.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use cli_checksum_registry::{
    load, verify_file, BootstrapOutcome, PlatformChecksums, PlatformKey, RegistryStore, Settings,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cli-checksums")]
#[command(about = "Manage trusted CLI checksums")]
struct Cli {
    /// Registry file to use instead of OP_SECRETS_ACTION_VERSIONS_FILE / the default path
    #[arg(short, long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved registry path
    Path,

    /// Install the bundled registry at the default path if missing
    Init,

    /// Validate a registry document
    Validate {
        /// File to validate (defaults to the resolved registry)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// List registered versions
    List {
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the expected checksum for a version
    Lookup {
        version: String,
        /// Platform key (defaults to this host)
        #[arg(short, long)]
        platform: Option<PlatformKey>,
    },

    /// Verify a downloaded binary against the registry
    Verify {
        version: String,
        binary: PathBuf,
        /// Platform key (defaults to this host)
        #[arg(short, long)]
        platform: Option<PlatformKey>,
    },

    /// Write a copy of the registry with one more version to a new file
    Add {
        version: String,
        /// Destination; must not exist
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        linux_amd64: Option<String>,
        #[arg(long)]
        linux_arm64: Option<String>,
        #[arg(long)]
        darwin_amd64: Option<String>,
        #[arg(long)]
        darwin_arm64: Option<String>,
        #[arg(long)]
        windows_amd64: Option<String>,
    },

    /// Print this host's platform key
    Platform,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn store_for(registry: Option<PathBuf>) -> anyhow::Result<RegistryStore> {
    match registry {
        Some(path) => Ok(RegistryStore::with_override(path)),
        None => Ok(RegistryStore::from_settings(&Settings::load()?)?),
    }
}

fn platform_or_host(platform: Option<PlatformKey>) -> anyhow::Result<PlatformKey> {
    match platform {
        Some(platform) => Ok(platform),
        None => Ok(PlatformKey::current()?),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let store = store_for(cli.registry)?;

    match cli.command {
        Commands::Path => {
            println!("{}", store.resolve_path().display());
            Ok(())
        }

        Commands::Init => {
            match store.bootstrap_if_missing()? {
                BootstrapOutcome::Installed => {
                    println!("✅ Installed bundled registry at {}", store.resolve_path().display())
                }
                BootstrapOutcome::AlreadyPresent => {
                    println!("Registry already present at {}", store.resolve_path().display())
                }
                BootstrapOutcome::SkippedOverride => println!(
                    "Override in effect ({}); nothing to install",
                    store.resolve_path().display()
                ),
            }
            Ok(())
        }

        Commands::Validate { file } => {
            let path = file.unwrap_or_else(|| store.resolve_path().to_path_buf());
            match load(&path) {
                Ok(registry) => {
                    println!("✅ {} - {} version(s) valid", path.display(), registry.versions().len());
                    Ok(())
                }
                Err(err) => {
                    if let Some(validation) = err.validation() {
                        println!("❌ {} - {} problem(s)", path.display(), validation.len());
                        for violation in validation.violations() {
                            println!("   └─ {}", violation);
                        }
                        std::process::exit(1);
                    }
                    Err(err.into())
                }
            }
        }

        Commands::List { json } => {
            let registry = store.load_or_bootstrap()?;
            if json {
                let listing: serde_json::Map<String, serde_json::Value> = registry
                    .versions()
                    .into_iter()
                    .filter_map(|v| registry.get(v).map(|c| (v, c)))
                    .map(|(v, checksums)| {
                        let platforms: Vec<&str> =
                            checksums.populated().map(|(p, _)| p.as_str()).collect();
                        (v.to_string(), serde_json::json!(platforms))
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                for version in registry.versions() {
                    let platforms: Vec<&str> = registry
                        .get(version)
                        .map(|c| c.populated().map(|(p, _)| p.as_str()).collect())
                        .unwrap_or_default();
                    println!("{}  [{}]", version, platforms.join(", "));
                }
            }
            Ok(())
        }

        Commands::Lookup { version, platform } => {
            let platform = platform_or_host(platform)?;
            let digest = cli_checksum_registry::expected_digest(&store, &version, platform)?;
            println!("{}", digest);
            Ok(())
        }

        Commands::Verify { version, binary, platform } => {
            let platform = platform_or_host(platform)?;
            let expected = cli_checksum_registry::expected_digest(&store, &version, platform)?;
            let actual = verify_file(&binary, &expected)?;
            println!("✅ {} matches {} ({})", binary.display(), version, actual);
            Ok(())
        }

        Commands::Add {
            version,
            output,
            linux_amd64,
            linux_arm64,
            darwin_amd64,
            darwin_arm64,
            windows_amd64,
        } => {
            let mut registry = store.load_or_bootstrap()?;
            let checksums = PlatformChecksums {
                linux_amd64,
                linux_arm64,
                darwin_amd64,
                darwin_arm64,
                windows_amd64,
            };
            if let Err(validation) = registry.extend(&version, checksums) {
                for violation in validation.violations() {
                    eprintln!("   └─ {}", violation);
                }
                bail!("refusing to add {}: {}", version, validation);
            }
            registry.stamp_generated_at();

            let yaml = registry.to_yaml()?;
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&output)
                .with_context(|| format!("cannot create {}", output.display()))?;
            file.write_all(yaml.as_bytes())?;
            println!("✅ Wrote {} version(s) to {}", registry.versions().len(), output.display());
            Ok(())
        }

        Commands::Platform => {
            println!("{}", PlatformKey::current()?);
            Ok(())
        }
    }
}
