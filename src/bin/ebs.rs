// src/bin/ebs.rs
//! ebs: command-line access to an encrypted bucket store

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use encrypted_bucket_store::{get_random_key, load_config, StoreHandle};
use rpassword::prompt_password;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zeroize::Zeroizing;

#[derive(Parser, Debug)]
#[command(name = "ebs", version, about = "Encrypted bucket store")]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Directory holding the store file (overrides config)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Store file name (overrides config)
    #[arg(long, global = true)]
    file: Option<String>,

    /// Bucket to create on open; repeatable
    #[arg(long = "bucket", global = true)]
    buckets: Vec<String>,

    /// Secret as hex, e.g. the output of `ebs keygen`
    #[arg(long, global = true, env = "EBS_SECRET_HEX", hide_env_values = true)]
    secret_hex: Option<String>,

    /// Prompt for a passphrase instead of passing a secret
    #[arg(long, global = true, conflicts_with = "secret_hex")]
    prompt: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh random 32-byte key as hex
    Keygen,
    /// Store a value
    Put {
        bucket: String,
        key: String,
        value: String,
        /// Parse VALUE as JSON and store its canonical encoding
        #[arg(long)]
        json: bool,
    },
    /// Print the value of the first key starting with KEY (or exactly KEY)
    Get {
        bucket: String,
        key: String,
        #[arg(long)]
        exact: bool,
    },
    /// List keys starting with PREFIX
    Keys {
        bucket: String,
        #[arg(default_value = "")]
        prefix: String,
    },
    /// Print records whose keys start with PREFIX
    Scan {
        bucket: String,
        #[arg(default_value = "")]
        prefix: String,
    },
    /// Delete a key
    Delete { bucket: String, key: String },
    /// Write a raw snapshot of the store file
    Export { output: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Keygen => keygen(),
        command => run(&open_store(&cli.store)?, command),
    }
}

fn keygen() -> Result<()> {
    let key = get_random_key().context("entropy source unavailable")?;
    println!("{}", hex::encode(key.as_slice()));
    Ok(())
}

fn open_store(args: &StoreArgs) -> Result<StoreHandle> {
    let mut config = load_config().clone();
    if let Some(dir) = &args.dir {
        config.path = Some(dir.clone());
    }
    if let Some(file) = &args.file {
        config.file_name = file.clone();
    }
    for bucket in &args.buckets {
        if !config.buckets.contains(bucket) {
            config.buckets.push(bucket.clone());
        }
    }

    let secret = read_secret(args)?;
    StoreHandle::from_config(&config, secret.as_ref().map(|s| s.as_slice()))
        .with_context(|| format!("failed to open store {}", config.file_name))
}

fn read_secret(args: &StoreArgs) -> Result<Option<Zeroizing<Vec<u8>>>> {
    if let Some(raw) = &args.secret_hex {
        let bytes = hex::decode(raw.trim()).context("secret is not valid hex")?;
        return Ok(Some(Zeroizing::new(bytes)));
    }
    if args.prompt {
        let passphrase = Zeroizing::new(prompt_password("Passphrase: ")?);
        if passphrase.is_empty() {
            bail!("empty passphrase");
        }
        return Ok(Some(Zeroizing::new(passphrase.as_bytes().to_vec())));
    }
    Ok(None)
}

fn run(store: &StoreHandle, command: Command) -> Result<()> {
    let mut out = std::io::stdout().lock();
    match command {
        Command::Keygen => keygen()?,
        Command::Put {
            bucket,
            key,
            value,
            json,
        } => {
            if json {
                let value: serde_json::Value =
                    serde_json::from_str(&value).context("VALUE is not valid JSON")?;
                store.save(&bucket, &key, &value)?;
            } else {
                store.save_bytes(&bucket, &key, value.as_bytes())?;
            }
            info!(bucket = %bucket, key = %key, "stored");
        }
        Command::Get { bucket, key, exact } => {
            let value = if exact {
                store
                    .get_exact(&bucket, &key)?
                    .with_context(|| format!("{key} not found in {bucket}"))?
            } else {
                store.get_one(&bucket, &key)?
            };
            out.write_all(&value)?;
            writeln!(out)?;
        }
        Command::Keys { bucket, prefix } => {
            for key in store.get_key_list(&bucket, &prefix)? {
                writeln!(out, "{key}")?;
            }
        }
        Command::Scan { bucket, prefix } => {
            for (key, value) in store.get_by_prefix(&bucket, &prefix)? {
                writeln!(out, "{key}\t{}", String::from_utf8_lossy(&value))?;
            }
        }
        Command::Delete { bucket, key } => {
            store.delete(&bucket, &key)?;
            info!(bucket = %bucket, key = %key, "deleted");
        }
        Command::Export { output } => {
            let mut file = std::fs::File::create(&output)
                .with_context(|| format!("cannot create {}", output.display()))?;
            let bytes = store.export_to(&mut file)?;
            file.sync_all()?;
            info!(bytes, path = %output.display(), "exported");
        }
    }
    Ok(())
}
