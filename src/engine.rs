// src/engine.rs
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{info, warn};

use crate::bencode::{decode_with, dict_to_json, encode_json_with, encode_with, BDict};
use crate::config::Config;
use crate::digest::{digest, digest_key};

#[derive(Debug, Parser)]
#[command(name = "bencodec", version, about = "Decode, encode and canonicalize bencoded documents")]
pub struct Cli {
    /// Config file (defaults to ./bencodec.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Maximum container nesting depth
    #[arg(long, global = true)]
    pub max_depth: Option<usize>,

    /// Reject leading zeros and `-0` in integers and lengths
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a bencoded file as JSON (`-` reads stdin)
    Decode { input: String },
    /// Encode a JSON object file as canonical bencode
    Encode {
        input: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Re-encode a bencoded file canonically
    Canonicalize {
        input: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Exit non-zero unless the file is already canonical
    Check { input: String },
    /// Print the SHA-1 of the canonical encoding
    Digest {
        input: String,
        /// Hash only the dictionary stored under this key
        #[arg(long)]
        key: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub canonical: bool,
    pub trailing_bytes: usize,
}

pub fn use_command(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Decode { input } => {
            let data = read_input(&input)?;
            let json = decode_to_json(&data, &config)?;
            println!("{}", json);
        }
        Command::Encode { input, output } => {
            let data = read_input(&input)?;
            let value: serde_json::Value =
                serde_json::from_slice(&data).with_context(|| format!("parsing JSON from {}", input))?;
            let encoded = encode_json_with(&value, &config.encode_options())
                .context("encoding JSON document")?;
            write_output(output, &encoded)?;
        }
        Command::Canonicalize { input, output } => {
            let data = read_input(&input)?;
            let encoded = canonicalize(&data, &config)?;
            write_output(output, &encoded)?;
        }
        Command::Check { input } => {
            let data = read_input(&input)?;
            let report = check(&data, &config)?;
            if report.trailing_bytes > 0 {
                warn!("{} trailing bytes after the document", report.trailing_bytes);
            }
            if !report.canonical {
                println!("{}: not canonical", input);
                return Ok(ExitCode::FAILURE);
            }
            println!("{}: canonical", input);
        }
        Command::Digest { input, key } => {
            let data = read_input(&input)?;
            let dict = decode_document(&data, &config)?;
            let hash = match key {
                Some(key) => digest_key(&dict, &key)?,
                None => digest(&dict)?,
            };
            println!("{}", hex::encode(hash));
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// File config first, then command-line overrides.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::load()?,
    };
    if let Some(depth) = cli.max_depth {
        config.max_depth = depth;
    }
    if cli.strict {
        config.strict_integers = true;
    }
    Ok(config)
}

pub fn decode_to_json(data: &[u8], config: &Config) -> anyhow::Result<String> {
    let dict = decode_document(data, config)?;
    let json = dict_to_json(&dict);
    let text = if config.pretty_json {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    Ok(text)
}

pub fn canonicalize(data: &[u8], config: &Config) -> anyhow::Result<Vec<u8>> {
    let dict = decode_document(data, config)?;
    let encoded = encode_with(&dict, &config.encode_options())?;
    Ok(encoded)
}

pub fn check(data: &[u8], config: &Config) -> anyhow::Result<CheckReport> {
    let mut rest = data;
    let dict = decode_with(&mut rest, &config.decode_options()).context("decoding document")?;
    let consumed = data.len() - rest.len();
    let encoded = encode_with(&dict, &config.encode_options())?;

    Ok(CheckReport {
        canonical: encoded == data[..consumed],
        trailing_bytes: rest.len(),
    })
}

fn decode_document(data: &[u8], config: &Config) -> anyhow::Result<BDict> {
    let mut rest = data;
    let dict = decode_with(&mut rest, &config.decode_options()).context("decoding document")?;
    if !rest.is_empty() {
        warn!("ignoring {} trailing bytes after the document", rest.len());
    }
    info!("decoded document with {} top-level keys", dict.len());
    Ok(dict)
}

fn read_input(input: &str) -> anyhow::Result<Vec<u8>> {
    if input == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .context("reading stdin")?;
        return Ok(buf);
    }
    fs::read(input).with_context(|| format!("reading {}", input))
}

fn write_output(output: Option<PathBuf>, data: &[u8]) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(&path, data).with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {} bytes to {}", data.len(), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
