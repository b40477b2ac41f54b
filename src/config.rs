use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::bencode::{DecodeOptions, DuplicateKeys, EncodeOptions, DEFAULT_MAX_DEPTH};

pub const DEFAULT_CONFIG_PATH: &str = "bencodec.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_depth: usize,
    pub strict_integers: bool,
    pub duplicate_keys: DuplicateKeys,
    pub pretty_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict_integers: false,
            duplicate_keys: DuplicateKeys::Reject,
            pretty_json: true,
        }
    }
}

impl Config {
    /// Loads `bencodec.toml` from the working directory, falling back to
    /// defaults when it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Path::new(DEFAULT_CONFIG_PATH);
        if config_path.exists() {
            Self::from_path(config_path)
        } else {
            debug!("no {} found, using defaults", DEFAULT_CONFIG_PATH);
            Ok(Self::default())
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        debug!("loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            max_depth: self.max_depth,
            strict_integers: self.strict_integers,
            duplicate_keys: self.duplicate_keys,
        }
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            max_depth: self.max_depth,
        }
    }
}
