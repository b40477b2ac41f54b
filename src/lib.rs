// lib.rs - Library interface for the bencode codec and its CLI

pub mod bencode;
pub mod config;
pub mod digest;
pub mod engine;

// Re-export commonly used types for easier testing
pub use bencode::*;
pub use config::Config;
pub use digest::{digest, digest_key};
