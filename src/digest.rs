// digest.rs
use sha1::{Digest, Sha1};

use crate::bencode::{encode, lookup_dict, BDict, BencodeError};

/// SHA-1 over the canonical encoding of `dict`.
pub fn digest(dict: &BDict) -> Result<[u8; 20], BencodeError> {
    let encoded = encode(dict)?;

    let mut hasher = Sha1::new();
    hasher.update(&encoded);
    let result = hasher.finalize();

    let mut hash_bytes = [0u8; 20];
    hash_bytes.copy_from_slice(&result);
    Ok(hash_bytes)
}

/// Digest of the sub-dictionary stored under `key`, e.g. a torrent's `info`.
pub fn digest_key(dict: &BDict, key: &str) -> Result<[u8; 20], BencodeError> {
    digest(lookup_dict(dict, key)?)
}
