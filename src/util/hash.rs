//! Streaming file hashing and verification
//!
//! Manifests record archive checksums as bare hex strings; the algorithm is
//! inferred from the digest length. Files are read in fixed-size chunks so
//! memory use stays constant regardless of archive size.

use md5::Md5;
use sha2::Digest;
use std::io::Read;
use std::path::Path;

use crate::error::FileError;

/// Chunk size for reading files during hashing (64KB)
const CHUNK_SIZE: usize = 64 * 1024;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }

    /// Infer the algorithm from a hex digest.
    ///
    /// Returns `None` for non-hex input or an unrecognized length.
    pub fn detect(hex_digest: &str) -> Option<Self> {
        if !hex_digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex_digest.len() {
            32 => Some(Self::Md5),
            64 => Some(Self::Sha256),
            128 => Some(Self::Sha512),
            _ => None,
        }
    }
}

/// Compute the lowercase hex digest of a reader.
pub fn hash_reader(reader: &mut impl Read, algorithm: HashAlgorithm) -> std::io::Result<String> {
    match algorithm {
        HashAlgorithm::Md5 => digest_reader::<Md5>(reader),
        HashAlgorithm::Sha256 => digest_reader::<sha2::Sha256>(reader),
        HashAlgorithm::Sha512 => digest_reader::<sha2::Sha512>(reader),
    }
}

/// Compute the lowercase hex digest of a file.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> std::io::Result<String> {
    let mut f = std::fs::File::open(path)?;
    hash_reader(&mut f, algorithm)
}

fn digest_reader<D: Digest>(reader: &mut impl Read) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verify a file's hash against an expected hex digest (case-insensitive).
///
/// # Example
/// ```ignore
/// verify_file_hash(Path::new("mirror/release/bash/bash-4.tar.xz"), "5eb63bbbe01eeed093cb22bb8f5acdc3")?;
/// ```
pub fn verify_file_hash(file: &Path, expected: &str) -> Result<(), FileError> {
    let algorithm = HashAlgorithm::detect(expected)
        .ok_or_else(|| FileError::UnsupportedHash(expected.to_string()))?;

    let actual = hash_file(file, algorithm)?;
    let expected = expected.to_lowercase();

    if actual != expected {
        return Err(FileError::HashMismatch {
            algorithm: algorithm.name(),
            expected,
            actual,
        });
    }

    Ok(())
}
