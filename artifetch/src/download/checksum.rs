//! Digest verification for downloaded files.
//!
//! A [`Hashes`] set lists, per algorithm, every digest a file is allowed to
//! have. A file passes if any of its digests is in the set.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::error::{FetchError, FetchResult};

/// Buffer size for reading files during hashing (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashAlgorithm {
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Lowercase name as used in `sha256:<hex>` specs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Length of a hex digest for this algorithm.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Sha224 => 56,
            Self::Sha256 => 64,
            Self::Sha384 => 96,
            Self::Sha512 => 128,
        }
    }

    /// Hex digest of a file.
    pub fn digest_file(&self, path: &Path) -> FetchResult<String> {
        match self {
            Self::Sha224 => digest_file::<Sha224>(path),
            Self::Sha256 => digest_file::<Sha256>(path),
            Self::Sha384 => digest_file::<Sha384>(path),
            Self::Sha512 => digest_file::<Sha512>(path),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            other => Err(FetchError::InvalidHash(format!("unsupported algorithm {:?}", other))),
        }
    }
}

/// Allowed digests, keyed by algorithm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hashes {
    allowed: BTreeMap<HashAlgorithm, Vec<String>>,
}

impl Hashes {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a list of `alg:hex` (or `alg=hex`) specs.
    pub fn parse<'a>(specs: impl IntoIterator<Item = &'a str>) -> FetchResult<Self> {
        let mut hashes = Self::new();
        for spec in specs {
            let (alg, hex) = spec
                .split_once(':')
                .or_else(|| spec.split_once('='))
                .ok_or_else(|| FetchError::InvalidHash(format!("expected ALG:HEX, got {:?}", spec)))?;
            hashes = hashes.with_digest(alg.parse()?, hex)?;
        }
        Ok(hashes)
    }

    /// Allow one more digest.
    pub fn with_digest(mut self, algorithm: HashAlgorithm, hex: &str) -> FetchResult<Self> {
        let hex = hex.trim().to_ascii_lowercase();
        if hex.len() != algorithm.hex_len() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(FetchError::InvalidHash(format!(
                "{} digest must be {} hex characters, got {:?}",
                algorithm,
                algorithm.hex_len(),
                hex
            )));
        }

        let digests = self.allowed.entry(algorithm).or_default();
        if !digests.contains(&hex) {
            digests.push(hex);
        }
        Ok(self)
    }

    /// Whether no digest is allowed at all (verification is skipped).
    pub fn is_empty(&self) -> bool {
        self.allowed.values().all(Vec::is_empty)
    }

    /// Whether `hex` is an allowed digest for `algorithm`.
    pub fn is_allowed(&self, algorithm: HashAlgorithm, hex: &str) -> bool {
        self.allowed
            .get(&algorithm)
            .is_some_and(|digests| digests.iter().any(|d| d.eq_ignore_ascii_case(hex)))
    }

    /// Check a file against the set.
    ///
    /// Every algorithm in the set is computed; one match is enough.
    pub fn check_against_path(&self, path: &Path) -> FetchResult<()> {
        let mut actual = Vec::new();
        for algorithm in self.allowed.keys() {
            let hex = algorithm.digest_file(path)?;
            if self.is_allowed(*algorithm, &hex) {
                return Ok(());
            }
            actual.push(format!("{}:{}", algorithm, hex));
        }

        if actual.is_empty() {
            return Ok(());
        }

        Err(FetchError::HashMismatch {
            path: path.to_path_buf(),
            expected: self.specs(),
            actual: actual.join(", "),
        })
    }

    /// All allowed digests as `alg:hex` strings.
    pub fn specs(&self) -> Vec<String> {
        self.allowed
            .iter()
            .flat_map(|(alg, digests)| digests.iter().map(move |d| format!("{}:{}", alg, d)))
            .collect()
    }
}

fn digest_file<D: Digest>(path: &Path) -> FetchResult<String> {
    let mut file = File::open(path).map_err(|e| FetchError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = D::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| FetchError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}
