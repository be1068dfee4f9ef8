//! A fingerprint is a unique identifier for a file's contents.
//!
//! A [`Fingerprint`] couples the file's byte length with an MD5 and a SHA-1
//! digest of its contents. Two files with identical bytes always produce
//! identical fingerprints, and the digest pair is treated as collision-free
//! for the operational domain: if two fingerprints compare equal, the files
//! they were computed from are considered the same content.
//!
//! Digests are stored in their binary form and rendered as lowercase hex.
//! Ordering over the binary form is identical to ordering over the hex
//! rendering, so fingerprints sort the same way no matter which
//! representation a consumer holds.
//!
//! Hashing is streamed in large fixed-size chunks so that arbitrarily large
//! files are processed in bounded memory; see [`Hasher`].

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

use std::{fmt::Display, io, str::FromStr};

use derive_getters::Getters;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
#[cfg(test)]
use typed_builder::TypedBuilder;

mod hasher;

pub use hasher::{ChunkUpdate, Hasher, Interrupted, CHUNK_SIZE};

/// Errors that may be encountered during fingerprinting.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A generic IO error occurred while reading the content to be hashed.
    /// This error may be retried, but if it fails multiple times it's generally not recoverable.
    #[error("i/o error: {0}")]
    IO(#[from] io::Error),

    /// The chunk observer requested that hashing stop before the stream was consumed.
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

/// Errors encountered when parsing a digest from its hex rendering.
#[derive(Error, Clone, PartialEq, Debug)]
#[non_exhaustive]
pub enum ParseError {
    /// The input was not valid hex of the expected length.
    #[error("invalid hex digest '{input}'")]
    Hex {
        /// The input originally provided to the parser.
        input: String,

        /// The error returned by the hex decoder.
        #[source]
        source: hex::FromHexError,
    },
}

macro_rules! digest_type {
    ($(#[$doc:meta])* $name:ident, $len:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
        pub struct $name([u8; $len]);

        impl $name {
            /// The digest length in bytes.
            pub const LEN: usize = $len;

            /// Reference the binary form of the digest.
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(content: [u8; $len]) -> Self {
                Self(content)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(input: &str) -> Result<Self, Self::Err> {
                let mut content = [0u8; $len];
                hex::decode_to_slice(input, &mut content).map_err(|source| {
                    ParseError::Hex {
                        input: input.to_owned(),
                        source,
                    }
                })?;
                Ok(Self(content))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let rendered = String::deserialize(deserializer)?;
                rendered.parse().map_err(de::Error::custom)
            }
        }
    };
}

digest_type!(
    /// An MD5 digest in its 16-byte binary form.
    ///
    /// Rendered as a 32-character lowercase hex string.
    Md5Digest,
    16
);

digest_type!(
    /// A SHA-1 digest in its 20-byte binary form.
    ///
    /// Rendered as a 40-character lowercase hex string.
    Sha1Digest,
    20
);

/// The content identity of a file: its byte length plus the MD5 and SHA-1
/// digests of its contents.
///
/// Equality and ordering are lexicographic over `(size, md5, sha1)`.
/// The digest pair is treated as jointly collision-free: equal fingerprints
/// mean equal content.
#[derive(
    Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Getters, Serialize, Deserialize,
)]
#[cfg_attr(test, derive(TypedBuilder))]
pub struct Fingerprint {
    /// The file length in bytes.
    size: u64,

    /// The MD5 digest of the file's contents.
    md5: Md5Digest,

    /// The SHA-1 digest of the file's contents.
    sha1: Sha1Digest,
}

impl Fingerprint {
    /// Create a fingerprint from a file size and its digest pair.
    pub fn new(size: u64, md5: Md5Digest, sha1: Sha1Digest) -> Self {
        Self { size, md5, sha1 }
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "md5({}); sha1({}); {} bytes", self.md5, self.sha1, self.size)
    }
}
