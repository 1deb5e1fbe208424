//! Content-derived short code generation.
//!
//! A code is a window of the SHA-256 hex digest of the destination URL, so
//! the same origin always proposes the same candidates in the same order.

use crate::error::AppError;
use sha2::{Digest, Sha256};
use std::future::Future;
use tracing::{debug, warn};

/// Default code length.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Default number of salted re-hash rounds tried after the plain digest.
pub const DEFAULT_REHASH_ROUNDS: u32 = 3;

/// Length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// Derives short codes from destination URLs and resolves collisions.
#[derive(Debug, Clone, Copy)]
pub struct ShortCodeGenerator {
    code_length: usize,
    rehash_rounds: u32,
}

impl Default for ShortCodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH, DEFAULT_REHASH_ROUNDS)
    }
}

impl ShortCodeGenerator {
    /// `code_length` is clamped to `1..=64`.
    pub fn new(code_length: usize, rehash_rounds: u32) -> Self {
        Self {
            code_length: code_length.clamp(1, DIGEST_HEX_LEN),
            rehash_rounds,
        }
    }

    pub fn code_length(&self) -> usize {
        self.code_length
    }

    /// Candidate codes in the order they are tried.
    ///
    /// Round 0 walks every `code_length` window of `hex(sha256(origin))`
    /// from index 0. Round `k >= 1` does the same over
    /// `hex(sha256(origin + "#" + k))`.
    pub fn candidates<'a>(&'a self, origin: &'a str) -> impl Iterator<Item = String> + 'a {
        (0..=self.rehash_rounds).flat_map(move |round| {
            let digest = if round == 0 {
                content_hash(origin)
            } else {
                content_hash(&format!("{origin}#{round}"))
            };
            windows(digest, self.code_length)
        })
    }

    /// Returns the first candidate for which `is_taken` reports false.
    ///
    /// Returns `Ok(None)` once every round is exhausted. Lookup failures
    /// propagate so a store outage is not mistaken for a free code.
    pub async fn generate<F, Fut>(
        &self,
        origin: &str,
        mut is_taken: F,
    ) -> Result<Option<String>, AppError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<bool, AppError>>,
    {
        let mut attempts = 0usize;
        for candidate in self.candidates(origin) {
            attempts += 1;
            if !is_taken(candidate.clone()).await? {
                debug!(short_code = %candidate, attempts, "Short code allocated");
                return Ok(Some(candidate));
            }
        }

        warn!(
            attempts,
            rounds = self.rehash_rounds,
            "Short code candidate space exhausted"
        );
        Ok(None)
    }
}

/// Lowercase hex SHA-256 digest of `input`.
pub fn content_hash(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

fn windows(digest: String, n: usize) -> impl Iterator<Item = String> {
    let last = digest.len().saturating_sub(n);
    (0..=last).map(move |i| digest[i..i + n].to_string())
}
