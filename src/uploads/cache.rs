//! Content-addressed upload cache
//!
//! Maps the SHA-256 of an attachment to the remote URL it was uploaded to.
//! The cache lives as long as the current vendor chat session and is cleared
//! wholesale when a new session starts; there is no other eviction.
//!
//! Concurrent uploads of the same bytes are collapsed with a per-digest
//! single-flight lock: the first caller uploads, later callers wait on the
//! lock and then find the entry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use sha2::{Digest, Sha256};
use tokio::sync::{Mutex as FlightLock, OwnedMutexGuard};
use tracing::{debug, info};

/// SHA-256 digest of attachment bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Digest of `bytes`
    pub fn of(bytes: &[u8]) -> Self {
        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(bytes));
        Self(out)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, for logs
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.short())
    }
}

/// Digest to remote URL store, shared by every request of the process
#[derive(Default)]
pub struct UploadCache {
    entries: RwLock<HashMap<ContentDigest, String>>,
    flights: Mutex<HashMap<ContentDigest, Arc<FlightLock<()>>>>,
}

impl UploadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remote URL previously stored for `digest`
    pub fn get(&self, digest: &ContentDigest) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(digest).cloned()
    }

    /// Store the remote URL for `digest`, replacing any previous one
    pub fn insert(&self, digest: ContentDigest, remote_url: String) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        debug!(digest = %digest.short(), url = %remote_url, "Cached upload");
        entries.insert(digest, remote_url);
    }

    /// Drop every entry; returns how many were removed
    pub fn clear(&self) -> usize {
        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            let removed = entries.len();
            entries.clear();
            removed
        };
        self.flights
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();

        info!(removed, "Cleared upload cache");
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Acquire the single-flight lock for `digest`.
    ///
    /// Hold the guard across the cache re-check and the upload so that at
    /// most one upload per digest is in flight.
    pub async fn lock_digest(&self, digest: &ContentDigest) -> OwnedMutexGuard<()> {
        let lock = {
            let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
            flights.entry(*digest).or_default().clone()
        };
        lock.lock_owned().await
    }
}
