//! Anonymous device identity.
//!
//! The device token is the primary key of every vote. The fingerprint is a
//! secondary signal sent along with it and may be missing.

use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::{KeyValueStore, TextRecord, DEVICE_ID_KEY};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn generate() -> Self {
        DeviceId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct DeviceIdentity<'a, S: ?Sized> {
    token: TextRecord<'a, S>,
}

impl<'a, S: KeyValueStore + ?Sized> DeviceIdentity<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            token: TextRecord::new(store, DEVICE_ID_KEY),
        }
    }

    /// Returns the persisted token, creating it on first use.
    ///
    /// When the store can't be used a fresh token comes back on every call.
    pub fn get_or_create_device_id(&self) -> DeviceId {
        match self.token.get() {
            Ok(Some(token)) => return DeviceId(token),
            Ok(None) => {}
            Err(err) => tracing::warn!(%err, "can't read device token"),
        }

        let id = DeviceId::generate();
        if let Err(err) = self.token.set(id.as_str()) {
            tracing::warn!(%err, "can't persist device token");
        }

        id
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hashes named environment signals into a stable hex digest.
    ///
    /// Empty values are skipped; `None` if nothing is left to hash.
    pub fn from_signals<'s, I>(signals: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'s str, String)>,
    {
        let mut hasher = Sha256::new();
        let mut used = 0usize;

        for (name, value) in signals {
            if value.trim().is_empty() {
                continue;
            }
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
            used += 1;
        }

        if used == 0 {
            return None;
        }

        Some(Fingerprint(hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Environment probe is not available: {0}")]
    Unavailable(String),

    #[error("Environment exposed no usable signals")]
    NoSignals,
}

/// Source of environment signals for the secondary device signature.
#[async_trait(?Send)]
pub trait FingerprintProbe {
    async fn fingerprint(&self) -> Result<Fingerprint, FingerprintError>;
}

/// Runs the probe to completion. Failures are logged and yield `None`.
pub async fn compute_fingerprint<P: FingerprintProbe + ?Sized>(probe: &P) -> Option<Fingerprint> {
    match probe.fingerprint().await {
        Ok(fingerprint) => Some(fingerprint),
        Err(err) => {
            tracing::debug!(%err, "continuing without fingerprint");
            None
        }
    }
}
