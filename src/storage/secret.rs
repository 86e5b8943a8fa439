//! Time-boxed private keys kept in a meta row.
//!
//! The key is stored as base64 PKCS#8 DER text and the row's `modify_at` is
//! both its generation time and its version token. Callers poll
//! [`MetaStore::fetch_private_key`] with the last timestamp they saw and only
//! pay for parsing when the key actually changed.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P384_SHA384_ASN1_SIGNING, EcdsaKeyPair,
    EcdsaSigningAlgorithm, KeyPair,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MetaStoreError, Result};
use crate::storage::meta::{MetaRow, MetaStore};
use crate::storage::unix_now;

/// Curve of a rotating key, selected by key size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyAlgorithm {
    EcdsaP256,
    EcdsaP384,
}

impl KeyAlgorithm {
    /// 256 selects P-256, 384 selects P-384.
    pub fn from_bits(bits: usize) -> Result<Self> {
        match bits {
            256 => Ok(Self::EcdsaP256),
            384 => Ok(Self::EcdsaP384),
            other => Err(MetaStoreError::UnsupportedKeySize(other)),
        }
    }

    #[must_use]
    pub const fn bits(self) -> usize {
        match self {
            Self::EcdsaP256 => 256,
            Self::EcdsaP384 => 384,
        }
    }

    fn signing(self) -> &'static EcdsaSigningAlgorithm {
        match self {
            Self::EcdsaP256 => &ECDSA_P256_SHA256_ASN1_SIGNING,
            Self::EcdsaP384 => &ECDSA_P384_SHA384_ASN1_SIGNING,
        }
    }
}

/// A parsed private key.
pub struct RotatingKey {
    algorithm: KeyAlgorithm,
    pkcs8: Vec<u8>,
    key_pair: EcdsaKeyPair,
}

impl std::fmt::Debug for RotatingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl RotatingKey {
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self> {
        let rng = SystemRandom::new();
        let document = EcdsaKeyPair::generate_pkcs8(algorithm.signing(), &rng)
            .map_err(|err| MetaStoreError::KeyGeneration(err.to_string()))?;
        Self::from_pkcs8(algorithm, document.as_ref().to_vec())
    }

    /// Parse PKCS#8 DER bytes.
    pub fn from_pkcs8(algorithm: KeyAlgorithm, pkcs8: Vec<u8>) -> Result<Self> {
        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_pkcs8(algorithm.signing(), &pkcs8, &rng)
            .map_err(|err| MetaStoreError::KeyMaterial(format!("pkcs8: {err}")))?;
        Ok(Self {
            algorithm,
            pkcs8,
            key_pair,
        })
    }

    /// Parse the stored text form.
    pub fn decode(algorithm: KeyAlgorithm, text: &str) -> Result<Self> {
        let pkcs8 = STANDARD
            .decode(text.trim())
            .map_err(|err| MetaStoreError::KeyMaterial(format!("base64: {err}")))?;
        Self::from_pkcs8(algorithm, pkcs8)
    }

    /// Stored text form: standard base64 of the PKCS#8 DER.
    #[must_use]
    pub fn encode(&self) -> String {
        STANDARD.encode(&self.pkcs8)
    }

    #[must_use]
    pub const fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    #[must_use]
    pub fn pkcs8_der(&self) -> &[u8] {
        &self.pkcs8
    }

    /// Uncompressed public point.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        self.key_pair.public_key().as_ref()
    }

    /// ASN.1 DER encoded ECDSA signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let rng = SystemRandom::new();
        let signature = self
            .key_pair
            .sign(&rng, message)
            .map_err(|err| MetaStoreError::Signing(err.to_string()))?;
        Ok(signature.as_ref().to_vec())
    }
}

/// Outcome of [`MetaStore::fetch_private_key`].
#[derive(Debug)]
pub enum KeyFetch {
    /// The stored key is still the one the caller holds; nothing was parsed.
    Unchanged { modify_at: i64 },
    /// A key the caller does not hold yet.
    Loaded {
        key: RotatingKey,
        modify_at: i64,
        /// True when this call generated and persisted the key.
        generated: bool,
    },
}

impl KeyFetch {
    #[must_use]
    pub const fn modify_at(&self) -> i64 {
        match self {
            Self::Unchanged { modify_at } | Self::Loaded { modify_at, .. } => *modify_at,
        }
    }

    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    #[must_use]
    pub fn into_key(self) -> Option<RotatingKey> {
        match self {
            Self::Unchanged { .. } => None,
            Self::Loaded { key, .. } => Some(key),
        }
    }
}

impl MetaStore<'_> {
    /// Read the private key stored under `meta_key`, rotating it once it is
    /// `max_age` old.
    ///
    /// Pass the `modify_at` of the last result as `current_modify_at`; while
    /// the stored key is unchanged and not expired the result is
    /// [`KeyFetch::Unchanged`] and no parsing happens. A stored key that
    /// fails to parse is an error, not a reason to rotate.
    ///
    /// Rotation overwrites the row unconditionally and reads it back. If a
    /// concurrent rotation won the write, the persisted key is returned
    /// instead of the one generated here, so all processes converge on what
    /// storage holds.
    pub fn fetch_private_key(
        &self,
        meta_key: &str,
        key_bits: usize,
        max_age: Duration,
        current_modify_at: i64,
    ) -> Result<KeyFetch> {
        let algorithm = KeyAlgorithm::from_bits(key_bits)?;
        let max_age_secs = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);

        if let Some(row) = self.fetch(meta_key)? {
            let age = unix_now().saturating_sub(row.modify_at);
            if age < max_age_secs {
                if row.modify_at == current_modify_at {
                    debug!(table = self.table(), key = meta_key, "private key unchanged");
                    return Ok(KeyFetch::Unchanged {
                        modify_at: row.modify_at,
                    });
                }
                let key = decode_stored(meta_key, algorithm, &row.value)?;
                return Ok(KeyFetch::Loaded {
                    key,
                    modify_at: row.modify_at,
                    generated: false,
                });
            }
            debug!(table = self.table(), key = meta_key, age, "private key expired");
        }

        let key = RotatingKey::generate(algorithm)?;
        let key_text = key.encode();
        self.store(meta_key, &key_text)?;
        let persisted = self.fetch(meta_key)?;
        settle_rotation(self.table(), meta_key, key, &key_text, persisted)
    }
}

/// Decide which key a rotation ends with, given what storage holds after
/// the write.
fn settle_rotation(
    table: &str,
    meta_key: &str,
    generated: RotatingKey,
    key_text: &str,
    persisted: Option<MetaRow>,
) -> Result<KeyFetch> {
    let Some(persisted) = persisted else {
        return Err(MetaStoreError::KeyPersistence(format!(
            "{meta_key} absent from {table} after write"
        )));
    };
    if persisted.value == key_text {
        info!(table, key = meta_key, bits = generated.algorithm().bits(), "rotated private key");
        return Ok(KeyFetch::Loaded {
            key: generated,
            modify_at: persisted.modify_at,
            generated: true,
        });
    }

    warn!(table, key = meta_key, "concurrent private key rotation; adopting persisted key");
    let key = decode_stored(meta_key, generated.algorithm(), &persisted.value)?;
    Ok(KeyFetch::Loaded {
        key,
        modify_at: persisted.modify_at,
        generated: false,
    })
}

fn decode_stored(meta_key: &str, algorithm: KeyAlgorithm, text: &str) -> Result<RotatingKey> {
    RotatingKey::decode(algorithm, text).map_err(|err| match err {
        MetaStoreError::KeyMaterial(reason) => MetaStoreError::KeyDecode {
            key: meta_key.to_string(),
            reason,
        },
        other => other,
    })
}
