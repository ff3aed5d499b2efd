// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end encryption for the relay path and the pairing offer a client
//! scans to trust this daemon (SPEC_FULL.md §4.5).
//!
//! Two distinct keys are in play: a long-lived Ed25519 identity (persisted
//! at `Config::daemon_key_path`, generated once on first startup) that
//! authenticates *which* daemon a client is pairing with, and a fresh X25519
//! ephemeral keypair per relay session that the identity key signs over —
//! the session key itself is never persisted, so a compromised relay
//! session leaves no durable secret behind.

use std::path::Path;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, CHACHA20_POLY1305, NONCE_LEN};
use ring::agreement::{agree_ephemeral, EphemeralPrivateKey, UnparsedPublicKey, X25519};
use ring::hkdf::{Salt, HKDF_SHA256};
use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair, Signature, UnparsedPublicKey as UnparsedVerifyKey, ED25519};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("failed to generate key material")]
    Generation,
    #[error("io error persisting identity key: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored identity key is corrupt")]
    CorruptIdentity,
    #[error("key agreement failed")]
    Agreement,
    #[error("signature verification failed")]
    BadSignature,
    #[error("seal/open failed: payload may be tampered")]
    SealOpen,
}

/// This daemon's long-lived signing identity.
pub struct DaemonIdentity {
    keypair: Ed25519KeyPair,
}

impl DaemonIdentity {
    /// Load the identity persisted at `path`, generating and persisting a
    /// fresh one (mode 0600) if none exists yet.
    pub fn load_or_create(path: &Path) -> Result<Self, CryptoError> {
        let pkcs8 = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let rng = SystemRandom::new();
                let doc = Ed25519KeyPair::generate_pkcs8(&rng).map_err(|_| CryptoError::Generation)?;
                let bytes = doc.as_ref().to_vec();
                write_private_file(path, &bytes)?;
                bytes
            }
            Err(e) => return Err(e.into()),
        };
        let keypair = Ed25519KeyPair::from_pkcs8(&pkcs8).map_err(|_| CryptoError::CorruptIdentity)?;
        Ok(Self { keypair })
    }

    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.keypair.public_key().as_ref().to_vec()
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign(message)
    }
}

/// Verify `signature` over `message` under `public_key`.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    UnparsedVerifyKey::new(&ED25519, public_key)
        .verify(message, signature)
        .map_err(|_| CryptoError::BadSignature)
}

#[cfg(unix)]
fn write_private_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    std::io::Write::write_all(&mut file, bytes)
}

#[cfg(not(unix))]
fn write_private_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)
}

/// The pairing offer a client decodes from the fragment of a scanned/shared
/// URL: which server this is, and the public key to pin as a trust anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingOffer {
    pub v: u32,
    pub server_id: String,
    pub daemon_public_key_b64: String,
}

/// Build the fragment-encoded pairing URL a client scans to trust this
/// daemon (SPEC_FULL.md §4.5): `{app_base_url}/pair#{base64url(offer json)}`.
pub fn pairing_offer_url(app_base_url: &str, server_id: &str, identity: &DaemonIdentity) -> String {
    let offer = PairingOffer {
        v: 2,
        server_id: server_id.to_string(),
        daemon_public_key_b64: STANDARD.encode(identity.public_key_bytes()),
    };
    let json = serde_json::to_vec(&offer).expect("PairingOffer always serializes");
    let fragment = URL_SAFE_NO_PAD.encode(json);
    format!("{}/pair#{}", app_base_url.trim_end_matches('/'), fragment)
}

/// A symmetric key derived from one X25519 key agreement, good for sealing
/// traffic in both directions of a single relay session. Each message uses
/// its own randomly drawn nonce, carried alongside the ciphertext.
pub struct SessionCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl SessionCipher {
    /// Run X25519 agreement between `local_private` and `peer_public`, then
    /// HKDF-SHA256 the shared secret into a ChaCha20-Poly1305 key.
    pub fn from_agreement(
        local_private: EphemeralPrivateKey,
        peer_public: &[u8],
    ) -> Result<Self, CryptoError> {
        let peer_public = UnparsedPublicKey::new(&X25519, peer_public);
        let key_bytes = agree_ephemeral(local_private, &peer_public, CryptoError::Agreement, |shared| {
            let salt = Salt::new(HKDF_SHA256, b"paseo-relay-session-v1");
            let prk = salt.extract(shared);
            let okm = prk
                .expand(&[b"paseo-relay-session-v1"], HKDF_SHA256)
                .map_err(|_| CryptoError::Agreement)?;
            let mut key_bytes = [0u8; 32];
            okm.fill(&mut key_bytes).map_err(|_| CryptoError::Agreement)?;
            Ok(key_bytes)
        })?;
        let unbound = UnboundKey::new(&CHACHA20_POLY1305, &key_bytes).map_err(|_| CryptoError::Agreement)?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext || tag`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use ring::rand::SecureRandom;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng.fill(&mut nonce_bytes).map_err(|_| CryptoError::SealOpen)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::SealOpen)?;

        let mut out = Vec::with_capacity(NONCE_LEN + in_out.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&in_out);
        Ok(out)
    }

    /// Decrypt a payload produced by [`Self::seal`] (this session or the peer's).
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < NONCE_LEN {
            return Err(CryptoError::SealOpen);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| CryptoError::SealOpen)?;
        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::SealOpen)?;
        Ok(plaintext.to_vec())
    }
}

/// Generate a fresh ephemeral X25519 keypair for one relay session.
pub fn generate_ephemeral() -> Result<(EphemeralPrivateKey, Vec<u8>), CryptoError> {
    let rng = SystemRandom::new();
    let private = EphemeralPrivateKey::generate(&X25519, &rng).map_err(|_| CryptoError::Generation)?;
    let public = private.compute_public_key().map_err(|_| CryptoError::Generation)?;
    Ok((private, public.as_ref().to_vec()))
}

#[cfg(test)]
#[path = "crypto_tests.rs"]
mod tests;
