//! Bearer-Tokens
//!
//! Tokens sind 32 Zufallsbytes in URL-sicherem Base64. In der Datenbank liegt
//! nur der SHA-256-Digest; wer die Datenbank liest, kann sich damit nicht
//! anmelden.

use base64::Engine as _;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Erzeugt einen neuen zufaelligen Token
pub fn token_generieren() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Berechnet den gespeicherten Digest eines Tokens
pub fn token_hashen(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    base64::engine::general_purpose::STANDARD_NO_PAD.encode(digest)
}
