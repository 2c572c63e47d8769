//! AEAD-Verschluesselung
//!
//! Versiegelt beliebige Bytes mit einem 32-Byte-Schluessel.
//!
//! ## Format
//! ```text
//! [nonce(12)] [ciphertext + auth_tag(16)]
//! ```
//!
//! Die Nonce ist fuer jede Versiegelung frisch zufaellig. Die AAD wird nicht
//! mit uebertragen; der Empfaenger muss sie selbst rekonstruieren.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce as AesNonce,
};
use chacha20poly1305::{ChaCha20Poly1305, Key as ChaChaKey, Nonce as ChaChaNonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::types::{SchluesselAlgorithmus, NONCE_LAENGE, SCHLUESSEL_LAENGE};

/// Versiegelt `klartext` und stellt die Nonce voran
pub fn versiegeln(
    algorithmus: SchluesselAlgorithmus,
    key_bytes: &[u8],
    klartext: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    schluessellaenge_pruefen(key_bytes)?;

    let mut nonce_bytes = [0u8; NONCE_LAENGE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = match algorithmus {
        SchluesselAlgorithmus::Aes256Gcm => {
            encrypt_aes256gcm(klartext, key_bytes, &nonce_bytes, aad)?
        }
        SchluesselAlgorithmus::ChaCha20Poly1305 => {
            encrypt_chacha20(klartext, key_bytes, &nonce_bytes, aad)?
        }
    };

    let mut out = Vec::with_capacity(NONCE_LAENGE + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub(crate) fn schluessellaenge_pruefen(key_bytes: &[u8]) -> CryptoResult<()> {
    if key_bytes.len() != SCHLUESSEL_LAENGE {
        return Err(CryptoError::UngueltigeSchluesselLaenge {
            erwartet: SCHLUESSEL_LAENGE,
            erhalten: key_bytes.len(),
        });
    }
    Ok(())
}

fn encrypt_aes256gcm(
    plaintext: &[u8],
    key_bytes: &[u8],
    nonce_bytes: &[u8; NONCE_LAENGE],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    let key = Key::<Aes256Gcm>::from_slice(key_bytes);
    let cipher = Aes256Gcm::new(key);
    let nonce = AesNonce::from_slice(nonce_bytes);

    cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))
}

fn encrypt_chacha20(
    plaintext: &[u8],
    key_bytes: &[u8],
    nonce_bytes: &[u8; NONCE_LAENGE],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    let key = ChaChaKey::from_slice(key_bytes);
    let cipher = ChaCha20Poly1305::new(key);
    let nonce = ChaChaNonce::from_slice(nonce_bytes);

    cipher
        .encrypt(nonce, chacha20poly1305::aead::Payload { msg: plaintext, aad })
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::e2e::decrypt::oeffnen;
    use crate::types::TAG_LAENGE;

    const KEY: [u8; 32] = [7u8; 32];

    #[test]
    fn versiegeln_format() {
        let out = versiegeln(SchluesselAlgorithmus::Aes256Gcm, &KEY, b"hallo", b"aad").unwrap();
        assert_eq!(out.len(), NONCE_LAENGE + 5 + TAG_LAENGE);
    }

    #[test]
    fn gleicher_klartext_verschiedene_nonces() {
        let a = versiegeln(SchluesselAlgorithmus::Aes256Gcm, &KEY, b"x", b"").unwrap();
        let b = versiegeln(SchluesselAlgorithmus::Aes256Gcm, &KEY, b"x", b"").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn chacha20_versiegeln_und_oeffnen() {
        let algo = SchluesselAlgorithmus::ChaCha20Poly1305;
        let out = versiegeln(algo, &KEY, b"geheim", b"kontext").unwrap();
        assert_eq!(oeffnen(algo, &KEY, &out, b"kontext").unwrap(), b"geheim");
    }

    #[test]
    fn falsche_schluessellaenge() {
        let err = versiegeln(SchluesselAlgorithmus::Aes256Gcm, &[1u8; 16], b"x", b"").unwrap_err();
        assert!(matches!(
            err,
            CryptoError::UngueltigeSchluesselLaenge { erwartet: 32, erhalten: 16 }
        ));
    }
}
