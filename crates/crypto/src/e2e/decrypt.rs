//! AEAD-Entschluesselung
//!
//! Gegenstueck zu [`versiegeln`](crate::e2e::encrypt::versiegeln).
//! Verifiziert dabei den Auth-Tag und die AAD.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce as AesNonce,
};
use chacha20poly1305::{ChaCha20Poly1305, Key as ChaChaKey, Nonce as ChaChaNonce};

use crate::e2e::encrypt::schluessellaenge_pruefen;
use crate::error::{CryptoError, CryptoResult};
use crate::types::{SchluesselAlgorithmus, NONCE_LAENGE, TAG_LAENGE};

/// Oeffnet `[nonce(12)] [ciphertext + tag]`
pub fn oeffnen(
    algorithmus: SchluesselAlgorithmus,
    key_bytes: &[u8],
    versiegelt: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    schluessellaenge_pruefen(key_bytes)?;

    if versiegelt.len() < NONCE_LAENGE + TAG_LAENGE {
        return Err(CryptoError::UngueltigeDaten(format!(
            "Chiffrat zu kurz: {} Bytes",
            versiegelt.len()
        )));
    }
    let (nonce_bytes, ciphertext) = versiegelt.split_at(NONCE_LAENGE);

    match algorithmus {
        SchluesselAlgorithmus::Aes256Gcm => {
            decrypt_aes256gcm(ciphertext, key_bytes, nonce_bytes, aad)
        }
        SchluesselAlgorithmus::ChaCha20Poly1305 => {
            decrypt_chacha20(ciphertext, key_bytes, nonce_bytes, aad)
        }
    }
}

fn decrypt_aes256gcm(
    ciphertext: &[u8],
    key_bytes: &[u8],
    nonce_bytes: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    let key = Key::<Aes256Gcm>::from_slice(key_bytes);
    let cipher = Aes256Gcm::new(key);
    let nonce = AesNonce::from_slice(nonce_bytes);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|e| CryptoError::Entschluesselung(e.to_string()))
}

fn decrypt_chacha20(
    ciphertext: &[u8],
    key_bytes: &[u8],
    nonce_bytes: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    let key = ChaChaKey::from_slice(key_bytes);
    let cipher = ChaCha20Poly1305::new(key);
    let nonce = ChaChaNonce::from_slice(nonce_bytes);

    cipher
        .decrypt(
            nonce,
            chacha20poly1305::aead::Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|e| CryptoError::Entschluesselung(e.to_string()))
}
