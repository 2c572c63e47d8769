//! X25519 Diffie-Hellman Sitzung
//!
//! Eine `DhSitzung` gehoert genau einem (Benutzer, Konversation)-Paar und
//! wird fuer jeden Handshake neu erzeugt. Das Ableiten verbraucht das
//! Geheimnis nicht: eine Antwort die nicht passt laesst die Sitzung intakt.
//! Die Engine verwirft die Sitzung nach erfolgreichem Handshake.
//!
//! Oeffentliche Werte gehen als Base64 ueber den Draht (`dh_key`).

use base64::Engine as _;
use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::error::{CryptoError, CryptoResult};
use crate::types::SecretBytes;

/// Ephemeres X25519-Schluesselpaar fuer einen einzelnen Handshake
pub struct DhSitzung {
    geheimnis: StaticSecret,
    oeffentlich: [u8; 32],
}

impl DhSitzung {
    /// Erstellt eine neue Sitzung mit frischem Schluesselpaar
    pub fn neu() -> Self {
        let geheimnis = StaticSecret::random_from_rng(OsRng);
        let oeffentlich = X25519PublicKey::from(&geheimnis);
        Self {
            geheimnis,
            oeffentlich: oeffentlich.to_bytes(),
        }
    }

    /// Oeffentlicher Wert (32 Bytes)
    pub fn oeffentlich(&self) -> &[u8; 32] {
        &self.oeffentlich
    }

    /// Oeffentlicher Wert als Base64 fuer das `dh_key`-Feld
    pub fn oeffentlich_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.oeffentlich)
    }

    /// Fuehrt den DH-Austausch mit dem oeffentlichen Wert `peer` durch
    pub fn gemeinsames_geheimnis(&self, peer: &[u8; 32]) -> CryptoResult<SecretBytes> {
        let ergebnis = self.geheimnis.diffie_hellman(&X25519PublicKey::from(*peer));
        if !ergebnis.was_contributory() {
            return Err(CryptoError::KeyExchange(
                "Oeffentlicher Wert niedriger Ordnung".to_string(),
            ));
        }
        Ok(SecretBytes::new(ergebnis.as_bytes().to_vec()))
    }
}

impl Default for DhSitzung {
    fn default() -> Self {
        Self::neu()
    }
}

impl std::fmt::Debug for DhSitzung {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DhSitzung")
            .field("oeffentlich", &self.oeffentlich_base64())
            .finish()
    }
}

/// Dekodiert einen oeffentlichen DH-Wert aus Base64
pub fn oeffentlich_dekodieren(dh_key: &str) -> CryptoResult<[u8; 32]> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(dh_key.trim())?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| CryptoError::UngueltigeSchluesselLaenge {
        erwartet: 32,
        erhalten: bytes.len(),
    })
}

/// HKDF-basierte Key Derivation (allgemein verwendbar)
pub fn hkdf_derive(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> CryptoResult<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; len];
    hk.expand(info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
