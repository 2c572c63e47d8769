//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};

/// Laenge symmetrischer Schluessel in Bytes
pub const SCHLUESSEL_LAENGE: usize = 32;

/// Laenge der AEAD-Nonce in Bytes
pub const NONCE_LAENGE: usize = 12;

/// Laenge des AEAD-Auth-Tags in Bytes
pub const TAG_LAENGE: usize = 16;

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone)]
pub struct SecretBytes(pub Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// AEAD-Algorithmus eines Konversations-Schluessels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchluesselAlgorithmus {
    #[default]
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl SchluesselAlgorithmus {
    /// Ein-Byte-Kennung im eingewickelten Schluessel
    pub fn kennung(&self) -> u8 {
        match self {
            Self::Aes256Gcm => 1,
            Self::ChaCha20Poly1305 => 2,
        }
    }

    pub fn aus_kennung(kennung: u8) -> CryptoResult<Self> {
        match kennung {
            1 => Ok(Self::Aes256Gcm),
            2 => Ok(Self::ChaCha20Poly1305),
            andere => Err(CryptoError::UngueltigeDaten(format!(
                "Unbekannter Algorithmus: {andere}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_bytes_debug_verbirgt_inhalt() {
        let s = SecretBytes::new(vec![0xAB; 4]);
        let text = format!("{s:?}");
        assert!(text.contains("REDACTED"));
        assert!(!text.contains("171"));
    }

    #[test]
    fn algorithmus_kennung() {
        for algo in [
            SchluesselAlgorithmus::Aes256Gcm,
            SchluesselAlgorithmus::ChaCha20Poly1305,
        ] {
            assert_eq!(SchluesselAlgorithmus::aus_kennung(algo.kennung()).unwrap(), algo);
        }
        assert!(SchluesselAlgorithmus::aus_kennung(0).is_err());
    }
}
