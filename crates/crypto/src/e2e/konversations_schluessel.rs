//! Konversations-Schluessel
//!
//! Symmetrischer Schluessel einer Konversation. Der Admin erzeugt ihn,
//! Mitglieder erhalten ihn ueber den DH-Handshake. Fuer die Nachrichten-
//! schicht ist er nur eine Faehigkeit zum Ver- und Entschluesseln von Text.
//!
//! Chiffrat-Format im `content`-Feld: Base64 von `[nonce(12)] [ct + tag]`,
//! AAD ist die Konversations-ID.

use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

use parley_core::types::ConversationId;

use crate::e2e::decrypt::oeffnen;
use crate::e2e::encrypt::{schluessellaenge_pruefen, versiegeln};
use crate::error::{CryptoError, CryptoResult};
use crate::types::{SchluesselAlgorithmus, SecretBytes, SCHLUESSEL_LAENGE};

#[derive(Debug, Clone)]
pub struct KonversationsSchluessel {
    bytes: SecretBytes,
    algorithmus: SchluesselAlgorithmus,
}

impl KonversationsSchluessel {
    /// Erzeugt einen neuen zufaelligen Schluessel
    pub fn erzeugen(algorithmus: SchluesselAlgorithmus) -> Self {
        let mut bytes = vec![0u8; SCHLUESSEL_LAENGE];
        OsRng.fill_bytes(&mut bytes);
        Self {
            bytes: SecretBytes::new(bytes),
            algorithmus,
        }
    }

    pub fn aus_bytes(algorithmus: SchluesselAlgorithmus, bytes: Vec<u8>) -> CryptoResult<Self> {
        schluessellaenge_pruefen(&bytes)?;
        Ok(Self {
            bytes: SecretBytes::new(bytes),
            algorithmus,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_bytes()
    }

    pub fn algorithmus(&self) -> SchluesselAlgorithmus {
        self.algorithmus
    }

    /// Verschluesselt Nachrichtentext fuer das `content`-Feld
    pub fn verschluesseln(
        &self,
        conversation_id: ConversationId,
        klartext: &str,
    ) -> CryptoResult<String> {
        let versiegelt = versiegeln(
            self.algorithmus,
            self.as_bytes(),
            klartext.as_bytes(),
            conversation_id.inner().as_bytes(),
        )?;
        Ok(base64::engine::general_purpose::STANDARD.encode(versiegelt))
    }

    /// Entschluesselt ein `content`-Feld
    pub fn entschluesseln(
        &self,
        conversation_id: ConversationId,
        chiffrat: &str,
    ) -> CryptoResult<String> {
        let versiegelt = base64::engine::general_purpose::STANDARD.decode(chiffrat.trim())?;
        let klartext = oeffnen(
            self.algorithmus,
            self.as_bytes(),
            &versiegelt,
            conversation_id.inner().as_bytes(),
        )?;
        String::from_utf8(klartext)
            .map_err(|e| CryptoError::UngueltigeDaten(format!("Kein UTF-8: {e}")))
    }
}
