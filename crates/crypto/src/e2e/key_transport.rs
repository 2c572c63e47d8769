//! Schluesseltransport ueber ein DH-Geheimnis
//!
//! Der Admin wickelt den Konversations-Schluessel mit einem aus dem
//! DH-Geheimnis abgeleiteten Transportschluessel ein:
//!
//! 1. HKDF-SHA256(ikm = DH-Geheimnis, salt = Konversations-ID) -> 32 Bytes
//! 2. AES-256-GCM ueber `[algorithmus(1)] [schluessel(32)]`
//! 3. AAD = Konversations-ID || ID des Anfragenden
//!
//! Das Ergebnis steht Base64-kodiert im `rsa_key`-Feld.

use base64::Engine as _;

use parley_core::types::{ConversationId, UserId};

use crate::e2e::decrypt::oeffnen;
use crate::e2e::encrypt::versiegeln;
use crate::e2e::key_exchange::hkdf_derive;
use crate::e2e::konversations_schluessel::KonversationsSchluessel;
use crate::error::{CryptoError, CryptoResult};
use crate::types::{SchluesselAlgorithmus, SecretBytes, SCHLUESSEL_LAENGE};

const TRANSPORT_INFO: &[u8] = b"parley-key-transport-v1";

fn transport_schluessel(
    dh_geheimnis: &SecretBytes,
    conversation_id: ConversationId,
) -> CryptoResult<SecretBytes> {
    hkdf_derive(
        dh_geheimnis.as_bytes(),
        conversation_id.inner().as_bytes(),
        TRANSPORT_INFO,
        SCHLUESSEL_LAENGE,
    )
    .map(SecretBytes::new)
}

fn aad(conversation_id: ConversationId, empfaenger: UserId) -> Vec<u8> {
    let mut aad = Vec::with_capacity(32);
    aad.extend_from_slice(conversation_id.inner().as_bytes());
    aad.extend_from_slice(empfaenger.inner().as_bytes());
    aad
}

/// Wickelt einen Konversations-Schluessel fuer `empfaenger` ein
pub fn schluessel_einwickeln(
    schluessel: &KonversationsSchluessel,
    dh_geheimnis: &SecretBytes,
    conversation_id: ConversationId,
    empfaenger: UserId,
) -> CryptoResult<String> {
    let transport = transport_schluessel(dh_geheimnis, conversation_id)?;

    let mut klartext = SecretBytes::new(Vec::with_capacity(1 + SCHLUESSEL_LAENGE));
    klartext.0.push(schluessel.algorithmus().kennung());
    klartext.0.extend_from_slice(schluessel.as_bytes());

    let versiegelt = versiegeln(
        SchluesselAlgorithmus::Aes256Gcm,
        transport.as_bytes(),
        klartext.as_bytes(),
        &aad(conversation_id, empfaenger),
    )?;
    Ok(base64::engine::general_purpose::STANDARD.encode(versiegelt))
}

/// Wickelt einen empfangenen Schluessel wieder aus
pub fn schluessel_auswickeln(
    eingewickelt: &str,
    dh_geheimnis: &SecretBytes,
    conversation_id: ConversationId,
    empfaenger: UserId,
) -> CryptoResult<KonversationsSchluessel> {
    let transport = transport_schluessel(dh_geheimnis, conversation_id)?;
    let versiegelt = base64::engine::general_purpose::STANDARD.decode(eingewickelt.trim())?;

    let klartext = SecretBytes::new(oeffnen(
        SchluesselAlgorithmus::Aes256Gcm,
        transport.as_bytes(),
        &versiegelt,
        &aad(conversation_id, empfaenger),
    )?);

    let (kennung, bytes) = klartext
        .as_bytes()
        .split_first()
        .ok_or_else(|| CryptoError::UngueltigeDaten("Leerer Schluessel".to_string()))?;
    KonversationsSchluessel::aus_bytes(SchluesselAlgorithmus::aus_kennung(*kennung)?, bytes.to_vec())
}
