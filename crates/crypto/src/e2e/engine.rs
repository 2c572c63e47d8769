//! Zustandsmaschine des Schluesselaustauschs
//!
//! Je (Benutzer, Konversation) gibt es genau einen Zustand:
//!
//! ```text
//!   KeinSchluessel --schluessel_anfordern--> WarteAufSchluessel
//!   WarteAufSchluessel --antwort_verarbeiten (ok)--> HatSchluessel
//!   WarteAufSchluessel --antwort_verarbeiten (Fehler)--> WarteAufSchluessel
//!   KeinSchluessel --schluessel_erzeugen--> HatSchluessel   (Admin)
//! ```
//!
//! Die Engine gehoert der Client-Sitzung eines Benutzers und wird nie
//! geteilt. Ein erneutes Anfordern im Zustand `WarteAufSchluessel` ersetzt
//! die DH-Sitzung; Antworten auf die alte Sitzung scheitern dann beim
//! Auswickeln und werden verworfen, die neue Sitzung bleibt offen.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use parley_core::types::{ConversationId, UserId};
use parley_protocol::control::{KeyFlag, KeyRequest, KeyResponse};

use crate::e2e::key_exchange::{oeffentlich_dekodieren, DhSitzung};
use crate::e2e::key_transport::{schluessel_auswickeln, schluessel_einwickeln};
use crate::e2e::konversations_schluessel::KonversationsSchluessel;
use crate::error::{CryptoError, CryptoResult};
use crate::types::SchluesselAlgorithmus;

/// Sichtbarer Zustand einer Konversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchluesselStatus {
    KeinSchluessel,
    WarteAufSchluessel,
    HatSchluessel,
}

/// Ergebnis von [`KeyExchangeEngine::antwort_verarbeiten`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntwortErgebnis {
    /// Schluessel uebernommen, Zustand ist jetzt `HatSchluessel`
    Uebernommen,
    /// Antwort verworfen (doppelt, veraltet oder unerwartet)
    Ignoriert,
}

#[derive(Debug)]
enum Zustand {
    WarteAufSchluessel(DhSitzung),
    HatSchluessel(KonversationsSchluessel),
}

/// Schluesselaustausch eines einzelnen Benutzers
#[derive(Debug)]
pub struct KeyExchangeEngine {
    user_id: UserId,
    algorithmus: SchluesselAlgorithmus,
    /// Fehlender Eintrag = `KeinSchluessel`
    zustaende: HashMap<ConversationId, Zustand>,
}

impl KeyExchangeEngine {
    pub fn neu(user_id: UserId) -> Self {
        Self::mit_algorithmus(user_id, SchluesselAlgorithmus::default())
    }

    /// Engine deren selbst erzeugte Schluessel `algorithmus` verwenden
    pub fn mit_algorithmus(user_id: UserId, algorithmus: SchluesselAlgorithmus) -> Self {
        Self {
            user_id,
            algorithmus,
            zustaende: HashMap::new(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn status(&self, conversation_id: ConversationId) -> SchluesselStatus {
        match self.zustaende.get(&conversation_id) {
            None => SchluesselStatus::KeinSchluessel,
            Some(Zustand::WarteAufSchluessel(_)) => SchluesselStatus::WarteAufSchluessel,
            Some(Zustand::HatSchluessel(_)) => SchluesselStatus::HatSchluessel,
        }
    }

    /// Der gehaltene Schluessel, falls `HatSchluessel`
    pub fn schluessel(&self, conversation_id: ConversationId) -> Option<&KonversationsSchluessel> {
        match self.zustaende.get(&conversation_id) {
            Some(Zustand::HatSchluessel(k)) => Some(k),
            _ => None,
        }
    }

    /// Admin: erzeugt den Schluessel einer neuen Konversation
    ///
    /// Gibt `false` zurueck wenn bereits ein Schluessel gehalten wird.
    pub fn schluessel_erzeugen(&mut self, conversation_id: ConversationId) -> bool {
        if self.schluessel(conversation_id).is_some() {
            return false;
        }
        self.zustaende.insert(
            conversation_id,
            Zustand::HatSchluessel(KonversationsSchluessel::erzeugen(self.algorithmus)),
        );
        info!(conversation_id = %conversation_id, "Konversations-Schluessel erzeugt");
        true
    }

    /// Mitglied: startet einen Handshake
    ///
    /// `None` wenn bereits ein Schluessel gehalten wird. Sonst wird immer ein
    /// frisches DH-Paar erzeugt und eine vorherige Sitzung ersetzt.
    pub fn schluessel_anfordern(&mut self, conversation_id: ConversationId) -> Option<KeyRequest> {
        if self.schluessel(conversation_id).is_some() {
            debug!(conversation_id = %conversation_id, "Schluessel bereits vorhanden");
            return None;
        }

        let sitzung = DhSitzung::neu();
        let anfrage = KeyRequest {
            conversation_id,
            dh_key: sitzung.oeffentlich_base64(),
        };
        self.zustaende
            .insert(conversation_id, Zustand::WarteAufSchluessel(sitzung));
        debug!(conversation_id = %conversation_id, "Schluessel angefordert");
        Some(anfrage)
    }

    /// Admin: beantwortet die Anfrage von `anfragender`
    ///
    /// Fehlt der Schluessel noch, wird er jetzt erzeugt und die Antwort
    /// traegt `KeyFlag::Generated`. Fuer jede Antwort entsteht ein neues
    /// DH-Paar.
    pub fn anfrage_beantworten(
        &mut self,
        conversation_id: ConversationId,
        anfragender: UserId,
        dh_key: &str,
    ) -> CryptoResult<KeyResponse> {
        let peer = oeffentlich_dekodieren(dh_key)?;

        let flag = if self.schluessel_erzeugen(conversation_id) {
            KeyFlag::Generated
        } else {
            KeyFlag::Existing
        };
        let schluessel = self
            .schluessel(conversation_id)
            .ok_or_else(|| CryptoError::KeyExchange("Kein Konversations-Schluessel".to_string()))?;

        let sitzung = DhSitzung::neu();
        let geheimnis = sitzung.gemeinsames_geheimnis(&peer)?;
        let rsa_key = schluessel_einwickeln(schluessel, &geheimnis, conversation_id, anfragender)?;

        debug!(
            conversation_id = %conversation_id,
            anfragender = %anfragender,
            flag = ?flag,
            "Schluessel-Anfrage beantwortet"
        );
        Ok(KeyResponse {
            conversation_id,
            user_id: anfragender,
            dh_key: sitzung.oeffentlich_base64(),
            rsa_key,
            flag,
        })
    }

    /// Mitglied: verarbeitet eine Antwort des Admins
    ///
    /// Fehler sind Protokoll-Anomalien und werden nur protokolliert.
    pub fn antwort_verarbeiten(&mut self, antwort: &KeyResponse) -> AntwortErgebnis {
        let conversation_id = antwort.conversation_id;

        if antwort.user_id != self.user_id {
            warn!(
                conversation_id = %conversation_id,
                empfaenger = %antwort.user_id,
                "Schluessel-Antwort fuer fremden Benutzer verworfen"
            );
            return AntwortErgebnis::Ignoriert;
        }

        match self.status(conversation_id) {
            SchluesselStatus::HatSchluessel => {
                debug!(conversation_id = %conversation_id, "Doppelte Schluessel-Antwort ignoriert");
                return AntwortErgebnis::Ignoriert;
            }
            SchluesselStatus::KeinSchluessel => {
                warn!(conversation_id = %conversation_id, "Unerwartete Schluessel-Antwort ohne Anfrage");
                return AntwortErgebnis::Ignoriert;
            }
            SchluesselStatus::WarteAufSchluessel => {}
        }

        let Some(Zustand::WarteAufSchluessel(sitzung)) = self.zustaende.get(&conversation_id) else {
            return AntwortErgebnis::Ignoriert;
        };

        // Bei Fehler bleibt die Sitzung unveraendert im Zustand
        let ergebnis = oeffentlich_dekodieren(&antwort.dh_key)
            .and_then(|peer| sitzung.gemeinsames_geheimnis(&peer))
            .and_then(|geheimnis| {
                schluessel_auswickeln(&antwort.rsa_key, &geheimnis, conversation_id, self.user_id)
            });

        match ergebnis {
            Ok(schluessel) => {
                self.zustaende
                    .insert(conversation_id, Zustand::HatSchluessel(schluessel));
                info!(
                    conversation_id = %conversation_id,
                    flag = ?antwort.flag,
                    "Konversations-Schluessel erhalten"
                );
                AntwortErgebnis::Uebernommen
            }
            Err(e) => {
                warn!(
                    conversation_id = %conversation_id,
                    fehler = %e,
                    "Schluessel-Antwort unbrauchbar, warte weiter"
                );
                AntwortErgebnis::Ignoriert
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
