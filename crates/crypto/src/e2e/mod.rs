//! E2E Verschluesselung (End-to-End)
//!
//! Client <-> Client Verschluesselung. Der Server leitet Schluessel-Anfragen
//! und -Antworten blind weiter und kann den Inhalt nicht entschluesseln.
//!
//! ## Ablauf
//! 1. Der Admin erzeugt den Konversations-Schluessel
//! 2. Ein Mitglied sendet `key_request` mit frischem X25519-Wert
//! 3. Der Admin antwortet mit eigenem X25519-Wert und dem eingewickelten Schluessel
//! 4. Das Mitglied leitet dasselbe Geheimnis ab und wickelt den Schluessel aus
//! 5. Nachrichten werden mit dem Konversations-Schluessel verschluesselt

pub mod decrypt;
pub mod encrypt;
pub mod engine;
pub mod key_exchange;
pub mod key_transport;
pub mod konversations_schluessel;

pub use decrypt::oeffnen;
pub use encrypt::versiegeln;
pub use engine::{AntwortErgebnis, KeyExchangeEngine, SchluesselStatus};
pub use key_exchange::{hkdf_derive, oeffentlich_dekodieren, DhSitzung};
pub use key_transport::{schluessel_auswickeln, schluessel_einwickeln};
pub use konversations_schluessel::KonversationsSchluessel;
