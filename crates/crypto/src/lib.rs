//! # parley-crypto
//!
//! Ende-zu-Ende Verschluesselung fuer parley-Konversationen.
//!
//! ## Module
//! - `e2e` - DH-Sitzung, Schluesseltransport, Konversations-Schluessel und
//!   die Zustandsmaschine des Schluesselaustauschs
//! - `types` - Gemeinsame Typen (SecretBytes, Algorithmus)
//! - `error` - Fehlertypen
//!
//! Der Server sieht nur oeffentliche DH-Werte und eingewickelte Schluessel;
//! alles hier laeuft ausschliesslich auf den Clients.

pub mod e2e;
pub mod error;
pub mod types;

// Bequeme Re-Exports
pub use error::{CryptoError, CryptoResult};
pub use types::{SchluesselAlgorithmus, SecretBytes};

pub use e2e::{
    hkdf_derive, schluessel_auswickeln, schluessel_einwickeln, AntwortErgebnis, DhSitzung,
    KeyExchangeEngine, KonversationsSchluessel, SchluesselStatus,
};
