//! parley-auth – Token-Authentifizierung
//!
//! Dieses Crate implementiert:
//! - Erzeugung zufaelliger Bearer-Tokens (URL-sicheres Base64)
//! - Speicherung nur als SHA-256-Digest
//! - AuthService: Token zu genau einem Benutzer aufloesen, Tokens ausstellen
//!
//! Login per Passwort und die Ausgabe von Tokens ueber HTTP liegen ausserhalb
//! dieses Crates; der Server stellt Tokens nur ueber ein Operator-Kommando aus.

pub mod error;
pub mod service;
pub mod token;

// Bequeme Re-Exporte
pub use error::{AuthError, AuthResult};
pub use service::{AuthService, Identitaet};
pub use token::{token_generieren, token_hashen};
