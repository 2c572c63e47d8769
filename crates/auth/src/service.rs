//! Auth-Service fuer parley
//!
//! Loest ein Bearer-Token zu genau einem Benutzer auf. Es gibt keine
//! Ersatz-Identitaet: ein unbekanntes Token ist ein Fehler.

use std::sync::Arc;

use tracing::{debug, info};

use parley_core::types::UserId;
use parley_db::{models::NeuerBenutzer, TokenRepository, UserRepository};

use crate::{
    error::{AuthError, AuthResult},
    token::{token_generieren, token_hashen},
};

/// Authentifizierte Identitaet einer Verbindung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identitaet {
    pub user_id: UserId,
    pub username: String,
}

/// Auth-Service – zentraler Einstiegspunkt fuer alle Authentifizierungsvorgaenge
pub struct AuthService<R> {
    repo: Arc<R>,
}

impl<R> Clone for AuthService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: UserRepository + TokenRepository> AuthService<R> {
    /// Erstellt einen neuen AuthService
    pub fn neu(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Loest ein Token zu einem Benutzer auf
    pub async fn authentifizieren(&self, token: &str) -> AuthResult<Identitaet> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::TokenFehlt);
        }

        let benutzer = self
            .repo
            .benutzer_fuer_token(&token_hashen(token))
            .await?
            .ok_or(AuthError::TokenUngueltig)?;

        debug!(user_id = %benutzer.id, "Token akzeptiert");
        Ok(Identitaet {
            user_id: UserId(benutzer.id),
            username: benutzer.username,
        })
    }

    /// Stellt ein neues Token fuer einen bestehenden Benutzer aus
    ///
    /// Der Klartext wird nur hier zurueckgegeben.
    pub async fn token_ausstellen(&self, user_id: UserId) -> AuthResult<String> {
        if self.repo.get_by_id(user_id.inner()).await?.is_none() {
            return Err(AuthError::BenutzerNichtGefunden(user_id.to_string()));
        }

        let token = token_generieren();
        self.repo
            .token_speichern(user_id.inner(), &token_hashen(&token))
            .await?;
        info!(user_id = %user_id, "Token ausgestellt");
        Ok(token)
    }

    /// Legt einen Benutzer an und stellt ihm ein erstes Token aus
    pub async fn benutzer_anlegen(&self, username: &str) -> AuthResult<(Identitaet, String)> {
        if self.repo.get_by_name(username).await?.is_some() {
            return Err(AuthError::BenutzernameVergeben(username.to_string()));
        }

        let benutzer = self.repo.create(NeuerBenutzer { username }).await?;
        let user_id = UserId(benutzer.id);
        let token = self.token_ausstellen(user_id).await?;

        info!(user_id = %user_id, username = %benutzer.username, "Benutzer angelegt");
        Ok((
            Identitaet {
                user_id,
                username: benutzer.username,
            },
            token,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_db::SqliteDb;

    async fn service() -> AuthService<SqliteDb> {
        let db = SqliteDb::in_memory().await.expect("In-Memory DB");
        AuthService::neu(Arc::new(db))
    }

    #[tokio::test]
    async fn token_loest_benutzer_auf() {
        let auth = service().await;
        let (alice, token) = auth.benutzer_anlegen("alice").await.unwrap();

        let identitaet = auth.authentifizieren(&token).await.unwrap();
        assert_eq!(identitaet, alice);
        assert_eq!(identitaet.username, "alice");
    }

    #[tokio::test]
    async fn unbekanntes_token_abgelehnt() {
        let auth = service().await;
        auth.benutzer_anlegen("alice").await.unwrap();

        let err = auth.authentifizieren("falsch").await.unwrap_err();
        assert!(matches!(err, AuthError::TokenUngueltig));
        assert!(err.ist_abgelehnt());

        let err = auth.authentifizieren("   ").await.unwrap_err();
        assert!(matches!(err, AuthError::TokenFehlt));
    }

    #[tokio::test]
    async fn mehrere_tokens_pro_benutzer() {
        let auth = service().await;
        let (alice, t1) = auth.benutzer_anlegen("alice").await.unwrap();
        let t2 = auth.token_ausstellen(alice.user_id).await.unwrap();

        assert_ne!(t1, t2);
        assert_eq!(auth.authentifizieren(&t1).await.unwrap().user_id, alice.user_id);
        assert_eq!(auth.authentifizieren(&t2).await.unwrap().user_id, alice.user_id);
    }

    #[tokio::test]
    async fn doppelter_benutzername() {
        let auth = service().await;
        auth.benutzer_anlegen("bob").await.unwrap();
        let err = auth.benutzer_anlegen("bob").await.unwrap_err();
        assert!(matches!(err, AuthError::BenutzernameVergeben(_)));
    }

    #[tokio::test]
    async fn token_fuer_unbekannten_benutzer() {
        let auth = service().await;
        let err = auth.token_ausstellen(UserId::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::BenutzerNichtGefunden(_)));
    }
}
