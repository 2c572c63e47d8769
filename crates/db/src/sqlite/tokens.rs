//! SQLite-Implementierung des TokenRepository

use chrono::Utc;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{BenutzerRecord, TokenRecord};
use crate::repository::{DbResult, TokenRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::users::row_to_benutzer;
use crate::sqlite::zeitstempel;

impl TokenRepository for SqliteDb {
    async fn token_speichern(&self, user_id: Uuid, token_hash: &str) -> DbResult<TokenRecord> {
        let now = Utc::now();

        sqlx::query("INSERT INTO auth_tokens (token_hash, user_id, created_at) VALUES (?, ?, ?)")
            .bind(token_hash)
            .bind(user_id.to_string())
            .bind(zeitstempel(&now))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let err = DbError::Sqlx(e);
                if err.ist_fremdschluessel() {
                    DbError::nicht_gefunden(format!("Benutzer {user_id}"))
                } else if err.ist_eindeutigkeit() {
                    DbError::Eindeutigkeit("Token bereits vergeben".into())
                } else {
                    err
                }
            })?;

        Ok(TokenRecord {
            token_hash: token_hash.to_string(),
            user_id,
            created_at: now,
        })
    }

    async fn benutzer_fuer_token(&self, token_hash: &str) -> DbResult<Option<BenutzerRecord>> {
        let row = sqlx::query(
            "SELECT u.id, u.username, u.created_at
             FROM auth_tokens t
             JOIN users u ON u.id = t.user_id
             WHERE t.token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_benutzer(&r)).transpose()
    }
}
