//! SQLite-Implementierung des UserRepository

use chrono::Utc;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{BenutzerRecord, NeuerBenutzer};
use crate::repository::{DbResult, UserRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{parse_datetime, parse_uuid, zeitstempel};

impl UserRepository for SqliteDb {
    async fn create(&self, data: NeuerBenutzer<'_>) -> DbResult<BenutzerRecord> {
        let username = data.username.trim();
        if username.is_empty() {
            return Err(DbError::UngueltigeDaten("Benutzername darf nicht leer sein".into()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query("INSERT INTO users (id, username, created_at) VALUES (?, ?, ?)")
            .bind(id.to_string())
            .bind(username)
            .bind(zeitstempel(&now))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let err = DbError::Sqlx(e);
                if err.ist_eindeutigkeit() {
                    DbError::Eindeutigkeit(format!("Benutzername '{username}' bereits vergeben"))
                } else {
                    err
                }
            })?;

        Ok(BenutzerRecord {
            id,
            username: username.to_string(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<BenutzerRecord>> {
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_benutzer(&r)).transpose()
    }

    async fn get_by_name(&self, username: &str) -> DbResult<Option<BenutzerRecord>> {
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_benutzer(&r)).transpose()
    }

    async fn sind_befreundet(&self, a: Uuid, b: Uuid) -> DbResult<bool> {
        let row = sqlx::query("SELECT 1 FROM friendships WHERE user_id = ? AND friend_id = ?")
            .bind(a.to_string())
            .bind(b.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

pub(crate) fn row_to_benutzer(row: &sqlx::sqlite::SqliteRow) -> DbResult<BenutzerRecord> {
    use sqlx::Row as _;

    Ok(BenutzerRecord {
        id: parse_uuid(row, "id")?,
        username: row.try_get("username")?,
        created_at: parse_datetime(row, "created_at")?,
    })
}
