//! SQLite-Implementierung des MessageRepository

use chrono::Utc;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{NachrichtRecord, NeueNachricht};
use crate::repository::{DbResult, MessageRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::zeitstempel;

impl MessageRepository for SqliteDb {
    async fn create_message(&self, data: NeueNachricht<'_>) -> DbResult<NachrichtRecord> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, author_id, content, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(data.conversation_id.to_string())
        .bind(data.author_id.to_string())
        .bind(data.content)
        .bind(zeitstempel(&now))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let err = DbError::Sqlx(e);
            if err.ist_fremdschluessel() {
                DbError::nicht_gefunden(format!("Konversation {}", data.conversation_id))
            } else {
                err
            }
        })?;

        Ok(NachrichtRecord {
            id,
            conversation_id: data.conversation_id,
            author_id: data.author_id,
            content: data.content.to_string(),
            created_at: now,
        })
    }
}
