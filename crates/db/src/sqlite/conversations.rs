//! SQLite-Implementierung des ConversationRepository

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{KonversationRecord, MitgliedschaftRecord, NeueKonversation};
use crate::repository::{ConversationRepository, DbResult};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{parse_datetime, parse_uuid, zeitstempel};

impl ConversationRepository for SqliteDb {
    async fn create_conversation(
        &self,
        data: NeueKonversation<'_>,
    ) -> DbResult<KonversationRecord> {
        let mut tx = self.pool.begin().await?;
        let konversation = konversation_einfuegen(&mut tx, &data, Utc::now()).await?;
        tx.commit().await?;
        Ok(konversation)
    }

    async fn get_conversation(&self, id: Uuid) -> DbResult<Option<KonversationRecord>> {
        let row = sqlx::query(
            "SELECT id, title, admin_id, is_direct, created_at FROM conversations WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_konversation(&r)).transpose()
    }

    async fn add_participant(&self, conversation_id: Uuid, user_id: Uuid) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        teilnehmer_einfuegen(&mut conn, conversation_id, user_id, Utc::now()).await
    }

    async fn get_membership(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> DbResult<Option<MitgliedschaftRecord>> {
        let row = sqlx::query(
            "SELECT m.conversation_id, m.user_id, u.username, m.is_listening, m.joined_at
             FROM conversation_members m
             JOIN users u ON u.id = m.user_id
             WHERE m.conversation_id = ? AND m.user_id = ?",
        )
        .bind(conversation_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_mitgliedschaft(&r)).transpose()
    }

    async fn mitgliedschaften(&self, conversation_id: Uuid) -> DbResult<Vec<MitgliedschaftRecord>> {
        let rows = sqlx::query(
            "SELECT m.conversation_id, m.user_id, u.username, m.is_listening, m.joined_at
             FROM conversation_members m
             JOIN users u ON u.id = m.user_id
             WHERE m.conversation_id = ?
             ORDER BY m.joined_at, u.username",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_mitgliedschaft).collect()
    }

    async fn zuhoeren_setzen(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        listening: bool,
    ) -> DbResult<bool> {
        let affected = sqlx::query(
            "UPDATE conversation_members SET is_listening = ?
             WHERE conversation_id = ? AND user_id = ?",
        )
        .bind(listening as i64)
        .bind(conversation_id.to_string())
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }
}

/// Legt Konversation und Admin-Mitgliedschaft auf einer bestehenden
/// Verbindung (bzw. Transaktion) an
pub(crate) async fn konversation_einfuegen(
    conn: &mut SqliteConnection,
    data: &NeueKonversation<'_>,
    now: DateTime<Utc>,
) -> DbResult<KonversationRecord> {
    let title = data.title.trim();
    if title.is_empty() {
        return Err(DbError::UngueltigeDaten("Titel darf nicht leer sein".into()));
    }

    let id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO conversations (id, title, admin_id, is_direct, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(title)
    .bind(data.admin_id.to_string())
    .bind(data.is_direct as i64)
    .bind(zeitstempel(&now))
    .execute(&mut *conn)
    .await
    .map_err(|e| fremdschluessel_als_nicht_gefunden(e, format!("Admin {}", data.admin_id)))?;

    teilnehmer_einfuegen(conn, id, data.admin_id, now).await?;

    Ok(KonversationRecord {
        id,
        title: title.to_string(),
        admin_id: data.admin_id,
        is_direct: data.is_direct,
        created_at: now,
    })
}

/// Fuegt eine Mitgliedschaft mit `is_listening = 0` hinzu (idempotent)
pub(crate) async fn teilnehmer_einfuegen(
    conn: &mut SqliteConnection,
    conversation_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let affected = sqlx::query(
        "INSERT OR IGNORE INTO conversation_members (conversation_id, user_id, is_listening, joined_at)
         VALUES (?, ?, 0, ?)",
    )
    .bind(conversation_id.to_string())
    .bind(user_id.to_string())
    .bind(zeitstempel(&now))
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        fremdschluessel_als_nicht_gefunden(
            e,
            format!("Konversation {conversation_id} oder Benutzer {user_id}"),
        )
    })?
    .rows_affected();

    Ok(affected > 0)
}

fn fremdschluessel_als_nicht_gefunden(e: sqlx::Error, was: String) -> DbError {
    let err = DbError::Sqlx(e);
    if err.ist_fremdschluessel() {
        DbError::NichtGefunden(was)
    } else {
        err
    }
}

pub(crate) fn row_to_konversation(row: &sqlx::sqlite::SqliteRow) -> DbResult<KonversationRecord> {
    let is_direct: i64 = row.try_get("is_direct")?;
    Ok(KonversationRecord {
        id: parse_uuid(row, "id")?,
        title: row.try_get("title")?,
        admin_id: parse_uuid(row, "admin_id")?,
        is_direct: is_direct != 0,
        created_at: parse_datetime(row, "created_at")?,
    })
}

fn row_to_mitgliedschaft(row: &sqlx::sqlite::SqliteRow) -> DbResult<MitgliedschaftRecord> {
    let is_listening: i64 = row.try_get("is_listening")?;
    Ok(MitgliedschaftRecord {
        conversation_id: parse_uuid(row, "conversation_id")?,
        user_id: parse_uuid(row, "user_id")?,
        username: row.try_get("username")?,
        is_listening: is_listening != 0,
        joined_at: parse_datetime(row, "joined_at")?,
    })
}
