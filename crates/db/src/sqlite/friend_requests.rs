//! SQLite-Implementierung des FriendRequestRepository
//!
//! Die Invariante "hoechstens eine offene Anfrage je Paar" haelt der
//! partielle Unique-Index `idx_friend_requests_pending`. Jede Transaktion
//! beginnt mit dem Schreibzugriff, damit SQLite konkurrierende Aufrufe
//! serialisiert statt einen Lese-Snapshot zu verwerfen.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{AnfrageStatus, FreundschaftsanfrageRecord, KonversationRecord, NeueKonversation};
use crate::repository::{DbResult, FriendRequestRepository};
use crate::sqlite::conversations::{konversation_einfuegen, teilnehmer_einfuegen};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{parse_datetime, parse_opt_datetime, parse_uuid, zeitstempel};

const SPALTEN: &str = "id, sender_id, receiver_id, status, created_at, responded_at";

impl FriendRequestRepository for SqliteDb {
    async fn create_friend_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> DbResult<(FreundschaftsanfrageRecord, bool)> {
        if sender_id == receiver_id {
            return Err(DbError::UngueltigeDaten(
                "Anfrage an sich selbst nicht moeglich".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let eingefuegt = sqlx::query(
            "INSERT OR IGNORE INTO friend_requests (id, sender_id, receiver_id, status, created_at)
             VALUES (?, ?, ?, 'pending', ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(sender_id.to_string())
        .bind(receiver_id.to_string())
        .bind(zeitstempel(&Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            let err = DbError::Sqlx(e);
            if err.ist_fremdschluessel() {
                DbError::nicht_gefunden(format!("Benutzer {sender_id} oder {receiver_id}"))
            } else {
                err
            }
        })?
        .rows_affected()
            > 0;

        let sql = format!(
            "SELECT {SPALTEN} FROM friend_requests
             WHERE sender_id = ? AND receiver_id = ? AND status = 'pending'"
        );
        let row = sqlx::query(&sql)
            .bind(sender_id.to_string())
            .bind(receiver_id.to_string())
            .fetch_one(&mut *tx)
            .await?;
        let anfrage = row_to_anfrage(&row)?;

        tx.commit().await?;
        Ok((anfrage, eingefuegt))
    }

    async fn get_friend_request(&self, id: Uuid) -> DbResult<Option<FreundschaftsanfrageRecord>> {
        let sql = format!("SELECT {SPALTEN} FROM friend_requests WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_anfrage(&r)).transpose()
    }

    async fn anfrage_annehmen(
        &self,
        id: Uuid,
        titel: &str,
    ) -> DbResult<Option<(FreundschaftsanfrageRecord, Option<KonversationRecord>)>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let Some(anfrage) = status_setzen(&mut tx, id, AnfrageStatus::Accepted, now).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut neue_zeilen = 0;
        for (a, b) in [
            (anfrage.sender_id, anfrage.receiver_id),
            (anfrage.receiver_id, anfrage.sender_id),
        ] {
            neue_zeilen += sqlx::query(
                "INSERT OR IGNORE INTO friendships (user_id, friend_id, created_at)
                 VALUES (?, ?, ?)",
            )
            .bind(a.to_string())
            .bind(b.to_string())
            .bind(zeitstempel(&now))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        // Bereits befreundet (Gegenanfrage wurde zuerst angenommen):
        // die direkte Konversation existiert schon
        if neue_zeilen == 0 {
            tx.commit().await?;
            return Ok(Some((anfrage, None)));
        }

        // Der annehmende Benutzer wird Admin
        let konversation = konversation_einfuegen(
            &mut tx,
            &NeueKonversation {
                title: titel,
                admin_id: anfrage.receiver_id,
                is_direct: true,
            },
            now,
        )
        .await?;
        teilnehmer_einfuegen(&mut tx, konversation.id, anfrage.sender_id, now).await?;

        tx.commit().await?;
        Ok(Some((anfrage, Some(konversation))))
    }

    async fn anfrage_ablehnen(&self, id: Uuid) -> DbResult<Option<FreundschaftsanfrageRecord>> {
        let mut tx = self.pool.begin().await?;
        let anfrage = status_setzen(&mut tx, id, AnfrageStatus::Rejected, Utc::now()).await?;
        tx.commit().await?;
        Ok(anfrage)
    }

    async fn offene_anfragen(
        &self,
        receiver_id: Uuid,
    ) -> DbResult<Vec<FreundschaftsanfrageRecord>> {
        let sql = format!(
            "SELECT {SPALTEN} FROM friend_requests
             WHERE receiver_id = ? AND status = 'pending'
             ORDER BY created_at"
        );
        let rows = sqlx::query(&sql)
            .bind(receiver_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_anfrage).collect()
    }
}

/// Compare-and-Set: nur eine offene Anfrage wechselt ihren Status
async fn status_setzen(
    conn: &mut SqliteConnection,
    id: Uuid,
    status: AnfrageStatus,
    now: DateTime<Utc>,
) -> DbResult<Option<FreundschaftsanfrageRecord>> {
    let affected = sqlx::query(
        "UPDATE friend_requests SET status = ?, responded_at = ?
         WHERE id = ? AND status = 'pending'",
    )
    .bind(status.als_str())
    .bind(zeitstempel(&now))
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if affected == 0 {
        return Ok(None);
    }

    let sql = format!("SELECT {SPALTEN} FROM friend_requests WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_one(&mut *conn)
        .await?;
    row_to_anfrage(&row).map(Some)
}

fn row_to_anfrage(row: &sqlx::sqlite::SqliteRow) -> DbResult<FreundschaftsanfrageRecord> {
    let status: String = row.try_get("status")?;
    let status = status.parse::<AnfrageStatus>().map_err(DbError::intern)?;

    Ok(FreundschaftsanfrageRecord {
        id: parse_uuid(row, "id")?,
        sender_id: parse_uuid(row, "sender_id")?,
        receiver_id: parse_uuid(row, "receiver_id")?,
        status,
        created_at: parse_datetime(row, "created_at")?,
        responded_at: parse_opt_datetime(row, "responded_at")?,
    })
}
