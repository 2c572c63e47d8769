//! Gruppen-Router – Verbindungsregister und Fan-out je Benutzer
//!
//! Jeder Benutzer hat eine Gruppe aus null oder mehr Verbindungen. Ein
//! Ereignis fuer einen Benutzer geht an alle Verbindungen seiner Gruppe.
//!
//! ## Zustellung
//! - Hoechstens einmal, ohne Wiederholung und ohne Offline-Postfach
//! - Volle oder geschlossene Queues verwerfen das Ereignis
//! - Die Gruppe wird unter der Shard-Sperre kopiert, gesendet wird danach

use dashmap::DashMap;
use parley_core::types::{ConnectionId, UserId};
use parley_protocol::ServerMessage;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Verbindung
pub const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    tx: mpsc::Sender<ServerMessage>,
}

impl ClientSender {
    /// Erstellt Sender und Empfangs-Queue fuer eine neue Verbindung
    pub fn neu(user_id: UserId) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        let sender = Self {
            connection_id: ConnectionId::new(),
            user_id,
            tx,
        };
        (sender, rx)
    }

    /// Sendet eine Nachricht nicht-blockierend an die Verbindung
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ServerMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    connection_id = %self.connection_id,
                    "Send-Queue voll – Ereignis verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    user_id = %self.user_id,
                    connection_id = %self.connection_id,
                    "Send-Queue geschlossen (Verbindung getrennt)"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// GroupRouter
// ---------------------------------------------------------------------------

/// Zentrales Verbindungsregister
///
/// Thread-safe via Arc + DashMap, eine Shard-Sperre je Gruppe statt einer
/// globalen Sperre. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct GroupRouter {
    gruppen: Arc<DashMap<UserId, Vec<ClientSender>>>,
}

impl GroupRouter {
    /// Erstellt einen leeren Router
    pub fn neu() -> Self {
        Self::default()
    }

    /// Nimmt eine Verbindung in die Gruppe ihres Benutzers auf
    ///
    /// Idempotent je `ConnectionId`: ein erneuter Aufruf ersetzt den
    /// bestehenden Eintrag.
    pub fn beitreten(&self, sender: ClientSender) {
        let user_id = sender.user_id;
        let connection_id = sender.connection_id;

        let mut gruppe = self.gruppen.entry(user_id).or_default();
        match gruppe
            .iter_mut()
            .find(|s| s.connection_id == connection_id)
        {
            Some(bestehend) => *bestehend = sender,
            None => gruppe.push(sender),
        }

        tracing::debug!(
            user_id = %user_id,
            connection_id = %connection_id,
            verbindungen = gruppe.len(),
            "Verbindung der Gruppe beigetreten"
        );
    }

    /// Entfernt eine Verbindung; leere Gruppen werden verworfen
    pub fn verlassen(&self, user_id: &UserId, connection_id: &ConnectionId) {
        let leer = match self.gruppen.get_mut(user_id) {
            Some(mut gruppe) => {
                gruppe.retain(|s| &s.connection_id != connection_id);
                gruppe.is_empty()
            }
            None => return,
        };

        if leer {
            self.gruppen.remove_if(user_id, |_, gruppe| gruppe.is_empty());
        }

        tracing::debug!(
            user_id = %user_id,
            connection_id = %connection_id,
            "Verbindung hat die Gruppe verlassen"
        );
    }

    /// Sendet ein Ereignis an alle Verbindungen eines Benutzers
    ///
    /// Gibt die Anzahl der erreichten Verbindungen zurueck.
    pub fn publish(&self, user_id: &UserId, nachricht: ServerMessage) -> usize {
        let sender = match self.gruppen.get(user_id) {
            Some(gruppe) => gruppe.clone(),
            None => {
                tracing::trace!(user_id = %user_id, "Keine Verbindung – Ereignis verworfen");
                return 0;
            }
        };

        sender
            .iter()
            .filter(|s| s.senden(nachricht.clone()))
            .count()
    }

    /// Anzahl der Verbindungen eines Benutzers
    pub fn verbindungen(&self, user_id: &UserId) -> usize {
        self.gruppen.get(user_id).map(|g| g.len()).unwrap_or(0)
    }

    /// Anzahl der Benutzer mit mindestens einer Verbindung
    pub fn gruppen_anzahl(&self) -> usize {
        self.gruppen.len()
    }

    /// Prueft ob ein Benutzer erreichbar ist
    pub fn ist_verbunden(&self, user_id: &UserId) -> bool {
        self.gruppen.contains_key(user_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
