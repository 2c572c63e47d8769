//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt alle geteilten Services und den Gruppen-Router als Arc-Referenzen,
//! die sicher zwischen den Verbindungs-Tasks geteilt werden koennen.

use parley_auth::AuthService;
use parley_chat::{BeziehungService, ChatService};
use parley_db::ParleyRepository;
use parley_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::broadcast::GroupRouter;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale Anzahl gleichzeitiger Verbindungen
    pub max_clients: usize,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Frist fuer das erste (Authentifizierungs-)Frame in Sekunden
    pub auth_timeout_sek: u64,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_groesse: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_clients: 512,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            auth_timeout_sek: 10,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Gemeinsamer Server-Zustand (Arc-geteilt)
pub struct SignalingState<R: ParleyRepository> {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Auth-Service (Token zu Benutzer)
    pub auth_service: AuthService<R>,
    /// Message Relay
    pub chat_service: Arc<ChatService<R>>,
    /// Einladungen, Antworten, Gruppen
    pub beziehungen: Arc<BeziehungService<R>>,
    /// Verbindungsregister (Benutzer -> Verbindungen)
    pub router: GroupRouter,
    /// Anzahl offener TCP-Verbindungen (authentifiziert oder nicht)
    aktive_verbindungen: AtomicUsize,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl<R: ParleyRepository> SignalingState<R> {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, repo: Arc<R>) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            auth_service: AuthService::neu(Arc::clone(&repo)),
            chat_service: ChatService::neu(Arc::clone(&repo)),
            beziehungen: BeziehungService::neu(repo),
            router: GroupRouter::neu(),
            aktive_verbindungen: AtomicUsize::new(0),
            start_time: Instant::now(),
        })
    }

    /// Reserviert einen Verbindungsplatz; `false` wenn der Server voll ist
    pub fn verbindung_reservieren(&self) -> bool {
        let max = self.config.max_clients;
        self.aktive_verbindungen
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok()
    }

    /// Gibt einen Verbindungsplatz wieder frei
    pub fn verbindung_freigeben(&self) {
        self.aktive_verbindungen.fetch_sub(1, Ordering::AcqRel);
    }

    /// Anzahl offener Verbindungen
    pub fn verbindungs_anzahl(&self) -> usize {
        self.aktive_verbindungen.load(Ordering::Acquire)
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
