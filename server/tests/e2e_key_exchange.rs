//! End-to-End: Server ueber TCP, zwei bzw. drei echte Client-Sitzungen
//!
//! Laeuft vollstaendig in einer `LocalSet`, der Server nutzt eine
//! In-Memory-Datenbank.

use std::sync::Arc;
use std::time::Duration;

use parley_auth::AuthService;
use parley_client::{ClientError, ClientSession, Inhalt, ServerVerbindung};
use parley_crypto::SchluesselStatus;
use parley_db::SqliteDb;
use parley_protocol::{ErrorCode, ServerEvent};
use parley_server::{config::ServerConfig, Server};
use tokio::sync::watch;
use tokio::task::LocalSet;

const WARTEZEIT: Duration = Duration::from_secs(5);

struct Umgebung {
    addr: std::net::SocketAddr,
    auth: AuthService<SqliteDb>,
    _shutdown: watch::Sender<bool>,
}

impl Umgebung {
    async fn starten() -> Self {
        let server = Server::neu(ServerConfig::default());
        let db = Arc::new(SqliteDb::in_memory().await.unwrap());
        let signaling = server
            .signaling_binden(Arc::clone(&db), "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = signaling.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::task::spawn_local(signaling.accept_loop(shutdown_rx));

        Self {
            addr,
            auth: AuthService::neu(db),
            _shutdown: shutdown_tx,
        }
    }

    async fn teilnehmer(&self, name: &str) -> Teilnehmer {
        let (_, token) = self.auth.benutzer_anlegen(name).await.unwrap();
        let mut verbindung = ServerVerbindung::verbinden(self.addr).await.unwrap();
        let info = verbindung.authentifizieren(&token).await.unwrap();
        Teilnehmer {
            verbindung,
            sitzung: ClientSession::neu(info.user_id, info.username),
        }
    }
}

struct Teilnehmer {
    verbindung: ServerVerbindung,
    sitzung: ClientSession,
}

impl Teilnehmer {
    /// Empfaengt ein Ereignis, verarbeitet es und sendet die Reaktionen
    async fn schritt(&mut self) -> ServerEvent {
        let nachricht = tokio::time::timeout(WARTEZEIT, self.verbindung.empfangen())
            .await
            .expect("Timeout beim Warten auf ein Ereignis")
            .unwrap();
        let event = nachricht.event.clone();
        let antworten = self.sitzung.ereignis_verarbeiten(nachricht.event);
        self.verbindung.alle_senden(antworten).await.unwrap();
        event
    }
}

#[tokio::test]
async fn freundschaft_handshake_und_verschluesselte_nachricht() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten().await;
            let mut alice = umgebung.teilnehmer("alice").await;
            let mut bob = umgebung.teilnehmer("bob").await;

            let einladung = alice.sitzung.freund_einladen(bob.sitzung.user_id());
            alice.verbindung.senden(einladung).await.unwrap();

            assert!(matches!(bob.schritt().await, ServerEvent::FriendRequest(_)));
            let anfrage_id = bob.sitzung.einladungen()[0].id;
            let antwort = bob.sitzung.einladung_beantworten(anfrage_id, true).unwrap();
            bob.verbindung.senden(antwort).await.unwrap();

            // bob wird Admin: Schluessel erzeugen und zuhoeren
            let conv = match bob.schritt().await {
                ServerEvent::NewConversation(neu) => neu.conversation_id,
                andere => panic!("new_conversation erwartet, war {andere:?}"),
            };
            assert_eq!(bob.sitzung.schluessel_status(conv), SchluesselStatus::HatSchluessel);

            // alice: NO_KEY -> AWAITING_KEY
            assert_eq!(alice.sitzung.schluessel_status(conv), SchluesselStatus::KeinSchluessel);
            assert!(matches!(alice.schritt().await, ServerEvent::ResponseFRequest(_)));
            assert_eq!(
                alice.sitzung.schluessel_status(conv),
                SchluesselStatus::WarteAufSchluessel
            );

            assert!(matches!(bob.schritt().await, ServerEvent::KeyRequest(_)));

            // AWAITING_KEY -> HAS_KEY
            assert!(matches!(alice.schritt().await, ServerEvent::KeyResponse(_)));
            assert_eq!(alice.sitzung.schluessel_status(conv), SchluesselStatus::HatSchluessel);
            assert_eq!(
                alice.sitzung.engine().schluessel(conv).unwrap().as_bytes(),
                bob.sitzung.engine().schluessel(conv).unwrap().as_bytes()
            );

            let oeffnen = alice.sitzung.konversation_oeffnen(conv);
            assert_eq!(oeffnen.len(), 1, "mit Schluessel nur join_conversation");
            alice.verbindung.alle_senden(oeffnen).await.unwrap();

            let nachricht = alice.sitzung.nachricht_senden(conv, "Hallo Bob").unwrap();
            alice.verbindung.senden(nachricht).await.unwrap();

            // Der Server sieht nur Chiffrat
            match bob.schritt().await {
                ServerEvent::NewMessage(m) => assert_ne!(m.content, "Hallo Bob"),
                andere => panic!("new_message erwartet, war {andere:?}"),
            }
            let eintraege = bob.sitzung.log().eintraege(conv);
            assert_eq!(eintraege.len(), 1);
            assert_eq!(eintraege[0].inhalt, Inhalt::Klartext("Hallo Bob".into()));
            assert_eq!(eintraege[0].author, "alice");

            // Der Autor hoert selbst zu und bekommt die Nachricht ebenfalls
            assert!(matches!(alice.schritt().await, ServerEvent::NewMessage(_)));
            assert_eq!(
                alice.sitzung.log().eintraege(conv)[0].inhalt,
                Inhalt::Klartext("Hallo Bob".into())
            );
        })
        .await;
}

#[tokio::test]
async fn gruppe_verteilt_denselben_schluessel() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten().await;
            let mut alice = umgebung.teilnehmer("alice").await;
            let mut bob = umgebung.teilnehmer("bob").await;
            let mut carol = umgebung.teilnehmer("carol").await;

            let gruppe = alice.sitzung.gruppe_erstellen(
                "Projekt",
                vec![bob.sitzung.user_id(), carol.sitzung.user_id()],
            );
            alice.verbindung.senden(gruppe).await.unwrap();

            let conv = match alice.schritt().await {
                ServerEvent::NewConversation(neu) => neu.conversation_id,
                andere => panic!("new_conversation erwartet, war {andere:?}"),
            };

            for mitglied in [&mut bob, &mut carol] {
                assert!(matches!(mitglied.schritt().await, ServerEvent::CreateGroupNotify(_)));
                assert_eq!(mitglied.sitzung.log().titel(conv), Some("Projekt"));
            }

            // Zwei Anfragen beim Admin, beide beantwortet
            for _ in 0..2 {
                assert!(matches!(alice.schritt().await, ServerEvent::KeyRequest(_)));
            }

            let admin_schluessel = alice.sitzung.engine().schluessel(conv).unwrap().as_bytes().to_vec();
            for mitglied in [&mut bob, &mut carol] {
                assert!(matches!(mitglied.schritt().await, ServerEvent::KeyResponse(_)));
                assert_eq!(
                    mitglied.sitzung.engine().schluessel(conv).unwrap().as_bytes(),
                    admin_schluessel.as_slice()
                );
            }
        })
        .await;
}

#[tokio::test]
async fn falsches_token_wird_abgewiesen() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten().await;
            let mut verbindung = ServerVerbindung::verbinden(umgebung.addr).await.unwrap();

            match verbindung.authentifizieren("gibt-es-nicht").await {
                Err(ClientError::Server { code, .. }) => assert_eq!(code, ErrorCode::Unauthorized),
                andere => panic!("Unauthorized erwartet, war {andere:?}"),
            }
        })
        .await;
}
