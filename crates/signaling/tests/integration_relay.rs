//! Integrationstests fuer den Signaling-Server ueber echte TCP-Verbindungen

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parley_auth::AuthService;
use parley_core::types::{ConversationId, UserId};
use parley_db::SqliteDb;
use parley_protocol::control::{
    AuthenticateRequest, CreateGroupRequest, FriendResponseRequest, InviteFriendRequest,
    JoinConversationRequest, KeyRequest, KeyResponse, MessageRequest, PingMessage,
};
use parley_protocol::{
    ClientCodec, ClientEvent, ClientMessage, ErrorCode, KeyFlag, ServerEvent, ServerMessage,
};
use parley_signaling::{SignalingConfig, SignalingServer, SignalingState};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::LocalSet;
use tokio_util::codec::Framed;
use uuid::Uuid;

const WARTEZEIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

struct Umgebung {
    addr: SocketAddr,
    auth: AuthService<SqliteDb>,
    _shutdown: watch::Sender<bool>,
}

impl Umgebung {
    /// Startet den Server im aktuellen LocalSet
    async fn starten(config: SignalingConfig) -> Self {
        let db = Arc::new(SqliteDb::in_memory().await.unwrap());
        let state = SignalingState::neu(config, Arc::clone(&db));
        let server = SignalingServer::binden(state, "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::task::spawn_local(server.accept_loop(shutdown_rx));

        Self {
            addr,
            auth: AuthService::neu(db),
            _shutdown: shutdown_tx,
        }
    }

    async fn benutzer(&self, name: &str) -> (UserId, String) {
        let (identitaet, token) = self.auth.benutzer_anlegen(name).await.unwrap();
        (identitaet.user_id, token)
    }

    async fn anmelden(&self, token: &str) -> TestClient {
        let mut client = TestClient::verbinden(self.addr).await;
        client
            .senden(ClientEvent::Authenticate(AuthenticateRequest {
                token: token.to_string(),
            }))
            .await;
        match client.empfangen().await.event {
            ServerEvent::Authenticated(_) => client,
            andere => panic!("authenticated erwartet, war {andere:?}"),
        }
    }
}

struct TestClient {
    framed: Framed<TcpStream, ClientCodec>,
    naechste_id: u32,
}

impl TestClient {
    async fn verbinden(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            framed: Framed::new(stream, ClientCodec::new()),
            naechste_id: 1,
        }
    }

    async fn senden(&mut self, event: ClientEvent) -> u32 {
        let id = self.naechste_id;
        self.naechste_id += 1;
        self.framed.send(ClientMessage::new(id, event)).await.unwrap();
        id
    }

    /// Naechstes Ereignis, Server-Pings werden uebersprungen
    async fn empfangen(&mut self) -> ServerMessage {
        loop {
            let nachricht = tokio::time::timeout(WARTEZEIT, self.framed.next())
                .await
                .expect("Timeout beim Warten auf ein Ereignis")
                .expect("Verbindung unerwartet geschlossen")
                .expect("Frame-Fehler");
            if !matches!(nachricht.event, ServerEvent::Ping(_)) {
                return nachricht;
            }
        }
    }

    /// Wartet bis alle vorher gesendeten Ereignisse verarbeitet sind
    async fn synchronisieren(&mut self) {
        let id = self
            .senden(ClientEvent::Ping(PingMessage { timestamp_ms: 1 }))
            .await;
        let nachricht = self.empfangen().await;
        assert!(
            nachricht.request_id == id && matches!(nachricht.event, ServerEvent::Pong(_)),
            "Unerwartetes Ereignis vor dem Pong: {nachricht:?}"
        );
    }

    /// `true` wenn innerhalb kurzer Zeit kein Ereignis eintrifft
    async fn ist_still(&mut self) -> bool {
        tokio::time::timeout(Duration::from_millis(200), self.framed.next())
            .await
            .is_err()
    }

    async fn geschlossen(&mut self) -> bool {
        matches!(
            tokio::time::timeout(WARTEZEIT, self.framed.next()).await,
            Ok(None) | Ok(Some(Err(_)))
        )
    }
}

fn fehler_code(nachricht: &ServerMessage) -> ErrorCode {
    match &nachricht.event {
        ServerEvent::Error(e) => e.code,
        andere => panic!("error erwartet, war {andere:?}"),
    }
}

/// alice laedt bob ein, bob nimmt an; liefert die Direkt-Konversation
async fn befreunden(alice: &mut TestClient, bob: &mut TestClient, bob_id: UserId) -> ConversationId {
    alice
        .senden(ClientEvent::InviteFriend(InviteFriendRequest { friend_id: bob_id }))
        .await;
    let request_id = match bob.empfangen().await.event {
        ServerEvent::FriendRequest(req) => req.request_id,
        andere => panic!("friend_request erwartet, war {andere:?}"),
    };

    bob.senden(ClientEvent::ResponseFriendReq(FriendResponseRequest {
        id: request_id,
        response: true,
    }))
    .await;

    let conversation_id = match bob.empfangen().await.event {
        ServerEvent::NewConversation(n) => n.conversation_id,
        andere => panic!("new_conversation erwartet, war {andere:?}"),
    };
    match alice.empfangen().await.event {
        ServerEvent::ResponseFRequest(r) => {
            assert!(r.response);
            assert_eq!(r.sender, "bob");
            assert_eq!(r.conversation_id, Some(conversation_id));
        }
        andere => panic!("response_f_request erwartet, war {andere:?}"),
    }
    conversation_id
}

// ---------------------------------------------------------------------------
// Anmeldung
// ---------------------------------------------------------------------------

#[tokio::test]
async fn falsches_token_wird_abgewiesen() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten(SignalingConfig::default()).await;

            let mut client = TestClient::verbinden(umgebung.addr).await;
            let id = client
                .senden(ClientEvent::Authenticate(AuthenticateRequest {
                    token: "gibt-es-nicht".into(),
                }))
                .await;

            let antwort = client.empfangen().await;
            assert_eq!(antwort.request_id, id);
            assert_eq!(fehler_code(&antwort), ErrorCode::Unauthorized);
            assert!(client.geschlossen().await, "Verbindung muss geschlossen werden");
        })
        .await;
}

#[tokio::test]
async fn erstes_frame_muss_authentifizierung_sein() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten(SignalingConfig::default()).await;

            let mut client = TestClient::verbinden(umgebung.addr).await;
            client
                .senden(ClientEvent::JoinConversation(JoinConversationRequest {
                    conversation_id: ConversationId(Uuid::new_v4()),
                }))
                .await;

            assert_eq!(fehler_code(&client.empfangen().await), ErrorCode::Unauthorized);
            assert!(client.geschlossen().await);
        })
        .await;
}

#[tokio::test]
async fn ohne_anmeldung_greift_auth_timeout() {
    LocalSet::new()
        .run_until(async {
            let config = SignalingConfig {
                auth_timeout_sek: 1,
                ..Default::default()
            };
            let umgebung = Umgebung::starten(config).await;

            let mut client = TestClient::verbinden(umgebung.addr).await;
            assert_eq!(fehler_code(&client.empfangen().await), ErrorCode::Unauthorized);
            assert!(client.geschlossen().await);
        })
        .await;
}

#[tokio::test]
async fn server_voll_lehnt_weitere_verbindung_ab() {
    LocalSet::new()
        .run_until(async {
            let config = SignalingConfig {
                max_clients: 1,
                ..Default::default()
            };
            let umgebung = Umgebung::starten(config).await;
            let (_, token) = umgebung.benutzer("alice").await;

            let _erste = umgebung.anmelden(&token).await;

            let mut zweite = TestClient::verbinden(umgebung.addr).await;
            assert_eq!(fehler_code(&zweite.empfangen().await), ErrorCode::InternalError);
            assert!(zweite.geschlossen().await);
        })
        .await;
}

// ---------------------------------------------------------------------------
// Beziehungen
// ---------------------------------------------------------------------------

#[tokio::test]
async fn einladung_und_annahme() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten(SignalingConfig::default()).await;
            let (_, alice_token) = umgebung.benutzer("alice").await;
            let (bob_id, bob_token) = umgebung.benutzer("bob").await;

            let mut alice = umgebung.anmelden(&alice_token).await;
            let mut bob = umgebung.anmelden(&bob_token).await;

            befreunden(&mut alice, &mut bob, bob_id).await;

            // Bereits befreundet: nichts wird gesendet
            alice
                .senden(ClientEvent::InviteFriend(InviteFriendRequest { friend_id: bob_id }))
                .await;
            alice.synchronisieren().await;
            assert!(bob.ist_still().await);
        })
        .await;
}

#[tokio::test]
async fn gegenseitige_einladungen_ergeben_eine_konversation() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten(SignalingConfig::default()).await;
            let (alice_id, alice_token) = umgebung.benutzer("alice").await;
            let (bob_id, bob_token) = umgebung.benutzer("bob").await;

            let mut alice = umgebung.anmelden(&alice_token).await;
            let mut bob = umgebung.anmelden(&bob_token).await;

            bob.senden(ClientEvent::InviteFriend(InviteFriendRequest { friend_id: alice_id }))
                .await;
            let von_bob = match alice.empfangen().await.event {
                ServerEvent::FriendRequest(req) => req.request_id,
                andere => panic!("friend_request erwartet, war {andere:?}"),
            };

            // alice laedt ebenfalls ein, bob nimmt zuerst an
            befreunden(&mut alice, &mut bob, bob_id).await;

            alice
                .senden(ClientEvent::ResponseFriendReq(FriendResponseRequest {
                    id: von_bob,
                    response: true,
                }))
                .await;
            match bob.empfangen().await.event {
                ServerEvent::ResponseFRequest(r) => {
                    assert!(r.response);
                    assert_eq!(r.sender, "alice");
                    assert!(r.conversation_id.is_none());
                }
                andere => panic!("response_f_request erwartet, war {andere:?}"),
            }

            // Kein zweites new_conversation fuer alice
            alice.synchronisieren().await;
        })
        .await;
}

#[tokio::test]
async fn doppelte_einladung_hat_dieselbe_id() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten(SignalingConfig::default()).await;
            let (_, alice_token) = umgebung.benutzer("alice").await;
            let (bob_id, bob_token) = umgebung.benutzer("bob").await;

            let mut alice = umgebung.anmelden(&alice_token).await;
            let mut bob = umgebung.anmelden(&bob_token).await;

            let mut ids = Vec::new();
            for _ in 0..2 {
                alice
                    .senden(ClientEvent::InviteFriend(InviteFriendRequest { friend_id: bob_id }))
                    .await;
                match bob.empfangen().await.event {
                    ServerEvent::FriendRequest(req) => ids.push(req.request_id),
                    andere => panic!("friend_request erwartet, war {andere:?}"),
                }
            }
            assert_eq!(ids[0], ids[1]);
        })
        .await;
}

#[tokio::test]
async fn offene_einladung_wird_nach_anmeldung_nachgeliefert() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten(SignalingConfig::default()).await;
            let (_, alice_token) = umgebung.benutzer("alice").await;
            let (bob_id, bob_token) = umgebung.benutzer("bob").await;

            let mut alice = umgebung.anmelden(&alice_token).await;
            alice
                .senden(ClientEvent::InviteFriend(InviteFriendRequest { friend_id: bob_id }))
                .await;
            alice.synchronisieren().await;

            let mut bob = umgebung.anmelden(&bob_token).await;
            match bob.empfangen().await.event {
                ServerEvent::FriendRequest(req) => assert_eq!(req.sender, "alice"),
                andere => panic!("friend_request erwartet, war {andere:?}"),
            }
        })
        .await;
}

#[tokio::test]
async fn doppelte_antwort_ist_konflikt() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten(SignalingConfig::default()).await;
            let (_, alice_token) = umgebung.benutzer("alice").await;
            let (bob_id, bob_token) = umgebung.benutzer("bob").await;

            let mut alice = umgebung.anmelden(&alice_token).await;
            let mut bob = umgebung.anmelden(&bob_token).await;

            alice
                .senden(ClientEvent::InviteFriend(InviteFriendRequest { friend_id: bob_id }))
                .await;
            let request_id = match bob.empfangen().await.event {
                ServerEvent::FriendRequest(req) => req.request_id,
                andere => panic!("friend_request erwartet, war {andere:?}"),
            };

            bob.senden(ClientEvent::ResponseFriendReq(FriendResponseRequest {
                id: request_id,
                response: false,
            }))
            .await;
            match alice.empfangen().await.event {
                ServerEvent::ResponseFRequest(r) => {
                    assert!(!r.response);
                    assert!(r.conversation_id.is_none());
                }
                andere => panic!("response_f_request erwartet, war {andere:?}"),
            }

            let id = bob
                .senden(ClientEvent::ResponseFriendReq(FriendResponseRequest {
                    id: request_id,
                    response: true,
                }))
                .await;
            let antwort = bob.empfangen().await;
            assert_eq!(antwort.request_id, id);
            assert_eq!(fehler_code(&antwort), ErrorCode::Conflict);
        })
        .await;
}

#[tokio::test]
async fn gruppe_meldet_admin_zuerst_und_ueberspringt_unbekannte() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten(SignalingConfig::default()).await;
            let (alice_id, alice_token) = umgebung.benutzer("alice").await;
            let (bob_id, bob_token) = umgebung.benutzer("bob").await;

            let mut alice = umgebung.anmelden(&alice_token).await;
            let mut bob = umgebung.anmelden(&bob_token).await;

            alice
                .senden(ClientEvent::CreateGroup(CreateGroupRequest {
                    title: "Projekt".into(),
                    admin_id: alice_id,
                    users_ids: vec![UserId(Uuid::new_v4()), bob_id],
                }))
                .await;

            let conversation_id = match alice.empfangen().await.event {
                ServerEvent::NewConversation(n) => n.conversation_id,
                andere => panic!("new_conversation erwartet, war {andere:?}"),
            };
            match bob.empfangen().await.event {
                ServerEvent::CreateGroupNotify(n) => {
                    assert_eq!(n.title, "Projekt");
                    assert_eq!(n.admin, "alice");
                    assert_eq!(n.conversation_id, conversation_id);
                }
                andere => panic!("create_group_notify erwartet, war {andere:?}"),
            }
        })
        .await;
}

#[tokio::test]
async fn gruppe_fuer_fremden_admin_verboten() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten(SignalingConfig::default()).await;
            let (_, alice_token) = umgebung.benutzer("alice").await;
            let (bob_id, _) = umgebung.benutzer("bob").await;

            let mut alice = umgebung.anmelden(&alice_token).await;
            alice
                .senden(ClientEvent::CreateGroup(CreateGroupRequest {
                    title: "Fremd".into(),
                    admin_id: bob_id,
                    users_ids: vec![],
                }))
                .await;
            assert_eq!(fehler_code(&alice.empfangen().await), ErrorCode::Forbidden);
        })
        .await;
}

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zuhoerer_bekommen_nachricht_andere_nur_hinweis() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten(SignalingConfig::default()).await;
            let (alice_id, alice_token) = umgebung.benutzer("alice").await;
            let (bob_id, bob_token) = umgebung.benutzer("bob").await;

            let mut alice = umgebung.anmelden(&alice_token).await;
            let mut bob = umgebung.anmelden(&bob_token).await;
            let conv = befreunden(&mut alice, &mut bob, bob_id).await;

            // Niemand hoert zu
            alice
                .senden(ClientEvent::Message(MessageRequest {
                    conversation_id: conv,
                    content: "eins".into(),
                }))
                .await;
            for client in [&mut alice, &mut bob] {
                match client.empfangen().await.event {
                    ServerEvent::NewNotification(n) => assert_eq!(n.conversation_id, conv),
                    andere => panic!("new_notification erwartet, war {andere:?}"),
                }
            }

            bob.senden(ClientEvent::JoinConversation(JoinConversationRequest {
                conversation_id: conv,
            }))
            .await;
            bob.synchronisieren().await;

            alice
                .senden(ClientEvent::Message(MessageRequest {
                    conversation_id: conv,
                    content: "zwei".into(),
                }))
                .await;

            match bob.empfangen().await.event {
                ServerEvent::NewMessage(m) => {
                    assert_eq!(m.conversation_id, conv);
                    assert_eq!(m.content, "zwei");
                    assert_eq!(m.author.id, alice_id);
                    assert_eq!(m.author.username, "alice");
                }
                andere => panic!("new_message erwartet, war {andere:?}"),
            }
            assert!(matches!(
                alice.empfangen().await.event,
                ServerEvent::NewNotification(_)
            ));
        })
        .await;
}

#[tokio::test]
async fn alle_verbindungen_eines_benutzers_werden_erreicht() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten(SignalingConfig::default()).await;
            let (_, alice_token) = umgebung.benutzer("alice").await;
            let (bob_id, bob_token) = umgebung.benutzer("bob").await;

            let mut alice = umgebung.anmelden(&alice_token).await;
            let mut bob = umgebung.anmelden(&bob_token).await;
            let conv = befreunden(&mut alice, &mut bob, bob_id).await;

            let mut bob_zweit = umgebung.anmelden(&bob_token).await;

            alice
                .senden(ClientEvent::Message(MessageRequest {
                    conversation_id: conv,
                    content: "hallo".into(),
                }))
                .await;

            for client in [&mut bob, &mut bob_zweit] {
                assert!(matches!(
                    client.empfangen().await.event,
                    ServerEvent::NewNotification(_)
                ));
            }
        })
        .await;
}

#[tokio::test]
async fn nicht_mitglied_bekommt_forbidden() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten(SignalingConfig::default()).await;
            let (_, alice_token) = umgebung.benutzer("alice").await;
            let (bob_id, bob_token) = umgebung.benutzer("bob").await;
            let (_, eve_token) = umgebung.benutzer("eve").await;

            let mut alice = umgebung.anmelden(&alice_token).await;
            let mut bob = umgebung.anmelden(&bob_token).await;
            let mut eve = umgebung.anmelden(&eve_token).await;
            let conv = befreunden(&mut alice, &mut bob, bob_id).await;

            let id = eve
                .senden(ClientEvent::Message(MessageRequest {
                    conversation_id: conv,
                    content: "rein".into(),
                }))
                .await;
            let antwort = eve.empfangen().await;
            assert_eq!(antwort.request_id, id);
            assert_eq!(fehler_code(&antwort), ErrorCode::Forbidden);

            assert!(alice.ist_still().await);
            assert!(bob.ist_still().await);

            eve.senden(ClientEvent::Message(MessageRequest {
                conversation_id: ConversationId(Uuid::new_v4()),
                content: "rein".into(),
            }))
            .await;
            assert_eq!(fehler_code(&eve.empfangen().await), ErrorCode::NotFound);
        })
        .await;
}

// ---------------------------------------------------------------------------
// Schluessel-Relay
// ---------------------------------------------------------------------------

#[tokio::test]
async fn schluessel_ereignisse_gehen_nur_an_admin_und_anfragenden() {
    LocalSet::new()
        .run_until(async {
            let umgebung = Umgebung::starten(SignalingConfig::default()).await;
            let (alice_id, alice_token) = umgebung.benutzer("alice").await;
            let (bob_id, bob_token) = umgebung.benutzer("bob").await;
            let (_, eve_token) = umgebung.benutzer("eve").await;

            let mut alice = umgebung.anmelden(&alice_token).await;
            let mut bob = umgebung.anmelden(&bob_token).await;
            let mut eve = umgebung.anmelden(&eve_token).await;

            // bob nimmt an und ist damit Admin
            let conv = befreunden(&mut alice, &mut bob, bob_id).await;

            alice
                .senden(ClientEvent::KeyRequest(KeyRequest {
                    conversation_id: conv,
                    dh_key: "QUxJQ0U=".into(),
                }))
                .await;
            match bob.empfangen().await.event {
                ServerEvent::KeyRequest(req) => {
                    assert_eq!(req.conversation_id, conv);
                    assert_eq!(req.user_id, alice_id);
                    assert_eq!(req.dh_key, "QUxJQ0U=");
                }
                andere => panic!("key_request erwartet, war {andere:?}"),
            }

            let antwort = KeyResponse {
                conversation_id: conv,
                user_id: alice_id,
                dh_key: "Qk9C".into(),
                rsa_key: "U0NITFVFU1NFTA==".into(),
                flag: KeyFlag::Generated,
            };
            bob.senden(ClientEvent::KeyResponse(antwort.clone())).await;
            match alice.empfangen().await.event {
                ServerEvent::KeyResponse(r) => assert_eq!(r, antwort),
                andere => panic!("key_response erwartet, war {andere:?}"),
            }

            // Nur der Admin darf antworten
            eve.senden(ClientEvent::KeyResponse(antwort.clone())).await;
            assert_eq!(fehler_code(&eve.empfangen().await), ErrorCode::Forbidden);
            assert!(alice.ist_still().await);

            // Nicht-Mitglieder duerfen nicht anfragen
            eve.senden(ClientEvent::KeyRequest(KeyRequest {
                conversation_id: conv,
                dh_key: "RVZF".into(),
            }))
            .await;
            assert_eq!(fehler_code(&eve.empfangen().await), ErrorCode::Forbidden);
            assert!(bob.ist_still().await);
        })
        .await;
}
