//! Client-Sitzung
//!
//! Verarbeitet jedes Server-Ereignis mit einem erschoepfenden `match` und
//! liefert die Client-Ereignisse, die als Reaktion gesendet werden muessen.
//! Die Sitzung besitzt die `KeyExchangeEngine` des Benutzers allein; es
//! gibt keine Locks.

use chrono::{DateTime, Utc};
use parley_core::types::{ConversationId, FriendRequestId, UserId};
use parley_crypto::{AntwortErgebnis, KeyExchangeEngine, SchluesselStatus};
use parley_protocol::control::{
    CreateGroupRequest, FriendRequestNotify, FriendResponseRequest, InviteFriendRequest,
    JoinConversationRequest, KeyRequestNotify, MessageRequest, NewMessage, PongMessage,
};
use parley_protocol::{ClientEvent, ServerEvent};

use crate::error::ClientResult;
use crate::konversations_log::{Inhalt, KonversationsLog, LogEintrag};

/// Eingegangene, noch nicht beantwortete Freundschaftsanfrage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffeneEinladung {
    pub id: FriendRequestId,
    pub absender: String,
    pub zeitpunkt: DateTime<Utc>,
}

/// Zustand eines angemeldeten Benutzers
#[derive(Debug)]
pub struct ClientSession {
    user_id: UserId,
    username: String,
    engine: KeyExchangeEngine,
    log: KonversationsLog,
    einladungen: Vec<OffeneEinladung>,
}

impl ClientSession {
    pub fn neu(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            engine: KeyExchangeEngine::neu(user_id),
            log: KonversationsLog::neu(),
            einladungen: Vec::new(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn log(&self) -> &KonversationsLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut KonversationsLog {
        &mut self.log
    }

    pub fn schluessel_status(&self, conversation_id: ConversationId) -> SchluesselStatus {
        self.engine.status(conversation_id)
    }

    pub fn engine(&self) -> &KeyExchangeEngine {
        &self.engine
    }

    pub fn einladungen(&self) -> &[OffeneEinladung] {
        &self.einladungen
    }

    // -----------------------------------------------------------------------
    // Eingehende Ereignisse
    // -----------------------------------------------------------------------

    /// Verarbeitet ein Server-Ereignis
    ///
    /// Gibt die Ereignisse zurueck, die der Aufrufer in dieser Reihenfolge
    /// an den Server senden muss.
    pub fn ereignis_verarbeiten(&mut self, event: ServerEvent) -> Vec<ClientEvent> {
        match event {
            ServerEvent::Authenticated(info) => {
                tracing::debug!(user_id = %info.user_id, "Erneute Anmeldebestaetigung ignoriert");
                Vec::new()
            }
            ServerEvent::NewConversation(neu) => {
                // Empfaenger ist Admin der neuen Konversation
                self.engine.schluessel_erzeugen(neu.conversation_id);
                vec![beitreten(neu.conversation_id)]
            }
            ServerEvent::CreateGroupNotify(hinweis) => {
                tracing::info!(
                    conversation_id = %hinweis.conversation_id,
                    admin = %hinweis.admin,
                    "Zu Gruppe hinzugefuegt"
                );
                self.log.titel_setzen(hinweis.conversation_id, hinweis.title);
                self.schluessel_anfragen(hinweis.conversation_id)
            }
            ServerEvent::ResponseFRequest(antwort) => match antwort.conversation_id {
                Some(conversation_id) if antwort.response => {
                    self.log.titel_setzen(
                        conversation_id,
                        format!("{}, {}", self.username, antwort.sender),
                    );
                    self.schluessel_anfragen(conversation_id)
                }
                _ => {
                    tracing::info!(von = %antwort.sender, angenommen = antwort.response, "Antwort auf Freundschaftsanfrage");
                    Vec::new()
                }
            },
            ServerEvent::KeyRequest(anfrage) => self.schluessel_anfrage_beantworten(anfrage),
            ServerEvent::KeyResponse(antwort) => {
                if self.engine.antwort_verarbeiten(&antwort) == AntwortErgebnis::Uebernommen {
                    tracing::info!(conversation_id = %antwort.conversation_id, "Schluessel erhalten");
                }
                Vec::new()
            }
            ServerEvent::NewMessage(nachricht) => {
                self.nachricht_empfangen(nachricht);
                Vec::new()
            }
            ServerEvent::NewNotification(hinweis) => {
                self.log.ungelesen_erhoehen(hinweis.conversation_id);
                Vec::new()
            }
            ServerEvent::FriendRequest(anfrage) => {
                self.einladung_merken(anfrage);
                Vec::new()
            }
            ServerEvent::Error(fehler) => {
                tracing::warn!(code = ?fehler.code, meldung = %fehler.message, "Fehler vom Server");
                Vec::new()
            }
            ServerEvent::Ping(ping) => vec![ClientEvent::Pong(PongMessage {
                echo_timestamp_ms: ping.timestamp_ms,
                timestamp_ms: parley_protocol::control::jetzt_ms(),
            })],
            ServerEvent::Pong(_) => Vec::new(),
        }
    }

    fn schluessel_anfragen(&mut self, conversation_id: ConversationId) -> Vec<ClientEvent> {
        self.engine
            .schluessel_anfordern(conversation_id)
            .map(ClientEvent::KeyRequest)
            .into_iter()
            .collect()
    }

    fn schluessel_anfrage_beantworten(&mut self, anfrage: KeyRequestNotify) -> Vec<ClientEvent> {
        match self
            .engine
            .anfrage_beantworten(anfrage.conversation_id, anfrage.user_id, &anfrage.dh_key)
        {
            Ok(antwort) => vec![ClientEvent::KeyResponse(antwort)],
            Err(e) => {
                tracing::warn!(
                    conversation_id = %anfrage.conversation_id,
                    anfragender = %anfrage.user_id,
                    fehler = %e,
                    "Schluessel-Anfrage nicht beantwortbar"
                );
                Vec::new()
            }
        }
    }

    fn nachricht_empfangen(&mut self, nachricht: NewMessage) {
        let conversation_id = nachricht.conversation_id;
        let inhalt = match self.engine.schluessel(conversation_id) {
            Some(schluessel) => match schluessel.entschluesseln(conversation_id, &nachricht.content) {
                Ok(text) => Inhalt::Klartext(text),
                Err(e) => {
                    tracing::debug!(conversation_id = %conversation_id, fehler = %e, "Nachricht nicht entschluesselbar");
                    Inhalt::Unlesbar(nachricht.content)
                }
            },
            None => Inhalt::Klartext(nachricht.content),
        };

        self.log.anhaengen(
            conversation_id,
            LogEintrag {
                author_id: nachricht.author.id,
                author: nachricht.author.username,
                zeitpunkt: nachricht.timestamp,
                inhalt,
            },
        );
    }

    fn einladung_merken(&mut self, anfrage: FriendRequestNotify) {
        if self.einladungen.iter().any(|e| e.id == anfrage.request_id) {
            return;
        }
        tracing::info!(von = %anfrage.sender, "Freundschaftsanfrage erhalten");
        self.einladungen.push(OffeneEinladung {
            id: anfrage.request_id,
            absender: anfrage.sender,
            zeitpunkt: anfrage.timestamp,
        });
    }

    // -----------------------------------------------------------------------
    // Benutzeraktionen
    // -----------------------------------------------------------------------

    /// Oeffnet eine Konversation: zuhoeren und ggf. Schluessel anfordern
    pub fn konversation_oeffnen(&mut self, conversation_id: ConversationId) -> Vec<ClientEvent> {
        self.log.als_gelesen_markieren(conversation_id);

        let mut events = vec![beitreten(conversation_id)];
        if self.engine.status(conversation_id) == SchluesselStatus::KeinSchluessel {
            events.extend(self.schluessel_anfragen(conversation_id));
        }
        events
    }

    /// Verschluesselt mit dem gehaltenen Schluessel, sonst unveraendert
    pub fn nachricht_senden(
        &self,
        conversation_id: ConversationId,
        text: &str,
    ) -> ClientResult<ClientEvent> {
        let content = match self.engine.schluessel(conversation_id) {
            Some(schluessel) => schluessel.verschluesseln(conversation_id, text)?,
            None => {
                tracing::warn!(conversation_id = %conversation_id, "Kein Schluessel, sende unverschluesselt");
                text.to_string()
            }
        };
        Ok(ClientEvent::Message(MessageRequest {
            conversation_id,
            content,
        }))
    }

    /// Beantwortet eine offene Einladung
    ///
    /// `None` wenn die Einladung unbekannt ist.
    pub fn einladung_beantworten(
        &mut self,
        id: FriendRequestId,
        annehmen: bool,
    ) -> Option<ClientEvent> {
        let index = self.einladungen.iter().position(|e| e.id == id)?;
        self.einladungen.remove(index);
        Some(ClientEvent::ResponseFriendReq(FriendResponseRequest {
            id,
            response: annehmen,
        }))
    }

    pub fn freund_einladen(&self, friend_id: UserId) -> ClientEvent {
        ClientEvent::InviteFriend(InviteFriendRequest { friend_id })
    }

    /// Der eigene Benutzer wird Admin der Gruppe
    pub fn gruppe_erstellen(&self, titel: impl Into<String>, mitglieder: Vec<UserId>) -> ClientEvent {
        ClientEvent::CreateGroup(CreateGroupRequest {
            title: titel.into(),
            admin_id: self.user_id,
            users_ids: mitglieder,
        })
    }
}

fn beitreten(conversation_id: ConversationId) -> ClientEvent {
    ClientEvent::JoinConversation(JoinConversationRequest { conversation_id })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parley_protocol::control::{
        AuthorInfo, CreateGroupNotify, FriendResponseNotify, KeyRequest, NewConversation,
        NewNotification, PingMessage,
    };

    fn ist_schluessel_anfrage(event: &ClientEvent) -> Option<&KeyRequest> {
        match event {
            ClientEvent::KeyRequest(anfrage) => Some(anfrage),
            _ => None,
        }
    }

    fn sitzung(name: &str) -> ClientSession {
        ClientSession::neu(UserId::new(), name)
    }

    /// Leitet eine key_request des Mitglieds an den Admin weiter, wie der Server
    fn an_admin(mitglied: &ClientSession, event: &ClientEvent) -> ServerEvent {
        let anfrage = ist_schluessel_anfrage(event).expect("key_request erwartet");
        ServerEvent::KeyRequest(KeyRequestNotify {
            conversation_id: anfrage.conversation_id,
            dh_key: anfrage.dh_key.clone(),
            user_id: mitglied.user_id(),
        })
    }

    fn als_server_event(event: ClientEvent) -> ServerEvent {
        match event {
            ClientEvent::KeyResponse(antwort) => ServerEvent::KeyResponse(antwort),
            andere => panic!("key_response erwartet, war {andere:?}"),
        }
    }

    fn zustellen(autor: &ClientSession, event: ClientEvent) -> ServerEvent {
        match event {
            ClientEvent::Message(m) => ServerEvent::NewMessage(NewMessage {
                conversation_id: m.conversation_id,
                author: AuthorInfo {
                    id: autor.user_id(),
                    username: autor.username().to_string(),
                },
                timestamp: Utc::now(),
                content: m.content,
            }),
            andere => panic!("message erwartet, war {andere:?}"),
        }
    }

    #[test]
    fn neue_konversation_erzeugt_schluessel_und_tritt_bei() {
        let mut bob = sitzung("bob");
        let conv = ConversationId::new();

        let events = bob.ereignis_verarbeiten(ServerEvent::NewConversation(NewConversation {
            conversation_id: conv,
        }));

        assert_eq!(bob.schluessel_status(conv), SchluesselStatus::HatSchluessel);
        assert!(matches!(
            events.as_slice(),
            [ClientEvent::JoinConversation(j)] if j.conversation_id == conv
        ));
    }

    #[test]
    fn freundschaft_handshake_und_verschluesselte_nachricht() {
        let mut alice = sitzung("alice");
        let mut bob = sitzung("bob");
        let conv = ConversationId::new();

        // bob hat angenommen und ist Admin
        bob.ereignis_verarbeiten(ServerEvent::NewConversation(NewConversation {
            conversation_id: conv,
        }));

        let events = alice.ereignis_verarbeiten(ServerEvent::ResponseFRequest(FriendResponseNotify {
            sender: "bob".into(),
            response: true,
            conversation_id: Some(conv),
        }));
        assert_eq!(alice.schluessel_status(conv), SchluesselStatus::WarteAufSchluessel);
        assert_eq!(alice.log().titel(conv), Some("alice, bob"));
        assert_eq!(events.len(), 1);

        let antworten = bob.ereignis_verarbeiten(an_admin(&alice, &events[0]));
        assert_eq!(antworten.len(), 1);
        let antwort = antworten.into_iter().next().unwrap();

        assert!(alice.ereignis_verarbeiten(als_server_event(antwort)).is_empty());
        assert_eq!(alice.schluessel_status(conv), SchluesselStatus::HatSchluessel);
        assert_eq!(
            alice.engine().schluessel(conv).unwrap().as_bytes(),
            bob.engine().schluessel(conv).unwrap().as_bytes()
        );

        let gesendet = alice.nachricht_senden(conv, "Hallo Bob").unwrap();
        match &gesendet {
            ClientEvent::Message(m) => assert_ne!(m.content, "Hallo Bob"),
            andere => panic!("message erwartet, war {andere:?}"),
        }
        bob.ereignis_verarbeiten(zustellen(&alice, gesendet));

        let eintraege = bob.log().eintraege(conv);
        assert_eq!(eintraege.len(), 1);
        assert_eq!(eintraege[0].inhalt, Inhalt::Klartext("Hallo Bob".into()));
        assert_eq!(eintraege[0].author, "alice");
    }

    #[test]
    fn abgelehnte_freundschaft_fordert_nichts_an() {
        let mut alice = sitzung("alice");
        let events = alice.ereignis_verarbeiten(ServerEvent::ResponseFRequest(FriendResponseNotify {
            sender: "bob".into(),
            response: false,
            conversation_id: None,
        }));
        assert!(events.is_empty());
    }

    #[test]
    fn gruppenhinweis_setzt_titel_und_fordert_an() {
        let mut carol = sitzung("carol");
        let conv = ConversationId::new();

        let events = carol.ereignis_verarbeiten(ServerEvent::CreateGroupNotify(CreateGroupNotify {
            title: "Projekt".into(),
            admin: "alice".into(),
            conversation_id: conv,
        }));

        assert_eq!(carol.log().titel(conv), Some("Projekt"));
        assert!(matches!(events.as_slice(), [ClientEvent::KeyRequest(k)] if k.conversation_id == conv));
    }

    #[test]
    fn doppelte_antwort_ist_harmlos() {
        let mut admin = sitzung("admin");
        let mut mitglied = sitzung("mitglied");
        let conv = ConversationId::new();

        let anfrage = mitglied.konversation_oeffnen(conv);
        let antwort = admin
            .ereignis_verarbeiten(an_admin(&mitglied, &anfrage[1]))
            .into_iter()
            .next()
            .unwrap();
        let antwort = als_server_event(antwort);

        mitglied.ereignis_verarbeiten(antwort.clone());
        let vorher = mitglied.engine().schluessel(conv).unwrap().as_bytes().to_vec();
        assert!(mitglied.ereignis_verarbeiten(antwort).is_empty());
        assert_eq!(mitglied.engine().schluessel(conv).unwrap().as_bytes(), vorher.as_slice());
    }

    #[test]
    fn oeffnen_mit_schluessel_fordert_nicht_an() {
        let mut bob = sitzung("bob");
        let conv = ConversationId::new();
        bob.ereignis_verarbeiten(ServerEvent::NewConversation(NewConversation {
            conversation_id: conv,
        }));
        bob.log_mut().ungelesen_erhoehen(conv);

        let events = bob.konversation_oeffnen(conv);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ClientEvent::JoinConversation(_)));
        assert_eq!(bob.log().ungelesen(conv), 0);
    }

    #[test]
    fn ohne_schluessel_wird_unverschluesselt_gesendet() {
        let alice = sitzung("alice");
        let conv = ConversationId::new();
        match alice.nachricht_senden(conv, "klar").unwrap() {
            ClientEvent::Message(m) => assert_eq!(m.content, "klar"),
            andere => panic!("message erwartet, war {andere:?}"),
        }
    }

    #[test]
    fn falsch_verschluesselt_wird_unlesbar() {
        let mut bob = sitzung("bob");
        let conv = ConversationId::new();
        bob.ereignis_verarbeiten(ServerEvent::NewConversation(NewConversation {
            conversation_id: conv,
        }));
        let alice = sitzung("alice");

        bob.ereignis_verarbeiten(ServerEvent::NewMessage(NewMessage {
            conversation_id: conv,
            author: AuthorInfo {
                id: alice.user_id(),
                username: "alice".into(),
            },
            timestamp: Utc::now(),
            content: "kein-chiffrat".into(),
        }));

        assert_eq!(
            bob.log().eintraege(conv)[0].inhalt,
            Inhalt::Unlesbar("kein-chiffrat".into())
        );
    }

    #[test]
    fn benachrichtigung_zaehlt_ungelesen() {
        let mut bob = sitzung("bob");
        let conv = ConversationId::new();
        bob.ereignis_verarbeiten(ServerEvent::NewNotification(NewNotification {
            conversation_id: conv,
        }));
        assert_eq!(bob.log().ungelesen(conv), 1);
        assert!(bob.log().eintraege(conv).is_empty());
    }

    #[test]
    fn einladungen_werden_dedupliziert_und_beantwortet() {
        let mut bob = sitzung("bob");
        let id = FriendRequestId::new();
        let anfrage = FriendRequestNotify {
            sender: "alice".into(),
            request_id: id,
            timestamp: Utc::now(),
        };

        bob.ereignis_verarbeiten(ServerEvent::FriendRequest(anfrage.clone()));
        bob.ereignis_verarbeiten(ServerEvent::FriendRequest(anfrage));
        assert_eq!(bob.einladungen().len(), 1);

        let event = bob.einladung_beantworten(id, true).unwrap();
        assert!(matches!(event, ClientEvent::ResponseFriendReq(r) if r.id == id && r.response));
        assert!(bob.einladungen().is_empty());
        assert!(bob.einladung_beantworten(id, true).is_none());
    }

    #[test]
    fn ping_wird_beantwortet() {
        let mut bob = sitzung("bob");
        let events = bob.ereignis_verarbeiten(ServerEvent::Ping(PingMessage { timestamp_ms: 42 }));
        assert!(matches!(events.as_slice(), [ClientEvent::Pong(p)] if p.echo_timestamp_ms == 42));
    }

    #[test]
    fn gruppe_mit_eigenem_admin() {
        let alice = sitzung("alice");
        let mitglied = UserId::new();
        match alice.gruppe_erstellen("Team", vec![mitglied]) {
            ClientEvent::CreateGroup(g) => {
                assert_eq!(g.admin_id, alice.user_id());
                assert_eq!(g.users_ids, vec![mitglied]);
            }
            andere => panic!("create_group erwartet, war {andere:?}"),
        }
    }
}
