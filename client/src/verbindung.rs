//! Client-seitige TCP-Verbindung zum parley-Server
//!
//! Nutzt den `ClientCodec` aus parley-protocol fuer das Wire-Format
//! (u32 BE length + JSON payload). Server-Pings werden beim Empfangen
//! automatisch beantwortet und nie an den Aufrufer weitergereicht.

use futures_util::{SinkExt, StreamExt};
use parley_protocol::control::{AuthenticateRequest, AuthenticatedInfo, ErrorResponse};
use parley_protocol::{ClientCodec, ClientEvent, ClientMessage, ServerEvent, ServerMessage};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;

use crate::error::{ClientError, ClientResult};

/// Echte TCP-Verbindung zum parley Signaling-Server
pub struct ServerVerbindung {
    framed: Framed<TcpStream, ClientCodec>,
    /// Monoton steigender Request-ID Zaehler
    naechste_id: u32,
}

impl ServerVerbindung {
    /// Baut eine TCP-Verbindung zum Server auf
    pub async fn verbinden(addr: impl ToSocketAddrs) -> ClientResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        if let Ok(peer) = stream.peer_addr() {
            tracing::info!(%peer, "TCP-Verbindung hergestellt");
        }

        Ok(Self {
            framed: Framed::new(stream, ClientCodec::new()),
            naechste_id: 1,
        })
    }

    fn naechste_id(&mut self) -> u32 {
        let id = self.naechste_id;
        self.naechste_id = self.naechste_id.wrapping_add(1).max(1);
        id
    }

    /// Sendet ein Ereignis und gibt die verwendete Request-ID zurueck
    pub async fn senden(&mut self, event: ClientEvent) -> ClientResult<u32> {
        let id = self.naechste_id();
        self.framed.send(ClientMessage::new(id, event)).await?;
        Ok(id)
    }

    /// Sendet mehrere Ereignisse in Reihenfolge
    pub async fn alle_senden(&mut self, events: Vec<ClientEvent>) -> ClientResult<()> {
        for event in events {
            self.senden(event).await?;
        }
        Ok(())
    }

    /// Naechste Server-Nachricht (ohne Pings)
    pub async fn empfangen(&mut self) -> ClientResult<ServerMessage> {
        loop {
            match self.framed.next().await {
                Some(Ok(nachricht)) => {
                    if let ServerEvent::Ping(ref ping) = nachricht.event {
                        let pong = ClientMessage::pong(nachricht.request_id, ping.timestamp_ms);
                        self.framed.send(pong).await?;
                        continue;
                    }
                    return Ok(nachricht);
                }
                Some(Err(e)) => return Err(ClientError::Io(e)),
                None => return Err(ClientError::VerbindungGetrennt),
            }
        }
    }

    /// Meldet sich mit einem Token an
    ///
    /// Muss das erste Ereignis auf der Verbindung sein.
    pub async fn authentifizieren(&mut self, token: &str) -> ClientResult<AuthenticatedInfo> {
        self.senden(ClientEvent::Authenticate(AuthenticateRequest {
            token: token.to_string(),
        }))
        .await?;

        let antwort = self.empfangen().await?;
        fehler_pruefen(&antwort)?;

        match antwort.event {
            ServerEvent::Authenticated(info) => {
                tracing::info!(user_id = %info.user_id, username = %info.username, "Angemeldet");
                Ok(info)
            }
            andere => Err(ClientError::UnerwarteteAntwort(format!(
                "authenticated erwartet, erhalten: {:?}",
                std::mem::discriminant(&andere)
            ))),
        }
    }

    /// Trennt die TCP-Verbindung
    pub async fn trennen(&mut self) {
        let _ = SinkExt::<ClientMessage>::close(&mut self.framed).await;
        tracing::info!("TCP-Verbindung getrennt");
    }
}

/// Wandelt ein `error`-Ereignis in einen `ClientError`
pub fn fehler_pruefen(nachricht: &ServerMessage) -> ClientResult<()> {
    if let ServerEvent::Error(ErrorResponse { code, message }) = &nachricht.event {
        return Err(ClientError::Server {
            code: *code,
            message: message.clone(),
        });
    }
    Ok(())
}
