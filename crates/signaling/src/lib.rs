//! parley-signaling – TCP-Verbindungsschicht
//!
//! Dieser Crate verwaltet die persistenten Client-Verbindungen: Anmeldung
//! per Token, Verbindungsregister je Benutzer und das Verteilen von
//! Ereignissen. Die Domain-Logik liegt in `parley-chat`; Schluesselmaterial
//! wird unveraendert weitergereicht.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer, LocalSet)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein lokaler Task)
//!     |  authenticate{token} als erstes Frame, sonst UNAUTHORIZED
//!     |
//!     v
//! MessageDispatcher (erschoepfendes match ueber ClientEvent)
//!     |
//!     +-- chat_handler        (message, join_conversation)
//!     +-- schluessel_handler  (key_request, key_response)
//!     +-- beziehung_handler   (invite_friend, response_friend_req, create_group)
//!
//! GroupRouter – Benutzer -> Verbindungen, Fan-out via try_send
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use broadcast::{ClientSender, GroupRouter};
pub use connection::ClientConnection;
pub use dispatcher::{DispatcherContext, MessageDispatcher};
pub use error::{SignalingError, SignalingResult};
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;
