//! Gemeinsame Identifikationstypen fuer parley
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. Auf dem Draht
//! erscheinen sie als nackte UUID-Strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_typ {
    ($(#[$doc:meta])* $name:ident, $praefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Erstellt eine neue zufaellige ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Gibt die innere UUID zurueck
            pub fn inner(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($praefix, ":{}"), self.0)
            }
        }
    };
}

id_typ!(
    /// Eindeutige Benutzer-ID
    UserId,
    "user"
);

id_typ!(
    /// Eindeutige Konversations-ID (Direktchat oder Gruppe)
    ConversationId,
    "conversation"
);

id_typ!(
    /// Eindeutige Nachrichten-ID
    MessageId,
    "message"
);

id_typ!(
    /// Eindeutige ID einer Freundschaftsanfrage
    FriendRequestId,
    "friend_request"
);

id_typ!(
    /// ID einer einzelnen TCP-Verbindung
    ///
    /// Ein Benutzer kann mehrere Verbindungen gleichzeitig halten.
    ConnectionId,
    "connection"
);
