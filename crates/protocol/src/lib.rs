//! parley-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Ereignisse, die zwischen Client und Server
//! ausgetauscht werden, sowie das Frame-Format fuer die TCP-Verbindung.

pub mod control;
pub mod wire;

pub use control::{ClientEvent, ClientMessage, ErrorCode, KeyFlag, ServerEvent, ServerMessage};
pub use wire::{ClientCodec, FrameCodec, ServerCodec};
