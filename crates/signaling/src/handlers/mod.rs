//! Handler fuer alle Client-Ereignisse
//!
//! Jeder Handler ist fuer eine Gruppe von Ereignissen zustaendig und hat
//! Zugriff auf den gemeinsamen SignalingState. Handler senden Fan-out
//! ueber den Gruppen-Router; Fehler gehen als `SignalingError` an den
//! Dispatcher zurueck und landen nur beim Ausloeser.

pub mod beziehung_handler;
pub mod chat_handler;
pub mod schluessel_handler;
