//! Session transcript
//!
//! The running conversation shown to the user, plus the bounded window of it
//! forwarded to text generation.

pub mod log;
pub mod window;

pub use log::{ChatMessage, MessageKind, Role, Transcript};
pub use window::{HistoryTurn, HistoryWindow, MAX_HISTORY_TURNS};
