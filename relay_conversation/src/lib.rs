#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Per-chat conversation state and the message handler that drives an exchange.
//!
//! # Key Features
//! - Bounded history that always starts with the system prompt
//! - Non-blocking busy guard that drops overlapping messages per chat
//! - Transport-agnostic inbound/outbound types
//! - Best-effort failure reports to a log chat

mod event;
mod guard;
mod handler;
mod report;
mod store;

pub use event::{ChatKind, InboundMessage, Outbound, ReplyContext};
pub use guard::{BusyGuard, BusyPermit};
pub use handler::{ClearOutcome, HandleOutcome, HandlerConfig, MessageHandler};
pub use report::{DiagnosticReport, message_link};
pub use store::{ConversationStore, DEFAULT_HISTORY_KEEP};
