//! Chat sessions
//!
//! - [`types`]: messages and sessions as exchanged with the backend
//! - [`store`]: the in-memory collection and current selection
//! - [`log`]: optimistic writes awaiting confirmation
//! - [`controller`]: the operations behind the chat screen

pub mod controller;
pub mod log;
pub mod store;
pub mod types;

pub use controller::{
    message_key, ActionOutcome, ChatController, ControllerOptions, FetchOutcome, Notification,
    NotificationLevel, PendingSend, SendOutcome, WELCOME_SUGGESTIONS,
};
pub use log::{Mutation, MutationKind, MutationLog, MutationState};
pub use store::{SessionStore, View};
pub use types::{now_millis, Message, MessageStatus, Role, Session, DEFAULT_SESSION_NAME};
