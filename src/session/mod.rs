//! Session coordination.
//!
//! A session serialises every player command for one game, checks it against
//! the current stage and turn, drives the rules engine, and produces outbound
//! notifications for the transport layer. [`Session`] is the synchronous
//! state machine; [`spawn_session`] wraps it in a single-consumer task.

pub mod actor;
pub mod command;
pub mod coordinator;

pub use actor::{spawn_session, SessionClosed, SessionHandle, MAILBOX_CAPACITY};
pub use command::{Command, Notification, Outbound, Recipient};
pub use coordinator::{Session, Stage};
