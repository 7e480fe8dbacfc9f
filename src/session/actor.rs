//! Single-consumer mailbox task wrapping a [`Session`].
//!
//! Commands are queued on a bounded channel and processed strictly in
//! arrival order by one task, so the session needs no locking. Outbound
//! notifications go to an unbounded channel; a slow consumer never stalls
//! the command loop.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::command::{Command, Outbound};
use super::coordinator::Session;
use crate::config::{ConfigError, SessionConfig};

/// Commands that may be queued before senders wait.
pub const MAILBOX_CAPACITY: usize = 256;

/// The session task has stopped and can take no more commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session has shut down")]
pub struct SessionClosed;

/// Cloneable sender side of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Queues a command, waiting if the mailbox is full.
    pub async fn send(&self, command: Command) -> Result<(), SessionClosed> {
        self.commands.send(command).await.map_err(|_| SessionClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Validates `config` and spawns the session task on the current tokio
/// runtime.
///
/// Returns the command handle, the notification stream, and the task
/// handle. The task exits once every [`SessionHandle`] is dropped.
pub fn spawn_session(
    config: SessionConfig,
    seed: u64,
) -> Result<(SessionHandle, mpsc::UnboundedReceiver<Outbound>, JoinHandle<()>), ConfigError> {
    let session = Session::with_seed(config, seed)?;
    let (command_tx, command_rx) = mpsc::channel(MAILBOX_CAPACITY);
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(session, command_rx, outbound_tx));
    Ok((SessionHandle { commands: command_tx }, outbound_rx, task))
}

async fn run(
    mut session: Session,
    mut commands: mpsc::Receiver<Command>,
    outbound: mpsc::UnboundedSender<Outbound>,
) {
    info!("session started");
    let mut processed = 0u64;
    while let Some(command) = commands.recv().await {
        processed += 1;
        for message in session.handle(command) {
            if outbound.send(message).is_err() {
                debug!("notification receiver dropped");
            }
        }
    }
    info!(processed, stage = ?session.stage(), "session closed");
}
