//! Broadcast channel for job status events.
//!
//! Workers publish here; the web layer forwards events to WebSocket clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::job::JobStatus;

/// A job changed status.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct JobEvent {
    pub task_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Type alias for the broadcast sender.
pub type EventSender = broadcast::Sender<JobEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = broadcast::Receiver<JobEvent>;

/// Create a new broadcast channel with default capacity.
pub fn create_broadcast_channel() -> EventSender {
    let (tx, _rx) = broadcast::channel(100);
    tx
}
