//! Event types for the portal event system
//!
//! Events are broadcast via [`EventBus`] and serialized for the admin SSE stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::db::SyncTrigger;

/// Portal event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PortalEvent {
    /// A sync run began
    SyncStarted {
        run_id: String,
        trigger: SyncTrigger,
        timestamp: DateTime<Utc>,
    },

    /// A sync run finished (possibly with per-row failures)
    SyncCompleted {
        run_id: String,
        trigger: SyncTrigger,
        projects_inserted: usize,
        projects_updated: usize,
        speakers_inserted: usize,
        speakers_updated: usize,
        failures: usize,
        timestamp: DateTime<Utc>,
    },

    /// A speaker saved one form step
    SubmissionUpdated {
        project_id: String,
        session_id: String,
        /// Step name, e.g. "profile", "consent", "files"
        step: String,
        timestamp: DateTime<Utc>,
    },

    /// An organizer changed project configuration
    ProjectChanged {
        project_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl PortalEvent {
    /// SSE event name
    pub fn event_type(&self) -> &str {
        match self {
            PortalEvent::SyncStarted { .. } => "SyncStarted",
            PortalEvent::SyncCompleted { .. } => "SyncCompleted",
            PortalEvent::SubmissionUpdated { .. } => "SubmissionUpdated",
            PortalEvent::ProjectChanged { .. } => "ProjectChanged",
        }
    }

    pub fn submission(project_id: &str, session_id: &str, step: &str) -> Self {
        PortalEvent::SubmissionUpdated {
            project_id: project_id.to_string(),
            session_id: session_id.to_string(),
            step: step.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn project_changed(project_id: &str) -> Self {
        PortalEvent::ProjectChanged {
            project_id: project_id.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Broadcast channel shared by handlers and the sync engine
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PortalEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use portal_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PortalEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PortalEvent,
    ) -> Result<usize, broadcast::error::SendError<PortalEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PortalEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
