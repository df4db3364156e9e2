//! Session callbacks
//!
//! The transport layer receives live output and completion through
//! [`SessionEvents`]. Calls for one stream arrive in production order; stdout
//! and stderr calls may interleave. `on_done` is always the last call of a run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Receiver of a session's output and completion
#[async_trait]
pub trait SessionEvents: Send + Sync {
    /// A decoded chunk of program output; `is_error` marks stderr and engine messages
    async fn on_output(&self, text: String, is_error: bool);

    /// The run finished; called at most once per `start`
    async fn on_done(&self, exit_code: i32);
}

/// Owned form of a session callback, for channel-based consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Output { text: String, is_error: bool },
    Done { exit_code: i32 },
}

#[async_trait]
impl SessionEvents for mpsc::UnboundedSender<SessionEvent> {
    async fn on_output(&self, text: String, is_error: bool) {
        let _ = self.send(SessionEvent::Output { text, is_error });
    }

    async fn on_done(&self, exit_code: i32) {
        let _ = self.send(SessionEvent::Done { exit_code });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.on_output("name: ".to_string(), false).await;
        tx.on_done(0).await;

        assert_eq!(
            rx.recv().await,
            Some(SessionEvent::Output {
                text: "name: ".to_string(),
                is_error: false
            })
        );
        assert_eq!(rx.recv().await, Some(SessionEvent::Done { exit_code: 0 }));
    }

    #[test]
    fn test_event_json_shape() {
        let event = SessionEvent::Output {
            text: "hi".to_string(),
            is_error: true,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"type": "output", "text": "hi", "is_error": true})
        );
    }
}
