//! Notifier boundary.
//!
//! The engine hands finished dispatches to a [`Notifier`] after the store
//! lock is released. Delivery is best-effort.

use crate::game::events::{GameEvent, Recipient};

/// Delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// Recipient is not connected.
    #[error("recipient unreachable")]
    Unreachable,

    /// Recipient's channel is closed or full.
    #[error("recipient channel closed")]
    Closed,
}

/// Outbound event delivery.
pub trait Notifier: Send + Sync {
    /// Deliver one event. Must not block.
    fn deliver(&self, recipient: &Recipient, event: &GameEvent) -> Result<(), NotifyError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;
    use crate::game::events::Dispatch;
    use crate::game::session::UserId;

    /// Records every dispatch. Users marked unreachable fail delivery.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingNotifier {
        sent: Mutex<Vec<Dispatch>>,
        unreachable: Mutex<Vec<UserId>>,
    }

    impl RecordingNotifier {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn set_unreachable(&self, user_id: &str) {
            self.unreachable.lock().unwrap().push(user_id.into());
        }

        pub(crate) fn sent(&self) -> Vec<Dispatch> {
            self.sent.lock().unwrap().clone()
        }

        pub(crate) fn events_for(&self, recipient: &Recipient) -> Vec<GameEvent> {
            self.sent()
                .into_iter()
                .filter(|d| &d.recipient == recipient)
                .map(|d| d.event)
                .collect()
        }

        pub(crate) fn user_events(&self, user_id: &str) -> Vec<GameEvent> {
            self.events_for(&Recipient::User(user_id.into()))
        }
    }

    impl Notifier for RecordingNotifier {
        fn deliver(&self, recipient: &Recipient, event: &GameEvent) -> Result<(), NotifyError> {
            if let Recipient::User(user_id) = recipient {
                if self.unreachable.lock().unwrap().contains(user_id) {
                    return Err(NotifyError::Unreachable);
                }
            }
            self.sent.lock().unwrap().push(Dispatch {
                recipient: recipient.clone(),
                event: event.clone(),
            });
            Ok(())
        }
    }
}
