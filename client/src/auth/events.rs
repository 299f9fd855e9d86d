//! SDK events and the single-shot authentication completion
//!
//! When an execution round needs credentials, the client emits one
//! [`AuthenticationRequestEvent`] per challenge to the first registered
//! handler. The handler resolves the challenge exactly once through the
//! [`AuthCompletion`] it receives, usually by passing the event to
//! [`AuthenticationPoller::handle_authentication_request`].

use super::poller::AuthenticationPoller;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use toolbridge_core::error::{AUTHENTICATION_ERROR, AUTHENTICATION_EXPIRED};
use toolbridge_core::{AuthenticationChallenge, AuthenticationStatus, SdkError};

/// Kinds of events the client emits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SdkEventType {
    /// A tool execution is blocked on interactive authentication
    AuthenticationRequest,
}

/// Event delivered to registered handlers
#[derive(Debug)]
pub enum SdkEvent {
    /// A challenge awaiting resolution
    AuthenticationRequest(AuthenticationRequestEvent),
}

/// Event handler
pub type SdkEventHandler = Arc<dyn Fn(SdkEvent) + Send + Sync>;

/// One challenge raised by one tool call
#[derive(Debug)]
pub struct AuthenticationRequestEvent {
    /// Tool call the challenge belongs to
    pub tool_call_id: String,
    /// Platform identifier of the tool
    pub tool_uid: Option<String>,
    /// The challenge itself
    pub challenge: AuthenticationChallenge,
    /// Resolves the challenge; must be used exactly once
    pub completion: AuthCompletion,
    /// Handle for opening the landing page and polling status
    pub poller: AuthenticationPoller,
}

/// How a challenge was resolved
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credentials are in place; continue with the next challenge
    Authenticated,
    /// The handler gave up
    Aborted,
    /// The external flow ended in a failure status
    Failed {
        /// `Expired` or `Error`
        status: AuthenticationStatus,
        /// Error reported with the status
        error: SdkError,
    },
}

impl AuthOutcome {
    /// Build an outcome from loose callback parts
    ///
    /// `abort` wins. A failure status without data gets a synthesized error.
    /// Anything else, including no status at all, counts as authenticated.
    #[must_use]
    pub fn from_parts(
        abort: bool,
        result: Option<AuthenticationStatus>,
        data: Option<SdkError>,
    ) -> Self {
        if abort {
            return Self::Aborted;
        }
        match result {
            Some(status) if status.is_failure() => {
                let error = data.unwrap_or_else(|| synthesized_error(status));
                Self::Failed { status, error }
            }
            _ => Self::Authenticated,
        }
    }
}

fn synthesized_error(status: AuthenticationStatus) -> SdkError {
    match status {
        AuthenticationStatus::Expired => {
            SdkError::new(AUTHENTICATION_EXPIRED, "Authentication request expired")
        }
        _ => SdkError::new(AUTHENTICATION_ERROR, "Authentication request failed"),
    }
}

/// Single-shot resolution of one challenge
///
/// Every method consumes the completion. Dropping it unresolved counts as an
/// abort.
pub struct AuthCompletion {
    sender: oneshot::Sender<AuthOutcome>,
}

impl AuthCompletion {
    /// Completion paired with the receiver its outcome arrives on
    ///
    /// The receiver yields an error if the completion is dropped unresolved.
    #[must_use]
    pub fn channel() -> (Self, oneshot::Receiver<AuthOutcome>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    /// Resolve with `outcome`
    pub fn complete(self, outcome: AuthOutcome) {
        if self.sender.send(outcome).is_err() {
            tracing::debug!("Authentication outcome delivered after the run finished");
        }
    }

    /// Resolve as authenticated
    pub fn authenticated(self) {
        self.complete(AuthOutcome::Authenticated);
    }

    /// Resolve as aborted
    pub fn abort(self) {
        self.complete(AuthOutcome::Aborted);
    }

    /// Resolve as a terminal failure
    pub fn fail(self, status: AuthenticationStatus, error: SdkError) {
        self.complete(AuthOutcome::Failed { status, error });
    }

    /// Whether the waiting run has already gone away
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl fmt::Debug for AuthCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCompletion")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

/// Handler registry: event kind to handlers in registration order
#[derive(Clone, Default)]
pub struct EventListeners {
    handlers: HashMap<SdkEventType, Vec<SdkEventHandler>>,
}

impl EventListeners {
    /// Append a handler for `event_type`
    pub fn register(&mut self, event_type: SdkEventType, handler: SdkEventHandler) {
        self.handlers.entry(event_type).or_default().push(handler);
    }

    /// First handler registered for `event_type`
    #[must_use]
    pub fn first(&self, event_type: SdkEventType) -> Option<SdkEventHandler> {
        self.handlers
            .get(&event_type)
            .and_then(|handlers| handlers.first())
            .cloned()
    }

    /// Number of handlers registered for `event_type`
    #[must_use]
    pub fn count(&self, event_type: SdkEventType) -> usize {
        self.handlers.get(&event_type).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self
            .handlers
            .iter()
            .map(|(event_type, handlers)| (event_type, handlers.len()))
            .collect();
        f.debug_struct("EventListeners").field("handlers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;

    #[test]
    fn test_abort_wins() {
        let outcome = AuthOutcome::from_parts(
            true,
            Some(AuthenticationStatus::Authenticated),
            None,
        );
        assert_eq!(outcome, AuthOutcome::Aborted);
    }

    #[test]
    fn test_failure_keeps_supplied_data() {
        let error = SdkError::new("DENIED", "user declined");
        let outcome = AuthOutcome::from_parts(
            false,
            Some(AuthenticationStatus::Error),
            Some(error.clone()),
        );
        assert_eq!(
            outcome,
            AuthOutcome::Failed {
                status: AuthenticationStatus::Error,
                error,
            }
        );
    }

    #[test]
    fn test_failure_without_data_is_synthesized() {
        let outcome = AuthOutcome::from_parts(false, Some(AuthenticationStatus::Expired), None);
        let AuthOutcome::Failed { error, .. } = outcome else {
            unreachable!("expired resolves to a failure");
        };
        assert_eq!(error.code, AUTHENTICATION_EXPIRED);
    }

    #[test]
    fn test_anything_else_is_authenticated() {
        assert_eq!(AuthOutcome::from_parts(false, None, None), AuthOutcome::Authenticated);
        assert_eq!(
            AuthOutcome::from_parts(false, Some(AuthenticationStatus::Requested), None),
            AuthOutcome::Authenticated
        );
    }

    #[tokio::test]
    async fn test_completion_delivers_once() {
        let (completion, receiver) = AuthCompletion::channel();
        completion.authenticated();
        assert_eq!(receiver.await.unwrap(), AuthOutcome::Authenticated);
    }

    #[tokio::test]
    async fn test_dropped_completion_closes_the_channel() {
        let (completion, receiver) = AuthCompletion::channel();
        drop(completion);
        assert!(receiver.await.is_err());
    }

    #[test]
    fn test_handlers_keep_registration_order() {
        let mut listeners = EventListeners::default();
        assert!(listeners.first(SdkEventType::AuthenticationRequest).is_none());

        let first: SdkEventHandler = Arc::new(|_| {});
        let second: SdkEventHandler = Arc::new(|_| {});
        listeners.register(SdkEventType::AuthenticationRequest, Arc::clone(&first));
        listeners.register(SdkEventType::AuthenticationRequest, second);

        assert_eq!(listeners.count(SdkEventType::AuthenticationRequest), 2);
        let selected = listeners.first(SdkEventType::AuthenticationRequest).unwrap();
        assert!(Arc::ptr_eq(&selected, &first));
    }
}
