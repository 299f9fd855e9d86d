//! Authentication status polling
//!
//! Each challenge gets its own tokio task that asks the authentication module
//! for the request's status until it reaches a terminal state. Tasks live in a
//! registry keyed by [`ChallengeKey`], so a single challenge can be cancelled
//! without touching the others.

use super::events::{AuthCompletion, AuthOutcome, AuthenticationRequestEvent};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use toolbridge_core::{AuthenticationChallenge, AuthenticationStatus, SdkError};
use toolbridge_transport::{Transport, TransportError, send};

/// Status endpoint of the authentication module
pub const STATUS_PATH: &str = "/authmod/v1/request/status";
/// Landing page path of the authentication module
pub const LANDING_PATH: &str = "/authmod/landing";

/// Opens the landing page where the user completes authentication
pub trait LandingPageOpener: Send + Sync {
    /// Present `url` to the user
    fn open(&self, url: &str);
}

impl<F> LandingPageOpener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn open(&self, url: &str) {
        self(url);
    }
}

/// Identity of one challenge's poll task
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChallengeKey {
    /// Connection being authenticated
    pub connection_uid: String,
    /// Authentication request
    pub request_uid: String,
}

impl From<&AuthenticationChallenge> for ChallengeKey {
    fn from(challenge: &AuthenticationChallenge) -> Self {
        Self {
            connection_uid: challenge.connection_uid.clone(),
            request_uid: challenge.request_uid.clone(),
        }
    }
}

impl fmt::Display for ChallengeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.connection_uid, self.request_uid)
    }
}

/// Result of a single status check
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollStep {
    /// Still waiting on the user
    Pending,
    /// Terminal state reached
    Resolved(AuthOutcome),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusRequest<'a> {
    connection_uid: &'a str,
    request_uid: &'a str,
    request_secret: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    result: String,
    #[serde(default)]
    info: Option<StatusInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusInfo {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    stack_trace: Option<String>,
}

impl From<StatusInfo> for SdkError {
    fn from(info: StatusInfo) -> Self {
        Self {
            code: info.code,
            message: info.message,
            details: info.stack_trace,
        }
    }
}

fn parse_status(result: &str) -> Option<AuthenticationStatus> {
    match result {
        "requested" => Some(AuthenticationStatus::Requested),
        "authenticated" => Some(AuthenticationStatus::Authenticated),
        "expired" => Some(AuthenticationStatus::Expired),
        "error" => Some(AuthenticationStatus::Error),
        _ => None,
    }
}

#[derive(Default)]
struct PollTimers {
    next_generation: u64,
    active: HashMap<ChallengeKey, (u64, AbortHandle)>,
}

/// Polls the authentication module until challenges resolve
///
/// Cheap to clone; clones share the same timer registry.
#[derive(Clone)]
pub struct AuthenticationPoller {
    transport: Arc<dyn Transport>,
    auth_mod_base_url: reqwest::Url,
    interval: Duration,
    timers: Arc<Mutex<PollTimers>>,
}

impl fmt::Debug for AuthenticationPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationPoller")
            .field("auth_mod_base_url", &self.auth_mod_base_url.as_str())
            .field("interval", &self.interval)
            .field("active_polls", &self.active_polls())
            .finish_non_exhaustive()
    }
}

impl AuthenticationPoller {
    /// Poller sending status requests through `transport`
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, auth_mod_base_url: reqwest::Url, interval: Duration) -> Self {
        Self {
            transport,
            auth_mod_base_url,
            interval,
            timers: Arc::new(Mutex::new(PollTimers::default())),
        }
    }

    /// Delay between status checks
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Landing page for `challenge`
    #[must_use]
    pub fn landing_url(&self, challenge: &AuthenticationChallenge) -> reqwest::Url {
        let mut url = self.auth_mod_base_url.clone();
        let path = format!("{}{LANDING_PATH}", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.query_pairs_mut()
            .clear()
            .append_pair("request_uid", &challenge.request_uid)
            .append_pair("request_secret", &challenge.request_secret)
            .append_pair("connection_uid", &challenge.connection_uid);
        url
    }

    /// Open the landing page for the event's challenge and poll until it resolves
    ///
    /// The event's completion fires once the status turns terminal.
    pub fn handle_authentication_request(
        &self,
        event: AuthenticationRequestEvent,
        opener: &dyn LandingPageOpener,
    ) -> ChallengeKey {
        let url = self.landing_url(&event.challenge);
        tracing::info!(
            tool_call_id = %event.tool_call_id,
            connection_uid = %event.challenge.connection_uid,
            "Opening authentication landing page"
        );
        opener.open(url.as_str());
        self.start(event.challenge, event.completion)
    }

    /// Start polling for `challenge`, replacing any poll already running for it
    pub fn start(&self, challenge: AuthenticationChallenge, completion: AuthCompletion) -> ChallengeKey {
        let key = ChallengeKey::from(&challenge);
        let mut timers = self.lock_timers();
        timers.next_generation += 1;
        let generation = timers.next_generation;
        let first_check = Instant::now() + self.interval;

        let task = tokio::spawn(self.clone().poll_until_resolved(
            key.clone(),
            generation,
            first_check,
            challenge,
            completion,
        ));

        if let Some((_, previous)) = timers.active.insert(key.clone(), (generation, task.abort_handle())) {
            tracing::debug!(challenge = %key, "Replacing running status poll");
            previous.abort();
        }
        key
    }

    /// Ask once for the status of `challenge`
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the status request fails
    pub async fn check_status(&self, challenge: &AuthenticationChallenge) -> Result<PollStep, TransportError> {
        counter!("toolbridge.status_polls").increment(1);
        let request = StatusRequest {
            connection_uid: &challenge.connection_uid,
            request_uid: &challenge.request_uid,
            request_secret: &challenge.request_secret,
        };
        let response: StatusResponse = send(self.transport.as_ref(), STATUS_PATH, &request).await?;

        let step = match parse_status(&response.result) {
            Some(AuthenticationStatus::Authenticated) => PollStep::Resolved(AuthOutcome::Authenticated),
            Some(status) if status.is_failure() => PollStep::Resolved(AuthOutcome::from_parts(
                false,
                Some(status),
                response.info.map(SdkError::from),
            )),
            _ => PollStep::Pending,
        };
        tracing::debug!(
            connection_uid = %challenge.connection_uid,
            request_uid = %challenge.request_uid,
            status = %response.result,
            "Authentication status checked"
        );
        Ok(step)
    }

    /// Stop polling for `key`; returns whether a poll was running
    pub fn cancel(&self, key: &ChallengeKey) -> bool {
        let removed = self.lock_timers().active.remove(key);
        match removed {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Stop every running poll
    pub fn cancel_all(&self) {
        let drained: Vec<_> = self.lock_timers().active.drain().collect();
        for (key, (_, handle)) in drained {
            tracing::debug!(challenge = %key, "Cancelling status poll");
            handle.abort();
        }
    }

    /// Number of polls currently running
    #[must_use]
    pub fn active_polls(&self) -> usize {
        self.lock_timers().active.len()
    }

    /// Whether a poll is running for `key`
    #[must_use]
    pub fn is_polling(&self, key: &ChallengeKey) -> bool {
        self.lock_timers().active.contains_key(key)
    }

    async fn poll_until_resolved(
        self,
        key: ChallengeKey,
        generation: u64,
        first_check: Instant,
        challenge: AuthenticationChallenge,
        completion: AuthCompletion,
    ) {
        let mut next_check = first_check;
        loop {
            tokio::time::sleep_until(next_check).await;
            if completion.is_closed() {
                self.release(&key, generation);
                tracing::debug!(challenge = %key, "Run no longer waiting, stopping status poll");
                return;
            }
            match self.check_status(&challenge).await {
                Ok(PollStep::Pending) => {}
                Ok(PollStep::Resolved(outcome)) => {
                    self.release(&key, generation);
                    tracing::info!(challenge = %key, ?outcome, "Authentication request resolved");
                    completion.complete(outcome);
                    return;
                }
                Err(error) => {
                    tracing::warn!(
                        challenge = %key,
                        error = %error,
                        retryable = error.is_retryable(),
                        "Status check failed, retrying"
                    );
                }
            }
            next_check = Instant::now() + self.interval;
        }
    }

    fn release(&self, key: &ChallengeKey, generation: u64) {
        let mut timers = self.lock_timers();
        if timers
            .active
            .get(key)
            .is_some_and(|(current, _)| *current == generation)
        {
            timers.active.remove(key);
        }
    }

    fn lock_timers(&self) -> MutexGuard<'_, PollTimers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
