//! Authentication challenge handling: events, completions and status polling

pub mod events;
pub mod poller;

pub use events::{
    AuthCompletion, AuthOutcome, AuthenticationRequestEvent, EventListeners, SdkEvent,
    SdkEventHandler, SdkEventType,
};
pub use poller::{AuthenticationPoller, ChallengeKey, LandingPageOpener, PollStep};
