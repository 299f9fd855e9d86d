//! Toolbridge client: construction, configuration and tool discovery

use crate::auth::{
    AuthenticationPoller, AuthenticationRequestEvent, ChallengeKey, EventListeners,
    LandingPageOpener, SdkEvent, SdkEventType,
};
use crate::config::{ClientConfig, ConfigError};
use crate::error::ToolBridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use toolbridge_core::{Authentication, KeyValuePair, Native, Provider, ToolDefinition};
use toolbridge_transport::{HttpTransport, Transport, send};

/// Request context shared by discovery and execution
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestContext<'a, M> {
    pub(crate) bridge_uid: &'a str,
    pub(crate) messages: &'a [M],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetToolsRequest<'a, M> {
    context: RequestContext<'a, M>,
    messages: &'a [M],
    metadata: &'a [KeyValuePair],
}

#[derive(Deserialize)]
struct GetToolsResponse {
    tools: Vec<ToolDefinition>,
}

/// Client for a remote tool bridge
///
/// Generic over the [`Provider`] whose tool declarations, assistant turns and
/// tool messages the caller works with.
///
/// # Example
///
/// ```no_run
/// use toolbridge::{ClientConfig, Message, Native, ToolBridgeClient};
///
/// # async fn example() -> Result<(), toolbridge::ToolBridgeError> {
/// let config = ClientConfig::from_env()?;
/// let mut client = ToolBridgeClient::new(config, Native)?;
/// client.metadata("tenant", Some("acme".to_string()));
///
/// let tools = client.get_tools("bridge-1", &[Message::user("Who is bob?")]).await?;
/// println!("{} tools available", tools.len());
/// # Ok(())
/// # }
/// ```
pub struct ToolBridgeClient<P: Provider = Native> {
    pub(crate) provider: P,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) authentication: Authentication,
    pub(crate) metadata: Vec<KeyValuePair>,
    pub(crate) listeners: EventListeners,
    pub(crate) poller: AuthenticationPoller,
}

impl<P: Provider> ToolBridgeClient<P> {
    /// Client talking HTTP to the configured platform
    ///
    /// # Errors
    ///
    /// Returns `ToolBridgeError::Configuration` if the API key or the
    /// authentication module URL is missing, or a setting is invalid
    pub fn new(config: ClientConfig, provider: P) -> Result<Self, ToolBridgeError> {
        config.validate()?;
        let api_key = config.resolve_api_key()?;
        let transport = HttpTransport::new(config.base_url.clone(), api_key, config.timeout())?;
        Self::with_transport(config, provider, Arc::new(transport))
    }

    /// Client over an arbitrary transport
    ///
    /// The API key is the transport's concern and is not checked here.
    ///
    /// # Errors
    ///
    /// Returns `ToolBridgeError::Configuration` if the authentication module
    /// URL is missing or invalid, or the poll interval is zero
    pub fn with_transport(
        config: ClientConfig,
        provider: P,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ToolBridgeError> {
        let auth_mod = config.auth_module_url()?;
        let auth_mod_base_url = reqwest::Url::parse(auth_mod).map_err(|_| ConfigError::InvalidUrl {
            field: "auth_mod_base_url",
            value: auth_mod.to_string(),
        })?;
        let poll_interval = config.checked_poll_interval()?;

        tracing::info!(
            provider = %provider.kind(),
            base_url = %config.base_url,
            "Toolbridge client created"
        );

        let poller = AuthenticationPoller::new(
            Arc::clone(&transport),
            auth_mod_base_url,
            poll_interval,
        );
        Ok(Self {
            provider,
            transport,
            authentication: config.authentication,
            metadata: config.metadata,
            listeners: EventListeners::default(),
            poller,
        })
    }

    /// Append a metadata entry sent with every request
    ///
    /// Entries are never deduplicated.
    pub fn metadata(&mut self, key: impl Into<String>, value: Option<String>) -> &mut Self {
        self.metadata.push(KeyValuePair::new(key, value));
        self
    }

    /// Metadata entries in insertion order
    #[must_use]
    pub fn metadata_entries(&self) -> &[KeyValuePair] {
        &self.metadata
    }

    /// Credential scope sent with every execution request
    #[must_use]
    pub const fn authentication(&self) -> &Authentication {
        &self.authentication
    }

    /// Provider this client maps through
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Status poller shared with authentication handlers
    #[must_use]
    pub const fn poller(&self) -> &AuthenticationPoller {
        &self.poller
    }

    /// Register a handler for `event_type`
    ///
    /// Only the first handler registered for authentication requests is invoked.
    pub fn add_event_listener(
        &mut self,
        event_type: SdkEventType,
        handler: impl Fn(SdkEvent) + Send + Sync + 'static,
    ) -> &mut Self {
        self.listeners.register(event_type, Arc::new(handler));
        self
    }

    /// Register a handler for authentication requests
    pub fn on_authentication_request(
        &mut self,
        handler: impl Fn(AuthenticationRequestEvent) + Send + Sync + 'static,
    ) -> &mut Self {
        self.add_event_listener(SdkEventType::AuthenticationRequest, move |event| match event {
            SdkEvent::AuthenticationRequest(request) => handler(request),
        })
    }

    /// Open the landing page for `event` and poll until its challenge resolves
    pub fn handle_authentication_request(
        &self,
        event: AuthenticationRequestEvent,
        opener: &dyn LandingPageOpener,
    ) -> ChallengeKey {
        self.poller.handle_authentication_request(event, opener)
    }

    /// Discover the tools exposed by `bridge_uid`
    ///
    /// # Errors
    ///
    /// Returns `ToolBridgeError::Decode` if the response does not match the
    /// expected shape, or `ToolBridgeError::Transport` if the request fails
    #[tracing::instrument(skip(self, messages), name = "get_tools")]
    pub async fn get_tools(
        &self,
        bridge_uid: &str,
        messages: &[P::Message],
    ) -> Result<Vec<P::Tool>, ToolBridgeError> {
        let request = GetToolsRequest {
            context: RequestContext {
                bridge_uid,
                messages,
            },
            messages,
            metadata: &self.metadata,
        };
        let path = format!("/bornio/v1/inference/{bridge_uid}/retrievetools");
        let response: GetToolsResponse = send(self.transport.as_ref(), &path, &request).await?;

        tracing::debug!(tools = response.tools.len(), "Tools discovered");
        Ok(self.provider.tools(&response.tools))
    }
}

impl<P: Provider> Drop for ToolBridgeClient<P> {
    fn drop(&mut self) {
        self.poller.cancel_all();
    }
}

impl<P: Provider + fmt::Debug> fmt::Debug for ToolBridgeClient<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolBridgeClient")
            .field("provider", &self.provider)
            .field("authentication", &self.authentication)
            .field("metadata", &self.metadata)
            .field("listeners", &self.listeners)
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}
