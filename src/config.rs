//! Engine configuration: issuer URIs, offered interaction methods, pacing and expiry
//! defaults, constructed once at startup and passed by reference into the engine.

// self
use crate::{
	_prelude::*,
	model::{GrantId, InteractionId, StartMethod, TokenId},
};

/// Errors raised while constructing or validating an engine config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ConfigError {
	/// The issuer base must use HTTPS.
	#[error("The issuer URI must use HTTPS: {url}.")]
	InsecureIssuer {
		/// Offending URI.
		url: String,
	},
	/// The issuer base cannot carry a query or fragment.
	#[error("The issuer URI must not carry a query or fragment: {url}.")]
	IssuerNotABase {
		/// Offending URI.
		url: String,
	},
	/// At least one start method must be offered for interactive grants.
	#[error("At least one interaction start method must be offered.")]
	NoStartMethods,
	/// The advertised wait must be positive.
	#[error("The continuation wait must be at least one second.")]
	NonPositiveWait,
	/// Token expiry must be positive.
	#[error("The token expiry must be at least one second.")]
	NonPositiveTokenExpiry,
}

/// Immutable engine configuration consumed by every component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
	/// Authorization server base URI; continuation, interaction, and token management
	/// URIs are derived from it.
	pub issuer: Url,
	/// Start methods the server offers for interactions.
	pub start_methods: Vec<StartMethod>,
	/// Advertised minimum wait between continuation calls.
	pub wait: Duration,
	/// Default access token validity window.
	pub token_expiry: Duration,
	/// Lifetime bound applied to created interactions; `None` leaves attempts unbounded.
	pub interaction_expiry: Option<Duration>,
	/// Permits registering a previously unknown client from its first-seen key set.
	/// Off by default: auto-registration is a spoofing/DoS exposure.
	pub trust_on_first_use: bool,
}
impl EngineConfig {
	/// Creates a new builder for the provided issuer base.
	pub fn builder(issuer: Url) -> EngineConfigBuilder {
		EngineConfigBuilder::new(issuer)
	}

	/// Continuation URI advertised for a grant.
	pub fn continue_uri(&self, grant: &GrantId) -> Url {
		self.join(&format!("continue/{grant}"))
	}

	/// Interaction URI for redirect/app attempts.
	pub fn interact_uri(&self, interaction: &InteractionId) -> Url {
		self.join(&format!("interact/{interaction}"))
	}

	/// Stable device URI communicated alongside user codes.
	pub fn device_uri(&self) -> Url {
		self.join("device")
	}

	/// Token management URI for an issued token.
	pub fn token_manage_uri(&self, token: &TokenId) -> Url {
		self.join(&format!("token/{token}"))
	}

	/// Advertised wait in whole seconds.
	pub fn wait_secs(&self) -> u64 {
		self.wait.whole_seconds().max(0) as u64
	}

	/// Default token expiry in whole seconds.
	pub fn token_expiry_secs(&self) -> u64 {
		self.token_expiry.whole_seconds().max(0) as u64
	}

	fn join(&self, path: &str) -> Url {
		// The builder guarantees the issuer is a valid HTTPS base, so joining a
		// relative path cannot fail.
		let mut url = self.issuer.clone();
		let joined = format!("{}/{path}", url.path().trim_end_matches('/'));

		url.set_path(&joined);

		url
	}
}

/// Builder for [`EngineConfig`] values.
#[derive(Debug)]
pub struct EngineConfigBuilder {
	/// Issuer base URI.
	pub issuer: Url,
	/// Offered start methods.
	pub start_methods: Vec<StartMethod>,
	/// Advertised continuation wait.
	pub wait: Duration,
	/// Default token validity window.
	pub token_expiry: Duration,
	/// Interaction lifetime bound.
	pub interaction_expiry: Option<Duration>,
	/// Trust-on-first-use registration flag.
	pub trust_on_first_use: bool,
}
impl EngineConfigBuilder {
	/// Creates a builder seeded with the issuer and the default knobs: redirect-only
	/// interactions, 30 second wait, 10 minute tokens, 10 minute interactions.
	pub fn new(issuer: Url) -> Self {
		Self {
			issuer,
			start_methods: vec![StartMethod::Redirect],
			wait: Duration::seconds(30),
			token_expiry: Duration::seconds(600),
			interaction_expiry: Some(Duration::seconds(600)),
			trust_on_first_use: false,
		}
	}

	/// Replaces the offered start methods.
	pub fn start_methods<I>(mut self, methods: I) -> Self
	where
		I: IntoIterator<Item = StartMethod>,
	{
		self.start_methods = methods.into_iter().collect();

		self
	}

	/// Overrides the advertised continuation wait.
	pub fn wait(mut self, wait: Duration) -> Self {
		self.wait = wait;

		self
	}

	/// Overrides the default token expiry.
	pub fn token_expiry(mut self, expiry: Duration) -> Self {
		self.token_expiry = expiry;

		self
	}

	/// Overrides the interaction lifetime bound; `None` leaves attempts unbounded.
	pub fn interaction_expiry(mut self, expiry: Option<Duration>) -> Self {
		self.interaction_expiry = expiry;

		self
	}

	/// Enables or disables trust-on-first-use client registration.
	pub fn trust_on_first_use(mut self, enabled: bool) -> Self {
		self.trust_on_first_use = enabled;

		self
	}

	/// Validates and produces the config.
	pub fn build(self) -> Result<EngineConfig, ConfigError> {
		if self.issuer.scheme() != "https" {
			return Err(ConfigError::InsecureIssuer { url: self.issuer.to_string() });
		}
		if self.issuer.query().is_some() || self.issuer.fragment().is_some() {
			return Err(ConfigError::IssuerNotABase { url: self.issuer.to_string() });
		}
		if self.start_methods.is_empty() {
			return Err(ConfigError::NoStartMethods);
		}
		if self.wait < Duration::seconds(1) {
			return Err(ConfigError::NonPositiveWait);
		}
		if self.token_expiry < Duration::seconds(1) {
			return Err(ConfigError::NonPositiveTokenExpiry);
		}

		Ok(EngineConfig {
			issuer: self.issuer,
			start_methods: self.start_methods,
			wait: self.wait,
			token_expiry: self.token_expiry,
			interaction_expiry: self.interaction_expiry,
			trust_on_first_use: self.trust_on_first_use,
		})
	}
}
