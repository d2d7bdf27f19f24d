//! Grant negotiation records and lifecycle states.

// self
use crate::{
	_prelude::*,
	model::{
		id::{ClientId, GrantId},
		secret::Secret,
	},
};

/// Lifecycle state of a grant negotiation.
///
/// `Finalized` is terminal: no further mutation of state, tokens, or interactions is
/// permitted once entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantState {
	/// The engine is evaluating the request; the grant must leave this state before a
	/// response can be produced.
	Processing,
	/// Resource-owner interaction is outstanding; only continuation is possible.
	Pending,
	/// Access was approved; tokens can be issued.
	Approved,
	/// The negotiation is over; the grant is dead and cannot be revived.
	Finalized,
}
impl GrantState {
	/// Stable wire label for the state.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Processing => "processing",
			Self::Pending => "pending",
			Self::Approved => "approved",
			Self::Finalized => "finalized",
		}
	}
}
impl Display for GrantState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Interaction start modes a client can offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartMethod {
	/// Direct the end user to an arbitrary URI.
	Redirect,
	/// Launch an application on the end user's device.
	App,
	/// Communicate a short human-typable code for a stable URI.
	UserCode,
	/// Communicate a short code together with a dynamic URI.
	UserCodeUri,
}
impl StartMethod {
	/// Stable wire label for the method.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Redirect => "redirect",
			Self::App => "app",
			Self::UserCode => "user_code",
			Self::UserCodeUri => "user_code_uri",
		}
	}

	/// Whether interactions started with this method carry a human code.
	pub const fn uses_code(self) -> bool {
		matches!(self, Self::UserCode | Self::UserCodeUri)
	}

	/// Whether interactions started with this method carry a URI.
	pub const fn uses_uri(self) -> bool {
		matches!(self, Self::Redirect | Self::App | Self::UserCodeUri)
	}
}
impl Display for StartMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How the server signals interaction completion back to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishMethod {
	/// Front-channel redirect of the resource owner back to the client.
	Redirect,
	/// Back-channel HTTP POST to the client's callback URI.
	Push,
}

/// Finish-callback descriptor supplied at grant initiation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishSpec {
	/// Callback method.
	pub method: FinishMethod,
	/// Client callback URI.
	pub uri: Url,
	/// Client-chosen nonce used in the callback hash calculation.
	pub nonce: String,
}

/// A grant negotiation tracked through its lifecycle states.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
	/// Grant identifier.
	pub id: GrantId,
	/// Owning client; exactly one per grant.
	pub client: ClientId,
	/// Current lifecycle state.
	pub state: GrantState,
	/// Start methods the client declared support for.
	pub start_methods: Vec<StartMethod>,
	/// Finish-callback descriptor, when the client supplied one.
	pub finish: Option<FinishSpec>,
	/// Server-generated nonce echoed in interaction finish responses.
	pub interact_nonce: Secret,
	/// Rotating continuation credential; rotated on every continuation offer.
	pub continuation: Secret,
	/// Advertised minimum wait between continuation calls.
	pub wait: Duration,
	/// Instant of the last response that offered continuation; pacing anchor.
	pub last_continued_at: Option<OffsetDateTime>,
	/// Creation instant.
	pub created_at: OffsetDateTime,
	/// Last mutation instant.
	pub updated_at: OffsetDateTime,
}
impl Grant {
	/// Creates a new grant in `Processing` for the provided client.
	pub fn new(
		client: ClientId,
		start_methods: Vec<StartMethod>,
		finish: Option<FinishSpec>,
		wait: Duration,
	) -> Self {
		let now = OffsetDateTime::now_utc();

		Self {
			id: GrantId::random(),
			client,
			state: GrantState::Processing,
			start_methods,
			finish,
			interact_nonce: Secret::random(32),
			continuation: Secret::random(32),
			wait,
			last_continued_at: None,
			created_at: now,
			updated_at: now,
		}
	}

	/// Whether the grant reached its terminal state.
	pub const fn is_finalized(&self) -> bool {
		matches!(self.state, GrantState::Finalized)
	}

	/// Optimistic revision observed at read time; commits are conditioned on it.
	pub fn revision(&self) -> GrantRevision {
		GrantRevision { state: self.state, continuation: self.continuation.expose().to_owned() }
	}
}

/// The `(state, continuation secret)` pair a grant commit is conditioned on.
///
/// Two near-simultaneous continuation calls observe the same revision; only the first
/// commit wins, because the winner's write changes both members.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantRevision {
	/// State observed at read time.
	pub state: GrantState,
	/// Continuation secret observed at read time.
	pub continuation: String,
}
impl GrantRevision {
	/// Whether a stored grant still matches this revision.
	pub fn matches(&self, grant: &Grant) -> bool {
		self.state == grant.state && self.continuation == grant.continuation.expose()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn fixture() -> Grant {
		Grant::new(
			ClientId::new("client-1").expect("Client fixture should be valid."),
			vec![StartMethod::Redirect],
			None,
			Duration::seconds(30),
		)
	}

	#[test]
	fn new_grants_start_processing_with_distinct_secrets() {
		let grant = fixture();

		assert_eq!(grant.state, GrantState::Processing);
		assert!(grant.last_continued_at.is_none());
		assert_ne!(grant.interact_nonce.expose(), grant.continuation.expose());
	}

	#[test]
	fn revision_tracks_state_and_continuation() {
		let mut grant = fixture();
		let revision = grant.revision();

		assert!(revision.matches(&grant));

		grant.state = GrantState::Pending;

		assert!(!revision.matches(&grant));

		grant.state = revision.state;
		grant.continuation = Secret::random(32);

		assert!(!revision.matches(&grant));
	}

	#[test]
	fn start_method_capabilities() {
		assert!(StartMethod::UserCode.uses_code());
		assert!(!StartMethod::UserCode.uses_uri());
		assert!(StartMethod::UserCodeUri.uses_code());
		assert!(StartMethod::UserCodeUri.uses_uri());
		assert!(StartMethod::Redirect.uses_uri());
		assert!(!StartMethod::App.uses_code());
	}
}
