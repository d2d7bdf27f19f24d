//! Wire payloads: request bodies the engine parses and response bodies it assembles.
//!
//! These types define the JSON surface; the engine never serializes internal records
//! directly. Parsing goes through [`parse_json`] so malformed input is rejected with the
//! exact JSON path that failed.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::ErrorCode,
	model::{AccessRequest, ClientDisplay, FinishSpec, GrantId, Jwk, Secret, StartMethod},
	token::Introspection,
};

/// Grant initiation request body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRequest {
	/// Requested token and its access rights.
	pub access_token: AccessTokenRequest,
	/// Client self-description; absent when the client authenticates by reference.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub client: Option<ClientPayload>,
	/// Interaction capabilities the client declares.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub interact: Option<InteractRequest>,
}

/// The `access_token` member of an initiation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenRequest {
	/// Requested access rights; must not be empty.
	pub access: Vec<AccessRequest>,
}

/// Client self-description carried in an initiation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPayload {
	/// Display metadata shown during interaction.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub display: Option<ClientDisplay>,
	/// Proofing key the request is signed with.
	pub key: Jwk,
}

/// The `interact` member of an initiation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractRequest {
	/// Start methods the client can drive.
	pub start: Vec<StartMethod>,
	/// Finish callback, when the client can receive one.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub finish: Option<FinishSpec>,
}

/// Continuation request body; an empty body (no `interact_ref`) is a poll.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinueBody {
	/// Interaction reference delivered through the finish callback.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub interact_ref: Option<String>,
}

/// Introspection request body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionRequest {
	/// The presented token value.
	pub access_token: String,
}

/// Successful grant response body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantPayload {
	/// Continuation handle; present whenever the negotiation is still alive.
	#[serde(rename = "continue", skip_serializing_if = "Option::is_none")]
	pub continuation: Option<ContinueResponse>,
	/// Issued access token, once the grant is approved.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub access_token: Option<AccessTokenResponse>,
	/// Interaction instructions, while resource-owner input is outstanding.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub interact: Option<InteractResponse>,
}

/// The `continue` member of a grant response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinueResponse {
	/// URI to continue the grant at.
	pub uri: Url,
	/// Minimum seconds to wait before continuing.
	pub wait: u64,
	/// Continuation credential presented as `Authorization: GNAP <value>`.
	pub access_token: ContinueToken,
}

/// Wrapper for the continuation credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinueToken {
	/// The rotating continuation secret.
	pub value: Secret,
}

/// An issued access token as rendered on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenResponse {
	/// Opaque token value.
	pub value: Secret,
	/// Token management URI (rotation, revocation).
	pub manage: Url,
	/// Rights the token carries.
	pub access: Vec<AccessRequest>,
	/// Validity window in seconds.
	pub expires_in: u64,
}

/// Token management (rotation) response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
	/// The replacement token.
	pub access_token: AccessTokenResponse,
}

/// The `interact` member of a grant response; one entry per created attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractResponse {
	/// Redirect interaction URI.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub redirect: Option<Url>,
	/// App-launch interaction URI.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub app: Option<Url>,
	/// Human-typable code for the stable device URI.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_code: Option<String>,
	/// Human-typable code paired with a dynamic URI.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_code_uri: Option<UserCodeUriPayload>,
	/// Server nonce for finish callback hash calculation.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub finish: Option<Secret>,
	/// Seconds until the offered attempts expire.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expires_in: Option<u64>,
}

/// The `user_code_uri` interaction entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCodeUriPayload {
	/// Human-typable code.
	pub code: String,
	/// URI to enter the code at.
	pub uri: Url,
}

/// Introspection response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionResponse {
	/// Whether the presented value names a live token.
	pub active: bool,
	/// Owning grant, for active tokens.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub grant: Option<GrantId>,
	/// Rights the token carries, for active tokens.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub access: Vec<AccessRequest>,
	/// Remaining validity in seconds, for active tokens.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expires_in: Option<u64>,
}
impl From<Introspection> for IntrospectionResponse {
	fn from(report: Introspection) -> Self {
		Self {
			active: report.active,
			grant: report.grant,
			access: report.access,
			expires_in: report.expires_in,
		}
	}
}

/// Protocol error response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Enumerated protocol error code.
	pub error: ErrorCode,
	/// Human-readable description; never load-bearing for clients.
	pub error_description: String,
}
impl ErrorBody {
	/// Renders an engine error as a wire body, or `None` for internal failures that must
	/// not leak onto the wire.
	pub fn from_error(error: &Error) -> Option<Self> {
		error.code().map(|code| Self { error: code, error_description: error.to_string() })
	}
}

/// Parses a JSON request body, reporting the failing path on malformed input.
pub fn parse_json<T>(bytes: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| Error::InvalidRequest { reason: e.to_string() })
}
