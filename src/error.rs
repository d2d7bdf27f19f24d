//! Engine-level error types and the GNAP protocol error code table.

// self
use crate::{_prelude::*, httpsig::SignatureError, model::GrantState, store::StoreError};

/// Engine-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical engine error exposed by public APIs.
///
/// Variants carrying an [`ErrorCode`] surface to callers as GNAP protocol error bodies;
/// the rest (storage, state-machine bugs) are internal failures that must never be
/// serialized onto the wire.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
	/// Request signature verification failed.
	#[error(transparent)]
	Signature(#[from] SignatureError),

	/// Malformed or contradictory request input.
	#[error("Invalid request: {reason}.")]
	InvalidRequest {
		/// Human-readable rejection reason.
		reason: String,
	},
	/// Unknown or unauthenticated caller.
	#[error("Invalid client: {reason}.")]
	InvalidClient {
		/// Human-readable rejection reason.
		reason: String,
	},
	/// Continuation or token reference did not resolve to an ongoing request.
	#[error("Unknown request: {reason}.")]
	UnknownRequest {
		/// Human-readable rejection reason.
		reason: String,
	},
	/// Continuation request arrived before the advertised wait interval elapsed.
	#[error("Grant continued too fast; wait {wait} seconds between continuation calls.")]
	TooFast {
		/// Advertised minimum wait in seconds.
		wait: u64,
	},
	/// Interaction reference was wrong, already finished, or expired.
	#[error("Invalid interaction: {reason}.")]
	InvalidInteraction {
		/// Human-readable rejection reason.
		reason: String,
	},
	/// The resource owner denied the request.
	#[error("The resource owner denied the request.")]
	UserDenied,
	/// The request was denied by policy.
	#[error("The request was denied.")]
	RequestDenied,

	/// The state machine produced a state it should never respond from.
	#[error("Grant left in unexpected state {state:?} after processing.")]
	UnexpectedState {
		/// The offending grant state.
		state: GrantState,
	},
}
impl Error {
	/// Protocol error code for this error, or `None` for internal failures.
	pub fn code(&self) -> Option<ErrorCode> {
		match self {
			Self::Storage(_) | Self::UnexpectedState { .. } => None,
			Self::Signature(_) | Self::InvalidClient { .. } => Some(ErrorCode::InvalidClient),
			Self::InvalidRequest { .. } => Some(ErrorCode::InvalidRequest),
			Self::UnknownRequest { .. } => Some(ErrorCode::UnknownRequest),
			Self::TooFast { .. } => Some(ErrorCode::TooFast),
			Self::InvalidInteraction { .. } => Some(ErrorCode::InvalidInteraction),
			Self::UserDenied => Some(ErrorCode::UserDenied),
			Self::RequestDenied => Some(ErrorCode::RequestDenied),
		}
	}

	/// HTTP status the external layer should respond with; internal failures map to 500.
	pub fn http_status(&self) -> u16 {
		self.code().map_or(500, ErrorCode::http_status)
	}
}

/// Enumerated GNAP protocol error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
	/// The request is missing a required parameter or is otherwise malformed.
	InvalidRequest,
	/// The request came from an unrecognized client or its signature validation failed.
	InvalidClient,
	/// The resource owner denied the request.
	UserDenied,
	/// The client did not respect the advertised wait interval.
	TooFast,
	/// The request referenced an unknown ongoing access request.
	UnknownRequest,
	/// The request was denied for an unspecified reason.
	RequestDenied,
	/// The interaction reference was incorrect or the interaction modes expired.
	InvalidInteraction,
}
impl ErrorCode {
	/// Stable wire label for the code.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::InvalidRequest => "invalid_request",
			Self::InvalidClient => "invalid_client",
			Self::UserDenied => "user_denied",
			Self::TooFast => "too_fast",
			Self::UnknownRequest => "unknown_request",
			Self::RequestDenied => "request_denied",
			Self::InvalidInteraction => "invalid_interaction",
		}
	}

	/// Complete HTTP status mapping for protocol errors.
	pub const fn http_status(self) -> u16 {
		match self {
			Self::InvalidRequest | Self::InvalidInteraction => 400,
			Self::InvalidClient => 401,
			Self::UserDenied | Self::RequestDenied => 403,
			Self::UnknownRequest => 404,
			Self::TooFast => 429,
		}
	}
}
impl Display for ErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn every_code_has_a_dedicated_status() {
		assert_eq!(ErrorCode::InvalidRequest.http_status(), 400);
		assert_eq!(ErrorCode::InvalidClient.http_status(), 401);
		assert_eq!(ErrorCode::UserDenied.http_status(), 403);
		assert_eq!(ErrorCode::RequestDenied.http_status(), 403);
		assert_eq!(ErrorCode::UnknownRequest.http_status(), 404);
		assert_eq!(ErrorCode::TooFast.http_status(), 429);
		assert_eq!(ErrorCode::InvalidInteraction.http_status(), 400);
	}

	#[test]
	fn internal_errors_carry_no_protocol_code() {
		let storage: Error = StoreError::Backend { message: "down".into() }.into();

		assert_eq!(storage.code(), None);
		assert_eq!(storage.http_status(), 500);
	}

	#[test]
	fn codes_serialize_with_wire_labels() {
		let payload = serde_json::to_string(&ErrorCode::InvalidInteraction)
			.expect("Error code should serialize to JSON.");

		assert_eq!(payload, "\"invalid_interaction\"");
	}
}
