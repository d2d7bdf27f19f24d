//! Access request records: a closed tagged union over the supported resource kinds.

// self
use crate::{_prelude::*, model::id::GrantId};

/// Resource kinds the engine can authorize access to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessKind {
	/// Account information access.
	Account,
	/// Incoming payment access.
	IncomingPayment,
	/// Outgoing payment access.
	OutgoingPayment,
	/// Quote access.
	Quote,
}
impl AccessKind {
	/// Stable wire label for the kind.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Account => "account",
			Self::IncomingPayment => "incoming-payment",
			Self::OutgoingPayment => "outgoing-payment",
			Self::Quote => "quote",
		}
	}
}
impl Display for AccessKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Actions a client may request against a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessAction {
	/// Create new resources.
	Create,
	/// Read a single resource.
	Read,
	/// List resources.
	List,
	/// Complete a resource lifecycle.
	Complete,
}

/// Fields shared by every access request variant; immutable after grant creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCommon {
	/// Requested actions; must not be empty.
	pub actions: Vec<AccessAction>,
	/// Optional specific resource identifier.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub identifier: Option<String>,
	/// Resource server locations.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub locations: Vec<Url>,
	/// Optional repeating interval (ISO 8601) for limited access.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub interval: Option<String>,
}

/// Monetary amount carried by outgoing payment limits. The value holds a serialized
/// bigint to survive JSON transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAmount {
	/// Amount value as a base-10 string.
	pub value: String,
	/// Asset code (e.g. `USD`).
	#[serde(rename = "assetCode")]
	pub asset_code: String,
	/// Asset scale.
	#[serde(rename = "assetScale")]
	pub asset_scale: u8,
}

/// Spend bounds attachable only to outgoing payment access.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingPaymentLimit {
	/// Payment pointer of the receiver.
	pub receiver: String,
	/// Maximum amount to send.
	#[serde(rename = "sendAmount", skip_serializing_if = "Option::is_none")]
	pub send_amount: Option<PaymentAmount>,
	/// Maximum amount to be received.
	#[serde(rename = "receiveAmount", skip_serializing_if = "Option::is_none")]
	pub receive_amount: Option<PaymentAmount>,
}

/// A single requested access right.
///
/// The union is closed: each resource kind states exactly which limit payload it can
/// carry, so policy assessment is an exhaustive match and a misplaced limit payload is
/// unrepresentable after deserialization (it fails with [`AccessRequestError`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAccessRequest", into = "RawAccessRequest")]
pub enum AccessRequest {
	/// Account information access; carries no limit payload.
	Account(AccessCommon),
	/// Incoming payment access; carries no limit payload.
	IncomingPayment(AccessCommon),
	/// Outgoing payment access with optional spend bounds.
	OutgoingPayment {
		/// Shared request fields.
		common: AccessCommon,
		/// Optional spend bounds.
		limits: Option<OutgoingPaymentLimit>,
	},
	/// Quote access; carries no limit payload.
	Quote(AccessCommon),
}
impl AccessRequest {
	/// Resource kind tag of this request.
	pub const fn kind(&self) -> AccessKind {
		match self {
			Self::Account(_) => AccessKind::Account,
			Self::IncomingPayment(_) => AccessKind::IncomingPayment,
			Self::OutgoingPayment { .. } => AccessKind::OutgoingPayment,
			Self::Quote(_) => AccessKind::Quote,
		}
	}

	/// Shared fields of the request.
	pub const fn common(&self) -> &AccessCommon {
		match self {
			Self::Account(common)
			| Self::IncomingPayment(common)
			| Self::OutgoingPayment { common, .. }
			| Self::Quote(common) => common,
		}
	}

	/// Limit payload, if the kind supports one and it was supplied.
	pub const fn limits(&self) -> Option<&OutgoingPaymentLimit> {
		match self {
			Self::OutgoingPayment { limits, .. } => limits.as_ref(),
			_ => None,
		}
	}

	/// Validates invariants not captured by the type shape.
	pub fn validate(&self) -> Result<(), AccessRequestError> {
		if self.common().actions.is_empty() {
			return Err(AccessRequestError::NoActions { kind: self.kind() });
		}

		Ok(())
	}
}

/// Errors raised while interpreting an access request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AccessRequestError {
	/// Limit payloads are only defined for outgoing payment access.
	#[error("A limits payload is not allowed on {kind} access requests.")]
	MisplacedLimits {
		/// Kind the limits were attached to.
		kind: AccessKind,
	},
	/// Every access request must name at least one action.
	#[error("{kind} access request names no actions.")]
	NoActions {
		/// Kind missing actions.
		kind: AccessKind,
	},
}

/// Wire-shape intermediary: limits are syntactically possible on any kind and rejected
/// semantically, so the error names the offending combination instead of a generic
/// unknown-field failure.
#[derive(Serialize, Deserialize)]
struct RawAccessRequest {
	#[serde(rename = "type")]
	kind: AccessKind,
	#[serde(flatten)]
	common: AccessCommon,
	#[serde(skip_serializing_if = "Option::is_none")]
	limits: Option<OutgoingPaymentLimit>,
}
impl TryFrom<RawAccessRequest> for AccessRequest {
	type Error = AccessRequestError;

	fn try_from(raw: RawAccessRequest) -> Result<Self, Self::Error> {
		match raw.kind {
			AccessKind::OutgoingPayment =>
				Ok(Self::OutgoingPayment { common: raw.common, limits: raw.limits }),
			kind if raw.limits.is_some() => Err(AccessRequestError::MisplacedLimits { kind }),
			AccessKind::Account => Ok(Self::Account(raw.common)),
			AccessKind::IncomingPayment => Ok(Self::IncomingPayment(raw.common)),
			AccessKind::Quote => Ok(Self::Quote(raw.common)),
		}
	}
}
impl From<AccessRequest> for RawAccessRequest {
	fn from(request: AccessRequest) -> Self {
		let kind = request.kind();

		match request {
			AccessRequest::Account(common)
			| AccessRequest::IncomingPayment(common)
			| AccessRequest::Quote(common) => Self { kind, common, limits: None },
			AccessRequest::OutgoingPayment { common, limits } => Self { kind, common, limits },
		}
	}
}

/// A persisted access right, created atomically with its grant and immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessItem {
	/// Owning grant.
	pub grant: GrantId,
	/// The requested right.
	pub request: AccessRequest,
	/// Creation instant.
	pub created_at: OffsetDateTime,
}
impl AccessItem {
	/// Binds a request to its grant.
	pub fn new(grant: GrantId, request: AccessRequest) -> Self {
		Self { grant, request, created_at: OffsetDateTime::now_utc() }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parses_outgoing_payment_with_limits() {
		let payload = r#"{
			"type": "outgoing-payment",
			"actions": ["create", "read"],
			"identifier": "alice",
			"limits": {
				"receiver": "https://wallet.example/bob",
				"sendAmount": { "value": "1000", "assetCode": "USD", "assetScale": 2 }
			}
		}"#;
		let request: AccessRequest =
			serde_json::from_str(payload).expect("Outgoing payment request should parse.");

		assert_eq!(request.kind(), AccessKind::OutgoingPayment);
		assert_eq!(request.limits().map(|l| l.receiver.as_str()), Some("https://wallet.example/bob"));
		request.validate().expect("Well-formed request should validate.");
	}

	#[test]
	fn rejects_limits_on_incoming_payment() {
		let payload = r#"{
			"type": "incoming-payment",
			"actions": ["read"],
			"limits": { "receiver": "https://wallet.example/bob" }
		}"#;
		let err = serde_json::from_str::<AccessRequest>(payload)
			.expect_err("Misplaced limits must fail to parse.");

		assert!(err.to_string().contains("not allowed on incoming-payment"));
	}

	#[test]
	fn empty_action_lists_fail_validation() {
		let request: AccessRequest = serde_json::from_str(r#"{"type":"quote","actions":[]}"#)
			.expect("Quote request shape should parse.");

		assert_eq!(
			request.validate(),
			Err(AccessRequestError::NoActions { kind: AccessKind::Quote })
		);
	}

	#[test]
	fn round_trips_through_wire_shape() {
		let request = AccessRequest::Account(AccessCommon {
			actions: vec![AccessAction::Read, AccessAction::List],
			identifier: Some("acct-1".into()),
			locations: vec![],
			interval: None,
		});
		let payload = serde_json::to_string(&request).expect("Request should serialize.");
		let parsed: AccessRequest =
			serde_json::from_str(&payload).expect("Serialized request should parse back.");

		assert_eq!(parsed, request);
		assert!(payload.contains("\"type\":\"account\""));
	}
}
