//! Registered client instance records.

// self
use crate::{
	_prelude::*,
	model::{Jwk, id::ClientId},
};

/// Human-facing client metadata supplied at registration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDisplay {
	/// Display name shown during interaction.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Origin URL of the client instance.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub uri: Option<Url>,
}

/// A client instance known to the authorization server, owning its verification keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
	/// Client identifier (pre-registered or a JWK thumbprint minted on first use).
	pub id: ClientId,
	/// Display metadata, if supplied.
	pub display: Option<ClientDisplay>,
	/// Verification key set; keys are owned exclusively by this client.
	pub keys: Vec<Jwk>,
	/// Registration instant.
	pub registered_at: OffsetDateTime,
}
impl Client {
	/// Creates a client record owning the provided keys.
	pub fn new(id: ClientId, keys: Vec<Jwk>) -> Self {
		Self { id, display: None, keys, registered_at: OffsetDateTime::now_utc() }
	}

	/// Attaches display metadata.
	pub fn with_display(mut self, display: ClientDisplay) -> Self {
		self.display = Some(display);

		self
	}

	/// Looks up a verification key by its `kid`.
	pub fn key(&self, kid: &str) -> Option<&Jwk> {
		self.keys.iter().find(|key| key.kid == kid)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn key_lookup_matches_kid_exactly() {
		let client = Client::new(
			ClientId::new("client-1").expect("Client fixture should be valid."),
			vec![Jwk::ed25519("key-a", "AA"), Jwk::ed25519("key-b", "BB")],
		);

		assert_eq!(client.key("key-b").map(|k| k.x.as_str()), Some("BB"));
		assert!(client.key("key-c").is_none());
		assert!(client.key("KEY-A").is_none());
	}
}
