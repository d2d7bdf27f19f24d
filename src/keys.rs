//! Client directory: resolution of registered clients and optional trust-on-first-use
//! registration keyed by JWK thumbprint.

// self
use crate::{
	_prelude::*,
	model::{Client, ClientDisplay, ClientId, Jwk},
	store::ClientStore,
};

/// Resolves client identities for the engine's authentication entry points.
#[derive(Clone)]
pub struct ClientDirectory {
	store: Arc<dyn ClientStore>,
	trust_on_first_use: bool,
}
impl ClientDirectory {
	/// Creates a directory over the client store.
	pub fn new(store: Arc<dyn ClientStore>, trust_on_first_use: bool) -> Self {
		Self { store, trust_on_first_use }
	}

	/// Resolves a registered client by identifier.
	pub async fn resolve(&self, id: &ClientId) -> Result<Client> {
		self.store
			.fetch_client(id)
			.await?
			.ok_or_else(|| Error::InvalidClient { reason: format!("unknown client '{id}'") })
	}

	/// Resolves the client owning a presented key set without writing anything.
	///
	/// A known thumbprint resolves to the stored record (`unregistered = false`). An
	/// unknown one, with trust-on-first-use enabled, yields a candidate record
	/// (`unregistered = true`); the caller must prove possession of the key through
	/// signature verification before persisting the candidate via [`Self::register`].
	pub async fn identify(
		&self,
		key: &Jwk,
		display: Option<ClientDisplay>,
	) -> Result<(Client, bool)> {
		let id = ClientId::new(key.thumbprint())
			.map_err(|e| Error::InvalidClient { reason: e.to_string() })?;

		if let Some(client) = self.store.fetch_client(&id).await? {
			return Ok((client, false));
		}
		if !self.trust_on_first_use {
			return Err(Error::InvalidClient {
				reason: "unregistered client key; registration by presentation is disabled".into(),
			});
		}

		// Reject keys that cannot verify anything before offering them as a candidate.
		key.verifying_key().map_err(|e| Error::InvalidClient { reason: e.to_string() })?;

		let mut client = Client::new(id, vec![key.clone()]);

		if let Some(display) = display {
			client = client.with_display(display);
		}

		Ok((client, true))
	}

	/// Persists a candidate from [`Self::identify`] once the request proved possession
	/// of its key.
	///
	/// The minted identifier is the thumbprint of the presented key, so the same key
	/// always resolves to the same client and a lost insert race just re-reads the
	/// winner's record.
	pub async fn register(&self, client: Client) -> Result<Client> {
		if self.store.insert_client(client.clone()).await? {
			return Ok(client);
		}

		self.resolve(&client.id).await
	}
}
impl Debug for ClientDirectory {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientDirectory")
			.field("trust_on_first_use", &self.trust_on_first_use)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, store::MemoryStore};

	fn directory(trust_on_first_use: bool) -> ClientDirectory {
		ClientDirectory::new(Arc::new(MemoryStore::default()), trust_on_first_use)
	}

	#[tokio::test]
	async fn unknown_clients_are_invalid() {
		let id = ClientId::new("nobody").expect("Identifier fixture should be valid.");

		assert!(matches!(
			directory(false).resolve(&id).await,
			Err(Error::InvalidClient { .. })
		));
	}

	#[tokio::test]
	async fn first_use_identification_defers_the_write() {
		let directory = directory(true);
		let (_, jwk) = test_signing_key(1, "key-1");
		let (candidate, unregistered) = directory
			.identify(&jwk, None)
			.await
			.expect("First sight should yield a candidate.");

		assert!(unregistered);
		assert_eq!(&*candidate.id, jwk.thumbprint().as_str());
		// Nothing is persisted until the caller proves possession of the key.
		assert!(matches!(
			directory.resolve(&candidate.id).await,
			Err(Error::InvalidClient { .. })
		));

		let client =
			directory.register(candidate).await.expect("Registration should succeed.");
		let (again, unregistered) = directory
			.identify(&jwk, None)
			.await
			.expect("Second sight should resolve the stored record.");

		assert!(!unregistered);
		assert_eq!(again.id, client.id);
		assert_eq!(again.registered_at, client.registered_at);
	}

	#[tokio::test]
	async fn registration_by_presentation_can_be_disabled() {
		let (_, jwk) = test_signing_key(2, "key-2");

		assert!(matches!(
			directory(false).identify(&jwk, None).await,
			Err(Error::InvalidClient { .. })
		));
	}

	#[tokio::test]
	async fn unusable_keys_are_never_offered_as_candidates() {
		let jwk = Jwk::ed25519("key-3", "!!!not-base64url!!!");

		assert!(matches!(
			directory(true).identify(&jwk, None).await,
			Err(Error::InvalidClient { .. })
		));
	}
}
