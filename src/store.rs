//! Storage contracts for grant negotiation state.
//!
//! Every trait method that mutates more than one record commits atomically: either all
//! writes land or none do. Grant mutations are conditioned on the [`GrantRevision`]
//! observed at read time so concurrent requests for the same grant produce at most one
//! winning transition.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	model::{
		AccessItem, AccessToken, Client, ClientId, Grant, GrantId, GrantRevision, Interaction,
		InteractionId, TokenId,
	},
};

/// Future type returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Client registry contract.
pub trait ClientStore
where
	Self: Send + Sync,
{
	/// Registers a client; returns `false` when the identifier is already taken
	/// (first writer wins, the record is left untouched).
	fn insert_client(&self, client: Client) -> StoreFuture<'_, bool>;

	/// Fetches a client with its key set.
	fn fetch_client<'a>(&'a self, id: &'a ClientId) -> StoreFuture<'a, Option<Client>>;
}

/// Grant and interaction persistence contract.
pub trait GrantStore
where
	Self: Send + Sync,
{
	/// Persists a new grant together with its access rows as one atomic unit.
	fn insert_grant(
		&self,
		grant: Grant,
		accesses: Vec<AccessItem>,
	) -> StoreFuture<'_, ()>;

	/// Fetches a grant by identifier.
	fn fetch_grant<'a>(&'a self, id: &'a GrantId) -> StoreFuture<'a, Option<Grant>>;

	/// Resolves a grant by its current continuation secret.
	fn find_grant_by_continuation<'a>(&'a self, secret: &'a str)
	-> StoreFuture<'a, Option<Grant>>;

	/// Access rows created with the grant.
	fn accesses<'a>(&'a self, grant: &'a GrantId) -> StoreFuture<'a, Vec<AccessItem>>;

	/// All interaction attempts belonging to the grant.
	fn interactions<'a>(&'a self, grant: &'a GrantId) -> StoreFuture<'a, Vec<Interaction>>;

	/// Fetches one interaction attempt.
	fn fetch_interaction<'a>(
		&'a self,
		id: &'a InteractionId,
	) -> StoreFuture<'a, Option<Interaction>>;

	/// Upserts an interaction independently of its grant (resource-owner resolution);
	/// returns `false` when the owning grant is unknown.
	fn save_interaction(&self, interaction: Interaction) -> StoreFuture<'_, bool>;

	/// Atomically writes the grant plus the provided interaction upserts, but only if
	/// the stored grant still matches `expected`.
	fn commit_grant<'a>(
		&'a self,
		expected: &'a GrantRevision,
		grant: Grant,
		interactions: Vec<Interaction>,
	) -> StoreFuture<'a, CommitOutcome>;
}

/// Access token persistence contract.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Persists a freshly issued token.
	fn insert_token(&self, token: AccessToken) -> StoreFuture<'_, ()>;

	/// Fetches a token by management identifier.
	fn fetch_token<'a>(&'a self, id: &'a TokenId) -> StoreFuture<'a, Option<AccessToken>>;

	/// Resolves a token by its opaque value (introspection path).
	fn find_token_by_value<'a>(&'a self, value: &'a str)
	-> StoreFuture<'a, Option<AccessToken>>;

	/// All live tokens bound to a grant.
	fn tokens_for_grant<'a>(&'a self, grant: &'a GrantId) -> StoreFuture<'a, Vec<AccessToken>>;

	/// Atomically deletes `outgoing` and inserts `replacement` (rotation); `Missing`
	/// when the outgoing token is already gone.
	fn swap_token<'a>(
		&'a self,
		outgoing: &'a TokenId,
		replacement: AccessToken,
	) -> StoreFuture<'a, CommitOutcome>;

	/// Deletes a token; returns the identifier, or `None` when it was already gone.
	fn remove_token<'a>(&'a self, id: &'a TokenId) -> StoreFuture<'a, Option<TokenId>>;
}

/// Result of a revision-guarded commit attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitOutcome {
	/// The observed revision still held and the writes landed.
	Committed,
	/// Another transition won since the revision was read; nothing was written.
	StaleRevision,
	/// No record matched the provided identifier.
	Missing,
}

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_engine_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let engine_error: Error = store_error.clone().into();

		assert!(matches!(engine_error, Error::Storage(_)));
		assert!(engine_error.to_string().contains("database unreachable"));

		let source = StdError::source(&engine_error)
			.expect("Engine error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn commit_outcome_can_be_serialized() {
		let payload = serde_json::to_string(&CommitOutcome::StaleRevision)
			.expect("Commit outcome should serialize to JSON.");

		assert_eq!(payload, "\"StaleRevision\"");
	}
}
