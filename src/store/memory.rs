//! Thread-safe in-memory store implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	model::{
		AccessItem, AccessToken, Client, ClientId, Grant, GrantId, GrantRevision, Interaction,
		InteractionId, TokenId,
	},
	store::{ClientStore, CommitOutcome, GrantStore, StoreFuture, TokenStore},
};

#[derive(Debug, Default)]
struct Inner {
	clients: HashMap<ClientId, Client>,
	grants: HashMap<GrantId, Grant>,
	accesses: HashMap<GrantId, Vec<AccessItem>>,
	interactions: HashMap<InteractionId, Interaction>,
	tokens: HashMap<TokenId, AccessToken>,
}

type Shared = Arc<RwLock<Inner>>;

/// Thread-safe storage backend that keeps negotiation state in-process.
///
/// One write lock spans every multi-record commit, which is what makes the
/// trait-level atomicity guarantees hold here.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Shared);
impl MemoryStore {
	fn insert_client_now(shared: Shared, client: Client) -> bool {
		let mut guard = shared.write();

		if guard.clients.contains_key(&client.id) {
			return false;
		}

		guard.clients.insert(client.id.clone(), client);

		true
	}

	fn insert_grant_now(shared: Shared, grant: Grant, accesses: Vec<AccessItem>) {
		let mut guard = shared.write();

		guard.accesses.insert(grant.id.clone(), accesses);
		guard.grants.insert(grant.id.clone(), grant);
	}

	fn commit_grant_now(
		shared: Shared,
		expected: GrantRevision,
		grant: Grant,
		interactions: Vec<Interaction>,
	) -> CommitOutcome {
		let mut guard = shared.write();
		let outcome = match guard.grants.get(&grant.id) {
			Some(stored) if expected.matches(stored) => CommitOutcome::Committed,
			Some(_) => CommitOutcome::StaleRevision,
			None => CommitOutcome::Missing,
		};

		if matches!(outcome, CommitOutcome::Committed) {
			for interaction in interactions {
				guard.interactions.insert(interaction.id.clone(), interaction);
			}

			guard.grants.insert(grant.id.clone(), grant);
		}

		outcome
	}

	fn save_interaction_now(shared: Shared, interaction: Interaction) -> bool {
		let mut guard = shared.write();

		if !guard.grants.contains_key(&interaction.grant) {
			return false;
		}

		guard.interactions.insert(interaction.id.clone(), interaction);

		true
	}

	fn swap_token_now(
		shared: Shared,
		outgoing: TokenId,
		replacement: AccessToken,
	) -> CommitOutcome {
		let mut guard = shared.write();

		if guard.tokens.remove(&outgoing).is_none() {
			return CommitOutcome::Missing;
		}

		guard.tokens.insert(replacement.id.clone(), replacement);

		CommitOutcome::Committed
	}
}
impl ClientStore for MemoryStore {
	fn insert_client(&self, client: Client) -> StoreFuture<'_, bool> {
		let shared = self.0.clone();

		Box::pin(async move { Ok(Self::insert_client_now(shared, client)) })
	}

	fn fetch_client<'a>(&'a self, id: &'a ClientId) -> StoreFuture<'a, Option<Client>> {
		let shared = self.0.clone();
		let id = id.to_owned();

		Box::pin(async move { Ok(shared.read().clients.get(&id).cloned()) })
	}
}
impl GrantStore for MemoryStore {
	fn insert_grant(&self, grant: Grant, accesses: Vec<AccessItem>) -> StoreFuture<'_, ()> {
		let shared = self.0.clone();

		Box::pin(async move {
			Self::insert_grant_now(shared, grant, accesses);

			Ok(())
		})
	}

	fn fetch_grant<'a>(&'a self, id: &'a GrantId) -> StoreFuture<'a, Option<Grant>> {
		let shared = self.0.clone();
		let id = id.to_owned();

		Box::pin(async move { Ok(shared.read().grants.get(&id).cloned()) })
	}

	fn find_grant_by_continuation<'a>(
		&'a self,
		secret: &'a str,
	) -> StoreFuture<'a, Option<Grant>> {
		let shared = self.0.clone();
		let secret = secret.to_owned();

		Box::pin(async move {
			Ok(shared
				.read()
				.grants
				.values()
				.find(|grant| grant.continuation.expose() == secret)
				.cloned())
		})
	}

	fn accesses<'a>(&'a self, grant: &'a GrantId) -> StoreFuture<'a, Vec<AccessItem>> {
		let shared = self.0.clone();
		let grant = grant.to_owned();

		Box::pin(async move { Ok(shared.read().accesses.get(&grant).cloned().unwrap_or_default()) })
	}

	fn interactions<'a>(&'a self, grant: &'a GrantId) -> StoreFuture<'a, Vec<Interaction>> {
		let shared = self.0.clone();
		let grant = grant.to_owned();

		Box::pin(async move {
			Ok(shared
				.read()
				.interactions
				.values()
				.filter(|interaction| interaction.grant == grant)
				.cloned()
				.collect())
		})
	}

	fn fetch_interaction<'a>(
		&'a self,
		id: &'a InteractionId,
	) -> StoreFuture<'a, Option<Interaction>> {
		let shared = self.0.clone();
		let id = id.to_owned();

		Box::pin(async move { Ok(shared.read().interactions.get(&id).cloned()) })
	}

	fn save_interaction(&self, interaction: Interaction) -> StoreFuture<'_, bool> {
		let shared = self.0.clone();

		Box::pin(async move { Ok(Self::save_interaction_now(shared, interaction)) })
	}

	fn commit_grant<'a>(
		&'a self,
		expected: &'a GrantRevision,
		grant: Grant,
		interactions: Vec<Interaction>,
	) -> StoreFuture<'a, CommitOutcome> {
		let shared = self.0.clone();
		let expected = expected.to_owned();

		Box::pin(async move { Ok(Self::commit_grant_now(shared, expected, grant, interactions)) })
	}
}
impl TokenStore for MemoryStore {
	fn insert_token(&self, token: AccessToken) -> StoreFuture<'_, ()> {
		let shared = self.0.clone();

		Box::pin(async move {
			shared.write().tokens.insert(token.id.clone(), token);

			Ok(())
		})
	}

	fn fetch_token<'a>(&'a self, id: &'a TokenId) -> StoreFuture<'a, Option<AccessToken>> {
		let shared = self.0.clone();
		let id = id.to_owned();

		Box::pin(async move { Ok(shared.read().tokens.get(&id).cloned()) })
	}

	fn find_token_by_value<'a>(
		&'a self,
		value: &'a str,
	) -> StoreFuture<'a, Option<AccessToken>> {
		let shared = self.0.clone();
		let value = value.to_owned();

		Box::pin(async move {
			Ok(shared.read().tokens.values().find(|token| token.value.expose() == value).cloned())
		})
	}

	fn tokens_for_grant<'a>(&'a self, grant: &'a GrantId) -> StoreFuture<'a, Vec<AccessToken>> {
		let shared = self.0.clone();
		let grant = grant.to_owned();

		Box::pin(async move {
			Ok(shared.read().tokens.values().filter(|token| token.grant == grant).cloned().collect())
		})
	}

	fn swap_token<'a>(
		&'a self,
		outgoing: &'a TokenId,
		replacement: AccessToken,
	) -> StoreFuture<'a, CommitOutcome> {
		let shared = self.0.clone();
		let outgoing = outgoing.to_owned();

		Box::pin(async move { Ok(Self::swap_token_now(shared, outgoing, replacement)) })
	}

	fn remove_token<'a>(&'a self, id: &'a TokenId) -> StoreFuture<'a, Option<TokenId>> {
		let shared = self.0.clone();
		let id = id.to_owned();

		Box::pin(async move { Ok(shared.write().tokens.remove(&id).map(|token| token.id)) })
	}
}
