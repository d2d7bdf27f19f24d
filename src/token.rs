//! Access token issuance, rotation, revocation, and introspection.
//!
//! Tokens are opaque values bound to exactly one grant. Rotation is delete-plus-create
//! in one storage transaction: the replacement inherits the outgoing token's validity
//! window length, and the outgoing value stops resolving immediately.

// self
use crate::{
	_prelude::*,
	model::{AccessRequest, AccessToken, GrantId, TokenId},
	store::{CommitOutcome, GrantStore, TokenStore},
};

/// What an introspection call reveals about a presented token value.
///
/// Inactive results carry nothing else; leaking why a token is inactive (expired,
/// revoked, never existed) would hand probers an oracle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Introspection {
	/// Whether the token is live and its grant still honors it.
	pub active: bool,
	/// Owning grant, for active tokens.
	pub grant: Option<GrantId>,
	/// Rights description the token carries, for active tokens.
	pub access: Vec<AccessRequest>,
	/// Remaining validity in whole seconds, for active tokens.
	pub expires_in: Option<u64>,
}
impl Introspection {
	/// The uniform negative result.
	pub fn inactive() -> Self {
		Self { active: false, grant: None, access: Vec::new(), expires_in: None }
	}
}

/// Token lifecycle service shared by the engine's grant and management paths.
#[derive(Clone)]
pub struct TokenService {
	tokens: Arc<dyn TokenStore>,
	grants: Arc<dyn GrantStore>,
}
impl TokenService {
	/// Creates a service over the token and grant stores.
	pub fn new(tokens: Arc<dyn TokenStore>, grants: Arc<dyn GrantStore>) -> Self {
		Self { tokens, grants }
	}

	/// Issues and persists a fresh token for the grant.
	pub async fn create(&self, grant: &GrantId, expires_in: u64) -> Result<AccessToken> {
		let token = AccessToken::issue(grant.clone(), expires_in);

		self.tokens.insert_token(token.clone()).await?;

		Ok(token)
	}

	/// The grant's newest token that is still valid at `now`, if any.
	pub async fn live_token(
		&self,
		grant: &GrantId,
		now: OffsetDateTime,
	) -> Result<Option<AccessToken>> {
		let mut tokens = self.tokens.tokens_for_grant(grant).await?;

		tokens.retain(|token| !token.is_expired_at(now));
		tokens.sort_by_key(|token| token.issued_at);

		Ok(tokens.pop())
	}

	/// Rotates a token: atomically replaces it with a fresh value carrying the same
	/// validity window length, measured from now.
	///
	/// Returns the replacement together with the grant's access description so the caller
	/// can render a full token response. Expired tokens and tokens of finalized grants no
	/// longer resolve.
	pub async fn rotate(
		&self,
		id: &TokenId,
		now: OffsetDateTime,
	) -> Result<(AccessToken, Vec<AccessRequest>)> {
		let outgoing = self.fetch_rotatable(id, now).await?;
		let replacement = AccessToken::issue(outgoing.grant.clone(), outgoing.expires_in);

		match self.tokens.swap_token(id, replacement.clone()).await? {
			CommitOutcome::Committed => (),
			// Lost the race against a concurrent rotation or revocation; the presented
			// identifier no longer names a token.
			CommitOutcome::StaleRevision | CommitOutcome::Missing => {
				return Err(Error::UnknownRequest {
					reason: format!("token '{id}' no longer exists"),
				});
			},
		}

		let access = self.grant_access(&outgoing.grant).await?;

		Ok((replacement, access))
	}

	/// Revokes a token; revoking an already-gone token is an `unknown_request`.
	pub async fn revoke(&self, id: &TokenId) -> Result<()> {
		self.tokens
			.remove_token(id)
			.await?
			.map(|_| ())
			.ok_or_else(|| Error::UnknownRequest { reason: format!("token '{id}' not found") })
	}

	/// Resolves a presented token value to its rights description.
	///
	/// Unknown values, expired tokens, and tokens whose grant is finalized (or gone) all
	/// produce the same inactive result.
	pub async fn introspect(&self, value: &str, now: OffsetDateTime) -> Result<Introspection> {
		let Some(token) = self.tokens.find_token_by_value(value).await? else {
			return Ok(Introspection::inactive());
		};

		if token.is_expired_at(now) {
			return Ok(Introspection::inactive());
		}

		match self.grants.fetch_grant(&token.grant).await? {
			Some(grant) if !grant.is_finalized() => (),
			_ => return Ok(Introspection::inactive()),
		}

		let access = self.grant_access(&token.grant).await?;

		Ok(Introspection {
			active: true,
			grant: Some(token.grant.clone()),
			access,
			expires_in: Some(token.remaining_at(now)),
		})
	}

	async fn fetch_rotatable(&self, id: &TokenId, now: OffsetDateTime) -> Result<AccessToken> {
		let token = self
			.tokens
			.fetch_token(id)
			.await?
			.ok_or_else(|| Error::UnknownRequest { reason: format!("token '{id}' not found") })?;

		if token.is_expired_at(now) {
			return Err(Error::UnknownRequest { reason: format!("token '{id}' expired") });
		}

		match self.grants.fetch_grant(&token.grant).await? {
			Some(grant) if !grant.is_finalized() => Ok(token),
			_ => Err(Error::UnknownRequest {
				reason: format!("the grant behind token '{id}' is no longer ongoing"),
			}),
		}
	}

	async fn grant_access(&self, grant: &GrantId) -> Result<Vec<AccessRequest>> {
		let items = self.grants.accesses(grant).await?;

		Ok(items.into_iter().map(|item| item.request).collect())
	}
}
impl Debug for TokenService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenService").finish_non_exhaustive()
	}
}
