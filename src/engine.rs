//! Grant negotiation engine: initiation, continuation, token management, and
//! introspection over pluggable stores.
//!
//! Every public operation authenticates the request first (signature verification plus
//! client or credential resolution), then drives the grant state machine. Grant
//! mutations commit through revision-guarded writes; continuation additionally runs
//! under a per-grant singleflight guard so near-simultaneous calls serialize instead of
//! both doing work and one discovering the loss late.

pub mod policy;

// self
use crate::{
	_prelude::*,
	config::EngineConfig,
	context::{self, RequestContext},
	continuation,
	httpsig::{self, SignedRequest},
	interact::InteractionManager,
	keys::ClientDirectory,
	model::{
		AccessItem, AccessToken, Grant, GrantId, GrantRevision, GrantState, Interaction,
		InteractionId, InteractionState, StartMethod, TokenId,
	},
	obs::{self, OpKind, OpOutcome, OpSpan},
	protocol::{
		self, AccessTokenResponse, ContinueBody, ContinueResponse, ContinueToken, GrantPayload,
		GrantRequest, InteractResponse, IntrospectionRequest, IntrospectionResponse,
		TokenResponse, UserCodeUriPayload,
	},
	store::{ClientStore, CommitOutcome, GrantStore, TokenStore},
	token::TokenService,
};

/// The grant negotiation engine.
pub struct Engine {
	config: EngineConfig,
	grants: Arc<dyn GrantStore>,
	token_records: Arc<dyn TokenStore>,
	directory: ClientDirectory,
	interactions: InteractionManager,
	tokens: TokenService,
	grant_guards: Mutex<HashMap<GrantId, Arc<AsyncMutex<()>>>>,
}
impl Engine {
	/// Assembles an engine over the provided stores.
	pub fn new(
		config: EngineConfig,
		clients: Arc<dyn ClientStore>,
		grants: Arc<dyn GrantStore>,
		tokens: Arc<dyn TokenStore>,
	) -> Self {
		let directory = ClientDirectory::new(clients, config.trust_on_first_use);
		let interactions = InteractionManager::new(config.clone(), grants.clone());
		let token_service = TokenService::new(tokens.clone(), grants.clone());

		Self {
			config,
			grants,
			token_records: tokens,
			directory,
			interactions,
			tokens: token_service,
			grant_guards: Mutex::new(HashMap::new()),
		}
	}

	/// The engine's configuration.
	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// The interaction manager, exposed so an authorization UI can record resource-owner
	/// decisions.
	pub fn interactions(&self) -> &InteractionManager {
		&self.interactions
	}

	/// Authenticates a grant initiation request.
	///
	/// Verifies the content digest, parses the body, resolves the client from its
	/// presented key, and verifies the request signatures against that client's key set.
	/// With trust-on-first-use enabled, an unknown client is persisted only after its
	/// signature verifies.
	pub async fn authenticate_initiation(
		&self,
		request: &SignedRequest,
	) -> Result<(RequestContext, GrantRequest)> {
		let body = request.body.as_deref().filter(|body| !body.is_empty()).ok_or_else(|| {
			Error::InvalidRequest { reason: "grant initiation requires a JSON body".into() }
		})?;

		// The digest check is key-independent; tampered bodies are rejected before being
		// interpreted.
		httpsig::digest::verify_content_digest(request)?;

		let grant_request: GrantRequest = protocol::parse_json(body)?;
		let payload = grant_request.client.as_ref().ok_or_else(|| Error::InvalidClient {
			reason: "the request identifies no client".into(),
		})?;
		let (client, unregistered) =
			self.directory.identify(&payload.key, payload.display.clone()).await?;

		httpsig::verify_request(&client, request)?;

		let client = if unregistered { self.directory.register(client).await? } else { client };

		Ok((RequestContext::new(client), grant_request))
	}

	/// Authenticates a continuation request.
	///
	/// The `Authorization: GNAP` credential resolves the ongoing grant; the signature is
	/// then verified against the grant's owning client.
	pub async fn authenticate_continuation(
		&self,
		request: &SignedRequest,
	) -> Result<(RequestContext, Grant)> {
		let credential = context::gnap_credential(request)?.ok_or_else(|| {
			Error::InvalidClient {
				reason: "continuation requires a GNAP authorization credential".into(),
			}
		})?;
		let grant = self
			.grants
			.find_grant_by_continuation(credential.expose())
			.await?
			.filter(|grant| !grant.is_finalized())
			.ok_or_else(|| Error::UnknownRequest {
				reason: "the presented continuation credential matches no ongoing grant".into(),
			})?;
		let client = self.directory.resolve(&grant.client).await?;

		httpsig::verify_request(&client, request)?;

		Ok((RequestContext::with_credential(client, credential), grant))
	}

	/// Authenticates a token management request.
	///
	/// The managed token is resolved by identifier; the signature is verified against the
	/// owning grant's client, and a presented `GNAP` credential must be the token's own
	/// value.
	pub async fn authenticate_token_management(
		&self,
		id: &TokenId,
		request: &SignedRequest,
	) -> Result<(RequestContext, AccessToken)> {
		let token = self.token_records.fetch_token(id).await?.ok_or_else(|| {
			Error::UnknownRequest { reason: format!("token '{id}' not found") }
		})?;
		let grant = self.grants.fetch_grant(&token.grant).await?.ok_or_else(|| {
			Error::UnknownRequest { reason: format!("the grant behind token '{id}' is gone") }
		})?;
		let client = self.directory.resolve(&grant.client).await?;
		let credential = context::gnap_credential(request)?;

		if let Some(credential) = &credential
			&& credential.expose() != token.value.expose()
		{
			return Err(Error::InvalidClient {
				reason: "the presented credential does not match the managed token".into(),
			});
		}

		httpsig::verify_request(&client, request)?;

		Ok((
			match credential {
				Some(credential) => RequestContext::with_credential(client, credential),
				None => RequestContext::new(client),
			},
			token,
		))
	}

	/// Starts a grant negotiation from a signed initiation request.
	pub async fn initiate(&self, request: &SignedRequest) -> Result<GrantPayload> {
		const KIND: OpKind = OpKind::Initiate;

		let span = OpSpan::new(KIND, "initiate");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.initiate_inner(request)).await;

		obs::record_op_outcome(KIND, outcome_of(&result));

		result
	}

	/// Continues an ongoing grant: redeems an interaction reference or polls, then
	/// re-evaluates the grant and assembles the next response.
	pub async fn continue_grant(
		&self,
		grant: &GrantId,
		request: &SignedRequest,
	) -> Result<GrantPayload> {
		const KIND: OpKind = OpKind::Continue;

		let span = OpSpan::new(KIND, "continue_grant");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.continue_inner(grant, request)).await;

		obs::record_op_outcome(KIND, outcome_of(&result));

		result
	}

	/// Rotates a managed token, returning the replacement.
	pub async fn rotate_token(
		&self,
		id: &TokenId,
		request: &SignedRequest,
	) -> Result<TokenResponse> {
		const KIND: OpKind = OpKind::TokenManage;

		let span = OpSpan::new(KIND, "rotate_token");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				self.authenticate_token_management(id, request).await?;

				let now = OffsetDateTime::now_utc();
				let (token, access) = self.tokens.rotate(id, now).await?;

				Ok(TokenResponse {
					access_token: AccessTokenResponse {
						value: token.value.clone(),
						manage: self.config.token_manage_uri(&token.id),
						access,
						expires_in: token.expires_in,
					},
				})
			})
			.await;

		obs::record_op_outcome(KIND, outcome_of(&result));

		result
	}

	/// Revokes a managed token.
	pub async fn revoke_token(&self, id: &TokenId, request: &SignedRequest) -> Result<()> {
		const KIND: OpKind = OpKind::TokenManage;

		let span = OpSpan::new(KIND, "revoke_token");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				self.authenticate_token_management(id, request).await?;
				self.tokens.revoke(id).await
			})
			.await;

		obs::record_op_outcome(KIND, outcome_of(&result));

		result
	}

	/// Resolves a presented token value for a resource server.
	///
	/// The caller is trusted transport-side; unknown and dead tokens all yield the same
	/// inactive result.
	pub async fn introspect(&self, request: &SignedRequest) -> Result<IntrospectionResponse> {
		const KIND: OpKind = OpKind::Introspect;

		let span = OpSpan::new(KIND, "introspect");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				let body =
					request.body.as_deref().filter(|body| !body.is_empty()).ok_or_else(|| {
						Error::InvalidRequest {
							reason: "introspection requires a JSON body".into(),
						}
					})?;
				let body: IntrospectionRequest = protocol::parse_json(body)?;
				let report = self
					.tokens
					.introspect(&body.access_token, OffsetDateTime::now_utc())
					.await?;

				Ok(report.into())
			})
			.await;

		obs::record_op_outcome(KIND, outcome_of(&result));

		result
	}

	/// Records the resource owner's decision on an interaction attempt.
	pub async fn resolve_interaction(
		&self,
		id: &InteractionId,
		approved: bool,
	) -> Result<Interaction> {
		self.interactions.resolve(id, approved, OffsetDateTime::now_utc()).await
	}

	async fn initiate_inner(&self, request: &SignedRequest) -> Result<GrantPayload> {
		let (ctx, body) = self.authenticate_initiation(request).await?;

		if body.access_token.access.is_empty() {
			return Err(Error::InvalidRequest {
				reason: "the request names no access rights".into(),
			});
		}

		for access in &body.access_token.access {
			access.validate().map_err(|e| Error::InvalidRequest { reason: e.to_string() })?;
		}

		let (start, finish) =
			body.interact.map(|interact| (interact.start, interact.finish)).unwrap_or_default();
		let grant = Grant::new(ctx.client().id.clone(), start, finish, self.config.wait);
		let accesses = body
			.access_token
			.access
			.into_iter()
			.map(|request| AccessItem::new(grant.id.clone(), request))
			.collect();

		self.grants.insert_grant(grant.clone(), accesses).await?;

		let now = OffsetDateTime::now_utc();
		let grant = self.process(grant, now).await?;

		self.respond(grant, now).await
	}

	async fn continue_inner(
		&self,
		expected: &GrantId,
		request: &SignedRequest,
	) -> Result<GrantPayload> {
		let (ctx, grant) = self.authenticate_continuation(request).await?;

		if grant.id != *expected {
			return Err(Error::UnknownRequest {
				reason: "the continuation credential does not belong to this grant".into(),
			});
		}

		let guard = self.grant_guard(&grant.id);
		let _singleflight = guard.lock().await;
		// Re-read under the guard; a concurrent continuation may have rotated the
		// credential between authentication and serialization.
		let grant = self
			.grants
			.fetch_grant(&grant.id)
			.await?
			.filter(|grant| !grant.is_finalized())
			.ok_or_else(|| Error::UnknownRequest {
				reason: "the grant is no longer ongoing".into(),
			})?;
		let credential = ctx.credential().ok_or_else(|| Error::InvalidClient {
			reason: "continuation requires a GNAP authorization credential".into(),
		})?;

		if grant.continuation.expose() != credential.expose() {
			return Err(Error::UnknownRequest {
				reason: "the presented continuation credential is no longer current".into(),
			});
		}

		let now = OffsetDateTime::now_utc();

		continuation::check_pace(&grant, now)?;

		let body: ContinueBody = match request.body.as_deref().filter(|body| !body.is_empty()) {
			Some(bytes) => protocol::parse_json(bytes)?,
			None => ContinueBody::default(),
		};
		let grant = match body.interact_ref {
			Some(reference) => self.finish_interaction(grant, &reference, now).await?,
			None => self.poll(grant, now).await?,
		};
		let grant = self.process(grant, now).await?;

		self.respond(grant, now).await
	}

	/// Re-evaluates a grant in `Processing`; any other state passes through untouched.
	///
	/// A lost commit means another transition won; the winner's grant is re-read and
	/// evaluation restarts from its state.
	async fn process(&self, mut grant: Grant, now: OffsetDateTime) -> Result<Grant> {
		loop {
			if grant.state != GrantState::Processing {
				return Ok(grant);
			}

			let revision = grant.revision();
			let accesses = self.grants.accesses(&grant.id).await?;
			let assessment =
				policy::assess_all(accesses.iter().map(|item| &item.request));
			let interactions = self.grants.interactions(&grant.id).await?;
			let approved_finished = interactions
				.iter()
				.any(|i| i.is_finished() && i.state == InteractionState::Approved);
			let denied_finished = interactions
				.iter()
				.any(|i| i.is_finished() && i.state == InteractionState::Denied);
			let mut created = Vec::new();

			if assessment.denied {
				grant.state = GrantState::Finalized;
			} else if assessment.all_approved || approved_finished {
				grant.state = GrantState::Approved;
			} else if denied_finished || self.interactions.joint_methods(&grant).is_empty() {
				grant.state = GrantState::Finalized;
			} else if !interactions.iter().any(|i| i.is_open_at(now)) {
				created = self.interactions.create_attempts(&grant, now);
				grant.state =
					if created.is_empty() { GrantState::Finalized } else { GrantState::Pending };
			} else {
				grant.state = GrantState::Pending;
			}

			grant.updated_at = now;

			match self.grants.commit_grant(&revision, grant.clone(), created).await? {
				CommitOutcome::Committed => return Ok(grant),
				CommitOutcome::StaleRevision => {
					grant = self.refetch(&grant.id).await?;
				},
				CommitOutcome::Missing => {
					return Err(Error::UnknownRequest {
						reason: format!("grant '{}' disappeared during processing", grant.id),
					});
				},
			}
		}
	}

	/// Redeems an interaction reference: marks the matching open attempt finished and
	/// returns the grant to `Processing`, atomically.
	async fn finish_interaction(
		&self,
		mut grant: Grant,
		reference: &str,
		now: OffsetDateTime,
	) -> Result<Grant> {
		let mut target = self
			.grants
			.interactions(&grant.id)
			.await?
			.into_iter()
			.find(|i| i.reference.as_deref() == Some(reference) && i.is_open_at(now))
			.ok_or_else(|| Error::InvalidInteraction {
				reason: "no open interaction matches the presented reference".into(),
			})?;
		let revision = grant.revision();

		target.finished_at = Some(now);
		grant.state = GrantState::Processing;
		grant.updated_at = now;

		self.commit_or_conflict(&revision, grant, vec![target]).await
	}

	/// Polls for resolved interactions on a grant without a finish callback.
	///
	/// Resolved open attempts are consumed and the grant returns to `Processing`; with
	/// nothing resolved yet the grant passes through unchanged.
	async fn poll(&self, mut grant: Grant, now: OffsetDateTime) -> Result<Grant> {
		if grant.finish.is_some() {
			return Err(Error::InvalidRequest {
				reason: "grants with a finish callback must continue by reference".into(),
			});
		}

		let mut resolved: Vec<_> = self
			.grants
			.interactions(&grant.id)
			.await?
			.into_iter()
			.filter(|i| {
				i.is_open_at(now)
					&& matches!(
						i.state,
						InteractionState::Approved | InteractionState::Denied
					)
			})
			.collect();

		if resolved.is_empty() {
			return Ok(grant);
		}

		for interaction in &mut resolved {
			interaction.finished_at = Some(now);
		}

		let revision = grant.revision();

		grant.state = GrantState::Processing;
		grant.updated_at = now;

		self.commit_or_conflict(&revision, grant, resolved).await
	}

	/// Assembles the response for a processed grant, rotating the continuation secret
	/// whenever the negotiation stays alive.
	async fn respond(&self, mut grant: Grant, now: OffsetDateTime) -> Result<GrantPayload> {
		match grant.state {
			GrantState::Processing => Err(Error::UnexpectedState { state: grant.state }),
			GrantState::Finalized => {
				let denied_by_owner = self
					.grants
					.interactions(&grant.id)
					.await?
					.iter()
					.any(|i| i.is_finished() && i.state == InteractionState::Denied);

				if denied_by_owner { Err(Error::UserDenied) } else { Err(Error::RequestDenied) }
			},
			GrantState::Pending => {
				// The rotation commit is the last store operation: a failure anywhere
				// before it leaves the outgoing continuation secret redeemable.
				let interact = self.interact_payload(&grant, now).await?;
				let revision = grant.revision();

				continuation::rotate(&mut grant, now);

				let grant = self.commit_or_conflict(&revision, grant, Vec::new()).await?;

				Ok(GrantPayload {
					continuation: Some(self.continue_payload(&grant)),
					access_token: None,
					interact,
				})
			},
			GrantState::Approved => {
				let token = match self.tokens.live_token(&grant.id, now).await? {
					Some(token) => token,
					None =>
						self.tokens.create(&grant.id, self.config.token_expiry_secs()).await?,
				};
				let access = self
					.grants
					.accesses(&grant.id)
					.await?
					.into_iter()
					.map(|item| item.request)
					.collect();
				let revision = grant.revision();

				continuation::rotate(&mut grant, now);

				let grant = self.commit_or_conflict(&revision, grant, Vec::new()).await?;

				Ok(GrantPayload {
					continuation: Some(self.continue_payload(&grant)),
					access_token: Some(AccessTokenResponse {
						value: token.value.clone(),
						manage: self.config.token_manage_uri(&token.id),
						access,
						expires_in: token.remaining_at(now),
					}),
					interact: None,
				})
			},
		}
	}

	fn continue_payload(&self, grant: &Grant) -> ContinueResponse {
		ContinueResponse {
			uri: self.config.continue_uri(&grant.id),
			wait: grant.wait.whole_seconds().max(0) as u64,
			access_token: ContinueToken { value: grant.continuation.clone() },
		}
	}

	async fn interact_payload(
		&self,
		grant: &Grant,
		now: OffsetDateTime,
	) -> Result<Option<InteractResponse>> {
		let open: Vec<_> = self
			.grants
			.interactions(&grant.id)
			.await?
			.into_iter()
			.filter(|i| i.is_open_at(now))
			.collect();

		if open.is_empty() {
			return Ok(None);
		}

		let mut payload = InteractResponse::default();

		for attempt in &open {
			match attempt.method {
				StartMethod::Redirect => payload.redirect = attempt.uri.clone(),
				StartMethod::App => payload.app = attempt.uri.clone(),
				StartMethod::UserCode => payload.user_code = attempt.code.clone(),
				StartMethod::UserCodeUri =>
					if let (Some(code), Some(uri)) = (attempt.code.clone(), attempt.uri.clone())
					{
						payload.user_code_uri = Some(UserCodeUriPayload { code, uri });
					},
			}
		}

		if grant.finish.is_some() {
			payload.finish = Some(grant.interact_nonce.clone());
		}

		payload.expires_in = open
			.iter()
			.filter_map(|i| i.expires_at)
			.min()
			.map(|expiry| (expiry - now).whole_seconds().max(0) as u64);

		Ok(Some(payload))
	}

	async fn commit_or_conflict(
		&self,
		revision: &GrantRevision,
		grant: Grant,
		interactions: Vec<Interaction>,
	) -> Result<Grant> {
		match self.grants.commit_grant(revision, grant.clone(), interactions).await? {
			CommitOutcome::Committed => Ok(grant),
			CommitOutcome::StaleRevision | CommitOutcome::Missing =>
				Err(Error::UnknownRequest {
					reason: "the grant was modified concurrently".into(),
				}),
		}
	}

	async fn refetch(&self, id: &GrantId) -> Result<Grant> {
		self.grants.fetch_grant(id).await?.ok_or_else(|| Error::UnknownRequest {
			reason: format!("grant '{id}' disappeared during processing"),
		})
	}

	/// Returns (and creates on demand) the singleflight guard for a grant.
	fn grant_guard(&self, id: &GrantId) -> Arc<AsyncMutex<()>> {
		let mut guards = self.grant_guards.lock();

		guards.entry(id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl Debug for Engine {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Engine").field("config", &self.config).finish_non_exhaustive()
	}
}

fn outcome_of<T>(result: &Result<T>) -> OpOutcome {
	if result.is_ok() { OpOutcome::Success } else { OpOutcome::Failure }
}
