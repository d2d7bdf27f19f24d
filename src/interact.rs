//! Interaction attempt management: one attempt per jointly supported start method, plus
//! the resource-owner resolution hook.

// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	config::EngineConfig,
	model::{Grant, Interaction, InteractionId, InteractionState, StartMethod, secret::random_hex},
	store::GrantStore,
};

/// Creates and resolves interaction attempts on behalf of the engine.
#[derive(Clone)]
pub struct InteractionManager {
	config: EngineConfig,
	store: Arc<dyn GrantStore>,
}
impl InteractionManager {
	/// Creates a manager over the grant store.
	pub fn new(config: EngineConfig, store: Arc<dyn GrantStore>) -> Self {
		Self { config, store }
	}

	/// Start methods both the client declared and the server offers, in the client's
	/// declared order.
	pub fn joint_methods(&self, grant: &Grant) -> Vec<StartMethod> {
		grant
			.start_methods
			.iter()
			.copied()
			.filter(|method| self.config.start_methods.contains(method))
			.collect()
	}

	/// Builds one pending attempt per jointly supported start method.
	///
	/// A finish callback reference is minted only when the grant carries a finish
	/// descriptor; polling grants have nothing to redeem a reference against.
	pub fn create_attempts(&self, grant: &Grant, now: OffsetDateTime) -> Vec<Interaction> {
		self.joint_methods(grant)
			.into_iter()
			.map(|method| {
				let id = InteractionId::random();
				let uri = match method {
					StartMethod::Redirect | StartMethod::App =>
						Some(self.config.interact_uri(&id)),
					StartMethod::UserCodeUri => Some(self.config.device_uri()),
					StartMethod::UserCode => None,
				};
				let code = method.uses_code().then(user_code);
				let reference = grant.finish.as_ref().map(|_| random_hex(20));

				Interaction {
					id,
					grant: grant.id.clone(),
					method,
					uri,
					code,
					reference,
					state: InteractionState::Pending,
					expires_at: self.config.interaction_expiry.map(|bound| now + bound),
					finished_at: None,
					created_at: now,
				}
			})
			.collect()
	}

	/// Records the resource owner's decision on an open attempt.
	///
	/// This is the hook an authorization UI calls after the owner acts; the decision
	/// takes effect on the grant at the next continuation.
	pub async fn resolve(
		&self,
		id: &InteractionId,
		approved: bool,
		now: OffsetDateTime,
	) -> Result<Interaction> {
		let mut interaction = self.store.fetch_interaction(id).await?.ok_or_else(|| {
			Error::UnknownRequest { reason: format!("interaction '{id}' not found") }
		})?;

		if interaction.is_expired_at(now) {
			// Expiry is stamped on first sight.
			if interaction.state == InteractionState::Pending {
				interaction.state = InteractionState::Expired;
				self.store.save_interaction(interaction).await?;
			}

			return Err(Error::InvalidInteraction {
				reason: format!("interaction '{id}' expired"),
			});
		}
		if interaction.is_finished() {
			return Err(Error::InvalidInteraction {
				reason: format!("interaction '{id}' is already finished"),
			});
		}

		interaction.state =
			if approved { InteractionState::Approved } else { InteractionState::Denied };

		if !self.store.save_interaction(interaction.clone()).await? {
			return Err(Error::UnknownRequest {
				reason: format!("the grant behind interaction '{id}' no longer exists"),
			});
		}

		Ok(interaction)
	}
}
impl Debug for InteractionManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InteractionManager").field("config", &self.config).finish_non_exhaustive()
	}
}

/// Six-digit human-typable code.
fn user_code() -> String {
	format!("{:06}", rand::rng().random_range(0..1_000_000_u32))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		model::{ClientId, FinishMethod, FinishSpec},
		store::MemoryStore,
	};

	fn manager() -> (InteractionManager, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());

		(InteractionManager::new(test_config(), store.clone()), store)
	}

	fn grant_with(methods: Vec<StartMethod>, finish: Option<FinishSpec>) -> Grant {
		Grant::new(
			ClientId::new("client-1").expect("Client fixture should be valid."),
			methods,
			finish,
			Duration::seconds(30),
		)
	}

	fn finish_fixture() -> FinishSpec {
		FinishSpec {
			method: FinishMethod::Redirect,
			uri: "https://client.example/cb".parse().expect("URI fixture should parse."),
			nonce: "NONCE".into(),
		}
	}

	#[test]
	fn attempts_cover_each_joint_method_with_the_right_artifacts() {
		let (manager, _) = manager();
		let grant = grant_with(
			vec![
				StartMethod::Redirect,
				StartMethod::App,
				StartMethod::UserCode,
				StartMethod::UserCodeUri,
			],
			Some(finish_fixture()),
		);
		let now = OffsetDateTime::now_utc();
		let attempts = manager.create_attempts(&grant, now);

		assert_eq!(attempts.len(), 4);

		for attempt in &attempts {
			assert_eq!(attempt.state, InteractionState::Pending);
			assert_eq!(attempt.grant, grant.id);
			assert!(attempt.reference.is_some());
			assert!(attempt.expires_at.is_some());
			assert_eq!(attempt.code.is_some(), attempt.method.uses_code());

			match attempt.method {
				StartMethod::UserCode => assert!(attempt.uri.is_none()),
				StartMethod::UserCodeUri => assert_eq!(
					attempt.uri.as_ref().map(Url::as_str),
					Some("https://as.example/device")
				),
				_ => assert!(
					attempt
						.uri
						.as_ref()
						.is_some_and(|uri| uri.path().starts_with("/interact/"))
				),
			}
			if let Some(code) = &attempt.code {
				assert_eq!(code.len(), 6);
				assert!(code.chars().all(|c| c.is_ascii_digit()));
			}
		}
	}

	#[test]
	fn unsupported_methods_produce_no_attempts_and_polling_grants_no_references() {
		let (manager, _) = manager();
		let mut grant = grant_with(vec![StartMethod::Redirect], None);
		let attempts = manager.create_attempts(&grant, OffsetDateTime::now_utc());

		assert_eq!(attempts.len(), 1);
		assert!(attempts[0].reference.is_none());

		grant.start_methods = Vec::new();

		assert!(manager.create_attempts(&grant, OffsetDateTime::now_utc()).is_empty());
	}

	#[tokio::test]
	async fn resolution_consumes_only_open_attempts() {
		let (manager, store) = manager();
		let grant = grant_with(vec![StartMethod::Redirect], None);
		let now = OffsetDateTime::now_utc();
		let attempts = manager.create_attempts(&grant, now);

		store
			.insert_grant(grant.clone(), Vec::new())
			.await
			.expect("Insert should succeed.");
		store
			.save_interaction(attempts[0].clone())
			.await
			.expect("Save should succeed.");

		let resolved = manager
			.resolve(&attempts[0].id, true, now)
			.await
			.expect("Open attempt should resolve.");

		assert_eq!(resolved.state, InteractionState::Approved);

		// Resolution is idempotent at the state level but a finished attempt cannot flip.
		let mut finished = resolved.clone();

		finished.finished_at = Some(now);
		store.save_interaction(finished).await.expect("Save should succeed.");

		assert!(matches!(
			manager.resolve(&attempts[0].id, false, now).await,
			Err(Error::InvalidInteraction { .. })
		));
	}

	#[tokio::test]
	async fn expired_attempts_are_stamped_and_rejected() {
		let (manager, store) = manager();
		let grant = grant_with(vec![StartMethod::Redirect], None);
		let now = OffsetDateTime::now_utc();
		let mut attempts = manager.create_attempts(&grant, now);

		attempts[0].expires_at = Some(now - Duration::seconds(1));
		store
			.insert_grant(grant.clone(), Vec::new())
			.await
			.expect("Insert should succeed.");
		store
			.save_interaction(attempts[0].clone())
			.await
			.expect("Save should succeed.");

		assert!(matches!(
			manager.resolve(&attempts[0].id, true, now).await,
			Err(Error::InvalidInteraction { .. })
		));

		let stored = store
			.fetch_interaction(&attempts[0].id)
			.await
			.expect("Fetch should succeed.")
			.expect("Interaction should exist.");

		assert_eq!(stored.state, InteractionState::Expired);
	}

	#[tokio::test]
	async fn unknown_attempts_do_not_resolve() {
		let (manager, _) = manager();

		assert!(matches!(
			manager.resolve(&InteractionId::random(), true, OffsetDateTime::now_utc()).await,
			Err(Error::UnknownRequest { .. })
		));
	}
}
