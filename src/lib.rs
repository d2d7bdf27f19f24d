//! Embeddable GNAP grant negotiation engine: drive multi-step authorization grants, verify
//! Ed25519-signed requests, and issue CAS-safe bound access tokens from one library core.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod context;
pub mod continuation;
pub mod engine;
pub mod error;
pub mod httpsig;
pub mod interact;
pub mod keys;
pub mod model;
pub mod obs;
pub mod protocol;
pub mod store;
pub mod token;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience fixtures and signing helpers for integration tests; enabled via `cfg(test)`
	//! or the `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
	use ed25519_dalek::{Signer, SigningKey};
	// self
	use crate::{
		config::EngineConfig,
		engine::Engine,
		httpsig::SignedRequest,
		model::{Client, ClientId, Jwk, StartMethod},
		store::MemoryStore,
	};

	/// Builds an [`Engine`] backed by a shared in-memory store.
	pub fn build_memory_engine(config: EngineConfig) -> (Engine, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let engine = Engine::new(config, store.clone(), store.clone(), store.clone());

		(engine, store)
	}

	/// Engine config pointing at a throwaway issuer, with every start method enabled.
	pub fn test_config() -> EngineConfig {
		EngineConfig::builder("https://as.example".parse().expect("Issuer fixture should parse."))
			.start_methods([
				StartMethod::Redirect,
				StartMethod::App,
				StartMethod::UserCode,
				StartMethod::UserCodeUri,
			])
			.trust_on_first_use(true)
			.build()
			.expect("Test config fixture should validate.")
	}

	/// Deterministic signing key + matching JWK for signature fixtures.
	pub fn test_signing_key(seed: u8, kid: &str) -> (SigningKey, Jwk) {
		let key = SigningKey::from_bytes(&[seed; 32]);
		let jwk = Jwk::ed25519(kid, URL_SAFE_NO_PAD.encode(key.verifying_key().as_bytes()));

		(key, jwk)
	}

	/// Client record owning the provided keys, usable directly with `ClientStore::insert`.
	pub fn test_client(id: &str, keys: impl IntoIterator<Item = Jwk>) -> Client {
		Client::new(
			ClientId::new(id).expect("Client identifier fixture should be valid."),
			keys.into_iter().collect(),
		)
	}

	/// Signs `request` with an Ed25519 key, attaching `Signature`/`Signature-Input` headers
	/// covering the provided components.
	///
	/// Adds a `Content-Digest` header first whenever the request carries a body so the
	/// `content-digest` component can be covered.
	pub fn sign_request(
		request: &mut SignedRequest,
		key: &SigningKey,
		kid: &str,
		components: &[&str],
	) {
		use base64::engine::general_purpose::STANDARD;

		if let Some(body) = request.body.as_deref() {
			let digest = crate::httpsig::digest::content_digest_header(body);

			request.headers.push(("content-digest".into(), digest));
		}

		let inner_list =
			components.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(" ");
		let params = format!(
			"({inner_list});created={};keyid=\"{kid}\";alg=\"ed25519\"",
			OffsetDateTime::now_utc().unix_timestamp()
		);
		let base = crate::httpsig::component::signature_base(request, components, &params)
			.expect("Signature base for test fixture should build.");
		let signature = key.sign(base.as_bytes());

		request.headers.push(("signature-input".into(), format!("sig1={params}")));
		request.headers.push((
			"signature".into(),
			format!("sig1=:{}:", STANDARD.encode(signature.to_bytes())),
		));
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use url;
#[cfg(test)] use tokio as _;
