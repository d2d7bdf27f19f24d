//! Shared fixtures for integration tests: engine construction and request signing.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use base64::{
	Engine as _,
	engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use ed25519_dalek::{Signer, SigningKey};
use time::OffsetDateTime;
// self
use gnap_engine::{
	config::EngineConfig,
	engine::Engine,
	httpsig::{SignedRequest, component, digest},
	model::{AccessRequest, Jwk, StartMethod},
	protocol::{AccessTokenRequest, ClientPayload, GrantRequest, InteractRequest},
	store::MemoryStore,
	url::Url,
};

pub const KID: &str = "key-1";

/// Engine over a shared in-memory store, with every start method offered and
/// trust-on-first-use registration enabled.
pub fn build_engine() -> (Engine, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());
	let config = EngineConfig::builder(issuer())
		.start_methods([
			StartMethod::Redirect,
			StartMethod::App,
			StartMethod::UserCode,
			StartMethod::UserCodeUri,
		])
		.trust_on_first_use(true)
		.build()
		.expect("Engine config fixture should validate.");

	(Engine::new(config, store.clone(), store.clone(), store.clone()), store)
}

pub fn issuer() -> Url {
	"https://as.example".parse().expect("Issuer fixture should parse.")
}

pub fn uri(path: &str) -> Url {
	issuer().join(path).expect("URI fixture should parse.")
}

/// Deterministic signing key + matching JWK.
pub fn signing_key(seed: u8) -> (SigningKey, Jwk) {
	let key = SigningKey::from_bytes(&[seed; 32]);
	let jwk = Jwk::ed25519(KID, URL_SAFE_NO_PAD.encode(key.verifying_key().as_bytes()));

	(key, jwk)
}

/// Initiation body requesting the provided access rights, keyed to `jwk`.
pub fn grant_request_body(
	jwk: &Jwk,
	access: Vec<AccessRequest>,
	interact: Option<InteractRequest>,
) -> Vec<u8> {
	let request = GrantRequest {
		access_token: AccessTokenRequest { access },
		client: Some(ClientPayload { display: None, key: jwk.clone() }),
		interact,
	};

	serde_json::to_vec(&request).expect("Grant request fixture should serialize.")
}

/// Signs `request`, covering `@method`, `@target-uri`, plus `content-digest` when a body
/// is present and `authorization` when that header is present.
pub fn sign(request: &mut SignedRequest, key: &SigningKey, kid: &str) {
	let mut components = vec!["@method", "@target-uri"];

	if let Some(body) = request.body.as_deref() {
		let header = digest::content_digest_header(body);

		request.headers.push(("content-digest".into(), header));
		components.push("content-digest");
	}
	if request.header("authorization").is_some() {
		components.push("authorization");
	}

	sign_components(request, key, kid, &components, "ed25519");
}

/// Low-level signer for tests that need unusual coverage or algorithm labels.
pub fn sign_components(
	request: &mut SignedRequest,
	key: &SigningKey,
	kid: &str,
	components: &[&str],
	alg: &str,
) {
	let inner_list = components.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(" ");
	let params = format!(
		"({inner_list});created={};keyid=\"{kid}\";alg=\"{alg}\"",
		OffsetDateTime::now_utc().unix_timestamp()
	);
	let base = component::signature_base(request, components, &params)
		.expect("Signature base for test fixture should build.");
	let signature = key.sign(base.as_bytes());

	request.headers.push(("signature-input".into(), format!("sig1={params}")));
	request
		.headers
		.push(("signature".into(), format!("sig1=:{}:", STANDARD.encode(signature.to_bytes()))));
}

/// Signed POST carrying a JSON body.
pub fn signed_post(target: Url, body: Vec<u8>, key: &SigningKey) -> SignedRequest {
	let mut request = SignedRequest::new("POST", target).with_body(body);

	sign(&mut request, key, KID);

	request
}

/// Signed continuation POST carrying the GNAP credential and an optional body.
pub fn signed_continue(
	target: Url,
	credential: &str,
	body: Option<Vec<u8>>,
	key: &SigningKey,
) -> SignedRequest {
	let mut request = SignedRequest::new("POST", target)
		.with_header("authorization", format!("GNAP {credential}"));

	if let Some(body) = body {
		request = request.with_body(body);
	}

	sign(&mut request, key, KID);

	request
}
