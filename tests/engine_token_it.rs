mod common;

// crates.io
use serde_json::json;
// self
use common::*;
use gnap_engine::{
	error::Error,
	httpsig::SignedRequest,
	model::{AccessAction, AccessCommon, AccessRequest, TokenId},
	protocol::AccessTokenResponse,
	url::Url,
};

fn quote_access() -> AccessRequest {
	AccessRequest::Quote(AccessCommon {
		actions: vec![AccessAction::Create, AccessAction::Read],
		..AccessCommon::default()
	})
}

fn token_id_of(manage: &Url) -> TokenId {
	manage
		.path_segments()
		.and_then(|mut segments| segments.next_back())
		.expect("The manage URI should end in a token identifier.")
		.parse()
		.expect("Token identifier should parse from the manage URI.")
}

async fn issue_token(
	engine: &gnap_engine::engine::Engine,
	key: &ed25519_dalek::SigningKey,
	jwk: &gnap_engine::model::Jwk,
) -> AccessTokenResponse {
	let body = grant_request_body(jwk, vec![quote_access()], None);
	let request = signed_post(uri("/"), body, key);
	let payload = engine.initiate(&request).await.expect("Initiation should succeed.");

	payload.access_token.expect("An approved grant should carry a token.")
}

fn introspect_body(value: &str) -> SignedRequest {
	let body = serde_json::to_vec(&json!({ "access_token": value }))
		.expect("Introspection body should serialize.");

	SignedRequest::new("POST", uri("/introspect")).with_body(body)
}

#[tokio::test]
async fn rotation_replaces_the_value_and_keeps_the_window() {
	let (engine, _) = build_engine();
	let (key, jwk) = signing_key(1);
	let issued = issue_token(&engine, &key, &jwk).await;
	let id = token_id_of(&issued.manage);
	let mut request = SignedRequest::new("POST", issued.manage.clone())
		.with_header("authorization", format!("GNAP {}", issued.value.expose()));

	sign(&mut request, &key, KID);

	let rotated = engine.rotate_token(&id, &request).await.expect("Rotation should succeed.");

	assert_ne!(rotated.access_token.value, issued.value);
	assert_ne!(token_id_of(&rotated.access_token.manage), id);
	assert_eq!(rotated.access_token.expires_in, issued.expires_in);
	assert_eq!(rotated.access_token.access.len(), 1);

	// The outgoing value is dead, the replacement is live.
	let report = engine
		.introspect(&introspect_body(issued.value.expose()))
		.await
		.expect("Introspection should succeed.");

	assert!(!report.active);

	let report = engine
		.introspect(&introspect_body(rotated.access_token.value.expose()))
		.await
		.expect("Introspection should succeed.");

	assert!(report.active);
	assert_eq!(report.access.len(), 1);
}

#[tokio::test]
async fn revocation_kills_the_token_once() {
	let (engine, _) = build_engine();
	let (key, jwk) = signing_key(2);
	let issued = issue_token(&engine, &key, &jwk).await;
	let id = token_id_of(&issued.manage);
	let mut request = SignedRequest::new("DELETE", issued.manage.clone())
		.with_header("authorization", format!("GNAP {}", issued.value.expose()));

	sign(&mut request, &key, KID);
	engine.revoke_token(&id, &request).await.expect("Revocation should succeed.");

	let report = engine
		.introspect(&introspect_body(issued.value.expose()))
		.await
		.expect("Introspection should succeed.");

	assert!(!report.active);
	assert!(matches!(
		engine.revoke_token(&id, &request).await,
		Err(Error::UnknownRequest { .. })
	));
}

#[tokio::test]
async fn management_requires_the_matching_credential_and_key() {
	let (engine, _) = build_engine();
	let (key, jwk) = signing_key(3);
	let issued = issue_token(&engine, &key, &jwk).await;
	let id = token_id_of(&issued.manage);

	// A credential that is not the managed token's value is rejected.
	let mut mismatched = SignedRequest::new("POST", issued.manage.clone())
		.with_header("authorization", "GNAP SOMETHINGELSE".to_string());

	sign(&mut mismatched, &key, KID);

	assert!(matches!(
		engine.rotate_token(&id, &mismatched).await,
		Err(Error::InvalidClient { .. })
	));

	// A signature from a foreign key is rejected even with the right credential.
	let (impostor, _) = signing_key(99);
	let mut forged = SignedRequest::new("POST", issued.manage.clone())
		.with_header("authorization", format!("GNAP {}", issued.value.expose()));

	sign(&mut forged, &impostor, KID);

	assert!(matches!(engine.rotate_token(&id, &forged).await, Err(Error::Signature(_))));
}

#[tokio::test]
async fn introspection_answers_uniformly_for_unknown_values() {
	let (engine, _) = build_engine();
	let report = engine
		.introspect(&introspect_body("NEVERISSUED"))
		.await
		.expect("Introspection should succeed.");

	assert!(!report.active);
	assert!(report.grant.is_none());
	assert!(report.access.is_empty());
	assert!(report.expires_in.is_none());
}
