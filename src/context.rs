//! Authenticated request context handed to engine operations.
//!
//! The engine's `authenticate_*` entry points verify a request's signatures first and
//! only then produce a [`RequestContext`]; grant logic never sees raw headers.

// self
use crate::{
	_prelude::*,
	httpsig::SignedRequest,
	model::{Client, Secret},
};

/// A signature-verified request identity.
///
/// Immutable by construction: once issued, the client binding cannot be swapped out
/// mid-operation.
#[derive(Clone, Debug)]
pub struct RequestContext {
	client: Client,
	credential: Option<Secret>,
}
impl RequestContext {
	/// Context for a request authenticated by key proof alone.
	pub fn new(client: Client) -> Self {
		Self { client, credential: None }
	}

	/// Context for a request that additionally presented a bearer credential, e.g. a
	/// continuation access token.
	pub fn with_credential(client: Client, credential: Secret) -> Self {
		Self { client, credential: Some(credential) }
	}

	/// The verified client.
	pub fn client(&self) -> &Client {
		&self.client
	}

	/// The presented credential, when one accompanied the request.
	pub fn credential(&self) -> Option<&Secret> {
		self.credential.as_ref()
	}
}

/// Extracts the credential from a `Authorization: GNAP <value>` header.
///
/// Returns `None` when no `Authorization` header is present; a header with a different
/// scheme or an empty credential is rejected.
pub fn gnap_credential(request: &SignedRequest) -> Result<Option<Secret>> {
	let Some(header) = request.header("authorization") else {
		return Ok(None);
	};
	let (scheme, value) = header.trim().split_once(char::is_whitespace).ok_or_else(|| {
		Error::InvalidClient { reason: "malformed Authorization header".into() }
	})?;

	if !scheme.eq_ignore_ascii_case("gnap") {
		return Err(Error::InvalidClient {
			reason: format!("unsupported authorization scheme '{scheme}'"),
		});
	}

	let value = value.trim();

	if value.is_empty() {
		return Err(Error::InvalidClient { reason: "empty GNAP credential".into() });
	}

	Ok(Some(Secret::new(value)))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn request(authorization: Option<&str>) -> SignedRequest {
		let request = SignedRequest::new(
			"POST",
			"https://as.example/gnap/continue/g-1".parse().expect("URI fixture should parse."),
		);

		match authorization {
			Some(value) => request.with_header("Authorization", value),
			None => request,
		}
	}

	#[test]
	fn extracts_gnap_credentials_case_insensitively() {
		let credential = gnap_credential(&request(Some("gnap ABC123")))
			.expect("Header should parse.")
			.expect("Credential should be present.");

		assert_eq!(credential.expose(), "ABC123");
		assert!(
			gnap_credential(&request(Some("GNAP  ABC123 ")))
				.expect("Header should parse.")
				.is_some()
		);
	}

	#[test]
	fn foreign_schemes_and_empty_values_are_rejected() {
		assert!(matches!(
			gnap_credential(&request(Some("Bearer ABC123"))),
			Err(Error::InvalidClient { .. })
		));
		assert!(matches!(
			gnap_credential(&request(Some("GNAP "))),
			Err(Error::InvalidClient { .. })
		));
		assert!(matches!(
			gnap_credential(&request(Some("GNAP"))),
			Err(Error::InvalidClient { .. })
		));
	}

	#[test]
	fn absent_headers_yield_no_credential() {
		assert_eq!(
			gnap_credential(&request(None)).expect("Absent header should be accepted."),
			None
		);
	}
}
