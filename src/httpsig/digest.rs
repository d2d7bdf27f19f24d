//! `Content-Digest` computation and verification (RFC 9530, `sha-256`/`sha-512`).

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256, Sha512};
// self
use crate::httpsig::{SignatureError, SignedRequest, parse};

/// Renders a `Content-Digest` header value (`sha-256`) for the body.
pub fn content_digest_header(body: &[u8]) -> String {
	format!("sha-256=:{}:", STANDARD.encode(Sha256::digest(body)))
}

/// Verifies the request body against its `Content-Digest` header.
///
/// Every entry with a supported algorithm must match the body; a mismatch is a hard
/// reject even when another entry matches. Entries with unknown algorithms are ignored,
/// but at least one supported entry must be present.
pub fn verify_content_digest(request: &SignedRequest) -> Result<(), SignatureError> {
	let header = request.header("content-digest").ok_or(SignatureError::MissingDigest)?;
	let body = request.body.as_deref().unwrap_or_default();
	let mut matched = false;

	for member in parse::split_members(&header) {
		let (alg, value) =
			member.split_once('=').ok_or_else(|| SignatureError::MalformedHeader {
				header: "Content-Digest",
				reason: format!("member '{member}' has no value"),
			})?;
		let expected = match alg.trim() {
			"sha-256" => STANDARD.encode(Sha256::digest(body)),
			"sha-512" => STANDARD.encode(Sha512::digest(body)),
			_ => continue,
		};
		let encoded = value
			.trim()
			.strip_prefix(':')
			.and_then(|rest| rest.strip_suffix(':'))
			.ok_or_else(|| SignatureError::MalformedHeader {
				header: "Content-Digest",
				reason: format!("the '{alg}' entry is not a byte sequence"),
			})?;

		if encoded != expected {
			return Err(SignatureError::DigestMismatch);
		}

		matched = true;
	}

	if matched { Ok(()) } else { Err(SignatureError::MissingDigest) }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn request_with_digest(body: &[u8], digest: &str) -> SignedRequest {
		SignedRequest::new(
			"POST",
			"https://as.example/gnap".parse().expect("URI fixture should parse."),
		)
		.with_header("Content-Digest", digest)
		.with_body(body.to_vec())
	}

	#[test]
	fn freshly_computed_digests_verify() {
		let body = br#"{"access_token":{"access":[]}}"#;
		let request = request_with_digest(body, &content_digest_header(body));

		verify_content_digest(&request).expect("Digest should verify.");
	}

	#[test]
	fn tampered_bodies_are_rejected() {
		let request = request_with_digest(b"tampered", &content_digest_header(b"original"));

		assert_eq!(verify_content_digest(&request), Err(SignatureError::DigestMismatch));
	}

	#[test]
	fn unknown_algorithms_alone_do_not_satisfy_the_check() {
		let request = request_with_digest(b"body", "unixsum=:MTIzNA==:");

		assert_eq!(verify_content_digest(&request), Err(SignatureError::MissingDigest));
	}

	#[test]
	fn any_mismatching_supported_entry_rejects() {
		let body = b"body";
		let good = content_digest_header(body);
		let bad = content_digest_header(b"other");
		let request = request_with_digest(body, &format!("{good}, {bad}"));

		assert_eq!(verify_content_digest(&request), Err(SignatureError::DigestMismatch));
	}
}
