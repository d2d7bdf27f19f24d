//! Verification of signed HTTP requests against a client's registered key set.
//!
//! The verifier consumes a transport-agnostic [`SignedRequest`] (the external HTTP layer
//! hands the engine an already-parsed request) and checks, for every attached signature:
//! required covered components, the pinned `ed25519` algorithm, key resolution by
//! `keyid`, and the cryptographic signature over the reconstructed signature base. The
//! content digest is verified independently whenever a body is present. Acceptance is
//! fail-closed: every attached signature must verify.

pub mod component;
pub mod digest;
pub mod parse;

// crates.io
use ed25519_dalek::Signature;
// self
use crate::{
	_prelude::*,
	model::{Client, KeyError},
};

/// The only signature algorithm the engine accepts.
pub const SUPPORTED_ALGORITHM: &str = "ed25519";

/// A parsed inbound request, detached from any HTTP framework.
#[derive(Clone, Debug)]
pub struct SignedRequest {
	/// HTTP method.
	pub method: String,
	/// Full target URI of the request.
	pub target_uri: Url,
	/// Header name/value pairs; names are matched case-insensitively.
	pub headers: Vec<(String, String)>,
	/// Raw request body, when one was sent.
	pub body: Option<Vec<u8>>,
}
impl SignedRequest {
	/// Creates a request with no headers or body.
	pub fn new(method: impl Into<String>, target_uri: Url) -> Self {
		Self { method: method.into(), target_uri, headers: Vec::new(), body: None }
	}

	/// Appends a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Attaches a body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Whether the request carries a body.
	pub fn has_body(&self) -> bool {
		self.body.as_ref().is_some_and(|body| !body.is_empty())
	}

	/// All values for a header name, in order of appearance.
	pub fn header_values(&self, name: &str) -> Vec<&str> {
		self.headers
			.iter()
			.filter(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
			.collect()
	}

	/// Canonicalized header value: trimmed, duplicates joined with `, `.
	pub fn header(&self, name: &str) -> Option<String> {
		let values = self.header_values(name);

		if values.is_empty() {
			return None;
		}

		Some(values.iter().map(|value| value.trim()).collect::<Vec<_>>().join(", "))
	}
}

/// Reasons a signed request is rejected before it ever reaches grant logic.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SignatureError {
	/// The request carried no signature at all.
	#[error("The request carries no signature.")]
	MissingSignature,
	/// A signature-related header could not be parsed.
	#[error("Malformed {header} header: {reason}.")]
	MalformedHeader {
		/// Offending header name.
		header: &'static str,
		/// Parse failure description.
		reason: String,
	},
	/// A `Signature-Input` entry has no matching `Signature` bytes.
	#[error("Signature input '{label}' has no matching signature value.")]
	UnmatchedSignatureInput {
		/// Dictionary label of the orphaned entry.
		label: String,
	},
	/// A required covered component is absent from a signature's component list.
	#[error("Signature '{label}' does not cover the required component '{component}'.")]
	MissingComponent {
		/// Dictionary label of the signature.
		label: String,
		/// The uncovered component name.
		component: String,
	},
	/// A covered component could not be canonicalized (e.g. a header the request lacks).
	#[error("Covered component '{component}' cannot be resolved against the request.")]
	UnresolvableComponent {
		/// The unresolvable component name.
		component: String,
	},
	/// The declared algorithm is not the supported one.
	#[error("Unsupported signature algorithm '{alg}'; only 'ed25519' is accepted.")]
	UnsupportedAlgorithm {
		/// Declared algorithm parameter.
		alg: String,
	},
	/// The signature input omits the `keyid` parameter.
	#[error("Signature '{label}' is missing the 'keyid' parameter.")]
	MissingKeyId {
		/// Dictionary label of the signature.
		label: String,
	},
	/// No registered client key matches the declared `keyid`.
	#[error("The key id '{kid}' is not a valid key id for this client.")]
	UnknownKeyId {
		/// Declared key id.
		kid: String,
	},
	/// The registered key could not be interpreted.
	#[error(transparent)]
	Key(#[from] KeyError),
	/// The request body does not match its `Content-Digest` header.
	#[error("The request body does not match the Content-Digest header.")]
	DigestMismatch,
	/// A body is present but no digest with a supported algorithm was sent.
	#[error("The request carries a body but no supported Content-Digest entry.")]
	MissingDigest,
	/// The signature bytes are not a valid Ed25519 signature.
	#[error("Signature '{label}' does not decode to an Ed25519 signature.")]
	MalformedSignature {
		/// Dictionary label of the signature.
		label: String,
	},
	/// Cryptographic verification failed.
	#[error("Signature '{label}' failed cryptographic verification.")]
	BadSignature {
		/// Dictionary label of the signature.
		label: String,
	},
}

/// Verifies every signature attached to the request against the client's key set.
///
/// The required covered components are `@method` and `@target-uri`, plus
/// `content-digest` when a body is present (whose header is verified against a freshly
/// computed digest) and `authorization` when that header is present.
pub fn verify_request(client: &Client, request: &SignedRequest) -> Result<(), SignatureError> {
	let entries = parse::parse_signatures(request)?;

	if entries.is_empty() {
		return Err(SignatureError::MissingSignature);
	}

	let mut required = vec!["@method", "@target-uri"];

	if request.has_body() {
		digest::verify_content_digest(request)?;
		required.push("content-digest");
	}
	if request.header("authorization").is_some() {
		required.push("authorization");
	}

	for entry in &entries {
		for component in &required {
			if !entry.covers(component) {
				return Err(SignatureError::MissingComponent {
					label: entry.label.clone(),
					component: (*component).to_owned(),
				});
			}
		}

		if let Some(alg) = &entry.alg
			&& alg != SUPPORTED_ALGORITHM
		{
			return Err(SignatureError::UnsupportedAlgorithm { alg: alg.clone() });
		}

		let kid = entry
			.keyid
			.as_deref()
			.ok_or_else(|| SignatureError::MissingKeyId { label: entry.label.clone() })?;
		let key = client
			.key(kid)
			.ok_or_else(|| SignatureError::UnknownKeyId { kid: kid.to_owned() })?;
		let verifying_key = key.verifying_key()?;
		let base =
			component::signature_base(request, &entry.components, &entry.params_serialization)?;
		let signature = Signature::from_slice(&entry.signature)
			.map_err(|_| SignatureError::MalformedSignature { label: entry.label.clone() })?;

		verifying_key
			.verify_strict(base.as_bytes(), &signature)
			.map_err(|_| SignatureError::BadSignature { label: entry.label.clone() })?;
	}

	Ok(())
}
