//! Parsing of the `Signature-Input` and `Signature` headers.
//!
//! The parser keeps each entry's raw parameter serialization exactly as it appeared on
//! the wire, because the signature base must embed the signer's own serialization and
//! not a re-rendered one.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::httpsig::{SignatureError, SignedRequest};

/// One attached signature: its covered components, parameters, and raw bytes.
#[derive(Clone, Debug)]
pub struct SignatureEntry {
	/// Dictionary label tying the `Signature-Input` and `Signature` members together.
	pub label: String,
	/// Covered component names, in the signer's order.
	pub components: Vec<String>,
	/// `keyid` parameter.
	pub keyid: Option<String>,
	/// `alg` parameter.
	pub alg: Option<String>,
	/// `created` parameter, seconds since the Unix epoch.
	pub created: Option<i64>,
	/// The member value exactly as serialized by the signer, reused verbatim in the
	/// `@signature-params` line of the signature base.
	pub params_serialization: String,
	/// Decoded signature bytes.
	pub signature: Vec<u8>,
}
impl SignatureEntry {
	/// Whether the entry covers the named component.
	pub fn covers(&self, component: &str) -> bool {
		self.components.iter().any(|candidate| candidate == component)
	}
}

/// Parses every signature attached to the request.
///
/// Returns an empty list when the request carries neither header; a `Signature-Input`
/// member without matching `Signature` bytes (or vice versa) is rejected.
pub fn parse_signatures(request: &SignedRequest) -> Result<Vec<SignatureEntry>, SignatureError> {
	let input_header = request.header("signature-input");
	let signature_header = request.header("signature");
	let (Some(input_header), Some(signature_header)) = (input_header, signature_header) else {
		if request.header("signature-input").is_some() || request.header("signature").is_some() {
			return Err(SignatureError::MalformedHeader {
				header: "Signature",
				reason: "Signature and Signature-Input must be sent together".into(),
			});
		}

		return Ok(Vec::new());
	};
	let mut signatures = Vec::new();

	for member in split_members(&signature_header) {
		let (label, value) = split_member(member, "Signature")?;
		let encoded = value
			.strip_prefix(':')
			.and_then(|rest| rest.strip_suffix(':'))
			.ok_or_else(|| SignatureError::MalformedHeader {
				header: "Signature",
				reason: format!("member '{label}' is not a byte sequence"),
			})?;
		let bytes = STANDARD.decode(encoded).map_err(|_| SignatureError::MalformedHeader {
			header: "Signature",
			reason: format!("member '{label}' is not valid base64"),
		})?;

		signatures.push((label.to_owned(), bytes));
	}

	let mut entries = Vec::new();

	for member in split_members(&input_header) {
		let (label, value) = split_member(member, "Signature-Input")?;
		let signature = signatures
			.iter()
			.find(|(candidate, _)| candidate == label)
			.map(|(_, bytes)| bytes.clone())
			.ok_or_else(|| SignatureError::UnmatchedSignatureInput { label: label.to_owned() })?;
		let (components, keyid, alg, created) = parse_inner_list(value)?;

		entries.push(SignatureEntry {
			label: label.to_owned(),
			components,
			keyid,
			alg,
			created,
			params_serialization: value.to_owned(),
			signature,
		});
	}

	if entries.len() != signatures.len() {
		return Err(SignatureError::MalformedHeader {
			header: "Signature",
			reason: "every Signature member needs a Signature-Input entry".into(),
		});
	}

	Ok(entries)
}

/// Splits a dictionary header on top-level commas, ignoring commas inside quoted strings.
pub(super) fn split_members(header: &str) -> Vec<&str> {
	let mut members = Vec::new();
	let mut start = 0;
	let mut in_quotes = false;
	let mut escaped = false;

	for (i, c) in header.char_indices() {
		match c {
			_ if escaped => escaped = false,
			'\\' if in_quotes => escaped = true,
			'"' => in_quotes = !in_quotes,
			',' if !in_quotes => {
				let member = header[start..i].trim();

				if !member.is_empty() {
					members.push(member);
				}

				start = i + 1;
			},
			_ => (),
		}
	}

	let tail = header[start..].trim();

	if !tail.is_empty() {
		members.push(tail);
	}

	members
}

fn split_member<'a>(
	member: &'a str,
	header: &'static str,
) -> Result<(&'a str, &'a str), SignatureError> {
	let (label, value) = member.split_once('=').ok_or_else(|| SignatureError::MalformedHeader {
		header,
		reason: format!("member '{member}' has no value"),
	})?;
	let label = label.trim();

	if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric() || "_-*.".contains(c))
	{
		return Err(SignatureError::MalformedHeader {
			header,
			reason: format!("invalid member label '{label}'"),
		});
	}

	Ok((label, value.trim()))
}

type InnerList = (Vec<String>, Option<String>, Option<String>, Option<i64>);

/// Parses a `Signature-Input` member value: a parenthesized component list followed by
/// `;key=value` parameters.
fn parse_inner_list(value: &str) -> Result<InnerList, SignatureError> {
	let malformed = |reason: String| SignatureError::MalformedHeader {
		header: "Signature-Input",
		reason,
	};
	let rest = value
		.strip_prefix('(')
		.ok_or_else(|| malformed("covered components must be an inner list".into()))?;
	let close =
		rest.find(')').ok_or_else(|| malformed("unterminated covered component list".into()))?;
	let mut components = Vec::new();

	for item in rest[..close].split_ascii_whitespace() {
		let name = item
			.strip_prefix('"')
			.and_then(|inner| inner.strip_suffix('"'))
			.ok_or_else(|| malformed(format!("component '{item}' is not a quoted string")))?;

		components.push(name.to_owned());
	}

	let mut keyid = None;
	let mut alg = None;
	let mut created = None;

	for param in rest[close + 1..].split(';').map(str::trim).filter(|p| !p.is_empty()) {
		let (key, raw) = param.split_once('=').unwrap_or((param, ""));

		match key {
			"keyid" => keyid = Some(unquote(raw).ok_or_else(|| {
				malformed("the 'keyid' parameter must be a quoted string".into())
			})?),
			"alg" => alg = Some(unquote(raw).ok_or_else(|| {
				malformed("the 'alg' parameter must be a quoted string".into())
			})?),
			"created" => created = Some(raw.parse().map_err(|_| {
				malformed("the 'created' parameter must be an integer".into())
			})?),
			// Unknown parameters stay in the raw serialization and are covered by the
			// signature, so they are accepted without interpretation.
			_ => (),
		}
	}

	Ok((components, keyid, alg, created))
}

fn unquote(raw: &str) -> Option<String> {
	raw.strip_prefix('"').and_then(|inner| inner.strip_suffix('"')).map(|inner| {
		let mut out = String::with_capacity(inner.len());
		let mut escaped = false;

		for c in inner.chars() {
			if escaped || c != '\\' {
				out.push(c);
				escaped = false;
			} else {
				escaped = true;
			}
		}

		out
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_prelude::*;

	fn request_with(input: &str, signature: &str) -> SignedRequest {
		SignedRequest::new(
			"POST",
			"https://as.example/gnap".parse().expect("URI fixture should parse."),
		)
		.with_header("Signature-Input", input)
		.with_header("Signature", signature)
	}

	#[test]
	fn parses_a_labeled_signature_with_parameters() {
		let request = request_with(
			"sig1=(\"@method\" \"@target-uri\");created=1700000000;keyid=\"key-1\";alg=\"ed25519\"",
			"sig1=:aGVsbG8=:",
		);
		let entries = parse_signatures(&request).expect("Entry should parse.");

		assert_eq!(entries.len(), 1);

		let entry = &entries[0];

		assert_eq!(entry.label, "sig1");
		assert_eq!(entry.components, ["@method", "@target-uri"]);
		assert_eq!(entry.keyid.as_deref(), Some("key-1"));
		assert_eq!(entry.alg.as_deref(), Some("ed25519"));
		assert_eq!(entry.created, Some(1_700_000_000));
		assert_eq!(entry.signature, b"hello");
		assert!(entry.covers("@method"));
		assert!(!entry.covers("content-digest"));
	}

	#[test]
	fn rejects_inputs_without_signature_bytes() {
		let request = request_with("sig1=(\"@method\");keyid=\"key-1\"", "other=:aGVsbG8=:");

		assert!(matches!(
			parse_signatures(&request),
			Err(SignatureError::UnmatchedSignatureInput { label }) if label == "sig1"
		));
	}

	#[test]
	fn rejects_orphaned_signature_bytes() {
		let request = request_with("sig1=(\"@method\");keyid=\"key-1\"", "sig1=:aA==:, sig2=:aA==:");

		assert!(matches!(
			parse_signatures(&request),
			Err(SignatureError::MalformedHeader { header: "Signature", .. })
		));
	}

	#[test]
	fn absent_headers_yield_no_entries() {
		let request = SignedRequest::new(
			"GET",
			"https://as.example/gnap".parse().expect("URI fixture should parse."),
		);

		assert!(parse_signatures(&request).expect("Parse should succeed.").is_empty());
	}

	#[test]
	fn splits_members_outside_quoted_strings() {
		let members = split_members("a=(\"x,y\");keyid=\"k,1\", b=:Zm9v:");

		assert_eq!(members, ["a=(\"x,y\");keyid=\"k,1\"", "b=:Zm9v:"]);
	}
}
