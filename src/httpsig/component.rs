//! Signature base reconstruction from covered components.

// self
use crate::httpsig::{SignatureError, SignedRequest};

/// Builds the canonical signature base for the covered components.
///
/// Each component becomes a `"name": value` line; the base ends with the
/// `"@signature-params"` line carrying the signer's raw parameter serialization, with no
/// trailing newline.
pub fn signature_base(
	request: &SignedRequest,
	components: &[impl AsRef<str>],
	params_serialization: &str,
) -> Result<String, SignatureError> {
	let mut lines = Vec::with_capacity(components.len() + 1);

	for component in components {
		let name = component.as_ref();
		let value = resolve(request, name)?;

		lines.push(format!("\"{name}\": {value}"));
	}

	lines.push(format!("\"@signature-params\": {params_serialization}"));

	Ok(lines.join("\n"))
}

fn resolve(request: &SignedRequest, name: &str) -> Result<String, SignatureError> {
	match name {
		"@method" => Ok(request.method.to_ascii_uppercase()),
		"@target-uri" => Ok(request.target_uri.to_string()),
		_ if name.starts_with('@') => {
			Err(SignatureError::UnresolvableComponent { component: name.to_owned() })
		},
		_ => request
			.header(name)
			.ok_or_else(|| SignatureError::UnresolvableComponent { component: name.to_owned() }),
	}
}
