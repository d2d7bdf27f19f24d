//! Redacted secret wrapper and opaque random string generation.

// crates.io
use rand::RngCore;
// self
use crate::_prelude::*;

/// Redacted wrapper for continuation secrets and token values, keeping sensitive
/// material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret(String);
impl Secret {
	/// Wraps an existing secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Generates a fresh high-entropy secret of `len` hex characters.
	pub fn random(len: usize) -> Self {
		Self(random_hex(len))
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for Secret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Uppercase hex string drawn from the OS entropy source.
pub(crate) fn random_hex(len: usize) -> String {
	let mut bytes = vec![0_u8; len.div_ceil(2)];

	rand::rng().fill_bytes(&mut bytes);

	let mut out = String::with_capacity(bytes.len() * 2);

	for byte in &bytes {
		out.push(char::from_digit((byte >> 4) as u32, 16).unwrap_or('0').to_ascii_uppercase());
		out.push(char::from_digit((byte & 0xF) as u32, 16).unwrap_or('0').to_ascii_uppercase());
	}

	out.truncate(len);

	out
}
