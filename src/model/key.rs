//! Client verification key records (Ed25519 JWKs).

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ed25519_dalek::{PUBLIC_KEY_LENGTH, VerifyingKey};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Errors raised while interpreting a client key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum KeyError {
	/// Only `OKP`/`Ed25519` keys are supported.
	#[error("Unsupported key type {kty}/{crv}; only OKP/Ed25519 keys are accepted.")]
	UnsupportedKeyType {
		/// Presented `kty` value.
		kty: String,
		/// Presented `crv` value.
		crv: String,
	},
	/// The `x` coordinate is not valid base64url.
	#[error("Public key coordinate is not valid base64url.")]
	MalformedCoordinate,
	/// The decoded key bytes do not form a valid Ed25519 point.
	#[error("Public key bytes do not form a valid Ed25519 key.")]
	InvalidKeyBytes,
}

/// Public verification key owned by exactly one client, used solely for signature
/// verification and never for authorization decisions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
	/// Key type; always `OKP` for supported keys.
	pub kty: String,
	/// Curve; always `Ed25519` for supported keys.
	pub crv: String,
	/// Key identifier referenced by signature `keyid` parameters.
	pub kid: String,
	/// Base64url-encoded public key bytes.
	pub x: String,
}
impl Jwk {
	/// Builds an Ed25519 JWK from a key id and base64url-encoded public key.
	pub fn ed25519(kid: impl Into<String>, x: impl Into<String>) -> Self {
		Self { kty: "OKP".into(), crv: "Ed25519".into(), kid: kid.into(), x: x.into() }
	}

	/// Decodes the JWK into a dalek verifying key.
	pub fn verifying_key(&self) -> Result<VerifyingKey, KeyError> {
		if self.kty != "OKP" || self.crv != "Ed25519" {
			return Err(KeyError::UnsupportedKeyType {
				kty: self.kty.clone(),
				crv: self.crv.clone(),
			});
		}

		let bytes = URL_SAFE_NO_PAD.decode(&self.x).map_err(|_| KeyError::MalformedCoordinate)?;
		let bytes: [u8; PUBLIC_KEY_LENGTH] =
			bytes.try_into().map_err(|_| KeyError::InvalidKeyBytes)?;

		VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidKeyBytes)
	}

	/// RFC 7638 thumbprint over the canonical `{"crv","kty","x"}` form, used as the
	/// client identifier minted by trust-on-first-use registration.
	pub fn thumbprint(&self) -> String {
		let canonical = format!(
			"{{\"crv\":\"{}\",\"kty\":\"{}\",\"x\":\"{}\"}}",
			self.crv, self.kty, self.x
		);

		URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
	}
}
