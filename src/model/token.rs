//! Issued access token records.

// self
use crate::{
	_prelude::*,
	model::{
		id::{GrantId, TokenId},
		secret::Secret,
	},
};

/// An opaque access token bound to exactly one grant.
///
/// Rotation and revocation delete the record; a grant accumulates a new record on every
/// rotation and old values stop resolving immediately.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	/// Management identifier.
	pub id: TokenId,
	/// Owning grant.
	pub grant: GrantId,
	/// Opaque server-secret value; unique across all live tokens.
	pub value: Secret,
	/// Issuance instant; the expiry window starts here.
	pub issued_at: OffsetDateTime,
	/// Validity window in whole seconds from issuance.
	pub expires_in: u64,
}
impl AccessToken {
	/// Issues a fresh token for the grant with a cryptographically random value.
	pub fn issue(grant: GrantId, expires_in: u64) -> Self {
		Self {
			id: TokenId::random(),
			grant,
			value: Secret::random(32),
			issued_at: OffsetDateTime::now_utc(),
			expires_in,
		}
	}

	/// Absolute expiry instant.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.issued_at + Duration::seconds(self.expires_in as i64)
	}

	/// Whether the token expired at the provided instant (`now >= issued_at + expires_in`).
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at()
	}

	/// Seconds of validity remaining at the provided instant.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> u64 {
		let remaining = self.expires_at() - instant;

		if remaining.is_negative() { 0 } else { remaining.whole_seconds() as u64 }
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn expiry_window_starts_at_issuance() {
		let mut token = AccessToken::issue(GrantId::random(), 600);

		token.issued_at = macros::datetime!(2025-06-01 00:00 UTC);

		assert!(!token.is_expired_at(macros::datetime!(2025-06-01 00:09:59 UTC)));
		assert!(token.is_expired_at(macros::datetime!(2025-06-01 00:10 UTC)));
		assert_eq!(token.remaining_at(macros::datetime!(2025-06-01 00:09 UTC)), 60);
		assert_eq!(token.remaining_at(macros::datetime!(2025-06-01 01:00 UTC)), 0);
	}

	#[test]
	fn issued_values_are_unique() {
		let grant = GrantId::random();
		let a = AccessToken::issue(grant.clone(), 60);
		let b = AccessToken::issue(grant, 60);

		assert_ne!(a.value.expose(), b.value.expose());
		assert_ne!(a.id, b.id);
	}
}
