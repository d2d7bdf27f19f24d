//! Interaction attempt records.

// self
use crate::{
	_prelude::*,
	model::{
		grant::StartMethod,
		id::{GrantId, InteractionId},
	},
};

/// Resolution state of an interaction attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionState {
	/// Awaiting the resource owner.
	Pending,
	/// The resource owner approved.
	Approved,
	/// The resource owner denied.
	Denied,
	/// The attempt expired before resolution.
	Expired,
}

/// An out-of-band interaction attempt belonging to exactly one grant.
///
/// A grant may hold several concurrent attempts (one per offered start method); grant
/// processing concerns only the first satisfied one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
	/// Interaction identifier.
	pub id: InteractionId,
	/// Owning grant.
	pub grant: GrantId,
	/// Start method this attempt was created for.
	pub method: StartMethod,
	/// Interaction URI for redirect/app/user-code-uri methods.
	pub uri: Option<Url>,
	/// Human code for user-code methods.
	pub code: Option<String>,
	/// System-unique reference correlating an out-of-band finish callback; assigned only
	/// when the grant carries a finish descriptor.
	pub reference: Option<String>,
	/// Resolution state.
	pub state: InteractionState,
	/// Expiry instant, when the server bounds the attempt's lifetime.
	pub expires_at: Option<OffsetDateTime>,
	/// Instant the attempt was consumed by a finish or poll.
	pub finished_at: Option<OffsetDateTime>,
	/// Creation instant.
	pub created_at: OffsetDateTime,
}
impl Interaction {
	/// Whether the attempt expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expiry| instant >= expiry)
	}

	/// Whether a finish or poll already consumed this attempt.
	pub const fn is_finished(&self) -> bool {
		self.finished_at.is_some()
	}

	/// Whether the attempt is still usable: unfinished and unexpired.
	pub fn is_open_at(&self, instant: OffsetDateTime) -> bool {
		!self.is_finished() && !self.is_expired_at(instant)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn fixture(expires_at: Option<OffsetDateTime>) -> Interaction {
		Interaction {
			id: InteractionId::random(),
			grant: GrantId::random(),
			method: StartMethod::Redirect,
			uri: None,
			code: None,
			reference: Some("REF".into()),
			state: InteractionState::Pending,
			expires_at,
			finished_at: None,
			created_at: macros::datetime!(2025-06-01 00:00 UTC),
		}
	}

	#[test]
	fn openness_reflects_expiry_and_finish() {
		let now = macros::datetime!(2025-06-01 00:05 UTC);
		let unbounded = fixture(None);

		assert!(unbounded.is_open_at(now));

		let expired = fixture(Some(macros::datetime!(2025-06-01 00:05 UTC)));

		assert!(expired.is_expired_at(now));
		assert!(!expired.is_open_at(now));

		let mut finished = fixture(Some(macros::datetime!(2025-06-01 01:00 UTC)));

		finished.finished_at = Some(now);

		assert!(!finished.is_open_at(now));
	}
}
