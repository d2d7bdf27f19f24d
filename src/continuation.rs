//! Continuation credential rotation and request pacing.
//!
//! Every response that offers continuation rotates the grant's continuation secret and
//! stamps the pacing anchor; a continuation call arriving before the advertised wait has
//! elapsed is rejected without touching the grant.

// self
use crate::{_prelude::*, model::{Grant, Secret}};

/// Rotates the continuation secret and stamps the pacing anchor.
///
/// The outgoing secret stops resolving the moment the rotated grant commits, so at most
/// one caller can ever redeem a given secret.
pub fn rotate(grant: &mut Grant, now: OffsetDateTime) {
	grant.continuation = Secret::random(32);
	grant.last_continued_at = Some(now);
	grant.updated_at = now;
}

/// Enforces the advertised wait between continuation calls.
///
/// The anchor is the instant of the last continuation offer; the returned wait is the
/// number of whole seconds the caller still has to sit out, never zero.
pub fn check_pace(grant: &Grant, now: OffsetDateTime) -> Result<()> {
	let Some(last) = grant.last_continued_at else {
		return Ok(());
	};
	let earliest = last + grant.wait;

	if now < earliest {
		let remaining = (earliest - now).whole_seconds().max(1) as u64;

		return Err(Error::TooFast { wait: remaining });
	}

	Ok(())
}
