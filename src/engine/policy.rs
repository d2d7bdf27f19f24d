//! Automatic assessment of requested access rights.
//!
//! Each resource kind carries a fixed decision; the match is exhaustive over the closed
//! access union, so adding a resource kind forces a policy decision at compile time.

// self
use crate::model::AccessRequest;

/// Per-request policy decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
	/// Granted without resource-owner involvement.
	Approve,
	/// Refused outright; one denial blocks the whole grant.
	Deny,
	/// Requires resource-owner interaction before a decision.
	Interact,
}

/// Aggregate assessment of a grant's access rights.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Assessment {
	/// At least one right was denied; the grant fails regardless of the rest.
	pub denied: bool,
	/// Every right was approved outright.
	pub all_approved: bool,
}

/// Decides one access right.
pub fn assess(request: &AccessRequest) -> Decision {
	match request {
		AccessRequest::Account(_) | AccessRequest::IncomingPayment(_) | AccessRequest::Quote(_) =>
			Decision::Approve,
		// Pending richer policy, outgoing payments are refused without exception.
		AccessRequest::OutgoingPayment { .. } => Decision::Deny,
	}
}

/// Decides a whole grant, fail-fast on denial.
pub fn assess_all<'a>(requests: impl IntoIterator<Item = &'a AccessRequest>) -> Assessment {
	let mut all_approved = true;
	let mut denied = false;

	for request in requests {
		match assess(request) {
			Decision::Approve => (),
			Decision::Deny => {
				denied = true;
				all_approved = false;
			},
			Decision::Interact => all_approved = false,
		}
	}

	Assessment { denied, all_approved }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::model::AccessCommon;

	fn account() -> AccessRequest {
		AccessRequest::Account(AccessCommon::default())
	}

	fn outgoing() -> AccessRequest {
		AccessRequest::OutgoingPayment { common: AccessCommon::default(), limits: None }
	}

	#[test]
	fn read_only_kinds_are_approved_outright() {
		for request in [
			account(),
			AccessRequest::IncomingPayment(AccessCommon::default()),
			AccessRequest::Quote(AccessCommon::default()),
		] {
			assert_eq!(assess(&request), Decision::Approve);
		}
	}

	#[test]
	fn one_denial_blocks_the_whole_grant() {
		let requests = [account(), outgoing(), account()];
		let assessment = assess_all(requests.iter());

		assert!(assessment.denied);
		assert!(!assessment.all_approved);
	}

	#[test]
	fn uniformly_approved_grants_are_fully_approved() {
		let requests = [account(), account()];
		let assessment = assess_all(requests.iter());

		assert!(!assessment.denied);
		assert!(assessment.all_approved);
	}
}
