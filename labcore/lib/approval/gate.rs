//! The approval state machine for a lab configuration.
//!
//! Provisioning requires two sign-offs: one from the platform (CloudAdda) and
//! one from the company admin. A rejection by either party ends the current
//! request; a fresh request resets both parties to pending.

use std::fmt::{self, Display};

use getset::CopyGetters;
use serde::{Deserialize, Serialize};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// One of the two parties whose sign-off gates provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalParty {
    /// The platform operator.
    CloudAdda,

    /// The admin of the company running the lab.
    CompanyAdmin,
}

/// A party's response to an outstanding approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The party signed off.
    Approved,

    /// The party declined.
    Rejected,
}

/// The recorded position of a party on the current approval request.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The party has not yet responded.
    #[default]
    Pending,

    /// The party signed off.
    Approved,

    /// The party declined.
    Rejected,
}

/// The approval state of one lab configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub with_prefix")]
pub struct ApprovalState {
    /// The platform's position on the current request.
    cloud_adda: Decision,

    /// The company admin's position on the current request.
    company_admin: Decision,

    /// Whether an approval request is outstanding.
    requested: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ApprovalState {
    /// Opens a new approval request, resetting both parties to pending.
    ///
    /// Re-requesting while a request is outstanding is idempotent apart from
    /// discarding any recorded rejection. The store rejects a request once the
    /// configuration has moved past approval.
    pub fn request(&mut self) {
        self.requested = true;
        self.cloud_adda = Decision::Pending;
        self.company_admin = Decision::Pending;
    }

    /// Records a party's verdict on the outstanding request.
    ///
    /// Re-recording the same verdict leaves the state unchanged. Only
    /// meaningful while a request is outstanding; the store enforces that.
    pub fn record(&mut self, party: ApprovalParty, verdict: Verdict) {
        let decision = match verdict {
            Verdict::Approved => Decision::Approved,
            Verdict::Rejected => Decision::Rejected,
        };
        match party {
            ApprovalParty::CloudAdda => self.cloud_adda = decision,
            ApprovalParty::CompanyAdmin => self.company_admin = decision,
        }
    }

    /// Whether provisioning may proceed: a request is outstanding and both
    /// parties approved.
    pub fn can_provision(&self) -> bool {
        self.requested
            && self.cloud_adda == Decision::Approved
            && self.company_admin == Decision::Approved
    }

    /// Whether either party rejected the current request.
    pub fn is_rejected(&self) -> bool {
        self.cloud_adda == Decision::Rejected || self.company_admin == Decision::Rejected
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Display for ApprovalParty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalParty::CloudAdda => write!(f, "cloud_adda"),
            ApprovalParty::CompanyAdmin => write!(f, "company_admin"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_requires_both_parties() {
        let mut state = ApprovalState::default();
        assert!(!state.can_provision());

        state.request();
        assert!(!state.can_provision());

        state.record(ApprovalParty::CloudAdda, Verdict::Approved);
        assert!(!state.can_provision());

        state.record(ApprovalParty::CompanyAdmin, Verdict::Approved);
        assert!(state.can_provision());
    }

    #[test]
    fn test_approval_record_is_idempotent() {
        let mut state = ApprovalState::default();
        state.request();
        state.record(ApprovalParty::CloudAdda, Verdict::Approved);

        let before = state;
        state.record(ApprovalParty::CloudAdda, Verdict::Approved);
        assert_eq!(state, before);
    }

    #[test]
    fn test_rejection_blocks_provisioning_until_rerequest() {
        let mut state = ApprovalState::default();
        state.request();
        state.record(ApprovalParty::CloudAdda, Verdict::Approved);
        state.record(ApprovalParty::CompanyAdmin, Verdict::Rejected);

        assert!(state.is_rejected());
        assert!(!state.can_provision());

        // A fresh request resets both parties to pending.
        state.request();
        assert!(!state.is_rejected());
        assert_eq!(state.get_cloud_adda(), Decision::Pending);
        assert_eq!(state.get_company_admin(), Decision::Pending);
    }
}
