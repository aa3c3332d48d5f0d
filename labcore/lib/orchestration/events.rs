//! Events emitted by the asynchronous provisioning steps.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// One of the asynchronous steps of the provisioning workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStep {
    /// Bringing up the trainer VM.
    TrainerBringUp,

    /// Cloning the per-participant fleet from the configured trainer VM.
    CloneFleet,
}

/// A completion or failure notification from an asynchronous provisioning
/// step, delivered on the orchestrator's event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum OrchestrationEvent {
    /// The trainer VM came up and has an address.
    TrainerVmReady {
        /// The lab configuration the trainer VM belongs to.
        id: Uuid,
    },

    /// The fleet is materialized and the configuration is active.
    CloneComplete {
        /// The lab configuration the fleet belongs to.
        id: Uuid,
    },

    /// An asynchronous step failed; the configuration is safe to retry.
    OrchestrationFailed {
        /// The lab configuration the step belonged to.
        id: Uuid,

        /// The step that failed.
        step: ProvisioningStep,

        /// Why the step failed.
        reason: String,
    },

    /// An in-flight provisioning operation was cancelled and the configuration
    /// rolled back to approved.
    ProvisioningCancelled {
        /// The lab configuration the operation belonged to.
        id: Uuid,
    },
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Display for ProvisioningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisioningStep::TrainerBringUp => write!(f, "trainer bring-up"),
            ProvisioningStep::CloneFleet => write!(f, "clone fleet"),
        }
    }
}
