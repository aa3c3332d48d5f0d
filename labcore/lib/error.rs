use std::{
    error::Error,
    fmt::{self, Display},
};

use thiserror::Error;
use uuid::Uuid;

use crate::{orchestration::ProvisioningStep, registry::InstanceStatus, store::LabStatus};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a labcore-related operation.
pub type LabResult<T> = Result<T, LabError>;

/// An error that occurred while operating on a lab configuration or its instances.
#[derive(Debug, Error)]
pub enum LabError {
    /// One or more fields of a lab configuration failed validation.
    #[error("lab configuration validation errors: [{}]", .0.join("; "))]
    Validation(Vec<String>),

    /// The requested lab configuration does not exist.
    #[error("lab configuration not found: {0}")]
    LabNotFound(Uuid),

    /// The requested VM instance does not exist.
    #[error("vm instance not found: {0}")]
    InstanceNotFound(Uuid),

    /// A command was issued against a lab configuration in a state that does not permit it.
    #[error("cannot {command} lab {id} while in status '{status}'")]
    InvalidState {
        /// The lab configuration the command targeted.
        id: Uuid,

        /// The command that was rejected.
        command: &'static str,

        /// The status the lab configuration was in.
        status: LabStatus,
    },

    /// A structural field edit was attempted after provisioning began.
    #[error("field '{field}' of lab {id} is immutable once provisioning has begun")]
    ImmutableField {
        /// The lab configuration the edit targeted.
        id: Uuid,

        /// The structural field that was rejected.
        field: &'static str,
    },

    /// An illegal VM instance status edge was attempted.
    #[error("invalid instance transition for {id}: {from} -> {to}")]
    InvalidTransition {
        /// The instance the transition targeted.
        id: Uuid,

        /// The status the instance was in.
        from: InstanceStatus,

        /// The status the transition requested.
        to: InstanceStatus,
    },

    /// A provisioning operation was attempted while another is already in flight.
    #[error("a provisioning operation is already in progress for lab {0}")]
    AlreadyInProgress(Uuid),

    /// Provisioning was attempted before both parties approved the configuration.
    #[error("lab {0} requires both approvals before provisioning")]
    ApprovalRequired(Uuid),

    /// An asynchronous provisioning step failed; the configuration is safe to retry.
    #[error("orchestration step '{step}' failed for lab {id}: {reason}")]
    OrchestrationFailed {
        /// The lab configuration the step belonged to.
        id: Uuid,

        /// The step that failed.
        step: ProvisioningStep,

        /// Why the step failed.
        reason: String,
    },

    /// An error that occurred when a join handle returned an error.
    #[error("join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    /// An error that can represent any error.
    #[error(transparent)]
    Custom(#[from] AnyError),
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl LabError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> LabError {
        LabError::Custom(AnyError {
            error: error.into(),
        })
    }
}

impl AnyError {
    /// Downcasts the error to a `T`.
    pub fn downcast<T>(&self) -> Option<&T>
    where
        T: Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<T>()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates an `Ok` `LabResult`.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> LabResult<T> {
    Result::Ok(value)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error for AnyError {}
