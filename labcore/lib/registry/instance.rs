//! A single VM instance and its lifecycle.

use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use getset::Getters;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::PENDING_IP, LabError, LabResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The lifecycle status of a VM instance.
///
/// Allowed edges: `Provisioning -> {Running, Error}`,
/// `Running -> {Stopped, Error}`, `Stopped -> {Running}` and
/// `Error -> {Provisioning}` (manual reset only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// The instance is being brought up.
    Provisioning,

    /// The instance is running.
    Running,

    /// The instance is stopped.
    Stopped,

    /// The instance failed.
    Error,
}

/// One concrete VM belonging to a lab configuration.
///
/// Owned exclusively by exactly one configuration; never shared, and never
/// outlives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
pub struct VmInstance {
    /// The unique identifier of the instance.
    id: Uuid,

    /// The seat holder the instance is assigned to.
    assigned_to: String,

    /// The email of the seat holder, when known.
    assigned_email: Option<String>,

    /// The display name of the instance.
    vm_name: String,

    /// The lifecycle status of the instance.
    status: InstanceStatus,

    /// The address of the instance, or a pending placeholder.
    ip_address: String,

    /// When the instance last entered the running state.
    started_at: Option<DateTime<Utc>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl InstanceStatus {
    /// Whether the edge from `self` to `next` is part of the transition table.
    pub fn can_transition_to(self, next: InstanceStatus) -> bool {
        matches!(
            (self, next),
            (InstanceStatus::Provisioning, InstanceStatus::Running)
                | (InstanceStatus::Provisioning, InstanceStatus::Error)
                | (InstanceStatus::Running, InstanceStatus::Stopped)
                | (InstanceStatus::Running, InstanceStatus::Error)
                | (InstanceStatus::Stopped, InstanceStatus::Running)
                | (InstanceStatus::Error, InstanceStatus::Provisioning)
        )
    }
}

impl VmInstance {
    /// Creates a new instance in the provisioning state with a pending address.
    pub fn new(
        assigned_to: impl AsRef<str>,
        assigned_email: Option<String>,
        vm_name: impl AsRef<str>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            assigned_to: assigned_to.as_ref().to_string(),
            assigned_email,
            vm_name: vm_name.as_ref().to_string(),
            status: InstanceStatus::Provisioning,
            ip_address: PENDING_IP.to_string(),
            started_at: None,
        }
    }

    /// Moves the instance along one edge of the transition table.
    ///
    /// An illegal edge fails with `InvalidTransition` and leaves the instance
    /// unchanged. Entering the running state stamps `started_at`.
    pub fn transition(&mut self, next: InstanceStatus) -> LabResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(LabError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }

        if next == InstanceStatus::Running {
            self.started_at = Some(Utc::now());
        }
        self.status = next;
        Ok(())
    }

    /// Marks a freshly cloned instance as running at the given address.
    pub(crate) fn mark_running(&mut self, ip_address: impl AsRef<str>) {
        self.ip_address = ip_address.as_ref().to_string();
        self.status = InstanceStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Forces the instance to stopped, bypassing the transition table.
    ///
    /// Used only when the owning configuration is completed.
    pub(crate) fn force_stop(&mut self) {
        self.status = InstanceStatus::Stopped;
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceStatus::Provisioning => write!(f, "provisioning"),
            InstanceStatus::Running => write!(f, "running"),
            InstanceStatus::Stopped => write!(f, "stopped"),
            InstanceStatus::Error => write!(f, "error"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
