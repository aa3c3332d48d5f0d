//! The instance registry of one lab configuration.

use getset::CopyGetters;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LabError, LabResult};

use super::{InstanceStatus, VmInstance};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Owns the set of VM instances belonging to one lab configuration.
///
/// The registry lives inside the configuration aggregate, so transitions on a
/// given instance are serialized by the aggregate's lock.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRegistry {
    instances: Vec<VmInstance>,
}

/// A point-in-time count of instances by status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub with_prefix")]
pub struct InstanceAggregate {
    /// The number of running instances.
    running_count: u32,

    /// The number of stopped instances.
    stopped_count: u32,

    /// The number of errored instances.
    error_count: u32,

    /// The number of instances still provisioning.
    provisioning_count: u32,

    /// The total number of instances.
    total: u32,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl InstanceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new instance in the provisioning state and returns its id.
    pub fn create_instance(
        &mut self,
        assigned_to: impl AsRef<str>,
        assigned_email: Option<String>,
        vm_name: impl AsRef<str>,
    ) -> Uuid {
        let instance = VmInstance::new(assigned_to, assigned_email, vm_name);
        let id = *instance.get_id();
        self.instances.push(instance);
        id
    }

    /// Looks up an instance by id.
    pub fn get(&self, instance_id: Uuid) -> Option<&VmInstance> {
        self.instances.iter().find(|i| *i.get_id() == instance_id)
    }

    /// Moves an instance along one edge of the transition table.
    pub fn transition(&mut self, instance_id: Uuid, next: InstanceStatus) -> LabResult<()> {
        let instance = self
            .instances
            .iter_mut()
            .find(|i| *i.get_id() == instance_id)
            .ok_or(LabError::InstanceNotFound(instance_id))?;
        instance.transition(next)
    }

    /// Counts instances by status. Always a fresh O(n) scan, never cached.
    pub fn aggregate(&self) -> InstanceAggregate {
        let mut aggregate = InstanceAggregate {
            total: self.instances.len() as u32,
            ..Default::default()
        };

        for instance in &self.instances {
            match instance.get_status() {
                InstanceStatus::Running => aggregate.running_count += 1,
                InstanceStatus::Stopped => aggregate.stopped_count += 1,
                InstanceStatus::Error => aggregate.error_count += 1,
                InstanceStatus::Provisioning => aggregate.provisioning_count += 1,
            }
        }

        aggregate
    }

    /// A copy of every instance, for snapshots.
    pub fn instances(&self) -> Vec<VmInstance> {
        self.instances.clone()
    }

    /// The number of instances in the registry.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the registry holds no instances.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Creates an instance and immediately marks it running at the given
    /// address. Used by the clone step, which materializes instances that the
    /// simulated cloud has already brought up.
    pub(crate) fn admit_running(
        &mut self,
        assigned_to: impl AsRef<str>,
        assigned_email: Option<String>,
        vm_name: impl AsRef<str>,
        ip: impl AsRef<str>,
    ) -> Uuid {
        let mut instance = VmInstance::new(assigned_to, assigned_email, vm_name);
        instance.mark_running(ip);
        let id = *instance.get_id();
        self.instances.push(instance);
        id
    }

    /// Forces every instance to stopped. Used when the configuration completes.
    pub(crate) fn force_stop_all(&mut self) {
        for instance in &mut self.instances {
            instance.force_stop();
        }
    }

    /// Discards every instance. Permitted only when the owning configuration
    /// is deleted or reset to draft.
    pub(crate) fn clear(&mut self) {
        self.instances.clear();
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
