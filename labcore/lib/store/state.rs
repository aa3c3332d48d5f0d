//! The state of one lab configuration aggregate.

use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use getset::{Getters, Setters};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    approval::ApprovalState,
    config::{DateRange, LabSpec, VmTemplate, VmType},
    pricing::{self, PricingBreakdown},
    registry::{InstanceAggregate, InstanceRegistry, VmInstance},
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The lifecycle status of a lab configuration.
///
/// Monotonically forward except for the explicit reset to `Draft` a structural
/// edit triggers before provisioning begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabStatus {
    /// Freely editable; approval not yet requested.
    Draft,

    /// An approval request is outstanding.
    PendingApproval,

    /// Both parties approved; provisioning may begin.
    Approved,

    /// The provisioning workflow is underway.
    Provisioning,

    /// The full fleet is materialized and running.
    Active,

    /// The batch ended; every instance stopped.
    Completed,
}

/// The status of the trainer VM a fleet is cloned from.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainerVmStatus {
    /// No bring-up has been attempted.
    #[default]
    NotProvisioned,

    /// Bring-up is in flight.
    Provisioning,

    /// The trainer VM is up but not yet configured.
    Running,

    /// The trainer VM is configured and ready to clone from.
    Configured,

    /// The trainer VM is stopped.
    Stopped,

    /// Bring-up failed; the step is safe to retry.
    Failed {
        /// Why the bring-up failed.
        error: String,
    },
}

/// The trainer VM of a lab configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[getset(get = "pub with_prefix", set = "pub(crate) with_prefix")]
pub struct TrainerVm {
    /// The bring-up status of the trainer VM.
    status: TrainerVmStatus,

    /// The address of the trainer VM once it is up.
    ip_address: Option<String>,

    /// When the trainer VM came up.
    provisioned_at: Option<DateTime<Utc>>,
}

/// The fleet-cloning status of a lab configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneStatus {
    /// No clone has been attempted.
    #[default]
    NotCloned,

    /// Fleet creation is in flight.
    Cloning,

    /// The fleet is materialized.
    Cloned,

    /// Cloning failed; the step is safe to retry.
    Failed {
        /// Why the clone failed.
        error: String,
    },
}

/// One lab configuration: the aggregate root owning its approval state,
/// pricing, trainer VM and instance set.
#[derive(Debug, Clone, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
pub struct LabConfiguration {
    /// The unique identifier of the configuration.
    id: Uuid,

    /// The batch the configuration belongs to.
    batch_id: Uuid,

    /// The name of the configuration.
    pub(crate) name: String,

    /// A free-form description.
    pub(crate) description: String,

    /// Whether participants receive one VM or one VM per template.
    pub(crate) vm_type: VmType,

    /// The templates instances are cloned from.
    pub(crate) vm_templates: Vec<VmTemplate>,

    /// The number of participant seats.
    pub(crate) participant_count: u32,

    /// The number of admin seats.
    pub(crate) admin_count: u32,

    /// The calendar schedule.
    pub(crate) date_range: DateRange,

    /// The lifecycle status.
    pub(crate) status: LabStatus,

    /// The two-party approval state.
    pub(crate) approval: ApprovalState,

    /// The derived cost breakdown.
    pub(crate) pricing: PricingBreakdown,

    /// The trainer VM state.
    pub(crate) trainer_vm: TrainerVm,

    /// The fleet-cloning status.
    pub(crate) clone_status: CloneStatus,

    /// The instance set.
    pub(crate) registry: InstanceRegistry,

    /// When the configuration was created.
    created_at: DateTime<Utc>,
}

/// A consistent, read-only view of one lab configuration, consumed by UI and
/// reporting collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
pub struct LabSnapshot {
    /// The unique identifier of the configuration.
    id: Uuid,

    /// The batch the configuration belongs to.
    batch_id: Uuid,

    /// The name of the configuration.
    name: String,

    /// A free-form description.
    description: String,

    /// Whether participants receive one VM or one VM per template.
    vm_type: VmType,

    /// The templates instances are cloned from.
    vm_templates: Vec<VmTemplate>,

    /// The number of participant seats.
    participant_count: u32,

    /// The number of admin seats.
    admin_count: u32,

    /// The total number of VMs the configuration materializes.
    total_vms: u32,

    /// The calendar schedule.
    date_range: DateRange,

    /// The lifecycle status.
    status: LabStatus,

    /// The two-party approval state.
    approval: ApprovalState,

    /// The derived cost breakdown.
    pricing: PricingBreakdown,

    /// The trainer VM state.
    trainer_vm: TrainerVm,

    /// The fleet-cloning status.
    clone_status: CloneStatus,

    /// Every instance of the configuration.
    instances: Vec<VmInstance>,

    /// The instance counts by status.
    instance_aggregate: InstanceAggregate,

    /// When the configuration was created.
    created_at: DateTime<Utc>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl LabConfiguration {
    /// Creates a new configuration in the draft state from a validated spec,
    /// with pricing computed immediately.
    pub(crate) fn from_spec(batch_id: Uuid, spec: LabSpec) -> Self {
        let pricing = pricing::compute_for_spec(&spec);
        Self {
            id: Uuid::new_v4(),
            batch_id,
            name: spec.get_name().clone(),
            description: spec.get_description().clone(),
            vm_type: *spec.get_vm_type(),
            vm_templates: spec.get_vm_templates().clone(),
            participant_count: *spec.get_participant_count(),
            admin_count: *spec.get_admin_count(),
            date_range: *spec.get_date_range(),
            status: LabStatus::Draft,
            approval: ApprovalState::default(),
            pricing,
            trainer_vm: TrainerVm::default(),
            clone_status: CloneStatus::default(),
            registry: InstanceRegistry::new(),
            created_at: Utc::now(),
        }
    }

    /// The total number of VMs the configuration materializes.
    pub fn total_vms(&self) -> u32 {
        let per_participant = match self.vm_type {
            VmType::Single => 1,
            VmType::Multi => self.vm_templates.len() as u32,
        };
        per_participant * self.participant_count + self.admin_count
    }

    /// Rebuilds the spec view of the configuration, used to validate edits
    /// before applying them.
    pub(crate) fn spec_view(&self) -> LabSpec {
        LabSpec::builder()
            .name(&self.name)
            .description(&self.description)
            .vm_type(self.vm_type)
            .vm_templates(self.vm_templates.clone())
            .participant_count(self.participant_count)
            .admin_count(self.admin_count)
            .date_range(self.date_range)
            .build()
    }

    /// Recomputes pricing from the current structural fields and schedule.
    pub(crate) fn recompute_pricing(&mut self) {
        self.pricing = pricing::compute(self.total_vms(), &self.date_range);
    }

    /// Resets the configuration to draft, discarding approval progress,
    /// in-flight sub-state and any instances.
    pub(crate) fn reset_to_draft(&mut self) {
        self.status = LabStatus::Draft;
        self.approval = ApprovalState::default();
        self.trainer_vm = TrainerVm::default();
        self.clone_status = CloneStatus::default();
        self.registry.clear();
    }

    /// Rolls an in-flight or failed provisioning attempt back to approved.
    pub(crate) fn rollback_to_approved(&mut self) {
        self.status = LabStatus::Approved;
        self.trainer_vm = TrainerVm::default();
        self.clone_status = CloneStatus::default();
        self.registry.clear();
    }

    /// Takes a consistent read-only snapshot of the configuration.
    pub fn snapshot(&self) -> LabSnapshot {
        LabSnapshot {
            id: self.id,
            batch_id: self.batch_id,
            name: self.name.clone(),
            description: self.description.clone(),
            vm_type: self.vm_type,
            vm_templates: self.vm_templates.clone(),
            participant_count: self.participant_count,
            admin_count: self.admin_count,
            total_vms: self.total_vms(),
            date_range: self.date_range,
            status: self.status,
            approval: self.approval,
            pricing: self.pricing,
            trainer_vm: self.trainer_vm.clone(),
            clone_status: self.clone_status.clone(),
            instances: self.registry.instances(),
            instance_aggregate: self.registry.aggregate(),
            created_at: self.created_at,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Display for LabStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabStatus::Draft => write!(f, "draft"),
            LabStatus::PendingApproval => write!(f, "pending_approval"),
            LabStatus::Approved => write!(f, "approved"),
            LabStatus::Provisioning => write!(f, "provisioning"),
            LabStatus::Active => write!(f, "active"),
            LabStatus::Completed => write!(f, "completed"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
