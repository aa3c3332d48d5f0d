//! The store owning every lab configuration of a batch-scoped collection.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::{
    approval::{ApprovalParty, Verdict},
    config::{LabSpec, LabUpdate},
    registry::{InstanceStatus, VmInstance},
    LabError, LabResult,
};

use super::{LabConfiguration, LabSnapshot, LabStatus};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Owns the map of lab configurations, each an independently lockable
/// aggregate.
///
/// The outer lock guards only the map; every configuration carries its own
/// lock, so mutations of different configurations never contend.
#[derive(Debug, Default)]
pub struct LabConfigStore {
    labs: RwLock<HashMap<Uuid, Arc<RwLock<LabConfiguration>>>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl LabConfigStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a spec and creates a configuration in the draft state under
    /// the given batch. No configuration is created on any validation failure.
    pub async fn create(&self, batch_id: Uuid, spec: LabSpec) -> LabResult<Uuid> {
        spec.validate()?;

        let lab = LabConfiguration::from_spec(batch_id, spec);
        let id = *lab.get_id();

        self.labs
            .write()
            .await
            .insert(id, Arc::new(RwLock::new(lab)));

        info!("Created lab configuration {} in batch {}", id, batch_id);
        Ok(id)
    }

    /// Applies a partial edit to a configuration.
    ///
    /// Structural and schedule edits are rejected once provisioning has begun;
    /// before that,
    /// a structural edit resets the configuration to draft and discards
    /// approval progress and any instances. Any accepted edit that changes a
    /// pricing input triggers recomputation.
    pub async fn update(&self, id: Uuid, update: LabUpdate) -> LabResult<()> {
        let handle = self.handle(id).await?;
        let mut lab = handle.write().await;

        // Structural fields and the schedule freeze once provisioning begins.
        let frozen = matches!(
            lab.get_status(),
            LabStatus::Provisioning | LabStatus::Active | LabStatus::Completed
        );
        if frozen {
            if let Some(field) = update.structural_field() {
                return Err(LabError::ImmutableField { id, field });
            }
            if update.get_date_range().is_some() {
                return Err(LabError::ImmutableField {
                    id,
                    field: "date_range",
                });
            }
        }

        // Validate the edited shape before touching the configuration.
        let mut candidate = lab.spec_view();
        apply_update(&mut candidate, &update);
        candidate.validate()?;

        let pricing_changed = update.is_structural() || update.get_date_range().is_some();

        lab.name = candidate.get_name().clone();
        lab.description = candidate.get_description().clone();
        lab.vm_type = *candidate.get_vm_type();
        lab.vm_templates = candidate.get_vm_templates().clone();
        lab.participant_count = *candidate.get_participant_count();
        lab.admin_count = *candidate.get_admin_count();
        lab.date_range = *candidate.get_date_range();

        if update.is_structural()
            && matches!(
                lab.get_status(),
                LabStatus::PendingApproval | LabStatus::Approved
            )
        {
            info!("Structural edit resets lab {} to draft", id);
            lab.reset_to_draft();
        }

        if pricing_changed {
            lab.recompute_pricing();
        }

        Ok(())
    }

    /// Opens an approval request, moving a draft configuration to pending
    /// approval. Re-requesting while pending is permitted and resets any
    /// recorded rejection; anything later fails with `InvalidState`.
    pub async fn request_approval(&self, id: Uuid) -> LabResult<()> {
        let handle = self.handle(id).await?;
        let mut lab = handle.write().await;

        match lab.get_status() {
            LabStatus::Draft => {
                lab.approval.request();
                lab.status = LabStatus::PendingApproval;
                info!("Lab {} moved to pending approval", id);
                Ok(())
            }
            LabStatus::PendingApproval => {
                lab.approval.request();
                Ok(())
            }
            status => Err(LabError::InvalidState {
                id,
                command: "request approval for",
                status: *status,
            }),
        }
    }

    /// Records one party's verdict. When both parties have approved, the
    /// configuration moves to approved; a rejection leaves it pending until a
    /// new request is opened.
    pub async fn record_approval(
        &self,
        id: Uuid,
        party: ApprovalParty,
        verdict: Verdict,
    ) -> LabResult<LabStatus> {
        let handle = self.handle(id).await?;
        let mut lab = handle.write().await;

        if *lab.get_status() != LabStatus::PendingApproval {
            return Err(LabError::InvalidState {
                id,
                command: "record an approval for",
                status: *lab.get_status(),
            });
        }

        lab.approval.record(party, verdict);

        if lab.approval.can_provision() {
            lab.status = LabStatus::Approved;
            info!("Lab {} fully approved", id);
        }

        Ok(*lab.get_status())
    }

    /// Deletes a configuration, cascading deletion of its instances.
    ///
    /// Rejected while provisioning is in flight; cancel the operation first so
    /// no completion callback mutates a deleted configuration.
    pub async fn delete(&self, id: Uuid) -> LabResult<()> {
        let mut labs = self.labs.write().await;

        let handle = labs.get(&id).ok_or(LabError::LabNotFound(id))?;
        let status = *handle.read().await.get_status();
        if status == LabStatus::Provisioning {
            return Err(LabError::InvalidState {
                id,
                command: "delete",
                status,
            });
        }

        labs.remove(&id);
        info!("Deleted lab configuration {}", id);
        Ok(())
    }

    /// Takes a consistent snapshot of a configuration, including pricing and
    /// instance aggregates.
    pub async fn get(&self, id: Uuid) -> LabResult<LabSnapshot> {
        let handle = self.handle(id).await?;
        let lab = handle.read().await;
        Ok(lab.snapshot())
    }

    /// Snapshots every configuration of a batch, oldest first.
    pub async fn list(&self, batch_id: Uuid) -> Vec<LabSnapshot> {
        let handles: Vec<_> = self.labs.read().await.values().cloned().collect();

        let mut snapshots = Vec::new();
        for handle in handles {
            let lab = handle.read().await;
            if *lab.get_batch_id() == batch_id {
                snapshots.push(lab.snapshot());
            }
        }

        snapshots.sort_by_key(|s| *s.get_created_at());
        snapshots
    }

    /// Looks up one instance of a configuration.
    pub async fn get_instance(&self, id: Uuid, instance_id: Uuid) -> LabResult<VmInstance> {
        let handle = self.handle(id).await?;
        let lab = handle.read().await;
        lab.get_registry()
            .get(instance_id)
            .cloned()
            .ok_or(LabError::InstanceNotFound(instance_id))
    }

    /// Starts a stopped (or freshly provisioned) instance.
    pub async fn instance_start(&self, id: Uuid, instance_id: Uuid) -> LabResult<()> {
        self.transition_instance(id, instance_id, InstanceStatus::Running)
            .await
    }

    /// Stops a running instance.
    pub async fn instance_stop(&self, id: Uuid, instance_id: Uuid) -> LabResult<()> {
        self.transition_instance(id, instance_id, InstanceStatus::Stopped)
            .await
    }

    /// Restarts an instance: a running instance is stopped and started again,
    /// a stopped one simply started.
    pub async fn instance_restart(&self, id: Uuid, instance_id: Uuid) -> LabResult<()> {
        let handle = self.handle(id).await?;
        let mut lab = handle.write().await;

        let current = *lab
            .get_registry()
            .get(instance_id)
            .ok_or(LabError::InstanceNotFound(instance_id))?
            .get_status();

        if current == InstanceStatus::Running {
            lab.registry.transition(instance_id, InstanceStatus::Stopped)?;
        }
        lab.registry.transition(instance_id, InstanceStatus::Running)
    }

    /// Resets an errored instance back to provisioning.
    pub async fn instance_reset(&self, id: Uuid, instance_id: Uuid) -> LabResult<()> {
        self.transition_instance(id, instance_id, InstanceStatus::Provisioning)
            .await
    }

    /// The lockable aggregate for a configuration id.
    pub(crate) async fn handle(&self, id: Uuid) -> LabResult<Arc<RwLock<LabConfiguration>>> {
        self.labs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(LabError::LabNotFound(id))
    }

    async fn transition_instance(
        &self,
        id: Uuid,
        instance_id: Uuid,
        next: InstanceStatus,
    ) -> LabResult<()> {
        let handle = self.handle(id).await?;
        let mut lab = handle.write().await;
        lab.registry.transition(instance_id, next)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Overlays the set fields of an update onto a spec.
fn apply_update(spec: &mut LabSpec, update: &LabUpdate) {
    let templates = update
        .get_vm_templates()
        .clone()
        .unwrap_or_else(|| spec.get_vm_templates().clone());

    *spec = LabSpec::builder()
        .name(update.get_name().as_deref().unwrap_or(spec.get_name()))
        .description(
            update
                .get_description()
                .as_deref()
                .unwrap_or(spec.get_description()),
        )
        .vm_type(update.get_vm_type().unwrap_or(*spec.get_vm_type()))
        .vm_templates(templates)
        .participant_count(
            update
                .get_participant_count()
                .unwrap_or(*spec.get_participant_count()),
        )
        .admin_count(update.get_admin_count().unwrap_or(*spec.get_admin_count()))
        .date_range(update.get_date_range().unwrap_or(*spec.get_date_range()))
        .build();
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
