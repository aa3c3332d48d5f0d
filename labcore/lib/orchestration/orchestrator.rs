//! The orchestrator of the provisioning workflow.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use getset::Getters;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    config::{DEFAULT_STEP_TIMEOUT, VmType},
    store::{CloneStatus, LabConfigStore, LabStatus, TrainerVmStatus},
    LabError, LabResult,
};

use super::{CloudProvider, OrchestrationEvent, ProvisioningStep};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The capacity of the orchestration event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Drives lab configurations through the asynchronous provisioning workflow:
/// trainer VM bring-up, configuration, then fleet cloning.
///
/// Each configuration has its own lifeline; at most one provisioning
/// operation is in flight per configuration at any time. Neither `provision`
/// nor `clone_for_participants` blocks the caller: both return after the
/// in-progress transition, and completion is observed via [`subscribe`] or by
/// polling the store.
///
/// [`subscribe`]: Orchestrator::subscribe
pub struct Orchestrator {
    /// The store owning the configurations being orchestrated.
    store: Arc<LabConfigStore>,

    /// The cloud the workflow runs against.
    provider: Arc<dyn CloudProvider>,

    /// The upper bound on a single asynchronous step.
    step_timeout: Duration,

    /// The in-flight task per configuration id.
    inflight: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,

    /// The completion/failure event channel.
    events: broadcast::Sender<OrchestrationEvent>,
}

/// A seat holder instances are assigned to during cloning.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub with_prefix")]
pub struct Assignee {
    /// The display name of the seat holder.
    name: String,

    /// The email of the seat holder, when known.
    email: Option<String>,
}

/// One planned instance of a fleet, computed before the clone task runs.
#[derive(Debug, Clone)]
struct SeatPlan {
    assigned_to: String,
    assigned_email: Option<String>,
    vm_name: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Assignee {
    /// Creates an assignee from a name and an optional email.
    pub fn new(name: impl AsRef<str>, email: Option<String>) -> Self {
        Self {
            name: name.as_ref().to_string(),
            email,
        }
    }
}

impl Orchestrator {
    /// Creates an orchestrator over a store and a cloud provider.
    pub fn new(store: Arc<LabConfigStore>, provider: Arc<dyn CloudProvider>) -> Self {
        Self::with_step_timeout(store, provider, DEFAULT_STEP_TIMEOUT)
    }

    /// Creates an orchestrator with a custom per-step timeout.
    pub fn with_step_timeout(
        store: Arc<LabConfigStore>,
        provider: Arc<dyn CloudProvider>,
        step_timeout: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            provider,
            step_timeout,
            inflight: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    /// Subscribes to completion and failure events.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.events.subscribe()
    }

    /// Starts provisioning an approved configuration.
    ///
    /// Moves the configuration to `Provisioning` and schedules the trainer VM
    /// bring-up, returning immediately. A configuration whose bring-up failed
    /// may be retried with the same call. A second call while an operation is
    /// in flight fails with `AlreadyInProgress`; one before both approvals
    /// fails with `ApprovalRequired`.
    pub async fn provision(&self, id: Uuid) -> LabResult<()> {
        let handle = self.store.handle(id).await?;

        let mut inflight = self.inflight.lock().await;
        inflight.retain(|_, task| !task.is_finished());
        if inflight.contains_key(&id) {
            return Err(LabError::AlreadyInProgress(id));
        }

        {
            let mut lab = handle.write().await;
            match lab.get_status() {
                LabStatus::Approved => {}
                LabStatus::Provisioning => {
                    // Only a failed bring-up may be retried.
                    if !matches!(
                        lab.get_trainer_vm().get_status(),
                        TrainerVmStatus::Failed { .. }
                    ) {
                        return Err(LabError::InvalidState {
                            id,
                            command: "provision",
                            status: LabStatus::Provisioning,
                        });
                    }
                }
                LabStatus::Draft | LabStatus::PendingApproval => {
                    return Err(LabError::ApprovalRequired(id));
                }
                status => {
                    return Err(LabError::InvalidState {
                        id,
                        command: "provision",
                        status: *status,
                    });
                }
            }

            lab.status = LabStatus::Provisioning;
            lab.trainer_vm.set_status(TrainerVmStatus::Provisioning);
            info!("Provisioning lab {}: trainer VM bring-up scheduled", id);
        }

        let task_handle = handle.clone();
        let provider = self.provider.clone();
        let events = self.events.clone();
        let timeout = self.step_timeout;
        let inflight_map = self.inflight.clone();

        let task = tokio::spawn(async move {
            let result = time::timeout(timeout, provider.bring_up_trainer(id)).await;

            // Mutations below are synchronous under the write lock, so an
            // abort cannot leave the trainer state half-updated.
            let mut lab = task_handle.write().await;
            match result {
                Ok(Ok(ip)) => {
                    lab.trainer_vm.set_status(TrainerVmStatus::Running);
                    lab.trainer_vm.set_ip_address(Some(ip.clone()));
                    lab.trainer_vm.set_provisioned_at(Some(Utc::now()));
                    info!("Trainer VM for lab {} is up at {}", id, ip);
                    let _ = events.send(OrchestrationEvent::TrainerVmReady { id });
                }
                Ok(Err(e)) => {
                    fail_trainer(&mut lab, &events, id, e.to_string());
                }
                Err(_) => {
                    fail_trainer(
                        &mut lab,
                        &events,
                        id,
                        format!("bring-up timed out after {:?}", timeout),
                    );
                }
            }
            drop(lab);

            inflight_map.lock().await.remove(&id);
        });

        inflight.insert(id, task);
        Ok(())
    }

    /// Marks a running trainer VM as configured, unlocking fleet cloning.
    pub async fn configure_trainer(&self, id: Uuid) -> LabResult<()> {
        let handle = self.store.handle(id).await?;
        let mut lab = handle.write().await;

        if *lab.get_status() != LabStatus::Provisioning
            || *lab.get_trainer_vm().get_status() != TrainerVmStatus::Running
        {
            return Err(LabError::InvalidState {
                id,
                command: "configure the trainer VM of",
                status: *lab.get_status(),
            });
        }

        lab.trainer_vm.set_status(TrainerVmStatus::Configured);
        info!("Trainer VM for lab {} configured", id);
        Ok(())
    }

    /// Clones the per-participant fleet from the configured trainer VM.
    ///
    /// Seats beyond the roster receive placeholder assignees. Returns
    /// immediately; on completion every seat has a running instance and the
    /// configuration is `Active`. A failed clone may be retried with the same
    /// call.
    pub async fn clone_for_participants(&self, id: Uuid, roster: &[Assignee]) -> LabResult<()> {
        let handle = self.store.handle(id).await?;

        let mut inflight = self.inflight.lock().await;
        inflight.retain(|_, task| !task.is_finished());
        if inflight.contains_key(&id) {
            return Err(LabError::AlreadyInProgress(id));
        }

        let (seats, trainer_ip) = {
            let mut lab = handle.write().await;

            if *lab.get_status() != LabStatus::Provisioning
                || *lab.get_trainer_vm().get_status() != TrainerVmStatus::Configured
            {
                return Err(LabError::InvalidState {
                    id,
                    command: "clone the fleet of",
                    status: *lab.get_status(),
                });
            }
            match lab.get_clone_status() {
                CloneStatus::NotCloned | CloneStatus::Failed { .. } => {}
                CloneStatus::Cloning => return Err(LabError::AlreadyInProgress(id)),
                CloneStatus::Cloned => {
                    return Err(LabError::InvalidState {
                        id,
                        command: "clone the fleet of",
                        status: *lab.get_status(),
                    });
                }
            }

            let seats = plan_seats(&lab, roster);
            let trainer_ip = lab
                .get_trainer_vm()
                .get_ip_address()
                .clone()
                .unwrap_or_default();

            lab.clone_status = CloneStatus::Cloning;
            info!("Cloning {} fleet instances for lab {}", seats.len(), id);
            (seats, trainer_ip)
        };

        let task_handle = handle.clone();
        let provider = self.provider.clone();
        let events = self.events.clone();
        let timeout = self.step_timeout;
        let inflight_map = self.inflight.clone();
        let count = seats.len() as u32;

        let task = tokio::spawn(async move {
            let result = time::timeout(timeout, provider.clone_fleet(id, &trainer_ip, count)).await;

            let mut lab = task_handle.write().await;
            match result {
                Ok(Ok(ips)) => {
                    // A retry after a partial failure starts from a clean set.
                    lab.registry.clear();
                    for (seat, ip) in seats.iter().zip(ips.iter()) {
                        lab.registry.admit_running(
                            &seat.assigned_to,
                            seat.assigned_email.clone(),
                            &seat.vm_name,
                            ip,
                        );
                    }
                    lab.clone_status = CloneStatus::Cloned;
                    lab.status = LabStatus::Active;
                    info!("Lab {} is active with {} instances", id, count);
                    let _ = events.send(OrchestrationEvent::CloneComplete { id });
                }
                Ok(Err(e)) => {
                    fail_clone(&mut lab, &events, id, e.to_string());
                }
                Err(_) => {
                    fail_clone(
                        &mut lab,
                        &events,
                        id,
                        format!("clone timed out after {:?}", timeout),
                    );
                }
            }
            drop(lab);

            inflight_map.lock().await.remove(&id);
        });

        inflight.insert(id, task);
        Ok(())
    }

    /// Ends an active lab: the configuration moves to `Completed` and every
    /// instance is forcibly stopped.
    pub async fn complete(&self, id: Uuid) -> LabResult<()> {
        let handle = self.store.handle(id).await?;
        let mut lab = handle.write().await;

        if *lab.get_status() != LabStatus::Active {
            return Err(LabError::InvalidState {
                id,
                command: "complete",
                status: *lab.get_status(),
            });
        }

        lab.registry.force_stop_all();
        lab.status = LabStatus::Completed;
        info!("Lab {} completed; all instances stopped", id);
        Ok(())
    }

    /// Cancels an in-flight (or failed) provisioning attempt and rolls the
    /// configuration back to `Approved`, discarding trainer and clone
    /// sub-state and any instances.
    pub async fn cancel(&self, id: Uuid) -> LabResult<()> {
        let handle = self.store.handle(id).await?;

        let mut inflight = self.inflight.lock().await;
        if let Some(task) = inflight.remove(&id) {
            task.abort();
        }

        let mut lab = handle.write().await;
        if *lab.get_status() != LabStatus::Provisioning {
            return Err(LabError::InvalidState {
                id,
                command: "cancel provisioning for",
                status: *lab.get_status(),
            });
        }

        lab.rollback_to_approved();
        info!("Provisioning of lab {} cancelled; rolled back to approved", id);
        let _ = self
            .events
            .send(OrchestrationEvent::ProvisioningCancelled { id });
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Plans the fleet: one seat per participant per template (single type counts
/// as one template), plus one per admin. Seats beyond the roster receive
/// placeholder assignees.
fn plan_seats(lab: &crate::store::LabConfiguration, roster: &[Assignee]) -> Vec<SeatPlan> {
    let templates: Vec<_> = match lab.get_vm_type() {
        VmType::Single => lab.get_vm_templates().iter().take(1).collect(),
        VmType::Multi => lab.get_vm_templates().iter().collect(),
    };

    let mut seats = Vec::new();

    for participant in 0..*lab.get_participant_count() {
        let (assigned_to, assigned_email) = match roster.get(participant as usize) {
            Some(assignee) => (assignee.get_name().clone(), assignee.get_email().clone()),
            None => (format!("Participant {}", participant + 1), None),
        };

        for template in &templates {
            seats.push(SeatPlan {
                assigned_to: assigned_to.clone(),
                assigned_email: assigned_email.clone(),
                vm_name: format!("{}-p{:02}", template.get_instance_name(), participant + 1),
            });
        }
    }

    if let Some(first) = templates.first() {
        for admin in 0..*lab.get_admin_count() {
            seats.push(SeatPlan {
                assigned_to: format!("Admin {}", admin + 1),
                assigned_email: None,
                vm_name: format!("{}-admin-{:02}", first.get_instance_name(), admin + 1),
            });
        }
    }

    seats
}

fn fail_trainer(
    lab: &mut crate::store::LabConfiguration,
    events: &broadcast::Sender<OrchestrationEvent>,
    id: Uuid,
    reason: String,
) {
    error!("Trainer VM bring-up failed for lab {}: {}", id, reason);
    lab.trainer_vm.set_status(TrainerVmStatus::Failed {
        error: reason.clone(),
    });
    let _ = events.send(OrchestrationEvent::OrchestrationFailed {
        id,
        step: ProvisioningStep::TrainerBringUp,
        reason,
    });
}

fn fail_clone(
    lab: &mut crate::store::LabConfiguration,
    events: &broadcast::Sender<OrchestrationEvent>,
    id: Uuid,
    reason: String,
) {
    error!("Fleet clone failed for lab {}: {}", id, reason);
    lab.clone_status = CloneStatus::Failed {
        error: reason.clone(),
    };
    let _ = events.send(OrchestrationEvent::OrchestrationFailed {
        id,
        step: ProvisioningStep::CloneFleet,
        reason,
    });
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
