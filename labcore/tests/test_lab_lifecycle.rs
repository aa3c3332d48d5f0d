//! Full-lifecycle tests driving lab configurations from draft through
//! approval, provisioning, cloning and completion.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use labcore::{
    approval::{ApprovalParty, Verdict},
    config::{DateRange, LabSpec, VmTemplate, VmType},
    orchestration::{
        Assignee, CloudProvider, OrchestrationEvent, Orchestrator, ProvisioningStep,
        SimulatedCloud,
    },
    store::{CloneStatus, LabConfigStore, LabStatus, TrainerVmStatus},
    LabError, LabResult,
};
use tokio::{sync::broadcast, time};
use uuid::Uuid;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A provider whose trainer bring-up fails exactly once before recovering.
struct FlakyCloud {
    inner: SimulatedCloud,
    tripped: AtomicBool,
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn helper_spec(participants: u32, admins: u32) -> LabSpec {
    LabSpec::builder()
        .name("network-security-fundamentals")
        .description("Hands-on network security training")
        .vm_type(VmType::Single)
        .vm_templates(vec![VmTemplate::builder()
            .template_id("kali-2024.1")
            .instance_name("sec-lab")
            .build()])
        .participant_count(participants)
        .admin_count(admins)
        .date_range(DateRange::new(
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 7).unwrap(),
        ))
        .build()
}

fn helper_fast_orchestrator(store: Arc<LabConfigStore>) -> Orchestrator {
    let cloud = SimulatedCloud::builder()
        .trainer_delay(Duration::from_millis(10))
        .clone_delay(Duration::from_millis(10))
        .build();
    Orchestrator::new(store, Arc::new(cloud))
}

async fn helper_approved_lab(store: &LabConfigStore) -> Uuid {
    let id = store
        .create(Uuid::new_v4(), helper_spec(3, 1))
        .await
        .unwrap();
    store.request_approval(id).await.unwrap();
    store
        .record_approval(id, ApprovalParty::CloudAdda, Verdict::Approved)
        .await
        .unwrap();
    store
        .record_approval(id, ApprovalParty::CompanyAdmin, Verdict::Approved)
        .await
        .unwrap();
    id
}

/// Waits until the channel delivers an event satisfying the predicate.
async fn helper_wait_for(
    events: &mut broadcast::Receiver<OrchestrationEvent>,
    predicate: impl Fn(&OrchestrationEvent) -> bool,
) -> OrchestrationEvent {
    time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for orchestration event")
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl CloudProvider for FlakyCloud {
    async fn bring_up_trainer(&self, lab_id: Uuid) -> LabResult<String> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            return Err(LabError::custom(anyhow::anyhow!(
                "injected bring-up failure"
            )));
        }
        self.inner.bring_up_trainer(lab_id).await
    }

    async fn clone_fleet(
        &self,
        lab_id: Uuid,
        trainer_ip: &str,
        count: u32,
    ) -> LabResult<Vec<String>> {
        self.inner.clone_fleet(lab_id, trainer_ip, count).await
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test)]
async fn test_full_lifecycle_draft_to_completed() {
    let store = Arc::new(LabConfigStore::new());
    let orchestrator = helper_fast_orchestrator(store.clone());
    let mut events = orchestrator.subscribe();

    let id = helper_approved_lab(&store).await;

    // Trainer bring-up.
    orchestrator.provision(id).await.unwrap();
    helper_wait_for(&mut events, |e| {
        matches!(e, OrchestrationEvent::TrainerVmReady { .. })
    })
    .await;

    let snapshot = store.get(id).await.unwrap();
    assert_eq!(*snapshot.get_status(), LabStatus::Provisioning);
    assert_eq!(
        *snapshot.get_trainer_vm().get_status(),
        TrainerVmStatus::Running
    );
    assert!(snapshot.get_trainer_vm().get_ip_address().is_some());

    // Configure, then clone the fleet for the roster.
    orchestrator.configure_trainer(id).await.unwrap();
    let roster = vec![
        Assignee::new("Alice", Some("alice@example.com".into())),
        Assignee::new("Bob", None),
    ];
    orchestrator
        .clone_for_participants(id, &roster)
        .await
        .unwrap();
    helper_wait_for(&mut events, |e| {
        matches!(e, OrchestrationEvent::CloneComplete { .. })
    })
    .await;

    let snapshot = store.get(id).await.unwrap();
    assert_eq!(*snapshot.get_status(), LabStatus::Active);
    assert_eq!(*snapshot.get_clone_status(), CloneStatus::Cloned);

    // 3 participants + 1 admin, every instance running with a real address.
    assert_eq!(*snapshot.get_total_vms(), 4);
    let aggregate = snapshot.get_instance_aggregate();
    assert_eq!(aggregate.get_total(), 4);
    assert_eq!(aggregate.get_running_count(), 4);
    assert!(snapshot
        .get_instances()
        .iter()
        .all(|i| i.get_ip_address() != "Pending..."));

    // The third seat falls back to a placeholder assignee.
    let names: Vec<_> = snapshot
        .get_instances()
        .iter()
        .map(|i| i.get_assigned_to().as_str())
        .collect();
    assert!(names.contains(&"Alice"));
    assert!(names.contains(&"Bob"));
    assert!(names.contains(&"Participant 3"));

    // Completion stops everything.
    orchestrator.complete(id).await.unwrap();
    let snapshot = store.get(id).await.unwrap();
    assert_eq!(*snapshot.get_status(), LabStatus::Completed);
    assert_eq!(
        snapshot.get_instance_aggregate().get_stopped_count(),
        4
    );
}

#[test_log::test(tokio::test)]
async fn test_concurrent_provision_admits_exactly_one() {
    let store = Arc::new(LabConfigStore::new());
    let cloud = SimulatedCloud::builder()
        .trainer_delay(Duration::from_millis(200))
        .clone_delay(Duration::from_millis(10))
        .build();
    let orchestrator = Orchestrator::new(store.clone(), Arc::new(cloud));

    let id = helper_approved_lab(&store).await;

    let (first, second) = tokio::join!(orchestrator.provision(id), orchestrator.provision(id));
    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let losing = if first.is_err() { first } else { second };
    assert!(matches!(
        losing.unwrap_err(),
        LabError::AlreadyInProgress(_) | LabError::InvalidState { .. }
    ));
}

#[test_log::test(tokio::test)]
async fn test_failed_bring_up_is_retryable() {
    let store = Arc::new(LabConfigStore::new());
    let cloud = FlakyCloud {
        inner: SimulatedCloud::builder()
            .trainer_delay(Duration::from_millis(10))
            .clone_delay(Duration::from_millis(10))
            .build(),
        tripped: AtomicBool::new(false),
    };
    let orchestrator = Orchestrator::new(store.clone(), Arc::new(cloud));
    let mut events = orchestrator.subscribe();

    let id = helper_approved_lab(&store).await;

    // First attempt fails and records the reason.
    orchestrator.provision(id).await.unwrap();
    let event = helper_wait_for(&mut events, |e| {
        matches!(e, OrchestrationEvent::OrchestrationFailed { .. })
    })
    .await;
    match event {
        OrchestrationEvent::OrchestrationFailed { step, reason, .. } => {
            assert_eq!(step, ProvisioningStep::TrainerBringUp);
            assert!(reason.contains("injected bring-up failure"));
        }
        other => panic!("unexpected event {:?}", other),
    }

    let snapshot = store.get(id).await.unwrap();
    assert_eq!(*snapshot.get_status(), LabStatus::Provisioning);
    assert!(matches!(
        snapshot.get_trainer_vm().get_status(),
        TrainerVmStatus::Failed { .. }
    ));

    // The retry goes through.
    orchestrator.provision(id).await.unwrap();
    helper_wait_for(&mut events, |e| {
        matches!(e, OrchestrationEvent::TrainerVmReady { .. })
    })
    .await;

    let snapshot = store.get(id).await.unwrap();
    assert_eq!(
        *snapshot.get_trainer_vm().get_status(),
        TrainerVmStatus::Running
    );
}

#[test_log::test(tokio::test)]
async fn test_step_timeout_fails_the_attempt() {
    let store = Arc::new(LabConfigStore::new());
    let cloud = SimulatedCloud::builder()
        .trainer_delay(Duration::from_secs(60))
        .clone_delay(Duration::from_millis(10))
        .build();
    let orchestrator = Orchestrator::with_step_timeout(
        store.clone(),
        Arc::new(cloud),
        Duration::from_millis(50),
    );
    let mut events = orchestrator.subscribe();

    let id = helper_approved_lab(&store).await;
    orchestrator.provision(id).await.unwrap();

    let event = helper_wait_for(&mut events, |e| {
        matches!(e, OrchestrationEvent::OrchestrationFailed { .. })
    })
    .await;
    match event {
        OrchestrationEvent::OrchestrationFailed { step, reason, .. } => {
            assert_eq!(step, ProvisioningStep::TrainerBringUp);
            assert!(reason.contains("timed out"));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test_log::test(tokio::test)]
async fn test_cancel_rolls_back_to_approved() {
    let store = Arc::new(LabConfigStore::new());
    let cloud = SimulatedCloud::builder()
        .trainer_delay(Duration::from_secs(60))
        .clone_delay(Duration::from_millis(10))
        .build();
    let orchestrator = Orchestrator::new(store.clone(), Arc::new(cloud));
    let mut events = orchestrator.subscribe();

    let id = helper_approved_lab(&store).await;
    orchestrator.provision(id).await.unwrap();

    // Deleting mid-flight is rejected; cancel first.
    assert!(matches!(
        store.delete(id).await,
        Err(LabError::InvalidState { .. })
    ));

    orchestrator.cancel(id).await.unwrap();
    helper_wait_for(&mut events, |e| {
        matches!(e, OrchestrationEvent::ProvisioningCancelled { .. })
    })
    .await;

    let snapshot = store.get(id).await.unwrap();
    assert_eq!(*snapshot.get_status(), LabStatus::Approved);
    assert_eq!(
        *snapshot.get_trainer_vm().get_status(),
        TrainerVmStatus::NotProvisioned
    );
    assert!(snapshot.get_instances().is_empty());

    // Once rolled back, deletion goes through.
    store.delete(id).await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_active_lab_rejects_structural_edits_but_allows_instance_ops() {
    let store = Arc::new(LabConfigStore::new());
    let orchestrator = helper_fast_orchestrator(store.clone());
    let mut events = orchestrator.subscribe();

    let id = helper_approved_lab(&store).await;
    orchestrator.provision(id).await.unwrap();
    helper_wait_for(&mut events, |e| {
        matches!(e, OrchestrationEvent::TrainerVmReady { .. })
    })
    .await;
    orchestrator.configure_trainer(id).await.unwrap();
    orchestrator.clone_for_participants(id, &[]).await.unwrap();
    helper_wait_for(&mut events, |e| {
        matches!(e, OrchestrationEvent::CloneComplete { .. })
    })
    .await;

    // Structural edits are frozen from provisioning onward.
    let result = store
        .update(
            id,
            labcore::config::LabUpdate::builder().participant_count(10).build(),
        )
        .await;
    assert!(matches!(result, Err(LabError::ImmutableField { .. })));

    // Per-instance lifecycle keeps working on the active fleet.
    let snapshot = store.get(id).await.unwrap();
    let instance_id = *snapshot.get_instances()[0].get_id();

    store.instance_stop(id, instance_id).await.unwrap();
    store.instance_start(id, instance_id).await.unwrap();
    store.instance_restart(id, instance_id).await.unwrap();

    let instance = store.get_instance(id, instance_id).await.unwrap();
    assert_eq!(
        *instance.get_status(),
        labcore::registry::InstanceStatus::Running
    );
}
