//! `labcore` is a provisioning and approval orchestration engine for training-lab VM fleets.
//!
//! # Overview
//!
//! labcore takes a declarative lab configuration (VM templates, participant and
//! admin counts, schedule) and drives it through approval gating, cost
//! computation and simulated cloud provisioning into a running fleet of
//! per-user virtual machine instances. It handles:
//!
//! - Lab configuration lifecycle management
//! - Two-party approval gating
//! - Cost computation from resource shape and duration
//! - Trainer VM bring-up and per-participant fleet cloning
//! - Per-instance start/stop/restart lifecycles
//!
//! # Architecture
//!
//! labcore consists of several key components:
//!
//! - **Config**: Lab configuration types and validation
//! - **Pricing**: Pure cost computation over a configuration's resource shape
//! - **Approval**: The two-party sign-off state machine
//! - **Registry**: Per-configuration VM instance set and transitions
//! - **Store**: Ownership of lab configurations and their state machines
//! - **Orchestration**: Asynchronous trainer bring-up and fleet cloning
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use labcore::{
//!     approval::{ApprovalParty, Verdict},
//!     config::{DateRange, LabSpec, VmTemplate, VmType},
//!     orchestration::{Orchestrator, SimulatedCloud},
//!     store::LabConfigStore,
//! };
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(LabConfigStore::new());
//!     let orchestrator = Orchestrator::new(store.clone(), Arc::new(SimulatedCloud::default()));
//!
//!     let spec = LabSpec::builder()
//!         .name("rust-bootcamp")
//!         .vm_type(VmType::Single)
//!         .vm_templates(vec![VmTemplate::builder()
//!             .template_id("ubuntu-22.04")
//!             .instance_name("bootcamp-vm")
//!             .build()])
//!         .participant_count(10)
//!         .admin_count(2)
//!         .date_range(DateRange::default())
//!         .build();
//!
//!     let lab_id = store.create(Uuid::new_v4(), spec).await?;
//!     store.request_approval(lab_id).await?;
//!     store
//!         .record_approval(lab_id, ApprovalParty::CloudAdda, Verdict::Approved)
//!         .await?;
//!     store
//!         .record_approval(lab_id, ApprovalParty::CompanyAdmin, Verdict::Approved)
//!         .await?;
//!
//!     orchestrator.provision(lab_id).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`approval`] - Two-party approval gate
//! - [`config`] - Lab configuration types and validation
//! - [`orchestration`] - Provisioning workflow and cloud provider seam
//! - [`pricing`] - Cost computation
//! - [`registry`] - VM instance set and per-instance lifecycle
//! - [`store`] - Lab configuration ownership and state machine

#![warn(missing_docs)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod approval;
pub mod config;
pub mod orchestration;
pub mod pricing;
pub mod registry;
pub mod store;

pub use error::*;
