use std::time::Duration;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The maximum number of VM templates a multi-VM configuration may carry.
pub const MAX_VM_TEMPLATES: usize = 3;

/// The maximum number of admin seats a lab configuration may carry.
pub const MAX_ADMIN_COUNT: u32 = 10;

/// The maximum number of participant seats a lab configuration may carry.
///
/// Bounds the size of the simulated fleet a single clone step can create.
pub const MAX_PARTICIPANT_COUNT: u32 = 500;

/// The daily compute rate per VM, in currency units.
pub const VM_RATE_PER_DAY: u64 = 50;

/// The daily storage rate per VM, in currency units.
pub const STORAGE_RATE_PER_DAY: u64 = 5;

/// The daily network rate per VM, in currency units.
pub const NETWORK_RATE_PER_DAY: u64 = 2;

/// The flat daily support rate per configuration, in currency units.
pub const SUPPORT_RATE_PER_DAY: u64 = 10;

/// The placeholder address an instance carries until the cloud assigns one.
pub const PENDING_IP: &str = "Pending...";

/// The default simulated latency of a trainer VM bring-up.
pub const DEFAULT_TRAINER_DELAY: Duration = Duration::from_millis(300);

/// The default simulated latency of a fleet clone.
pub const DEFAULT_CLONE_DELAY: Duration = Duration::from_millis(500);

/// The default upper bound on a single asynchronous provisioning step.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);
