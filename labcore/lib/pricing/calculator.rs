//! The pricing calculator.

use getset::CopyGetters;
use serde::{Deserialize, Serialize};

use crate::config::{
    DateRange, LabSpec, NETWORK_RATE_PER_DAY, STORAGE_RATE_PER_DAY, SUPPORT_RATE_PER_DAY,
    VM_RATE_PER_DAY,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The derived cost breakdown of a lab configuration.
///
/// Recomputed whenever an input affecting cost changes; never independently
/// mutated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub with_prefix")]
pub struct PricingBreakdown {
    /// The compute cost across all VMs for the full duration.
    vm_cost: u64,

    /// The storage cost across all VMs for the full duration.
    storage_cost: u64,

    /// The network cost across all VMs for the full duration.
    network_cost: u64,

    /// The flat support cost for the full duration.
    support_cost: u64,

    /// The number of VMs the configuration materializes.
    total_vms: u32,

    /// The number of billable days.
    days: u64,

    /// The sum of all cost components.
    total: u64,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Computes the cost breakdown for a configuration's resource shape and
/// schedule.
///
/// Pure and deterministic: the same inputs always yield the same breakdown.
/// An unset or empty date range yields zero billable days and zero cost.
/// Invalid seat counts are rejected by the store before reaching this
/// function.
pub fn compute(total_vms: u32, date_range: &DateRange) -> PricingBreakdown {
    let days = date_range.days();
    let vms = total_vms as u64;

    let vm_cost = vms * VM_RATE_PER_DAY * days;
    let storage_cost = vms * STORAGE_RATE_PER_DAY * days;
    let network_cost = vms * NETWORK_RATE_PER_DAY * days;
    let support_cost = SUPPORT_RATE_PER_DAY * days;

    PricingBreakdown {
        vm_cost,
        storage_cost,
        network_cost,
        support_cost,
        total_vms,
        days,
        total: vm_cost + storage_cost + network_cost + support_cost,
    }
}

/// Computes the cost breakdown straight from a lab spec.
pub fn compute_for_spec(spec: &LabSpec) -> PricingBreakdown {
    compute(spec.total_vms(), spec.get_date_range())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
