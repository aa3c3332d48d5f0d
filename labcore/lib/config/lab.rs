//! Lab configuration input types.

use std::fmt::{self, Display};

use chrono::NaiveDate;
use getset::Getters;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Whether each participant receives one VM or one VM per template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VmType {
    /// One VM per participant, from a single template.
    Single,

    /// One VM per participant per template, from up to three templates.
    Multi,
}

/// A VM template a lab configuration clones instances from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct VmTemplate {
    /// The identifier of the template image.
    #[builder(setter(transform = |id: impl AsRef<str>| id.as_ref().to_string()))]
    template_id: String,

    /// The base name cloned instances are derived from.
    #[builder(setter(transform = |name: impl AsRef<str>| name.as_ref().to_string()))]
    instance_name: String,
}

/// The calendar schedule of a lab configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct DateRange {
    /// The first day of the lab.
    #[builder(default, setter(strip_option))]
    from: Option<NaiveDate>,

    /// The last day of the lab.
    #[builder(default, setter(strip_option))]
    to: Option<NaiveDate>,
}

/// The declarative shape of a lab configuration, as supplied on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct LabSpec {
    /// The name of the lab configuration.
    #[builder(setter(transform = |name: impl AsRef<str>| name.as_ref().to_string()))]
    name: String,

    /// A free-form description of the lab configuration.
    #[builder(default, setter(transform = |desc: impl AsRef<str>| desc.as_ref().to_string()))]
    description: String,

    /// Whether participants receive one VM or one VM per template.
    vm_type: VmType,

    /// The templates instances are cloned from.
    vm_templates: Vec<VmTemplate>,

    /// The number of participant seats.
    participant_count: u32,

    /// The number of admin seats.
    #[builder(default)]
    admin_count: u32,

    /// The calendar schedule.
    #[builder(default)]
    date_range: DateRange,
}

/// A partial edit of a lab configuration. Unset fields are left unchanged.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder, Getters)]
#[getset(get = "pub with_prefix")]
pub struct LabUpdate {
    /// A new name.
    #[builder(default, setter(transform = |name: impl AsRef<str>| Some(name.as_ref().to_string())))]
    name: Option<String>,

    /// A new description.
    #[builder(default, setter(transform = |desc: impl AsRef<str>| Some(desc.as_ref().to_string())))]
    description: Option<String>,

    /// A new VM type. Structural.
    #[builder(default, setter(strip_option))]
    vm_type: Option<VmType>,

    /// A new template set. Structural.
    #[builder(default, setter(strip_option))]
    vm_templates: Option<Vec<VmTemplate>>,

    /// A new participant count. Structural.
    #[builder(default, setter(strip_option))]
    participant_count: Option<u32>,

    /// A new admin count. Structural.
    #[builder(default, setter(strip_option))]
    admin_count: Option<u32>,

    /// A new schedule.
    #[builder(default, setter(strip_option))]
    date_range: Option<DateRange>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DateRange {
    /// Creates a date range from two set dates.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// The number of billable calendar days the range covers, inclusive of both
    /// endpoints. Zero when either endpoint is unset.
    pub fn days(&self) -> u64 {
        match (self.from, self.to) {
            (Some(from), Some(to)) => ((to - from).num_days() + 1).max(0) as u64,
            _ => 0,
        }
    }
}

impl LabSpec {
    /// The total number of VMs the configuration materializes: one instance per
    /// participant per template (single type counts as one template), plus one
    /// per admin seat.
    pub fn total_vms(&self) -> u32 {
        let per_participant = match self.vm_type {
            VmType::Single => 1,
            VmType::Multi => self.vm_templates.len() as u32,
        };
        per_participant * self.participant_count + self.admin_count
    }
}

impl LabUpdate {
    /// Whether the update touches any structural field (VM type, templates or
    /// seat counts).
    pub fn is_structural(&self) -> bool {
        self.vm_type.is_some()
            || self.vm_templates.is_some()
            || self.participant_count.is_some()
            || self.admin_count.is_some()
    }

    /// The name of the first structural field the update touches, if any.
    pub fn structural_field(&self) -> Option<&'static str> {
        if self.vm_type.is_some() {
            Some("vm_type")
        } else if self.vm_templates.is_some() {
            Some("vm_templates")
        } else if self.participant_count.is_some() {
            Some("participant_count")
        } else if self.admin_count.is_some() {
            Some("admin_count")
        } else {
            None
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Display for VmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmType::Single => write!(f, "single"),
            VmType::Multi => write!(f, "multi"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
