//! Lab configuration validation.

use crate::{LabError, LabResult};

use super::{
    LabSpec, VmType, MAX_ADMIN_COUNT, MAX_PARTICIPANT_COUNT, MAX_VM_TEMPLATES,
};

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl LabSpec {
    /// Performs comprehensive validation of a lab configuration spec.
    /// This includes checking for:
    /// - A non-empty name
    /// - Seat counts within bounds
    /// - A template set matching the VM type
    /// - Non-empty template fields
    /// - A coherent date range
    ///
    /// Every violation is collected; a failed validation reports all of them
    /// at once and no configuration is created.
    pub fn validate(&self) -> LabResult<()> {
        let mut errors = Vec::new();

        self.validate_name(&mut errors);
        self.validate_counts(&mut errors);
        self.validate_templates(&mut errors);
        self.validate_date_range(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LabError::Validation(errors))
        }
    }

    fn validate_name(&self, errors: &mut Vec<String>) {
        if self.get_name().trim().is_empty() {
            errors.push("name: must not be empty".to_string());
        }
    }

    fn validate_counts(&self, errors: &mut Vec<String>) {
        let participants = *self.get_participant_count();
        if participants < 1 {
            errors.push("participant_count: must be at least 1".to_string());
        } else if participants > MAX_PARTICIPANT_COUNT {
            errors.push(format!(
                "participant_count: must not exceed {}",
                MAX_PARTICIPANT_COUNT
            ));
        }

        if *self.get_admin_count() > MAX_ADMIN_COUNT {
            errors.push(format!("admin_count: must not exceed {}", MAX_ADMIN_COUNT));
        }
    }

    fn validate_templates(&self, errors: &mut Vec<String>) {
        let templates = self.get_vm_templates();

        match self.get_vm_type() {
            VmType::Single => {
                if templates.len() != 1 {
                    errors.push(format!(
                        "vm_templates: single VM type requires exactly 1 template, got {}",
                        templates.len()
                    ));
                }
            }
            VmType::Multi => {
                if templates.is_empty() || templates.len() > MAX_VM_TEMPLATES {
                    errors.push(format!(
                        "vm_templates: multi VM type requires 1 to {} templates, got {}",
                        MAX_VM_TEMPLATES,
                        templates.len()
                    ));
                }
            }
        }

        for (index, template) in templates.iter().enumerate() {
            if template.get_template_id().trim().is_empty() {
                errors.push(format!("vm_templates[{}]: template_id must not be empty", index));
            }
            if template.get_instance_name().trim().is_empty() {
                errors.push(format!(
                    "vm_templates[{}]: instance_name must not be empty",
                    index
                ));
            }
        }
    }

    fn validate_date_range(&self, errors: &mut Vec<String>) {
        let range = self.get_date_range();
        if let (Some(from), Some(to)) = (range.get_from(), range.get_to()) {
            if to < from {
                errors.push("date_range: 'to' must not precede 'from'".to_string());
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::config::{DateRange, VmTemplate};

    use super::*;

    mod fixtures {
        use super::*;

        pub fn template(id: &str) -> VmTemplate {
            VmTemplate::builder()
                .template_id(id)
                .instance_name(format!("{}-vm", id))
                .build()
        }

        pub fn single_spec() -> LabSpec {
            LabSpec::builder()
                .name("test-lab")
                .vm_type(VmType::Single)
                .vm_templates(vec![template("ubuntu")])
                .participant_count(5)
                .admin_count(1)
                .build()
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_spec() {
        assert!(fixtures::single_spec().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_participants() {
        let spec = LabSpec::builder()
            .name("test-lab")
            .vm_type(VmType::Single)
            .vm_templates(vec![fixtures::template("ubuntu")])
            .participant_count(0)
            .build();

        let err = spec.validate().unwrap_err();
        assert!(matches!(
            err,
            LabError::Validation(ref errors) if errors.iter().any(|e| e.contains("participant_count"))
        ));
    }

    #[test]
    fn test_validate_rejects_excess_admins() {
        let spec = LabSpec::builder()
            .name("test-lab")
            .vm_type(VmType::Single)
            .vm_templates(vec![fixtures::template("ubuntu")])
            .participant_count(5)
            .admin_count(MAX_ADMIN_COUNT + 1)
            .build();

        let err = spec.validate().unwrap_err();
        assert!(matches!(
            err,
            LabError::Validation(ref errors) if errors.iter().any(|e| e.contains("admin_count"))
        ));
    }

    #[test]
    fn test_validate_rejects_template_count_mismatch() {
        // Single type with two templates
        let spec = LabSpec::builder()
            .name("test-lab")
            .vm_type(VmType::Single)
            .vm_templates(vec![fixtures::template("a"), fixtures::template("b")])
            .participant_count(5)
            .build();
        assert!(spec.validate().is_err());

        // Multi type with four templates
        let spec = LabSpec::builder()
            .name("test-lab")
            .vm_type(VmType::Multi)
            .vm_templates(vec![
                fixtures::template("a"),
                fixtures::template("b"),
                fixtures::template("c"),
                fixtures::template("d"),
            ])
            .participant_count(5)
            .build();
        assert!(spec.validate().is_err());

        // Multi type with no templates
        let spec = LabSpec::builder()
            .name("test-lab")
            .vm_type(VmType::Multi)
            .vm_templates(vec![])
            .participant_count(5)
            .build();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_date_range() {
        let from = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let spec = LabSpec::builder()
            .name("test-lab")
            .vm_type(VmType::Single)
            .vm_templates(vec![fixtures::template("ubuntu")])
            .participant_count(5)
            .date_range(DateRange::new(from, to))
            .build();

        let err = spec.validate().unwrap_err();
        assert!(matches!(
            err,
            LabError::Validation(ref errors) if errors.iter().any(|e| e.contains("date_range"))
        ));
    }

    #[test]
    fn test_validate_collects_every_violation() {
        let spec = LabSpec::builder()
            .name("")
            .vm_type(VmType::Single)
            .vm_templates(vec![])
            .participant_count(0)
            .admin_count(MAX_ADMIN_COUNT + 5)
            .build();

        match spec.validate().unwrap_err() {
            LabError::Validation(errors) => assert_eq!(errors.len(), 4),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
