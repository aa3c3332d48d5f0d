//! The cloud provider seam and its simulated default implementation.

use std::time::Duration;

use async_trait::async_trait;
use getset::CopyGetters;
use rand::Rng;
use tokio::time;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::{
    config::{DEFAULT_CLONE_DELAY, DEFAULT_TRAINER_DELAY},
    LabResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The seam between the orchestrator and whatever brings VMs up.
///
/// The default implementation simulates cloud latency; a real provider would
/// call out to an infrastructure API behind the same contract.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Brings up the trainer VM for a lab configuration and returns its
    /// address.
    async fn bring_up_trainer(&self, lab_id: Uuid) -> LabResult<String>;

    /// Clones `count` fleet instances from the configured trainer VM and
    /// returns their addresses, sequential within the trainer's subnet.
    async fn clone_fleet(&self, lab_id: Uuid, trainer_ip: &str, count: u32)
        -> LabResult<Vec<String>>;
}

/// A provider that fakes cloud behavior with bounded delays and synthesized
/// addresses.
#[derive(Debug, Clone, TypedBuilder, CopyGetters)]
#[getset(get_copy = "pub with_prefix")]
pub struct SimulatedCloud {
    /// The simulated latency of a trainer VM bring-up.
    #[builder(default = DEFAULT_TRAINER_DELAY)]
    trainer_delay: Duration,

    /// The simulated latency of a fleet clone.
    #[builder(default = DEFAULT_CLONE_DELAY)]
    clone_delay: Duration,
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for SimulatedCloud {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[async_trait]
impl CloudProvider for SimulatedCloud {
    async fn bring_up_trainer(&self, _lab_id: Uuid) -> LabResult<String> {
        time::sleep(self.trainer_delay).await;

        // One /24-ish subnet per trainer; fleet addresses are carved out of it.
        let (second, third) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(1..=200u8), rng.gen_range(1..=200u8))
        };
        Ok(format!("10.{}.{}.2", second, third))
    }

    async fn clone_fleet(
        &self,
        _lab_id: Uuid,
        trainer_ip: &str,
        count: u32,
    ) -> LabResult<Vec<String>> {
        time::sleep(self.clone_delay).await;

        let (second, third) = parse_subnet(trainer_ip);
        let ips = (0..count)
            .map(|index| {
                // Hosts start at .10 and spill into the next octet when full.
                let offset = 10 + index;
                format!(
                    "10.{}.{}.{}",
                    second,
                    (third as u32 + offset / 240) % 255,
                    (offset % 240) + 2
                )
            })
            .collect();

        Ok(ips)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Extracts the second and third octets of a synthesized trainer address,
/// falling back to a fixed subnet for unparseable input.
fn parse_subnet(trainer_ip: &str) -> (u8, u8) {
    let mut octets = trainer_ip.split('.').skip(1);
    let second = octets.next().and_then(|o| o.parse().ok()).unwrap_or(0);
    let third = octets.next().and_then(|o| o.parse().ok()).unwrap_or(0);
    (second, third)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_fleet_shares_trainer_subnet() {
        let cloud = SimulatedCloud::builder()
            .trainer_delay(Duration::from_millis(1))
            .clone_delay(Duration::from_millis(1))
            .build();

        let lab_id = Uuid::new_v4();
        let trainer_ip = cloud.bring_up_trainer(lab_id).await.unwrap();
        let fleet = cloud.clone_fleet(lab_id, &trainer_ip, 5).await.unwrap();

        assert_eq!(fleet.len(), 5);
        let subnet = trainer_ip.rsplit_once('.').unwrap().0;
        for ip in &fleet {
            assert!(ip.starts_with(&format!("{}.", subnet)), "unexpected ip {}", ip);
        }
    }

    #[tokio::test]
    async fn test_simulated_fleet_addresses_are_distinct() {
        let cloud = SimulatedCloud::builder()
            .trainer_delay(Duration::from_millis(1))
            .clone_delay(Duration::from_millis(1))
            .build();

        let fleet = cloud
            .clone_fleet(Uuid::new_v4(), "10.20.30.2", 100)
            .await
            .unwrap();

        let mut unique = fleet.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), fleet.len());
    }
}
