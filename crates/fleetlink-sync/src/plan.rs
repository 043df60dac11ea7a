//! Corrective-action planning.
//!
//! Turns a batch of classified devices into an ordered list of twin
//! operations. Ordering is deterministic so that retries and tests see
//! identical traces: prune deletes first (a pruned id must never race a
//! provisioning create for a duplicate twin), then status updates, then
//! provisioning creates, each group in lexicographic device-id order.

use serde::{Deserialize, Serialize};
use std::fmt;

use fleetlink_connector::{DeviceId, TwinStatus};

use crate::classify::DeviceClass;

/// A corrective twin operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "status")]
pub enum Action {
    /// Delete the twin at the hub.
    Delete,
    /// Create the twin with the given status.
    Create(TwinStatus),
    /// Set the status of the existing twin.
    Update(TwinStatus),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Delete => write!(f, "delete"),
            Action::Create(status) => write!(f, "create:{status}"),
            Action::Update(status) => write!(f, "update:{status}"),
        }
    }
}

/// An action bound to the device it corrects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub device_id: DeviceId,
    pub class: DeviceClass,
    pub action: Action,
}

/// The corrective action for a device class, `None` when consistent.
#[must_use]
pub fn action_for(class: DeviceClass) -> Option<Action> {
    match class {
        DeviceClass::ConsistentEnabled | DeviceClass::ConsistentDisabled => None,
        DeviceClass::NeedsEnable => Some(Action::Update(TwinStatus::Enabled)),
        DeviceClass::NeedsDisable => Some(Action::Update(TwinStatus::Disabled)),
        DeviceClass::NeedsProvision => Some(Action::Create(TwinStatus::Enabled)),
        DeviceClass::PruneCandidate => Some(Action::Delete),
    }
}

/// Plan the corrective actions for one classified batch.
pub fn plan_batch(classified: &[(DeviceId, DeviceClass)]) -> Vec<PlannedAction> {
    let mut prunes = Vec::new();
    let mut updates = Vec::new();
    let mut provisions = Vec::new();

    for (device_id, class) in classified {
        let Some(action) = action_for(*class) else {
            continue;
        };
        let planned = PlannedAction {
            device_id: device_id.clone(),
            class: *class,
            action,
        };
        match action {
            Action::Delete => prunes.push(planned),
            Action::Update(_) => updates.push(planned),
            Action::Create(_) => provisions.push(planned),
        }
    }

    for group in [&mut prunes, &mut updates, &mut provisions] {
        group.sort_by(|a, b| a.device_id.cmp(&b.device_id));
    }

    let mut actions = prunes;
    actions.append(&mut updates);
    actions.append(&mut provisions);
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(id: &str) -> DeviceId {
        DeviceId::from(id)
    }

    #[test]
    fn test_consistent_devices_need_no_action() {
        assert_eq!(action_for(DeviceClass::ConsistentEnabled), None);
        assert_eq!(action_for(DeviceClass::ConsistentDisabled), None);
    }

    #[test]
    fn test_action_mapping() {
        assert_eq!(
            action_for(DeviceClass::NeedsEnable),
            Some(Action::Update(TwinStatus::Enabled))
        );
        assert_eq!(
            action_for(DeviceClass::NeedsDisable),
            Some(Action::Update(TwinStatus::Disabled))
        );
        assert_eq!(
            action_for(DeviceClass::NeedsProvision),
            Some(Action::Create(TwinStatus::Enabled))
        );
        assert_eq!(action_for(DeviceClass::PruneCandidate), Some(Action::Delete));
    }

    #[test]
    fn test_plan_orders_prunes_before_provisions() {
        let classified = vec![
            (dev("c"), DeviceClass::NeedsProvision),
            (dev("a"), DeviceClass::PruneCandidate),
            (dev("b"), DeviceClass::ConsistentEnabled),
        ];
        let plan = plan_batch(&classified);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].action, Action::Delete);
        assert_eq!(plan[0].device_id, dev("a"));
        assert_eq!(plan[1].action, Action::Create(TwinStatus::Enabled));
        assert_eq!(plan[1].device_id, dev("c"));
    }

    #[test]
    fn test_plan_updates_in_lexicographic_order() {
        let classified = vec![
            (dev("z"), DeviceClass::NeedsDisable),
            (dev("m"), DeviceClass::NeedsEnable),
            (dev("a"), DeviceClass::NeedsDisable),
        ];
        let plan = plan_batch(&classified);
        let order: Vec<&str> = plan.iter().map(|p| p.device_id.as_str()).collect();
        assert_eq!(order, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_plan_group_order_is_deterministic() {
        let classified = vec![
            (dev("9"), DeviceClass::NeedsProvision),
            (dev("8"), DeviceClass::NeedsEnable),
            (dev("7"), DeviceClass::PruneCandidate),
            (dev("1"), DeviceClass::PruneCandidate),
        ];
        let plan = plan_batch(&classified);
        let order: Vec<String> = plan
            .iter()
            .map(|p| format!("{}:{}", p.action, p.device_id))
            .collect();
        assert_eq!(
            order,
            vec!["delete:1", "delete:7", "update:enabled:8", "create:enabled:9"]
        );
    }
}
