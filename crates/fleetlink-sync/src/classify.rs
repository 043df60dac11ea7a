//! Per-device consistency classification.
//!
//! A device's class is a pure function of its acceptance status at the
//! device-authentication service and its twin status at the hub, both
//! fetched in the same run. Classes map one-to-one onto corrective
//! actions (see [`crate::plan`]).

use serde::{Deserialize, Serialize};
use std::fmt;

use fleetlink_connector::TwinStatus;
use fleetlink_devauth::AuthStatus;

/// Consistency state of one device across the three stores.
///
/// Adding a state is a compile-time-checked change: every `match` over
/// this enum is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceClass {
    /// Accepted and enabled at the hub. No action.
    ConsistentEnabled,
    /// Not accepted and disabled (or absent) at the hub. No action.
    ConsistentDisabled,
    /// Accepted but disabled at the hub. Action: enable the twin.
    NeedsEnable,
    /// Not accepted but enabled at the hub. Action: disable the twin.
    NeedsDisable,
    /// Accepted with no twin at the hub. Action: create the twin enabled.
    NeedsProvision,
    /// Known locally but absent from the device-authentication service.
    /// Action: delete the twin.
    PruneCandidate,
}

impl DeviceClass {
    /// Whether the device needs no corrective action.
    ///
    /// A [`DeviceClass::PruneCandidate`] is never consistent: the prune
    /// delete is issued unconditionally and relies on delete idempotence,
    /// keeping the action trace identical regardless of whether the twin
    /// was observed in this run.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        matches!(
            self,
            DeviceClass::ConsistentEnabled | DeviceClass::ConsistentDisabled
        )
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceClass::ConsistentEnabled => "consistent-enabled",
            DeviceClass::ConsistentDisabled => "consistent-disabled",
            DeviceClass::NeedsEnable => "needs-enable",
            DeviceClass::NeedsDisable => "needs-disable",
            DeviceClass::NeedsProvision => "needs-provision",
            DeviceClass::PruneCandidate => "prune-candidate",
        };
        f.write_str(s)
    }
}

/// Classify one device from its two remote statuses.
///
/// `auth` is `None` when the device-authentication service did not return
/// the device at all: the device is unknown there and its hub twin is
/// pruned. A device *returned* with a non-accepted status is still a known
/// device and converges to disabled instead.
///
/// `twin` is `None` when the hub holds no twin for the device.
///
/// Total over all combinations.
#[must_use]
pub fn classify(auth: Option<AuthStatus>, twin: Option<TwinStatus>) -> DeviceClass {
    match (auth, twin) {
        (None, _) => DeviceClass::PruneCandidate,
        (Some(AuthStatus::Accepted), Some(TwinStatus::Enabled)) => DeviceClass::ConsistentEnabled,
        (Some(AuthStatus::Accepted), Some(TwinStatus::Disabled)) => DeviceClass::NeedsEnable,
        (Some(AuthStatus::Accepted), None) => DeviceClass::NeedsProvision,
        // Rejected and unauthenticated devices must not be usable at the
        // hub; an absent twin is already converged.
        (Some(AuthStatus::Rejected | AuthStatus::NoAuth), Some(TwinStatus::Enabled)) => {
            DeviceClass::NeedsDisable
        }
        (Some(AuthStatus::Rejected | AuthStatus::NoAuth), Some(TwinStatus::Disabled) | None) => {
            DeviceClass::ConsistentDisabled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_is_total() {
        // Every combination of the two fetched statuses maps to exactly
        // one class.
        let auths = [
            None,
            Some(AuthStatus::Accepted),
            Some(AuthStatus::Rejected),
            Some(AuthStatus::NoAuth),
        ];
        let twins = [Some(TwinStatus::Enabled), Some(TwinStatus::Disabled), None];
        let mut seen = 0;
        for auth in auths {
            for twin in twins {
                let _ = classify(auth, twin);
                seen += 1;
            }
        }
        assert_eq!(seen, 12);
    }

    #[test]
    fn test_accepted_devices() {
        use DeviceClass::*;

        assert_eq!(
            classify(Some(AuthStatus::Accepted), Some(TwinStatus::Enabled)),
            ConsistentEnabled
        );
        assert_eq!(
            classify(Some(AuthStatus::Accepted), Some(TwinStatus::Disabled)),
            NeedsEnable
        );
        assert_eq!(classify(Some(AuthStatus::Accepted), None), NeedsProvision);
    }

    #[test]
    fn test_rejected_devices() {
        use DeviceClass::*;

        assert_eq!(
            classify(Some(AuthStatus::Rejected), Some(TwinStatus::Enabled)),
            NeedsDisable
        );
        assert_eq!(
            classify(Some(AuthStatus::Rejected), Some(TwinStatus::Disabled)),
            ConsistentDisabled
        );
        assert_eq!(classify(Some(AuthStatus::Rejected), None), ConsistentDisabled);
    }

    #[test]
    fn test_unauthenticated_devices_converge_to_disabled() {
        use DeviceClass::*;

        // A device the service knows but cannot authenticate keeps its
        // (disabled) twin; it is not pruned.
        assert_eq!(
            classify(Some(AuthStatus::NoAuth), Some(TwinStatus::Enabled)),
            NeedsDisable
        );
        assert_eq!(
            classify(Some(AuthStatus::NoAuth), Some(TwinStatus::Disabled)),
            ConsistentDisabled
        );
        assert_eq!(classify(Some(AuthStatus::NoAuth), None), ConsistentDisabled);
    }

    #[test]
    fn test_unknown_devices_are_pruned() {
        use DeviceClass::*;

        assert_eq!(classify(None, Some(TwinStatus::Enabled)), PruneCandidate);
        assert_eq!(classify(None, Some(TwinStatus::Disabled)), PruneCandidate);
        assert_eq!(classify(None, None), PruneCandidate);
    }

    #[test]
    fn test_consistency_predicate() {
        assert!(DeviceClass::ConsistentEnabled.is_consistent());
        assert!(DeviceClass::ConsistentDisabled.is_consistent());
        assert!(!DeviceClass::NeedsEnable.is_consistent());
        assert!(!DeviceClass::NeedsDisable.is_consistent());
        assert!(!DeviceClass::NeedsProvision.is_consistent());
        assert!(!DeviceClass::PruneCandidate.is_consistent());
    }
}
