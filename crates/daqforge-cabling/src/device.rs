//! Device model and hostname-prefix role classification.
//!
//! Roles are decided *before* a device is constructed: classification runs
//! on the raw name, then the matching [`Device`] variant is built directly.

use daqforge_core::StreamSlot;
use serde::Serialize;

/// Hostname prefix identifying a readout host.
pub const READOUT_HOST_PREFIX: &str = "ru-";

/// Hostname prefix identifying a builder host.
pub const BUILDER_HOST_PREFIX: &str = "bu-";

/// Hostname prefix identifying an event-manager host.
pub const EVENT_MANAGER_HOST_PREFIX: &str = "evm-";

/// Name prefixes identifying a front-end controller record.
pub const CONTROLLER_PREFIXES: &[&str] = &["frl-", "ferol-"];

/// Role a hostname classifies into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostRole {
    /// Readout host (`ru-*`).
    Readout,
    /// Builder host (`bu-*`).
    Builder,
    /// Event-manager host (`evm-*`).
    EventManager,
    /// Front-end controller (`frl-*` / `ferol-*`).
    Controller,
    /// No recognized prefix.
    Unknown,
}

/// Classify a device name by its prefix.
pub fn classify_host(name: &str) -> HostRole {
    if name.starts_with(READOUT_HOST_PREFIX) {
        HostRole::Readout
    } else if name.starts_with(BUILDER_HOST_PREFIX) {
        HostRole::Builder
    } else if name.starts_with(EVENT_MANAGER_HOST_PREFIX) {
        HostRole::EventManager
    } else if CONTROLLER_PREFIXES.iter().any(|p| name.starts_with(p)) {
        HostRole::Controller
    } else {
        HostRole::Unknown
    }
}

/// A device attached to the front-end fabric.
///
/// Immutable once parsed. `Unknown` devices are reported as diagnostics, not
/// fatal errors; they stay in the adjacency so `inspect` can show them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Device {
    /// Front-end controller aggregating 1–2 detector streams.
    FrontEndController {
        /// Controller tag (e.g. `frl-c1-05`).
        tag: String,
        /// Hardware crate number.
        crate_no: u32,
        /// Slot inside the crate.
        slot: u32,
        /// Stream slots, in slot order.
        slots: Vec<StreamSlot>,
        /// Controller PC hostname.
        host: String,
    },
    /// Readout host.
    ReadoutHost {
        /// Hostname.
        hostname: String,
    },
    /// Builder host.
    BuilderHost {
        /// Hostname.
        hostname: String,
    },
    /// Device with no recognized role; kept for inspection.
    Unknown {
        /// Raw name.
        name: String,
    },
}

impl Device {
    /// The device's primary name (tag or hostname).
    pub fn name(&self) -> &str {
        match self {
            Device::FrontEndController { tag, .. } => tag,
            Device::ReadoutHost { hostname } | Device::BuilderHost { hostname } => hostname,
            Device::Unknown { name } => name,
        }
    }

    /// Whether this is a front-end controller.
    pub fn is_controller(&self) -> bool {
        matches!(self, Device::FrontEndController { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_classify_roles() {
        assert_eq!(classify_host("ru-c2e12-11"), HostRole::Readout);
        assert_eq!(classify_host("bu-c2e18-01"), HostRole::Builder);
        assert_eq!(classify_host("evm-c2e12-40"), HostRole::EventManager);
        assert_eq!(classify_host("frl-c1-05"), HostRole::Controller);
        assert_eq!(classify_host("ferol-c1-05"), HostRole::Controller);
        assert_eq!(classify_host("dns-server"), HostRole::Unknown);
    }

    #[test]
    fn classification_is_prefix_anchored() {
        // The prefix must be at the start, not anywhere in the name.
        assert_eq!(classify_host("backup-ru-01"), HostRole::Unknown);
    }

    #[test]
    fn device_name_covers_all_variants() {
        let controller = Device::FrontEndController {
            tag: "frl-c1-05".to_string(),
            crate_no: 1,
            slot: 5,
            slots: Vec::new(),
            host: "frlpc-c1-05".to_string(),
        };
        assert_eq!(controller.name(), "frl-c1-05");
        assert!(controller.is_controller());

        let host = Device::ReadoutHost {
            hostname: "ru-c2e12-11".to_string(),
        };
        assert_eq!(host.name(), "ru-c2e12-11");
        assert!(!host.is_controller());
    }
}
