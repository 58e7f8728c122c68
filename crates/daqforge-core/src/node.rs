//! Node model produced by topology assignment.
//!
//! All node types are constructed once by the distributor and never mutated
//! afterwards. Role classification happens *before* construction: a host
//! becomes a [`ReadoutUnitNode`] or [`BuilderUnitNode`] directly, there is no
//! re-tagging of an already-built generic node.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric identifier of a detector front-end data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FedId(pub u32);

impl fmt::Display for FedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for FedId {
    fn from(raw: u32) -> Self {
        FedId(raw)
    }
}

/// eFED crate position derived from a FED id offset.
///
/// The slice is the 8-id window the offset falls into (capped at 3); the slot
/// wraps inside the crate via a fixed windowing formula. See
/// `daqforge-topology` for the derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EfedPosition {
    /// Crate slice index, 0..=3.
    pub slice: u8,
    /// Slot number inside the crate.
    pub slot: u8,
}

/// One detector data stream within a front-end channel.
///
/// A slot is created during inventory parsing (or synthetically), consumed
/// exactly once by assignment, and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSlot {
    /// Slot index within the owning channel (0 or 1).
    pub index: u8,
    /// The detector front-end id feeding this slot, if populated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fed_id: Option<FedId>,
    /// eFED crate position for the FED, when derived from inventory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efed: Option<EfedPosition>,
}

impl StreamSlot {
    /// Create a populated slot.
    pub fn new(index: u8, fed_id: FedId) -> Self {
        Self {
            index,
            fed_id: Some(fed_id),
            efed: None,
        }
    }

    /// Create an empty slot (present in hardware, no FED attached).
    pub fn empty(index: u8) -> Self {
        Self {
            index,
            fed_id: None,
            efed: None,
        }
    }

    /// Attach an eFED position, consuming self.
    pub fn with_efed(mut self, efed: EfedPosition) -> Self {
        self.efed = Some(efed);
        self
    }
}

/// A front-end channel: one network link aggregating 1–2 detector streams
/// behind a front-end controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadoutChannel {
    /// Controller tag (hardware name or synthetic `channel-N`).
    pub controller: String,
    /// Host the controller PC is reachable on, when known from inventory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_host: Option<String>,
    /// Stream slots owned by this channel, in slot order (1 or 2 entries).
    pub slots: Vec<StreamSlot>,
}

impl ReadoutChannel {
    /// Create a channel from its slots.
    pub fn new(controller: impl Into<String>, slots: Vec<StreamSlot>) -> Self {
        Self {
            controller: controller.into(),
            controller_host: None,
            slots,
        }
    }

    /// Set the controller host, consuming self.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.controller_host = Some(host.into());
        self
    }

    /// FED ids present on this channel, in slot order.
    pub fn fed_ids(&self) -> impl Iterator<Item = FedId> + '_ {
        self.slots.iter().filter_map(|s| s.fed_id)
    }

    /// Whether the slot at `index` carries a FED id.
    pub fn has_stream(&self, index: u8) -> bool {
        self.slots
            .iter()
            .any(|s| s.index == index && s.fed_id.is_some())
    }

    /// Number of populated streams.
    pub fn stream_count(&self) -> usize {
        self.slots.iter().filter(|s| s.fed_id.is_some()).count()
    }
}

/// A readout unit: collects fragments from its assigned channels.
///
/// Indices are dense and 0-based across the final topology. In the `Evb`
/// builder flavor, index 0 is the event manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadoutUnitNode {
    /// Dense 0-based index.
    pub index: usize,
    /// Resolved hostname; `None` in synthetic mode until resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Channels owned by this unit, in assignment order.
    pub channels: Vec<ReadoutChannel>,
}

impl ReadoutUnitNode {
    /// Create a unit with no channels yet.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            hostname: None,
            channels: Vec::new(),
        }
    }

    /// Set the hostname, consuming self.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// All FED ids owned by this unit, in channel then slot order.
    pub fn fed_ids(&self) -> Vec<FedId> {
        self.channels.iter().flat_map(|c| c.fed_ids()).collect()
    }

    /// Number of populated streams across all channels.
    pub fn stream_count(&self) -> usize {
        self.channels.iter().map(|c| c.stream_count()).sum()
    }
}

/// A builder unit: assembles complete events from readout-unit fragments.
///
/// Builder units carry no FED ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderUnitNode {
    /// Dense 0-based index.
    pub index: usize,
    /// Resolved hostname; `None` in synthetic mode until resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl BuilderUnitNode {
    /// Create a builder unit.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            hostname: None,
        }
    }

    /// Set the hostname, consuming self.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }
}

/// Role families used for symbol-map keys and fragment selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleFamily {
    /// Event manager (distinguished readout unit or standalone context).
    EventManager,
    /// Readout unit.
    ReadoutUnit,
    /// Builder unit.
    BuilderUnit,
    /// Front-end controller.
    Controller,
}

impl RoleFamily {
    /// Symbol-map key prefix for this family.
    pub const fn key_prefix(&self) -> &'static str {
        match self {
            RoleFamily::EventManager => "EVM",
            RoleFamily::ReadoutUnit => "RU",
            RoleFamily::BuilderUnit => "BU",
            RoleFamily::Controller => "FEROL",
        }
    }

    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            RoleFamily::EventManager => "event manager",
            RoleFamily::ReadoutUnit => "readout unit",
            RoleFamily::BuilderUnit => "builder unit",
            RoleFamily::Controller => "front-end controller",
        }
    }
}

impl fmt::Display for RoleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fed_id_display_is_bare_number() {
        assert_eq!(FedId(1204).to_string(), "1204");
    }

    #[test]
    fn channel_fed_ids_skip_empty_slots() {
        let channel = ReadoutChannel::new(
            "frl-c1-01",
            vec![StreamSlot::new(0, FedId(1000)), StreamSlot::empty(1)],
        );
        let ids: Vec<_> = channel.fed_ids().collect();
        assert_eq!(ids, vec![FedId(1000)]);
        assert_eq!(channel.stream_count(), 1);
    }

    #[test]
    fn channel_has_stream_checks_slot_index() {
        let channel = ReadoutChannel::new(
            "frl-c1-02",
            vec![StreamSlot::empty(0), StreamSlot::new(1, FedId(1001))],
        );
        assert!(!channel.has_stream(0));
        assert!(channel.has_stream(1));
    }

    #[test]
    fn readout_unit_collects_fed_ids_in_order() {
        let mut unit = ReadoutUnitNode::new(0).with_hostname("ru-c2e12-01");
        unit.channels.push(ReadoutChannel::new(
            "frl-a",
            vec![StreamSlot::new(0, FedId(1000)), StreamSlot::new(1, FedId(1001))],
        ));
        unit.channels.push(ReadoutChannel::new(
            "frl-b",
            vec![StreamSlot::new(0, FedId(1002))],
        ));

        assert_eq!(unit.fed_ids(), vec![FedId(1000), FedId(1001), FedId(1002)]);
        assert_eq!(unit.stream_count(), 3);
        assert_eq!(unit.hostname.as_deref(), Some("ru-c2e12-01"));
    }

    #[test]
    fn role_family_prefixes() {
        assert_eq!(RoleFamily::EventManager.key_prefix(), "EVM");
        assert_eq!(RoleFamily::ReadoutUnit.key_prefix(), "RU");
        assert_eq!(RoleFamily::BuilderUnit.key_prefix(), "BU");
        assert_eq!(RoleFamily::Controller.key_prefix(), "FEROL");
    }

    #[test]
    fn node_serde_roundtrip() {
        let unit = ReadoutUnitNode {
            index: 2,
            hostname: Some("ru-c2e13-11".to_string()),
            channels: vec![ReadoutChannel::new(
                "frl-c2-05",
                vec![StreamSlot::new(0, FedId(1010)).with_efed(EfedPosition { slice: 1, slot: 6 })],
            )],
        };

        let text = toml::to_string(&unit).unwrap();
        let parsed: ReadoutUnitNode = toml::from_str(&text).unwrap();
        assert_eq!(parsed, unit);
    }
}
