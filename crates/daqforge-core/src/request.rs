//! Topology request: the immutable description of the rig a caller wants.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::FedId;
use crate::sizing::SizingOverrides;

/// Default base for synthetically allocated FED ids.
pub const DEFAULT_FED_ID_BASE: u32 = 1000;

/// Default desired in-flight message size in bytes.
pub const DEFAULT_MAX_MESSAGE_BYTES: u64 = 65_536;

/// Event-builder flavor.
///
/// The two flavors are mutually exclusive and select both the fragment set
/// and the event-manager placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuilderFlavor {
    /// Folded event builder: readout unit 0 doubles as the event manager.
    #[default]
    Evb,
    /// Generic event builder: a standalone event-manager context exists
    /// beside the readout units.
    Gevb,
}

impl BuilderFlavor {
    /// Fragment-key token for this flavor.
    pub const fn token(&self) -> &'static str {
        match self {
            BuilderFlavor::Evb => "evb",
            BuilderFlavor::Gevb => "gevb",
        }
    }
}

/// Peer transport used between readout and builder units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PeerTransport {
    /// InfiniBand verbs.
    #[default]
    Ibv,
    /// Userspace TCP.
    Utcp,
}

impl PeerTransport {
    /// Fragment-key token for this transport.
    pub const fn token(&self) -> &'static str {
        match self {
            PeerTransport::Ibv => "ibv",
            PeerTransport::Utcp => "utcp",
        }
    }

    /// Class tag of the peer-transport application in synthesized documents.
    pub const fn application_class(&self) -> &'static str {
        match self {
            PeerTransport::Ibv => "pt::ibv::Application",
            PeerTransport::Utcp => "pt::utcp::Application",
        }
    }
}

/// Trigger source driving the front-end controllers.
///
/// The four modes are mutually exclusive; the synthesizer validates fragment
/// trigger-mode properties against this enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// Controller-internal event generator.
    #[default]
    Internal,
    /// Real front-end link provides the trigger.
    FedLink,
    /// eFED emulator crate.
    EfedEmulator,
    /// External gate signal.
    ExternalGate,
}

impl TriggerSource {
    /// Property value written into controller fragments.
    pub const fn mode_name(&self) -> &'static str {
        match self {
            TriggerSource::Internal => "INTERNAL_GENERATOR",
            TriggerSource::FedLink => "FED_LINK",
            TriggerSource::EfedEmulator => "EFED_EMULATOR",
            TriggerSource::ExternalGate => "EXTERNAL_GATE",
        }
    }

    /// Parse a trigger-mode property value.
    pub fn from_mode_name(name: &str) -> Option<Self> {
        match name {
            "INTERNAL_GENERATOR" => Some(TriggerSource::Internal),
            "FED_LINK" => Some(TriggerSource::FedLink),
            "EFED_EMULATOR" => Some(TriggerSource::EfedEmulator),
            "EXTERNAL_GATE" => Some(TriggerSource::ExternalGate),
            _ => None,
        }
    }
}

/// Which stream slots a channel must populate to be included in
/// inventory-driven assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StreamRequirement {
    /// The first slot must carry a FED id.
    First,
    /// The second slot must carry a FED id.
    Second,
    /// Any populated slot qualifies the channel.
    #[default]
    Any,
}

/// What to do with a trailing partial bunch in synthetic bunching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PartialBunchPolicy {
    /// Return the remainder channels as unassigned (never silent).
    #[default]
    Report,
    /// Append the remainder to the last readout unit.
    Absorb,
}

/// What to do when inventory-driven assignment runs out of readout units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    /// Return the remaining channels as unassigned with a diagnostic.
    #[default]
    Report,
    /// Abort the run.
    Fail,
}

/// Errors raised by [`TopologyRequest::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Streams per channel must be 1 or 2.
    #[error("streams per channel must be 1 or 2, got {0}")]
    BadStreamsPerChannel(u8),

    /// Stream and channel counts disagree.
    #[error("stream count {streams} != channel count {channels} x streams per channel {per_channel}")]
    StreamCountMismatch {
        /// Requested stream count.
        streams: usize,
        /// Requested channel count.
        channels: usize,
        /// Requested streams per channel.
        per_channel: u8,
    },

    /// A count that must be at least 1 was zero.
    #[error("{0} count must be at least 1")]
    ZeroCount(&'static str),
}

/// Immutable value object describing the desired logical topology.
///
/// Constructed once from caller input (builder methods or a TOML request
/// file), validated with [`validate`](Self::validate), never mutated by the
/// pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopologyRequest {
    /// Total number of detector data streams.
    pub stream_count: usize,
    /// Number of front-end channels.
    pub channel_count: usize,
    /// Streams aggregated per channel (1 or 2).
    #[serde(default = "default_streams_per_channel")]
    pub streams_per_channel: u8,
    /// Number of readout units.
    pub readout_unit_count: usize,
    /// Number of builder units.
    pub builder_unit_count: usize,
    /// Event-builder flavor.
    #[serde(default)]
    pub flavor: BuilderFlavor,
    /// Peer transport between units.
    #[serde(default)]
    pub transport: PeerTransport,
    /// Trigger source for controllers.
    #[serde(default)]
    pub trigger: TriggerSource,
    /// Base value for synthetically allocated FED ids.
    #[serde(default = "default_fed_id_base")]
    pub fed_id_base: u32,
    /// FED ids excluded from assignment.
    #[serde(default)]
    pub masked_feds: Vec<FedId>,
    /// Slot-population requirement for inventory-driven channel discovery.
    #[serde(default)]
    pub stream_requirement: StreamRequirement,
    /// Trailing-bunch handling in synthetic mode.
    #[serde(default)]
    pub partial_bunch_policy: PartialBunchPolicy,
    /// Readout-unit exhaustion handling in inventory mode.
    #[serde(default)]
    pub shortfall_policy: ShortfallPolicy,
    /// Desired in-flight message size, drives resource sizing.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: u64,
    /// Per-role sizing overrides: readout unit.
    #[serde(default)]
    pub readout_unit_sizing: SizingOverrides,
    /// Per-role sizing overrides: builder unit.
    #[serde(default)]
    pub builder_unit_sizing: SizingOverrides,
    /// Per-role sizing overrides: event manager.
    #[serde(default)]
    pub event_manager_sizing: SizingOverrides,
}

fn default_streams_per_channel() -> u8 {
    1
}

fn default_fed_id_base() -> u32 {
    DEFAULT_FED_ID_BASE
}

fn default_max_message_bytes() -> u64 {
    DEFAULT_MAX_MESSAGE_BYTES
}

impl TopologyRequest {
    /// Create a request with the four mandatory counts and defaults for
    /// everything else.
    pub fn new(
        stream_count: usize,
        channel_count: usize,
        readout_unit_count: usize,
        builder_unit_count: usize,
    ) -> Self {
        Self {
            stream_count,
            channel_count,
            streams_per_channel: default_streams_per_channel(),
            readout_unit_count,
            builder_unit_count,
            flavor: BuilderFlavor::default(),
            transport: PeerTransport::default(),
            trigger: TriggerSource::default(),
            fed_id_base: DEFAULT_FED_ID_BASE,
            masked_feds: Vec::new(),
            stream_requirement: StreamRequirement::default(),
            partial_bunch_policy: PartialBunchPolicy::default(),
            shortfall_policy: ShortfallPolicy::default(),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            readout_unit_sizing: SizingOverrides::default(),
            builder_unit_sizing: SizingOverrides::default(),
            event_manager_sizing: SizingOverrides::default(),
        }
    }

    /// Set streams per channel (1 or 2).
    pub fn with_streams_per_channel(mut self, streams: u8) -> Self {
        self.streams_per_channel = streams;
        self
    }

    /// Set the builder flavor.
    pub fn with_flavor(mut self, flavor: BuilderFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Set the peer transport.
    pub fn with_transport(mut self, transport: PeerTransport) -> Self {
        self.transport = transport;
        self
    }

    /// Set the trigger source.
    pub fn with_trigger(mut self, trigger: TriggerSource) -> Self {
        self.trigger = trigger;
        self
    }

    /// Set the synthetic FED id base.
    pub fn with_fed_id_base(mut self, base: u32) -> Self {
        self.fed_id_base = base;
        self
    }

    /// Mask FED ids out of assignment.
    pub fn with_masked_feds(mut self, feds: impl IntoIterator<Item = FedId>) -> Self {
        self.masked_feds.extend(feds);
        self
    }

    /// Set the partial-bunch policy.
    pub fn with_partial_bunch_policy(mut self, policy: PartialBunchPolicy) -> Self {
        self.partial_bunch_policy = policy;
        self
    }

    /// Set the shortfall policy.
    pub fn with_shortfall_policy(mut self, policy: ShortfallPolicy) -> Self {
        self.shortfall_policy = policy;
        self
    }

    /// Set the desired in-flight message size.
    pub fn with_max_message_bytes(mut self, bytes: u64) -> Self {
        self.max_message_bytes = bytes;
        self
    }

    /// Load a request from a TOML string.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), RequestError> {
        if !matches!(self.streams_per_channel, 1 | 2) {
            return Err(RequestError::BadStreamsPerChannel(self.streams_per_channel));
        }
        if self.channel_count == 0 {
            return Err(RequestError::ZeroCount("channel"));
        }
        if self.readout_unit_count == 0 {
            return Err(RequestError::ZeroCount("readout unit"));
        }
        if self.builder_unit_count == 0 {
            return Err(RequestError::ZeroCount("builder unit"));
        }
        let expected = self.channel_count * usize::from(self.streams_per_channel);
        if self.stream_count != expected {
            return Err(RequestError::StreamCountMismatch {
                streams: self.stream_count,
                channels: self.channel_count,
                per_channel: self.streams_per_channel,
            });
        }
        Ok(())
    }

    /// Channels per readout unit under contiguous bunching (truncating).
    pub fn channels_per_readout_unit(&self) -> usize {
        self.channel_count / self.readout_unit_count
    }

    /// Streams per readout unit, the key into the TCP congestion-window
    /// table.
    pub fn streams_per_readout_unit(&self) -> usize {
        self.channels_per_readout_unit() * usize::from(self.streams_per_channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_has_defaults() {
        let request = TopologyRequest::new(4, 4, 2, 2);
        assert_eq!(request.streams_per_channel, 1);
        assert_eq!(request.fed_id_base, DEFAULT_FED_ID_BASE);
        assert_eq!(request.flavor, BuilderFlavor::Evb);
        assert_eq!(request.transport, PeerTransport::Ibv);
        assert_eq!(request.partial_bunch_policy, PartialBunchPolicy::Report);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_streams_per_channel() {
        let request = TopologyRequest::new(12, 4, 2, 2).with_streams_per_channel(3);
        assert_eq!(
            request.validate(),
            Err(RequestError::BadStreamsPerChannel(3))
        );
    }

    #[test]
    fn validate_rejects_stream_count_mismatch() {
        let request = TopologyRequest::new(10, 4, 2, 2).with_streams_per_channel(2);
        assert!(matches!(
            request.validate(),
            Err(RequestError::StreamCountMismatch { streams: 10, channels: 4, per_channel: 2 })
        ));
    }

    #[test]
    fn validate_rejects_zero_counts() {
        assert_eq!(
            TopologyRequest::new(0, 0, 1, 1).validate(),
            Err(RequestError::ZeroCount("channel"))
        );
        assert_eq!(
            TopologyRequest::new(4, 4, 0, 1).validate(),
            Err(RequestError::ZeroCount("readout unit"))
        );
        assert_eq!(
            TopologyRequest::new(4, 4, 1, 0).validate(),
            Err(RequestError::ZeroCount("builder unit"))
        );
    }

    #[test]
    fn streams_per_readout_unit_uses_truncating_division() {
        let request = TopologyRequest::new(18, 9, 2, 2).with_streams_per_channel(2);
        // 9 channels / 2 units = 4 channels each, times 2 streams.
        assert_eq!(request.channels_per_readout_unit(), 4);
        assert_eq!(request.streams_per_readout_unit(), 8);
    }

    #[test]
    fn trigger_mode_names_roundtrip() {
        for trigger in [
            TriggerSource::Internal,
            TriggerSource::FedLink,
            TriggerSource::EfedEmulator,
            TriggerSource::ExternalGate,
        ] {
            assert_eq!(TriggerSource::from_mode_name(trigger.mode_name()), Some(trigger));
        }
        assert_eq!(TriggerSource::from_mode_name("RANDOM_MODE"), None);
    }

    #[test]
    fn request_loads_from_toml() {
        let text = r#"
stream_count = 16
channel_count = 8
streams_per_channel = 2
readout_unit_count = 1
builder_unit_count = 4
flavor = "evb"
transport = "ibv"
trigger = "internal"
"#;
        let request = TopologyRequest::from_toml(text).unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.streams_per_readout_unit(), 16);
    }

    #[test]
    fn request_toml_rejects_unknown_fields() {
        let text = r#"
stream_count = 4
channel_count = 4
readout_unit_count = 1
builder_unit_count = 1
frobnicate = true
"#;
        assert!(TopologyRequest::from_toml(text).is_err());
    }
}
