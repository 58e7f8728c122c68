//! RDMA buffer-pool and queue-depth sizing.
//!
//! Pure arithmetic, no I/O: given a role, the desired in-flight message size
//! and the role's fan-in factor, derive the send/receive pool sizes and
//! queue depths the peer-transport application needs. Every derived field
//! must come out a positive integer; anything else is a [`SizingError`] and
//! no partial profile is returned.
//!
//! Default formulas (each field overridable via [`SizingOverrides`]):
//!
//! ```text
//! send_pool = (send_queue_depth / 16) * max_message_bytes * fan_in
//! recv_pool = (recv_queue_depth + max_resources) * fan_in * max_message_bytes
//! cq_depth  = recv_queue_depth * fan_in
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::TopologyRequest;

/// Default `max_resources` term in the receive-pool formula.
pub const DEFAULT_MAX_RESOURCES: u32 = 16;

/// Role a resource profile is derived for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingRole {
    /// Event manager.
    EventManager,
    /// Readout unit.
    ReadoutUnit,
    /// Builder unit.
    BuilderUnit,
}

impl SizingRole {
    /// Human-readable role name, used in error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            SizingRole::EventManager => "event manager",
            SizingRole::ReadoutUnit => "readout unit",
            SizingRole::BuilderUnit => "builder unit",
        }
    }

    /// Role-specific default (send, receive) queue depths.
    ///
    /// Readout units fan out to every builder unit, so they carry a deep
    /// send queue; builder units are the mirror image.
    pub const fn default_queue_depths(&self) -> (u32, u32) {
        match self {
            SizingRole::EventManager => (256, 256),
            SizingRole::ReadoutUnit => (1024, 64),
            SizingRole::BuilderUnit => (64, 1024),
        }
    }
}

/// Field-by-field overrides for the sizing formulas.
///
/// `None` means "use the derived value". Overrides short-circuit the formula
/// for that field only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizingOverrides {
    /// Override the send-pool size in bytes.
    #[serde(default)]
    pub send_pool_bytes: Option<u64>,
    /// Override the receive-pool size in bytes.
    #[serde(default)]
    pub recv_pool_bytes: Option<u64>,
    /// Override the completion-queue depth.
    #[serde(default)]
    pub completion_queue_depth: Option<u32>,
    /// Override the send-queue depth.
    #[serde(default)]
    pub send_queue_depth: Option<u32>,
    /// Override the receive-queue depth.
    #[serde(default)]
    pub recv_queue_depth: Option<u32>,
    /// Override the `max_resources` term of the receive-pool formula.
    #[serde(default)]
    pub max_resources: Option<u32>,
}

impl SizingOverrides {
    /// Override the send-queue depth.
    pub fn with_send_queue_depth(mut self, depth: u32) -> Self {
        self.send_queue_depth = Some(depth);
        self
    }

    /// Override the receive-queue depth.
    pub fn with_recv_queue_depth(mut self, depth: u32) -> Self {
        self.recv_queue_depth = Some(depth);
        self
    }

    /// Override the send-pool size.
    pub fn with_send_pool_bytes(mut self, bytes: u64) -> Self {
        self.send_pool_bytes = Some(bytes);
        self
    }

    /// Override the receive-pool size.
    pub fn with_recv_pool_bytes(mut self, bytes: u64) -> Self {
        self.recv_pool_bytes = Some(bytes);
        self
    }
}

/// Derived RDMA resource parameters for one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceProfile {
    /// Send buffer-pool size in bytes.
    pub send_pool_bytes: u64,
    /// Receive buffer-pool size in bytes.
    pub recv_pool_bytes: u64,
    /// Completion-queue depth.
    pub completion_queue_depth: u32,
    /// Send-queue depth.
    pub send_queue_depth: u32,
    /// Receive-queue depth.
    pub recv_queue_depth: u32,
}

/// Errors from resource sizing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SizingError {
    /// An input that must be positive was zero.
    #[error("{role} sizing: {param} must be positive")]
    ZeroInput {
        /// Role being sized.
        role: &'static str,
        /// Offending input parameter.
        param: &'static str,
    },

    /// A derived field came out zero; the caller must supply larger inputs
    /// or an explicit override.
    #[error("{role} sizing: derived {field} is zero (inputs too small)")]
    ZeroDerived {
        /// Role being sized.
        role: &'static str,
        /// Offending derived field.
        field: &'static str,
    },
}

/// Derive the resource profile for one role.
pub fn size_role(
    role: SizingRole,
    max_message_bytes: u64,
    fan_in: u32,
    overrides: &SizingOverrides,
) -> Result<ResourceProfile, SizingError> {
    if max_message_bytes == 0 {
        return Err(SizingError::ZeroInput {
            role: role.name(),
            param: "max_message_bytes",
        });
    }
    if fan_in == 0 {
        return Err(SizingError::ZeroInput {
            role: role.name(),
            param: "fan_in",
        });
    }

    let (default_sq, default_rq) = role.default_queue_depths();
    let send_queue_depth = overrides.send_queue_depth.unwrap_or(default_sq);
    let recv_queue_depth = overrides.recv_queue_depth.unwrap_or(default_rq);
    let max_resources = overrides.max_resources.unwrap_or(DEFAULT_MAX_RESOURCES);

    let send_pool_bytes = overrides.send_pool_bytes.unwrap_or_else(|| {
        u64::from(send_queue_depth / 16) * max_message_bytes * u64::from(fan_in)
    });
    let recv_pool_bytes = overrides.recv_pool_bytes.unwrap_or_else(|| {
        u64::from(recv_queue_depth + max_resources) * u64::from(fan_in) * max_message_bytes
    });
    let completion_queue_depth = overrides
        .completion_queue_depth
        .unwrap_or(recv_queue_depth * fan_in);

    let profile = ResourceProfile {
        send_pool_bytes,
        recv_pool_bytes,
        completion_queue_depth,
        send_queue_depth,
        recv_queue_depth,
    };

    for (field, value) in [
        ("send_pool_bytes", profile.send_pool_bytes),
        ("recv_pool_bytes", profile.recv_pool_bytes),
        ("completion_queue_depth", u64::from(profile.completion_queue_depth)),
        ("send_queue_depth", u64::from(profile.send_queue_depth)),
        ("recv_queue_depth", u64::from(profile.recv_queue_depth)),
    ] {
        if value == 0 {
            return Err(SizingError::ZeroDerived {
                role: role.name(),
                field,
            });
        }
    }

    Ok(profile)
}

/// Resource profiles for every role of one topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSet {
    /// Event-manager profile.
    pub event_manager: ResourceProfile,
    /// Readout-unit profile.
    pub readout_unit: ResourceProfile,
    /// Builder-unit profile.
    pub builder_unit: ResourceProfile,
}

impl ResourceSet {
    /// Derive all three profiles from a request and the fan-in factors the
    /// assigned topology implies.
    ///
    /// Fan-ins: a readout unit receives from its channels, a builder unit
    /// from every readout unit, the event manager from every builder unit.
    pub fn derive(
        request: &TopologyRequest,
        readout_unit_fan_in: u32,
        builder_unit_fan_in: u32,
        event_manager_fan_in: u32,
    ) -> Result<Self, SizingError> {
        Ok(Self {
            event_manager: size_role(
                SizingRole::EventManager,
                request.max_message_bytes,
                event_manager_fan_in,
                &request.event_manager_sizing,
            )?,
            readout_unit: size_role(
                SizingRole::ReadoutUnit,
                request.max_message_bytes,
                readout_unit_fan_in,
                &request.readout_unit_sizing,
            )?,
            builder_unit: size_role(
                SizingRole::BuilderUnit,
                request.max_message_bytes,
                builder_unit_fan_in,
                &request.builder_unit_sizing,
            )?,
        })
    }

    /// Profile for a sizing role.
    pub fn for_role(&self, role: SizingRole) -> &ResourceProfile {
        match role {
            SizingRole::EventManager => &self.event_manager,
            SizingRole::ReadoutUnit => &self.readout_unit,
            SizingRole::BuilderUnit => &self.builder_unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_formulas_for_readout_unit() {
        let profile = size_role(SizingRole::ReadoutUnit, 4096, 8, &SizingOverrides::default())
            .expect("sizing succeeds");

        // sq 1024 / 16 = 64 slots, times message size, times fan-in.
        assert_eq!(profile.send_pool_bytes, 64 * 4096 * 8);
        // (rq 64 + max_resources 16) * fan_in * message size.
        assert_eq!(profile.recv_pool_bytes, 80 * 8 * 4096);
        assert_eq!(profile.completion_queue_depth, 64 * 8);
        assert_eq!(profile.send_queue_depth, 1024);
        assert_eq!(profile.recv_queue_depth, 64);
    }

    #[test]
    fn zero_message_size_is_an_error() {
        let err = size_role(SizingRole::BuilderUnit, 0, 4, &SizingOverrides::default())
            .expect_err("zero message size must fail");
        assert_eq!(
            err,
            SizingError::ZeroInput {
                role: "builder unit",
                param: "max_message_bytes"
            }
        );
    }

    #[test]
    fn zero_fan_in_is_an_error() {
        let err = size_role(SizingRole::EventManager, 4096, 0, &SizingOverrides::default())
            .expect_err("zero fan-in must fail");
        assert!(matches!(err, SizingError::ZeroInput { param: "fan_in", .. }));
    }

    #[test]
    fn tiny_send_queue_yields_zero_derived_error() {
        // sq 8 / 16 truncates to 0, so the send pool collapses.
        let overrides = SizingOverrides::default().with_send_queue_depth(8);
        let err = size_role(SizingRole::ReadoutUnit, 4096, 4, &overrides)
            .expect_err("collapsed send pool must fail");
        assert_eq!(
            err,
            SizingError::ZeroDerived {
                role: "readout unit",
                field: "send_pool_bytes"
            }
        );
    }

    #[test]
    fn explicit_override_rescues_collapsed_field() {
        let overrides = SizingOverrides::default()
            .with_send_queue_depth(8)
            .with_send_pool_bytes(1 << 20);
        let profile =
            size_role(SizingRole::ReadoutUnit, 4096, 4, &overrides).expect("override rescues");
        assert_eq!(profile.send_pool_bytes, 1 << 20);
        assert_eq!(profile.send_queue_depth, 8);
    }

    #[test]
    fn resource_set_derives_all_roles() {
        let request = TopologyRequest::new(16, 8, 2, 4).with_streams_per_channel(2);
        let set = ResourceSet::derive(&request, 4, 2, 4).expect("derivation succeeds");

        assert_eq!(set.for_role(SizingRole::ReadoutUnit), &set.readout_unit);
        assert_ne!(set.readout_unit, set.builder_unit);
        // Builder-unit completion queue: rq 1024 * fan-in 2.
        assert_eq!(set.builder_unit.completion_queue_depth, 2048);
    }

    #[test]
    fn overrides_flow_from_request() {
        let mut request = TopologyRequest::new(4, 4, 2, 2);
        request.builder_unit_sizing = SizingOverrides::default().with_recv_queue_depth(512);
        let set = ResourceSet::derive(&request, 2, 2, 2).expect("derivation succeeds");
        assert_eq!(set.builder_unit.recv_queue_depth, 512);
        assert_eq!(set.builder_unit.completion_queue_depth, 1024);
    }

    #[test]
    fn overrides_deserialize_from_toml() {
        let overrides: SizingOverrides =
            toml::from_str("send_queue_depth = 2048\nmax_resources = 32\n").unwrap();
        assert_eq!(overrides.send_queue_depth, Some(2048));
        assert_eq!(overrides.max_resources, Some(32));
        assert_eq!(overrides.send_pool_bytes, None);
    }
}
