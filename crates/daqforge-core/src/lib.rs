//! Core data model and resource sizing for the daqforge rig configurator.
//!
//! This crate holds the types shared by every stage of the configuration
//! pipeline: the immutable [`TopologyRequest`] describing the rig a caller
//! wants, the node model produced by topology assignment ([`ReadoutUnitNode`],
//! [`BuilderUnitNode`], [`ReadoutChannel`]), and the pure-arithmetic RDMA
//! resource sizing ([`ResourceProfile`]).
//!
//! # Features
//!
//! - **Request Model**: Validated, serde-loadable topology requests
//! - **Node Model**: Tagged node types with dense indices and FED ownership
//! - **Resource Sizing**: Buffer-pool and queue-depth derivation per role
//!
//! # Example
//!
//! ```rust
//! use daqforge_core::{TopologyRequest, BuilderFlavor, PeerTransport};
//!
//! let request = TopologyRequest::new(16, 8, 1, 4)
//!     .with_streams_per_channel(2)
//!     .with_flavor(BuilderFlavor::Evb)
//!     .with_transport(PeerTransport::Ibv);
//!
//! request.validate().expect("consistent request");
//! assert_eq!(request.streams_per_readout_unit(), 16);
//! ```

mod node;
mod request;

/// RDMA buffer-pool and queue-depth sizing.
pub mod sizing;

pub use node::{
    BuilderUnitNode, EfedPosition, FedId, ReadoutChannel, ReadoutUnitNode, RoleFamily, StreamSlot,
};
pub use request::{
    BuilderFlavor, PartialBunchPolicy, PeerTransport, RequestError, ShortfallPolicy,
    StreamRequirement, TopologyRequest, TriggerSource,
};
pub use sizing::{ResourceProfile, ResourceSet, SizingError, SizingOverrides, SizingRole};
