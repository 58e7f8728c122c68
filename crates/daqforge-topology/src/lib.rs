//! Topology distributor for the daqforge rig configurator.
//!
//! Takes a [`TopologyRequest`](daqforge_core::TopologyRequest) and optionally
//! a [`CablingGraph`](daqforge_cabling::CablingGraph), and partitions detector
//! front-end identifiers across readout channels, readout units and builder
//! units. Two modes:
//!
//! - **Synthetic**: no inventory; FED ids come from a counter threaded
//!   through the run, channels are count-driven and bunched contiguously.
//! - **Inventory-driven**: channels are discovered by walking the cabling
//!   graph switch by switch, readout hosts are matched by switch
//!   co-location, and eFED slice/slot positions are derived from FED-id
//!   offsets.
//!
//! Either way the result honors the partition invariant: every included
//! channel lands on exactly one readout unit, and channels that cannot be
//! placed are returned in
//! [`Assignment::unassigned_channels`](Assignment::unassigned_channels),
//! never silently dropped.

mod assignment;
mod distributor;

/// eFED slice/slot windowing.
pub mod efed;

pub use assignment::{Assignment, TopologyDiagnostic};
pub use distributor::{TopologyError, distribute};
