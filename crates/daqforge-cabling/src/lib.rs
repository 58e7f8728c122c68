//! Cabling-graph model over the two rig inventories.
//!
//! A rig is wired through two independent switched fabrics: the front-end
//! fabric (controllers and readout hosts hanging off data switches) and the
//! builder fabric (a port-adjacency list with blacklist annotations). This
//! crate parses both inventory formats into an in-memory [`CablingGraph`]
//! that answers the adjacency and membership queries topology assignment
//! needs.
//!
//! Two-phase design: parse → records, then build → graph. The parse phase is
//! pure string handling and fully testable without any inventory files.
//!
//! # Inventory formats
//!
//! Front-end fabric, one `switch;device` record per line:
//!
//! ```text
//! # data switches
//! sw-fe-01;ru-c2e12-11
//! sw-fe-01;frl-c1-05,1,5,1012,1013,frlpc-c1-05
//! ```
//!
//! Builder fabric, six comma-separated fields per line:
//!
//! ```text
//! sw-ib-01,Eth1/7,ru-c2e12-11,mlx0,0,uplink ok
//! sw-ib-01,Eth1/9,bu-c2e18-01,mlx0,1,flaky optics
//! ```
//!
//! Malformed lines abort the whole load (partial inventories are unsafe to
//! act on); records that merely fail role classification are collected as
//! [`CablingDiagnostic::MissingMapping`] and reported beside the graph.

mod device;
mod error;
mod graph;
mod parse;

pub use device::{Device, HostRole, classify_host};
pub use error::{CablingError, InventoryKind};
pub use graph::{CablingDiagnostic, CablingGraph, GraphSummary, InventoryFilters, PortLink};
