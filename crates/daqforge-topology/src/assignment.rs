//! Assignment result and its diagnostics.

use daqforge_core::{BuilderUnitNode, FedId, ReadoutChannel, ReadoutUnitNode};
use std::fmt;

/// Recoverable findings from a distribution run.
///
/// Diagnostics ride along with the (possibly partial) result so the caller
/// can decide whether to proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyDiagnostic {
    /// Channels were left over after all readout units filled up.
    AssignmentShortfall {
        /// How many channels could not be placed.
        remaining: usize,
    },
    /// A readout unit ended up with zero channels and was pruned.
    PrunedReadoutUnit {
        /// Hostname of the pruned unit, when resolved.
        hostname: Option<String>,
    },
    /// Fewer builder hosts were available than the request asked for.
    BuilderHostShortfall {
        /// Requested builder-unit count.
        requested: usize,
        /// Hosts actually available.
        available: usize,
    },
    /// A FED-id offset fell past the last eFED window; its slice was capped.
    EfedSliceCapped {
        /// The FED id in question.
        fed: FedId,
        /// Its offset from the configured base.
        offset: u32,
    },
    /// A masked FED id was removed from an inventory slot.
    MaskedFed {
        /// The masked id.
        fed: FedId,
        /// Controller tag the slot belongs to.
        controller: String,
    },
}

impl fmt::Display for TopologyDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyDiagnostic::AssignmentShortfall { remaining } => {
                write!(f, "ran out of readout units: {remaining} channel(s) unassigned")
            }
            TopologyDiagnostic::PrunedReadoutUnit { hostname } => match hostname {
                Some(host) => write!(f, "pruned readout unit '{host}' (no channels)"),
                None => write!(f, "pruned readout unit (no channels)"),
            },
            TopologyDiagnostic::BuilderHostShortfall {
                requested,
                available,
            } => write!(
                f,
                "only {available} builder host(s) for {requested} requested builder unit(s)"
            ),
            TopologyDiagnostic::EfedSliceCapped { fed, offset } => {
                write!(f, "fed {fed} offset {offset} past last eFED window, slice capped")
            }
            TopologyDiagnostic::MaskedFed { fed, controller } => {
                write!(f, "fed {fed} masked out of controller '{controller}'")
            }
        }
    }
}

/// The outcome of a distribution run.
///
/// Immutable once returned. Readout-unit and builder-unit indices are a
/// dense `0..N` range; pruned units never surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Readout units in index order.
    pub readout_units: Vec<ReadoutUnitNode>,
    /// Builder units in index order.
    pub builder_units: Vec<BuilderUnitNode>,
    /// Event-manager host, when one is resolvable.
    pub event_manager_host: Option<String>,
    /// Channels that could not be placed (never silently dropped).
    pub unassigned_channels: Vec<ReadoutChannel>,
    /// Recoverable findings from the run.
    pub diagnostics: Vec<TopologyDiagnostic>,
}

impl Assignment {
    /// Union of FED ids across all readout units, in assignment order.
    pub fn fed_ids(&self) -> Vec<FedId> {
        self.readout_units.iter().flat_map(|ru| ru.fed_ids()).collect()
    }

    /// Whether every discovered channel was placed.
    pub fn is_complete(&self) -> bool {
        self.unassigned_channels.is_empty()
    }

    /// Total number of assigned channels.
    pub fn channel_count(&self) -> usize {
        self.readout_units.iter().map(|ru| ru.channels.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daqforge_core::StreamSlot;

    #[test]
    fn fed_ids_union_follows_assignment_order() {
        let mut ru0 = ReadoutUnitNode::new(0);
        ru0.channels.push(ReadoutChannel::new(
            "channel-0",
            vec![StreamSlot::new(0, FedId(1001))],
        ));
        let mut ru1 = ReadoutUnitNode::new(1);
        ru1.channels.push(ReadoutChannel::new(
            "channel-1",
            vec![StreamSlot::new(0, FedId(1000))],
        ));

        let assignment = Assignment {
            readout_units: vec![ru0, ru1],
            builder_units: vec![BuilderUnitNode::new(0)],
            event_manager_host: None,
            unassigned_channels: Vec::new(),
            diagnostics: Vec::new(),
        };

        assert_eq!(assignment.fed_ids(), vec![FedId(1001), FedId(1000)]);
        assert!(assignment.is_complete());
        assert_eq!(assignment.channel_count(), 2);
    }

    #[test]
    fn diagnostics_render_human_readable() {
        let text = TopologyDiagnostic::AssignmentShortfall { remaining: 3 }.to_string();
        assert!(text.contains("3 channel(s) unassigned"));

        let text = TopologyDiagnostic::BuilderHostShortfall {
            requested: 4,
            available: 2,
        }
        .to_string();
        assert!(text.contains("only 2"));
    }
}
