//! Channel discovery and readout-unit assignment.

use daqforge_cabling::{CablingError, CablingGraph, Device};
use daqforge_core::{
    BuilderFlavor, BuilderUnitNode, FedId, PartialBunchPolicy, ReadoutChannel, ReadoutUnitNode,
    RequestError, ShortfallPolicy, StreamRequirement, StreamSlot, TopologyRequest,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::assignment::{Assignment, TopologyDiagnostic};
use crate::efed;

/// Fatal distribution errors.
///
/// Shortfalls are only fatal under [`ShortfallPolicy::Fail`]; the default
/// policy reports them as diagnostics beside the partial result instead.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// The request failed validation.
    #[error("invalid topology request: {0}")]
    Request(#[from] RequestError),

    /// A graph query failed while walking the inventory.
    #[error(transparent)]
    Cabling(#[from] CablingError),

    /// Channels remained after every readout unit filled up, under
    /// [`ShortfallPolicy::Fail`].
    #[error("ran out of readout units: {assigned} channel(s) placed, {remaining} left over")]
    OutOfReadoutUnits {
        /// Channels successfully placed.
        assigned: usize,
        /// Channels left over.
        remaining: usize,
    },
}

/// FED-id allocator for synthetic mode.
///
/// Explicit run state, reset per distribution run. Masked ids are skipped
/// so allocated ids stay consecutive over the unmasked space.
struct FedIdCounter<'a> {
    next: u32,
    masked: &'a [FedId],
}

impl<'a> FedIdCounter<'a> {
    fn new(base: u32, masked: &'a [FedId]) -> Self {
        Self { next: base, masked }
    }

    fn allocate(&mut self) -> FedId {
        loop {
            let fed = FedId(self.next);
            self.next += 1;
            if !self.masked.contains(&fed) {
                return fed;
            }
            debug!(%fed, "skipping masked fed id");
        }
    }
}

/// Partition channels across readout and builder units.
///
/// With a graph, channels are discovered from the inventory; without one,
/// they are generated synthetically from the request counts.
pub fn distribute(
    graph: Option<&CablingGraph>,
    request: &TopologyRequest,
) -> Result<Assignment, TopologyError> {
    request.validate()?;

    let mut assignment = match graph {
        Some(graph) => assign_from_inventory(graph, request)?,
        None => assign_synthetic(request)?,
    };

    prune_and_densify(&mut assignment);

    if assignment.event_manager_host.is_none()
        && request.flavor == BuilderFlavor::Evb
        && let Some(first) = assignment.readout_units.first()
    {
        assignment.event_manager_host = first.hostname.clone();
    }

    debug!(
        readout_units = assignment.readout_units.len(),
        builder_units = assignment.builder_units.len(),
        unassigned = assignment.unassigned_channels.len(),
        "distribution complete"
    );
    Ok(assignment)
}

/// Count-driven assignment with generated FED ids.
fn assign_synthetic(request: &TopologyRequest) -> Result<Assignment, TopologyError> {
    let mut counter = FedIdCounter::new(request.fed_id_base, &request.masked_feds);

    let mut channels = Vec::with_capacity(request.channel_count);
    for i in 0..request.channel_count {
        let slots = (0..request.streams_per_channel)
            .map(|slot| StreamSlot::new(slot, counter.allocate()))
            .collect();
        channels.push(ReadoutChannel::new(format!("channel-{i}"), slots));
    }

    let mut diagnostics = Vec::new();
    let bunch_size = request.channels_per_readout_unit();
    let mut readout_units = Vec::with_capacity(request.readout_unit_count);
    let mut remaining = channels.into_iter();

    for index in 0..request.readout_unit_count {
        let mut unit = ReadoutUnitNode::new(index);
        unit.channels.extend(remaining.by_ref().take(bunch_size));
        readout_units.push(unit);
    }

    let leftover: Vec<ReadoutChannel> = remaining.collect();
    let unassigned_channels = match request.partial_bunch_policy {
        PartialBunchPolicy::Absorb if !leftover.is_empty() => {
            // The trailing partial bunch goes to the last unit.
            if let Some(last) = readout_units.last_mut() {
                last.channels.extend(leftover);
            }
            Vec::new()
        }
        _ => {
            if !leftover.is_empty() {
                warn!(remaining = leftover.len(), "trailing partial bunch left unassigned");
                diagnostics.push(TopologyDiagnostic::AssignmentShortfall {
                    remaining: leftover.len(),
                });
            }
            leftover
        }
    };

    Ok(Assignment {
        readout_units,
        builder_units: synthetic_builder_units(request.builder_unit_count),
        event_manager_host: None,
        unassigned_channels,
        diagnostics,
    })
}

/// Inventory-driven assignment: walk the graph switch by switch.
fn assign_from_inventory(
    graph: &CablingGraph,
    request: &TopologyRequest,
) -> Result<Assignment, TopologyError> {
    let mut diagnostics = Vec::new();
    let mut readout_units: Vec<ReadoutUnitNode> = Vec::new();
    let mut leftover: Vec<ReadoutChannel> = Vec::new();
    let capacity = request.channels_per_readout_unit().max(1);

    let switches: Vec<&str> = graph.switches().collect();
    for switch in switches {
        let mut queue =
            discover_channels(graph, switch, request, &mut diagnostics)?.into_iter();

        let hosts = graph
            .readout_hosts_on_switch(switch)
            .map(|hosts| hosts.to_vec())
            .unwrap_or_default();

        for host in hosts {
            if readout_units.len() >= request.readout_unit_count {
                break;
            }
            let mut unit = ReadoutUnitNode::new(readout_units.len()).with_hostname(host);
            unit.channels.extend(queue.by_ref().take(capacity));
            readout_units.push(unit);
        }

        leftover.extend(queue);
    }

    if !leftover.is_empty() {
        let assigned: usize = readout_units.iter().map(|ru| ru.channels.len()).sum();
        match request.shortfall_policy {
            ShortfallPolicy::Fail => {
                return Err(TopologyError::OutOfReadoutUnits {
                    assigned,
                    remaining: leftover.len(),
                });
            }
            ShortfallPolicy::Report => {
                warn!(remaining = leftover.len(), "ran out of readout units");
                diagnostics.push(TopologyDiagnostic::AssignmentShortfall {
                    remaining: leftover.len(),
                });
            }
        }
    }

    let builder_units = inventory_builder_units(graph, request, &mut diagnostics);
    let event_manager_host = match request.flavor {
        // Resolved after pruning, from readout unit 0.
        BuilderFlavor::Evb => None,
        BuilderFlavor::Gevb => graph.event_manager_hosts().first().cloned(),
    };

    Ok(Assignment {
        readout_units,
        builder_units,
        event_manager_host,
        unassigned_channels: leftover,
        diagnostics,
    })
}

/// Channels on one switch that satisfy the stream requirement.
fn discover_channels(
    graph: &CablingGraph,
    switch: &str,
    request: &TopologyRequest,
    diagnostics: &mut Vec<TopologyDiagnostic>,
) -> Result<Vec<ReadoutChannel>, TopologyError> {
    let mut channels = Vec::new();

    for device in graph.controllers_on_switch(switch)? {
        let Device::FrontEndController {
            tag, slots, host, ..
        } = device
        else {
            continue;
        };

        let mut channel_slots = Vec::with_capacity(slots.len());
        for slot in slots {
            let mut slot = slot.clone();
            if let Some(fed) = slot.fed_id {
                if request.masked_feds.contains(&fed) {
                    diagnostics.push(TopologyDiagnostic::MaskedFed {
                        fed,
                        controller: tag.clone(),
                    });
                    slot.fed_id = None;
                } else {
                    let offset = fed.0.saturating_sub(request.fed_id_base);
                    if efed::overflows(offset) {
                        diagnostics.push(TopologyDiagnostic::EfedSliceCapped { fed, offset });
                    }
                    slot.efed = Some(efed::position(offset));
                }
            }
            channel_slots.push(slot);
        }

        let channel = ReadoutChannel::new(tag.clone(), channel_slots).with_host(host.clone());
        let included = match request.stream_requirement {
            StreamRequirement::First => channel.has_stream(0),
            StreamRequirement::Second => channel.has_stream(1),
            StreamRequirement::Any => channel.stream_count() > 0,
        };
        if included {
            channels.push(channel);
        } else {
            debug!(tag = %tag, "channel excluded by stream requirement");
        }
    }

    Ok(channels)
}

fn synthetic_builder_units(count: usize) -> Vec<BuilderUnitNode> {
    (0..count).map(BuilderUnitNode::new).collect()
}

/// Builder units resolved against the non-blacklisted global host list.
///
/// The count is taken verbatim from the request; builder units are
/// homogeneous and any-to-any reachable, so no fabric-based assignment is
/// attempted.
fn inventory_builder_units(
    graph: &CablingGraph,
    request: &TopologyRequest,
    diagnostics: &mut Vec<TopologyDiagnostic>,
) -> Vec<BuilderUnitNode> {
    let hosts = graph
        .builder_hosts(None)
        .map(|hosts| hosts.to_vec())
        .unwrap_or_default();
    if hosts.len() < request.builder_unit_count {
        warn!(
            requested = request.builder_unit_count,
            available = hosts.len(),
            "builder host shortfall"
        );
        diagnostics.push(TopologyDiagnostic::BuilderHostShortfall {
            requested: request.builder_unit_count,
            available: hosts.len(),
        });
    }

    (0..request.builder_unit_count)
        .map(|index| {
            let unit = BuilderUnitNode::new(index);
            match hosts.get(index) {
                Some(host) => unit.with_hostname(host.as_str()),
                None => unit,
            }
        })
        .collect()
}

/// Drop readout units with zero channels and re-densify indices.
fn prune_and_densify(assignment: &mut Assignment) {
    let mut pruned = Vec::new();
    assignment.readout_units.retain(|unit| {
        let keep = !unit.channels.is_empty();
        if !keep {
            pruned.push(unit.hostname.clone());
        }
        keep
    });
    for hostname in pruned {
        assignment
            .diagnostics
            .push(TopologyDiagnostic::PrunedReadoutUnit { hostname });
    }
    for (index, unit) in assignment.readout_units.iter_mut().enumerate() {
        unit.index = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daqforge_cabling::InventoryFilters;

    const FRONTEND: &str = "\
sw-fe-01;ru-c2e12-11
sw-fe-01;ru-c2e12-12
sw-fe-01;frl-c1-01,1,1,1000,1001,frlpc-c1-01
sw-fe-01;frl-c1-02,1,2,1002,1003,frlpc-c1-02
sw-fe-01;frl-c1-03,1,3,1004,frlpc-c1-03
sw-fe-01;frl-c1-04,1,4,frlpc-c1-04
";

    const BUILDER: &str = "\
sw-ib-01,Eth1/1,ru-c2e12-11,mlx0,0,
sw-ib-01,Eth1/2,bu-c2e18-01,mlx0,1,bad cable
sw-ib-01,Eth1/3,bu-c2e18-02,mlx0,0,
sw-ib-01,Eth1/4,bu-c2e18-03,mlx0,0,
sw-ib-01,Eth1/5,evm-c2e12-40,mlx0,0,
";

    fn graph() -> CablingGraph {
        CablingGraph::load(FRONTEND, BUILDER, &InventoryFilters::none())
            .expect("fixture loads")
            .0
    }

    // --- synthetic mode ---

    #[test]
    fn scenario_single_readout_unit_owns_everything() {
        // 16 streams over 8 dual-stream channels, one readout unit.
        let request = TopologyRequest::new(16, 8, 1, 4).with_streams_per_channel(2);
        let assignment = distribute(None, &request).expect("distribution succeeds");

        assert_eq!(assignment.readout_units.len(), 1);
        assert_eq!(assignment.readout_units[0].channels.len(), 8);
        assert_eq!(assignment.builder_units.len(), 4);
        assert!(assignment.is_complete());

        let ids: Vec<u32> = assignment.fed_ids().into_iter().map(|f| f.0).collect();
        let expected: Vec<u32> = (1000..1016).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn odd_channel_count_reports_partial_bunch() {
        // 9 channels over 2 units: bunch size 4, one channel left over.
        let request = TopologyRequest::new(18, 9, 2, 2).with_streams_per_channel(2);
        let assignment = distribute(None, &request).expect("distribution succeeds");

        assert_eq!(assignment.readout_units.len(), 2);
        assert_eq!(assignment.channel_count(), 8);
        assert_eq!(assignment.unassigned_channels.len(), 1);
        assert!(assignment
            .diagnostics
            .iter()
            .any(|d| matches!(d, TopologyDiagnostic::AssignmentShortfall { remaining: 1 })));
    }

    #[test]
    fn absorb_policy_keeps_partial_bunch_on_last_unit() {
        let request = TopologyRequest::new(18, 9, 2, 2)
            .with_streams_per_channel(2)
            .with_partial_bunch_policy(PartialBunchPolicy::Absorb);
        let assignment = distribute(None, &request).expect("distribution succeeds");

        assert!(assignment.is_complete());
        assert_eq!(assignment.readout_units[0].channels.len(), 4);
        assert_eq!(assignment.readout_units[1].channels.len(), 5);
    }

    #[test]
    fn masked_feds_are_skipped_by_the_counter() {
        let request = TopologyRequest::new(4, 4, 1, 1)
            .with_masked_feds([FedId(1001), FedId(1002)]);
        let assignment = distribute(None, &request).expect("distribution succeeds");

        let ids: Vec<u32> = assignment.fed_ids().into_iter().map(|f| f.0).collect();
        assert_eq!(ids, vec![1000, 1003, 1004, 1005]);
    }

    #[test]
    fn indices_stay_dense_after_pruning() {
        // 2 channels over 4 units: bunch size 0 would starve everyone, so
        // units 2 and 3 are the interesting case with bunch size 1 below.
        let request = TopologyRequest::new(2, 2, 4, 1);
        let assignment = distribute(None, &request).expect("distribution succeeds");

        // bunch = 2 / 4 = 0: every unit starves, all channels unassigned,
        // every unit pruned.
        assert!(assignment.readout_units.is_empty());
        assert_eq!(assignment.unassigned_channels.len(), 2);

        let request = TopologyRequest::new(3, 3, 2, 1);
        let assignment = distribute(None, &request).expect("distribution succeeds");
        // bunch = 1, third channel unassigned, both units keep one channel.
        let indices: Vec<usize> = assignment.readout_units.iter().map(|u| u.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn invalid_request_is_rejected() {
        let request = TopologyRequest::new(5, 4, 1, 1);
        assert!(matches!(
            distribute(None, &request),
            Err(TopologyError::Request(_))
        ));
    }

    // --- inventory mode ---

    #[test]
    fn inventory_mode_discovers_and_places_channels() {
        let graph = graph();
        // frl-c1-04 has no feds, so 3 channels qualify under Any.
        let request = TopologyRequest::new(8, 4, 2, 2).with_streams_per_channel(2);
        let assignment = distribute(Some(&graph), &request).expect("distribution succeeds");

        assert_eq!(assignment.readout_units.len(), 2);
        assert_eq!(assignment.channel_count(), 3);
        assert_eq!(
            assignment.readout_units[0].hostname.as_deref(),
            Some("ru-c2e12-11")
        );
        assert_eq!(
            assignment.readout_units[1].hostname.as_deref(),
            Some("ru-c2e12-12")
        );

        let ids: Vec<u32> = assignment.fed_ids().into_iter().map(|f| f.0).collect();
        assert_eq!(ids, vec![1000, 1001, 1002, 1003, 1004]);
    }

    #[test]
    fn stream_requirement_second_narrows_channels() {
        let graph = graph();
        let mut request = TopologyRequest::new(8, 4, 2, 2).with_streams_per_channel(2);
        request.stream_requirement = StreamRequirement::Second;
        let assignment = distribute(Some(&graph), &request).expect("distribution succeeds");

        // Only frl-c1-01 and frl-c1-02 carry a second stream.
        assert_eq!(assignment.channel_count(), 2);
    }

    #[test]
    fn efed_positions_attach_to_inventory_slots() {
        let graph = graph();
        let request = TopologyRequest::new(8, 4, 2, 2).with_streams_per_channel(2);
        let assignment = distribute(Some(&graph), &request).expect("distribution succeeds");

        let slot = &assignment.readout_units[0].channels[0].slots[0];
        // fed 1000, base 1000: offset 0 -> slice 0, slot 2.
        let efed = slot.efed.expect("efed derived");
        assert_eq!((efed.slice, efed.slot), (0, 2));
    }

    #[test]
    fn masked_inventory_fed_is_reported_and_removed() {
        let graph = graph();
        let request = TopologyRequest::new(8, 4, 2, 2)
            .with_streams_per_channel(2)
            .with_masked_feds([FedId(1001)]);
        let assignment = distribute(Some(&graph), &request).expect("distribution succeeds");

        assert!(!assignment.fed_ids().contains(&FedId(1001)));
        assert!(assignment
            .diagnostics
            .iter()
            .any(|d| matches!(d, TopologyDiagnostic::MaskedFed { fed: FedId(1001), .. })));
    }

    #[test]
    fn shortfall_fail_policy_aborts() {
        let graph = graph();
        // Capacity 1 channel per unit, only 1 unit allowed: 2 channels left.
        let mut request = TopologyRequest::new(2, 1, 1, 2);
        request.stream_requirement = StreamRequirement::Any;
        request.streams_per_channel = 2;
        request.stream_count = 2;
        request.shortfall_policy = ShortfallPolicy::Fail;
        let err = distribute(Some(&graph), &request).expect_err("must abort");
        assert!(matches!(
            err,
            TopologyError::OutOfReadoutUnits {
                assigned: 1,
                remaining: 2
            }
        ));
    }

    #[test]
    fn shortfall_report_policy_returns_remainder() {
        let graph = graph();
        let mut request = TopologyRequest::new(2, 1, 1, 2);
        request.streams_per_channel = 2;
        let assignment = distribute(Some(&graph), &request).expect("distribution succeeds");
        assert_eq!(assignment.channel_count(), 1);
        assert_eq!(assignment.unassigned_channels.len(), 2);
    }

    #[test]
    fn blacklisted_builder_host_never_becomes_a_unit() {
        let graph = graph();
        let request = TopologyRequest::new(8, 4, 2, 2).with_streams_per_channel(2);
        let assignment = distribute(Some(&graph), &request).expect("distribution succeeds");

        let hosts: Vec<&str> = assignment
            .builder_units
            .iter()
            .filter_map(|bu| bu.hostname.as_deref())
            .collect();
        assert_eq!(hosts, ["bu-c2e18-02", "bu-c2e18-03"]);
        assert!(!hosts.contains(&"bu-c2e18-01"));
    }

    #[test]
    fn builder_host_shortfall_is_reported() {
        let graph = graph();
        let request = TopologyRequest::new(8, 4, 2, 4).with_streams_per_channel(2);
        let assignment = distribute(Some(&graph), &request).expect("distribution succeeds");

        assert_eq!(assignment.builder_units.len(), 4);
        assert!(assignment.builder_units[3].hostname.is_none());
        assert!(assignment.diagnostics.iter().any(|d| matches!(
            d,
            TopologyDiagnostic::BuilderHostShortfall {
                requested: 4,
                available: 3
            }
        )));
    }

    #[test]
    fn evb_event_manager_is_first_readout_unit() {
        let graph = graph();
        let request = TopologyRequest::new(8, 4, 2, 2).with_streams_per_channel(2);
        let assignment = distribute(Some(&graph), &request).expect("distribution succeeds");
        assert_eq!(assignment.event_manager_host.as_deref(), Some("ru-c2e12-11"));
    }

    #[test]
    fn gevb_event_manager_comes_from_inventory() {
        let graph = graph();
        let request = TopologyRequest::new(8, 4, 2, 2)
            .with_streams_per_channel(2)
            .with_flavor(BuilderFlavor::Gevb);
        let assignment = distribute(Some(&graph), &request).expect("distribution succeeds");
        assert_eq!(
            assignment.event_manager_host.as_deref(),
            Some("evm-c2e12-40")
        );
    }
}
