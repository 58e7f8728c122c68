//! Property-based tests for the topology distributor.
//!
//! Verifies the partition and density invariants over randomized topology
//! requests using proptest.

use std::collections::BTreeSet;

use daqforge_core::{FedId, PartialBunchPolicy, TopologyRequest};
use daqforge_topology::distribute;
use proptest::prelude::*;

/// Build a valid synthetic request from free parameters.
fn request(
    channels: usize,
    streams_per_channel: u8,
    readout_units: usize,
    builder_units: usize,
) -> TopologyRequest {
    TopologyRequest::new(
        channels * usize::from(streams_per_channel),
        channels,
        readout_units,
        builder_units,
    )
    .with_streams_per_channel(streams_per_channel)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Under the absorb policy every generated FED id lands on exactly one
    /// readout unit: the union is the full consecutive range from the base,
    /// with no duplicates.
    #[test]
    fn partition_is_exact_under_absorb(
        channels in 1usize..48,
        streams in 1u8..=2,
        readout_units in 1usize..8,
        builder_units in 1usize..8,
    ) {
        let request = request(channels, streams, readout_units, builder_units)
            .with_partial_bunch_policy(PartialBunchPolicy::Absorb);
        let assignment = distribute(None, &request).expect("distribution succeeds");

        let ids = assignment.fed_ids();
        let unique: BTreeSet<FedId> = ids.iter().copied().collect();
        prop_assert_eq!(unique.len(), ids.len(), "duplicate fed id assigned");

        let expected: BTreeSet<FedId> = (0..request.stream_count as u32)
            .map(|i| FedId(request.fed_id_base + i))
            .collect();
        prop_assert_eq!(unique, expected, "fed id union is not the generated range");
    }

    /// Under the report policy nothing disappears: assigned ids plus the
    /// ids on unassigned channels still cover the generated range exactly.
    #[test]
    fn no_fed_id_is_silently_dropped(
        channels in 1usize..48,
        streams in 1u8..=2,
        readout_units in 1usize..8,
    ) {
        let request = request(channels, streams, readout_units, 2);
        let assignment = distribute(None, &request).expect("distribution succeeds");

        let mut ids = assignment.fed_ids();
        ids.extend(
            assignment
                .unassigned_channels
                .iter()
                .flat_map(|c| c.fed_ids()),
        );
        let unique: BTreeSet<FedId> = ids.iter().copied().collect();
        prop_assert_eq!(unique.len(), ids.len());
        prop_assert_eq!(unique.len(), request.stream_count);
    }

    /// Masked ids never surface anywhere in the result.
    #[test]
    fn masked_ids_never_surface(
        channels in 1usize..24,
        masked_offset in 0u32..24,
    ) {
        let request = request(channels, 1, 1, 1)
            .with_masked_feds([FedId(1000 + masked_offset)])
            .with_partial_bunch_policy(PartialBunchPolicy::Absorb);
        let assignment = distribute(None, &request).expect("distribution succeeds");

        prop_assert!(!assignment.fed_ids().contains(&FedId(1000 + masked_offset)));
    }

    /// Readout-unit and builder-unit indices are always a dense 0..N range.
    #[test]
    fn indices_are_dense(
        channels in 1usize..48,
        streams in 1u8..=2,
        readout_units in 1usize..10,
        builder_units in 1usize..10,
    ) {
        let request = request(channels, streams, readout_units, builder_units);
        let assignment = distribute(None, &request).expect("distribution succeeds");

        let ru_indices: Vec<usize> =
            assignment.readout_units.iter().map(|u| u.index).collect();
        let expected: Vec<usize> = (0..assignment.readout_units.len()).collect();
        prop_assert_eq!(ru_indices, expected, "readout-unit indices not dense");

        let bu_indices: Vec<usize> =
            assignment.builder_units.iter().map(|u| u.index).collect();
        let expected: Vec<usize> = (0..assignment.builder_units.len()).collect();
        prop_assert_eq!(bu_indices, expected, "builder-unit indices not dense");
    }

    /// The trailing partial bunch is exactly the truncation remainder and it
    /// is always reported, never dropped.
    #[test]
    fn partial_bunch_remainder_is_visible(
        channels in 1usize..48,
        readout_units in 1usize..8,
    ) {
        let request = request(channels, 2, readout_units, 2);
        let assignment = distribute(None, &request).expect("distribution succeeds");

        let bunch = channels / readout_units;
        let expected_remainder = channels - bunch * readout_units;
        prop_assert_eq!(assignment.unassigned_channels.len(), expected_remainder);
        prop_assert_eq!(
            assignment.channel_count() + expected_remainder,
            channels,
            "channels lost in assignment"
        );
    }
}
