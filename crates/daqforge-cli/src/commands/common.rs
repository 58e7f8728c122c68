//! Shared argument groups for request and inventory loading.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, ValueEnum};
use daqforge_cabling::{CablingDiagnostic, CablingGraph, InventoryFilters};
use daqforge_core::{
    BuilderFlavor, PartialBunchPolicy, PeerTransport, ShortfallPolicy, TopologyRequest,
    TriggerSource,
};

/// Builder flavor on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FlavorArg {
    /// Folded event builder (readout unit 0 doubles as event manager)
    Evb,
    /// Generic event builder with a standalone event manager
    Gevb,
}

impl From<FlavorArg> for BuilderFlavor {
    fn from(arg: FlavorArg) -> Self {
        match arg {
            FlavorArg::Evb => BuilderFlavor::Evb,
            FlavorArg::Gevb => BuilderFlavor::Gevb,
        }
    }
}

/// Peer transport on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TransportArg {
    /// InfiniBand verbs
    Ibv,
    /// Userspace TCP
    Utcp,
}

impl From<TransportArg> for PeerTransport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Ibv => PeerTransport::Ibv,
            TransportArg::Utcp => PeerTransport::Utcp,
        }
    }
}

/// Trigger source on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TriggerArg {
    /// Controller-internal generator
    Internal,
    /// Real front-end link
    FedLink,
    /// eFED emulator crate
    EfedEmulator,
    /// External gate signal
    ExternalGate,
}

impl From<TriggerArg> for TriggerSource {
    fn from(arg: TriggerArg) -> Self {
        match arg {
            TriggerArg::Internal => TriggerSource::Internal,
            TriggerArg::FedLink => TriggerSource::FedLink,
            TriggerArg::EfedEmulator => TriggerSource::EfedEmulator,
            TriggerArg::ExternalGate => TriggerSource::ExternalGate,
        }
    }
}

/// Topology request, either from a TOML file or from flags.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Load the topology request from a TOML file (flags are ignored)
    #[arg(long, value_name = "FILE")]
    pub request: Option<PathBuf>,

    /// Total number of detector data streams
    #[arg(long)]
    pub streams: Option<usize>,

    /// Number of front-end channels
    #[arg(long)]
    pub channels: Option<usize>,

    /// Streams aggregated per channel (1 or 2)
    #[arg(long, default_value_t = 1)]
    pub streams_per_channel: u8,

    /// Number of readout units
    #[arg(long)]
    pub readout_units: Option<usize>,

    /// Number of builder units
    #[arg(long)]
    pub builder_units: Option<usize>,

    /// Event-builder flavor
    #[arg(long, value_enum, default_value_t = FlavorArg::Evb)]
    pub flavor: FlavorArg,

    /// Peer transport between units
    #[arg(long, value_enum, default_value_t = TransportArg::Ibv)]
    pub transport: TransportArg,

    /// Trigger source for the controllers
    #[arg(long, value_enum, default_value_t = TriggerArg::Internal)]
    pub trigger: TriggerArg,

    /// Absorb the trailing partial bunch into the last readout unit
    /// instead of reporting it as unassigned
    #[arg(long)]
    pub absorb_partial_bunch: bool,

    /// Abort instead of reporting when the inventory runs out of
    /// readout units
    #[arg(long)]
    pub fail_on_shortfall: bool,
}

/// Build a validated request from the argument group.
pub fn build_request(args: &RequestArgs) -> anyhow::Result<TopologyRequest> {
    if let Some(path) = &args.request {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading request file '{}'", path.display()))?;
        let request = TopologyRequest::from_toml(&text)
            .with_context(|| format!("parsing request file '{}'", path.display()))?;
        request.validate()?;
        return Ok(request);
    }

    let (Some(streams), Some(channels), Some(readout_units), Some(builder_units)) = (
        args.streams,
        args.channels,
        args.readout_units,
        args.builder_units,
    ) else {
        bail!("either --request or all of --streams/--channels/--readout-units/--builder-units are required");
    };

    let mut request = TopologyRequest::new(streams, channels, readout_units, builder_units)
        .with_streams_per_channel(args.streams_per_channel)
        .with_flavor(args.flavor.into())
        .with_transport(args.transport.into())
        .with_trigger(args.trigger.into());
    if args.absorb_partial_bunch {
        request = request.with_partial_bunch_policy(PartialBunchPolicy::Absorb);
    }
    if args.fail_on_shortfall {
        request = request.with_shortfall_policy(ShortfallPolicy::Fail);
    }
    request.validate()?;
    Ok(request)
}

/// Inventory files and load filters.
#[derive(Args, Debug)]
pub struct InventoryArgs {
    /// Front-end fabric inventory (switch;device records)
    #[arg(long, value_name = "FILE")]
    pub frontend: Option<PathBuf>,

    /// Builder fabric inventory (6 comma-separated fields)
    #[arg(long, value_name = "FILE")]
    pub builder: Option<PathBuf>,

    /// Only load records on these switches (repeatable)
    #[arg(long = "switch", value_name = "NAME")]
    pub switches: Vec<String>,
}

/// Load the cabling graph, or `None` for synthetic mode.
pub fn load_graph(
    args: &InventoryArgs,
) -> anyhow::Result<Option<(CablingGraph, Vec<CablingDiagnostic>)>> {
    match (&args.frontend, &args.builder) {
        (None, None) => Ok(None),
        (Some(frontend), Some(builder)) => {
            let frontend_text = std::fs::read_to_string(frontend)
                .with_context(|| format!("reading front-end inventory '{}'", frontend.display()))?;
            let builder_text = std::fs::read_to_string(builder)
                .with_context(|| format!("reading builder inventory '{}'", builder.display()))?;

            let mut filters = InventoryFilters::none();
            if !args.switches.is_empty() {
                filters = filters.with_switches(args.switches.iter().cloned());
            }

            let loaded = CablingGraph::load(&frontend_text, &builder_text, &filters)?;
            Ok(Some(loaded))
        }
        _ => bail!("--frontend and --builder must be given together"),
    }
}
