//! Full generation run: distribute, size, synthesize, write artifacts.

use std::path::PathBuf;

use clap::Args;
use daqforge_config::{BasePorts, FragmentLibrary, OutputMode, SymbolMap, Synthesizer};
use daqforge_core::ResourceSet;
use daqforge_topology::{Assignment, distribute};

use crate::commands::common::{InventoryArgs, RequestArgs, build_request, load_graph};

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    #[command(flatten)]
    pub inventory: InventoryArgs,

    /// Output directory for documents and the symbol map
    #[arg(short, long, default_value = "out")]
    pub output: PathBuf,

    /// Emit one document per physical node instead of one monolithic file
    #[arg(long)]
    pub split: bool,

    /// Directory of fragment overrides (built-ins are used otherwise)
    #[arg(long, value_name = "DIR")]
    pub fragments_dir: Option<PathBuf>,

    /// Skip the symbol map (synthetic topologies have no resolved hosts)
    #[arg(long)]
    pub no_symbol_map: bool,

    /// Control-plane base port
    #[arg(long, default_value_t = 21000)]
    pub control_base_port: u16,

    /// Data-plane base port
    #[arg(long, default_value_t = 31000)]
    pub data_base_port: u16,

    /// Launcher (out-of-band) base port
    #[arg(long, default_value_t = 17000)]
    pub launcher_base_port: u16,

    /// Front-end-link base port
    #[arg(long, default_value_t = 10000)]
    pub fedlink_base_port: u16,
}

/// Fan-in factors the assigned topology implies for resource sizing.
fn fan_ins(assignment: &Assignment) -> (u32, u32, u32) {
    let readout_unit = assignment
        .readout_units
        .iter()
        .map(|ru| ru.channels.len())
        .max()
        .unwrap_or(1)
        .max(1) as u32;
    let builder_unit = assignment.readout_units.len().max(1) as u32;
    let event_manager = assignment.builder_units.len().max(1) as u32;
    (readout_unit, builder_unit, event_manager)
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let request = build_request(&args.request)?;
    let loaded = load_graph(&args.inventory)?;

    if let Some((_, diagnostics)) = &loaded {
        for diagnostic in diagnostics {
            eprintln!("inventory: {diagnostic}");
        }
    }

    let assignment = distribute(loaded.as_ref().map(|(graph, _)| graph), &request)?;
    for diagnostic in &assignment.diagnostics {
        eprintln!("assignment: {diagnostic}");
    }

    let (ru_fan_in, bu_fan_in, evm_fan_in) = fan_ins(&assignment);
    let resources = ResourceSet::derive(&request, ru_fan_in, bu_fan_in, evm_fan_in)?;

    let library = match &args.fragments_dir {
        Some(dir) => FragmentLibrary::with_overrides(dir)?,
        None => FragmentLibrary::builtin()?,
    };

    let mode = if args.split {
        OutputMode::Split
    } else {
        OutputMode::Monolithic
    };
    let output = Synthesizer::new(&library).synthesize(&assignment, &resources, &request, mode)?;

    for warning in &output.warnings {
        eprintln!("warning: {warning}");
    }

    let paths = output.save_all(&args.output)?;
    for path in &paths {
        println!("wrote {}", path.display());
    }

    if !args.no_symbol_map {
        let base = BasePorts::new(
            args.control_base_port,
            args.data_base_port,
            args.launcher_base_port,
            args.fedlink_base_port,
        );
        let map = SymbolMap::build(&assignment, request.flavor, base)?;
        let path = args.output.join("symbol_map.txt");
        map.save(&path)?;
        println!("wrote {}", path.display());
    }

    if !assignment.unassigned_channels.is_empty() {
        eprintln!(
            "note: {} channel(s) left unassigned",
            assignment.unassigned_channels.len()
        );
    }

    Ok(())
}
