//! Dry-run assignment view.

use clap::Args;
use daqforge_topology::distribute;

use crate::commands::common::{InventoryArgs, RequestArgs, build_request, load_graph};

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    #[command(flatten)]
    pub inventory: InventoryArgs,

    /// Print every FED id instead of just counts
    #[arg(long)]
    pub feds: bool,
}

pub fn run(args: PlanArgs) -> anyhow::Result<()> {
    let request = build_request(&args.request)?;
    let loaded = load_graph(&args.inventory)?;
    let assignment = distribute(loaded.as_ref().map(|(graph, _)| graph), &request)?;

    println!("Readout units");
    println!("=============");
    for unit in &assignment.readout_units {
        let hostname = unit.hostname.as_deref().unwrap_or("-");
        let fed_ids = unit.fed_ids();
        if args.feds {
            let ids: Vec<String> = fed_ids.iter().map(|f| f.to_string()).collect();
            println!(
                "  RU{:<3} {:24} channels={:<3} feds=[{}]",
                unit.index,
                hostname,
                unit.channels.len(),
                ids.join(", ")
            );
        } else {
            println!(
                "  RU{:<3} {:24} channels={:<3} feds={}",
                unit.index,
                hostname,
                unit.channels.len(),
                fed_ids.len()
            );
        }
    }

    println!();
    println!("Builder units");
    println!("=============");
    for unit in &assignment.builder_units {
        println!(
            "  BU{:<3} {}",
            unit.index,
            unit.hostname.as_deref().unwrap_or("-")
        );
    }

    if let Some(host) = &assignment.event_manager_host {
        println!();
        println!("Event manager: {host}");
    }

    if !assignment.unassigned_channels.is_empty() {
        println!();
        println!("Unassigned channels");
        println!("===================");
        for channel in &assignment.unassigned_channels {
            println!("  {}", channel.controller);
        }
    }

    if !assignment.diagnostics.is_empty() {
        println!();
        println!("Diagnostics");
        println!("===========");
        for diagnostic in &assignment.diagnostics {
            println!("  {diagnostic}");
        }
    }

    Ok(())
}
