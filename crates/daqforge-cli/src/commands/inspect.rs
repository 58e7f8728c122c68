//! Cabling-graph inspection.

use anyhow::bail;
use clap::Args;

use crate::commands::common::{InventoryArgs, load_graph};

#[derive(Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub inventory: InventoryArgs,

    /// Emit the summary as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: InspectArgs) -> anyhow::Result<()> {
    let Some((graph, diagnostics)) = load_graph(&args.inventory)? else {
        bail!("inspect requires --frontend and --builder inventories");
    };

    let summary = graph.summary();

    if args.json {
        #[derive(serde::Serialize)]
        struct Report<'a> {
            summary: &'a daqforge_cabling::GraphSummary,
            diagnostics: &'a [daqforge_cabling::CablingDiagnostic],
        }
        let report = Report {
            summary: &summary,
            diagnostics: &diagnostics,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Cabling graph");
    println!("=============");
    println!("  front-end switches  {}", summary.frontend_switches);
    println!("  builder switches    {}", summary.builder_switches);
    println!("  controllers         {}", summary.controllers);
    println!("  readout hosts       {}", summary.readout_hosts);
    println!("  builder hosts       {}", summary.builder_hosts);
    println!("  blacklisted ports   {}", summary.blacklisted_ports);
    println!("  fed ids             {}", summary.fed_ids);

    println!();
    println!("Switches");
    println!("========");
    for switch in graph.switches() {
        let controllers = graph
            .controllers_on_switch(switch)
            .map(|c| c.len())
            .unwrap_or(0);
        let readout_hosts = graph
            .readout_hosts_on_switch(switch)
            .map(|h| h.len())
            .unwrap_or(0);
        println!("  {switch:20} controllers={controllers:<4} readout-hosts={readout_hosts}");
    }

    if !diagnostics.is_empty() {
        println!();
        println!("Diagnostics");
        println!("===========");
        for diagnostic in &diagnostics {
            println!("  {diagnostic}");
        }
    }

    Ok(())
}
