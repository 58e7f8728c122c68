//! Fragment library listing and display.

use std::path::PathBuf;

use anyhow::{anyhow, bail};
use clap::Args;
use daqforge_config::{FragmentKey, FragmentLibrary, FragmentRole, FragmentSource};
use daqforge_core::{BuilderFlavor, PeerTransport};

#[derive(Args)]
pub struct FragmentsArgs {
    /// Show one fragment's TOML (key format: flavor/transport/role,
    /// e.g. evb/ibv/ru)
    #[arg(value_name = "KEY")]
    pub key: Option<String>,

    /// Directory of fragment overrides to layer over the built-ins
    #[arg(long, value_name = "DIR")]
    pub fragments_dir: Option<PathBuf>,
}

/// Parse a `flavor/transport/role` key string.
fn parse_key(text: &str) -> anyhow::Result<FragmentKey> {
    let parts: Vec<&str> = text.split('/').collect();
    let [flavor, transport, role] = parts[..] else {
        bail!("key must be flavor/transport/role, e.g. evb/ibv/ru");
    };

    let flavor = match flavor {
        "evb" => BuilderFlavor::Evb,
        "gevb" => BuilderFlavor::Gevb,
        other => bail!("unknown flavor '{other}' (expected evb or gevb)"),
    };
    let transport = match transport {
        "ibv" => PeerTransport::Ibv,
        "utcp" => PeerTransport::Utcp,
        other => bail!("unknown transport '{other}' (expected ibv or utcp)"),
    };
    let role = match role {
        "evm" => FragmentRole::EventManager,
        "ru" => FragmentRole::ReadoutUnit,
        "bu" => FragmentRole::BuilderUnit,
        "ferol" => FragmentRole::Controller,
        other => bail!("unknown role '{other}' (expected evm, ru, bu or ferol)"),
    };
    Ok(FragmentKey::new(flavor, transport, role))
}

pub fn run(args: FragmentsArgs) -> anyhow::Result<()> {
    let library = match &args.fragments_dir {
        Some(dir) => FragmentLibrary::with_overrides(dir)?,
        None => FragmentLibrary::builtin()?,
    };

    if let Some(key_text) = &args.key {
        let key = parse_key(key_text)?;
        let document = library
            .get(&key)
            .ok_or_else(|| anyhow!("no fragment for key '{key}'"))?;
        print!("{}", document.to_toml()?);
        return Ok(());
    }

    println!("Fragment library");
    println!("================");
    for (key, source) in library.list() {
        let origin = match source {
            FragmentSource::BuiltIn => "built-in".to_string(),
            FragmentSource::Override(path) => format!("override {}", path.display()),
        };
        println!("  {:18} {}", key.to_string(), origin);
    }
    println!();
    println!("Use 'daqforge fragments <flavor/transport/role>' for the TOML.");

    Ok(())
}
