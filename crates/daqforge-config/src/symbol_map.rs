//! Symbol map: the flat host/port resolution table.
//!
//! One entry per node in the topology, in discovery order. Node *n* gets
//! `base + n` in every port family, so ports never collide across the rig.
//! The rendered format is `KEY value` lines, beginning with the four
//! base-port definitions and grouped with blank-line separators by role
//! family:
//!
//! ```text
//! CONTROL_BASE_PORT 21000
//! DATA_BASE_PORT 31000
//! LAUNCHER_BASE_PORT 17000
//! FEDLINK_BASE_PORT 10000
//!
//! EVM0_CONTROL_HOST_NAME ru-c2e12-11
//! EVM0_CONTROL_PORT 21000
//! ...
//! ```

use std::fmt::Write as _;
use std::path::Path;

use daqforge_core::{BuilderFlavor, RoleFamily};
use daqforge_topology::Assignment;
use tracing::debug;

use crate::error::{DocumentError, SymbolMapError};

/// The four required base ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasePorts {
    /// Control-plane (request/response) base port.
    pub control: u16,
    /// Data-plane base port.
    pub data: u16,
    /// Out-of-band launcher base port.
    pub launcher: u16,
    /// Front-end-link base port.
    pub fed_link: u16,
}

impl BasePorts {
    /// Create from all four ports.
    pub const fn new(control: u16, data: u16, launcher: u16, fed_link: u16) -> Self {
        Self {
            control,
            data,
            launcher,
            fed_link,
        }
    }

    /// Create from possibly missing ports; any absent family is a hard
    /// [`SymbolMapError::IncompleteBasePorts`].
    pub fn from_partial(
        control: Option<u16>,
        data: Option<u16>,
        launcher: Option<u16>,
        fed_link: Option<u16>,
    ) -> Result<Self, SymbolMapError> {
        let require = |port: Option<u16>, missing: &'static str| {
            port.ok_or(SymbolMapError::IncompleteBasePorts { missing })
        };
        Ok(Self {
            control: require(control, "control")?,
            data: require(data, "data")?,
            launcher: require(launcher, "launcher")?,
            fed_link: require(fed_link, "fed-link")?,
        })
    }
}

/// One resolved node in the symbol map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMapEntry {
    /// Role family of the node.
    pub family: RoleFamily,
    /// Index within the family.
    pub index: usize,
    /// Resolved hostname.
    pub hostname: String,
    /// Control-plane port.
    pub control_port: u16,
    /// Data-plane port.
    pub data_port: u16,
    /// Launcher port.
    pub launcher_port: u16,
    /// Front-end-link port.
    pub fed_link_port: u16,
}

impl SymbolMapEntry {
    fn key_prefix(&self) -> String {
        format!("{}{}", self.family.key_prefix(), self.index)
    }
}

/// The complete symbol map for one topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMap {
    base: BasePorts,
    entries: Vec<SymbolMapEntry>,
}

impl SymbolMap {
    /// Build the map from a resolved topology.
    ///
    /// Enumeration order: event manager, readout units, builder units,
    /// front-end controllers (in readout-unit order). A node without a
    /// resolved hostname fails here, not during assignment.
    pub fn build(
        assignment: &Assignment,
        flavor: BuilderFlavor,
        base: BasePorts,
    ) -> Result<Self, SymbolMapError> {
        let mut entries = Vec::new();
        let mut node = 0usize;

        let mut push = |family: RoleFamily,
                        index: usize,
                        hostname: Option<&str>,
                        node: &mut usize|
         -> Result<(), SymbolMapError> {
            let hostname = hostname
                .ok_or(SymbolMapError::UnresolvedHost {
                    role: family,
                    index,
                })?
                .to_string();
            let offset = |base_port: u16| -> Result<u16, SymbolMapError> {
                let port = u32::from(base_port) + *node as u32;
                u16::try_from(port).map_err(|_| SymbolMapError::PortRange {
                    role: family,
                    index,
                })
            };
            entries.push(SymbolMapEntry {
                family,
                index,
                hostname,
                control_port: offset(base.control)?,
                data_port: offset(base.data)?,
                launcher_port: offset(base.launcher)?,
                fed_link_port: offset(base.fed_link)?,
            });
            *node += 1;
            Ok(())
        };

        match flavor {
            BuilderFlavor::Evb => {
                // Readout unit 0 doubles as the event manager.
                if let Some(first) = assignment.readout_units.first() {
                    push(
                        RoleFamily::EventManager,
                        0,
                        first.hostname.as_deref(),
                        &mut node,
                    )?;
                }
                for unit in assignment.readout_units.iter().skip(1) {
                    push(
                        RoleFamily::ReadoutUnit,
                        unit.index,
                        unit.hostname.as_deref(),
                        &mut node,
                    )?;
                }
            }
            BuilderFlavor::Gevb => {
                push(
                    RoleFamily::EventManager,
                    0,
                    assignment.event_manager_host.as_deref(),
                    &mut node,
                )?;
                for unit in &assignment.readout_units {
                    push(
                        RoleFamily::ReadoutUnit,
                        unit.index,
                        unit.hostname.as_deref(),
                        &mut node,
                    )?;
                }
            }
        }

        for unit in &assignment.builder_units {
            push(
                RoleFamily::BuilderUnit,
                unit.index,
                unit.hostname.as_deref(),
                &mut node,
            )?;
        }

        let mut controller = 0usize;
        for unit in &assignment.readout_units {
            for channel in &unit.channels {
                push(
                    RoleFamily::Controller,
                    controller,
                    channel.controller_host.as_deref(),
                    &mut node,
                )?;
                controller += 1;
            }
        }

        debug!(entries = entries.len(), "symbol map built");
        Ok(Self { base, entries })
    }

    /// All entries in enumeration order.
    pub fn entries(&self) -> &[SymbolMapEntry] {
        &self.entries
    }

    /// Entry for a family and index.
    pub fn entry(&self, family: RoleFamily, index: usize) -> Option<&SymbolMapEntry> {
        self.entries
            .iter()
            .find(|e| e.family == family && e.index == index)
    }

    /// Render the `KEY value` text form.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "CONTROL_BASE_PORT {}", self.base.control);
        let _ = writeln!(out, "DATA_BASE_PORT {}", self.base.data);
        let _ = writeln!(out, "LAUNCHER_BASE_PORT {}", self.base.launcher);
        let _ = writeln!(out, "FEDLINK_BASE_PORT {}", self.base.fed_link);

        let mut previous_family: Option<RoleFamily> = None;
        for entry in &self.entries {
            if previous_family != Some(entry.family) {
                out.push('\n');
                previous_family = Some(entry.family);
            }
            let prefix = entry.key_prefix();
            let _ = writeln!(out, "{prefix}_CONTROL_HOST_NAME {}", entry.hostname);
            let _ = writeln!(out, "{prefix}_CONTROL_PORT {}", entry.control_port);
            if entry.family == RoleFamily::Controller {
                let _ = writeln!(out, "{prefix}_FEDLINK_PORT {}", entry.fed_link_port);
                let _ = writeln!(out, "{prefix}_LAUNCHER_PORT {}", entry.launcher_port);
            } else {
                let _ = writeln!(out, "{prefix}_DATA_HOST_NAME {}", entry.hostname);
                let _ = writeln!(out, "{prefix}_DATA_PORT {}", entry.data_port);
                let _ = writeln!(out, "{prefix}_LAUNCHER_PORT {}", entry.launcher_port);
            }
        }
        out
    }

    /// Write the rendered map to a file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SymbolMapError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| DocumentError::create_dir(parent, e))
                .map_err(SymbolMapError::Document)?;
        }
        std::fs::write(path, self.render())
            .map_err(|e| DocumentError::write_file(path, e))
            .map_err(SymbolMapError::Document)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daqforge_core::{BuilderUnitNode, FedId, ReadoutChannel, ReadoutUnitNode, StreamSlot};
    use daqforge_topology::Assignment;

    fn base() -> BasePorts {
        BasePorts::new(21000, 31000, 17000, 10000)
    }

    fn resolved_assignment() -> Assignment {
        let mut ru0 = ReadoutUnitNode::new(0).with_hostname("ru-c2e12-11");
        ru0.channels.push(
            ReadoutChannel::new("frl-c1-01", vec![StreamSlot::new(0, FedId(1000))])
                .with_host("frlpc-c1-01"),
        );
        let mut ru1 = ReadoutUnitNode::new(1).with_hostname("ru-c2e12-12");
        ru1.channels.push(
            ReadoutChannel::new("frl-c1-02", vec![StreamSlot::new(0, FedId(1001))])
                .with_host("frlpc-c1-02"),
        );

        Assignment {
            readout_units: vec![ru0, ru1],
            builder_units: vec![
                BuilderUnitNode::new(0).with_hostname("bu-c2e18-02"),
                BuilderUnitNode::new(1).with_hostname("bu-c2e18-03"),
            ],
            event_manager_host: Some("ru-c2e12-11".to_string()),
            unassigned_channels: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn from_partial_requires_all_four_ports() {
        let err = BasePorts::from_partial(Some(21000), Some(31000), None, Some(10000))
            .expect_err("missing launcher must fail");
        assert!(matches!(
            err,
            SymbolMapError::IncompleteBasePorts { missing: "launcher" }
        ));
    }

    #[test]
    fn ports_are_dense_across_families() {
        let map = SymbolMap::build(&resolved_assignment(), BuilderFlavor::Evb, base()).unwrap();

        // Evb: EVM0 (= ru0), RU1, BU0, BU1, FEROL0, FEROL1.
        assert_eq!(map.entries().len(), 6);
        let control_ports: Vec<u16> = map.entries().iter().map(|e| e.control_port).collect();
        assert_eq!(control_ports, vec![21000, 21001, 21002, 21003, 21004, 21005]);

        let evm = map.entry(RoleFamily::EventManager, 0).unwrap();
        assert_eq!(evm.hostname, "ru-c2e12-11");
        assert_eq!(evm.data_port, 31000);

        let ferol1 = map.entry(RoleFamily::Controller, 1).unwrap();
        assert_eq!(ferol1.hostname, "frlpc-c1-02");
        assert_eq!(ferol1.fed_link_port, 10005);
    }

    #[test]
    fn gevb_keeps_every_readout_unit_and_adds_evm() {
        let mut assignment = resolved_assignment();
        assignment.event_manager_host = Some("evm-c2e12-40".to_string());
        let map = SymbolMap::build(&assignment, BuilderFlavor::Gevb, base()).unwrap();

        // EVM0, RU0, RU1, BU0, BU1, FEROL0, FEROL1.
        assert_eq!(map.entries().len(), 7);
        assert_eq!(
            map.entry(RoleFamily::EventManager, 0).unwrap().hostname,
            "evm-c2e12-40"
        );
        assert!(map.entry(RoleFamily::ReadoutUnit, 0).is_some());
    }

    #[test]
    fn unresolved_hostname_fails_at_build_time() {
        let mut assignment = resolved_assignment();
        assignment.readout_units[1].hostname = None;
        let err = SymbolMap::build(&assignment, BuilderFlavor::Evb, base())
            .expect_err("unresolved host must fail");
        assert!(matches!(
            err,
            SymbolMapError::UnresolvedHost {
                role: RoleFamily::ReadoutUnit,
                index: 1
            }
        ));
    }

    #[test]
    fn render_begins_with_base_ports_and_groups_by_family() {
        let map = SymbolMap::build(&resolved_assignment(), BuilderFlavor::Evb, base()).unwrap();
        let text = map.render();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("CONTROL_BASE_PORT 21000"));
        assert_eq!(lines.next(), Some("DATA_BASE_PORT 31000"));
        assert_eq!(lines.next(), Some("LAUNCHER_BASE_PORT 17000"));
        assert_eq!(lines.next(), Some("FEDLINK_BASE_PORT 10000"));
        assert_eq!(lines.next(), Some(""));

        assert!(text.contains("EVM0_CONTROL_HOST_NAME ru-c2e12-11"));
        assert!(text.contains("RU1_DATA_PORT 31001"));
        assert!(text.contains("FEROL0_FEDLINK_PORT 10004"));
        // Family groups are separated by blank lines: EVM, RU, BU, FEROL.
        assert_eq!(text.matches("\n\n").count(), 4);
    }

    #[test]
    fn port_overflow_is_an_error() {
        let map = SymbolMap::build(
            &resolved_assignment(),
            BuilderFlavor::Evb,
            BasePorts::new(65534, 31000, 17000, 10000),
        );
        assert!(matches!(map, Err(SymbolMapError::PortRange { .. })));
    }

    #[test]
    fn save_writes_rendered_map() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("maps").join("symbol_map.txt");
        let map = SymbolMap::build(&resolved_assignment(), BuilderFlavor::Evb, base()).unwrap();

        map.save(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, map.render());
    }
}
