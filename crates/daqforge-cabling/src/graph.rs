//! The in-memory cabling graph and its membership queries.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use daqforge_core::{FedId, StreamSlot};
use serde::Serialize;
use tracing::{debug, warn};

use crate::device::{Device, HostRole, classify_host};
use crate::error::{CablingError, InventoryKind};
use crate::parse::{ControllerRecord, FrontEndEntry, parse_builder_line, parse_frontend_line};

/// Narrowing filters applied while loading inventories.
///
/// `None` for a dimension means "accept everything".
#[derive(Debug, Clone, Default)]
pub struct InventoryFilters {
    switches: Option<HashSet<String>>,
    feds: Option<HashSet<FedId>>,
    hosts: Option<HashSet<String>>,
}

impl InventoryFilters {
    /// Accept everything.
    pub fn none() -> Self {
        Self::default()
    }

    /// Only load records on the named switches.
    pub fn with_switches<S: Into<String>>(mut self, switches: impl IntoIterator<Item = S>) -> Self {
        self.switches = Some(switches.into_iter().map(Into::into).collect());
        self
    }

    /// Only keep the named FED ids on stream slots.
    pub fn with_feds(mut self, feds: impl IntoIterator<Item = FedId>) -> Self {
        self.feds = Some(feds.into_iter().collect());
        self
    }

    /// Only load the named hosts.
    pub fn with_hosts<S: Into<String>>(mut self, hosts: impl IntoIterator<Item = S>) -> Self {
        self.hosts = Some(hosts.into_iter().map(Into::into).collect());
        self
    }

    fn accepts_switch(&self, switch: &str) -> bool {
        self.switches.as_ref().is_none_or(|s| s.contains(switch))
    }

    fn accepts_fed(&self, fed: FedId) -> bool {
        self.feds.as_ref().is_none_or(|f| f.contains(&fed))
    }

    fn accepts_host(&self, host: &str) -> bool {
        self.hosts.as_ref().is_none_or(|h| h.contains(host))
    }
}

/// Recoverable findings collected while loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CablingDiagnostic {
    /// A syntactically valid record that classifies into no known role.
    MissingMapping {
        /// Inventory the record came from.
        inventory: InventoryKind,
        /// 1-based line number.
        line_no: usize,
        /// Switch the record hangs off.
        switch: String,
        /// The unclassifiable device entry.
        entry: String,
    },
}

impl std::fmt::Display for CablingDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CablingDiagnostic::MissingMapping {
                line_no,
                switch,
                entry,
                ..
            } => write!(
                f,
                "line {line_no}: no role mapping for '{entry}' on switch '{switch}'"
            ),
        }
    }
}

/// One builder-fabric port and what is plugged into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortLink {
    /// Peer device name.
    pub peer: String,
    /// Port on the peer side.
    pub peer_port: String,
    /// Whether the port is blacklisted (excluded from role inventories).
    pub blacklisted: bool,
    /// Free-text annotation from the inventory.
    pub comment: String,
}

/// Compact, serializable graph overview for `inspect`.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSummary {
    /// Front-end switches.
    pub frontend_switches: usize,
    /// Builder switches.
    pub builder_switches: usize,
    /// Front-end controllers.
    pub controllers: usize,
    /// Readout hosts (both fabrics, deduplicated).
    pub readout_hosts: usize,
    /// Builder hosts (non-blacklisted).
    pub builder_hosts: usize,
    /// Blacklisted builder ports.
    pub blacklisted_ports: usize,
    /// FED ids known to the graph.
    pub fed_ids: usize,
}

/// Lookup structures over both fabrics.
///
/// Built once by [`CablingGraph::load`]; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct CablingGraph {
    /// Front-end fabric: switch → devices in file order.
    frontend: BTreeMap<String, Vec<Device>>,
    /// Builder fabric: switch → port → link (blacklisted ports included).
    builder_ports: BTreeMap<String, BTreeMap<String, PortLink>>,
    /// Inverse index: host → (switch, port) on the builder fabric.
    host_locations: HashMap<String, (String, String)>,
    /// Readout hosts per switch, both fabrics, file order, deduplicated.
    readout_hosts: BTreeMap<String, Vec<String>>,
    /// Non-blacklisted builder hosts per switch, file order.
    builder_hosts_by_switch: BTreeMap<String, Vec<String>>,
    /// Non-blacklisted builder hosts in global discovery order.
    builder_hosts_global: Vec<String>,
    /// Non-blacklisted event-manager hosts in global discovery order.
    event_manager_hosts: Vec<String>,
}

impl CablingGraph {
    /// Parse both inventories into a graph.
    ///
    /// Malformed lines abort the load; records that merely fail role
    /// classification come back as [`CablingDiagnostic`]s beside the graph.
    pub fn load(
        frontend: &str,
        builder: &str,
        filters: &InventoryFilters,
    ) -> Result<(Self, Vec<CablingDiagnostic>), CablingError> {
        let mut graph = CablingGraph::default();
        let mut diagnostics = Vec::new();

        for (idx, line) in frontend.lines().enumerate() {
            let line_no = idx + 1;
            let Some((switch, entry)) = parse_frontend_line(line_no, line)? else {
                continue;
            };
            if !filters.accepts_switch(&switch) {
                debug!(switch = %switch, line_no, "front-end record filtered out by switch");
                continue;
            }
            graph.ingest_frontend_entry(switch, entry, line_no, filters, &mut diagnostics);
        }

        for (idx, line) in builder.lines().enumerate() {
            let line_no = idx + 1;
            let Some(record) = parse_builder_line(line_no, line)? else {
                continue;
            };
            if !filters.accepts_switch(&record.switch) {
                debug!(switch = %record.switch, line_no, "builder record filtered out by switch");
                continue;
            }
            if !filters.accepts_host(&record.peer) {
                debug!(peer = %record.peer, line_no, "builder record filtered out by host");
                continue;
            }
            graph.ingest_builder_record(record, line_no, &mut diagnostics);
        }

        for diagnostic in &diagnostics {
            warn!(%diagnostic, "inventory diagnostic");
        }

        Ok((graph, diagnostics))
    }

    fn ingest_frontend_entry(
        &mut self,
        switch: String,
        entry: FrontEndEntry,
        line_no: usize,
        filters: &InventoryFilters,
        diagnostics: &mut Vec<CablingDiagnostic>,
    ) {
        match entry {
            FrontEndEntry::Controller(record) => {
                if !filters.accepts_host(&record.tag) {
                    debug!(tag = %record.tag, "controller filtered out by host");
                    return;
                }
                let device = controller_device(record, filters);
                self.frontend.entry(switch).or_default().push(device);
            }
            FrontEndEntry::ReadoutHost(hostname) => {
                if !filters.accepts_host(&hostname) {
                    debug!(hostname = %hostname, "readout host filtered out");
                    return;
                }
                push_unique(
                    self.readout_hosts.entry(switch.clone()).or_default(),
                    &hostname,
                );
                self.frontend
                    .entry(switch)
                    .or_default()
                    .push(Device::ReadoutHost { hostname });
            }
            FrontEndEntry::Unrecognized(entry) => {
                self.frontend.entry(switch.clone()).or_default().push(Device::Unknown {
                    name: entry.clone(),
                });
                diagnostics.push(CablingDiagnostic::MissingMapping {
                    inventory: InventoryKind::FrontEnd,
                    line_no,
                    switch,
                    entry,
                });
            }
        }
    }

    fn ingest_builder_record(
        &mut self,
        record: crate::parse::BuilderRecord,
        line_no: usize,
        diagnostics: &mut Vec<CablingDiagnostic>,
    ) {
        let link = PortLink {
            peer: record.peer.clone(),
            peer_port: record.peer_port,
            blacklisted: record.blacklisted,
            comment: record.comment,
        };

        // Raw adjacency keeps every port, blacklisted or not.
        self.builder_ports
            .entry(record.switch.clone())
            .or_default()
            .insert(record.port.clone(), link);
        self.host_locations
            .entry(record.peer.clone())
            .or_insert_with(|| (record.switch.clone(), record.port.clone()));

        if record.blacklisted {
            debug!(peer = %record.peer, switch = %record.switch, "port blacklisted, excluded from role inventories");
            return;
        }

        match classify_host(&record.peer) {
            HostRole::Readout => {
                push_unique(
                    self.readout_hosts.entry(record.switch).or_default(),
                    &record.peer,
                );
            }
            HostRole::Builder => {
                push_unique(
                    self.builder_hosts_by_switch.entry(record.switch).or_default(),
                    &record.peer,
                );
                push_unique(&mut self.builder_hosts_global, &record.peer);
            }
            HostRole::EventManager => {
                push_unique(&mut self.event_manager_hosts, &record.peer);
            }
            HostRole::Controller => {
                // Legitimate peer, just not part of any role inventory here.
            }
            HostRole::Unknown => {
                diagnostics.push(CablingDiagnostic::MissingMapping {
                    inventory: InventoryKind::Builder,
                    line_no,
                    switch: record.switch,
                    entry: record.peer,
                });
            }
        }
    }

    /// Front-end switches, sorted.
    pub fn switches(&self) -> impl Iterator<Item = &str> {
        self.frontend.keys().map(String::as_str)
    }

    /// Builder-fabric switches, sorted.
    pub fn builder_switches(&self) -> impl Iterator<Item = &str> {
        self.builder_ports.keys().map(String::as_str)
    }

    /// Every device on a front-end switch, in file order.
    pub fn devices_on_switch(&self, switch: &str) -> Result<&[Device], CablingError> {
        self.frontend
            .get(switch)
            .map(Vec::as_slice)
            .ok_or_else(|| CablingError::not_found("switch", switch))
    }

    /// Front-end controllers on a switch, in file order.
    pub fn controllers_on_switch(&self, switch: &str) -> Result<Vec<&Device>, CablingError> {
        Ok(self
            .devices_on_switch(switch)?
            .iter()
            .filter(|d| d.is_controller())
            .collect())
    }

    /// Readout hosts on a switch (either fabric).
    pub fn readout_hosts_on_switch(&self, switch: &str) -> Result<&[String], CablingError> {
        self.readout_hosts
            .get(switch)
            .map(Vec::as_slice)
            .ok_or_else(|| CablingError::not_found("switch", switch))
    }

    /// Non-blacklisted builder hosts: on one switch, or globally in
    /// discovery order.
    pub fn builder_hosts(&self, switch: Option<&str>) -> Result<&[String], CablingError> {
        match switch {
            Some(switch) => self
                .builder_hosts_by_switch
                .get(switch)
                .map(Vec::as_slice)
                .ok_or_else(|| CablingError::not_found("switch", switch)),
            None => Ok(&self.builder_hosts_global),
        }
    }

    /// Non-blacklisted event-manager hosts in global discovery order.
    pub fn event_manager_hosts(&self) -> &[String] {
        &self.event_manager_hosts
    }

    /// Builder-fabric location of a host.
    pub fn location_of_host(&self, host: &str) -> Result<(&str, &str), CablingError> {
        self.host_locations
            .get(host)
            .map(|(s, p)| (s.as_str(), p.as_str()))
            .ok_or_else(|| CablingError::not_found("host", host))
    }

    /// Raw builder-fabric adjacency lookup; blacklisted ports resolve too.
    pub fn port_link(&self, switch: &str, port: &str) -> Result<&PortLink, CablingError> {
        self.builder_ports
            .get(switch)
            .ok_or_else(|| CablingError::not_found("switch", switch))?
            .get(port)
            .ok_or_else(|| CablingError::not_found("port", format!("{switch}/{port}")))
    }

    /// All FED ids known to the graph, sorted and deduplicated.
    pub fn fed_ids(&self) -> Vec<FedId> {
        let set: BTreeSet<FedId> = self
            .frontend
            .values()
            .flatten()
            .filter_map(|device| match device {
                Device::FrontEndController { slots, .. } => Some(slots),
                _ => None,
            })
            .flatten()
            .filter_map(|slot| slot.fed_id)
            .collect();
        set.into_iter().collect()
    }

    /// Compact overview for `inspect`.
    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            frontend_switches: self.frontend.len(),
            builder_switches: self.builder_ports.len(),
            controllers: self
                .frontend
                .values()
                .flatten()
                .filter(|d| d.is_controller())
                .count(),
            readout_hosts: {
                let set: BTreeSet<&str> = self
                    .readout_hosts
                    .values()
                    .flatten()
                    .map(String::as_str)
                    .collect();
                set.len()
            },
            builder_hosts: self.builder_hosts_global.len(),
            blacklisted_ports: self
                .builder_ports
                .values()
                .flat_map(|ports| ports.values())
                .filter(|link| link.blacklisted)
                .count(),
            fed_ids: self.fed_ids().len(),
        }
    }
}

/// Build a controller [`Device`] from its record, applying the FED filter.
fn controller_device(record: ControllerRecord, filters: &InventoryFilters) -> Device {
    let keep = |fed: Option<u32>| -> Option<FedId> {
        let fed = FedId(fed?);
        if filters.accepts_fed(fed) {
            Some(fed)
        } else {
            debug!(%fed, tag = %record.tag, "fed id filtered out");
            None
        }
    };

    let mut slots = vec![StreamSlot {
        index: 0,
        fed_id: keep(record.fed1),
        efed: None,
    }];
    if record.fed2.is_some() {
        slots.push(StreamSlot {
            index: 1,
            fed_id: keep(record.fed2),
            efed: None,
        });
    }

    Device::FrontEndController {
        tag: record.tag,
        crate_no: record.crate_no,
        slot: record.slot,
        slots,
        host: record.host,
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
