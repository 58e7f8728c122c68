//! Clone-template-then-patch document composition.
//!
//! For every node of an assigned topology the synthesizer fetches the
//! matching fragment by (flavor, transport, role) key, deep-copies it, and
//! patches identifiers, endpoint tokens and resource parameters into the
//! copy. Endpoint values stay symbolic (`RU2_DATA_HOST_NAME`); the symbol
//! map resolves them later.
//!
//! In the `Evb` flavor readout unit 0 doubles as the event manager: its
//! context is synthesized from the event-manager fragment under the `EVM`
//! role, and the remaining readout units keep their dense indices.

use std::path::{Path, PathBuf};

use daqforge_core::{BuilderFlavor, ReadoutChannel, ResourceSet, TopologyRequest};
use daqforge_topology::Assignment;
use tracing::debug;

use crate::document::{ApplicationNode, ConfigurationDocument, ContextNode, PropertyValue};
use crate::error::{ConsistencyWarning, SynthError};
use crate::fragments::{FragmentKey, FragmentLibrary, FragmentRole};

/// Class tag of the front-end controller application.
const CONTROLLER_CLASS: &str = "ferol::Controller";

/// Operation modes a controller fragment may carry.
const OPERATION_MODES: &[&str] = &["SINGLE_LINK", "DUAL_LINK"];

/// Expected TCP congestion window by streams per readout unit.
///
/// Values outside this table's expectation produce a [`ConsistencyWarning`],
/// not a failure; synthesis continues with the as-configured value.
const TCP_CWND_TABLE: &[(usize, i64)] = &[(4, 135_000), (8, 80_000), (12, 53_000), (16, 40_000)];

/// Expected congestion window for a streams-per-readout-unit count, if the
/// table covers it.
pub fn expected_tcp_cwnd(streams_per_readout_unit: usize) -> Option<i64> {
    TCP_CWND_TABLE
        .iter()
        .find(|(streams, _)| *streams == streams_per_readout_unit)
        .map(|(_, cwnd)| *cwnd)
}

/// Whether to emit one document or one per physical node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// One document describing every role.
    #[default]
    Monolithic,
    /// One document per readout unit / builder unit / controller, each
    /// holding only that node's own context (peer endpoints travel inside
    /// the context as symbolic tokens).
    Split,
}

/// A synthesized document with its output name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedDocument {
    /// File stem for output (`configuration`, `ru-1`, `ferol-3`, ...).
    pub name: String,
    /// The document itself.
    pub document: ConfigurationDocument,
}

/// Result of a synthesis run: documents plus accumulated warnings.
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    /// Documents in enumeration order.
    pub documents: Vec<NamedDocument>,
    /// Non-fatal consistency findings.
    pub warnings: Vec<ConsistencyWarning>,
}

impl SynthesisOutput {
    /// Write every document to `<dir>/<name>.toml`; returns the paths.
    pub fn save_all(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, SynthError> {
        let dir = dir.as_ref();
        let mut paths = Vec::with_capacity(self.documents.len());
        for named in &self.documents {
            let path = dir.join(format!("{}.toml", named.name));
            named.document.save(&path)?;
            paths.push(path);
        }
        Ok(paths)
    }
}

/// The document synthesizer.
///
/// Borrows a read-only fragment library; every clone it makes is owned by
/// the run and never written back to the library.
pub struct Synthesizer<'a> {
    library: &'a FragmentLibrary,
}

impl<'a> Synthesizer<'a> {
    /// Create a synthesizer over a fragment library.
    pub fn new(library: &'a FragmentLibrary) -> Self {
        Self { library }
    }

    /// Compose documents for an assigned topology.
    pub fn synthesize(
        &self,
        assignment: &Assignment,
        resources: &ResourceSet,
        request: &TopologyRequest,
        mode: OutputMode,
    ) -> Result<SynthesisOutput, SynthError> {
        let mut warnings = Vec::new();
        let mut contexts = Vec::new();

        let unit_tokens = unit_tokens(assignment, request.flavor);
        let bu_tokens: Vec<String> = (0..assignment.builder_units.len())
            .map(|i| format!("BU{i}"))
            .collect();

        // Standalone event manager first (Gevb only; in Evb it rides on
        // readout unit 0 below).
        if request.flavor == BuilderFlavor::Gevb {
            let context = self.unit_context(
                request,
                resources,
                FragmentRole::EventManager,
                0,
                None,
                peer_endpoints(&bu_tokens, &[]),
            )?;
            contexts.push(context);
        }

        for unit in &assignment.readout_units {
            let role = match unit_tokens[unit.index].role {
                UnitRole::EventManager => FragmentRole::EventManager,
                UnitRole::Readout => FragmentRole::ReadoutUnit,
            };
            let fed_ids: Vec<i64> = unit.fed_ids().iter().map(|f| i64::from(f.0)).collect();
            let peers = match role {
                FragmentRole::EventManager => peer_endpoints(&bu_tokens, &[]),
                _ => {
                    let evm: Vec<String> = evm_token(assignment, request.flavor)
                        .into_iter()
                        .collect();
                    peer_endpoints(&evm, &bu_tokens)
                }
            };
            let context = self.unit_context(
                request,
                resources,
                role,
                unit_tokens[unit.index].instance,
                Some(fed_ids),
                peers,
            )?;
            contexts.push(context);
        }

        for bu in &assignment.builder_units {
            let evm: Vec<String> = evm_token(assignment, request.flavor).into_iter().collect();
            let ru_tokens: Vec<String> = assignment
                .readout_units
                .iter()
                .filter(|u| unit_tokens[u.index].role == UnitRole::Readout)
                .map(|u| unit_tokens[u.index].token())
                .collect();
            let context = self.unit_context(
                request,
                resources,
                FragmentRole::BuilderUnit,
                bu.index as u32,
                None,
                peer_endpoints(&evm, &ru_tokens),
            )?;
            contexts.push(context);
        }

        let mut ferol_instance = 0u32;
        for unit in &assignment.readout_units {
            let owner = unit_tokens[unit.index].token();
            for channel in &unit.channels {
                let context = self.controller_context(
                    request,
                    ferol_instance,
                    channel,
                    &owner,
                    &mut warnings,
                )?;
                contexts.push(context);
                ferol_instance += 1;
            }
        }

        let documents = match mode {
            OutputMode::Monolithic => {
                let mut document = ConfigurationDocument::new("daqforge configuration");
                document.contexts = contexts;
                vec![NamedDocument {
                    name: "configuration".to_string(),
                    document,
                }]
            }
            OutputMode::Split => contexts
                .into_iter()
                .map(|context| {
                    let name = format!("{}-{}", context.role.to_lowercase(), context.instance);
                    let mut document =
                        ConfigurationDocument::new(format!("{} {}", context.role, context.instance));
                    document.contexts.push(context);
                    NamedDocument { name, document }
                })
                .collect(),
        };

        debug!(
            documents = documents.len(),
            warnings = warnings.len(),
            "synthesis complete"
        );
        Ok(SynthesisOutput {
            documents,
            warnings,
        })
    }

    fn fetch(&self, key: FragmentKey) -> Result<&ConfigurationDocument, SynthError> {
        self.library
            .get(&key)
            .ok_or_else(|| SynthError::MissingFragment {
                key: key.to_string(),
            })
    }

    /// Deep-copy a template's context and patch instance and URL tokens.
    fn clone_context(
        &self,
        key: FragmentKey,
        instance: u32,
    ) -> Result<ContextNode, SynthError> {
        let template = self.fetch(key)?;
        let Some(context) = template.contexts.first() else {
            return Err(SynthError::MissingApplication {
                class: "<context>".to_string(),
                fragment: key.to_string(),
            });
        };

        let mut context = context.clone();
        context.instance = instance;
        context.url = context.url.replace("%INSTANCE%", &instance.to_string());
        for application in &mut context.applications {
            application.instance = instance;
        }
        Ok(context)
    }

    /// Synthesize one unit context (event manager, readout or builder unit).
    fn unit_context(
        &self,
        request: &TopologyRequest,
        resources: &ResourceSet,
        role: FragmentRole,
        instance: u32,
        fed_ids: Option<Vec<i64>>,
        peers: Vec<String>,
    ) -> Result<ContextNode, SynthError> {
        let key = FragmentKey::new(request.flavor, request.transport, role);
        let mut context = self.clone_context(key, instance)?;

        let class = unit_class(request.flavor, role);
        let app = application_mut(&mut context, class, key)?;
        if let Some(fed_ids) = fed_ids {
            set_required(app, key, "FED_SOURCE_IDS", fed_ids)?;
        }
        set_required(app, key, "PEER_ENDPOINTS", peers)?;

        let profile = match role {
            FragmentRole::EventManager => resources.event_manager,
            FragmentRole::BuilderUnit => resources.builder_unit,
            FragmentRole::ReadoutUnit | FragmentRole::Controller => resources.readout_unit,
        };
        let transport = application_mut(&mut context, request.transport.application_class(), key)?;
        set_required(transport, key, "SEND_POOL_BYTES", profile.send_pool_bytes)?;
        set_required(transport, key, "RECV_POOL_BYTES", profile.recv_pool_bytes)?;
        set_required(
            transport,
            key,
            "COMPLETION_QUEUE_DEPTH",
            profile.completion_queue_depth,
        )?;
        set_required(transport, key, "SEND_QUEUE_DEPTH", profile.send_queue_depth)?;
        set_required(transport, key, "RECV_QUEUE_DEPTH", profile.recv_queue_depth)?;

        debug!(key = %key, instance, "unit context synthesized");
        Ok(context)
    }

    /// Synthesize one front-end controller context.
    fn controller_context(
        &self,
        request: &TopologyRequest,
        instance: u32,
        channel: &ReadoutChannel,
        owner_token: &str,
        warnings: &mut Vec<ConsistencyWarning>,
    ) -> Result<ContextNode, SynthError> {
        let key = FragmentKey::new(request.flavor, request.transport, FragmentRole::Controller);
        let mut context = self.clone_context(key, instance)?;
        let app = application_mut(&mut context, CONTROLLER_CLASS, key)?;

        validate_modes(app, key)?;
        check_tcp_cwnd(app, key, instance, request.streams_per_readout_unit(), warnings)?;

        let fed = |index: usize| -> i64 {
            channel
                .slots
                .get(index)
                .and_then(|s| s.fed_id)
                .map_or(-1, |f| i64::from(f.0))
        };
        let efed = |index: usize| -> (i64, i64) {
            channel
                .slots
                .get(index)
                .and_then(|s| s.efed)
                .map_or((-1, -1), |e| (i64::from(e.slice), i64::from(e.slot)))
        };

        set_required(app, key, "FED_ID_0", fed(0))?;
        set_required(app, key, "FED_ID_1", fed(1))?;
        let (slice0, slot0) = efed(0);
        let (slice1, slot1) = efed(1);
        set_required(app, key, "EFED_SLICE_0", slice0)?;
        set_required(app, key, "EFED_SLOT_0", slot0)?;
        set_required(app, key, "EFED_SLICE_1", slice1)?;
        set_required(app, key, "EFED_SLOT_1", slot1)?;

        let operation_mode = if request.streams_per_channel == 2 {
            "DUAL_LINK"
        } else {
            "SINGLE_LINK"
        };
        set_required(app, key, "OPERATION_MODE", operation_mode)?;
        set_required(app, key, "TRIGGER_MODE", request.trigger.mode_name())?;
        set_required(
            app,
            key,
            "DESTINATION_HOST",
            format!("{owner_token}_DATA_HOST_NAME"),
        )?;
        set_required(
            app,
            key,
            "DESTINATION_PORT",
            format!("{owner_token}_FEDLINK_PORT"),
        )?;

        debug!(instance, controller = %channel.controller, "controller context synthesized");
        Ok(context)
    }
}

/// How a readout-unit index surfaces in documents and the symbol map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitRole {
    EventManager,
    Readout,
}

#[derive(Debug, Clone, Copy)]
struct UnitToken {
    role: UnitRole,
    instance: u32,
}

impl UnitToken {
    fn token(&self) -> String {
        match self.role {
            UnitRole::EventManager => format!("EVM{}", self.instance),
            UnitRole::Readout => format!("RU{}", self.instance),
        }
    }
}

/// Role/instance tokens for every readout unit, indexed by unit index.
fn unit_tokens(assignment: &Assignment, flavor: BuilderFlavor) -> Vec<UnitToken> {
    assignment
        .readout_units
        .iter()
        .map(|unit| {
            if flavor == BuilderFlavor::Evb && unit.index == 0 {
                UnitToken {
                    role: UnitRole::EventManager,
                    instance: 0,
                }
            } else {
                UnitToken {
                    role: UnitRole::Readout,
                    instance: unit.index as u32,
                }
            }
        })
        .collect()
}

/// The event-manager token for this topology, when one exists.
fn evm_token(assignment: &Assignment, flavor: BuilderFlavor) -> Option<String> {
    match flavor {
        BuilderFlavor::Evb => assignment
            .readout_units
            .first()
            .map(|_| "EVM0".to_string()),
        BuilderFlavor::Gevb => Some("EVM0".to_string()),
    }
}

/// `HOST:PORT` endpoint token pairs for two ordered peer groups.
fn peer_endpoints(first: &[String], second: &[String]) -> Vec<String> {
    first
        .iter()
        .chain(second.iter())
        .map(|token| format!("{token}_DATA_HOST_NAME:{token}_DATA_PORT"))
        .collect()
}

/// Class tag of the role application for a flavor.
fn unit_class(flavor: BuilderFlavor, role: FragmentRole) -> &'static str {
    match (flavor, role) {
        (BuilderFlavor::Evb, FragmentRole::EventManager) => "evb::EVM",
        (BuilderFlavor::Evb, FragmentRole::ReadoutUnit) => "evb::RU",
        (BuilderFlavor::Evb, FragmentRole::BuilderUnit) => "evb::BU",
        (BuilderFlavor::Gevb, FragmentRole::EventManager) => "gevb::EVM",
        (BuilderFlavor::Gevb, FragmentRole::ReadoutUnit) => "gevb::RU",
        (BuilderFlavor::Gevb, FragmentRole::BuilderUnit) => "gevb::BU",
        (_, FragmentRole::Controller) => CONTROLLER_CLASS,
    }
}

fn application_mut<'c>(
    context: &'c mut ContextNode,
    class: &str,
    key: FragmentKey,
) -> Result<&'c mut ApplicationNode, SynthError> {
    context
        .application_mut(class)
        .ok_or_else(|| SynthError::MissingApplication {
            class: class.to_string(),
            fragment: key.to_string(),
        })
}

/// Overwrite a property the fragment must already declare.
fn set_required(
    app: &mut ApplicationNode,
    key: FragmentKey,
    name: &str,
    value: impl Into<PropertyValue>,
) -> Result<(), SynthError> {
    if app.patch_property(name, value) {
        Ok(())
    } else {
        Err(SynthError::MissingProperty {
            property: name.to_string(),
            fragment: key.to_string(),
        })
    }
}

/// Validate the mode names a controller fragment carries.
fn validate_modes(app: &ApplicationNode, key: FragmentKey) -> Result<(), SynthError> {
    let trigger = app
        .property("TRIGGER_MODE")
        .ok_or_else(|| SynthError::MissingProperty {
            property: "TRIGGER_MODE".to_string(),
            fragment: key.to_string(),
        })?;
    let trigger = trigger.as_text().unwrap_or_default();
    if daqforge_core::TriggerSource::from_mode_name(trigger).is_none() {
        return Err(SynthError::UnknownMode {
            mode: trigger.to_string(),
            fragment: key.to_string(),
        });
    }

    let operation = app
        .property("OPERATION_MODE")
        .ok_or_else(|| SynthError::MissingProperty {
            property: "OPERATION_MODE".to_string(),
            fragment: key.to_string(),
        })?;
    let operation = operation.as_text().unwrap_or_default();
    if !OPERATION_MODES.contains(&operation) {
        return Err(SynthError::UnknownMode {
            mode: operation.to_string(),
            fragment: key.to_string(),
        });
    }
    Ok(())
}

/// Compare the configured congestion windows with the table expectation.
fn check_tcp_cwnd(
    app: &ApplicationNode,
    key: FragmentKey,
    instance: u32,
    streams_per_readout_unit: usize,
    warnings: &mut Vec<ConsistencyWarning>,
) -> Result<(), SynthError> {
    for property in ["TCP_CWND_FED0", "TCP_CWND_FED1"] {
        let configured = app
            .property(property)
            .ok_or_else(|| SynthError::MissingProperty {
                property: property.to_string(),
                fragment: key.to_string(),
            })?
            .as_integer()
            .unwrap_or(-1);

        match expected_tcp_cwnd(streams_per_readout_unit) {
            Some(expected) if expected != configured => {
                warnings.push(ConsistencyWarning {
                    context: format!("FEROL{instance}"),
                    property: property.to_string(),
                    expected,
                    configured,
                });
            }
            Some(_) => {}
            None => {
                debug!(
                    streams_per_readout_unit,
                    "no congestion-window expectation for this key"
                );
            }
        }
    }
    Ok(())
}
