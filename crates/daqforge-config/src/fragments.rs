//! Fragment library: reusable document templates keyed by
//! (flavor, transport, role).
//!
//! Built-in fragments are embedded at compile time and always available; an
//! optional override directory layers on top, with files named by the key
//! convention `<flavor>_<transport>_<role>.toml` (e.g. `evb_ibv_ru.toml`).
//! Overrides win over built-ins for the same key.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use daqforge_core::{BuilderFlavor, PeerTransport};
use tracing::{debug, warn};

use crate::builtin_fragments::BUILTIN_FRAGMENTS;
use crate::document::ConfigurationDocument;
use crate::error::DocumentError;

/// Role dimension of a fragment key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FragmentRole {
    /// Event manager.
    EventManager,
    /// Readout unit.
    ReadoutUnit,
    /// Builder unit.
    BuilderUnit,
    /// Front-end controller.
    Controller,
}

impl FragmentRole {
    /// Key token for this role.
    pub const fn token(&self) -> &'static str {
        match self {
            FragmentRole::EventManager => "evm",
            FragmentRole::ReadoutUnit => "ru",
            FragmentRole::BuilderUnit => "bu",
            FragmentRole::Controller => "ferol",
        }
    }

    /// All roles in key order.
    pub const fn all() -> [FragmentRole; 4] {
        [
            FragmentRole::EventManager,
            FragmentRole::ReadoutUnit,
            FragmentRole::BuilderUnit,
            FragmentRole::Controller,
        ]
    }
}

/// A (flavor, transport, role) fragment key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentKey {
    /// Builder flavor.
    pub flavor: BuilderFlavor,
    /// Peer transport.
    pub transport: PeerTransport,
    /// Role.
    pub role: FragmentRole,
}

impl FragmentKey {
    /// Create a key.
    pub const fn new(flavor: BuilderFlavor, transport: PeerTransport, role: FragmentRole) -> Self {
        Self {
            flavor,
            transport,
            role,
        }
    }

    /// Canonical string form, used for lookup and file naming.
    pub fn key_string(&self) -> String {
        format!(
            "{}_{}_{}",
            self.flavor.token(),
            self.transport.token(),
            self.role.token()
        )
    }

    /// File name the override directory uses for this key.
    pub fn file_name(&self) -> String {
        format!("{}.toml", self.key_string())
    }

    /// Every possible key, in deterministic order.
    pub fn all() -> impl Iterator<Item = FragmentKey> {
        [BuilderFlavor::Evb, BuilderFlavor::Gevb]
            .into_iter()
            .flat_map(|flavor| {
                [PeerTransport::Ibv, PeerTransport::Utcp]
                    .into_iter()
                    .flat_map(move |transport| {
                        FragmentRole::all()
                            .into_iter()
                            .map(move |role| FragmentKey::new(flavor, transport, role))
                    })
            })
    }
}

impl fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.flavor.token(),
            self.transport.token(),
            self.role.token()
        )
    }
}

/// Where a registered fragment came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentSource {
    /// Embedded built-in template.
    BuiltIn,
    /// Loaded from an override directory.
    Override(PathBuf),
}

/// Read-only, shared library of fragment templates.
#[derive(Debug, Clone)]
pub struct FragmentLibrary {
    templates: BTreeMap<String, (ConfigurationDocument, FragmentSource)>,
}

impl FragmentLibrary {
    /// Library of just the embedded built-in fragments.
    pub fn builtin() -> Result<Self, DocumentError> {
        let mut templates = BTreeMap::new();
        for (key, text) in BUILTIN_FRAGMENTS {
            let document = ConfigurationDocument::from_toml(text)?;
            templates.insert((*key).to_string(), (document, FragmentSource::BuiltIn));
        }
        Ok(Self { templates })
    }

    /// Built-ins layered under an override directory.
    ///
    /// Files named by the key convention replace the matching built-in;
    /// other `.toml` files are ignored with a warning.
    pub fn with_overrides(dir: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let mut library = Self::builtin()?;
        let dir = dir.as_ref();

        let known: Vec<String> = FragmentKey::all().map(|k| k.key_string()).collect();
        let Ok(entries) = std::fs::read_dir(dir) else {
            warn!(dir = %dir.display(), "override directory not readable, using built-ins only");
            return Ok(library);
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().map(|ext| ext == "toml").unwrap_or(false)
            })
            .collect();
        paths.sort();

        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !known.iter().any(|k| k == stem) {
                warn!(file = %path.display(), "file does not match any fragment key, ignored");
                continue;
            }
            let document = ConfigurationDocument::load(&path)?;
            debug!(key = stem, file = %path.display(), "fragment override loaded");
            library
                .templates
                .insert(stem.to_string(), (document, FragmentSource::Override(path)));
        }

        Ok(library)
    }

    /// Template for a key, if registered.
    pub fn get(&self, key: &FragmentKey) -> Option<&ConfigurationDocument> {
        self.templates.get(&key.key_string()).map(|(doc, _)| doc)
    }

    /// Source a key's template came from.
    pub fn source(&self, key: &FragmentKey) -> Option<&FragmentSource> {
        self.templates.get(&key.key_string()).map(|(_, src)| src)
    }

    /// Every registered key with its source, in key order.
    pub fn list(&self) -> Vec<(FragmentKey, &FragmentSource)> {
        FragmentKey::all()
            .filter_map(|key| self.source(&key).map(|src| (key, src)))
            .collect()
    }
}
