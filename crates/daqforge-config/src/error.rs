//! Error and warning types for synthesis and symbol-map emission.

use std::fmt;
use std::path::PathBuf;

use daqforge_core::{RoleFamily, SizingError};
use thiserror::Error;

/// Errors from reading, writing or (de)serializing documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Failed to read a file.
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a directory.
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML.
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl DocumentError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocumentError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocumentError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocumentError::CreateDir {
            path: path.into(),
            source,
        }
    }
}

/// Fatal synthesis errors.
///
/// Fragments are a contract: a property or application the patcher expects
/// but a fragment lacks means the fragment library is out of sync with the
/// synthesizer, and the whole run aborts.
#[derive(Debug, Error)]
pub enum SynthError {
    /// No fragment registered under the requested key.
    #[error("no fragment for key '{key}'")]
    MissingFragment {
        /// The (flavor, transport, role) key that missed.
        key: String,
    },

    /// A fragment lacks a property the patcher must fill.
    #[error("fragment '{fragment}' is missing property '{property}'")]
    MissingProperty {
        /// The absent property name.
        property: String,
        /// The fragment it should live in.
        fragment: String,
    },

    /// A fragment lacks an application the patcher must fill.
    #[error("fragment '{fragment}' is missing application '{class}'")]
    MissingApplication {
        /// The absent application class.
        class: String,
        /// The fragment it should live in.
        fragment: String,
    },

    /// A fragment carries a mode name outside the known enumeration.
    #[error("fragment '{fragment}' names unknown mode '{mode}'")]
    UnknownMode {
        /// The unrecognized mode name.
        mode: String,
        /// The fragment carrying it.
        fragment: String,
    },

    /// Resource sizing failed for a role.
    #[error(transparent)]
    Sizing(#[from] SizingError),

    /// Document I/O or serialization failed.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Non-fatal consistency finding.
///
/// Synthesis continues with the as-configured value; the warning is
/// surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyWarning {
    /// Context the finding is in (e.g. `FEROL3`).
    pub context: String,
    /// The property checked.
    pub property: String,
    /// Value the lookup table expects.
    pub expected: i64,
    /// Value the fragment is configured with.
    pub configured: i64,
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} configured as {} but {} expected for this topology",
            self.context, self.property, self.configured, self.expected
        )
    }
}

/// Fatal symbol-map errors.
#[derive(Debug, Error)]
pub enum SymbolMapError {
    /// One of the four required base ports is missing.
    #[error("incomplete base ports: missing {missing}")]
    IncompleteBasePorts {
        /// The absent port family.
        missing: &'static str,
    },

    /// A node has no resolved hostname.
    #[error("{role} {index} has no resolved hostname")]
    UnresolvedHost {
        /// Role family of the node.
        role: RoleFamily,
        /// Dense index of the node.
        index: usize,
    },

    /// A derived port fell outside the 16-bit range.
    #[error("{role} {index}: derived port exceeds 65535")]
    PortRange {
        /// Role family of the node.
        role: RoleFamily,
        /// Dense index of the node.
        index: usize,
    },

    /// Writing the map file failed.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn mock_io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "mock")
    }

    #[test]
    fn document_error_factories_carry_paths() {
        let err = DocumentError::read_file("/some/path", mock_io_err());
        assert!(matches!(err, DocumentError::ReadFile { ref path, .. }
            if path == std::path::Path::new("/some/path")));
        assert!(err.source().is_some());
    }

    #[test]
    fn missing_property_display_names_both_sides() {
        let err = SynthError::MissingProperty {
            property: "TCP_CWND_FED0".to_string(),
            fragment: "evb/utcp/ferol".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("TCP_CWND_FED0"), "got: {msg}");
        assert!(msg.contains("evb/utcp/ferol"), "got: {msg}");
    }

    #[test]
    fn consistency_warning_display() {
        let warning = ConsistencyWarning {
            context: "FEROL2".to_string(),
            property: "TCP_CWND_FED0".to_string(),
            expected: 80000,
            configured: 120000,
        };
        let msg = warning.to_string();
        assert!(msg.contains("FEROL2"));
        assert!(msg.contains("120000"));
        assert!(msg.contains("80000"));
    }

    #[test]
    fn unresolved_host_names_the_node() {
        let err = SymbolMapError::UnresolvedHost {
            role: RoleFamily::ReadoutUnit,
            index: 3,
        };
        assert_eq!(err.to_string(), "RU 3 has no resolved hostname");
    }
}
