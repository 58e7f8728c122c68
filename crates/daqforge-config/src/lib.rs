//! Configuration-document synthesis and symbol-map emission.
//!
//! This crate turns a topology assignment plus derived resource profiles
//! into the artifacts the external control layer consumes:
//!
//! - **Documents**: hierarchical context/application/property trees,
//!   composed by deep-copying reusable fragments from a
//!   [`FragmentLibrary`] and patching identifiers, endpoint tokens and
//!   resource parameters into them ([`Synthesizer`]).
//! - **Symbol map**: the flat `KEY value` host/port resolution table
//!   ([`SymbolMap`]) that resolves the endpoint tokens the documents carry.
//!
//! Templates are read-only and shared; every clone is exclusively owned by
//! the synthesizer run that made it. Synthesis is deterministic: identical
//! inputs produce byte-identical serialized documents.
//!
//! # Example
//!
//! ```rust
//! use daqforge_config::{FragmentLibrary, OutputMode, Synthesizer};
//! use daqforge_core::{ResourceSet, TopologyRequest};
//! use daqforge_topology::distribute;
//!
//! let request = TopologyRequest::new(4, 4, 2, 2);
//! let assignment = distribute(None, &request).unwrap();
//! let resources = ResourceSet::derive(&request, 2, 2, 2).unwrap();
//!
//! let library = FragmentLibrary::builtin().unwrap();
//! let synthesizer = Synthesizer::new(&library);
//! let output = synthesizer
//!     .synthesize(&assignment, &resources, &request, OutputMode::Monolithic)
//!     .unwrap();
//! assert_eq!(output.documents.len(), 1);
//! ```

mod builtin_fragments;
mod document;
mod error;
mod fragments;
mod symbol_map;
mod synthesizer;

pub use document::{ApplicationNode, ConfigurationDocument, ContextNode, PropertyValue};
pub use error::{ConsistencyWarning, DocumentError, SymbolMapError, SynthError};
pub use fragments::{FragmentKey, FragmentLibrary, FragmentRole, FragmentSource};
pub use symbol_map::{BasePorts, SymbolMap, SymbolMapEntry};
pub use synthesizer::{NamedDocument, OutputMode, SynthesisOutput, Synthesizer, expected_tcp_cwnd};
