//! Data and configuration engine for the etho annotator
//!
//! The annotator GUI lets a user draw regions of interest (chambers and
//! animals) on a video frame and fill in a job-configuration form; this crate
//! is everything underneath that is not a widget:
//! - [`domain`]: typed ROI shapes and the rotation-aware center math
//! - [`keypath`]: the dotted-key ⇄ nested-mapping transform used by the form
//! - [`config`]: the `!include`-aware YAML resolver and profile discovery
//! - [`document`]: the persisted `<movie>_analysis.yaml` document
//!
//! Rendering, event handling and video decoding live in the GUI layer and
//! never appear here.

use std::path::PathBuf;

use thiserror::Error;

pub mod config;
pub mod document;
pub mod domain;
pub mod keypath;

/// Errors produced by the annotation and configuration engine.
///
/// Every failure is a deterministic parse or lookup failure; nothing here is
/// transient and nothing is retried. A missing annotation file is *not* an
/// error (see [`document::AnnotationDocument::load`]).
#[derive(Debug, Error)]
pub enum Error {
    /// A file could not be read or written.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document exists but does not parse as valid YAML.
    #[error("malformed document {}: {source}", path.display())]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An `!include` reference points at a file that does not exist.
    #[error("!include target {} not found (referenced from {})", target.display(), from.display())]
    MissingInclude { target: PathBuf, from: PathBuf },

    /// An `!include` tag carries something other than a path string.
    #[error("!include in {} expects a path string", from.display())]
    BadIncludeTag { from: PathBuf },

    /// Include resolution recursed past the depth cap, almost certainly a
    /// self- or mutually-referential include chain.
    #[error("include chain deeper than {max} levels at {}", path.display())]
    IncludeCycle { path: PathBuf, max: usize },

    /// Profile assembly was requested but the profile directory is absent.
    #[error("profile directory {} does not exist", path.display())]
    MissingProfileDirectory { path: PathBuf },

    /// The job schema has no selector node with an `options` field.
    #[error("no selector node with an `options` field in the job schema")]
    MissingSelector,

    /// A serialized ROI collection has parallel sequences of unequal length.
    #[error("`{field}` has {found} entries but `nb_rois` is {expected}")]
    RoundTripMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
