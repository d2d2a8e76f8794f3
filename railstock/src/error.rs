//! Error types for vehicle asset resolution.
//!
//! Every fatal outcome of a single resolution is a [`ResolveError`]. The bulk
//! scanner logs and skips these; callers resolving a vehicle the user picked
//! surface them. Numbering-list failures are deliberately absent here: they
//! are recoverable and never escape resolution (see
//! [`NumberingError`](crate::vehicle::NumberingError)).

use std::io;

use thiserror::Error;

use crate::blueprint::DecodeError;
use crate::identity::BlueprintIdentity;
use crate::vehicle::VehicleKind;

/// Result type for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Coarse classification of a [`ResolveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveErrorKind {
    InvalidAssetPath,
    NotFound,
    DecodeFailure,
    UnrecognizedBlueprint,
    MissingField,
    ReskinChainRejected,
    ReskinInfoMissing,
    ExtractionFailure,
    NotAPreload,
    PreloadCycle,
    PreloadTooDeep,
}

/// Errors that abort a single vehicle resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The asset path has fewer than three segments.
    #[error("invalid asset path '{0}': expected Provider\\Product\\Blueprint")]
    InvalidAssetPath(String),

    /// The resource is absent from the loose-file tier and every archive.
    #[error("unable to load vehicle: {path} not found")]
    NotFound { path: String },

    /// The bytes are not a valid blueprint encoding.
    #[error("failed to load vehicle blueprint {path}: {source}")]
    DecodeFailure {
        path: String,
        #[source]
        source: DecodeError,
    },

    /// Decoded, but no engine, wagon, tender, consist or reskin node.
    #[error("{path} is not an engine, wagon, tender, preload or reskin blueprint")]
    UnrecognizedBlueprint { path: String },

    /// A mandatory blueprint field is absent.
    #[error("{path}: blueprint is missing required field '{field}'")]
    MissingField { path: String, field: &'static str },

    /// A reskin was reached where the context forbids reskins.
    #[error("{path}: reskin found but not accepted")]
    ReskinChainRejected { path: String },

    /// The reskin does not name a usable base blueprint.
    #[error("cannot get vehicle information from reskin blueprint {path}: {reason}")]
    ReskinInfoMissing { path: String, reason: String },

    /// Reading the loose file or extracting the archive entry failed.
    #[error("failed to extract {path}: {source}")]
    ExtractionFailure {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Flattening was requested for a vehicle that is not a preload.
    #[error("can only list preload vehicles of a preload, {identity} is a {kind}")]
    NotAPreload {
        identity: BlueprintIdentity,
        kind: VehicleKind,
    },

    /// A consist entry refers back to a preload currently being expanded.
    #[error("preload {identity} includes itself through its consist entries")]
    PreloadCycle { identity: BlueprintIdentity },

    /// Preloads are nested deeper than the configured limit.
    #[error("preload nesting exceeds {max_depth} levels at {identity}")]
    PreloadTooDeep {
        identity: BlueprintIdentity,
        max_depth: usize,
    },
}

impl ResolveError {
    /// Classify this error.
    pub fn kind(&self) -> ResolveErrorKind {
        match self {
            Self::InvalidAssetPath(_) => ResolveErrorKind::InvalidAssetPath,
            Self::NotFound { .. } => ResolveErrorKind::NotFound,
            Self::DecodeFailure { .. } => ResolveErrorKind::DecodeFailure,
            Self::UnrecognizedBlueprint { .. } => ResolveErrorKind::UnrecognizedBlueprint,
            Self::MissingField { .. } => ResolveErrorKind::MissingField,
            Self::ReskinChainRejected { .. } => ResolveErrorKind::ReskinChainRejected,
            Self::ReskinInfoMissing { .. } => ResolveErrorKind::ReskinInfoMissing,
            Self::ExtractionFailure { .. } => ResolveErrorKind::ExtractionFailure,
            Self::NotAPreload { .. } => ResolveErrorKind::NotAPreload,
            Self::PreloadCycle { .. } => ResolveErrorKind::PreloadCycle,
            Self::PreloadTooDeep { .. } => ResolveErrorKind::PreloadTooDeep,
        }
    }
}
