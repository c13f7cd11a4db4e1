//! Error types for the flagging engine.

use thiserror::Error;

/// Errors raised before any data is read: an inconsistent [`FlagContext`]
/// or an unparseable selection.
///
/// [`FlagContext`]: crate::FlagContext
#[derive(Error, Debug)]
pub enum AmpflagError {
    /// A threshold was outside its documented domain. Validation happens
    /// once, before the (field, spw, pol) iteration begins.
    #[error("invalid value {value} for {param}: must be {expected}")]
    BadThreshold {
        /// Name of the offending [`crate::FlagContext`] field.
        param: &'static str,
        /// The value that was provided.
        value: f64,
        /// Human-readable domain, e.g. "finite and > 0".
        expected: &'static str,
    },

    /// A comma-separated spectral window selection contained something that
    /// is not a spectral window number.
    #[error("invalid spw selection {selection:?}: {reason}")]
    BadSpwSelection {
        /// The selection string as provided.
        selection: String,
        /// Why it could not be parsed.
        reason: String,
    },
}

/// Errors raised while reading a single (field, spw, pol) selection from a
/// [`SampleStore`].
///
/// These are expected conditions: the orchestrator logs them, records the
/// skipped combination and moves on, rather than aborting the run.
///
/// [`SampleStore`]: crate::SampleStore
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    /// The store holds no rows for this combination.
    #[error("no data for field {field:?}, spw {spw}, pol {pol}, intent {intent:?}")]
    NoData {
        /// Field name of the attempted selection.
        field: String,
        /// Spectral window of the attempted selection.
        spw: usize,
        /// Polarisation (correlation product) of the attempted selection.
        pol: usize,
        /// Scan intent of the attempted selection.
        intent: String,
    },

    /// The store failed for a backend-specific reason.
    #[error("unable to read field {field:?}, spw {spw}: {reason}")]
    Backend {
        /// Field name of the attempted selection.
        field: String,
        /// Spectral window of the attempted selection.
        spw: usize,
        /// Backend-specific failure description.
        reason: String,
    },

    /// The store returned a chunk whose parallel columns disagree, or whose
    /// antenna indices exceed the store's antenna count. Always a store
    /// bug, never a data property.
    #[error("bad chunk shape for {argument}: expected {expected}, got {received}")]
    BadChunkShape {
        /// Which column or index was wrong.
        argument: &'static str,
        /// What the engine expected.
        expected: String,
        /// What the store provided.
        received: String,
    },
}
