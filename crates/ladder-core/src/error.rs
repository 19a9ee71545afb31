//! This module contains the [`LadderError`] type, the error type shared by every
//! component of this crate.

use std::fmt;

/// Represents any error that can happen while merging, ranking, encoding, or querying a
/// ranking.
///
/// To be handled by an outer request layer, each kind maps to a numeric code through
/// [`LadderError::to_api_error`]. `100..=199` are storage/codec failures; `199` is reserved
/// for invariant violations that should never happen outside of a corrupted blob or a bug
/// in this crate.
#[derive(thiserror::Error, Debug)]
pub enum LadderError {
    /// The blob header's magic number didn't match [`crate::codec::MAGIC`].
    ///
    /// This either means the blob is foreign-endian or it isn't a ranking blob at all; this
    /// crate never attempts to byte-swap, it just fails fast.
    #[error("bad magic number, expected {expected:#010X}, found {found:#010X}")]
    BadMagic {
        /// The expected magic number.
        expected: u32,
        /// The magic number actually read.
        found: u32,
    },
    /// The blob header declared a codec version this crate doesn't know how to decode.
    #[error("unsupported ranking blob version {0}")]
    UnsupportedVersion(u32),
    /// A read ran past the end of the available bytes.
    #[error("truncated ranking data: needed {needed} bytes, got {got}")]
    Truncated {
        /// The number of bytes the read required.
        needed: usize,
        /// The number of bytes actually available.
        got: usize,
    },
    /// [`crate::store::RankingStore::save`] was asked to persist more than `i32::MAX` bytes.
    #[error("encoded ranking blob is too large ({0} bytes)")]
    BlobTooLarge(usize),
    /// The windowed binary search in [`crate::lookup`] didn't converge within its iteration
    /// cap; this guards against a corrupted or unsorted blob spinning forever.
    #[error("could not find team {team_id} after {iterations} iterations in ranking {ranking_id}")]
    SearchLoop {
        /// The team id being searched for.
        team_id: u32,
        /// The ranking id being searched in.
        ranking_id: u32,
        /// The number of iterations performed before giving up.
        iterations: u32,
    },
    /// An invariant that this crate relies on was violated. Always logged at `error` level
    /// before propagating; never silently swallowed.
    #[error("bug: {0}")]
    Bug(String),
    /// An error surfaced by the [`crate::identity::IdentityStore`] or
    /// [`crate::store::RankingStore`] collaborator.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// An opaque error from an external collaborator (the identity store or ranking store).
///
/// The concrete SQL/Redis implementation of those traits is out of this crate's scope, so
/// this just boxes whatever error type the collaborator produced.
#[derive(Debug)]
pub struct StoreError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl StoreError {
    /// Wraps an arbitrary error coming from an [`crate::identity::IdentityStore`] or
    /// [`crate::store::RankingStore`] implementation.
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Box::new(err))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}

/// Shortcut for building a [`LadderError::Bug`], mirroring the `internal!` helper of the
/// teacher crate this was adapted from.
#[macro_export]
macro_rules! bug {
    ($($t:tt)*) => {{
        $crate::error::LadderError::Bug($crate::error::__private::format!($($t)*))
    }};
}

#[doc(hidden)]
pub mod __private {
    pub use std::format;
}

/// The wire-level `{code, message}` shape errors are reported as at a request boundary.
///
/// Nothing in this crate builds the socket response itself, but this is the contract type
/// an outer layer would serialize.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiError {
    /// The numeric error code.
    pub code: i32,
    /// A human-readable description.
    pub message: String,
}

impl LadderError {
    /// Returns the numeric code associated with this error, and logs it if it is a
    /// [`LadderError::Bug`].
    pub fn to_api_error(&self) -> ApiError {
        if matches!(self, LadderError::Bug(_)) {
            tracing::error!(error = %self, "invariant violated");
        }
        let code = match self {
            LadderError::BadMagic { .. } => 100,
            LadderError::UnsupportedVersion(_) => 101,
            LadderError::Truncated { .. } => 102,
            LadderError::BlobTooLarge(_) => 103,
            LadderError::SearchLoop { .. } => 104,
            LadderError::Store(_) => 110,
            LadderError::Bug(_) => 199,
        };
        ApiError {
            code,
            message: self.to_string(),
        }
    }
}

/// Shortcut for the result type returned throughout this crate.
pub type LadderResult<T = ()> = Result<T, LadderError>;
