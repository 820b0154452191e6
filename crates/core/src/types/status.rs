//! Load states for catalog records.

use serde::{Deserialize, Serialize};

/// Where a catalog record sits in the cache-first loading cycle.
///
/// ```text
/// Uncached ──request──▶ Loading ──ok──▶ Complete
///                          │
///                          └─err─▶ Failed ──request──▶ Loading
/// Stub ──detail request──▶ Loading
/// ```
///
/// `Complete` is terminal: a record never goes back to `Stub` or `Uncached`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// Nothing known about the handle.
    #[default]
    Uncached,
    /// A network request for the handle is in flight.
    Loading,
    /// Partial data (e.g. from a collection listing) is cached.
    Stub,
    /// Full data is cached; rendering never needs the network.
    Complete,
    /// The last request failed; the view shows an error state.
    Failed,
}

impl LoadState {
    /// Whether a render can happen without a network call.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Whether opening a view in this state needs a fetch.
    #[must_use]
    pub const fn needs_fetch(self) -> bool {
        matches!(self, Self::Uncached | Self::Stub | Self::Failed)
    }

    /// Short lowercase name, used in markup and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uncached => "uncached",
            Self::Loading => "loading",
            Self::Stub => "stub",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}
