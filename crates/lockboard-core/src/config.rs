//! Client configuration.

/// Page size used by `get_contents` when the caller gives none.
pub const DEFAULT_CONTENTS_LIMIT: usize = 1000;

/// Page size used by `get_channels` when the caller gives none.
pub const DEFAULT_CHANNELS_LIMIT: usize = 100;

/// Board client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// Default page size for content listings
    pub contents_limit: usize,
    /// Default page size for channel listings
    pub channels_limit: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self { contents_limit: DEFAULT_CONTENTS_LIMIT, channels_limit: DEFAULT_CHANNELS_LIMIT }
    }
}
