//! Per-call options for board operations.

/// Options for `create_channel`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Board flavor; `"whiteboard"` when absent
    pub kind: Option<String>,
}

/// Options for `get_channels`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelListOptions {
    /// Only list channels of this flavor; every flavor when absent
    pub kind: Option<String>,
    /// Page size override
    pub channels_limit: Option<usize>,
}

/// Options for `get_contents`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentOptions {
    /// Page size override
    pub contents_limit: Option<usize>,
}

/// Options for `delete_channel`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Refuse to delete a channel that is currently active
    pub prevent_delete_active_channel: bool,
}

/// Options for `add_image`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageOptions {
    /// Stored as the `displayName` metadata entry of the image record
    pub display_name: Option<String>,
}

/// A binary file to upload.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// MIME type, e.g. `image/png`
    pub mime_type: String,
    /// Plaintext bytes
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// File with the given MIME type and contents.
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { mime_type: mime_type.into(), bytes }
    }

    /// Plaintext size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl std::fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFile")
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}
