//! Runtime capabilities the PNG decoder may rely on.

use serde::{Deserialize, Serialize};

/// Decided once by the host and handed to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderCapabilities {
    /// Extract a single named member from a tar archive instead of unpacking
    /// all of it. When false, first-frame-only requests unpack the whole
    /// archive and a warning is logged.
    pub partial_archive_extraction: bool,
}

impl Default for DecoderCapabilities {
    fn default() -> Self {
        Self {
            partial_archive_extraction: true,
        }
    }
}

impl DecoderCapabilities {
    /// Capabilities of a host that can only unpack whole archives.
    pub fn full_extraction_only() -> Self {
        Self {
            partial_archive_extraction: false,
        }
    }
}
