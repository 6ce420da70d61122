use serde::{Deserialize, Serialize};

/// Opaque resolved reference to audio data, produced by a `StreamResolver`
/// and consumed by a `PlaybackDevice`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamHandle {
    /// URL or path the device can open
    pub uri: String,

    /// MIME type if the provider reported one
    pub mime_type: Option<String>,

    /// Duration in milliseconds if the provider already knows it
    pub duration_ms: Option<u64>,
}

impl StreamHandle {
    /// Handle with only a URI
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: None,
            duration_ms: None,
        }
    }

    /// Attach a known duration
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Attach a MIME type
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}
