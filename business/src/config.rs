use std::ops::RangeInclusive;

use qrdesk_input::CaptureConfig;

/// Tunables shared by the reader and generator controllers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessConfig {
    /// Number of scan records kept, most recent first. At least 1.
    pub history_limit: usize,
    pub capture: CaptureConfig,
    /// File stem used when an export has no usable name.
    pub default_export_name: String,
    /// Allowed pixel sizes for a saved code.
    pub code_sizes: RangeInclusive<u32>,
    /// Largest off-screen surface the rasterizer will allocate, per edge.
    pub max_surface_size: u32,
}

impl BusinessConfig {
    /// Sets the history size, raising 0 to 1.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn with_capture(mut self, capture: CaptureConfig) -> Self {
        self.capture = capture;
        self
    }
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            history_limit: 10,
            capture: CaptureConfig::default(),
            default_export_name: "qrcode".to_owned(),
            code_sizes: 100..=400,
            max_surface_size: 4096,
        }
    }
}
