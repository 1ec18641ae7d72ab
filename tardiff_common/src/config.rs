/// Read buffer used while hashing member contents
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Width the change labels are right-aligned to ("Modified" is the longest)
pub const DEFAULT_LABEL_WIDTH: usize = 8;

/// Runtime settings for a comparison run
///
/// Nothing is read from disk or the environment; the CLI uses the defaults
/// and library callers may tune them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareConfig {
    pub buffer_size: usize,
    pub label_width: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            label_width: DEFAULT_LABEL_WIDTH,
        }
    }
}

impl CompareConfig {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn with_label_width(mut self, label_width: usize) -> Self {
        self.label_width = label_width;
        self
    }
}
