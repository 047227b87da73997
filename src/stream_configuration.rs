//! Configuration types for rs2-observe operations

/// Buffer configuration for the async bridge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Maximum number of values buffered before the consumer polls them.
    /// `None` buffers without limit.
    pub capacity: Option<usize>,
}

impl BridgeConfig {
    /// Create an unbounded configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the buffer. Pushing past a full buffer errors the subscription
    /// with `StreamError::BufferOverflow`.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Remove any bound on the buffer
    pub fn unbounded(mut self) -> Self {
        self.capacity = None;
        self
    }
}
