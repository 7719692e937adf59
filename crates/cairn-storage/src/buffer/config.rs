//! Buffer pool configuration.

use cairn_common::constants::{DEFAULT_NUM_INSTANCES, DEFAULT_POOL_SIZE};

/// Configuration for a buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of page frames per buffer-pool instance.
    pub pool_size: usize,
    /// Number of independent instances in a parallel pool.
    pub num_instances: usize,
}

impl BufferPoolConfig {
    /// Creates a new configuration with the specified frames per instance.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            num_instances: DEFAULT_NUM_INSTANCES,
        }
    }

    /// Sets the number of parallel instances.
    pub fn with_instances(mut self, num_instances: usize) -> Self {
        self.num_instances = num_instances;
        self
    }

    /// Returns the total number of frames across all instances.
    pub fn total_frames(&self) -> usize {
        self.pool_size * self.num_instances
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.pool_size == 0 {
            return Err("pool_size must be > 0");
        }
        if self.num_instances == 0 {
            return Err("num_instances must be > 0");
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}
