// Error taxonomy for the engine, pool, and write paths

use thiserror::Error;

/// Errors surfaced by the engine lifecycle and channel acquisition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine is already initialized")]
    AlreadyInitialized,

    #[error("engine is not initialized")]
    NotInitialized,

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("failed to spawn drain thread: {0}")]
    DrainSpawn(String),

    #[error("drain thread panicked")]
    DrainPanicked,
}

/// Errors from the fixed-size channel registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("no free channel slots remain (pool size {pool_size})")]
    Exhausted { pool_size: usize },

    #[error("requested channel capacity must be greater than zero")]
    InvalidCapacity,
}

/// Per-write failures. Both are returned to the immediate caller and never
/// unwind or terminate the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// The channel was full and the engine runs the drop-on-full policy.
    /// The loss is also counted in the channel's `lost_total`.
    #[error("line dropped: channel full")]
    Dropped,

    /// The engine was deinitialized while this handle was still live.
    #[error("engine is shut down")]
    ShutDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PoolError::Exhausted { pool_size: 4 }.to_string(),
            "no free channel slots remain (pool size 4)"
        );
        assert_eq!(WriteError::Dropped.to_string(), "line dropped: channel full");
        assert_eq!(
            EngineError::AlreadyInitialized.to_string(),
            "engine is already initialized"
        );
    }

    #[test]
    fn test_pool_error_converts_to_engine_error() {
        let err: EngineError = PoolError::InvalidCapacity.into();
        assert_eq!(err, EngineError::Pool(PoolError::InvalidCapacity));
    }
}
