use thiserror::Error;

/// Errors surfaced by the engine facade.
///
/// These are caller-facing: expected delivery failures never land here, they
/// are recorded in item state and broadcast on the event bus.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Engine construction or configuration failed.
    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),

    /// A queue operation was rejected.
    #[error(transparent)]
    Queue(#[from] core_queue::QueueError),

    /// The cache layer could not be read or written.
    #[error(transparent)]
    Cache(#[from] core_cache::CacheError),

    /// A collection fetch could not be orchestrated.
    #[error(transparent)]
    Collection(#[from] core_collections::CollectionError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
