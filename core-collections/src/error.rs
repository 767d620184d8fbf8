use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectionError {
    /// The cache layer could not be read or written.
    #[error(transparent)]
    Cache(#[from] core_cache::CacheError),
}

pub type Result<T> = std::result::Result<T, CollectionError>;
