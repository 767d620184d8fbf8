use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing store could not be read or written.
    #[error("Cache storage error: {0}")]
    Storage(String),

    /// An entry could not be serialized.
    #[error("Cache codec error: {0}")]
    Codec(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
