//! Desktop implementations of the bridge capabilities.
//!
//! - [`ReqwestTransport`] - HTTP transport over a pooled `reqwest` client,
//!   with multipart upload for submission attachments
//! - [`SqliteKeyValueStore`] - durable key-value storage over SQLite
//!
//! Mobile hosts implement the same `bridge-traits` capabilities over their
//! platform stacks; this crate exists so desktop builds and integration
//! environments work out of the box.

pub mod store;
pub mod transport;

pub use store::SqliteKeyValueStore;
pub use transport::ReqwestTransport;
