//! Query identity.
//!
//! A [`QueryKey`] identifies one logical list: an endpoint plus normalized
//! filters plus a page number. Filters live in a `BTreeMap` so the derived
//! signature is deterministic regardless of insertion order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a fetched collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    /// Remote endpoint path, e.g. "/v1/reports"
    pub endpoint: String,
    /// Normalized filter parameters
    pub filters: BTreeMap<String, String>,
    /// Page number (1-based)
    pub page: u32,
}

impl QueryKey {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            filters: BTreeMap::new(),
            page: 1,
        }
    }

    pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(name.into(), value.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Deterministic string form, used as the cache ledger key and as the
    /// per-list state key.
    pub fn signature(&self) -> String {
        let mut sig = self.endpoint.clone();
        let mut sep = '?';
        for (name, value) in &self.filters {
            sig.push(sep);
            sig.push_str(name);
            sig.push('=');
            sig.push_str(value);
            sep = '&';
        }
        sig.push('#');
        sig.push_str(&self.page.to_string());
        sig
    }

    /// Request path including query parameters, for the transport.
    pub fn request_path(&self) -> String {
        let mut path = self.endpoint.clone();
        let mut sep = '?';
        for (name, value) in &self.filters {
            path.push(sep);
            path.push_str(name);
            path.push('=');
            path.push_str(value);
            sep = '&';
        }
        path.push(sep);
        path.push_str("page=");
        path.push_str(&self.page.to_string());
        path
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}
