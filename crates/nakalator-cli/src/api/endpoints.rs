//! API endpoint URL builders
//!
//! Identifiers are DOIs (`10.34847/nkl.xxxx`); Nakala expects the slash
//! unescaped in the path.

/// File upload endpoint
pub fn uploads_url(base_url: &str) -> String {
    format!("{}/datas/uploads", base_url)
}

/// Data creation endpoint
pub fn datas_url(base_url: &str) -> String {
    format!("{}/datas", base_url)
}

/// Single data resource
pub fn data_url(base_url: &str, data_id: &str) -> String {
    format!("{}/datas/{}", base_url, data_id)
}

/// Collection creation endpoint
pub fn collections_url(base_url: &str) -> String {
    format!("{}/collections", base_url)
}

/// Single collection
pub fn collection_url(base_url: &str, collection_id: &str) -> String {
    format!("{}/collections/{}", base_url, collection_id)
}
