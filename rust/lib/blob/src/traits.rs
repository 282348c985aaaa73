use crate::error::BlobError;

/// BlobStore holds uploaded documents and photos: QC documents, delivery
/// receipts, transfer proofs, installation photos.
///
/// Keys are path-like strings such as `qc/MC-001/3fa2c1-report.pdf`.
pub trait BlobStore: Send + Sync {
    /// Store a blob. Overwrites if the key already exists.
    fn put(&self, key: &str, data: &[u8]) -> Result<(), BlobError>;

    /// Retrieve a blob. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError>;

    /// Delete a blob. No-op if the key does not exist.
    fn delete(&self, key: &str) -> Result<(), BlobError>;

    fn exists(&self, key: &str) -> Result<bool, BlobError>;
}

/// Store an upload under `{prefix}/{short-id}-{file_name}` and return the key.
///
/// The file name is reduced to `[A-Za-z0-9._-]` so user input never shapes
/// the directory layout.
pub fn store_upload(
    store: &dyn BlobStore,
    prefix: &str,
    file_name: &str,
    data: &[u8],
) -> Result<String, BlobError> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut clean: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    clean = clean.trim_start_matches('.').to_string();
    if clean.is_empty() {
        clean = "upload".to_string();
    }
    let id = invctl_core::new_id();
    let key = format!("{}/{}-{}", prefix.trim_matches('/'), &id[..8], clean);
    store.put(&key, data)?;
    Ok(key)
}
