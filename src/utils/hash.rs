use sha2::Digest;
use sha2::Sha256;

/// Content hash of a rendered configuration document.
///
/// Every node renders the same document for the same change, so the
/// coordinator compares these hashes to detect divergence.
pub fn generate_hash(document: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document.as_bytes());
    hex::encode(hasher.finalize())
}
