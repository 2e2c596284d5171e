use sha2::{Digest, Sha256};

pub fn make_hash(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let hash = hasher.finalize();
    hex::encode(hash)
}

/// `PREFIX-<16 hex chars>` derived from `key`.
pub fn make_id(prefix: &str, key: &str) -> String {
    let hash = make_hash(key);
    format!("{}-{}", prefix, &hash[..16])
}

/// Like [`make_id`], but salts the key until `taken` reports the id as free.
pub fn make_unique_id(prefix: &str, key: &str, taken: impl Fn(&str) -> bool) -> String {
    let mut id = make_id(prefix, key);
    let mut salt = 1usize;
    while taken(&id) {
        id = make_id(prefix, &format!("{}#{}", key, salt));
        salt += 1;
    }
    id
}
