use blake3::Hasher;

/// Short BLAKE3 fingerprint of a secret, safe to put in logs.
///
/// Returns the first 8 bytes of the hash as lowercase hex. Used to tell API keys
/// and admin tokens apart in log lines without ever printing the secret itself.
#[inline]
pub fn fingerprint_secret(secret: &str) -> String {
    let hash = blake3::hash(secret.as_bytes());
    hash.to_hex()[..16].to_string()
}

/// Compares a presented bearer token against the configured secret.
///
/// Both sides are hashed with a domain-separated BLAKE3 hasher first; the
/// comparison of the resulting [`blake3::Hash`] values is constant-time.
#[inline]
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    digest(presented) == digest(expected)
}

fn digest(value: &str) -> blake3::Hash {
    let mut hasher = Hasher::new();
    hasher.update(b"magnifier-admin-token|");
    hasher.update(value.as_bytes());
    hasher.finalize()
}
