/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// Symmetric chat key size in bytes (for XChaCha20-Poly1305)
pub const CHAT_KEY_SIZE: usize = 32;

/// Maximum message length in characters
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Filename prefix for persisted per-chat keys (`chat_key_{chat_id}`)
pub const CHAT_KEY_PREFIX: &str = "chat_key_";

/// Placeholder shown when a ciphertext fails to decrypt
pub const SENTINEL_DECRYPT_FAILED: &str = "[message could not be decrypted]";

/// Placeholder shown when no local key exists for an encrypted message
pub const SENTINEL_KEY_MISSING: &str = "[message unavailable]";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Capacity of each per-chat event subscription channel
pub const SUBSCRIPTION_CAPACITY: usize = 256;
