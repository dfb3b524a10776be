//! Error types for `garage-console-core`.
//!
//! Each variant carries enough context to diagnose the problem without a
//! debugger. Cipher and session errors never include key material, token
//! plaintext, or ciphertext.

use garage_console_storage::RegistryError;

/// Errors from the token cipher.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// The configured key is not exactly 32 bytes (or 64 hex characters).
    #[error("cipher key must be exactly 32 bytes, got {actual}")]
    InvalidKeyLength { actual: usize },

    /// The wire string is not `hex(iv):hex(tag):hex(ciphertext)`.
    #[error("invalid ciphertext format: {reason}")]
    InvalidFormat { reason: String },

    /// The authentication tag did not verify (wrong key, tampered or
    /// corrupted ciphertext).
    #[error("ciphertext failed authentication")]
    AuthenticationFailure,

    /// AES-256-GCM encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },
}

/// Errors from session token issue/verify.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The signing secret is too short to be used.
    #[error("session secret must be at least {min} bytes, got {actual}")]
    WeakSecret { min: usize, actual: usize },

    /// The token is past its expiry.
    #[error("session expired")]
    Expired,

    /// The token is malformed or its signature does not verify.
    #[error("invalid session token: {reason}")]
    Invalid { reason: String },

    /// Signing a new token failed.
    #[error("failed to sign session token: {reason}")]
    Signing { reason: String },
}

/// Network-level failures reaching an upstream cluster.
///
/// An upstream HTTP response with any status code is never a
/// `TransportError`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The call exceeded the configured timeout.
    #[error("upstream request to {url} timed out")]
    Timeout { url: String },

    /// Connection refused, DNS failure, TLS failure, or a broken body.
    #[error("upstream request to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    /// The destination URL or request could not be built.
    #[error("invalid upstream request to {url}: {reason}")]
    InvalidRequest { url: String, reason: String },
}

/// Failures of [`Forwarder::forward`](crate::forward::Forwarder::forward).
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// The decrypted credential cannot be carried in an `Authorization`
    /// header. No upstream call was made.
    #[error("credential is not a valid header value")]
    UnusableCredential,

    /// The upstream could not be reached.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures of a single proxied request, in the order they can occur.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// No cluster is registered under the requested id.
    #[error("cluster '{id}' not found")]
    ClusterNotFound { id: String },

    /// The registry lookup itself failed.
    #[error("cluster registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A stored credential could not be decrypted.
    #[error("stored credential for cluster '{cluster_id}' is unreadable: {source}")]
    Credential {
        cluster_id: String,
        #[source]
        source: CipherError,
    },

    /// A stored credential decrypted but cannot be sent as a bearer token.
    #[error("stored credential for cluster '{cluster_id}' is not a valid header value")]
    UnusableCredential { cluster_id: String },

    /// The upstream could not be reached.
    #[error("bad gateway: {0}")]
    BadGateway(#[from] TransportError),
}
