//! Error types for share-link decoding, encoding and outbound compilation
//!
//! Every variant carries the offending input fragment so the calling layer can turn it into a
//! user-facing message:
//! - **UnsupportedScheme**: link does not start with any known scheme (e.g. `foo://`).
//! - **MalformedUri**: a required separator is missing (`@`, `:` in host:port, closing `]`).
//! - **InvalidCredentialsEncoding**: every base64 variant failed, or the decoded text is not
//!   `method:password`-shaped.
//! - **InvalidPort**: port is non-numeric, zero or above 65535.
//! - **InvalidJsonPayload**: VMess body decoded but is not the expected JSON object.
//! - **UnsupportedProtocolForOperation**: the tag has no codec, or does not match the config.

use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors returned by decode, encode, compile and engine assembly
#[derive(Debug, Error)]
pub enum CodecError {
    /// Link scheme is not one of the nine supported families
    #[error("unsupported link scheme: {0}")]
    UnsupportedScheme(String),
    /// Missing `@`, `:` or `]` where the grammar requires one
    #[error("malformed link: {0}")]
    MalformedUri(String),
    /// Credentials could not be base64-decoded or split
    #[error("invalid credentials encoding: {0}")]
    InvalidCredentialsEncoding(String),
    /// Port is not an integer in 1..=65535
    #[error("invalid port: {0}")]
    InvalidPort(String),
    /// VMess payload is not a valid JSON object
    #[error("invalid JSON payload: {0}")]
    InvalidJsonPayload(String),
    /// Tag is unknown to the codec or does not match the config variant
    #[error("unsupported protocol for operation: {0}")]
    UnsupportedProtocolForOperation(String),
    /// Stored config text does not deserialize into the tag's config
    #[error("invalid stored config for {tag}: {source}")]
    InvalidStoredConfig {
        /// Stored protocol tag
        tag: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
    /// Compiling one node of an engine configuration failed
    #[error("node {id}: {source}")]
    Node {
        /// Node identifier assigned by the storage layer
        id: i64,
        /// Underlying codec failure
        #[source]
        source: Box<CodecError>,
    },
    /// Writing the engine configuration failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    pub(crate) fn malformed(what: &str, input: &str) -> Self {
        CodecError::MalformedUri(format!("{what} in '{input}'"))
    }

    pub(crate) fn port(input: &str) -> Self {
        CodecError::InvalidPort(format!("'{input}'"))
    }
}
