use thiserror::Error;

/// Daemon-side failures. The engine itself is infallible by design; only the
/// transport and the protocol encoding can go wrong.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("client I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol encode error: {0}")]
    Encode(#[from] serde_json::Error),
}
