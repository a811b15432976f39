use thiserror::Error;

/// Error taxonomy for the controller runtime.
///
/// Recoverable kinds (`Protocol`, `Serial`, `Parse`) are logged and
/// looped past by the owning task; fatal kinds set the shared stop flag
/// so every task winds down together.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("malformed frame: {0}")]
    Protocol(String),

    #[error("serial link: {0}")]
    Serial(String),

    #[error("telemetry parse: {0}")]
    Parse(String),

    #[error("control connection: {0}")]
    Connection(#[from] std::io::Error),

    #[error("hardware I/O: {0}")]
    Hardware(String),

    #[error("config: {0}")]
    Config(String),
}

impl ControllerError {
    /// Whether the error should bring the whole controller down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Hardware(_))
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_split_matches_taxonomy() {
        assert!(!ControllerError::Protocol("x".into()).is_fatal());
        assert!(!ControllerError::Serial("x".into()).is_fatal());
        assert!(!ControllerError::Parse("x".into()).is_fatal());
        assert!(ControllerError::Hardware("x".into()).is_fatal());
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(ControllerError::Connection(io).is_fatal());
    }
}
