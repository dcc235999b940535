/// Crate-level error type. Every fallible operation in this crate returns
/// this enum (wrapped in [`Result`]) rather than a collaborator-specific
/// error type, so callers never need to match on router/pool/connection
/// internals.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("no route for command {0:?}")]
    NoRoute(&'static str),

    #[error("transport error: {message}")]
    Transport { message: String, timeout: bool },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("operation attempted on a released command buffer")]
    BufferClosed,

    #[error("promise has already been settled")]
    AlreadySettled,

    #[error("promise has not been settled yet")]
    NotReady,

    #[error("fanout client has no target hosts; call retarget() first")]
    Untargeted,

    #[error("this fanout client has already been retargeted once")]
    AlreadyRetargeted,

    #[error("{0} is not supported by routing clients")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
