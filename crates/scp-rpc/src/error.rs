use jsonrpsee::core::ClientError;

/// Errors talking to the SCC Core node.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The node answered the call with an error object.
    #[error("Node rejected `{method}` (code {code}): {message}")]
    Rejected {
        method: &'static str,
        code: i32,
        message: String,
    },

    /// The node could not be reached or the connection broke mid-call.
    #[error("RPC transport failure on `{method}`: {reason}")]
    Transport {
        method: &'static str,
        reason: String,
    },

    /// The response did not match the expected shape.
    #[error("Malformed `{method}` response: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The client could not be built from the given settings.
    #[error("Invalid RPC configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wraps a jsonrpsee client error raised while calling `method`.
    pub(crate) fn from_client(method: &'static str, err: ClientError) -> Self {
        match err {
            ClientError::Call(object) => Self::Rejected {
                method,
                code: object.code(),
                message: object.message().to_string(),
            },
            ClientError::ParseError(source) => Self::Decode { method, source },
            other => Self::Transport {
                method,
                reason: other.to_string(),
            },
        }
    }

    /// Returns `true` if the node itself answered, i.e. the failure is not transient.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}
