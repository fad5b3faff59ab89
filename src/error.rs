use thiserror::Error;

/// Errors surfaced by the courier client.
///
/// Only [CourierError::Validation] and [CourierError::Configuration] ever reach callers:
///  they are raised synchronously, before a message crosses the asynchronous boundary.
///  [CourierError::Network] and [CourierError::OperationFailed] occur inside the dispatch
///  task and are logged and swallowed - `send()` returning does *not* mean the message
///  was delivered.
#[derive(Debug, Error)]
pub enum CourierError {
    /// A caller-supplied field violates a constraint (title out of bounds, empty
    ///  hostname, invalid port or URL).
    #[error("invalid argument: {message}")]
    Validation { message: String },

    /// The client was built in an invalid state (empty token, no async runtime,
    ///  endpoint source yielding nothing).
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    /// The transport to the collector service could not be established.
    #[error("network failure: {message}")]
    Network {
        message: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The remote call itself failed, or no endpoint was available at resolution time.
    #[error("operation failed: {message}")]
    OperationFailed { message: String },
}

impl CourierError {
    pub(crate) fn validation(message: impl Into<String>) -> CourierError {
        CourierError::Validation { message: message.into() }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> CourierError {
        CourierError::Configuration { message: message.into() }
    }

    pub(crate) fn network(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> CourierError {
        CourierError::Network {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    pub(crate) fn network_without_cause(message: impl Into<String>) -> CourierError {
        CourierError::Network { message: message.into(), cause: None }
    }

    pub(crate) fn operation_failed(message: impl Into<String>) -> CourierError {
        CourierError::OperationFailed { message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, CourierError>;
