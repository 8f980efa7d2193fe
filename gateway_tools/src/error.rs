use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The gateway declined the transaction. {0}")]
    Declined(String),
    #[error("The gateway response was missing {0}")]
    MissingField(&'static str),
}

impl GatewayApiError {
    /// True if the gateway itself refused the request (as opposed to a transport or client-side failure).
    pub fn is_decline(&self) -> bool {
        match self {
            Self::Declined(_) => true,
            Self::QueryError { status, .. } => (400..500).contains(status),
            _ => false,
        }
    }
}
