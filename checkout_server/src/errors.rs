use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use checkout_engine::{traits::DatabaseError, CheckoutError, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("{0}")]
    CheckoutError(#[from] CheckoutError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingApiKey => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedKey(_) => StatusCode::UNAUTHORIZED,
                AuthError::UnknownApiKey => StatusCode::FORBIDDEN,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::OrganizationNotFound(_) => StatusCode::FORBIDDEN,
            },
            Self::CheckoutError(e) => checkout_status(e.kind()),
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

fn checkout_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::OrderNotFound | ErrorKind::UserNotFound => StatusCode::NOT_FOUND,
        ErrorKind::Gateway => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No API key was provided. Use the Authorization: Bearer <key> header.")]
    MissingApiKey,
    #[error("The API key is not in the correct format. {0}")]
    PoorlyFormattedKey(String),
    #[error("The API key is not recognised.")]
    UnknownApiKey,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The organization for this API key does not exist. {0}")]
    OrganizationNotFound(String),
}

impl From<DatabaseError> for ServerError {
    fn from(e: DatabaseError) -> Self {
        Self::BackendError(format!("Database error: {e}"))
    }
}
