use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use order_engine::{IngestError, LookupError, OrderStoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("The backend did not respond in time. {0}")]
    BackendTimeout(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::BackendTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<LookupError> for ServerError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::NotFound(_) => Self::NoRecordFound(e.to_string()),
            LookupError::Persistence(_) => Self::BackendError(e.to_string()),
            LookupError::Timeout(_) => Self::BackendTimeout(e.to_string()),
        }
    }
}

impl From<IngestError> for ServerError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Validation(_) => Self::InvalidRequestBody(e.to_string()),
            // The order itself is at fault, e.g. a discount outside 0..=100
            IngestError::Persistence(OrderStoreError::ConstraintViolation(_)) => Self::InvalidRequestBody(e.to_string()),
            IngestError::Persistence(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<OrderStoreError> for ServerError {
    fn from(e: OrderStoreError) -> Self {
        Self::InitializeError(e.to_string())
    }
}
