use crate::api::ErrorResponse;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use log::{debug, error};
use thiserror::Error;

pub const NOT_OPEN_FOR_BETTING: &str = "Market is not open for betting";
pub const NOT_OPEN: &str = "Market is not open";

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Market not found")]
    NotFound,
    #[error("{0}")]
    InvalidState(&'static str),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Market is already resolved")]
    AlreadyResolved,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
impl LedgerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidState(_) | Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::AlreadyResolved => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
impl From<JsonRejection> for LedgerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidArgument(rejection.body_text())
    }
}

// helper functions
pub fn map_ledger_err_and_code(e: LedgerError) -> (StatusCode, Json<ErrorResponse>) {
    let code = e.status_code();
    if let LedgerError::Store(_) = e {
        error!("Store error: {:#}", e);
    } else {
        debug!("Error: {:#}", e);
    }
    (
        code,
        Json(ErrorResponse {
            error: format!("{:#}", e),
        }),
    )
}
