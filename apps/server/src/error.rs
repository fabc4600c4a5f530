use std::io::Error as IoError;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use statusboard::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Address parsing error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Prober setup failed: {0:#}")]
    Prober(anyhow::Error),
    #[error("Address parameter is required")]
    MissingAddress,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Service not found: {0}")]
    ServiceNotFound(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingAddress | AppError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            AppError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Io(_) | AppError::AddrParse(_) | AppError::Config(_) | AppError::Prober(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
