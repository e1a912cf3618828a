//! Tipos de erro para o cliente da API Anthropic.
//!
//! Define [`AnthropicError`] com variantes para rate limiting, erros da API
//! e erros de rede, além de [`AnthropicError::is_transient`], usado pela
//! camada de capacidade para decidir se vale a pena retentar com backoff.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com a API da Anthropic.
#[derive(Debug, Error)]
pub enum AnthropicError {
    /// O servidor retornou HTTP 429.
    /// `retry_after_ms` indica quantos milissegundos esperar antes de retentar.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Erro retornado pela API (ex.: 401 chave inválida, 529 sobrecarga).
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl AnthropicError {
    /// Rate limits, erros 5xx e falhas de rede são transitórios; 4xx não.
    pub fn is_transient(&self) -> bool {
        match self {
            AnthropicError::RateLimited { .. } => true,
            AnthropicError::ApiError { status, .. } => *status >= 500,
            AnthropicError::NetworkError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        }
    }

    /// Espera sugerida pelo servidor, quando houver.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            AnthropicError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
