//! Tipos de erro para o cliente da API do nova.astrometry.net.
//!
//! Define [`ApiError`] com variantes para falhas de autenticação, upload,
//! desserialização e transporte. Usa `thiserror` para derivar `Display` e
//! `Error` a partir dos atributos `#[error(...)]`.

use std::path::PathBuf;

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com a API do nova.
///
/// Desserialização fica separada de transporte: um corpo inesperado é o
/// sintoma mais comum de mudança silenciosa na API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// O login retornou `status` diferente de "success".
    #[error("login failed (status {status}): {message}")]
    Authentication { status: String, message: String },

    /// O upload retornou `status` diferente de "success".
    #[error("upload failed (status {status}): {message}")]
    Upload { status: String, message: String },

    /// O arquivo local não existe; nenhuma requisição foi enviada.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// O corpo da resposta não tem o formato esperado.
    /// O corpo bruto é preservado para diagnóstico.
    #[error("failed to deserialize {context} response: {source}")]
    Deserialization {
        context: &'static str,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// Falha ao serializar o `request-json`.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// O servidor respondeu com status HTTP diferente de 2xx.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Falha ao ler o arquivo de upload ou gravar uma imagem baixada.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_display() {
        let err = ApiError::Authentication {
            status: "error".into(),
            message: "bad apikey".into(),
        };
        assert_eq!(err.to_string(), "login failed (status error): bad apikey");
    }

    #[test]
    fn http_status_display() {
        let err = ApiError::HttpStatus {
            status: 503,
            url: "http://nova.astrometry.net/grid_display/1".into(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP 503 from http://nova.astrometry.net/grid_display/1"
        );
    }

    #[test]
    fn deserialization_keeps_raw_body() {
        let source = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let err = ApiError::Deserialization {
            context: "status",
            body: "<html>".into(),
            source,
        };
        assert!(err.to_string().starts_with("failed to deserialize status response"));
        match err {
            ApiError::Deserialization { body, .. } => assert_eq!(body, "<html>"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiError>();
    }
}
