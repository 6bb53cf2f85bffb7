//! # Erros do Geoparser
//!
//! Taxonomia de erros do crate. Há duas famílias com destinos diferentes:
//!
//! - **Erros de configuração** ([`GeoParseError::Config`]): opção malformada
//!   (data inválida, região espacial ilegível, filtro sem backend). Sempre
//!   sobem até o chamador como falha de formato da requisição e sempre
//!   carregam o valor bruto ofensivo para facilitar o debug.
//! - **Falhas de serviço externo** ([`GeoParseError::DistService`]): o servidor
//!   de redistribuição de pesos é opcional; falhas dele são degradadas para
//!   "sem repesagem" pelo motor e nunca abortam a análise. A variante existe
//!   para o cliente reportar o que aconteceu antes da degradação.

use thiserror::Error;

/// Alias de `Result` usado em todo o crate.
pub type Result<T> = std::result::Result<T, GeoParseError>;

/// Erro do geoparser.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GeoParseError {
    /// Opção de configuração malformada ou não suportada.
    /// `key` é o nome da opção (ex: `"time-before"`), `value` o valor bruto recebido.
    #[error("Opção '{key}' inválida: {reason} (valor: {value})")]
    Config {
        key: String,
        value: String,
        reason: String,
    },

    /// Chave inexistente em um índice de relações. Erro de programação local:
    /// o protocolo público (`add_nodes`/`evaluate`/`flush_nodes`) nunca o produz.
    #[error("Chave '{0}' não encontrada no índice de relações")]
    RelationNotFound(String),

    /// Falha na comunicação com o servidor de distribuição de pesos.
    #[error("Falha no servidor de distribuição: {0}")]
    DistService(String),

    /// Erro de E/S.
    #[error("Erro de E/S: {0}")]
    Io(#[from] std::io::Error),

    /// Erro de (de)serialização JSON.
    #[error("Erro de JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl GeoParseError {
    /// Cria um erro de configuração com a chave, o valor bruto e o motivo.
    pub fn config(
        key: impl Into<String>,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        GeoParseError::Config {
            key: key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Cria uma falha de serviço de distribuição.
    pub fn dist(msg: impl Into<String>) -> Self {
        GeoParseError::DistService(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_carries_raw_value() {
        let err = GeoParseError::config("time-before", "2001-13-40x", "data inválida");
        let msg = err.to_string();
        assert!(msg.contains("time-before"));
        assert!(msg.contains("2001-13-40x"));
    }
}
