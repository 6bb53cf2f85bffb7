//! # Cliente do Servidor de Distribuição de Pesos
//!
//! Quando configurado, o passo de avaliação consulta um serviço externo que
//! repesa os candidatos de um token a partir das suas coordenadas (por
//! exemplo, um modelo de densidade de menções geográficas). A troca é um
//! POST HTTP/1.0 simples, bloqueante, com o corpo JSON
//! `{method, id, params: [[[lat, lon], ...], opção?]}`; a resposta traz o
//! vetor paralelo de pesos sob a chave `"result"`.
//!
//! O motor impõe timeouts de E/S na conexão e trata **qualquer** falha
//! (timeout, resposta malformada, recusa) como "sem repesagem disponível":
//! o erro é devolvido ao chamador do cliente, e o passo de avaliação degrada
//! para pesos 1.0 — nunca aborta a análise.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{GeoParseError, Result};

/// Descritor do endpoint de repesagem (opção `dist-server`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistServerConfig {
    /// Nome do host.
    pub host: String,
    /// Caminho do recurso (ex: "/distribution").
    pub path: String,
    /// Porta, como string (convenção do descritor).
    pub port: String,
    /// Nome do método remoto.
    pub method: String,
    /// Parâmetro opcional repassado verbatim como segundo elemento de
    /// `params`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<serde_json::Value>,
}

/// Serviço de repesagem consultado pelo passo de avaliação.
///
/// Abstraído em trait para que testes injetem um stub sem rede.
pub trait WeightService: Send {
    /// Pede um vetor de pesos, um por coordenada de candidato.
    fn weights(&mut self, coords: &[(f64, f64)]) -> Result<Vec<f64>>;
}

/// Cliente bloqueante do serviço de repesagem.
pub struct JsonRpcWeightClient {
    config: DistServerConfig,
    timeout: Duration,
    /// Id incremental das requisições (mantém o motor determinístico).
    next_id: u64,
}

impl JsonRpcWeightClient {
    /// Timeout padrão de conexão/leitura/escrita.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(config: DistServerConfig) -> Self {
        Self::with_timeout(config, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(config: DistServerConfig, timeout: Duration) -> Self {
        Self {
            config,
            timeout,
            next_id: 1,
        }
    }

    fn build_request_body(&mut self, coords: &[(f64, f64)]) -> String {
        let coord_list: Vec<serde_json::Value> = coords
            .iter()
            .map(|&(lat, lon)| json!([lat.to_string(), lon.to_string()]))
            .collect();
        let mut params = vec![serde_json::Value::Array(coord_list)];
        if let Some(option) = &self.config.option {
            params.push(option.clone());
        }
        let body = json!({
            "method": self.config.method,
            "id": self.next_id,
            "params": params,
        });
        self.next_id += 1;
        body.to_string()
    }

    fn exchange(&self, body: &str) -> Result<String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let mut resolved = std::net::ToSocketAddrs::to_socket_addrs(&addr)
            .map_err(|e| GeoParseError::dist(format!("endereço '{addr}' inválido: {e}")))?;
        let first = resolved
            .next()
            .ok_or_else(|| GeoParseError::dist(format!("endereço '{addr}' não resolve")))?;
        let mut stream = TcpStream::connect_timeout(&first, self.timeout)
            .map_err(|e| GeoParseError::dist(format!("conexão com {addr} falhou: {e}")))?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let request = format!(
            "POST {} HTTP/1.0\r\nHost: {}\r\nAccept: */*\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.config.path,
            self.config.host,
            body.len(),
            body
        );
        stream.write_all(request.as_bytes())?;

        let mut response = String::new();
        stream.read_to_string(&mut response)?;
        // Corpo = o que vem depois da linha em branco dos cabeçalhos
        let payload = response
            .split_once("\r\n\r\n")
            .map(|(_, rest)| rest)
            .unwrap_or(response.as_str());
        Ok(payload.trim().to_string())
    }
}

impl WeightService for JsonRpcWeightClient {
    fn weights(&mut self, coords: &[(f64, f64)]) -> Result<Vec<f64>> {
        let body = self.build_request_body(coords);
        let payload = self.exchange(&body)?;
        let value: serde_json::Value = serde_json::from_str(&payload)
            .map_err(|e| GeoParseError::dist(format!("resposta não é JSON: {e}")))?;
        let result = value
            .get("result")
            .and_then(|r| r.as_array())
            .ok_or_else(|| GeoParseError::dist("resposta sem 'result'".to_string()))?;
        result
            .iter()
            .map(|w| {
                w.as_f64()
                    .ok_or_else(|| GeoParseError::dist(format!("peso não numérico: {w}")))
            })
            .collect()
    }
}
