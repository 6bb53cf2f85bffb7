//! # Opções do Chamador
//!
//! Conjunto de opções reconhecidas em uma requisição de análise. Todas são
//! opcionais; chamadas repetidas de `set_options` **mesclam** (campo presente
//! substitui o anterior, ausente preserva), e `reset_options` volta aos
//! padrões. Valores malformados produzem erro de configuração nomeando a
//! chave e o valor bruto — nunca um default silencioso.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dist::DistServerConfig;
use crate::error::{GeoParseError, Result};

/// Nível de detalhe da geocodificação de endereços.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GeocodingLevel {
    /// Não tenta reconhecer endereços.
    None,
    /// Reconhecimento raso (apenas os níveis mais amplos).
    Simple,
    /// Nível padrão.
    #[default]
    Normal,
    /// Hierarquia completa.
    Full,
}

/// Valor aceito para a opção `geocoding`: booleano (atalho para
/// `normal`/`none`) ou o nível por extenso.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeocodingValue {
    Flag(bool),
    Level(GeocodingLevel),
}

impl GeocodingValue {
    pub fn level(self) -> GeocodingLevel {
        match self {
            GeocodingValue::Flag(true) => GeocodingLevel::Normal,
            GeocodingValue::Flag(false) => GeocodingLevel::None,
            GeocodingValue::Level(level) => level,
        }
    }
}

/// Opções de uma requisição de análise. Campos `None` = "não informado".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Nível de geocodificação de endereços.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocoding: Option<GeocodingValue>,
    /// Mantém menções geográficas que são apenas modificadores?
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjunct: Option<bool>,
    /// Escore mínimo para manter a anotação no flush.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<i64>,
    /// Inclui o escore do vencedor na saída.
    #[serde(default, rename = "show-score", skip_serializing_if = "Option::is_none")]
    pub show_score: Option<bool>,
    /// Inclui a lista de candidatos na saída.
    #[serde(default, rename = "show-candidate", skip_serializing_if = "Option::is_none")]
    pub show_candidate: Option<bool>,
    /// Substitui o conjunto de dicionários ativos.
    #[serde(default, rename = "set-dic", skip_serializing_if = "Option::is_none")]
    pub set_dic: Option<Vec<i32>>,
    /// Acrescenta dicionários ao conjunto ativo.
    #[serde(default, rename = "add-dic", skip_serializing_if = "Option::is_none")]
    pub add_dic: Option<Vec<i32>>,
    /// Remove dicionários do conjunto ativo.
    #[serde(default, rename = "remove-dic", skip_serializing_if = "Option::is_none")]
    pub remove_dic: Option<Vec<i32>>,
    /// Substitui a lista de classes ativas (prefixo `-` = negação).
    #[serde(default, rename = "set-class", skip_serializing_if = "Option::is_none")]
    pub set_class: Option<Vec<String>>,
    /// Acrescenta classes à lista ativa (desfaz negação se houver).
    #[serde(default, rename = "add-class", skip_serializing_if = "Option::is_none")]
    pub add_class: Option<Vec<String>>,
    /// Remove classes da lista ativa (ou registra negação).
    #[serde(default, rename = "remove-class", skip_serializing_if = "Option::is_none")]
    pub remove_class: Option<Vec<String>>,
    /// Pontos de interesse para o bônus espacial, como lista achatada
    /// `[lat, lon, lat, lon, ...]`.
    #[serde(default, rename = "topic-point", skip_serializing_if = "Option::is_none")]
    pub topic_point: Option<Vec<f64>>,
    /// Raio de interesse em km (padrão 10.0).
    #[serde(default, rename = "topic-radius", skip_serializing_if = "Option::is_none")]
    pub topic_radius: Option<f64>,
    /// Endpoint do servidor de distribuição de pesos; ausência desativa a
    /// repesagem.
    #[serde(default, rename = "dist-server", skip_serializing_if = "Option::is_none")]
    pub dist_server: Option<DistServerConfig>,
    /// Configurações brutas das condições de seleção, validadas na aplicação.
    #[serde(default, rename = "geo-contains", skip_serializing_if = "Option::is_none")]
    pub geo_contains: Option<Value>,
    #[serde(default, rename = "geo-disjoint", skip_serializing_if = "Option::is_none")]
    pub geo_disjoint: Option<Value>,
    #[serde(default, rename = "time-exists", skip_serializing_if = "Option::is_none")]
    pub time_exists: Option<Value>,
    #[serde(default, rename = "time-before", skip_serializing_if = "Option::is_none")]
    pub time_before: Option<Value>,
    #[serde(default, rename = "time-after", skip_serializing_if = "Option::is_none")]
    pub time_after: Option<Value>,
    #[serde(default, rename = "time-overlaps", skip_serializing_if = "Option::is_none")]
    pub time_overlaps: Option<Value>,
    #[serde(default, rename = "time-contains", skip_serializing_if = "Option::is_none")]
    pub time_contains: Option<Value>,
}

impl ParseOptions {
    /// Desserializa de um objeto JSON, rejeitando formatos não-objeto.
    /// `null` equivale a "nenhuma opção".
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(ParseOptions::default()),
            Value::Object(_) => serde_json::from_value(value.clone())
                .map_err(|e| GeoParseError::config("options", value, e.to_string())),
            other => Err(GeoParseError::config(
                "options",
                other,
                "opções devem ser um objeto JSON",
            )),
        }
    }

    /// Mescla `other` sobre `self`: campos presentes em `other` substituem.
    pub fn merge(&mut self, other: &ParseOptions) {
        macro_rules! take {
            ($($field:ident),+ $(,)?) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })+
            };
        }
        take!(
            geocoding,
            adjunct,
            threshold,
            show_score,
            show_candidate,
            set_dic,
            add_dic,
            remove_dic,
            set_class,
            add_class,
            remove_class,
            topic_point,
            topic_radius,
            dist_server,
            geo_contains,
            geo_disjoint,
            time_exists,
            time_before,
            time_after,
            time_overlaps,
            time_contains,
        );
    }

    /// Pares (chave, valor bruto) das condições de seleção presentes, na
    /// ordem fixa de registro.
    pub fn condition_entries(&self) -> Vec<(&'static str, &Value)> {
        let mut entries = Vec::new();
        let pairs: [(&'static str, &Option<Value>); 7] = [
            ("geo-contains", &self.geo_contains),
            ("geo-disjoint", &self.geo_disjoint),
            ("time-exists", &self.time_exists),
            ("time-before", &self.time_before),
            ("time-after", &self.time_after),
            ("time-overlaps", &self.time_overlaps),
            ("time-contains", &self.time_contains),
        ];
        for (key, value) in pairs {
            if let Some(v) = value {
                if !v.is_null() {
                    entries.push((key, v));
                }
            }
        }
        entries
    }
}
