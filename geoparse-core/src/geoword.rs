//! # Geo-palavras — candidatos de interpretação geográfica
//!
//! Uma *geo-palavra* ([`Geoword`]) é uma interpretação geográfica candidata
//! para um token ambíguo: "Santa Maria" pode ser o município no Rio Grande do
//! Sul, o do Distrito Federal ou o da Paraíba — cada um vira um `Geoword` com
//! identificador estável, classe de entidade, cadeia de hiperônimos (estado,
//! país) e coordenada.
//!
//! O registro é produzido pela camada externa de consulta ao dicionário e é
//! **imutável** depois de admitido no contexto; o motor nunca altera o
//! candidato, apenas calcula escores que ficam na fila de processamento.

use serde::{Deserialize, Serialize};

/// Um candidato de interpretação geográfica para um token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geoword {
    /// Identificador estável no dicionário (ex: "br-rs-santa-maria").
    pub geoword_id: String,
    /// Nome canônico/típico do lugar.
    pub typical_name: String,
    /// Classe de entidade nomeada (ex: "Município", "Estado", "Rio").
    /// Classes podem ser hierárquicas com `/` (ex: "Município/Capital").
    pub ne_class: String,
    /// Identificador do dicionário de origem.
    pub dictionary_id: i32,
    /// Hiperônimos em ordem (do mais próximo ao mais amplo, ex:
    /// ["Rio Grande do Sul", "Brasil"]). Pode ser vazio.
    #[serde(default)]
    pub hypernyms: Vec<String>,
    /// Latitude em graus decimais. Presente se e somente se `longitude` está.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude em graus decimais.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Peso estático de prioridade do dicionário.
    #[serde(default)]
    pub priority: i32,
    /// Início da janela de validade, data normalizada de 8 dígitos
    /// ("AAAAMMDD"). Vazio = sem limite inferior.
    #[serde(default)]
    pub valid_from: String,
    /// Fim da janela de validade, mesmo formato. Vazio = sem limite superior.
    #[serde(default)]
    pub valid_to: String,
    /// Prefixos de superfície aceitos ao redor do nome canônico
    /// (ex: "município de").
    #[serde(default)]
    pub prefixes: Vec<String>,
    /// Sufixos de superfície aceitos (ex: "-RS").
    #[serde(default)]
    pub suffixes: Vec<String>,
}

impl Geoword {
    /// Coordenada do candidato, se georreferenciado.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Chave da relação "conjunto completo de hiperônimos": a serialização
    /// ordenada da lista. Só participa da relação quem tem dois ou mais
    /// hiperônimos; com menos, a relação de hiperônimo simples já cobre.
    pub fn full_hypernym_key(&self) -> Option<String> {
        if self.hypernyms.len() >= 2 {
            // serde_json preserva a ordem do Vec
            serde_json::to_string(&self.hypernyms).ok()
        } else {
            None
        }
    }

    /// Recupera prefixo/sufixo residuais comparando a superfície do token com
    /// o nome canônico do candidato.
    ///
    /// Retorna `Some((prefixo, sufixo))` quando a superfície contém o nome
    /// canônico com sobra em pelo menos um dos lados. Quando o dicionário
    /// declara listas de afixos, a sobra precisa constar na lista
    /// correspondente; listas vazias aceitam qualquer sobra.
    pub fn parts_for_surface(&self, surface: &str) -> Option<(String, String)> {
        if surface == self.typical_name || self.typical_name.is_empty() {
            return None;
        }
        let start = surface.find(&self.typical_name)?;
        let prefix = &surface[..start];
        let suffix = &surface[start + self.typical_name.len()..];
        if prefix.is_empty() && suffix.is_empty() {
            return None;
        }
        let prefix_ok = prefix.is_empty()
            || self.prefixes.is_empty()
            || self.prefixes.iter().any(|p| p == prefix.trim());
        let suffix_ok = suffix.is_empty()
            || self.suffixes.is_empty()
            || self.suffixes.iter().any(|s| s == suffix.trim());
        if prefix_ok && suffix_ok {
            Some((prefix.to_string(), suffix.to_string()))
        } else {
            None
        }
    }
}
