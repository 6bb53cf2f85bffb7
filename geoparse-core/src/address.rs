//! # Endereços — forma de saída do geocodificador externo
//!
//! O geoparser não geocodifica endereços; ele apenas **consome** a hierarquia
//! resolvida que um geocodificador externo produz (trait
//! [`AddressGeocoder`]). O contexto usa dois pedaços dessa estrutura: as
//! geo-palavras embutidas nos elementos (registradas nas relações de
//! contexto) e a coordenada do elemento mais profundo (alimenta o centroide
//! espacial e a escolha do melhor candidato de endereço).

use serde::{Deserialize, Serialize};

use crate::geoword::Geoword;
use crate::morph::MorphNode;

/// Um nível da hierarquia de um endereço resolvido (estado → município →
/// bairro → logradouro...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressElement {
    /// Profundidade hierárquica (1 = nível mais amplo).
    pub level: i32,
    /// Nome do elemento (ex: "Paraná", "Curitiba", "Centro").
    pub name: String,
    /// Latitude do elemento.
    pub latitude: f64,
    /// Longitude do elemento.
    pub longitude: f64,
    /// Geo-palavra correspondente no dicionário, quando o geocodificador
    /// conseguiu alinhá-la.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geoword: Option<Geoword>,
}

/// Um candidato de endereço resolvido.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    /// Trecho de superfície coberto pelo endereço.
    pub surface: String,
    /// Forma padronizada (ex: "Curitiba, Paraná").
    pub standard_form: String,
    /// Elementos do mais amplo ao mais profundo. Nunca vazio em um endereço
    /// válido.
    pub elements: Vec<AddressElement>,
}

impl Address {
    /// Coordenada representativa: a do elemento mais profundo.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.elements.last().map(|e| (e.latitude, e.longitude))
    }
}

/// Geocodificador de endereços externo (colaborador consumido).
///
/// Recebe a sequência de nós a partir do token corrente e, se reconhecer um
/// endereço, devolve os candidatos e quantos nós foram consumidos.
pub trait AddressGeocoder: Send {
    fn try_geocode(&self, nodes: &[MorphNode], start: usize) -> Option<(Vec<Address>, usize)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_representative_coordinate_is_deepest() {
        let addr = Address {
            surface: "Centro, Curitiba".to_string(),
            standard_form: "Curitiba, Paraná — Centro".to_string(),
            elements: vec![
                AddressElement {
                    level: 1,
                    name: "Paraná".to_string(),
                    latitude: -24.5,
                    longitude: -51.0,
                    geoword: None,
                },
                AddressElement {
                    level: 2,
                    name: "Curitiba".to_string(),
                    latitude: -25.4284,
                    longitude: -49.2733,
                    geoword: None,
                },
            ],
        };
        assert_eq!(addr.coordinates(), Some((-25.4284, -49.2733)));
    }
}
