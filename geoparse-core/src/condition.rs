//! # Condições de Seleção — filtros temporais e espaciais
//!
//! Uma condição de seleção pode **vetar** um candidato antes do cálculo de
//! plausibilidade: um lugar que só existiu até 1943 não serve para um texto
//! que fala de 2020 (`time-exists`), um município fora do polígono de
//! interesse não serve para uma busca regional (`geo-contains`). O conjunto
//! de condições é fechado e enumerável, então a família é um enum com um par
//! único `configure`/`judge`, não uma hierarquia aberta.
//!
//! `judge` devolve um peso multiplicativo: valor não-negativo multiplica o
//! escore (as condições atuais são portões booleanos e devolvem `1.0`);
//! o sentinela `-1.0` rejeita o candidato de vez.
//!
//! Datas são normalizadas para 8 dígitos (`AAAAMMDD`), aceitando `AAAA-MM-DD`
//! ou `AAAAMMDD`; a comparação lexicográfica nesse formato coincide com a
//! cronológica. Valor malformado é erro de configuração com o valor bruto na
//! mensagem.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{GeoParseError, Result};
use crate::geoword::Geoword;

/// Peso devolvido por uma condição que rejeita o candidato.
pub const REJECT: f64 = -1.0;

/// Chave de ambiente da política para filtros sem backend: valores começando
/// com `y`/`Y` fazem o filtro virar no-op em vez de erro de configuração.
pub const IGNORE_UNSUPPORTED_ENV: &str = "GEOPARSE_IGNORE_UNSUPPORTED";

static YMD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})-?(\d{2})-?(\d{2})").expect("regex de data"));

/// Normaliza uma data para 8 dígitos. Erro com o valor bruto se não casar.
pub fn normalize_ymd(key: &str, raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Ok(String::new());
    }
    match YMD_PATTERN.captures(raw) {
        Some(caps) => Ok(format!("{}{}{}", &caps[1], &caps[2], &caps[3])),
        None => Err(GeoParseError::config(
            key,
            raw,
            "datas devem ser 'AAAA-MM-DD' ou 'AAAAMMDD'",
        )),
    }
}

/// Normalização tolerante usada sobre os dados do candidato: valor que não
/// casa vira vazio (= sem limite), nunca erro.
fn normalize_ymd_lenient(raw: &str) -> String {
    YMD_PATTERN
        .captures(raw)
        .map(|caps| format!("{}{}{}", &caps[1], &caps[2], &caps[3]))
        .unwrap_or_default()
}

/// Janela temporal de uma condição: limites em 8 dígitos, vazio = aberto.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalCondition {
    pub from: String,
    pub to: String,
}

/// Lê o valor de uma opção temporal como lista de datas normalizadas.
fn ymd_values(key: &str, value: &Value) -> Result<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![normalize_ymd(key, s)?]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => normalize_ymd(key, s),
                other => Err(GeoParseError::config(key, other, "esperava data em string")),
            })
            .collect(),
        other => Err(GeoParseError::config(
            key,
            other,
            "esperava string ou array de datas",
        )),
    }
}

/// Restrição espacial: conjunto de regiões poligonais.
///
/// Com a feature `spatial` as regiões vêm de descrições inline no estilo
/// GeoJSON (`Polygon`/`MultiPolygon`, coordenadas `[lon, lat]`), um objeto ou
/// array de objetos. Fontes externas (URLs) exigiriam um backend de busca que
/// o crate não carrega e seguem a política de não-suportado. Sem a feature,
/// qualquer configuração espacial segue a mesma política: no-op se
/// `GEOPARSE_IGNORE_UNSUPPORTED` começa com `y`/`Y`, erro caso contrário —
/// nunca um resultado silenciosamente errado.
#[derive(Debug, Clone, Default)]
pub struct SpatialConstraint {
    #[cfg(feature = "spatial")]
    regions: Vec<geo::Polygon<f64>>,
}

/// Consulta a política de filtros não suportados.
fn unsupported_action(name: &str, value: &Value) -> Result<()> {
    let ignore = std::env::var(IGNORE_UNSUPPORTED_ENV)
        .map(|v| v.starts_with('y') || v.starts_with('Y'))
        .unwrap_or(false);
    if ignore {
        tracing::warn!(filtro = name, "filtro não suportado ignorado por política");
        Ok(())
    } else {
        Err(GeoParseError::config(
            name,
            value,
            format!(
                "filtro sem backend disponível (defina {IGNORE_UNSUPPORTED_ENV}=yes para ignorar)"
            ),
        ))
    }
}

impl SpatialConstraint {
    /// Constrói a restrição a partir do valor da opção.
    pub fn from_value(key: &str, value: &Value) -> Result<Self> {
        let mut constraint = SpatialConstraint::default();
        match value {
            Value::Array(items) => {
                for item in items {
                    constraint.add_source(key, item)?;
                }
            }
            other => constraint.add_source(key, other)?,
        }
        Ok(constraint)
    }

    #[cfg(feature = "spatial")]
    fn add_source(&mut self, key: &str, value: &Value) -> Result<()> {
        match value {
            Value::Object(_) => {
                self.regions.extend(parse_geojson_polygons(key, value)?);
                Ok(())
            }
            // Fonte externa (URL): sem backend de busca
            Value::String(_) => unsupported_action(key, value),
            other => Err(GeoParseError::config(
                key,
                other,
                "esperava objeto GeoJSON ou array de objetos",
            )),
        }
    }

    #[cfg(not(feature = "spatial"))]
    fn add_source(&mut self, key: &str, value: &Value) -> Result<()> {
        unsupported_action(key, value)
    }

    /// O ponto está dentro de alguma região configurada?
    ///
    /// Sem regiões (política de ignorar ativada), considera-se dentro — o
    /// filtro vira neutro em vez de vetar tudo.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        #[cfg(feature = "spatial")]
        {
            use geo::Contains;
            if self.regions.is_empty() {
                return true;
            }
            let point = geo::Point::new(lon, lat);
            return self.regions.iter().any(|region| region.contains(&point));
        }
        #[cfg(not(feature = "spatial"))]
        {
            let _ = (lat, lon);
            true
        }
    }

    /// Há regiões efetivamente carregadas?
    pub fn is_empty(&self) -> bool {
        #[cfg(feature = "spatial")]
        {
            self.regions.is_empty()
        }
        #[cfg(not(feature = "spatial"))]
        {
            true
        }
    }
}

#[cfg(feature = "spatial")]
fn parse_geojson_polygons(key: &str, value: &Value) -> Result<Vec<geo::Polygon<f64>>> {
    let kind = value.get("type").and_then(Value::as_str).unwrap_or("");
    let coords = value.get("coordinates").ok_or_else(|| {
        GeoParseError::config(key, value, "objeto de região sem 'coordinates'")
    })?;
    let ring = |raw: &Value| -> Result<geo::LineString<f64>> {
        let points = raw
            .as_array()
            .ok_or_else(|| GeoParseError::config(key, raw, "anel de polígono deve ser array"))?;
        let mut line = Vec::with_capacity(points.len());
        for pair in points {
            let xy = pair.as_array().filter(|a| a.len() >= 2).ok_or_else(|| {
                GeoParseError::config(key, pair, "coordenada deve ser [lon, lat]")
            })?;
            let lon = xy[0].as_f64().ok_or_else(|| {
                GeoParseError::config(key, &xy[0], "longitude deve ser numérica")
            })?;
            let lat = xy[1].as_f64().ok_or_else(|| {
                GeoParseError::config(key, &xy[1], "latitude deve ser numérica")
            })?;
            line.push(geo::Coord { x: lon, y: lat });
        }
        Ok(geo::LineString::from(line))
    };
    let polygon = |raw: &Value| -> Result<geo::Polygon<f64>> {
        let rings = raw
            .as_array()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| GeoParseError::config(key, raw, "polígono sem anéis"))?;
        let exterior = ring(&rings[0])?;
        let interiors = rings[1..].iter().map(&ring).collect::<Result<Vec<_>>>()?;
        Ok(geo::Polygon::new(exterior, interiors))
    };
    match kind {
        "Polygon" => Ok(vec![polygon(coords)?]),
        "MultiPolygon" => coords
            .as_array()
            .ok_or_else(|| GeoParseError::config(key, coords, "MultiPolygon malformado"))?
            .iter()
            .map(&polygon)
            .collect(),
        other => Err(GeoParseError::config(
            key,
            value,
            format!("tipo de região '{other}' não suportado (Polygon/MultiPolygon)"),
        )),
    }
}

/// A família fechada de condições de seleção.
#[derive(Debug, Clone)]
pub enum SelectCondition {
    /// Veta candidatos cujo ponto está fora de todas as regiões.
    GeoContains(SpatialConstraint),
    /// Veta candidatos cujo ponto está dentro de alguma região.
    GeoDisjoint(SpatialConstraint),
    /// Veta candidatos cuja janela de validade exclui a data de referência.
    TimeExists(TemporalCondition),
    /// Veta candidatos que só passaram a existir depois da data de referência.
    TimeBefore(TemporalCondition),
    /// Veta candidatos que deixaram de existir antes da data de referência.
    TimeAfter(TemporalCondition),
    /// Veta candidatos cuja janela não intersecta a janela da condição.
    TimeOverlaps(TemporalCondition),
    /// Veta candidatos cuja janela não contém por inteiro a janela da condição.
    TimeContains(TemporalCondition),
}

impl SelectCondition {
    /// Nome da opção que configura esta condição.
    pub fn name(&self) -> &'static str {
        match self {
            SelectCondition::GeoContains(_) => "geo-contains",
            SelectCondition::GeoDisjoint(_) => "geo-disjoint",
            SelectCondition::TimeExists(_) => "time-exists",
            SelectCondition::TimeBefore(_) => "time-before",
            SelectCondition::TimeAfter(_) => "time-after",
            SelectCondition::TimeOverlaps(_) => "time-overlaps",
            SelectCondition::TimeContains(_) => "time-contains",
        }
    }

    /// Constrói a condição `key` a partir do valor da opção, validando a
    /// aridade da variante.
    pub fn configure(key: &str, value: &Value) -> Result<SelectCondition> {
        match key {
            "geo-contains" => Ok(SelectCondition::GeoContains(SpatialConstraint::from_value(
                key, value,
            )?)),
            "geo-disjoint" => Ok(SelectCondition::GeoDisjoint(SpatialConstraint::from_value(
                key, value,
            )?)),
            "time-exists" | "time-before" | "time-after" => {
                let ymds = ymd_values(key, value)?;
                if ymds.len() != 1 {
                    return Err(GeoParseError::config(
                        key,
                        value,
                        "esperava exatamente 1 data",
                    ));
                }
                let cond = TemporalCondition {
                    from: ymds[0].clone(),
                    to: ymds[0].clone(),
                };
                Ok(match key {
                    "time-exists" => SelectCondition::TimeExists(cond),
                    "time-before" => SelectCondition::TimeBefore(cond),
                    _ => SelectCondition::TimeAfter(cond),
                })
            }
            "time-overlaps" => {
                let ymds = ymd_values(key, value)?;
                let cond = match ymds.len() {
                    1 => TemporalCondition {
                        from: ymds[0].clone(),
                        to: ymds[0].clone(),
                    },
                    2 => TemporalCondition {
                        from: ymds[0].clone(),
                        to: ymds[1].clone(),
                    },
                    _ => {
                        return Err(GeoParseError::config(
                            key,
                            value,
                            "esperava 1 data ou array de 2 datas",
                        ))
                    }
                };
                Ok(SelectCondition::TimeOverlaps(cond))
            }
            "time-contains" => {
                let ymds = ymd_values(key, value)?;
                if ymds.len() != 2 {
                    return Err(GeoParseError::config(
                        key,
                        value,
                        "esperava array de exatamente 2 datas",
                    ));
                }
                Ok(SelectCondition::TimeContains(TemporalCondition {
                    from: ymds[0].clone(),
                    to: ymds[1].clone(),
                }))
            }
            other => Err(GeoParseError::config(
                other,
                value,
                "condição de seleção desconhecida",
            )),
        }
    }

    /// Julga um candidato: peso multiplicativo não-negativo ou [`REJECT`].
    ///
    /// Candidato sem coordenada não é vetado pelas condições espaciais, assim
    /// como limites de validade vazios não são vetados pelas temporais —
    /// ausência de evidência não é veto.
    pub fn judge(&self, geoword: &Geoword) -> f64 {
        let valid_from = normalize_ymd_lenient(&geoword.valid_from);
        let valid_to = normalize_ymd_lenient(&geoword.valid_to);
        match self {
            SelectCondition::GeoContains(constraint) => match geoword.coordinates() {
                Some((lat, lon)) if !constraint.contains(lat, lon) => REJECT,
                _ => 1.0,
            },
            SelectCondition::GeoDisjoint(constraint) => match geoword.coordinates() {
                Some((lat, lon))
                    if !constraint.is_empty() && constraint.contains(lat, lon) =>
                {
                    REJECT
                }
                _ => 1.0,
            },
            SelectCondition::TimeExists(cond) => {
                if (!valid_from.is_empty() && valid_from > cond.from)
                    || (!valid_to.is_empty() && valid_to < cond.from)
                {
                    REJECT
                } else {
                    1.0
                }
            }
            SelectCondition::TimeBefore(cond) => {
                if !valid_from.is_empty() && valid_from > cond.from {
                    REJECT
                } else {
                    1.0
                }
            }
            SelectCondition::TimeAfter(cond) => {
                if !valid_to.is_empty() && valid_to < cond.from {
                    REJECT
                } else {
                    1.0
                }
            }
            SelectCondition::TimeOverlaps(cond) => {
                if (!valid_from.is_empty() && !cond.to.is_empty() && valid_from > cond.to)
                    || (!valid_to.is_empty() && !cond.from.is_empty() && valid_to < cond.from)
                {
                    REJECT
                } else {
                    1.0
                }
            }
            SelectCondition::TimeContains(cond) => {
                if (!valid_from.is_empty() && valid_from > cond.from)
                    || (!valid_to.is_empty() && valid_to < cond.to)
                {
                    REJECT
                } else {
                    1.0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn geoword_with_window(from: &str, to: &str) -> Geoword {
        Geoword {
            geoword_id: "g1".to_string(),
            typical_name: "Guanabara".to_string(),
            ne_class: "Estado".to_string(),
            dictionary_id: 2,
            hypernyms: vec!["Brasil".to_string()],
            latitude: Some(-22.9),
            longitude: Some(-43.2),
            priority: 1,
            valid_from: from.to_string(),
            valid_to: to.to_string(),
            prefixes: vec![],
            suffixes: vec![],
        }
    }

    #[test]
    fn test_normalize_ymd_formats() {
        assert_eq!(normalize_ymd("time-before", "2000-01-01").unwrap(), "20000101");
        assert_eq!(normalize_ymd("time-before", "20000101").unwrap(), "20000101");
        let err = normalize_ymd("time-before", "ontem").unwrap_err();
        assert!(err.to_string().contains("ontem"));
    }

    #[test]
    fn test_time_before_rejects_later_creation() {
        // Estado da Guanabara só passou a existir em 1960: não serve para 1950
        let cond =
            SelectCondition::configure("time-before", &json!("1950-01-01")).unwrap();
        let guanabara = geoword_with_window("19600421", "19750315");
        assert_eq!(cond.judge(&guanabara), REJECT);
        // Sem valid_from, aceita
        let eternal = geoword_with_window("", "");
        assert_eq!(cond.judge(&eternal), 1.0);
    }

    #[test]
    fn test_time_after_rejects_extinct() {
        let cond = SelectCondition::configure("time-after", &json!("2000-01-01")).unwrap();
        // Guanabara foi fundida ao Rio de Janeiro em 1975
        let guanabara = geoword_with_window("19600421", "19750315");
        assert_eq!(cond.judge(&guanabara), REJECT);
    }

    #[test]
    fn test_time_exists_window() {
        let cond = SelectCondition::configure("time-exists", &json!("1970-01-01")).unwrap();
        let guanabara = geoword_with_window("19600421", "19750315");
        assert_eq!(cond.judge(&guanabara), 1.0);
        let late = SelectCondition::configure("time-exists", &json!("1990-01-01")).unwrap();
        assert_eq!(late.judge(&guanabara), REJECT);
    }

    #[test]
    fn test_time_overlaps() {
        let cond = SelectCondition::configure(
            "time-overlaps",
            &json!(["1970-01-01", "1980-01-01"]),
        )
        .unwrap();
        let guanabara = geoword_with_window("19600421", "19750315");
        assert_eq!(cond.judge(&guanabara), 1.0);
        let cond2 = SelectCondition::configure(
            "time-overlaps",
            &json!(["1980-01-01", "1990-01-01"]),
        )
        .unwrap();
        assert_eq!(cond2.judge(&guanabara), REJECT);
    }

    #[test]
    fn test_time_contains_requires_full_window() {
        let cond = SelectCondition::configure(
            "time-contains",
            &json!(["1965-01-01", "1970-01-01"]),
        )
        .unwrap();
        let guanabara = geoword_with_window("19600421", "19750315");
        assert_eq!(cond.judge(&guanabara), 1.0);
        let wide = SelectCondition::configure(
            "time-contains",
            &json!(["1950-01-01", "1970-01-01"]),
        )
        .unwrap();
        assert_eq!(wide.judge(&guanabara), REJECT);
    }

    #[test]
    fn test_time_contains_arity() {
        assert!(SelectCondition::configure("time-contains", &json!("1970-01-01")).is_err());
        assert!(
            SelectCondition::configure("time-contains", &json!(["1970-01-01"])).is_err()
        );
    }

    #[test]
    fn test_malformed_date_reports_value() {
        let err =
            SelectCondition::configure("time-before", &json!("31/12/1999")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("time-before"));
        assert!(msg.contains("31/12/1999"));
    }

    #[cfg(feature = "spatial")]
    #[test]
    fn test_geo_contains_inline_polygon() {
        // Retângulo cobrindo o Paraná, coordenadas [lon, lat]
        let region = json!({
            "type": "Polygon",
            "coordinates": [[
                [-55.0, -27.0], [-48.0, -27.0], [-48.0, -22.5],
                [-55.0, -22.5], [-55.0, -27.0]
            ]]
        });
        let cond = SelectCondition::configure("geo-contains", &region).unwrap();
        let mut curitiba = geoword_with_window("", "");
        curitiba.latitude = Some(-25.4284);
        curitiba.longitude = Some(-49.2733);
        assert_eq!(cond.judge(&curitiba), 1.0);
        let mut manaus = geoword_with_window("", "");
        manaus.latitude = Some(-3.1);
        manaus.longitude = Some(-60.0);
        assert_eq!(cond.judge(&manaus), REJECT);
        // Sem coordenada não há veto
        let mut nowhere = geoword_with_window("", "");
        nowhere.latitude = None;
        nowhere.longitude = None;
        assert_eq!(cond.judge(&nowhere), 1.0);
    }

    #[cfg(feature = "spatial")]
    #[test]
    fn test_geo_disjoint_inline_polygon() {
        let region = json!({
            "type": "Polygon",
            "coordinates": [[
                [-55.0, -27.0], [-48.0, -27.0], [-48.0, -22.5],
                [-55.0, -22.5], [-55.0, -27.0]
            ]]
        });
        let cond = SelectCondition::configure("geo-disjoint", &region).unwrap();
        let mut curitiba = geoword_with_window("", "");
        curitiba.latitude = Some(-25.4284);
        curitiba.longitude = Some(-49.2733);
        assert_eq!(cond.judge(&curitiba), REJECT);
    }
}
