//! # Centroide Espacial Ponderado
//!
//! Acumulador do "centro de gravidade" geográfico do discurso: cada token
//! georreferenciado contribui com suas coordenadas, ponderadas pela confiança
//! que a quantidade de pontos distintos inspira — um token com um único ponto
//! possível pesa muito (10), dois pontos pesam menos (5), três quase nada (1)
//! e quatro ou mais não informam nada (0). O centroide resultante serve de
//! âncora para o bônus espacial do escore de plausibilidade.

/// Tolerância de igualdade entre pontos: distância quadrática em graus.
const DEDUP_EPSILON: f64 = 1e-4;

/// Tabela de pesos pela quantidade de pontos distintos.
fn weight_for(distinct: usize) -> i64 {
    match distinct {
        1 => 10,
        2 => 5,
        3 => 1,
        _ => 0,
    }
}

/// Soma ponderada corrente `(Σ w·lat, Σ w·lon, Σ w)`.
#[derive(Debug, Clone, Default)]
pub struct SpatialCentroid {
    cumulative_lat: f64,
    cumulative_lon: f64,
    cumulative_weight: i64,
}

impl SpatialCentroid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra os pontos de um token. Pontos a menos de `DEDUP_EPSILON` de
    /// distância quadrática são fundidos antes da pesagem; cada ponto
    /// distinto entra com o peso da tabela. Sem efeito quando o peso é 0.
    pub fn add_points(&mut self, points: &[(f64, f64)]) {
        let mut distinct: Vec<(f64, f64)> = Vec::new();
        for &(lat, lon) in points {
            let duplicated = distinct.iter().any(|&(dlat, dlon)| {
                (lat - dlat) * (lat - dlat) + (lon - dlon) * (lon - dlon) < DEDUP_EPSILON
            });
            if !duplicated {
                distinct.push((lat, lon));
            }
        }
        let weight = weight_for(distinct.len());
        if weight > 0 {
            for (lat, lon) in distinct {
                self.cumulative_lat += weight as f64 * lat;
                self.cumulative_lon += weight as f64 * lon;
                self.cumulative_weight += weight;
            }
        }
    }

    /// Registra o elemento mais profundo de um endereço resolvido. O peso vem
    /// da quantidade de candidatos de endereço (mesma tabela), escalado pela
    /// profundidade hierárquica do elemento.
    pub fn add_address_element(
        &mut self,
        latitude: f64,
        longitude: f64,
        level: i32,
        candidate_count: usize,
    ) {
        let weight = weight_for(candidate_count);
        if weight > 0 && level > 0 {
            let scaled = weight * level as i64;
            self.cumulative_lat += scaled as f64 * latitude;
            self.cumulative_lon += scaled as f64 * longitude;
            self.cumulative_weight += scaled;
        }
    }

    /// Centroide corrente, ou `None` enquanto nenhum ponto ponderado entrou.
    /// Chamadores devem tratar `None` como "bônus espacial zero".
    pub fn value(&self) -> Option<(f64, f64)> {
        if self.cumulative_weight > 0 {
            Some((
                self.cumulative_lat / self.cumulative_weight as f64,
                self.cumulative_lon / self.cumulative_weight as f64,
            ))
        } else {
            None
        }
    }

    /// Peso acumulado (0 = sem centroide confiável).
    pub fn weight(&self) -> i64 {
        self.cumulative_weight
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Distância em linha reta entre duas coordenadas, em quilômetros
/// (fórmula de haversine sobre a esfera média).
pub fn latlon_dist(lat0: f64, lon0: f64, lat1: f64, lon1: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let dlat = (lat1 - lat0).to_radians();
    let dlon = (lon1 - lon0).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat0.to_radians().cos() * lat1.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_point_weight() {
        let mut centroid = SpatialCentroid::new();
        centroid.add_points(&[(-25.4284, -49.2733)]);
        assert_eq!(centroid.weight(), 10);
        let (lat, lon) = centroid.value().unwrap();
        assert!((lat - -25.4284).abs() < 1e-9);
        assert!((lon - -49.2733).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_points_merge_before_weighing() {
        let mut centroid = SpatialCentroid::new();
        // O mesmo ponto duas vezes (dentro do epsilon) conta como 1 distinto:
        // peso 10, não 5
        centroid.add_points(&[(-25.4284, -49.2733), (-25.4284, -49.27331)]);
        assert_eq!(centroid.weight(), 10);
    }

    #[test]
    fn test_two_distinct_points_weigh_five_each() {
        let mut centroid = SpatialCentroid::new();
        centroid.add_points(&[(-25.43, -49.27), (-23.55, -46.63)]);
        assert_eq!(centroid.weight(), 10); // 5 + 5
    }

    #[test]
    fn test_four_points_contribute_nothing() {
        let mut centroid = SpatialCentroid::new();
        centroid.add_points(&[
            (-25.43, -49.27),
            (-23.55, -46.63),
            (-29.68, -53.81),
            (-15.79, -47.88),
        ]);
        assert_eq!(centroid.weight(), 0);
        assert!(centroid.value().is_none());
    }

    #[test]
    fn test_address_element_scales_by_level() {
        let mut centroid = SpatialCentroid::new();
        centroid.add_address_element(-25.4284, -49.2733, 3, 1);
        assert_eq!(centroid.weight(), 30); // 10 × nível 3
    }

    #[test]
    fn test_latlon_dist_known_pair() {
        // Curitiba → São Paulo: ~340 km em linha reta
        let d = latlon_dist(-25.4284, -49.2733, -23.5505, -46.6333);
        assert!((300.0..380.0).contains(&d), "distância fora do esperado: {d}");
    }

    #[test]
    fn test_latlon_dist_zero() {
        assert!(latlon_dist(-25.0, -49.0, -25.0, -49.0).abs() < 1e-9);
    }
}
