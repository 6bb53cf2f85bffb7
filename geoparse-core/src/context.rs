//! # Contexto de Desambiguação
//!
//! O coração do geoparser. O contexto acumula os tokens de uma sessão em uma
//! fila, registra as características de **todo** candidato visto nas relações
//! de *pool* e as dos vencedores já escolhidos nas relações *selecionadas*, e
//! resolve cada token ambíguo pelo protocolo em três passos:
//!
//! 1. **Acumular** ([`Context::add_nodes`]): cada candidato alimenta as cinco
//!    relações de pool (classe, dicionário, hiperônimos, conjunto completo de
//!    hiperônimos, nome) e o centroide espacial.
//! 2. **Avaliar** ([`Context::evaluate`]): varredura única da fila; para cada
//!    token ambíguo, pesos iniciais (repesagem externa opcional), condições
//!    de seleção com curto-circuito, escore de plausibilidade contra pool e
//!    selecionadas, escolha do vencedor e registro dele nas relações
//!    selecionadas.
//! 3. **Drenar** ([`Context::flush_nodes`]): devolve uma sentença anotada,
//!    aplicando o limiar de demoção e concatenando trechos de texto puro;
//!    os nós drenados viram marcadores em posição, de modo que chamadas
//!    repetidas são idempotentes e as relações continuam válidas para tokens
//!    enfileirados depois.
//!
//! Uma sessão = um contexto; sem segurança para mutação concorrente (o
//! chamador serializa ou tranca externamente).

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::centroid::{latlon_dist, SpatialCentroid};
use crate::condition::SelectCondition;
use crate::dist::WeightService;
use crate::error::Result;
use crate::geoword::Geoword;
use crate::options::ParseOptions;
use crate::relation::{RelationBundle, RelationKey};

/// Raio de interesse padrão, em km.
const DEFAULT_TOPIC_RADIUS: f64 = 10.0;

/// Pesos cujo produto "arredondado para zero" é recuperado para 1 quando o
/// peso original passa deste epsilon.
const WEIGHT_EPSILON: f64 = 0.001;

/// Sigmoide deslocada: mapeia `[0, ∞)` em `[0, 1)`, com `sigmoid(a, 0) = 0`.
fn sigmoid(a: f64, x: f64) -> f64 {
    -1.0 + 2.0 / (1.0 + (-a * x).exp())
}

/// Token ambíguo na fila: superfície + candidatos empatados.
#[derive(Debug, Clone)]
pub struct GeowordNode {
    pub surface: String,
    /// Posição no fluxo acumulado (atribuída em `add_nodes`).
    pub position: usize,
    pub candidates: Vec<Geoword>,
    /// Escores por candidato, preenchidos por `evaluate` (informativo).
    pub scores: Vec<f64>,
    /// Índice do candidato vencedor, se já avaliado.
    pub resolved: Option<usize>,
    /// Escore final do vencedor.
    pub score: Option<f64>,
    /// Prefixo residual recuperado da superfície.
    pub with_prefix: Option<String>,
    /// Sufixo residual recuperado da superfície.
    pub with_suffix: Option<String>,
    /// Plausibilidade atribuída pelo classificador, quando consultado.
    pub probability: Option<f64>,
}

/// Token de endereço na fila: candidatos do geocodificador externo.
#[derive(Debug, Clone)]
pub struct AddressNode {
    pub surface: String,
    pub position: usize,
    pub candidates: Vec<Address>,
    pub resolved: Option<usize>,
}

/// Um lugar da fila de processamento.
#[derive(Debug, Clone)]
pub enum ContextNode {
    /// Marcador de fim de sentença. Não ocupa posição no fluxo.
    SentenceBreak,
    /// Nó já drenado; mantido em posição para idempotência do flush.
    Flushed,
    /// Texto comum, sem interpretação geográfica.
    Plain { surface: String, position: usize },
    Geowords(GeowordNode),
    Address(AddressNode),
}

impl ContextNode {
    /// Constrói um nó de texto puro (posição definida em `add_nodes`).
    pub fn plain(surface: impl Into<String>) -> Self {
        ContextNode::Plain {
            surface: surface.into(),
            position: 0,
        }
    }

    /// Constrói um nó de token ambíguo.
    pub fn geowords(surface: impl Into<String>, candidates: Vec<Geoword>) -> Self {
        ContextNode::Geowords(GeowordNode {
            surface: surface.into(),
            position: 0,
            candidates,
            scores: Vec::new(),
            resolved: None,
            score: None,
            with_prefix: None,
            with_suffix: None,
            probability: None,
        })
    }

    /// Constrói um nó de endereço.
    pub fn address(surface: impl Into<String>, candidates: Vec<Address>) -> Self {
        ContextNode::Address(AddressNode {
            surface: surface.into(),
            position: 0,
            candidates,
            resolved: None,
        })
    }
}

/// Registro anotado devolvido pelo flush, um por token de saída.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedToken {
    pub surface: String,
    /// Interpretação geográfica escolhida.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<Geoword>,
    /// Endereço resolvido.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Escore final (com `show-score`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Lista de candidatos: sempre presente em tokens ainda não avaliados,
    /// e em tokens resolvidos quando `show-candidate` está ativo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<Geoword>>,
    /// Candidatos de endereço (com `show-candidate`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_candidates: Option<Vec<Address>>,
    /// Prefixo residual recuperado.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with_prefix: Option<String>,
    /// Sufixo residual recuperado.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with_suffix: Option<String>,
}

impl ParsedToken {
    fn text(surface: impl Into<String>) -> Self {
        ParsedToken {
            surface: surface.into(),
            ..Default::default()
        }
    }

    /// É texto puro, sujeito à concatenação de trechos adjacentes?
    fn is_plain_text(&self) -> bool {
        self.geo.is_none()
            && self.address.is_none()
            && self.candidates.is_none()
            && self.address_candidates.is_none()
    }
}

/// O contexto de desambiguação de uma sessão.
pub struct Context {
    /// Relações alimentadas por todo candidato visto.
    pool: RelationBundle,
    /// Relações alimentadas só pelos vencedores já escolhidos.
    selected: RelationBundle,
    centroid: SpatialCentroid,
    conditions: Vec<SelectCondition>,
    topic_points: Vec<(f64, f64)>,
    topic_radius: f64,
    threshold: i64,
    show_score: bool,
    show_candidate: bool,
    weight_service: Option<Box<dyn WeightService>>,
    nodes: Vec<ContextNode>,
    /// Próxima posição do fluxo (monotônica; marcadores de sentença não
    /// ocupam posição).
    next_position: usize,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Context {
            pool: RelationBundle::new(),
            selected: RelationBundle::new(),
            centroid: SpatialCentroid::new(),
            conditions: Vec::new(),
            topic_points: Vec::new(),
            topic_radius: DEFAULT_TOPIC_RADIUS,
            threshold: 0,
            show_score: false,
            show_candidate: false,
            weight_service: None,
            nodes: Vec::new(),
            next_position: 0,
        }
    }

    /// Reconfigura o contexto a partir das opções. O estado acumulado é
    /// zerado (as opções valem para um novo discurso) e as condições de
    /// seleção são reconstruídas na ordem fixa de registro.
    pub fn set_options(&mut self, options: &ParseOptions) -> Result<()> {
        self.clear();
        if let Some(points) = &options.topic_point {
            self.topic_points = points.chunks(2).filter(|c| c.len() == 2).map(|c| (c[0], c[1])).collect();
        }
        self.topic_radius = options.topic_radius.unwrap_or(DEFAULT_TOPIC_RADIUS);
        self.threshold = options.threshold.unwrap_or(0);
        self.show_score = options.show_score.unwrap_or(false);
        self.show_candidate = options.show_candidate.unwrap_or(false);
        for (key, value) in options.condition_entries() {
            self.conditions.push(SelectCondition::configure(key, value)?);
        }
        Ok(())
    }

    /// Instala (ou remove) o serviço de repesagem externa.
    pub fn set_weight_service(&mut self, service: Option<Box<dyn WeightService>>) {
        self.weight_service = service;
    }

    /// Zera relações, centroide, fila, pontos de interesse e condições.
    /// Referências já devolvidas ao chamador não são afetadas.
    pub fn clear(&mut self) {
        self.pool.clear();
        self.selected.clear();
        self.centroid.clear();
        self.conditions.clear();
        self.topic_points.clear();
        self.topic_radius = DEFAULT_TOPIC_RADIUS;
        self.weight_service = None;
        self.nodes.clear();
        self.next_position = 0;
    }

    /// Condições de seleção ativas (para inspeção/testes).
    pub fn conditions(&self) -> &[SelectCondition] {
        &self.conditions
    }

    /// Centroide espacial corrente.
    pub fn centroid(&self) -> &SpatialCentroid {
        &self.centroid
    }

    /// Nós ainda na fila (inclui drenados, que ficam em posição).
    pub fn queued(&self) -> &[ContextNode] {
        &self.nodes
    }

    /// Expira das relações toda ocorrência com posição ≤ `n` (poda de janela
    /// deslizante; deve ser invocada pelo chamador quando memória importa).
    pub fn expire(&mut self, n: usize) {
        self.pool.expire(n);
        self.selected.expire(n);
    }

    /// Acrescenta nós ao fim da fila, atribuindo posições e registrando cada
    /// candidato nas relações de pool e no centroide.
    pub fn add_nodes(&mut self, nodes: Vec<ContextNode>) {
        for mut node in nodes {
            match &mut node {
                ContextNode::SentenceBreak | ContextNode::Flushed => {}
                ContextNode::Plain { position, .. } => {
                    *position = self.next_position;
                    self.next_position += 1;
                }
                ContextNode::Geowords(gw) => {
                    gw.position = self.next_position;
                    self.next_position += 1;
                    for (slot, candidate) in gw.candidates.iter().enumerate() {
                        self.pool.add_geoword(candidate, gw.position, slot);
                    }
                    let points: Vec<(f64, f64)> = gw
                        .candidates
                        .iter()
                        .filter_map(|c| c.coordinates())
                        .collect();
                    self.centroid.add_points(&points);
                }
                ContextNode::Address(addr) => {
                    addr.position = self.next_position;
                    self.next_position += 1;
                    let candidate_count = addr.candidates.len();
                    for address in &addr.candidates {
                        for (slot, element) in address.elements.iter().enumerate() {
                            if let Some(geoword) = &element.geoword {
                                self.pool.add_geoword(geoword, addr.position, slot);
                            }
                        }
                        if let Some(deepest) = address.elements.last() {
                            self.centroid.add_address_element(
                                deepest.latitude,
                                deepest.longitude,
                                deepest.level,
                                candidate_count,
                            );
                        }
                    }
                }
            }
            self.nodes.push(node);
        }
    }

    /// Escore de plausibilidade de um candidato contra um conjunto de
    /// relações, na posição `n`.
    fn relation_score(&self, bundle: &RelationBundle, geoword: &Geoword, n: usize) -> f64 {
        let id = &geoword.geoword_id;
        // Hiperônimos do candidato presentes como *nomes* no contexto
        let nparent: usize = geoword
            .hypernyms
            .iter()
            .map(|h| bundle.get(RelationKey::Name).count_all(h, id, n))
            .sum();
        // Lugares do contexto que têm este candidato como hiperônimo
        let nchild = bundle
            .get(RelationKey::Hypernym)
            .count_all(&geoword.typical_name, id, n);
        let nclass = bundle
            .get(RelationKey::NeClass)
            .count_all(&geoword.ne_class, id, n);
        let ndictionary = bundle
            .get(RelationKey::Dictionary)
            .count_all(&geoword.dictionary_id.to_string(), id, n);
        // Irmãos: compartilham ao menos um hiperônimo
        let nsibling: usize = geoword
            .hypernyms
            .iter()
            .map(|h| bundle.get(RelationKey::Hypernym).count_all(h, id, n))
            .sum();
        // Irmãos plenos: o conjunto completo de hiperônimos coincide
        let nfullsibling = geoword
            .full_hypernym_key()
            .map(|key| bundle.get(RelationKey::FullHypernym).count_all(&key, id, n))
            .unwrap_or(0);

        1500.0 * sigmoid(1.0, nfullsibling as f64)
            + 500.0 * sigmoid(1.0, nsibling as f64)
            + 1500.0 * sigmoid(1.0, nchild as f64)
            + 2000.0 * sigmoid(1.0, nparent as f64)
            + 200.0 * sigmoid(1.0, nclass as f64)
            + 100.0 * sigmoid(1.0, ndictionary as f64)
            + 100.0 * f64::from(geoword.priority)
    }

    /// Bônus por proximidade espacial: pontos de interesse explícitos quando
    /// configurados, senão o centroide corrente. Zero sem coordenada ou sem
    /// centroide confiável.
    fn spatial_bonus(&self, geoword: &Geoword) -> f64 {
        let Some((lat, lon)) = geoword.coordinates() else {
            return 0.0;
        };
        let radius = self.topic_radius;
        if !self.topic_points.is_empty() {
            self.topic_points
                .iter()
                .map(|&(tlat, tlon)| {
                    let dist = latlon_dist(lat, lon, tlat, tlon);
                    if dist < radius {
                        100.0 * (radius - dist) / radius
                    } else {
                        0.0
                    }
                })
                .sum()
        } else if let Some((clat, clon)) = self.centroid.value() {
            let dist = latlon_dist(lat, lon, clat, clon);
            if dist < radius {
                100.0 * (radius - dist) / radius
            } else {
                0.0
            }
        } else {
            0.0
        }
    }

    /// Escore contra as relações de pool (inclui o bônus espacial — termo
    /// independente do conjunto de relações, aplicado uma única vez).
    fn pool_score(&self, geoword: &Geoword, n: usize) -> f64 {
        self.relation_score(&self.pool, geoword, n) + self.spatial_bonus(geoword)
    }

    /// Escore contra as relações selecionadas.
    fn selected_score(&self, geoword: &Geoword, n: usize) -> f64 {
        self.relation_score(&self.selected, geoword, n)
    }

    /// Avalia os nós ainda não resolvidos da fila, escolhendo o melhor
    /// candidato de cada token ambíguo e de cada endereço.
    pub fn evaluate(&mut self) {
        let mut nodes = std::mem::take(&mut self.nodes);
        for node in nodes.iter_mut() {
            match node {
                ContextNode::Geowords(gw) if gw.resolved.is_none() && gw.scores.is_empty() => {
                    self.evaluate_geowords(gw);
                }
                ContextNode::Address(addr) if addr.resolved.is_none() => {
                    self.evaluate_address(addr);
                }
                _ => {}
            }
        }
        self.nodes = nodes;
    }

    fn evaluate_geowords(&mut self, gw: &mut GeowordNode) {
        if gw.candidates.is_empty() {
            return;
        }
        let n = gw.position;

        // Pesos iniciais: 1.0, ou o vetor do serviço de repesagem adotado
        // verbatim. Falha do serviço degrada para "sem repesagem".
        let mut weights = vec![1.0f64; gw.candidates.len()];
        if let Some(service) = self.weight_service.as_mut() {
            let coords: Vec<(f64, f64)> = gw
                .candidates
                .iter()
                .map(|c| c.coordinates().unwrap_or((0.0, 0.0)))
                .collect();
            match service.weights(&coords) {
                Ok(external) if external.len() == weights.len() => weights = external,
                Ok(external) => {
                    tracing::warn!(
                        esperado = weights.len(),
                        recebido = external.len(),
                        "vetor de pesos com tamanho errado; repesagem ignorada"
                    );
                }
                Err(e) => {
                    tracing::warn!(erro = %e, "repesagem externa indisponível; pesos 1.0");
                }
            }
        }

        // Condições de seleção, na ordem de registro, com curto-circuito
        for (i, candidate) in gw.candidates.iter().enumerate() {
            for condition in &self.conditions {
                if weights[i] < 0.0 {
                    break;
                }
                let result = condition.judge(candidate);
                if result < 0.0 {
                    weights[i] = crate::condition::REJECT;
                } else {
                    weights[i] *= result;
                }
            }
        }

        // Escore final e escolha do vencedor (empate: primeiro encontrado)
        let mut best: Option<(usize, f64)> = None;
        let mut scores = Vec::with_capacity(gw.candidates.len());
        for (i, candidate) in gw.candidates.iter().enumerate() {
            let base = 1.0 + self.pool_score(candidate, n) + self.selected_score(candidate, n);
            let mut score = base * weights[i];
            if weights[i] > WEIGHT_EPSILON && score.trunc() == 0.0 {
                // Peso positivo minúsculo não pode eliminar o candidato
                score = 1.0;
            }
            tracing::debug!(
                candidato = %candidate.geoword_id,
                escore = score,
                peso = weights[i],
                "avaliação de candidato"
            );
            scores.push(score);
            if best.map_or(true, |(_, hi)| score > hi) && score >= 0.0 {
                best = Some((i, score));
            }
        }
        gw.scores = scores;

        if let Some((winner_idx, winner_score)) = best {
            let winner = gw.candidates[winner_idx].clone();
            if let Some((prefix, suffix)) = winner.parts_for_surface(&gw.surface) {
                if !prefix.is_empty() {
                    gw.with_prefix = Some(prefix);
                }
                if !suffix.is_empty() {
                    gw.with_suffix = Some(suffix);
                }
            }
            self.selected.add_geoword(&winner, n, 0);
            gw.resolved = Some(winner_idx);
            gw.score = Some(winner_score);
        }
        // Todos os candidatos vetados: o token fica sem resolução e sai do
        // flush com a lista de candidatos intacta, sem vencedor.
    }

    fn evaluate_address(&mut self, addr: &mut AddressNode) {
        if addr.candidates.is_empty() {
            return;
        }
        // Centroide calculado uma vez por nó; a avaliação não o atualiza
        let Some((clat, clon)) = self.centroid.value() else {
            addr.resolved = Some(0);
            return;
        };
        let mut best: Option<(usize, f64)> = None;
        for (i, address) in addr.candidates.iter().enumerate() {
            let Some((lat, lon)) = address.coordinates() else {
                continue;
            };
            let square_dist = (clat - lat) * (clat - lat) + (clon - lon) * (clon - lon);
            if best.map_or(true, |(_, min)| square_dist < min) {
                best = Some((i, square_dist));
            }
        }
        addr.resolved = best.map(|(i, _)| i).or(Some(0));
    }

    /// Drena da cabeça da fila até (exclusive) o próximo marcador de fim de
    /// sentença, devolvendo os registros anotados. Nós drenados viram
    /// [`ContextNode::Flushed`] em posição; as relações não são tocadas.
    pub fn flush_nodes(&mut self) -> Vec<ParsedToken> {
        let mut raw: Vec<ParsedToken> = Vec::new();
        let mut i = 0;
        // Avança sobre a parte já drenada
        while matches!(self.nodes.get(i), Some(ContextNode::Flushed)) {
            i += 1;
        }
        while i < self.nodes.len() {
            let node = std::mem::replace(&mut self.nodes[i], ContextNode::Flushed);
            match node {
                ContextNode::Flushed => {}
                ContextNode::SentenceBreak => break, // fim da sentença corrente
                ContextNode::Plain { surface, .. } => raw.push(ParsedToken::text(surface)),
                ContextNode::Geowords(gw) => raw.push(self.flush_geowords(gw)),
                ContextNode::Address(addr) => raw.push(self.flush_address(addr)),
            }
            i += 1;
        }

        // Concatena trechos adjacentes de texto puro (inclusive rebaixados)
        let mut results: Vec<ParsedToken> = Vec::new();
        let mut pending_text = String::new();
        for token in raw {
            if token.is_plain_text() {
                pending_text.push_str(&token.surface);
            } else {
                if !pending_text.is_empty() {
                    results.push(ParsedToken::text(std::mem::take(&mut pending_text)));
                }
                results.push(token);
            }
        }
        if !pending_text.is_empty() {
            results.push(ParsedToken::text(pending_text));
        }
        results
    }

    fn flush_geowords(&self, gw: GeowordNode) -> ParsedToken {
        match gw.resolved {
            Some(winner_idx) => {
                let score = gw.score.unwrap_or(0.0);
                let has_affix = gw.with_prefix.is_some() || gw.with_suffix.is_some();
                if score < self.threshold as f64 && !has_affix {
                    // Abaixo do limiar e sem afixo recuperado: não é
                    // geo-palavra, só a superfície sobrevive
                    return ParsedToken::text(gw.surface);
                }
                ParsedToken {
                    surface: gw.surface,
                    geo: Some(gw.candidates[winner_idx].clone()),
                    score: self.show_score.then_some(score),
                    candidates: self.show_candidate.then_some(gw.candidates),
                    with_prefix: gw.with_prefix,
                    with_suffix: gw.with_suffix,
                    ..Default::default()
                }
            }
            // Sem avaliação não há vencedor: os candidatos saem intactos
            None => ParsedToken {
                surface: gw.surface,
                candidates: Some(gw.candidates),
                ..Default::default()
            },
        }
    }

    fn flush_address(&self, addr: AddressNode) -> ParsedToken {
        match addr.resolved {
            Some(idx) => ParsedToken {
                surface: addr.surface,
                address: addr.candidates.get(idx).cloned(),
                address_candidates: self.show_candidate.then_some(addr.candidates),
                ..Default::default()
            },
            None => ParsedToken {
                surface: addr.surface,
                address_candidates: Some(addr.candidates),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressElement;

    fn geoword(id: &str, name: &str, class: &str, hypernyms: &[&str], coords: Option<(f64, f64)>) -> Geoword {
        Geoword {
            geoword_id: id.to_string(),
            typical_name: name.to_string(),
            ne_class: class.to_string(),
            dictionary_id: 1,
            hypernyms: hypernyms.iter().map(|s| s.to_string()).collect(),
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            priority: 1,
            valid_from: String::new(),
            valid_to: String::new(),
            prefixes: vec![],
            suffixes: vec![],
        }
    }

    #[test]
    fn test_sigmoid_bounds() {
        assert_eq!(sigmoid(1.0, 0.0), 0.0);
        let mut previous = -1.0;
        for x in 0..50 {
            let v = sigmoid(1.0, x as f64);
            assert!((0.0..1.0).contains(&v), "sigmoid({x}) = {v}");
            assert!(v >= previous, "sigmoide deve ser monótona");
            previous = v;
        }
    }

    #[test]
    fn test_context_shared_hypernym_wins() {
        // "Londrina" (só Paraná) já resolvida; "Palmeira" é ambígua entre
        // Paraná e Santa Catarina — o contexto deve puxar a do Paraná
        let mut context = Context::new();
        let londrina = geoword(
            "br-pr-londrina",
            "Londrina",
            "Município",
            &["Paraná", "Brasil"],
            Some((-23.31, -51.16)),
        );
        let palmeira_pr = geoword(
            "br-pr-palmeira",
            "Palmeira",
            "Município",
            &["Paraná", "Brasil"],
            Some((-25.43, -50.01)),
        );
        let palmeira_sc = geoword(
            "br-sc-palmeira",
            "Palmeira",
            "Município",
            &["Santa Catarina", "Brasil"],
            Some((-27.58, -50.16)),
        );
        context.add_nodes(vec![
            ContextNode::geowords("Londrina", vec![londrina]),
            ContextNode::plain(" fica perto de "),
            ContextNode::geowords("Palmeira", vec![palmeira_sc, palmeira_pr]),
            ContextNode::SentenceBreak,
        ]);
        context.evaluate();
        let tokens = context.flush_nodes();
        let palmeira = tokens
            .iter()
            .find(|t| t.surface == "Palmeira")
            .expect("token Palmeira");
        assert_eq!(
            palmeira.geo.as_ref().unwrap().geoword_id,
            "br-pr-palmeira",
            "o candidato com hiperônimo compartilhado deve vencer"
        );
    }

    #[test]
    fn test_no_support_falls_back_to_first() {
        // Sem contexto nenhum e prioridades iguais, vence o primeiro da lista
        let mut context = Context::new();
        let a = geoword("a", "Palmeira", "Município", &["Paraná"], None);
        let b = geoword("b", "Palmeira", "Município", &["Santa Catarina"], None);
        context.add_nodes(vec![
            ContextNode::geowords("Palmeira", vec![a, b]),
            ContextNode::SentenceBreak,
        ]);
        context.evaluate();
        let tokens = context.flush_nodes();
        assert_eq!(tokens[0].geo.as_ref().unwrap().geoword_id, "a");
    }

    #[test]
    fn test_time_before_filter_rejects() {
        // Cenário: referência 2000-01-01; candidato criado em 2001 é vetado,
        // candidato sem valid_from passa
        let mut context = Context::new();
        let options = ParseOptions::from_value(&serde_json::json!({
            "time-before": "2000-01-01"
        }))
        .unwrap();
        context.set_options(&options).unwrap();

        let mut newer = geoword("novo", "Vila Nova", "Município", &[], None);
        newer.valid_from = "20010101".to_string();
        newer.priority = 10; // mesmo com prioridade alta, o veto prevalece
        let timeless = geoword("antigo", "Vila Nova", "Município", &[], None);

        context.add_nodes(vec![
            ContextNode::geowords("Vila Nova", vec![newer, timeless]),
            ContextNode::SentenceBreak,
        ]);
        context.evaluate();
        let tokens = context.flush_nodes();
        assert_eq!(tokens[0].geo.as_ref().unwrap().geoword_id, "antigo");
    }

    #[test]
    fn test_all_candidates_rejected_leaves_unresolved() {
        let mut context = Context::new();
        let options = ParseOptions::from_value(&serde_json::json!({
            "time-before": "1900-01-01"
        }))
        .unwrap();
        context.set_options(&options).unwrap();
        let mut only = geoword("novo", "Vila Nova", "Município", &[], None);
        only.valid_from = "19600101".to_string();
        context.add_nodes(vec![
            ContextNode::geowords("Vila Nova", vec![only]),
            ContextNode::SentenceBreak,
        ]);
        context.evaluate();
        let tokens = context.flush_nodes();
        // Vetado: vira texto puro
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].geo.is_none());
        assert_eq!(tokens[0].surface, "Vila Nova");
    }

    #[test]
    fn test_threshold_demotes_without_affix() {
        // Um token isolado sem apoio contextual fica com escore baixo; com
        // limiar acima disso, é rebaixado e concatenado ao texto vizinho
        let mut context = Context::new();
        let options =
            ParseOptions::from_value(&serde_json::json!({"threshold": 500})).unwrap();
        context.set_options(&options).unwrap();
        let solitary = geoword("x", "Mafra", "Município", &["Santa Catarina"], None);
        context.add_nodes(vec![
            ContextNode::plain("perto de "),
            ContextNode::geowords("Mafra", vec![solitary]),
            ContextNode::SentenceBreak,
        ]);
        context.evaluate();
        let tokens = context.flush_nodes();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].surface, "perto de Mafra");
        assert!(tokens[0].geo.is_none());
    }

    #[test]
    fn test_threshold_keeps_token_with_recovered_suffix() {
        let mut context = Context::new();
        let options =
            ParseOptions::from_value(&serde_json::json!({"threshold": 500})).unwrap();
        context.set_options(&options).unwrap();
        let mut with_suffix = geoword("x", "Mafra", "Município", &["Santa Catarina"], None);
        with_suffix.suffixes = vec!["-SC".to_string()];
        context.add_nodes(vec![
            ContextNode::geowords("Mafra-SC", vec![with_suffix]),
            ContextNode::SentenceBreak,
        ]);
        context.evaluate();
        let tokens = context.flush_nodes();
        assert!(tokens[0].geo.is_some(), "sufixo recuperado segura a anotação");
        assert_eq!(tokens[0].with_suffix.as_deref(), Some("-SC"));
    }

    #[test]
    fn test_flush_without_evaluate_keeps_candidates() {
        // Rodada completa sem evaluate: nenhum vencedor pode ter sido
        // escolhido e a lista de candidatos sai intacta
        let mut context = Context::new();
        let a = geoword("a", "Palmeira", "Município", &["Paraná"], None);
        let b = geoword("b", "Palmeira", "Município", &["Santa Catarina"], None);
        context.add_nodes(vec![
            ContextNode::geowords("Palmeira", vec![a, b]),
            ContextNode::SentenceBreak,
        ]);
        let tokens = context.flush_nodes();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].geo.is_none());
        assert_eq!(tokens[0].candidates.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_flush_is_per_sentence_and_idempotent() {
        let mut context = Context::new();
        context.add_nodes(vec![
            ContextNode::plain("primeira"),
            ContextNode::SentenceBreak,
            ContextNode::plain("segunda"),
            ContextNode::SentenceBreak,
        ]);
        context.evaluate();
        let first = context.flush_nodes();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].surface, "primeira");
        let second = context.flush_nodes();
        assert_eq!(second[0].surface, "segunda");
        assert!(context.flush_nodes().is_empty());
        assert!(context.flush_nodes().is_empty());
    }

    #[test]
    fn test_external_weights_replace_defaults() {
        struct FixedWeights(Vec<f64>);
        impl WeightService for FixedWeights {
            fn weights(&mut self, _coords: &[(f64, f64)]) -> Result<Vec<f64>> {
                Ok(self.0.clone())
            }
        }
        let mut context = Context::new();
        // O serviço externo inverte a preferência natural (primeiro da lista)
        context.set_weight_service(Some(Box::new(FixedWeights(vec![0.1, 3.0]))));
        let a = geoword("a", "Palmeira", "Município", &[], Some((-25.0, -50.0)));
        let b = geoword("b", "Palmeira", "Município", &[], Some((-27.0, -50.0)));
        context.add_nodes(vec![
            ContextNode::geowords("Palmeira", vec![a, b]),
            ContextNode::SentenceBreak,
        ]);
        context.evaluate();
        let tokens = context.flush_nodes();
        assert_eq!(tokens[0].geo.as_ref().unwrap().geoword_id, "b");
    }

    #[test]
    fn test_weight_service_failure_degrades_to_unit_weights() {
        struct Broken;
        impl WeightService for Broken {
            fn weights(&mut self, _coords: &[(f64, f64)]) -> Result<Vec<f64>> {
                Err(crate::error::GeoParseError::dist("sem conexão"))
            }
        }
        let mut context = Context::new();
        context.set_weight_service(Some(Box::new(Broken)));
        let a = geoword("a", "Palmeira", "Município", &[], None);
        context.add_nodes(vec![
            ContextNode::geowords("Palmeira", vec![a]),
            ContextNode::SentenceBreak,
        ]);
        context.evaluate();
        let tokens = context.flush_nodes();
        assert!(tokens[0].geo.is_some(), "a análise segue sem repesagem");
    }

    #[test]
    fn test_tiny_positive_weight_does_not_eliminate() {
        struct FixedWeights(Vec<f64>);
        impl WeightService for FixedWeights {
            fn weights(&mut self, _coords: &[(f64, f64)]) -> Result<Vec<f64>> {
                Ok(self.0.clone())
            }
        }
        let mut context = Context::new();
        context.set_weight_service(Some(Box::new(FixedWeights(vec![0.002]))));
        let a = geoword("a", "Palmeira", "Município", &[], None);
        context.add_nodes(vec![
            ContextNode::geowords("Palmeira", vec![a]),
            ContextNode::SentenceBreak,
        ]);
        context.evaluate();
        let tokens = context.flush_nodes();
        // O produto truncaria para 0; o clamp garante escore 1
        assert!(tokens[0].geo.is_some());
    }

    #[test]
    fn test_address_picks_candidate_nearest_centroid() {
        let mut context = Context::new();
        // Âncora o centroide em Curitiba
        let curitiba = geoword(
            "br-pr-curitiba",
            "Curitiba",
            "Município",
            &["Paraná", "Brasil"],
            Some((-25.4284, -49.2733)),
        );
        let near = Address {
            surface: "Rua XV".to_string(),
            standard_form: "Curitiba, Rua XV".to_string(),
            elements: vec![AddressElement {
                level: 2,
                name: "Curitiba".to_string(),
                latitude: -25.43,
                longitude: -49.27,
                geoword: None,
            }],
        };
        let far = Address {
            surface: "Rua XV".to_string(),
            standard_form: "Manaus, Rua XV".to_string(),
            elements: vec![AddressElement {
                level: 2,
                name: "Manaus".to_string(),
                latitude: -3.1,
                longitude: -60.0,
                geoword: None,
            }],
        };
        context.add_nodes(vec![
            ContextNode::geowords("Curitiba", vec![curitiba]),
            ContextNode::address("Rua XV", vec![far, near]),
            ContextNode::SentenceBreak,
        ]);
        context.evaluate();
        let tokens = context.flush_nodes();
        let addr = tokens.iter().find(|t| t.address.is_some()).unwrap();
        assert!(addr
            .address
            .as_ref()
            .unwrap()
            .standard_form
            .starts_with("Curitiba"));
    }

    #[test]
    fn test_plain_slots_advance_positions() {
        let mut context = Context::new();
        context.add_nodes(vec![
            ContextNode::geowords(
                "Curitiba",
                vec![geoword("c", "Curitiba", "Município", &["Paraná"], None)],
            ),
            ContextNode::plain(" e "),
            ContextNode::geowords(
                "Maringá",
                vec![geoword("m", "Maringá", "Município", &["Paraná"], None)],
            ),
            ContextNode::SentenceBreak,
        ]);
        let positions: Vec<usize> = context
            .queued()
            .iter()
            .filter_map(|n| match n {
                ContextNode::Geowords(gw) => Some(gw.position),
                ContextNode::Plain { position, .. } => Some(*position),
                _ => None,
            })
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_clear_resets_relations_and_queue() {
        let mut context = Context::new();
        context.add_nodes(vec![
            ContextNode::geowords(
                "Curitiba",
                vec![geoword("c", "Curitiba", "Município", &["Paraná"], Some((-25.4, -49.3)))],
            ),
            ContextNode::SentenceBreak,
        ]);
        context.evaluate();
        context.clear();
        assert!(context.queued().is_empty());
        assert!(context.centroid().value().is_none());
        assert!(context.flush_nodes().is_empty());
    }
}
