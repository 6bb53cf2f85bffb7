//! # Classificador de "surpresa" toponímica
//!
//! Heurística de apoio para tokens cuja classe gramatical não distingue
//! topônimo de outra coisa: o classificador monta um vetor de características
//! esparsas a partir de uma janela de ±2 nós (hash da superfície e hash do
//! descritor de classe, deslocados pela posição relativa) e registra a linha
//! de características no log.
//!
//! A pontuação devolvida é hoje um **stub fixo de 0.5** — o hash é calculado
//! e registrado, mas não consultado. O ponto de extensão existe para que um
//! modelo treinado sobre as linhas registradas possa substituir o stub sem
//! mudar a interface.

use std::fmt::Write as _;

use crate::morph::MorphNode;

/// Hash de deslocamento-e-soma sobre os bytes da string, módulo `max`.
fn hash_str(s: &str, max: i64) -> i64 {
    let mut hv: i64 = 0;
    for byte in s.bytes().rev() {
        hv = (hv << 5) - hv + i64::from(byte);
        hv = hv.rem_euclid(max);
    }
    hv
}

/// Probabilidade fixa devolvida pelo stub.
const STUB_PROBABILITY: f64 = 0.5;

/// Classificador de plausibilidade toponímica (stub instrumentado).
#[derive(Debug, Default)]
pub struct Classifier {
    /// Linhas de características acumuladas, disponíveis para inspeção e
    /// para exportação como corpus de treinamento.
    log_lines: Vec<String>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash da superfície de um nó (espaço de 99000 posições).
    pub fn surface_hash(node: &MorphNode) -> i64 {
        hash_str(&node.surface, 99_000)
    }

    /// Hash do descritor de classe de um nó (espaço de 1000 posições).
    pub fn feature_hash(node: &MorphNode) -> i64 {
        let feature = format!(
            "{}{}{}{}",
            node.pos, node.subclass1, node.subclass2, node.subclass3
        );
        hash_str(&feature, 1_000)
    }

    /// Estima a plausibilidade de o nó em `target` ser um topônimo, dada a
    /// sentença. Calcula e registra as características da janela de ±2 nós;
    /// devolve o valor fixo do stub (`0.0 ≤ p ≤ 1.0`).
    pub fn check(&mut self, nodes: &[MorphNode], target: usize) -> f64 {
        let start = target.saturating_sub(2);
        let end = (target + 3).min(nodes.len());

        let mut line = String::from("0");
        for (i, node) in nodes[start..end].iter().enumerate() {
            let pos = (start + i) as i64 - target as i64;
            let hv_surface = Self::surface_hash(node) + 100_000 * pos + 200_000;
            let hv_feature = Self::feature_hash(node) + 100_000 * pos + 200_000;
            let _ = write!(line, " {hv_surface}:1 {hv_feature}:1");
        }
        tracing::debug!(alvo = %nodes.get(target).map(|n| n.surface.as_str()).unwrap_or(""),
                        linha = %line, "características do classificador");
        self.log_lines.push(line);

        STUB_PROBABILITY
    }

    /// Linhas de características registradas até agora.
    pub fn log_lines(&self) -> &[String] {
        &self.log_lines
    }
}
