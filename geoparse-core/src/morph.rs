//! # Interface com o Analisador Morfológico
//!
//! O geoparser **consome** a saída de um analisador morfológico externo: uma
//! sequência de nós, cada um com a forma de superfície e um descritor de
//! classe gramatical em 9 campos separados por vírgula (classe principal,
//! três subclasses, forma conjugada, tipo de conjugação, forma base, leitura
//! e pronúncia). O descritor segue o formato clássico dos analisadores
//! morfológicos de dicionário; campos ausentes ficam vazios.
//!
//! A qualidade da tokenização não é responsabilidade deste crate — qualquer
//! implementação de [`MorphAnalyzer`] serve. O [`PlainAnalyzer`] incluído é um
//! analisador mínimo (separação por espaços + fusão de sequências
//! capitalizadas) para que os testes e o servidor de demonstração funcionem
//! de ponta a ponta sem um analisador real.

use serde::{Deserialize, Serialize};

/// Um nó morfológico: a unidade que o analisador externo entrega ao geoparser.
///
/// Os nove campos do descritor são expostos como membros separados para que o
/// motor possa consultar subclasses sem re-dividir a string a cada uso.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphNode {
    /// Forma de superfície (o trecho do texto original).
    pub surface: String,
    /// Classe principal (ex: "substantivo").
    pub pos: String,
    /// Primeira subclasse (ex: "próprio").
    pub subclass1: String,
    /// Segunda subclasse (ex: "topônimo").
    pub subclass2: String,
    /// Terceira subclasse.
    pub subclass3: String,
    /// Forma conjugada / marcador de forma.
    pub conjugated_form: String,
    /// Tipo de conjugação.
    pub conjugation_type: String,
    /// Forma base (lema).
    pub base_form: String,
    /// Leitura.
    pub reading: String,
    /// Pronúncia.
    pub pronunciation: String,
}

impl MorphNode {
    /// Constrói um nó a partir da superfície e do descritor CSV de 9 campos.
    ///
    /// Campos além do nono são ignorados; campos ausentes ficam vazios —
    /// analisadores reais frequentemente omitem leitura/pronúncia para
    /// palavras desconhecidas.
    pub fn new(surface: &str, feature: &str) -> Self {
        let mut fields = feature.split(',').map(str::trim);
        let mut next = || fields.next().unwrap_or("").to_string();
        Self {
            surface: surface.to_string(),
            pos: next(),
            subclass1: next(),
            subclass2: next(),
            subclass3: next(),
            conjugated_form: next(),
            conjugation_type: next(),
            base_form: next(),
            reading: next(),
            pronunciation: next(),
        }
    }

    /// Remonta o descritor CSV de 9 campos.
    pub fn feature(&self) -> String {
        [
            &self.pos,
            &self.subclass1,
            &self.subclass2,
            &self.subclass3,
            &self.conjugated_form,
            &self.conjugation_type,
            &self.base_form,
            &self.reading,
            &self.pronunciation,
        ]
        .map(|s| s.as_str())
        .join(",")
    }
}

impl std::fmt::Display for MorphNode {
    /// Formato de depuração `superfície\tdescritor`, na convenção dos
    /// analisadores morfológicos de linha de comando.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t{}", self.surface, self.feature())
    }
}

/// Analisador morfológico externo (colaborador consumido, não reimplementado).
/// `Send` para que sessões possam migrar entre threads de um servidor.
pub trait MorphAnalyzer: Send {
    /// Divide uma sentença em nós morfológicos.
    fn parse(&self, sentence: &str) -> Vec<MorphNode>;
}

/// Analisador mínimo para demonstração e testes.
///
/// Separa por espaços, tratando pontuação final como nó próprio, e funde
/// sequências de palavras capitalizadas (com conectivos "de"/"do"/"da") em um
/// único nó — suficiente para que nomes compostos como "Santa Maria" cheguem
/// inteiros à consulta de candidatos. Palavras capitalizadas são marcadas como
/// substantivo próprio; o restante recebe classe genérica.
pub struct PlainAnalyzer;

impl PlainAnalyzer {
    pub fn new() -> Self {
        PlainAnalyzer
    }

    fn is_capitalized(word: &str) -> bool {
        word.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
    }

    fn is_connective(word: &str) -> bool {
        matches!(word, "de" | "do" | "da" | "dos" | "das")
    }
}

impl Default for PlainAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl MorphAnalyzer for PlainAnalyzer {
    fn parse(&self, sentence: &str) -> Vec<MorphNode> {
        let mut nodes = Vec::new();
        let words: Vec<&str> = sentence.split_whitespace().collect();
        let mut i = 0;
        while i < words.len() {
            // Separa pontuação colada no fim da palavra
            let raw = words[i];
            let trimmed = raw.trim_end_matches(|c: char| c.is_ascii_punctuation());
            let punct = &raw[trimmed.len()..];

            if Self::is_capitalized(trimmed) {
                // Funde a sequência capitalizada (com conectivos no meio)
                let mut parts = vec![trimmed.to_string()];
                let mut j = i + 1;
                let mut trailing_punct = punct.to_string();
                while trailing_punct.is_empty() && j < words.len() {
                    let next_raw = words[j];
                    let next_trimmed =
                        next_raw.trim_end_matches(|c: char| c.is_ascii_punctuation());
                    let next_punct = &next_raw[next_trimmed.len()..];
                    if Self::is_capitalized(next_trimmed) {
                        parts.push(next_trimmed.to_string());
                        trailing_punct = next_punct.to_string();
                        j += 1;
                    } else if Self::is_connective(next_trimmed)
                        && next_punct.is_empty()
                        && j + 1 < words.len()
                        && Self::is_capitalized(
                            words[j + 1].trim_end_matches(|c: char| c.is_ascii_punctuation()),
                        )
                    {
                        parts.push(next_trimmed.to_string());
                        j += 1;
                    } else {
                        break;
                    }
                }
                nodes.push(MorphNode::new(
                    &parts.join(" "),
                    "substantivo,próprio,,,,,,,",
                ));
                if !trailing_punct.is_empty() {
                    nodes.push(MorphNode::new(&trailing_punct, "pontuação,,,,,,,,"));
                }
                i = j.max(i + 1);
            } else {
                if !trimmed.is_empty() {
                    nodes.push(MorphNode::new(trimmed, "palavra,,,,,,,,"));
                }
                if !punct.is_empty() {
                    nodes.push(MorphNode::new(punct, "pontuação,,,,,,,,"));
                }
                i += 1;
            }
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_parsing_nine_fields() {
        let node = MorphNode::new(
            "Curitiba",
            "substantivo,próprio,topônimo,município,,,Curitiba,kuritʃiba,kuritʃiba",
        );
        assert_eq!(node.pos, "substantivo");
        assert_eq!(node.subclass1, "próprio");
        assert_eq!(node.subclass2, "topônimo");
        assert_eq!(node.subclass3, "município");
        assert_eq!(node.base_form, "Curitiba");
    }

    #[test]
    fn test_feature_parsing_short_descriptor() {
        // Analisadores reais omitem campos finais para palavras desconhecidas
        let node = MorphNode::new("xyzzy", "substantivo,comum");
        assert_eq!(node.pos, "substantivo");
        assert_eq!(node.subclass1, "comum");
        assert_eq!(node.reading, "");
        assert_eq!(node.pronunciation, "");
    }

    #[test]
    fn test_display_roundtrip() {
        let node = MorphNode::new("rio", "substantivo,comum,,,,,rio,,");
        let text = node.to_string();
        assert!(text.starts_with("rio\t"));
        assert_eq!(node.feature().split(',').count(), 9);
    }

    #[test]
    fn test_plain_analyzer_merges_capitalized_run() {
        let nodes = PlainAnalyzer::new().parse("Morei em Santa Maria muitos anos.");
        let surfaces: Vec<&str> = nodes.iter().map(|n| n.surface.as_str()).collect();
        assert!(surfaces.contains(&"Santa Maria"));
        assert!(surfaces.contains(&"."));
    }

    #[test]
    fn test_plain_analyzer_connective() {
        let nodes = PlainAnalyzer::new().parse("Viajou para Feira de Santana ontem");
        let surfaces: Vec<&str> = nodes.iter().map(|n| n.surface.as_str()).collect();
        assert!(surfaces.contains(&"Feira de Santana"), "{surfaces:?}");
    }
}
