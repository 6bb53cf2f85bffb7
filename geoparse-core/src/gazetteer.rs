//! # Consulta de Geo-palavras — dicionário em memória
//!
//! A consulta ao dicionário é um colaborador externo: o motor só precisa do
//! trait [`GeowordLookup`] (candidatos por nó + gestão de dicionários e
//! classes ativas). O [`GazetteerLookup`] incluído é uma implementação em
//! memória sobre uma tabela estática de topônimos brasileiros — o suficiente
//! para demonstração e testes, no espírito de uma base de conhecimento
//! simulada.
//!
//! A tabela concentra ambiguidade de verdade: municípios homônimos em
//! estados diferentes ("Palmeira", "Boa Vista", "Santa Maria") e um estado
//! extinto ("Guanabara") para exercitar as janelas de validade.
//!
//! O cache de candidatos é um objeto explícito ([`GeowordCache`]),
//! compartilhável entre sessões por referência — nunca um singleton oculto.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::geoword::Geoword;
use crate::morph::MorphNode;

/// Cache de geo-palavras por identificador, de posse do colaborador de
/// consulta.
#[derive(Debug, Default)]
pub struct GeowordCache {
    by_id: HashMap<String, Geoword>,
}

impl GeowordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, geoword_id: &str) -> Option<&Geoword> {
        self.by_id.get(geoword_id)
    }

    pub fn insert(&mut self, geoword: Geoword) {
        self.by_id.insert(geoword.geoword_id.clone(), geoword);
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Serviço de consulta de candidatos (colaborador consumido pelo motor).
pub trait GeowordLookup: Send {
    /// Candidatos geográficos para um nó morfológico (zero ou mais).
    fn candidates(&mut self, node: &MorphNode) -> Vec<Geoword>;

    /// Substitui o conjunto de dicionários ativos.
    fn set_active_dictionaries(&mut self, dictionaries: Vec<i32>);
    /// Acrescenta dicionários ao conjunto ativo.
    fn add_active_dictionaries(&mut self, dictionaries: &[i32]);
    /// Remove dicionários do conjunto ativo.
    fn remove_active_dictionaries(&mut self, dictionaries: &[i32]);
    /// Volta ao padrão (todos os dicionários).
    fn reset_active_dictionaries(&mut self);

    /// Lista corrente de classes ativas (prefixo `-` = negação).
    fn active_classes(&self) -> Vec<String>;
    /// Substitui a lista de classes ativas.
    fn set_active_classes(&mut self, classes: Vec<String>);
    /// Volta ao padrão (todas as classes).
    fn reset_active_classes(&mut self);
}

/// Um padrão de classe casa com a classe da entrada quando é idêntico ou é um
/// prefixo hierárquico ("Município" casa "Município/Capital").
fn class_matches(pattern: &str, ne_class: &str) -> bool {
    ne_class == pattern || ne_class.starts_with(&format!("{pattern}/"))
}

/// Dicionário de topônimos em memória.
pub struct GazetteerLookup {
    entries: Vec<Geoword>,
    /// `None` = todos os dicionários ativos.
    active_dictionaries: Option<Vec<i32>>,
    /// Vazia = todas as classes ativas.
    active_classes: Vec<String>,
    cache: Arc<Mutex<GeowordCache>>,
}

impl GazetteerLookup {
    /// Cria a consulta sobre entradas explícitas, com um cache novo.
    pub fn new(entries: Vec<Geoword>) -> Self {
        Self::with_cache(entries, Arc::new(Mutex::new(GeowordCache::new())))
    }

    /// Cria a consulta compartilhando um cache existente.
    pub fn with_cache(entries: Vec<Geoword>, cache: Arc<Mutex<GeowordCache>>) -> Self {
        GazetteerLookup {
            entries,
            active_dictionaries: None,
            active_classes: Vec::new(),
            cache,
        }
    }

    /// Consulta pronta com a tabela de demonstração.
    pub fn demo() -> Self {
        Self::new(demo_gazetteer())
    }

    /// O cache compartilhado desta consulta.
    pub fn cache(&self) -> Arc<Mutex<GeowordCache>> {
        Arc::clone(&self.cache)
    }

    fn dictionary_active(&self, dictionary_id: i32) -> bool {
        match &self.active_dictionaries {
            None => true,
            Some(active) => active.contains(&dictionary_id),
        }
    }

    fn class_active(&self, ne_class: &str) -> bool {
        let positives: Vec<&str> = self
            .active_classes
            .iter()
            .filter(|c| !c.starts_with('-'))
            .map(String::as_str)
            .collect();
        let allowed = positives.is_empty()
            || positives.iter().any(|p| class_matches(p, ne_class));
        let denied = self
            .active_classes
            .iter()
            .filter_map(|c| c.strip_prefix('-'))
            .any(|p| class_matches(p, ne_class));
        allowed && !denied
    }

    fn surface_matches(entry: &Geoword, surface: &str) -> bool {
        surface == entry.typical_name || entry.parts_for_surface(surface).is_some()
    }
}

impl GeowordLookup for GazetteerLookup {
    fn candidates(&mut self, node: &MorphNode) -> Vec<Geoword> {
        let surface = if node.base_form.is_empty() {
            node.surface.as_str()
        } else {
            node.base_form.as_str()
        };
        let found: Vec<Geoword> = self
            .entries
            .iter()
            .filter(|entry| {
                Self::surface_matches(entry, surface)
                    && self.dictionary_active(entry.dictionary_id)
                    && self.class_active(&entry.ne_class)
            })
            .cloned()
            .collect();
        if !found.is_empty() {
            if let Ok(mut cache) = self.cache.lock() {
                for geoword in &found {
                    cache.insert(geoword.clone());
                }
            }
        }
        found
    }

    fn set_active_dictionaries(&mut self, dictionaries: Vec<i32>) {
        self.active_dictionaries = Some(dictionaries);
    }

    fn add_active_dictionaries(&mut self, dictionaries: &[i32]) {
        match &mut self.active_dictionaries {
            None => {} // todos já ativos
            Some(active) => {
                for dic in dictionaries {
                    if !active.contains(dic) {
                        active.push(*dic);
                    }
                }
            }
        }
    }

    fn remove_active_dictionaries(&mut self, dictionaries: &[i32]) {
        let mut active = match self.active_dictionaries.take() {
            Some(active) => active,
            // Remover de "todos" exige materializar a lista corrente
            None => {
                let mut all: Vec<i32> = self.entries.iter().map(|e| e.dictionary_id).collect();
                all.sort_unstable();
                all.dedup();
                all
            }
        };
        active.retain(|dic| !dictionaries.contains(dic));
        self.active_dictionaries = Some(active);
    }

    fn reset_active_dictionaries(&mut self) {
        self.active_dictionaries = None;
    }

    fn active_classes(&self) -> Vec<String> {
        self.active_classes.clone()
    }

    fn set_active_classes(&mut self, classes: Vec<String>) {
        self.active_classes = classes;
    }

    fn reset_active_classes(&mut self) {
        self.active_classes.clear();
    }
}

/// Constrói uma entrada da tabela de demonstração.
#[allow(clippy::too_many_arguments)]
fn entry(
    id: &str,
    name: &str,
    class: &str,
    dictionary: i32,
    hypernyms: &[&str],
    lat: f64,
    lon: f64,
    suffixes: &[&str],
) -> Geoword {
    Geoword {
        geoword_id: id.to_string(),
        typical_name: name.to_string(),
        ne_class: class.to_string(),
        dictionary_id: dictionary,
        hypernyms: hypernyms.iter().map(|s| s.to_string()).collect(),
        latitude: Some(lat),
        longitude: Some(lon),
        priority: 1,
        valid_from: String::new(),
        valid_to: String::new(),
        prefixes: vec!["município de".to_string()],
        suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
    }
}

/// Tabela de demonstração: municípios homônimos, capitais e estados.
///
/// Dicionário 1 = municípios, 2 = estados.
pub fn demo_gazetteer() -> Vec<Geoword> {
    let mut entries = vec![
        // ===== Municípios homônimos =====
        entry("br-rs-santa-maria", "Santa Maria", "Município", 1,
              &["Rio Grande do Sul", "Brasil"], -29.6842, -53.8069, &["-RS"]),
        entry("br-df-santa-maria", "Santa Maria", "Município", 1,
              &["Distrito Federal", "Brasil"], -16.0130, -47.9850, &["-DF"]),
        entry("br-rr-boa-vista", "Boa Vista", "Município/Capital", 1,
              &["Roraima", "Brasil"], 2.8235, -60.6758, &["-RR"]),
        entry("br-pb-boa-vista", "Boa Vista", "Município", 1,
              &["Paraíba", "Brasil"], -7.2600, -36.2370, &["-PB"]),
        entry("br-pr-palmeira", "Palmeira", "Município", 1,
              &["Paraná", "Brasil"], -25.4296, -50.0063, &["-PR"]),
        entry("br-sc-palmeira", "Palmeira", "Município", 1,
              &["Santa Catarina", "Brasil"], -27.5832, -50.1574, &["-SC"]),
        // ===== Vizinhos para dar contexto =====
        entry("br-pr-londrina", "Londrina", "Município", 1,
              &["Paraná", "Brasil"], -23.3103, -51.1628, &["-PR"]),
        entry("br-pr-curitiba", "Curitiba", "Município/Capital", 1,
              &["Paraná", "Brasil"], -25.4284, -49.2733, &["-PR"]),
        entry("br-sc-lages", "Lages", "Município", 1,
              &["Santa Catarina", "Brasil"], -27.8160, -50.3260, &["-SC"]),
        entry("br-rs-santana", "Santana do Livramento", "Município", 1,
              &["Rio Grande do Sul", "Brasil"], -30.8910, -55.5320, &["-RS"]),
        // ===== Estados =====
        entry("br-parana", "Paraná", "Estado", 2, &["Brasil"], -24.5000, -51.0000, &[]),
        entry("br-santa-catarina", "Santa Catarina", "Estado", 2, &["Brasil"], -27.0000, -50.5000, &[]),
        entry("br-roraima", "Roraima", "Estado", 2, &["Brasil"], 2.0000, -61.5000, &[]),
    ];
    // Estado extinto, para as condições temporais: Guanabara (1960–1975)
    let mut guanabara = entry(
        "br-guanabara",
        "Guanabara",
        "Estado",
        2,
        &["Brasil"],
        -22.9068,
        -43.1729,
        &[],
    );
    guanabara.valid_from = "19600421".to_string();
    guanabara.valid_to = "19750315".to_string();
    entries.push(guanabara);
    entries
}

/// Textos de demonstração para a interface web.
pub fn demo_texts() -> Vec<(&'static str, &'static str)> {
    vec![
        ("contexto por hiperônimo",
         "Londrina fica no norte do estado. Palmeira é servida pela mesma rodovia."),
        ("homônimos distantes",
         "Boa Vista registrou calor recorde. Roraima decretou emergência."),
        ("janela temporal",
         "A Guanabara deixou de existir como estado em 1975."),
        ("capitais",
         "Curitiba e Lages disputam o título de cidade mais fria do sul."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_for(surface: &str) -> MorphNode {
        MorphNode::new(surface, "substantivo,próprio,,,,,,,")
    }

    #[test]
    fn test_ambiguous_surface_yields_multiple_candidates() {
        let mut lookup = GazetteerLookup::demo();
        let candidates = lookup.candidates(&node_for("Palmeira"));
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_surface_with_suffix_matches() {
        let mut lookup = GazetteerLookup::demo();
        let candidates = lookup.candidates(&node_for("Palmeira-PR"));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].geoword_id, "br-pr-palmeira");
    }

    #[test]
    fn test_dictionary_filter() {
        let mut lookup = GazetteerLookup::demo();
        lookup.set_active_dictionaries(vec![2]);
        assert!(lookup.candidates(&node_for("Palmeira")).is_empty());
        assert_eq!(lookup.candidates(&node_for("Paraná")).len(), 1);
        lookup.reset_active_dictionaries();
        assert_eq!(lookup.candidates(&node_for("Palmeira")).len(), 2);
    }

    #[test]
    fn test_remove_dictionary_from_all() {
        let mut lookup = GazetteerLookup::demo();
        lookup.remove_active_dictionaries(&[1]);
        assert!(lookup.candidates(&node_for("Palmeira")).is_empty());
        assert_eq!(lookup.candidates(&node_for("Roraima")).len(), 1);
    }

    #[test]
    fn test_class_deny_prefix() {
        let mut lookup = GazetteerLookup::demo();
        lookup.set_active_classes(vec!["-Município".to_string()]);
        // A negação cobre a hierarquia: Município/Capital também sai
        assert!(lookup.candidates(&node_for("Boa Vista")).is_empty());
        assert_eq!(lookup.candidates(&node_for("Roraima")).len(), 1);
    }

    #[test]
    fn test_class_allow_list() {
        let mut lookup = GazetteerLookup::demo();
        lookup.set_active_classes(vec!["Estado".to_string()]);
        assert!(lookup.candidates(&node_for("Curitiba")).is_empty());
        assert_eq!(lookup.candidates(&node_for("Paraná")).len(), 1);
    }

    #[test]
    fn test_cache_fills_on_lookup() {
        let mut lookup = GazetteerLookup::demo();
        let cache = lookup.cache();
        assert!(cache.lock().unwrap().is_empty());
        lookup.candidates(&node_for("Curitiba"));
        assert!(cache.lock().unwrap().get("br-pr-curitiba").is_some());
    }

    #[test]
    fn test_cache_shared_between_lookups() {
        let mut first = GazetteerLookup::demo();
        let cache = first.cache();
        let mut second = GazetteerLookup::with_cache(demo_gazetteer(), Arc::clone(&cache));
        first.candidates(&node_for("Londrina"));
        second.candidates(&node_for("Lages"));
        let cache = cache.lock().unwrap();
        assert!(cache.get("br-pr-londrina").is_some());
        assert!(cache.get("br-sc-lages").is_some());
    }
}
