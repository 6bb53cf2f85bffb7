//! # Sessão de Geoparsing
//!
//! A sessão amarra os colaboradores (analisador morfológico, consulta de
//! dicionário, geocodificador opcional, classificador) ao contexto de
//! desambiguação e traduz as opções do chamador para cada um deles.
//!
//! O fluxo de uma sentença é: análise morfológica → filtragem de acumulação
//! (modificadores toponímicos, nomes de pessoa, classificador) → consulta de
//! candidatos → enfileiramento no contexto → avaliação → drenagem. Os três
//! últimos passos são expostos separadamente ([`Session::queue_sentence`],
//! [`Session::resolve`], [`Session::drain_sentence`]) para que o chamador
//! acumule várias sentenças antes de resolver — o contexto de um discurso
//! inteiro desambigua melhor que o de uma sentença isolada.
//!
//! Uma sessão é estritamente sequencial; sessões independentes podem rodar em
//! paralelo, cada uma com seu estado.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::address::AddressGeocoder;
use crate::classifier::Classifier;
use crate::context::{Context, ContextNode, ParsedToken};
use crate::dist::JsonRpcWeightClient;
use crate::error::Result;
use crate::gazetteer::GeowordLookup;
use crate::morph::{MorphAnalyzer, MorphNode};
use crate::options::{GeocodingLevel, ParseOptions};

/// Marcador de forma dos modificadores toponímicos no descritor morfológico
/// (dobrados em texto comum, salvo com a opção `adjunct`).
const TOPONYM_MODIFIER_FORM: &str = "modificador-toponímico";

/// Subclasse dos nomes de pessoa no descritor morfológico.
const PERSON_SUBCLASS: &str = "antropônimo";

/// Classes de entidade que podem iniciar um endereço.
static ADDRESS_CLASS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(Estado|Município)(/.*)?$").expect("regex de classe"));

/// Uma sessão de análise: colaboradores + contexto + opções correntes.
pub struct Session {
    analyzer: Box<dyn MorphAnalyzer>,
    lookup: Box<dyn GeowordLookup>,
    geocoder: Option<Box<dyn AddressGeocoder>>,
    classifier: Classifier,
    context: Context,
    options: ParseOptions,
}

impl Session {
    /// Cria uma sessão com o analisador e a consulta de dicionário dados.
    pub fn new(analyzer: Box<dyn MorphAnalyzer>, lookup: Box<dyn GeowordLookup>) -> Self {
        Session {
            analyzer,
            lookup,
            geocoder: None,
            classifier: Classifier::new(),
            context: Context::new(),
            options: ParseOptions::default(),
        }
    }

    /// Sessão de demonstração: analisador simples + gazetteer embutido.
    pub fn demo() -> Self {
        Session::new(
            Box::new(crate::morph::PlainAnalyzer::new()),
            Box::new(crate::gazetteer::GazetteerLookup::demo()),
        )
    }

    /// Instala um geocodificador de endereços.
    pub fn with_geocoder(mut self, geocoder: Box<dyn AddressGeocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Contexto de desambiguação da sessão (para inspeção e injeção em
    /// testes).
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Opções correntes (mescladas).
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Aplica opções, mesclando sobre as correntes e roteando cada grupo ao
    /// colaborador responsável. Opção malformada propaga como erro de
    /// configuração; o contexto acumulado é reiniciado (as opções valem para
    /// um novo discurso).
    pub fn set_options(&mut self, update: &ParseOptions) -> Result<()> {
        self.options.merge(update);

        // Dicionários ativos
        if let Some(dics) = &update.set_dic {
            self.lookup.set_active_dictionaries(dics.clone());
        }
        if let Some(dics) = &update.add_dic {
            self.lookup.add_active_dictionaries(dics);
        }
        if let Some(dics) = &update.remove_dic {
            self.lookup.remove_active_dictionaries(dics);
        }

        // Classes ativas: add desfaz negação registrada; remove nega
        if let Some(classes) = &update.set_class {
            self.lookup.set_active_classes(classes.clone());
        }
        if let Some(classes) = &update.add_class {
            let mut current = self.lookup.active_classes();
            for class in classes {
                let denied = format!("-{class}");
                if let Some(idx) = current.iter().position(|c| *c == denied) {
                    current.remove(idx);
                } else if !current.contains(class) {
                    current.push(class.clone());
                }
            }
            self.lookup.set_active_classes(current);
        }
        if let Some(classes) = &update.remove_class {
            let mut current = self.lookup.active_classes();
            for class in classes {
                if let Some(idx) = current.iter().position(|c| c == class) {
                    current.remove(idx);
                } else {
                    current.push(format!("-{class}"));
                }
            }
            self.lookup.set_active_classes(current);
        }

        self.context.set_options(&self.options)?;
        let weight_service = self
            .options
            .dist_server
            .clone()
            .map(|config| Box::new(JsonRpcWeightClient::new(config)) as Box<dyn crate::dist::WeightService>);
        self.context.set_weight_service(weight_service);
        Ok(())
    }

    /// Volta todas as opções e colaboradores ao padrão.
    pub fn reset_options(&mut self) -> Result<()> {
        self.options = ParseOptions::default();
        self.lookup.reset_active_dictionaries();
        self.lookup.reset_active_classes();
        self.context.set_options(&self.options)?;
        self.context.set_weight_service(None);
        Ok(())
    }

    /// Analisa uma sentença completa: enfileira, resolve e drena.
    pub fn parse(&mut self, sentence: &str) -> Result<Vec<ParsedToken>> {
        self.queue_sentence(sentence)?;
        self.resolve();
        Ok(self.drain_sentence())
    }

    /// Analisa várias sentenças como um único discurso: todas entram no
    /// contexto antes da resolução.
    pub fn parse_batch(&mut self, sentences: &[&str]) -> Result<Vec<Vec<ParsedToken>>> {
        for sentence in sentences {
            self.queue_sentence(sentence)?;
        }
        self.resolve();
        Ok(sentences.iter().map(|_| self.drain_sentence()).collect())
    }

    /// Resolve os tokens enfileirados e ainda pendentes.
    pub fn resolve(&mut self) {
        self.context.evaluate();
    }

    /// Drena a próxima sentença resolvida do contexto.
    pub fn drain_sentence(&mut self) -> Vec<ParsedToken> {
        self.context.flush_nodes()
    }

    /// Expira do contexto as ocorrências com posição ≤ `n` (janela
    /// deslizante).
    pub fn expire(&mut self, n: usize) {
        self.context.expire(n);
    }

    /// Enfileira uma sentença no contexto, aplicando a filtragem de
    /// acumulação.
    pub fn queue_sentence(&mut self, sentence: &str) -> Result<()> {
        let nodes = self.analyzer.parse(sentence);
        let adjunct = self.options.adjunct.unwrap_or(false);
        let geocoding = self
            .options
            .geocoding
            .map(|g| g.level())
            .unwrap_or(GeocodingLevel::Normal);

        let mut queue: Vec<ContextNode> = Vec::new();
        let mut plain_run = String::new();
        let append_plain = |run: &mut String, surface: &str| {
            if !run.is_empty() {
                run.push(' ');
            }
            run.push_str(surface);
        };

        let mut i = 0;
        while i < nodes.len() {
            let node = &nodes[i];
            if node.surface.is_empty() {
                i += 1;
                continue;
            }

            // Modificador toponímico: sem a opção adjunct, vira texto comum
            if !adjunct && node.conjugated_form == TOPONYM_MODIFIER_FORM {
                append_plain(&mut plain_run, &node.surface);
                i += 1;
                continue;
            }

            // Sequência de nomes de pessoa: nunca é topônimo
            if Self::is_person_name(node)
                && nodes.get(i + 1).map(Self::is_person_name).unwrap_or(false)
            {
                append_plain(&mut plain_run, &node.surface);
                append_plain(&mut plain_run, &nodes[i + 1].surface);
                i += 2;
                continue;
            }

            // Substantivo seguido de sufixo de nome de pessoa ("Silva Filho")
            if node.pos == "substantivo"
                && nodes
                    .get(i + 1)
                    .map(|next| next.subclass1 == "sufixo" && next.subclass2 == PERSON_SUBCLASS)
                    .unwrap_or(false)
            {
                append_plain(&mut plain_run, &node.surface);
                append_plain(&mut plain_run, &nodes[i + 1].surface);
                i += 2;
                continue;
            }

            // Forma ambígua com outra classe: consulta o classificador
            let probability = if node.conjugated_form.len() > 1 {
                Some(self.classifier.check(&nodes, i))
            } else {
                None
            };

            let candidates = self.lookup.candidates(node);
            if candidates.is_empty() {
                append_plain(&mut plain_run, &node.surface);
                i += 1;
                continue;
            }

            // Tentativa de endereço: classe compatível + geocodificador
            if geocoding != GeocodingLevel::None {
                if let Some(geocoder) = &self.geocoder {
                    let can_be_address = candidates
                        .iter()
                        .any(|c| ADDRESS_CLASS_PATTERN.is_match(&c.ne_class));
                    if can_be_address {
                        if let Some((addresses, consumed)) = geocoder.try_geocode(&nodes, i) {
                            if !plain_run.is_empty() {
                                queue.push(ContextNode::plain(std::mem::take(&mut plain_run)));
                            }
                            let surface = addresses
                                .first()
                                .map(|a| a.surface.clone())
                                .unwrap_or_else(|| node.surface.clone());
                            queue.push(ContextNode::address(surface, addresses));
                            i += consumed.max(1);
                            continue;
                        }
                    }
                }
            }

            if !plain_run.is_empty() {
                queue.push(ContextNode::plain(std::mem::take(&mut plain_run)));
            }
            let mut gw = ContextNode::geowords(node.surface.clone(), candidates);
            if let ContextNode::Geowords(inner) = &mut gw {
                if let Some(p) = probability {
                    if p < 1.0 {
                        inner.probability = Some(p);
                    }
                }
            }
            queue.push(gw);
            i += 1;
        }

        if !plain_run.is_empty() {
            queue.push(ContextNode::plain(plain_run));
        }
        queue.push(ContextNode::SentenceBreak);
        self.context.add_nodes(queue);
        Ok(())
    }

    fn is_person_name(node: &MorphNode) -> bool {
        node.subclass2 == PERSON_SUBCLASS
    }
}
