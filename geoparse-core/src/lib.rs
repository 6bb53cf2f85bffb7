//! # geoparse-core — Desambiguação Contextual de Topônimos
//!
//! Este crate implementa um motor de *geoparsing*: extrair menções
//! geográficas de texto corrido e escolher, para cada menção ambígua, a
//! interpretação mais plausível usando o discurso ao redor como evidência.
//! "Palmeira" sozinha pode ser um município do Paraná ou de Santa Catarina;
//! numa sentença que já falou de Londrina, o contexto paranaense decide.
//!
//! ## Arquitetura do Sistema
//!
//! A análise morfológica e a consulta ao dicionário são colaboradores
//! externos (traits); o núcleo é o contexto de desambiguação:
//!
//! 1.  **Entrada**: sentenças analisadas morfologicamente ([`morph`]).
//! 2.  **Candidatos** ([`gazetteer`]): cada token ambíguo recebe zero ou mais
//!     geo-palavras candidatas ([`geoword`]).
//! 3.  **Acumulação** ([`context`]): as características de todos os candidatos
//!     (classe, dicionário, hiperônimos, nome) entram em índices de relações
//!     ([`relation`]) e no centroide espacial ([`centroid`]).
//! 4.  **Avaliação**: condições de admissibilidade ([`condition`]) podem vetar
//!     candidatos; os sobreviventes são pontuados contra o contexto
//!     acumulado e contra as escolhas anteriores; repesagem externa opcional
//!     ([`dist`]).
//! 5.  **Saída**: fluxo de tokens anotados, sentença a sentença.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use geoparse_core::Session;
//!
//! // 1. Sessão de demonstração (analisador simples + gazetteer embutido)
//! let mut session = Session::demo();
//!
//! // 2. O contexto da sentença decide a Palmeira certa
//! let tokens = session.parse("Londrina fica perto de Palmeira.").unwrap();
//!
//! let palmeira = tokens.iter().find(|t| t.surface == "Palmeira").unwrap();
//! assert_eq!(palmeira.geo.as_ref().unwrap().geoword_id, "br-pr-palmeira");
//! ```
//!
//! ## Módulos Principais
//!
//! - [`session`]: orquestrador que amarra colaboradores, opções e contexto.
//! - [`context`]: o protocolo acumular → avaliar → drenar.
//! - [`relation`]: índices de recorrência de características.
//! - [`condition`]: filtros temporais e espaciais configuráveis.

pub mod address;
pub mod centroid;
pub mod classifier;
pub mod condition;
pub mod context;
pub mod dist;
pub mod error;
pub mod gazetteer;
pub mod geoword;
pub mod morph;
pub mod options;
pub mod relation;
pub mod session;

pub use context::{Context, ContextNode, ParsedToken};
pub use error::{GeoParseError, Result};
pub use gazetteer::{GazetteerLookup, GeowordLookup};
pub use geoword::Geoword;
pub use morph::{MorphAnalyzer, MorphNode, PlainAnalyzer};
pub use options::ParseOptions;
pub use session::Session;
