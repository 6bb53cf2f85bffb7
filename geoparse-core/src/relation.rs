//! # Índice de Relações Contextuais
//!
//! Estrutura central da desambiguação: um mapeamento em três níveis
//! `valor da característica → id do candidato → [(posição, ordem)]` que
//! registra onde cada característica de geo-palavra (classe, dicionário,
//! hiperônimo, conjunto completo de hiperônimos, nome canônico) apareceu no
//! fluxo de tokens. A consulta [`RelationIndex::count`] mede o apoio
//! contextual de um candidato: quantas *posições distintas* do discurso
//! carregam a mesma característica, excluindo o próprio candidato e a própria
//! posição.
//!
//! O contexto mantém dois conjuntos de cinco índices cada: o *pool* (todo
//! candidato visto) e o *selecionado* (apenas vencedores já escolhidos). Para
//! que a duplicação seja mecânica, os cinco índices vivem em um
//! [`RelationBundle`] indexado pelo enum [`RelationKey`].

use std::collections::{BTreeMap, HashSet};

use crate::error::{GeoParseError, Result};

/// Uma ocorrência: posição do token no fluxo acumulado e ordem do candidato
/// entre os empatados daquele token.
pub type Occurrence = (usize, usize);

/// Índice de relações: característica → candidato → ocorrências.
///
/// Inserção é somente-acréscimo dentro de uma sessão; a remoção acontece só
/// por [`expire`](RelationIndex::expire) (janela deslizante) ou
/// [`clear`](RelationIndex::clear).
#[derive(Debug, Clone, Default)]
pub struct RelationIndex {
    chain: BTreeMap<String, BTreeMap<String, Vec<Occurrence>>>,
}

impl RelationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra uma ocorrência da característica `key` para o candidato
    /// `geoword_id` em `(position, slot)`. Cria chave e balde se necessário;
    /// nunca falha.
    pub fn add(&mut self, key: &str, geoword_id: &str, position: usize, slot: usize) {
        self.chain
            .entry(key.to_string())
            .or_default()
            .entry(geoword_id.to_string())
            .or_default()
            .push((position, slot));
    }

    /// Baldes de candidatos registrados sob `key`.
    ///
    /// Erro [`GeoParseError::RelationNotFound`] se a chave nunca foi inserida.
    /// O protocolo público do contexto nunca chega aqui com chave
    /// desconhecida; a consulta tolerante é [`count`](RelationIndex::count).
    pub fn get(&self, key: &str) -> Result<&BTreeMap<String, Vec<Occurrence>>> {
        self.chain
            .get(key)
            .ok_or_else(|| GeoParseError::RelationNotFound(key.to_string()))
    }

    /// Conta o apoio contextual da característica `key`.
    ///
    /// Para cada balde de candidato diferente de `exclude_id`, a **primeira**
    /// ocorrência cuja posição difere de `exclude_pos` e cai dentro de
    /// `[lower, upper]` (limites `None` = sem limite) marca o balde como
    /// presente; o balde então para de ser varrido — empates dentro do mesmo
    /// balde não contam duas vezes. O resultado é o número de **posições
    /// distintas** marcadas. Ocorrências repetidas na mesma posição contam
    /// uma única vez, semântica adotada deliberadamente (ver DESIGN.md).
    pub fn count(
        &self,
        key: &str,
        exclude_id: &str,
        exclude_pos: usize,
        lower: Option<usize>,
        upper: Option<usize>,
    ) -> usize {
        let Some(buckets) = self.chain.get(key) else {
            return 0;
        };
        let mut positions: HashSet<usize> = HashSet::new();
        for (geoword_id, occurrences) in buckets {
            if geoword_id == exclude_id {
                continue;
            }
            for &(n, _slot) in occurrences {
                let in_lower = lower.map_or(true, |lb| n >= lb);
                let in_upper = upper.map_or(true, |ub| n <= ub);
                if in_lower && in_upper && n != exclude_pos {
                    positions.insert(n);
                    break;
                }
            }
        }
        positions.len()
    }

    /// Variante sem limites de posição, a forma usada pelo cálculo de escore.
    pub fn count_all(&self, key: &str, exclude_id: &str, exclude_pos: usize) -> usize {
        self.count(key, exclude_id, exclude_pos, None, None)
    }

    /// Remove toda ocorrência com posição ≤ `n` (poda de janela deslizante).
    /// Baldes e chaves que ficam vazios são removidos. Idempotente.
    pub fn expire(&mut self, n: usize) {
        self.chain.retain(|_key, buckets| {
            buckets.retain(|_id, occurrences| {
                occurrences.retain(|&(pos, _)| pos > n);
                !occurrences.is_empty()
            });
            !buckets.is_empty()
        });
    }

    /// Remove todas as chaves.
    pub fn clear(&mut self) {
        self.chain.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

/// As cinco relações mantidas para cada conjunto (pool e selecionado).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKey {
    /// Classe de entidade nomeada.
    NeClass,
    /// Dicionário de origem.
    Dictionary,
    /// Cada hiperônimo individual.
    Hypernym,
    /// Conjunto completo de hiperônimos (serializado, ordem preservada).
    FullHypernym,
    /// Nome canônico.
    Name,
}

impl RelationKey {
    pub const ALL: [RelationKey; 5] = [
        RelationKey::NeClass,
        RelationKey::Dictionary,
        RelationKey::Hypernym,
        RelationKey::FullHypernym,
        RelationKey::Name,
    ];

    fn index(self) -> usize {
        match self {
            RelationKey::NeClass => 0,
            RelationKey::Dictionary => 1,
            RelationKey::Hypernym => 2,
            RelationKey::FullHypernym => 3,
            RelationKey::Name => 4,
        }
    }
}

/// Os cinco índices de um conjunto, indexados por [`RelationKey`].
#[derive(Debug, Clone, Default)]
pub struct RelationBundle {
    indexes: [RelationIndex; 5],
}

impl RelationBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: RelationKey) -> &RelationIndex {
        &self.indexes[key.index()]
    }

    pub fn get_mut(&mut self, key: RelationKey) -> &mut RelationIndex {
        &mut self.indexes[key.index()]
    }

    /// Registra uma geo-palavra nas cinco relações do conjunto.
    pub fn add_geoword(&mut self, geoword: &crate::geoword::Geoword, position: usize, slot: usize) {
        let id = &geoword.geoword_id;
        self.get_mut(RelationKey::NeClass)
            .add(&geoword.ne_class, id, position, slot);
        self.get_mut(RelationKey::Dictionary).add(
            &geoword.dictionary_id.to_string(),
            id,
            position,
            slot,
        );
        for hypernym in &geoword.hypernyms {
            self.get_mut(RelationKey::Hypernym)
                .add(hypernym, id, position, slot);
        }
        if let Some(full_key) = geoword.full_hypernym_key() {
            self.get_mut(RelationKey::FullHypernym)
                .add(&full_key, id, position, slot);
        }
        self.get_mut(RelationKey::Name)
            .add(&geoword.typical_name, id, position, slot);
    }

    pub fn expire(&mut self, n: usize) {
        for index in &mut self.indexes {
            index.expire(n);
        }
    }

    pub fn clear(&mut self) {
        for index in &mut self.indexes {
            index.clear();
        }
    }
}
