//! Exhaustive similarity engine over an in-memory corpus.
//!
//! Every query compares against every stored vector. There is no index:
//! search is O(n) per query and the all-pairs mode is O(n²).

use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::similarity::cosine::cosine_similarity;
use crate::similarity::expansion::NeighborExpansion;
use crate::vector::{VectorDimension, VectorEntry, VectorError};

/// Default number of results per query.
pub const DEFAULT_RESULT_COUNT: usize = 10;

/// Errors raised by similarity queries.
#[derive(Error, Debug)]
pub enum SimilarityError {
    #[error(
        "No stored vector for id '{id}'\nSuggestion: Run the embeddings command for this id first"
    )]
    UnknownId { id: String },

    #[error("Query vector does not match the corpus: {0}")]
    Vector(#[from] VectorError),
}

/// Whether a seed may appear in its own neighbor list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfPairs {
    /// Neighbors only: the seed never scores against itself.
    #[default]
    Exclude,
    /// The seed is ranked like any other entry (usually first, at 1.0).
    Include,
}

impl SelfPairs {
    #[must_use]
    pub fn from_include_flag(include: bool) -> Self {
        if include { Self::Include } else { Self::Exclude }
    }
}

/// A stored id with its score against some query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredId {
    pub id: String,
    pub score: f32,
}

/// A persisted pairwise similarity score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityEdge {
    pub source_id: String,
    pub target_id: String,
    pub score: f32,
}

/// Top-K neighbors computed for one source id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceNeighbors {
    pub source_id: String,
    pub neighbors: Vec<ScoredId>,
}

impl SourceNeighbors {
    /// Flattens the neighbor list into edge rows.
    #[must_use]
    pub fn edges(&self) -> Vec<SimilarityEdge> {
        self.neighbors
            .iter()
            .map(|n| SimilarityEdge {
                source_id: self.source_id.clone(),
                target_id: n.id.clone(),
                score: n.score,
            })
            .collect()
    }
}

/// The full set of stored vectors, in scan order.
#[derive(Debug, Default)]
pub struct Corpus {
    entries: Vec<VectorEntry>,
    positions: HashMap<String, usize>,
    dimension: Option<VectorDimension>,
}

impl Corpus {
    /// Builds a corpus from scanned entries.
    ///
    /// All entries must share one dimension.
    pub fn new(entries: Vec<VectorEntry>) -> Result<Self, VectorError> {
        let dimension = match entries.first() {
            Some(first) => Some(VectorDimension::new(first.vector.len())?),
            None => None,
        };

        let mut positions = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if let Some(dimension) = dimension {
                dimension.validate_vector(&entry.vector)?;
            }
            positions.entry(entry.id.clone()).or_insert(position);
        }

        Ok(Self {
            entries,
            positions,
            dimension,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> Option<VectorDimension> {
        self.dimension
    }

    #[must_use]
    pub fn entries(&self) -> &[VectorEntry] {
        &self.entries
    }

    /// Returns the stored vector for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.position(id).map(|p| self.entries[p].vector.as_slice())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }
}

/// Runs searches and pairwise similarity computations against a corpus.
#[derive(Debug)]
pub struct SimilarityEngine<'a> {
    corpus: &'a Corpus,
    count: usize,
    self_pairs: SelfPairs,
}

impl<'a> SimilarityEngine<'a> {
    pub fn new(corpus: &'a Corpus) -> Self {
        Self {
            corpus,
            count: DEFAULT_RESULT_COUNT,
            self_pairs: SelfPairs::default(),
        }
    }

    /// Sets the number of results kept per query.
    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    #[must_use]
    pub fn with_self_pairs(mut self, self_pairs: SelfPairs) -> Self {
        self.self_pairs = self_pairs;
        self
    }

    /// Ranks the whole corpus against a query vector.
    ///
    /// Results are sorted by descending score; equal scores keep scan order.
    pub fn search(&self, query: &[f32]) -> Result<Vec<ScoredId>, SimilarityError> {
        if let Some(dimension) = self.corpus.dimension() {
            dimension.validate_vector(query)?;
        }
        Ok(self.rank(query, None))
    }

    /// Computes the top-K neighbors of a stored id, using its own vector as
    /// the query.
    pub fn neighbors(&self, seed_id: &str) -> Result<SourceNeighbors, SimilarityError> {
        let position = self
            .corpus
            .position(seed_id)
            .ok_or_else(|| SimilarityError::UnknownId {
                id: seed_id.to_string(),
            })?;
        Ok(self.neighbors_at(position))
    }

    /// Computes neighbors for each seed id, in the order given.
    pub fn similar_to(&self, seeds: &[String]) -> Result<Vec<SourceNeighbors>, SimilarityError> {
        seeds.iter().map(|seed| self.neighbors(seed)).collect()
    }

    /// Computes neighbors for every stored id.
    ///
    /// This is the expensive path: n sources times n comparisons. Sources are
    /// scored in parallel, but the result keeps scan order.
    #[must_use]
    pub fn all_pairs(&self) -> Vec<SourceNeighbors> {
        let n = self.corpus.len();
        tracing::warn!(
            "Computing all-pairs similarity over {n} vectors ({} comparisons)",
            n.saturating_mul(n)
        );

        (0..n)
            .into_par_iter()
            .map(|position| self.neighbors_at(position))
            .collect()
    }

    /// Incremental maintenance for a set of newly added or changed seeds.
    ///
    /// Computes each seed's neighbors, expands the seeds into an affected set
    /// with `expansion`, then recomputes neighbors only for that set. This is
    /// an approximation: ids outside the affected set whose own top-K would now
    /// include a seed are not refreshed.
    pub fn recalculate_for_matches(
        &self,
        seeds: &[String],
        expansion: &dyn NeighborExpansion,
    ) -> Result<Vec<SourceNeighbors>, SimilarityError> {
        let seed_results = self.similar_to(seeds)?;
        let affected = expansion.expand(&seed_results);
        tracing::debug!(
            "Recalculating {} sources affected by {} seeds",
            affected.len(),
            seeds.len()
        );

        let mut computed: HashMap<String, SourceNeighbors> = seed_results
            .into_iter()
            .map(|result| (result.source_id.clone(), result))
            .collect();

        affected
            .iter()
            .map(|id| match computed.remove(id) {
                Some(result) => Ok(result),
                None => self.neighbors(id),
            })
            .collect()
    }

    fn neighbors_at(&self, position: usize) -> SourceNeighbors {
        let entry = &self.corpus.entries[position];
        let skip = match self.self_pairs {
            SelfPairs::Exclude => Some(position),
            SelfPairs::Include => None,
        };
        SourceNeighbors {
            source_id: entry.id.clone(),
            neighbors: self.rank(&entry.vector, skip),
        }
    }

    fn rank(&self, query: &[f32], skip: Option<usize>) -> Vec<ScoredId> {
        let mut scored: Vec<(usize, f32)> = self
            .corpus
            .entries
            .iter()
            .enumerate()
            .filter(|(position, _)| Some(*position) != skip)
            .map(|(position, entry)| (position, cosine_similarity(query, &entry.vector)))
            .collect();

        // sort_by is stable: ties stay in scan order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.count);

        scored
            .into_iter()
            .map(|(position, score)| ScoredId {
                id: self.corpus.entries[position].id.clone(),
                score,
            })
            .collect()
    }
}
