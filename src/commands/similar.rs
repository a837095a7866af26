//! `similar`: neighbors of stored ids, optionally persisted as edges.

use std::path::PathBuf;

use tracing::info;

use crate::error::{EmbedError, EmbedResult};
use crate::similarity::{
    Corpus, DEFAULT_RESULT_COUNT, DirectNeighbors, SelfPairs, SimilarityEngine, SourceNeighbors,
};
use crate::storage::{EdgeStore, VectorStore};

use super::open_existing_database;

/// Which sources to compute neighbors for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimilarMode {
    /// Only the given ids
    Ids(Vec<String>),
    /// Every stored id against every stored id
    All,
    /// The given ids plus every id in their neighbor lists
    RecalculateForMatches(Vec<String>),
}

impl SimilarMode {
    /// Picks the mode from the command-line flags.
    ///
    /// `--all` takes no ids and cannot be combined with
    /// `--recalculate-for-matches`.
    pub fn from_flags(ids: Vec<String>, all: bool, recalculate_for_matches: bool) -> EmbedResult<Self> {
        match (all, recalculate_for_matches) {
            (true, true) => Err(EmbedError::config(
                "--all cannot be combined with --recalculate-for-matches",
            )),
            (true, false) if !ids.is_empty() => Err(EmbedError::config(format!(
                "--all cannot be combined with explicit ids ({})",
                ids.join(", ")
            ))),
            (true, false) => Ok(Self::All),
            (false, true) => Ok(Self::RecalculateForMatches(ids)),
            (false, false) => Ok(Self::Ids(ids)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimilarOptions {
    pub db_path: PathBuf,
    pub mode: SimilarMode,
    pub table: String,
    pub similarity_table: String,
    pub count: usize,
    pub self_pairs: SelfPairs,
    pub save: bool,
}

impl SimilarOptions {
    pub fn new(db_path: impl Into<PathBuf>, mode: SimilarMode) -> Self {
        Self {
            db_path: db_path.into(),
            mode,
            table: "embeddings".to_string(),
            similarity_table: "similarities".to_string(),
            count: DEFAULT_RESULT_COUNT,
            self_pairs: SelfPairs::default(),
            save: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarOutcome {
    /// Neighbor lists in source order
    pub results: Vec<SourceNeighbors>,
    /// Edges written when saving
    pub saved_edges: Option<usize>,
}

/// Computes neighbor lists and saves them when requested.
///
/// When saving, each source's edges are replaced in their own transaction;
/// sources outside this run are left untouched.
pub fn run_similar(options: &SimilarOptions) -> EmbedResult<SimilarOutcome> {
    let seeds = match &options.mode {
        SimilarMode::Ids(ids) | SimilarMode::RecalculateForMatches(ids) => Some(ids),
        SimilarMode::All => None,
    };
    if seeds.is_some_and(|ids| ids.is_empty()) {
        return Err(EmbedError::config(
            "no ids given: pass one or more ids, or --all",
        ));
    }

    let conn = open_existing_database(&options.db_path)?;
    let store = VectorStore::open_existing(&conn, &options.table)?;

    // Open the edge table first so a conflicting schema fails before the
    // expensive part
    let edges = if options.save {
        Some(EdgeStore::open(&conn, &options.similarity_table)?)
    } else {
        None
    };

    let corpus = Corpus::new(store.scan()?)?;
    let engine = SimilarityEngine::new(&corpus)
        .with_count(options.count)
        .with_self_pairs(options.self_pairs);

    let results = match &options.mode {
        SimilarMode::Ids(ids) => engine.similar_to(ids),
        SimilarMode::All => Ok(engine.all_pairs()),
        SimilarMode::RecalculateForMatches(ids) => {
            engine.recalculate_for_matches(ids, &DirectNeighbors)
        }
    }
    .map_err(|e| EmbedError::from_similarity(e, &options.table))?;

    let saved_edges = match edges {
        Some(edge_store) => {
            let written = edge_store.save_all(&results)?;
            info!(
                table = edge_store.table(),
                sources = results.len(),
                edges = written,
                "saved similarities"
            );
            Some(written)
        }
        None => None,
    };

    Ok(SimilarOutcome {
        results,
        saved_edges,
    })
}
