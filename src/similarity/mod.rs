//! Similarity search over stored embeddings.
//!
//! Provides cosine scoring, exhaustive top-K search, the pairwise "similar"
//! modes (explicit seeds, all pairs, incremental recalculation) and the
//! pluggable neighbor expansion used by incremental recalculation.

mod cosine;
mod engine;
mod expansion;

pub use cosine::cosine_similarity;
pub use engine::{
    Corpus, DEFAULT_RESULT_COUNT, ScoredId, SelfPairs, SimilarityEdge, SimilarityEngine,
    SimilarityError, SourceNeighbors,
};
pub use expansion::{DirectNeighbors, NeighborExpansion};
