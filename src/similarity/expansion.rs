//! Neighbor expansion strategies for incremental similarity maintenance.

use std::collections::HashSet;

use crate::similarity::engine::SourceNeighbors;

/// Decides which source ids must be recomputed after a set of seeds changed.
pub trait NeighborExpansion: Send + Sync {
    /// Returns the affected source ids, without duplicates, given the freshly
    /// computed neighbor lists of the seeds.
    fn expand(&self, seeds: &[SourceNeighbors]) -> Vec<String>;
}

/// Seeds plus every id in their top-K lists, in first-seen order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectNeighbors;

impl NeighborExpansion for DirectNeighbors {
    fn expand(&self, seeds: &[SourceNeighbors]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut affected = Vec::new();

        let seed_ids = seeds.iter().map(|s| s.source_id.as_str());
        let neighbor_ids = seeds
            .iter()
            .flat_map(|s| s.neighbors.iter().map(|n| n.id.as_str()));

        for id in seed_ids.chain(neighbor_ids) {
            if seen.insert(id) {
                affected.push(id.to_string());
            }
        }
        affected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::engine::ScoredId;

    fn result(source: &str, neighbors: &[&str]) -> SourceNeighbors {
        SourceNeighbors {
            source_id: source.to_string(),
            neighbors: neighbors
                .iter()
                .map(|id| ScoredId {
                    id: id.to_string(),
                    score: 0.5,
                })
                .collect(),
        }
    }

    #[test]
    fn test_direct_neighbors_union_without_duplicates() {
        let seeds = vec![result("s1", &["x", "s2", "y"]), result("s2", &["y", "z"])];
        let affected = DirectNeighbors.expand(&seeds);
        assert_eq!(affected, vec!["s1", "s2", "x", "y", "z"]);
    }

    #[test]
    fn test_direct_neighbors_empty() {
        assert!(DirectNeighbors.expand(&[]).is_empty());
    }
}
