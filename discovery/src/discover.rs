// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Discovery of plausible facts which aren't part of a known graph.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    candidates::generate_candidates,
    config::DiscoveryConfig,
    error::ValidationError,
    model::{ensure_fitted, EmbeddingModel},
    triple::{Triple, TripleSet, Triples},
};

/// A candidate fact which ranks high among its corruptions.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Discovery {
    pub triple: Triple,
    pub score: f32,
    /// One plus the number of unknown corruptions which score higher than the fact.
    pub rank: usize,
}

/// Discovers facts for the target relation, or for all relations of the graph if there is none.
///
/// The candidate budget is split evenly between the relations. The first batch of candidates of
/// each relation is ranked against the corruptions of each candidate, ie. the triples with the
/// subject or the object replaced by any other entity of the graph. Known corruptions are filtered
/// out. Candidates ranked within the top `n` are discovered, ordered by rank and score.
///
/// # Errors
/// Fails if the model isn't fitted, the configuration is invalid or the target relation doesn't
/// occur in the graph.
#[instrument(skip(known, model, config))]
pub fn discover_facts(
    known: &Triples,
    model: &impl EmbeddingModel,
    target_relation: Option<&str>,
    config: &DiscoveryConfig,
) -> Result<Vec<Discovery>, ValidationError> {
    ensure_fitted(model)?;
    config.validate()?;

    let relations = match target_relation {
        Some(relation) if known.has_relation(relation) => vec![relation],
        Some(relation) => return Err(ValidationError::UnknownRelation(relation.to_string())),
        None => known.relations().into_iter().collect_vec(),
    };
    if relations.is_empty() {
        return Ok(Vec::new());
    }

    let max_candidates = (config.candidates().max_candidates() / relations.len()).max(1);
    let candidates = config
        .candidates()
        .clone()
        .with_max_candidates(max_candidates)?;
    let entities = known.entities().into_iter().collect_vec();
    let filter = TripleSet::new(known);

    let mut discoveries = Vec::new();
    for relation in relations {
        let Some(batch) = generate_candidates(known, relation, &candidates)?.next() else {
            continue;
        };
        debug!(relation, candidates = batch.len(), "ranking candidates");
        for triple in batch {
            let (score, rank) = rank_candidate(model, &triple, &entities, &filter)?;
            if rank <= config.top_n() {
                discoveries.push(Discovery {
                    triple,
                    score,
                    rank,
                });
            }
        }
    }
    discoveries.sort_by(|a, b| a.rank.cmp(&b.rank).then(b.score.total_cmp(&a.score)));

    Ok(discoveries)
}

/// Scores the candidate and ranks it among its unknown corruptions.
fn rank_candidate(
    model: &impl EmbeddingModel,
    candidate: &Triple,
    entities: &[&str],
    known: &TripleSet<'_>,
) -> Result<(f32, usize), ValidationError> {
    let score = model
        .score(candidate)
        .ok_or_else(|| ValidationError::Unscorable(candidate.to_string()))?;

    let subject_corruptions = entities
        .iter()
        .filter(|&&entity| entity != candidate.subject)
        .map(|&entity| Triple::new(entity, &candidate.relation, &candidate.object));
    let object_corruptions = entities
        .iter()
        .filter(|&&entity| entity != candidate.object)
        .map(|&entity| Triple::new(&candidate.subject, &candidate.relation, entity));
    let higher = subject_corruptions
        .chain(object_corruptions)
        .filter(|corruption| !known.contains(corruption))
        .filter_map(|corruption| model.score(&corruption))
        .filter(|&corruption| corruption > score)
        .count();

    Ok((score, higher + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        candidates::Strategy,
        config::CandidatesConfig,
        model::tests::MockModel,
        triple::tests::graph,
    };

    fn config(strategy: Strategy, top_n: usize) -> DiscoveryConfig {
        DiscoveryConfig::default()
            .with_top_n(top_n)
            .unwrap()
            .with_candidates(CandidatesConfig::default().with_strategy(strategy))
    }

    #[test]
    fn test_discover_facts_unfitted() {
        let triples = graph();
        let model = MockModel {
            fitted: false,
            ..MockModel::on_line(&triples)
        };
        assert_eq!(
            discover_facts(&triples, &model, None, &DiscoveryConfig::default()),
            Err(ValidationError::NotFitted),
        );
    }

    #[test]
    fn test_discover_facts_unknown_relation() {
        let triples = graph();
        let model = MockModel::on_line(&triples);
        assert_eq!(
            discover_facts(&triples, &model, Some("error"), &DiscoveryConfig::default()),
            Err(ValidationError::UnknownRelation("error".into())),
        );
    }

    #[test]
    fn test_discover_facts() {
        let triples = graph();
        let model = MockModel::on_line(&triples);

        // `a` is placed at the origin, so its candidates score zero while the corruptions with
        // any other subject score higher, except for the known (f, y, e)
        let discoveries =
            discover_facts(&triples, &model, Some("y"), &config(Strategy::Exhaustive, 5))
                .unwrap();
        assert_eq!(
            discoveries,
            [Discovery {
                triple: Triple::new("a", "y", "e"),
                score: 0.,
                rank: 5,
            }],
        );

        let discoveries =
            discover_facts(&triples, &model, Some("y"), &config(Strategy::Exhaustive, 4))
                .unwrap();
        assert!(discoveries.is_empty());
    }

    #[test]
    fn test_discover_facts_consolidated() {
        let triples = graph();
        let model = MockModel::on_line(&triples);
        let config = |top_n| {
            let config = config(Strategy::Exhaustive, top_n);
            let candidates = config.candidates().clone().with_consolidate_sides(true);
            config.with_candidates(candidates)
        };

        // `f` is only a subject, it becomes an object of `a` by consolidating the sides
        let discoveries = discover_facts(&triples, &model, Some("y"), &config(6)).unwrap();
        assert_eq!(
            discoveries,
            [
                Discovery {
                    triple: Triple::new("a", "y", "e"),
                    score: 0.,
                    rank: 5,
                },
                Discovery {
                    triple: Triple::new("a", "y", "f"),
                    score: 0.,
                    rank: 6,
                },
            ],
        );

        let discoveries = discover_facts(&triples, &model, Some("y"), &config(5)).unwrap();
        assert_eq!(discoveries.len(), 1);
        assert_eq!(discoveries[0].triple, Triple::new("a", "y", "e"));
    }

    #[test]
    fn test_discover_facts_all_relations() {
        let triples = Triples::from([["a", "x", "b"], ["b", "y", "c"], ["c", "y", "a"]]);
        let model = MockModel::on_line(&triples);

        let discoveries =
            discover_facts(&triples, &model, None, &config(Strategy::RandomUniform, 100)).unwrap();
        assert!(discoveries
            .iter()
            .all(|discovery| !triples.contains(&discovery.triple)));
        assert!(discoveries
            .iter()
            .tuple_windows()
            .all(|(a, b)| a.rank <= b.rank));
    }

    #[test]
    fn test_rank_candidate() {
        let triples = Triples::from([["a", "r", "b"], ["b", "r", "c"]]);
        let model = MockModel::new(
            [("a", vec![1.]), ("b", vec![2.]), ("c", vec![3.])],
            [("r", vec![1.])],
        );
        let entities = triples.entities().into_iter().collect_vec();
        let known = TripleSet::new(&triples);

        // corruptions: (b, r, c) known, (c, r, c) = 9, (a, r, a) = 1, (a, r, b) known
        let (score, rank) =
            rank_candidate(&model, &Triple::new("a", "r", "c"), &entities, &known).unwrap();
        assert_eq!(score, 3.);
        assert_eq!(rank, 2);

        assert_eq!(
            rank_candidate(&model, &Triple::new("a", "s", "c"), &entities, &known),
            Err(ValidationError::Unscorable("(a, s, c)".into())),
        );
    }
}
