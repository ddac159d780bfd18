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

//! Generation of candidate facts which aren't part of a known graph.

use std::{fmt, mem, str::FromStr};

use itertools::Itertools;
use rand::{distributions::WeightedIndex, prelude::Distribution, rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::CandidatesConfig,
    error::ValidationError,
    graph::EntityGraph,
    triple::{Triple, TripleSet, Triples},
};

/// The strategies to sample candidate facts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Strategy {
    /// All pairs of subjects and objects, one subject at a time.
    Exhaustive,
    /// Subjects and objects drawn uniformly.
    #[default]
    RandomUniform,
    /// Entities drawn wrt their number of occurrences.
    EntityFrequency,
    /// Entities drawn wrt their number of neighbors.
    GraphDegree,
    /// Entities drawn wrt their local clustering coefficient.
    ClusterCoefficient,
    /// Entities drawn wrt their number of triangles.
    ClusterTriangles,
    /// Entities drawn wrt their square clustering coefficient.
    ClusterSquares,
}

impl Strategy {
    pub const ALL: [Self; 7] = [
        Self::Exhaustive,
        Self::RandomUniform,
        Self::EntityFrequency,
        Self::GraphDegree,
        Self::ClusterCoefficient,
        Self::ClusterTriangles,
        Self::ClusterSquares,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exhaustive => "exhaustive",
            Self::RandomUniform => "random_uniform",
            Self::EntityFrequency => "entity_frequency",
            Self::GraphDegree => "graph_degree",
            Self::ClusterCoefficient => "cluster_coefficient",
            Self::ClusterTriangles => "cluster_triangles",
            Self::ClusterSquares => "cluster_squares",
        }
    }

    /// The per entity statistic which the sampling is weighted by.
    fn statistic(self, graph: &EntityGraph<'_>) -> Option<Vec<f32>> {
        match self {
            Self::Exhaustive | Self::RandomUniform => None,
            Self::EntityFrequency => Some(graph.entity_frequency()),
            Self::GraphDegree => Some(graph.degree()),
            Self::ClusterCoefficient => Some(graph.clustering_coefficient()),
            Self::ClusterTriangles => Some(graph.triangles()),
            Self::ClusterSquares => Some(graph.square_clustering()),
        }
    }
}

impl FromStr for Strategy {
    type Err = ValidationError;

    fn from_str(strategy: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == strategy)
            .ok_or_else(|| ValidationError::UnknownStrategy(strategy.to_string()))
    }
}

impl TryFrom<String> for Strategy {
    type Error = ValidationError;

    fn try_from(strategy: String) -> Result<Self, Self::Error> {
        strategy.parse()
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The direction in which graph statistics bias the sampling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Bias {
    /// Entities with high statistics are drawn more often.
    #[default]
    High,
    /// Entities with low statistics are drawn more often.
    Low,
}

impl Bias {
    /// Every entity keeps a positive weight.
    fn weight(self, statistic: f32) -> f32 {
        match self {
            Self::High => 1. + statistic,
            Self::Low => 1. / (1. + statistic),
        }
    }
}

impl FromStr for Bias {
    type Err = ValidationError;

    fn from_str(bias: &str) -> Result<Self, Self::Err> {
        match bias {
            "high" => Ok(Self::High),
            "low" => Ok(Self::Low),
            _ => Err(ValidationError::UnknownBias(bias.to_string())),
        }
    }
}

impl TryFrom<String> for Bias {
    type Error = ValidationError;

    fn try_from(bias: String) -> Result<Self, Self::Error> {
        bias.parse()
    }
}

/// A lazy sequence of candidate batches for a target relation.
///
/// Each batch contains at most `max_candidates` triples with the target relation in the middle. No
/// batch contains known triples, self loops or the same candidate twice.
pub struct Candidates<'a> {
    known: TripleSet<'a>,
    relation: String,
    max_candidates: usize,
    sampling: Sampling<'a>,
}

enum Sampling<'a> {
    Exhaustive {
        subjects: std::vec::IntoIter<&'a str>,
        objects: Vec<&'a str>,
        pending: Vec<Triple>,
    },
    Random {
        rng: StdRng,
        subjects: Vec<&'a str>,
        objects: Vec<&'a str>,
        subject_weights: Option<WeightedIndex<f32>>,
        object_weights: Option<WeightedIndex<f32>>,
    },
}

/// Generates candidate facts for the target relation which aren't part of the known graph.
///
/// Without consolidation the subjects are drawn from the known subjects and the objects from the
/// known objects, otherwise both are drawn from all known entities. The random strategies never
/// end, the exhaustive strategy ends after the last subject.
///
/// # Errors
/// Fails if the maximum number of candidates per batch is zero.
pub fn generate_candidates<'a>(
    known: &'a Triples,
    target_relation: &str,
    config: &CandidatesConfig,
) -> Result<Candidates<'a>, ValidationError> {
    if config.max_candidates() == 0 {
        return Err(ValidationError::MaxCandidates);
    }

    let (subjects, objects) = if config.consolidate_sides() {
        let entities = known.entities().into_iter().collect_vec();
        (entities.clone(), entities)
    } else {
        (
            known.subjects().into_iter().collect_vec(),
            known.objects().into_iter().collect_vec(),
        )
    };

    let strategy = config.strategy();
    let sampling = if strategy == Strategy::Exhaustive {
        Sampling::Exhaustive {
            subjects: subjects.into_iter(),
            objects,
            pending: Vec::new(),
        }
    } else {
        let graph = EntityGraph::new(known);
        let statistic = strategy.statistic(&graph);
        let weights = |pool: &[&str]| {
            let weights = pool.iter().map(|entity| match &statistic {
                Some(statistic) => {
                    let value = graph.index_of(entity).map_or(0., |index| statistic[index]);
                    config.bias().weight(value)
                }
                None => 1.,
            });
            // only fails for empty pools
            WeightedIndex::new(weights).ok()
        };
        let subject_weights = weights(&subjects);
        let object_weights = weights(&objects);

        Sampling::Random {
            rng: StdRng::seed_from_u64(config.seed()),
            subjects,
            objects,
            subject_weights,
            object_weights,
        }
    };

    Ok(Candidates {
        known: TripleSet::new(known),
        relation: target_relation.to_string(),
        max_candidates: config.max_candidates(),
        sampling,
    })
}

impl Iterator for Candidates<'_> {
    type Item = Triples;

    fn next(&mut self) -> Option<Self::Item> {
        let batch = match &mut self.sampling {
            Sampling::Exhaustive {
                subjects,
                objects,
                pending,
            } => {
                while pending.is_empty() {
                    let subject = subjects.next()?;
                    let candidates = objects
                        .iter()
                        .filter(|&&object| object != subject)
                        .map(|&object| Triple::new(subject, self.relation.as_str(), object));
                    *pending = self.known.difference(candidates).into();
                }
                let rest = pending.split_off(self.max_candidates.min(pending.len()));
                Triples::from(mem::replace(pending, rest))
            }
            Sampling::Random {
                rng,
                subjects,
                objects,
                subject_weights,
                object_weights,
            } => {
                let (subject_weights, object_weights) =
                    (subject_weights.as_ref()?, object_weights.as_ref()?);
                let candidates = (0..self.max_candidates)
                    .map(|_| {
                        let subject = subjects[subject_weights.sample(rng)];
                        let object = objects[object_weights.sample(rng)];
                        Triple::new(subject, self.relation.as_str(), object)
                    })
                    .unique()
                    .filter(|candidate| !candidate.is_self_loop());
                self.known.difference(candidates)
            }
        };
        debug!(relation = %self.relation, candidates = batch.len(), "generated candidates");

        Some(batch)
    }
}
