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

//! Structural statistics of the undirected entity graph.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use crate::triple::Triples;

/// The undirected simple graph of the entities of a collection of triples.
///
/// There is an edge between the subject and the object of every triple. Relations and self loops
/// are ignored, but self loops still count towards the entity frequency.
#[derive(Clone, Debug)]
pub struct EntityGraph<'a> {
    entities: Vec<&'a str>,
    index: BTreeMap<&'a str, usize>,
    neighbors: Vec<BTreeSet<usize>>,
    frequency: Vec<usize>,
}

#[allow(clippy::cast_precision_loss)] // counts of small graphs
impl<'a> EntityGraph<'a> {
    pub fn new(triples: &'a Triples) -> Self {
        let entities = triples.entities().into_iter().collect_vec();
        let index = entities
            .iter()
            .enumerate()
            .map(|(idx, &entity)| (entity, idx))
            .collect::<BTreeMap<_, _>>();
        let mut neighbors = vec![BTreeSet::new(); entities.len()];
        let mut frequency = vec![0; entities.len()];

        for triple in triples {
            let subject = index[triple.subject.as_str()];
            let object = index[triple.object.as_str()];
            frequency[subject] += 1;
            frequency[object] += 1;
            if subject != object {
                neighbors[subject].insert(object);
                neighbors[object].insert(subject);
            }
        }

        Self {
            entities,
            index,
            neighbors,
            frequency,
        }
    }

    /// The entities in sorted order.
    pub fn entities(&self) -> &[&'a str] {
        &self.entities
    }

    /// The position of the entity in [`entities()`](Self::entities).
    pub fn index_of(&self, entity: &str) -> Option<usize> {
        self.index.get(entity).copied()
    }

    /// The number of occurrences of each entity as subject or object.
    pub fn entity_frequency(&self) -> Vec<f32> {
        self.frequency.iter().map(|&count| count as f32).collect()
    }

    /// The number of distinct neighbors of each entity.
    pub fn degree(&self) -> Vec<f32> {
        self.neighbors
            .iter()
            .map(|neighbors| neighbors.len() as f32)
            .collect()
    }

    fn triangles_of(&self, node: usize) -> usize {
        self.neighbors[node]
            .iter()
            .tuple_combinations()
            .filter(|(u, w)| self.neighbors[**u].contains(*w))
            .count()
    }

    /// The number of triangles through each entity.
    pub fn triangles(&self) -> Vec<f32> {
        (0..self.entities.len())
            .map(|node| self.triangles_of(node) as f32)
            .collect()
    }

    /// The local clustering coefficient of each entity.
    ///
    /// It is the fraction of pairs of neighbors which are connected themselves and zero for
    /// entities with less than two neighbors.
    pub fn clustering_coefficient(&self) -> Vec<f32> {
        (0..self.entities.len())
            .map(|node| {
                let degree = self.neighbors[node].len();
                if degree < 2 {
                    0.
                } else {
                    2. * self.triangles_of(node) as f32 / (degree * (degree - 1)) as f32
                }
            })
            .collect()
    }

    /// The square clustering coefficient of each entity.
    ///
    /// For every pair of neighbors `u, w` the common neighbors of `u` and `w` other than the entity
    /// close a square. The count is normalized by the number of potential squares (Lind et al.,
    /// 2005).
    pub fn square_clustering(&self) -> Vec<f32> {
        (0..self.entities.len())
            .map(|node| {
                let mut squares = 0;
                let mut potential = 0;
                for (&u, &w) in self.neighbors[node].iter().tuple_combinations() {
                    let common = self.neighbors[u]
                        .intersection(&self.neighbors[w])
                        .filter(|&&v| v != node)
                        .count();
                    let mut degm = common + 1;
                    if self.neighbors[u].contains(&w) {
                        degm += 1;
                    }
                    squares += common;
                    potential += (self.neighbors[u].len() - degm)
                        + (self.neighbors[w].len() - degm)
                        + common;
                }

                if potential > 0 {
                    squares as f32 / potential as f32
                } else {
                    0.
                }
            })
            .collect()
    }
}
