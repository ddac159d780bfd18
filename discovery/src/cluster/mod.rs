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

//! Clustering of entities and triples by their embeddings.

mod dbscan;

use std::collections::BTreeSet;

use itertools::Itertools;
use ndarray::{Array1, ArrayView2};
use tracing::{debug, instrument};

pub use self::dbscan::{Dbscan, NOISE};
use crate::{
    error::ValidationError,
    model::{ensure_fitted, entity_embeddings, triple_embeddings, EmbeddingModel},
    triple::Triples,
};

/// A clustering algorithm.
pub trait Clustering {
    /// Fits the algorithm to the rows and assigns a cluster label to each row.
    fn fit_predict(&mut self, points: ArrayView2<'_, f32>) -> Array1<isize>;
}

/// Selects the entities to cluster.
///
/// Without subsets these are all entities in sorted order. An entity subset restricts to its
/// entities in the given order, a relation subset restricts to the entities of the triples with
/// those relations. Empty subsets don't restrict anything.
pub fn select_entities<'a>(
    known: &'a Triples,
    entities_subset: &[&'a str],
    relations_subset: &[&str],
) -> Vec<&'a str> {
    let related = (!relations_subset.is_empty()).then(|| {
        known
            .iter()
            .filter(|triple| relations_subset.contains(&triple.relation.as_str()))
            .flat_map(|triple| [triple.subject.as_str(), triple.object.as_str()])
            .collect::<BTreeSet<_>>()
    });

    match (entities_subset.is_empty(), related) {
        (true, None) => known.entities().into_iter().collect(),
        (true, Some(related)) => related.into_iter().collect(),
        (false, related) => entities_subset
            .iter()
            .copied()
            .unique()
            .filter(|entity| related.as_ref().map_or(true, |related| related.contains(entity)))
            .collect(),
    }
}

/// Clusters the selected entities by their embeddings.
///
/// See [`select_entities()`] for the selection. The labels are in the order of the selection.
///
/// # Errors
/// Fails if the model isn't fitted or a selected entity has no embedding.
#[instrument(skip_all)]
pub fn find_clusters(
    known: &Triples,
    model: &impl EmbeddingModel,
    clustering: &mut impl Clustering,
    entities_subset: &[&str],
    relations_subset: &[&str],
) -> Result<Array1<isize>, ValidationError> {
    ensure_fitted(model)?;

    let entities = select_entities(known, entities_subset, relations_subset);
    let points = entity_embeddings(model, entities)?;
    predict(clustering, points.view())
}

/// Clusters the selected triples by their embeddings.
///
/// The embedding of a triple is the concatenation of its subject, relation and object embeddings.
/// An entity subset keeps the triples whose subject and object are both in the subset, a relation
/// subset keeps the triples with those relations. Empty subsets don't restrict anything.
///
/// # Errors
/// Fails if the model isn't fitted or a label of a selected triple has no embedding.
#[instrument(skip_all)]
pub fn find_triple_clusters(
    known: &Triples,
    model: &impl EmbeddingModel,
    clustering: &mut impl Clustering,
    entities_subset: &[&str],
    relations_subset: &[&str],
) -> Result<(Triples, Array1<isize>), ValidationError> {
    ensure_fitted(model)?;

    let selected = known
        .iter()
        .filter(|triple| {
            entities_subset.is_empty()
                || entities_subset.contains(&triple.subject.as_str())
                    && entities_subset.contains(&triple.object.as_str())
        })
        .filter(|triple| {
            relations_subset.is_empty() || relations_subset.contains(&triple.relation.as_str())
        })
        .cloned()
        .collect::<Triples>();
    let points = triple_embeddings(model, &selected)?;
    let labels = predict(clustering, points.view())?;

    Ok((selected, labels))
}

fn predict(
    clustering: &mut impl Clustering,
    points: ArrayView2<'_, f32>,
) -> Result<Array1<isize>, ValidationError> {
    let labels = clustering.fit_predict(points);
    if labels.len() != points.nrows() {
        return Err(ValidationError::Labels {
            expected: points.nrows(),
            got: labels.len(),
        });
    }
    debug!(
        rows = labels.len(),
        clusters = labels.iter().filter(|&&label| label != NOISE).unique().count(),
        "found clusters"
    );

    Ok(labels)
}
