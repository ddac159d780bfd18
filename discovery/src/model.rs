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

//! Capabilities of the knowledge-graph embedding models used by the discovery.

use ndarray::{Array2, ArrayView1};

use crate::{
    error::ValidationError,
    triple::{Triple, Triples},
};

/// A knowledge-graph embedding model.
pub trait EmbeddingModel {
    /// Checks if the model has been fitted.
    fn is_fitted(&self) -> bool;

    /// Gets the embedding of an entity.
    fn entity_embedding(&self, entity: &str) -> Option<ArrayView1<'_, f32>>;

    /// Gets the embedding of a relation.
    fn relation_embedding(&self, relation: &str) -> Option<ArrayView1<'_, f32>>;

    /// Scores the plausibility of a triple, higher is more plausible.
    ///
    /// Returns `None` if any label of the triple is unknown to the model.
    fn score(&self, triple: &Triple) -> Option<f32>;
}

/// The fit lifecycle of a model.
pub trait Fit {
    type Error: std::error::Error;

    /// Trains the model on a graph.
    fn fit(&mut self, triples: &Triples) -> Result<(), Self::Error>;
}

pub(crate) fn ensure_fitted(model: &impl EmbeddingModel) -> Result<(), ValidationError> {
    if model.is_fitted() {
        Ok(())
    } else {
        Err(ValidationError::NotFitted)
    }
}

/// Stacks the embeddings of the entities into a matrix with one row per entity.
pub(crate) fn entity_embeddings<'a>(
    model: &impl EmbeddingModel,
    entities: impl IntoIterator<Item = &'a str>,
) -> Result<Array2<f32>, ValidationError> {
    stack(entities.into_iter().map(|entity| {
        model
            .entity_embedding(entity)
            .map(|embedding| embedding.to_vec())
            .ok_or_else(|| ValidationError::MissingEntityEmbedding(entity.to_string()))
    }))
}

/// Stacks the embeddings of the triples into a matrix with one row per triple.
///
/// The row of a triple is the concatenation of its subject, relation and object embeddings.
pub(crate) fn triple_embeddings<'a>(
    model: &impl EmbeddingModel,
    triples: impl IntoIterator<Item = &'a Triple>,
) -> Result<Array2<f32>, ValidationError> {
    stack(triples.into_iter().map(|triple| {
        let subject = model
            .entity_embedding(&triple.subject)
            .ok_or_else(|| ValidationError::MissingEntityEmbedding(triple.subject.clone()))?;
        let relation = model
            .relation_embedding(&triple.relation)
            .ok_or_else(|| ValidationError::MissingRelationEmbedding(triple.relation.clone()))?;
        let object = model
            .entity_embedding(&triple.object)
            .ok_or_else(|| ValidationError::MissingEntityEmbedding(triple.object.clone()))?;

        Ok(subject
            .iter()
            .chain(relation.iter())
            .chain(object.iter())
            .copied()
            .collect())
    }))
}

fn stack(
    rows: impl Iterator<Item = Result<Vec<f32>, ValidationError>>,
) -> Result<Array2<f32>, ValidationError> {
    let rows = rows.collect::<Result<Vec<_>, _>>()?;
    let width = rows.first().map_or(0, Vec::len);
    if let Some(row) = rows.iter().find(|row| row.len() != width) {
        return Err(ValidationError::EmbeddingSize(width, row.len()));
    }

    Ok(Array2::from_shape_fn((rows.len(), width), |(row, column)| {
        rows[row][column]
    }))
}
