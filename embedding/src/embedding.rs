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

use derive_more::{Deref, DerefMut, From};
use displaydoc::Display;
use ndarray::{Array, Array2, Dimension, Ix, Ix1, Ix2};
use rand::{distributions::Uniform, Rng};
use thiserror::Error;
use xayn_test_utils::ApproxEqIter;

/// A d-dimensional embedding.
#[derive(Clone, Debug, Default, Deref, DerefMut, From, PartialEq)]
pub struct Embedding<D>(Array<f32, D>)
where
    D: Dimension;

impl<'a, D> ApproxEqIter<'a, f32> for Embedding<D>
where
    D: 'a + Dimension,
{
    fn indexed_iter_logical_order(
        &'a self,
        index_prefix: Vec<Ix>,
    ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, f32)>> {
        (**self).indexed_iter_logical_order(index_prefix)
    }
}

/// The embedding of a single entity or relation.
///
/// The embedding is of shape `(embedding_size,)`.
pub type Embedding1 = Embedding<Ix1>;

/// The embeddings of all entities or relations of a graph.
///
/// The embeddings are of shape `(labels, embedding_size)`, one row per label.
pub type Embedding2 = Embedding<Ix2>;

#[derive(Clone, Copy, Debug, Display, Error, PartialEq, Eq)]
/// Values don't represent a valid embedding.
pub struct InvalidEmbedding;

impl Embedding2 {
    /// Draws uniformly distributed embeddings on the unit sphere.
    pub(crate) fn random(labels: usize, embedding_size: usize, rng: &mut impl Rng) -> Self {
        let range = Uniform::new_inclusive(-1., 1.);
        let mut embeddings = Self(Array2::from_shape_simple_fn(
            (labels, embedding_size),
            || rng.sample(&range),
        ));
        // finite by construction
        embeddings.normalize_rows().ok();

        embeddings
    }

    /// Scales each row to unit length.
    ///
    /// Rows of zeros stay zero.
    ///
    /// # Errors
    /// Fails if any row isn't finite.
    pub fn normalize_rows(&mut self) -> Result<(), InvalidEmbedding> {
        for mut row in self.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if !norm.is_finite() {
                return Err(InvalidEmbedding);
            }
            if norm > 0. {
                row /= norm;
            }
        }

        Ok(())
    }
}
