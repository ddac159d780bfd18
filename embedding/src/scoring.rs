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

//! Scoring functions of the embedding models and their gradients.

use std::fmt;

use ndarray::{Array1, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::embedding::Embedding1;

/// The scoring function of a model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Relations translate subjects to objects, scored by the negative euclidean distance.
    #[default]
    TransE,
    /// Relations scale a trilinear dot product.
    DistMult,
    /// A trilinear dot product of complex embeddings with the conjugated object.
    ComplEx,
}

impl ModelKind {
    /// The embedding size for `k` dimensions.
    ///
    /// Complex embeddings store the real parts followed by the imaginary parts.
    pub fn embedding_size(self, k: usize) -> usize {
        match self {
            Self::TransE | Self::DistMult => k,
            Self::ComplEx => 2 * k,
        }
    }

    /// Scores a triple given the embeddings of its labels, higher is more plausible.
    pub fn score(
        self,
        subject: ArrayView1<'_, f32>,
        relation: ArrayView1<'_, f32>,
        object: ArrayView1<'_, f32>,
    ) -> f32 {
        match self {
            Self::TransE => {
                let translation = &subject + &relation - object;
                -translation.dot(&translation).sqrt()
            }
            Self::DistMult => (&subject * &relation * object).sum(),
            Self::ComplEx => {
                let ([sr, si], [rr, ri], [or, oi]) =
                    (complex(subject), complex(relation), complex(object));
                (&sr * &rr * &or + &si * &rr * &oi + &sr * &ri * &oi - &si * &ri * &or).sum()
            }
        }
    }

    /// Computes the gradients of the score wrt the subject, relation and object embeddings.
    pub fn gradients(
        self,
        subject: ArrayView1<'_, f32>,
        relation: ArrayView1<'_, f32>,
        object: ArrayView1<'_, f32>,
    ) -> [Embedding1; 3] {
        match self {
            Self::TransE => {
                let translation = &subject + &relation - object;
                let norm = translation.dot(&translation).sqrt();
                let gradient = if norm > 0. {
                    -translation / norm
                } else {
                    Array1::zeros(subject.len())
                };
                [
                    gradient.clone().into(),
                    gradient.clone().into(),
                    (-gradient).into(),
                ]
            }
            Self::DistMult => [
                (&relation * &object).into(),
                (&subject * &object).into(),
                (&subject * &relation).into(),
            ],
            Self::ComplEx => {
                let ([sr, si], [rr, ri], [or, oi]) =
                    (complex(subject), complex(relation), complex(object));
                [
                    concat(&rr * &or + &ri * &oi, &rr * &oi - &ri * &or),
                    concat(&sr * &or + &si * &oi, &sr * &oi - &si * &or),
                    concat(&sr * &rr - &si * &ri, &si * &rr + &sr * &ri),
                ]
            }
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TransE => "TransE",
            Self::DistMult => "DistMult",
            Self::ComplEx => "ComplEx",
        };
        write!(f, "{name}")
    }
}

/// Splits a complex embedding into its real and imaginary parts.
fn complex(embedding: ArrayView1<'_, f32>) -> [ArrayView1<'_, f32>; 2] {
    let k = embedding.len() / 2;
    let (real, imaginary) = embedding.split_at(Axis(0), k);
    [real, imaginary]
}

fn concat(real: Array1<f32>, imaginary: Array1<f32>) -> Embedding1 {
    real.iter().chain(&imaginary).copied().collect::<Array1<_>>().into()
}
