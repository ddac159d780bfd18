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

use std::str::FromStr;

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Metrics for the distance between embeddings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Metric {
    /// The L2 distance.
    #[default]
    Euclidean,
    /// The L1 distance.
    Manhattan,
    /// One minus the cosine similarity, bounded in `[0, 2]`.
    Cosine,
}

impl Metric {
    pub fn distance(self, a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
        match self {
            Self::Euclidean => a
                .iter()
                .zip(b)
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f32>()
                .sqrt(),
            Self::Manhattan => a.iter().zip(b).map(|(a, b)| (a - b).abs()).sum(),
            Self::Cosine => 1. - cosine_similarity(a, b),
        }
    }

    /// Computes the symmetric matrix of distances between all rows.
    pub fn pairwise(self, points: ArrayView2<'_, f32>) -> Array2<f32> {
        let n = points.nrows();
        let mut distances = Array2::zeros((n, n));
        for i in 0..n {
            for j in i + 1..n {
                let distance = self.distance(points.row(i), points.row(j));
                distances[[i, j]] = distance;
                distances[[j, i]] = distance;
            }
        }
        distances
    }
}

impl FromStr for Metric {
    type Err = ValidationError;

    fn from_str(metric: &str) -> Result<Self, Self::Err> {
        match metric {
            "euclidean" | "l2" => Ok(Self::Euclidean),
            "manhattan" | "l1" => Ok(Self::Manhattan),
            "cosine" => Ok(Self::Cosine),
            _ => Err(ValidationError::UnknownMetric(metric.to_string())),
        }
    }
}

impl TryFrom<String> for Metric {
    type Error = ValidationError;

    fn try_from(metric: String) -> Result<Self, Self::Error> {
        metric.parse()
    }
}

/// The cosine similarity, bounded in `[-1, 1]`.
///
/// The zero vector is always "similar" to all other vectors, thus will yield a similarity of 1.
pub fn cosine_similarity(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a > 0. && norm_b > 0. {
        (a.dot(&b) / (norm_a * norm_b)).clamp(-1., 1.)
    } else {
        1.
    }
}
