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

use std::collections::VecDeque;

use ndarray::{Array1, ArrayView2};

use super::Clustering;
use crate::distance::Metric;

/// The label of rows which don't belong to any cluster.
pub const NOISE: isize = -1;

/// Density-based spatial clustering of applications with noise.
///
/// A row is a core row if at least `min_samples` rows (itself included) are within `eps` of it.
/// Clusters grow from core rows over their neighborhoods, rows which are neither core rows nor in
/// the neighborhood of one are labeled as [`NOISE`]. Cluster labels start at zero in the order in
/// which the clusters are found.
#[derive(Clone, Debug, PartialEq)]
pub struct Dbscan {
    eps: f32,
    min_samples: usize,
    metric: Metric,
}

impl Default for Dbscan {
    fn default() -> Self {
        Self {
            eps: 0.5,
            min_samples: 5,
            metric: Metric::Euclidean,
        }
    }
}

impl Dbscan {
    pub fn new(eps: f32, min_samples: usize) -> Self {
        Self {
            eps,
            min_samples,
            metric: Metric::Euclidean,
        }
    }

    /// Sets the metric of the neighborhoods.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }
}

impl Clustering for Dbscan {
    fn fit_predict(&mut self, points: ArrayView2<'_, f32>) -> Array1<isize> {
        let distances = self.metric.pairwise(points);
        let neighbors = |row: usize| {
            distances
                .row(row)
                .indexed_iter()
                .filter_map(|(other, &distance)| (distance <= self.eps).then_some(other))
                .collect::<Vec<_>>()
        };

        let mut labels = vec![None; points.nrows()];
        let mut cluster = 0;
        for row in 0..points.nrows() {
            if labels[row].is_some() {
                continue;
            }
            let mut queue = VecDeque::from(neighbors(row));
            if queue.len() < self.min_samples {
                labels[row] = Some(NOISE);
                continue;
            }

            labels[row] = Some(cluster);
            while let Some(other) = queue.pop_front() {
                match labels[other] {
                    Some(NOISE) => labels[other] = Some(cluster),
                    Some(_) => {}
                    None => {
                        labels[other] = Some(cluster);
                        let expansion = neighbors(other);
                        if expansion.len() >= self.min_samples {
                            queue.extend(expansion);
                        }
                    }
                }
            }
            cluster += 1;
        }

        labels.into_iter().map(|label| label.unwrap_or(NOISE)).collect()
    }
}
