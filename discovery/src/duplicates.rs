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

//! Detection of entities and triples whose embeddings are close to each other.

use std::{collections::BTreeSet, fmt, str::FromStr};

use itertools::Itertools;
use ndarray::{Array2, ArrayView2};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, instrument};

use crate::{
    config::DuplicatesConfig,
    error::ValidationError,
    model::{ensure_fitted, entity_embeddings, triple_embeddings, EmbeddingModel},
    triple::{Triple, Triples},
};

/// The maximum distance between duplicates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Tolerance {
    /// Derived from the expected fraction of duplicate pairs.
    #[default]
    Auto,
    /// A fixed non-negative distance.
    Fixed(f32),
}

impl Tolerance {
    pub(crate) fn validate(self) -> Result<(), ValidationError> {
        match self {
            Self::Fixed(tolerance) if !(tolerance.is_finite() && tolerance >= 0.) => {
                Err(ValidationError::Tolerance(tolerance.to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl FromStr for Tolerance {
    type Err = ValidationError;

    fn from_str(tolerance: &str) -> Result<Self, Self::Err> {
        if tolerance == "auto" {
            return Ok(Self::Auto);
        }
        let tolerance = tolerance
            .parse::<f32>()
            .map(Self::Fixed)
            .map_err(|_| ValidationError::Tolerance(tolerance.to_string()))?;
        tolerance.validate()?;

        Ok(tolerance)
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Fixed(tolerance) => tolerance.fmt(f),
        }
    }
}

impl Serialize for Tolerance {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Fixed(tolerance) => serializer.serialize_f32(*tolerance),
        }
    }
}

impl<'de> Deserialize<'de> for Tolerance {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f32),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(tolerance) => {
                let tolerance = Tolerance::Fixed(tolerance);
                tolerance.validate().map_err(de::Error::custom)?;
                Ok(tolerance)
            }
            Repr::Text(tolerance) => tolerance.parse().map_err(de::Error::custom),
        }
    }
}

/// Groups of duplicates together with the tolerance which was used to find them.
pub type Duplicates<T> = (Vec<BTreeSet<T>>, f32);

/// Finds groups of entities whose embeddings are within the tolerance of each other.
///
/// Two entities belong to the same group if they are connected by a chain of entities where each
/// step is within the tolerance. Entities without any duplicate are not part of any group, so the
/// groups may be empty.
#[instrument(skip_all)]
pub fn find_duplicates(
    known: &Triples,
    model: &impl EmbeddingModel,
    config: &DuplicatesConfig,
) -> Result<Duplicates<String>, ValidationError> {
    ensure_fitted(model)?;
    config.validate()?;

    let entities = known.entities().into_iter().collect_vec();
    let points = entity_embeddings(model, entities.iter().copied())?;
    let (groups, tolerance) = group_points(points.view(), config);
    let groups = groups
        .into_iter()
        .map(|group| {
            group
                .into_iter()
                .map(|index| entities[index].to_string())
                .collect()
        })
        .collect_vec();
    debug!(tolerance, groups = groups.len(), "found duplicate entities");

    Ok((groups, tolerance))
}

/// Finds groups of distinct triples whose embeddings are within the tolerance of each other.
///
/// The embedding of a triple is the concatenation of its subject, relation and object embeddings.
#[instrument(skip_all)]
pub fn find_duplicate_triples(
    known: &Triples,
    model: &impl EmbeddingModel,
    config: &DuplicatesConfig,
) -> Result<Duplicates<Triple>, ValidationError> {
    ensure_fitted(model)?;
    config.validate()?;

    let triples = known.iter().unique().collect_vec();
    let points = triple_embeddings(model, triples.iter().copied())?;
    let (groups, tolerance) = group_points(points.view(), config);
    let groups = groups
        .into_iter()
        .map(|group| {
            group
                .into_iter()
                .map(|index| triples[index].clone())
                .collect()
        })
        .collect_vec();
    debug!(tolerance, groups = groups.len(), "found duplicate triples");

    Ok((groups, tolerance))
}

/// Groups the rows by the connected components of their tolerance graph.
///
/// The groups are ordered by their first row and singletons are dropped.
fn group_points(
    points: ArrayView2<'_, f32>,
    config: &DuplicatesConfig,
) -> (Vec<Vec<usize>>, f32) {
    let distances = config.metric().pairwise(points);
    let tolerance = match config.tolerance() {
        Tolerance::Fixed(tolerance) => tolerance,
        Tolerance::Auto => auto_tolerance(&distances, config.expected_fraction_duplicates()),
    };

    let n = distances.nrows();
    let mut components = Components::new(n);
    for i in 0..n {
        for j in i + 1..n {
            if distances[[i, j]] <= tolerance {
                components.union(i, j);
            }
        }
    }

    let roots = (0..n).map(|row| components.find(row)).collect_vec();
    let groups = (0..n)
        .into_group_map_by(|&row| roots[row])
        .into_values()
        .filter(|group| group.len() > 1)
        .sorted_by_key(|group| group[0])
        .collect();

    (groups, tolerance)
}

/// Derives a tolerance such that about the expected fraction of pairs are within it.
///
/// The tolerance is the quantile of the pairwise distances, hence it grows monotonically with the
/// fraction. It is always positive.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn auto_tolerance(distances: &Array2<f32>, expected_fraction: f32) -> f32 {
    let n = distances.nrows();
    let pairs = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| distances[[i, j]])
        .filter(|distance| distance.is_finite())
        .sorted_by(f32::total_cmp)
        .collect_vec();

    let Some(&last) = pairs.last() else {
        return f32::EPSILON;
    };
    let position = expected_fraction.clamp(0., 1.) * (pairs.len() - 1) as f32;
    let lower = position.floor() as usize;
    let tolerance = if lower + 1 < pairs.len() {
        let weight = position - lower as f32;
        pairs[lower] * (1. - weight) + pairs[lower + 1] * weight
    } else {
        last
    };

    if tolerance > 0. {
        tolerance
    } else {
        pairs
            .into_iter()
            .find(|&distance| distance > 0.)
            .unwrap_or(f32::EPSILON)
    }
}

/// Disjoint sets of rows.
struct Components {
    parents: Vec<usize>,
}

impl Components {
    fn new(n: usize) -> Self {
        Self {
            parents: (0..n).collect(),
        }
    }

    fn find(&mut self, row: usize) -> usize {
        let mut root = row;
        while self.parents[root] != root {
            root = self.parents[root];
        }
        let mut row = row;
        while self.parents[row] != root {
            row = std::mem::replace(&mut self.parents[row], root);
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parents[a.max(b)] = a.min(b);
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::arr2;
    use xayn_test_utils::assert_approx_eq;

    use super::*;
    use crate::{
        model::tests::{MockModel, NO_LABELS},
        triple::tests::graph,
    };

    fn config(tolerance: Tolerance) -> DuplicatesConfig {
        DuplicatesConfig::default().with_tolerance(tolerance).unwrap()
    }

    #[test]
    fn test_tolerance_serde() {
        assert_eq!("auto".parse(), Ok(Tolerance::Auto));
        assert_eq!("1.5".parse(), Ok(Tolerance::Fixed(1.5)));
        assert!("-1".parse::<Tolerance>().is_err());
        assert!("far".parse::<Tolerance>().is_err());

        assert_eq!(
            serde_json::from_str::<Tolerance>("0.25").unwrap(),
            Tolerance::Fixed(0.25),
        );
        assert_eq!(
            serde_json::from_str::<Tolerance>(r#""auto""#).unwrap(),
            Tolerance::Auto,
        );
        assert!(serde_json::from_str::<Tolerance>("-0.25").is_err());
        assert_eq!(serde_json::to_string(&Tolerance::Auto).unwrap(), r#""auto""#);
    }

    #[test]
    fn test_find_duplicates_unfitted() {
        let model = MockModel::default();
        assert_eq!(
            find_duplicates(&graph(), &model, &DuplicatesConfig::default()),
            Err(ValidationError::NotFitted),
        );
    }

    #[test]
    fn test_find_duplicates_fixed() {
        let model = MockModel::new(
            [
                ("a", vec![0., 0.]),
                ("b", vec![0.1, 0.]),
                ("c", vec![5., 0.]),
                ("d", vec![5.2, 0.]),
                ("e", vec![10., 0.]),
                ("f", vec![20., 0.]),
            ],
            NO_LABELS,
        );
        let (groups, tolerance) =
            find_duplicates(&graph(), &model, &config(Tolerance::Fixed(0.5))).unwrap();

        assert_approx_eq!(f32, tolerance, 0.5);
        assert_eq!(
            groups,
            [
                BTreeSet::from(["a".to_string(), "b".to_string()]),
                BTreeSet::from(["c".to_string(), "d".to_string()]),
            ],
        );
    }

    #[test]
    fn test_find_duplicates_transitive() {
        let triples = graph();
        let model = MockModel::on_line(&triples);

        let (groups, _) =
            find_duplicates(&triples, &model, &config(Tolerance::Fixed(1.))).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), triples.entities().len());

        let (groups, _) =
            find_duplicates(&triples, &model, &config(Tolerance::Fixed(0.5))).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_find_duplicates_auto() {
        let triples = graph();
        let model = MockModel::on_line(&triples);
        let entities = triples.entities();

        let (groups, tolerance) = find_duplicates(
            &triples,
            &model,
            &DuplicatesConfig::default()
                .with_expected_fraction_duplicates(0.5)
                .unwrap(),
        )
        .unwrap();

        assert!(tolerance > 0.);
        assert!(groups.len() <= entities.len());
        for group in groups {
            assert!(group.len() <= entities.len());
            assert!(group.iter().all(|entity| entities.contains(entity.as_str())));
        }
    }

    #[test]
    fn test_find_duplicate_triples() {
        let triples = Triples::from([
            ["a", "r", "b"],
            ["a", "r", "b"],
            ["b", "r", "a"],
            ["a", "r", "c"],
        ]);
        let model = MockModel::new(
            [("a", vec![0.]), ("b", vec![0.1]), ("c", vec![7.])],
            [("r", vec![1.])],
        );

        let (groups, _) =
            find_duplicate_triples(&triples, &model, &config(Tolerance::Fixed(0.5))).unwrap();
        assert_eq!(
            groups,
            [BTreeSet::from([
                Triple::new("a", "r", "b"),
                Triple::new("b", "r", "a"),
            ])],
        );
    }

    #[test]
    fn test_auto_tolerance() {
        let distances = arr2(&[[0., 1., 2.], [1., 0., 3.], [2., 3., 0.]]);
        assert_approx_eq!(f32, auto_tolerance(&distances, 0.5), 2.);
        assert_approx_eq!(f32, auto_tolerance(&distances, 0.25), 1.5);
        assert_approx_eq!(f32, auto_tolerance(&distances, 1.), 3.);
        assert!(auto_tolerance(&distances, 0.1) <= auto_tolerance(&distances, 0.2));

        let distances = arr2(&[[0., 0., 2.], [0., 0., 2.], [2., 2., 0.]]);
        assert_approx_eq!(f32, auto_tolerance(&distances, 0.), 2.);

        let distances = Array2::zeros((1, 1));
        assert_approx_eq!(f32, auto_tolerance(&distances, 0.5), f32::EPSILON);
    }

    #[test]
    fn test_components() {
        let mut components = Components::new(5);
        components.union(3, 4);
        components.union(4, 1);
        assert_eq!(components.find(3), 1);
        assert_eq!(components.find(4), 1);
        assert_eq!(components.find(0), 0);
        assert_eq!(components.find(2), 2);
    }
}
