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

use std::{
    collections::{BTreeSet, HashSet},
    fmt,
    hash::Hash,
};

use derive_more::{Deref, From, Into};
use ndarray::{Array2, ArrayView, ArrayView2, Axis, Dimension, Ix2};
use serde::{Deserialize, Serialize};

use crate::error::ShapeError;

/// The number of labels of a triple.
pub const TRIPLE_ARITY: usize = 3;

/// A labeled fact of a knowledge graph.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Triple {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    /// The labels in `(subject, relation, object)` order.
    pub fn labels(&self) -> [&str; TRIPLE_ARITY] {
        [&self.subject, &self.relation, &self.object]
    }

    /// Checks if subject and object are the same entity.
    pub fn is_self_loop(&self) -> bool {
        self.subject == self.object
    }
}

impl<S> From<[S; TRIPLE_ARITY]> for Triple
where
    S: Into<String>,
{
    fn from([subject, relation, object]: [S; TRIPLE_ARITY]) -> Self {
        Self::new(subject, relation, object)
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.relation, self.object)
    }
}

/// An ordered collection of triples.
///
/// Duplicates are allowed and the insertion order is kept. Collections are compared row-wise, ie.
/// a triple is only equal to another triple if all three labels are equal.
#[derive(Clone, Debug, Default, Deref, From, Into, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Triples(Vec<Triple>);

impl Triples {
    /// Creates a collection from a 2-dimensional array of labels.
    ///
    /// # Errors
    /// Fails if the array isn't 2-dimensional or its rows don't have exactly 3 labels.
    pub fn from_array<S, D>(array: ArrayView<'_, S, D>) -> Result<Self, ShapeError>
    where
        S: AsRef<str>,
        D: Dimension,
    {
        let array = as_triple_rows(array)?;
        Ok(array
            .rows()
            .into_iter()
            .map(|row| Triple::new(row[0].as_ref(), row[1].as_ref(), row[2].as_ref()))
            .collect())
    }

    /// Converts the collection to an array of shape `(len, 3)`.
    pub fn to_array(&self) -> Array2<String> {
        Array2::from_shape_fn((self.len(), TRIPLE_ARITY), |(row, column)| {
            self[row].labels()[column].to_string()
        })
    }

    pub fn push(&mut self, triple: impl Into<Triple>) {
        self.0.push(triple.into());
    }

    /// The distinct subjects in sorted order.
    pub fn subjects(&self) -> BTreeSet<&str> {
        self.iter().map(|triple| triple.subject.as_str()).collect()
    }

    /// The distinct objects in sorted order.
    pub fn objects(&self) -> BTreeSet<&str> {
        self.iter().map(|triple| triple.object.as_str()).collect()
    }

    /// The distinct entities, ie. subjects and objects, in sorted order.
    pub fn entities(&self) -> BTreeSet<&str> {
        self.iter()
            .flat_map(|triple| [triple.subject.as_str(), triple.object.as_str()])
            .collect()
    }

    /// The distinct relations in sorted order.
    pub fn relations(&self) -> BTreeSet<&str> {
        self.iter().map(|triple| triple.relation.as_str()).collect()
    }

    /// Checks if any triple has the relation.
    pub fn has_relation(&self, relation: &str) -> bool {
        self.iter().any(|triple| triple.relation == relation)
    }

    /// The triples which don't occur in the other collection.
    ///
    /// The order and the duplicates of this collection are kept.
    pub fn difference(&self, other: &Triples) -> Triples {
        TripleSet::new(other).difference(self.iter().cloned())
    }
}

/// A lookup of known triples for repeated set differences against the same collection.
#[derive(Clone, Debug)]
pub(crate) struct TripleSet<'a>(HashSet<&'a Triple>);

impl<'a> TripleSet<'a> {
    pub(crate) fn new(triples: &'a Triples) -> Self {
        Self(triples.iter().collect())
    }

    pub(crate) fn contains(&self, triple: &Triple) -> bool {
        self.0.contains(triple)
    }

    /// The triples which aren't known, in order and with duplicates.
    pub(crate) fn difference(&self, triples: impl IntoIterator<Item = Triple>) -> Triples {
        triples
            .into_iter()
            .filter(|triple| !self.contains(triple))
            .collect()
    }
}

impl FromIterator<Triple> for Triples {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Triple>,
    {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Triples {
    type Item = Triple;
    type IntoIter = std::vec::IntoIter<Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Triples {
    type Item = &'a Triple;
    type IntoIter = std::slice::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<S, const N: usize> From<[[S; TRIPLE_ARITY]; N]> for Triples
where
    S: Into<String>,
{
    fn from(triples: [[S; TRIPLE_ARITY]; N]) -> Self {
        triples.into_iter().map(Triple::from).collect()
    }
}

fn as_triple_rows<S, D>(array: ArrayView<'_, S, D>) -> Result<ArrayView2<'_, S>, ShapeError>
where
    D: Dimension,
{
    let rank = array.ndim();
    if rank != 2 {
        return Err(ShapeError::Rank(rank));
    }
    let width = array.shape()[1];
    if width != TRIPLE_ARITY {
        return Err(ShapeError::Width(width));
    }

    array
        .into_dimensionality::<Ix2>()
        .map_err(|_| ShapeError::Rank(rank))
}

/// Computes the rows of `x` whose whole triple doesn't occur anywhere in `y`.
///
/// Unlike an elementwise set difference the rows are treated as atomic triples. The order and the
/// duplicates of `x` are kept.
///
/// # Errors
/// Fails if any input isn't a 2-dimensional array of triples, eg. when it is called with flat
/// 1-dimensional arrays.
pub fn setdiff2d<S, D>(
    x: ArrayView<'_, S, D>,
    y: ArrayView<'_, S, D>,
) -> Result<Array2<S>, ShapeError>
where
    S: Clone + Eq + Hash,
    D: Dimension,
{
    let x = as_triple_rows(x)?;
    let y = as_triple_rows(y)?;

    let known = (0..y.nrows())
        .map(|row| [&y[[row, 0]], &y[[row, 1]], &y[[row, 2]]])
        .collect::<HashSet<_>>();
    let kept = (0..x.nrows())
        .filter(|&row| !known.contains(&[&x[[row, 0]], &x[[row, 1]], &x[[row, 2]]]))
        .collect::<Vec<_>>();

    Ok(x.select(Axis(0), &kept))
}

#[cfg(test)]
pub(crate) mod tests {
    use ndarray::{arr1, arr2, Array3};

    use super::*;

    pub(crate) fn graph() -> Triples {
        Triples::from([
            ["a", "y", "b"],
            ["b", "y", "a"],
            ["a", "y", "c"],
            ["c", "y", "a"],
            ["a", "y", "d"],
            ["c", "y", "d"],
            ["b", "y", "c"],
            ["f", "y", "e"],
        ])
    }

    fn other_graph() -> Triples {
        Triples::from([
            ["a", "z", "b"],
            ["b", "z", "a"],
            ["a", "z", "c"],
            ["c", "z", "a"],
            ["a", "y", "d"],
            ["c", "y", "d"],
            ["b", "y", "c"],
            ["f", "y", "e"],
        ])
    }

    #[test]
    fn test_setdiff2d() {
        let x = graph().to_array();
        let y = other_graph().to_array();

        let expected = arr2(&[
            ["a", "y", "b"],
            ["b", "y", "a"],
            ["a", "y", "c"],
            ["c", "y", "a"],
        ])
        .mapv(String::from);
        assert_eq!(setdiff2d(x.view(), y.view()).unwrap(), expected);

        let expected = arr2(&[
            ["a", "z", "b"],
            ["b", "z", "a"],
            ["a", "z", "c"],
            ["c", "z", "a"],
        ])
        .mapv(String::from);
        assert_eq!(setdiff2d(y.view(), x.view()).unwrap(), expected);
    }

    #[test]
    fn test_setdiff2d_keeps_duplicates() {
        let x = arr2(&[["a", "y", "b"], ["c", "y", "d"], ["a", "y", "b"]]);
        let y = arr2(&[["c", "y", "d"]]);
        assert_eq!(
            setdiff2d(x.view(), y.view()).unwrap(),
            arr2(&[["a", "y", "b"], ["a", "y", "b"]]),
        );
    }

    #[test]
    fn test_setdiff2d_is_not_elementwise() {
        let x = arr2(&[[1, 2, 3], [4, 5, 6]]);
        let y = arr2(&[[1, 2, 6], [4, 5, 3]]);
        assert_eq!(setdiff2d(x.view(), y.view()).unwrap(), x);
    }

    #[test]
    fn test_setdiff2d_flat() {
        let x = arr1(&[1, 2, 3, 4, 5, 6]);
        let y = arr1(&[1, 2, 3, 7, 8, 9]);
        assert_eq!(setdiff2d(x.view(), y.view()), Err(ShapeError::Rank(1)));
    }

    #[test]
    fn test_setdiff2d_invalid_shape() {
        let x = arr2(&[[1, 2], [3, 4]]);
        assert_eq!(setdiff2d(x.view(), x.view()), Err(ShapeError::Width(2)));

        let x = Array3::<u8>::zeros((2, 3, 1));
        assert_eq!(setdiff2d(x.view(), x.view()), Err(ShapeError::Rank(3)));
    }

    #[test]
    fn test_difference() {
        let difference = graph().difference(&other_graph());
        assert_eq!(
            difference,
            Triples::from([
                ["a", "y", "b"],
                ["b", "y", "a"],
                ["a", "y", "c"],
                ["c", "y", "a"],
            ]),
        );
        assert!(graph().difference(&graph()).is_empty());
    }

    #[test]
    fn test_from_array() {
        let array = arr2(&[["a", "y", "b"], ["f", "y", "e"]]);
        let triples = Triples::from_array(array.view()).unwrap();
        assert_eq!(triples, Triples::from([["a", "y", "b"], ["f", "y", "e"]]));
        assert_eq!(triples.to_array(), array.mapv(String::from));

        let flat = arr1(&["a", "y", "b"]);
        assert_eq!(
            Triples::from_array(flat.view()),
            Err(ShapeError::Rank(1)),
        );
    }

    #[test]
    fn test_labels() {
        let triples = graph();
        assert_eq!(
            triples.entities().into_iter().collect::<Vec<_>>(),
            ["a", "b", "c", "d", "e", "f"],
        );
        assert_eq!(
            triples.subjects().into_iter().collect::<Vec<_>>(),
            ["a", "b", "c", "f"],
        );
        assert_eq!(
            triples.objects().into_iter().collect::<Vec<_>>(),
            ["a", "b", "c", "d", "e"],
        );
        assert_eq!(triples.relations().into_iter().collect::<Vec<_>>(), ["y"]);
        assert!(triples.has_relation("y"));
        assert!(!triples.has_relation("z"));
    }
}
