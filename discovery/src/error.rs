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

use displaydoc::Display;
use thiserror::Error;

/// Structural errors of triple arrays.
#[derive(Clone, Copy, Debug, Display, Error, PartialEq, Eq)]
pub enum ShapeError {
    /// Expected a 2-dimensional array of triples, got {0} dimensions
    Rank(usize),
    /// Expected rows of 3 labels, got rows of {0} labels
    Width(usize),
}

/// Invalid inputs of the discovery operations.
#[derive(Clone, Debug, Display, Error, PartialEq)]
pub enum ValidationError {
    /// The embedding model must be fitted before it can be used
    NotFitted,
    /// Unknown candidate generation strategy `{0}`
    UnknownStrategy(String),
    /// Unknown sampling bias `{0}`, expected `high` or `low`
    UnknownBias(String),
    /// Unknown distance metric `{0}`
    UnknownMetric(String),
    /// The relation `{0}` doesn't occur in the graph
    UnknownRelation(String),
    /// The entity `{0}` has no embedding
    MissingEntityEmbedding(String),
    /// The relation `{0}` has no embedding
    MissingRelationEmbedding(String),
    /// The embeddings have mismatching sizes {0} and {1}
    EmbeddingSize(usize, usize),
    /// The triple {0} can't be scored by the model
    Unscorable(String),
    /// Invalid maximum number of candidates, expected positive value
    MaxCandidates,
    /// Invalid number of top ranks, expected positive value
    TopN,
    /// Invalid tolerance {0}, expected non-negative finite value or `auto`
    Tolerance(String),
    /// Invalid expected fraction of duplicates {0}, expected value from the interval (0, 1]
    ExpectedFraction(f32),
    /// The clustering produced {got} labels for {expected} rows
    Labels { expected: usize, got: usize },
}
