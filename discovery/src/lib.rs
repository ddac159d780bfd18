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

//! Discovery utilities for knowledge graphs of `(subject, relation, object)` triples.
//!
//! A fitted [`EmbeddingModel`] places the entities and relations of a graph in a vector space. The
//! utilities generate candidate facts, rank them to discover new facts and group the embeddings
//! to find clusters and duplicates.

#![forbid(unsafe_op_in_unsafe_fn)]
#![deny(
    clippy::future_not_send,
    clippy::pedantic,
    noop_method_call,
    rust_2018_idioms,
    unsafe_code,
    unused_qualifications
)]
#![warn(unreachable_pub, rustdoc::missing_crate_level_docs)]
#![allow(
    clippy::items_after_statements,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

mod candidates;
pub mod cluster;
pub mod config;
mod discover;
mod distance;
mod duplicates;
mod error;
mod graph;
pub mod logging;
mod model;
mod triple;

pub use crate::{
    candidates::{generate_candidates, Bias, Candidates, Strategy},
    cluster::{find_clusters, find_triple_clusters, Clustering, Dbscan, NOISE},
    config::{CandidatesConfig, DiscoveryConfig, DuplicatesConfig},
    discover::{discover_facts, Discovery},
    distance::{cosine_similarity, Metric},
    duplicates::{find_duplicate_triples, find_duplicates, Duplicates, Tolerance},
    error::{ShapeError, ValidationError},
    graph::EntityGraph,
    model::{EmbeddingModel, Fit},
    triple::{setdiff2d, Triple, Triples, TRIPLE_ARITY},
};
