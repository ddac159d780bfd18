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

//! Fixtures and utilities for the end-to-end tests of the discovery utilities.
//!
//! As this is for testing, the fixtures panic on failure. Tests can return `Result<(), Panic>`
//! to use `?` on the fallible operations.

use std::{env, sync::Once};

use tracing::{dispatcher, info_span, Dispatch};
use tracing_subscriber::fmt::TestWriter;
use xayn_kg_discovery::{Fit, Triples};
use xayn_kg_embedding::{Config, FitError, Model, ModelKind};
pub use xayn_test_utils::Panic;

/// The env var of the log directives for the tests.
const LOG_ENV: &str = "XAYN_KG_TEST_LOG";

/// A graph of 6 entities and a single relation.
pub fn graph() -> Triples {
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

/// A graph of 8 subjects and 8 objects which are all distinct.
pub fn disjoint_graph() -> Triples {
    Triples::from([
        ["a", "y", "i"],
        ["b", "y", "j"],
        ["c", "y", "k"],
        ["d", "y", "l"],
        ["e", "y", "m"],
        ["f", "y", "n"],
        ["g", "y", "o"],
        ["h", "y", "p"],
    ])
}

/// The [`graph()`] with one of its triples under another relation.
pub fn graph_with_x() -> Triples {
    Triples::from([
        ["a", "y", "b"],
        ["b", "y", "a"],
        ["a", "y", "c"],
        ["c", "y", "a"],
        ["a", "y", "d"],
        ["c", "x", "d"],
        ["b", "y", "c"],
        ["f", "y", "e"],
    ])
}

/// A small `ComplEx` model configuration.
pub fn model_config() -> Config {
    Config::default()
        .with_kind(ModelKind::ComplEx)
        .with_k(5)
        .and_then(|config| config.with_epochs(2))
        .and_then(|config| config.with_batches_count(1))
        .map(|config| config.with_seed(555))
        .unwrap_or_else(|error| panic!("invalid test model configuration: {error}"))
}

/// Fits a small model to the graph.
pub fn fitted_model(triples: &Triples) -> Result<Model, FitError> {
    let mut model = model_config().build();
    model.fit(triples)?;

    Ok(model)
}

/// Installs a global subscriber writing to the test output.
///
/// The directives are read from `XAYN_KG_TEST_LOG` and default to `warn`.
pub fn initialize_test_logging() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(TestWriter::default())
            .with_env_filter(directives())
            .init();
    });
}

fn directives() -> String {
    env::var(LOG_ENV).unwrap_or_else(|_| "warn".into())
}

/// Runs the test body with a subscriber local to the test.
pub fn run_with_test_logger<T>(name: &str, body: impl FnOnce() -> T) -> T {
    initialize_test_logging();
    let subscriber: Dispatch = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(TestWriter::default())
        .with_env_filter(directives())
        .finish()
        .into();

    dispatcher::with_default(&subscriber, || info_span!("test", name).in_scope(body))
}
