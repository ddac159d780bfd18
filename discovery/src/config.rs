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

use std::path::Path;

use displaydoc::Display;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    candidates::{Bias, Strategy},
    distance::Metric,
    duplicates::Tolerance,
    error::ValidationError,
    logging,
};

/// The prefix of environment variables which override configurations.
pub const ENV_PREFIX: &str = "XAYN_KG_DISCOVERY__";

/// Configurations of the candidate generation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
#[must_use]
pub struct CandidatesConfig {
    strategy: Strategy,
    max_candidates: usize,
    consolidate_sides: bool,
    seed: u64,
    bias: Bias,
}

impl Default for CandidatesConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            max_candidates: 100,
            consolidate_sides: false,
            seed: 0,
            bias: Bias::default(),
        }
    }
}

impl CandidatesConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_candidates == 0 {
            return Err(ValidationError::MaxCandidates);
        }

        Ok(())
    }

    /// The sampling strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Sets the sampling strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The maximum number of candidates per batch.
    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    /// Sets the maximum number of candidates per batch.
    ///
    /// # Errors
    /// Fails if the maximum is zero.
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Result<Self, ValidationError> {
        self.max_candidates = max_candidates;
        self.validate()?;

        Ok(self)
    }

    /// Whether subjects and objects are drawn from the same pool of entities.
    pub fn consolidate_sides(&self) -> bool {
        self.consolidate_sides
    }

    /// Sets the consolidation of the entity pools.
    pub fn with_consolidate_sides(mut self, consolidate_sides: bool) -> Self {
        self.consolidate_sides = consolidate_sides;
        self
    }

    /// The seed of the random strategies.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The bias of the strategies weighted by graph statistics.
    pub fn bias(&self) -> Bias {
        self.bias
    }

    /// Sets the bias.
    pub fn with_bias(mut self, bias: Bias) -> Self {
        self.bias = bias;
        self
    }
}

/// Configurations of the fact discovery.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
#[must_use]
pub struct DiscoveryConfig {
    top_n: usize,
    candidates: CandidatesConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            candidates: CandidatesConfig::default(),
        }
    }
}

impl DiscoveryConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.top_n == 0 {
            return Err(ValidationError::TopN);
        }
        self.candidates.validate()
    }

    /// The maximum rank of a discovered fact.
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Sets the maximum rank.
    ///
    /// # Errors
    /// Fails if the rank is zero.
    pub fn with_top_n(mut self, top_n: usize) -> Result<Self, ValidationError> {
        self.top_n = top_n;
        self.validate()?;

        Ok(self)
    }

    /// The candidate generation.
    pub fn candidates(&self) -> &CandidatesConfig {
        &self.candidates
    }

    /// Sets the candidate generation.
    pub fn with_candidates(mut self, candidates: CandidatesConfig) -> Self {
        self.candidates = candidates;
        self
    }
}

/// Configurations of the duplicate detection.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
#[must_use]
pub struct DuplicatesConfig {
    metric: Metric,
    tolerance: Tolerance,
    expected_fraction_duplicates: f32,
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            metric: Metric::default(),
            tolerance: Tolerance::Auto,
            expected_fraction_duplicates: 0.1,
        }
    }
}

impl DuplicatesConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.tolerance.validate()?;
        if !(self.expected_fraction_duplicates > 0. && self.expected_fraction_duplicates <= 1.) {
            return Err(ValidationError::ExpectedFraction(
                self.expected_fraction_duplicates,
            ));
        }

        Ok(())
    }

    /// The distance metric between embeddings.
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Sets the distance metric.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// The maximum distance between duplicates.
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Sets the tolerance.
    ///
    /// # Errors
    /// Fails if a fixed tolerance is negative or not finite.
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Result<Self, ValidationError> {
        self.tolerance = tolerance;
        self.validate()?;

        Ok(self)
    }

    /// The expected fraction of duplicate pairs for an automatic tolerance.
    pub fn expected_fraction_duplicates(&self) -> f32 {
        self.expected_fraction_duplicates
    }

    /// Sets the expected fraction of duplicate pairs.
    ///
    /// # Errors
    /// Fails if the fraction is outside of the interval `(0, 1]`.
    pub fn with_expected_fraction_duplicates(
        mut self,
        expected_fraction_duplicates: f32,
    ) -> Result<Self, ValidationError> {
        self.expected_fraction_duplicates = expected_fraction_duplicates;
        self.validate()?;

        Ok(self)
    }
}

/// Configurations of the discovery utilities.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    pub duplicates: DuplicatesConfig,
    pub logging: logging::Config,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.discovery.validate()?;
        self.duplicates.validate()
    }
}

/// Errors of loading the configurations.
#[derive(Debug, Display, Error)]
pub enum Error {
    /// Failed to load the configuration: {0}
    Load(#[from] figment::Error),
    /// Invalid configuration: {0}
    Invalid(#[from] ValidationError),
}

/// Loads the configurations.
///
/// By ascending priority the values come from:
///
/// 1. the defaults
/// 2. the toml `file`, if any
/// 3. environment variables prefixed with [`ENV_PREFIX`]
///
/// Env variables are split at `__`, ie. `XAYN_KG_DISCOVERY__DISCOVERY__TOP_N=5` is treated like
/// the toml `discovery.top_n = 5`.
pub fn load(file: Option<&Path>) -> Result<Config, Error> {
    // the order must be from highest to lowest priority
    let mut figment = Figment::new().join(Env::prefixed(ENV_PREFIX).split("__"));
    if let Some(file) = file {
        figment = figment.join(Toml::file(file));
    }
    let config = figment
        .join(Serialized::defaults(Config::default()))
        .extract::<Config>()?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use figment::Jail;
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn test_validate_default_config() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            DiscoveryConfig::default().with_top_n(0),
            Err(ValidationError::TopN),
        );
        assert_eq!(
            DuplicatesConfig::default().with_expected_fraction_duplicates(0.),
            Err(ValidationError::ExpectedFraction(0.)),
        );
        assert!(DuplicatesConfig::default()
            .with_expected_fraction_duplicates(f32::NAN)
            .is_err());
        assert!(DuplicatesConfig::default()
            .with_tolerance(Tolerance::Fixed(-1.))
            .is_err());
    }

    #[test]
    fn test_load() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [discovery]
                top_n = 3

                [discovery.candidates]
                strategy = "graph_degree"
                consolidate_sides = true

                [duplicates]
                tolerance = 0.5
                metric = "cosine"

                [logging]
                level = "debug"
                directives = ["xayn_kg_discovery::candidates=trace"]
                "#,
            )?;
            jail.set_env("XAYN_KG_DISCOVERY__DISCOVERY__CANDIDATES__SEED", 42);

            let config =
                load(Some(Path::new("config.toml"))).map_err(|error| error.to_string())?;
            assert_eq!(config.discovery.top_n(), 3);
            let candidates = config.discovery.candidates();
            assert_eq!(candidates.strategy(), Strategy::GraphDegree);
            assert!(candidates.consolidate_sides());
            assert_eq!(candidates.seed(), 42);
            assert_eq!(candidates.max_candidates(), 100);
            assert_eq!(config.duplicates.tolerance(), Tolerance::Fixed(0.5));
            assert_eq!(config.duplicates.metric(), Metric::Cosine);
            assert_eq!(config.logging.level, LevelFilter::DEBUG);
            assert_eq!(config.logging.directives.len(), 1);

            Ok(())
        });
    }

    #[test]
    fn test_load_invalid() {
        Jail::expect_with(|jail| {
            jail.set_env("XAYN_KG_DISCOVERY__DISCOVERY__TOP_N", 0);
            assert!(matches!(load(None), Err(Error::Invalid(ValidationError::TopN))));

            jail.set_env("XAYN_KG_DISCOVERY__DISCOVERY__TOP_N", 1);
            jail.set_env("XAYN_KG_DISCOVERY__DISCOVERY__CANDIDATES__STRATEGY", "error");
            let Err(Error::Load(error)) = load(None) else {
                panic!("unknown strategy must fail to load");
            };
            assert!(error
                .to_string()
                .contains(&ValidationError::UnknownStrategy("error".into()).to_string()));

            Ok(())
        });
    }
}
