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
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{model::Model, scoring::ModelKind};

/// Hyperparameters of an embedding model.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
#[must_use]
pub struct Config {
    kind: ModelKind,
    k: usize,
    epochs: usize,
    batches_count: usize,
    learning_rate: f32,
    negatives: usize,
    margin: f32,
    seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kind: ModelKind::default(),
            k: 100,
            epochs: 100,
            batches_count: 10,
            learning_rate: 0.01,
            negatives: 2,
            margin: 1.,
            seed: 0,
        }
    }
}

/// Errors of the embedding model configuration.
#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum Error {
    /// Invalid number of dimensions, expected positive value
    K,
    /// Invalid number of epochs, expected positive value
    Epochs,
    /// Invalid number of batches, expected positive value
    BatchesCount,
    /// Invalid learning rate, expected finite positive value
    LearningRate,
    /// Invalid number of negatives, expected positive value
    Negatives,
    /// Invalid margin, expected finite positive value
    Margin,
}

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        if self.k == 0 {
            return Err(Error::K);
        }
        if self.epochs == 0 {
            return Err(Error::Epochs);
        }
        if self.batches_count == 0 {
            return Err(Error::BatchesCount);
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.) {
            return Err(Error::LearningRate);
        }
        if self.negatives == 0 {
            return Err(Error::Negatives);
        }
        if !(self.margin.is_finite() && self.margin > 0.) {
            return Err(Error::Margin);
        }

        Ok(())
    }

    /// The scoring function.
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Sets the scoring function.
    pub fn with_kind(mut self, kind: ModelKind) -> Self {
        self.kind = kind;
        self
    }

    /// The number of dimensions of the embeddings.
    ///
    /// The actual embedding size depends on the [`ModelKind`].
    pub fn k(&self) -> usize {
        self.k
    }

    /// Sets the number of dimensions.
    ///
    /// # Errors
    /// Fails if the number is zero.
    pub fn with_k(mut self, k: usize) -> Result<Self, Error> {
        self.k = k;
        self.validate()?;

        Ok(self)
    }

    /// The number of passes over the graph.
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Sets the number of epochs.
    ///
    /// # Errors
    /// Fails if the number is zero.
    pub fn with_epochs(mut self, epochs: usize) -> Result<Self, Error> {
        self.epochs = epochs;
        self.validate()?;

        Ok(self)
    }

    /// The number of batches the graph is split into per epoch.
    pub fn batches_count(&self) -> usize {
        self.batches_count
    }

    /// Sets the number of batches.
    ///
    /// # Errors
    /// Fails if the number is zero.
    pub fn with_batches_count(mut self, batches_count: usize) -> Result<Self, Error> {
        self.batches_count = batches_count;
        self.validate()?;

        Ok(self)
    }

    /// The step size of the gradient descent.
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Sets the learning rate.
    ///
    /// # Errors
    /// Fails if the rate isn't finite and positive.
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Result<Self, Error> {
        self.learning_rate = learning_rate;
        self.validate()?;

        Ok(self)
    }

    /// The number of corruptions sampled per known triple.
    pub fn negatives(&self) -> usize {
        self.negatives
    }

    /// Sets the number of negatives.
    ///
    /// # Errors
    /// Fails if the number is zero.
    pub fn with_negatives(mut self, negatives: usize) -> Result<Self, Error> {
        self.negatives = negatives;
        self.validate()?;

        Ok(self)
    }

    /// The margin between the scores of known triples and corruptions.
    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Sets the margin.
    ///
    /// # Errors
    /// Fails if the margin isn't finite and positive.
    pub fn with_margin(mut self, margin: f32) -> Result<Self, Error> {
        self.margin = margin;
        self.validate()?;

        Ok(self)
    }

    /// The seed of the initialization and the negative sampling.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Creates an unfitted model.
    pub fn build(self) -> Model {
        Model::new(self)
    }
}
