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

use std::collections::BTreeMap;

use displaydoc::Display;
use itertools::Itertools;
use ndarray::ArrayView1;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, instrument};
use xayn_kg_discovery::{EmbeddingModel, Fit, Triple, Triples};

use crate::{config::Config, embedding::Embedding2, scoring::ModelKind};

/// A knowledge-graph embedding model which can be built from a [`Config`].
///
/// The model is fitted by stochastic gradient descent on a pairwise margin loss between the known
/// triples and sampled corruptions of them.
#[derive(Clone, Debug)]
pub struct Model {
    config: Config,
    entities: BTreeMap<String, usize>,
    relations: BTreeMap<String, usize>,
    entity_embeddings: Embedding2,
    relation_embeddings: Embedding2,
    fitted: bool,
}

/// The potential errors of fitting a [`Model`].
#[derive(Clone, Debug, Display, Error, PartialEq)]
pub enum FitError {
    /// Failed to configure the model: {0}
    Config(#[from] crate::config::Error),
    /// Can't fit a model to an empty graph
    EmptyGraph,
    /// The training diverged in epoch {0}
    Diverged(usize),
}

/// The label indices of a triple.
type Ids = [usize; 3];

impl Model {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            config,
            entities: BTreeMap::new(),
            relations: BTreeMap::new(),
            entity_embeddings: Embedding2::default(),
            relation_embeddings: Embedding2::default(),
            fitted: false,
        }
    }

    /// Gets the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gets the embedding size.
    pub fn embedding_size(&self) -> usize {
        self.config.kind().embedding_size(self.config.k())
    }

    /// Gets the entities known to the model in sorted order.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Gets the relations known to the model in sorted order.
    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    fn ids(&self, triple: &Triple) -> Option<Ids> {
        Some([
            *self.entities.get(&triple.subject)?,
            *self.relations.get(&triple.relation)?,
            *self.entities.get(&triple.object)?,
        ])
    }

    fn score_ids(&self, [subject, relation, object]: Ids) -> f32 {
        self.config.kind().score(
            self.entity_embeddings.row(subject),
            self.relation_embeddings.row(relation),
            self.entity_embeddings.row(object),
        )
    }

    /// Moves the embeddings of a triple along the gradients of its score.
    fn ascend(&mut self, [subject, relation, object]: Ids, rate: f32) {
        let [subject_gradient, relation_gradient, object_gradient] =
            self.config.kind().gradients(
                self.entity_embeddings.row(subject),
                self.relation_embeddings.row(relation),
                self.entity_embeddings.row(object),
            );
        self.entity_embeddings
            .row_mut(subject)
            .scaled_add(rate, &*subject_gradient);
        self.relation_embeddings
            .row_mut(relation)
            .scaled_add(rate, &*relation_gradient);
        self.entity_embeddings
            .row_mut(object)
            .scaled_add(rate, &*object_gradient);
    }

    /// Takes a gradient step on the margin loss of a known triple and its corruption.
    fn step(&mut self, positive: Ids, negative: Ids) -> f32 {
        let loss =
            (self.config.margin() - self.score_ids(positive) + self.score_ids(negative)).max(0.);
        if loss > 0. {
            let rate = self.config.learning_rate();
            self.ascend(positive, rate);
            self.ascend(negative, -rate);
        }

        loss
    }
}

/// Replaces either the subject or the object by a random entity.
///
/// Returns `None` if the drawn entity is the replaced one.
fn corrupt([subject, relation, object]: Ids, entities: usize, rng: &mut impl Rng) -> Option<Ids> {
    let entity = rng.gen_range(0..entities);
    if rng.gen_bool(0.5) {
        (entity != subject).then_some([entity, relation, object])
    } else {
        (entity != object).then_some([subject, relation, entity])
    }
}

fn index<'a>(labels: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, usize> {
    labels
        .into_iter()
        .enumerate()
        .map(|(index, label)| (label.to_string(), index))
        .collect()
}

impl Fit for Model {
    type Error = FitError;

    #[instrument(skip_all, fields(kind = %self.config.kind(), triples = triples.len()))]
    fn fit(&mut self, triples: &Triples) -> Result<(), Self::Error> {
        self.config.validate()?;
        if triples.is_empty() {
            return Err(FitError::EmptyGraph);
        }

        self.fitted = false;
        self.entities = index(triples.entities());
        self.relations = index(triples.relations());
        let mut positives = triples
            .iter()
            .filter_map(|triple| self.ids(triple))
            .collect_vec();

        let mut rng = StdRng::seed_from_u64(self.config.seed());
        let embedding_size = self.embedding_size();
        self.entity_embeddings = Embedding2::random(self.entities.len(), embedding_size, &mut rng);
        self.relation_embeddings =
            Embedding2::random(self.relations.len(), embedding_size, &mut rng);

        let batch_size = (positives.len() - 1) / self.config.batches_count() + 1;
        for epoch in 0..self.config.epochs() {
            positives.shuffle(&mut rng);
            let mut loss = 0.;
            for batch in positives.chunks(batch_size) {
                for &positive in batch {
                    for _ in 0..self.config.negatives() {
                        if let Some(negative) = corrupt(positive, self.entities.len(), &mut rng) {
                            loss += self.step(positive, negative);
                        }
                    }
                }
                self.entity_embeddings
                    .normalize_rows()
                    .map_err(|_| FitError::Diverged(epoch))?;
            }
            if !loss.is_finite() {
                return Err(FitError::Diverged(epoch));
            }
            debug!(epoch, loss, "fitted epoch");
        }
        self.fitted = true;

        Ok(())
    }
}

impl EmbeddingModel for Model {
    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn entity_embedding(&self, entity: &str) -> Option<ArrayView1<'_, f32>> {
        self.entities
            .get(entity)
            .map(|&index| self.entity_embeddings.row(index))
    }

    fn relation_embedding(&self, relation: &str) -> Option<ArrayView1<'_, f32>> {
        self.relations
            .get(relation)
            .map(|&index| self.relation_embeddings.row(index))
    }

    fn score(&self, triple: &Triple) -> Option<f32> {
        self.ids(triple).map(|ids| self.score_ids(ids))
    }
}
