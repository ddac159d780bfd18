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

use itertools::Itertools;
use xayn_kg_discovery::{
    generate_candidates,
    Bias,
    CandidatesConfig,
    Strategy,
    Triples,
    ValidationError,
};
use xayn_kg_integration_tests::{disjoint_graph, graph, run_with_test_logger, Panic};

fn config(strategy: Strategy, max_candidates: usize, consolidate_sides: bool) -> CandidatesConfig {
    CandidatesConfig::default()
        .with_strategy(strategy)
        .with_max_candidates(max_candidates)
        .unwrap()
        .with_consolidate_sides(consolidate_sides)
        .with_seed(1916)
}

fn assert_novel(batch: &Triples, known: &Triples) {
    assert_eq!(batch.difference(known), *batch);
    assert!(batch.iter().all(|triple| triple.relation == "y"));
    assert!(batch.iter().all(|triple| !triple.is_self_loop()));
}

#[test]
fn test_exhaustive() -> Result<(), Panic> {
    run_with_test_logger("test_exhaustive", || {
        let known = disjoint_graph();

        let batch = generate_candidates(&known, "y", &config(Strategy::Exhaustive, 100, false))?
            .next()
            .unwrap();
        assert_eq!(batch.to_array().shape(), [7, 3]);
        assert_novel(&batch, &known);

        let mut candidates =
            generate_candidates(&known, "y", &config(Strategy::Exhaustive, 100, true))?;
        for subject in ["a", "b"] {
            let batch = candidates.next().unwrap();
            assert_eq!(batch.to_array().shape(), [14, 3]);
            assert!(batch.iter().all(|triple| triple.subject == subject));
            assert_novel(&batch, &known);
        }

        Ok(())
    })
}

#[test]
fn test_random_uniform() -> Result<(), Panic> {
    let known = disjoint_graph();
    let subjects = known.subjects();
    let objects = known.objects();

    for batch in generate_candidates(&known, "y", &config(Strategy::RandomUniform, 4, false))?
        .take(10)
    {
        assert!(batch.len() <= 4);
        assert_novel(&batch, &known);
        for triple in &batch {
            assert!(subjects.contains(triple.subject.as_str()));
            assert!(objects.contains(triple.object.as_str()));
        }
    }

    let batches = generate_candidates(&known, "y", &config(Strategy::RandomUniform, 4, true))?
        .take(10)
        .collect_vec();
    assert!(batches
        .iter()
        .flat_map(|batch| batch.iter())
        .any(|triple| objects.contains(triple.subject.as_str())));

    Ok(())
}

#[test]
fn test_structural_strategies() -> Result<(), Panic> {
    let known = graph();
    let strategies = [
        Strategy::EntityFrequency,
        Strategy::GraphDegree,
        Strategy::ClusterCoefficient,
        Strategy::ClusterTriangles,
        Strategy::ClusterSquares,
    ];

    for strategy in strategies {
        for bias in [Bias::High, Bias::Low] {
            for consolidate_sides in [false, true] {
                let config = config(strategy, 5, consolidate_sides).with_bias(bias);
                for batch in generate_candidates(&known, "y", &config)?.take(5) {
                    assert!(batch.len() <= 5);
                    assert_novel(&batch, &known);
                }
            }
        }
    }

    Ok(())
}

#[test]
fn test_strategy_from_name() {
    assert_eq!("graph_degree".parse(), Ok(Strategy::GraphDegree));
    assert_eq!(
        "error".parse::<Strategy>(),
        Err(ValidationError::UnknownStrategy("error".into())),
    );
    assert_eq!(
        Strategy::ALL
            .iter()
            .map(|strategy| strategy.to_string().parse::<Strategy>())
            .collect::<Result<Vec<_>, _>>(),
        Ok(Strategy::ALL.to_vec()),
    );
}
