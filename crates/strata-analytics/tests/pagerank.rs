//! PageRank behaviour on small known graphs, against a sequential
//! reference, and under randomized inputs.
//!
//! Set `STRATA_LOG=strata_analytics=trace` to see per-iteration residuals.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use strata_analytics::pagerank::{
    DistributionIssue, PageRankCache, PageRankError, PageRankOptions, Personalization, pagerank,
};
use strata_core::config::PageRankConfig;
use strata_core::error::{ErrorCode, GraphError};
use strata_core::graph::{Edge, Graph, Orientation};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("STRATA_LOG"))
        .with_test_writer()
        .try_init();
}

fn transposed(n: usize, edges: &[(u32, u32)]) -> Graph {
    let edges: Vec<Edge> = edges.iter().map(|&(s, d)| Edge::unit(s, d)).collect();
    Graph::from_edges(n, &edges, false, Orientation::Transposed).unwrap()
}

fn star(leaves: u32) -> Graph {
    let edges: Vec<(u32, u32)> = (1..=leaves).map(|leaf| (leaf, 0)).collect();
    transposed(leaves as usize + 1, &edges)
}

fn random_graph(rng: &mut StdRng, n: usize, m: usize) -> Graph {
    let v = u32::try_from(n).unwrap();
    let edges: Vec<Edge> = (0..m)
        .map(|_| Edge::new(rng.gen_range(0..v), rng.gen_range(0..v), rng.gen_range(0.1..5.0)))
        .collect();
    Graph::from_edges(n, &edges, true, Orientation::Transposed).unwrap()
}

fn defaults() -> PageRankConfig {
    PageRankConfig::default()
}

/// Straightforward sequential power iteration over a transposed graph.
fn reference_pagerank(graph: &Graph, config: &PageRankConfig) -> Vec<f64> {
    let n = graph.vertex_count();
    let mut out_weight = vec![0.0; n];
    for (_, source, w) in graph.entries() {
        out_weight[source as usize] += w;
    }
    let mut old = vec![1.0 / n as f64; n];
    for _ in 0..config.max_iterations {
        let dangling: f64 = (0..n).filter(|&u| out_weight[u] == 0.0).map(|u| old[u]).sum();
        let base = (config.alpha * dangling + (1.0 - config.alpha)) / n as f64;
        let mut new = vec![0.0; n];
        for (v, slot) in new.iter_mut().enumerate() {
            let mut incoming = 0.0;
            for e in graph.edge_range(v) {
                let u = graph.indices()[e] as usize;
                incoming += old[u] * graph.weight(e) / out_weight[u];
            }
            *slot = config.alpha * incoming + base;
        }
        let residual: f64 = new.iter().zip(&old).map(|(a, b)| (a - b).abs()).sum();
        old = new;
        if residual < n as f64 * config.epsilon {
            break;
        }
    }
    old
}

#[test]
fn four_cycle_is_uniform() {
    init_tracing();
    let g = transposed(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
    let result = pagerank(&g, &PageRankOptions::default(), &defaults()).unwrap();
    for r in &result.ranks {
        assert!((r - 0.25).abs() < 1e-6, "{:?}", result.ranks);
    }
}

#[test]
fn star_center_dominates_and_mass_is_kept() {
    init_tracing();
    let g = star(6);
    let result = pagerank(&g, &PageRankOptions::default(), &defaults()).unwrap();

    let total: f64 = result.ranks.iter().sum();
    assert!((total - 1.0).abs() < 7.0 * 1e-6);
    for leaf in 1..=6 {
        assert!(result.ranks[0] > result.ranks[leaf]);
    }
}

#[test]
fn forward_input_matches_transposed_input() {
    let mut rng = StdRng::seed_from_u64(11);
    let g = random_graph(&mut rng, 50, 300);
    let options = PageRankOptions::default();
    let from_transposed = pagerank(&g, &options, &defaults()).unwrap();
    let from_forward = pagerank(&g.transpose(), &options, &defaults()).unwrap();
    for (a, b) in from_transposed.ranks.iter().zip(&from_forward.ranks) {
        assert!((a - b).abs() < 1e-10);
    }
}

#[test]
fn agrees_with_sequential_reference() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..10 {
        let n = rng.gen_range(1..120);
        let m = rng.gen_range(0..600);
        let g = random_graph(&mut rng, n, m);
        let config = PageRankConfig {
            epsilon: 1e-10,
            max_iterations: 500,
            ..defaults()
        };
        let result = pagerank(&g, &PageRankOptions::default(), &config).unwrap();
        let expected = reference_pagerank(&g, &config);
        for (v, (got, want)) in result.ranks.iter().zip(&expected).enumerate() {
            assert!((got - want).abs() < 1e-7, "vertex {v}: {got} vs {want}");
        }
    }
}

#[test]
fn results_are_bit_identical_across_thread_counts() {
    let mut rng = StdRng::seed_from_u64(5);
    let g = random_graph(&mut rng, 20_000, 100_000);
    let run = |threads: usize| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap()
            .install(|| pagerank(&g, &PageRankOptions::default(), &defaults()).unwrap())
    };
    let single = run(1);
    let many = run(8);
    assert_eq!(single.iterations, many.iterations);
    let bits = |r: &[f64]| r.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&single.ranks), bits(&many.ranks));
}

#[test]
fn external_weights_override_graph_weights() {
    let weighted = Graph::from_edges(
        3,
        &[
            Edge::new(0, 1, 3.0),
            Edge::new(0, 2, 1.0),
            Edge::new(1, 0, 1.0),
            Edge::new(2, 0, 1.0),
        ],
        true,
        Orientation::Transposed,
    )
    .unwrap();
    let (offsets, indices, weights, orientation) = weighted.clone().into_parts();
    let plain = Graph::new(offsets, indices, None, orientation).unwrap();
    let weights = weights.unwrap();

    let expected = pagerank(&weighted, &PageRankOptions::default(), &defaults()).unwrap();
    let options = PageRankOptions {
        weights: Some(&weights),
        ..PageRankOptions::default()
    };
    let actual = pagerank(&plain, &options, &defaults()).unwrap();
    assert_eq!(actual, expected);
    assert!(actual.ranks[1] > actual.ranks[2]);
}

#[test]
fn wrong_weight_count_is_malformed() {
    let g = transposed(2, &[(0, 1)]);
    let options = PageRankOptions {
        weights: Some(&[1.0, 2.0][..]),
        ..PageRankOptions::default()
    };
    let err = pagerank(&g, &options, &defaults()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MalformedGraph);
}

#[test]
fn negative_external_weight_is_malformed() {
    let g = transposed(3, &[(0, 1), (0, 2), (1, 0), (2, 0)]);
    let options = PageRankOptions {
        weights: Some(&[2.0, -1.0, 1.0, 1.0][..]),
        ..PageRankOptions::default()
    };
    let err = pagerank(&g, &options, &defaults()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MalformedGraph);
    assert!(matches!(
        err,
        PageRankError::Graph(GraphError::InvalidWeight { weight, .. }) if weight < 0.0
    ));

    let options = PageRankOptions {
        weights: Some(&[1.0, f64::NAN, 1.0, 1.0][..]),
        ..PageRankOptions::default()
    };
    let err = pagerank(&g, &options, &defaults()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MalformedGraph);
}

#[test]
fn negative_weight_never_reaches_the_iteration() {
    let edges = [Edge::new(0, 1, -1.0)];
    assert!(Graph::from_edges(2, &edges, true, Orientation::Transposed).is_err());

    // Valid weights keep the ranks a non-negative distribution.
    let edges = [
        Edge::new(0, 1, 2.0),
        Edge::new(0, 2, 0.0),
        Edge::new(1, 0, 1.0),
        Edge::new(2, 0, 1.0),
    ];
    let g = Graph::from_edges(3, &edges, true, Orientation::Transposed).unwrap();
    let result = pagerank(&g, &PageRankOptions::default(), &defaults()).unwrap();
    assert!(result.ranks.iter().all(|&r| r >= 0.0));
    assert!((result.ranks.iter().sum::<f64>() - 1.0).abs() < 1e-6);
}

#[test]
fn personalization_focuses_teleport_mass() {
    // 0 → 1 → 2, 2 dangling, 3 isolated.
    let g = transposed(4, &[(0, 1), (1, 2)]);
    let p = Personalization::new(vec![0], vec![5.0]).unwrap();
    let options = PageRankOptions {
        personalization: Some(&p),
        ..PageRankOptions::default()
    };
    let personalized = pagerank(&g, &options, &defaults()).unwrap();
    let uniform = pagerank(&g, &PageRankOptions::default(), &defaults()).unwrap();

    let total: f64 = personalized.ranks.iter().sum();
    assert!((total - 1.0).abs() < 4.0 * 1e-6);
    assert!(personalized.ranks[3].abs() < f64::EPSILON);
    assert!(personalized.ranks[0] > uniform.ranks[0]);
}

#[test]
fn invalid_personalization_is_rejected() {
    let g = transposed(3, &[(0, 1)]);
    let cases = [
        (
            Personalization::new(vec![0, 7], vec![1.0, 1.0]).unwrap(),
            DistributionIssue::VertexOutOfRange {
                vertex: 7,
                vertex_count: 3,
            },
        ),
        (
            Personalization::new(vec![0, 1], vec![0.0, 0.0]).unwrap(),
            DistributionIssue::NonPositiveSum(0.0),
        ),
    ];
    for (p, issue) in cases {
        let options = PageRankOptions {
            personalization: Some(&p),
            ..PageRankOptions::default()
        };
        let err = pagerank(&g, &options, &defaults()).unwrap_err();
        assert_eq!(err, PageRankError::InvalidPersonalization(issue));
        assert_eq!(err.code(), ErrorCode::InvalidPersonalization);
    }
}

#[test]
fn invalid_initial_guess_is_rejected() {
    let g = transposed(3, &[(0, 1)]);
    for guess in [&[1.0, 1.0][..], &[0.0, 0.0, 0.0][..], &[1.0, -2.0, 3.0][..]] {
        let options = PageRankOptions {
            initial_guess: Some(guess),
            ..PageRankOptions::default()
        };
        let err = pagerank(&g, &options, &defaults()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInitialGuess, "{guess:?}");
    }
}

#[test]
fn invalid_parameters_are_rejected_before_iterating() {
    let g = transposed(2, &[(0, 1)]);
    let config = PageRankConfig {
        alpha: 1.0,
        ..defaults()
    };
    let err = pagerank(&g, &PageRankOptions::default(), &config).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParameter);
}

#[test]
fn exhausted_budget_is_an_error() {
    let config = PageRankConfig {
        max_iterations: 2,
        ..defaults()
    };
    let err = pagerank(&star(10), &PageRankOptions::default(), &config).unwrap_err();
    match err {
        PageRankError::NonConvergence {
            iterations,
            residual,
            threshold,
        } => {
            assert_eq!(iterations, 2);
            assert!(residual >= threshold);
        }
        other => panic!("expected NonConvergence, got {other:?}"),
    }
}

#[test]
fn warm_start_from_cache_converges_immediately() {
    let mut rng = StdRng::seed_from_u64(77);
    let g = random_graph(&mut rng, 200, 1_000);
    let cold = pagerank(&g, &PageRankOptions::default(), &defaults()).unwrap();
    let cache = PageRankCache::from_result(&cold, &g);
    assert!(cache.is_valid_for(&g));

    let options = PageRankOptions {
        initial_guess: cache.warm_start(&g),
        ..PageRankOptions::default()
    };
    let warm = pagerank(&g, &options, &defaults()).unwrap();
    assert_eq!(warm.iterations, 1);
    assert!(cold.iterations > 1);
}

fn arb_graph() -> impl Strategy<Value = (usize, Vec<(u32, u32, f64)>)> {
    (1_usize..40).prop_flat_map(|n| {
        let v = u32::try_from(n).unwrap();
        (
            Just(n),
            prop::collection::vec((0..v, 0..v, 0.01_f64..10.0), 0..150),
        )
    })
}

proptest! {
    #[test]
    fn mass_is_conserved((n, raw) in arb_graph(), alpha in 0.05_f64..0.95) {
        let edges: Vec<Edge> = raw.iter().map(|&(s, d, w)| Edge::new(s, d, w)).collect();
        let g = Graph::from_edges(n, &edges, true, Orientation::Transposed).unwrap();
        let config = PageRankConfig { alpha, epsilon: 1e-6, max_iterations: 1_000 };
        let result = pagerank(&g, &PageRankOptions::default(), &config).unwrap();

        let total: f64 = result.ranks.iter().sum();
        prop_assert!((total - 1.0).abs() < n as f64 * 1e-6);
        prop_assert!(result.ranks.iter().all(|&r| r >= 0.0));
    }

    #[test]
    fn reruns_are_identical((n, raw) in arb_graph()) {
        let edges: Vec<Edge> = raw.iter().map(|&(s, d, w)| Edge::new(s, d, w)).collect();
        let g = Graph::from_edges(n, &edges, true, Orientation::Transposed).unwrap();
        let a = pagerank(&g, &PageRankOptions::default(), &defaults()).unwrap();
        let b = pagerank(&g, &PageRankOptions::default(), &defaults()).unwrap();
        prop_assert_eq!(a, b);
    }
}
