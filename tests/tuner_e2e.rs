//! End-to-end tests for the pruner auto-tuner.

use vantage::object::Dataset;
use vantage::params::AnyParams;
use vantage::space::L2Space;
use vantage::tune::{bootstrap_queries, exact_knn, recall, tune, TuneParams};
use vantage::vptree::VpTree;
use vantage::IndexError;

fn gaussian_cloud(n: usize, dim: usize, seed: u64) -> Dataset {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    let space = L2Space;
    (0..n)
        .map(|i| {
            let v: Vec<f32> = (0..dim)
                .map(|_| {
                    let u1: f32 = rng.random::<f32>().max(1e-9);
                    let u2: f32 = rng.random();
                    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
                })
                .collect();
            space.create_obj_from_vector(i as u32, -1, &v)
        })
        .collect()
}

fn small_budget(mut tp: TuneParams) -> TuneParams {
    tp.max_rec_depth = 3;
    tp.max_iter = 3;
    tp.add_restart_qty = 1;
    tp
}

// =============================================================================
// Reaching a recall target
// =============================================================================

#[test]
fn tuned_parameters_reach_the_target_recall_when_applied() {
    let mut data = gaussian_cloud(1000, 8, 42);
    let queries = bootstrap_queries(&mut data, 25, 42).unwrap();

    let mut index = VpTree::build(
        L2Space,
        data.clone(),
        &AnyParams::new(&[("bucketSize", "10"), ("seed", "42")]),
    )
    .unwrap();

    let tp = small_budget(TuneParams::for_knn(10, 0.9));
    let tuned = tune(&mut index, &L2Space, &queries, &tp).expect("tuning failed");
    assert!(tuned.recall >= 0.9);

    // Applying the winning parameter string to a fresh index must reproduce
    // the measured recall on the same held-out queries.
    let mut fresh = VpTree::build(
        L2Space,
        data.clone(),
        &AnyParams::new(&[("bucketSize", "10"), ("seed", "42")]),
    )
    .unwrap();
    fresh
        .set_query_time_params(&AnyParams::parse(&tuned.to_param_string()).unwrap())
        .unwrap();

    let mut recall_sum = 0.0f32;
    for q in &queries {
        let exact: Vec<u32> = exact_knn(&L2Space, &data, q, 10)
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        let approx = fresh.knn_query(q, 10, 0.0).unwrap();
        recall_sum += recall(&approx, &exact);
    }
    let measured = recall_sum / queries.len() as f32;
    assert!(
        measured >= 0.9,
        "applied parameters measured recall {measured}"
    );
}

#[test]
fn tuning_is_reproducible_for_a_fixed_seed() {
    let mut data = gaussian_cloud(300, 4, 7);
    let queries = bootstrap_queries(&mut data, 10, 7).unwrap();

    let run = |data: &Dataset, queries: &[Vec<u8>]| {
        let mut index = VpTree::build(
            L2Space,
            data.clone(),
            &AnyParams::new(&[("bucketSize", "8"), ("seed", "7")]),
        )
        .unwrap();
        let mut tp = small_budget(TuneParams::for_knn(5, 0.8));
        tp.seed = 11;
        tune(&mut index, &L2Space, queries, &tp).unwrap()
    };

    let first = run(&data, &queries);
    let second = run(&data, &queries);
    assert_eq!(first, second);
}

#[test]
fn range_tuning_also_works() {
    let mut data = gaussian_cloud(400, 4, 9);
    let queries = bootstrap_queries(&mut data, 10, 9).unwrap();

    let mut index = VpTree::build(
        L2Space,
        data,
        &AnyParams::new(&[("bucketSize", "8"), ("seed", "9")]),
    )
    .unwrap();
    let tp = small_budget(TuneParams::for_range(1.0, 0.8));
    let tuned = tune(&mut index, &L2Space, &queries, &tp).unwrap();
    assert!(tuned.recall >= 0.8);
}

// =============================================================================
// Failure reporting
// =============================================================================

#[test]
fn impossible_target_reports_tuning_failed_with_best_params() {
    use vantage::surrogate::BinaryPermutationVpTree;

    let mut data = gaussian_cloud(500, 6, 3);
    let queries = bootstrap_queries(&mut data, 10, 3).unwrap();

    // One surrogate candidate per query cannot reach recall 0.95 at k = 10.
    let mut index = BinaryPermutationVpTree::build(
        L2Space,
        data,
        &AnyParams::new(&[
            ("numPivot", "16"),
            ("binThreshold", "8"),
            ("dbScanFrac", "0.002"),
            ("bucketSize", "8"),
            ("seed", "3"),
        ]),
    )
    .unwrap();

    let tp = small_budget(TuneParams::for_knn(10, 0.95));
    match tune(&mut index, &L2Space, &queries, &tp) {
        Err(IndexError::TuningFailed { best }) => {
            assert!(best.recall < 0.95);
            assert!(best.alpha_left > 0.0 && best.alpha_right > 0.0);
        }
        other => panic!("expected TuningFailed, got {other:?}"),
    }
}

// =============================================================================
// Output file
// =============================================================================

#[test]
fn winning_parameters_are_written_as_a_loadable_string() {
    let mut data = gaussian_cloud(200, 4, 5);
    let queries = bootstrap_queries(&mut data, 8, 5).unwrap();

    let mut index = VpTree::build(
        L2Space,
        data,
        &AnyParams::new(&[("bucketSize", "8"), ("seed", "5")]),
    )
    .unwrap();
    let tp = small_budget(TuneParams::for_knn(5, 0.8));
    let tuned = tune(&mut index, &L2Space, &queries, &tp).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tuned_params.txt");
    tuned.write_to_file(&path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let parsed = AnyParams::parse(contents.trim()).unwrap();
    assert_eq!(parsed, tuned.to_params());
}

// =============================================================================
// Parameter-map construction
// =============================================================================

#[test]
fn tune_params_parse_from_a_string_map() {
    let params = AnyParams::new(&[
        ("desiredRecall", "0.85"),
        ("tuneK", "7"),
        ("metric", "time"),
        ("minExp", "1"),
        ("maxExp", "2"),
        ("maxIter", "4"),
        ("maxRecDepth", "3"),
        ("stepN", "1"),
        ("addRestartQty", "0"),
        ("fullFactor", "4.0"),
        ("maxCacheGSQty", "50"),
        ("seed", "123"),
    ]);
    let tp = TuneParams::from_params(&params).unwrap();
    assert_eq!(tp.desired_recall, 0.85);
    assert_eq!(tp.max_exp, 2);
    assert_eq!(tp.seed, 123);
    assert_eq!(tp.metric, vantage::tune::OptimMetric::Time);
}
