//! End-to-end tests for the projection and permutation wrappers.

use vantage::object::Dataset;
use vantage::params::AnyParams;
use vantage::projection::permutation::{binarize, PivotSet};
use vantage::space::{encode_query, L2Space};
use vantage::surrogate::{BinaryPermutationVpTree, PermutationVpTree, ProjectionVpTree};
use vantage::IndexError;

fn six_points() -> Dataset {
    let space = L2Space;
    let points = [
        [0.0f32, 0.0], // A = 0
        [1.0, 0.0],    // B = 1
        [0.0, 1.0],    // C = 2
        [5.0, 5.0],    // D = 3
        [5.0, 6.0],    // E = 4
        [6.0, 5.0],    // F = 5
    ];
    points
        .iter()
        .enumerate()
        .map(|(i, v)| space.create_obj_from_vector(i as u32, -1, v))
        .collect()
}

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

// =============================================================================
// Binarized permutations on the six-point fixture
// =============================================================================

#[test]
fn fixed_pivot_binarization_matches_hand_computation() {
    // Pivots A, D, C, F with threshold 2. From the query (0.1, 0.1) the
    // distance order is A < C < D < F, so pivot ranks are [0, 2, 1, 3] and
    // the packed bits keep pivots 0 (A) and 2 (C).
    let pivots = PivotSet::from_payloads(vec![
        encode_query(&[0.0, 0.0]), // A
        encode_query(&[5.0, 5.0]), // D
        encode_query(&[0.0, 1.0]), // C
        encode_query(&[6.0, 5.0]), // F
    ])
    .unwrap();

    let ranks = pivots.permutation(&L2Space, &encode_query(&[0.1, 0.1]));
    assert_eq!(ranks.as_slice(), &[0, 2, 1, 3]);
    assert_eq!(binarize(&ranks, 2), vec![0b0101]);

    // A itself orders the pivots the same way, so its bits coincide and A is
    // the query's nearest surrogate neighbor at Hamming distance zero.
    let ranks_a = pivots.permutation(&L2Space, &encode_query(&[0.0, 0.0]));
    assert_eq!(binarize(&ranks_a, 2), vec![0b0101]);
}

#[test]
fn binary_permutation_wrapper_reranks_a_to_the_top() {
    let params = AnyParams::new(&[
        ("numPivot", "4"),
        ("binThreshold", "2"),
        ("dbScanFrac", "1.0"),
        ("bucketSize", "1"),
        ("seed", "5"),
    ]);
    let index = BinaryPermutationVpTree::build(L2Space, six_points(), &params).unwrap();
    let results = index.knn_query(&encode_query(&[0.1, 0.1]), 1, 0.0).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].1, 0, "re-ranked top-1 must be A");
    assert!((results[0].0 - 0.141).abs() < 0.01);
}

// =============================================================================
// Recall with a full scan budget
// =============================================================================

#[test]
fn wrappers_with_full_scan_budget_recover_the_exact_answer() {
    let data = gaussian_cloud(200, 6, 1);
    let q = encode_query(&[0.1; 6]);
    let exact = vantage::tune::exact_knn(&L2Space, &data, &q, 5);
    let exact_ids: std::collections::HashSet<u32> = exact.iter().map(|&(_, id)| id).collect();

    // dbScanFrac = 1.0 scans every candidate, so re-ranking restores the
    // exact answer no matter how lossy the surrogate was.
    let proj = ProjectionVpTree::build(
        L2Space,
        data.clone(),
        &AnyParams::new(&[
            ("projType", "rand"),
            ("projDim", "4"),
            ("dbScanFrac", "1.0"),
            ("seed", "2"),
        ]),
    )
    .unwrap();
    let perm = PermutationVpTree::build(
        L2Space,
        data.clone(),
        &AnyParams::new(&[("numPivot", "16"), ("dbScanFrac", "1.0"), ("seed", "2")]),
    )
    .unwrap();

    for results in [
        proj.knn_query(&q, 5, 0.0).unwrap(),
        perm.knn_query(&q, 5, 0.0).unwrap(),
    ] {
        let ids: std::collections::HashSet<u32> = results.iter().map(|&(_, id)| id).collect();
        assert_eq!(ids, exact_ids);
        assert!(results.windows(2).all(|w| w[0].0 <= w[1].0));
    }
}

#[test]
fn projection_kinds_all_build_and_answer() {
    let data = gaussian_cloud(150, 8, 3);
    let q = encode_query(&[0.0; 8]);
    for proj_type in ["rand", "rand_sparse", "pca", "fastmap", "perm"] {
        let index = ProjectionVpTree::build(
            L2Space,
            data.clone(),
            &AnyParams::new(&[
                ("projType", proj_type),
                ("projDim", "4"),
                ("knnAmp", "10"),
                ("seed", "4"),
            ]),
        )
        .unwrap_or_else(|e| panic!("{proj_type}: {e}"));
        let results = index.knn_query(&q, 3, 0.0).unwrap();
        assert_eq!(results.len(), 3, "{proj_type} returned a short answer");
        let ids: std::collections::HashSet<u32> = results.iter().map(|&(_, id)| id).collect();
        assert_eq!(ids.len(), 3, "{proj_type} returned duplicates");
    }
}

#[test]
fn range_query_respects_the_radius() {
    let index = PermutationVpTree::build(
        L2Space,
        six_points(),
        &AnyParams::new(&[("numPivot", "4"), ("dbScanFrac", "1.0"), ("seed", "6")]),
    )
    .unwrap();
    let mut results = index.range_query(&encode_query(&[0.0, 0.0]), 1.0).unwrap();
    results.sort_by(|a, b| a.1.cmp(&b.1));
    let ids: Vec<u32> = results.iter().map(|&(_, id)| id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

// =============================================================================
// Configuration errors
// =============================================================================

#[test]
fn both_budget_keys_is_invalid() {
    let result = ProjectionVpTree::build(
        L2Space,
        six_points(),
        &AnyParams::new(&[
            ("projType", "rand"),
            ("projDim", "2"),
            ("dbScanFrac", "0.5"),
            ("knnAmp", "2"),
        ]),
    );
    assert!(matches!(result, Err(IndexError::InvalidConfiguration(_))));
}

#[test]
fn non_dense_projection_space_is_invalid() {
    let result = ProjectionVpTree::build(
        L2Space,
        six_points(),
        &AnyParams::new(&[
            ("projType", "rand"),
            ("projDim", "2"),
            ("knnAmp", "2"),
            ("projSpaceType", "bit_hamming"),
        ]),
    );
    assert!(matches!(result, Err(IndexError::InvalidConfiguration(_))));
}

#[test]
fn perm_bin_is_not_a_dense_projection() {
    let result = ProjectionVpTree::build(
        L2Space,
        six_points(),
        &AnyParams::new(&[("projType", "perm_bin"), ("projDim", "2"), ("knnAmp", "2")]),
    );
    assert!(matches!(result, Err(IndexError::InvalidConfiguration(_))));
}

#[test]
fn range_without_db_scan_frac_is_rejected() {
    let index = PermutationVpTree::build(
        L2Space,
        six_points(),
        &AnyParams::new(&[("numPivot", "4"), ("knnAmp", "3"), ("seed", "1")]),
    )
    .unwrap();
    assert!(index.range_query(&encode_query(&[0.0, 0.0]), 1.0).is_err());
}

#[test]
fn unknown_wrapper_parameter_is_reported() {
    let result = PermutationVpTree::build(
        L2Space,
        six_points(),
        &AnyParams::new(&[("numPivots", "4"), ("dbScanFrac", "0.5")]),
    );
    assert!(matches!(result, Err(IndexError::UnknownParameter(_))));
}

#[test]
fn query_time_params_can_switch_the_budget() {
    let mut index = PermutationVpTree::build(
        L2Space,
        six_points(),
        &AnyParams::new(&[("numPivot", "4"), ("knnAmp", "1"), ("seed", "2")]),
    )
    .unwrap();
    // Range queries need dbScanFrac; switch over at query time.
    assert!(index.range_query(&encode_query(&[0.0, 0.0]), 1.0).is_err());
    index
        .set_query_time_params(&AnyParams::new(&[("dbScanFrac", "1.0")]))
        .unwrap();
    assert_eq!(
        index
            .range_query(&encode_query(&[0.0, 0.0]), 1.0)
            .unwrap()
            .len(),
        3
    );
}
