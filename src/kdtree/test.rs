use std::collections::BTreeSet;

use geo_traits::CoordTrait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::distance::{CityBlock, DistanceMetric, Euclidean, SquaredEuclidean};
use crate::error::KdError;
use crate::kdtree::{KdTree, DEFAULT_BUCKET_SIZE};

fn points() -> Vec<[f64; 2]> {
    let coords: Vec<[i32; 2]> = vec![
        [54, 1],
        [97, 21],
        [65, 35],
        [33, 54],
        [95, 39],
        [54, 3],
        [53, 54],
        [84, 72],
        [33, 34],
        [43, 15],
        [52, 83],
        [81, 23],
        [1, 61],
        [38, 74],
        [11, 91],
        [24, 56],
        [90, 31],
        [25, 57],
        [46, 61],
        [29, 69],
        [49, 60],
        [4, 98],
        [71, 15],
        [60, 25],
        [38, 84],
        [52, 38],
        [94, 51],
        [13, 25],
        [77, 73],
        [88, 87],
        [6, 27],
        [58, 22],
        [53, 28],
        [27, 91],
        [96, 98],
        [93, 14],
        [22, 93],
        [45, 94],
        [18, 28],
        [35, 15],
        [19, 81],
        [20, 81],
        [67, 53],
        [43, 3],
        [47, 66],
        [48, 34],
        [46, 12],
        [32, 38],
        [43, 12],
        [39, 94],
        [88, 62],
        [66, 14],
        [84, 30],
        [72, 81],
        [41, 92],
        [26, 4],
        [6, 76],
        [47, 21],
        [57, 70],
        [71, 82],
        [50, 68],
        [96, 18],
        [40, 31],
        [78, 53],
        [71, 90],
        [32, 14],
        [55, 6],
        [32, 88],
        [62, 32],
        [21, 67],
        [73, 81],
        [44, 64],
        [29, 50],
        [70, 5],
        [6, 22],
        [68, 3],
        [11, 23],
        [20, 42],
        [21, 73],
        [63, 86],
        [9, 40],
        [99, 2],
        [99, 76],
        [56, 77],
        [83, 6],
        [21, 72],
        [78, 30],
        [75, 53],
        [41, 11],
        [95, 20],
        [30, 38],
        [96, 82],
        [65, 48],
        [33, 18],
        [87, 28],
        [10, 10],
        [40, 34],
        [10, 20],
        [47, 29],
        [46, 78],
    ];

    coords
        .into_iter()
        .map(|[x, y]| [x.into(), y.into()])
        .collect()
}

fn make_index(bucket_size: usize) -> KdTree<f64, usize> {
    let mut tree = KdTree::new();
    for (i, p) in points().into_iter().enumerate() {
        tree.add(p.to_vec(), i).unwrap();
    }
    tree.build(bucket_size).unwrap();
    tree
}

fn random_tree<M: DistanceMetric<f64>>(
    rng: &mut StdRng,
    metric: M,
    n: usize,
    dims: usize,
    bucket_size: usize,
) -> (KdTree<f64, usize, M>, Vec<Vec<f64>>) {
    let points: Vec<Vec<f64>> = (0..n)
        .map(|_| (0..dims).map(|_| rng.gen_range(-100.0..100.0)).collect())
        .collect();
    let mut tree = KdTree::with_metric(metric);
    for (i, p) in points.iter().enumerate() {
        tree.add(p.clone(), i).unwrap();
    }
    tree.build(bucket_size).unwrap();
    (tree, points)
}

fn brute_force_distances<M: DistanceMetric<f64>>(
    metric: &M,
    points: &[Vec<f64>],
    key: &[f64],
    k: usize,
) -> Vec<f64> {
    let mut d: Vec<f64> = points.iter().map(|p| metric.distance(key, p)).collect();
    d.sort_by(|a, b| a.total_cmp(b));
    d.truncate(k);
    d
}

fn ids<'a>(elements: impl IntoIterator<Item = &'a usize>) -> BTreeSet<usize> {
    elements.into_iter().copied().collect()
}

#[test]
fn small_scenario() {
    let mut tree = KdTree::new();
    tree.add(vec![0.0, 0.0], 'A').unwrap();
    tree.add(vec![1.0, 0.0], 'B').unwrap();
    tree.add(vec![0.0, 1.0], 'C').unwrap();
    tree.add(vec![5.0, 5.0], 'D').unwrap();
    assert_eq!(tree.num_added_elements(), 4);
    assert_eq!(tree.size(), 0);

    tree.build(1).unwrap();
    assert_eq!(tree.num_added_elements(), 0);
    assert_eq!(tree.size(), 4);
    assert_eq!(tree.num_leaves(), 4);

    let nearest = tree.search_nearest(&[0.0, 0.0]).unwrap();
    assert_eq!(*nearest.data(), 'A');
    assert_eq!(nearest.distance, 0.0);

    let two = tree.search_k_nearest(2, &[0.0, 0.0]).unwrap();
    assert_eq!(*two[0].data(), 'A');
    assert_eq!(two[0].distance, 0.0);
    assert!(matches!(*two[1].data(), 'B' | 'C'));
    assert_eq!(two[1].distance, 1.0);

    let in_range: BTreeSet<char> = tree
        .search_range(&[0.0, 0.0], &[1.0, 1.0])
        .into_iter()
        .map(|e| e.data)
        .collect();
    assert_eq!(in_range, BTreeSet::from(['A', 'B', 'C']));

    let within: BTreeSet<char> = tree
        .search_within(&[0.0, 0.0], 1.5)
        .into_iter()
        .map(|e| e.data)
        .collect();
    assert_eq!(within, BTreeSet::from(['A', 'B', 'C']));

    let sorted = tree.search_within_sorted(&[5.0, 4.0], 1.0);
    assert_eq!(sorted.len(), 1);
    assert_eq!(*sorted[0].data(), 'D');
}

#[test]
fn round_trip_containment() {
    let mut rng = StdRng::seed_from_u64(1);
    let (tree, points) = random_tree(&mut rng, SquaredEuclidean, 300, 3, 4);
    for p in &points {
        let nearest = tree.search_nearest(p).unwrap();
        assert_eq!(nearest.distance, 0.0);
        assert_eq!(nearest.point(), p.as_slice());
    }
}

#[test]
fn k_nearest_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(2);
    for dims in 1..=8 {
        let n = rng.gen_range(50..=500);
        let bucket_size = rng.gen_range(1..=8);
        let (tree, points) = random_tree(&mut rng, SquaredEuclidean, n, dims, bucket_size);

        for _ in 0..20 {
            let key: Vec<f64> = (0..dims).map(|_| rng.gen_range(-120.0..120.0)).collect();
            let k = rng.gen_range(1..=10);
            let found: Vec<f64> = tree
                .search_k_nearest(k, &key)
                .unwrap()
                .iter()
                .map(|n| n.distance)
                .collect();
            assert_eq!(
                found,
                brute_force_distances(&SquaredEuclidean, &points, &key, k),
                "dims {dims}, n {n}, bucket {bucket_size}, k {k}"
            );

            let nearest = tree.search_nearest(&key).unwrap();
            assert_eq!(nearest.distance, found[0]);
        }
    }
}

#[test]
fn k_nearest_is_monotonic() {
    let mut rng = StdRng::seed_from_u64(3);
    let (tree, _) = random_tree(&mut rng, SquaredEuclidean, 200, 4, 3);
    let key = [1.0, -2.0, 3.0, 0.5];

    let mut previous: Vec<f64> = Vec::new();
    for k in 1..=25 {
        let found: Vec<f64> = tree
            .search_k_nearest(k, &key)
            .unwrap()
            .iter()
            .map(|n| n.distance)
            .collect();
        assert_eq!(found.len(), k);
        assert!(found.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(&found[..k - 1], previous.as_slice());
        previous = found;
    }
}

#[test]
fn other_metrics_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(4);
    let (euclidean, points) = random_tree(&mut rng, Euclidean, 250, 3, 2);
    let (city_block, city_points) = random_tree(&mut rng, CityBlock, 250, 5, 3);

    for _ in 0..30 {
        let key: Vec<f64> = (0..3).map(|_| rng.gen_range(-100.0..100.0)).collect();
        let found: Vec<f64> = euclidean
            .search_k_nearest(5, &key)
            .unwrap()
            .iter()
            .map(|n| n.distance)
            .collect();
        assert_eq!(found, brute_force_distances(&Euclidean, &points, &key, 5));

        let key: Vec<f64> = (0..5).map(|_| rng.gen_range(-100.0..100.0)).collect();
        let found: Vec<f64> = city_block
            .search_k_nearest(5, &key)
            .unwrap()
            .iter()
            .map(|n| n.distance)
            .collect();
        assert_eq!(found, brute_force_distances(&CityBlock, &city_points, &key, 5));
    }
}

#[test]
fn best_bin_first_returns_members() {
    let mut rng = StdRng::seed_from_u64(5);
    let (tree, points) = random_tree(&mut rng, SquaredEuclidean, 400, 4, 2);

    for emax in [0, 1, 3, 10] {
        let key: Vec<f64> = (0..4).map(|_| rng.gen_range(-100.0..100.0)).collect();
        let found = tree.search_best_bin_first(6, &key, emax).unwrap();
        assert_eq!(found.len(), 6);
        assert!(found.windows(2).all(|w| w[0].distance <= w[1].distance));

        let mut seen = BTreeSet::new();
        for n in &found {
            let id = *n.data();
            assert!(seen.insert(id), "duplicate result {id}");
            assert_eq!(n.point(), points[id].as_slice());
            assert_eq!(n.distance, SquaredEuclidean.distance(&key, &points[id]));
        }
    }
}

#[test]
fn best_bin_first_converges_to_exact() {
    let mut rng = StdRng::seed_from_u64(6);
    let (tree, _) = random_tree(&mut rng, SquaredEuclidean, 400, 3, 3);

    for _ in 0..30 {
        let key: Vec<f64> = (0..3).map(|_| rng.gen_range(-120.0..120.0)).collect();
        let exact: Vec<f64> = tree
            .search_k_nearest(8, &key)
            .unwrap()
            .iter()
            .map(|n| n.distance)
            .collect();
        let approx: Vec<f64> = tree
            .search_best_bin_first(8, &key, tree.num_leaves())
            .unwrap()
            .iter()
            .map(|n| n.distance)
            .collect();
        assert_eq!(approx, exact);
    }
}

#[test]
fn range_search() {
    let tree = make_index(10);

    let found = tree.search_range(&[20.0, 30.0], &[50.0, 70.0]);
    let expected = BTreeSet::from([
        60, 20, 45, 3, 17, 71, 44, 19, 18, 15, 69, 90, 62, 96, 47, 8, 77, 72,
    ]);
    assert_eq!(ids(found.iter().map(|e| e.data())), expected);
}

#[test]
fn range_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(7);
    let points = points();
    for bucket_size in [1, 3, 10] {
        let tree = make_index(bucket_size);
        for _ in 0..50 {
            let (x0, x1) = (rng.gen_range(0..100) as f64, rng.gen_range(0..100) as f64);
            let (y0, y1) = (rng.gen_range(0..100) as f64, rng.gen_range(0..100) as f64);
            let min = [x0.min(x1), y0.min(y1)];
            let max = [x0.max(x1), y0.max(y1)];

            let found = tree.search_range(&min, &max);
            let expected: BTreeSet<usize> = points
                .iter()
                .enumerate()
                .filter(|(_, p)| p[0] >= min[0] && p[0] <= max[0] && p[1] >= min[1] && p[1] <= max[1])
                .map(|(i, _)| i)
                .collect();
            assert_eq!(found.len(), expected.len());
            assert_eq!(ids(found.iter().map(|e| e.data())), expected);
        }
    }
}

#[test]
fn radius_search() {
    let tree = make_index(10);

    let found = tree.search_within(&[50.0, 50.0], 20.0 * 20.0);
    let expected = BTreeSet::from([60, 6, 25, 92, 42, 20, 45, 3, 71, 44, 18, 96]);
    assert_eq!(ids(found.iter().map(|e| e.data())), expected);

    let sorted = tree.search_within_sorted(&[50.0, 50.0], 20.0 * 20.0);
    assert_eq!(sorted.len(), expected.len());
    assert!(sorted.windows(2).all(|w| w[0].distance <= w[1].distance));

    let points = points();
    for (i, p) in points.iter().enumerate() {
        let d = SquaredEuclidean.distance(&[50.0, 50.0], p);
        assert_eq!(expected.contains(&i), d <= 400.0);
    }
}

#[test]
fn radius_boundary_is_inclusive() {
    let mut tree = KdTree::with_metric(Euclidean);
    for (i, x) in [0.0, 1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
        tree.add(vec![x, 0.0], i).unwrap();
    }
    tree.build(1).unwrap();

    let found = tree.search_within(&[2.0, 0.0], 1.0);
    assert_eq!(ids(found.iter().map(|e| e.data())), BTreeSet::from([1, 2, 3]));
}

#[test]
fn rebuild_keeps_elements() {
    let mut tree = make_index(4);
    let before: BTreeSet<(usize, [i64; 2])> = tree
        .pre_order()
        .flat_map(|node| node.bucket())
        .map(|e| (e.data, [e.point()[0] as i64, e.point()[1] as i64]))
        .collect();

    tree.rebuild(4).unwrap();
    assert_eq!(tree.size(), 100);
    let after: BTreeSet<(usize, [i64; 2])> = tree
        .pre_order()
        .flat_map(|node| node.bucket())
        .map(|e| (e.data, [e.point()[0] as i64, e.point()[1] as i64]))
        .collect();
    assert_eq!(before, after);
    assert_eq!(before.len(), 100);

    tree.add(vec![500.0, 500.0], 100).unwrap();
    tree.rebuild(2).unwrap();
    assert_eq!(tree.size(), 101);
    assert_eq!(tree.num_added_elements(), 0);
    assert_eq!(*tree.search_nearest_data(&[400.0, 400.0]).unwrap(), 100);
}

#[test]
fn build_replaces_previous_tree() {
    let mut tree = make_index(4);
    tree.add(vec![1.0, 1.0], 1000).unwrap();
    tree.build(4).unwrap();
    assert_eq!(tree.size(), 1);
    assert_eq!(*tree.search_nearest_data(&[50.0, 50.0]).unwrap(), 1000);
}

#[test]
fn balance_invariant() {
    let mut rng = StdRng::seed_from_u64(8);
    for n in [2usize, 7, 64, 1000, 1025] {
        let (tree, _) = random_tree(&mut rng, SquaredEuclidean, n, 2, 1);
        let bound = (n as f64).log2().ceil() as usize + 2;
        assert!(tree.levels() <= bound, "n {n}: {} levels", tree.levels());
        assert_eq!(tree.num_leaves(), n);
    }
}

#[test]
fn duplicates_split_evenly() {
    let mut tree = KdTree::new();
    for i in 0..9 {
        tree.add(vec![3, 3], i).unwrap();
    }
    tree.add(vec![4, 3], 9).unwrap();
    tree.build(1).unwrap();
    assert_eq!(tree.num_leaves(), 10);
    assert!(tree.levels() <= 5);

    let root = tree.root().unwrap();
    assert_eq!(root.split_dim(), Some(0));
    assert_eq!(root.partition(), Some(3));

    let all = tree.search_exactly_all(&[3, 3]);
    assert_eq!(ids(all.iter().map(|e| e.data())), (0..9).collect());
    assert_eq!(*tree.search_exactly(&[4, 3]).unwrap().data(), 9);
    assert!(tree.search_exactly(&[4, 4]).is_none());
}

#[test]
fn errors() {
    let mut tree: KdTree<f64, u8> = KdTree::new();
    assert_eq!(tree.build(1), Err(KdError::NoData));
    assert_eq!(tree.rebuild(1), Err(KdError::NoData));
    assert_eq!(tree.add(vec![], 0), Err(KdError::EmptyPoint));
    assert!(tree.search_nearest(&[0.0, 0.0]).is_none());
    assert!(tree.search_range(&[0.0, 0.0], &[1.0, 1.0]).is_empty());
    assert!(tree.search_within(&[0.0, 0.0], 1.0).is_empty());
    assert!(tree.search_exactly(&[0.0, 0.0]).is_none());
    assert_eq!(
        tree.search_k_nearest(1, &[0.0, 0.0]).unwrap_err(),
        KdError::EmptyTree
    );
    assert_eq!(
        tree.search_best_bin_first(1, &[0.0, 0.0], 10).unwrap_err(),
        KdError::EmptyTree
    );

    tree.add(vec![0.0, 0.0], 0).unwrap();
    tree.add(vec![1.0, 1.0], 1).unwrap();
    assert_eq!(
        tree.add(vec![1.0, 1.0, 1.0], 2),
        Err(KdError::DimensionMismatch {
            expected: 2,
            found: 3
        })
    );
    assert_eq!(tree.num_added_elements(), 2);

    assert_eq!(tree.build(0), Err(KdError::InvalidBucketSize));
    assert_eq!(tree.num_added_elements(), 2);
    assert!(tree.is_empty());

    tree.build(DEFAULT_BUCKET_SIZE).unwrap();
    assert_eq!(
        tree.search_k_nearest(3, &[0.0, 0.0]).unwrap_err(),
        KdError::NotEnoughElements { k: 3, size: 2 }
    );
    assert!(tree.search_k_nearest(0, &[0.0, 0.0]).unwrap().is_empty());
    assert_eq!(tree.search_k_nearest(2, &[0.0, 0.0]).unwrap().len(), 2);

    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.size(), 0);
    assert_eq!(tree.dimensions(), 0);
    tree.add(vec![1.0, 2.0, 3.0], 0).unwrap();
    assert_eq!(tree.dimensions(), 3);
}

#[test]
fn integer_coordinates() {
    let mut rng = StdRng::seed_from_u64(9);
    let points: Vec<Vec<i32>> = (0..300)
        .map(|_| (0..3).map(|_| rng.gen_range(-20..20)).collect())
        .collect();
    let mut tree = KdTree::new();
    for (i, p) in points.iter().enumerate() {
        tree.add(p.clone(), i).unwrap();
    }
    tree.build(2).unwrap();

    for p in &points {
        let all = tree.search_exactly_all(p);
        let expected = points.iter().filter(|q| *q == p).count();
        assert_eq!(all.len(), expected);
        assert!(all.iter().all(|e| e.point() == p.as_slice()));
    }

    let key = [0, 0, 0];
    let found: Vec<f64> = tree
        .search_k_nearest(7, &key)
        .unwrap()
        .iter()
        .map(|n| n.distance)
        .collect();
    let mut expected: Vec<f64> = points
        .iter()
        .map(|p| SquaredEuclidean.distance(&key, p))
        .collect();
    expected.sort_by(|a, b| a.total_cmp(b));
    expected.truncate(7);
    assert_eq!(found, expected);
}

#[test]
fn traversal_covers_every_element() {
    let tree = make_index(3);
    let nodes: Vec<_> = tree.pre_order().collect();
    assert_eq!(nodes.len(), 2 * tree.num_leaves() - 1);
    assert!(nodes[0].bounds() == tree.total_bounds().unwrap());
    assert_eq!(nodes[0].depth(), 0);

    let mut count = 0;
    for node in &nodes {
        if node.is_leaf() {
            assert!(!node.bucket().is_empty() && node.bucket().len() <= 3);
            assert!(node.depth() < tree.levels());
            for e in node.bucket() {
                assert!(node.bounds().contains_point(e.point()));
            }
            count += node.bucket().len();
        } else {
            assert!(node.bucket().is_empty());
            assert!(node.left_child().is_some() && node.right_child().is_some());
        }
    }
    assert_eq!(count, tree.size());
}

#[test]
fn payloads_can_be_updated() {
    let mut tree = make_index(5);
    tree.for_each_data_mut(|point, data| *data = point[0] as usize);
    let nearest = tree.search_nearest(&[97.0, 21.0]).unwrap();
    assert_eq!(*nearest.data(), 97);
}

struct Coord2 {
    x: f64,
    y: f64,
}

impl CoordTrait for Coord2 {
    type T = f64;

    fn dim(&self) -> geo_traits::Dimensions {
        geo_traits::Dimensions::Xy
    }

    fn x(&self) -> Self::T {
        self.x
    }

    fn y(&self) -> Self::T {
        self.y
    }

    fn nth_or_panic(&self, n: usize) -> Self::T {
        match n {
            0 => self.x,
            1 => self.y,
            _ => panic!("Invalid index of coord"),
        }
    }
}

#[test]
fn geo_traits_coords() {
    let mut tree = KdTree::new();
    tree.add_coord(&Coord2 { x: 1.0, y: 2.0 }, "a").unwrap();
    tree.add_coord(&Coord2 { x: -4.0, y: 0.5 }, "b").unwrap();
    tree.build_default().unwrap();

    let nearest = tree.search_nearest_coord(&Coord2 { x: -3.0, y: 0.0 }).unwrap();
    assert_eq!(*nearest.data(), "b");
    assert_eq!(nearest.point(), &[-4.0, 0.5]);
}

#[test]
fn concurrent_queries() {
    let tree = make_index(4);
    std::thread::scope(|s| {
        for t in 0..4 {
            let tree = &tree;
            s.spawn(move || {
                let key = [t as f64 * 25.0, 50.0];
                let found = tree.search_k_nearest(3, &key).unwrap();
                assert_eq!(found.len(), 3);
            });
        }
    });
}
