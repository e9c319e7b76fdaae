use geo::{coord, Geometry};
use rand::seq::SliceRandom;
use rand::Rng;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use crate::extents::Extents;
use crate::projection::{
    create_projection, Direction, Ellipsoid, KrovakProjection, MapProjection, MeridianDistance,
    ProjectionParameters, TransverseMercator,
};
use crate::rtree::strategy::CondenseRestructure;
use crate::rtree::{DynamicRTree, NodeRef, RTreeBuilder, SpatialIndex};
use crate::table::{
    FeatureTable, RowId, Schema, SpatialFilter, SpatialOperation, SpatialQuery,
};
use crate::test::{init_logging, random_boxes, random_extents, random_geometry, rng};

const OPERATIONS: [SpatialOperation; 8] = [
    SpatialOperation::Intersects,
    SpatialOperation::Disjoint,
    SpatialOperation::Contains,
    SpatialOperation::Within,
    SpatialOperation::Overlaps,
    SpatialOperation::Touches,
    SpatialOperation::Crosses,
    SpatialOperation::Equals,
];

fn build_tree(builder: &RTreeBuilder<usize>, boxes: &[Extents]) -> DynamicRTree<usize> {
    let mut tree = builder.build();
    for (i, extents) in boxes.iter().enumerate() {
        tree.insert_with_extents(*extents, i);
    }
    tree
}

fn brute_force(boxes: &[(usize, Extents)], query: &Extents) -> Vec<usize> {
    let mut ids: Vec<_> = boxes
        .iter()
        .filter(|(_, extents)| extents.intersects(query))
        .map(|(i, _)| *i)
        .collect();
    ids.sort();
    ids
}

fn sorted<'a>(iter: impl Iterator<Item = &'a usize>) -> Vec<usize> {
    let mut ids: Vec<_> = iter.copied().collect();
    ids.sort();
    ids
}

/// Every node's extents is exactly the union of what it holds.
fn assert_exact_bounds<T>(node: NodeRef<'_, T>) {
    let expected = if node.is_leaf() {
        Extents::union_all(node.entries().iter().map(|entry| entry.extents()))
    } else {
        let children: Vec<_> = node.children().map(|child| *child.extents()).collect();
        Extents::union_all(children.iter())
    };
    assert_eq!(Some(*node.extents()), expected);
    for child in node.children() {
        assert_exact_bounds(child);
    }
}

fn assert_fanout<T>(tree: &DynamicRTree<T>) {
    let stats = tree.stats();
    let heuristic = tree.heuristic();
    assert!(stats.is_balanced(), "{:?}", stats);
    if let Some(min) = stats.min_fanout() {
        assert!(min >= heuristic.min_entries(), "{:?}", stats);
    }
    if let Some(max) = stats.max_fanout() {
        assert!(max <= heuristic.max_entries(), "{:?}", stats);
    }
    assert!(stats.root_fanout <= heuristic.max_entries());
    if stats.height > 1 {
        assert!(stats.root_fanout >= 2, "{:?}", stats);
    }
}

#[test]
fn dynamic_rtree_matches_rstar() {
    init_logging();
    let boxes = random_boxes(7, 1000, 1000., 40.);
    let rstar_tree = RTree::bulk_load(
        boxes
            .iter()
            .enumerate()
            .map(|(i, extents)| {
                let aabb = AABB::from_corners(
                    [extents.min_x(), extents.min_y()],
                    [extents.max_x(), extents.max_y()],
                );
                GeomWithData::new(Rectangle::from_aabb(aabb), i)
            })
            .collect(),
    );

    for builder in [
        RTreeBuilder::new(),
        RTreeBuilder::new_with_fanout(2, 4).unwrap(),
        RTreeBuilder::new_with_fanout(16, 64).unwrap(),
    ] {
        let tree = build_tree(&builder, &boxes);
        assert_eq!(tree.len(), boxes.len());
        assert_eq!(tree.iter().count(), boxes.len());

        for query in random_boxes(8, 50, 1000., 150.) {
            let envelope = AABB::from_corners(
                [query.min_x(), query.min_y()],
                [query.max_x(), query.max_y()],
            );
            let mut expected: Vec<_> = rstar_tree
                .locate_in_envelope_intersecting(&envelope)
                .map(|geom| geom.data)
                .collect();
            expected.sort();
            assert_eq!(sorted(tree.query(&query)), expected);
            assert_eq!(sorted(tree.query_rect(&query.to_rect())), expected);
        }
    }
}

#[test]
fn enclosing_query_finds_every_item() {
    let boxes = random_boxes(9, 300, 200., 30.);
    let tree = build_tree(&RTreeBuilder::new_with_fanout(2, 4).unwrap(), &boxes);
    let mut rng = rng(10);
    for (i, extents) in boxes.iter().enumerate() {
        let margin = rng.gen_range(0.0..5.);
        let query = Extents::new(
            extents.min_x() - margin,
            extents.min_y() - margin,
            extents.max_x() + margin,
            extents.max_y() + margin,
        );
        assert!(tree.query(&query).any(|item| *item == i), "item {i} missing");
        assert!(tree.query(extents).any(|item| *item == i), "item {i} missing");
    }
}

#[test]
fn inserts_keep_tree_balanced_and_bounded() {
    let boxes = random_boxes(11, 700, 500., 20.);
    let builder = RTreeBuilder::new_with_fanout(3, 8).unwrap();
    let mut tree = builder.build();
    for (i, extents) in boxes.iter().enumerate() {
        tree.insert_with_extents(*extents, i);
        if i % 100 == 0 {
            assert_fanout(&tree);
        }
    }
    assert_fanout(&tree);
    assert_exact_bounds(tree.root().unwrap());
    assert_eq!(tree.bounds(), Extents::union_all(boxes.iter()));
}

#[test]
fn removals_keep_queries_exact() {
    let boxes = random_boxes(12, 400, 300., 25.);
    let mut tree = build_tree(&RTreeBuilder::new_with_fanout(2, 5).unwrap(), &boxes);
    let mut live: Vec<_> = boxes.iter().copied().enumerate().collect();

    let mut rng = rng(13);
    live.shuffle(&mut rng);
    while live.len() > 50 {
        let (i, extents) = live.pop().unwrap();
        assert_eq!(tree.remove_within(&extents, &i), Ok(i));
        let query = random_extents(&mut rng, 300., 60.);
        assert_eq!(sorted(tree.query(&query)), brute_force(&live, &query));
    }

    assert_eq!(tree.len(), live.len());
    assert!(tree.stats().is_balanced());
    assert_exact_bounds(tree.root().unwrap());
    assert!(tree.try_remove(&boxes.len()).is_none());

    for (i, _) in std::mem::take(&mut live) {
        tree.remove(&i).unwrap();
    }
    assert!(tree.is_empty());
    assert_eq!(tree.height(), 0);
    assert_eq!(tree.bounds(), None);
}

#[test]
fn condense_restores_fanout_bounds() {
    init_logging();
    let boxes = random_boxes(21, 600, 400., 15.);
    let builder = RTreeBuilder::new_with_fanout(3, 8)
        .unwrap()
        .restructure_strategy(CondenseRestructure);
    let mut tree = build_tree(&builder, &boxes);
    let mut live: Vec<_> = boxes.iter().copied().enumerate().collect();

    let mut rng = rng(22);
    live.shuffle(&mut rng);
    for _ in 0..500 {
        let (i, extents) = live.pop().unwrap();
        tree.remove_within(&extents, &i).unwrap();
        if live.len() % 50 == 0 {
            assert_fanout(&tree);
            assert_exact_bounds(tree.root().unwrap());
        }
    }

    assert_eq!(tree.len(), live.len());
    let everything = Extents::new(-1., -1., 500., 500.);
    assert_eq!(sorted(tree.query(&everything)), brute_force(&live, &everything));
}

fn sorted_ids<'a>(rows: impl Iterator<Item = &'a crate::table::FeatureRow>) -> Vec<RowId> {
    let mut ids: Vec<_> = rows.filter_map(|row| row.id()).collect();
    ids.sort();
    ids
}

fn assert_same_selections(indexed: &FeatureTable, plain: &FeatureTable, filters: &[SpatialFilter]) {
    for filter in filters {
        if let Some(extents) = filter.extents() {
            assert_eq!(
                sorted_ids(indexed.select_extents(&extents)),
                sorted_ids(plain.select_extents(&extents))
            );
        }
        for operation in OPERATIONS {
            let query = SpatialQuery::new(operation, filter.clone());
            assert_eq!(
                sorted_ids(indexed.select(&query)),
                sorted_ids(plain.select(&query)),
                "{:?} {:?}",
                operation,
                filter
            );
            let query = query.filter_left();
            assert_eq!(
                sorted_ids(indexed.select(&query)),
                sorted_ids(plain.select(&query)),
                "{:?} {:?} (filter on the left)",
                operation,
                filter
            );
        }
    }
}

#[test]
fn indexed_and_unindexed_tables_agree() {
    init_logging();
    let mut indexed = FeatureTable::new(Schema::new())
        .with_index_builder(RTreeBuilder::new_with_fanout(2, 6).unwrap());
    indexed.set_spatially_indexed(true);
    let mut plain = FeatureTable::new(Schema::new());

    let mut rng = rng(31);
    let filters: Vec<SpatialFilter> = (0..4)
        .map(|i| {
            if i % 2 == 0 {
                SpatialFilter::Extents(random_extents(&mut rng, 100., 40.))
            } else {
                SpatialFilter::Geometry(random_geometry(&mut rng, 100., 40.))
            }
        })
        .collect();

    let mut ids = Vec::new();
    for _ in 0..80 {
        let geometry = rng.gen_bool(0.9).then(|| random_geometry(&mut rng, 100., 15.));
        let mut row = indexed.new_row();
        row.set_geometry(geometry.clone());
        let a = indexed.add_row(row).unwrap();
        let mut row = plain.new_row();
        row.set_geometry(geometry);
        let b = plain.add_row(row).unwrap();
        assert_eq!(a, b);
        ids.push(a);
    }
    assert_same_selections(&indexed, &plain, &filters);

    indexed.accept_changes();
    plain.accept_changes();
    ids.shuffle(&mut rng);
    for (step, id) in ids.iter().take(40).enumerate() {
        match step % 3 {
            0 => {
                indexed.remove_row(*id).unwrap();
                plain.remove_row(*id).unwrap();
            }
            1 => {
                indexed.delete_row(*id).unwrap();
                plain.delete_row(*id).unwrap();
            }
            _ => {
                let geometry = Some(random_geometry(&mut rng, 100., 15.));
                indexed.set_geometry(*id, geometry.clone()).unwrap();
                plain.set_geometry(*id, geometry).unwrap();
            }
        }
    }
    assert_same_selections(&indexed, &plain, &filters);
    assert_eq!(indexed.extents(), plain.extents());
    assert_eq!(indexed.feature_count(), plain.feature_count());

    indexed.accept_changes();
    plain.accept_changes();
    indexed.set_spatially_indexed(false);
    indexed.set_spatially_indexed(true);
    assert_eq!(indexed.index().map(|index| index.len()), {
        let geometries = plain.iter().filter(|row| row.extents().is_some()).count();
        Some(geometries)
    });
    assert_same_selections(&indexed, &plain, &filters);
}

#[test]
fn disjoint_selection_is_complete() {
    let mut table = FeatureTable::new(Schema::new())
        .with_index_builder(RTreeBuilder::new_with_fanout(2, 4).unwrap());
    table.set_spatially_indexed(true);

    let mut rng = rng(41);
    for _ in 0..60 {
        let mut row = table.new_row();
        row.set_geometry(Some(random_geometry(&mut rng, 50., 10.)));
        table.add_row(row).unwrap();
    }

    let filter = random_geometry(&mut rng, 50., 20.);
    let expected: Vec<RowId> = {
        let mut ids: Vec<_> = table
            .iter()
            .filter(|row| {
                SpatialOperation::Disjoint.evaluate(&filter, row.geometry().unwrap())
            })
            .filter_map(|row| row.id())
            .collect();
        ids.sort();
        ids
    };
    let query = SpatialQuery::new(SpatialOperation::Disjoint, filter);
    assert_eq!(sorted_ids(table.select(&query)), expected);
}

fn utm_parameters(central_meridian: f64) -> ProjectionParameters {
    ProjectionParameters::new()
        .with("semi_major", 6_378_137.)
        .with("inverse_flattening", 298.257_223_563)
        .with("central_meridian", central_meridian)
        .with("latitude_of_origin", 0.)
        .with("scale_factor", 0.9996)
        .with("false_easting", 500_000.)
        .with("false_northing", 0.)
}

#[test]
fn transverse_mercator_round_trip() {
    let projection = TransverseMercator::new(&utm_parameters(15.)).unwrap();
    let mut worst: f64 = 0.;
    for lat in (-60..=75).step_by(5) {
        for dlon in [-3., -2.25, -1.5, -0.75, 0., 0.75, 1.5, 2.25, 3.] {
            let lonlat = coord! { x: 15. + dlon, y: f64::from(lat) };
            let projected = projection.transform(lonlat, Direction::Forward).unwrap();
            let back = projection.transform(projected, Direction::Inverse).unwrap();
            worst = worst
                .max((back.x - lonlat.x).abs())
                .max((back.y - lonlat.y).abs());
        }
    }
    assert!(worst < 1e-7, "worst round trip error {worst}");
}

#[test]
fn meridian_distance_is_increasing() {
    for ellipsoid in [Ellipsoid::wgs84(), Ellipsoid::bessel_1841()] {
        let meridian = MeridianDistance::new(ellipsoid.e2());
        let mut previous = meridian.length(0.);
        for i in 1..900 {
            let phi = f64::from(i).to_radians() / 10.;
            let length = meridian.length(phi);
            assert!(length > previous, "not increasing at {phi}");
            previous = length;
        }
    }
}

fn sjtsk_parameters() -> ProjectionParameters {
    [
        ("semi_major", 6_377_397.155),
        ("inverse_flattening", 299.152_812_8),
        ("latitude_of_center", 49.5),
        ("longitude_of_center", 24.833_333_333_333_33),
        ("azimuth", 30.288_139_722_222_22),
        ("pseudo_standard_parallel_1", 78.5),
        ("scale_factor", 0.9999),
        ("false_easting", 0.),
        ("false_northing", 0.),
    ]
    .into_iter()
    .collect()
}

#[test]
fn krovak_round_trip() {
    let projection = KrovakProjection::new(&sjtsk_parameters()).unwrap();
    for i in 0..=14 {
        for j in 0..=10 {
            let lonlat = coord! { x: 12. + 0.5 * f64::from(i), y: 48.5 + 0.25 * f64::from(j) };
            let projected = projection.degrees_to_meters(lonlat).unwrap();
            assert!(projected.x < 0. && projected.y < 0., "{:?}", projected);
            let back = projection.meters_to_degrees(projected).unwrap();
            assert!((back.x - lonlat.x).abs() < 1e-9, "{:?} -> {:?}", lonlat, back);
            assert!((back.y - lonlat.y).abs() < 1e-9, "{:?} -> {:?}", lonlat, back);
        }
    }
}

#[test]
fn factory_builds_the_named_projection() {
    let krovak = create_projection("KROVAK", &sjtsk_parameters()).unwrap();
    let direct = KrovakProjection::new(&sjtsk_parameters()).unwrap();
    let lonlat = coord! { x: 16.85, y: 50.2 };
    assert_eq!(
        krovak.degrees_to_meters(lonlat).unwrap(),
        direct.degrees_to_meters(lonlat).unwrap()
    );
    assert_eq!(krovak.ellipsoid(), direct.ellipsoid());

    assert!(create_projection("Transverse Mercator", &sjtsk_parameters()).is_err());
    assert!(create_projection("Lambert_Conformal_Conic_2SP", &utm_parameters(9.)).is_err());

    let tm = create_projection("transverse_mercator", &utm_parameters(9.)).unwrap();
    let square = Extents::new(9., 45., 10., 46.).to_geometry();
    let projected = crate::projection::ProjectionTransform::from(tm)
        .transform_geometry(&square)
        .unwrap();
    assert!(matches!(projected, Geometry::Polygon(_)));
}
