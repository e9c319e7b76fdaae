use geo::{coord, Geometry, Point};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::extents::Extents;

mod integration;

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A box inside `[0, world]²` with sides of at most `max_size`.
pub(crate) fn random_extents(rng: &mut StdRng, world: f64, max_size: f64) -> Extents {
    let x = rng.gen_range(0.0..world);
    let y = rng.gen_range(0.0..world);
    let width = rng.gen_range(0.0..max_size);
    let height = rng.gen_range(0.0..max_size);
    Extents::new(x, y, x + width, y + height)
}

pub(crate) fn random_boxes(seed: u64, count: usize, world: f64, max_size: f64) -> Vec<Extents> {
    let mut rng = rng(seed);
    (0..count)
        .map(|_| random_extents(&mut rng, world, max_size))
        .collect()
}

/// A point or a rectangle, with even odds.
pub(crate) fn random_geometry(rng: &mut StdRng, world: f64, max_size: f64) -> Geometry<f64> {
    if rng.gen_bool(0.5) {
        let c = coord! { x: rng.gen_range(0.0..world), y: rng.gen_range(0.0..world) };
        Geometry::Point(Point(c))
    } else {
        random_extents(rng, world, max_size).to_geometry()
    }
}
