use tinyvec::tiny_vec;

use crate::extents::Extents;
use crate::rtree::strategy::{InsertStrategy, SplitGroup, SplitGroups, SplitStrategy};

/// Guttman's quadratic choice of insertion subtree.
///
/// Picks the child whose extents need the least enlargement to cover the new item, breaking ties
/// by the smaller resulting area.
///
/// Described in Guttman, "R-Trees: A Dynamic Index Structure for Spatial Searching" (1984),
/// algorithm ChooseLeaf.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuttmanQuadraticInsert;

impl InsertStrategy for GuttmanQuadraticInsert {
    fn choose_subtree(&self, children: &[Extents], extents: &Extents) -> usize {
        let mut best = 0;
        let mut best_enlargement = f64::INFINITY;
        let mut best_area = f64::INFINITY;

        for (i, child) in children.iter().enumerate() {
            let area = child.union(extents).area();
            let enlargement = area - child.area();
            if enlargement < best_enlargement
                || (enlargement == best_enlargement && area < best_area)
            {
                best = i;
                best_enlargement = enlargement;
                best_area = area;
            }
        }

        best
    }
}

/// Guttman's quadratic node split.
///
/// The pair of entries wasting the most area when grouped together seed the two groups. The
/// remaining entries are then assigned one at a time, always picking the entry with the strongest
/// preference for one group, to the group whose extents grow least. Ties go to the group with
/// fewer entries. Once a group needs every remaining entry to reach the minimum fan-out, all of
/// them are assigned to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuttmanQuadraticSplit;

impl SplitStrategy for GuttmanQuadraticSplit {
    fn split(&self, boxes: &[Extents], min_entries: usize) -> SplitGroups {
        debug_assert!(boxes.len() >= 2);

        let (seed_left, seed_right) = pick_seeds(boxes);
        let mut left: SplitGroup = tiny_vec!([usize; 16] => seed_left);
        let mut right: SplitGroup = tiny_vec!([usize; 16] => seed_right);
        let mut left_bounds = boxes[seed_left];
        let mut right_bounds = boxes[seed_right];

        let mut remaining: Vec<usize> = (0..boxes.len())
            .filter(|&i| i != seed_left && i != seed_right)
            .collect();

        while !remaining.is_empty() {
            if left.len() + remaining.len() <= min_entries {
                left.extend(remaining.drain(..));
                break;
            }
            if right.len() + remaining.len() <= min_entries {
                right.extend(remaining.drain(..));
                break;
            }

            let (pos, grow_left, grow_right) =
                pick_next(boxes, &remaining, &left_bounds, &right_bounds);
            let index = remaining.swap_remove(pos);

            let to_left = if grow_left != grow_right {
                grow_left < grow_right
            } else {
                left.len() <= right.len()
            };

            if to_left {
                left.push(index);
                left_bounds.expand_to_include(&boxes[index]);
            } else {
                right.push(index);
                right_bounds.expand_to_include(&boxes[index]);
            }
        }

        SplitGroups { left, right }
    }
}

/// The pair with the largest dead space: area of the combined box minus both individual areas.
fn pick_seeds(boxes: &[Extents]) -> (usize, usize) {
    let mut best = (0, 1);
    let mut max_waste = f64::NEG_INFINITY;

    for (i, a) in boxes.iter().enumerate() {
        for (j, b) in boxes.iter().enumerate().skip(i + 1) {
            let waste = a.union(b).area() - a.area() - b.area();
            if waste > max_waste {
                max_waste = waste;
                best = (i, j);
            }
        }
    }

    best
}

/// The remaining entry with the greatest difference in enlargement between the two groups.
///
/// Returns its position in `remaining` and the growth of each group if it were added there.
fn pick_next(
    boxes: &[Extents],
    remaining: &[usize],
    left_bounds: &Extents,
    right_bounds: &Extents,
) -> (usize, f64, f64) {
    let mut best = (0, 0., 0.);
    let mut max_difference = f64::NEG_INFINITY;

    for (pos, &index) in remaining.iter().enumerate() {
        let grow_left = left_bounds.enlargement(&boxes[index]);
        let grow_right = right_bounds.enlargement(&boxes[index]);
        let difference = (grow_left - grow_right).abs();
        if difference > max_difference {
            max_difference = difference;
            best = (pos, grow_left, grow_right);
        }
    }

    best
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_prefers_least_enlargement() {
        let children = [Extents::new(0., 0., 1., 1.), Extents::new(10., 10., 11., 11.)];
        let target = Extents::new(9., 9., 9.5, 9.5);
        assert_eq!(GuttmanQuadraticInsert.choose_subtree(&children, &target), 1);
    }

    #[test]
    fn insert_ties_break_on_smaller_area() {
        // Both children already contain the target, so neither grows.
        let children = [Extents::new(0., 0., 10., 10.), Extents::new(0., 0., 2., 2.)];
        let target = Extents::new(1., 1., 1.5, 1.5);
        assert_eq!(GuttmanQuadraticInsert.choose_subtree(&children, &target), 1);
    }

    #[test]
    fn seeds_are_the_most_wasteful_pair() {
        let boxes = [
            Extents::new(0., 0., 1., 1.),
            Extents::new(0.5, 0.5, 1.5, 1.5),
            Extents::new(20., 20., 21., 21.),
            Extents::new(1., 0., 2., 1.),
        ];
        let (a, b) = pick_seeds(&boxes);
        assert_eq!(b, 2);
        assert!(a == 0 || a == 1 || a == 3);
    }

    #[test]
    fn split_separates_clusters() {
        let boxes = [
            Extents::new(0., 0., 1., 1.),
            Extents::new(100., 100., 101., 101.),
            Extents::new(1., 1., 2., 2.),
            Extents::new(101., 101., 102., 102.),
            Extents::new(0., 1., 1., 2.),
            Extents::new(100., 101., 101., 102.),
        ];
        let groups = GuttmanQuadraticSplit.split(&boxes, 2);
        let mut left: Vec<usize> = groups.left.iter().copied().collect();
        let mut right: Vec<usize> = groups.right.iter().copied().collect();
        left.sort();
        right.sort();

        let (low, high) = if left.contains(&0) {
            (left, right)
        } else {
            (right, left)
        };
        assert_eq!(low, vec![0, 2, 4]);
        assert_eq!(high, vec![1, 3, 5]);
    }

    #[test]
    fn split_ties_go_to_the_smaller_group() {
        // The point grows both seeds' boxes by 66, and the left group already holds two entries.
        let boxes = [
            Extents::new(0., 0., 1., 1.),
            Extents::new(100., 0., 102., 2.),
            Extents::new(0., 0., 1., 1.),
            Extents::new(67., 0.5, 67., 0.5),
        ];
        let groups = GuttmanQuadraticSplit.split(&boxes, 1);
        let mut left: Vec<usize> = groups.left.iter().copied().collect();
        let mut right: Vec<usize> = groups.right.iter().copied().collect();
        left.sort();
        right.sort();
        assert_eq!(left, vec![0, 2]);
        assert_eq!(right, vec![1, 3]);
    }

    #[test]
    fn split_honors_min_entries() {
        // One outlier and a tight cluster: the outlier's group must still receive `min` entries.
        let mut boxes = vec![Extents::new(1000., 1000., 1001., 1001.)];
        for i in 0..10 {
            let v = i as f64 * 0.1;
            boxes.push(Extents::new(v, v, v + 0.1, v + 0.1));
        }
        let groups = GuttmanQuadraticSplit.split(&boxes, 4);
        assert!(groups.left.len() >= 4);
        assert!(groups.right.len() >= 4);
        assert_eq!(groups.left.len() + groups.right.len(), boxes.len());
    }
}
