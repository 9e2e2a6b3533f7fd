//! Active-path compaction and material sorting between bounces.

use rayon::prelude::*;

use crate::path::{PathState, ShadeableIntersection};

/// Stable partition: live paths to the front, terminated ones after them.
///
/// Returns the number of live paths. Relative order is kept within both
/// groups, so terminated paths retain their radiance for the final gather.
pub fn compact_paths(paths: &mut [PathState]) -> usize {
    let (alive, dead): (Vec<PathState>, Vec<PathState>) = paths.par_iter().partition(|p| p.is_alive());

    let active = alive.len();
    paths[..active].copy_from_slice(&alive);
    paths[active..].copy_from_slice(&dead);
    active
}

/// Reorder paths and their intersections together so paths hitting the
/// same material are shaded next to each other. Misses sort last.
pub fn sort_by_material(paths: &mut [PathState], intersections: &mut [ShadeableIntersection]) {
    debug_assert_eq!(paths.len(), intersections.len());

    let mut keyed: Vec<(ShadeableIntersection, PathState)> = intersections
        .par_iter()
        .copied()
        .zip(paths.par_iter().copied())
        .collect();
    keyed.par_sort_by_key(|(isect, _)| if isect.is_hit() { isect.material_id } else { usize::MAX });

    for (i, (isect, path)) in keyed.into_iter().enumerate() {
        intersections[i] = isect;
        paths[i] = path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::{Ray, Vec3};

    fn path(pixel_index: u32, alive: bool) -> PathState {
        let mut p = PathState::new(Ray::new(Vec3::ZERO, Vec3::Z), pixel_index, 4);
        if !alive {
            p.terminate();
        }
        p
    }

    fn hit(material_id: usize) -> ShadeableIntersection {
        ShadeableIntersection {
            t: 1.0,
            surface_normal: Vec3::Z,
            material_id,
            geom_id: None,
        }
    }

    #[test]
    fn test_compact_is_stable() {
        let mut paths: Vec<PathState> = (0..10).map(|i| path(i, i % 3 != 0)).collect();
        let active = compact_paths(&mut paths);

        assert_eq!(active, 6);
        let live: Vec<u32> = paths[..active].iter().map(|p| p.pixel_index).collect();
        let dead: Vec<u32> = paths[active..].iter().map(|p| p.pixel_index).collect();
        assert_eq!(live, vec![1, 2, 4, 5, 7, 8]);
        assert_eq!(dead, vec![0, 3, 6, 9]);
    }

    #[test]
    fn test_compact_all_dead() {
        let mut paths: Vec<PathState> = (0..4).map(|i| path(i, false)).collect();
        assert_eq!(compact_paths(&mut paths), 0);
        assert_eq!(paths.len(), 4);
    }

    #[test]
    fn test_sort_keeps_pairs_together() {
        let mut paths: Vec<PathState> = (0..5).map(|i| path(i, true)).collect();
        let mut isects = vec![hit(2), ShadeableIntersection::MISS, hit(0), hit(2), hit(1)];

        sort_by_material(&mut paths, &mut isects);

        let materials: Vec<usize> = isects.iter().take(4).map(|i| i.material_id).collect();
        assert_eq!(materials, vec![0, 1, 2, 2]);
        assert!(!isects[4].is_hit());

        // Each path still travels with its own intersection
        let pixels: Vec<u32> = paths.iter().map(|p| p.pixel_index).collect();
        assert_eq!(pixels, vec![2, 4, 0, 3, 1]);
    }
}
