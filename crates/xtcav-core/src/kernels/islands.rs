use ndarray::Array2;

use crate::consts::CONTOUR_LEVEL_FRACTION;
use crate::pipeline::config::IslandSplitMethod;

/// Pixel neighbourhood used when labeling islands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    Four,
    Eight,
}

/// Statistics for a single connected island.
#[derive(Clone, Debug)]
pub struct Island {
    /// Label of this island in the label map.
    pub label: u32,
    /// Number of pixels in the island.
    pub area: usize,
    /// Mean column index of the island's pixels.
    pub col_centroid: f64,
}

/// Split a denoised trace into one image per bunch.
///
/// A single bunch returns the image unchanged. Otherwise the image is labeled
/// with the selected method and the `num_bunches` largest islands are kept,
/// provided that the largest is at most `par1` times the smallest kept one
/// and, when another island exists, the smallest kept one is at least `par2`
/// times larger than it. Bunches are returned in order of increasing column
/// centroid. An empty vector means the split failed.
pub fn split_image(
    image: &Array2<f32>,
    num_bunches: usize,
    method: IslandSplitMethod,
    par1: f64,
    par2: f64,
) -> Vec<Array2<f32>> {
    if num_bunches <= 1 {
        return vec![image.clone()];
    }

    let (labels, islands) = label_image(image, method);
    if islands.len() < num_bunches {
        return Vec::new();
    }

    let smallest_kept = islands[num_bunches - 1].area as f64;
    if islands[0].area as f64 / smallest_kept > par1 {
        return Vec::new();
    }
    if let Some(next) = islands.get(num_bunches) {
        if smallest_kept / (next.area as f64) < par2 {
            return Vec::new();
        }
    }

    let mut kept: Vec<&Island> = islands[..num_bunches].iter().collect();
    kept.sort_by(|a, b| a.col_centroid.total_cmp(&b.col_centroid));

    kept.into_iter()
        .map(|island| {
            let mut bunch = image.clone();
            for (value, &label) in bunch.iter_mut().zip(labels.iter()) {
                if label != island.label {
                    *value = 0.0;
                }
            }
            bunch
        })
        .collect()
}

/// Label the islands of an image with the given method.
pub fn label_image(image: &Array2<f32>, method: IslandSplitMethod) -> (Array2<u32>, Vec<Island>) {
    match method {
        IslandSplitMethod::ScipyLabel => {
            let mask = image.mapv(|v| v > 0.0);
            label_islands(&mask, Connectivity::Four)
        }
        IslandSplitMethod::ContourLabel => {
            let peak = image.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            let level = if peak > 0.0 {
                CONTOUR_LEVEL_FRACTION * peak
            } else {
                f32::INFINITY
            };
            let mask = image.mapv(|v| v > level);
            label_islands(&mask, Connectivity::Eight)
        }
    }
}

/// Connected component labeling on a binary mask using two-pass labeling
/// with union-find.
///
/// Returns the resolved label map (0 = background) and island statistics
/// sorted by area descending, ties broken by label.
pub fn label_islands(mask: &Array2<bool>, connectivity: Connectivity) -> (Array2<u32>, Vec<Island>) {
    let (h, w) = mask.dim();
    let mut labels = Array2::<u32>::zeros((h, w));
    if h == 0 || w == 0 {
        return (labels, Vec::new());
    }

    let mut next_label: u32 = 1;
    // Union-find parent array. Index 0 unused; labels start at 1.
    let mut parent: Vec<u32> = vec![0; h * w / 2 + 2];
    let mut neighbours: Vec<u32> = Vec::with_capacity(4);

    // Pass 1: assign provisional labels.
    for row in 0..h {
        for col in 0..w {
            if !mask[[row, col]] {
                continue;
            }

            neighbours.clear();
            if row > 0 {
                neighbours.push(labels[[row - 1, col]]);
            }
            if col > 0 {
                neighbours.push(labels[[row, col - 1]]);
            }
            if connectivity == Connectivity::Eight && row > 0 {
                if col > 0 {
                    neighbours.push(labels[[row - 1, col - 1]]);
                }
                if col + 1 < w {
                    neighbours.push(labels[[row - 1, col + 1]]);
                }
            }
            neighbours.retain(|&l| l > 0);

            match neighbours.iter().min().copied() {
                None => {
                    // New label.
                    if next_label as usize >= parent.len() {
                        parent.resize(parent.len() * 2, 0);
                    }
                    parent[next_label as usize] = next_label;
                    labels[[row, col]] = next_label;
                    next_label += 1;
                }
                Some(smallest) => {
                    labels[[row, col]] = smallest;
                    for &other in &neighbours {
                        if other != smallest {
                            union(&mut parent, smallest, other);
                        }
                    }
                }
            }
        }
    }

    // Flatten parent references.
    for i in 1..next_label as usize {
        parent[i] = find(&parent, i as u32);
    }

    // Pass 2: resolve labels and collect stats.
    let mut stats = std::collections::BTreeMap::<u32, (usize, f64)>::new();
    for row in 0..h {
        for col in 0..w {
            let lbl = labels[[row, col]];
            if lbl == 0 {
                continue;
            }
            let root = parent[lbl as usize];
            labels[[row, col]] = root;
            let entry = stats.entry(root).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += col as f64;
        }
    }

    let mut islands: Vec<Island> = stats
        .into_iter()
        .map(|(label, (area, col_sum))| Island {
            label,
            area,
            col_centroid: col_sum / area as f64,
        })
        .collect();
    islands.sort_by(|a, b| b.area.cmp(&a.area).then(a.label.cmp(&b.label)));
    (labels, islands)
}

fn find(parent: &[u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        x = parent[x as usize];
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        // Merge larger root into smaller root to keep labels consistent.
        let (small, big) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[big as usize] = small;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::s;

    fn two_blobs(left_w: usize, right_w: usize) -> Array2<f32> {
        let mut image = Array2::<f32>::zeros((10, 30));
        image.slice_mut(s![3..7, 2..2 + left_w]).fill(1.0);
        image.slice_mut(s![3..7, 20..20 + right_w]).fill(2.0);
        image
    }

    #[test]
    fn test_diagonal_pixels_depend_on_connectivity() {
        let mut mask = Array2::from_elem((3, 3), false);
        mask[[0, 0]] = true;
        mask[[1, 1]] = true;
        let (_, four) = label_islands(&mask, Connectivity::Four);
        let (_, eight) = label_islands(&mask, Connectivity::Eight);
        assert_eq!(four.len(), 2);
        assert_eq!(eight.len(), 1);
        assert_eq!(eight[0].area, 2);
    }

    #[test]
    fn test_u_shape_merges_into_one_island() {
        let mut mask = Array2::from_elem((3, 3), false);
        mask[[0, 0]] = true;
        mask[[0, 2]] = true;
        mask[[1, 0]] = true;
        mask[[1, 2]] = true;
        mask[[2, 0]] = true;
        mask[[2, 1]] = true;
        mask[[2, 2]] = true;
        let (labels, islands) = label_islands(&mask, Connectivity::Four);
        assert_eq!(islands.len(), 1);
        assert_eq!(labels[[0, 0]], labels[[0, 2]]);
    }

    #[test]
    fn test_single_bunch_is_passthrough() {
        let image = two_blobs(4, 4);
        let out = split_image(&image, 1, IslandSplitMethod::ScipyLabel, 3.0, 5.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], image);
    }

    #[test]
    fn test_two_bunches_ordered_by_column() {
        let image = two_blobs(4, 5);
        let out = split_image(&image, 2, IslandSplitMethod::ScipyLabel, 3.0, 5.0);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].sum(), 16.0);
        assert_eq!(out[1].sum(), 40.0);
        assert_eq!(out[0][[4, 21]], 0.0);
    }

    #[test]
    fn test_unbalanced_islands_rejected() {
        let image = two_blobs(1, 8);
        let out = split_image(&image, 2, IslandSplitMethod::ScipyLabel, 3.0, 5.0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_contour_label_ignores_faint_halo() {
        let mut image = two_blobs(4, 4);
        image.slice_mut(s![0..1, ..]).fill(0.05);
        let scipy = split_image(&image, 2, IslandSplitMethod::ScipyLabel, 3.0, 5.0);
        let contour = split_image(&image, 2, IslandSplitMethod::ContourLabel, 3.0, 5.0);
        assert!(scipy.is_empty());
        assert_eq!(contour.len(), 2);
    }
}
