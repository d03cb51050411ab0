use std::collections::BTreeMap;

use ndarray::Array2;

/// A connected set of foreground pixels.
#[derive(Clone, Debug)]
pub struct Component {
    /// Flat (row-major) indices of the member pixels, in raster order.
    pub pixels: Vec<usize>,
    /// Bounding box: (min_row, max_row, min_col, max_col).
    pub bbox: (usize, usize, usize, usize),
    /// Geometric centroid as (row, col).
    pub centroid: (f64, f64),
}

impl Component {
    pub fn area(&self) -> usize {
        self.pixels.len()
    }
}

/// Label 4-connected components of a binary mask with two-pass union-find and
/// keep those with at least `min_size` pixels.
///
/// Components are returned in raster order of their first pixel.
pub fn connected_components(mask: &Array2<bool>, min_size: usize) -> Vec<Component> {
    let (h, w) = mask.dim();
    if h == 0 || w == 0 {
        return Vec::new();
    }

    let mut labels = Array2::<u32>::zeros((h, w));
    // Index 0 unused; labels start at 1.
    let mut parent: Vec<u32> = vec![0];

    for row in 0..h {
        for col in 0..w {
            if !mask[[row, col]] {
                continue;
            }
            let up = if row > 0 { labels[[row - 1, col]] } else { 0 };
            let left = if col > 0 { labels[[row, col - 1]] } else { 0 };

            labels[[row, col]] = match (up > 0, left > 0) {
                (false, false) => {
                    let next = parent.len() as u32;
                    parent.push(next);
                    next
                }
                (true, false) => up,
                (false, true) => left,
                (true, true) => {
                    if up != left {
                        union(&mut parent, up, left);
                    }
                    up.min(left)
                }
            };
        }
    }

    for i in 1..parent.len() {
        parent[i] = find(&parent, i as u32);
    }

    let mut grouped = BTreeMap::<u32, Vec<usize>>::new();
    for row in 0..h {
        for col in 0..w {
            let lbl = labels[[row, col]];
            if lbl != 0 {
                grouped
                    .entry(parent[lbl as usize])
                    .or_default()
                    .push(row * w + col);
            }
        }
    }

    let mut components: Vec<Component> = grouped
        .into_values()
        .filter(|pixels| pixels.len() >= min_size.max(1))
        .map(|pixels| describe(pixels, w))
        .collect();
    components.sort_by_key(|c| c.pixels[0]);
    components
}

fn describe(pixels: Vec<usize>, width: usize) -> Component {
    let mut bbox = (usize::MAX, 0, usize::MAX, 0);
    let mut sum_row = 0.0;
    let mut sum_col = 0.0;
    for &p in &pixels {
        let (row, col) = (p / width, p % width);
        bbox.0 = bbox.0.min(row);
        bbox.1 = bbox.1.max(row);
        bbox.2 = bbox.2.min(col);
        bbox.3 = bbox.3.max(col);
        sum_row += row as f64;
        sum_col += col as f64;
    }
    let n = pixels.len() as f64;
    Component {
        centroid: (sum_row / n, sum_col / n),
        bbox,
        pixels,
    }
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
        let (small, big) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[big as usize] = small;
    }
}
