use std::collections::VecDeque;

use ndarray::Array2;

/// Binary dilation with a (2r+1)x(2r+1) square structuring element.
pub fn dilate(mask: &Array2<bool>, radius: usize) -> Array2<bool> {
    if radius == 0 {
        return mask.clone();
    }
    let rows = sweep_rows(mask, radius, true);
    sweep_cols(&rows, radius, true)
}

/// Binary erosion with a (2r+1)x(2r+1) square structuring element.
///
/// Pixels outside the image count as background, so foreground touching the
/// border erodes from that side as well.
pub fn erode(mask: &Array2<bool>, radius: usize) -> Array2<bool> {
    if radius == 0 {
        return mask.clone();
    }
    let rows = sweep_rows(mask, radius, false);
    sweep_cols(&rows, radius, false)
}

/// Morphological closing (dilation followed by erosion). Bridges small gaps.
pub fn closing(mask: &Array2<bool>, radius: usize) -> Array2<bool> {
    erode(&dilate(mask, radius), radius)
}

/// Fill enclosed holes: background pixels not reachable from the image border
/// through 4-connected background become foreground.
pub fn fill_holes(mask: &Array2<bool>) -> Array2<bool> {
    let (h, w) = mask.dim();
    if h == 0 || w == 0 {
        return mask.clone();
    }
    let mut outside = Array2::from_elem((h, w), false);
    let mut queue = VecDeque::new();

    let mut seed = |row: usize, col: usize, outside: &mut Array2<bool>| {
        if !mask[[row, col]] && !outside[[row, col]] {
            outside[[row, col]] = true;
            queue.push_back((row, col));
        }
    };
    for col in 0..w {
        seed(0, col, &mut outside);
        seed(h - 1, col, &mut outside);
    }
    for row in 0..h {
        seed(row, 0, &mut outside);
        seed(row, w - 1, &mut outside);
    }

    while let Some((row, col)) = queue.pop_front() {
        let neighbors = [
            (row.wrapping_sub(1), col),
            (row + 1, col),
            (row, col.wrapping_sub(1)),
            (row, col + 1),
        ];
        for (nr, nc) in neighbors {
            if nr < h && nc < w && !mask[[nr, nc]] && !outside[[nr, nc]] {
                outside[[nr, nc]] = true;
                queue.push_back((nr, nc));
            }
        }
    }

    outside.mapv(|o| !o)
}

// `grow == true` is dilation (any), `false` is erosion (all, border = false).
fn sweep_rows(mask: &Array2<bool>, radius: usize, grow: bool) -> Array2<bool> {
    let (h, w) = mask.dim();
    Array2::from_shape_fn((h, w), |(row, col)| {
        let lo = col as isize - radius as isize;
        let hi = col as isize + radius as isize;
        window_test((lo..=hi).map(|c| {
            if c < 0 || c >= w as isize {
                None
            } else {
                Some(mask[[row, c as usize]])
            }
        }), grow)
    })
}

fn sweep_cols(mask: &Array2<bool>, radius: usize, grow: bool) -> Array2<bool> {
    let (h, w) = mask.dim();
    Array2::from_shape_fn((h, w), |(row, col)| {
        let lo = row as isize - radius as isize;
        let hi = row as isize + radius as isize;
        window_test((lo..=hi).map(|r| {
            if r < 0 || r >= h as isize {
                None
            } else {
                Some(mask[[r as usize, col]])
            }
        }), grow)
    })
}

fn window_test(mut window: impl Iterator<Item = Option<bool>>, grow: bool) -> bool {
    if grow {
        window.any(|v| v == Some(true))
    } else {
        window.all(|v| v == Some(true))
    }
}
