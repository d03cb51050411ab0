use ndarray::{Array1, Array2};

/// Pivots smaller than this are treated as singular.
const PIVOT_EPSILON: f64 = 1e-300;

/// Solve the dense system `a * x = b` by Gaussian elimination with partial
/// pivoting. Returns `None` when the matrix is singular.
pub fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    assert_eq!(a.dim(), (n, n), "system matrix must be square and match rhs");
    let mut m = a.clone();
    let mut rhs = b.clone();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| m[[i, col]].abs().total_cmp(&m[[j, col]].abs()))?;
        if !(m[[pivot, col]].abs() > PIVOT_EPSILON) {
            return None;
        }
        if pivot != col {
            for j in 0..n {
                m.swap([col, j], [pivot, j]);
            }
            rhs.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = m[[row, col]] / m[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                m[[row, j]] -= factor * m[[col, j]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let tail: f64 = (i + 1..n).map(|j| m[[i, j]] * x[j]).sum();
        x[i] = (rhs[i] - tail) / m[[i, i]];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}
