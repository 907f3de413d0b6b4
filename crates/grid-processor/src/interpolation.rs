//! Bilinear interpolation inside a single quadrilateral cell.
//!
//! Corners are ordered `[p00, p10, p01, p11]`: `s` runs from `p00` to `p10`
//! (along the grid's x axis) and `t` from `p00` to `p01` (along y).

/// Maximum Newton iterations when inverting the bilinear map.
const MAX_NEWTON_ITERATIONS: usize = 25;

/// Convergence threshold on the `(s, t)` update.
const NEWTON_TOLERANCE: f64 = 1e-12;

/// Bilinear weights of the four corners at fractional position `(s, t)`.
pub fn bilinear_weights(s: f64, t: f64) -> [f64; 4] {
    [
        (1.0 - s) * (1.0 - t),
        s * (1.0 - t),
        (1.0 - s) * t,
        s * t,
    ]
}

/// Bilinear interpolation of corner values.
///
/// Returns NaN if any corner is NaN.
pub fn bilinear_interpolate(corners: &[f64; 4], s: f64, t: f64) -> f64 {
    // Handle NaN values - if any corner is NaN, return NaN
    if corners.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }

    let top = corners[0] * (1.0 - s) + corners[1] * s;
    let bottom = corners[2] * (1.0 - s) + corners[3] * s;
    top * (1.0 - t) + bottom * t
}

/// Find `(s, t)` such that the bilinear map of the corner coordinates hits
/// `(x, y)`.
///
/// Uses Newton's method from the cell centre. Returns `None` for degenerate
/// cells or when the iteration does not converge. The result may lie outside
/// `[0, 1]`; callers decide whether the point is inside the cell.
pub fn invert_bilinear(xs: &[f64; 4], ys: &[f64; 4], x: f64, y: f64) -> Option<(f64, f64)> {
    let (mut s, mut t) = (0.5, 0.5);

    for _ in 0..MAX_NEWTON_ITERATIONS {
        let fx = bilinear_interpolate(xs, s, t) - x;
        let fy = bilinear_interpolate(ys, s, t) - y;

        // Partial derivatives of the map
        let dx_ds = (1.0 - t) * (xs[1] - xs[0]) + t * (xs[3] - xs[2]);
        let dy_ds = (1.0 - t) * (ys[1] - ys[0]) + t * (ys[3] - ys[2]);
        let dx_dt = (1.0 - s) * (xs[2] - xs[0]) + s * (xs[3] - xs[1]);
        let dy_dt = (1.0 - s) * (ys[2] - ys[0]) + s * (ys[3] - ys[1]);

        let det = dx_ds * dy_dt - dx_dt * dy_ds;
        if det.abs() < f64::EPSILON || !det.is_finite() {
            return None;
        }

        let ds = (fx * dy_dt - fy * dx_dt) / det;
        let dt = (fy * dx_ds - fx * dy_ds) / det;
        s -= ds;
        t -= dt;

        if ds.abs() < NEWTON_TOLERANCE && dt.abs() < NEWTON_TOLERANCE {
            return Some((s, t));
        }
    }

    None
}
