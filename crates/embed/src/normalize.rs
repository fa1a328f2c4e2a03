/// Allowed distance of a stored vector's norm from 1.0
pub const NORM_TOLERANCE: f32 = 1e-4;

/// Euclidean length of a vector
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale a vector to unit length in place.
///
/// Returns the original norm. A zero or non-finite norm leaves the vector
/// untouched; callers decide whether that is an error.
pub fn normalize_l2(vector: &mut [f32]) -> f32 {
    let norm = l2_norm(vector);
    if norm > 0.0 && norm.is_finite() {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
    norm
}
