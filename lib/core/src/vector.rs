//! Dense-vector helpers for semantic scoring.

fn dot_and_norms(a: &[f32], b: &[f32]) -> (f64, f64, f64) {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    (dot, norm_a.sqrt(), norm_b.sqrt())
}

/// Raw cosine similarity in `[-1, 1]`. Degenerate (zero-norm or
/// mismatched-length) inputs score 0.0 rather than erroring.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (dot, norm_a, norm_b) = dot_and_norms(a, b);
    let denom = norm_a * norm_b;
    if denom <= 1e-12 {
        return 0.0;
    }
    (dot / denom) as f32
}

/// Cosine similarity rescaled from `[-1, 1]` into `[0, 1]` and clamped.
///
/// Degenerate inputs score 0.0, not the 0.5 midpoint, so entities with no
/// embedding signal contribute nothing to the blend and can be excluded
/// as zero-signal candidates.
pub fn semantic_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (dot, norm_a, norm_b) = dot_and_norms(a, b);
    let denom = norm_a * norm_b;
    if denom <= 1e-12 {
        return 0.0;
    }
    let cos = dot / denom;
    ((cos + 1.0) / 2.0).clamp(0.0, 1.0) as f32
}

/// L2-normalize in place; zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    if norm > 1e-12 {
        for x in v.iter_mut() {
            *x = (f64::from(*x) / norm) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_score_one() {
        let v = vec![0.3, 0.5, 0.8];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-6);
        assert!((semantic_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_rescale_to_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine(&a, &b) + 1.0).abs() < 1e-6);
        assert!(semantic_similarity(&a, &b) < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_rescale_to_midpoint() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((semantic_similarity(&a, &b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn degenerate_inputs_score_zero() {
        assert_eq!(cosine(&[], &[]), 0.0);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(semantic_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn l2_normalize_produces_unit_norm() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }
}
