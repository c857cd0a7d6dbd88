//! Vector operations for embeddings.

use crate::{Error, Result};

pub type Vector = Vec<f32>;

fn check_dimensions(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::validation(format!(
            "Vector dimensions must match: {} != {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimensions(a, b)?;
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

pub fn normalize_vector(v: &[f32]) -> Vector {
    let mag = magnitude(v);
    if mag == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / mag).collect()
}

/// Squared Euclidean distance (no square root).
pub fn squared_l2_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimensions(a, b)?;
    Ok(a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum())
}

/// `1 - cosine_similarity`; zero vectors are treated as orthogonal.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    let dot = dot_product(a, b)?;
    let mag_a = magnitude(a);
    let mag_b = magnitude(b);
    if mag_a == 0.0 || mag_b == 0.0 {
        return Ok(1.0);
    }
    Ok(1.0 - dot / (mag_a * mag_b))
}

/// `1 - dot(a, b)`.
pub fn inner_product_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    Ok(1.0 - dot_product(a, b)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_dot_product_basic() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![4.0, 5.0, 6.0];
        // 1*4 + 2*5 + 3*6 = 32
        assert!(approx_eq(dot_product(&a, &b).unwrap(), 32.0));
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        assert!(dot_product(&a, &b).is_err());
        assert!(squared_l2_distance(&a, &b).is_err());
        assert!(cosine_distance(&a, &b).is_err());
    }

    #[test]
    fn test_squared_l2() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!(approx_eq(squared_l2_distance(&a, &b).unwrap(), 25.0));
        assert!(approx_eq(squared_l2_distance(&b, &b).unwrap(), 0.0));
    }

    #[test]
    fn test_cosine_distance() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 2.0];
        assert!(approx_eq(cosine_distance(&a, &b).unwrap(), 1.0));
        assert!(approx_eq(cosine_distance(&a, &[5.0, 0.0]).unwrap(), 0.0));
        assert!(approx_eq(cosine_distance(&a, &[0.0, 0.0]).unwrap(), 1.0));
    }

    #[test]
    fn test_normalize() {
        let v = normalize_vector(&[3.0, 4.0]);
        assert!(approx_eq(magnitude(&v), 1.0));
        assert_eq!(normalize_vector(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_inner_product_distance() {
        assert!(approx_eq(
            inner_product_distance(&[1.0, 0.0], &[1.0, 0.0]).unwrap(),
            0.0
        ));
    }
}
