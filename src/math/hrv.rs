//! HRV (Heart Rate Variability) Computation
//!
//! This module contains functions for calculating HRV metrics from RR intervals.
//! All functions are unit agnostic: results are in the unit of the input slice.
//! A `None` result means the input was too short for the metric, which callers
//! must keep apart from a computed value of zero.

use log::trace;
use nalgebra::{DMatrix, DVectorView};

/// `calc_rmssd` function.
///
/// Calculates RMSSD (Root Mean Square of Successive Differences).
///
/// # Arguments
/// - `data`: A slice of RR intervals.
///
/// # Returns
/// RMSSD value, or `None` if the slice has less than 2 elements.
pub fn calc_rmssd(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }

    let rr_points_a = DVectorView::from(&data[0..data.len() - 1]);
    let rr_points_b = DVectorView::from(&data[1..]);
    let successive_diffs = rr_points_b - rr_points_a;

    trace!(
        "Calculating RMSSD with successive differences: {:?}",
        successive_diffs
    );
    Some((successive_diffs.dot(&successive_diffs) / (successive_diffs.len() as f64)).sqrt())
}

/// `calc_sdnn` function.
///
/// Calculates SDNN, the sample standard deviation (N-1 denominator) of RR intervals.
///
/// # Arguments
/// - `data`: A slice of RR intervals.
///
/// # Returns
/// SDNN value, or `None` if the slice has less than 2 elements.
pub fn calc_sdnn(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }

    let n = data.len() as f64;
    // nalgebra's variance divides by N
    let variance = DVectorView::from(data).variance() * n / (n - 1.0);
    trace!("Calculating SDNN with sample variance: {}", variance);
    Some(variance.sqrt())
}

/// Results of Poincare plot metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PoincareMetrics {
    /// Short-term variability, spread perpendicular to the identity line.
    pub sd1: f64,
    pub sd1_eigenvector: [f64; 2],
    /// Long-term variability, spread along the identity line.
    pub sd2: f64,
    pub sd2_eigenvector: [f64; 2],
}

/// `calc_poincare_metrics` function.
///
/// Calculates Poincare plot metrics SD1 and SD2 with their eigenvectors.
///
/// # Arguments
/// - `data`: A slice of RR intervals.
///
/// # Returns
/// The metrics, or `None` with less than 3 intervals (two Poincare points are needed
/// for a covariance estimate).
pub fn calc_poincare_metrics(data: &[f64]) -> Option<PoincareMetrics> {
    if data.len() < 3 {
        return None;
    }

    let rr_points_a = DVectorView::from(&data[0..data.len() - 1]);
    let rr_points_b = DVectorView::from(&data[1..]);

    // Center the data
    let poincare_matrix = {
        let mut centered = DMatrix::from_columns(&[rr_points_a, rr_points_b]);
        let col_means = centered.row_mean();
        for mut row in centered.row_iter_mut() {
            row -= &col_means;
        }
        centered
    };

    trace!("Poincare matrix:\n{:?}", poincare_matrix);

    let poincare_cov =
        poincare_matrix.transpose() * &poincare_matrix / (poincare_matrix.nrows() as f64 - 1.0);
    let ev = nalgebra::SymmetricEigen::new(poincare_cov);

    // SD1 is the smaller axis by convention
    let (minor, major) = if ev.eigenvalues[0] <= ev.eigenvalues[1] {
        (0, 1)
    } else {
        (1, 0)
    };

    Some(PoincareMetrics {
        sd1: ev.eigenvalues[minor].max(0.0).sqrt(),
        sd1_eigenvector: [ev.eigenvectors.column(minor)[0], ev.eigenvectors.column(minor)[1]],
        sd2: ev.eigenvalues[major].max(0.0).sqrt(),
        sd2_eigenvector: [ev.eigenvectors.column(major)[0], ev.eigenvectors.column(major)[1]],
    })
}

/// Builds the time-delay embedding of `data`.
///
/// Row `r` holds `data[r..r + dimension]`, so the matrix has `data.len() - dimension + 1` rows.
/// Returns `None` if fewer than two rows can be formed.
pub fn embed(data: &[f64], dimension: usize) -> Option<DMatrix<f64>> {
    if dimension == 0 || data.len() < dimension + 1 {
        return None;
    }
    let rows = data.len() - dimension + 1;
    Some(DMatrix::from_fn(rows, dimension, |r, c| data[r + c]))
}

/// `calc_embedding_singular_values` function.
///
/// Computes the singular values of the time-delay embedding of `data`.
///
/// # Arguments
/// - `data`: A slice of RR intervals.
/// - `dimension`: The embedding dimension (row length).
///
/// # Returns
/// Singular values in descending order, or `None` if the embedding has less than two rows
/// or the decomposition does not converge.
pub fn calc_embedding_singular_values(data: &[f64], dimension: usize) -> Option<Vec<f64>> {
    let embedding = embed(data, dimension)?;
    trace!("Embedding matrix:\n{:?}", embedding);

    let svd = embedding.try_svd(false, false, f64::EPSILON, 1000)?;
    let mut singular_values: Vec<f64> = svd.singular_values.iter().copied().collect();
    singular_values.sort_by(|a, b| b.total_cmp(a));
    Some(singular_values)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RR: [f64; 5] = [0.8, 0.85, 0.75, 0.9, 0.82];

    #[test]
    fn test_rmssd() {
        let rmssd = calc_rmssd(&RR).unwrap();
        assert!((rmssd * 1000.0 - 101.73).abs() < 0.05, "got {}", rmssd);
    }

    #[test]
    fn test_rmssd_insufficient() {
        assert!(calc_rmssd(&[0.8]).is_none());
        assert!(calc_rmssd(&[]).is_none());
    }

    #[test]
    fn test_sdnn_uses_sample_variance() {
        let sdnn = calc_sdnn(&RR).unwrap();
        assert!((sdnn * 1000.0 - 55.95).abs() < 0.05, "got {}", sdnn);
    }

    #[test]
    fn test_sdnn_constant_is_zero() {
        assert_eq!(calc_sdnn(&[0.9, 0.9, 0.9]), Some(0.0));
        assert!(calc_sdnn(&[0.9]).is_none());
    }

    #[test]
    fn test_poincare_metrics() {
        let data = [1000.0, 1010.0, 1001.0, 1030.0, 1049.0];
        let poincare = calc_poincare_metrics(&data).unwrap();
        assert!(poincare.sd1 <= poincare.sd2);
        assert!(poincare.sd1 > 0.0, "SD1 should be positive.");
        assert!(poincare.sd2 > 0.0, "SD2 should be positive.");
        assert!(
            poincare.sd2_eigenvector[0] != 0.0,
            "SD2 eigenvector should not be zero."
        );
    }

    #[test]
    fn test_poincare_metrics_insufficient() {
        assert!(calc_poincare_metrics(&[1000.0, 1010.0]).is_none());
    }

    #[test]
    fn test_embed_shape() {
        let m = embed(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 3);
        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(2, 2)], 5.0);
        assert_eq!(m[(1, 0)], 2.0);
        assert!(embed(&[1.0, 2.0, 3.0], 3).is_none());
    }

    #[test]
    fn test_singular_values_sorted() {
        let sv = calc_embedding_singular_values(&RR, 3).unwrap();
        assert_eq!(sv.len(), 3);
        assert!(sv.windows(2).all(|w| w[0] >= w[1]));
        assert!(sv[0] > 0.0);
    }

    #[test]
    fn test_singular_values_rank_one() {
        // identical rows give a single non-zero singular value
        let sv = calc_embedding_singular_values(&[0.8; 6], 3).unwrap();
        assert!(sv[0] > 0.0);
        assert!(sv[1].abs() < 1e-9);
    }
}
