use crate::address::Address;
use crate::gfi::Trace;

/// Computes log-sum-exp of a slice of f64 values using the "log-sum-exp trick".
pub fn logsumexp(x: &[f64]) -> f64 {
    let mx = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if mx == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum_exp: f64 = x.iter().map(|&lp| (lp - mx).exp()).sum();
    mx + sum_exp.ln()
}

/// Normalise log weights into probabilities. Returns `None` when every
/// weight is `-inf`.
pub fn normalize_log_weights(log_weights: &[f64]) -> Option<Vec<f64>> {
    let total = logsumexp(log_weights);
    if !total.is_finite() {
        return None;
    }
    Some(log_weights.iter().map(|&lw| (lw - total).exp()).collect())
}

/// Compute the mean and variance of a given address in the history
pub fn compute_mean_and_variance<T: Trace>(history: &[T], addr: &Address) -> (f64, f64) {
    let values: Vec<f64> = history
        .iter()
        .filter_map(|t| t.get_value(addr).and_then(|v| v.as_float()))
        .collect();

    if values.is_empty() {
        return (0.0, 0.0);
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, variance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logsumexp() {
        let lse = logsumexp(&[0.0f64.ln(), 1.0f64.ln(), 3.0f64.ln()]);
        assert!((lse - 4.0f64.ln()).abs() < 1e-12);
        assert_eq!(logsumexp(&[f64::NEG_INFINITY]), f64::NEG_INFINITY);
        assert!((logsumexp(&[1000.0, 1000.0]) - (1000.0 + 2.0f64.ln())).abs() < 1e-9);
    }

    #[test]
    fn test_normalize() {
        let p = normalize_log_weights(&[0.5f64.ln(), 1.5f64.ln()]).unwrap();
        assert!((p[0] - 0.25).abs() < 1e-12);
        assert!((p[1] - 0.75).abs() < 1e-12);
        assert!(normalize_log_weights(&[f64::NEG_INFINITY, f64::NEG_INFINITY]).is_none());
    }
}
