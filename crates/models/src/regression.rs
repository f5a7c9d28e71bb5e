//! Bayesian linear regression with Gaussian priors and noise.
//!
//! The data set was generated from slope 3 and intercept 6 with jittered
//! inputs; [`simulate_data`] reproduces that generator.

use nalgebra::{Matrix2, Vector2};
use ndarray::Array1;
use rand::distributions::Distribution as _;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

use ppl::{path, DynamicGenerativeFunction, Gaussian, Kernel, Method, PplError, Result};

pub const LABELS: &[&str] = &["slope", "intercept"];

pub const DATA_X: [f64; 11] = [
    -0.38, 1.35, 1.78, 3.38, 4.08, 5.27, 5.91, 6.52, 7.89, 8.99, 10.06,
];
pub const DATA_Y: [f64; 11] = [
    7.69, 13.30, 10.33, 16.06, 16.36, 17.65, 21.52, 23.77, 26.12, 41.85, 32.96,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionArgs {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Standard deviation of the slope and intercept priors.
    pub prior_sigma: f64,
    pub noise_sigma: f64,
}

impl Default for RegressionArgs {
    fn default() -> Self {
        Self {
            x: DATA_X.to_vec(),
            y: DATA_Y.to_vec(),
            prior_sigma: 10.0,
            noise_sigma: 1.0,
        }
    }
}

pub fn model() -> DynamicGenerativeFunction<RegressionArgs, Vec<f64>> {
    DynamicGenerativeFunction::new("regression", |ctx, args: &RegressionArgs| {
        if args.x.len() != args.y.len() {
            return Err(PplError::Model(format!(
                "{} inputs but {} outputs",
                args.x.len(),
                args.y.len()
            )));
        }

        let prior = Gaussian::new(0.0, args.prior_sigma)?;
        let slope = ctx.sample_float("slope", &prior)?;
        let intercept = ctx.sample_float("intercept", &prior)?;

        for (i, (&x, &y)) in args.x.iter().zip(&args.y).enumerate() {
            let mu = x * slope + intercept;
            ctx.observe(path!("y", i), &Gaussian::new(mu, args.noise_sigma)?, y)?;
        }

        Ok(vec![slope, intercept])
    })
}

pub fn default_method() -> Method {
    Method::Mcmc {
        samples: 10_000,
        burn: 1000,
        lag: 1,
        kernel: Kernel::Mh,
    }
}

/// Exact Gaussian posterior over `(slope, intercept)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPosterior {
    pub mean: Vector2<f64>,
    pub covariance: Matrix2<f64>,
}

impl LinearPosterior {
    pub fn slope(&self) -> f64 {
        self.mean[0]
    }

    pub fn intercept(&self) -> f64 {
        self.mean[1]
    }

    pub fn slope_sd(&self) -> f64 {
        self.covariance[(0, 0)].sqrt()
    }

    pub fn intercept_sd(&self) -> f64 {
        self.covariance[(1, 1)].sqrt()
    }
}

/// Conjugate update: precision `XᵀX / σ² + I / τ²`, mean `Σ Xᵀy / σ²`, with
/// design rows `[x, 1]`.
pub fn analytic_posterior(args: &RegressionArgs) -> Result<LinearPosterior> {
    let noise_precision = args.noise_sigma.powi(-2);
    let prior_precision = args.prior_sigma.powi(-2);

    let mut xtx = Matrix2::<f64>::identity() * prior_precision;
    let mut xty = Vector2::<f64>::zeros();
    for (&x, &y) in args.x.iter().zip(&args.y) {
        let row = Vector2::new(x, 1.0);
        xtx += row * row.transpose() * noise_precision;
        xty += row * y * noise_precision;
    }

    let covariance = xtx
        .try_inverse()
        .ok_or_else(|| PplError::Model("posterior precision is singular".to_string()))?;
    Ok(LinearPosterior {
        mean: covariance * xty,
        covariance,
    })
}

/// `n` evenly spaced inputs on `[0, 10]` jittered by `x_noise`, with
/// outputs `slope * x + intercept` plus `y_noise` noise.
pub fn simulate_data(
    rng: &mut dyn RngCore,
    n: usize,
    slope: f64,
    intercept: f64,
    x_noise: f64,
    y_noise: f64,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let x_jitter =
        Normal::new(0.0, x_noise).map_err(|e| PplError::invalid("gaussian", e.to_string()))?;
    let y_jitter =
        Normal::new(0.0, y_noise).map_err(|e| PplError::invalid("gaussian", e.to_string()))?;

    let jitter: Array1<f64> = (0..n).map(|_| x_jitter.sample(rng)).collect();
    let x = Array1::linspace(0.0, 10.0, n) + jitter;
    let y = x.mapv(|v| v * slope + intercept + y_jitter.sample(rng));
    Ok((x.to_vec(), y.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppl::{infer, Value};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_analytic_posterior() {
        let post = analytic_posterior(&RegressionArgs::default()).unwrap();
        assert!((post.slope() - 2.8288).abs() < 1e-3);
        assert!((post.intercept() - 6.5804).abs() < 1e-3);
        assert!((post.slope_sd() - 0.0956).abs() < 1e-3);
        assert!((post.intercept_sd() - 0.5635).abs() < 1e-3);
    }

    #[test]
    fn test_mismatched_data_is_an_error() {
        let args = RegressionArgs {
            y: vec![1.0],
            ..RegressionArgs::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            infer(&model(), &args, &Method::forward(1), &mut rng),
            Err(PplError::Model(_))
        ));
    }

    #[test]
    fn test_simulate_data_recovers_generator() {
        let mut rng = StdRng::seed_from_u64(12);
        let (x, y) = simulate_data(&mut rng, 200, 3.0, 6.0, 0.3, 1.0).unwrap();
        assert_eq!(x.len(), 200);
        let args = RegressionArgs {
            x,
            y,
            ..RegressionArgs::default()
        };
        let post = analytic_posterior(&args).unwrap();
        assert!((post.slope() - 3.0).abs() < 0.1);
        assert!((post.intercept() - 6.0).abs() < 0.5);
    }

    #[test]
    fn test_drift_mcmc_matches_analytic() {
        let args = RegressionArgs::default();
        let exact = analytic_posterior(&args).unwrap();
        let method = Method::Mcmc {
            samples: 20_000,
            burn: 10_000,
            lag: 1,
            kernel: Kernel::Drift { scale: 0.25 },
        };
        let mut rng = StdRng::seed_from_u64(2);
        let post = infer(&model(), &args, &method, &mut rng).unwrap();
        let mean = post.mean_vector().unwrap();
        assert!((mean[0] - exact.slope()).abs() < 0.1);
        assert!((mean[1] - exact.intercept()).abs() < 0.5);
        assert!(matches!(post.support()[0], Value::List(_)));
    }
}
