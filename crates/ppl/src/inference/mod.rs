//! Inference over dynamic generative functions.
//!
//! [`infer`] runs a model under one of the [`Method`]s and aggregates the
//! return values of the accepted or weighted executions into a
//! [`Posterior`]. The MCMC building blocks are exported on their own so
//! they can be composed into custom kernels.

mod enumerate;
mod importance;
mod mcmc;
mod rejection;

use std::fmt::{self, Debug};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dynamic::DynamicGenerativeFunction;
use crate::error::{PplError, Result};
use crate::posterior::Posterior;
use crate::value::Value;

pub use enumerate::enumerate;
pub use importance::{forward, likelihood_weighting};
pub use mcmc::{
    mcmc, metropolis_hastings, metropolis_hastings_with_proposal, single_site_step,
    GaussianDrift, Proposal,
};
pub use rejection::rejection;

/// Upper bound on the simulations used to find a starting trace for MCMC.
pub const INIT_ATTEMPTS: usize = 1000;

/// Transition kernel used by [`Method::Mcmc`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    /// Resample one uniformly chosen choice from its prior.
    Mh,
    /// Like `Mh`, but continuous choices take a Gaussian random-walk step of
    /// standard deviation `scale` instead of a fresh prior draw.
    Drift { scale: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    /// Exact enumeration of every execution path.
    Enumerate { max_executions: usize },
    /// Keep executions whose conditions hold. With `max_score`, soft
    /// evidence is accepted with probability `exp(likelihood - max_score)`.
    Rejection {
        samples: usize,
        max_attempts: usize,
        max_score: Option<f64>,
    },
    LikelihoodWeighting { samples: usize },
    Mcmc {
        samples: usize,
        burn: usize,
        lag: usize,
        kernel: Kernel,
    },
    /// Sample the prior, ignoring every observation and condition.
    Forward { samples: usize },
}

impl Method {
    pub fn enumerate() -> Self {
        Method::Enumerate {
            max_executions: 100_000,
        }
    }

    pub fn rejection(samples: usize) -> Self {
        Method::Rejection {
            samples,
            max_attempts: 10_000_000,
            max_score: None,
        }
    }

    pub fn likelihood_weighting(samples: usize) -> Self {
        Method::LikelihoodWeighting { samples }
    }

    pub fn mcmc(samples: usize) -> Self {
        Method::Mcmc {
            samples,
            burn: 0,
            lag: 1,
            kernel: Kernel::Mh,
        }
    }

    pub fn forward(samples: usize) -> Self {
        Method::Forward { samples }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Method::Enumerate { .. } => "enumerate",
            Method::Rejection { .. } => "rejection",
            Method::LikelihoodWeighting { .. } => "likelihood_weighting",
            Method::Mcmc { .. } => "mcmc",
            Method::Forward { .. } => "forward",
        }
    }

    /// Copy of this method drawing `samples` samples. Enumeration is exact
    /// and is returned unchanged.
    pub fn with_samples(&self, n: usize) -> Self {
        let mut method = self.clone();
        match &mut method {
            Method::Enumerate { .. } => {}
            Method::Rejection { samples, .. }
            | Method::LikelihoodWeighting { samples }
            | Method::Mcmc { samples, .. }
            | Method::Forward { samples } => *samples = n,
        }
        method
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Enumerate { max_executions } => {
                write!(f, "enumerate (max {} executions)", max_executions)
            }
            Method::Rejection { samples, .. } => write!(f, "rejection ({} samples)", samples),
            Method::LikelihoodWeighting { samples } => {
                write!(f, "likelihood weighting ({} samples)", samples)
            }
            Method::Mcmc {
                samples,
                burn,
                lag,
                kernel,
            } => write!(
                f,
                "mcmc {:?} ({} samples, burn {}, lag {})",
                kernel, samples, burn, lag
            ),
            Method::Forward { samples } => write!(f, "forward ({} samples)", samples),
        }
    }
}

/// Names accepted by [`Method::from_name`].
pub const METHOD_NAMES: [&str; 6] = [
    "enumerate",
    "rejection",
    "likelihood_weighting",
    "mh",
    "drift",
    "forward",
];

/// Tuning used when a method is picked by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodOptions {
    /// Samples to draw; 10 000 when unset.
    pub samples: Option<usize>,
    pub burn: usize,
    pub lag: usize,
    pub drift_scale: f64,
    pub max_executions: usize,
    pub max_attempts: usize,
    /// Bound on the log-likelihood, for rejection with soft evidence.
    pub max_score: Option<f64>,
}

impl Default for MethodOptions {
    fn default() -> Self {
        Self {
            samples: None,
            burn: 1000,
            lag: 1,
            drift_scale: 0.25,
            max_executions: 100_000,
            max_attempts: 10_000_000,
            max_score: None,
        }
    }
}

impl Method {
    /// Build the method called `name` (one of [`METHOD_NAMES`]).
    pub fn from_name(name: &str, options: &MethodOptions) -> Result<Self> {
        let samples = options.samples.unwrap_or(10_000);
        let chain = |kernel| Method::Mcmc {
            samples,
            burn: options.burn,
            lag: options.lag,
            kernel,
        };
        let method = match name.trim().to_ascii_lowercase().as_str() {
            "enumerate" => Method::Enumerate {
                max_executions: options.max_executions,
            },
            "rejection" => Method::Rejection {
                samples,
                max_attempts: options.max_attempts,
                max_score: options.max_score,
            },
            "likelihood_weighting" => Method::LikelihoodWeighting { samples },
            "mh" => chain(Kernel::Mh),
            "drift" => chain(Kernel::Drift {
                scale: options.drift_scale,
            }),
            "forward" => Method::Forward { samples },
            _ => return Err(PplError::UnknownMethod(name.to_string())),
        };
        Ok(method)
    }
}

/// Compute the distribution over the return value of `gen_fn` given the
/// conditions its body imposes.
pub fn infer<A, R>(
    gen_fn: &DynamicGenerativeFunction<A, R>,
    args: &A,
    method: &Method,
    rng: &mut dyn RngCore,
) -> Result<Posterior>
where
    A: Clone + Debug + 'static,
    R: Clone + Debug + Into<Value> + 'static,
{
    debug!(model = gen_fn.name(), method = %method, "starting inference");

    let posterior = match *method {
        Method::Enumerate { max_executions } => enumerate(gen_fn, args, max_executions)?,
        Method::Rejection {
            samples,
            max_attempts,
            max_score,
        } => rejection(gen_fn, args, samples, max_attempts, max_score, rng)?,
        Method::LikelihoodWeighting { samples } => likelihood_weighting(gen_fn, args, samples, rng)?,
        Method::Mcmc {
            samples,
            burn,
            lag,
            kernel,
        } => mcmc(gen_fn, args, samples, burn, lag, kernel, rng)?,
        Method::Forward { samples } => forward(gen_fn, args, samples, rng)?,
    };

    if let Some(stats) = posterior.stats() {
        info!(
            model = gen_fn.name(),
            method = %stats.method,
            executions = stats.executions,
            samples = stats.samples,
            support = posterior.len(),
            "inference finished"
        );
    }
    Ok(posterior)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_samples() {
        let method = Method::rejection(10).with_samples(50);
        assert_eq!(
            method,
            Method::Rejection {
                samples: 50,
                max_attempts: 10_000_000,
                max_score: None
            }
        );
        assert_eq!(Method::enumerate().with_samples(5), Method::enumerate());
        assert_eq!(Method::mcmc(1).name(), "mcmc");
    }

    #[test]
    fn test_from_name() {
        let options = MethodOptions {
            samples: Some(200),
            drift_scale: 0.5,
            ..MethodOptions::default()
        };
        assert_eq!(
            Method::from_name("drift", &options).unwrap(),
            Method::Mcmc {
                samples: 200,
                burn: 1000,
                lag: 1,
                kernel: Kernel::Drift { scale: 0.5 }
            }
        );
        assert_eq!(
            Method::from_name("Rejection", &MethodOptions::default()).unwrap(),
            Method::rejection(10_000)
        );
        for name in METHOD_NAMES {
            assert!(Method::from_name(name, &options).is_ok());
        }
        assert_eq!(
            Method::from_name("gibbs", &options).unwrap_err(),
            PplError::UnknownMethod("gibbs".to_string())
        );
    }
}
