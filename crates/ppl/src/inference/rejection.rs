use std::fmt::Debug;

use rand::{Rng, RngCore};
use tracing::{debug, warn};

use crate::dynamic::DynamicGenerativeFunction;
use crate::error::{PplError, Result};
use crate::gfi::{GenerativeFunction, Trace};
use crate::posterior::{InferenceStats, Posterior};
use crate::value::Value;

/// Rejection sampling.
///
/// Without `max_score` only hard conditions are supported: an execution is
/// kept when its score is finite, and a finite non-zero likelihood is a
/// [`PplError::SoftConditioning`] error. With `max_score`, an execution
/// with likelihood `l` is kept with probability `exp(l - max_score)`.
pub fn rejection<A, R>(
    gen_fn: &DynamicGenerativeFunction<A, R>,
    args: &A,
    samples: usize,
    max_attempts: usize,
    max_score: Option<f64>,
    rng: &mut dyn RngCore,
) -> Result<Posterior>
where
    A: Clone + Debug + 'static,
    R: Clone + Debug + Into<Value> + 'static,
{
    let mut accepted: Vec<Value> = Vec::with_capacity(samples);
    let mut attempts = 0;

    while accepted.len() < samples {
        if attempts == max_attempts {
            warn!(
                accepted = accepted.len(),
                wanted = samples,
                attempts,
                "rejection sampling gave up"
            );
            return Err(PplError::RejectionExhausted {
                accepted: accepted.len(),
                wanted: samples,
                attempts,
            });
        }
        attempts += 1;

        let trace = gen_fn.simulate(rng, args.clone())?;
        if trace.get_score() == f64::NEG_INFINITY {
            continue;
        }

        let likelihood = trace.get_likelihood();
        let keep = match max_score {
            None if likelihood != 0.0 => return Err(PplError::SoftConditioning(likelihood)),
            None => true,
            Some(bound) => rng.gen::<f64>().ln() < likelihood - bound,
        };
        if keep {
            accepted.push(trace.get_retval().clone().into());
        }
    }

    let rate = accepted.len() as f64 / attempts.max(1) as f64;
    debug!(attempts, accepted = accepted.len(), rate, "rejection sampling complete");

    Ok(Posterior::from_samples(accepted)?.with_stats(InferenceStats {
        method: "rejection".to_string(),
        executions: attempts,
        samples,
        acceptance_rate: Some(rate),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{Bernoulli, Distribution, Gaussian};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_coins() -> DynamicGenerativeFunction<(), bool> {
        DynamicGenerativeFunction::new("two-coins", |ctx, _: &()| {
            let coin = Bernoulli::new(0.5)?;
            let a = ctx.sample_bool("a", &coin)?;
            let b = ctx.sample_bool("b", &coin)?;
            ctx.condition(a || b);
            Ok(a)
        })
    }

    #[test]
    fn test_hard_conditions() {
        let mut rng = StdRng::seed_from_u64(42);
        let post = rejection(&two_coins(), &(), 5000, 1_000_000, None, &mut rng).unwrap();
        assert!((post.prob(&Value::Boolean(true)) - 2.0 / 3.0).abs() < 0.03);
        let stats = post.stats().unwrap();
        assert_eq!(stats.samples, 5000);
        assert!((stats.acceptance_rate.unwrap() - 0.75).abs() < 0.03);
    }

    #[test]
    fn test_exhausted() {
        let model = DynamicGenerativeFunction::new("never", |ctx, _: &()| {
            ctx.condition(false);
            Ok(true)
        });
        let mut rng = StdRng::seed_from_u64(0);
        let err = rejection(&model, &(), 1, 20, None, &mut rng).unwrap_err();
        assert_eq!(
            err,
            PplError::RejectionExhausted {
                accepted: 0,
                wanted: 1,
                attempts: 20
            }
        );
    }

    #[test]
    fn test_soft_evidence_needs_bound() {
        // mu ~ N(0, 1), observe 1.0 ~ N(mu, 1): posterior N(0.5, 1/2)
        let model = DynamicGenerativeFunction::new("soft", |ctx, _: &()| {
            let mu = ctx.sample_float("mu", &Gaussian::new(0.0, 1.0)?)?;
            ctx.observe("y", &Gaussian::new(mu, 1.0)?, 1.0)?;
            Ok(mu)
        });
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            rejection(&model, &(), 10, 100, None, &mut rng),
            Err(PplError::SoftConditioning(_))
        ));

        let bound = Gaussian::new(0.0, 1.0).unwrap().log_prob(&Value::Float(0.0)).unwrap();
        let post = rejection(&model, &(), 4000, 1_000_000, Some(bound), &mut rng).unwrap();
        assert!((post.mean().unwrap() - 0.5).abs() < 0.05);
        assert!((post.variance().unwrap() - 0.5).abs() < 0.05);
    }
}
