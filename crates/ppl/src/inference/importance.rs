use std::fmt::Debug;

use rand::RngCore;
use tracing::debug;

use crate::dynamic::handlers::PriorHandler;
use crate::dynamic::DynamicGenerativeFunction;
use crate::error::Result;
use crate::gfi::{GenerativeFunction, Trace};
use crate::posterior::{InferenceStats, Posterior};
use crate::utils::logsumexp;
use crate::value::Value;

/// Importance sampling with the prior as proposal: each execution is
/// weighted by its observations and factors.
pub fn likelihood_weighting<A, R>(
    gen_fn: &DynamicGenerativeFunction<A, R>,
    args: &A,
    samples: usize,
    rng: &mut dyn RngCore,
) -> Result<Posterior>
where
    A: Clone + Debug + 'static,
    R: Clone + Debug + Into<Value> + 'static,
{
    let mut weighted = Vec::with_capacity(samples);
    for _ in 0..samples {
        let trace = gen_fn.simulate(rng, args.clone())?;
        weighted.push((trace.get_retval().clone().into(), trace.get_likelihood()));
    }

    let log_weights: Vec<f64> = weighted.iter().map(|(_, lw)| *lw).collect();
    let log_evidence = logsumexp(&log_weights) - (samples.max(1) as f64).ln();
    debug!(samples, log_evidence, "likelihood weighting complete");

    Ok(Posterior::from_log_weighted(weighted)?.with_stats(InferenceStats {
        method: "likelihood_weighting".to_string(),
        executions: samples,
        samples,
        acceptance_rate: None,
    }))
}

/// Draw return values from the prior, ignoring observations and conditions.
pub fn forward<A, R>(
    gen_fn: &DynamicGenerativeFunction<A, R>,
    args: &A,
    samples: usize,
    rng: &mut dyn RngCore,
) -> Result<Posterior>
where
    A: Clone + Debug + 'static,
    R: Clone + Debug + Into<Value> + 'static,
{
    let mut values: Vec<Value> = Vec::with_capacity(samples);
    for _ in 0..samples {
        let mut handler = PriorHandler::new(rng);
        values.push(gen_fn.execute(&mut handler, args)?.into());
    }
    debug!(samples, "forward sampling complete");

    Ok(Posterior::from_samples(values)?.with_stats(InferenceStats {
        method: "forward".to_string(),
        executions: samples,
        samples,
        acceptance_rate: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{Bernoulli, Gaussian};
    use crate::error::PplError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn wet_grass() -> DynamicGenerativeFunction<(), bool> {
        DynamicGenerativeFunction::new("wet-grass", |ctx, _: &()| {
            let rain = ctx.sample_bool("rain", &Bernoulli::new(0.3)?)?;
            let p = if rain { 0.9 } else { 0.1 };
            ctx.observe("wet", &Bernoulli::new(p)?, true)?;
            Ok(rain)
        })
    }

    #[test]
    fn test_likelihood_weighting() {
        let mut rng = StdRng::seed_from_u64(11);
        let post = likelihood_weighting(&wet_grass(), &(), 20_000, &mut rng).unwrap();
        // 0.27 / (0.27 + 0.07)
        let exact = 0.27 / 0.34;
        assert!((post.prob(&Value::Boolean(true)) - exact).abs() < 0.02);
    }

    #[test]
    fn test_forward_ignores_evidence() {
        let mut rng = StdRng::seed_from_u64(5);
        let post = forward(&wet_grass(), &(), 20_000, &mut rng).unwrap();
        assert!((post.prob(&Value::Boolean(true)) - 0.3).abs() < 0.02);

        let impossible = DynamicGenerativeFunction::new("impossible", |ctx, _: &()| {
            let x = ctx.sample_float("x", &Gaussian::new(0.0, 1.0)?)?;
            ctx.condition(false);
            Ok(x)
        });
        assert!(forward(&impossible, &(), 10, &mut rng).is_ok());
        assert_eq!(
            likelihood_weighting(&impossible, &(), 10, &mut rng).unwrap_err(),
            PplError::ZeroProbability
        );
    }
}
