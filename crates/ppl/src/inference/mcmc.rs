//! Metropolis-Hastings kernels.
//!
//! [`metropolis_hastings`] resamples a selection from the prior through
//! `regenerate`; [`metropolis_hastings_with_proposal`] moves a trace with a
//! custom [`Proposal`] through `update`. [`single_site_step`] combines them
//! into the single-site kernel used by [`mcmc`].

use std::fmt::Debug;

use rand::{Rng, RngCore};
use tracing::{debug, warn};

use crate::address::{Address, Selection};
use crate::choice_map::ChoiceMap;
use crate::distributions::{Distribution, Gaussian};
use crate::dynamic::{DynamicGenerativeFunction, DynamicTrace};
use crate::error::{PplError, Result};
use crate::gfi::{ArgDiff, Trace};
use crate::inference::{Kernel, INIT_ATTEMPTS};
use crate::posterior::{InferenceStats, Posterior};
use crate::value::Value;

/// Accept a move with probability `min(1, exp(log_alpha))`.
fn accept(rng: &mut dyn RngCore, log_alpha: f64) -> bool {
    let u: f64 = rng.gen();
    u < log_alpha.exp()
}

/// MH update resampling `selection` from the prior (ancestral proposal).
pub fn metropolis_hastings<T: Trace>(
    rng: &mut dyn RngCore,
    trace: T,
    selection: &Selection,
) -> Result<(T, bool)> {
    let args = trace.get_args().clone();
    let (new_trace, weight, _) = trace.regenerate(rng, args, &[ArgDiff::NoChange], selection)?;

    if accept(rng, weight) {
        Ok((new_trace, true))
    } else {
        Ok((trace, false))
    }
}

/// A proposal distribution over new values for some choices of a trace.
pub trait Proposal<T: Trace> {
    /// Constraints to apply to `trace`, and the log probability of proposing them.
    fn propose(&self, rng: &mut dyn RngCore, trace: &T) -> Result<(ChoiceMap<Value>, f64)>;

    /// Log probability of proposing the constrained part of `discard`
    /// starting from `trace`. Choices the move removed are scored by
    /// [`metropolis_hastings_with_proposal`].
    fn assess(&self, trace: &T, discard: &ChoiceMap<Value>) -> Result<f64>;
}

/// MH update with a custom proposal.
pub fn metropolis_hastings_with_proposal<T, P>(
    rng: &mut dyn RngCore,
    trace: T,
    proposal: &P,
) -> Result<(T, bool)>
where
    T: Trace,
    P: Proposal<T>,
{
    let args = trace.get_args().clone();

    // Forward proposal
    let (fwd_choices, fwd_weight) = proposal.propose(rng, &trace)?;

    let (new_trace, weight, _, discard) =
        trace.update(rng, args, &[ArgDiff::NoChange], &fwd_choices)?;

    // Backward proposal. Reversing the move redraws the choices it removed
    // from their prior, just as `update` drew the choices it added.
    let dropped: Vec<Address> = discard
        .addresses()
        .into_iter()
        .filter(|addr| !fwd_choices.contains(addr))
        .collect();
    let bwd_weight =
        proposal.assess(&new_trace, &discard)? + trace.project(&Selection::from(dropped));

    let alpha = weight - fwd_weight + bwd_weight;

    if accept(rng, alpha) {
        Ok((new_trace, true))
    } else {
        Ok((trace, false))
    }
}

/// Gaussian random walk on one continuous choice.
///
/// The log probabilities include picking `site` uniformly among the latent
/// choices of the trace, so the move stays reversible when the number of
/// choices changes.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianDrift {
    pub site: Address,
    pub scale: f64,
}

impl GaussianDrift {
    pub fn new(site: Address, scale: f64) -> Self {
        Self { site, scale }
    }
}

fn site_log_prob<A, R>(trace: &DynamicTrace<A, R>) -> f64 {
    -(trace.latent_addresses().len().max(1) as f64).ln()
}

impl<A, R> Proposal<DynamicTrace<A, R>> for GaussianDrift
where
    A: Clone + Debug + 'static,
    R: Clone + Debug + 'static,
{
    fn propose(
        &self,
        rng: &mut dyn RngCore,
        trace: &DynamicTrace<A, R>,
    ) -> Result<(ChoiceMap<Value>, f64)> {
        let current = trace
            .get_choice_value(&self.site)
            .ok_or_else(|| PplError::MissingAddress(self.site.clone()))?
            .to_float()?;
        let step = Gaussian::new(current, self.scale)?;
        let proposed = step.sample_dyn(rng);
        let log_prob = step.log_prob(&proposed)? + site_log_prob(trace);

        let mut constraints = ChoiceMap::new();
        constraints.insert(self.site.clone(), proposed);
        Ok((constraints, log_prob))
    }

    fn assess(&self, trace: &DynamicTrace<A, R>, discard: &ChoiceMap<Value>) -> Result<f64> {
        let previous = discard
            .get(&self.site)
            .ok_or_else(|| PplError::MissingAddress(self.site.clone()))?;
        let current = trace
            .get_choice_value(&self.site)
            .ok_or_else(|| PplError::MissingAddress(self.site.clone()))?
            .to_float()?;
        let step = Gaussian::new(current, self.scale)?;
        Ok(step.log_prob(previous)? + site_log_prob(trace))
    }
}

/// One single-site move: pick a latent choice uniformly and either drift it
/// (continuous choices under [`Kernel::Drift`]) or resample it from its
/// prior.
pub fn single_site_step<A, R>(
    rng: &mut dyn RngCore,
    trace: DynamicTrace<A, R>,
    kernel: Kernel,
) -> Result<(DynamicTrace<A, R>, bool)>
where
    A: Clone + Debug + 'static,
    R: Clone + Debug + 'static,
{
    let sites = trace.latent_addresses();
    if sites.is_empty() {
        return Ok((trace, false));
    }
    let site = sites[rng.gen_range(0..sites.len())].clone();

    if let Kernel::Drift { scale } = kernel {
        if let Some(Value::Float(_)) = trace.get_choice_value(&site) {
            return metropolis_hastings_with_proposal(rng, trace, &GaussianDrift::new(site, scale));
        }
    }

    let args = trace.get_args().clone();
    let (new_trace, weight, _) =
        trace.regenerate(rng, args, &[ArgDiff::NoChange], &Selection::from(site))?;

    // Reverse move picks the site among the new trace's choices.
    let n_old = sites.len() as f64;
    let n_new = new_trace.latent_addresses().len().max(1) as f64;
    let alpha = weight + n_old.ln() - n_new.ln();

    if accept(rng, alpha) {
        Ok((new_trace, true))
    } else {
        Ok((trace, false))
    }
}

/// Run a single-site Markov chain and collect the return value every `lag`
/// steps after `burn` steps of warm-up.
pub fn mcmc<A, R>(
    gen_fn: &DynamicGenerativeFunction<A, R>,
    args: &A,
    samples: usize,
    burn: usize,
    lag: usize,
    kernel: Kernel,
    rng: &mut dyn RngCore,
) -> Result<Posterior>
where
    A: Clone + Debug + 'static,
    R: Clone + Debug + Into<Value> + 'static,
{
    let lag = lag.max(1);
    let mut trace = gen_fn.simulate_finite(rng, args, INIT_ATTEMPTS)?;
    let steps = burn + samples * lag;

    let mut values: Vec<Value> = Vec::with_capacity(samples);
    let mut accepted = 0usize;

    for step in 0..steps {
        let (next, was_accepted) = single_site_step(rng, trace, kernel)?;
        trace = next;
        if was_accepted {
            accepted += 1;
        }
        if step >= burn && (step - burn + 1) % lag == 0 {
            values.push(trace.get_retval().clone().into());
        }
    }

    let rate = accepted as f64 / steps.max(1) as f64;
    debug!(steps, accepted, rate, "mcmc complete");
    if steps > 0 && rate < 0.01 {
        warn!(rate, "low mcmc acceptance rate");
    }

    Ok(Posterior::from_samples(values)?.with_stats(InferenceStats {
        method: "mcmc".to_string(),
        executions: steps,
        samples,
        acceptance_rate: Some(rate),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{Bernoulli, RandomInteger};
    use crate::gfi::GenerativeFunction;
    use crate::sym;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn normal_mean() -> DynamicGenerativeFunction<Vec<f64>, f64> {
        DynamicGenerativeFunction::new("normal-mean", |ctx, data: &Vec<f64>| {
            let mu = ctx.sample_float("mu", &Gaussian::new(0.0, 1.0)?)?;
            for (i, &y) in data.iter().enumerate() {
                ctx.observe(crate::path!("y", i), &Gaussian::new(mu, 1.0)?, y)?;
            }
            Ok(mu)
        })
    }

    #[test]
    fn test_empty_selection_is_always_accepted() {
        let mut rng = StdRng::seed_from_u64(0);
        let trace = normal_mean().simulate(&mut rng, vec![1.0]).unwrap();
        let (next, accepted) = metropolis_hastings(&mut rng, trace.clone(), &Selection::None).unwrap();
        assert!(accepted);
        assert_eq!(next.get_retval(), trace.get_retval());
        assert_eq!(next.get_score(), trace.get_score());
    }

    #[test]
    fn test_drift_round_trip_weights() {
        let mut rng = StdRng::seed_from_u64(1);
        let trace = normal_mean().simulate(&mut rng, vec![0.5, 1.5]).unwrap();
        let drift = GaussianDrift::new(sym!(mu), 0.3);
        let (constraints, fwd) = drift.propose(&mut rng, &trace).unwrap();
        let (moved, _, _, discard) = trace
            .update(&mut rng, vec![0.5, 1.5], &[ArgDiff::NoChange], &constraints)
            .unwrap();
        let bwd = drift.assess(&moved, &discard).unwrap();
        // symmetric random walk over a single site
        assert!((fwd - bwd).abs() < 1e-12);
        assert_eq!(discard.get(&sym!(mu)), trace.get_choice_value(&sym!(mu)).as_ref());
    }

    #[test]
    fn test_mcmc_normal_mean() {
        // posterior of mu given 4 observations at 1.0: N(0.8, 1/5)
        let data = vec![1.0; 4];
        for kernel in [Kernel::Mh, Kernel::Drift { scale: 0.5 }] {
            let mut rng = StdRng::seed_from_u64(17);
            let post = mcmc(&normal_mean(), &data, 20_000, 1000, 1, kernel, &mut rng).unwrap();
            assert!((post.mean().unwrap() - 0.8).abs() < 0.05, "{:?}", kernel);
            assert!((post.variance().unwrap() - 0.2).abs() < 0.04, "{:?}", kernel);
            let rate = post.stats().unwrap().acceptance_rate.unwrap();
            assert!(rate > 0.1 && rate < 1.0);
        }
    }

    #[test]
    fn test_mcmc_discrete() {
        let model = DynamicGenerativeFunction::new("two-coins", |ctx, _: &()| {
            let coin = Bernoulli::new(0.5)?;
            let a = ctx.sample_bool("a", &coin)?;
            let b = ctx.sample_bool("b", &coin)?;
            ctx.condition(a || b);
            Ok(a)
        });
        let mut rng = StdRng::seed_from_u64(23);
        let post = mcmc(&model, &(), 20_000, 500, 2, Kernel::Drift { scale: 1.0 }, &mut rng).unwrap();
        assert!((post.prob(&Value::Boolean(true)) - 2.0 / 3.0).abs() < 0.03);
    }

    fn optional_site() -> DynamicGenerativeFunction<(), bool> {
        DynamicGenerativeFunction::new("optional-site", |ctx, _: &()| {
            let x = ctx.sample_float("x", &Gaussian::new(0.0, 1.0)?)?;
            if x > 0.0 {
                ctx.sample_float("y", &Gaussian::new(0.0, 0.1)?)?;
            }
            Ok(x > 0.0)
        })
    }

    #[test]
    fn test_mcmc_keeps_prior_when_sites_appear_and_vanish() {
        for kernel in [Kernel::Mh, Kernel::Drift { scale: 0.5 }] {
            let mut rng = StdRng::seed_from_u64(3);
            let post = mcmc(&optional_site(), &(), 200_000, 1000, 1, kernel, &mut rng).unwrap();
            let p = post.prob(&Value::Boolean(true));
            assert!((p - 0.5).abs() < 0.03, "{:?}: P(x > 0) = {}", kernel, p);
        }
    }

    #[test]
    fn test_removed_site_scored_in_reverse_move() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut trace = optional_site().simulate(&mut rng, ()).unwrap();
        while !*trace.get_retval() {
            trace = optional_site().simulate(&mut rng, ()).unwrap();
        }

        let mut constraints = ChoiceMap::new();
        constraints.insert(sym!(x), Value::Float(-0.5));
        let (moved, weight, _, discard) = trace
            .update(&mut rng, (), &[ArgDiff::NoChange], &constraints)
            .unwrap();
        assert!(!moved.has_choice(&sym!(y)));
        assert!(discard.contains(&sym!(y)));

        // The weight charges y's prior score to the move; reversing it
        // redraws y, so only x's change remains once that is added back.
        let y_score = trace.get_choice_score(&sym!(y)).unwrap();
        let x_old = trace.get_choice_score(&sym!(x)).unwrap();
        let x_new = Gaussian::new(0.0, 1.0).unwrap().log_prob(&Value::Float(-0.5)).unwrap();
        assert!((weight - (x_new - x_old - y_score)).abs() < 1e-9);
        let dropped = trace.project(&Selection::from(sym!(y)));
        assert!((weight + dropped - (x_new - x_old)).abs() < 1e-9);
    }

    #[test]
    fn test_mcmc_initialization_failure() {
        let model = DynamicGenerativeFunction::new("never", |ctx, _: &()| {
            let x = ctx.sample_int("x", &RandomInteger::new(3)?)?;
            ctx.condition(x > 10);
            Ok(x)
        });
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            mcmc(&model, &(), 10, 0, 1, Kernel::Mh, &mut rng).unwrap_err(),
            PplError::InitializationFailed(INIT_ATTEMPTS)
        );
    }
}
