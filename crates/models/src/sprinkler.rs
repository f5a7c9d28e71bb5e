//! The cloudy / rain / sprinkler / wet-grass Bayesian network.

use serde::{Deserialize, Serialize};

use ppl::{Bernoulli, DynamicGenerativeFunction, Method};

pub const LABELS: &[&str] = &["cloudy", "raining", "sprinkler"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprinklerArgs {
    /// Observed state of the grass.
    pub grass_wet: bool,
}

impl Default for SprinklerArgs {
    fn default() -> Self {
        Self { grass_wet: true }
    }
}

fn p_raining(cloudy: bool) -> f64 {
    if cloudy {
        0.8
    } else {
        0.2
    }
}

fn p_sprinkler(cloudy: bool) -> f64 {
    if cloudy {
        0.1
    } else {
        0.5
    }
}

fn p_grass_wet(raining: bool, sprinkler: bool) -> f64 {
    match (raining, sprinkler) {
        (true, true) => 0.99,
        (true, false) | (false, true) => 0.9,
        (false, false) => 0.01,
    }
}

/// Returns `[cloudy, raining, sprinkler]` as 0/1.
pub fn model() -> DynamicGenerativeFunction<SprinklerArgs, Vec<i64>> {
    DynamicGenerativeFunction::new("sprinkler", |ctx, args: &SprinklerArgs| {
        let cloudy = ctx.sample_bool("cloudy", &Bernoulli::new(0.5)?)?;
        let raining = ctx.sample_bool("raining", &Bernoulli::new(p_raining(cloudy))?)?;
        let sprinkler = ctx.sample_bool("sprinkler", &Bernoulli::new(p_sprinkler(cloudy))?)?;

        let wet = Bernoulli::new(p_grass_wet(raining, sprinkler))?;
        ctx.observe("grass_wet", &wet, args.grass_wet)?;

        Ok(vec![cloudy as i64, raining as i64, sprinkler as i64])
    })
}

pub fn default_method() -> Method {
    Method::enumerate()
}

/// Exact marginals `[P(cloudy), P(raining), P(sprinkler)]` given the
/// observation, by summing the joint over all eight states.
pub fn exact_marginals(args: &SprinklerArgs) -> [f64; 3] {
    let mut marginals = [0.0; 3];
    let mut evidence = 0.0;
    for state in 0..8u8 {
        let cloudy = state & 1 != 0;
        let raining = state & 2 != 0;
        let sprinkler = state & 4 != 0;

        let bern = |p: f64, b: bool| if b { p } else { 1.0 - p };
        let joint = 0.5
            * bern(p_raining(cloudy), raining)
            * bern(p_sprinkler(cloudy), sprinkler)
            * bern(p_grass_wet(raining, sprinkler), args.grass_wet);

        evidence += joint;
        for (m, on) in marginals.iter_mut().zip([cloudy, raining, sprinkler]) {
            if on {
                *m += joint;
            }
        }
    }
    marginals.map(|m| m / evidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppl::{infer, Kernel};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_exact_marginals() {
        let [cloudy, raining, sprinkler] = exact_marginals(&SprinklerArgs::default());
        assert!((cloudy - 0.5746).abs() < 1e-4);
        assert!((raining - 0.7048).abs() < 1e-4);
        assert!((sprinkler - 0.4278).abs() < 1e-4);
    }

    #[test]
    fn test_enumeration_matches_exact() {
        let args = SprinklerArgs::default();
        let mut rng = StdRng::seed_from_u64(0);
        let post = infer(&model(), &args, &default_method(), &mut rng).unwrap();
        for (i, exact) in exact_marginals(&args).iter().enumerate() {
            let marginal = post.marginal(i).unwrap();
            assert!((marginal.mean().unwrap() - exact).abs() < 1e-9);
        }
    }

    #[test]
    fn test_mh_matches_exact() {
        let args = SprinklerArgs::default();
        let mut rng = StdRng::seed_from_u64(31);
        let method = Method::Mcmc {
            samples: 20_000,
            burn: 1000,
            lag: 2,
            kernel: Kernel::Mh,
        };
        let post = infer(&model(), &args, &method, &mut rng).unwrap();
        for (i, exact) in exact_marginals(&args).iter().enumerate() {
            let marginal = post.marginal(i).unwrap();
            assert!((marginal.mean().unwrap() - exact).abs() < 0.03);
        }
    }
}
