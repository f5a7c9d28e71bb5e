//! How many dice were rolled, given that they sum to five?
//!
//! `num_dice` is drawn from `RandomInteger(max_num_dice)`. Die `i` is rolled
//! when `num_dice >= i`, so the first die is always rolled and between one
//! and `max_num_dice` dice contribute to the sum. Faces run from zero to
//! `sides - 1`.

use serde::{Deserialize, Serialize};

use ppl::{path, DynamicGenerativeFunction, Method, RandomInteger};

pub const LABELS: &[&str] = &["num_dice"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceArgs {
    pub sides: i64,
    pub max_num_dice: i64,
    pub target: i64,
}

impl Default for DiceArgs {
    fn default() -> Self {
        Self {
            sides: 6,
            max_num_dice: 5,
            target: 5,
        }
    }
}

pub fn model() -> DynamicGenerativeFunction<DiceArgs, i64> {
    DynamicGenerativeFunction::new("dice", |ctx, args: &DiceArgs| {
        let num_dice = ctx.sample_int("num_dice", &RandomInteger::new(args.max_num_dice)?)?;
        let die = RandomInteger::new(args.sides)?;

        let mut sum = 0;
        for i in 0..args.max_num_dice {
            if num_dice >= i {
                sum += ctx.sample_int(path!("die", i), &die)?;
            }
        }

        ctx.condition(sum == args.target);
        Ok(num_dice)
    })
}

pub fn default_method() -> Method {
    Method::enumerate()
}

/// Closed-form posterior over `num_dice`, indexed by value.
pub fn exact_posterior(args: &DiceArgs) -> Vec<f64> {
    let target = args.target.max(0) as usize;
    let sides = args.sides.max(0) as usize;

    // ways[s] = number of face sequences of the dice so far summing to s
    let mut ways = vec![0.0; target + 1];
    ways[0] = 1.0;
    let mut unnormalized = Vec::with_capacity(args.max_num_dice.max(0) as usize);
    for _ in 0..args.max_num_dice {
        let mut next = vec![0.0; target + 1];
        for (s, &w) in ways.iter().enumerate() {
            for face in 0..sides {
                if s + face <= target {
                    next[s + face] += w / sides as f64;
                }
            }
        }
        ways = next;
        unnormalized.push(ways[target]);
    }

    let total: f64 = unnormalized.iter().sum();
    unnormalized.iter().map(|p| p / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppl::{infer, Value};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_exact_posterior() {
        let exact = exact_posterior(&DiceArgs::default());
        let expected = [0.34016, 0.34016, 0.19843, 0.08819, 0.03307];
        for (p, e) in exact.iter().zip(expected) {
            assert!((p - e).abs() < 1e-4);
        }
    }

    #[test]
    fn test_enumeration_is_exact() {
        let mut rng = StdRng::seed_from_u64(0);
        let args = DiceArgs::default();
        let post = infer(&model(), &args, &default_method(), &mut rng).unwrap();
        for (k, p) in exact_posterior(&args).iter().enumerate() {
            assert!((post.prob(&Value::Integer(k as i64)) - p).abs() < 1e-9);
        }
        // 6^(k + 1) paths when num_dice = k
        assert_eq!(post.stats().unwrap().executions, 6 + 36 + 216 + 1296 + 7776);
    }

    #[test]
    fn test_rejection_agrees() {
        let mut rng = StdRng::seed_from_u64(5);
        let args = DiceArgs::default();
        let post = infer(&model(), &args, &Method::rejection(5000), &mut rng).unwrap();
        for (k, p) in exact_posterior(&args).iter().enumerate() {
            assert!((post.prob(&Value::Integer(k as i64)) - p).abs() < 0.03);
        }
    }
}
