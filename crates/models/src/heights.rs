//! How many genes determine height, given real-valued observations?
//!
//! Each simulated height is the sum of `num_genes` uniform contributions.
//! The simulated heights are sorted and matched pairwise against the
//! observations in their given order; every pair must lie within `epsilon`
//! of each other.

use serde::{Deserialize, Serialize};

use ppl::{path, DynamicGenerativeFunction, Method, RandomInteger, Uniform};

pub const LABELS: &[&str] = &["num_genes"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightsArgs {
    pub observations: Vec<f64>,
    pub epsilon: f64,
    pub min_num_genes: i64,
    pub max_num_genes: i64,
    /// Bounds of a single gene's contribution.
    pub contribution: (f64, f64),
}

impl Default for HeightsArgs {
    fn default() -> Self {
        Self {
            observations: vec![1.6, 1.61],
            epsilon: 0.1,
            min_num_genes: 2,
            max_num_genes: 8,
            contribution: (0.1, 0.9),
        }
    }
}

/// Inclusive on both ends.
pub fn within_epsilon(a: f64, b: f64, epsilon: f64) -> bool {
    a >= b - epsilon && a <= b + epsilon
}

pub fn model() -> DynamicGenerativeFunction<HeightsArgs, i64> {
    DynamicGenerativeFunction::new("heights", |ctx, args: &HeightsArgs| {
        let range = RandomInteger::new(args.max_num_genes - args.min_num_genes)?;
        let num_genes = ctx.sample_int("num_genes", &range)? + args.min_num_genes;
        let gene = Uniform::new(args.contribution.0, args.contribution.1)?;

        let mut heights = Vec::with_capacity(args.observations.len());
        for j in 0..args.observations.len() {
            let mut height = 0.0;
            for g in 0..num_genes {
                height += ctx.sample_float(path!("height", j, g), &gene)?;
            }
            heights.push(height);
        }
        heights.sort_by(f64::total_cmp);

        let all_match = heights
            .iter()
            .zip(&args.observations)
            .all(|(h, o)| within_epsilon(*h, *o, args.epsilon));
        ctx.condition(all_match);

        Ok(num_genes)
    })
}

pub fn default_method() -> Method {
    Method::rejection(10_000)
}
