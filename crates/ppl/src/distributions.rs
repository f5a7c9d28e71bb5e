use std::fmt::Debug;

use rand::distributions::{Distribution as _, WeightedIndex};
use rand::{Rng, RngCore};
use statrs::distribution::{Continuous, Discrete};

use crate::error::{PplError, Result};
use crate::value::Value;

/// A primitive distribution over `Value`s.
pub trait Distribution: Debug {
    fn name(&self) -> &'static str;

    fn sample_dyn(&self, rng: &mut dyn RngCore) -> Value;

    /// Log density (or mass) of `value`; `-inf` outside the support.
    fn log_prob(&self, value: &Value) -> Result<f64>;

    /// Every value with non-zero mass, for distributions that have a finite
    /// support. Continuous distributions return `None`.
    fn support(&self) -> Option<Vec<Value>> {
        None
    }

    /// Whether `value` has the variant this distribution samples.
    fn accepts(&self, value: &Value) -> bool;

    fn clone_box(&self) -> Box<dyn Distribution>;
}

impl Clone for Box<dyn Distribution> {
    fn clone(&self) -> Box<dyn Distribution> {
        self.clone_box()
    }
}

/// Uniform over the integers `0..n`.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomInteger {
    n: i64,
}

impl RandomInteger {
    pub fn new(n: i64) -> Result<Self> {
        if n < 1 {
            return Err(PplError::invalid("random-integer", format!("n must be >= 1, got {}", n)));
        }
        Ok(Self { n })
    }
}

impl Distribution for RandomInteger {
    fn name(&self) -> &'static str {
        "random-integer"
    }

    fn sample_dyn(&self, rng: &mut dyn RngCore) -> Value {
        Value::Integer(rng.gen_range(0..self.n))
    }

    fn log_prob(&self, value: &Value) -> Result<f64> {
        let k = value.to_int()?;
        if (0..self.n).contains(&k) {
            Ok(-(self.n as f64).ln())
        } else {
            Ok(f64::NEG_INFINITY)
        }
    }

    fn support(&self) -> Option<Vec<Value>> {
        Some((0..self.n).map(Value::Integer).collect())
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Integer(_))
    }

    fn clone_box(&self) -> Box<dyn Distribution> {
        Box::new(self.clone())
    }
}

/// Continuous uniform on `[a, b]`.
#[derive(Debug, Clone)]
pub struct Uniform {
    inner: statrs::distribution::Uniform,
}

impl Uniform {
    pub fn new(a: f64, b: f64) -> Result<Self> {
        let inner = statrs::distribution::Uniform::new(a, b)
            .map_err(|e| PplError::invalid("uniform", e.to_string()))?;
        Ok(Self { inner })
    }
}

impl Distribution for Uniform {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn sample_dyn(&self, rng: &mut dyn RngCore) -> Value {
        Value::Float(self.inner.sample(rng))
    }

    fn log_prob(&self, value: &Value) -> Result<f64> {
        Ok(self.inner.ln_pdf(value.to_float()?))
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Float(_))
    }

    fn clone_box(&self) -> Box<dyn Distribution> {
        Box::new(self.clone())
    }
}

/// Normal distribution parameterised by mean and standard deviation.
#[derive(Debug, Clone)]
pub struct Gaussian {
    inner: statrs::distribution::Normal,
}

impl Gaussian {
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        let inner = statrs::distribution::Normal::new(mu, sigma)
            .map_err(|e| PplError::invalid("gaussian", e.to_string()))?;
        Ok(Self { inner })
    }
}

impl Distribution for Gaussian {
    fn name(&self) -> &'static str {
        "gaussian"
    }

    fn sample_dyn(&self, rng: &mut dyn RngCore) -> Value {
        Value::Float(self.inner.sample(rng))
    }

    fn log_prob(&self, value: &Value) -> Result<f64> {
        Ok(self.inner.ln_pdf(value.to_float()?))
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Float(_))
    }

    fn clone_box(&self) -> Box<dyn Distribution> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Bernoulli {
    p: f64,
    inner: statrs::distribution::Bernoulli,
}

impl Bernoulli {
    pub fn new(p: f64) -> Result<Self> {
        let inner = statrs::distribution::Bernoulli::new(p)
            .map_err(|e| PplError::invalid("bernoulli", e.to_string()))?;
        Ok(Self { p, inner })
    }
}

impl Distribution for Bernoulli {
    fn name(&self) -> &'static str {
        "bernoulli"
    }

    fn sample_dyn(&self, rng: &mut dyn RngCore) -> Value {
        Value::Boolean(rng.gen_bool(self.p))
    }

    fn log_prob(&self, value: &Value) -> Result<f64> {
        let flag = value.to_bool()?;
        Ok(self.inner.ln_pmf(flag as u64))
    }

    fn support(&self) -> Option<Vec<Value>> {
        Some(vec![Value::Boolean(false), Value::Boolean(true)])
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Boolean(_))
    }

    fn clone_box(&self) -> Box<dyn Distribution> {
        Box::new(self.clone())
    }
}

/// Distribution over `0..k` with the given (unnormalised) probabilities.
#[derive(Debug, Clone)]
pub struct Categorical {
    weights: Vec<f64>,
    inner: statrs::distribution::Categorical,
}

impl Categorical {
    pub fn new(weights: &[f64]) -> Result<Self> {
        let inner = statrs::distribution::Categorical::new(weights)
            .map_err(|e| PplError::invalid("categorical", e.to_string()))?;
        Ok(Self {
            weights: weights.to_vec(),
            inner,
        })
    }
}

impl Distribution for Categorical {
    fn name(&self) -> &'static str {
        "categorical"
    }

    fn sample_dyn(&self, rng: &mut dyn RngCore) -> Value {
        // Weights were validated by statrs, so the index cannot fail to build.
        match WeightedIndex::new(&self.weights) {
            Ok(index) => Value::Integer(index.sample(rng) as i64),
            Err(_) => Value::Integer(0),
        }
    }

    fn log_prob(&self, value: &Value) -> Result<f64> {
        let k = value.to_int()?;
        if k < 0 {
            return Ok(f64::NEG_INFINITY);
        }
        Ok(self.inner.ln_pmf(k as u64))
    }

    fn support(&self) -> Option<Vec<Value>> {
        Some(
            self.weights
                .iter()
                .enumerate()
                .filter(|(_, &w)| w > 0.0)
                .map(|(k, _)| Value::Integer(k as i64))
                .collect(),
        )
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Integer(_))
    }

    fn clone_box(&self) -> Box<dyn Distribution> {
        Box::new(self.clone())
    }
}

/// Point mass on a boolean flag. Observing the opposite value has zero
/// probability, which is how hard constraints are expressed as observations.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub flag: bool,
}

impl Condition {
    pub fn new(flag: bool) -> Self {
        Self { flag }
    }
}

impl Distribution for Condition {
    fn name(&self) -> &'static str {
        "condition"
    }

    fn sample_dyn(&self, _rng: &mut dyn RngCore) -> Value {
        Value::Boolean(self.flag)
    }

    fn log_prob(&self, value: &Value) -> Result<f64> {
        if value.to_bool()? == self.flag {
            Ok(0.0)
        } else {
            Ok(f64::NEG_INFINITY)
        }
    }

    fn support(&self) -> Option<Vec<Value>> {
        Some(vec![Value::Boolean(self.flag)])
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Boolean(_))
    }

    fn clone_box(&self) -> Box<dyn Distribution> {
        Box::new(self.clone())
    }
}
