//! Empirical posterior distributions returned by inference.

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use rand::distributions::{Distribution as _, WeightedIndex};
use rand::RngCore;
use serde::Serialize;

use crate::error::{PplError, Result};
use crate::utils::normalize_log_weights;
use crate::value::{Value, ValueKey};

/// Bookkeeping reported by the algorithm that produced a posterior.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceStats {
    pub method: String,
    /// Model executions performed.
    pub executions: usize,
    /// Samples that made it into the posterior.
    pub samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptance_rate: Option<f64>,
}

/// The data-file layout consumed by the plotting scripts: `data` holds
/// `[value, log_weight]` pairs.
#[derive(Debug, Clone, Serialize)]
pub struct DataFile {
    pub has_weights: bool,
    pub data: Vec<(Value, f64)>,
}

/// A normalised distribution over return values, support sorted.
#[derive(Debug, Clone, Serialize)]
pub struct Posterior {
    support: Vec<Value>,
    probs: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<InferenceStats>,
}

impl Posterior {
    /// Aggregate equal values and normalise their weights.
    pub fn from_log_weighted<I>(samples: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Value, f64)>,
    {
        let mut index: HashMap<ValueKey, usize> = HashMap::new();
        let mut support: Vec<Value> = Vec::new();
        let mut log_weights: Vec<Vec<f64>> = Vec::new();

        for (value, lw) in samples {
            match index.get(&value.key()) {
                Some(&i) => log_weights[i].push(lw),
                None => {
                    index.insert(value.key(), support.len());
                    support.push(value);
                    log_weights.push(vec![lw]);
                }
            }
        }

        if support.is_empty() {
            return Err(PplError::EmptyPosterior);
        }

        let merged: Vec<f64> = log_weights
            .iter()
            .map(|lws| crate::utils::logsumexp(lws))
            .collect();
        let probs = normalize_log_weights(&merged).ok_or(PplError::ZeroProbability)?;

        let mut pairs: Vec<(Value, f64)> = support
            .into_iter()
            .zip(probs)
            .filter(|(_, p)| *p > 0.0)
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (support, probs) = pairs.into_iter().unzip();

        Ok(Self {
            support,
            probs,
            stats: None,
        })
    }

    /// Equally weighted samples.
    pub fn from_samples<I>(samples: I) -> Result<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        Self::from_log_weighted(samples.into_iter().map(|v| (v, 0.0)))
    }

    pub fn with_stats(mut self, stats: InferenceStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn stats(&self) -> Option<&InferenceStats> {
        self.stats.as_ref()
    }

    pub fn support(&self) -> &[Value] {
        &self.support
    }

    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, f64)> + '_ {
        self.support.iter().zip(self.probs.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.support.len()
    }

    pub fn is_empty(&self) -> bool {
        self.support.is_empty()
    }

    pub fn prob(&self, value: &Value) -> f64 {
        let key = value.key();
        self.iter()
            .find(|(v, _)| v.key() == key)
            .map_or(0.0, |(_, p)| p)
    }

    /// The most probable value. Ties go to the smallest value.
    pub fn map_estimate(&self) -> &Value {
        let mut best = 0;
        for (i, &p) in self.probs.iter().enumerate() {
            if p > self.probs[best] {
                best = i;
            }
        }
        &self.support[best]
    }

    pub fn is_discrete(&self) -> bool {
        self.support.iter().all(Value::is_discrete)
    }

    /// Length of list-valued returns, if every value is a list of that length.
    pub fn dim(&self) -> Option<usize> {
        let first = self.support.first()?.as_list()?.len();
        self.support
            .iter()
            .all(|v| v.as_list().map(|l| l.len()) == Some(first))
            .then_some(first)
    }

    pub fn expectation<F>(&self, f: F) -> Result<f64>
    where
        F: Fn(&Value) -> Result<f64>,
    {
        self.iter().try_fold(0.0, |acc, (v, p)| Ok(acc + p * f(v)?))
    }

    pub fn mean(&self) -> Result<f64> {
        self.expectation(Value::to_float)
    }

    pub fn variance(&self) -> Result<f64> {
        let mean = self.mean()?;
        self.expectation(|v| Ok((v.to_float()? - mean).powi(2)))
    }

    pub fn std_dev(&self) -> Result<f64> {
        Ok(self.variance()?.sqrt())
    }

    /// Distribution of the `i`-th component of list-valued returns.
    pub fn marginal(&self, i: usize) -> Result<Posterior> {
        let mut pairs = Vec::with_capacity(self.len());
        for (v, p) in self.iter() {
            let list = v.as_list().ok_or_else(|| PplError::mismatch("list", v))?;
            let component = list
                .get(i)
                .cloned()
                .ok_or_else(|| PplError::mismatch("list with enough components", v))?;
            pairs.push((component, p.ln()));
        }
        let mut marginal = Posterior::from_log_weighted(pairs)?;
        marginal.stats = self.stats.clone();
        Ok(marginal)
    }

    /// Support as a `len × dim` matrix (scalars give one column) plus the
    /// probability of each row.
    pub fn sample_matrix(&self) -> Result<(Array2<f64>, Array1<f64>)> {
        let dim = self.dim().unwrap_or(1);
        let mut matrix = Array2::<f64>::zeros((self.len(), dim));
        for (row, value) in self.support.iter().enumerate() {
            match value.as_list() {
                Some(items) => {
                    for (col, item) in items.iter().enumerate().take(dim) {
                        matrix[[row, col]] = item.to_float()?;
                    }
                }
                None => matrix[[row, 0]] = value.to_float()?,
            }
        }
        Ok((matrix, Array1::from(self.probs.clone())))
    }

    pub fn mean_vector(&self) -> Result<Array1<f64>> {
        let (matrix, weights) = self.sample_matrix()?;
        Ok(weights.dot(&matrix))
    }

    pub fn covariance(&self) -> Result<Array2<f64>> {
        let (matrix, weights) = self.sample_matrix()?;
        let mean = weights.dot(&matrix);
        let centered = &matrix - &mean;
        let weighted = &centered * &weights.view().insert_axis(ndarray::Axis(1));
        Ok(weighted.t().dot(&centered))
    }

    /// Smallest support value whose cumulative probability reaches `q`.
    pub fn quantile(&self, q: f64) -> Result<f64> {
        let q = q.clamp(0.0, 1.0);
        let mut acc = 0.0;
        for (v, p) in self.iter() {
            acc += p;
            if acc >= q - 1e-12 {
                return v.to_float();
            }
        }
        self.support
            .last()
            .ok_or(PplError::EmptyPosterior)?
            .to_float()
    }

    /// Equal-tailed interval holding `mass` of the probability.
    pub fn credible_interval(&self, mass: f64) -> Result<(f64, f64)> {
        let tail = (1.0 - mass.clamp(0.0, 1.0)) / 2.0;
        Ok((self.quantile(tail)?, self.quantile(1.0 - tail)?))
    }

    /// Draw a value from the posterior.
    pub fn sample(&self, rng: &mut dyn RngCore) -> Result<Value> {
        let index = WeightedIndex::new(&self.probs).map_err(|_| PplError::EmptyPosterior)?;
        Ok(self.support[index.sample(rng)].clone())
    }

    pub fn to_data_file(&self) -> DataFile {
        DataFile {
            has_weights: true,
            data: self.iter().map(|(v, p)| (v.clone(), p.ln())).collect(),
        }
    }
}
