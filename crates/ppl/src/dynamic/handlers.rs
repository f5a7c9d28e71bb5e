use std::collections::HashSet;

use rand::RngCore;

use crate::address::{Address, Selection};
use crate::choice_map::{ChoiceMap, Record};
use crate::dynamic::{ChoiceEvent, ChoiceHandler, ChoiceRecorder};
use crate::error::{PplError, Result};
use crate::value::Value;

fn record_observation(recorder: &mut ChoiceRecorder, event: &ChoiceEvent<'_>, obs: &Value) -> Result<f64> {
    let score = event.dist.log_prob(obs)?;
    recorder.add_choice(event.address.clone(), Record::observed(obs.clone(), score))?;
    Ok(score)
}

/// Samples every choice from its prior.
pub struct SimulateHandler<'r> {
    pub rng: &'r mut dyn RngCore,
    pub recorder: ChoiceRecorder,
}

impl<'r> SimulateHandler<'r> {
    pub fn new(rng: &'r mut dyn RngCore) -> Self {
        Self {
            rng,
            recorder: ChoiceRecorder::new(),
        }
    }
}

impl ChoiceHandler for SimulateHandler<'_> {
    fn on_choice(&mut self, event: &ChoiceEvent<'_>) -> Result<Value> {
        if let Some(obs) = event.obs {
            record_observation(&mut self.recorder, event, obs)?;
            return Ok(obs.clone());
        }

        let sample = event.dist.sample_dyn(self.rng);
        let score = event.dist.log_prob(&sample)?;
        self.recorder
            .add_choice(event.address.clone(), Record::latent(sample.clone(), score))?;
        Ok(sample)
    }

    fn on_factor(&mut self, log_weight: f64) {
        self.recorder.add_factor(log_weight);
    }
}

/// Samples latent choices but ignores observations and factors, giving
/// draws from the prior (predictive) distribution.
pub struct PriorHandler<'r> {
    pub rng: &'r mut dyn RngCore,
    pub recorder: ChoiceRecorder,
}

impl<'r> PriorHandler<'r> {
    pub fn new(rng: &'r mut dyn RngCore) -> Self {
        Self {
            rng,
            recorder: ChoiceRecorder::new(),
        }
    }
}

impl ChoiceHandler for PriorHandler<'_> {
    fn on_choice(&mut self, event: &ChoiceEvent<'_>) -> Result<Value> {
        if let Some(obs) = event.obs {
            return Ok(obs.clone());
        }
        let sample = event.dist.sample_dyn(self.rng);
        let score = event.dist.log_prob(&sample)?;
        self.recorder
            .add_choice(event.address.clone(), Record::latent(sample.clone(), score))?;
        Ok(sample)
    }

    fn on_factor(&mut self, _log_weight: f64) {}
}

/// Takes constrained latent values from a choice map and samples the rest.
pub struct GenerateHandler<'r, 'c> {
    pub rng: &'r mut dyn RngCore,
    pub recorder: ChoiceRecorder,
    pub constraints: &'c ChoiceMap<Value>,
    pub weight: f64,
    used: usize,
}

impl<'r, 'c> GenerateHandler<'r, 'c> {
    pub fn new(rng: &'r mut dyn RngCore, constraints: &'c ChoiceMap<Value>) -> Self {
        Self {
            rng,
            recorder: ChoiceRecorder::new(),
            constraints,
            weight: 0.0,
            used: 0,
        }
    }

    /// A constrained address the execution never visited, if any.
    pub fn unused_constraint(&self) -> Option<Address> {
        if self.used == self.constraints.len() {
            return None;
        }
        self.constraints
            .addresses()
            .into_iter()
            .find(|addr| !self.recorder.has_choice(addr))
    }
}

impl ChoiceHandler for GenerateHandler<'_, '_> {
    fn on_choice(&mut self, event: &ChoiceEvent<'_>) -> Result<Value> {
        if let Some(obs) = event.obs {
            self.weight += record_observation(&mut self.recorder, event, obs)?;
            return Ok(obs.clone());
        }

        let (sample, constrained) = match self.constraints.get(&event.address) {
            Some(value) => (value.clone(), true),
            None => (event.dist.sample_dyn(self.rng), false),
        };
        let score = event.dist.log_prob(&sample)?;
        if constrained {
            self.weight += score;
            self.used += 1;
        }
        self.recorder
            .add_choice(event.address.clone(), Record::latent(sample.clone(), score))?;
        Ok(sample)
    }

    fn on_factor(&mut self, log_weight: f64) {
        self.weight += log_weight;
        self.recorder.add_factor(log_weight);
    }
}

/// Resamples selected choices and reuses the rest of a previous execution.
pub struct RegenerateHandler<'r, 'p> {
    pub rng: &'r mut dyn RngCore,
    pub recorder: ChoiceRecorder,
    pub prev: &'p ChoiceRecorder,
    pub selection: &'p Selection,
    /// Log acceptance ratio accumulated over choices, excluding factors.
    pub weight: f64,
    visited: HashSet<Address>,
}

impl<'r, 'p> RegenerateHandler<'r, 'p> {
    pub fn new(rng: &'r mut dyn RngCore, prev: &'p ChoiceRecorder, selection: &'p Selection) -> Self {
        Self {
            rng,
            recorder: ChoiceRecorder::new(),
            prev,
            selection,
            weight: 0.0,
            visited: HashSet::new(),
        }
    }

    /// Observations of the previous execution that this one did not make.
    fn dropped_observations(&self) -> f64 {
        self.prev
            .choices
            .iter()
            .filter(|(addr, record)| record.observed && !self.visited.contains(addr))
            .map(|(_, record)| record.score)
            .sum()
    }

    pub fn total_weight(&self) -> f64 {
        self.weight - self.dropped_observations() + self.recorder.factors - self.prev.factors
    }
}

impl ChoiceHandler for RegenerateHandler<'_, '_> {
    fn on_choice(&mut self, event: &ChoiceEvent<'_>) -> Result<Value> {
        let addr = &event.address;
        if !self.visited.insert(addr.clone()) {
            return Err(PplError::DuplicateAddress(addr.clone()));
        }
        let previous = self.prev.get_record(addr);

        if let Some(obs) = event.obs {
            let score = record_observation(&mut self.recorder, event, obs)?;
            self.weight += score - previous.map_or(0.0, |r| r.score);
            return Ok(obs.clone());
        }

        // A previous value of another variant came from a different branch
        // of the model and is treated as a new choice.
        let retained = previous
            .filter(|record| !self.selection.contains(addr) && event.dist.accepts(&record.value));
        let sample = match retained {
            Some(record) => record.value.clone(),
            None => event.dist.sample_dyn(self.rng),
        };
        let score = event.dist.log_prob(&sample)?;

        // Retained choices contribute their change in score; resampled and
        // new choices were drawn from the prior and cancel out.
        if let Some(record) = retained {
            self.weight += score - record.score;
        }

        self.recorder
            .add_choice(addr.clone(), Record::latent(sample.clone(), score))?;
        Ok(sample)
    }

    fn on_factor(&mut self, log_weight: f64) {
        self.recorder.add_factor(log_weight);
    }
}

/// Applies constraints on top of a previous execution.
pub struct UpdateHandler<'r, 'p> {
    pub rng: &'r mut dyn RngCore,
    pub recorder: ChoiceRecorder,
    pub prev: &'p ChoiceRecorder,
    pub constraints: &'p ChoiceMap<Value>,
    /// Log probability of choices that had to be sampled fresh.
    pub fresh_score: f64,
    used: usize,
    /// Addresses whose previous value no longer fits their distribution.
    replaced: HashSet<Address>,
}

impl<'r, 'p> UpdateHandler<'r, 'p> {
    pub fn new(rng: &'r mut dyn RngCore, prev: &'p ChoiceRecorder, constraints: &'p ChoiceMap<Value>) -> Self {
        Self {
            rng,
            recorder: ChoiceRecorder::new(),
            prev,
            constraints,
            fresh_score: 0.0,
            used: 0,
            replaced: HashSet::new(),
        }
    }

    pub fn unused_constraint(&self) -> Option<Address> {
        if self.used == self.constraints.len() {
            return None;
        }
        self.constraints
            .addresses()
            .into_iter()
            .find(|addr| !self.recorder.has_choice(addr))
    }

    /// Old values that were overwritten by a constraint, replaced by a fresh
    /// draw, or no longer exist.
    pub fn discard(&self) -> ChoiceMap<Value> {
        let mut discard = ChoiceMap::new();
        for (addr, record) in self.prev.choices.iter() {
            if record.observed {
                continue;
            }
            if self.constraints.contains(&addr)
                || self.replaced.contains(&addr)
                || !self.recorder.has_choice(&addr)
            {
                discard.insert(addr, record.value.clone());
            }
        }
        discard
    }
}

impl ChoiceHandler for UpdateHandler<'_, '_> {
    fn on_choice(&mut self, event: &ChoiceEvent<'_>) -> Result<Value> {
        if let Some(obs) = event.obs {
            record_observation(&mut self.recorder, event, obs)?;
            return Ok(obs.clone());
        }

        let addr = &event.address;
        let (sample, fresh) = if let Some(value) = self.constraints.get(addr) {
            self.used += 1;
            (value.clone(), false)
        } else {
            match self.prev.get_record(addr) {
                Some(record) if event.dist.accepts(&record.value) => {
                    (record.value.clone(), false)
                }
                Some(_) => {
                    self.replaced.insert(addr.clone());
                    (event.dist.sample_dyn(self.rng), true)
                }
                None => (event.dist.sample_dyn(self.rng), true),
            }
        };

        let score = event.dist.log_prob(&sample)?;
        if fresh {
            self.fresh_score += score;
        }
        self.recorder
            .add_choice(addr.clone(), Record::latent(sample.clone(), score))?;
        Ok(sample)
    }

    fn on_factor(&mut self, log_weight: f64) {
        self.recorder.add_factor(log_weight);
    }
}

/// Replays a fixed prefix of choice values, then takes the first value of
/// each further choice's support and queues the alternatives as new
/// prefixes. Draining the queue visits every execution path exactly once.
pub struct EnumerateHandler {
    pub recorder: ChoiceRecorder,
    prefix: Vec<Value>,
    position: usize,
    /// Prefixes still to be explored.
    pub branches: Vec<Vec<Value>>,
    taken: Vec<Value>,
}

impl EnumerateHandler {
    pub fn new(prefix: Vec<Value>) -> Self {
        Self {
            recorder: ChoiceRecorder::new(),
            prefix,
            position: 0,
            branches: Vec::new(),
            taken: Vec::new(),
        }
    }
}

impl ChoiceHandler for EnumerateHandler {
    fn on_choice(&mut self, event: &ChoiceEvent<'_>) -> Result<Value> {
        if let Some(obs) = event.obs {
            record_observation(&mut self.recorder, event, obs)?;
            return Ok(obs.clone());
        }

        let value = if self.position < self.prefix.len() {
            self.prefix[self.position].clone()
        } else {
            let support = event
                .dist
                .support()
                .ok_or_else(|| PplError::NotEnumerable(event.address.clone()))?;
            let mut values = support.into_iter();
            let first = values
                .next()
                .ok_or_else(|| PplError::NotEnumerable(event.address.clone()))?;
            // Pushed in reverse so popping from the queue stays in support order.
            let alternatives: Vec<Value> = values.collect();
            for alt in alternatives.into_iter().rev() {
                let mut branch = self.taken.clone();
                branch.push(alt);
                self.branches.push(branch);
            }
            first
        };
        self.position += 1;
        self.taken.push(value.clone());

        let score = event.dist.log_prob(&value)?;
        self.recorder
            .add_choice(event.address.clone(), Record::latent(value.clone(), score))?;
        Ok(value)
    }

    fn on_factor(&mut self, log_weight: f64) {
        self.recorder.add_factor(log_weight);
    }
}
