use std::fmt::Debug;

use rand::RngCore;

use crate::address::{Address, Selection};
use crate::choice_map::{ChoiceMap, Record};
use crate::dynamic::handlers::{RegenerateHandler, UpdateHandler};
use crate::dynamic::DynamicGenerativeFunction;
use crate::error::{PplError, Result};
use crate::gfi::{ArgDiff, RetDiff, Trace};
use crate::value::Value;

/// Choices and score accumulated while a model executes.
#[derive(Debug, Clone)]
pub struct ChoiceRecorder {
    pub choices: ChoiceMap<Record>,
    /// Log joint of everything recorded so far.
    pub score: f64,
    /// Observations and factors only.
    pub likelihood: f64,
    /// Factors only.
    pub factors: f64,
}

impl Default for ChoiceRecorder {
    fn default() -> Self {
        Self {
            choices: ChoiceMap::new(),
            score: 0.0,
            likelihood: 0.0,
            factors: 0.0,
        }
    }
}

impl ChoiceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_choice(&mut self, addr: Address, record: Record) -> Result<()> {
        if self.choices.contains(&addr) {
            return Err(PplError::DuplicateAddress(addr));
        }
        self.score += record.score;
        if record.observed {
            self.likelihood += record.score;
        }
        self.choices.insert(addr, record);
        Ok(())
    }

    pub fn add_factor(&mut self, log_weight: f64) {
        self.score += log_weight;
        self.likelihood += log_weight;
        self.factors += log_weight;
    }

    pub fn has_choice(&self, addr: &Address) -> bool {
        self.choices.contains(addr)
    }

    pub fn get_record(&self, addr: &Address) -> Option<&Record> {
        self.choices.get(addr)
    }
}

/// Trace of a [`DynamicGenerativeFunction`].
#[derive(Debug, Clone)]
pub struct DynamicTrace<A, R> {
    gen_fn: DynamicGenerativeFunction<A, R>,
    args: A,
    recorder: ChoiceRecorder,
    retval: R,
}

impl<A, R> DynamicTrace<A, R> {
    pub fn new(
        gen_fn: DynamicGenerativeFunction<A, R>,
        args: A,
        recorder: ChoiceRecorder,
        retval: R,
    ) -> Self {
        Self {
            gen_fn,
            args,
            recorder,
            retval,
        }
    }

    pub fn get_gen_fn(&self) -> &DynamicGenerativeFunction<A, R> {
        &self.gen_fn
    }

    pub fn records(&self) -> &ChoiceMap<Record> {
        &self.recorder.choices
    }

    pub fn get_record(&self, addr: &Address) -> Option<&Record> {
        self.recorder.get_record(addr)
    }

    pub fn has_choice(&self, addr: &Address) -> bool {
        self.recorder.has_choice(addr)
    }

    pub fn get_choice_value(&self, addr: &Address) -> Option<Value> {
        self.get_record(addr).map(|r| r.value.clone())
    }

    pub fn get_choice_score(&self, addr: &Address) -> Option<f64> {
        self.get_record(addr).map(|r| r.score)
    }

    /// Addresses of latent choices, in address order.
    pub fn latent_addresses(&self) -> Vec<Address> {
        self.recorder.choices.latent_addresses()
    }

    pub fn factors(&self) -> f64 {
        self.recorder.factors
    }
}

fn retdiff<R: Debug>(old: &R, new: &R) -> RetDiff {
    // Return types are not required to be comparable; compare their renderings.
    if format!("{:?}", old) == format!("{:?}", new) {
        RetDiff::NoChange
    } else {
        RetDiff::Changed
    }
}

impl<A, R> Trace for DynamicTrace<A, R>
where
    A: Clone + Debug + 'static,
    R: Clone + Debug + 'static,
{
    type Args = A;
    type RetVal = R;

    fn get_args(&self) -> &A {
        &self.args
    }

    fn get_retval(&self) -> &R {
        &self.retval
    }

    fn get_choices(&self) -> ChoiceMap<Value> {
        self.recorder.choices.values()
    }

    fn get_score(&self) -> f64 {
        self.recorder.score
    }

    fn get_likelihood(&self) -> f64 {
        self.recorder.likelihood
    }

    fn get_value(&self, addr: &Address) -> Option<Value> {
        self.get_choice_value(addr)
    }

    fn project(&self, selection: &Selection) -> f64 {
        self.recorder
            .choices
            .iter()
            .filter(|(addr, _)| selection.contains(addr))
            .map(|(_, record)| record.score)
            .sum()
    }

    fn update(
        &self,
        rng: &mut dyn RngCore,
        args: A,
        _argdiffs: &[ArgDiff],
        constraints: &ChoiceMap<Value>,
    ) -> Result<(Self, f64, RetDiff, ChoiceMap<Value>)> {
        let mut handler = UpdateHandler::new(rng, &self.recorder, constraints);
        let retval = self.gen_fn.execute(&mut handler, &args)?;
        if let Some(addr) = handler.unused_constraint() {
            return Err(PplError::MissingAddress(addr));
        }
        let discard = handler.discard();
        let weight = handler.recorder.score - self.recorder.score - handler.fresh_score;
        let diff = retdiff(&self.retval, &retval);
        let trace = DynamicTrace::new(self.gen_fn.clone(), args, handler.recorder, retval);
        Ok((trace, weight, diff, discard))
    }

    fn regenerate(
        &self,
        rng: &mut dyn RngCore,
        args: A,
        _argdiffs: &[ArgDiff],
        selection: &Selection,
    ) -> Result<(Self, f64, RetDiff)> {
        let mut handler = RegenerateHandler::new(rng, &self.recorder, selection);
        let retval = self.gen_fn.execute(&mut handler, &args)?;
        let weight = handler.total_weight();
        let diff = retdiff(&self.retval, &retval);
        let trace = DynamicTrace::new(self.gen_fn.clone(), args, handler.recorder, retval);
        Ok((trace, weight, diff))
    }
}
