//! The generative function interface.
//!
//! Modelled on Gen's GFI: a generative function produces traces, and traces
//! can be scored, projected, updated against constraints, or partially
//! regenerated. Inference algorithms in [`crate::inference`] only talk to
//! models through these two traits.

use std::fmt::Debug;

use rand::RngCore;

use crate::address::{Address, Selection};
use crate::choice_map::ChoiceMap;
use crate::error::Result;
use crate::value::Value;

/// Argument difference marker for updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgDiff {
    NoChange,
    Changed,
}

/// Return value difference marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetDiff {
    NoChange,
    Changed,
}

/// A trace of one execution of a generative function.
pub trait Trace: Debug + Clone {
    type Args: Clone + Debug;
    type RetVal: Clone + Debug;

    /// Return the argument tuple for a given execution.
    fn get_args(&self) -> &Self::Args;

    /// Return the return value of the given execution.
    fn get_retval(&self) -> &Self::RetVal;

    /// All choices of the execution, observations included.
    fn get_choices(&self) -> ChoiceMap<Value>;

    /// Return log p(t; x): latent choices, observations and factors.
    fn get_score(&self) -> f64;

    /// The part of the score contributed by observations and factors.
    fn get_likelihood(&self) -> f64;

    fn get_value(&self, addr: &Address) -> Option<Value> {
        self.get_choices().get(addr).cloned()
    }

    /// Sum of the scores of the selected choices.
    fn project(&self, selection: &Selection) -> f64;

    /// Update a trace by changing the arguments and/or providing new values
    /// for some choices.
    ///
    /// Returns the new trace, the weight
    /// `log p(t'; x') - log p(t; x) - log q(fresh choices)`, the return value
    /// difference, and the discarded old values.
    fn update(
        &self,
        rng: &mut dyn RngCore,
        args: Self::Args,
        argdiffs: &[ArgDiff],
        constraints: &ChoiceMap<Value>,
    ) -> Result<(Self, f64, RetDiff, ChoiceMap<Value>)>;

    /// Update a trace by resampling the selected choices from their prior.
    ///
    /// The weight is the log acceptance ratio of the resulting
    /// Metropolis-Hastings move, excluding any site-selection correction.
    fn regenerate(
        &self,
        rng: &mut dyn RngCore,
        args: Self::Args,
        argdiffs: &[ArgDiff],
        selection: &Selection,
    ) -> Result<(Self, f64, RetDiff)>;
}

/// A generative function.
pub trait GenerativeFunction: Debug {
    type Args: Clone + Debug;
    type RetVal: Clone + Debug;
    type TraceType: Trace<Args = Self::Args, RetVal = Self::RetVal>;

    /// Execute the generative function and return the trace.
    fn simulate(&self, rng: &mut dyn RngCore, args: Self::Args) -> Result<Self::TraceType>;

    /// Return a trace consistent with `constraints` and the weight
    /// `log p(constrained choices, observations; x)`.
    fn generate(
        &self,
        rng: &mut dyn RngCore,
        args: Self::Args,
        constraints: &ChoiceMap<Value>,
    ) -> Result<(Self::TraceType, f64)>;

    /// Sample an assignment and return it together with its log probability.
    fn propose(
        &self,
        rng: &mut dyn RngCore,
        args: Self::Args,
    ) -> Result<(ChoiceMap<Value>, f64, Self::RetVal)> {
        let trace = self.simulate(rng, args)?;
        Ok((
            trace.get_choices(),
            trace.get_score(),
            trace.get_retval().clone(),
        ))
    }

    /// Log probability of proposing `choices`.
    fn assess(
        &self,
        rng: &mut dyn RngCore,
        args: Self::Args,
        choices: &ChoiceMap<Value>,
    ) -> Result<(f64, Self::RetVal)> {
        let (trace, weight) = self.generate(rng, args, choices)?;
        Ok((weight, trace.get_retval().clone()))
    }
}
