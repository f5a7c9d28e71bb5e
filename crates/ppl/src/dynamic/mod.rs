//! Generative functions written as ordinary Rust closures.
//!
//! A model receives a [`Ctx`] and routes every random choice through it. The
//! context forwards each choice to a [`ChoiceHandler`]; the handler decides
//! whether to sample, replay, constrain or enumerate the value. Running the
//! same closure under different handlers implements the operations of the
//! generative function interface.

pub mod handlers;
pub mod trace;

use std::fmt;
use std::rc::Rc;

use rand::RngCore;

use crate::address::Address;
use crate::choice_map::ChoiceMap;
use crate::distributions::{Condition, Distribution};
use crate::error::{PplError, Result};
use crate::gfi::{GenerativeFunction, Trace};
use crate::value::Value;

use handlers::{GenerateHandler, SimulateHandler};
pub use trace::{ChoiceRecorder, DynamicTrace};

/// A sample or observe statement reaching a handler.
pub struct ChoiceEvent<'a> {
    pub address: Address,
    pub dist: &'a dyn Distribution,
    pub obs: Option<&'a Value>,
}

pub trait ChoiceHandler {
    /// Called when a choice is made (sample or observe); returns its value.
    fn on_choice(&mut self, event: &ChoiceEvent<'_>) -> Result<Value>;

    /// Called for `factor` and failed `condition` statements.
    fn on_factor(&mut self, log_weight: f64);
}

/// Handle a model uses to make random choices.
pub struct Ctx<'h> {
    handler: &'h mut dyn ChoiceHandler,
    gensym: usize,
}

impl<'h> Ctx<'h> {
    pub fn new(handler: &'h mut dyn ChoiceHandler) -> Self {
        Self { handler, gensym: 0 }
    }

    /// Draw a random choice at `addr`.
    pub fn sample(&mut self, addr: impl Into<Address>, dist: &dyn Distribution) -> Result<Value> {
        let event = ChoiceEvent {
            address: addr.into(),
            dist,
            obs: None,
        };
        self.handler.on_choice(&event)
    }

    pub fn sample_int(&mut self, addr: impl Into<Address>, dist: &dyn Distribution) -> Result<i64> {
        self.sample(addr, dist)?.to_int()
    }

    pub fn sample_float(&mut self, addr: impl Into<Address>, dist: &dyn Distribution) -> Result<f64> {
        self.sample(addr, dist)?.to_float()
    }

    pub fn sample_bool(&mut self, addr: impl Into<Address>, dist: &dyn Distribution) -> Result<bool> {
        self.sample(addr, dist)?.to_bool()
    }

    /// Condition on `value` having been drawn from `dist`.
    pub fn observe(
        &mut self,
        addr: impl Into<Address>,
        dist: &dyn Distribution,
        value: impl Into<Value>,
    ) -> Result<()> {
        let value = value.into();
        let event = ChoiceEvent {
            address: addr.into(),
            dist,
            obs: Some(&value),
        };
        self.handler.on_choice(&event).map(|_| ())
    }

    /// Hard constraint: executions where `holds` is false get zero weight.
    pub fn condition(&mut self, holds: bool) {
        if !holds {
            self.handler.on_factor(f64::NEG_INFINITY);
        }
    }

    /// Soft constraint: add `log_weight` to the execution's score.
    pub fn factor(&mut self, log_weight: f64) {
        self.handler.on_factor(log_weight);
    }

    /// Observe a boolean through a [`Condition`], recording it in the trace.
    pub fn constrain(&mut self, addr: impl Into<Address>, holds: bool) -> Result<()> {
        self.observe(addr, &Condition::new(true), holds)
    }

    /// A fresh address `prefix<n>`, unique within this execution.
    pub fn gensym(&mut self, prefix: &str) -> Address {
        let id = self.gensym;
        self.gensym += 1;
        Address::Symbol(format!("{}{}", prefix, id))
    }
}

pub type ModelFn<A, R> = Rc<dyn Fn(&mut Ctx<'_>, &A) -> Result<R>>;

/// A generative function backed by a Rust closure.
pub struct DynamicGenerativeFunction<A, R> {
    name: String,
    body: ModelFn<A, R>,
}

impl<A, R> Clone for DynamicGenerativeFunction<A, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            body: Rc::clone(&self.body),
        }
    }
}

impl<A, R> fmt::Debug for DynamicGenerativeFunction<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicGenerativeFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<A, R> DynamicGenerativeFunction<A, R> {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut Ctx<'_>, &A) -> Result<R> + 'static,
    {
        Self {
            name: name.into(),
            body: Rc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the model body once with every choice routed to `handler`.
    pub fn execute(&self, handler: &mut dyn ChoiceHandler, args: &A) -> Result<R> {
        let mut ctx = Ctx::new(handler);
        (self.body)(&mut ctx, args)
    }
}

impl<A, R> GenerativeFunction for DynamicGenerativeFunction<A, R>
where
    A: Clone + fmt::Debug + 'static,
    R: Clone + fmt::Debug + 'static,
{
    type Args = A;
    type RetVal = R;
    type TraceType = DynamicTrace<A, R>;

    fn simulate(&self, rng: &mut dyn RngCore, args: A) -> Result<DynamicTrace<A, R>> {
        let mut handler = SimulateHandler::new(rng);
        let retval = self.execute(&mut handler, &args)?;
        Ok(DynamicTrace::new(self.clone(), args, handler.recorder, retval))
    }

    fn generate(
        &self,
        rng: &mut dyn RngCore,
        args: A,
        constraints: &ChoiceMap<Value>,
    ) -> Result<(DynamicTrace<A, R>, f64)> {
        let mut handler = GenerateHandler::new(rng, constraints);
        let retval = self.execute(&mut handler, &args)?;
        if let Some(addr) = handler.unused_constraint() {
            return Err(PplError::MissingAddress(addr));
        }
        let weight = handler.weight;
        let trace = DynamicTrace::new(self.clone(), args, handler.recorder, retval);
        Ok((trace, weight))
    }
}

impl<A, R> DynamicGenerativeFunction<A, R>
where
    A: Clone + fmt::Debug + 'static,
    R: Clone + fmt::Debug + 'static,
{
    /// Simulate until the trace has a finite score.
    pub fn simulate_finite(
        &self,
        rng: &mut dyn RngCore,
        args: &A,
        max_attempts: usize,
    ) -> Result<DynamicTrace<A, R>> {
        for _ in 0..max_attempts {
            let trace = self.simulate(rng, args.clone())?;
            if trace.get_score().is_finite() {
                return Ok(trace);
            }
        }
        Err(PplError::InitializationFailed(max_attempts))
    }
}
