//! Lookup of the bundled models by name.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ppl::{infer, Method, MethodOptions, Posterior, PplError, Result};

use crate::{dice, heights, regression, sprinkler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Dice,
    Heights,
    Regression,
    Sprinkler,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Dice,
        ModelKind::Heights,
        ModelKind::Regression,
        ModelKind::Sprinkler,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Dice => "dice",
            ModelKind::Heights => "heights",
            ModelKind::Regression => "regression",
            ModelKind::Sprinkler => "sprinkler",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ModelKind::Dice => "number of dice rolled given that they sum to 5",
            ModelKind::Heights => "number of height genes given two observed heights",
            ModelKind::Regression => "slope and intercept of a Bayesian linear regression",
            ModelKind::Sprinkler => "cloudy / raining / sprinkler given wet grass",
        }
    }

    /// Names of the components of the model's return value.
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            ModelKind::Dice => dice::LABELS,
            ModelKind::Heights => heights::LABELS,
            ModelKind::Regression => regression::LABELS,
            ModelKind::Sprinkler => sprinkler::LABELS,
        }
    }

    pub fn default_method(&self) -> Method {
        match self {
            ModelKind::Dice => dice::default_method(),
            ModelKind::Heights => heights::default_method(),
            ModelKind::Regression => regression::default_method(),
            ModelKind::Sprinkler => sprinkler::default_method(),
        }
    }

    /// The method called `name`, or the model's default when `name` is
    /// `None`. A sample count in `options` applies to either.
    pub fn method(&self, name: Option<&str>, options: &MethodOptions) -> Result<Method> {
        if let Some(name) = name {
            return Method::from_name(name, options);
        }
        let method = self.default_method();
        Ok(match options.samples {
            Some(n) => method.with_samples(n),
            None => method,
        })
    }

    /// Run inference on the model with its bundled data.
    pub fn run(&self, method: &Method, rng: &mut dyn RngCore) -> Result<Posterior> {
        debug!(model = self.name(), %method, "running model");
        match self {
            ModelKind::Dice => infer(&dice::model(), &dice::DiceArgs::default(), method, rng),
            ModelKind::Heights => {
                infer(&heights::model(), &heights::HeightsArgs::default(), method, rng)
            }
            ModelKind::Regression => infer(
                &regression::model(),
                &regression::RegressionArgs::default(),
                method,
                rng,
            ),
            ModelKind::Sprinkler => infer(
                &sprinkler::model(),
                &sprinkler::SprinklerArgs::default(),
                method,
                rng,
            ),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = PplError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| PplError::UnknownModel(s.to_string()))
    }
}
