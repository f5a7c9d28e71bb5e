pub mod address;
pub mod choice_map;
pub mod distributions;
pub mod dynamic;
pub mod error;
pub mod gfi;
pub mod inference;
pub mod posterior;
pub mod trie;
pub mod utils;
pub mod value;
pub mod viz;

pub use address::{Address, Selection};
pub use choice_map::{ChoiceMap, Record};
pub use distributions::{
    Bernoulli, Categorical, Condition, Distribution, Gaussian, RandomInteger, Uniform,
};
pub use dynamic::{Ctx, DynamicGenerativeFunction, DynamicTrace};
pub use error::{PplError, Result};
pub use gfi::{ArgDiff, GenerativeFunction, RetDiff, Trace};
pub use inference::{
    infer, metropolis_hastings, metropolis_hastings_with_proposal, Kernel, Method, MethodOptions,
};
pub use posterior::{DataFile, InferenceStats, Posterior};
pub use value::Value;
pub use viz::VizOptions;
