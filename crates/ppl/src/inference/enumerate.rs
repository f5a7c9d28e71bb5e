use std::fmt::Debug;

use tracing::debug;

use crate::dynamic::handlers::EnumerateHandler;
use crate::dynamic::DynamicGenerativeFunction;
use crate::error::{PplError, Result};
use crate::posterior::{InferenceStats, Posterior};
use crate::value::Value;

/// Exact inference: run the model once per execution path.
///
/// Every latent choice must come from a distribution with a finite
/// support. Paths whose score is `-inf` are dropped.
pub fn enumerate<A, R>(
    gen_fn: &DynamicGenerativeFunction<A, R>,
    args: &A,
    max_executions: usize,
) -> Result<Posterior>
where
    A: Clone + Debug + 'static,
    R: Clone + Debug + Into<Value> + 'static,
{
    let mut pending: Vec<Vec<Value>> = vec![Vec::new()];
    let mut weighted = Vec::new();
    let mut executions = 0;

    while let Some(prefix) = pending.pop() {
        if executions == max_executions {
            return Err(PplError::TooManyExecutions(max_executions));
        }
        executions += 1;

        let mut handler = EnumerateHandler::new(prefix);
        let retval = gen_fn.execute(&mut handler, args)?;
        pending.append(&mut handler.branches);

        let score = handler.recorder.score;
        if score > f64::NEG_INFINITY {
            weighted.push((retval.into(), score));
        }
    }

    debug!(executions, paths = weighted.len(), "enumeration complete");
    if weighted.is_empty() {
        return Err(PplError::ZeroProbability);
    }

    let samples = weighted.len();
    Ok(Posterior::from_log_weighted(weighted)?.with_stats(InferenceStats {
        method: "enumerate".to_string(),
        executions,
        samples,
        acceptance_rate: None,
    }))
}
