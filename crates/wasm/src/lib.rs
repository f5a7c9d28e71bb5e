use js_sys::Float64Array;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use models::regression;
use models::ModelKind;
use ppl::viz::{render, summary_table};
use ppl::{DataFile, InferenceStats, MethodOptions, VizOptions};
use rand::{rngs::StdRng, SeedableRng};
use std::sync::{Arc, Mutex, MutexGuard};

/// Custom error type for better JavaScript error handling
#[wasm_bindgen]
#[derive(Debug)]
pub struct PplError {
    message: String,
}

#[wasm_bindgen]
impl PplError {
    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }
}

impl From<String> for PplError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<ppl::PplError> for PplError {
    fn from(err: ppl::PplError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PplError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            message: format!("serialization failed: {}", err),
        }
    }
}

/// JavaScript-accessible RNG wrapper
#[wasm_bindgen]
pub struct JsRng {
    inner: Arc<Mutex<StdRng>>,
}

#[wasm_bindgen]
impl JsRng {
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> JsRng {
        JsRng {
            inner: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Re-seed the RNG with a new seed
    pub fn reseed(&self, seed: u64) {
        *self.lock() = StdRng::seed_from_u64(seed);
    }

    /// Generate a random f64 for testing purposes
    pub fn random(&self) -> f64 {
        use rand::Rng;
        self.lock().gen()
    }
}

impl JsRng {
    // A poisoned lock still holds a valid generator.
    fn lock(&self) -> MutexGuard<'_, StdRng> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Serialize)]
struct ModelInfo {
    name: &'static str,
    description: &'static str,
    labels: &'static [&'static str],
    default_method: String,
}

#[derive(Serialize)]
struct RunResult<'a> {
    model: &'static str,
    method: String,
    stats: Option<&'a InferenceStats>,
    posterior: DataFile,
    summary: String,
}

/// JSON array describing every bundled model.
#[wasm_bindgen]
pub fn list_models() -> Result<String, PplError> {
    let infos: Vec<ModelInfo> = ModelKind::ALL
        .into_iter()
        .map(|kind| ModelInfo {
            name: kind.name(),
            description: kind.description(),
            labels: kind.labels(),
            default_method: kind.default_method().to_string(),
        })
        .collect();
    Ok(serde_json::to_string(&infos)?)
}

/// Run inference on a bundled model.
///
/// `method` is one of `enumerate`, `rejection`, `likelihood_weighting`, `mh`,
/// `drift` or `forward`; when omitted the model's own default is used. The
/// result is a JSON object holding the posterior as `[value, log_weight]`
/// pairs, the sampler statistics and a text summary.
#[wasm_bindgen]
pub fn run_model(
    name: &str,
    rng: &JsRng,
    method: Option<String>,
    samples: Option<usize>,
) -> Result<String, PplError> {
    let kind: ModelKind = name.parse()?;
    let options = MethodOptions {
        samples,
        ..MethodOptions::default()
    };
    let method = kind.method(method.as_deref(), &options)?;
    #[cfg(target_arch = "wasm32")]
    web_sys::console::debug_1(&JsValue::from_str(&format!("{}: {}", kind, method)));

    let posterior = kind.run(&method, &mut *rng.lock())?;
    let result = RunResult {
        model: kind.name(),
        method: method.to_string(),
        stats: posterior.stats(),
        posterior: posterior.to_data_file(),
        summary: summary_table(&posterior, kind.labels())?,
    };
    Ok(serde_json::to_string(&result)?)
}

/// Run a bundled model with its default method and return the text chart.
#[wasm_bindgen]
pub fn render_model(name: &str, rng: &JsRng, width: Option<usize>) -> Result<String, PplError> {
    let kind: ModelKind = name.parse()?;
    let posterior = kind.run(&kind.default_method(), &mut *rng.lock())?;

    let mut options = VizOptions::default();
    if let Some(width) = width {
        options.width = width.max(1);
    }
    Ok(render(&posterior, kind.labels(), &options)?)
}

/// Simulated regression data as `{x: Float64Array, y: Float64Array}`.
#[wasm_bindgen]
pub fn generate_data(
    n: usize,
    slope: f64,
    intercept: f64,
    x_noise: f64,
    y_noise: f64,
    rng: &JsRng,
) -> Result<JsValue, JsValue> {
    let (x, y) =
        regression::simulate_data(&mut *rng.lock(), n, slope, intercept, x_noise, y_noise)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let result = js_sys::Object::new();
    js_sys::Reflect::set(
        &result,
        &JsValue::from_str("x"),
        &Float64Array::from(&x[..]).into(),
    )?;
    js_sys::Reflect::set(
        &result,
        &JsValue::from_str("y"),
        &Float64Array::from(&y[..]).into(),
    )?;
    Ok(result.into())
}
