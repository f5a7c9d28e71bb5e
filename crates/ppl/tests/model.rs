use rand::distributions::Distribution as _;
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::Normal;

use ppl::utils::compute_mean_and_variance;
use ppl::{
    infer, metropolis_hastings, path, sym, ArgDiff, Bernoulli, ChoiceMap, Distribution,
    DynamicGenerativeFunction, Gaussian, GenerativeFunction, Method, RandomInteger, Selection, Trace, Value,
};

fn univariate_gaussian() -> DynamicGenerativeFunction<Vec<f64>, f64> {
    DynamicGenerativeFunction::new("univariate-gaussian", |ctx, data: &Vec<f64>| {
        let mu = ctx.sample_float("mu", &Gaussian::new(0.0, 1.0)?)?;
        for &x in data {
            let addr = ctx.gensym("x");
            ctx.observe(addr, &Gaussian::new(mu, 1.0)?, x)?;
        }
        Ok(mu)
    })
}

fn simulated_data(n: usize, mean: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Normal::new(mean, 1.0).unwrap();
    (0..n).map(|_| dist.sample(&mut rng)).collect()
}

#[test]
fn test_univariate_gaussian_mh() {
    // conjugate posterior: N(sum / (n + 1), 1 / (n + 1))
    let data = simulated_data(20, 1.0, 1);
    let exact_mean = data.iter().sum::<f64>() / 21.0;
    let model = univariate_gaussian();
    let mut rng = StdRng::seed_from_u64(42);

    let mut trace = model.simulate_finite(&mut rng, &data, 1000).unwrap();
    let selection = Selection::from("mu");

    for _ in 0..2000 {
        let (t, _) = metropolis_hastings(&mut rng, trace, &selection).unwrap();
        trace = t;
    }

    let mut history = Vec::new();
    for _ in 0..2000 {
        let (t, _) = metropolis_hastings(&mut rng, trace, &selection).unwrap();
        trace = t;
        history.push(trace.clone());
    }

    let (mean, variance) = compute_mean_and_variance(&history, &sym!(mu));

    assert!((mean - exact_mean).abs() < 0.1);
    assert!(variance > 0.02 && variance < 0.09);
}

#[test]
fn test_score_decomposes_into_prior_and_likelihood() {
    let data = vec![0.3, -0.2];
    let mut rng = StdRng::seed_from_u64(3);
    let trace = univariate_gaussian().simulate(&mut rng, data.clone()).unwrap();

    let mu = *trace.get_retval();
    let prior = Gaussian::new(0.0, 1.0).unwrap();
    let lik = Gaussian::new(mu, 1.0).unwrap();
    let expected_prior = prior.log_prob(&Value::Float(mu)).unwrap();
    let expected_lik: f64 = data
        .iter()
        .map(|&x| lik.log_prob(&Value::Float(x)).unwrap())
        .sum();

    assert!((trace.project(&Selection::from("mu")) - expected_prior).abs() < 1e-12);
    assert!((trace.get_likelihood() - expected_lik).abs() < 1e-12);
    assert!((trace.get_score() - expected_prior - expected_lik).abs() < 1e-12);
    assert!((trace.project(&Selection::All) - trace.get_score()).abs() < 1e-12);
}

#[test]
fn test_regenerate_empty_selection_is_identity() {
    let mut rng = StdRng::seed_from_u64(8);
    let model = univariate_gaussian();
    let trace = model.simulate(&mut rng, vec![1.0, 2.0]).unwrap();

    let (same, weight, _) = trace
        .regenerate(&mut rng, vec![1.0, 2.0], &[ArgDiff::NoChange], &Selection::None)
        .unwrap();
    assert_eq!(weight, 0.0);
    assert_eq!(same.get_retval(), trace.get_retval());
    assert_eq!(same.get_score(), trace.get_score());
}

#[test]
fn test_update_weight_is_score_difference() {
    let mut rng = StdRng::seed_from_u64(9);
    let model = univariate_gaussian();
    let data = vec![1.0, 2.0];
    let trace = model.simulate(&mut rng, data.clone()).unwrap();

    let mut constraints = ChoiceMap::new();
    constraints.insert("mu", Value::Float(1.5));
    let (updated, weight, _, discard) = trace
        .update(&mut rng, data, &[ArgDiff::NoChange], &constraints)
        .unwrap();

    assert_eq!(*updated.get_retval(), 1.5);
    assert!((weight - (updated.get_score() - trace.get_score())).abs() < 1e-12);
    assert_eq!(discard.get(&sym!(mu)), Some(&Value::Float(*trace.get_retval())));
}

#[test]
fn test_assess_and_propose() {
    let model = DynamicGenerativeFunction::new("coins", |ctx, n: &i64| {
        let mut heads: i64 = 0;
        for i in 0..*n {
            if ctx.sample_bool(path!("coin", i), &Bernoulli::new(0.25)?)? {
                heads += 1;
            }
        }
        Ok(heads)
    });
    let mut rng = StdRng::seed_from_u64(0);

    let (choices, weight, heads) = model.propose(&mut rng, 3).unwrap();
    assert_eq!(choices.len(), 3);
    let expected = heads as f64 * 0.25f64.ln() + (3 - heads) as f64 * 0.75f64.ln();
    assert!((weight - expected).abs() < 1e-12);

    let (assessed, retval) = model.assess(&mut rng, 3, &choices).unwrap();
    assert_eq!(retval, heads);
    assert!((assessed - weight).abs() < 1e-12);
}

#[test]
fn test_condition_false_gives_zero_probability() {
    let model = DynamicGenerativeFunction::new("odd", |ctx, _: &()| {
        let x = ctx.sample_int("x", &RandomInteger::new(4)?)?;
        ctx.condition(x % 2 == 1);
        Ok(x)
    });
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..20 {
        let trace = model.simulate(&mut rng, ()).unwrap();
        if trace.get_retval() % 2 == 0 {
            assert_eq!(trace.get_score(), f64::NEG_INFINITY);
        } else {
            assert!((trace.get_score() - 0.25f64.ln()).abs() < 1e-12);
        }
    }

    let post = infer(&model, &(), &Method::enumerate(), &mut rng).unwrap();
    let total: f64 = post.probs().iter().sum();
    assert!((total - 1.0).abs() < 1e-12);
    assert_eq!(
        post.support(),
        &[Value::Integer(1), Value::Integer(3)]
    );
}
