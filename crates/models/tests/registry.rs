use rand::rngs::StdRng;
use rand::SeedableRng;

use models::regression::{analytic_posterior, RegressionArgs};
use models::ModelKind;
use ppl::viz::render;
use ppl::{Kernel, Method, VizOptions};

fn quick_method(kind: ModelKind) -> Method {
    match kind {
        ModelKind::Heights => Method::rejection(200),
        ModelKind::Regression => Method::Mcmc {
            samples: 2000,
            burn: 500,
            lag: 1,
            kernel: Kernel::Mh,
        },
        _ => kind.default_method(),
    }
}

#[test]
fn test_every_model_runs_and_renders() {
    for kind in ModelKind::ALL {
        let mut rng = StdRng::seed_from_u64(99);
        let post = kind.run(&quick_method(kind), &mut rng).unwrap();
        let total: f64 = post.probs().iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "{}", kind);

        let text = render(&post, kind.labels(), &VizOptions::default()).unwrap();
        for label in kind.labels() {
            assert!(text.contains(label), "{} rendering lacks {}", kind, label);
        }

        let json = serde_json::to_value(post.to_data_file()).unwrap();
        assert_eq!(json["has_weights"], true);
        assert_eq!(json["data"].as_array().unwrap().len(), post.len());
    }
}

#[test]
fn test_regression_mh_near_analytic() {
    let exact = analytic_posterior(&RegressionArgs::default()).unwrap();
    let method = Method::Mcmc {
        samples: 10_000,
        burn: 2000,
        lag: 1,
        kernel: Kernel::Mh,
    };
    let mut rng = StdRng::seed_from_u64(4);
    let post = ModelKind::Regression.run(&method, &mut rng).unwrap();

    let slope = post.marginal(0).unwrap();
    let intercept = post.marginal(1).unwrap();
    assert!((slope.mean().unwrap() - exact.slope()).abs() < 0.2);
    assert!((intercept.mean().unwrap() - exact.intercept()).abs() < 1.0);

    let (lo, hi) = slope.credible_interval(0.95).unwrap();
    assert!(lo < exact.slope() && exact.slope() < hi);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let method = Method::rejection(500);
    let a = ModelKind::Dice
        .run(&method, &mut StdRng::seed_from_u64(8))
        .unwrap();
    let b = ModelKind::Dice
        .run(&method, &mut StdRng::seed_from_u64(8))
        .unwrap();
    assert_eq!(a.probs(), b.probs());
}
