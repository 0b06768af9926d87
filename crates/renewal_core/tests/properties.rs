use std::sync::OnceLock;

use proptest::prelude::*;
use renewal_core::{RenewalCalc, RenewalModelKind};

fn frozen(model: RenewalModelKind, mean: f64, aper: f64, dx: f64, n: usize) -> RenewalCalc {
    let mut calc = RenewalCalc::new(model);
    calc.set_all(mean, aper, dx, n).unwrap();
    calc.freeze().unwrap();
    calc
}

fn lognormal() -> &'static RenewalCalc {
    static CALC: OnceLock<RenewalCalc> = OnceLock::new();
    CALC.get_or_init(|| frozen(RenewalModelKind::Lognormal, 100.0, 0.5, 1.0, 1000))
}

fn bpt() -> &'static RenewalCalc {
    static CALC: OnceLock<RenewalCalc> = OnceLock::new();
    CALC.get_or_init(|| frozen(RenewalModelKind::Bpt, 100.0, 0.5, 1.0, 2000))
}

fn exponential() -> &'static RenewalCalc {
    static CALC: OnceLock<RenewalCalc> = OnceLock::new();
    CALC.get_or_init(|| frozen(RenewalModelKind::Exponential, 50.0, 1.0, 0.1, 5000))
}

/// P(t, d1 + d2) = P(t, d1) + (1 − P(t, d1)) · P(t + d1, d2)
fn check_composition(calc: &RenewalCalc, t: f64, d1: f64, d2: f64) -> Result<(), TestCaseError> {
    let whole = calc.cond_prob(t, d1 + d2).unwrap();
    let first = calc.cond_prob(t, d1).unwrap();
    let second = calc.cond_prob(t + d1, d2).unwrap();
    let composed = first + (1.0 - first) * second;
    prop_assert!((whole - composed).abs() < 1e-9, "t={t} d1={d1} d2={d2}: {whole} vs {composed}");
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn lognormal_windows_compose(t in 0.0f64..300.0, d1 in 0.5f64..100.0, d2 in 0.5f64..100.0) {
        check_composition(lognormal(), t, d1, d2)?;
    }

    #[test]
    fn bpt_windows_compose_inside_safe_region(
        t in 0.0f64..500.0,
        d1 in 1.0f64..200.0,
        d2 in 1.0f64..200.0,
    ) {
        let calc = bpt();
        prop_assume!(t + d1 + d2 <= calc.safe_time_since_last_cutoff().unwrap());
        check_composition(calc, t, d1, d2)?;
    }

    #[test]
    fn window_from_origin_is_cdf(d in 0.5f64..900.0) {
        let calc = lognormal();
        let cdf = calc.cdf().unwrap();
        let p = calc.cond_prob(0.0, d).unwrap();
        prop_assert!((p - cdf.interpolated_y(d).unwrap()).abs() < 1e-12);
    }

    #[test]
    fn conditional_probabilities_are_probabilities(t in 0.0f64..1500.0, d in 0.01f64..400.0) {
        let p = bpt().cond_prob(t, d).unwrap();
        prop_assert!((0.0..=1.0).contains(&p), "t={t} d={d}: {p}");
    }

    #[test]
    fn exponential_is_memoryless(t in 0.0f64..200.0, d in 1.0f64..50.0) {
        let p = exponential().cond_prob(t, d).unwrap();
        let expected = 1.0 - (-d / 50.0).exp();
        prop_assert!((p - expected).abs() < 1e-5, "t={t} d={d}: {p} vs {expected}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 24, .. ProptestConfig::default() })]

    #[test]
    fn cdf_is_monotone_for_every_model(mean in 1.0f64..100.0, aper in 0.1f64..1.0) {
        for model in RenewalModelKind::ALL {
            let mut calc = RenewalCalc::new(model);
            calc.set_all(mean, aper, mean / 100.0, 1000).unwrap();
            let cdf = calc.cdf().unwrap();
            prop_assert_eq!(cdf.y(0), 0.0);
            prop_assert!(cdf.values().windows(2).all(|w| w[1] >= w[0]), "{} cdf decreases", model);
        }
    }

    #[test]
    fn pdf_is_normalized_for_every_model(mean in 1.0f64..100.0, aper in 0.2f64..0.8) {
        for model in RenewalModelKind::ALL {
            let mut calc = RenewalCalc::new(model);
            calc.set_all(mean, aper, mean / 200.0, 4001).unwrap();
            let area = calc.pdf().unwrap().area();
            prop_assert!((area - 1.0).abs() < 5e-3, "{} area {}", model, area);
        }
    }
}
