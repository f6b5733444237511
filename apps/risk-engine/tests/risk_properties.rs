//! Property and scenario tests for the pure risk math and the position book.

// Allow unwrap in tests - tests should panic on unexpected errors
#![allow(clippy::unwrap_used, clippy::float_cmp)]

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use test_case::test_case;

use risk_engine::portfolio::{ExposureConvention, PortfolioManager, Trade};
use risk_engine::risk::{
    Scenario, SimulationRequest, StressInput, VarMethod, expected_shortfall, historical_var,
    monte_carlo_var, parametric_var, series_estimate, stress_test,
};
use risk_engine::{CommodityId, ErrorCode};

const LEVELS: [f64; 3] = [0.90, 0.95, 0.99];
const EPS: f64 = 1e-12;

fn returns_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.10f64..0.10, 10..200)
}

fn wave(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.015 * (i as f64 * 0.9).sin() + 0.004 * (i as f64 * 0.31).cos() - 0.0005)
        .collect()
}

proptest! {
    #[test]
    fn prop_expected_shortfall_at_least_historical_var(returns in returns_strategy()) {
        for level in LEVELS {
            let var = historical_var(&returns, level).unwrap();
            let es = expected_shortfall(&returns, level, var).unwrap();
            prop_assert!(es + EPS >= var, "level {level}: es {es} < var {var}");
        }
    }

    #[test]
    fn prop_historical_var_monotone_in_confidence(returns in returns_strategy()) {
        let vars: Vec<f64> = LEVELS.iter().map(|c| historical_var(&returns, *c).unwrap()).collect();
        prop_assert!(vars[0] <= vars[1] + EPS);
        prop_assert!(vars[1] <= vars[2] + EPS);
    }

    #[test]
    fn prop_parametric_var_monotone_in_confidence(returns in returns_strategy()) {
        let vars: Vec<f64> = LEVELS.iter().map(|c| parametric_var(&returns, *c).unwrap()).collect();
        prop_assert!(vars[0] <= vars[1] + EPS);
        prop_assert!(vars[1] <= vars[2] + EPS);
    }

    #[test]
    fn prop_identity_scenario_leaves_var_unchanged(returns in returns_strategy()) {
        let identity = Scenario::new("identity", 1.0);
        let request = SimulationRequest::new(1_000, 42);
        for method in [VarMethod::Historical, VarMethod::Parametric] {
            let base = series_estimate(&returns, 0.95, method, &request, None).unwrap();
            let stressed = stress_test(
                StressInput::Series { commodity: None, returns: &returns },
                &identity,
                0.95,
                method,
                &request,
                None,
            )
            .unwrap();
            prop_assert_eq!(stressed.var, base.var);
        }
    }

    #[test]
    fn prop_weights_sum_to_one(
        quantities in prop::collection::vec((-100_000i64..100_000).prop_filter("non-zero", |q| *q != 0), 1..8),
        net in any::<bool>(),
    ) {
        let names = ["corn", "wheat", "soybeans", "sugar", "coffee", "cotton", "cocoa", "rice"];
        let convention = if net { ExposureConvention::Net } else { ExposureConvention::Gross };
        let mut book = PortfolioManager::new(convention);
        for (name, quantity) in names.iter().zip(&quantities) {
            book.apply_trade(Trade::new(*name, Decimal::from(*quantity), dec!(12.5), Utc::now()).unwrap());
        }
        let summary = book.portfolio_summary();
        // A net book whose longs and shorts cancel has no meaningful weights.
        prop_assume!(!summary.total_value.is_zero());
        let total: f64 = summary.weights.values().sum::<f64>() + summary.cash_weight;
        let scale = summary.weights.values().map(|w| w.abs()).sum::<f64>().max(1.0);
        prop_assert!((total - 1.0).abs() < 1e-9 * scale, "weights sum to {total}");
        if !net {
            prop_assert!(summary.weights.values().all(|w| *w > 0.0));
        }
    }
}

#[test]
fn test_monte_carlo_var_monotone_in_confidence() {
    let returns = wave(120);
    let vars: Vec<f64> = LEVELS
        .iter()
        .map(|c| monte_carlo_var(&returns, *c, 5_000, 42).unwrap())
        .collect();
    assert!(vars[0] <= vars[1]);
    assert!(vars[1] <= vars[2]);
}

#[test]
fn test_monte_carlo_bit_identical_for_fixed_seed() {
    let returns = wave(120);
    let a = monte_carlo_var(&returns, 0.99, 10_000, 7).unwrap();
    let b = monte_carlo_var(&returns, 0.99, 10_000, 7).unwrap();
    assert_eq!(a.to_bits(), b.to_bits());
}

#[test]
fn test_monte_carlo_seed_changes_sample() {
    let returns = wave(120);
    let a = monte_carlo_var(&returns, 0.95, 10_000, 1).unwrap();
    let b = monte_carlo_var(&returns, 0.95, 10_000, 2).unwrap();
    assert_ne!(a.to_bits(), b.to_bits());
}

#[test]
fn test_parametric_var_matches_normal_quantile() {
    let returns = wave(100);
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let expected = -(mean - 1.644_853_626_951_472 * variance.sqrt());

    let var = parametric_var(&returns, 0.95).unwrap();
    assert!((var - expected).abs() < 1e-6, "{var} vs {expected}");
}

#[test_case(vec![0.01] ; "single observation")]
#[test_case(vec![-0.03] ; "single loss")]
fn test_historical_var_single_observation_is_zero(returns: Vec<f64>) {
    assert_eq!(historical_var(&returns, 0.95).unwrap(), 0.0);
}

#[test]
fn test_historical_var_empty_is_insufficient() {
    let err = historical_var(&[], 0.95).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientData);
}

#[test_case(0.0 ; "zero")]
#[test_case(1.0 ; "one")]
#[test_case(1.5 ; "above one")]
fn test_confidence_outside_unit_interval_rejected(confidence: f64) {
    let err = historical_var(&wave(30), confidence).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidInput);
}

#[test]
fn test_average_price_blends_adds() {
    let mut book = PortfolioManager::new(ExposureConvention::Gross);
    let corn = CommodityId::new("corn");
    book.apply_trade(Trade::new("corn", dec!(1000), dec!(4.50), Utc::now()).unwrap());
    let position = book.apply_trade(Trade::new("corn", dec!(500), dec!(5.00), Utc::now()).unwrap());

    assert_eq!(position.quantity, dec!(1500));
    let avg = position.avg_entry_price.unwrap();
    assert_eq!(avg.round_dp(3), dec!(4.667));
    assert_eq!(book.position(&corn).unwrap().market_value, dec!(7500));
}

#[test]
fn test_exact_close_realizes_and_clears_basis() {
    let mut book = PortfolioManager::new(ExposureConvention::Gross);
    book.apply_trade(Trade::new("wheat", dec!(200), dec!(5.50), Utc::now()).unwrap());
    let position = book.apply_trade(Trade::new("wheat", dec!(-200), dec!(6.00), Utc::now()).unwrap());

    assert_eq!(position.quantity, Decimal::ZERO);
    assert_eq!(position.avg_entry_price, None);
    assert_eq!(position.realized_pnl, dec!(100));
    assert_eq!(book.realized_pnl(), dec!(100));
    assert_eq!(book.portfolio_summary().open_positions, 0);
}

#[test]
fn test_stress_scenario_raises_var() {
    let returns = wave(250);
    let request = SimulationRequest::new(1_000, 42);
    let base = series_estimate(&returns, 0.99, VarMethod::Historical, &request, None).unwrap();
    for scenario in Scenario::builtins() {
        let stressed = stress_test(
            StressInput::Series { commodity: None, returns: &returns },
            &scenario,
            0.99,
            VarMethod::Historical,
            &request,
            None,
        )
        .unwrap();
        assert!(stressed.var > base.var, "{} did not raise VaR", scenario.name);
        assert!(stressed.is_stressed());
    }
}
