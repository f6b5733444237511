//! End-to-end monitoring passes over the sample book and a seeded synthetic
//! market.

// Allow unwrap in tests - tests should panic on unexpected errors
#![allow(clippy::unwrap_used, clippy::float_cmp)]

use chrono::{TimeDelta, Utc};
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use risk_engine::config::{Config, load_config_from_string};
use risk_engine::market_data::SyntheticMarketData;
use risk_engine::monitor::AuditEvent;
use risk_engine::portfolio::Trade;
use risk_engine::report::RiskReport;
use risk_engine::{CommodityId, ErrorCode, LimitId, RiskEngine};

const CONFIG: &str = r"
risk:
  monte_carlo:
    n_simulations: 2000
    batch_size: 500
    seed: 11
market_data:
  history_days: 180
  synthetic:
    seed: 3
    annual_volatility: 0.30
";

fn config() -> Config {
    load_config_from_string(CONFIG).unwrap()
}

fn market(config: &Config) -> SyntheticMarketData {
    let start = Utc::now() - TimeDelta::days(365);
    SyntheticMarketData::generate(
        &config.universe,
        config.market_data.synthetic,
        config.market_data.history_days,
        start,
    )
    .unwrap()
}

fn run(config: Config) -> RiskReport {
    let market = market(&config);
    let engine = RiskEngine::from_config(config).unwrap();
    engine.run_pass(&market, None).unwrap()
}

#[test]
fn test_sample_book_full_pass() {
    let report = run(config());

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.portfolio.open_positions, 7);
    assert_eq!(report.commodity_risk.len(), 7);
    assert_eq!(report.stress_results.len(), 3);

    let portfolio = report.portfolio_risk.as_ref().unwrap();
    assert!(portfolio.var_95 > 0.0);
    assert!(portfolio.var_99 >= portfolio.var_95);
    assert!(portfolio.es_99 >= portfolio.var_99);
    assert!(!portfolio.stale);

    for stress in &report.stress_results {
        assert!(
            stress.stressed_var_99 > portfolio.var_99,
            "{} should exceed the unstressed 99% VaR",
            stress.scenario
        );
    }
}

#[test]
fn test_flat_commodity_with_limit_is_monitored_at_zero() {
    let report = run(config());
    let rice = CommodityId::new("rice");

    assert!(report.commodity(&rice).is_none());
    let size = report
        .alerts
        .iter()
        .find(|a| a.limit == LimitId::PositionSize(rice.clone()))
        .unwrap();
    assert_eq!(size.current_value, 0.0);
    assert!(!size.breached);
}

#[test]
fn test_recommendations_follow_breaches() {
    let report = run(config());
    let urgent = report
        .recommendations
        .iter()
        .any(|r| r == "Immediate attention required due to limit breaches");
    assert_eq!(urgent, report.has_breaches());
    assert!(report.breaches.iter().all(|a| a.breached));
}

#[test]
fn test_same_seeds_give_identical_figures() {
    let a = run(config());
    let b = run(config());

    let pa = a.portfolio_risk.unwrap();
    let pb = b.portfolio_risk.unwrap();
    assert_eq!(pa.var_95.to_bits(), pb.var_95.to_bits());
    assert_eq!(pa.var_99.to_bits(), pb.var_99.to_bits());
    assert_eq!(a.metrics.len(), b.metrics.len());
    for (ma, mb) in a.metrics.iter().zip(&b.metrics) {
        assert_eq!(ma.scope, mb.scope);
        assert_eq!(ma.method, mb.method);
        assert_eq!(ma.var.to_bits(), mb.var.to_bits(), "{:?} {:?}", ma.scope, ma.method);
    }
}

#[test]
fn test_advancing_market_revalues_book() {
    let config = config();
    let market = market(&config);
    let engine = RiskEngine::from_config(config).unwrap();

    let first = engine.run_pass(&market, None).unwrap();
    market.advance();
    let second = engine.run_pass(&market, None).unwrap();

    assert_ne!(first.portfolio.total_value, second.portfolio.total_value);
    assert!(second.failures.is_empty(), "{:?}", second.failures);
}

#[test]
fn test_tight_limit_breaches_then_acknowledges() {
    let mut config = config();
    config.limits.portfolio_var = 1.0;
    let market = market(&config);
    let engine = RiskEngine::from_config(config).unwrap();
    let mut events = engine.monitor().subscribe();

    let report = engine.run_pass(&market, None).unwrap();
    assert!(report.breaches.iter().any(|a| a.limit == LimitId::PortfolioVar));
    assert!(
        report
            .recommendations
            .contains(&"Immediate attention required due to limit breaches".to_string())
    );

    let acked = engine.acknowledge(&LimitId::PortfolioVar).unwrap();
    assert!(acked.acknowledged);
    assert!(acked.breached);

    let mut saw_breach = false;
    while let Ok(event) = events.try_recv() {
        if let AuditEvent::Breached(t) = &event {
            saw_breach |= t.limit == LimitId::PortfolioVar;
        }
    }
    assert!(saw_breach);
    assert!(
        engine
            .monitor()
            .audit_trail()
            .iter()
            .any(|e| matches!(e, AuditEvent::Acknowledged(_)))
    );
}

#[test]
fn test_trade_between_passes_changes_exposure() {
    let config = config();
    let market = market(&config);
    let engine = RiskEngine::from_config(config).unwrap();
    let before = engine.run_pass(&market, None).unwrap();

    engine.apply_trade(Trade::new("rice", dec!(100000), dec!(15), Utc::now()).unwrap());
    let after = engine.run_pass(&market, None).unwrap();

    let rice = CommodityId::new("rice");
    assert!(before.commodity(&rice).is_none());
    assert!(after.commodity(&rice).is_some());
    assert_eq!(after.portfolio.open_positions, 8);
    assert_eq!(engine.trade_history().len(), 8);
}

#[test]
fn test_cancelled_pass_aborts() {
    let config = config();
    let market = market(&config);
    let engine = RiskEngine::from_config(config).unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let err = engine.run_pass(&market, Some(&token)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Cancelled);
}
