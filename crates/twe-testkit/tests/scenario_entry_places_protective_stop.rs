//! seed scenario 1 (stop-loss veto): an open long position whose mark drops
//! past `per_trade_stop_loss_twd` is force-flattened with a `StopLoss` veto,
//! ahead of any strategy-driven exit signal.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use twe_broker_sim::SimBrokerAdapter;
use twe_engine::{EngineConfig, EntryOutcome, TradingEngine};
use twe_schemas::{Bar, Direction, Portfolio, StrategyType, Timeframe, TradeSignal, VetoStage};
use twe_strategy::{PluginRegistry, Strategy, StrategyManager, StrategyMeta};

struct FixedSignal {
    direction: Direction,
    confidence: f64,
}

impl Strategy for FixedSignal {
    fn name(&self) -> &str {
        "fixed"
    }
    fn strategy_type(&self) -> StrategyType {
        StrategyType::ShortTerm
    }
    fn execute(&mut self, _portfolio: &Portfolio, _bar: &Bar) -> TradeSignal {
        TradeSignal::new(self.direction, self.confidence, "fixed")
    }
    fn reset(&mut self) {}
}

fn registry_with(name: &str, direction: Direction, confidence: f64) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry
        .register(
            StrategyMeta {
                name: name.to_string(),
                strategy_type: StrategyType::ShortTerm,
                description: "test fixture".to_string(),
            },
            Box::new(move || Box::new(FixedSignal { direction, confidence })),
        )
        .unwrap();
    registry
}

fn midday_taipei_wednesday() -> DateTime<Utc> {
    // 2026-07-29 is a Wednesday; 02:00 UTC is 10:00 Taipei.
    Utc.with_ymd_and_hms(2026, 7, 29, 2, 0, 0).unwrap()
}

fn bar(symbol: &str, close: f64, ts: DateTime<Utc>) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        timeframe: Timeframe::D1,
        timestamp: ts,
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 10_000,
    }
}

#[tokio::test]
async fn breaching_the_stop_loss_force_flattens_the_position() {
    let registry = registry_with("long", Direction::Long, 0.9);
    let manager = StrategyManager::new(registry, 5);
    let mut cfg = EngineConfig::taiwan_stock_defaults(10_000_000.0);
    // 1,000 TWD stop so a plain 100 -> 90 close comfortably trips it.
    cfg.per_trade_stop_loss_twd = 1_000.0;

    let broker = Arc::new(SimBrokerAdapter::new());
    let today = midday_taipei_wednesday().date_naive();
    let mut engine = TradingEngine::new(cfg, manager, broker.clone(), today);
    engine.strategies_mut().swap_active("2330", "long", &Portfolio::flat()).unwrap();

    let t0 = midday_taipei_wednesday();
    broker.set_mark_price("2330", 100.0);
    let opened = engine.on_bar(&bar("2330", 100.0, t0), t0).await;
    assert!(matches!(opened.entry, EntryOutcome::Submitted { .. }));
    assert!(!engine.book().is_flat("2330"));
    let qty_opened = engine.book().position("2330").unwrap().signed_qty;
    assert!(qty_opened > 0);

    // Next bar closes far enough below entry to breach the TWD stop.
    let t1 = t0 + chrono::Duration::minutes(1);
    broker.set_mark_price("2330", 90.0);
    let outcome = engine.on_bar(&bar("2330", 90.0, t1), t1).await;

    match outcome.entry {
        EntryOutcome::Vetoed(event) => assert_eq!(event.stage, VetoStage::StopLoss),
        other => panic!("expected a stop-loss veto, got {other:?}"),
    }
    assert!(outcome.closed_trade.is_some());
    assert!(outcome.closed_trade.unwrap().realized_pnl < 0.0);
    assert!(engine.book().is_flat("2330"));
}

#[tokio::test]
async fn a_loss_short_of_the_stop_leaves_the_position_open() {
    let registry = registry_with("long", Direction::Long, 0.9);
    let manager = StrategyManager::new(registry, 5);
    let mut cfg = EngineConfig::taiwan_stock_defaults(10_000_000.0);
    cfg.per_trade_stop_loss_twd = 1_000_000.0;

    let broker = Arc::new(SimBrokerAdapter::new());
    let today = midday_taipei_wednesday().date_naive();
    let mut engine = TradingEngine::new(cfg, manager, broker.clone(), today);
    engine.strategies_mut().swap_active("2330", "long", &Portfolio::flat()).unwrap();

    let t0 = midday_taipei_wednesday();
    broker.set_mark_price("2330", 100.0);
    engine.on_bar(&bar("2330", 100.0, t0), t0).await;
    assert!(!engine.book().is_flat("2330"));

    let t1 = t0 + chrono::Duration::minutes(1);
    broker.set_mark_price("2330", 99.0);
    let outcome = engine.on_bar(&bar("2330", 99.0, t1), t1).await;

    assert!(!matches!(outcome.entry, EntryOutcome::Vetoed(event) if event.stage == VetoStage::StopLoss));
    assert!(!engine.book().is_flat("2330"));
}
