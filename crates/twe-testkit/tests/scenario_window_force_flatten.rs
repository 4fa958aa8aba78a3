//! seed scenario 6 (window flatten): an open position still held as the
//! session close approaches is force-flattened with a `Window` veto, even
//! though the strategy itself keeps signaling an entry.

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
async fn open_position_is_flattened_as_the_session_close_approaches() {
    let registry = registry_with("long", Direction::Long, 0.9);
    let manager = StrategyManager::new(registry, 5);
    let cfg = EngineConfig::taiwan_stock_defaults(10_000_000.0);

    let broker = Arc::new(SimBrokerAdapter::new());
    // 2026-07-29 is a Wednesday; 02:00 UTC is 10:00 Taipei, well inside the
    // regular session.
    let entry_ts = Utc.with_ymd_and_hms(2026, 7, 29, 2, 0, 0).unwrap();
    let today = entry_ts.date_naive();
    let mut engine = TradingEngine::new(cfg, manager, broker.clone(), today);
    engine.strategies_mut().swap_active("2330", "long", &Portfolio::flat()).unwrap();

    broker.set_mark_price("2330", 100.0);
    let opened = engine.on_bar(&bar("2330", 100.0, entry_ts), entry_ts).await;
    assert!(matches!(opened.entry, EntryOutcome::Submitted { .. }));
    assert!(!engine.book().is_flat("2330"));

    // 05:59:57 UTC is 13:29:57 Taipei, 3s before the 13:30 close — inside the
    // force-flatten epsilon but still inside the regular trading window.
    let near_close = Utc.with_ymd_and_hms(2026, 7, 29, 5, 59, 57).unwrap();
    broker.set_mark_price("2330", 101.0);
    let outcome = engine.on_bar(&bar("2330", 101.0, near_close), near_close).await;

    match outcome.entry {
        EntryOutcome::Vetoed(event) => assert_eq!(event.stage, VetoStage::Window),
        other => panic!("expected a window force-flatten veto, got {other:?}"),
    }
    assert!(outcome.closed_trade.is_some());
    assert!(engine.book().is_flat("2330"));
}

#[tokio::test]
async fn flat_book_past_close_falls_through_to_the_ordinary_window_veto() {
    let registry = registry_with("long", Direction::Long, 0.9);
    let manager = StrategyManager::new(registry, 5);
    let cfg = EngineConfig::taiwan_stock_defaults(10_000_000.0);

    let broker = Arc::new(SimBrokerAdapter::new());
    // 06:00 UTC is 14:00 Taipei, after the 13:30 close.
    let after_close = Utc.with_ymd_and_hms(2026, 7, 29, 6, 0, 0).unwrap();
    let today = after_close.date_naive();
    let mut engine = TradingEngine::new(cfg, manager, broker.clone(), today);
    engine.strategies_mut().swap_active("2330", "long", &Portfolio::flat()).unwrap();

    // No position was ever opened, so the force-flatten check has nothing to
    // do and the bar falls through to the ordinary outside-window entry gate.
    broker.set_mark_price("2330", 100.0);
    let outcome = engine.on_bar(&bar("2330", 100.0, after_close), after_close).await;
    assert!(engine.book().is_flat("2330"));
    match outcome.entry {
        EntryOutcome::Vetoed(event) => assert_eq!(event.stage, VetoStage::Window),
        other => panic!("expected an outside-window veto, got {other:?}"),
    }
}
