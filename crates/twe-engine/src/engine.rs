use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use twe_compliance::{check_earnings_blackout, check_entry, ComplianceConfig};
use twe_correlation::CorrelationTracker;
use twe_execution::{BrokerAdapter, ExecutionOutcome, OrderExecutor, OrderRequest, SubmitError};
use twe_portfolio::weights::check_concentration;
use twe_portfolio::{ClosedTrade, PositionBook};
use twe_regime::{classify, position_scale_factor, Regime, MIN_BARS};
use twe_risk::RiskGuard;
use twe_schemas::{Bar, Direction, EarningsBlackoutDate, Portfolio, TradeSide, TradeSignal, VetoEvent, VetoStage};
use twe_sizing::{recommend, SizingInputs};
use twe_strategy::StrategyManager;

use crate::window::{is_at_or_past_window_close, is_within_trading_window};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub compliance: ComplianceConfig,
    pub entry_threshold: f64,
    pub max_data_age: Duration,
    pub daily_limit_twd: f64,
    pub weekly_limit_twd: f64,
    pub risk_pct: f64,
    pub atr_multiplier: f64,
    pub default_stop_distance_pct: f64,
    /// Capital one candidate day-trade entry is assumed to have available.
    pub day_trade_capital_twd: f64,
    pub initial_cash_twd: f64,
    /// Per-position unrealized-loss trigger (TWD) for the protective stop
    /// monitored every bar alongside the strategy's own exit signals.
    pub per_trade_stop_loss_twd: f64,
    /// Force-exit a position once it has been held this long, regardless of
    /// signal or P&L. `0` disables the check (`trading.risk.maxHoldMinutes`).
    pub max_hold_minutes: u32,
}

impl EngineConfig {
    pub fn taiwan_stock_defaults(initial_cash_twd: f64) -> Self {
        Self {
            compliance: ComplianceConfig::stock_defaults(),
            entry_threshold: twe_schemas::DEFAULT_ENTRY_THRESHOLD,
            max_data_age: Duration::minutes(15),
            daily_limit_twd: initial_cash_twd * 0.02,
            weekly_limit_twd: initial_cash_twd * 0.05,
            risk_pct: 0.01,
            atr_multiplier: 2.0,
            default_stop_distance_pct: 0.03,
            day_trade_capital_twd: initial_cash_twd,
            initial_cash_twd,
            per_trade_stop_loss_twd: initial_cash_twd * 0.005,
            max_hold_minutes: 0,
        }
    }
}

/// Outcome of routing one bar's active-mapping signal through the veto
/// chain and, if it survives, the order path.
#[derive(Debug, Clone)]
pub enum EntryOutcome {
    NoSignal,
    BelowThreshold,
    Vetoed(VetoEvent),
    Submitted {
        outcome: ExecutionOutcome,
        qty: u64,
    },
    AlreadyInFlight,
}

#[derive(Debug, Clone)]
pub struct BarOutcome {
    pub entry: EntryOutcome,
    pub exit: Option<ExecutionOutcome>,
    pub closed_trade: Option<ClosedTrade>,
    pub shadow_signals: Vec<(String, TradeSignal)>,
}

/// Central control loop. Owns Positions and RiskState; `StrategyManager`
/// owns the live strategy instances and is driven through it, never
/// mutated directly here except through its own swap protocol.
pub struct TradingEngine<B: BrokerAdapter> {
    cfg: EngineConfig,
    strategies: StrategyManager,
    regime_windows: BTreeMap<String, VecDeque<Bar>>,
    correlation: CorrelationTracker,
    risk: RiskGuard,
    book: PositionBook,
    executor: OrderExecutor<B>,
    earnings_blackout: Vec<EarningsBlackoutDate>,
    cash_twd: f64,
    marks: BTreeMap<String, f64>,
    consecutive_exec_failures: u32,
}

const CONSECUTIVE_FAILURE_SHUTDOWN_THRESHOLD: u32 = 3;

impl<B: BrokerAdapter> TradingEngine<B> {
    pub fn new(cfg: EngineConfig, strategies: StrategyManager, broker: Arc<B>, today: chrono::NaiveDate) -> Self {
        let cash_twd = cfg.initial_cash_twd;
        Self {
            risk: RiskGuard::new(cfg.daily_limit_twd, cfg.weekly_limit_twd, today),
            cfg,
            strategies,
            regime_windows: BTreeMap::new(),
            correlation: CorrelationTracker::new(),
            book: PositionBook::new(),
            executor: OrderExecutor::new(broker),
            earnings_blackout: Vec::new(),
            cash_twd,
            marks: BTreeMap::new(),
            consecutive_exec_failures: 0,
        }
    }

    pub fn set_earnings_blackout_dates(&mut self, dates: Vec<EarningsBlackoutDate>) {
        self.earnings_blackout = dates;
    }

    pub fn strategies_mut(&mut self) -> &mut StrategyManager {
        &mut self.strategies
    }

    pub fn book(&self) -> &PositionBook {
        &self.book
    }

    pub fn risk(&self) -> &RiskGuard {
        &self.risk
    }

    pub fn equity_twd(&self) -> f64 {
        let positions_value: f64 = self
            .book
            .open_symbols()
            .filter_map(|s| {
                let pos = self.book.position(s)?;
                let mark = *self.marks.get(s).unwrap_or(&pos.avg_entry_price);
                Some(pos.signed_qty as f64 * mark)
            })
            .sum();
        self.cash_twd + positions_value
    }

    fn portfolio_snapshot(&self) -> Portfolio {
        let mut positions = BTreeMap::new();
        let mut avg_entry_price = BTreeMap::new();
        for symbol in self.book.open_symbols() {
            if let Some(pos) = self.book.position(symbol) {
                positions.insert(symbol.to_string(), pos.signed_qty);
                avg_entry_price.insert(symbol.to_string(), pos.avg_entry_price);
            }
        }
        Portfolio {
            positions,
            cash_twd: self.cash_twd,
            avg_entry_price,
            realized_pnl_to_date: self.book.realized_pnl_to_date(),
        }
    }

    fn push_bar_history(&mut self, bar: &Bar) {
        let window = self.regime_windows.entry(bar.symbol.clone()).or_default();
        window.push_back(bar.clone());
        while window.len() > MIN_BARS + 50 {
            window.pop_front();
        }
        self.marks.insert(bar.symbol.clone(), bar.close);
    }

    fn regime_for(&self, symbol: &str) -> Option<Regime> {
        let window = self.regime_windows.get(symbol)?;
        let bars: Vec<Bar> = window.iter().cloned().collect();
        classify(&bars).map(|a| a.regime)
    }

    fn returns_for(&self, symbol: &str) -> Vec<f64> {
        self.regime_windows
            .get(symbol)
            .map(|w| twe_correlation::recent_returns(&w.iter().map(|b| b.close).collect::<Vec<_>>()))
            .unwrap_or_default()
    }

    /// Route one bar through the full control loop: window-close force-flatten,
    /// protective exits, window gate, emergency gate, freshness check, signal
    /// collection, veto chain, sizing, order placement, and bookkeeping.
    ///
    /// Outside the trading window (or once the emergency/freshness gates
    /// trip) only entries are suppressed — exit-side evaluation, including
    /// the protective checks below, always runs.
    pub async fn on_bar(&mut self, bar: &Bar, now: DateTime<Utc>) -> BarOutcome {
        self.push_bar_history(bar);

        if let Some(outcome) = self.force_flatten_at_window_close(&bar.symbol, now).await {
            return outcome;
        }

        if let Some(outcome) = self.check_protective_exits(bar, now).await {
            return outcome;
        }

        let within_window = is_within_trading_window(now);
        let stale = now.signed_duration_since(bar.timestamp) > self.cfg.max_data_age;
        let emergency_blocked = !self.risk.entries_allowed();

        let portfolio = self.portfolio_snapshot();
        let signals = self.strategies.process_bar(&portfolio, bar, now);

        let mut outcome = BarOutcome {
            entry: EntryOutcome::NoSignal,
            exit: None,
            closed_trade: None,
            shadow_signals: signals.shadow,
        };

        let Some(signal) = signals.active else {
            return outcome;
        };

        let (active_symbol, active_strategy_name) = match self.strategies.active_mapping() {
            Some((s, n)) => (s.to_string(), n.to_string()),
            None => return outcome,
        };

        if signal.direction.is_exit() {
            if let Some((exec_outcome, qty)) = self.submit_exit(&active_symbol, &signal, now).await {
                if let ExecutionOutcome::Filled { price, .. } = &exec_outcome {
                    outcome.closed_trade = self.apply_fill_and_bookkeep(&active_symbol, exit_side(&signal), qty, *price, now);
                }
                outcome.exit = Some(exec_outcome);
            }
            return outcome;
        }

        if !signal.direction.is_entry() {
            return outcome;
        }

        if !within_window {
            outcome.entry = EntryOutcome::Vetoed(VetoEvent::new(now, &active_symbol, &active_strategy_name, VetoStage::Window, "outside trading window"));
            return outcome;
        }

        if stale {
            outcome.entry = EntryOutcome::Vetoed(VetoEvent::new(now, &active_symbol, &active_strategy_name, VetoStage::Freshness, "bar data is stale"));
            return outcome;
        }

        if emergency_blocked {
            outcome.entry = EntryOutcome::Vetoed(VetoEvent::new(now, &active_symbol, &active_strategy_name, VetoStage::Emergency, "risk guard has halted new entries"));
            return outcome;
        }

        if !signal.is_actionable_entry(self.cfg.entry_threshold) {
            outcome.entry = EntryOutcome::BelowThreshold;
            return outcome;
        }

        outcome.entry = self.run_veto_chain_and_submit(&active_symbol, &active_strategy_name, &signal, now).await;
        outcome
    }

    /// Close out `symbol`'s open position at market, if any, recording a
    /// `VetoEvent` of `stage`/`reason` alongside the exit. Shared by the
    /// protective-stop, max-hold, and window-close force-flatten checks,
    /// all of which bypass the strategy/veto-chain path entirely.
    async fn force_exit(&mut self, symbol: &str, now: DateTime<Utc>, stage: VetoStage, reason: &'static str) -> Option<BarOutcome> {
        let pos = self.book.position(symbol)?;
        let qty = pos.signed_qty.unsigned_abs();
        if qty == 0 {
            return None;
        }
        let side = if pos.signed_qty > 0 { TradeSide::Sell } else { TradeSide::Buy };
        let req = OrderRequest {
            client_order_id: format!("{symbol}-protective-{}", now.timestamp_millis()),
            symbol: symbol.to_string(),
            side,
            qty,
        };
        let exec_outcome = self.dispatch(req, now).await?;
        let closed_trade = if let ExecutionOutcome::Filled { price, .. } = &exec_outcome {
            self.apply_fill_and_bookkeep(symbol, side, qty, *price, now)
        } else {
            None
        };
        let strategy_name = self.strategies.active_mapping().map(|(_, n)| n.to_string()).unwrap_or_default();
        Some(BarOutcome {
            entry: EntryOutcome::Vetoed(VetoEvent::new(now, symbol, strategy_name, stage, reason)),
            exit: Some(exec_outcome),
            closed_trade,
            shadow_signals: Vec::new(),
        })
    }

    /// Seed scenario 6: force-flatten at `window.end − ε`, independent of
    /// any strategy signal.
    async fn force_flatten_at_window_close(&mut self, symbol: &str, now: DateTime<Utc>) -> Option<BarOutcome> {
        if !is_at_or_past_window_close(now) {
            return None;
        }
        self.force_exit(symbol, now, VetoStage::Window, "window close force-flatten").await
    }

    /// Seed scenario 1 (per-trade stop-loss) plus `maxHoldMinutes`
    /// enforcement: checked every bar against the bar's own symbol, ahead
    /// of strategy-driven exits and regardless of the trading window.
    async fn check_protective_exits(&mut self, bar: &Bar, now: DateTime<Utc>) -> Option<BarOutcome> {
        let pos = self.book.position(&bar.symbol)?.clone();
        if pos.signed_qty == 0 {
            return None;
        }

        let unrealized_pnl_twd = (bar.close - pos.avg_entry_price) * pos.signed_qty as f64;
        if unrealized_pnl_twd <= -self.cfg.per_trade_stop_loss_twd {
            return self.force_exit(&bar.symbol, now, VetoStage::StopLoss, "stop-loss").await;
        }

        if self.cfg.max_hold_minutes > 0 {
            let held = now.signed_duration_since(pos.entry_time);
            if held >= Duration::minutes(self.cfg.max_hold_minutes as i64) {
                return self.force_exit(&bar.symbol, now, VetoStage::Risk, "max hold duration exceeded").await;
            }
        }

        None
    }

    async fn submit_exit(&mut self, symbol: &str, signal: &TradeSignal, now: DateTime<Utc>) -> Option<(ExecutionOutcome, u64)> {
        let pos = self.book.position(symbol)?;
        let qty = pos.signed_qty.unsigned_abs();
        if qty == 0 {
            return None;
        }
        let side = exit_side(signal);
        let req = OrderRequest {
            client_order_id: format!("{symbol}-exit-{}", now.timestamp_millis()),
            symbol: symbol.to_string(),
            side,
            qty,
        };
        self.dispatch(req, now).await.map(|outcome| (outcome, qty))
    }

    async fn run_veto_chain_and_submit(
        &mut self,
        symbol: &str,
        strategy_name: &str,
        signal: &TradeSignal,
        now: DateTime<Utc>,
    ) -> EntryOutcome {
        let is_short = signal.direction == Direction::Short;

        if let Err(violation) = check_entry(&self.cfg.compliance, is_short, 0, false, self.cfg.day_trade_capital_twd) {
            if matches!(violation, twe_compliance::ComplianceViolation::RetailShortForbidden) {
                return EntryOutcome::Vetoed(VetoEvent::new(now, symbol, strategy_name, VetoStage::Compliance, violation.to_string()));
            }
        }

        let today = now.date_naive();
        if let Err(violation) = check_earnings_blackout(&self.cfg.compliance, symbol, today, &self.earnings_blackout) {
            return EntryOutcome::Vetoed(VetoEvent::new(now, symbol, strategy_name, VetoStage::EarningsBlackout, violation.to_string()));
        }

        let regime = self.regime_for(symbol);
        let regime_scale = regime.map(position_scale_factor).unwrap_or(1.0);
        if regime == Some(Regime::Crisis) {
            return EntryOutcome::Vetoed(VetoEvent::new(now, symbol, strategy_name, VetoStage::Regime, "crisis regime blocks new entries"));
        }

        let candidate_returns = self.returns_for(symbol);
        let existing: Vec<(String, Vec<f64>)> =
            self.book.open_symbols().filter(|s| *s != symbol).map(|s| (s.to_string(), self.returns_for(s))).collect();
        let existing_refs: Vec<(&str, &[f64])> = existing.iter().map(|(s, r)| (s.as_str(), r.as_slice())).collect();
        let correlation_scale = if existing_refs.is_empty() {
            1.0
        } else {
            match self.correlation.average_correlation_against(symbol, &candidate_returns, &existing_refs, now) {
                Some(avg) => match CorrelationTracker::size_scale_factor(avg) {
                    Some(scale) => scale,
                    None => {
                        return EntryOutcome::Vetoed(VetoEvent::new(
                            now,
                            symbol,
                            strategy_name,
                            VetoStage::Correlation,
                            format!("average correlation {avg:.2} exceeds critical threshold"),
                        ))
                    }
                },
                None => 1.0,
            }
        };

        let equity = self.equity_twd();
        let price = *self.marks.get(symbol).unwrap_or(&0.0);
        if price <= 0.0 {
            return EntryOutcome::Vetoed(VetoEvent::new(now, symbol, strategy_name, VetoStage::Freshness, "no mark price available"));
        }

        let sizing_inputs = SizingInputs {
            risk_pct: self.cfg.risk_pct,
            atr_multiplier: self.cfg.atr_multiplier,
            default_stop_distance: price * self.cfg.default_stop_distance_pct,
            ..Default::default()
        };
        let base_qty = recommend(equity, price, &sizing_inputs);
        let scaled_qty = (base_qty as f64 * regime_scale * correlation_scale).floor() as u64;
        if scaled_qty == 0 {
            return EntryOutcome::Vetoed(VetoEvent::new(now, symbol, strategy_name, VetoStage::Risk, "sized position rounds to zero shares"));
        }

        // No sector taxonomy is wired in yet (the design leaves sector grouping
        // to an external reference table); treat every symbol as its own
        // sector so the single-position cap still applies and the sector
        // cap is a no-op until that table exists.
        let sector_of: BTreeMap<String, String> =
            self.book.open_symbols().chain(std::iter::once(symbol)).map(|s| (s.to_string(), s.to_string())).collect();
        if let Some(reason) = check_concentration(&self.book, &self.marks, equity, symbol, scaled_qty as f64 * price, &sector_of) {
            return EntryOutcome::Vetoed(VetoEvent::new(now, symbol, strategy_name, VetoStage::Concentration, reason));
        }

        if let Err(violation) = check_entry(&self.cfg.compliance, is_short, scaled_qty as u32, true, self.cfg.day_trade_capital_twd) {
            return EntryOutcome::Vetoed(VetoEvent::new(now, symbol, strategy_name, VetoStage::Compliance, violation.to_string()));
        }

        let side = if signal.direction == Direction::Long { TradeSide::Buy } else { TradeSide::Sell };
        let req = OrderRequest {
            client_order_id: format!("{symbol}-entry-{}", now.timestamp_millis()),
            symbol: symbol.to_string(),
            side,
            qty: scaled_qty,
        };

        match self.dispatch(req, now).await {
            Some(outcome @ ExecutionOutcome::Filled { .. }) => {
                if let ExecutionOutcome::Filled { price, .. } = &outcome {
                    self.apply_fill_and_bookkeep(symbol, side, scaled_qty, *price, now);
                }
                EntryOutcome::Submitted { outcome, qty: scaled_qty }
            }
            Some(outcome) => EntryOutcome::Submitted { outcome, qty: scaled_qty },
            None => EntryOutcome::AlreadyInFlight,
        }
    }

    async fn dispatch(&mut self, req: OrderRequest, now: DateTime<Utc>) -> Option<ExecutionOutcome> {
        match self.executor.submit(req).await {
            Ok(outcome) => {
                match &outcome {
                    ExecutionOutcome::ExhaustedRetries { .. } => {
                        self.consecutive_exec_failures += 1;
                        tracing::error!(count = self.consecutive_exec_failures, "order executor exhausted retries");
                        if self.consecutive_exec_failures >= CONSECUTIVE_FAILURE_SHUTDOWN_THRESHOLD {
                            tracing::error!("tripping emergency shutdown after repeated execution failures");
                            self.trip_emergency_shutdown(now.date_naive());
                        }
                    }
                    _ => self.consecutive_exec_failures = 0,
                }
                Some(outcome)
            }
            Err(SubmitError::AlreadyInFlight) => None,
        }
    }

    /// A repeated-failure trip is a distinct cause from RiskGuard's own
    /// P&L-breach trip, but the engine only has one emergency flag to flip,
    /// so drive it through a synthetic full daily-limit breach rather than
    /// special-casing RiskGuard's API for a second trip cause.
    fn trip_emergency_shutdown(&mut self, today: chrono::NaiveDate) {
        self.risk.record_pnl(-self.cfg.daily_limit_twd.abs() - 1.0, today);
    }

    /// Force-exit every open position at the current mark (ControlPlane's
    /// `flatten` command). Runs outside the veto chain — an operator
    /// flatten is not subject to the entry gates that guard new risk.
    pub async fn flatten_all(&mut self, now: DateTime<Utc>) -> Vec<ClosedTrade> {
        let symbols: Vec<String> = self.book.open_symbols().map(|s| s.to_string()).collect();
        let mut closed = Vec::new();
        for symbol in symbols {
            let Some(pos) = self.book.position(&symbol) else { continue };
            let qty = pos.signed_qty.unsigned_abs();
            if qty == 0 {
                continue;
            }
            let side = if pos.signed_qty > 0 { TradeSide::Sell } else { TradeSide::Buy };
            let req = OrderRequest {
                client_order_id: format!("{symbol}-flatten-{}", now.timestamp_millis()),
                symbol: symbol.clone(),
                side,
                qty,
            };
            if let Some(ExecutionOutcome::Filled { price, .. }) = self.dispatch(req, now).await {
                if let Some(trade) = self.apply_fill_and_bookkeep(&symbol, side, qty, price, now) {
                    closed.push(trade);
                }
            }
        }
        closed
    }

    fn apply_fill_and_bookkeep(&mut self, symbol: &str, side: TradeSide, qty: u64, price: f64, now: DateTime<Utc>) -> Option<ClosedTrade> {
        if qty == 0 {
            return None;
        }
        match side {
            TradeSide::Buy => self.cash_twd -= qty as f64 * price,
            TradeSide::Sell => self.cash_twd += qty as f64 * price,
        }
        match self.book.apply_fill(symbol, side, qty, price, now) {
            Ok(Some(closed)) => {
                self.risk.record_pnl(closed.realized_pnl, now.date_naive());
                Some(closed)
            }
            _ => None,
        }
    }
}

fn exit_side(signal: &TradeSignal) -> TradeSide {
    match signal.direction {
        Direction::ExitLong => TradeSide::Sell,
        _ => TradeSide::Buy,
    }
}
