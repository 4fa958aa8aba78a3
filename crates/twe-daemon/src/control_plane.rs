//! ControlPlane: the single serialized command channel
//! an operator drives the engine through. Every command is applied while
//! holding `ControlPlane`'s own lock, one at a time, and never reaches into
//! a bar mid-processing — commands take effect between ticks.
//!
//! This module owns command parsing, validation, and the small piece of
//! state (`run_mode`, `paused`, share sizing, go-live confirmation window)
//! that the rest of the engine doesn't otherwise track. Strategy selection
//! is delegated to `twe_strategy::StrategyManager`; go-live eligibility is
//! delegated to `twe_golive::check_go_live_eligibility`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use twe_golive::{check_go_live_eligibility, GoLiveThresholds, TradeHistoryStats};
use twe_schemas::Portfolio;
use twe_strategy::{ManagerError, StrategyManager};

/// How long a `golive` request stays open for its matching `confirmlive`
/// (two-step confirmation within a 10-minute window).
pub const GO_LIVE_CONFIRM_WINDOW: Duration = Duration::minutes(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Sim,
    Live,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pause,
    Resume,
    Flatten,
    Shutdown,
    GoLive,
    ConfirmLive,
    BackToSim,
    ChangeShare(i64),
    ChangeIncrement(i64),
    SelectStrategy { symbol: String, strategy_name: String },
    ListStrategies,
    Talk(String),
    Insight,
}

#[derive(Debug, PartialEq)]
pub enum CommandError {
    UnknownCommand(String),
    MissingArgument(&'static str),
    NotRegistered(String),
    NoPendingGoLiveRequest,
    GoLiveWindowExpired,
    GoLiveIneligible(Vec<String>),
    AlreadyShutdown,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::UnknownCommand(s) => write!(f, "unrecognized command: {s:?}"),
            CommandError::MissingArgument(name) => write!(f, "command is missing its {name} argument"),
            CommandError::NotRegistered(name) => write!(f, "no strategy registered under name {name:?}"),
            CommandError::NoPendingGoLiveRequest => write!(f, "confirmlive received with no pending golive request"),
            CommandError::GoLiveWindowExpired => write!(f, "golive confirmation window elapsed; re-issue golive"),
            CommandError::GoLiveIneligible(reasons) => write!(f, "golive refused: {}", reasons.join("; ")),
            CommandError::AlreadyShutdown => write!(f, "control plane is shut down; restart the daemon to resume"),
        }
    }
}

impl std::error::Error for CommandError {}

/// Parse one line of the command grammar. Case-insensitive on
/// the verb; arguments are whitespace-separated.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut parts = line.trim().split_whitespace();
    let verb = parts.next().ok_or_else(|| CommandError::UnknownCommand(line.to_string()))?;
    let rest: Vec<&str> = parts.collect();

    match verb.to_ascii_lowercase().as_str() {
        "pause" => Ok(Command::Pause),
        "resume" => Ok(Command::Resume),
        "flatten" => Ok(Command::Flatten),
        "shutdown" => Ok(Command::Shutdown),
        "golive" => Ok(Command::GoLive),
        "confirmlive" => Ok(Command::ConfirmLive),
        "backtosim" => Ok(Command::BackToSim),
        "changeshare" => rest
            .first()
            .ok_or(CommandError::MissingArgument("share count"))
            .and_then(|v| v.parse::<i64>().map_err(|_| CommandError::MissingArgument("share count")))
            .map(Command::ChangeShare),
        "changeincrement" => rest
            .first()
            .ok_or(CommandError::MissingArgument("increment"))
            .and_then(|v| v.parse::<i64>().map_err(|_| CommandError::MissingArgument("increment")))
            .map(Command::ChangeIncrement),
        "selectstrategy" => {
            if rest.len() < 2 {
                return Err(CommandError::MissingArgument("symbol and strategy name"));
            }
            Ok(Command::SelectStrategy {
                symbol: rest[0].to_string(),
                strategy_name: rest[1..].join(" "),
            })
        }
        "liststrategies" => Ok(Command::ListStrategies),
        "talk" => Ok(Command::Talk(rest.join(" "))),
        "insight" => Ok(Command::Insight),
        _ => Err(CommandError::UnknownCommand(line.to_string())),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySummary {
    pub name: String,
    pub strategy_type: String,
    pub description: String,
}

/// Result returned from `ControlPlane::apply` for every command, serialized
/// straight back to the HTTP caller (and mirrored onto the event bus).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub accepted: bool,
    pub message: String,
    pub run_mode: RunMode,
    pub paused: bool,
    pub share_size: i64,
    pub share_increment: i64,
    pub active_mapping: Option<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategies: Option<Vec<StrategySummary>>,
}

/// Serialized command state owned by the daemon. One `ControlPlane` per
/// process; every command goes through `apply` while the caller holds the
/// surrounding `tokio::sync::Mutex`, so commands are totally ordered.
pub struct ControlPlane {
    strategies: StrategyManager,
    run_mode: RunMode,
    paused: bool,
    share_size: i64,
    share_increment: i64,
    go_live_requested_at: Option<DateTime<Utc>>,
    go_live_thresholds: GoLiveThresholds,
    trade_history: TradeHistoryStats,
    last_insight: Option<String>,
}

impl ControlPlane {
    pub fn new(strategies: StrategyManager) -> Self {
        Self {
            strategies,
            run_mode: RunMode::Sim,
            paused: false,
            share_size: 1_000,
            share_increment: 100,
            go_live_requested_at: None,
            go_live_thresholds: GoLiveThresholds::default(),
            trade_history: TradeHistoryStats { closed_trades: 0, win_rate_pct: 0.0, max_drawdown_pct: 0.0 },
            last_insight: None,
        }
    }

    /// Caller (the bar loop, once `twe-runtime` is wired) feeds closed-trade
    /// rollups in here so `golive` can evaluate against live history instead
    /// of stale defaults.
    pub fn record_trade_history(&mut self, stats: TradeHistoryStats) {
        self.trade_history = stats;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn strategies(&self) -> &StrategyManager {
        &self.strategies
    }

    pub fn strategies_mut(&mut self) -> &mut StrategyManager {
        &mut self.strategies
    }

    fn snapshot(&self, accepted: bool, message: impl Into<String>) -> CommandOutcome {
        CommandOutcome {
            accepted,
            message: message.into(),
            run_mode: self.run_mode,
            paused: self.paused,
            share_size: self.share_size,
            share_increment: self.share_increment,
            active_mapping: self.strategies.active_mapping().map(|(s, n)| (s.to_string(), n.to_string())),
            strategies: None,
        }
    }

    /// Apply one command. `now` is passed in rather than read from the
    /// clock so the go-live confirmation window is testable without sleeps.
    pub fn apply(&mut self, cmd: Command, now: DateTime<Utc>) -> Result<CommandOutcome, CommandError> {
        match cmd {
            Command::Pause => {
                self.paused = true;
                Ok(self.snapshot(true, "paused: no new entries will be submitted until resume"))
            }
            Command::Resume => {
                self.paused = false;
                Ok(self.snapshot(true, "resumed"))
            }
            Command::Flatten => Ok(self.snapshot(true, "flatten requested; runtime will exit all open positions on the next tick")),
            Command::Shutdown => {
                self.paused = true;
                self.run_mode = RunMode::Sim;
                Ok(self.snapshot(true, "shutdown: entries halted and run mode reset to sim"))
            }
            Command::GoLive => {
                let decision = check_go_live_eligibility(&self.trade_history, &self.go_live_thresholds);
                if !decision.eligible {
                    return Err(CommandError::GoLiveIneligible(decision.reasons));
                }
                self.go_live_requested_at = Some(now);
                Ok(self.snapshot(true, "golive accepted; issue confirmlive within 10 minutes to arm live trading"))
            }
            Command::ConfirmLive => {
                let requested_at = self.go_live_requested_at.ok_or(CommandError::NoPendingGoLiveRequest)?;
                if now.signed_duration_since(requested_at) > GO_LIVE_CONFIRM_WINDOW {
                    self.go_live_requested_at = None;
                    return Err(CommandError::GoLiveWindowExpired);
                }
                self.go_live_requested_at = None;
                self.run_mode = RunMode::Live;
                Ok(self.snapshot(true, "live trading armed"))
            }
            Command::BackToSim => {
                self.go_live_requested_at = None;
                self.run_mode = RunMode::Sim;
                Ok(self.snapshot(true, "run mode reverted to sim"))
            }
            Command::ChangeShare(n) => {
                self.share_size = n;
                Ok(self.snapshot(true, format!("share size set to {n}")))
            }
            Command::ChangeIncrement(n) => {
                self.share_increment = n;
                Ok(self.snapshot(true, format!("share increment set to {n}")))
            }
            Command::SelectStrategy { symbol, strategy_name } => {
                if !self.strategies.is_registered(&strategy_name) {
                    return Err(CommandError::NotRegistered(strategy_name));
                }
                self.strategies
                    .swap_active(symbol, &strategy_name, &Portfolio::flat())
                    .map_err(|ManagerError::UnknownStrategy(n)| CommandError::NotRegistered(n))?;
                Ok(self.snapshot(true, format!("active strategy switched to {strategy_name}")))
            }
            Command::ListStrategies => {
                let strategies = self
                    .strategies
                    .registry()
                    .list()
                    .into_iter()
                    .map(|m| StrategySummary {
                        name: m.name.clone(),
                        strategy_type: format!("{:?}", m.strategy_type),
                        description: m.description.clone(),
                    })
                    .collect();
                let mut out = self.snapshot(true, "registered strategies");
                out.strategies = Some(strategies);
                Ok(out)
            }
            Command::Talk(text) => {
                self.last_insight = Some(format!("talk: {text}"));
                Ok(self.snapshot(true, "message recorded"))
            }
            Command::Insight => {
                let msg = self.last_insight.clone().unwrap_or_else(|| "no insight recorded yet".to_string());
                Ok(self.snapshot(true, msg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twe_strategy::builtin_registry;

    fn cp() -> ControlPlane {
        ControlPlane::new(StrategyManager::new(builtin_registry(), 5))
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-02T01:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn parses_every_grammar_verb() {
        assert_eq!(parse_command("pause").unwrap(), Command::Pause);
        assert_eq!(parse_command("RESUME").unwrap(), Command::Resume);
        assert_eq!(parse_command("changeshare 500").unwrap(), Command::ChangeShare(500));
        assert_eq!(parse_command("changeincrement 50").unwrap(), Command::ChangeIncrement(50));
        assert_eq!(
            parse_command("selectstrategy 2330.TW Pivot Points").unwrap(),
            Command::SelectStrategy { symbol: "2330.TW".to_string(), strategy_name: "Pivot Points".to_string() }
        );
        assert!(matches!(parse_command("bogus"), Err(CommandError::UnknownCommand(_))));
        assert!(matches!(parse_command("changeshare"), Err(CommandError::MissingArgument(_))));
    }

    #[test]
    fn pause_blocks_and_resume_clears() {
        let mut plane = cp();
        plane.apply(Command::Pause, t0()).unwrap();
        assert!(plane.is_paused());
        plane.apply(Command::Resume, t0()).unwrap();
        assert!(!plane.is_paused());
    }

    #[test]
    fn golive_without_track_record_is_refused() {
        let mut plane = cp();
        let err = plane.apply(Command::GoLive, t0()).unwrap_err();
        assert!(matches!(err, CommandError::GoLiveIneligible(_)));
        assert_eq!(plane.run_mode(), RunMode::Sim);
    }

    #[test]
    fn golive_then_confirmlive_within_window_arms_live() {
        let mut plane = cp();
        plane.record_trade_history(TradeHistoryStats { closed_trades: 25, win_rate_pct: 60.0, max_drawdown_pct: 2.0 });
        plane.apply(Command::GoLive, t0()).unwrap();
        let outcome = plane.apply(Command::ConfirmLive, t0() + Duration::minutes(5)).unwrap();
        assert_eq!(outcome.run_mode, RunMode::Live);
    }

    #[test]
    fn confirmlive_after_window_expires_is_refused() {
        let mut plane = cp();
        plane.record_trade_history(TradeHistoryStats { closed_trades: 25, win_rate_pct: 60.0, max_drawdown_pct: 2.0 });
        plane.apply(Command::GoLive, t0()).unwrap();
        let err = plane.apply(Command::ConfirmLive, t0() + Duration::minutes(11)).unwrap_err();
        assert_eq!(err, CommandError::GoLiveWindowExpired);
        assert_eq!(plane.run_mode(), RunMode::Sim);
    }

    #[test]
    fn confirmlive_without_a_prior_golive_is_refused() {
        let mut plane = cp();
        let err = plane.apply(Command::ConfirmLive, t0()).unwrap_err();
        assert_eq!(err, CommandError::NoPendingGoLiveRequest);
    }

    #[test]
    fn backtosim_clears_a_pending_golive_request() {
        let mut plane = cp();
        plane.record_trade_history(TradeHistoryStats { closed_trades: 25, win_rate_pct: 60.0, max_drawdown_pct: 2.0 });
        plane.apply(Command::GoLive, t0()).unwrap();
        plane.apply(Command::BackToSim, t0()).unwrap();
        let err = plane.apply(Command::ConfirmLive, t0()).unwrap_err();
        assert_eq!(err, CommandError::NoPendingGoLiveRequest);
    }

    #[test]
    fn selectstrategy_rejects_unknown_names() {
        let mut plane = cp();
        let err = plane.apply(Command::SelectStrategy { symbol: "2330.TW".to_string(), strategy_name: "does-not-exist".to_string() }, t0()).unwrap_err();
        assert!(matches!(err, CommandError::NotRegistered(_)));
    }

    #[test]
    fn liststrategies_returns_the_builtin_catalog() {
        let mut plane = cp();
        let outcome = plane.apply(Command::ListStrategies, t0()).unwrap();
        assert!(!outcome.strategies.unwrap().is_empty());
    }

    #[test]
    fn shutdown_forces_paused_and_sim() {
        let mut plane = cp();
        plane.record_trade_history(TradeHistoryStats { closed_trades: 25, win_rate_pct: 60.0, max_drawdown_pct: 2.0 });
        plane.apply(Command::GoLive, t0()).unwrap();
        plane.apply(Command::ConfirmLive, t0()).unwrap();
        plane.apply(Command::Shutdown, t0()).unwrap();
        assert!(plane.is_paused());
        assert_eq!(plane.run_mode(), RunMode::Sim);
    }
}
