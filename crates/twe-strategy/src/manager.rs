use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use twe_schemas::{Bar, Direction, Portfolio, StrategyType, TradeSignal};

use crate::registry::PluginRegistry;
use crate::traits::Strategy;

pub type StrategyFactory = Box<dyn Fn() -> Box<dyn Strategy> + Send + Sync>;

const CIRCUIT_COOLDOWN: Duration = Duration::seconds(60);
const CIRCUIT_TRIP_WINDOW: Duration = Duration::hours(1);
const CIRCUIT_TRIPS_TO_DISABLE: usize = 3;

/// Per-strategy-instance fault tracker.
/// Three trips inside a rolling hour disable the strategy for the rest of
/// the calendar day; a single trip is a `CIRCUIT_COOLDOWN` timeout.
#[derive(Debug, Default)]
struct CircuitBreaker {
    trips: VecDeque<DateTime<Utc>>,
    cooldown_until: Option<DateTime<Utc>>,
    disabled_on: Option<NaiveDate>,
}

impl CircuitBreaker {
    fn is_available(&mut self, now: DateTime<Utc>) -> bool {
        if let Some(day) = self.disabled_on {
            if day == now.date_naive() {
                return false;
            }
            self.disabled_on = None;
            self.trips.clear();
        }
        match self.cooldown_until {
            Some(until) if now < until => false,
            Some(_) => {
                self.cooldown_until = None;
                true
            }
            None => true,
        }
    }

    fn trip(&mut self, now: DateTime<Utc>) {
        while matches!(self.trips.front(), Some(t) if now.signed_duration_since(*t) > CIRCUIT_TRIP_WINDOW) {
            self.trips.pop_front();
        }
        self.trips.push_back(now);
        self.cooldown_until = Some(now + CIRCUIT_COOLDOWN);
        if self.trips.len() >= CIRCUIT_TRIPS_TO_DISABLE {
            self.disabled_on = Some(now.date_naive());
            tracing::warn!("strategy circuit-broken for the rest of the day after {} trips", self.trips.len());
        } else {
            tracing::warn!("strategy circuit tripped, cooling down until {}", now + CIRCUIT_COOLDOWN);
        }
    }
}

struct Mapping {
    symbol: String,
    strategy_name: String,
    strategy: Box<dyn Strategy>,
    breaker: CircuitBreaker,
}

impl Mapping {
    fn signal(&mut self, portfolio: &Portfolio, bar: &Bar, now: DateTime<Utc>) -> TradeSignal {
        if bar.symbol != self.symbol {
            return TradeSignal::neutral("bar symbol does not match mapping");
        }
        if !self.breaker.is_available(now) {
            return TradeSignal::neutral("circuit-broken");
        }
        let strategy = AssertUnwindSafe(&mut self.strategy);
        let outcome = panic::catch_unwind(move || strategy.0.execute(portfolio, bar));
        match outcome {
            Ok(signal) => signal,
            Err(payload) => {
                let class = panic_class(&payload);
                tracing::error!(strategy = %self.strategy_name, class, "strategy execute() panicked");
                self.breaker.trip(now);
                TradeSignal::neutral(format!("error:{class}"))
            }
        }
    }
}

fn panic_class(payload: &(dyn std::any::Any + Send)) -> &'static str {
    if payload.downcast_ref::<String>().is_some() || payload.downcast_ref::<&str>().is_some() {
        "panic"
    } else {
        "unknown"
    }
}

#[derive(Debug)]
pub enum ManagerError {
    UnknownStrategy(String),
}

impl std::fmt::Display for ManagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagerError::UnknownStrategy(name) => write!(f, "no strategy registered under name {name:?}"),
        }
    }
}

impl std::error::Error for ManagerError {}

/// Per-bar output of [`StrategyManager::process_bar`].
#[derive(Debug, Clone)]
pub struct BarSignals {
    /// `Some` only when the active mapping's symbol matches the bar.
    pub active: Option<TradeSignal>,
    /// `(strategy_name, signal)` for every shadow mapping on this symbol.
    pub shadow: Vec<(String, TradeSignal)>,
}

/// Owns the one live (strategy × symbol) pair plus a configurable shadow
/// set. Bars are routed to every mapping subscribed to that
/// symbol; shadow signals never reach the order path.
pub struct StrategyManager {
    registry: PluginRegistry,
    active: Option<Mapping>,
    shadows: Vec<Mapping>,
    shadow_capacity: usize,
}

impl StrategyManager {
    pub fn new(registry: PluginRegistry, shadow_capacity: usize) -> Self {
        Self {
            registry,
            active: None,
            shadows: Vec::new(),
            shadow_capacity,
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn active_mapping(&self) -> Option<(&str, &str)> {
        self.active.as_ref().map(|m| (m.symbol.as_str(), m.strategy_name.as_str()))
    }

    pub fn shadow_mappings(&self) -> Vec<(&str, &str)> {
        self.shadows.iter().map(|m| (m.symbol.as_str(), m.strategy_name.as_str())).collect()
    }

    fn instantiate(&self, strategy_name: &str) -> Result<Box<dyn Strategy>, ManagerError> {
        self.registry
            .instantiate_verified(strategy_name)
            .map_err(|_| ManagerError::UnknownStrategy(strategy_name.to_string()))
    }

 /// Swap protocol: determine the outgoing mapping's flatten
    /// signal from the live portfolio position, instantiate and `reset()` the
    /// incoming strategy, and install it as the new active mapping. The
    /// caller must hold the engine lock and must execute the returned
    /// flatten signal, if any, before routing any further bars — no bar may
    /// be processed mid-swap.
    pub fn swap_active(
        &mut self,
        symbol: impl Into<String>,
        strategy_name: &str,
        portfolio: &Portfolio,
    ) -> Result<Option<TradeSignal>, ManagerError> {
        let symbol = symbol.into();
        let strategy = self.instantiate(strategy_name)?;

        let flatten = self.active.as_ref().and_then(|outgoing| {
            let qty = portfolio.position_qty(&outgoing.symbol);
            if qty > 0 {
                Some(TradeSignal::new(Direction::ExitLong, 1.0, "strategy swap: flattening outgoing long"))
            } else if qty < 0 {
                Some(TradeSignal::new(Direction::ExitShort, 1.0, "strategy swap: flattening outgoing short"))
            } else {
                None
            }
        });

        self.active = Some(Mapping {
            symbol,
            strategy_name: strategy_name.to_string(),
            strategy,
            breaker: CircuitBreaker::default(),
        });
        Ok(flatten)
    }

    /// Replace the entire shadow set (called once per day by AutoSelector).
    /// Entries beyond `shadow_capacity` are dropped; the caller should log
    /// how many were truncated.
    pub fn install_shadows(&mut self, mappings: Vec<(String, String)>) -> Result<usize, ManagerError> {
        let mut installed = Vec::with_capacity(mappings.len().min(self.shadow_capacity));
        for (symbol, strategy_name) in mappings.into_iter().take(self.shadow_capacity) {
            let strategy = self.instantiate(&strategy_name)?;
            installed.push(Mapping {
                symbol,
                strategy_name,
                strategy,
                breaker: CircuitBreaker::default(),
            });
        }
        let count = installed.len();
        self.shadows = installed;
        Ok(count)
    }

    /// Route one bar to the active mapping (if its symbol matches) and to
    /// every shadow mapping on that symbol. Strategy panics are caught and
    /// trip that mapping's circuit breaker rather than propagating.
    pub fn process_bar(&mut self, portfolio: &Portfolio, bar: &Bar, now: DateTime<Utc>) -> BarSignals {
        let active = self
            .active
            .as_mut()
            .filter(|m| m.symbol == bar.symbol)
            .map(|m| m.signal(portfolio, bar, now));

        let shadow = self
            .shadows
            .iter_mut()
            .filter(|m| m.symbol == bar.symbol)
            .map(|m| (m.strategy_name.clone(), m.signal(portfolio, bar, now)))
            .collect();

        BarSignals { active, shadow }
    }

    pub fn active_strategy_type(&self) -> Option<StrategyType> {
        self.active.as_ref().map(|m| m.strategy.strategy_type())
    }
}
