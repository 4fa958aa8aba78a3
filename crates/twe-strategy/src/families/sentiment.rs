use std::collections::BTreeMap;

use twe_schemas::{Bar, Direction, Portfolio, StrategyType, TradeSignal};

use crate::traits::Strategy;

/// News-driven, advisor-gated sentiment strategy. This strategy does not
/// call out to a news feed or an LLM itself — fetching and scoring news is
/// out of scope here and lives, if anywhere, behind the optional advisor
/// veto stage in the engine's veto chain. Instead it holds the most recent
/// externally computed sentiment score per symbol, set via
/// [`SentimentStrategy::set_sentiment`], and turns that score into a
/// signal. Parameters: `long_threshold=0.4`, `short_threshold=-0.4`. A
/// symbol with no score on file reads as neutral.
pub struct SentimentStrategy {
    name: String,
    long_threshold: f64,
    short_threshold: f64,
    scores: BTreeMap<String, f64>,
}

impl SentimentStrategy {
    pub fn new(name: impl Into<String>, long_threshold: f64, short_threshold: f64) -> Self {
        Self {
            name: name.into(),
            long_threshold,
            short_threshold,
            scores: BTreeMap::new(),
        }
    }

    /// Record the latest sentiment score for `symbol`, in `[-1.0, 1.0]`.
    pub fn set_sentiment(&mut self, symbol: &str, score: f64) {
        self.scores.insert(symbol.to_string(), score.clamp(-1.0, 1.0));
    }
}

impl Strategy for SentimentStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_type(&self) -> StrategyType {
        StrategyType::Swing
    }

    fn execute(&mut self, _portfolio: &Portfolio, bar: &Bar) -> TradeSignal {
        let Some(score) = self.scores.get(&bar.symbol).copied() else {
            return TradeSignal::neutral("no sentiment score on file");
        };
        if score >= self.long_threshold {
            TradeSignal::new(Direction::Long, score.abs().min(0.9), format!("sentiment score {score:.2}"))
        } else if score <= self.short_threshold {
            TradeSignal::new(Direction::Short, score.abs().min(0.9), format!("sentiment score {score:.2}"))
        } else {
            TradeSignal::neutral("sentiment within neutral band")
        }
    }

    fn reset(&mut self) {
        self.scores.clear();
    }
}
