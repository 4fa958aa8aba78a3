//! Default catalog of every concrete strategy family, registered under a
//! stable name so the CLI, the backtester, and `AutoSelector` can all
//! resolve "ma_crossover" / "rsi_reversion" / ... to a buildable strategy
//! without each caller hand-rolling its own [`PluginRegistry`].

use twe_schemas::StrategyType;

use crate::families::{
    execution::{TwapReversion, VwapReversion},
    long_horizon::{Dca, DualMomentum, Rebalancing},
    mean_reversion::{AtrChannelReversion, BollingerReversion, PivotPointsReversion, RsiReversion, StochasticReversion},
    microstructure::OrderFlowImbalance,
    momentum::{AroonMomentum, BalanceOfPowerMomentum, MacdMomentum, MomentumPctStrategy},
    sentiment::SentimentStrategy,
    trend::{AdxTrend, KeltnerBreakout, MaCrossover, TripleEma},
};
use crate::registry::{PluginRegistry, StrategyMeta};

macro_rules! register {
    ($registry:expr, $name:expr, $stype:expr, $desc:expr, $build:expr) => {
        $registry
            .register(
                StrategyMeta {
                    name: $name.to_string(),
                    strategy_type: $stype,
                    description: $desc.to_string(),
                },
                Box::new(|| Box::new($build) as Box<dyn crate::traits::Strategy>),
            )
            .expect("builtin strategy names are unique by construction");
    };
}

/// Every family from the strategy catalog, wired up with the
/// defaults named in each type's own doc comment.
pub fn builtin_registry() -> PluginRegistry {
    let mut r = PluginRegistry::new();

    register!(r, "ma_crossover", StrategyType::Swing, "trend-following: MA crossover", MaCrossover::new("ma_crossover", 20, 60));
    register!(r, "triple_ema", StrategyType::Swing, "trend-following: triple-EMA", TripleEma::new("triple_ema", 5, 13, 34));
    register!(r, "adx_trend", StrategyType::Swing, "trend-following: ADX trend", AdxTrend::new("adx_trend", 14, 25.0));
    register!(r, "keltner_breakout", StrategyType::Swing, "trend-following: Keltner breakout", KeltnerBreakout::new("keltner_breakout", 20, 2.0));

    register!(r, "bollinger_reversion", StrategyType::ShortTerm, "mean-reversion: Bollinger bands", BollingerReversion::new("bollinger_reversion", 20, 2.0));
    register!(r, "rsi_reversion", StrategyType::ShortTerm, "mean-reversion: RSI", RsiReversion::new("rsi_reversion", 14, 30.0, 70.0));
    register!(r, "stochastic_reversion", StrategyType::ShortTerm, "mean-reversion: stochastic oscillator", StochasticReversion::new("stochastic_reversion", 14, 3));
    register!(r, "pivot_points_reversion", StrategyType::ShortTerm, "mean-reversion: pivot points", PivotPointsReversion::new("pivot_points_reversion", 14));
    register!(r, "atr_channel_reversion", StrategyType::ShortTerm, "mean-reversion: ATR channel", AtrChannelReversion::new("atr_channel_reversion", 14, 2.0));

    register!(r, "momentum_pct", StrategyType::Intraday, "momentum: percent change", MomentumPctStrategy::new("momentum_pct", 10, 0.02));
    register!(r, "macd_momentum", StrategyType::Intraday, "momentum: MACD", MacdMomentum::new("macd_momentum", 12, 26, 9));
    register!(r, "balance_of_power_momentum", StrategyType::Intraday, "momentum: balance of power", BalanceOfPowerMomentum::new("balance_of_power_momentum", 14, 0.0));
    register!(r, "aroon_momentum", StrategyType::Intraday, "momentum: Aroon", AroonMomentum::new("aroon_momentum", 25));

    register!(r, "order_flow_imbalance", StrategyType::Intraday, "microstructure: order-flow imbalance", OrderFlowImbalance::new("order_flow_imbalance", 5, 0.2));

    register!(r, "vwap_reversion", StrategyType::Intraday, "execution: VWAP reversion", VwapReversion::new("vwap_reversion", 20, 0.01));
    register!(r, "twap_reversion", StrategyType::Intraday, "execution: TWAP reversion", TwapReversion::new("twap_reversion", 20, 0.01));

    register!(r, "dca", StrategyType::LongTerm, "long-horizon: dollar-cost averaging", Dca::new("dca", 20));
    register!(r, "rebalancing", StrategyType::LongTerm, "long-horizon: target-weight rebalancing", Rebalancing::new("rebalancing", 0.5, 0.05));
    register!(r, "dual_momentum", StrategyType::LongTerm, "long-horizon: dual momentum", DualMomentum::new("dual_momentum", 20, 120));

    register!(r, "sentiment", StrategyType::ShortTerm, "sentiment: news-driven (advisor-assisted)", SentimentStrategy::new("sentiment", 0.6, -0.6));

    r
}
