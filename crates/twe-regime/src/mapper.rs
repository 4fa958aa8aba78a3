use crate::Regime;

/// Strategy families named in, used to look up regime fitness
/// without needing to know every concrete strategy name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyFamily {
    TrendFollowing,
    MeanReversion,
    Momentum,
    Microstructure,
    Execution,
    LongHorizon,
    Sentiment,
    Defensive,
}

/// `RegimeStrategyMapper`: fitness ∈ [0,1] per strategy family per regime.
/// Momentum/trend-following score best in trending regimes, mean-reversion
/// best in ranging, defensive best in crisis.
pub fn fitness(regime: Regime, family: StrategyFamily) -> f64 {
    use Regime::*;
    use StrategyFamily::*;
    match (regime, family) {
        (TrendingUp, TrendFollowing) | (TrendingDown, TrendFollowing) => 0.95,
        (TrendingUp, Momentum) | (TrendingDown, Momentum) => 0.85,
        (Ranging, MeanReversion) => 0.90,
        (Ranging, TrendFollowing) => 0.25,
        (HighVolatility, Defensive) => 0.80,
        (Crisis, Defensive) => 0.95,
        (Crisis, _) if family != Defensive => 0.05,
        (HighVolatility, MeanReversion) => 0.45,
        (HighVolatility, Momentum) => 0.35,
        (_, Microstructure) => 0.55,
        (_, Execution) => 0.60,
        (_, LongHorizon) => 0.50,
        (_, Sentiment) => 0.40,
        (TrendingUp, MeanReversion) | (TrendingDown, MeanReversion) => 0.35,
        (Ranging, Momentum) => 0.40,
        (HighVolatility, TrendFollowing) => 0.30,
        (_, Defensive) => 0.50,
    }
}

/// Position scale factor per regime.
pub fn position_scale_factor(regime: Regime) -> f64 {
    match regime {
        Regime::TrendingUp => 1.0,
        Regime::Ranging => 0.7,
        Regime::TrendingDown => 0.5,
        Regime::HighVolatility => 0.3,
        Regime::Crisis => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn momentum_best_in_trending() {
        assert!(fitness(Regime::TrendingUp, StrategyFamily::Momentum) > fitness(Regime::Ranging, StrategyFamily::Momentum));
    }

    #[test]
    fn mean_reversion_best_in_ranging() {
        assert!(
            fitness(Regime::Ranging, StrategyFamily::MeanReversion)
                > fitness(Regime::TrendingUp, StrategyFamily::MeanReversion)
        );
    }

    #[test]
    fn crisis_scale_factor_is_zero() {
        assert_eq!(position_scale_factor(Regime::Crisis), 0.0);
    }

    #[test]
    fn scale_factors_match_spec_ordering() {
        assert!(position_scale_factor(Regime::TrendingUp) > position_scale_factor(Regime::Ranging));
        assert!(position_scale_factor(Regime::Ranging) > position_scale_factor(Regime::TrendingDown));
        assert!(position_scale_factor(Regime::TrendingDown) > position_scale_factor(Regime::HighVolatility));
        assert!(position_scale_factor(Regime::HighVolatility) > position_scale_factor(Regime::Crisis));
    }
}
