/// Classic floor-trader pivot points computed from the prior period's
/// high/low/close. Strategies call this once per new period (typically
/// daily) and hold the result in their own state until the next period rolls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotPoints {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub s1: f64,
    pub s2: f64,
}

pub fn pivot_points(prior_high: f64, prior_low: f64, prior_close: f64) -> PivotPoints {
    let pivot = (prior_high + prior_low + prior_close) / 3.0;
    PivotPoints {
        pivot,
        r1: 2.0 * pivot - prior_low,
        r2: pivot + (prior_high - prior_low),
        s1: 2.0 * pivot - prior_high,
        s2: pivot - (prior_high - prior_low),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pivot_points_matches_floor_trader_formula() {
        let p = pivot_points(110.0, 90.0, 100.0);
        assert!((p.pivot - 100.0).abs() < 1e-9);
        assert!((p.r1 - 110.0).abs() < 1e-9);
        assert!((p.s1 - 90.0).abs() < 1e-9);
        assert!((p.r2 - 120.0).abs() < 1e-9);
        assert!((p.s2 - 80.0).abs() < 1e-9);
    }
}
