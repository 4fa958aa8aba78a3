use std::collections::{BTreeMap, VecDeque};

use twe_schemas::Bar;

/// Bounded per-symbol bar history shared by most strategy implementations.
/// Each strategy instance keeps one of these; `reset()` clears it entirely.
#[derive(Debug, Clone, Default)]
pub struct SymbolWindows {
    capacity: usize,
    by_symbol: BTreeMap<String, VecDeque<Bar>>,
}

impl SymbolWindows {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            by_symbol: BTreeMap::new(),
        }
    }

    /// Push `bar` onto its symbol's window, evicting the oldest bar once
    /// `capacity` is exceeded. Returns the window after the push.
    pub fn push(&mut self, bar: &Bar) -> &VecDeque<Bar> {
        let window = self.by_symbol.entry(bar.symbol.clone()).or_default();
        window.push_back(bar.clone());
        while window.len() > self.capacity {
            window.pop_front();
        }
        window
    }

    pub fn window(&self, symbol: &str) -> Option<&VecDeque<Bar>> {
        self.by_symbol.get(symbol)
    }

    pub fn len(&self, symbol: &str) -> usize {
        self.by_symbol.get(symbol).map(|w| w.len()).unwrap_or(0)
    }

    pub fn closes(&self, symbol: &str) -> Vec<f64> {
        self.by_symbol
            .get(symbol)
            .map(|w| w.iter().map(|b| b.close).collect())
            .unwrap_or_default()
    }

    pub fn highs(&self, symbol: &str) -> Vec<f64> {
        self.by_symbol
            .get(symbol)
            .map(|w| w.iter().map(|b| b.high).collect())
            .unwrap_or_default()
    }

    pub fn lows(&self, symbol: &str) -> Vec<f64> {
        self.by_symbol
            .get(symbol)
            .map(|w| w.iter().map(|b| b.low).collect())
            .unwrap_or_default()
    }

    pub fn volumes(&self, symbol: &str) -> Vec<f64> {
        self.by_symbol
            .get(symbol)
            .map(|w| w.iter().map(|b| b.volume as f64).collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.by_symbol.clear();
    }
}
