use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use twe_schemas::{Bar, Timeframe};

/// Load a bar stream from a CSV with columns
/// `symbol,timeframe,ts,open,high,low,close,volume`. Used by scenario tests
/// that replay a fixed bar file rather than generating synthetic bars.
pub fn load_bars_csv(path: &str) -> Result<Vec<Bar>> {
    let mut rdr = csv::Reader::from_path(path).with_context(|| format!("open bars csv: {path}"))?;
    let mut out = Vec::new();

    for rec in rdr.records() {
        let rec = rec?;
        let timeframe = Timeframe::parse(&rec[1])
            .ok_or_else(|| anyhow::anyhow!("unrecognized timeframe: {}", &rec[1]))?;
        let timestamp: DateTime<Utc> = rec[2].parse().context("parse timestamp")?;
        let bar = Bar {
            symbol: rec[0].to_string(),
            timeframe,
            timestamp,
            open: rec[3].parse().context("parse open")?,
            high: rec[4].parse().context("parse high")?,
            low: rec[5].parse().context("parse low")?,
            close: rec[6].parse().context("parse close")?,
            volume: rec[7].parse().context("parse volume")?,
        };
        out.push(bar);
    }

    for w in out.windows(2) {
        if !(w[0].timestamp < w[1].timestamp) {
            anyhow::bail!("bars not strictly increasing");
        }
    }

    Ok(out)
}

mod recovery;

pub use recovery::{recover_outbox_against_broker, FakeBroker, RecoveryReport};

pub mod orchestrator;
pub mod paper_broker;

pub use orchestrator::{Orchestrator, OrchestratorBar, OrchestratorConfig, OrchestratorReport, OrchestratorRunMeta};
pub use paper_broker::PaperBroker as OrchestratorPaperBroker;
