mod commands;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

#[cfg(feature = "testkit")]
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "twe")]
#[command(about = "Taiwan-market trading engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> engine -> risk -> stress...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Run lifecycle commands
    Run {
        #[command(subcommand)]
        cmd: RunCmd,
    },

    /// Strategy-matrix backtests
    Bkt {
        #[command(subcommand)]
        cmd: BktCmd,
    },

    /// Market-data ingestion
    Md {
        #[command(subcommand)]
        cmd: MdCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,
    Migrate,
}

#[derive(Subcommand)]
enum RunCmd {
    /// Create a new run row in DB and print run_id + hashes.
    Start {
        /// Engine ID (e.g. MAIN, EXP)
        #[arg(long)]
        engine: String,

        /// Mode (BACKTEST | PAPER | LIVE)
        #[arg(long)]
        mode: String,

        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },

    /// Move a run from CREATED to ARMED (requires manual confirmation for LIVE).
    Arm {
        #[arg(long)]
        run_id: String,

        /// Manual confirmation phrase, required when arming a LIVE run.
        #[arg(long)]
        confirm: Option<String>,
    },

    /// Move an ARMED run to RUNNING.
    Begin {
        #[arg(long)]
        run_id: String,
    },

    /// Move a RUNNING run to STOPPED.
    Stop {
        #[arg(long)]
        run_id: String,
    },

    /// Halt a run immediately with a reason.
    Halt {
        #[arg(long)]
        run_id: String,

        #[arg(long)]
        reason: String,
    },

    /// Record a liveness heartbeat for a run.
    Heartbeat {
        #[arg(long)]
        run_id: String,
    },

    /// Print a run's current lifecycle status and timestamps.
    Status {
        #[arg(long)]
        run_id: String,
    },

    /// Check whether a run's heartbeat has exceeded its deadman TTL.
    DeadmanCheck {
        #[arg(long)]
        run_id: String,

        #[arg(long, default_value_t = 60)]
        ttl_seconds: i64,
    },

    /// Halt a run if its deadman TTL has been exceeded.
    DeadmanEnforce {
        #[arg(long)]
        run_id: String,

        #[arg(long, default_value_t = 60)]
        ttl_seconds: i64,
    },

    /// Replay a synthetic bar stream through the diagnostic orchestrator.
    #[cfg(feature = "testkit")]
    Loop {
        #[arg(long)]
        run_id: String,

        #[arg(long)]
        symbol: String,

        #[arg(long, default_value_t = 100)]
        bars: usize,

        #[arg(long = "timeframe-secs", default_value_t = 60)]
        timeframe_secs: u64,

        #[arg(long = "exports-root", default_value = "../exports")]
        exports_root: PathBuf,

        #[arg(long, default_value = "loop")]
        label: String,
    },
}

#[derive(Subcommand)]
enum BktCmd {
    /// Run the strategy matrix against bars loaded from a CSV file.
    Csv {
        #[arg(long = "bars")]
        bars_path: String,

        #[arg(long)]
        strategies: Option<String>,

        #[arg(long = "out-dir")]
        out_dir: Option<String>,
    },

    /// Run the strategy matrix against bars loaded from `twe-db`.
    Db {
        #[arg(long)]
        symbols: Option<String>,

        #[arg(long, default_value = "M1")]
        timeframe: String,

        #[arg(long)]
        start: DateTime<Utc>,

        #[arg(long)]
        end: DateTime<Utc>,

        #[arg(long)]
        strategies: Option<String>,

        #[arg(long = "out-dir")]
        out_dir: Option<String>,
    },
}

#[derive(Subcommand)]
enum MdCmd {
    /// Ingest a CSV bar file into the `md_bars` cache.
    IngestCsv {
        #[arg(long)]
        path: String,

        #[arg(long)]
        timeframe: String,

        #[arg(long)]
        source: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = twe_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = twe_db::status(&pool).await?;
                    println!("db_ok={} has_runs_table={}", s.ok, s.has_runs_table);
                }
                DbCmd::Migrate => {
                    twe_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = twe_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Run { cmd } => match cmd {
            RunCmd::Start { engine, mode, config_paths } => {
                commands::run::run_start(engine, mode, config_paths).await?;
            }
            RunCmd::Arm { run_id, confirm } => {
                commands::run::run_arm(run_id, confirm).await?;
            }
            RunCmd::Begin { run_id } => {
                commands::run::run_begin(run_id).await?;
            }
            RunCmd::Stop { run_id } => {
                commands::run::run_stop(run_id).await?;
            }
            RunCmd::Halt { run_id, reason } => {
                commands::run::run_halt(run_id, reason).await?;
            }
            RunCmd::Heartbeat { run_id } => {
                commands::run::run_heartbeat(run_id).await?;
            }
            RunCmd::Status { run_id } => {
                commands::run::run_status(run_id).await?;
            }
            RunCmd::DeadmanCheck { run_id, ttl_seconds } => {
                commands::run::run_deadman_check(run_id, ttl_seconds).await?;
            }
            RunCmd::DeadmanEnforce { run_id, ttl_seconds } => {
                commands::run::run_deadman_enforce(run_id, ttl_seconds).await?;
            }
            #[cfg(feature = "testkit")]
            RunCmd::Loop { run_id, symbol, bars, timeframe_secs, exports_root, label } => {
                commands::run::run_loop(run_id, symbol, bars, timeframe_secs, exports_root, label)?;
            }
        },

        Commands::Bkt { cmd } => match cmd {
            BktCmd::Csv { bars_path, strategies, out_dir } => {
                commands::bkt::run_backtest_csv(bars_path, strategies, out_dir).await?;
            }
            BktCmd::Db { symbols, timeframe, start, end, strategies, out_dir } => {
                commands::bkt::run_backtest_db(symbols, timeframe, start, end, strategies, out_dir).await?;
            }
        },

        Commands::Md { cmd } => match cmd {
            MdCmd::IngestCsv { path, timeframe, source } => {
                commands::backtest::md_ingest_csv(path, timeframe, source).await?;
            }
        },
    }

    Ok(())
}
