//! twe-runtime — the process that actually drives `TradingEngine` against
//! persisted bars and a live or paper broker connection (§4.8, §5).
//! `twe-cli`'s `twe_paper_loop` binary is the reference operator surface:
//! it constructs a [`control::RuntimeControl`] and hands it, along with a
//! broker and engine, to [`bar_loop::run_bar_loop`].

pub mod bar_loop;
pub mod control;
pub mod outbox_dispatch;

pub use bar_loop::{run_bar_loop, RunSummary};
pub use control::RuntimeControl;
pub use outbox_dispatch::{dispatch_outbox_batch, DispatchSummary, OutboxOrderPayload};
