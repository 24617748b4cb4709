//! Per-build session context threaded through the pipeline.
//!
//! Owns everything mutable about one build: the current state, the
//! append-only log, the rollback ledger, the resolved partition layout,
//! live mount bookkeeping and the cancellation flag. The pipeline never
//! touches these directly; it goes through the session so state
//! transitions, cancellation checks and log/progress fan-out stay in
//! one place.

use crate::ledger::RollbackLedger;
use crate::planner::ConcretePartition;
use crate::progress::{BuildState, ProgressUpdate};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use usbforge_error::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at_unix_ms: u64,
    pub level: LogLevel,
    pub state: BuildState,
    pub message: String,
}

/// Append-only build log, retained for failure reports and manifests.
#[derive(Debug, Default)]
pub struct BuildLog {
    entries: Vec<LogEntry>,
}

impl BuildLog {
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn tail(&self, n: usize) -> Vec<String> {
        self.entries
            .iter()
            .rev()
            .take(n)
            .rev()
            .map(|e| e.message.clone())
            .collect()
    }

    fn append(&mut self, level: LogLevel, state: BuildState, message: String) {
        self.entries.push(LogEntry {
            at_unix_ms: now_unix_ms(),
            level,
            state,
            message,
        });
    }
}

pub(crate) fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Mutable state for one build run.
pub struct BuildSession {
    state: BuildState,
    cancel: Arc<AtomicBool>,
    progress_tx: Option<SyncSender<ProgressUpdate>>,
    pub log: BuildLog,
    pub ledger: RollbackLedger,
    /// Filled in by the partitioning state.
    pub layout: Vec<ConcretePartition>,
    /// Partition name -> active mount point.
    pub mounts: BTreeMap<String, PathBuf>,
    pub work_dir: PathBuf,
}

impl BuildSession {
    pub fn new(
        cancel: Arc<AtomicBool>,
        progress_tx: Option<SyncSender<ProgressUpdate>>,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            state: BuildState::Initializing,
            cancel,
            progress_tx,
            log: BuildLog::default(),
            ledger: RollbackLedger::new(),
            layout: Vec::new(),
            mounts: BTreeMap::new(),
            work_dir,
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Advance to the next working state and announce it.
    pub fn enter_state(&mut self, state: BuildState) {
        self.state = state;
        self.send_progress(ProgressUpdate::state_started(state));
        self.log_info(format!(
            "[{}/{}] {}",
            state.number(),
            BuildState::total(),
            state.name()
        ));
    }

    pub fn complete_state(&mut self) {
        self.send_progress(ProgressUpdate::StateCompleted { state: self.state });
    }

    pub fn enter_terminal(&mut self, state: BuildState) {
        self.state = state;
    }

    /// Cancellation is observed only here, at state boundaries. An
    /// in-flight operation always runs to completion first.
    pub fn check_cancel(&self) -> Result<(), BuildError> {
        if self.cancel.load(Ordering::SeqCst) {
            Err(BuildError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.log.append(LogLevel::Info, self.state, message.clone());
        self.send_progress(ProgressUpdate::Status(message));
    }

    pub fn log_warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.log.append(LogLevel::Warn, self.state, message.clone());
        self.send_progress(ProgressUpdate::Status(message));
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{}", message);
        self.log.append(LogLevel::Error, self.state, message);
    }

    /// Best-effort send; a hung or dropped receiver never stalls the
    /// build.
    pub fn send_progress(&self, update: ProgressUpdate) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.try_send(update);
        }
    }
}
