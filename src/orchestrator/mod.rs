//! Resumable full-run state machine.
//!
//! Each round runs fill, maintenance, read and queries. A step runs only if
//! its flag for the current round is unset, and the state is saved right
//! after each step completes, so a restarted run picks up at the first
//! unfinished step. The row count is always re-read from the table.

pub mod mock_steps;
mod state;
mod steps;

pub use state::{BenchRunState, FileStateStore, RoundFlags, RunParams, StateStore};
pub use steps::{BenchSteps, LiveSteps};

use crate::error::BenchError;
use crate::runlog::RunLog;
use anyhow::{Context, Result};
use tracing::{info, warn};

/// How a completed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Round the run finished in
    pub rounds: u32,
    pub total_rows: u64,
    pub resumed: bool,
}

pub struct BenchOrchestrator<'a, S: BenchSteps, T: StateStore> {
    steps: &'a S,
    store: &'a T,
    params: RunParams,
    log: &'a RunLog,
}

impl<'a, S: BenchSteps, T: StateStore> BenchOrchestrator<'a, S, T> {
    pub fn new(steps: &'a S, store: &'a T, params: RunParams, log: &'a RunLog) -> Self {
        Self {
            steps,
            store,
            params,
            log,
        }
    }

    /// Drive rounds until the target row count is reached and the last
    /// round's benchmarks have run.
    ///
    /// A failed step is written to the run log and returned; its flag stays
    /// unset so the next run retries it.
    pub async fn run(&self) -> Result<RunOutcome> {
        let result = match self.run_rounds().await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.log.error(&err);
                if let Some(path) = self.log.path() {
                    self.log.line(format!("Run log: {}", path.display()));
                }
                Err(err)
            }
        };
        if let Some(path) = self.log.path() {
            if !self.log.file_active() {
                warn!(path = %path.display(), "Run log is incomplete; later lines went to stdout only");
            }
        }
        result
    }

    fn load_or_fresh(&self) -> Result<(BenchRunState, bool)> {
        let saved = self.store.load().context("Failed to load run state")?;
        match saved {
            Some(state) if state.matches(&self.params) => {
                self.log.line(format!(
                    "State: resuming (round {}, {} rows, completed: {}).",
                    state.current_round, state.total_rows, state.completed_this_round
                ));
                Ok((state, true))
            }
            _ => {
                self.log.line("State: new run (no state or params changed).");
                Ok((BenchRunState::fresh(self.params), false))
            }
        }
    }

    fn save(&self, state: &BenchRunState) -> Result<()> {
        self.store.save(state).context("Failed to save run state")
    }

    /// Row count, recreating the table once if it has disappeared.
    async fn count_or_heal(&self) -> Result<u64, BenchError> {
        let variant = self.params.table;
        match self.steps.row_count(variant).await {
            Err(e) if e.is_table_missing() => {
                self.log.line("  Table missing, creating...");
                self.steps.create_table(variant).await?;
                self.steps.row_count(variant).await
            }
            other => other,
        }
    }

    async fn run_rounds(&self) -> Result<RunOutcome> {
        let variant = self.params.table;
        let (mut state, resumed) = self.load_or_fresh()?;

        if !state.completed_this_round.create {
            self.log.line("Step 1: Create table...");
            self.steps
                .create_table(variant)
                .await
                .context("Create table failed")?;
            state.completed_this_round.create = true;
            state.total_rows = self.count_or_heal().await.context("Row count failed")?;
            self.save(&state)?;
            self.log.line("Step 1: Create table... ok");
        } else {
            self.log.line("Step 1: Create table... skipped (already done).");
            state.total_rows = self.count_or_heal().await.context("Row count failed")?;
        }

        loop {
            let flags = state.completed_this_round;
            if state.target_reached() && flags.read && flags.queries {
                break;
            }

            let to_add = state.rows_to_add();
            self.log.line(format!(
                "--- Round {}: current rows {}, adding {} ---",
                state.current_round, state.total_rows, to_add
            ));

            if !state.completed_this_round.fill {
                self.fill_step(&mut state, to_add).await?;
            } else {
                self.log.line("Step 2: Batch fill... skipped (already done this round).");
                state.total_rows = self.count_or_heal().await.context("Row count failed")?;
            }

            if !state.completed_this_round.maintenance {
                self.maintenance_step().await?;
                state.completed_this_round.maintenance = true;
                self.save(&state)?;
            } else {
                self.log.line("Step 3: Index and logging... skipped (already done this round).");
            }

            if !state.completed_this_round.read {
                if state.total_rows > 0 {
                    self.log.line("Step 4: Read benchmark...");
                    self.steps
                        .read(variant, self.log)
                        .await
                        .context("Read benchmark failed")?;
                } else {
                    self.log.line("Step 4: Read benchmark... skipped (table empty).");
                }
                state.completed_this_round.read = true;
                self.save(&state)?;
            } else {
                self.log.line("Step 4: Read benchmark... skipped (already done this round).");
            }

            if !state.completed_this_round.queries {
                if state.total_rows > 0 {
                    self.log.line("Step 5: Queries benchmark...");
                    self.steps
                        .queries(variant, self.log)
                        .await
                        .context("Queries benchmark failed")?;
                } else {
                    self.log.line("Step 5: Queries benchmark... skipped (table empty).");
                }
                state.completed_this_round.queries = true;
                self.save(&state)?;
            } else {
                self.log.line("Step 5: Queries benchmark... skipped (already done this round).");
            }

            if state.target_reached() {
                self.log.line(format!(
                    "Reached target of {} rows. Done.",
                    state.record_max
                ));
                break;
            }

            self.log.line(format!(
                "Total rows {} < target {}. Next round.",
                state.total_rows, state.record_max
            ));
            state.next_round();
            self.save(&state)?;
        }

        if let Some(path) = self.log.path() {
            self.log.line(format!("Run log: {}", path.display()));
        }
        info!(
            table = %variant,
            rounds = state.current_round,
            rows = state.total_rows,
            "Full benchmark finished"
        );

        Ok(RunOutcome {
            rounds: state.current_round,
            total_rows: state.total_rows,
            resumed,
        })
    }

    async fn fill_step(&self, state: &mut BenchRunState, to_add: u64) -> Result<()> {
        let variant = self.params.table;
        if to_add > 0 {
            self.log.line("Step 2: Batch fill...");
            if variant.is_indexed() {
                self.steps
                    .drop_index(variant)
                    .await
                    .context("Drop index failed")?;
            }
            if !variant.is_partitioned() {
                self.steps
                    .set_logged(variant, false)
                    .await
                    .context("Switching to UNLOGGED failed")?;
            }
            self.steps
                .fill(variant, to_add, state.fill_batch, self.log)
                .await
                .context("Batch fill failed")?;
        } else {
            self.log.line("Step 2: Batch fill... nothing to add.");
        }

        let before = state.total_rows;
        state.total_rows = self.count_or_heal().await.context("Row count failed")?;
        if to_add > 0 && state.total_rows <= before {
            anyhow::bail!(
                "Batch fill made no progress: {} rows before and {} after",
                before,
                state.total_rows
            );
        }
        state.completed_this_round.fill = true;
        self.save(state)?;
        self.log
            .line(format!("  Total rows after fill: {}", state.total_rows));
        Ok(())
    }

    /// Restore durable logging and rebuild the index after a fill.
    async fn maintenance_step(&self) -> Result<()> {
        let variant = self.params.table;
        if !variant.is_partitioned() {
            self.log.line("Step 3: Restoring LOGGED mode...");
            self.steps
                .set_logged(variant, true)
                .await
                .context("Switching to LOGGED failed")?;
        }
        if variant.is_indexed() {
            self.log.line("Step 3: Rebuilding index...");
            let elapsed = self
                .steps
                .create_index(variant)
                .await
                .context("Index rebuild failed")?;
            self.log
                .line(format!("  Index rebuilt in {} ms", elapsed.as_millis()));
            self.steps
                .analyze(variant)
                .await
                .context("ANALYZE failed")?;
        }
        Ok(())
    }
}
