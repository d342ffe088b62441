use serde::Serialize;
use std::fmt;

/// The four ordered steps of a synchronization run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Pull,
    Import,
    Push,
    Export,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Pull, Stage::Import, Stage::Push, Stage::Export];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Pull => "pull",
            Stage::Import => "import",
            Stage::Push => "push",
            Stage::Export => "export",
        }
    }

    fn index(self) -> usize {
        match self {
            Stage::Pull => 0,
            Stage::Import => 1,
            Stage::Push => 2,
            Stage::Export => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StageState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

/// Snapshot published to observers after every state change.
#[derive(Clone, Debug, Serialize)]
pub struct SyncStatus {
    /// Stage currently running, if any.
    pub current: Option<Stage>,
    pub stages: Vec<(Stage, StageState)>,
    /// 0..=100 within the current stage. Not an end-to-end percentage; it
    /// resets at each stage start and is a user-feedback approximation, not
    /// exact telemetry.
    pub progress_percent: u8,
    /// Last human-readable status line.
    pub message: String,
    pub failed: bool,
    pub finished: bool,
}

/// One execution of the pipeline. Lives only in memory and is mutated
/// solely by the orchestrator; durability belongs to the product table.
#[derive(Debug)]
pub struct SyncRun {
    states: [StageState; 4],
    current: Option<Stage>,
    progress_percent: u8,
    message: String,
    finished: bool,
}

impl SyncRun {
    pub fn new() -> Self {
        Self {
            states: [StageState::Pending; 4],
            current: None,
            progress_percent: 0,
            message: String::new(),
            finished: false,
        }
    }

    pub fn skip_stage(&mut self, stage: Stage) {
        self.states[stage.index()] = StageState::Skipped;
    }

    /// Mark a stage running and reset the per-stage progress scale.
    pub fn start_stage(&mut self, stage: Stage) {
        self.states[stage.index()] = StageState::Running;
        self.current = Some(stage);
        self.progress_percent = 0;
        self.message = format!("{stage} started");
    }

    /// Report real completion counts for the running stage. The percentage
    /// is monotonically non-decreasing and capped at 99 until the stage's
    /// terminal event; with an unknown total it holds its last value.
    pub fn report_progress(&mut self, done: u64, total: Option<u64>, message: impl Into<String>) {
        if let Some(total) = total {
            let pct = if total == 0 {
                99
            } else {
                ((done.min(total) * 100) / total).min(99) as u8
            };
            self.progress_percent = self.progress_percent.max(pct);
        }
        self.message = message.into();
    }

    pub fn succeed_stage(&mut self, stage: Stage, detail: impl Into<String>) {
        self.states[stage.index()] = StageState::Succeeded;
        self.progress_percent = 100;
        self.message = detail.into();
    }

    pub fn fail_stage(&mut self, stage: Stage, error: impl Into<String>) {
        self.states[stage.index()] = StageState::Failed;
        self.message = format!("{stage} failed: {}", error.into());
    }

    /// Close the run; the final message summarizes any stage failures.
    pub fn finish(&mut self, summary: impl Into<String>) {
        self.current = None;
        self.finished = true;
        self.message = summary.into();
    }

    pub fn failed(&self) -> bool {
        self.states.contains(&StageState::Failed)
    }

    pub fn state_of(&self, stage: Stage) -> StageState {
        self.states[stage.index()]
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            current: self.current,
            stages: Stage::ALL
                .iter()
                .map(|&s| (s, self.states[s.index()]))
                .collect(),
            progress_percent: self.progress_percent,
            message: self.message.clone(),
            failed: self.failed(),
            finished: self.finished,
        }
    }
}

impl Default for SyncRun {
    fn default() -> Self {
        Self::new()
    }
}
