//! `SimulationManager` (§4.8), grounded on `simulation/simman.h`'s
//! `SimulationManager`: one task at a time, driven by a single background
//! thread, reporting progress through a mutex-guarded [`TaskState`] and
//! cancelled cooperatively through an `AtomicBool` — the same shape as the
//! original's `state_mtx`/`sim_thread`/`all_cancel_flag` trio.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ProjectError, Result};
use crate::module::ModuleLibrary;
use crate::persistence::RunPaths;
use crate::project::Project;
use crate::simulation::compilation::{self, CompilationConfig, CompilationStepInfo};
use crate::simulation::generation::{self, GenerationConfig, GenerationStepInfo};
use crate::simulation::logbus::LogBus;
use crate::simulation::run::{self, SimulationConfig, SimulationStepInfo};

fn now_us() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_micros() as u64).unwrap_or(0)
}

/// A read-only slice of the project a background task needs: enough to
/// elaborate the design without requiring `Project` itself (whose undo/redo
/// stacks of `Box<dyn Operation>` can't be shipped across threads) to be
/// `Clone`.
struct ProjectSnapshot {
    top_module: Option<String>,
    modulelib: ModuleLibrary,
}

impl ProjectSnapshot {
    fn capture(project: &Project) -> Self {
        Self { top_module: project.top_module.clone(), modulelib: project.modulelib.clone() }
    }

    fn top_module_name(&self) -> Option<&str> {
        self.top_module.as_deref()
    }
}

/// Overall task progress (§4.8), one step per pipeline stage.
#[derive(Debug, Clone, Default)]
pub struct TaskState {
    pub run_id: String,
    pub running: bool,
    pub generation: GenerationStepInfo,
    pub compilation: CompilationStepInfo,
    pub simulation: SimulationStepInfo,
}

/// A handle a caller can poll or cancel; returned by `start_task`.
#[derive(Debug, Clone, Copy)]
pub struct TaskHandle;

/// Drives one simulation task at a time against a project's `runs/`
/// directory.
pub struct SimulationManager {
    project_root: PathBuf,
    state: Arc<Mutex<TaskState>>,
    cancel: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
    log: Arc<LogBus>,
}

impl SimulationManager {
    #[must_use]
    pub fn new(project_root: PathBuf, log: Arc<LogBus>) -> Self {
        Self {
            project_root,
            state: Arc::new(Mutex::new(TaskState::default())),
            cancel: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
            log,
        }
    }

    #[must_use]
    pub fn log(&self) -> &LogBus {
        &self.log
    }

    /// True if a task's background thread is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner).running
    }

    /// Snapshot of the current (or most recently finished) task.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Runs generation synchronously (it's just file writes), then — if it
    /// succeeded — spawns a background thread for compilation and simulation,
    /// the two stages that can actually take a while and that cancellation
    /// matters for.
    pub fn start_task(
        &self,
        project: &Project,
        run_id: String,
        generation_config: GenerationConfig,
        compilation_config: CompilationConfig,
        simulation_config: SimulationConfig,
    ) -> Result<TaskHandle> {
        if self.is_running() {
            return Err(ProjectError::AlreadyRunning.into());
        }

        let snapshot = ProjectSnapshot::capture(project);
        let paths = RunPaths::new(&self.project_root, &run_id);
        let gen_info = run_generation_against_snapshot(&snapshot, &paths, &generation_config, &self.log);

        {
            let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            *state = TaskState { run_id: run_id.clone(), running: gen_info.finished, generation: gen_info.clone(), ..TaskState::default() };
        }
        if !gen_info.finished {
            return Ok(TaskHandle);
        }

        self.cancel.store(false, Ordering::Relaxed);
        let state = Arc::clone(&self.state);
        let cancel = Arc::clone(&self.cancel);
        let log = Arc::clone(&self.log);

        let handle = std::thread::spawn(move || {
            let comp_info = compilation::run(&paths, &compilation_config, &log, now_us());
            {
                let mut state = state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                state.compilation = comp_info.clone();
            }
            if comp_info.finished {
                let sim_info = run::run(&paths, &simulation_config, &cancel, &log, now_us());
                let mut state = state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                state.simulation = sim_info;
            }
            let mut state = state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            state.running = false;
        });

        *self.thread.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(handle);
        Ok(TaskHandle)
    }

    /// Sets the cooperative cancel flag; the simulation stage's tick loop
    /// checks it every iteration. Compilation, once a child process has been
    /// spawned, runs to completion — only the simulate step is preemptible.
    pub fn cancel_task(&self) -> Result<()> {
        if !self.is_running() {
            return Err(ProjectError::NotRunning.into());
        }
        self.cancel.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Joins a finished background thread, if any, reclaiming its handle.
    pub fn reap(&self) {
        let mut slot = self.thread.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                *slot = Some(handle);
            }
        }
    }
}

fn run_generation_against_snapshot(
    snapshot: &ProjectSnapshot,
    paths: &RunPaths,
    config: &GenerationConfig,
    log: &LogBus,
) -> GenerationStepInfo {
    // `generation::run` is written against `&Project` for a cleaner public
    // API; reconstruct just enough of one here. A bare-metal project with no
    // undo history round-trips through `Project::new` losslessly for this
    // purpose since only `top_module`/`modulelib` are read.
    let mut shim = Project::new(String::new(), Vec::new());
    shim.top_module = snapshot.top_module_name().map(str::to_string);
    shim.modulelib = snapshot.modulelib.clone();
    generation::run(&shim, paths, config, log, now_us())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Module, ModuleEntry};
    use tempfile::tempdir;

    #[test]
    fn start_task_without_top_module_finishes_without_running() {
        let dir = tempdir().unwrap();
        let manager = SimulationManager::new(dir.path().to_path_buf(), Arc::new(LogBus::new()));
        let project = Project::new("p".into(), vec![]);
        manager
            .start_task(
                &project,
                "run-1".into(),
                GenerationConfig::default(),
                CompilationConfig::default(),
                SimulationConfig::default(),
            )
            .unwrap();
        assert!(!manager.is_running());
        assert!(!manager.state().generation.finished);
    }

    #[test]
    fn start_task_rejects_concurrent_runs() {
        let dir = tempdir().unwrap();
        let manager = SimulationManager::new(dir.path().to_path_buf(), Arc::new(LogBus::new()));
        let mut project = Project::new("p".into(), vec![]);
        project.modulelib.add("Top".into(), ModuleEntry::Local(Module::default())).unwrap();
        project.top_module = Some("Top".into());
        manager
            .start_task(
                &project,
                "run-1".into(),
                GenerationConfig::default(),
                CompilationConfig { release_mode: false, command: vec!["sleep".into(), "1".into()] },
                SimulationConfig::default(),
            )
            .unwrap();
        let err = manager.start_task(
            &project,
            "run-2".into(),
            GenerationConfig::default(),
            CompilationConfig::default(),
            SimulationConfig::default(),
        );
        assert!(err.is_err());
    }
}
