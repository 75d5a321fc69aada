//! `simulation.{start,cancel,state,list}` (§4.8): the wire surface over a
//! project's [`crate::simulation::SimulationManager`]. None of these touch
//! project data directly, so none are undoable — a running task is runtime
//! state, not part of the design the undo/redo stacks track.

use crate::error::{ProjectError, Result};
use crate::operation::{Operation, OperationOutcome, OperationRegistry};
use crate::project::Project;
use crate::protocol::OperationRequest;
use crate::simulation::generation::GenerationConfig;
use crate::simulation::compilation::CompilationConfig;
use crate::simulation::run::SimulationConfig;

pub fn register(registry: &mut OperationRegistry) {
    registry.register("simulation.start", |req| Ok(Box::new(Start::from_request(req)?)));
    registry.register("simulation.cancel", |req| Ok(Box::new(Cancel::from_request(req))));
    registry.register("simulation.state", |req| Ok(Box::new(State::from_request(req))));
}

fn required(request: &OperationRequest, name: &'static str, index: u32) -> Result<String> {
    request.get_arg(name, index).map(str::to_string).ok_or(ProjectError::MissingArg(name)).map_err(Into::into)
}

#[derive(Debug)]
struct Start {
    run_id: String,
    release_mode: bool,
}

impl Start {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        let run_id = required(req, "run_id", 0)?;
        let release_mode = req.get_arg("release_mode", 1).map(|v| v == "true").unwrap_or(false);
        Ok(Self { run_id, release_mode })
    }
}

impl Operation for Start {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        project.simulation.start_task(
            project,
            self.run_id.clone(),
            GenerationConfig::default(),
            CompilationConfig { release_mode: self.release_mode, ..CompilationConfig::default() },
            SimulationConfig::default(),
        )?;
        Ok(OperationOutcome::default())
    }

    fn is_modifying(&self) -> bool {
        false
    }
}

#[derive(Debug)]
struct Cancel;

impl Cancel {
    fn from_request(_req: &OperationRequest) -> Self {
        Self
    }
}

impl Operation for Cancel {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        project.simulation.cancel_task()?;
        Ok(OperationOutcome::default())
    }

    fn is_modifying(&self) -> bool {
        false
    }
}

#[derive(Debug)]
struct State;

impl State {
    fn from_request(_req: &OperationRequest) -> Self {
        Self
    }
}

impl Operation for State {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let state = project.simulation.state();
        let mut outcome = OperationOutcome::default();
        let _ = outcome.results.insert("run_id".into(), state.run_id);
        let _ = outcome.results.insert("running".into(), state.running.to_string());
        let _ = outcome.results.insert("generation_finished".into(), state.generation.finished.to_string());
        let _ = outcome.results.insert("compilation_finished".into(), state.compilation.finished.to_string());
        let _ = outcome.results.insert("simulation_finished".into(), state.simulation.finished.to_string());
        if let Some(stats) = state.simulation.stats {
            let _ = outcome.results.insert("cycles".into(), stats.cycles.to_string());
            let _ = outcome.results.insert("instret".into(), stats.instret.to_string());
            let _ = outcome.results.insert("stalls".into(), stats.stalls.to_string());
            let _ = outcome.results.insert("flushes".into(), stats.flushes.to_string());
            let _ = outcome.results.insert("traps".into(), stats.traps.to_string());
        }
        let _ = outcome.list_results.insert("generation_errors".into(), state.generation.errors);
        let _ = outcome.list_results.insert("compilation_errors".into(), state.compilation.errors);
        let _ = outcome.list_results.insert("simulation_errors".into(), state.simulation.errors);
        Ok(outcome)
    }

    fn is_modifying(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Module, ModuleEntry};
    use crate::operation::{Dispatcher, OperationRegistry};
    use crate::protocol::OperationArg;

    fn request(name: &str, args: &[(&str, &str)]) -> OperationRequest {
        OperationRequest {
            name: name.to_string(),
            args: args
                .iter()
                .enumerate()
                .map(|(i, (n, v))| OperationArg { index: i as u32, name: (*n).to_string(), value: (*v).to_string() })
                .collect(),
        }
    }

    #[test]
    fn start_and_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = Project::new("p".into(), vec![]);
        project.set_root(dir.path().to_path_buf());
        project.modulelib.add("Top".into(), ModuleEntry::Local(Module::default())).unwrap();
        project.top_module = Some("Top".into());

        let registry = OperationRegistry::with_builtins();
        let dispatcher = Dispatcher::new(&registry);
        let resp = dispatcher.do_operation(&mut project, &request("simulation.start", &[("run_id", "run-1")]));
        assert_eq!(resp.code, 0, "{}", resp.msg);

        let resp = dispatcher.do_operation(&mut project, &request("simulation.state", &[]));
        assert_eq!(resp.code, 0, "{}", resp.msg);
        assert_eq!(resp.results.get("run_id").map(String::as_str), Some("run-1"));
    }

    #[test]
    fn cancel_without_running_task_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = Project::new("p".into(), vec![]);
        project.set_root(dir.path().to_path_buf());

        let registry = OperationRegistry::with_builtins();
        let dispatcher = Dispatcher::new(&registry);
        let resp = dispatcher.do_operation(&mut project, &request("simulation.cancel", &[]));
        assert_ne!(resp.code, 0);
    }
}
