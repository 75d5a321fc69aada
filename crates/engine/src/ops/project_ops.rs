//! `project.{info,list,history,rename,top.set}` (§4.7): project-level
//! metadata and the top-module pointer. `project.undo`/`project.redo` are
//! deliberately not operations here — they're served directly by
//! [`crate::operation::Dispatcher::undo_last`]/`redo_last`, since routing
//! them back through `do_operation` would push an undo onto its own history.

use crate::error::{ProjectError, Result};
use crate::ident::is_valid_identifier;
use crate::operation::{Operation, OperationOutcome, OperationRegistry};
use crate::project::Project;
use crate::protocol::OperationRequest;

pub fn register(registry: &mut OperationRegistry) {
    registry.register("project.info", |req| Ok(Box::new(Info::from_request(req))));
    registry.register("project.list", |req| Ok(Box::new(List::from_request(req))));
    registry.register("project.history", |req| Ok(Box::new(History::from_request(req))));
    registry.register("project.rename", |req| Ok(Box::new(Rename::from_request(req)?)));
    registry.register("project.top.set", |req| Ok(Box::new(TopSet::from_request(req)?)));
}

fn required(request: &OperationRequest, name: &'static str, index: u32) -> Result<String> {
    request.get_arg(name, index).map(str::to_string).ok_or(ProjectError::MissingArg(name)).map_err(Into::into)
}

#[derive(Debug)]
struct Info;

impl Info {
    fn from_request(_req: &OperationRequest) -> Self {
        Self
    }
}

impl Operation for Info {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let mut outcome = OperationOutcome::default();
        let _ = outcome.results.insert("name".into(), project.name.clone());
        let _ = outcome.results.insert("top_module".into(), project.top_module.clone().unwrap_or_default());
        let _ = outcome.results.insert("modified".into(), project.modified.any().to_string());
        Ok(outcome)
    }

    fn is_modifying(&self) -> bool {
        false
    }
}

#[derive(Debug)]
struct List;

impl List {
    fn from_request(_req: &OperationRequest) -> Self {
        Self
    }
}

impl Operation for List {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let mut outcome = OperationOutcome::default();
        let mut configs: Vec<String> = project.configlib.items.keys().cloned().collect();
        configs.sort();
        let mut bundles: Vec<String> = project.bundlelib.items.keys().cloned().collect();
        bundles.sort();
        let mut modules: Vec<String> = project.modulelib.modules.keys().cloned().collect();
        modules.sort();
        let mut imports: Vec<String> = project.imports.keys().cloned().collect();
        imports.sort();
        let _ = outcome.list_results.insert("configs".into(), configs);
        let _ = outcome.list_results.insert("bundles".into(), bundles);
        let _ = outcome.list_results.insert("modules".into(), modules);
        let _ = outcome.list_results.insert("imports".into(), imports);
        Ok(outcome)
    }

    fn is_modifying(&self) -> bool {
        false
    }
}

#[derive(Debug)]
struct History;

impl History {
    fn from_request(_req: &OperationRequest) -> Self {
        Self
    }
}

impl Operation for History {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let mut outcome = OperationOutcome::default();
        let _ = outcome.results.insert("undo_depth".into(), project.undo_depth().to_string());
        let _ = outcome.results.insert("redo_depth".into(), project.redo_depth().to_string());
        Ok(outcome)
    }

    fn is_modifying(&self) -> bool {
        false
    }
}

#[derive(Debug)]
struct Rename {
    new_name: String,
    old_name: Option<String>,
}

impl Rename {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { new_name: required(req, "name", 0)?, old_name: None })
    }
}

impl Operation for Rename {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        self.old_name = Some(std::mem::replace(&mut project.name, self.new_name.clone()));
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        if let Some(old) = self.old_name.take() {
            project.name = old;
        }
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct TopSet {
    module_name: String,
    old: Option<Option<String>>,
}

impl TopSet {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { module_name: required(req, "name", 0)?, old: None })
    }
}

impl Operation for TopSet {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        if !is_valid_identifier(&self.module_name) {
            return Err(ProjectError::Io(format!("invalid module name '{}'", self.module_name)).into());
        }
        if !project.modulelib.modules.contains_key(&self.module_name) {
            return Err(crate::error::ModuleError::NotFound(self.module_name.clone()).into());
        }
        self.old = Some(std::mem::replace(&mut project.top_module, Some(self.module_name.clone())));
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        if let Some(old) = self.old.take() {
            project.top_module = old;
        }
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}
