//! `module.{add,remove,rename,info,list}` (§4.7): the module-library-level
//! operations, same add/remove/rename shape as [`crate::ops::configlib`] and
//! [`crate::ops::bundlelib`] but operating on whole module entries.

use crate::error::{ModuleError, Result};
use crate::ident::is_valid_identifier;
use crate::module::{Module, ModuleEntry};
use crate::operation::{Operation, OperationOutcome, OperationRegistry};
use crate::project::Project;
use crate::protocol::OperationRequest;

pub fn register(registry: &mut OperationRegistry) {
    registry.register("module.add", |req| Ok(Box::new(Add::from_request(req)?)));
    registry.register("module.remove", |req| Ok(Box::new(Remove::from_request(req)?)));
    registry.register("module.rename", |req| Ok(Box::new(Rename::from_request(req)?)));
    registry.register("module.info", |req| Ok(Box::new(Info::from_request(req)?)));
    registry.register("module.list", |req| Ok(Box::new(List::from_request(req))));
}

fn required(request: &OperationRequest, name: &'static str, index: u32) -> Result<String> {
    request.get_arg(name, index).map(str::to_string).ok_or(ModuleError::MissingArg(name)).map_err(Into::into)
}

#[derive(Debug)]
struct Add {
    name: String,
    comment: String,
}

impl Add {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { name: required(req, "name", 0)?, comment: req.get_arg("comment", 1).unwrap_or("").to_string() })
    }
}

impl Operation for Add {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        if !is_valid_identifier(&self.name) {
            return Err(ModuleError::NameInvalid(self.name.clone()).into());
        }
        if project.global_name_conflict(&self.name) {
            return Err(ModuleError::NameConflict(self.name.clone()).into());
        }
        let module = Module { comment: self.comment.clone(), ..Module::default() };
        project.modulelib.add(self.name.clone(), ModuleEntry::Local(module))?;
        let _ = project.modified.modules.insert(self.name.clone());
        let mut outcome = OperationOutcome::default();
        let _ = outcome.results.insert("name".into(), self.name.clone());
        Ok(outcome)
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let _ = project.modulelib.remove(&self.name)?;
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct Remove {
    name: String,
    restore: Option<ModuleEntry>,
}

impl Remove {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { name: required(req, "name", 0)?, restore: None })
    }
}

impl Operation for Remove {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let removed = project.modulelib.remove(&self.name)?;
        self.restore = Some(removed);
        let _ = project.modified.modules.remove(&self.name);
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let Some(entry) = self.restore.clone() else {
            return Ok(());
        };
        project.modulelib.add(self.name.clone(), entry)?;
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct Rename {
    old: String,
    new: String,
}

impl Rename {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { old: required(req, "old_name", 0)?, new: required(req, "new_name", 1)? })
    }
}

impl Operation for Rename {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        if !is_valid_identifier(&self.new) {
            return Err(ModuleError::NameInvalid(self.new.clone()).into());
        }
        project.modulelib.rename(&self.old, &self.new)?;
        if let Some(was_top) = project.top_module.as_ref().filter(|t| *t == &self.old) {
            let _ = was_top;
            project.top_module = Some(self.new.clone());
        }
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        project.modulelib.rename(&self.new, &self.old)?;
        if let Some(was_top) = project.top_module.as_ref().filter(|t| *t == &self.new) {
            let _ = was_top;
            project.top_module = Some(self.old.clone());
        }
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct Info {
    name: String,
}

impl Info {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { name: required(req, "name", 0)? })
    }
}

impl Operation for Info {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let entry = project.modulelib.get(&self.name)?;
        let mut outcome = OperationOutcome::default();
        let kind = match entry {
            ModuleEntry::Local(m) => {
                let _ = outcome.results.insert("comment".into(), m.comment.clone());
                let _ = outcome.results.insert("instance_count".into(), m.instances.len().to_string());
                "local"
            }
            ModuleEntry::External(_) => "external",
        };
        let _ = outcome.results.insert("kind".into(), kind.into());
        let _ = outcome.results.insert("request_count".into(), entry.requests().len().to_string());
        let _ = outcome.results.insert("service_count".into(), entry.services().len().to_string());
        let _ = outcome.results.insert("pipe_port_count".into(), entry.pipe_ports().len().to_string());
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
        let mut names: Vec<String> = project.modulelib.modules.keys().cloned().collect();
        names.sort();
        let mut outcome = OperationOutcome::default();
        let _ = outcome.list_results.insert("names".into(), names);
        Ok(outcome)
    }

    fn is_modifying(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Dispatcher;
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
    fn add_remove_undo_roundtrip() {
        let registry = OperationRegistry::with_builtins();
        let dispatcher = Dispatcher::new(&registry);
        let mut project = Project::new("p".into(), vec![]);
        let resp = dispatcher.do_operation(&mut project, &request("module.add", &[("name", "Core")]));
        assert_eq!(resp.code, 0);
        assert!(project.modulelib.modules.contains_key("Core"));
        let _ = dispatcher.undo_last(&mut project);
        assert!(!project.modulelib.modules.contains_key("Core"));
    }
}
