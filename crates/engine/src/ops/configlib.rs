//! `configlib.{add,update,remove,rename,comment,list,listref}` (§4.7),
//! grounded on `operation/configlib/add.cpp`'s argument-validation and
//! undo-capture shape.

use crate::configlib::ConfigGroup;
use crate::error::{ConfigError, Result};
use crate::ident::is_valid_identifier;
use crate::operation::{Operation, OperationOutcome, OperationRegistry};
use crate::project::Project;
use crate::protocol::OperationRequest;

pub fn register(registry: &mut OperationRegistry) {
    registry.register("configlib.add", |req| Ok(Box::new(Add::from_request(req)?)));
    registry.register("configlib.update", |req| Ok(Box::new(Update::from_request(req)?)));
    registry.register("configlib.remove", |req| Ok(Box::new(Remove::from_request(req)?)));
    registry.register("configlib.rename", |req| Ok(Box::new(Rename::from_request(req)?)));
    registry.register("configlib.comment", |req| Ok(Box::new(Comment::from_request(req)?)));
    registry.register("configlib.list", |req| Ok(Box::new(List::from_request(req))));
    registry.register("configlib.listref", |req| Ok(Box::new(ListRef::from_request(req)?)));
}

fn required(request: &OperationRequest, name: &'static str, index: u32) -> Result<String> {
    request
        .get_arg(name, index)
        .map(str::to_string)
        .ok_or(ConfigError::MissingArg(name))
        .map_err(Into::into)
}

#[derive(Debug)]
struct Add {
    name: String,
    value: String,
    comment: String,
}

impl Add {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            name: required(req, "name", 0)?,
            value: required(req, "value", 1)?,
            comment: req.get_arg("comment", 2).unwrap_or("").to_string(),
        })
    }
}

impl Operation for Add {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        if !is_valid_identifier(&self.name) {
            return Err(ConfigError::NameInvalid(self.name.clone()).into());
        }
        if project.global_name_conflict(&self.name) {
            return Err(ConfigError::NameConflict(self.name.clone()).into());
        }
        project
            .configlib
            .insert(self.name.clone(), self.value.clone(), self.comment.clone(), ConfigGroup::ProjectDefault)?;
        project.modified.configs = true;
        let mut outcome = OperationOutcome::default();
        let _ = outcome.results.insert("name".into(), self.name.clone());
        Ok(outcome)
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let _ = project.configlib.remove(&self.name)?;
        project.modified.configs = true;
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct Update {
    name: String,
    value: String,
    old_value: Option<String>,
}

impl Update {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            name: required(req, "name", 0)?,
            value: required(req, "value", 1)?,
            old_value: None,
        })
    }
}

impl Operation for Update {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let old = project
            .configlib
            .items
            .get(&self.name)
            .ok_or_else(|| ConfigError::NotFound(self.name.clone()))?
            .expression
            .clone();
        project.configlib.update(&self.name, self.value.clone())?;
        self.old_value = Some(old);
        project.modified.configs = true;
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let old = self.old_value.clone().unwrap_or_default();
        project.configlib.update(&self.name, old)?;
        project.modified.configs = true;
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct Remove {
    name: String,
    restore: Option<(String, String, ConfigGroup)>,
}

impl Remove {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { name: required(req, "name", 0)?, restore: None })
    }
}

impl Operation for Remove {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let removed = project.configlib.remove(&self.name)?;
        self.restore = Some((removed.expression, removed.comment, removed.group));
        project.modified.configs = true;
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let Some((expression, comment, group)) = self.restore.clone() else {
            return Ok(());
        };
        let _ = project.configlib.insert(self.name.clone(), expression, comment, group)?;
        project.modified.configs = true;
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
            return Err(ConfigError::NameInvalid(self.new.clone()).into());
        }
        project.configlib.rename(&self.old, &self.new)?;
        project.modified.configs = true;
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        project.configlib.rename(&self.new, &self.old)?;
        project.modified.configs = true;
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct Comment {
    name: String,
    comment: String,
    old_comment: Option<String>,
}

impl Comment {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { name: required(req, "name", 0)?, comment: required(req, "comment", 1)?, old_comment: None })
    }
}

impl Operation for Comment {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let item = project
            .configlib
            .items
            .get_mut(&self.name)
            .ok_or_else(|| ConfigError::NotFound(self.name.clone()))?;
        self.old_comment = Some(item.comment.clone());
        item.comment = self.comment.clone();
        project.modified.configs = true;
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        if let Some(item) = project.configlib.items.get_mut(&self.name) {
            item.comment = self.old_comment.clone().unwrap_or_default();
        }
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct List {
    with_reference: bool,
}

impl List {
    fn from_request(req: &OperationRequest) -> Self {
        Self { with_reference: req.get_arg("reference", 0).is_some_and(|v| v == "true") }
    }
}

impl Operation for List {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let mut outcome = OperationOutcome::default();
        let mut names: Vec<String> = project.configlib.items.keys().cloned().collect();
        names.sort();
        if self.with_reference {
            for name in &names {
                let item = &project.configlib.items[name];
                let mut refs: Vec<String> = item.references.iter().cloned().collect();
                refs.sort();
                let mut rev: Vec<String> = item.reverse_references.iter().cloned().collect();
                rev.sort();
                let _ = outcome.list_results.insert(format!("{name}.references"), refs);
                let _ = outcome.list_results.insert(format!("{name}.reverse_references"), rev);
            }
        }
        let _ = outcome.list_results.insert("names".into(), names);
        Ok(outcome)
    }

    fn is_modifying(&self) -> bool {
        false
    }
}

#[derive(Debug)]
struct ListRef {
    name: String,
}

impl ListRef {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { name: required(req, "name", 0)? })
    }
}

impl Operation for ListRef {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let item = project
            .configlib
            .items
            .get(&self.name)
            .ok_or_else(|| ConfigError::NotFound(self.name.clone()))?;
        let mut outcome = OperationOutcome::default();
        let mut refs: Vec<String> = item.references.iter().cloned().collect();
        refs.sort();
        let mut rev: Vec<String> = item.reverse_references.iter().cloned().collect();
        rev.sort();
        let _ = outcome.list_results.insert("references".into(), refs);
        let _ = outcome.list_results.insert("reverse_references".into(), rev);
        Ok(outcome)
    }

    fn is_modifying(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn add_then_undo_restores_empty_library() {
        let registry = OperationRegistry::with_builtins();
        let dispatcher = Dispatcher::new(&registry);
        let mut project = Project::new("p".into(), vec![]);
        let resp = dispatcher.do_operation(&mut project, &request("configlib.add", &[("name", "WIDTH"), ("value", "8")]));
        assert_eq!(resp.code, 0);
        assert!(project.configlib.contains("WIDTH"));
        let resp = dispatcher.undo_last(&mut project);
        assert_eq!(resp.code, 0);
        assert!(!project.configlib.contains("WIDTH"));
    }

    #[test]
    fn undo_then_redo_restores_post_state() {
        let registry = OperationRegistry::with_builtins();
        let dispatcher = Dispatcher::new(&registry);
        let mut project = Project::new("p".into(), vec![]);
        let _ = dispatcher.do_operation(&mut project, &request("configlib.add", &[("name", "WIDTH"), ("value", "8")]));
        let _ = dispatcher.do_operation(&mut project, &request("configlib.update", &[("name", "WIDTH"), ("value", "16")]));
        assert_eq!(project.configlib.items["WIDTH"].value, 16);
        let _ = dispatcher.undo_last(&mut project);
        assert_eq!(project.configlib.items["WIDTH"].value, 8);
        let _ = dispatcher.redo_last(&mut project);
        assert_eq!(project.configlib.items["WIDTH"].value, 16);
    }
}
