//! `code.update` (§4.7): the free-form source block attached to a service
//! implementation, a request handler, or a module's per-tick block.

use crate::error::{ModuleError, Result};
use crate::module::CodeSite;
use crate::operation::{Operation, OperationOutcome, OperationRegistry};
use crate::project::Project;
use crate::protocol::OperationRequest;

pub fn register(registry: &mut OperationRegistry) {
    registry.register("code.update", |req| Ok(Box::new(Update::from_request(req)?)));
}

fn required(request: &OperationRequest, name: &'static str, index: u32) -> Result<String> {
    request.get_arg(name, index).map(str::to_string).ok_or(ModuleError::MissingArg(name)).map_err(Into::into)
}

/// Parses `site` as `"tick"`, `"service:<name>"`, or `"request:<name>"`.
fn parse_site(text: &str) -> Result<CodeSite> {
    if text == "tick" {
        return Ok(CodeSite::Tick);
    }
    if let Some(name) = text.strip_prefix("service:") {
        return Ok(CodeSite::ServiceImpl(name.to_string()));
    }
    if let Some(name) = text.strip_prefix("request:") {
        return Ok(CodeSite::RequestHandler(name.to_string()));
    }
    Err(ModuleError::PortNotFound(text.to_string()).into())
}

#[derive(Debug)]
struct Update {
    owner: String,
    site: CodeSite,
    source: String,
    old: Option<String>,
}

impl Update {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            owner: required(req, "owner", 0)?,
            site: parse_site(&required(req, "site", 1)?)?,
            source: required(req, "source", 2)?,
            old: None,
        })
    }
}

impl Operation for Update {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        self.old = module.code.insert(self.site.clone(), self.source.clone());
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        match self.old.take() {
            Some(source) => {
                let _ = module.code.insert(self.site.clone(), source);
            }
            None => {
                let _ = module.code.remove(&self.site);
            }
        }
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Module, ModuleEntry};

    #[test]
    fn update_then_undo_restores_absence() {
        let mut project = Project::new("p".into(), vec![]);
        project.modulelib.add("Top".into(), ModuleEntry::Local(Module::default())).unwrap();
        let mut op = Update { owner: "Top".into(), site: CodeSite::Tick, source: "x = 1;".into(), old: None };
        op.execute(&mut project).unwrap();
        assert_eq!(project.modulelib.modules["Top"].as_local("Top").unwrap().code[&CodeSite::Tick], "x = 1;");
        op.undo(&mut project).unwrap();
        assert!(!project.modulelib.modules["Top"].as_local("Top").unwrap().code.contains_key(&CodeSite::Tick));
    }
}
