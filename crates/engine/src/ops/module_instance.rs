//! `module.instance.{set,remove}` and `module.config.set` (§4.7): child
//! instances and a module's own local config-override library.

use std::collections::HashMap;

use crate::configlib::ConfigGroup;
use crate::error::{ModuleError, Result};
use crate::ident::is_valid_identifier;
use crate::module::Instance;
use crate::operation::{Operation, OperationOutcome, OperationRegistry};
use crate::project::Project;
use crate::protocol::OperationRequest;

pub fn register(registry: &mut OperationRegistry) {
    registry.register("module.instance.set", |req| Ok(Box::new(InstanceSet::from_request(req)?)));
    registry.register("module.instance.remove", |req| Ok(Box::new(InstanceRemove::from_request(req)?)));
    registry.register("module.config.set", |req| Ok(Box::new(ConfigSet::from_request(req)?)));
}

fn required(request: &OperationRequest, name: &'static str, index: u32) -> Result<String> {
    request.get_arg(name, index).map(str::to_string).ok_or(ModuleError::MissingArg(name)).map_err(Into::into)
}

fn parse_overrides(text: &str) -> Result<HashMap<String, String>> {
    if text.is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(text).map_err(|_| ModuleError::MissingArg("config_overrides").into())
}

#[derive(Debug)]
struct InstanceSet {
    owner: String,
    instance_name: String,
    module_name: String,
    overrides: String,
    previous: Option<Instance>,
}

impl InstanceSet {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            owner: required(req, "owner", 0)?,
            instance_name: required(req, "instance_name", 1)?,
            module_name: required(req, "module_name", 2)?,
            overrides: req.get_arg("config_overrides", 3).unwrap_or("").to_string(),
            previous: None,
        })
    }
}

impl Operation for InstanceSet {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        if !is_valid_identifier(&self.instance_name) {
            return Err(ModuleError::NameInvalid(self.instance_name.clone()).into());
        }
        let overrides = parse_overrides(&self.overrides)?;
        let previous = project
            .modulelib
            .get(&self.owner)
            .ok()
            .and_then(|entry| entry.as_local(&self.owner).ok())
            .and_then(|m| m.instances.get(&self.instance_name).cloned());
        self.previous = previous;
        project.modulelib.set_instance(&self.owner, self.instance_name.clone(), self.module_name.clone(), overrides)?;
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        match self.previous.take() {
            Some(instance) => {
                let _ = module.instances.insert(self.instance_name.clone(), instance);
            }
            None => {
                let _ = module.instances.remove(&self.instance_name);
            }
        }
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct InstanceRemove {
    owner: String,
    instance_name: String,
    restore: Option<Instance>,
}

impl InstanceRemove {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { owner: required(req, "owner", 0)?, instance_name: required(req, "instance_name", 1)?, restore: None })
    }
}

impl Operation for InstanceRemove {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        let removed = module
            .instances
            .remove(&self.instance_name)
            .ok_or_else(|| ModuleError::InstanceNotFound(self.instance_name.clone()))?;
        self.restore = Some(removed);
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let Some(instance) = self.restore.clone() else {
            return Ok(());
        };
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        let _ = module.instances.insert(self.instance_name.clone(), instance);
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct ConfigSet {
    owner: String,
    name: String,
    value: String,
    comment: String,
    previously_existed: bool,
    old_expression: Option<String>,
}

impl ConfigSet {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            owner: required(req, "owner", 0)?,
            name: required(req, "name", 1)?,
            value: required(req, "value", 2)?,
            comment: req.get_arg("comment", 3).unwrap_or("").to_string(),
            previously_existed: false,
            old_expression: None,
        })
    }
}

impl Operation for ConfigSet {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        if !is_valid_identifier(&self.name) {
            return Err(ModuleError::NameInvalid(self.name.clone()).into());
        }
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        self.previously_existed = module.local_configs.contains(&self.name);
        if self.previously_existed {
            self.old_expression = Some(module.local_configs.items[&self.name].expression.clone());
            module.local_configs.update(&self.name, self.value.clone())?;
        } else {
            module.local_configs.insert(
                self.name.clone(),
                self.value.clone(),
                self.comment.clone(),
                ConfigGroup::ProjectDefault,
            )?;
        }
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        if self.previously_existed {
            let old = self.old_expression.clone().unwrap_or_default();
            module.local_configs.update(&self.name, old)?;
        } else {
            let _ = module.local_configs.remove(&self.name)?;
        }
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}
