//! `module.storage.{set,get}` (§3.2, §4.7): module-local storage cells.

use crate::error::{ModuleError, Result};
use crate::ident::is_valid_identifier;
use crate::module::{Storage, StorageKind};
use crate::operation::{Operation, OperationOutcome, OperationRegistry};
use crate::project::Project;
use crate::protocol::OperationRequest;

pub fn register(registry: &mut OperationRegistry) {
    registry.register("module.storage.set", |req| Ok(Box::new(StorageSet::from_request(req)?)));
    registry.register("module.storage.get", |req| Ok(Box::new(StorageGet::from_request(req)?)));
}

fn required(request: &OperationRequest, name: &'static str, index: u32) -> Result<String> {
    request.get_arg(name, index).map(str::to_string).ok_or(ModuleError::MissingArg(name)).map_err(Into::into)
}

fn parse_kind(text: &str) -> Result<StorageKind> {
    match text {
        "committed" => Ok(StorageKind::Committed),
        "nextcell" => Ok(StorageKind::NextCell),
        "scratch" => Ok(StorageKind::Scratch),
        other => Err(ModuleError::StorageNotFound(other.to_string()).into()),
    }
}

fn kind_text(kind: StorageKind) -> &'static str {
    match kind {
        StorageKind::Committed => "committed",
        StorageKind::NextCell => "nextcell",
        StorageKind::Scratch => "scratch",
    }
}

fn parse_dims(text: &str) -> Vec<String> {
    if text.is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(text).unwrap_or_default()
    }
}

#[derive(Debug)]
struct StorageSet {
    owner: String,
    name: String,
    type_name: String,
    kind: StorageKind,
    dims: Vec<String>,
    previous: Option<Storage>,
}

impl StorageSet {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            owner: required(req, "owner", 0)?,
            name: required(req, "name", 1)?,
            type_name: required(req, "type_name", 2)?,
            kind: parse_kind(&required(req, "kind", 3)?)?,
            dims: parse_dims(req.get_arg("dims", 4).unwrap_or("")),
            previous: None,
        })
    }
}

impl Operation for StorageSet {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        if !is_valid_identifier(&self.name) {
            return Err(ModuleError::NameInvalid(self.name.clone()).into());
        }
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        self.previous = module.storages.get(&self.name).cloned();
        let _ = module.storages.insert(
            self.name.clone(),
            Storage { type_name: self.type_name.clone(), kind: self.kind, dims: self.dims.clone() },
        );
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        match self.previous.take() {
            Some(storage) => {
                let _ = module.storages.insert(self.name.clone(), storage);
            }
            None => {
                let _ = module.storages.remove(&self.name);
            }
        }
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct StorageGet {
    owner: String,
    name: String,
}

impl StorageGet {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { owner: required(req, "owner", 0)?, name: required(req, "name", 1)? })
    }
}

impl Operation for StorageGet {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let entry = project.modulelib.get(&self.owner)?;
        let module = entry.as_local(&self.owner)?;
        let storage = module.storages.get(&self.name).ok_or_else(|| ModuleError::StorageNotFound(self.name.clone()))?;
        let mut outcome = OperationOutcome::default();
        let _ = outcome.results.insert("type_name".into(), storage.type_name.clone());
        let _ = outcome.results.insert("kind".into(), kind_text(storage.kind).into());
        let _ = outcome.list_results.insert("dims".into(), storage.dims.clone());
        Ok(outcome)
    }

    fn is_modifying(&self) -> bool {
        false
    }
}
