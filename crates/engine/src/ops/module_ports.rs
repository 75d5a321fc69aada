//! `module.reqserv.{add,update,remove,rename,get}` and
//! `module.pipeport.{add,update,remove,rename}` (§4.7). A signature's typed
//! argument/return lists don't fit the flat wire-argument shape, so — same
//! trick as [`crate::ops::bundlelib`] — the `signature` argument carries them
//! JSON-encoded.

use serde::{Deserialize, Serialize};

use crate::error::{ModuleError, Result};
use crate::ident::is_valid_identifier;
use crate::module::{PipeDirection, PipePort, PortSignature, TypedField};
use crate::operation::{Operation, OperationOutcome, OperationRegistry};
use crate::project::Project;
use crate::protocol::OperationRequest;

pub fn register(registry: &mut OperationRegistry) {
    registry.register("module.reqserv.add", |req| Ok(Box::new(PortAdd::from_request(req)?)));
    registry.register("module.reqserv.update", |req| Ok(Box::new(PortUpdate::from_request(req)?)));
    registry.register("module.reqserv.remove", |req| Ok(Box::new(PortRemove::from_request(req)?)));
    registry.register("module.reqserv.rename", |req| Ok(Box::new(PortRename::from_request(req)?)));
    registry.register("module.reqserv.get", |req| Ok(Box::new(PortGet::from_request(req)?)));
    registry.register("module.pipeport.add", |req| Ok(Box::new(PipeAdd::from_request(req)?)));
    registry.register("module.pipeport.update", |req| Ok(Box::new(PipeUpdate::from_request(req)?)));
    registry.register("module.pipeport.remove", |req| Ok(Box::new(PipeRemove::from_request(req)?)));
    registry.register("module.pipeport.rename", |req| Ok(Box::new(PipeRename::from_request(req)?)));
}

fn required(request: &OperationRequest, name: &'static str, index: u32) -> Result<String> {
    request.get_arg(name, index).map(str::to_string).ok_or(ModuleError::MissingArg(name)).map_err(Into::into)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortKind {
    Request,
    Service,
}

fn parse_kind(text: &str) -> Result<PortKind> {
    match text {
        "request" => Ok(PortKind::Request),
        "service" => Ok(PortKind::Service),
        other => Err(ModuleError::PortNotFound(other.to_string()).into()),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireSignature {
    args: Vec<(String, String)>,
    rets: Vec<(String, String)>,
    handshake: bool,
}

fn parse_signature(text: &str) -> Result<PortSignature> {
    let wire: WireSignature =
        serde_json::from_str(text).map_err(|e| ModuleError::PortNotFound(format!("invalid signature JSON: {e}")))?;
    let to_field = |(name, type_name): (String, String)| TypedField { name, type_name };
    Ok(PortSignature {
        args: wire.args.into_iter().map(to_field).collect(),
        rets: wire.rets.into_iter().map(to_field).collect(),
        handshake: wire.handshake,
    })
}

fn encode_signature(sig: &PortSignature) -> String {
    let to_pair = |f: &TypedField| (f.name.clone(), f.type_name.clone());
    let wire = WireSignature {
        args: sig.args.iter().map(to_pair).collect(),
        rets: sig.rets.iter().map(to_pair).collect(),
        handshake: sig.handshake,
    };
    serde_json::to_string(&wire).unwrap_or_default()
}

fn ports_mut<'a>(module: &'a mut crate::module::Module, kind: PortKind) -> &'a mut std::collections::HashMap<String, PortSignature> {
    match kind {
        PortKind::Request => &mut module.requests,
        PortKind::Service => &mut module.services,
    }
}

#[derive(Debug)]
struct PortAdd {
    owner: String,
    kind: PortKind,
    name: String,
    signature: String,
}

impl PortAdd {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            owner: required(req, "owner", 0)?,
            kind: parse_kind(&required(req, "kind", 1)?)?,
            name: required(req, "name", 2)?,
            signature: required(req, "signature", 3)?,
        })
    }
}

impl Operation for PortAdd {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        if !is_valid_identifier(&self.name) {
            return Err(ModuleError::NameInvalid(self.name.clone()).into());
        }
        let sig = parse_signature(&self.signature)?;
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        let map = ports_mut(module, self.kind);
        if map.contains_key(&self.name) {
            return Err(ModuleError::NameConflict(self.name.clone()).into());
        }
        let _ = map.insert(self.name.clone(), sig);
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        let _ = ports_mut(module, self.kind).remove(&self.name);
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct PortUpdate {
    owner: String,
    kind: PortKind,
    name: String,
    signature: String,
    old: Option<PortSignature>,
}

impl PortUpdate {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            owner: required(req, "owner", 0)?,
            kind: parse_kind(&required(req, "kind", 1)?)?,
            name: required(req, "name", 2)?,
            signature: required(req, "signature", 3)?,
            old: None,
        })
    }
}

impl Operation for PortUpdate {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let sig = parse_signature(&self.signature)?;
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        let map = ports_mut(module, self.kind);
        let slot = map.get_mut(&self.name).ok_or_else(|| ModuleError::PortNotFound(self.name.clone()))?;
        self.old = Some(slot.clone());
        *slot = sig;
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let Some(old) = self.old.clone() else {
            return Ok(());
        };
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        if let Some(slot) = ports_mut(module, self.kind).get_mut(&self.name) {
            *slot = old;
        }
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct PortRemove {
    owner: String,
    kind: PortKind,
    name: String,
    restore: Option<PortSignature>,
}

impl PortRemove {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            owner: required(req, "owner", 0)?,
            kind: parse_kind(&required(req, "kind", 1)?)?,
            name: required(req, "name", 2)?,
            restore: None,
        })
    }
}

impl Operation for PortRemove {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let owner = self.owner.clone();
        let name = self.name.clone();
        let module = project.modulelib.get_mut(&owner)?.as_local_mut(&owner)?;
        let live = match self.kind {
            PortKind::Request => {
                module.request_connections.iter().any(|c| c.src_instance == crate::ident::TOP_INSTANCE && c.src_port == name)
            }
            PortKind::Service => {
                module.request_connections.iter().any(|c| c.dst_instance == crate::ident::TOP_INSTANCE && c.dst_port == name)
            }
        };
        if live {
            return Err(ModuleError::ForceRequired(name).into());
        }
        let removed = ports_mut(module, self.kind).remove(&name).ok_or_else(|| ModuleError::PortNotFound(name.clone()))?;
        self.restore = Some(removed);
        let _ = project.modified.modules.insert(owner);
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let Some(sig) = self.restore.clone() else {
            return Ok(());
        };
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        let _ = ports_mut(module, self.kind).insert(self.name.clone(), sig);
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct PortRename {
    owner: String,
    kind: PortKind,
    old: String,
    new: String,
}

impl PortRename {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            owner: required(req, "owner", 0)?,
            kind: parse_kind(&required(req, "kind", 1)?)?,
            old: required(req, "old_name", 2)?,
            new: required(req, "new_name", 3)?,
        })
    }
}

impl Operation for PortRename {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        if !is_valid_identifier(&self.new) {
            return Err(ModuleError::NameInvalid(self.new.clone()).into());
        }
        let owner = self.owner.clone();
        let module = project.modulelib.get_mut(&owner)?.as_local_mut(&owner)?;
        let map = ports_mut(module, self.kind);
        if map.contains_key(&self.new) {
            return Err(ModuleError::NameConflict(self.new.clone()).into());
        }
        let sig = map.remove(&self.old).ok_or_else(|| ModuleError::PortNotFound(self.old.clone()))?;
        let _ = map.insert(self.new.clone(), sig);
        let rewritten: std::collections::HashSet<_> = module
            .request_connections
            .drain()
            .map(|mut c| {
                if self.kind == PortKind::Request && c.src_instance == crate::ident::TOP_INSTANCE && c.src_port == self.old {
                    c.src_port = self.new.clone();
                }
                if self.kind == PortKind::Service && c.dst_instance == crate::ident::TOP_INSTANCE && c.dst_port == self.old {
                    c.dst_port = self.new.clone();
                }
                c
            })
            .collect();
        module.request_connections = rewritten;
        let _ = project.modified.modules.insert(owner);
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let reversed = PortRename { owner: self.owner.clone(), kind: self.kind, old: self.new.clone(), new: self.old.clone() };
        let mut reversed = reversed;
        reversed.execute(project).map(|_| ())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct PortGet {
    owner: String,
    kind: PortKind,
    name: String,
}

impl PortGet {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            owner: required(req, "owner", 0)?,
            kind: parse_kind(&required(req, "kind", 1)?)?,
            name: required(req, "name", 2)?,
        })
    }
}

impl Operation for PortGet {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let entry = project.modulelib.get(&self.owner)?;
        let map = match self.kind {
            PortKind::Request => entry.requests(),
            PortKind::Service => entry.services(),
        };
        let sig = map.get(&self.name).ok_or_else(|| ModuleError::PortNotFound(self.name.clone()))?;
        let mut outcome = OperationOutcome::default();
        let _ = outcome.results.insert("signature".into(), encode_signature(sig));
        Ok(outcome)
    }

    fn is_modifying(&self) -> bool {
        false
    }
}

fn parse_direction(text: &str) -> Result<PipeDirection> {
    match text {
        "in" => Ok(PipeDirection::In),
        "out" => Ok(PipeDirection::Out),
        other => Err(ModuleError::PipePortNotFound(other.to_string()).into()),
    }
}

#[derive(Debug)]
struct PipeAdd {
    owner: String,
    name: String,
    type_name: String,
    direction: PipeDirection,
}

impl PipeAdd {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            owner: required(req, "owner", 0)?,
            name: required(req, "name", 1)?,
            type_name: required(req, "type_name", 2)?,
            direction: parse_direction(&required(req, "direction", 3)?)?,
        })
    }
}

impl Operation for PipeAdd {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        if !is_valid_identifier(&self.name) {
            return Err(ModuleError::NameInvalid(self.name.clone()).into());
        }
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        if module.pipe_ports.contains_key(&self.name) {
            return Err(ModuleError::NameConflict(self.name.clone()).into());
        }
        let _ = module
            .pipe_ports
            .insert(self.name.clone(), PipePort { type_name: self.type_name.clone(), direction: self.direction });
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        let _ = module.pipe_ports.remove(&self.name);
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct PipeUpdate {
    owner: String,
    name: String,
    type_name: String,
    direction: PipeDirection,
    old: Option<PipePort>,
}

impl PipeUpdate {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            owner: required(req, "owner", 0)?,
            name: required(req, "name", 1)?,
            type_name: required(req, "type_name", 2)?,
            direction: parse_direction(&required(req, "direction", 3)?)?,
            old: None,
        })
    }
}

impl Operation for PipeUpdate {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        let slot = module.pipe_ports.get_mut(&self.name).ok_or_else(|| ModuleError::PipePortNotFound(self.name.clone()))?;
        self.old = Some(slot.clone());
        slot.type_name = self.type_name.clone();
        slot.direction = self.direction;
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let Some(old) = self.old.clone() else {
            return Ok(());
        };
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        if let Some(slot) = module.pipe_ports.get_mut(&self.name) {
            *slot = old;
        }
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct PipeRemove {
    owner: String,
    name: String,
    restore: Option<PipePort>,
}

impl PipeRemove {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { owner: required(req, "owner", 0)?, name: required(req, "name", 1)?, restore: None })
    }
}

impl Operation for PipeRemove {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        let live = module
            .pipe_connections
            .iter()
            .any(|c| (c.src_instance == crate::ident::TOP_INSTANCE && c.src_port == self.name) || (c.dst_instance == crate::ident::TOP_INSTANCE && c.dst_port == self.name));
        if live {
            return Err(ModuleError::ForceRequired(self.name.clone()).into());
        }
        let removed = module.pipe_ports.remove(&self.name).ok_or_else(|| ModuleError::PipePortNotFound(self.name.clone()))?;
        self.restore = Some(removed);
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let Some(port) = self.restore.clone() else {
            return Ok(());
        };
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        let _ = module.pipe_ports.insert(self.name.clone(), port);
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct PipeRename {
    owner: String,
    old: String,
    new: String,
}

impl PipeRename {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { owner: required(req, "owner", 0)?, old: required(req, "old_name", 1)?, new: required(req, "new_name", 2)? })
    }
}

impl Operation for PipeRename {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        if !is_valid_identifier(&self.new) {
            return Err(ModuleError::NameInvalid(self.new.clone()).into());
        }
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        if module.pipe_ports.contains_key(&self.new) {
            return Err(ModuleError::NameConflict(self.new.clone()).into());
        }
        let port = module.pipe_ports.remove(&self.old).ok_or_else(|| ModuleError::PipePortNotFound(self.old.clone()))?;
        let _ = module.pipe_ports.insert(self.new.clone(), port);
        let old = self.old.clone();
        let new = self.new.clone();
        let rewritten: std::collections::HashSet<_> = module
            .pipe_connections
            .drain()
            .map(|mut c| {
                if c.src_instance == crate::ident::TOP_INSTANCE && c.src_port == old {
                    c.src_port = new.clone();
                }
                if c.dst_instance == crate::ident::TOP_INSTANCE && c.dst_port == old {
                    c.dst_port = new.clone();
                }
                c
            })
            .collect();
        module.pipe_connections = rewritten;
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let mut reversed = PipeRename { owner: self.owner.clone(), old: self.new.clone(), new: self.old.clone() };
        reversed.execute(project).map(|_| ())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Module, ModuleEntry};

    fn project_with_top() -> Project {
        let mut project = Project::new("p".into(), vec![]);
        project.modulelib.add("Top".into(), ModuleEntry::Local(Module::default())).unwrap();
        project
    }

    #[test]
    fn add_and_get_round_trips_signature() {
        let mut project = project_with_top();
        let mut add = PortAdd {
            owner: "Top".into(),
            kind: PortKind::Request,
            name: "req".into(),
            signature: serde_json::to_string(&WireSignature {
                args: vec![("x".into(), "u8".into())],
                rets: vec![],
                handshake: true,
            })
            .unwrap(),
        };
        add.execute(&mut project).unwrap();
        let mut get = PortGet { owner: "Top".into(), kind: PortKind::Request, name: "req".into() };
        let outcome = get.execute(&mut project).unwrap();
        let sig = parse_signature(&outcome.results["signature"]).unwrap();
        assert_eq!(sig.args[0].name, "x");
        assert!(sig.handshake);
    }

    #[test]
    fn pipeport_add_remove_undo() {
        let mut project = project_with_top();
        let mut add = PipeAdd { owner: "Top".into(), name: "p0".into(), type_name: "Word".into(), direction: PipeDirection::Out };
        add.execute(&mut project).unwrap();
        assert!(project.modulelib.modules["Top"].as_local("Top").unwrap().pipe_ports.contains_key("p0"));
        add.undo(&mut project).unwrap();
        assert!(!project.modulelib.modules["Top"].as_local("Top").unwrap().pipe_ports.contains_key("p0"));
    }
}
