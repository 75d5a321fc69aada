//! `module.{connect,disconn,pconn,pdisconn,uconn,udisconn}` (§4.7): the four
//! request/service and pipe connection operations, plus the two update-order
//! sequence-constraint operations.

use crate::error::{ModuleError, Result};
use crate::module::{PipeConnection, RequestConnection, SequenceConstraint};
use crate::operation::{Operation, OperationOutcome, OperationRegistry};
use crate::project::Project;
use crate::protocol::OperationRequest;

pub fn register(registry: &mut OperationRegistry) {
    registry.register("module.connect", |req| Ok(Box::new(Connect::from_request(req)?)));
    registry.register("module.disconn", |req| Ok(Box::new(Disconnect::from_request(req)?)));
    registry.register("module.pconn", |req| Ok(Box::new(PipeConnect::from_request(req)?)));
    registry.register("module.pdisconn", |req| Ok(Box::new(PipeDisconnect::from_request(req)?)));
    registry.register("module.uconn", |req| Ok(Box::new(SeqAdd::from_request(req)?)));
    registry.register("module.udisconn", |req| Ok(Box::new(SeqRemove::from_request(req)?)));
}

fn required(request: &OperationRequest, name: &'static str, index: u32) -> Result<String> {
    request.get_arg(name, index).map(str::to_string).ok_or(ModuleError::MissingArg(name)).map_err(Into::into)
}

fn request_connection(req: &OperationRequest) -> Result<RequestConnection> {
    Ok(RequestConnection {
        src_instance: required(req, "src_instance", 1)?,
        src_port: required(req, "src_port", 2)?,
        dst_instance: required(req, "dst_instance", 3)?,
        dst_port: required(req, "dst_port", 4)?,
    })
}

fn pipe_connection(req: &OperationRequest) -> Result<PipeConnection> {
    Ok(PipeConnection {
        src_instance: required(req, "src_instance", 1)?,
        src_port: required(req, "src_port", 2)?,
        dst_instance: required(req, "dst_instance", 3)?,
        dst_port: required(req, "dst_port", 4)?,
    })
}

#[derive(Debug)]
struct Connect {
    owner: String,
    conn: RequestConnection,
}

impl Connect {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { owner: required(req, "owner", 0)?, conn: request_connection(req)? })
    }
}

impl Operation for Connect {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        project.modulelib.connect(&self.owner, self.conn.clone())?;
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        project.modulelib.disconnect(&self.owner, &self.conn)?;
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct Disconnect {
    owner: String,
    conn: RequestConnection,
}

impl Disconnect {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { owner: required(req, "owner", 0)?, conn: request_connection(req)? })
    }
}

impl Operation for Disconnect {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        project.modulelib.disconnect(&self.owner, &self.conn)?;
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        project.modulelib.connect(&self.owner, self.conn.clone())?;
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct PipeConnect {
    owner: String,
    conn: PipeConnection,
}

impl PipeConnect {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { owner: required(req, "owner", 0)?, conn: pipe_connection(req)? })
    }
}

impl Operation for PipeConnect {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        project.modulelib.pipe_connect(&self.owner, self.conn.clone())?;
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        project.modulelib.pipe_disconnect(&self.owner, &self.conn)?;
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct PipeDisconnect {
    owner: String,
    conn: PipeConnection,
}

impl PipeDisconnect {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { owner: required(req, "owner", 0)?, conn: pipe_connection(req)? })
    }
}

impl Operation for PipeDisconnect {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        project.modulelib.pipe_disconnect(&self.owner, &self.conn)?;
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        project.modulelib.pipe_connect(&self.owner, self.conn.clone())?;
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct SeqAdd {
    owner: String,
    constraint: SequenceConstraint,
}

impl SeqAdd {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            owner: required(req, "owner", 0)?,
            constraint: SequenceConstraint { former: required(req, "former", 1)?, latter: required(req, "latter", 2)? },
        })
    }
}

impl Operation for SeqAdd {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        project.modulelib.add_sequence_constraint(&self.owner, self.constraint.clone())?;
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        let _ = module.sequence_constraints.remove(&self.constraint);
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct SeqRemove {
    owner: String,
    constraint: SequenceConstraint,
    existed: bool,
}

impl SeqRemove {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            owner: required(req, "owner", 0)?,
            constraint: SequenceConstraint { former: required(req, "former", 1)?, latter: required(req, "latter", 2)? },
            existed: false,
        })
    }
}

impl Operation for SeqRemove {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let module = project.modulelib.get_mut(&self.owner)?.as_local_mut(&self.owner)?;
        self.existed = module.sequence_constraints.remove(&self.constraint);
        let _ = project.modified.modules.insert(self.owner.clone());
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        if self.existed {
            project.modulelib.add_sequence_constraint(&self.owner, self.constraint.clone())?;
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
    use crate::ident::TOP_INSTANCE;
    use crate::module::{Module, ModuleEntry, PortSignature};

    #[test]
    fn connect_then_undo_disconnects() {
        let mut project = Project::new("p".into(), vec![]);
        let mut top = Module::default();
        let sig = PortSignature { args: vec![], rets: vec![], handshake: false };
        let _ = top.requests.insert("req".into(), sig.clone());
        let _ = top.services.insert("serv".into(), sig);
        project.modulelib.add("Top".into(), ModuleEntry::Local(top)).unwrap();
        let conn = RequestConnection {
            src_instance: TOP_INSTANCE.into(),
            src_port: "req".into(),
            dst_instance: TOP_INSTANCE.into(),
            dst_port: "serv".into(),
        };
        let mut op = Connect { owner: "Top".into(), conn: conn.clone() };
        op.execute(&mut project).unwrap();
        assert!(project.modulelib.modules["Top"].as_local("Top").unwrap().request_connections.contains(&conn));
        op.undo(&mut project).unwrap();
        assert!(!project.modulelib.modules["Top"].as_local("Top").unwrap().request_connections.contains(&conn));
    }
}
