//! Module library (§3.2, §4.7): the composable unit of the design — local
//! configs/bundles, child instances, request/service and pipe ports,
//! storages, connections, sequence constraints, and per-port code blocks.
//! `ExternalModule` is the read-only counterpart imported from another
//! project; the dispatcher rejects any mutating operation against it before
//! it reaches module internals (§9 "Inheritance").

use std::collections::{HashMap, HashSet};

use crate::bundlelib::BundleLibrary;
use crate::configlib::ConfigLibrary;
use crate::error::{ModuleError, Result};
use crate::ident::TOP_INSTANCE;

/// A typed argument or return value in a request/service signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedField {
    pub name: String,
    pub type_name: String,
}

/// A request or service port's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSignature {
    pub args: Vec<TypedField>,
    pub rets: Vec<TypedField>,
    pub handshake: bool,
}

impl PortSignature {
    fn matches(&self, other: &Self) -> bool {
        self.args == other.args && self.rets == other.rets && self.handshake == other.handshake
    }
}

/// Pipe direction as seen from the declaring module's own boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeDirection {
    In,
    Out,
}

/// A pipe port declaration: a typed, directional streaming connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipePort {
    pub type_name: String,
    pub direction: PipeDirection,
}

/// A child instance of another module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub module_name: String,
    pub config_overrides: HashMap<String, String>,
}

/// Storage flavor (§3.2): `Committed` survives across ticks and is written
/// via `NextCell`-style scheduling; `Scratch` is tick-local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Committed,
    NextCell,
    Scratch,
}

/// A module-local storage cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Storage {
    pub type_name: String,
    pub kind: StorageKind,
    pub dims: Vec<String>,
}

/// A request-port connection: `src_instance.src_port -> dst_instance.dst_port`.
/// Either side's instance name may be [`TOP_INSTANCE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestConnection {
    pub src_instance: String,
    pub src_port: String,
    pub dst_instance: String,
    pub dst_port: String,
}

/// A pipe connection, same addressing shape as [`RequestConnection`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipeConnection {
    pub src_instance: String,
    pub src_port: String,
    pub dst_instance: String,
    pub dst_port: String,
}

/// An update-order constraint: `former` must update before `latter` within
/// a tick, among otherwise unordered instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequenceConstraint {
    pub former: String,
    pub latter: String,
}

/// Where a free-form source block attaches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CodeSite {
    ServiceImpl(String),
    RequestHandler(String),
    Tick,
}

/// A fully editable module.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub comment: String,
    pub local_configs: ConfigLibrary,
    pub local_bundles: BundleLibrary,
    pub requests: HashMap<String, PortSignature>,
    pub services: HashMap<String, PortSignature>,
    pub pipe_ports: HashMap<String, PipePort>,
    pub instances: HashMap<String, Instance>,
    pub pipes: HashMap<String, String>,
    pub storages: HashMap<String, Storage>,
    pub request_connections: HashSet<RequestConnection>,
    pub pipe_connections: HashSet<PipeConnection>,
    pub sequence_constraints: HashSet<SequenceConstraint>,
    pub code: HashMap<CodeSite, String>,
}

/// A read-only module imported from another project as an opaque black box
/// (§9 "Inheritance"): only the public surface an instance of it can connect
/// to is visible.
#[derive(Debug, Clone, Default)]
pub struct ExternalModule {
    pub requests: HashMap<String, PortSignature>,
    pub services: HashMap<String, PortSignature>,
    pub pipe_ports: HashMap<String, PipePort>,
}

/// A module-library entry: either a fully editable module or an imported,
/// read-only one.
#[derive(Debug, Clone)]
pub enum ModuleEntry {
    Local(Module),
    External(ExternalModule),
}

impl ModuleEntry {
    /// Borrows the public request/service/pipe-port surface common to both
    /// variants, for connection validation and read-only introspection.
    pub fn requests(&self) -> &HashMap<String, PortSignature> {
        match self {
            Self::Local(m) => &m.requests,
            Self::External(m) => &m.requests,
        }
    }
    pub fn services(&self) -> &HashMap<String, PortSignature> {
        match self {
            Self::Local(m) => &m.services,
            Self::External(m) => &m.services,
        }
    }
    pub fn pipe_ports(&self) -> &HashMap<String, PipePort> {
        match self {
            Self::Local(m) => &m.pipe_ports,
            Self::External(m) => &m.pipe_ports,
        }
    }

    /// Borrows the editable module, rejecting external modules up front
    /// (§9 "Inheritance": the dispatcher pattern-matches and operations
    /// targeting `Local`-only fields reject `External` immediately).
    pub fn as_local_mut(&mut self, name: &str) -> Result<&mut Module> {
        match self {
            Self::Local(m) => Ok(m),
            Self::External(_) => Err(ModuleError::External(name.to_string()).into()),
        }
    }

    pub fn as_local(&self, name: &str) -> Result<&Module> {
        match self {
            Self::Local(m) => Ok(m),
            Self::External(_) => Err(ModuleError::External(name.to_string()).into()),
        }
    }
}

/// The project's module library.
#[derive(Debug, Clone, Default)]
pub struct ModuleLibrary {
    pub modules: HashMap<String, ModuleEntry>,
}

impl ModuleLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Result<&ModuleEntry> {
        self.modules.get(name).ok_or_else(|| ModuleError::NotFound(name.to_string()).into())
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut ModuleEntry> {
        self.modules.get_mut(name).ok_or_else(|| ModuleError::NotFound(name.to_string()).into())
    }

    pub fn add(&mut self, name: String, entry: ModuleEntry) -> Result<()> {
        if self.modules.contains_key(&name) {
            return Err(ModuleError::NameConflict(name).into());
        }
        let _ = self.modules.insert(name, entry);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<ModuleEntry> {
        self.modules.remove(name).ok_or_else(|| ModuleError::NotFound(name.to_string()).into())
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        if !self.modules.contains_key(old) {
            return Err(ModuleError::NotFound(old.to_string()).into());
        }
        if self.modules.contains_key(new) {
            return Err(ModuleError::NameConflict(new.to_string()).into());
        }
        let Some(entry) = self.modules.remove(old) else {
            return Err(ModuleError::NotFound(old.to_string()).into());
        };
        let _ = self.modules.insert(new.to_string(), entry);
        for other in self.modules.values_mut() {
            if let ModuleEntry::Local(m) = other {
                for instance in m.instances.values_mut() {
                    if instance.module_name == old {
                        instance.module_name = new.to_string();
                    }
                }
            }
        }
        Ok(())
    }

    /// True if setting `instance` inside `owner` to `candidate_module` would
    /// make the instance graph cyclic (§3.3: the module instance graph is a
    /// DAG).
    fn introduces_cycle(&self, owner: &str, candidate_module: &str) -> bool {
        if owner == candidate_module {
            return true;
        }
        let mut stack = vec![candidate_module.to_string()];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == owner {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(ModuleEntry::Local(m)) = self.modules.get(&current) {
                for instance in m.instances.values() {
                    stack.push(instance.module_name.clone());
                }
            }
        }
        false
    }

    /// Sets (adds or replaces) `instance_name`'s module inside `owner`,
    /// refusing an instance cycle.
    pub fn set_instance(
        &mut self,
        owner: &str,
        instance_name: String,
        module_name: String,
        config_overrides: HashMap<String, String>,
    ) -> Result<()> {
        if !self.modules.contains_key(&module_name) {
            return Err(ModuleError::NotFound(module_name).into());
        }
        if self.introduces_cycle(owner, &module_name) {
            return Err(ModuleError::InstanceCycle(module_name).into());
        }
        let entry = self.get_mut(owner)?;
        let module = entry.as_local_mut(owner)?;
        let _ = module.instances.insert(instance_name, Instance { module_name, config_overrides });
        Ok(())
    }

    /// Resolves a named port's signature for `instance` inside `owner`
    /// (`__top__` refers to `owner`'s own external surface).
    fn resolve_request(&self, owner: &str, instance: &str, port: &str) -> Result<PortSignature> {
        let target = if instance == TOP_INSTANCE { owner.to_string() } else { self.instance_module(owner, instance)? };
        let entry = self.get(&target)?;
        entry.requests().get(port).cloned().ok_or_else(|| ModuleError::PortNotFound(port.to_string()).into())
    }

    fn resolve_service(&self, owner: &str, instance: &str, port: &str) -> Result<PortSignature> {
        let target = if instance == TOP_INSTANCE { owner.to_string() } else { self.instance_module(owner, instance)? };
        let entry = self.get(&target)?;
        entry.services().get(port).cloned().ok_or_else(|| ModuleError::PortNotFound(port.to_string()).into())
    }

    fn resolve_pipe_port(&self, owner: &str, instance: &str, port: &str) -> Result<PipePort> {
        let target = if instance == TOP_INSTANCE { owner.to_string() } else { self.instance_module(owner, instance)? };
        let entry = self.get(&target)?;
        entry.pipe_ports().get(port).cloned().ok_or_else(|| ModuleError::PipePortNotFound(port.to_string()).into())
    }

    fn instance_module(&self, owner: &str, instance: &str) -> Result<String> {
        let entry = self.get(owner)?;
        let module = entry.as_local(owner)?;
        module
            .instances
            .get(instance)
            .map(|i| i.module_name.clone())
            .ok_or_else(|| ModuleError::InstanceNotFound(instance.to_string()).into())
    }

    /// Connects a request port to a service port (§3.3: signatures must
    /// match; a request port may participate in at most one connection
    /// unless it declares multi-connect via a non-empty return list).
    pub fn connect(&mut self, owner: &str, conn: RequestConnection) -> Result<()> {
        let req_sig = self.resolve_request(owner, &conn.src_instance, &conn.src_port)?;
        let serv_sig = self.resolve_service(owner, &conn.dst_instance, &conn.dst_port)?;
        if !req_sig.matches(&serv_sig) {
            return Err(ModuleError::SignatureMismatch {
                src: conn.src_port.clone(),
                dst: conn.dst_port.clone(),
            }
            .into());
        }
        let module = self.get_mut(owner)?.as_local_mut(owner)?;
        if req_sig.rets.is_empty() {
            let already = module
                .request_connections
                .iter()
                .any(|c| c.src_instance == conn.src_instance && c.src_port == conn.src_port);
            if already {
                return Err(ModuleError::AlreadyConnected(conn.src_port).into());
            }
        }
        let _ = module.request_connections.insert(conn);
        Ok(())
    }

    pub fn disconnect(&mut self, owner: &str, conn: &RequestConnection) -> Result<()> {
        let module = self.get_mut(owner)?.as_local_mut(owner)?;
        if !module.request_connections.remove(conn) {
            return Err(ModuleError::PortNotFound(conn.src_port.clone()).into());
        }
        Ok(())
    }

    /// Connects two pipe ports, checking type match and, when one side is
    /// `__top__`, that in/out direction agrees across the boundary.
    pub fn pipe_connect(&mut self, owner: &str, conn: PipeConnection) -> Result<()> {
        let src = self.resolve_pipe_port(owner, &conn.src_instance, &conn.src_port)?;
        let dst = self.resolve_pipe_port(owner, &conn.dst_instance, &conn.dst_port)?;
        if src.type_name != dst.type_name {
            return Err(ModuleError::SignatureMismatch {
                src: conn.src_port.clone(),
                dst: conn.dst_port.clone(),
            }
            .into());
        }
        let src_effective_out = if conn.src_instance == TOP_INSTANCE {
            matches!(src.direction, PipeDirection::In)
        } else {
            matches!(src.direction, PipeDirection::Out)
        };
        let dst_effective_in = if conn.dst_instance == TOP_INSTANCE {
            matches!(dst.direction, PipeDirection::Out)
        } else {
            matches!(dst.direction, PipeDirection::In)
        };
        if !(src_effective_out && dst_effective_in) {
            return Err(ModuleError::DirectionMismatch {
                src: conn.src_port.clone(),
                dst: conn.dst_port.clone(),
            }
            .into());
        }
        let module = self.get_mut(owner)?.as_local_mut(owner)?;
        let _ = module.pipe_connections.insert(conn);
        Ok(())
    }

    pub fn pipe_disconnect(&mut self, owner: &str, conn: &PipeConnection) -> Result<()> {
        let module = self.get_mut(owner)?.as_local_mut(owner)?;
        if !module.pipe_connections.remove(conn) {
            return Err(ModuleError::PipePortNotFound(conn.src_port.clone()).into());
        }
        Ok(())
    }

    /// Adds a sequence constraint, refusing if it would cycle the instance
    /// update order (a topological sort over the instance set plus the
    /// candidate edge must succeed — §4.7 "Common rules").
    pub fn add_sequence_constraint(&mut self, owner: &str, constraint: SequenceConstraint) -> Result<()> {
        let module = self.get(owner)?.as_local(owner)?;
        let mut edges = module.sequence_constraints.clone();
        let _ = edges.insert(constraint.clone());
        if has_cycle(&edges) {
            return Err(ModuleError::SequenceCycle.into());
        }
        let module = self.get_mut(owner)?.as_local_mut(owner)?;
        let _ = module.sequence_constraints.insert(constraint);
        Ok(())
    }
}

fn has_cycle(edges: &HashSet<SequenceConstraint>) -> bool {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        adjacency.entry(edge.former.as_str()).or_default().push(edge.latter.as_str());
    }
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Active,
        Done,
    }
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn visit<'a>(node: &'a str, adjacency: &HashMap<&'a str, Vec<&'a str>>, marks: &mut HashMap<&'a str, Mark>) -> bool {
        match marks.get(node) {
            Some(Mark::Active) => return true,
            Some(Mark::Done) => return false,
            None => {}
        }
        let _ = marks.insert(node, Mark::Active);
        if let Some(next) = adjacency.get(node) {
            for n in next {
                if visit(n, adjacency, marks) {
                    return true;
                }
            }
        }
        let _ = marks.insert(node, Mark::Done);
        false
    }

    let nodes: Vec<&str> = adjacency.keys().copied().collect();
    nodes.into_iter().any(|n| visit(n, &adjacency, &mut marks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig() -> PortSignature {
        PortSignature { args: vec![], rets: vec![], handshake: false }
    }

    #[test]
    fn instance_cycle_rejected() {
        let mut lib = ModuleLibrary::new();
        lib.add("A".into(), ModuleEntry::Local(Module::default())).unwrap();
        lib.add("B".into(), ModuleEntry::Local(Module::default())).unwrap();
        lib.set_instance("A", "b0".into(), "B".into(), HashMap::new()).unwrap();
        assert!(lib.set_instance("B", "a0".into(), "A".into(), HashMap::new()).is_err());
    }

    #[test]
    fn connect_requires_matching_signature() {
        let mut lib = ModuleLibrary::new();
        let mut top = Module::default();
        let _ = top.requests.insert("req".into(), sig());
        let _ = top.services.insert("serv".into(), sig());
        lib.add("Top".into(), ModuleEntry::Local(top)).unwrap();
        lib.connect(
            "Top",
            RequestConnection {
                src_instance: TOP_INSTANCE.into(),
                src_port: "req".into(),
                dst_instance: TOP_INSTANCE.into(),
                dst_port: "serv".into(),
            },
        )
        .unwrap();
    }

    #[test]
    fn sequence_constraint_cycle_rejected() {
        let mut lib = ModuleLibrary::new();
        lib.add("Top".into(), ModuleEntry::Local(Module::default())).unwrap();
        lib.add_sequence_constraint("Top", SequenceConstraint { former: "a".into(), latter: "b".into() }).unwrap();
        let err = lib.add_sequence_constraint("Top", SequenceConstraint { former: "b".into(), latter: "a".into() });
        assert!(err.is_err());
    }
}
