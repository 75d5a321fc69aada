//! The engine's wire-level error taxonomy (§6.5): one hierarchical numeric
//! code per failure kind, grouped by the subsystem the original `vulsim`
//! sources group them by (`EOPConf*`, `EOPBundle*`, `EOPMod*`).

use thiserror::Error;

/// The uniform result alias used by every engine module.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Config-library operation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing argument: {0}")]
    MissingArg(&'static str),
    #[error("invalid config name '{0}': must be a valid identifier")]
    NameInvalid(String),
    #[error("name conflict: an item named '{0}' already exists in the project")]
    NameConflict(String),
    #[error("invalid expression for '{name}': {reason}")]
    ValueInvalid { name: String, reason: String },
    #[error("invalid expression for '{name}': referenced config '{reference}' does not exist")]
    RefNotFound { name: String, reference: String },
    #[error("config '{0}' does not exist")]
    NotFound(String),
    #[error("config '{name}' is self-referential")]
    SelfReference { name: String },
    #[error("cannot remove '{0}': still referenced by {1:?}")]
    HasReverseReferences(String, Vec<String>),
    #[error("config reference cycle detected at '{0}'")]
    Cycle(String),
}

/// Bundle-library operation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BundleError {
    #[error("missing argument: {0}")]
    MissingArg(&'static str),
    #[error("invalid bundle name '{0}': must be a valid identifier")]
    NameInvalid(String),
    #[error("name conflict: an item named '{0}' already exists in the project")]
    NameConflict(String),
    #[error("bundle '{0}' does not exist")]
    NotFound(String),
    #[error("updating '{0}' would introduce reference cycle through '{1}'")]
    Cycle(String, String),
    #[error("cannot remove '{0}': still referenced by {1:?}")]
    HasReverseReferences(String, Vec<String>),
    #[error("member type '{0}' does not name a bundle or a bit-width expression")]
    MemberTypeInvalid(String),
}

/// Module operation failures (instances, ports, pipes, storages, connections).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModuleError {
    #[error("missing argument: {0}")]
    MissingArg(&'static str),
    #[error("module '{0}' does not exist")]
    NotFound(String),
    #[error("module '{0}' already exists")]
    NameConflict(String),
    #[error("invalid identifier '{0}'")]
    NameInvalid(String),
    #[error("module '{0}' is external and cannot be modified")]
    External(String),
    #[error("instance '{0}' does not exist")]
    InstanceNotFound(String),
    #[error("port '{0}' does not exist")]
    PortNotFound(String),
    #[error("pipe port '{0}' does not exist")]
    PipePortNotFound(String),
    #[error("storage '{0}' does not exist")]
    StorageNotFound(String),
    #[error("request/service signature mismatch between '{src}' and '{dst}'")]
    SignatureMismatch { src: String, dst: String },
    #[error("pipe direction mismatch between '{src}' and '{dst}'")]
    DirectionMismatch { src: String, dst: String },
    #[error("port '{0}' already has a live connection; pass update_connections=true")]
    PortConnected(String),
    #[error("port '{0}' has live connections; pass force=true to remove")]
    ForceRequired(String),
    #[error("request port '{0}' already participates in a single-reply connection")]
    AlreadyConnected(String),
    #[error("sequence constraint would cycle the instance order")]
    SequenceCycle,
    #[error("instance graph would cycle through '{0}'")]
    InstanceCycle(String),
}

/// Project-, history-, and simulation-level failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectError {
    #[error("missing argument: {0}")]
    MissingArg(&'static str),
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("nothing to undo")]
    UndoStackEmpty,
    #[error("nothing to redo")]
    RedoStackEmpty,
    #[error("operation is not undoable")]
    NotUndoable,
    #[error("a simulation task is already running")]
    AlreadyRunning,
    #[error("no simulation task is running")]
    NotRunning,
    #[error("project is not open")]
    NotOpened,
    #[error("{0}")]
    Io(String),
}

/// The top-level engine error every operation and library function returns.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Bundle(#[from] BundleError),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error(transparent)]
    Project(#[from] ProjectError),
}

impl EngineError {
    /// The numeric wire code (§6.5). `0` is reserved for success and is never
    /// produced here — callers map `Ok(())` to code `0` at the dispatcher
    /// boundary.
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Self::Config(e) => 0x1000 + config_code(e),
            Self::Bundle(e) => 0x2000 + bundle_code(e),
            Self::Module(e) => 0x3000 + module_code(e),
            Self::Project(e) => 0x4000 + project_code(e),
        }
    }

    /// The human-readable message shown on the wire and in logs.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

fn config_code(e: &ConfigError) -> u32 {
    match e {
        ConfigError::MissingArg(_) => 1,
        ConfigError::NameInvalid(_) => 2,
        ConfigError::NameConflict(_) => 3,
        ConfigError::ValueInvalid { .. } => 4,
        ConfigError::RefNotFound { .. } => 5,
        ConfigError::NotFound(_) => 6,
        ConfigError::SelfReference { .. } => 7,
        ConfigError::HasReverseReferences(..) => 8,
        ConfigError::Cycle(_) => 9,
    }
}

fn bundle_code(e: &BundleError) -> u32 {
    match e {
        BundleError::MissingArg(_) => 1,
        BundleError::NameInvalid(_) => 2,
        BundleError::NameConflict(_) => 3,
        BundleError::NotFound(_) => 4,
        BundleError::Cycle(..) => 5,
        BundleError::HasReverseReferences(..) => 6,
        BundleError::MemberTypeInvalid(_) => 7,
    }
}

fn module_code(e: &ModuleError) -> u32 {
    match e {
        ModuleError::MissingArg(_) => 1,
        ModuleError::NotFound(_) => 2,
        ModuleError::NameConflict(_) => 3,
        ModuleError::NameInvalid(_) => 4,
        ModuleError::External(_) => 5,
        ModuleError::InstanceNotFound(_) => 6,
        ModuleError::PortNotFound(_) => 7,
        ModuleError::PipePortNotFound(_) => 8,
        ModuleError::StorageNotFound(_) => 9,
        ModuleError::SignatureMismatch { .. } => 10,
        ModuleError::DirectionMismatch { .. } => 11,
        ModuleError::PortConnected(_) => 12,
        ModuleError::ForceRequired(_) => 13,
        ModuleError::AlreadyConnected(_) => 14,
        ModuleError::SequenceCycle => 15,
        ModuleError::InstanceCycle(_) => 16,
    }
}

fn project_code(e: &ProjectError) -> u32 {
    match e {
        ProjectError::MissingArg(_) => 1,
        ProjectError::UnknownOperation(_) => 2,
        ProjectError::UndoStackEmpty => 3,
        ProjectError::RedoStackEmpty => 4,
        ProjectError::NotUndoable => 5,
        ProjectError::AlreadyRunning => 6,
        ProjectError::NotRunning => 7,
        ProjectError::NotOpened => 8,
        ProjectError::Io(_) => 9,
    }
}
