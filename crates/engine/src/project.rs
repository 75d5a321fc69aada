//! The project model (§3.2): top module, imports, the three libraries, and
//! the undo/redo history. `Project` owns everything an [`crate::operation::Operation`]
//! mutates; operations never hold their own copy of project state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::bundlelib::BundleLibrary;
use crate::configlib::ConfigLibrary;
use crate::module::ModuleLibrary;
use crate::operation::Operation;
use crate::simulation::{LogBus, SimulationManager};

/// One imported module: the absolute path it was loaded from, its name
/// inside this project, and any per-config value overrides applied on
/// import.
#[derive(Debug, Clone, Default)]
pub struct Import {
    pub abspath: String,
    pub module_name: String,
    pub config_overrides: HashMap<String, String>,
}

/// Which parts of the project have unsaved changes.
#[derive(Debug, Clone, Default)]
pub struct ModificationFlags {
    pub configs: bool,
    pub bundles: bool,
    pub modules: std::collections::HashSet<String>,
}

impl ModificationFlags {
    #[must_use]
    pub fn any(&self) -> bool {
        self.configs || self.bundles || !self.modules.is_empty()
    }
}

/// A hardware design: top module, imports, the three libraries, and the
/// undo/redo operation history.
pub struct Project {
    pub name: String,
    pub top_module: Option<String>,
    pub is_opened: bool,
    pub modified: ModificationFlags,

    pub configlib: ConfigLibrary,
    pub bundlelib: BundleLibrary,
    pub modulelib: ModuleLibrary,

    pub import_paths: Vec<String>,
    pub imports: HashMap<String, Import>,

    /// The generate/compile/simulate task runner for this project (§4.8).
    /// Defaults to a manager rooted at the current directory; call
    /// [`Project::set_root`] once the project's actual on-disk location is
    /// known.
    pub simulation: Arc<SimulationManager>,

    undo_stack: Vec<Box<dyn Operation>>,
    redo_stack: Vec<Box<dyn Operation>>,
}

impl Project {
    #[must_use]
    pub fn new(name: String, import_paths: Vec<String>) -> Self {
        Self {
            name,
            top_module: None,
            is_opened: true,
            modified: ModificationFlags::default(),
            configlib: ConfigLibrary::new(),
            bundlelib: BundleLibrary::new(),
            modulelib: ModuleLibrary::new(),
            import_paths,
            imports: HashMap::new(),
            simulation: Arc::new(SimulationManager::new(PathBuf::from("."), Arc::new(LogBus::new()))),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Rebinds the project's simulation manager to `root`, for when the
    /// project's on-disk location becomes known after construction (e.g.
    /// after `project.create`/`project.save`).
    pub fn set_root(&mut self, root: PathBuf) {
        self.simulation = Arc::new(SimulationManager::new(root, Arc::new(LogBus::new())));
    }

    /// Pushes a completed, undoable operation, clearing the redo stack — the
    /// same "new edit invalidates redo history" rule every undo system
    /// follows.
    pub fn push_undo(&mut self, op: Box<dyn Operation>) {
        self.undo_stack.push(op);
        self.redo_stack.clear();
    }

    /// Clears both stacks — done after a modifying-but-not-undoable
    /// operation, since its effects can no longer be unwound through
    /// history.
    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn pop_undo(&mut self) -> Option<Box<dyn Operation>> {
        self.undo_stack.pop()
    }

    pub fn pop_redo(&mut self) -> Option<Box<dyn Operation>> {
        self.redo_stack.pop()
    }

    pub fn push_redo(&mut self, op: Box<dyn Operation>) {
        self.redo_stack.push(op);
    }

    pub fn push_undo_from_redo(&mut self, op: Box<dyn Operation>) {
        self.undo_stack.push(op);
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    #[must_use]
    pub fn global_name_conflict(&self, name: &str) -> bool {
        self.configlib.contains(name) || self.bundlelib.contains(name) || self.modulelib.modules.contains_key(name)
    }
}
