//! Operation dispatcher (§4.7): a registry mapping operation names to
//! factory functions, and a dispatcher that looks up, constructs, executes,
//! and — for modifying + undoable operations — records onto the project's
//! undo stack (clearing redo), or clears both stacks for a modifying,
//! non-undoable one.
//!
//! Grounded on `operation/configlib/add.cpp`'s shape (`execute`/`undo`/
//! `is_modify`/`is_undoable`, a self-registering factory per `.cpp` file)
//! translated to Rust: a `Box<dyn Operation>` built by a registry of
//! `fn(&OperationRequest) -> Result<Box<dyn Operation>>` constructed
//! explicitly at startup rather than static-initializer registration, which
//! has no well-defined order in Rust.

use std::collections::HashMap;
use std::fmt::Debug;

use crate::error::{ProjectError, Result};
use crate::project::Project;
use crate::protocol::{OperationRequest, OperationResponse};

/// What a successful operation reports back to the caller (§4.7): named
/// string results and named string-list results, alongside the always-zero
/// success code the dispatcher fills in.
#[derive(Debug, Clone, Default)]
pub struct OperationOutcome {
    pub results: HashMap<String, String>,
    pub list_results: HashMap<String, Vec<String>>,
}

/// A single project-mutating (or read-only) action. Implementors capture
/// their arguments at construction time (from the [`OperationRequest`] the
/// factory received) and enough pre-state during `execute` to make `undo`
/// exact.
pub trait Operation: Debug {
    /// Performs the action against `project`.
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome>;

    /// Reverses a previously successful `execute`. Only called on operations
    /// for which `is_undoable()` is true and which did succeed.
    fn undo(&mut self, _project: &mut Project) -> Result<()> {
        Ok(())
    }

    /// True if `execute` can mutate project state. Read-only operations
    /// (`list`, `info`, `listref`) return `false` and are never pushed onto
    /// the undo stack.
    fn is_modifying(&self) -> bool;

    /// True if a successful, modifying execution can be undone. A modifying
    /// operation that returns `false` here clears both history stacks on
    /// success instead of recording itself.
    fn is_undoable(&self) -> bool {
        self.is_modifying()
    }
}

/// A factory that builds an [`Operation`] from its wire request. Returning
/// `Err` here means the request's arguments were malformed before any
/// project state was touched.
pub type OperationFactory = fn(&OperationRequest) -> Result<Box<dyn Operation>>;

/// The name → factory map every `do_operation` call consults.
#[derive(Default)]
pub struct OperationRegistry {
    factories: HashMap<&'static str, OperationFactory>,
}

impl OperationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, factory: OperationFactory) {
        let _ = self.factories.insert(name, factory);
    }

    /// Builds the registry with every operation family this crate ships,
    /// the Rust analogue of the original's static self-registration.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::ops::register_all(&mut registry);
        registry
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<OperationFactory> {
        self.factories.get(name).copied()
    }
}

/// Drives `doOperation`/`undoLast`/`redoLast` against a [`Project`] using a
/// fixed [`OperationRegistry`].
pub struct Dispatcher<'a> {
    registry: &'a OperationRegistry,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub fn new(registry: &'a OperationRegistry) -> Self {
        Self { registry }
    }

    /// Looks up `request.name`, constructs the operation, executes it, and
    /// records undo history per the rules in §4.7. A non-zero code never
    /// records, whether the failure was in construction or execution.
    pub fn do_operation(&self, project: &mut Project, request: &OperationRequest) -> OperationResponse {
        let Some(factory) = self.registry.get(&request.name) else {
            return to_response(Err(ProjectError::UnknownOperation(request.name.clone()).into()));
        };
        let mut op = match factory(request) {
            Ok(op) => op,
            Err(e) => return to_response(Err(e)),
        };
        match op.execute(project) {
            Ok(outcome) => {
                if op.is_modifying() {
                    if op.is_undoable() {
                        project.push_undo(op);
                    } else {
                        project.clear_history();
                    }
                }
                outcome_to_response(outcome)
            }
            Err(e) => to_response(Err(e)),
        }
    }

    /// Pops the undo stack and reverses it, pushing the reversed operation
    /// onto redo (§4.7, §8 property 7).
    pub fn undo_last(&self, project: &mut Project) -> OperationResponse {
        let Some(mut op) = project.pop_undo() else {
            return to_response(Err(ProjectError::UndoStackEmpty.into()));
        };
        match op.undo(project) {
            Ok(()) => {
                project.push_redo(op);
                OperationResponse::default()
            }
            Err(e) => to_response(Err(e)),
        }
    }

    /// Pops the redo stack and re-executes it, pushing back onto undo.
    pub fn redo_last(&self, project: &mut Project) -> OperationResponse {
        let Some(mut op) = project.pop_redo() else {
            return to_response(Err(ProjectError::RedoStackEmpty.into()));
        };
        match op.execute(project) {
            Ok(outcome) => {
                project.push_undo_from_redo(op);
                outcome_to_response(outcome)
            }
            Err(e) => to_response(Err(e)),
        }
    }
}

fn outcome_to_response(outcome: OperationOutcome) -> OperationResponse {
    OperationResponse {
        code: 0,
        msg: String::new(),
        results: outcome.results,
        list_results: outcome.list_results,
    }
}

fn to_response(result: Result<OperationOutcome>) -> OperationResponse {
    match result {
        Ok(outcome) => outcome_to_response(outcome),
        Err(e) => OperationResponse {
            code: e.code(),
            msg: e.message(),
            results: HashMap::new(),
            list_results: HashMap::new(),
        },
    }
}

