//! `bundlelib.{add,update,remove,rename,comment,list,listref}` (§4.7), same
//! shape as [`crate::ops::configlib`] but for bundle definitions. A
//! bundle's member list doesn't fit the flat `{index,name,value}` wire
//! argument shape, so the `definition` argument carries it JSON-encoded —
//! the rest of the frame is already JSON, so this just nests one level
//! deeper rather than inventing a second text format.

use serde::{Deserialize, Serialize};

use crate::bundlelib::{BundleKind, BundleMember, EnumVariant, MemberType};
use crate::error::{BundleError, Result};
use crate::ident::is_valid_identifier;
use crate::operation::{Operation, OperationOutcome, OperationRegistry};
use crate::project::Project;
use crate::protocol::OperationRequest;

pub fn register(registry: &mut OperationRegistry) {
    registry.register("bundlelib.add", |req| Ok(Box::new(Add::from_request(req)?)));
    registry.register("bundlelib.update", |req| Ok(Box::new(Update::from_request(req)?)));
    registry.register("bundlelib.remove", |req| Ok(Box::new(Remove::from_request(req)?)));
    registry.register("bundlelib.rename", |req| Ok(Box::new(Rename::from_request(req)?)));
    registry.register("bundlelib.comment", |req| Ok(Box::new(Comment::from_request(req)?)));
    registry.register("bundlelib.list", |req| Ok(Box::new(List::from_request(req))));
    registry.register("bundlelib.listref", |req| Ok(Box::new(ListRef::from_request(req)?)));
}

fn required(request: &OperationRequest, name: &'static str, index: u32) -> Result<String> {
    request
        .get_arg(name, index)
        .map(str::to_string)
        .ok_or(BundleError::MissingArg(name))
        .map_err(Into::into)
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMember {
    name: String,
    bundle_ref: Option<String>,
    width_expr: Option<String>,
    #[serde(default)]
    dims: Vec<String>,
    default: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind")]
enum WireKind {
    Struct { members: Vec<WireMember> },
    Alias { members: Vec<WireMember> },
    Enum { variants: Vec<(String, String)> },
}

fn parse_definition(text: &str) -> Result<BundleKind> {
    let wire: WireKind = serde_json::from_str(text)
        .map_err(|e| BundleError::MemberTypeInvalid(format!("invalid bundle definition JSON: {e}")))?;
    let to_member = |w: WireMember| -> Result<BundleMember> {
        let member_type = match (w.bundle_ref, w.width_expr) {
            (Some(b), None) => MemberType::Bundle(b),
            (None, Some(width)) => MemberType::BitWidth(width),
            _ => return Err(BundleError::MemberTypeInvalid(w.name).into()),
        };
        Ok(BundleMember { name: w.name, member_type, dims: w.dims, default: w.default })
    };
    Ok(match wire {
        WireKind::Struct { members } => BundleKind::Struct(members.into_iter().map(to_member).collect::<Result<_>>()?),
        WireKind::Alias { members } => BundleKind::Alias(members.into_iter().map(to_member).collect::<Result<_>>()?),
        WireKind::Enum { variants } => {
            BundleKind::Enum(variants.into_iter().map(|(name, value_expr)| EnumVariant { name, value_expr }).collect())
        }
    })
}

fn encode_definition(kind: &BundleKind) -> String {
    let wire = match kind {
        BundleKind::Struct(members) => WireKind::Struct { members: members.iter().map(to_wire_member).collect() },
        BundleKind::Alias(members) => WireKind::Alias { members: members.iter().map(to_wire_member).collect() },
        BundleKind::Enum(variants) => WireKind::Enum {
            variants: variants.iter().map(|v| (v.name.clone(), v.value_expr.clone())).collect(),
        },
    };
    serde_json::to_string(&wire).unwrap_or_default()
}

fn to_wire_member(m: &BundleMember) -> WireMember {
    let (bundle_ref, width_expr) = match &m.member_type {
        MemberType::Bundle(name) => (Some(name.clone()), None),
        MemberType::BitWidth(expr) => (None, Some(expr.clone())),
    };
    WireMember { name: m.name.clone(), bundle_ref, width_expr, dims: m.dims.clone(), default: m.default.clone() }
}

#[derive(Debug)]
struct Add {
    name: String,
    definition: String,
    comment: String,
}

impl Add {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self {
            name: required(req, "name", 0)?,
            definition: required(req, "definition", 1)?,
            comment: req.get_arg("comment", 2).unwrap_or("").to_string(),
        })
    }
}

impl Operation for Add {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        if !is_valid_identifier(&self.name) {
            return Err(BundleError::NameInvalid(self.name.clone()).into());
        }
        if project.global_name_conflict(&self.name) {
            return Err(BundleError::NameConflict(self.name.clone()).into());
        }
        let kind = parse_definition(&self.definition)?;
        let _ = project.bundlelib.insert(self.name.clone(), self.comment.clone(), kind, &project.configlib)?;
        project.modified.bundles = true;
        let mut outcome = OperationOutcome::default();
        let _ = outcome.results.insert("name".into(), self.name.clone());
        Ok(outcome)
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let _ = project.bundlelib.remove(&self.name)?;
        project.modified.bundles = true;
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct Update {
    name: String,
    definition: String,
    old_kind: Option<BundleKind>,
}

impl Update {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { name: required(req, "name", 0)?, definition: required(req, "definition", 1)?, old_kind: None })
    }
}

impl Operation for Update {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let old = project
            .bundlelib
            .items
            .get(&self.name)
            .ok_or_else(|| BundleError::NotFound(self.name.clone()))?
            .kind
            .clone();
        let kind = parse_definition(&self.definition)?;
        project.bundlelib.update(&self.name, kind, &project.configlib)?;
        self.old_kind = Some(old);
        project.modified.bundles = true;
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        if let Some(old) = self.old_kind.clone() {
            project.bundlelib.update(&self.name, old, &project.configlib)?;
        }
        project.modified.bundles = true;
        Ok(())
    }

    fn is_modifying(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct Remove {
    name: String,
    restore: Option<(String, BundleKind)>,
}

impl Remove {
    fn from_request(req: &OperationRequest) -> Result<Self> {
        Ok(Self { name: required(req, "name", 0)?, restore: None })
    }
}

impl Operation for Remove {
    fn execute(&mut self, project: &mut Project) -> Result<OperationOutcome> {
        let removed = project.bundlelib.remove(&self.name)?;
        self.restore = Some((removed.comment, removed.kind));
        project.modified.bundles = true;
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        let Some((comment, kind)) = self.restore.clone() else {
            return Ok(());
        };
        let _ = project.bundlelib.insert(self.name.clone(), comment, kind, &project.configlib)?;
        project.modified.bundles = true;
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
            return Err(BundleError::NameInvalid(self.new.clone()).into());
        }
        project.bundlelib.rename(&self.old, &self.new)?;
        project.modified.bundles = true;
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        project.bundlelib.rename(&self.new, &self.old)?;
        project.modified.bundles = true;
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
        let item = project.bundlelib.items.get_mut(&self.name).ok_or_else(|| BundleError::NotFound(self.name.clone()))?;
        self.old_comment = Some(item.comment.clone());
        item.comment = self.comment.clone();
        project.modified.bundles = true;
        Ok(OperationOutcome::default())
    }

    fn undo(&mut self, project: &mut Project) -> Result<()> {
        if let Some(item) = project.bundlelib.items.get_mut(&self.name) {
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
        let mut names: Vec<String> = project.bundlelib.items.keys().cloned().collect();
        names.sort();
        if self.with_reference {
            for name in &names {
                let item = &project.bundlelib.items[name];
                let mut refs: Vec<String> = item.bundle_refs.iter().cloned().collect();
                refs.sort();
                let mut rev: Vec<String> = item.reverse_bundle_refs.iter().cloned().collect();
                rev.sort();
                let _ = outcome.list_results.insert(format!("{name}.references"), refs);
                let _ = outcome.list_results.insert(format!("{name}.reverse_references"), rev);
                let _ = outcome.results.insert(format!("{name}.definition"), encode_definition(&item.kind));
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
        let item = project.bundlelib.items.get(&self.name).ok_or_else(|| BundleError::NotFound(self.name.clone()))?;
        let mut outcome = OperationOutcome::default();
        let mut refs: Vec<String> = item.bundle_refs.iter().cloned().collect();
        refs.sort();
        let mut rev: Vec<String> = item.reverse_bundle_refs.iter().cloned().collect();
        rev.sort();
        let _ = outcome.list_results.insert("references".into(), refs);
        let _ = outcome.list_results.insert("reverse_references".into(), rev);
        Ok(outcome)
    }

    fn is_modifying(&self) -> bool {
        false
    }
}
