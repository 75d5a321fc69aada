//! Bundle-item library (§3.2, §4.7): named data-layout definitions (struct,
//! alias, enum) used as the type of a module pipe or storage. Bundles
//! reference other bundles (member types) and configs (bit-width/dimension/
//! value expressions); both halves of each graph are tracked explicitly.

use std::collections::{HashMap, HashSet};

use crate::configlib::ConfigLibrary;
use crate::error::{BundleError, Result};
use crate::expr;

/// A member's type: either another bundle by name, or a primitive integer
/// of a width given by a config expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberType {
    Bundle(String),
    BitWidth(String),
}

/// One field of a `Struct`/`Alias` bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleMember {
    pub name: String,
    pub member_type: MemberType,
    /// Array dimension expressions, outermost first; empty for a scalar.
    pub dims: Vec<String>,
    pub default: Option<String>,
}

/// One variant of an `Enum` bundle: name plus its value expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariant {
    pub name: String,
    pub value_expr: String,
}

/// The shape a bundle definition takes (§3.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleKind {
    Struct(Vec<BundleMember>),
    Alias(Vec<BundleMember>),
    Enum(Vec<EnumVariant>),
}

/// A single bundle-library entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleItem {
    pub name: String,
    pub comment: String,
    pub kind: BundleKind,
    /// Other bundles this one's members reference.
    pub bundle_refs: HashSet<String>,
    /// Configs referenced through bit-width/dimension/value expressions.
    pub config_refs: HashSet<String>,
    /// Bundles whose members reference this one.
    pub reverse_bundle_refs: HashSet<String>,
}

/// The project's bundle-item library.
#[derive(Debug, Clone, Default)]
pub struct BundleLibrary {
    pub items: HashMap<String, BundleItem>,
}

fn collect_refs(kind: &BundleKind, configlib: &ConfigLibrary) -> Result<(HashSet<String>, HashSet<String>)> {
    let mut bundle_refs = HashSet::new();
    let mut config_refs = HashSet::new();
    let resolve = |name: &str| configlib.items.get(name).map(|i| i.value);

    let mut scan_expr = |text: &str, config_refs: &mut HashSet<String>| -> Result<()> {
        let evaluated = expr::evaluate(text, &resolve).map_err(BundleError::MemberTypeInvalid)?;
        config_refs.extend(evaluated.referenced);
        Ok(())
    };

    match kind {
        BundleKind::Struct(members) | BundleKind::Alias(members) => {
            for member in members {
                match &member.member_type {
                    MemberType::Bundle(name) => {
                        let _ = bundle_refs.insert(name.clone());
                    }
                    MemberType::BitWidth(expr_text) => scan_expr(expr_text, &mut config_refs)?,
                }
                for dim in &member.dims {
                    scan_expr(dim, &mut config_refs)?;
                }
                if let Some(default) = &member.default {
                    scan_expr(default, &mut config_refs)?;
                }
            }
        }
        BundleKind::Enum(variants) => {
            for variant in variants {
                scan_expr(&variant.value_expr, &mut config_refs)?;
            }
        }
    }
    Ok((bundle_refs, config_refs))
}

impl BundleLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn insert(&mut self, name: String, comment: String, kind: BundleKind, configlib: &ConfigLibrary) -> Result<()> {
        let (bundle_refs, config_refs) = collect_refs(&kind, configlib)?;
        for reference in &bundle_refs {
            if let Some(referenced) = self.items.get_mut(reference) {
                let _ = referenced.reverse_bundle_refs.insert(name.clone());
            }
        }
        let _ = self.items.insert(
            name.clone(),
            BundleItem {
                name,
                comment,
                kind,
                bundle_refs,
                config_refs,
                reverse_bundle_refs: HashSet::new(),
            },
        );
        Ok(())
    }

    /// Replaces `name`'s definition, refusing if the new reference set would
    /// introduce a cycle back to `name` through its new forward references
    /// (a bounded depth-first walk, as the original `bundlelib.update`
    /// performs).
    pub fn update(&mut self, name: &str, kind: BundleKind, configlib: &ConfigLibrary) -> Result<()> {
        if !self.items.contains_key(name) {
            return Err(BundleError::NotFound(name.to_string()).into());
        }
        let (bundle_refs, config_refs) = collect_refs(&kind, configlib)?;
        for reference in &bundle_refs {
            if reference == name || self.reaches(reference, name, 0) {
                return Err(BundleError::Cycle(name.to_string(), reference.clone()).into());
            }
        }
        let old_refs = self.items[name].bundle_refs.clone();
        for old_ref in old_refs.difference(&bundle_refs) {
            if let Some(item) = self.items.get_mut(old_ref) {
                let _ = item.reverse_bundle_refs.remove(name);
            }
        }
        for new_ref in bundle_refs.difference(&old_refs) {
            if let Some(item) = self.items.get_mut(new_ref) {
                let _ = item.reverse_bundle_refs.insert(name.to_string());
            }
        }
        let Some(item) = self.items.get_mut(name) else {
            return Err(BundleError::NotFound(name.to_string()).into());
        };
        item.kind = kind;
        item.bundle_refs = bundle_refs;
        item.config_refs = config_refs;
        Ok(())
    }

    /// True if `target` is reachable from `from` by following forward bundle
    /// references, depth-bounded to the library's size so a malformed graph
    /// can't spin forever.
    fn reaches(&self, from: &str, target: &str, depth: usize) -> bool {
        if depth > self.items.len() {
            return false;
        }
        if from == target {
            return true;
        }
        let Some(item) = self.items.get(from) else {
            return false;
        };
        item.bundle_refs.iter().any(|next| self.reaches(next, target, depth + 1))
    }

    pub fn remove(&mut self, name: &str) -> Result<BundleItem> {
        let item = self.items.get(name).ok_or_else(|| BundleError::NotFound(name.to_string()))?;
        if !item.reverse_bundle_refs.is_empty() {
            let mut referrers: Vec<String> = item.reverse_bundle_refs.iter().cloned().collect();
            referrers.sort();
            return Err(BundleError::HasReverseReferences(name.to_string(), referrers).into());
        }
        let bundle_refs = item.bundle_refs.clone();
        for reference in &bundle_refs {
            if let Some(referenced) = self.items.get_mut(reference) {
                let _ = referenced.reverse_bundle_refs.remove(name);
            }
        }
        let Some(item) = self.items.remove(name) else {
            return Err(BundleError::NotFound(name.to_string()).into());
        };
        Ok(item)
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        if !self.items.contains_key(old) {
            return Err(BundleError::NotFound(old.to_string()).into());
        }
        if self.items.contains_key(new) {
            return Err(BundleError::NameConflict(new.to_string()).into());
        }
        let Some(mut item) = self.items.remove(old) else {
            return Err(BundleError::NotFound(old.to_string()).into());
        };
        item.name = new.to_string();
        for reference in &item.bundle_refs {
            if let Some(referenced) = self.items.get_mut(reference) {
                let _ = referenced.reverse_bundle_refs.remove(old);
                let _ = referenced.reverse_bundle_refs.insert(new.to_string());
            }
        }
        let referrers = item.reverse_bundle_refs.clone();
        let _ = self.items.insert(new.to_string(), item);
        for referrer in referrers {
            if let Some(referring) = self.items.get_mut(&referrer) {
                rename_member_type(&mut referring.kind, old, new);
                let _ = referring.bundle_refs.remove(old);
                let _ = referring.bundle_refs.insert(new.to_string());
            }
        }
        Ok(())
    }
}

fn rename_member_type(kind: &mut BundleKind, old: &str, new: &str) {
    if let BundleKind::Struct(members) | BundleKind::Alias(members) = kind {
        for member in members {
            if let MemberType::Bundle(name) = &mut member.member_type {
                if name == old {
                    *name = new.to_string();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configlib::{ConfigGroup, ConfigLibrary};

    fn width_member(name: &str, width: &str) -> BundleMember {
        BundleMember {
            name: name.to_string(),
            member_type: MemberType::BitWidth(width.to_string()),
            dims: vec![],
            default: None,
        }
    }

    #[test]
    fn struct_referencing_another_struct_tracks_both_directions() {
        let configlib = ConfigLibrary::new();
        let mut lib = BundleLibrary::new();
        lib.insert("Point".into(), String::new(), BundleKind::Struct(vec![width_member("x", "32"), width_member("y", "32")]), &configlib)
            .unwrap();
        let members = vec![BundleMember {
            name: "origin".into(),
            member_type: MemberType::Bundle("Point".into()),
            dims: vec![],
            default: None,
        }];
        lib.insert("Shape".into(), String::new(), BundleKind::Struct(members), &configlib).unwrap();
        assert!(lib.items["Point"].reverse_bundle_refs.contains("Shape"));
        assert!(lib.remove("Point").is_err());
    }

    #[test]
    fn update_rejects_introduced_cycle() {
        let configlib = ConfigLibrary::new();
        let mut lib = BundleLibrary::new();
        lib.insert("A".into(), String::new(), BundleKind::Struct(vec![width_member("f", "8")]), &configlib).unwrap();
        lib.insert("B".into(), String::new(), BundleKind::Struct(vec![width_member("f", "8")]), &configlib).unwrap();
        let b_refs_a = vec![BundleMember {
            name: "a".into(),
            member_type: MemberType::Bundle("A".into()),
            dims: vec![],
            default: None,
        }];
        lib.update("B", BundleKind::Struct(b_refs_a), &configlib).unwrap();
        let a_refs_b = vec![BundleMember {
            name: "b".into(),
            member_type: MemberType::Bundle("B".into()),
            dims: vec![],
            default: None,
        }];
        assert!(lib.update("A", BundleKind::Struct(a_refs_b), &configlib).is_err());
    }

    #[test]
    fn bit_width_expression_tracks_config_refs() {
        let mut configlib = ConfigLibrary::new();
        configlib.insert("WIDTH".into(), "32".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();
        let mut lib = BundleLibrary::new();
        lib.insert("Reg".into(), String::new(), BundleKind::Struct(vec![width_member("bits", "WIDTH")]), &configlib).unwrap();
        assert!(lib.items["Reg"].config_refs.contains("WIDTH"));
    }
}
