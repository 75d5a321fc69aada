//! Configuration-item library (§3.2, §4.7): a map from name to entry, each
//! entry carrying its raw expression, evaluated value, and both halves of
//! the reference graph so a rename or removal can update every affected
//! entry in one pass.

use std::collections::{HashMap, HashSet};

use crate::error::{ConfigError, Result};
use crate::expr;

/// Tag distinguishing a project-native config from one introduced by an
/// imported module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigGroup {
    /// The project's own default group.
    ProjectDefault,
    /// Introduced by the named import.
    Import(String),
}

/// A single configuration item (§3.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigItem {
    pub name: String,
    pub expression: String,
    pub comment: String,
    pub group: ConfigGroup,
    pub value: i64,
    pub references: HashSet<String>,
    pub reverse_references: HashSet<String>,
}

/// The project's configuration-item library.
#[derive(Debug, Clone, Default)]
pub struct ConfigLibrary {
    pub items: HashMap<String, ConfigItem>,
}

impl ConfigLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Evaluates `expression` against the library's current values, rejecting
    /// an unresolved reference or a self-reference by `name` up front — the
    /// two checks `configlib.add`/`update` perform before committing.
    pub fn evaluate(&self, name: &str, expression: &str) -> Result<(i64, HashSet<String>)> {
        let resolve = |ref_name: &str| self.items.get(ref_name).map(|i| i.value);
        let evaluated = expr::evaluate(expression, &resolve).map_err(|reason| ConfigError::ValueInvalid {
            name: name.to_string(),
            reason,
        })?;
        if evaluated.referenced.contains(name) {
            return Err(ConfigError::SelfReference { name: name.to_string() }.into());
        }
        for reference in &evaluated.referenced {
            if !self.items.contains_key(reference) {
                return Err(ConfigError::RefNotFound {
                    name: name.to_string(),
                    reference: reference.clone(),
                }
                .into());
            }
        }
        Ok((evaluated.value, evaluated.referenced))
    }

    /// Inserts a new item, recording `name` in every referenced item's
    /// reverse-reference set. Caller must have already validated identity
    /// and conflict rules.
    pub fn insert(&mut self, name: String, expression: String, comment: String, group: ConfigGroup) -> Result<()> {
        let (value, references) = self.evaluate(&name, &expression)?;
        for reference in &references {
            if let Some(item) = self.items.get_mut(reference) {
                let _ = item.reverse_references.insert(name.clone());
            }
        }
        let _ = self.items.insert(
            name.clone(),
            ConfigItem {
                name,
                expression,
                comment,
                group,
                value,
                references,
                reverse_references: HashSet::new(),
            },
        );
        Ok(())
    }

    /// Re-evaluates an existing item's expression, migrating reverse
    /// references from the old reference set to the new one. Refuses if the
    /// new reference set would introduce a cycle back to `name` through its
    /// new forward references (a bounded depth-first walk, as
    /// [`crate::bundlelib::BundleLibrary::update`] performs for bundles).
    pub fn update(&mut self, name: &str, expression: String) -> Result<()> {
        if !self.items.contains_key(name) {
            return Err(ConfigError::NotFound(name.to_string()).into());
        }
        let (value, references) = self.evaluate(name, &expression)?;
        for reference in &references {
            if self.reaches(reference, name, 0) {
                return Err(ConfigError::Cycle(name.to_string()).into());
            }
        }
        let old_references = self.items[name].references.clone();
        for old_ref in old_references.difference(&references) {
            if let Some(item) = self.items.get_mut(old_ref) {
                let _ = item.reverse_references.remove(name);
            }
        }
        for new_ref in references.difference(&old_references) {
            if let Some(item) = self.items.get_mut(new_ref) {
                let _ = item.reverse_references.insert(name.to_string());
            }
        }
        let Some(item) = self.items.get_mut(name) else {
            return Err(ConfigError::NotFound(name.to_string()).into());
        };
        item.expression = expression;
        item.value = value;
        item.references = references;
        Ok(())
    }

    /// True if `target` is reachable from `from` by following forward config
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
        item.references.iter().any(|next| self.reaches(next, target, depth + 1))
    }

    /// Removes `name`, refusing if anything still references it.
    pub fn remove(&mut self, name: &str) -> Result<ConfigItem> {
        let item = self.items.get(name).ok_or_else(|| ConfigError::NotFound(name.to_string()))?;
        if !item.reverse_references.is_empty() {
            let mut referrers: Vec<String> = item.reverse_references.iter().cloned().collect();
            referrers.sort();
            return Err(ConfigError::HasReverseReferences(name.to_string(), referrers).into());
        }
        let references = item.references.clone();
        for reference in &references {
            if let Some(referenced) = self.items.get_mut(reference) {
                let _ = referenced.reverse_references.remove(name);
            }
        }
        let Some(item) = self.items.remove(name) else {
            return Err(ConfigError::NotFound(name.to_string()).into());
        };
        Ok(item)
    }

    /// Renames `old` to `new`, rewriting every referring item's expression
    /// text (cascade rename) and re-keying the reverse-reference sets.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        if !self.items.contains_key(old) {
            return Err(ConfigError::NotFound(old.to_string()).into());
        }
        if self.items.contains_key(new) {
            return Err(ConfigError::NameConflict(new.to_string()).into());
        }
        let Some(mut item) = self.items.remove(old) else {
            return Err(ConfigError::NotFound(old.to_string()).into());
        };
        let referrers = item.reverse_references.clone();
        item.name = new.to_string();
        for reference in &item.references {
            if let Some(referenced) = self.items.get_mut(reference) {
                let _ = referenced.reverse_references.remove(old);
                let _ = referenced.reverse_references.insert(new.to_string());
            }
        }
        let _ = self.items.insert(new.to_string(), item);
        for referrer in referrers {
            if let Some(referring_item) = self.items.get_mut(&referrer) {
                referring_item.expression = rewrite_identifier(&referring_item.expression, old, new);
                let _ = referring_item.references.remove(old);
                let _ = referring_item.references.insert(new.to_string());
            }
        }
        Ok(())
    }

    /// Topological cycle check over the whole reference graph, run at
    /// project load time. On a cycle, names one node that participates in
    /// it.
    pub fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }
        let mut marks: HashMap<&str, Mark> = self.items.keys().map(|k| (k.as_str(), Mark::Unvisited)).collect();

        fn visit<'a>(name: &'a str, lib: &'a ConfigLibrary, marks: &mut HashMap<&'a str, Mark>) -> Result<()> {
            match marks.get(name).copied() {
                Some(Mark::Done) | None => return Ok(()),
                Some(Mark::InProgress) => return Err(ConfigError::Cycle(name.to_string()).into()),
                Some(Mark::Unvisited) => {}
            }
            let _ = marks.insert(name, Mark::InProgress);
            if let Some(item) = lib.items.get(name) {
                for reference in &item.references {
                    visit(reference, lib, marks)?;
                }
            }
            let _ = marks.insert(name, Mark::Done);
            Ok(())
        }

        let names: Vec<&str> = self.items.keys().map(String::as_str).collect();
        for name in names {
            visit(name, self, &mut marks)?;
        }
        Ok(())
    }
}

/// Rewrites a whole-word occurrence of `old` to `new` inside an expression's
/// text, used for cascade rename. Config names are identifiers, so a
/// substring match that isn't bounded by identifier characters on either
/// side is not a reference and is left untouched.
fn rewrite_identifier(expression: &str, old: &str, new: &str) -> String {
    let mut out = String::with_capacity(expression.len());
    let chars: Vec<char> = expression.chars().collect();
    let old_chars: Vec<char> = old.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let boundary_ok = |idx: isize| -> bool {
            if idx < 0 || idx as usize >= chars.len() {
                return true;
            }
            let c = chars[idx as usize];
            !(c.is_ascii_alphanumeric() || c == '_')
        };
        if chars[i..].starts_with(old_chars.as_slice())
            && boundary_ok(i as isize - 1)
            && boundary_ok((i + old_chars.len()) as isize)
        {
            out.push_str(new);
            i += old_chars.len();
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_reference_tracking() {
        let mut lib = ConfigLibrary::new();
        lib.insert("WIDTH".into(), "8".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();
        lib.insert("DOUBLE".into(), "WIDTH * 2".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();
        assert_eq!(lib.items["DOUBLE"].value, 16);
        assert!(lib.items["WIDTH"].reverse_references.contains("DOUBLE"));
    }

    #[test]
    fn remove_refuses_with_reverse_references() {
        let mut lib = ConfigLibrary::new();
        lib.insert("WIDTH".into(), "8".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();
        lib.insert("DOUBLE".into(), "WIDTH * 2".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();
        assert!(lib.remove("WIDTH").is_err());
        let _ = lib.remove("DOUBLE").unwrap();
        let _ = lib.remove("WIDTH").unwrap();
    }

    #[test]
    fn rename_cascades_into_referring_expressions() {
        let mut lib = ConfigLibrary::new();
        lib.insert("WIDTH".into(), "8".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();
        lib.insert("DOUBLE".into(), "WIDTH * 2".into(), String::new(), ConfigGroup::ProjectDefault).unwrap();
        lib.rename("WIDTH", "BUS_WIDTH").unwrap();
        assert_eq!(lib.items["DOUBLE"].expression, "BUS_WIDTH * 2");
        assert!(lib.items["BUS_WIDTH"].reverse_references.contains("DOUBLE"));
    }

    #[test]
    fn self_reference_rejected() {
        let mut lib = ConfigLibrary::new();
        let err = lib.insert("A".into(), "A + 1".into(), String::new(), ConfigGroup::ProjectDefault);
        assert!(err.is_err());
    }
}
