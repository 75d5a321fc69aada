//! The generation stage (§4.8.1), grounded on `simulation/simman.h`'s
//! `GenerationConfig`/`GenerationStepInfo` shape: elaborates the project's
//! module graph, starting from the top module, into one text file per
//! instantiated module under the run's `generation/` directory. A later,
//! richer code generator can replace the body of [`run`] without touching its
//! signature or the step-info bookkeeping callers rely on.

use std::collections::HashSet;
use std::fs;

use crate::error::{ProjectError, Result};
use crate::module::ModuleEntry;
use crate::persistence::RunPaths;
use crate::project::Project;
use crate::protocol::LogCategory;
use crate::simulation::logbus::LogBus;

/// Generation stage options. Empty today; reserved for the target language
/// or optimization flags a richer generator would need.
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {}

/// Per-run generation outcome (§4.8: every stage reports `started`/`finished`
/// plus any errors, independent of whether the step actually ran).
#[derive(Debug, Clone, Default)]
pub struct GenerationStepInfo {
    pub started: bool,
    pub finished: bool,
    pub finished_us: Option<u64>,
    pub errors: Vec<String>,
}

/// Elaborates every module reachable from `project.top_module`, writing one
/// file per module into `paths.generation_dir()`.
pub fn run(project: &Project, paths: &RunPaths, _config: &GenerationConfig, log: &LogBus, now_us: u64) -> GenerationStepInfo {
    let mut info = GenerationStepInfo { started: true, ..GenerationStepInfo::default() };
    log.push(now_us, crate::protocol::LogLevel::Info, LogCategory::Generation, "elaboration started");

    let Some(top) = project.top_module.clone() else {
        info.errors.push(ProjectError::NotOpened.to_string());
        return info;
    };

    if let Err(e) = fs::create_dir_all(paths.generation_dir()) {
        info.errors.push(e.to_string());
        return info;
    }

    let mut visited = HashSet::new();
    let mut stack = vec![top];
    while let Some(name) = stack.pop() {
        if !visited.insert(name.clone()) {
            continue;
        }
        match project.modulelib.get(&name) {
            Ok(ModuleEntry::Local(module)) => {
                let text = elaborate(&name, module);
                let file = paths.generation_dir().join(format!("{name}.txt"));
                if let Err(e) = fs::write(&file, text) {
                    info.errors.push(e.to_string());
                }
                for instance in module.instances.values() {
                    stack.push(instance.module_name.clone());
                }
            }
            Ok(ModuleEntry::External(_)) => {}
            Err(e) => info.errors.push(e.message()),
        }
    }

    info.finished = info.errors.is_empty();
    info.finished_us = Some(now_us);
    log.push(
        now_us,
        if info.finished { crate::protocol::LogLevel::Info } else { crate::protocol::LogLevel::Error },
        LogCategory::Generation,
        format!("elaboration {}", if info.finished { "finished" } else { "failed" }),
    );
    info
}

fn elaborate(name: &str, module: &crate::module::Module) -> String {
    let mut out = format!("module {name}\n");
    let mut instances: Vec<_> = module.instances.iter().collect();
    instances.sort_by_key(|(n, _)| n.clone());
    for (instance_name, instance) in instances {
        out.push_str(&format!("  instance {instance_name} : {}\n", instance.module_name));
    }
    let mut connections: Vec<_> = module.request_connections.iter().collect();
    connections.sort_by_key(|c| (c.src_instance.clone(), c.src_port.clone()));
    for conn in connections {
        out.push_str(&format!(
            "  connect {}.{} -> {}.{}\n",
            conn.src_instance, conn.src_port, conn.dst_instance, conn.dst_port
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;
    use tempfile::tempdir;

    #[test]
    fn errors_without_a_top_module() {
        let project = Project::new("p".into(), vec![]);
        let dir = tempdir().unwrap();
        let paths = RunPaths::new(dir.path(), "run-1");
        let log = LogBus::new();
        let info = run(&project, &paths, &GenerationConfig::default(), &log, 0);
        assert!(!info.finished);
        assert!(!info.errors.is_empty());
    }

    #[test]
    fn elaborates_top_module_into_a_file() {
        let mut project = Project::new("p".into(), vec![]);
        project.modulelib.add("Top".into(), ModuleEntry::Local(Module::default())).unwrap();
        project.top_module = Some("Top".into());
        let dir = tempdir().unwrap();
        let paths = RunPaths::new(dir.path(), "run-1");
        let log = LogBus::new();
        let info = run(&project, &paths, &GenerationConfig::default(), &log, 0);
        assert!(info.finished);
        assert!(paths.generation_dir().join("Top.txt").exists());
    }
}
