//! The compilation stage (§4.8.2), grounded on `simulation/simman.h`'s
//! `CompilationConfig{release_mode}`/`CompilationStepInfo` and the
//! child-process supervision pattern in `platform/childproc.*`: spawn a
//! build command over the generation output, stream its stdout/stderr onto
//! the log bus from dedicated reader threads, and report its exit status.

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::thread;

use crate::persistence::RunPaths;
use crate::protocol::{LogCategory, LogLevel};
use crate::simulation::logbus::LogBus;

/// Compilation stage options (§4.8.2: release vs. debug build).
#[derive(Debug, Clone)]
pub struct CompilationConfig {
    pub release_mode: bool,
    /// The build command to run, e.g. `["cc", "-o", "image.bin"]`. Run
    /// relative to the run's `build/` directory.
    pub command: Vec<String>,
}

impl Default for CompilationConfig {
    fn default() -> Self {
        Self { release_mode: false, command: vec!["true".into()] }
    }
}

/// Per-run compilation outcome.
#[derive(Debug, Clone, Default)]
pub struct CompilationStepInfo {
    pub started: bool,
    pub finished: bool,
    pub finished_us: Option<u64>,
    pub errors: Vec<String>,
}

/// Runs `config.command` inside `paths.build_dir()`, forwarding its output
/// lines to `log` as they arrive.
pub fn run(paths: &RunPaths, config: &CompilationConfig, log: &LogBus, now_us: u64) -> CompilationStepInfo {
    let mut info = CompilationStepInfo { started: true, ..CompilationStepInfo::default() };
    log.push(now_us, LogLevel::Info, LogCategory::Compilation, "compilation started");

    if let Err(e) = std::fs::create_dir_all(paths.build_dir()) {
        info.errors.push(e.to_string());
        return info;
    }

    let Some((program, args)) = config.command.split_first() else {
        info.errors.push("empty compilation command".into());
        return info;
    };

    let child = Command::new(program)
        .args(args)
        .current_dir(paths.build_dir())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            info.errors.push(format!("failed to spawn '{program}': {e}"));
            return info;
        }
    };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    thread::scope(|scope| {
        if let Some(out) = stdout {
            scope.spawn(move || {
                for line in BufReader::new(out).lines().map_while(std::result::Result::ok) {
                    log.push(now_us, LogLevel::Debug, LogCategory::Compilation, line);
                }
            });
        }
        if let Some(err) = stderr {
            scope.spawn(move || {
                for line in BufReader::new(err).lines().map_while(std::result::Result::ok) {
                    log.push(now_us, LogLevel::Warning, LogCategory::Compilation, line);
                }
            });
        }
    });

    let status = child.wait();

    match status {
        Ok(status) if status.success() => {
            info.finished = true;
        }
        Ok(status) => info.errors.push(format!("build command exited with {status}")),
        Err(e) => info.errors.push(e.to_string()),
    }
    info.finished_us = Some(now_us);
    log.push(
        now_us,
        if info.finished { LogLevel::Info } else { LogLevel::Error },
        LogCategory::Compilation,
        format!("compilation {}", if info.finished { "finished" } else { "failed" }),
    );
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn runs_a_trivial_command_successfully() {
        let dir = tempdir().unwrap();
        let paths = RunPaths::new(dir.path(), "run-1");
        let log = LogBus::new();
        let config = CompilationConfig { release_mode: false, command: vec!["true".into()] };
        let info = run(&paths, &config, &log, 0);
        assert!(info.finished, "{:?}", info.errors);
    }

    #[test]
    fn reports_error_on_missing_program() {
        let dir = tempdir().unwrap();
        let paths = RunPaths::new(dir.path(), "run-1");
        let log = LogBus::new();
        let config = CompilationConfig { release_mode: false, command: vec!["definitely-not-a-real-program".into()] };
        let info = run(&paths, &config, &log, 0);
        assert!(!info.finished);
    }
}
