//! Child process helpers shared by the engines.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::sync::mpsc;
use std::thread;

use packup_core::error::{Error, Result};
use packup_core::WatchHandle;

/// Locates a tool binary: an explicit path first, then the nearest
/// `node_modules/.bin`, then `PATH`.
pub fn find_binary(cwd: &Path, name: &str, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            cwd.join(path)
        };
        return if path.is_file() {
            Ok(path)
        } else {
            Err(Error::Engine {
                engine: name.to_string(),
                message: format!("configured binary {} does not exist", path.display()),
            })
        };
    }

    for dir in cwd.ancestors() {
        let candidate = dir.join("node_modules").join(".bin").join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    which::which(name).map_err(|e| Error::Engine {
        engine: name.to_string(),
        message: format!(
            "could not find `{}` in node_modules/.bin or PATH ({}). Install it or set [engines].{} in packup.toml",
            name, e, name
        ),
    })
}

/// Runs a command to completion, capturing both output streams.
pub fn run_captured(engine: &str, command: &mut Command) -> Result<Output> {
    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| Error::Engine {
            engine: engine.to_string(),
            message: format!("failed to execute: {}", e),
        })
}

/// A long-running child process whose output lines are fed to a callback.
///
/// Closing kills and reaps the child; the reader threads end on EOF.
/// Closing twice, or dropping after a close, does nothing.
pub struct ProcessWatcher {
    child: Option<Child>,
    /// Files that must outlive the process (generated configs).
    temp_files: Vec<tempfile::TempPath>,
}

impl ProcessWatcher {
    pub fn spawn<F>(engine: &str, mut command: Command, mut on_line: F) -> Result<Self>
    where
        F: FnMut(&str) + Send + 'static,
    {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Engine {
                engine: engine.to_string(),
                message: format!("failed to start watcher: {}", e),
            })?;

        let (tx, rx) = mpsc::channel::<String>();
        if let Some(stdout) = child.stdout.take() {
            pump_lines(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            pump_lines(stderr, tx.clone());
        }
        drop(tx);

        thread::spawn(move || {
            for line in rx {
                on_line(&line);
            }
        });

        Ok(Self {
            child: Some(child),
            temp_files: Vec::new(),
        })
    }

    pub fn keep_alive(mut self, path: tempfile::TempPath) -> Self {
        self.temp_files.push(path);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.child.is_none()
    }
}

fn pump_lines<R: Read + Send + 'static>(reader: R, tx: mpsc::Sender<String>) {
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

impl WatchHandle for ProcessWatcher {
    fn close(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let _ = child.kill();
        let _ = child.wait();
        self.temp_files.clear();
    }
}

impl Drop for ProcessWatcher {
    fn drop(&mut self) {
        self.close();
    }
}
