use crate::command::{ExitCode, Launcher};
use crate::env::Environment;
use anyhow::{Context, Result, anyhow};
use std::borrow::Cow;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPT_GUARD: OnceLock<bool> = OnceLock::new();
static STAGE_RUNNING: AtomicBool = AtomicBool::new(false);

/// Keep Ctrl-C from terminating the menu.
///
/// A terminal interrupt reaches the whole foreground process group: the
/// running stage still dies from it (handlers reset to default on exec), while
/// the menu swallows it and returns to its prompt. At the prompt itself the
/// line editor reads Ctrl-C as a key, not a signal.
///
/// Installed at most once per process; returns whether the handler is active.
pub fn install_interrupt_guard() -> bool {
    *INTERRUPT_GUARD.get_or_init(|| {
        let installed = ctrlc::set_handler(|| {
            if STAGE_RUNNING.load(Ordering::SeqCst) {
                tracing::info!("interrupt delivered to running stage");
            } else {
                tracing::debug!("interrupt ignored");
            }
        });
        match installed {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "could not install interrupt handler");
                false
            }
        }
    })
}

/// Launches pipeline executables as child processes sharing the terminal.
pub struct ProcessLauncher {
    bin_dir: PathBuf,
    current_dir: PathBuf,
}

impl ProcessLauncher {
    pub fn new(env: &Environment) -> Self {
        install_interrupt_guard();
        Self {
            bin_dir: env.resolved_bin_dir(),
            current_dir: env.current_dir.clone(),
        }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&mut self, program: &str, args: &[OsString]) -> Result<ExitCode> {
        let executable = find_stage_executable(&self.bin_dir, Path::new(program))
            .ok_or_else(|| anyhow!("{} not found in {}", program, self.bin_dir.display()))?;
        tracing::info!(executable = %executable.display(), ?args, "spawning");
        let mut child = Command::new(&*executable)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .current_dir(&self.current_dir)
            .spawn()
            .with_context(|| format!("failed to spawn {}", executable.display()))?;
        STAGE_RUNNING.store(true, Ordering::SeqCst);
        let waited = child.wait();
        STAGE_RUNNING.store(false, Ordering::SeqCst);
        let exit_status = waited?;
        match exit_status.code() {
            Some(x) => Ok(x),
            None => Ok(terminated_by_signal(exit_status)),
        }
    }
}
#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a stage executable.
///
/// Behavior:
/// - Absolute path: returns it if it is a file.
/// - Anything else: looked up relative to `bin_dir`; there is no PATH search,
///   the pipeline binaries are expected to sit together in one folder.
/// - Empty name: returns `None`.
pub fn find_stage_executable<'a>(bin_dir: &Path, program: &'a Path) -> Option<Cow<'a, Path>> {
    if program.as_os_str().is_empty() {
        return None;
    }
    if program.is_absolute() {
        return find_by_path(program).map(Cow::Borrowed);
    }
    let candidate = bin_dir.join(program);
    find_by_path(&candidate).map(|p| Cow::Owned(p.to_owned()))
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.is_file() { Some(path) } else { None }
}
