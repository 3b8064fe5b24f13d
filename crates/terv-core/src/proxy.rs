//! Process proxy: runs the resolved tool binary in place of itself.
//!
//! The child runs in its own process group so terminal interrupts reach
//! the proxy, which relays them: the first interrupt is forwarded, the
//! second kills the child. Under GitHub Actions the child's output is
//! captured (while still streaming) and published as step outputs.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

use crate::error::{Result, TervError};
use crate::lastuse;
use crate::manager::VersionManager;

const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// `terraform plan -detailed-exitcode` reports pending changes with this
/// code; in CI capture mode it is published without an error message,
/// but the code itself still passes through.
const DETAILED_EXIT_CODE: i32 = 2;

/// Honor a `-chdir=` argument before version resolution, the way the
/// proxied tool itself would.
pub fn update_work_path(work_path: &mut std::path::PathBuf, args: &[String]) {
    for arg in args {
        if let Some(dir) = arg.strip_prefix("-chdir=") {
            *work_path = work_path.join(dir);
        }
    }
}

/// Resolve the version for the manager's tool, then execute its binary
/// with `args`. Returns the exit code the proxy should terminate with.
pub async fn run(manager: &VersionManager, args: &[String]) -> Result<i32> {
    let version = manager.detect().await?;
    let version_dir = manager.version_dir(&version)?;
    let binary_path = manager.binary_path(&version)?;
    lastuse::touch(&version_dir, manager.config().reporter.as_ref());

    let gha_output = if manager.config().github_actions {
        std::env::var(GITHUB_OUTPUT_ENV)
            .ok()
            .filter(|p| !p.is_empty())
    } else {
        None
    };

    let mut command = Command::new(&binary_path);
    command.args(args).stdin(Stdio::inherit());
    #[cfg(unix)]
    command.process_group(0);

    if gha_output.is_some() {
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
    } else {
        command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    }

    let mut child = command.spawn().map_err(|err| TervError::ProcessSpawn {
        path: binary_path.display().to_string(),
        source: err,
    })?;

    let relay = spawn_signal_relay(&child);

    let exit_code = if let Some(output_path) = gha_output {
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let (captured_out, captured_err) = tokio::join!(
            tee(stdout_pipe, tokio::io::stdout()),
            tee(stderr_pipe, tokio::io::stderr()),
        );
        let status = child.wait().await?;
        let exit_code = exit_code_of(&status);

        write_step_outputs(
            Path::new(&output_path),
            &captured_out?,
            &captured_err?,
            exit_code,
        )?;

        if exit_code != 0 && exit_code != DETAILED_EXIT_CODE {
            manager.config().reporter.warning(&format!(
                "{} exited with code {exit_code}",
                binary_path.display()
            ));
        }
        exit_code
    } else {
        exit_code_of(&child.wait().await?)
    };

    if let Some(relay) = relay {
        relay.abort();
    }
    Ok(exit_code)
}

/// Forward the first interrupt to the child, kill it on the second.
fn spawn_signal_relay(child: &Child) -> Option<tokio::task::JoinHandle<()>> {
    #[cfg(unix)]
    {
        let pid = child.id()?;
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
        return Some(tokio::spawn(relay_interrupts(rx, pid)));
    }
    #[cfg(not(unix))]
    {
        let _ = child;
        None
    }
}

#[cfg(unix)]
async fn relay_interrupts(mut interrupts: tokio::sync::mpsc::Receiver<()>, pid: u32) {
    let mut interrupted = false;
    while interrupts.recv().await.is_some() {
        let signal = if interrupted {
            libc::SIGKILL
        } else {
            libc::SIGINT
        };
        interrupted = true;
        send_signal(pid, signal);
    }
}

#[cfg(unix)]
#[allow(unsafe_code, clippy::cast_possible_wrap)]
fn send_signal(pid: u32, signal: i32) {
    // SAFETY: kill with a pid we spawned; failure (already exited) is fine
    unsafe {
        libc::kill(pid as libc::pid_t, signal);
    }
}

fn exit_code_of(status: &std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Stream a child pipe to the proxy's own stream while keeping a copy.
async fn tee<R, W>(reader: Option<R>, mut writer: W) -> std::io::Result<String>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(String::new());
    };
    let mut captured = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = reader.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        writer.write_all(&buf[..read]).await?;
        writer.flush().await?;
        captured.extend_from_slice(&buf[..read]);
    }
    Ok(String::from_utf8_lossy(&captured).into_owned())
}

/// Append `stdout`, `stderr`, and `exitcode` step outputs in the
/// multiline heredoc format GitHub Actions expects.
fn write_step_outputs(
    output_path: &Path,
    stdout: &str,
    stderr: &str,
    exit_code: i32,
) -> Result<()> {
    use std::io::Write;

    let delimiter = format!("ghadelimeter_{}", rand::random::<u64>());
    let entries = [
        ("stdout", stdout),
        ("stderr", stderr),
        ("exitcode", &exit_code.to_string()),
    ];
    for (key, value) in &entries {
        if key.contains(&delimiter) || value.contains(&delimiter) {
            return Err(TervError::context(
                "ci output",
                "captured output contains the generated delimiter",
            ));
        }
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_path)?;
    for (key, value) in &entries {
        writeln!(file, "{key}<<{delimiter}")?;
        writeln!(file, "{value}")?;
        writeln!(file, "{delimiter}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chdir_flag_moves_work_path() {
        let mut work_path = std::path::PathBuf::from("/work");
        update_work_path(
            &mut work_path,
            &["plan".to_string(), "-chdir=envs/prod".to_string()],
        );
        assert_eq!(work_path, Path::new("/work/envs/prod"));
    }

    #[test]
    fn step_outputs_use_heredoc_format() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("gh_output");
        write_step_outputs(&path, "plan output\nline two", "warn", 2).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("stdout<<ghadelimeter_"));
        assert!(content.contains("plan output\nline two\n"));
        assert!(content.contains("stderr<<ghadelimeter_"));
        assert!(content.contains("exitcode<<ghadelimeter_"));
        assert!(content.contains("\n2\n"));
    }

    #[tokio::test]
    async fn tee_streams_and_captures() {
        let data: &[u8] = b"hello from the child";
        let captured = tee(Some(data), tokio::io::sink()).await.unwrap();
        assert_eq!(captured, "hello from the child");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn first_interrupt_is_forwarded() {
        let mut child = Command::new("/bin/sh")
            .arg("-c")
            .arg("trap 'exit 42' INT; while :; do sleep 0.05; done")
            .spawn()
            .unwrap();
        let pid = child.id().unwrap();
        let (tx, rx) = tokio::sync::mpsc::channel(2);
        let relay = tokio::spawn(relay_interrupts(rx, pid));

        // let the shell install its trap before signaling
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        tx.send(()).await.unwrap();
        let status = child.wait().await.unwrap();
        assert_eq!(exit_code_of(&status), 42);
        relay.abort();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn second_interrupt_kills_a_stuck_child() {
        let mut child = Command::new("/bin/sh")
            .arg("-c")
            .arg("trap '' INT; sleep 30")
            .spawn()
            .unwrap();
        let pid = child.id().unwrap();
        let (tx, rx) = tokio::sync::mpsc::channel(2);
        let relay = tokio::spawn(relay_interrupts(rx, pid));

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        tx.send(()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        // the child ignores the forwarded interrupt
        assert!(child.try_wait().unwrap().is_none());

        tx.send(()).await.unwrap();
        let status = child.wait().await.unwrap();
        assert_eq!(exit_code_of(&status), 128 + libc::SIGKILL);
        relay.abort();
    }
}
