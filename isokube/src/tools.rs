use std::ffi::{OsStr, OsString};
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Output, Stdio};

use tracing::debug;

use crate::gke::ClusterRef;
use crate::kubeconfig::{SourceKubeconfig, KUBECONFIG};
use crate::signals::SignalGuard;
use crate::{Error, Result};

/// The external programs every isolated run delegates to.
#[derive(Debug, Clone)]
pub struct Tools {
    pub kubectl: OsString,
    pub gcloud: OsString,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".into(),
            gcloud: "gcloud".into(),
        }
    }
}

fn spawn_error(program: &OsStr, source: io::Error) -> Error {
    let tool = program.to_string_lossy().into_owned();
    if source.kind() == io::ErrorKind::NotFound {
        Error::ToolNotFound(tool)
    } else {
        Error::Spawn { tool, source }
    }
}

/// Runs a helper command to completion with its output captured.
fn capture(mut cmd: Command) -> Result<Output> {
    let program = cmd.get_program().to_os_string();
    debug!(command = ?cmd, "running");

    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|err| spawn_error(&program, err))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(status = %output.status, %stdout, %stderr, "finished");

    if !output.status.success() {
        return Err(Error::ToolFailed {
            tool: program.to_string_lossy().into_owned(),
            status: output.status,
            stderr: stderr.trim().to_string(),
        });
    }
    Ok(output)
}

impl Tools {
    fn kubectl_with(&self, kubeconfig: impl AsRef<OsStr>) -> Command {
        let mut cmd = Command::new(&self.kubectl);
        cmd.env(KUBECONFIG, kubeconfig);
        cmd
    }

    /// Selects `context` in the kubeconfig at `kubeconfig` only.
    pub fn use_context(&self, kubeconfig: &Path, context: &str) -> Result<()> {
        let mut cmd = self.kubectl_with(kubeconfig);
        cmd.args(["config", "use-context", context]);
        capture(cmd).map(drop)
    }

    /// The merged view of every source file, secrets included. With
    /// `flatten`, files referenced by path are inlined.
    pub fn view_merged(&self, sources: &SourceKubeconfig, flatten: bool) -> Result<Vec<u8>> {
        let mut cmd = self.kubectl_with(sources.to_env_value());
        cmd.args(["config", "view", "--raw"]);
        if flatten {
            cmd.arg("--flatten");
        }
        capture(cmd).map(|output| output.stdout)
    }

    /// Has gcloud write credentials for `cluster` into `kubeconfig`.
    pub fn get_credentials(&self, kubeconfig: &Path, cluster: &ClusterRef) -> Result<()> {
        let mut cmd = Command::new(&self.gcloud);
        cmd.args(cluster.get_credentials_args())
            .env(KUBECONFIG, kubeconfig);
        capture(cmd).map(drop)
    }

    /// Runs the user's kubectl command with the terminal attached. Signals
    /// caught by `signals` meanwhile are passed on to it.
    pub fn kubectl<I, S>(
        &self,
        kubeconfig: &Path,
        args: I,
        signals: &SignalGuard,
    ) -> Result<ExitStatus>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.kubectl_with(kubeconfig);
        cmd.args(args);
        debug!(command = ?cmd, "running");

        let mut child = cmd.spawn().map_err(|err| spawn_error(&self.kubectl, err))?;
        signals.forward_to(child.id());
        let status = child.wait();
        signals.stop_forwarding();

        status.map_err(|source| Error::Spawn {
            tool: self.kubectl.to_string_lossy().into_owned(),
            source,
        })
    }
}

/// The exit code to propagate for a finished child.
pub fn exit_code(status: ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return code as u8;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128u8.wrapping_add(signal as u8);
        }
    }

    1
}
