pub mod error;
pub mod gke;
pub mod isolate;
pub mod kubeconfig;
pub mod signals;
pub mod tools;

use std::ffi::OsString;
use std::process::ExitStatus;

use tracing::{info, warn};

pub use error::{Error, Result};
pub use gke::{ClusterRef, Location};
pub use isolate::{populate, Populated, PrivateKubeconfig, Strategy};
pub use kubeconfig::SourceKubeconfig;
pub use signals::SignalGuard;
pub use tools::{exit_code, Tools};

/// One kubectl invocation against one cluster.
#[derive(Debug, Clone)]
pub struct Request {
    pub cluster: ClusterRef,
    /// kubectl arguments, without the program name.
    pub command: Vec<OsString>,
    pub sources: SourceKubeconfig,
    pub tools: Tools,
    pub strategy: Strategy,
    /// Leave the private kubeconfig on disk afterwards.
    pub keep: bool,
}

/// Accepts both `get pods` and `kubectl get pods`.
pub fn normalize_command(mut args: Vec<OsString>) -> Result<Vec<OsString>> {
    if args.first().is_some_and(|arg| arg == "kubectl") {
        args.remove(0);
    }
    if args.is_empty() {
        return Err(Error::InvalidArgument("no kubectl command given".to_string()));
    }
    Ok(args)
}

/// Runs the request's command against a private kubeconfig and returns
/// kubectl's exit status. The private kubeconfig is gone by the time this
/// returns, whatever the outcome, unless `keep` was asked for.
pub fn run_isolated(request: &Request) -> Result<ExitStatus> {
    // Declared first so it is dropped last, after the private kube config.
    let signals = SignalGuard::install()?;
    let private = PrivateKubeconfig::create()?;

    let result = run_in(&private, request, &signals);

    if request.keep {
        let kept = private.keep();
        warn!(kubeconfig = %kept.display(), "keeping private kube config");
    }

    result
}

fn run_in(
    private: &PrivateKubeconfig,
    request: &Request,
    signals: &SignalGuard,
) -> Result<ExitStatus> {
    let populated = populate(
        private,
        &request.cluster,
        &request.sources,
        &request.tools,
        request.strategy,
    );
    if let Some(signal) = signals.interrupted() {
        return Err(Error::Interrupted(signal));
    }
    let populated = populated?;
    info!(
        cluster = %request.cluster,
        ?populated,
        kubeconfig = %private.path().display(),
        "isolated kube config ready"
    );

    request.tools.kubectl(private.path(), &request.command, signals)
}
