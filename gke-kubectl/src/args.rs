use std::ffi::OsString;

use clap::Parser;
use tracing::level_filters::LevelFilter;

/// Run one kubectl command against a GKE cluster without touching the
/// shared kube config.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// GCP project that owns the cluster
    pub project: String,

    /// GKE cluster name
    pub cluster: String,

    /// Zone (or region) of the cluster
    pub zone: String,

    /// kubectl arguments, with or without a leading `kubectl`
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<OsString>,

    /// Shared kube config(s) to look for an existing context in
    #[arg(long, env = "KUBECONFIG", value_name = "PATHS")]
    pub kubeconfig: Option<OsString>,

    #[arg(long, env = "GKE_KUBECTL", default_value = "kubectl", value_name = "PROG")]
    pub kubectl: OsString,

    #[arg(long, env = "GKE_GCLOUD", default_value = "gcloud", value_name = "PROG")]
    pub gcloud: OsString,

    /// Fetch new credentials even if the shared kube config has the context
    #[arg(long)]
    pub fresh: bool,

    /// Leave the private kube config on disk and log its path
    #[arg(long)]
    pub keep: bool,

    /// More logging on stderr; repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}
