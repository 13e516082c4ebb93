use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use isokube::{ClusterRef, SourceKubeconfig};

/// Print the kube context name gcloud writes for a GKE cluster, and which
/// shared kube config already defines it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    project: String,
    cluster: String,
    zone: String,

    #[arg(long, env = "KUBECONFIG", value_name = "PATHS")]
    kubeconfig: Option<OsString>,
}

#[derive(Debug, PartialEq, Eq)]
enum Lookup {
    Defined(PathBuf),
    Undefined,
}

impl Lookup {
    fn find(sources: &SourceKubeconfig, context: &str) -> anyhow::Result<Self> {
        let found = sources
            .find_context(context)
            .with_context(|| format!("Looking up {context}"))?;
        Ok(found.map_or(Lookup::Undefined, Lookup::Defined))
    }

    fn message(&self) -> String {
        match self {
            Lookup::Defined(path) => format!("defined in {}", path.display()),
            Lookup::Undefined => "not defined in any shared kube config".to_string(),
        }
    }

    fn exit_code(&self) -> u8 {
        match self {
            Lookup::Defined(_) => 0,
            Lookup::Undefined => 1,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cluster = ClusterRef::new(&args.project, &args.cluster, &args.zone)?;
    let sources = SourceKubeconfig::from_env(args.kubeconfig.as_deref())
        .context("Locating shared kube config")?;

    let context = cluster.context_name();
    println!("{context}");

    let lookup = Lookup::find(&sources, &context)?;
    eprintln!("{}", lookup.message());

    Ok(ExitCode::from(lookup.exit_code()))
}
