mod args;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use args::Args;
use isokube::{
    exit_code, normalize_command, run_isolated, ClusterRef, Error, Request, SourceKubeconfig,
    Strategy, Tools,
};

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // RUST_LOG wins over -v. stdout belongs to kubectl.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(args.log_level().into()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cluster = ClusterRef::new(&args.project, &args.cluster, &args.zone)?;
    let sources = SourceKubeconfig::from_env(args.kubeconfig.as_deref())
        .context("Locating shared kube config")?;

    let request = Request {
        cluster,
        command: normalize_command(args.command)?,
        sources,
        tools: Tools {
            kubectl: args.kubectl,
            gcloud: args.gcloud,
        },
        strategy: if args.fresh {
            Strategy::AlwaysFetch
        } else {
            Strategy::ReuseOrFetch
        },
        keep: args.keep,
    };

    let status = match run_isolated(&request) {
        Ok(status) => status,
        Err(Error::Interrupted(signal)) => {
            return Ok(ExitCode::from(128u8.wrapping_add(signal as u8)));
        }
        Err(err) => {
            return Err(err).with_context(|| {
                format!("Preparing or running kubectl against {}", request.cluster)
            });
        }
    };

    Ok(ExitCode::from(exit_code(status)))
}
