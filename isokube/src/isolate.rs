use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{info, warn};

use crate::gke::ClusterRef;
use crate::kubeconfig::SourceKubeconfig;
use crate::tools::Tools;
use crate::{Error, Result};

/// A kubeconfig only this process uses, inside a directory named after the
/// process id. Removed on drop unless [`PrivateKubeconfig::keep`] is called.
#[derive(Debug)]
pub struct PrivateKubeconfig {
    dir: TempDir,
    path: PathBuf,
}

impl PrivateKubeconfig {
    pub fn create() -> Result<Self> {
        let prefix = format!("isokube-{}-", std::process::id());
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir()
            .map_err(|err| Error::io(std::env::temp_dir(), err))?;
        let path = dir.path().join("config");
        Ok(Self { dir, path })
    }

    /// The file may not exist yet; gcloud creates it in the fetch branch.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leaves the directory on disk and returns the kubeconfig path.
    pub fn keep(self) -> PathBuf {
        let _ = self.dir.keep();
        self.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Copy the shared kubeconfig when it already knows the cluster.
    #[default]
    ReuseOrFetch,
    /// Always ask gcloud for new credentials.
    AlwaysFetch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Populated {
    Copied { from: PathBuf },
    Fetched,
}

/// Fills `private` with credentials for `cluster`. Source files are only
/// ever read.
pub fn populate(
    private: &PrivateKubeconfig,
    cluster: &ClusterRef,
    sources: &SourceKubeconfig,
    tools: &Tools,
    strategy: Strategy,
) -> Result<Populated> {
    let context = cluster.context_name();

    let found = match strategy {
        Strategy::ReuseOrFetch => sources.find_context(&context)?,
        Strategy::AlwaysFetch => None,
    };

    let Some(from) = found else {
        info!(%cluster, "fetching credentials with gcloud");
        tools.get_credentials(private.path(), cluster)?;
        return Ok(Populated::Fetched);
    };

    info!(%context, from = %from.display(), "reusing shared context");
    let relative = sources.relative_file_refs()?;
    if !relative.is_empty() {
        warn!(?relative, "inlining relative file references");
    }

    if sources.is_single() && relative.is_empty() {
        fs::copy(&from, private.path()).map_err(|err| Error::io(&from, err))?;
    } else {
        let merged = tools.view_merged(sources, !relative.is_empty())?;
        fs::write(private.path(), merged).map_err(|err| Error::io(private.path(), err))?;
    }
    tools.use_context(private.path(), &context)?;

    Ok(Populated::Copied { from })
}
