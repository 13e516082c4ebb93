use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

pub const KUBECONFIG: &str = "KUBECONFIG";

// region: Index
// Only context names and file references are read. Everything else in the
// file is opaque to us.
#[derive(Deserialize, Debug)]
struct NamedContext {
    name: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
struct ClusterFiles {
    certificate_authority: Option<PathBuf>,
}

#[derive(Deserialize, Debug)]
struct NamedCluster {
    #[serde(default)]
    cluster: Option<ClusterFiles>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
struct UserFiles {
    client_certificate: Option<PathBuf>,
    client_key: Option<PathBuf>,
    #[serde(rename = "tokenFile")]
    token_file: Option<PathBuf>,
}

#[derive(Deserialize, Debug)]
struct NamedUser {
    #[serde(default)]
    user: Option<UserFiles>,
}

#[derive(Deserialize, Debug, Default)]
struct ConfigIndex {
    #[serde(default)]
    contexts: Option<Vec<NamedContext>>,
    #[serde(default)]
    clusters: Option<Vec<NamedCluster>>,
    #[serde(default)]
    users: Option<Vec<NamedUser>>,
}

impl ConfigIndex {
    fn read_from(path: &Path) -> Result<Option<ConfigIndex>> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::io(path, err)),
        };

        if data.trim().is_empty() {
            return Ok(Some(ConfigIndex::default()));
        }

        let index = serde_yaml::from_str(&data).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(index))
    }

    fn contains(&self, name: &str) -> bool {
        self.contexts
            .iter()
            .flatten()
            .any(|ctx| ctx.name == name)
    }

    /// File references kubectl resolves against the config's own directory.
    fn relative_files(&self) -> impl Iterator<Item = &PathBuf> {
        let clusters = self
            .clusters
            .iter()
            .flatten()
            .filter_map(|c| c.cluster.as_ref())
            .filter_map(|c| c.certificate_authority.as_ref());
        let users = self
            .users
            .iter()
            .flatten()
            .filter_map(|u| u.user.as_ref())
            .flat_map(|u| [&u.client_certificate, &u.client_key, &u.token_file])
            .flatten();

        clusters.chain(users).filter(|path| path.is_relative())
    }
}
// endregion

// region: Shared kubeconfig
/// The shared kubeconfig files, in the order kubectl merges them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceKubeconfig {
    paths: Vec<PathBuf>,
}

impl SourceKubeconfig {
    /// An explicit path list wins over `KUBECONFIG`, which wins over
    /// `$HOME/.kube/config`.
    pub fn resolve(
        explicit: Option<&OsStr>,
        env_value: Option<&OsStr>,
        home: Option<&OsStr>,
    ) -> Result<Self> {
        for list in [explicit, env_value].into_iter().flatten() {
            let paths: Vec<PathBuf> = env::split_paths(list)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !paths.is_empty() {
                return Ok(Self { paths });
            }
        }

        let home = home.ok_or(Error::NoHome)?;
        Ok(Self {
            paths: vec![Path::new(home).join(".kube").join("config")],
        })
    }

    pub fn from_env(explicit: Option<&OsStr>) -> Result<Self> {
        Self::resolve(
            explicit,
            env::var_os(KUBECONFIG).as_deref(),
            env::var_os("HOME").as_deref(),
        )
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn is_single(&self) -> bool {
        self.paths.len() == 1
    }

    /// The path list as a `KUBECONFIG` value.
    pub fn to_env_value(&self) -> OsString {
        // Paths came out of split_paths, so they never contain the separator.
        env::join_paths(&self.paths).unwrap_or_default()
    }

    /// Returns the first file that defines a context named `name`.
    pub fn find_context(&self, name: &str) -> Result<Option<PathBuf>> {
        for path in &self.paths {
            match ConfigIndex::read_from(path)? {
                Some(index) if index.contains(name) => return Ok(Some(path.clone())),
                Some(_) => debug!(path = %path.display(), context = name, "context not defined"),
                None => debug!(path = %path.display(), "kube config does not exist"),
            }
        }
        Ok(None)
    }

    /// Relative certificate, key and token paths in any source file. They
    /// stop resolving once the file is copied elsewhere.
    pub fn relative_file_refs(&self) -> Result<Vec<PathBuf>> {
        let mut refs = Vec::new();
        for path in &self.paths {
            if let Some(index) = ConfigIndex::read_from(path)? {
                refs.extend(index.relative_files().cloned());
            }
        }
        Ok(refs)
    }
}
// endregion

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: gke_p_us-east1-b_one
clusters:
- name: gke_p_us-east1-b_one
  cluster:
    server: https://10.0.0.1
contexts:
- name: gke_p_us-east1-b_one
  context:
    cluster: gke_p_us-east1-b_one
    user: gke_p_us-east1-b_one
- name: minikube
  context:
    cluster: minikube
    user: minikube
users:
- name: gke_p_us-east1-b_one
  user:
    exec:
      command: gke-gcloud-auth-plugin
"#;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn explicit_beats_env_and_home() {
        let src = SourceKubeconfig::resolve(
            Some(OsStr::new("/a/config")),
            Some(OsStr::new("/b/config")),
            Some(OsStr::new("/home/me")),
        )
        .unwrap();
        assert_eq!(src.paths(), [PathBuf::from("/a/config")]);
    }

    #[test]
    fn env_list_is_split() {
        let list = env::join_paths(["/a/config", "", "/b/config"]).unwrap();
        let src = SourceKubeconfig::resolve(None, Some(list.as_os_str()), None).unwrap();
        assert_eq!(
            src.paths(),
            [PathBuf::from("/a/config"), PathBuf::from("/b/config")]
        );
        assert!(!src.is_single());
        assert_eq!(
            src.to_env_value(),
            env::join_paths(["/a/config", "/b/config"]).unwrap()
        );
    }

    #[test]
    fn falls_back_to_home() {
        let src =
            SourceKubeconfig::resolve(None, Some(OsStr::new("")), Some(OsStr::new("/home/me")))
                .unwrap();
        assert_eq!(src.paths(), [PathBuf::from("/home/me/.kube/config")]);

        assert!(matches!(
            SourceKubeconfig::resolve(None, None, None),
            Err(Error::NoHome)
        ));
    }

    #[test]
    fn finds_context_in_first_defining_file() {
        let other = config_file("contexts:\n- name: kind-dev\n  context: {cluster: kind-dev, user: kind-dev}\n");
        let gke = config_file(CONFIG);
        let list = env::join_paths([other.path(), gke.path()]).unwrap();
        let src = SourceKubeconfig::resolve(Some(list.as_os_str()), None, None).unwrap();

        assert_eq!(
            src.find_context("gke_p_us-east1-b_one").unwrap(),
            Some(gke.path().to_path_buf())
        );
        assert_eq!(
            src.find_context("kind-dev").unwrap(),
            Some(other.path().to_path_buf())
        );
        assert_eq!(src.find_context("gke_p_us-east1-b_two").unwrap(), None);
    }

    #[test]
    fn missing_empty_and_null_configs_have_no_contexts() {
        let empty = config_file("\n");
        let null = config_file("apiVersion: v1\nkind: Config\ncontexts: null\n");
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config");

        for path in [empty.path(), null.path(), missing.as_path()] {
            let src = SourceKubeconfig::resolve(Some(path.as_os_str()), None, None).unwrap();
            assert_eq!(src.find_context("minikube").unwrap(), None);
        }
    }

    #[test]
    fn relative_file_refs_are_reported() {
        let file = config_file(
            "\
clusters:
- name: local
  cluster:
    server: https://127.0.0.1:6443
    certificate-authority: certs/ca.crt
- name: abs
  cluster:
    certificate-authority: /etc/kubernetes/ca.crt
users:
- name: local
  user:
    client-certificate: certs/client.crt
    client-key: /etc/kubernetes/client.key
- name: token
  user:
    tokenFile: token
- name: gke
  user:
    exec: {command: gke-gcloud-auth-plugin}
",
        );
        let src = SourceKubeconfig::resolve(Some(file.path().as_os_str()), None, None).unwrap();
        assert_eq!(
            src.relative_file_refs().unwrap(),
            [
                PathBuf::from("certs/ca.crt"),
                PathBuf::from("certs/client.crt"),
                PathBuf::from("token"),
            ]
        );

        let gke = config_file(CONFIG);
        let src = SourceKubeconfig::resolve(Some(gke.path().as_os_str()), None, None).unwrap();
        assert!(src.relative_file_refs().unwrap().is_empty());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let bad = config_file("contexts: [unterminated\n");
        let src = SourceKubeconfig::resolve(Some(bad.path().as_os_str()), None, None).unwrap();
        assert!(matches!(
            src.find_context("minikube"),
            Err(Error::Parse { .. })
        ));
    }
}
