#![allow(dead_code)]

use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use isokube::{ClusterRef, Request, SourceKubeconfig, Strategy, Tools};
use tempfile::TempDir;

pub const SHARED: &str = "\
apiVersion: v1
kind: Config
current-context: minikube
contexts:
- name: minikube
  context: {cluster: minikube, user: minikube}
- name: gke_acme_us-east1-b_prod
  context: {cluster: gke_acme_us-east1-b_prod, user: gke_acme_us-east1-b_prod}
";

/// A scratch directory with fake kubectl and gcloud that append one line
/// per invocation to `calls.log` before running their body.
pub struct Fixture {
    pub dir: TempDir,
    pub shared: PathBuf,
}

impl Fixture {
    /// kubectl answers `config` subcommands and exits `kubectl_exit` for
    /// anything else. gcloud writes a minimal kube config.
    pub fn new(kubectl_exit: i32) -> Self {
        let kubectl = format!(
            "case \"$1 $2\" in \"config view\") echo 'merged: true' ;; esac\n\
             case \"$1\" in config) exit 0 ;; esac\n\
             exit {kubectl_exit}\n"
        );
        Self::with_scripts(&kubectl, "echo 'apiVersion: v1' > \"$KUBECONFIG\"\n")
    }

    pub fn with_scripts(kubectl: &str, gcloud: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");

        for (name, body) in [("kubectl", kubectl), ("gcloud", gcloud)] {
            let script = format!(
                "#!/bin/sh\n\
                 echo \"{name} KUBECONFIG=$KUBECONFIG $*\" >> '{log}'\n\
                 {body}",
                log = log.display(),
            );
            write_script(&dir.path().join(name), &script);
        }

        let shared = dir.path().join("shared-config");
        fs::write(&shared, SHARED).unwrap();

        Self { dir, shared }
    }

    pub fn request(&self, location: &str, strategy: Strategy) -> Request {
        Request {
            cluster: ClusterRef::new("acme", "prod", location).unwrap(),
            command: vec![OsString::from("get"), OsString::from("pods")],
            sources: SourceKubeconfig::resolve(Some(self.shared.as_os_str()), None, None)
                .unwrap(),
            tools: Tools {
                kubectl: self.dir.path().join("kubectl").into(),
                gcloud: self.dir.path().join("gcloud").into(),
            },
            strategy,
            keep: false,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Pulls the KUBECONFIG value out of a logged call.
pub fn kubeconfig_of(call: &str) -> PathBuf {
    let value = call
        .split_whitespace()
        .find_map(|word| word.strip_prefix("KUBECONFIG="))
        .unwrap();
    PathBuf::from(value)
}
