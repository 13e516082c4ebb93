use std::fmt;

use crate::{Error, Result};

/// Where a GKE cluster lives. Zonal clusters are addressed with `--zone`,
/// regional ones with `--region`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Zone(String),
    Region(String),
}

impl Location {
    /// A zone is a region followed by a one-letter segment, `us-central1-a`.
    pub fn parse(location: &str) -> Self {
        let mut segments = location.rsplitn(2, '-');
        let last = segments.next().unwrap_or_default();
        let rest = segments.next().unwrap_or_default();

        let is_zone = rest.contains('-')
            && last.len() == 1
            && last.chars().all(|c| c.is_ascii_lowercase());

        if is_zone {
            Location::Zone(location.to_string())
        } else {
            Location::Region(location.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Location::Zone(l) | Location::Region(l) => l,
        }
    }

    fn flag(&self) -> &'static str {
        match self {
            Location::Zone(_) => "--zone",
            Location::Region(_) => "--region",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRef {
    pub project: String,
    pub location: Location,
    pub name: String,
}

fn check_part(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{what} must not be empty")));
    }
    if value.contains('_') || value.chars().any(char::is_whitespace) {
        return Err(Error::InvalidArgument(format!(
            "{what} {value:?} must not contain underscores or whitespace"
        )));
    }
    Ok(())
}

impl ClusterRef {
    pub fn new(project: &str, cluster: &str, location: &str) -> Result<Self> {
        check_part("project", project)?;
        check_part("cluster", cluster)?;
        check_part("zone", location)?;

        Ok(Self {
            project: project.to_string(),
            location: Location::parse(location),
            name: cluster.to_string(),
        })
    }

    /// The context name `gcloud container clusters get-credentials` writes.
    pub fn context_name(&self) -> String {
        format!("gke_{}_{}_{}", self.project, self.location, self.name)
    }

    pub fn get_credentials_args(&self) -> Vec<String> {
        vec![
            "container".to_string(),
            "clusters".to_string(),
            "get-credentials".to_string(),
            self.name.clone(),
            "--project".to_string(),
            self.project.clone(),
            self.location.flag().to_string(),
            self.location.to_string(),
        ]
    }
}

impl fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.location, self.name)
    }
}
