//! Instance list sources.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::validation::validate_instance_url;
use crate::discovery::SourceError;
use crate::load_balancer::{instance::dedup_instances, parse_instance_list, Instance};

/// Produces a fresh instance list on demand.
#[async_trait]
pub trait InstanceSource: Send + Sync {
    /// Load the current list. An empty list is an error, never a valid answer.
    async fn load(&self) -> Result<Vec<Instance>, SourceError>;

    /// Human readable origin, for logs.
    fn describe(&self) -> String;
}

/// A fixed list, typically from `instances.list` in the config file.
#[derive(Debug, Clone)]
pub struct StaticSource {
    instances: Vec<Instance>,
}

impl StaticSource {
    pub fn new(addresses: &[String]) -> Self {
        Self {
            instances: dedup_instances(addresses.iter().map(Instance::new)),
        }
    }
}

#[async_trait]
impl InstanceSource for StaticSource {
    async fn load(&self) -> Result<Vec<Instance>, SourceError> {
        if self.instances.is_empty() {
            return Err(SourceError::Empty(self.describe()));
        }
        Ok(self.instances.clone())
    }

    fn describe(&self) -> String {
        "static configuration".to_string()
    }
}

/// A file holding comma- or newline-separated instance URLs.
///
/// Entries that are not absolute http URLs are dropped with a warning.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InstanceSource for FileSource {
    async fn load(&self) -> Result<Vec<Instance>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;

        let instances: Vec<Instance> = parse_instance_list(&content)
            .into_iter()
            .filter(|instance| match validate_instance_url(instance.address()) {
                Ok(()) => true,
                Err(reason) => {
                    tracing::warn!(path = ?self.path, instance = %instance, %reason, "Ignoring invalid instance URL");
                    false
                }
            })
            .collect();

        if instances.is_empty() {
            return Err(SourceError::Empty(self.describe()));
        }
        Ok(instances)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn addrs(instances: &[Instance]) -> Vec<&str> {
        instances.iter().map(Instance::address).collect()
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticSource::new(&["http://a:1".into(), "http://b:2".into(), "http://a:1".into()]);
        let loaded = source.load().await.unwrap();
        assert_eq!(addrs(&loaded), vec!["http://a:1", "http://b:2"]);
    }

    #[tokio::test]
    async fn test_static_source_empty() {
        let source = StaticSource::new(&[]);
        assert!(matches!(source.load().await, Err(SourceError::Empty(_))));
    }

    #[tokio::test]
    async fn test_file_source_reads_comma_separated() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http://localhost:8081,http://localhost:8082").unwrap();

        let loaded = FileSource::new(file.path()).load().await.unwrap();
        assert_eq!(addrs(&loaded), vec!["http://localhost:8081", "http://localhost:8082"]);
    }

    #[tokio::test]
    async fn test_file_source_drops_invalid_entries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http://localhost:8081\nlocalhost:9999\nhttp://localhost:8083").unwrap();

        let loaded = FileSource::new(file.path()).load().await.unwrap();
        assert_eq!(addrs(&loaded), vec!["http://localhost:8081", "http://localhost:8083"]);
    }

    #[tokio::test]
    async fn test_file_source_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let res = FileSource::new(file.path()).load().await;
        assert!(matches!(res, Err(SourceError::Empty(_))));
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let res = FileSource::new("/definitely/not/instances.txt").load().await;
        assert!(matches!(res, Err(SourceError::Io { .. })));
    }
}
