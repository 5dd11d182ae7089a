use std::path::PathBuf;
use std::time::Duration;

use k8s_openapi::api::core::v1::ConfigMap;

use crate::crd::ImageSpec;
use crate::{Error, Result};

pub const DEFAULT_IMAGE_REGISTRY: &str = "quay.io/opencloudio";
pub const DEFAULT_IMAGE_TAG: &str = "latest";
pub const HEALTH_SERVICE_IMAGE_NAME: &str = "system-healthcheck-service";
pub const MEMCACHED_IMAGE_NAME: &str = "icp-memcached";
pub const MUST_GATHER_SERVICE_IMAGE_NAME: &str = "must-gather-service";
pub const MUST_GATHER_IMAGE_NAME: &str = "must-gather";

pub const HEALTH_SERVICE_IMAGE_ENV: &str = "OPERAND_HEALTHCHECK_IMAGE";
pub const MEMCACHED_IMAGE_ENV: &str = "OPERAND_MEMCACHED_IMAGE";
pub const MUST_GATHER_SERVICE_IMAGE_ENV: &str = "OPERAND_MUSTGATHER_SERVICE_IMAGE";
pub const MUST_GATHER_IMAGE_ENV: &str = "MUST_GATHER_IMAGE";

pub const HEALTH_CONFIG_TEMPLATE: &str = "system-healthcheck-service-config.yaml";

/// Operator-wide settings shared by every controller
#[derive(Clone, Debug)]
pub struct Settings {
    /// Directory holding the YAML templates
    pub manifest_dir: PathBuf,
    /// Deadline applied to each Kubernetes API call
    pub api_timeout: Duration,
    /// Delay before a failed reconcile is retried
    pub error_requeue: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            manifest_dir: PathBuf::from("/manifests"),
            api_timeout: Duration::from_secs(30),
            error_requeue: Duration::from_secs(60),
        }
    }
}

/// Operand images as configured in the operator's environment.
/// Read once per reconcile pass so an image bump takes effect on the next trigger.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperandImages {
    pub health_service: Option<String>,
    pub memcached: Option<String>,
    pub must_gather_service: Option<String>,
    pub must_gather: Option<String>,
}

impl OperandImages {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            health_service: var(HEALTH_SERVICE_IMAGE_ENV),
            memcached: var(MEMCACHED_IMAGE_ENV),
            must_gather_service: var(MUST_GATHER_SERVICE_IMAGE_ENV),
            must_gather: var(MUST_GATHER_IMAGE_ENV),
        }
    }
}

/// Pick the image for an operand.
///
/// A fully specified override on the custom resource wins (a `sha256:` tag
/// becomes a digest reference), then the environment value, then the
/// default registry image.
pub fn operand_image(spec: &ImageSpec, image_name: &str, from_env: Option<&str>) -> String {
    if !spec.repository.is_empty() && !spec.tag.is_empty() {
        return if spec.tag.starts_with("sha256:") {
            format!("{}@{}", spec.repository, spec.tag)
        } else {
            format!("{}:{}", spec.repository, spec.tag)
        };
    }
    match from_env {
        Some(image) => image.to_string(),
        None => format!("{DEFAULT_IMAGE_REGISTRY}/{image_name}:{DEFAULT_IMAGE_TAG}"),
    }
}

/// Source of the fixed YAML bodies the builders start from
pub trait TemplateSource: Send + Sync {
    /// Baseline config map for the health service
    fn health_config_map(&self) -> Result<ConfigMap>;
}

/// Templates read from disk on every call
#[derive(Clone, Debug)]
pub struct FileTemplates {
    pub dir: PathBuf,
}

impl FileTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TemplateSource for FileTemplates {
    fn health_config_map(&self) -> Result<ConfigMap> {
        let path = self.dir.join(HEALTH_CONFIG_TEMPLATE);
        let raw = std::fs::read_to_string(&path).map_err(Error::IoError)?;
        serde_yaml::from_str(&raw).map_err(Error::TemplateError)
    }
}

/// Templates held in memory, for tests and embedding
#[derive(Clone, Debug, Default)]
pub struct StaticTemplates {
    pub health_config_map: ConfigMap,
}

impl TemplateSource for StaticTemplates {
    fn health_config_map(&self) -> Result<ConfigMap> {
        Ok(self.health_config_map.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_with_tag_and_digest() {
        let tagged = ImageSpec {
            repository: "registry.local/hc".into(),
            tag: "3.5.0".into(),
            pull_policy: None,
        };
        assert_eq!(
            operand_image(&tagged, HEALTH_SERVICE_IMAGE_NAME, Some("env/img:1")),
            "registry.local/hc:3.5.0"
        );
        let digest = ImageSpec {
            tag: "sha256:abc".into(),
            ..tagged
        };
        assert_eq!(
            operand_image(&digest, HEALTH_SERVICE_IMAGE_NAME, None),
            "registry.local/hc@sha256:abc"
        );
    }

    #[test]
    fn env_then_default_registry() {
        let partial = ImageSpec {
            repository: "only-repo".into(),
            ..ImageSpec::default()
        };
        assert_eq!(
            operand_image(&partial, MEMCACHED_IMAGE_NAME, Some("env/memcached:1.6")),
            "env/memcached:1.6"
        );
        assert_eq!(
            operand_image(&partial, MEMCACHED_IMAGE_NAME, None),
            "quay.io/opencloudio/icp-memcached:latest"
        );
    }

    #[test]
    fn file_templates_parse_config_map() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(HEALTH_CONFIG_TEMPLATE),
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: template\ndata:\n  cpnames.yaml: |\n    a: b\n",
        )
        .unwrap();
        let cm = FileTemplates::new(dir.path()).health_config_map().unwrap();
        assert_eq!(cm.metadata.name.as_deref(), Some("template"));
        assert!(cm.data.unwrap().contains_key("cpnames.yaml"));
    }

    #[test]
    fn file_templates_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileTemplates::new(dir.path()).health_config_map().unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }
}
