//! Deployment configuration
//!
//! Every value has a default matching the stock dnsR deployment. A TOML file
//! may override any of them; the deployment directory normally comes from
//! the command line (or the current directory) and is made absolute before
//! anything else uses it.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

pub const DEFAULT_SERVICE_NAME: &str = "dnsR";
pub const DEFAULT_DAEMON_BINARY: &str = "target/release/dns_r";
pub const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:1053";
pub const DEFAULT_DOMAIN_SUFFIX: &str = "superfruitmix.dev.";
pub const DEFAULT_RESOLVER: &str = "systemd-resolved";
pub const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";
pub const DEFAULT_DROPIN_DIR: &str = "/etc/systemd/resolved.conf.d";

/// Zone file the daemon loads from its working directory
pub const ZONE_FILE: &str = "network.json";

static UNIT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9:_.\\@-]+$").expect("valid unit name regex"));

static DOMAIN_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)*[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.?$")
        .expect("valid domain regex")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid service name '{0}'")]
    InvalidServiceName(String),

    #[error("invalid domain suffix '{0}'")]
    InvalidDomainSuffix(String),

    #[error("{field} must be an absolute path: {path}")]
    RelativePath { field: &'static str, path: PathBuf },
}

/// Everything the fixed plan is parameterised by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Deployment {
    /// Name of the systemd unit for the daemon
    pub service_name: String,
    /// Directory the daemon runs in; empty means "not set yet"
    pub deploy_dir: PathBuf,
    /// Daemon executable, relative to `deploy_dir` unless absolute
    pub daemon_binary: PathBuf,
    /// Address the daemon listens on; written as `DNS=`
    pub listen_address: SocketAddr,
    /// Domain routed to the daemon; written as `Domains=~`
    pub domain_suffix: String,
    /// Package providing the resolver
    pub resolver_package: String,
    /// Resolver service to enable and restart
    pub resolver_service: String,
    pub unit_dir: PathBuf,
    pub dropin_dir: PathBuf,
}

impl Default for Deployment {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            deploy_dir: PathBuf::new(),
            daemon_binary: PathBuf::from(DEFAULT_DAEMON_BINARY),
            listen_address: SocketAddr::from(([127, 0, 0, 1], 1053)),
            domain_suffix: DEFAULT_DOMAIN_SUFFIX.to_string(),
            resolver_package: DEFAULT_RESOLVER.to_string(),
            resolver_service: DEFAULT_RESOLVER.to_string(),
            unit_dir: PathBuf::from(DEFAULT_UNIT_DIR),
            dropin_dir: PathBuf::from(DEFAULT_DROPIN_DIR),
        }
    }
}

impl Deployment {
    /// Load a deployment from a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Fill in the deployment directory and make it absolute
    ///
    /// `override_dir` (from the command line) wins over the config file,
    /// which wins over `cwd`. `~` is expanded.
    pub fn resolve(mut self, override_dir: Option<&Path>, cwd: &Path) -> Result<Self> {
        let dir = match override_dir {
            Some(dir) => dir.to_path_buf(),
            None if self.deploy_dir.as_os_str().is_empty() => cwd.to_path_buf(),
            None => self.deploy_dir.clone(),
        };

        let expanded = shellexpand::tilde(&dir.to_string_lossy()).to_string();
        let expanded = PathBuf::from(expanded);
        self.deploy_dir = if expanded.is_absolute() {
            expanded
        } else {
            cwd.join(expanded)
        };

        log::debug!("Deployment directory: {}", self.deploy_dir.display());
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !UNIT_NAME.is_match(&self.service_name) {
            return Err(ConfigError::InvalidServiceName(self.service_name.clone()));
        }
        if !UNIT_NAME.is_match(&self.resolver_service) {
            return Err(ConfigError::InvalidServiceName(
                self.resolver_service.clone(),
            ));
        }
        if !DOMAIN_SUFFIX.is_match(&self.domain_suffix) {
            return Err(ConfigError::InvalidDomainSuffix(self.domain_suffix.clone()));
        }
        for (field, path) in [
            ("deploy_dir", &self.deploy_dir),
            ("unit_dir", &self.unit_dir),
            ("dropin_dir", &self.dropin_dir),
        ] {
            if !path.is_absolute() {
                return Err(ConfigError::RelativePath {
                    field,
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }

    /// Absolute path of the daemon executable
    pub fn daemon_path(&self) -> PathBuf {
        self.deploy_dir.join(&self.daemon_binary)
    }

    /// Path of the daemon's unit file
    pub fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(format!("{}.service", self.service_name))
    }

    /// Path of the resolver drop-in owned by this deployment
    pub fn dropin_path(&self) -> PathBuf {
        self.dropin_dir.join(format!("{}.conf", self.service_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let d = Deployment::default();
        assert_eq!(d.service_name, "dnsR");
        assert_eq!(d.listen_address.to_string(), DEFAULT_LISTEN_ADDRESS);
        assert_eq!(d.domain_suffix, "superfruitmix.dev.");
        assert_eq!(d.unit_path(), Path::new("/etc/systemd/system/dnsR.service"));
        assert_eq!(
            d.dropin_path(),
            Path::new("/etc/systemd/resolved.conf.d/dnsR.conf")
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let d = Deployment::from_toml(
            r#"
            listen_address = "127.0.0.53:5353"
            domain_suffix = "example.test"
            "#,
        )
        .unwrap();
        assert_eq!(d.listen_address.port(), 5353);
        assert_eq!(d.domain_suffix, "example.test");
        assert_eq!(d.service_name, "dnsR");
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Deployment::from_toml("listen = \"x\"").is_err());
    }

    #[test]
    fn test_bad_listen_address_rejected() {
        assert!(Deployment::from_toml("listen_address = \"localhost\"").is_err());
    }

    #[test]
    fn test_resolve_prefers_override_then_file_then_cwd() {
        let cwd = Path::new("/srv/app");

        let d = Deployment::default().resolve(None, cwd).unwrap();
        assert_eq!(d.deploy_dir, Path::new("/srv/app"));

        let d = Deployment {
            deploy_dir: PathBuf::from("/opt/dnsr"),
            ..Deployment::default()
        };
        assert_eq!(
            d.clone().resolve(None, cwd).unwrap().deploy_dir,
            Path::new("/opt/dnsr")
        );
        assert_eq!(
            d.resolve(Some(Path::new("build")), cwd).unwrap().deploy_dir,
            Path::new("/srv/app/build")
        );
    }

    #[test]
    fn test_daemon_path_is_absolute_after_resolve() {
        let d = Deployment::default()
            .resolve(None, Path::new("/home/me/dns_r"))
            .unwrap();
        assert_eq!(
            d.daemon_path(),
            Path::new("/home/me/dns_r/target/release/dns_r")
        );
    }

    #[test]
    fn test_validate() {
        let d = Deployment::default().resolve(None, Path::new("/srv")).unwrap();
        assert!(d.validate().is_ok());

        let bad = Deployment {
            service_name: "dns r".to_string(),
            ..d.clone()
        };
        assert_eq!(
            bad.validate(),
            Err(ConfigError::InvalidServiceName("dns r".to_string()))
        );

        let bad = Deployment {
            domain_suffix: "-bad..dev".to_string(),
            ..d.clone()
        };
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidDomainSuffix(_))
        ));

        let bad = Deployment {
            dropin_dir: PathBuf::from("resolved.conf.d"),
            ..d
        };
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::RelativePath { field: "dropin_dir", .. })
        ));
    }

    #[test]
    fn test_unvalidated_default_has_no_deploy_dir() {
        assert!(matches!(
            Deployment::default().validate(),
            Err(ConfigError::RelativePath { field: "deploy_dir", .. })
        ));
    }
}
