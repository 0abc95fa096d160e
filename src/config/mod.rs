//! Gateway configuration (JSON)
//!
//! ```json
//! {
//!   "listen_port": 8765,
//!   "ehub_universe": 0,
//!   "max_fps": 40,
//!   "controllers": {
//!     "controller1": { "ip": "192.168.1.45", "start_entity": 100, "end_entity": 4858, "universes": [0, 1, 2] }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::{DEFAULT_LISTEN_PORT, DEFAULT_MAX_FPS};
use crate::error::{GatewayError, Result};
use crate::types::ControllerTopology;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub ip: String,
    pub start_entity: u32,
    pub end_entity: u32,
    pub universes: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default)]
    pub ehub_universe: u8,
    #[serde(default = "default_max_fps")]
    pub max_fps: u32,
    pub controllers: BTreeMap<String, ControllerConfig>,
}

fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

fn default_max_fps() -> u32 {
    DEFAULT_MAX_FPS
}

impl Default for GatewayConfig {
    /// Single controller driving entities 100..=4858 over universes 0..32.
    fn default() -> Self {
        let mut controllers = BTreeMap::new();
        controllers.insert(
            "controller1".to_string(),
            ControllerConfig {
                ip: "192.168.1.45".into(),
                start_entity: 100,
                end_entity: 4858,
                universes: (0..32).collect(),
            },
        );
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            ehub_universe: 0,
            max_fps: DEFAULT_MAX_FPS,
            controllers,
        }
    }
}

impl GatewayConfig {
    /// Reads `path`; a missing file yields `None` so the caller can fall
    /// back to defaults.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// `read` with the default configuration for a missing file.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::read(path)? {
            Some(cfg) => Ok(cfg),
            None => {
                info!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_fps == 0 {
            return Err(GatewayError::Config("max_fps must be at least 1".into()));
        }
        for (name, ctrl) in &self.controllers {
            if ctrl.start_entity > ctrl.end_entity {
                return Err(GatewayError::Config(format!(
                    "{name}: start_entity {} after end_entity {}",
                    ctrl.start_entity, ctrl.end_entity
                )));
            }
            if ctrl.universes.is_empty() {
                return Err(GatewayError::Config(format!("{name}: no universes configured")));
            }
            if ctrl.ip.parse::<std::net::IpAddr>().is_err() {
                return Err(GatewayError::Config(format!("{name}: invalid ip {:?}", ctrl.ip)));
            }
        }

        let mut ranges: Vec<(&str, u32, u32)> = self
            .controllers
            .iter()
            .map(|(name, c)| (name.as_str(), c.start_entity, c.end_entity))
            .collect();
        ranges.sort_by_key(|&(_, start, _)| start);
        for pair in ranges.windows(2) {
            let (a, _, a_end) = pair[0];
            let (b, b_start, _) = pair[1];
            if a_end >= b_start {
                return Err(GatewayError::Config(format!(
                    "entity ranges of {a} and {b} overlap"
                )));
            }
        }
        Ok(())
    }

    /// Controllers ordered by first entity.
    pub fn topology(&self) -> Vec<ControllerTopology> {
        let mut topo: Vec<ControllerTopology> = self
            .controllers
            .values()
            .map(|c| ControllerTopology {
                ip: c.ip.clone(),
                start_entity: c.start_entity,
                end_entity: c.end_entity,
                universes: c.universes.clone(),
            })
            .collect();
        topo.sort_by_key(|c| c.start_entity);
        topo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl(ip: &str, start: u32, end: u32) -> ControllerConfig {
        ControllerConfig { ip: ip.into(), start_entity: start, end_entity: end, universes: vec![0] }
    }

    #[test]
    fn test_default_is_valid() {
        let cfg = GatewayConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.listen_port, 8765);
        assert_eq!(cfg.topology()[0].universes.len(), 32);
    }

    #[test]
    fn test_overlap_rejected() {
        let mut cfg = GatewayConfig::default();
        cfg.controllers.insert("b".into(), ctrl("192.168.1.46", 4800, 5000));
        assert!(matches!(cfg.validate(), Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_bad_controller_fields() {
        let mut cfg = GatewayConfig::default();
        cfg.controllers.insert("x".into(), ctrl("192.168.1.46", 9000, 8000));
        assert!(cfg.validate().is_err());

        let mut cfg = GatewayConfig::default();
        cfg.controllers.insert("x".into(), ctrl("nope", 9000, 9100));
        assert!(cfg.validate().is_err());

        let mut cfg = GatewayConfig::default();
        cfg.max_fps = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_topology_sorted_by_start() {
        let mut cfg = GatewayConfig::default();
        cfg.controllers.insert("aaa".into(), ctrl("10.0.0.9", 5000, 6000));
        cfg.controllers.insert("zzz".into(), ctrl("10.0.0.1", 0, 99));
        let topo = cfg.topology();
        let starts: Vec<u32> = topo.iter().map(|c| c.start_entity).collect();
        assert_eq!(starts, vec![0, 100, 5000]);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert!(GatewayConfig::read(&path).unwrap().is_none());
        assert_eq!(GatewayConfig::load_or_default(&path).unwrap(), GatewayConfig::default());
    }

    #[test]
    fn test_file_round_trip_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"controllers": {"c": {"ip": "10.0.0.2", "start_entity": 1, "end_entity": 170, "universes": [4]}}}"#,
        )
        .unwrap();
        let cfg = GatewayConfig::read(&path).unwrap().unwrap();
        assert_eq!(cfg.max_fps, 40);
        assert_eq!(cfg.ehub_universe, 0);

        cfg.save(&path).unwrap();
        assert_eq!(GatewayConfig::read(&path).unwrap().unwrap(), cfg);

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(GatewayConfig::read(&path), Err(GatewayError::Json(_))));
    }
}
