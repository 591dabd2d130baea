//! Engine configuration assembly.
//!
//! Turns the stored node list into one sing-box configuration: per enabled node a local
//! inbound `node-{id}-in`, the compiled outbound `node-{id}-out` and a route rule joining them,
//! followed by a `direct` outbound used as the route fallback.
//!
//! ```rust
//! use proxy_node_codec::engine::{assemble, EngineSettings, ProxyNode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let node = ProxyNode {
//!     id: 7,
//!     name: "Home".into(),
//!     protocol: "socks5".into(),
//!     config: r#"{"server":"10.0.0.2","server_port":1080}"#.into(),
//!     inbound_port: 20007,
//!     username: None,
//!     password: None,
//!     enabled: true,
//! };
//! let config = assemble(&[node], &EngineSettings::default())?;
//! assert_eq!(config.outbounds[0].tag, "node-7-out");
//! assert_eq!(config.route.rules[0].inbound, vec!["node-7-in".to_string()]);
//! # Ok(())
//! # }
//! ```

use crate::error::{CodecError, Result};
use crate::link::present;
use crate::outbound::Outbound;
use crate::NodeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, trace};

/// File name the engine reads its configuration from.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// A stored proxy node, as handed over by the storage layer.
///
/// Only the fields the engine configuration needs are modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyNode {
    /// Storage identifier
    pub id: i64,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Stored protocol type name (`ss`, `vless`, `hy2`, ...)
    #[serde(rename = "type")]
    pub protocol: String,
    /// Stored config text for `protocol`
    pub config: String,
    /// Local listen port of the node's inbound
    pub inbound_port: u16,
    /// Inbound auth user
    #[serde(default)]
    pub username: Option<String>,
    /// Inbound auth password
    #[serde(default)]
    pub password: Option<String>,
    /// Disabled nodes are left out of the engine configuration
    #[serde(default)]
    pub enabled: bool,
}

impl ProxyNode {
    /// Engine tag of the node's inbound
    pub fn inbound_tag(&self) -> String {
        format!("node-{}-in", self.id)
    }

    /// Engine tag of the node's outbound
    pub fn outbound_tag(&self) -> String {
        format!("node-{}-out", self.id)
    }

    /// Compiles the node's stored config into its outbound.
    pub fn compile(&self) -> Result<Outbound> {
        let config = NodeConfig::from_stored(&self.protocol, &self.config)?;
        config.to_outbound(&self.outbound_tag())
    }
}

/// Knobs for the generated engine configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Engine log level
    pub log_level: String,
    /// Prefix engine log lines with timestamps
    pub log_timestamp: bool,
    /// Listen address of the per-node inbounds
    pub listen: String,
    /// Inbound type; `mixed` serves HTTP and SOCKS on one port
    pub inbound_type: String,
    /// Sniff and override the destination on inbounds
    pub sniff: bool,
    /// Tag of the fallback outbound
    pub final_tag: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            log_level: "info".to_string(),
            log_timestamp: true,
            listen: "::".to_string(),
            inbound_type: "mixed".to_string(),
            sniff: true,
            final_tag: "direct".to_string(),
        }
    }
}

/// Complete engine configuration file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineConfig {
    /// Engine log settings
    pub log: LogConfig,
    /// One local inbound per enabled node
    pub inbounds: Vec<Inbound>,
    /// Node outbounds, then the fallback `direct`
    pub outbounds: Vec<Outbound>,
    /// Inbound to outbound routing
    pub route: Route,
}

/// `log` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogConfig {
    /// `trace` .. `panic`
    pub level: String,
    /// Prefix lines with timestamps
    pub timestamp: bool,
}

/// A local listener feeding one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inbound {
    /// Inbound type, normally `mixed`
    #[serde(rename = "type")]
    pub kind: String,
    /// `node-{id}-in`
    pub tag: String,
    /// Listen address
    pub listen: String,
    /// Listen port
    pub listen_port: u16,
    /// Accepted credentials; empty means no auth
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<InboundUser>,
    /// Sniff the destination protocol
    #[serde(skip_serializing_if = "crate::link::is_false")]
    pub sniff: bool,
    /// Replace the destination with the sniffed domain
    #[serde(skip_serializing_if = "crate::link::is_false")]
    pub sniff_override_destination: bool,
}

/// Inbound auth credentials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundUser {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

/// `route` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    /// One rule per node
    pub rules: Vec<RouteRule>,
    /// Outbound for unmatched traffic
    #[serde(rename = "final")]
    pub final_tag: String,
}

/// Sends everything arriving on `inbound` to `outbound`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRule {
    /// Matched inbound tags
    pub inbound: Vec<String>,
    /// Target outbound tag
    pub outbound: String,
}

/// Builds the engine configuration for `nodes`.
///
/// Disabled nodes are skipped. The first node that fails to compile aborts assembly with
/// [`CodecError::Node`] carrying its id.
pub fn assemble(nodes: &[ProxyNode], settings: &EngineSettings) -> Result<EngineConfig> {
    let mut inbounds = Vec::new();
    let mut outbounds = Vec::new();
    let mut rules = Vec::new();

    for node in nodes.iter().filter(|n| n.enabled) {
        trace!(id = node.id, protocol = %node.protocol, "compiling node");
        let outbound = node.compile().map_err(|e| CodecError::Node {
            id: node.id,
            source: Box::new(e),
        })?;

        let users = match (present(&node.username), present(&node.password)) {
            (Some(username), Some(password)) => vec![InboundUser {
                username: username.to_string(),
                password: password.to_string(),
            }],
            _ => Vec::new(),
        };
        inbounds.push(Inbound {
            kind: settings.inbound_type.clone(),
            tag: node.inbound_tag(),
            listen: settings.listen.clone(),
            listen_port: node.inbound_port,
            users,
            sniff: settings.sniff,
            sniff_override_destination: settings.sniff,
        });
        rules.push(RouteRule {
            inbound: vec![node.inbound_tag()],
            outbound: outbound.tag.clone(),
        });
        outbounds.push(outbound);
    }
    outbounds.push(Outbound::direct(&settings.final_tag));

    Ok(EngineConfig {
        log: LogConfig {
            level: settings.log_level.clone(),
            timestamp: settings.log_timestamp,
        },
        inbounds,
        outbounds,
        route: Route {
            rules,
            final_tag: settings.final_tag.clone(),
        },
    })
}

impl EngineConfig {
    /// Pretty JSON as the engine reads it
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CodecError::Io(e.into()))
    }

    /// Writes `config.json` into `dir` and returns its path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, self.to_json()?)?;
        info!(
            path = %path.display(),
            outbounds = self.outbounds.len(),
            "engine configuration written"
        );
        Ok(path)
    }
}
