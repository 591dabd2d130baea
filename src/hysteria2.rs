//! Hysteria2 codec
//!
//! Link format: `hysteria2://auth@hostname:port[/]?[key=value]&...[#name]`, short scheme `hy2://`.
//!
//! **auth**: the password, percent-encoded when it contains reserved characters.
//!
//! **Query** (official): `obfs` (e.g. salamander), `obfs-password`, `sni`, `insecure` (1/0).
//!
//! **Query** (extensions): `up`/`up_mbps`/`upmbps`, `down`/`down_mbps`/`downmbps`,
//! `brutal_up_mbps`, `brutal_down_mbps`, `salamander` (salamander password), `alpn`, `fp`,
//! `network` (tcp/udp), `hopInterval`/`hop_interval`. `sni` alias `peer` and `insecure` alias
//! `allowInsecure` are accepted.
//!
//! ## Parsing rules
//!
//! 1. Prefixes `hysteria2://` and `hy2://` are case-sensitive; encoding always uses `hysteria2://`.
//! 2. Bandwidth values that are not plain integers are dropped with a warning.
//!
//! TLS is always on: Hysteria2 runs over QUIC.

use crate::constants::{default_name, key, scheme};
use crate::error::Result;
use crate::link::{self, QueryBuilder, deserialize_alpn, deserialize_opt_u32, is_false, present};
use crate::options::{TlsInput, tls_block};
use crate::outbound::{
    Hysteria2Outbound, ObfsOptions, Outbound, OutboundSettings, SalamanderOptions,
};
use crate::{ProtocolCodec, ProtocolTag};
use serde::{Deserialize, Serialize};

/// Hysteria2 configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hysteria2Config {
    /// Server address
    pub server: String,
    /// Server port
    pub server_port: u16,
    /// Auth password
    pub password: String,
    /// Legacy upload bandwidth (Mbps)
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub up_mbps: Option<u32>,
    /// Legacy download bandwidth (Mbps)
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub down_mbps: Option<u32>,
    /// Obfuscation type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,
    /// Obfuscation password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs_password: Option<String>,
    /// TLS server name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    /// TLS ALPN protocols
    #[serde(
        default,
        deserialize_with = "deserialize_alpn",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub alpn: Vec<String>,
    /// uTLS fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Skip certificate verification
    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure_skip_verify: bool,
    /// Salamander obfuscation password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salamander_password: Option<String>,
    /// Brutal download bandwidth (Mbps); wins over `down_mbps`
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub brutal_down_mbps: Option<u32>,
    /// Brutal upload bandwidth (Mbps); wins over `up_mbps`
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub brutal_up_mbps: Option<u32>,
    /// `tcp` or `udp`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Port hopping interval (e.g. `30s`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hop_interval: Option<String>,
}

impl Hysteria2Config {
    /// Upload/download bandwidth sent to the engine.
    ///
    /// Brutal values replace the legacy pair as a whole as soon as either is set.
    fn bandwidth(&self) -> (Option<u32>, Option<u32>) {
        let positive = |n: Option<u32>| n.filter(|n| *n > 0);
        let brutal = (positive(self.brutal_up_mbps), positive(self.brutal_down_mbps));
        if brutal.0.is_some() || brutal.1.is_some() {
            brutal
        } else {
            (positive(self.up_mbps), positive(self.down_mbps))
        }
    }
}

impl ProtocolCodec for Hysteria2Config {
    const TAG: ProtocolTag = ProtocolTag::Hysteria2;

    fn parse(link: &str) -> Result<(Self, String)> {
        let body = link::strip_scheme(link, &[scheme::HYSTERIA2, scheme::HY2])?;
        let parts = link::split_link(body);
        let (password, host_port) = link::split_userinfo(parts.main)?;
        let (server, server_port) = link::parse_host_port(host_port)?;
        let q = &parts.query;
        let mbps = |keys: &[&str]| q.number_any::<u32>(keys).filter(|n| *n > 0);

        let config = Hysteria2Config {
            server,
            server_port,
            password: link::credential(password, parts.main)?,
            up_mbps: mbps(key::UP),
            down_mbps: mbps(key::DOWN),
            obfs: q.string("obfs"),
            obfs_password: q.string("obfs-password"),
            sni: q.string_any(key::SNI),
            alpn: q.alpn(),
            fingerprint: q.string("fp"),
            insecure_skip_verify: q.flag_any(key::INSECURE),
            salamander_password: q.string("salamander"),
            brutal_down_mbps: mbps(&["brutal_down_mbps"]),
            brutal_up_mbps: mbps(&["brutal_up_mbps"]),
            network: q.string("network"),
            hop_interval: q.string_any(key::HOP_INTERVAL),
        };
        Ok((config, parts.name_or(default_name::HYSTERIA2)))
    }

    fn to_link(&self, name: &str) -> Result<String> {
        let mut q = QueryBuilder::new();
        q.push_num("up", self.up_mbps.filter(|n| *n > 0));
        q.push_num("down", self.down_mbps.filter(|n| *n > 0));
        q.push_num("brutal_up_mbps", self.brutal_up_mbps.filter(|n| *n > 0));
        q.push_num("brutal_down_mbps", self.brutal_down_mbps.filter(|n| *n > 0));
        q.push_opt("obfs", &self.obfs);
        q.push_opt("obfs-password", &self.obfs_password);
        q.push_opt("salamander", &self.salamander_password);
        q.push_opt("sni", &self.sni);
        q.push_list("alpn", &self.alpn);
        q.push_opt("fp", &self.fingerprint);
        q.push_flag("insecure", self.insecure_skip_verify);
        q.push_opt("network", &self.network);
        q.push_opt("hopInterval", &self.hop_interval);

        Ok(format!(
            "{}{}@{}{}{}",
            scheme::HYSTERIA2,
            urlencoding::encode(&self.password),
            link::join_host_port(&self.server, self.server_port),
            q.finish(),
            link::encode_name(name)
        ))
    }

    fn to_outbound(&self, tag: &str) -> Result<Outbound> {
        let (up_mbps, down_mbps) = self.bandwidth();
        let settings = Hysteria2Outbound {
            password: self.password.clone(),
            up_mbps,
            down_mbps,
            obfs: present(&self.obfs).map(|kind| ObfsOptions {
                kind: kind.to_string(),
                password: present(&self.obfs_password).map(str::to_string),
            }),
            salamander: present(&self.salamander_password).map(|password| SalamanderOptions {
                password: password.to_string(),
            }),
            network: present(&self.network).map(str::to_string),
            hop_interval: present(&self.hop_interval).map(str::to_string),
            tls: tls_block(TlsInput {
                sni: present(&self.sni),
                alpn: &self.alpn,
                fingerprint: present(&self.fingerprint),
                insecure: self.insecure_skip_verify,
            }),
        };
        Ok(Outbound::remote(
            tag,
            &self.server,
            self.server_port,
            OutboundSettings::Hysteria2(settings),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn short_scheme_and_aliases() {
        let (cfg, name) = Hysteria2Config::parse(
            "hy2://s3cret@h.com:8443/?peer=sni.com&upmbps=50&down_mbps=200&hop_interval=30s&allowInsecure=1#HK%2001",
        )
        .unwrap();
        assert_eq!(cfg.password, "s3cret");
        assert_eq!(cfg.sni.as_deref(), Some("sni.com"));
        assert_eq!((cfg.up_mbps, cfg.down_mbps), (Some(50), Some(200)));
        assert_eq!(cfg.hop_interval.as_deref(), Some("30s"));
        assert!(cfg.insecure_skip_verify);
        assert_eq!(name, "HK 01");

        assert_eq!(
            cfg.to_link(&name).unwrap(),
            "hysteria2://s3cret@h.com:8443?up=50&down=200&sni=sni.com&insecure=1&hopInterval=30s#HK%2001"
        );
    }

    #[test]
    fn non_numeric_bandwidth_is_dropped() {
        let (cfg, _) = Hysteria2Config::parse("hysteria2://p@h:443?up=fast&down=0").unwrap();
        assert_eq!((cfg.up_mbps, cfg.down_mbps), (None, None));
    }

    #[test]
    fn brutal_bandwidth_wins_and_obfs_blocks_are_independent() {
        let (cfg, _) = Hysteria2Config::parse(
            "hysteria2://p@h:443?up=10&down=20&brutal_up_mbps=100&obfs=salamander&obfs-password=o&salamander=s",
        )
        .unwrap();
        let value = serde_json::to_value(cfg.to_outbound("hy2-out").unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "hysteria2",
                "tag": "hy2-out",
                "server": "h",
                "server_port": 443,
                "password": "p",
                "up_mbps": 100,
                "obfs": {"type": "salamander", "password": "o"},
                "salamander": {"password": "s"},
                "tls": {"enabled": true}
            })
        );
    }
}
