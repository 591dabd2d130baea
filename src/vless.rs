//! VLESS codec
//!
//! Link format: `vless://uuid@hostname:port?type=...&security=...#name`
//!
//! **userinfo**: the user UUID. **hostname**: domain, IPv4 or bracketed IPv6. **port**: 1–65535.
//!
//! ## Query parameters
//!
//! | Key | Field |
//! |-----|-------|
//! | `type` | transport network (tcp, ws, grpc, http, httpupgrade, quic, kcp) |
//! | `security` | `none`, `tls` or `reality` |
//! | `sni`, `alpn`, `fp` | TLS server name, ALPN list, uTLS fingerprint |
//! | `pbk`, `sid`, `spx` | Reality public key, short id, spider-x |
//! | `insecure` / `allowInsecure` | skip certificate verification |
//! | `path`, `host` | ws/http/httpupgrade path and host |
//! | `serviceName` / `service_name` / `grpc-service-name` | gRPC service name |
//! | `headerType`, `seed` | quic/kcp header type and obfuscation seed |
//! | `maxEarlyData`, `earlyDataHeaderName` | ws early data |
//! | `flow`, `encryption`, `packetEncoding` | protocol options |
//!
//! ## Serialization
//!
//! Transport keys are emitted only for the network that uses them. Skip-verify is emitted as
//! `allowInsecure=1`, the key most VLESS clients read.

use crate::constants::{default_name, key, scheme};
use crate::error::Result;
use crate::link::{self, QueryBuilder, deserialize_alpn, deserialize_opt_u32, is_false, present};
use crate::options::{
    TlsInput, TransportInput, multiplex_block, reality_block, tls_block, transport_block,
};
use crate::outbound::{Headers, Multiplex, Outbound, OutboundSettings, VLessOutbound};
use crate::{ProtocolCodec, ProtocolTag};
use serde::{Deserialize, Serialize};

/// VLESS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VLessConfig {
    /// Server address
    pub server: String,
    /// Server port
    pub server_port: u16,
    /// User UUID
    pub uuid: String,
    /// Flow control (e.g. `xtls-rprx-vision`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    /// Encryption, usually `none`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<String>,
    /// Transport network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// `none`, `tls` or `reality`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
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
    /// Reality public key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Reality short id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    /// Reality spider-x
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spider_x: Option<String>,
    /// Skip certificate verification
    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure: bool,
    /// Transport path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Explicit transport headers; replaces the `Host` fallback when non-empty
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub headers: Headers,
    /// Transport host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// WebSocket early data length
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_early_data: Option<u32>,
    /// WebSocket early data header name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_data_header: Option<String>,
    /// gRPC service name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// quic/kcp header disguise type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_type: Option<String>,
    /// quic/kcp obfuscation seed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    /// httpupgrade path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_upgrade_path: Option<String>,
    /// httpupgrade host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_upgrade_host: Option<String>,
    /// UDP packet encoding (`xudp`, `packetaddr`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_encoding: Option<String>,
    /// Opaque multiplex settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplex: Option<Multiplex>,
}

impl VLessConfig {
    fn has_tls(&self) -> bool {
        matches!(present(&self.security), Some("tls" | "reality"))
    }
}

impl ProtocolCodec for VLessConfig {
    const TAG: ProtocolTag = ProtocolTag::VLess;

    fn parse(link: &str) -> Result<(Self, String)> {
        let body = link::strip_scheme(link, &[scheme::VLESS])?;
        let parts = link::split_link(body);
        let (uuid, host_port) = link::split_userinfo(parts.main)?;
        let (server, server_port) = link::parse_host_port(host_port)?;
        let q = &parts.query;

        let network = q.string("type");
        let upgrade = network.as_deref() == Some("httpupgrade");

        let config = VLessConfig {
            server,
            server_port,
            uuid: link::credential(uuid, parts.main)?,
            flow: q.string("flow"),
            encryption: q.string("encryption"),
            security: q.string("security"),
            sni: q.string("sni"),
            alpn: q.alpn(),
            fingerprint: q.string("fp"),
            public_key: q.string("pbk"),
            short_id: q.string("sid"),
            spider_x: q.string("spx"),
            insecure: q.flag_any(key::ALLOW_INSECURE),
            path: q.string("path"),
            headers: Headers::new(),
            host: q.string("host"),
            max_early_data: q.number::<u32>("maxEarlyData").filter(|n| *n > 0),
            early_data_header: q.string("earlyDataHeaderName"),
            service_name: q.string_any(key::SERVICE_NAME),
            header_type: q.string("headerType"),
            seed: q.string("seed"),
            http_upgrade_path: q.string("path").filter(|_| upgrade),
            http_upgrade_host: q.string("host").filter(|_| upgrade),
            packet_encoding: q.string("packetEncoding"),
            multiplex: None,
            network,
        };
        Ok((config, parts.name_or(default_name::VLESS)))
    }

    fn to_link(&self, name: &str) -> Result<String> {
        let mut q = QueryBuilder::new();
        q.push_opt("flow", &self.flow);
        q.push_opt("encryption", &self.encryption);
        q.push_opt("type", &self.network);
        q.push_opt("security", &self.security);
        q.push_opt("sni", &self.sni);
        q.push_list("alpn", &self.alpn);
        q.push_opt("fp", &self.fingerprint);
        q.push_opt("pbk", &self.public_key);
        q.push_opt("sid", &self.short_id);
        q.push_opt("spx", &self.spider_x);
        q.push_opt("packetEncoding", &self.packet_encoding);
        q.push_flag("allowInsecure", self.insecure);

        match present(&self.network) {
            Some("ws" | "http" | "h2") => {
                q.push_opt("path", &self.path);
                q.push_opt("host", &self.host);
                q.push_num("maxEarlyData", self.max_early_data.filter(|n| *n > 0));
                q.push_opt("earlyDataHeaderName", &self.early_data_header);
            }
            Some("grpc") => q.push_opt("serviceName", &self.service_name),
            Some("httpupgrade") => {
                let path = present(&self.http_upgrade_path).or(present(&self.path));
                let host = present(&self.http_upgrade_host).or(present(&self.host));
                q.push("path", path.unwrap_or_default());
                q.push("host", host.unwrap_or_default());
            }
            Some("quic" | "kcp") => {
                q.push_opt("seed", &self.seed);
                q.push_opt("headerType", &self.header_type);
            }
            _ => {}
        }

        Ok(format!(
            "{}{}@{}{}{}",
            scheme::VLESS,
            urlencoding::encode(&self.uuid),
            link::join_host_port(&self.server, self.server_port),
            q.finish(),
            link::encode_name(name)
        ))
    }

    fn to_outbound(&self, tag: &str) -> Result<Outbound> {
        let tls = self.has_tls().then(|| {
            let mut tls = tls_block(TlsInput {
                sni: present(&self.sni),
                alpn: &self.alpn,
                fingerprint: present(&self.fingerprint),
                insecure: self.insecure,
            });
            if present(&self.security) == Some("reality") {
                tls.reality = Some(reality_block(
                    present(&self.public_key),
                    present(&self.short_id),
                ));
            }
            tls
        });

        let transport = transport_block(&TransportInput {
            network: present(&self.network),
            path: present(&self.path),
            host: present(&self.host),
            headers: Some(&self.headers),
            max_early_data: self.max_early_data,
            early_data_header: present(&self.early_data_header),
            service_name: present(&self.service_name),
            http_upgrade_path: present(&self.http_upgrade_path),
            http_upgrade_host: present(&self.http_upgrade_host),
            seed: present(&self.seed),
            header_type: present(&self.header_type),
            ..Default::default()
        });

        let settings = VLessOutbound {
            uuid: self.uuid.clone(),
            flow: present(&self.flow).map(str::to_string),
            packet_encoding: present(&self.packet_encoding).map(str::to_string),
            tls,
            transport,
            multiplex: multiplex_block(&self.multiplex),
        };
        Ok(Outbound::remote(
            tag,
            &self.server,
            self.server_port,
            OutboundSettings::VLess(settings),
        ))
    }
}
