//! Trojan codec
//!
//! Link format: `trojan://password@hostname:port[?query][#name]`
//!
//! **password**: percent-encoded when it contains reserved characters. TLS is always on.
//!
//! ## Query parameters
//!
//! | Key | Field |
//! |-----|-------|
//! | `sni` / `peer` | TLS server name |
//! | `alpn`, `fp` | ALPN list, uTLS fingerprint |
//! | `insecure` / `allowInsecure` | skip certificate verification |
//! | `type` | transport network (tcp, ws, grpc, http, h2, httpupgrade) |
//! | `host`, `path`, `method` | ws/http transport options |
//! | `serviceName` / `service_name` / `grpc-service-name` | gRPC service name |

use crate::constants::{default_name, key, scheme};
use crate::error::Result;
use crate::link::{self, QueryBuilder, deserialize_alpn, is_false, present};
use crate::options::{TlsInput, TransportInput, multiplex_block, tls_block, transport_block};
use crate::outbound::{Headers, Multiplex, Outbound, OutboundSettings, TrojanOutbound};
use crate::{ProtocolCodec, ProtocolTag};
use serde::{Deserialize, Serialize};

/// Trojan configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrojanConfig {
    /// Server address
    pub server: String,
    /// Server port
    pub server_port: u16,
    /// Password
    pub password: String,
    /// Transport network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
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
    pub insecure: bool,
    /// ws Host header / http host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Transport path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// gRPC service name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// http/h2 method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Explicit transport headers; replace the `Host` fallback
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub headers: Headers,
    /// Opaque multiplex settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplex: Option<Multiplex>,
}

impl ProtocolCodec for TrojanConfig {
    const TAG: ProtocolTag = ProtocolTag::Trojan;

    fn parse(link: &str) -> Result<(Self, String)> {
        let body = link::strip_scheme(link, &[scheme::TROJAN])?;
        let parts = link::split_link(body);
        let (password, host_port) = link::split_userinfo(parts.main)?;
        let (server, server_port) = link::parse_host_port(host_port)?;
        let q = &parts.query;

        let config = TrojanConfig {
            server,
            server_port,
            password: link::credential(password, parts.main)?,
            network: q.string("type"),
            sni: q.string_any(key::SNI),
            alpn: q.alpn(),
            fingerprint: q.string("fp"),
            insecure: q.flag_any(key::INSECURE),
            host: q.string("host"),
            path: q.string("path"),
            service_name: q.string_any(key::SERVICE_NAME),
            method: q.string("method"),
            headers: Headers::new(),
            multiplex: None,
        };
        Ok((config, parts.name_or(default_name::TROJAN)))
    }

    fn to_link(&self, name: &str) -> Result<String> {
        let mut q = QueryBuilder::new();
        q.push_opt("type", &self.network);
        q.push_opt("host", &self.host);
        q.push_opt("path", &self.path);
        q.push_opt("sni", &self.sni);
        q.push_list("alpn", &self.alpn);
        q.push_flag("insecure", self.insecure);
        q.push_opt("fp", &self.fingerprint);
        q.push_opt("serviceName", &self.service_name);
        q.push_opt("method", &self.method);

        Ok(format!(
            "{}{}@{}{}{}",
            scheme::TROJAN,
            urlencoding::encode(&self.password),
            link::join_host_port(&self.server, self.server_port),
            q.finish(),
            link::encode_name(name)
        ))
    }

    fn to_outbound(&self, tag: &str) -> Result<Outbound> {
        let tls = tls_block(TlsInput {
            sni: present(&self.sni),
            alpn: &self.alpn,
            fingerprint: present(&self.fingerprint),
            insecure: self.insecure,
        });
        let transport = transport_block(&TransportInput {
            network: present(&self.network),
            path: present(&self.path),
            host: present(&self.host),
            headers: Some(&self.headers),
            service_name: present(&self.service_name),
            method: present(&self.method),
            ..Default::default()
        });

        let settings = TrojanOutbound {
            password: self.password.clone(),
            tls,
            transport,
            multiplex: multiplex_block(&self.multiplex),
        };
        Ok(Outbound::remote(
            tag,
            &self.server,
            self.server_port,
            OutboundSettings::Trojan(settings),
        ))
    }
}
