//! AnyTLS codec
//!
//! Link format: `anytls://password@hostname:port[?query][#name]`
//!
//! The whole userinfo is the password. Query keys: `sni`, `alpn`, `fp`,
//! `insecure`/`allowInsecure`, `idle_session_check_interval`, `idle_session_timeout`,
//! `min_idle_session`.

use crate::constants::{default_name, key, scheme};
use crate::error::Result;
use crate::link::{self, QueryBuilder, deserialize_alpn, deserialize_opt_u32, is_false, present};
use crate::options::{TlsInput, tls_block};
use crate::outbound::{AnyTlsOutbound, Outbound, OutboundSettings};
use crate::{ProtocolCodec, ProtocolTag};
use serde::{Deserialize, Serialize};

/// AnyTLS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnyTlsConfig {
    /// Server address
    pub server: String,
    /// Server port
    pub server_port: u16,
    /// Password
    pub password: String,
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
    /// Idle session check interval, e.g. `30s`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_session_check_interval: Option<String>,
    /// Idle session timeout, e.g. `30s`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_session_timeout: Option<String>,
    /// Idle sessions kept open
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_idle_session: Option<u32>,
}

impl ProtocolCodec for AnyTlsConfig {
    const TAG: ProtocolTag = ProtocolTag::AnyTls;

    fn parse(link: &str) -> Result<(Self, String)> {
        let body = link::strip_scheme(link, &[scheme::ANYTLS])?;
        let parts = link::split_link(body);
        let (password, host_port) = link::split_userinfo(parts.main)?;
        let (server, server_port) = link::parse_host_port(host_port)?;
        let q = &parts.query;

        let config = AnyTlsConfig {
            server,
            server_port,
            password: link::credential(password, parts.main)?,
            sni: q.string_any(key::SNI),
            alpn: q.alpn(),
            fingerprint: q.string("fp"),
            insecure: q.flag_any(key::INSECURE),
            idle_session_check_interval: q.string("idle_session_check_interval"),
            idle_session_timeout: q.string("idle_session_timeout"),
            min_idle_session: q.number::<u32>("min_idle_session").filter(|n| *n > 0),
        };
        Ok((config, parts.name_or(default_name::ANYTLS)))
    }

    fn to_link(&self, name: &str) -> Result<String> {
        let mut q = QueryBuilder::new();
        q.push_opt("sni", &self.sni);
        q.push_list("alpn", &self.alpn);
        q.push_opt("fp", &self.fingerprint);
        q.push_flag("insecure", self.insecure);
        q.push_opt("idle_session_check_interval", &self.idle_session_check_interval);
        q.push_opt("idle_session_timeout", &self.idle_session_timeout);
        q.push_num("min_idle_session", self.min_idle_session.filter(|n| *n > 0));

        Ok(format!(
            "{}{}@{}{}{}",
            scheme::ANYTLS,
            urlencoding::encode(&self.password),
            link::join_host_port(&self.server, self.server_port),
            q.finish(),
            link::encode_name(name)
        ))
    }

    fn to_outbound(&self, tag: &str) -> Result<Outbound> {
        let settings = AnyTlsOutbound {
            password: self.password.clone(),
            idle_session_check_interval: present(&self.idle_session_check_interval)
                .map(str::to_string),
            idle_session_timeout: present(&self.idle_session_timeout).map(str::to_string),
            min_idle_session: self.min_idle_session.filter(|n| *n > 0),
            tls: tls_block(TlsInput {
                sni: present(&self.sni),
                alpn: &self.alpn,
                fingerprint: present(&self.fingerprint),
                insecure: self.insecure,
            }),
        };
        Ok(Outbound::remote(
            tag,
            &self.server,
            self.server_port,
            OutboundSettings::AnyTls(settings),
        ))
    }
}
