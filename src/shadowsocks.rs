//! Shadowsocks codec (SIP002)
//!
//! Link format: `ss://userinfo@hostname:port[/][?plugin=...][#name]`
//!
//! **userinfo**: base64 of `method:password`, URL-safe without padding or standard with padding.
//! The legacy form `ss://base64(method:password@hostname:port)` is also accepted.
//!
//! **plugin**: SIP002 `plugin=name;opts`. The part before the first `;` is the plugin name, the rest
//! its options. A separate `plugin-opts` key is honoured when the combined form carries none.
//!
//! ## Parsing rules
//!
//! 1. Prefix `ss://` is case-sensitive.
//! 2. Credentials are split from `hostname:port` on the last `@`; `method:password` on the first `:`.
//! 3. `udp_over_tcp=1|true` turns on UDP-over-TCP.
//!
//! ## Serialization
//!
//! Emits URL-safe unpadded base64 userinfo. When a query follows, SIP002 `/` is placed before `?`.

use crate::constants::{default_name, scheme};
use crate::error::{CodecError, Result};
use crate::link::{self, QueryBuilder, is_false, present};
use crate::options::multiplex_block;
use crate::outbound::{Multiplex, Outbound, OutboundSettings, ShadowsocksOutbound};
use crate::{ProtocolCodec, ProtocolTag};
use serde::{Deserialize, Serialize};

/// Shadowsocks configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowsocksConfig {
    /// Server address
    pub server: String,
    /// Server port
    pub server_port: u16,
    /// Cipher (aes-128-gcm, chacha20-ietf-poly1305, 2022-blake3-aes-256-gcm, ...)
    pub method: String,
    /// Password
    pub password: String,
    /// Plugin name (e.g. `obfs-local`, `v2ray-plugin`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    /// Plugin options, `;`-separated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_opts: Option<String>,
    /// UDP over TCP
    #[serde(default, skip_serializing_if = "is_false")]
    pub udp_over_tcp: bool,
    /// Opaque multiplex settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplex: Option<Multiplex>,
}

impl ProtocolCodec for ShadowsocksConfig {
    const TAG: ProtocolTag = ProtocolTag::Shadowsocks;

    fn parse(link: &str) -> Result<(Self, String)> {
        let body = link::strip_scheme(link, &[scheme::SHADOWSOCKS])?;
        let parts = link::split_link(body);

        let (method, password, host_port) = match parts.main.rsplit_once('@') {
            Some((userinfo, host_port)) => {
                let (method, password) = split_credentials(&link::decode_base64_text(userinfo)?)?;
                (method, password, host_port.to_string())
            }
            None => {
                let legacy = link::decode_base64_text(parts.main.trim_end_matches('/'))?;
                let (userinfo, host_port) = link::split_userinfo(&legacy)?;
                let (method, password) = split_credentials(userinfo)?;
                (method, password, host_port.to_string())
            }
        };
        let (server, server_port) = link::parse_host_port(&host_port)?;

        let (plugin, mut plugin_opts) = match parts.query.get("plugin") {
            Some(raw) => match raw.split_once(';') {
                Some((name, opts)) => (Some(name.to_string()), Some(opts.to_string())),
                None => (Some(raw.to_string()), None),
            },
            None => (None, None),
        };
        if plugin_opts.as_deref().is_none_or(str::is_empty) {
            plugin_opts = parts.query.string("plugin-opts");
        }

        let config = ShadowsocksConfig {
            server,
            server_port,
            method,
            password,
            plugin: plugin.filter(|p| !p.is_empty()),
            plugin_opts,
            udp_over_tcp: parts.query.flag("udp_over_tcp"),
            multiplex: None,
        };
        Ok((config, parts.name_or(default_name::SHADOWSOCKS)))
    }

    fn to_link(&self, name: &str) -> Result<String> {
        let user_info = link::encode_base64(&format!("{}:{}", self.method, self.password));

        let mut query = QueryBuilder::new();
        match (present(&self.plugin), present(&self.plugin_opts)) {
            (Some(plugin), Some(opts)) => query.push("plugin", &format!("{plugin};{opts}")),
            (Some(plugin), None) => query.push("plugin", plugin),
            (None, Some(opts)) => query.push("plugin-opts", opts),
            (None, None) => {}
        }
        query.push_flag("udp_over_tcp", self.udp_over_tcp);
        let query = query.finish();

        let mut link = format!(
            "{}{}@{}",
            scheme::SHADOWSOCKS,
            user_info,
            link::join_host_port(&self.server, self.server_port)
        );
        // SIP002: port is followed by `/` before the query
        if !query.is_empty() {
            link.push('/');
            link.push_str(&query);
        }
        link.push_str(&link::encode_name(name));
        Ok(link)
    }

    fn to_outbound(&self, tag: &str) -> Result<Outbound> {
        let plugin = present(&self.plugin).map(str::to_string);
        let settings = ShadowsocksOutbound {
            method: self.method.clone(),
            password: self.password.clone(),
            plugin_opts: plugin
                .as_ref()
                .and(present(&self.plugin_opts))
                .map(str::to_string),
            plugin,
            udp_over_tcp: self.udp_over_tcp,
            multiplex: multiplex_block(&self.multiplex),
        };
        Ok(Outbound::remote(
            tag,
            &self.server,
            self.server_port,
            OutboundSettings::Shadowsocks(settings),
        ))
    }
}

/// Splits `method:password` on the first `:`.
fn split_credentials(decoded: &str) -> Result<(String, String)> {
    let (method, password) = decoded.split_once(':').ok_or_else(|| {
        CodecError::InvalidCredentialsEncoding(format!(
            "expected 'method:password', got '{decoded}'"
        ))
    })?;
    if method.is_empty() || password.is_empty() {
        return Err(CodecError::malformed("empty credential", decoded));
    }
    Ok((method.to_string(), password.to_string()))
}
