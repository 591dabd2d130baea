//! HTTP/HTTPS proxy codec
//!
//! Link format: `http://[user[:password]@]hostname:port[/][?sni=...&insecure=1][#name]`
//!
//! `https://` marks a proxy reached over TLS; encoding picks the scheme from the TLS flag.

use crate::constants::{default_name, key, scheme};
use crate::error::Result;
use crate::link::{self, QueryBuilder, is_false, present};
use crate::options::{TlsInput, tls_block};
use crate::outbound::{HttpOutbound, Outbound, OutboundSettings};
use crate::{ProtocolCodec, ProtocolTag};
use serde::{Deserialize, Serialize};

/// HTTP proxy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpProxyConfig {
    /// Server address
    pub server: String,
    /// Server port
    pub server_port: u16,
    /// Auth username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Auth password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Connect to the proxy over TLS
    #[serde(default, skip_serializing_if = "is_false")]
    pub tls: bool,
    /// Skip certificate verification
    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure: bool,
    /// TLS server name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
}

impl ProtocolCodec for HttpProxyConfig {
    const TAG: ProtocolTag = ProtocolTag::HttpProxy;

    fn parse(link: &str) -> Result<(Self, String)> {
        let tls = link.starts_with(scheme::HTTPS);
        let body = link::strip_scheme(link, &[scheme::HTTP, scheme::HTTPS])?;
        let parts = link::split_link(body);

        let (username, password, host_port) = match parts.main.rsplit_once('@') {
            Some((userinfo, host_port)) => {
                let (username, password) = link::split_user_password(userinfo);
                (username, password, host_port)
            }
            None => (None, None, parts.main),
        };
        let (server, server_port) = link::parse_host_port(host_port)?;

        let config = HttpProxyConfig {
            server,
            server_port,
            username,
            password,
            tls,
            insecure: parts.query.flag_any(key::INSECURE),
            sni: parts.query.string("sni"),
        };
        Ok((config, parts.name_or(default_name::HTTP)))
    }

    fn to_link(&self, name: &str) -> Result<String> {
        let mut q = QueryBuilder::new();
        q.push_opt("sni", &self.sni);
        q.push_flag("insecure", self.insecure);

        Ok(format!(
            "{}{}{}{}{}",
            if self.tls { scheme::HTTPS } else { scheme::HTTP },
            link::join_user_password(present(&self.username), present(&self.password)),
            link::join_host_port(&self.server, self.server_port),
            q.finish(),
            link::encode_name(name)
        ))
    }

    fn to_outbound(&self, tag: &str) -> Result<Outbound> {
        let settings = HttpOutbound {
            username: present(&self.username).map(str::to_string),
            password: present(&self.password).map(str::to_string),
            tls: self.tls.then(|| {
                tls_block(TlsInput {
                    sni: present(&self.sni),
                    insecure: self.insecure,
                    ..Default::default()
                })
            }),
        };
        Ok(Outbound::remote(
            tag,
            &self.server,
            self.server_port,
            OutboundSettings::Http(settings),
        ))
    }
}
