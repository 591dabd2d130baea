//! SOCKS5 codec
//!
//! Link format: `socks5://[user[:password]@]hostname:port[#name]`, short scheme `socks://`.
//!
//! Userinfo is standard percent-encoded `user:password`. The v2rayN `socks://` form carries
//! `base64(user:password)` instead; under that scheme it is recognised when the userinfo has no
//! `:` and decodes to text that does. `socks5://` userinfo is always taken literally.

use crate::constants::{default_name, scheme};
use crate::error::Result;
use crate::link::{self, present};
use crate::outbound::{Outbound, OutboundSettings, SocksOutbound};
use crate::{ProtocolCodec, ProtocolTag};
use serde::{Deserialize, Serialize};

/// SOCKS5 configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Socks5Config {
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
}

impl ProtocolCodec for Socks5Config {
    const TAG: ProtocolTag = ProtocolTag::Socks5;

    fn parse(link: &str) -> Result<(Self, String)> {
        let v2rayn = link.starts_with(scheme::SOCKS);
        let body = link::strip_scheme(link, &[scheme::SOCKS5, scheme::SOCKS])?;
        let parts = link::split_link(body);

        let (username, password, host_port) = match parts.main.rsplit_once('@') {
            Some((userinfo, host_port)) => {
                let decoded = if v2rayn { base64_userinfo(userinfo) } else { None };
                let (username, password) = match decoded {
                    Some(decoded) => link::split_user_password(&decoded),
                    None => link::split_user_password(userinfo),
                };
                (username, password, host_port)
            }
            None => (None, None, parts.main),
        };
        let (server, server_port) = link::parse_host_port(host_port)?;

        let config = Socks5Config {
            server,
            server_port,
            username,
            password,
        };
        Ok((config, parts.name_or(default_name::SOCKS5)))
    }

    fn to_link(&self, name: &str) -> Result<String> {
        Ok(format!(
            "{}{}{}{}",
            scheme::SOCKS5,
            link::join_user_password(present(&self.username), present(&self.password)),
            link::join_host_port(&self.server, self.server_port),
            link::encode_name(name)
        ))
    }

    fn to_outbound(&self, tag: &str) -> Result<Outbound> {
        let settings = SocksOutbound {
            version: "5",
            username: present(&self.username).map(str::to_string),
            password: present(&self.password).map(str::to_string),
        };
        Ok(Outbound::remote(
            tag,
            &self.server,
            self.server_port,
            OutboundSettings::Socks(settings),
        ))
    }
}

/// Decoded v2rayN-style userinfo, if `raw` is one.
fn base64_userinfo(raw: &str) -> Option<String> {
    if raw.contains(':') {
        return None;
    }
    link::decode_base64_text(raw)
        .ok()
        .filter(|decoded| decoded.contains(':'))
}
