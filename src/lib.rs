//! # Proxy Node Codec
//!
//! Share-link codec and engine outbound compiler for proxy node definitions.
//!
//! A node is a [`ProtocolTag`] plus a [`NodeConfig`], the canonical per-protocol settings.
//! Three pure operations work on it:
//!
//! - **Decode** ([`parse_share_link`]): share-link text → tag, config and suggested name
//! - **Encode** ([`build_share_link`]): tag, config and display name → share-link text
//! - **Compile** ([`compile_outbound`]): tag, config and engine tag → sing-box [`Outbound`]
//!
//! [`engine`] assembles compiled outbounds, per-node inbounds and route rules into a complete
//! engine configuration file.
//!
//! ## Supported Protocols
//!
//! | Tag | Schemes | Module |
//! |-----|---------|--------|
//! | `ss` | `ss://` | [`ShadowsocksConfig`] |
//! | `vless` | `vless://` | [`VLessConfig`] |
//! | `vmess` | `vmess://` | [`VMessConfig`] |
//! | `trojan` | `trojan://` | [`TrojanConfig`] |
//! | `hy2` | `hysteria2://`, `hy2://` | [`Hysteria2Config`] |
//! | `tuic` | `tuic://` | [`TuicConfig`] |
//! | `anytls` | `anytls://` | [`AnyTlsConfig`] |
//! | `socks5` | `socks5://`, `socks://` | [`Socks5Config`] |
//! | `http` | `http://`, `https://` | [`HttpProxyConfig`] |
//!
//! ## Link format and parsing rules (unified)
//!
//! - **Scheme prefix**: case-sensitive; anything else is `UnsupportedScheme`.
//! - **Fragment (`#`)**: query-unescaped and used as the suggested name; a protocol default
//!   name (e.g. `SS Node`) is used when it is absent or blank.
//! - **Query**: `application/x-www-form-urlencoded`; historical alias keys resolve to one field
//!   (`insecure`/`allowInsecure`, `sni`/`peer`, `serviceName`/`service_name`/`grpc-service-name`).
//!   Encoders only emit the canonical key.
//! - **Userinfo**: split on the last `@`; `host:port` accepts `[IPv6]:port`.
//! - **Port**: 1–65535, otherwise `InvalidPort`.
//! - **Omit-if-default**: empty, zero and false fields are never emitted by encode or compile.
//!
//! ## Example
//!
//! ```rust
//! use proxy_node_codec::{build_share_link, compile_outbound, parse_share_link};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let parsed = parse_share_link("trojan://secret@example.com:443?sni=cdn.example.com#Tokyo")?;
//! assert_eq!(parsed.name, "Tokyo");
//!
//! let link = build_share_link(parsed.tag, &parsed.config, &parsed.name)?;
//! assert!(link.starts_with("trojan://secret@example.com:443"));
//!
//! let outbound = compile_outbound(parsed.tag, &parsed.config, "node-1-out")?;
//! let json = serde_json::to_value(&outbound)?;
//! assert_eq!(json["tls"]["server_name"], "cdn.example.com");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod anytls;
mod constants;
pub mod engine;
mod error;
mod http;
mod hysteria2;
mod link;
mod options;
pub mod outbound;
mod shadowsocks;
mod socks;
mod trojan;
mod tuic;
mod vless;
mod vmess;

#[cfg(test)]
mod protocols_comprehensive;

pub use anytls::AnyTlsConfig;
pub use error::{CodecError, Result};
pub use http::HttpProxyConfig;
pub use hysteria2::Hysteria2Config;
pub use outbound::{Multiplex, Outbound};
pub use shadowsocks::ShadowsocksConfig;
pub use socks::Socks5Config;
pub use trojan::TrojanConfig;
pub use tuic::TuicConfig;
pub use vless::VLessConfig;
pub use vmess::VMessConfig;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Decode, encode and compile for one protocol's config.
pub trait ProtocolCodec: Sized {
    /// Tag of the protocol this config belongs to
    const TAG: ProtocolTag;

    /// Parse a share link into the config and a suggested display name
    ///
    /// # Errors
    ///
    /// Returns `CodecError` if the scheme does not match or the link is malformed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use proxy_node_codec::{ProtocolCodec, TuicConfig};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let (tuic, name) = TuicConfig::parse("tuic://uuid:pw@example.com:443#Edge")?;
    /// assert_eq!(tuic.password, "pw");
    /// assert_eq!(name, "Edge");
    /// # Ok(())
    /// # }
    /// ```
    fn parse(link: &str) -> Result<(Self, String)>;

    /// Build a share link; `name` becomes the `#fragment` when non-blank
    ///
    /// # Errors
    ///
    /// Returns `CodecError` if the config cannot be serialized.
    fn to_link(&self, name: &str) -> Result<String>;

    /// Compile into an engine outbound tagged `tag`
    ///
    /// # Errors
    ///
    /// Returns `CodecError` if the config cannot be expressed as an outbound.
    fn to_outbound(&self, tag: &str) -> Result<Outbound>;
}

/// Protocol family of a node.
///
/// Serializes to the stored type names (`ss`, `hy2`, `socks5`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolTag {
    /// Shadowsocks
    #[serde(rename = "ss")]
    Shadowsocks,
    /// VLESS
    #[serde(rename = "vless")]
    VLess,
    /// VMess
    #[serde(rename = "vmess")]
    VMess,
    /// Trojan
    #[serde(rename = "trojan")]
    Trojan,
    /// Hysteria2
    #[serde(rename = "hy2")]
    Hysteria2,
    /// TUIC
    #[serde(rename = "tuic")]
    Tuic,
    /// AnyTLS
    #[serde(rename = "anytls")]
    AnyTls,
    /// SOCKS5
    #[serde(rename = "socks5")]
    Socks5,
    /// HTTP/HTTPS proxy
    #[serde(rename = "http")]
    HttpProxy,
}

impl ProtocolTag {
    /// All tags, in display order
    pub const ALL: [ProtocolTag; 9] = [
        ProtocolTag::Shadowsocks,
        ProtocolTag::VLess,
        ProtocolTag::VMess,
        ProtocolTag::Trojan,
        ProtocolTag::Hysteria2,
        ProtocolTag::Tuic,
        ProtocolTag::AnyTls,
        ProtocolTag::Socks5,
        ProtocolTag::HttpProxy,
    ];

    /// Stored type name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolTag::Shadowsocks => "ss",
            ProtocolTag::VLess => "vless",
            ProtocolTag::VMess => "vmess",
            ProtocolTag::Trojan => "trojan",
            ProtocolTag::Hysteria2 => "hy2",
            ProtocolTag::Tuic => "tuic",
            ProtocolTag::AnyTls => "anytls",
            ProtocolTag::Socks5 => "socks5",
            ProtocolTag::HttpProxy => "http",
        }
    }
}

impl fmt::Display for ProtocolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolTag {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        ProtocolTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| CodecError::UnsupportedProtocolForOperation(s.to_string()))
    }
}

/// Canonical config of a node: one variant per [`ProtocolTag`].
///
/// # Example
///
/// ```rust
/// use proxy_node_codec::{NodeConfig, ProtocolTag};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let stored = r#"{"server":"1.2.3.4","server_port":1080,"username":"u","password":"p"}"#;
/// let config = NodeConfig::from_stored("socks5", stored)?;
/// assert_eq!(config.tag(), ProtocolTag::Socks5);
/// assert_eq!(config.to_link("Home")?, "socks5://u:p@1.2.3.4:1080#Home");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum NodeConfig {
    /// Shadowsocks
    Shadowsocks(ShadowsocksConfig),
    /// VLESS
    VLess(VLessConfig),
    /// VMess
    VMess(VMessConfig),
    /// Trojan
    Trojan(TrojanConfig),
    /// Hysteria2
    Hysteria2(Hysteria2Config),
    /// TUIC
    Tuic(TuicConfig),
    /// AnyTLS
    AnyTls(AnyTlsConfig),
    /// SOCKS5
    Socks5(Socks5Config),
    /// HTTP/HTTPS proxy
    HttpProxy(HttpProxyConfig),
}

impl NodeConfig {
    /// Tag of the active variant
    pub fn tag(&self) -> ProtocolTag {
        match self {
            NodeConfig::Shadowsocks(_) => ShadowsocksConfig::TAG,
            NodeConfig::VLess(_) => VLessConfig::TAG,
            NodeConfig::VMess(_) => VMessConfig::TAG,
            NodeConfig::Trojan(_) => TrojanConfig::TAG,
            NodeConfig::Hysteria2(_) => Hysteria2Config::TAG,
            NodeConfig::Tuic(_) => TuicConfig::TAG,
            NodeConfig::AnyTls(_) => AnyTlsConfig::TAG,
            NodeConfig::Socks5(_) => Socks5Config::TAG,
            NodeConfig::HttpProxy(_) => HttpProxyConfig::TAG,
        }
    }

    /// Remote server address
    pub fn server(&self) -> &str {
        match self {
            NodeConfig::Shadowsocks(c) => &c.server,
            NodeConfig::VLess(c) => &c.server,
            NodeConfig::VMess(c) => &c.server,
            NodeConfig::Trojan(c) => &c.server,
            NodeConfig::Hysteria2(c) => &c.server,
            NodeConfig::Tuic(c) => &c.server,
            NodeConfig::AnyTls(c) => &c.server,
            NodeConfig::Socks5(c) => &c.server,
            NodeConfig::HttpProxy(c) => &c.server,
        }
    }

    /// Share link for this config
    pub fn to_link(&self, name: &str) -> Result<String> {
        match self {
            NodeConfig::Shadowsocks(c) => c.to_link(name),
            NodeConfig::VLess(c) => c.to_link(name),
            NodeConfig::VMess(c) => c.to_link(name),
            NodeConfig::Trojan(c) => c.to_link(name),
            NodeConfig::Hysteria2(c) => c.to_link(name),
            NodeConfig::Tuic(c) => c.to_link(name),
            NodeConfig::AnyTls(c) => c.to_link(name),
            NodeConfig::Socks5(c) => c.to_link(name),
            NodeConfig::HttpProxy(c) => c.to_link(name),
        }
    }

    /// Engine outbound for this config
    pub fn to_outbound(&self, tag: &str) -> Result<Outbound> {
        match self {
            NodeConfig::Shadowsocks(c) => c.to_outbound(tag),
            NodeConfig::VLess(c) => c.to_outbound(tag),
            NodeConfig::VMess(c) => c.to_outbound(tag),
            NodeConfig::Trojan(c) => c.to_outbound(tag),
            NodeConfig::Hysteria2(c) => c.to_outbound(tag),
            NodeConfig::Tuic(c) => c.to_outbound(tag),
            NodeConfig::AnyTls(c) => c.to_outbound(tag),
            NodeConfig::Socks5(c) => c.to_outbound(tag),
            NodeConfig::HttpProxy(c) => c.to_outbound(tag),
        }
    }

    /// Opaque text persisted by the storage layer (JSON of the active variant)
    pub fn to_stored(&self) -> Result<String> {
        let text = match self {
            NodeConfig::Shadowsocks(c) => serde_json::to_string(c),
            NodeConfig::VLess(c) => serde_json::to_string(c),
            NodeConfig::VMess(c) => serde_json::to_string(c),
            NodeConfig::Trojan(c) => serde_json::to_string(c),
            NodeConfig::Hysteria2(c) => serde_json::to_string(c),
            NodeConfig::Tuic(c) => serde_json::to_string(c),
            NodeConfig::AnyTls(c) => serde_json::to_string(c),
            NodeConfig::Socks5(c) => serde_json::to_string(c),
            NodeConfig::HttpProxy(c) => serde_json::to_string(c),
        };
        text.map_err(|source| CodecError::InvalidStoredConfig {
            tag: self.tag().to_string(),
            source,
        })
    }

    /// Reads stored text back under its stored type name
    ///
    /// # Errors
    ///
    /// `UnsupportedProtocolForOperation` for unknown type names (e.g. `direct`),
    /// `InvalidStoredConfig` if the text does not match the tag's config.
    pub fn from_stored(tag: &str, text: &str) -> Result<Self> {
        let tag: ProtocolTag = tag.parse()?;
        let invalid = |source| CodecError::InvalidStoredConfig {
            tag: tag.to_string(),
            source,
        };
        Ok(match tag {
            ProtocolTag::Shadowsocks => {
                NodeConfig::Shadowsocks(serde_json::from_str(text).map_err(invalid)?)
            }
            ProtocolTag::VLess => NodeConfig::VLess(serde_json::from_str(text).map_err(invalid)?),
            ProtocolTag::VMess => NodeConfig::VMess(serde_json::from_str(text).map_err(invalid)?),
            ProtocolTag::Trojan => {
                NodeConfig::Trojan(serde_json::from_str(text).map_err(invalid)?)
            }
            ProtocolTag::Hysteria2 => {
                NodeConfig::Hysteria2(serde_json::from_str(text).map_err(invalid)?)
            }
            ProtocolTag::Tuic => NodeConfig::Tuic(serde_json::from_str(text).map_err(invalid)?),
            ProtocolTag::AnyTls => {
                NodeConfig::AnyTls(serde_json::from_str(text).map_err(invalid)?)
            }
            ProtocolTag::Socks5 => {
                NodeConfig::Socks5(serde_json::from_str(text).map_err(invalid)?)
            }
            ProtocolTag::HttpProxy => {
                NodeConfig::HttpProxy(serde_json::from_str(text).map_err(invalid)?)
            }
        })
    }
}

/// A decoded share link.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLink {
    /// Protocol family
    pub tag: ProtocolTag,
    /// Canonical config
    pub config: NodeConfig,
    /// Fragment name, or the protocol's default name
    pub name: String,
}

/// Parse any supported share link
///
/// Detects the protocol from the scheme prefix. Surrounding whitespace is ignored.
///
/// # Errors
///
/// `UnsupportedScheme` for unknown schemes; otherwise the protocol decoder's error.
///
/// # Example
///
/// ```rust
/// use proxy_node_codec::{parse_share_link, CodecError, NodeConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let parsed = parse_share_link("anytls://pw@[::1]:443?sni=x#N")?;
/// let NodeConfig::AnyTls(cfg) = &parsed.config else { unreachable!() };
/// assert_eq!((cfg.server.as_str(), cfg.server_port), ("::1", 443));
///
/// assert!(matches!(parse_share_link("foo://x"), Err(CodecError::UnsupportedScheme(_))));
/// # Ok(())
/// # }
/// ```
pub fn parse_share_link(link: &str) -> Result<ParsedLink> {
    use crate::constants::scheme;

    let link = link.trim();
    debug!(scheme = link::scheme_of(link), "decoding share link");

    let parsed = if link.starts_with(scheme::SHADOWSOCKS) {
        wrap(ShadowsocksConfig::parse(link), NodeConfig::Shadowsocks)
    } else if link.starts_with(scheme::VLESS) {
        wrap(VLessConfig::parse(link), NodeConfig::VLess)
    } else if link.starts_with(scheme::VMESS) {
        wrap(VMessConfig::parse(link), NodeConfig::VMess)
    } else if link.starts_with(scheme::TROJAN) {
        wrap(TrojanConfig::parse(link), NodeConfig::Trojan)
    } else if link.starts_with(scheme::HYSTERIA2) || link.starts_with(scheme::HY2) {
        wrap(Hysteria2Config::parse(link), NodeConfig::Hysteria2)
    } else if link.starts_with(scheme::TUIC) {
        wrap(TuicConfig::parse(link), NodeConfig::Tuic)
    } else if link.starts_with(scheme::ANYTLS) {
        wrap(AnyTlsConfig::parse(link), NodeConfig::AnyTls)
    } else if link.starts_with(scheme::SOCKS5) || link.starts_with(scheme::SOCKS) {
        wrap(Socks5Config::parse(link), NodeConfig::Socks5)
    } else if link.starts_with(scheme::HTTP) || link.starts_with(scheme::HTTPS) {
        wrap(HttpProxyConfig::parse(link), NodeConfig::HttpProxy)
    } else {
        Err(CodecError::UnsupportedScheme(
            link::scheme_of(link).to_string(),
        ))
    };

    if let Err(e) = &parsed {
        debug!(error = %e, "share link rejected");
    }
    parsed
}

fn wrap<C: ProtocolCodec>(
    parsed: Result<(C, String)>,
    variant: fn(C) -> NodeConfig,
) -> Result<ParsedLink> {
    parsed.map(|(config, name)| ParsedLink {
        tag: C::TAG,
        config: variant(config),
        name,
    })
}

/// Parse a batch of links, one per line
///
/// Blank lines and `#` comment lines are skipped. Each link succeeds or fails on its own.
pub fn parse_share_links(text: &str) -> Vec<Result<ParsedLink>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(parse_share_link)
        .collect()
}

/// Build the share link of a node
///
/// # Errors
///
/// `UnsupportedProtocolForOperation` if `tag` does not match the config variant.
pub fn build_share_link(tag: ProtocolTag, config: &NodeConfig, name: &str) -> Result<String> {
    check_tag(tag, config)?;
    config.to_link(name)
}

/// Compile a node into an engine outbound tagged `engine_tag`
///
/// # Errors
///
/// `UnsupportedProtocolForOperation` if `tag` does not match the config variant.
pub fn compile_outbound(tag: ProtocolTag, config: &NodeConfig, engine_tag: &str) -> Result<Outbound> {
    check_tag(tag, config)?;
    config.to_outbound(engine_tag)
}

fn check_tag(tag: ProtocolTag, config: &NodeConfig) -> Result<()> {
    if tag == config.tag() {
        Ok(())
    } else {
        Err(CodecError::UnsupportedProtocolForOperation(format!(
            "tag {} does not match {} config",
            tag,
            config.tag()
        )))
    }
}
