//! Engine outbound descriptors.
//!
//! These mirror the sing-box outbound schema: `type`, `tag`, `server`, `server_port`, then the
//! protocol's own keys flattened into the same object. Each protocol has its own settings struct,
//! so which keys may appear for which `type` is fixed by the type system; optional keys are
//! skipped when absent or default.
//!
//! Field order in serialized output follows declaration order and is not part of the contract.

use crate::link::is_false;
use serde::Serialize;
use std::collections::BTreeMap;

/// Opaque multiplex settings, passed through to the engine verbatim.
pub type Multiplex = serde_json::Map<String, serde_json::Value>;

/// HTTP header map for transports. Ordered so output is deterministic.
pub type Headers = BTreeMap<String, String>;

/// A compiled outbound, ready to be placed in the engine's `outbounds` array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outbound {
    /// Engine outbound type (`vless`, `hysteria2`, `socks`, ...)
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Unique tag referenced from route rules
    pub tag: String,
    /// Remote server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Remote port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_port: Option<u16>,
    /// Protocol-scoped settings
    #[serde(flatten)]
    pub settings: OutboundSettings,
}

impl Outbound {
    /// Outbound to a remote server. The `type` key is derived from `settings`.
    pub fn remote(tag: &str, server: &str, server_port: u16, settings: OutboundSettings) -> Self {
        Outbound {
            kind: settings.kind(),
            tag: tag.to_string(),
            server: Some(server.to_string()),
            server_port: Some(server_port),
            settings,
        }
    }

    /// The `direct` outbound used as the route fallback.
    pub fn direct(tag: &str) -> Self {
        Outbound {
            kind: "direct",
            tag: tag.to_string(),
            server: None,
            server_port: None,
            settings: OutboundSettings::Direct(DirectOutbound {}),
        }
    }

    /// TLS block, if the outbound carries one.
    pub fn tls(&self) -> Option<&TlsOptions> {
        match &self.settings {
            OutboundSettings::VLess(o) => o.tls.as_ref(),
            OutboundSettings::VMess(o) => o.tls.as_ref(),
            OutboundSettings::Trojan(o) => Some(&o.tls),
            OutboundSettings::Hysteria2(o) => Some(&o.tls),
            OutboundSettings::Tuic(o) => Some(&o.tls),
            OutboundSettings::AnyTls(o) => Some(&o.tls),
            OutboundSettings::Http(o) => o.tls.as_ref(),
            OutboundSettings::Shadowsocks(_)
            | OutboundSettings::Socks(_)
            | OutboundSettings::Direct(_) => None,
        }
    }

    /// Transport block, if the outbound carries one.
    pub fn transport(&self) -> Option<&Transport> {
        match &self.settings {
            OutboundSettings::VLess(o) => o.transport.as_ref(),
            OutboundSettings::VMess(o) => o.transport.as_ref(),
            OutboundSettings::Trojan(o) => o.transport.as_ref(),
            _ => None,
        }
    }
}

/// Per-protocol outbound keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundSettings {
    /// `shadowsocks`
    Shadowsocks(ShadowsocksOutbound),
    /// `vless`
    VLess(VLessOutbound),
    /// `vmess`
    VMess(VMessOutbound),
    /// `trojan`
    Trojan(TrojanOutbound),
    /// `hysteria2`
    Hysteria2(Hysteria2Outbound),
    /// `tuic`
    Tuic(TuicOutbound),
    /// `anytls`
    AnyTls(AnyTlsOutbound),
    /// `socks`
    Socks(SocksOutbound),
    /// `http`
    Http(HttpOutbound),
    /// `direct`
    Direct(DirectOutbound),
}

impl OutboundSettings {
    /// Engine `type` for these settings.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundSettings::Shadowsocks(_) => "shadowsocks",
            OutboundSettings::VLess(_) => "vless",
            OutboundSettings::VMess(_) => "vmess",
            OutboundSettings::Trojan(_) => "trojan",
            OutboundSettings::Hysteria2(_) => "hysteria2",
            OutboundSettings::Tuic(_) => "tuic",
            OutboundSettings::AnyTls(_) => "anytls",
            OutboundSettings::Socks(_) => "socks",
            OutboundSettings::Http(_) => "http",
            OutboundSettings::Direct(_) => "direct",
        }
    }
}

/// `shadowsocks` outbound keys
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShadowsocksOutbound {
    /// Cipher
    pub method: String,
    /// Password
    pub password: String,
    /// SIP003 plugin name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    /// Plugin options; only set together with `plugin`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_opts: Option<String>,
    /// UDP over TCP
    #[serde(skip_serializing_if = "is_false")]
    pub udp_over_tcp: bool,
    /// Multiplex passthrough
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplex: Option<Multiplex>,
}

/// `vless` outbound keys
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VLessOutbound {
    /// User UUID
    pub uuid: String,
    /// Flow control (`xtls-rprx-vision`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    /// UDP packet encoding (`xudp`, `packetaddr`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_encoding: Option<String>,
    /// Present for `tls` and `reality` security
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOptions>,
    /// Absent for plain TCP
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
    /// Multiplex passthrough
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplex: Option<Multiplex>,
}

/// `vmess` outbound keys
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VMessOutbound {
    /// User UUID
    pub uuid: String,
    /// Always emitted, `0` included
    pub alter_id: u16,
    /// Cipher
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    /// VMess global padding
    #[serde(skip_serializing_if = "is_false")]
    pub global_padding: bool,
    /// VMess authenticated length
    #[serde(skip_serializing_if = "is_false")]
    pub authenticated_length: bool,
    /// UDP packet encoding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_encoding: Option<String>,
    /// Present when the payload says `tls`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOptions>,
    /// Absent for plain TCP
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
    /// Multiplex passthrough
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplex: Option<Multiplex>,
}

/// `trojan` outbound keys
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrojanOutbound {
    /// Password
    pub password: String,
    /// Always present
    pub tls: TlsOptions,
    /// Absent for plain TCP
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
    /// Multiplex passthrough
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplex: Option<Multiplex>,
}

/// `hysteria2` outbound keys
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hysteria2Outbound {
    /// Auth password
    pub password: String,
    /// Upload bandwidth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up_mbps: Option<u32>,
    /// Download bandwidth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub down_mbps: Option<u32>,
    /// Obfuscation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfs: Option<ObfsOptions>,
    /// Salamander obfuscation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salamander: Option<SalamanderOptions>,
    /// `tcp` or `udp`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Port hopping interval, e.g. `30s`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hop_interval: Option<String>,
    /// Always present
    pub tls: TlsOptions,
}

/// Hysteria2 `obfs` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObfsOptions {
    /// Obfuscation type (`salamander`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Obfuscation password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Hysteria2 `salamander` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalamanderOptions {
    /// Salamander password
    pub password: String,
}

/// `tuic` outbound keys
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuicOutbound {
    /// User UUID
    pub uuid: String,
    /// Password
    pub password: String,
    /// `bbr`, `cubic` or `new_reno`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub congestion_control: Option<String>,
    /// `native` or `quic`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udp_relay_mode: Option<String>,
    /// 0-RTT QUIC handshake
    #[serde(skip_serializing_if = "is_false")]
    pub zero_rtt_handshake: bool,
    /// Heartbeat interval, e.g. `10s`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat: Option<String>,
    /// `tcp` or `udp`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Send no SNI
    #[serde(skip_serializing_if = "is_false")]
    pub disable_sni: bool,
    /// Reduce round trips on connect
    #[serde(skip_serializing_if = "is_false")]
    pub reduce_rtt: bool,
    /// Always present
    pub tls: TlsOptions,
}

/// `anytls` outbound keys
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnyTlsOutbound {
    /// Password
    pub password: String,
    /// Idle session check interval, e.g. `30s`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_session_check_interval: Option<String>,
    /// Idle session timeout, e.g. `30s`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_session_timeout: Option<String>,
    /// Idle sessions kept open
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_idle_session: Option<u32>,
    /// Always present
    pub tls: TlsOptions,
}

/// `socks` outbound keys
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocksOutbound {
    /// Always `"5"`
    pub version: &'static str,
    /// Auth username
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Auth password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// `http` outbound keys
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpOutbound {
    /// Auth username
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Auth password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Present for HTTPS proxies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOptions>,
}

/// `direct` carries no keys of its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectOutbound {}

/// Outbound `tls` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TlsOptions {
    /// Always `true`
    pub enabled: bool,
    /// SNI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// Skip certificate verification
    #[serde(skip_serializing_if = "is_false")]
    pub insecure: bool,
    /// TLS ALPN protocols
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,
    /// uTLS client-hello emulation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utls: Option<UtlsOptions>,
    /// Reality, VLESS only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality: Option<RealityOptions>,
}

/// `tls.utls` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtlsOptions {
    /// Always `true`
    pub enabled: bool,
    /// Browser fingerprint (`chrome`, `firefox`, `safari`, ...)
    pub fingerprint: String,
}

/// `tls.reality` block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealityOptions {
    /// Always `true`
    pub enabled: bool,
    /// Server public key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Short id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
}

/// Outbound `transport` block: `type` plus the options of that transport kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transport {
    /// Network kind (`ws`, `grpc`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Keys of that kind
    #[serde(flatten)]
    pub options: TransportOptions,
}

/// Transport keys by network kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TransportOptions {
    /// `ws`
    WebSocket(WebSocketOptions),
    /// `grpc`
    Grpc(GrpcOptions),
    /// `httpupgrade`
    HttpUpgrade(HttpUpgradeOptions),
    /// `quic` and `kcp`
    Quic(QuicOptions),
    /// `http` and `h2`
    Http(HttpOptions),
    /// Any other network kind: only `type` is emitted
    Bare(BareOptions),
}

/// `ws` transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebSocketOptions {
    /// Transport path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Explicit headers, or `Host` from the node's host
    #[serde(skip_serializing_if = "Headers::is_empty")]
    pub headers: Headers,
    /// WebSocket early data length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_early_data: Option<u32>,
    /// Only emitted together with `max_early_data`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub early_data_header_name: Option<String>,
}

/// `grpc` transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrpcOptions {
    /// gRPC service name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

/// `httpupgrade` transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpUpgradeOptions {
    /// Transport path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Transport host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// `quic`/`kcp` transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuicOptions {
    /// Obfuscation seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    /// Header disguise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderTypeOptions>,
}

/// `{"type": ...}` header disguise of quic/kcp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderTypeOptions {
    /// `none`, `srtp`, `utp`, `wechat-video`, ...
    #[serde(rename = "type")]
    pub kind: String,
}

/// `http`/`h2` transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpOptions {
    /// Transport host
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,
    /// Transport path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<HttpPath>,
    /// HTTP method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// HTTP transport path: VMess emits a list, other protocols a single string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HttpPath {
    /// `"/path"`
    Single(String),
    /// `["/a", "/b"]`
    List(Vec<String>),
}

/// Options of a network kind with no keys of its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BareOptions {}
