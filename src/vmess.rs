//! VMess codec
//!
//! Link format: `vmess://base64(JSON)`
//!
//! The body is base64 (URL-safe unpadded or standard padded; whitespace is stripped first) of a
//! JSON object in the v2rayN "v2" layout.
//!
//! ## JSON fields
//!
//! **Required**: `add` (server address), `port` (1–65535), `id` (user UUID).
//!
//! **Optional**: `ps` (name), `aid`, `scy` (cipher), `net`, `type` (header type), `host`, `path`,
//! `tls`, `sni`, `alpn`, `fp`, `allowInsecure`, `maxEarlyData`, `earlyDataHeaderName`, `seed`,
//! `globalPadding`, `authenticatedLength`.
//!
//! Values are loosely typed in the wild: `port` and `aid` may be a number, a float literal such as
//! `4.0` or a string; flags may be a bool, `1`/`0` or `"true"`/`"1"`.
//!
//! For `net=grpc` the gRPC service name travels in `path`; for `net=httpupgrade` `path` and `host`
//! are the upgrade path and host.
//!
//! ## Serialization
//!
//! [`to_link`](ProtocolCodec::to_link) emits the same object with `v: "2"`, integer `port` and
//! `aid`, the display name in `ps`, URL-safe unpadded base64.

use crate::constants::{default_name, scheme};
use crate::error::{CodecError, Result};
use crate::link::{self, deserialize_alpn, deserialize_opt_u32, is_false, present, split_alpn};
use crate::options::{TlsInput, TransportInput, multiplex_block, tls_block, transport_block};
use crate::outbound::{Headers, Multiplex, Outbound, OutboundSettings, VMessOutbound};
use crate::{ProtocolCodec, ProtocolTag};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// VMess configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VMessConfig {
    /// Server address
    pub server: String,
    /// Server port
    pub server_port: u16,
    /// User UUID
    pub uuid: String,
    /// Alter id; `0` selects AEAD
    #[serde(default)]
    pub alter_id: u16,
    /// Cipher: auto, aes-128-gcm, chacha20-poly1305, none, zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    /// Transport network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// `tls` enables TLS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<String>,
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
    /// Transport path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Explicit transport headers; replace the `Host` fallback
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
    /// HTTP transport method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// HTTP transport path list; wins over `path` when non-empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub http_path: Vec<String>,
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
    /// VMess global padding
    #[serde(default, skip_serializing_if = "is_false")]
    pub global_padding: bool,
    /// VMess authenticated length
    #[serde(default, skip_serializing_if = "is_false")]
    pub authenticated_length: bool,
    /// Opaque multiplex settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplex: Option<Multiplex>,
}

/// A JSON scalar as found in VMess payloads.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Loose {
    /// Integer value; floats must be whole, strings may hold either form.
    fn as_int(&self) -> Option<i64> {
        fn whole(f: f64) -> Option<i64> {
            (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
        }
        match self {
            Loose::Int(n) => Some(*n),
            Loose::Float(f) => whole(*f),
            Loose::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(whole))
            }
            Loose::Bool(_) => None,
        }
    }

    fn as_flag(&self) -> bool {
        match self {
            Loose::Bool(b) => *b,
            Loose::Int(n) => *n == 1,
            Loose::Float(f) => *f == 1.0,
            Loose::Text(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        }
    }
}

fn flag(value: &Option<Loose>) -> bool {
    value.as_ref().is_some_and(Loose::as_flag)
}

fn text(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// The payload as it appears in links; every field is optional and loosely typed.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InPayload {
    add: Option<String>,
    port: Option<Loose>,
    id: Option<String>,
    aid: Option<Loose>,
    net: Option<String>,
    #[serde(rename = "type")]
    header_type: Option<String>,
    host: Option<String>,
    path: Option<String>,
    tls: Option<String>,
    sni: Option<String>,
    alpn: Option<String>,
    fp: Option<String>,
    ps: Option<String>,
    scy: Option<String>,
    #[serde(rename = "allowInsecure")]
    allow_insecure: Option<Loose>,
    #[serde(rename = "maxEarlyData")]
    max_early_data: Option<Loose>,
    #[serde(rename = "earlyDataHeaderName")]
    early_data_header_name: Option<String>,
    seed: Option<String>,
    #[serde(rename = "globalPadding")]
    global_padding: Option<Loose>,
    #[serde(rename = "authenticatedLength")]
    authenticated_length: Option<Loose>,
}

/// The payload emitted by [`VMessConfig::to_link`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutPayload<'a> {
    add: &'a str,
    port: u16,
    id: &'a str,
    aid: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    net: Option<&'a str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    header_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tls: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sni: Option<&'a str>,
    #[serde(skip_serializing_if = "String::is_empty")]
    alpn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fp: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ps: Option<&'a str>,
    v: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scy: Option<&'a str>,
    #[serde(skip_serializing_if = "is_false")]
    allow_insecure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_early_data: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    early_data_header_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<&'a str>,
    #[serde(skip_serializing_if = "is_false")]
    global_padding: bool,
    #[serde(skip_serializing_if = "is_false")]
    authenticated_length: bool,
}

impl ProtocolCodec for VMessConfig {
    const TAG: ProtocolTag = ProtocolTag::VMess;

    fn parse(link: &str) -> Result<(Self, String)> {
        let body = link::strip_scheme(link, &[scheme::VMESS])?;
        let body: String = body.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = link::decode_base64(&body)?;
        let payload: InPayload = serde_json::from_slice(&decoded)
            .map_err(|e| CodecError::InvalidJsonPayload(e.to_string()))?;

        let server = text(payload.add)
            .ok_or_else(|| CodecError::MalformedUri("vmess payload has no 'add'".to_string()))?;
        let uuid = text(payload.id)
            .ok_or_else(|| CodecError::MalformedUri("vmess payload has no 'id'".to_string()))?;
        let server_port = payload
            .port
            .as_ref()
            .and_then(Loose::as_int)
            .and_then(|n| u16::try_from(n).ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| CodecError::port(&format!("{:?}", payload.port)))?;

        let alter_id = match &payload.aid {
            None => 0,
            Some(aid) => match aid.as_int().and_then(|n| u16::try_from(n).ok()) {
                Some(n) => n,
                None => {
                    warn!(aid = ?aid, "ignoring unparseable vmess alter id");
                    0
                }
            },
        };

        let network = text(payload.net);
        let path = text(payload.path);
        let host = text(payload.host);
        let service_name = path.clone().filter(|_| network.as_deref() == Some("grpc"));
        let upgrade = network.as_deref() == Some("httpupgrade");

        let config = VMessConfig {
            server,
            server_port,
            uuid,
            alter_id,
            security: text(payload.scy),
            tls: text(payload.tls),
            sni: text(payload.sni),
            alpn: payload.alpn.as_deref().map(split_alpn).unwrap_or_default(),
            fingerprint: text(payload.fp),
            insecure: flag(&payload.allow_insecure),
            headers: Headers::new(),
            max_early_data: payload
                .max_early_data
                .as_ref()
                .and_then(Loose::as_int)
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0),
            early_data_header: text(payload.early_data_header_name),
            service_name,
            method: None,
            http_path: Vec::new(),
            header_type: text(payload.header_type),
            seed: text(payload.seed),
            http_upgrade_path: path.clone().filter(|_| upgrade),
            http_upgrade_host: host.clone().filter(|_| upgrade),
            packet_encoding: None,
            global_padding: flag(&payload.global_padding),
            authenticated_length: flag(&payload.authenticated_length),
            multiplex: None,
            network,
            path,
            host,
        };

        let name = text(payload.ps)
            .map(|ps| ps.trim().to_string())
            .filter(|ps| !ps.is_empty())
            .unwrap_or_else(|| default_name::VMESS.to_string());
        Ok((config, name))
    }

    fn to_link(&self, name: &str) -> Result<String> {
        let network = present(&self.network);
        let (path, host) = match network {
            Some("grpc") => (
                present(&self.service_name).or(present(&self.path)),
                present(&self.host),
            ),
            Some("httpupgrade") => (
                present(&self.http_upgrade_path).or(present(&self.path)),
                present(&self.http_upgrade_host).or(present(&self.host)),
            ),
            _ => (present(&self.path), present(&self.host)),
        };

        let payload = OutPayload {
            add: &self.server,
            port: self.server_port,
            id: &self.uuid,
            aid: self.alter_id,
            net: network,
            header_type: present(&self.header_type),
            host,
            path,
            tls: present(&self.tls),
            sni: present(&self.sni),
            alpn: self.alpn.join(","),
            fp: present(&self.fingerprint),
            ps: Some(name.trim()).filter(|s| !s.is_empty()),
            v: "2",
            scy: present(&self.security),
            allow_insecure: self.insecure,
            max_early_data: self.max_early_data.filter(|n| *n > 0),
            early_data_header_name: present(&self.early_data_header),
            seed: present(&self.seed),
            global_padding: self.global_padding,
            authenticated_length: self.authenticated_length,
        };
        let json = serde_json::to_string(&payload)
            .map_err(|e| CodecError::InvalidJsonPayload(e.to_string()))?;
        Ok(format!("{}{}", scheme::VMESS, link::encode_base64(&json)))
    }

    fn to_outbound(&self, tag: &str) -> Result<Outbound> {
        let tls = (present(&self.tls) == Some("tls")).then(|| {
            tls_block(TlsInput {
                sni: present(&self.sni),
                alpn: &self.alpn,
                fingerprint: present(&self.fingerprint),
                insecure: self.insecure,
            })
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
            method: present(&self.method),
            http_paths: Some(&self.http_path),
        });

        let settings = VMessOutbound {
            uuid: self.uuid.clone(),
            alter_id: self.alter_id,
            security: present(&self.security).map(str::to_string),
            global_padding: self.global_padding,
            authenticated_length: self.authenticated_length,
            packet_encoding: present(&self.packet_encoding).map(str::to_string),
            tls,
            transport,
            multiplex: multiplex_block(&self.multiplex),
        };
        Ok(Outbound::remote(
            tag,
            &self.server,
            self.server_port,
            OutboundSettings::VMess(settings),
        ))
    }
}
