//! TLS, transport and multiplex mapping shared by the outbound compilers.
//!
//! Protocol modules describe what they have through [`TlsInput`] and [`TransportInput`];
//! this module decides which engine keys that turns into.

use crate::constants::DEFAULT_NETWORK;
use crate::outbound::{
    BareOptions, GrpcOptions, HeaderTypeOptions, Headers, HttpOptions, HttpPath,
    HttpUpgradeOptions, Multiplex, QuicOptions, RealityOptions, TlsOptions, Transport,
    TransportOptions, UtlsOptions, WebSocketOptions,
};

/// TLS-related fields of a node config.
#[derive(Debug, Default)]
pub(crate) struct TlsInput<'a> {
    pub sni: Option<&'a str>,
    pub alpn: &'a [String],
    pub fingerprint: Option<&'a str>,
    pub insecure: bool,
}

pub(crate) fn tls_block(input: TlsInput<'_>) -> TlsOptions {
    TlsOptions {
        enabled: true,
        server_name: input.sni.map(str::to_string),
        insecure: input.insecure,
        alpn: input.alpn.to_vec(),
        utls: input.fingerprint.map(|fingerprint| UtlsOptions {
            enabled: true,
            fingerprint: fingerprint.to_string(),
        }),
        reality: None,
    }
}

pub(crate) fn reality_block(public_key: Option<&str>, short_id: Option<&str>) -> RealityOptions {
    RealityOptions {
        enabled: true,
        public_key: public_key.map(str::to_string),
        short_id: short_id.map(str::to_string),
    }
}

/// Transport-related fields of a node config. Protocols leave unsupported fields at default.
#[derive(Debug, Default)]
pub(crate) struct TransportInput<'a> {
    pub network: Option<&'a str>,
    pub path: Option<&'a str>,
    pub host: Option<&'a str>,
    pub headers: Option<&'a Headers>,
    pub max_early_data: Option<u32>,
    pub early_data_header: Option<&'a str>,
    pub service_name: Option<&'a str>,
    pub http_upgrade_path: Option<&'a str>,
    pub http_upgrade_host: Option<&'a str>,
    pub seed: Option<&'a str>,
    pub header_type: Option<&'a str>,
    pub method: Option<&'a str>,
    /// VMess list-form HTTP path; `Some` switches the HTTP path to list form
    pub http_paths: Option<&'a [String]>,
}

/// Transport block, or `None` when the network is absent or plain `tcp`.
pub(crate) fn transport_block(input: &TransportInput<'_>) -> Option<Transport> {
    let network = input.network.filter(|n| !n.is_empty() && *n != DEFAULT_NETWORK)?;

    let options = match network {
        "ws" => TransportOptions::WebSocket(WebSocketOptions {
            path: input.path.map(str::to_string),
            headers: ws_headers(input.host, input.headers),
            max_early_data: input.max_early_data.filter(|n| *n > 0),
            early_data_header_name: input
                .max_early_data
                .filter(|n| *n > 0)
                .and(input.early_data_header)
                .map(str::to_string),
        }),
        "grpc" => TransportOptions::Grpc(GrpcOptions {
            service_name: input.service_name.map(str::to_string),
        }),
        "httpupgrade" => TransportOptions::HttpUpgrade(HttpUpgradeOptions {
            path: input.http_upgrade_path.or(input.path).map(str::to_string),
            host: input.http_upgrade_host.or(input.host).map(str::to_string),
        }),
        "quic" | "kcp" => TransportOptions::Quic(QuicOptions {
            seed: input.seed.map(str::to_string),
            header: input.header_type.map(|kind| HeaderTypeOptions {
                kind: kind.to_string(),
            }),
        }),
        "http" | "h2" => TransportOptions::Http(HttpOptions {
            host: input.host.map(|h| vec![h.to_string()]).unwrap_or_default(),
            path: http_path(input),
            method: input.method.map(str::to_string),
        }),
        _ => TransportOptions::Bare(BareOptions {}),
    };

    Some(Transport {
        kind: network.to_string(),
        options,
    })
}

/// An explicit header map wins; otherwise a bare host becomes a single `Host` header.
fn ws_headers(host: Option<&str>, headers: Option<&Headers>) -> Headers {
    match headers.filter(|h| !h.is_empty()) {
        Some(headers) => headers.clone(),
        None => host
            .map(|h| Headers::from([("Host".to_string(), h.to_string())]))
            .unwrap_or_default(),
    }
}

fn http_path(input: &TransportInput<'_>) -> Option<HttpPath> {
    match input.http_paths {
        Some(paths) if !paths.is_empty() => Some(HttpPath::List(paths.to_vec())),
        Some(_) => input.path.map(|p| HttpPath::List(vec![p.to_string()])),
        None => input.path.map(|p| HttpPath::Single(p.to_string())),
    }
}

/// Multiplex settings are copied through without interpretation; an empty object is dropped.
pub(crate) fn multiplex_block(multiplex: &Option<Multiplex>) -> Option<Multiplex> {
    multiplex.as_ref().filter(|m| !m.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcp_and_missing_network_have_no_transport() {
        assert!(transport_block(&TransportInput::default()).is_none());
        let tcp = TransportInput {
            network: Some("tcp"),
            path: Some("/x"),
            ..Default::default()
        };
        assert!(transport_block(&tcp).is_none());
    }

    #[test]
    fn ws_host_becomes_host_header() {
        let input = TransportInput {
            network: Some("ws"),
            path: Some("/ws"),
            host: Some("h.example.com"),
            ..Default::default()
        };
        let transport = transport_block(&input).unwrap();
        let TransportOptions::WebSocket(ws) = transport.options else {
            panic!("expected websocket options");
        };
        assert_eq!(ws.headers.get("Host").map(String::as_str), Some("h.example.com"));
    }

    #[test]
    fn ws_explicit_headers_win_over_host() {
        let headers = Headers::from([("X-Test".to_string(), "1".to_string())]);
        let input = TransportInput {
            network: Some("ws"),
            host: Some("h.example.com"),
            headers: Some(&headers),
            ..Default::default()
        };
        let TransportOptions::WebSocket(ws) = transport_block(&input).unwrap().options else {
            panic!("expected websocket options");
        };
        assert_eq!(ws.headers, headers);
    }

    #[test]
    fn early_data_header_needs_length() {
        let input = TransportInput {
            network: Some("ws"),
            early_data_header: Some("Sec-WebSocket-Protocol"),
            ..Default::default()
        };
        let TransportOptions::WebSocket(ws) = transport_block(&input).unwrap().options else {
            panic!("expected websocket options");
        };
        assert_eq!(ws.max_early_data, None);
        assert_eq!(ws.early_data_header_name, None);
    }

    #[test]
    fn httpupgrade_falls_back_to_generic_fields() {
        let input = TransportInput {
            network: Some("httpupgrade"),
            path: Some("/generic"),
            host: Some("generic.host"),
            http_upgrade_path: Some("/up"),
            ..Default::default()
        };
        let TransportOptions::HttpUpgrade(up) = transport_block(&input).unwrap().options else {
            panic!("expected httpupgrade options");
        };
        assert_eq!(up.path.as_deref(), Some("/up"));
        assert_eq!(up.host.as_deref(), Some("generic.host"));
    }

    #[test]
    fn http_path_list_form_prefers_array() {
        let paths = vec!["/a".to_string(), "/b".to_string()];
        let input = TransportInput {
            network: Some("http"),
            path: Some("/single"),
            http_paths: Some(paths.as_slice()),
            ..Default::default()
        };
        let TransportOptions::Http(http) = transport_block(&input).unwrap().options else {
            panic!("expected http options");
        };
        assert_eq!(http.path, Some(HttpPath::List(paths.clone())));

        let empty: Vec<String> = Vec::new();
        let input = TransportInput {
            network: Some("http"),
            path: Some("/single"),
            http_paths: Some(empty.as_slice()),
            ..Default::default()
        };
        let TransportOptions::Http(http) = transport_block(&input).unwrap().options else {
            panic!("expected http options");
        };
        assert_eq!(http.path, Some(HttpPath::List(vec!["/single".to_string()])));
    }

    #[test]
    fn kcp_and_quic_carry_seed_and_header_type() {
        let input = TransportInput {
            network: Some("kcp"),
            path: Some("/ignored"),
            seed: Some("s"),
            header_type: Some("wechat-video"),
            ..Default::default()
        };
        let value = serde_json::to_value(transport_block(&input).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "kcp", "seed": "s", "header": {"type": "wechat-video"}})
        );

        let bare = TransportInput {
            network: Some("quic"),
            ..Default::default()
        };
        let value = serde_json::to_value(transport_block(&bare).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"type": "quic"}));
    }

    #[test]
    fn unknown_network_is_bare() {
        let input = TransportInput {
            network: Some("splithttp"),
            ..Default::default()
        };
        let value = serde_json::to_value(transport_block(&input).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"type": "splithttp"}));
    }

    #[test]
    fn utls_nested_under_tls() {
        let tls = tls_block(TlsInput {
            sni: Some("s"),
            fingerprint: Some("chrome"),
            ..Default::default()
        });
        let value = serde_json::to_value(&tls).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "enabled": true,
                "server_name": "s",
                "utls": {"enabled": true, "fingerprint": "chrome"}
            })
        );
    }
}
