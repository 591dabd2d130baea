//! Shared constants for link schemes, default node names and query keys.
//!
//! Query keys are part of the share-link compatibility contract: decoders accept every alias
//! listed here, encoders only ever emit the first (canonical) key of each group.

/// Link URI scheme prefixes (with `://`). Matching is case-sensitive.
pub mod scheme {
    /// Shadowsocks: `ss://`
    pub const SHADOWSOCKS: &str = "ss://";
    /// VLESS: `vless://`
    pub const VLESS: &str = "vless://";
    /// VMess: `vmess://`
    pub const VMESS: &str = "vmess://";
    /// Trojan: `trojan://`
    pub const TROJAN: &str = "trojan://";
    /// Hysteria2: `hysteria2://`
    pub const HYSTERIA2: &str = "hysteria2://";
    /// Hysteria2 short form: `hy2://`
    pub const HY2: &str = "hy2://";
    /// TUIC: `tuic://`
    pub const TUIC: &str = "tuic://";
    /// AnyTLS: `anytls://`
    pub const ANYTLS: &str = "anytls://";
    /// SOCKS5: `socks5://`
    pub const SOCKS5: &str = "socks5://";
    /// SOCKS5 short form: `socks://`
    pub const SOCKS: &str = "socks://";
    /// Plain HTTP proxy: `http://`
    pub const HTTP: &str = "http://";
    /// HTTP proxy over TLS: `https://`
    pub const HTTPS: &str = "https://";
}

/// Names used when a link carries no `#fragment`.
pub mod default_name {
    pub const SHADOWSOCKS: &str = "SS Node";
    pub const VLESS: &str = "VLESS Node";
    pub const VMESS: &str = "VMess Node";
    pub const TROJAN: &str = "Trojan Node";
    pub const HYSTERIA2: &str = "Hysteria2 Node";
    pub const TUIC: &str = "TUIC Node";
    pub const ANYTLS: &str = "AnyTLS Node";
    pub const SOCKS5: &str = "SOCKS5 Node";
    pub const HTTP: &str = "HTTP Node";
}

/// Query keys. Slices list the canonical key first, then accepted aliases.
pub mod key {
    pub const INSECURE: &[&str] = &["insecure", "allowInsecure"];
    pub const ALLOW_INSECURE: &[&str] = &["allowInsecure", "insecure"];
    pub const SNI: &[&str] = &["sni", "peer"];
    pub const SERVICE_NAME: &[&str] = &["serviceName", "service_name", "grpc-service-name"];
    pub const UP: &[&str] = &["up", "up_mbps", "upmbps"];
    pub const DOWN: &[&str] = &["down", "down_mbps", "downmbps"];
    pub const HOP_INTERVAL: &[&str] = &["hopInterval", "hop_interval"];
}

/// Network kind that never produces a transport block.
pub const DEFAULT_NETWORK: &str = "tcp";
