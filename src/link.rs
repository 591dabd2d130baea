//! Share-link grammar shared by every protocol module.
//!
//! A link body (after the scheme) is split as `main[?query][#fragment]`; `main` is further
//! split on its **last** `@` into userinfo and `host:port`. Hosts may be IPv6 literals in
//! `[addr]:port` form. Query values go through `application/x-www-form-urlencoded` decoding.

use crate::error::{CodecError, Result};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

/// Returns the body after the first matching scheme prefix.
pub(crate) fn strip_scheme<'a>(link: &'a str, schemes: &[&str]) -> Result<&'a str> {
    schemes
        .iter()
        .find_map(|scheme| link.strip_prefix(scheme))
        .ok_or_else(|| CodecError::UnsupportedScheme(scheme_of(link).to_string()))
}

/// Scheme part of a link for error messages (`foo` for `foo://x`).
pub(crate) fn scheme_of(link: &str) -> &str {
    link.split_once("://").map(|(s, _)| s).unwrap_or(link)
}

/// A link body split into its main part, query parameters and decoded fragment.
#[derive(Debug)]
pub(crate) struct LinkParts<'a> {
    pub main: &'a str,
    pub query: QueryParams,
    pub name: Option<String>,
}

impl LinkParts<'_> {
    /// Display name from the fragment, or `default` when the fragment is absent or blank.
    pub fn name_or(&self, default: &str) -> String {
        self.name.clone().unwrap_or_else(|| default.to_string())
    }
}

pub(crate) fn split_link(body: &str) -> LinkParts<'_> {
    let (before_hash, fragment) = match body.split_once('#') {
        Some((before, fragment)) => (before, Some(fragment)),
        None => (body, None),
    };
    let (main, query) = match before_hash.split_once('?') {
        Some((main, query)) => (main, query),
        None => (before_hash, ""),
    };
    LinkParts {
        main,
        query: QueryParams::parse(query),
        name: fragment.and_then(decode_name),
    }
}

/// Query-unescapes a fragment (`+` is a space). Blank names yield `None`.
fn decode_name(fragment: &str) -> Option<String> {
    let spaced = fragment.replace('+', " ");
    let decoded = urlencoding::decode(&spaced)
        .map(|cow| cow.into_owned())
        .unwrap_or(spaced);
    let trimmed = decoded.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// `#name` with percent-encoding, or an empty string for a blank name.
pub(crate) fn encode_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        String::new()
    } else {
        format!("#{}", urlencoding::encode(name))
    }
}

/// Percent-decodes a userinfo component, keeping the raw text if it is not valid UTF-8.
pub(crate) fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Percent-decoded primary credential (password or UUID) of `main`; empty is malformed.
pub(crate) fn credential(raw: &str, main: &str) -> Result<String> {
    let decoded = decode_component(raw);
    if decoded.is_empty() {
        return Err(CodecError::malformed("empty credential", main));
    }
    Ok(decoded)
}

/// Splits `userinfo@host:port` on the last `@`.
pub(crate) fn split_userinfo(main: &str) -> Result<(&str, &str)> {
    main.rsplit_once('@')
        .ok_or_else(|| CodecError::malformed("missing '@'", main))
}

/// Standard URI `user[:password]`, percent-decoded. Empty parts are absent.
pub(crate) fn split_user_password(userinfo: &str) -> (Option<String>, Option<String>) {
    let (user, password) = match userinfo.split_once(':') {
        Some((user, password)) => (user, Some(password)),
        None => (userinfo, None),
    };
    let non_empty = |raw: &str| Some(decode_component(raw)).filter(|s| !s.is_empty());
    (non_empty(user), password.and_then(non_empty))
}

/// `user:password@`, `user@` or nothing, percent-encoded.
pub(crate) fn join_user_password(user: Option<&str>, password: Option<&str>) -> String {
    let user = urlencoding::encode(user.unwrap_or_default());
    match password {
        Some(password) => format!("{}:{}@", user, urlencoding::encode(password)),
        None if user.is_empty() => String::new(),
        None => format!("{user}@"),
    }
}

/// Parses `host:port` or `[v6]:port`; anything after the first `/` (SIP002 trailing slash,
/// HTTP proxy path) is ignored.
pub(crate) fn parse_host_port(input: &str) -> Result<(String, u16)> {
    let authority = input.split('/').next().unwrap_or_default();

    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| CodecError::malformed("missing ']'", input))?;
        let port = after
            .strip_prefix(':')
            .ok_or_else(|| CodecError::malformed("missing ':' in host:port", input))?;
        (host, port)
    } else {
        authority
            .rsplit_once(':')
            .ok_or_else(|| CodecError::malformed("missing ':' in host:port", input))?
    };

    if host.is_empty() {
        return Err(CodecError::malformed("empty host", input));
    }
    Ok((host.to_string(), parse_port(port)?))
}

/// Parses a port in 1..=65535.
pub(crate) fn parse_port(input: &str) -> Result<u16> {
    match input.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(CodecError::port(input)),
    }
}

/// Joins host and port, bracketing IPv6 literals.
pub(crate) fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Decodes URL-safe unpadded base64, falling back to standard padded base64.
pub(crate) fn decode_base64(input: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(input)
        .or_else(|_| STANDARD.decode(input))
        .map_err(|e| CodecError::InvalidCredentialsEncoding(format!("'{input}': {e}")))
}

/// Like [`decode_base64`] but also requires UTF-8 text.
pub(crate) fn decode_base64_text(input: &str) -> Result<String> {
    String::from_utf8(decode_base64(input)?)
        .map_err(|e| CodecError::InvalidCredentialsEncoding(format!("'{input}': {e}")))
}

pub(crate) fn encode_base64(input: &str) -> String {
    URL_SAFE_NO_PAD.encode(input.as_bytes())
}

/// Parsed `?query` pairs in link order. Lookups return the first non-empty value.
#[derive(Debug, Default)]
pub(crate) struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(query: &str) -> Self {
        QueryParams {
            pairs: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    /// First key in `keys` that carries a value.
    pub fn get_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    pub fn string_any(&self, keys: &[&str]) -> Option<String> {
        self.get_any(keys).map(str::to_string)
    }

    /// `1` and `true` are on; anything else (or absence) is off.
    pub fn flag_any(&self, keys: &[&str]) -> bool {
        keys.iter()
            .filter_map(|key| self.get(key))
            .any(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }

    pub fn flag(&self, key: &str) -> bool {
        self.flag_any(&[key])
    }

    /// Parses a numeric value; unparseable values are dropped with a warning.
    pub fn number_any<T: FromStr>(&self, keys: &[&str]) -> Option<T> {
        let raw = self.get_any(keys)?;
        match raw.trim().parse() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!(key = keys[0], value = raw, "ignoring non-numeric query value");
                None
            }
        }
    }

    pub fn number<T: FromStr>(&self, key: &str) -> Option<T> {
        self.number_any(&[key])
    }

    pub fn alpn(&self) -> Vec<String> {
        self.get("alpn").map(split_alpn).unwrap_or_default()
    }
}

/// Comma-separated ALPN list; blank entries are dropped.
pub(crate) fn split_alpn(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builds a `?k=v&...` query, skipping absent and default values.
#[derive(Debug, Default)]
pub(crate) struct QueryBuilder {
    params: Vec<String>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.params
                .push(format!("{}={}", key, urlencoding::encode(value)));
        }
    }

    pub fn push_opt(&mut self, key: &str, value: &Option<String>) {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    pub fn push_flag(&mut self, key: &str, on: bool) {
        if on {
            self.params.push(format!("{key}=1"));
        }
    }

    pub fn push_num<T: Display>(&mut self, key: &str, value: Option<T>) {
        if let Some(value) = value {
            self.params.push(format!("{key}={value}"));
        }
    }

    pub fn push_list(&mut self, key: &str, values: &[String]) {
        self.push(key, &values.join(","));
    }

    /// `?a=b&c=d`, or an empty string if nothing was pushed.
    pub fn finish(self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!("?{}", self.params.join("&"))
        }
    }
}

/// Value of an optional text field, treating the empty string as absent.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

/// Deserializes ALPN from stored config as either a comma string or a list.
pub(crate) fn deserialize_alpn<'de, D>(d: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Alpn {
        Text(String),
        List(Vec<String>),
    }
    match Option::<Alpn>::deserialize(d)? {
        None => Ok(Vec::new()),
        Some(Alpn::Text(s)) => Ok(split_alpn(&s)),
        Some(Alpn::List(list)) => Ok(list
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()),
    }
}

/// Deserializes an optional non-negative number, accepting `0` as absent.
pub(crate) fn deserialize_opt_u32<'de, D>(d: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<i64>::deserialize(d)? {
        None | Some(0) => Ok(None),
        Some(n) => u32::try_from(n).map(Some).map_err(D::Error::custom),
    }
}
