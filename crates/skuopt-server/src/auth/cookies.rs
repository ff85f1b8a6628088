//! Reading and writing the provider's session cookies.
//!
//! The browser SDK stores the session under `sb-<project>-auth-token`. The
//! value is either a bare JWT, a JSON session (object or legacy array), or
//! `base64-` followed by base64url-encoded JSON. Values too large for one
//! cookie are split into `<name>.0`, `<name>.1`, ... chunks.

use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use skuopt_core::config::is_session_cookie_name;

const BASE64_PREFIX: &str = "base64-";
/// Matches the browser SDK so chunked cookies are interchangeable.
const MAX_CHUNK_LEN: usize = 3180;
const SESSION_MAX_AGE_SECS: u64 = 400 * 24 * 60 * 60;

/// All `name=value` pairs across every `Cookie` header.
pub(crate) fn request_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim().to_owned(), value.trim().to_owned()))
        })
        .collect()
}

/// Name without a trailing `.N` chunk index.
fn base_name(name: &str) -> (&str, Option<u32>) {
    if let Some((base, idx)) = name.rsplit_once('.') {
        if let Ok(idx) = idx.parse::<u32>() {
            return (base, Some(idx));
        }
    }
    (name, None)
}

/// True when the request carries any session cookie, valid or not.
pub(crate) fn has_session_cookie(headers: &HeaderMap) -> bool {
    request_cookies(headers)
        .iter()
        .any(|(name, _)| is_session_cookie_name(base_name(name).0))
}

/// The raw (still encoded) session cookie value, re-joining chunks.
pub(crate) fn session_cookie_value(headers: &HeaderMap) -> Option<String> {
    let cookies = request_cookies(headers);

    if let Some((_, value)) = cookies
        .iter()
        .find(|(name, value)| is_session_cookie_name(name) && !value.is_empty())
    {
        return Some(value.clone());
    }

    let mut chunks: Vec<(&str, u32, &str)> = cookies
        .iter()
        .filter_map(|(name, value)| match base_name(name) {
            (base, Some(idx)) if is_session_cookie_name(base) => Some((base, idx, value.as_str())),
            _ => None,
        })
        .collect();
    let first_base = chunks.first()?.0;
    chunks.retain(|(base, _, _)| *base == first_base);
    chunks.sort_by_key(|(_, idx, _)| *idx);
    Some(chunks.into_iter().map(|(_, _, v)| v).collect())
}

/// Percent-decodes and unwraps a `base64-` value into plain text.
pub(crate) fn decode_cookie_value(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    let decoded = decoded.trim();
    match decoded.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => {
            let bytes = URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')).ok()?;
            String::from_utf8(bytes).ok()
        }
        None => Some(decoded.to_owned()),
    }
}

/// Pulls the access token out of a session cookie value.
pub(crate) fn access_token_from_cookie(raw: &str) -> Option<String> {
    let text = decode_cookie_value(raw)?;
    let text = text.trim();

    if text.starts_with('{') || text.starts_with('[') {
        let value: Value = serde_json::from_str(text).ok()?;
        let token = match &value {
            Value::Object(map) => map.get("access_token").and_then(Value::as_str),
            Value::Array(items) => items.first().and_then(|first| match first {
                Value::String(s) => Some(s.as_str()),
                Value::Object(map) => map.get("access_token").and_then(Value::as_str),
                _ => None,
            }),
            _ => None,
        }?;
        return Some(token.to_owned()).filter(|t| !t.is_empty());
    }

    (text.split('.').count() == 3).then(|| text.to_owned())
}

pub(crate) fn verifier_cookie_name(session_cookie: &str) -> String {
    format!("{session_cookie}-code-verifier")
}

/// The PKCE verifier the browser stored next to the session cookie.
pub(crate) fn code_verifier(headers: &HeaderMap, session_cookie: &str) -> Option<String> {
    let name = verifier_cookie_name(session_cookie);
    let raw = request_cookies(headers)
        .into_iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v)?;
    let text = decode_cookie_value(&raw)?;
    let verifier = match serde_json::from_str::<Value>(&text) {
        Ok(Value::String(s)) => s,
        _ => text,
    };
    Some(verifier).filter(|v| !v.is_empty())
}

/// Encodes a session for the cookie and splits it into chunks when needed.
pub(crate) fn session_cookie_headers(
    session_cookie: &str,
    session_json: &Value,
    secure: bool,
) -> Vec<HeaderValue> {
    let value = format!(
        "{BASE64_PREFIX}{}",
        URL_SAFE_NO_PAD.encode(session_json.to_string())
    );
    let attrs = cookie_attributes(SESSION_MAX_AGE_SECS, secure);

    if value.len() <= MAX_CHUNK_LEN {
        return header_value(&format!("{session_cookie}={value}; {attrs}"))
            .into_iter()
            .collect();
    }

    value
        .as_bytes()
        .chunks(MAX_CHUNK_LEN)
        .enumerate()
        .filter_map(|(idx, chunk)| {
            let chunk = std::str::from_utf8(chunk).ok()?;
            header_value(&format!("{session_cookie}.{idx}={chunk}; {attrs}"))
        })
        .collect()
}

/// Expiring headers for the session cookie, any chunks the request sent,
/// and the PKCE verifier.
pub(crate) fn clear_session_headers(
    headers: &HeaderMap,
    session_cookie: &str,
    secure: bool,
) -> Vec<HeaderValue> {
    let mut names = vec![
        session_cookie.to_owned(),
        verifier_cookie_name(session_cookie),
    ];
    for (name, _) in request_cookies(headers) {
        if is_session_cookie_name(base_name(&name).0) && !names.contains(&name) {
            names.push(name);
        }
    }

    names
        .iter()
        .filter_map(|name| expired_cookie(name, secure))
        .collect()
}

/// A `Set-Cookie` value that deletes `name`.
pub(crate) fn expired_cookie(name: &str, secure: bool) -> Option<HeaderValue> {
    header_value(&format!("{name}=; {}", cookie_attributes(0, secure)))
}

fn cookie_attributes(max_age: u64, secure: bool) -> String {
    let mut attrs = format!("Path=/; Max-Age={max_age}; SameSite=Lax");
    if secure {
        attrs.push_str("; Secure");
    }
    attrs
}

fn header_value(cookie: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(cookie)
        .map_err(|e| tracing::warn!(error = %e, "dropping unencodable cookie"))
        .ok()
}
