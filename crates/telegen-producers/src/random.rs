//! Sample-value tables and small randomizers shared by the producers.
//!
//! Values are plausible rather than valid: account ids, ARNs and request ids
//! follow the right shape but point at nothing.

use chrono::{SecondsFormat, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;

const ALNUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const UPPER_NUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const HEX: &[u8] = b"0123456789abcdef";

pub static ACCOUNT_IDS: &[&str] = &[
    "123456789012",
    "987654321098",
    "111122223333",
    "444455556666",
    "777788889999",
];
pub static REGIONS: &[&str] = &["us-east-1", "us-west-1", "us-west-2", "eu-west-1", "eu-central-1"];
pub static DOMAINS: &[&str] = &["example.com", "test.com", "sample.org", "demo.net"];
pub static HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];
pub static HTTP_SCHEMES: &[&str] = &["http", "https"];
pub static STATUSES: &[&str] = &["200", "400", "500"];
pub static CONTENT_TYPES: &[&str] = &["text/html", "application/json", "text/plain", "application/xml"];
pub static COUNTRY_CODES: &[&str] = &["US", "GB", "DE", "FR", "IN", "CN", "JP", "AU", "CA", "BR"];
pub static USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
    "curl/7.46.0",
    "aws-sdk-go-v2/1.24.0 os/linux lang/go#1.21",
    "python-requests/2.31.0",
];
pub static SSL_CIPHERS: &[&str] = &[
    "ECDHE-RSA-AES128-GCM-SHA256",
    "ECDHE-RSA-AES256-GCM-SHA384",
    "AES128-GCM-SHA256",
];
pub static TLS_PROTOCOLS: &[&str] = &["TLSv1.2", "TLSv1.3"];
pub static URI_PATHS: &[&str] = &["/", "/home", "/api/resource", "/login"];
pub static QUERY_STRINGS: &[&str] = &["", "a=1&b=2", "user=abc", "id=12345", "page=1", "search=term"];
pub static FRAGMENTS: &[&str] = &["", "#browser", "#app"];
pub static PHRASES: &[&str] = &[
    "some random phrase",
    "another random phrase",
    "yet another random phrase",
    "log on something",
];

/// First octets of public-looking addresses
static IP_PREFIXES: &[u8] = &[1, 8, 31, 41, 91, 123, 179, 201, 210, 250];

/// Uniform pick from a static table
pub fn pick<R: Rng>(rng: &mut R, items: &'static [&'static str]) -> &'static str {
    items.choose(rng).copied().unwrap_or_default()
}

fn string_from<R: Rng>(rng: &mut R, charset: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| charset[rng.random_range(0..charset.len())] as char)
        .collect()
}

/// `[A-Za-z0-9]{len}`
pub fn alnum_string<R: Rng>(rng: &mut R, len: usize) -> String {
    string_from(rng, ALNUM, len)
}

/// `[A-Z0-9]{len}`
pub fn upper_alnum_string<R: Rng>(rng: &mut R, len: usize) -> String {
    string_from(rng, UPPER_NUM, len)
}

pub fn hex_string<R: Rng>(rng: &mut R, len: usize) -> String {
    string_from(rng, HEX, len)
}

pub fn uuid<R: Rng>(rng: &mut R) -> String {
    uuid::Builder::from_random_bytes(rng.random())
        .into_uuid()
        .to_string()
}

pub fn ip<R: Rng>(rng: &mut R) -> String {
    let first = IP_PREFIXES[rng.random_range(0..IP_PREFIXES.len())];
    format!(
        "{first}.{}.{}.{}",
        rng.random_range(0..=255u8),
        rng.random_range(0..=255u8),
        rng.random_range(1..=254u8)
    )
}

/// Ephemeral-looking port in 58080..59090
pub fn port<R: Rng>(rng: &mut R) -> u16 {
    rng.random_range(58080..59090)
}

pub fn bytes_size<R: Rng>(rng: &mut R) -> u32 {
    rng.random_range(200..5000)
}

/// Seconds in 0.5..1.5
pub fn processing_time<R: Rng>(rng: &mut R) -> f32 {
    rng.random_range(0.5..1.5)
}

pub fn account_id<R: Rng>(rng: &mut R) -> &'static str {
    pick(rng, ACCOUNT_IDS)
}

pub fn region<R: Rng>(rng: &mut R) -> &'static str {
    pick(rng, REGIONS)
}

/// Space-separated phrases, at least `min_len` bytes long
pub fn phrase_text<R: Rng>(rng: &mut R, min_len: usize) -> String {
    let mut out = String::with_capacity(min_len + 32);
    while out.len() < min_len {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(pick(rng, PHRASES));
    }
    out
}

/// `2024-05-01T12:00:00.123456Z`
pub fn iso8601_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn unix_seconds(offset: i64) -> i64 {
    Utc::now().timestamp() + offset
}
