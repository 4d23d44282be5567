//! Cookie parsing.
//!
//! Two inputs are understood:
//! - Netscape cookie-jar files (`cookies.txt`), tab separated, as written
//!   by curl and most browser export extensions
//! - `document.cookie` header strings (`a=1; b=2`), which only carry
//!   names and values
//!
//! Jar cookies win over header cookies with the same name.

use std::collections::HashSet;

use log::debug;

use super::reader::{Cookie, CookieExpiry};

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Parse a Netscape cookie jar. Malformed lines are skipped.
pub fn parse_cookie_jar(content: &str) -> Vec<Cookie> {
    let mut cookies = Vec::new();

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        // curl marks httponly cookies with a comment-like prefix
        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None if line.starts_with('#') => continue,
            None => (line, false),
        };

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 7 {
            debug!("cookie jar line {}: expected 7 fields, got {}", lineno + 1, fields.len());
            continue;
        }

        let expires = match fields[4].parse::<i64>() {
            Ok(0) => CookieExpiry::Session,
            Ok(ts) => CookieExpiry::At(ts),
            Err(_) => {
                debug!("cookie jar line {}: bad expiry '{}'", lineno + 1, fields[4]);
                continue;
            }
        };

        let name = fields[5].to_string();
        let value = fields[6].to_string();

        cookies.push(Cookie {
            size: name.len() + value.len(),
            name,
            value,
            domain: fields[0].to_string(),
            path: fields[2].to_string(),
            expires,
            http_only,
            secure: fields[3].eq_ignore_ascii_case("TRUE"),
            same_site: String::new(),
        });
    }

    cookies
}

/// Parse a `document.cookie` style string for `host`.
pub fn parse_cookie_header(header: &str, host: &str) -> Vec<Cookie> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = match pair.split_once('=') {
                Some((n, v)) => (n.trim(), v.trim()),
                None => (pair.trim(), ""),
            };
            if name.is_empty() {
                return None;
            }
            Some(Cookie {
                name: name.to_string(),
                value: value.to_string(),
                domain: host.to_string(),
                path: "/".to_string(),
                expires: CookieExpiry::Session,
                size: name.len() + value.len(),
                http_only: false,
                secure: false,
                same_site: String::new(),
            })
        })
        .collect()
}

/// Append header cookies whose names the jar did not already provide.
pub fn merge(mut jar: Vec<Cookie>, header: Vec<Cookie>) -> Vec<Cookie> {
    let seen: HashSet<String> = jar.iter().map(|c| c.name.clone()).collect();
    jar.extend(header.into_iter().filter(|c| !seen.contains(&c.name)));
    jar
}
