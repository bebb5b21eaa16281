use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::models::Account;
use super::store::AccountStore;
use crate::error::{AppError, AppResult};

/// Slug, then an optional single `+tag`, then the domain.
static MAILBOX_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<slug>[A-Za-z0-9_-]+)(\+[A-Za-z0-9_]+)?@.+$").expect("invalid mailbox regex")
});

const DISPLAY_NAME_SPECIALS: &[char] = &[
    '(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"',
];

/// key: mailbox-address -> display name plus bare address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mailbox {
    pub display_name: Option<String>,
    pub address: String,
}

impl Mailbox {
    /// Splits a raw header value such as `"Acme Support" <acme@helpful.io>`
    /// into its display name and bare address. Inputs without angle brackets
    /// are taken as the bare address.
    pub fn parse(raw: &str) -> Self {
        let raw = strip_comments(raw.trim());
        let raw = raw.trim();

        if let (Some(open), Some(close)) = (raw.rfind('<'), raw.rfind('>')) {
            if open < close {
                let address = raw[open + 1..close].trim().to_string();
                let display = unquote(raw[..open].trim());
                return Self {
                    display_name: (!display.is_empty()).then_some(display),
                    address,
                };
            }
        }

        Self {
            display_name: None,
            address: raw.to_string(),
        }
    }

    pub fn local_part(&self) -> Option<&str> {
        self.address.rsplit_once('@').map(|(local, _)| local)
    }

    pub fn domain(&self) -> Option<&str> {
        self.address.rsplit_once('@').map(|(_, domain)| domain)
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_name.as_deref().filter(|name| !name.is_empty()) {
            Some(name) if name.contains(DISPLAY_NAME_SPECIALS) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{}>", self.address)
            }
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// Address customers write to in order to reach `account`.
pub fn mailbox(account: &Account, incoming_email_domain: &str) -> Mailbox {
    Mailbox {
        display_name: Some(account.name.clone()),
        address: format!("{}@{}", account.slug, incoming_email_domain),
    }
}

/// Pulls the account slug out of a raw address, ignoring any `+tag`.
pub fn extract_slug(raw: &str) -> Option<String> {
    let mailbox = Mailbox::parse(raw);
    MAILBOX_PATTERN
        .captures(&mailbox.address)
        .and_then(|captures| captures.name("slug"))
        .map(|slug| slug.as_str().to_string())
}

/// Resolves an inbound address to its account. Addresses that don't look
/// like a mailbox resolve to `None`, same as an unknown slug.
pub async fn match_mailbox(store: &dyn AccountStore, raw: &str) -> AppResult<Option<Account>> {
    let Some(slug) = extract_slug(raw) else {
        tracing::debug!(address = raw, "address does not match mailbox pattern");
        return Ok(None);
    };
    store.find_by_slug(&slug).await
}

/// Like [`match_mailbox`], but a miss is [`AppError::NotFound`]. Malformed
/// addresses are reported the same way as unknown slugs.
pub async fn match_mailbox_strict(store: &dyn AccountStore, raw: &str) -> AppResult<Account> {
    match_mailbox(store, raw).await?.ok_or(AppError::NotFound)
}

fn strip_comments(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;
    for ch in raw.chars() {
        if escaped {
            if depth == 0 {
                out.push(ch);
            }
            escaped = false;
            continue;
        }
        match ch {
            '\\' => {
                escaped = true;
                if depth == 0 {
                    out.push(ch);
                }
            }
            '"' if depth == 0 => {
                in_quotes = !in_quotes;
                out.push(ch);
            }
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes && depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

fn unquote(value: &str) -> String {
    let inner = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strips_display_name_and_brackets() {
        let parsed = Mailbox::parse("\"Acme Support\" <acme@helpful.io>");
        assert_eq!(parsed.display_name.as_deref(), Some("Acme Support"));
        assert_eq!(parsed.address, "acme@helpful.io");
        assert_eq!(parsed.local_part(), Some("acme"));
        assert_eq!(parsed.domain(), Some("helpful.io"));

        let bare = Mailbox::parse("  acme@helpful.io ");
        assert_eq!(bare.display_name, None);
        assert_eq!(bare.address, "acme@helpful.io");

        let unquoted = Mailbox::parse("Acme <acme@helpful.io>");
        assert_eq!(unquoted.display_name.as_deref(), Some("Acme"));
    }

    #[test]
    fn parse_drops_comments() {
        let parsed = Mailbox::parse("acme@helpful.io (Acme inbound)");
        assert_eq!(parsed.address, "acme@helpful.io");

        let quoted = Mailbox::parse("\"Acme (EU)\" <acme@helpful.io>");
        assert_eq!(quoted.display_name.as_deref(), Some("Acme (EU)"));
    }

    #[test]
    fn display_quotes_names_with_specials() {
        let plain = Mailbox {
            display_name: Some("Acme".into()),
            address: "acme@helpful.io".into(),
        };
        assert_eq!(plain.to_string(), "Acme <acme@helpful.io>");

        let special = Mailbox {
            display_name: Some("Acme, Inc.".into()),
            address: "acme-inc@helpful.io".into(),
        };
        assert_eq!(special.to_string(), "\"Acme, Inc.\" <acme-inc@helpful.io>");
        assert_eq!(Mailbox::parse(&special.to_string()), special);

        let bare = Mailbox {
            display_name: None,
            address: "acme@helpful.io".into(),
        };
        assert_eq!(bare.to_string(), "acme@helpful.io");
    }

    #[test]
    fn extract_slug_ignores_tag() {
        assert_eq!(extract_slug("acme@helpful.io").as_deref(), Some("acme"));
        assert_eq!(
            extract_slug("acme+support@helpful.io").as_deref(),
            Some("acme")
        );
        assert_eq!(
            extract_slug("Acme <big-co_2@helpful.io>").as_deref(),
            Some("big-co_2")
        );
    }

    #[test]
    fn extract_slug_rejects_malformed_addresses() {
        assert_eq!(extract_slug("@helpful.io"), None);
        assert_eq!(extract_slug("acme"), None);
        assert_eq!(extract_slug("acme@"), None);
        assert_eq!(extract_slug("ac.me@helpful.io"), None);
        assert_eq!(extract_slug("acme+a+b@helpful.io"), None);
        assert_eq!(extract_slug("acme+@helpful.io"), None);
        assert_eq!(extract_slug(""), None);
    }
}
