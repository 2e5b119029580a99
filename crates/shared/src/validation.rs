//! Site field defaulting, normalization and validation
//!
//! Incoming site data goes through three stages before it reaches storage:
//! 1. defaulting rules, applied in order, each a pure function of the draft
//! 2. path normalization
//! 3. format validation

use crate::error::{SiteError, SiteResult};
use crate::types::SiteDraft;

/// A defaulting rule: takes the current draft and returns it, possibly changed
pub type DefaultingRule = fn(SiteDraft) -> SiteDraft;

/// Defaulting rules in the order they are applied.
/// Later rules see the output of earlier ones (label derives from the
/// identifier, which may itself derive from the hostname).
pub const DEFAULTING_RULES: &[DefaultingRule] = &[assign_identifier, assign_hostname, assign_label];

/// Site fields after defaults, normalization and validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteFields {
    pub identifier: String,
    pub hostname: String,
    pub path: String,
    pub label: String,
    pub is_mirrored: bool,
}

/// Run the full pipeline on a draft
pub fn prepare_site(draft: SiteDraft) -> SiteResult<SiteFields> {
    let draft = apply_defaults(draft);

    let identifier = draft.identifier.unwrap_or_default();
    let hostname = draft.hostname.unwrap_or_default();
    let label = draft.label.unwrap_or_default();
    let path = clean_path(draft.path.as_deref());

    if identifier.is_empty() {
        return Err(SiteError::Validation("identifier can't be blank".to_string()));
    }
    if !is_valid_identifier(&identifier) {
        return Err(SiteError::Validation(format!(
            "identifier '{}' is invalid",
            identifier
        )));
    }
    if label.trim().is_empty() {
        return Err(SiteError::Validation("label can't be blank".to_string()));
    }
    if hostname.is_empty() {
        return Err(SiteError::Validation("hostname can't be blank".to_string()));
    }
    if !is_valid_hostname(&hostname) {
        return Err(SiteError::Validation(format!(
            "hostname '{}' is invalid",
            hostname
        )));
    }

    Ok(SiteFields {
        identifier,
        // request hosts are lowercased before lookup
        hostname: hostname.to_lowercase(),
        path,
        label,
        is_mirrored: draft.is_mirrored,
    })
}

/// Apply every defaulting rule in order
pub fn apply_defaults(draft: SiteDraft) -> SiteDraft {
    DEFAULTING_RULES.iter().fold(draft, |draft, rule| rule(draft))
}

/// Blank identifier becomes the slugified hostname
pub fn assign_identifier(mut draft: SiteDraft) -> SiteDraft {
    if is_blank(draft.identifier.as_deref()) {
        draft.identifier = draft.hostname.as_deref().map(slugify);
    }
    draft
}

/// Missing hostname falls back to the identifier
pub fn assign_hostname(mut draft: SiteDraft) -> SiteDraft {
    if draft.hostname.is_none() {
        draft.hostname = draft.identifier.clone();
    }
    draft
}

/// Blank label becomes the titleized identifier
pub fn assign_label(mut draft: SiteDraft) -> SiteDraft {
    if is_blank(draft.label.as_deref()) {
        draft.label = draft.identifier.as_deref().map(titleize);
    }
    draft
}

/// Normalize a path prefix: squeeze repeated slashes and drop a trailing one
pub fn clean_path(path: Option<&str>) -> String {
    let path = path.unwrap_or("");
    let mut cleaned = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && cleaned.ends_with('/') {
            continue;
        }
        cleaned.push(c);
    }
    if cleaned.ends_with('/') {
        cleaned.pop();
    }
    cleaned
}

/// Identifier: a word character followed by letters, digits, `_` or `-`
pub fn is_valid_identifier(identifier: &str) -> bool {
    let mut chars = identifier.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Hostname: word characters, dots and hyphens with an optional numeric port
pub fn is_valid_hostname(hostname: &str) -> bool {
    let (host, port) = match hostname.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (hostname, None),
    };

    if host.is_empty()
        || !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
    {
        return false;
    }

    match port {
        Some(port) => !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()),
        None => true,
    }
}

/// Lowercase, with every run of non-alphanumeric characters collapsed into `-`
pub fn slugify(value: &str) -> String {
    value
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Human readable form of a slug: `my-site_name` becomes `My Site Name`
pub fn titleize(value: &str) -> String {
    value
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}
