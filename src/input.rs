//! Sanitation of what the user types: a bare domain or an `alias@domain`
//! paymail address.

use crate::error::{InspectorError, Result};

/// Longest presentation-form domain name
const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Lowercase, trim and strip scheme, path, port and a leading `www.`
pub fn sanitize_domain(input: &str) -> String {
    let mut domain = input.trim().to_lowercase();

    for scheme in ["https://", "http://"] {
        if let Some(rest) = domain.strip_prefix(scheme) {
            domain = rest.to_string();
        }
    }
    if let Some(end) = domain.find(['/', '?', '#', ':']) {
        domain.truncate(end);
    }
    if let Some(rest) = domain.strip_prefix("www.") {
        domain = rest.to_string();
    }

    domain.trim_end_matches('.').to_string()
}

/// Split user input into `(domain, paymail address)`.
///
/// `"alias@Domain.com "` gives `("domain.com", Some("alias@domain.com"))`;
/// input without `@` is treated as a domain.
pub fn extract_parts(input: &str) -> (String, Option<String>) {
    let input = input.trim();

    match input.rsplit_once('@') {
        Some((alias, domain)) => {
            let alias = alias.trim().to_lowercase();
            let domain = sanitize_domain(domain);
            let address = format!("{}@{}", alias, domain);
            (domain, Some(address))
        }
        None => (sanitize_domain(input), None),
    }
}

/// Basic host name syntax: at least two labels, each 1-63 letters,
/// digits or hyphens, not starting or ending with a hyphen.
pub fn validate_domain(domain: &str) -> Result<()> {
    let invalid = |reason| InspectorError::InvalidDomain {
        domain: domain.to_string(),
        reason,
    };

    if domain.is_empty() {
        return Err(invalid("empty"));
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(invalid("too long"));
    }
    if !domain.contains('.') {
        return Err(invalid("missing a dot"));
    }

    for label in domain.trim_end_matches('.').split('.') {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(invalid("label length out of range"));
        }
        if !label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
        {
            return Err(invalid("invalid character"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid("label starts or ends with a hyphen"));
        }
    }

    Ok(())
}
