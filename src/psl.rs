use std::collections::HashSet;
use tracing::{debug, warn};

/// Public Suffix List rules used to find a domain's registrable name
/// (effective TLD + 1) and the public suffix above it.
#[derive(Debug, Clone, Default)]
pub struct PublicSuffixList {
    rules: HashSet<String>,
    /// `*.parent` rules, stored by parent
    wildcards: HashSet<String>,
    /// `!name` rules, stored without the marker
    exceptions: HashSet<String>,
}

impl PublicSuffixList {
    /// The complete list from publicsuffix.org, bundled with the crate
    pub fn bundled() -> Self {
        let mut psl = Self::default();
        psl.load_from_string(include_str!("../assets/public_suffix_list.dat"));
        psl
    }

    /// Add rules in PSL text format; returns how many rules were read
    pub fn load_from_string(&mut self, content: &str) -> usize {
        let mut count = 0;

        for line in content.lines() {
            // Rules end at the first whitespace
            let rule = line.split_whitespace().next().unwrap_or("");
            if rule.is_empty() || rule.starts_with("//") {
                continue;
            }
            let rule = rule.trim_end_matches('.').to_lowercase();

            // Lookups run on A-labels, so IDN rules are stored punycoded
            let (set, name) = if let Some(exception) = rule.strip_prefix('!') {
                (&mut self.exceptions, exception)
            } else if let Some(parent) = rule.strip_prefix("*.") {
                (&mut self.wildcards, parent)
            } else {
                (&mut self.rules, rule.as_str())
            };
            match ascii_name(name) {
                Some(name) => {
                    set.insert(name);
                    count += 1;
                }
                None => warn!("Skipping public suffix rule {}", rule),
            }
        }

        debug!("Loaded {} public suffix rules", count);
        count
    }

    /// Number of trailing labels of `labels` that form the public suffix
    fn suffix_label_count(&self, labels: &[&str]) -> usize {
        let total = labels.len();

        // Longest candidate first, so the first hit is the prevailing rule
        for i in 0..total {
            let candidate = labels[i..].join(".");
            if self.exceptions.contains(&candidate) {
                return total - i - 1;
            }
            if self.rules.contains(&candidate) {
                return total - i;
            }
            if i + 1 < total && self.wildcards.contains(&labels[i + 1..].join(".")) {
                return total - i;
            }
        }

        // Implicit "*" rule
        1
    }

    fn labels(domain: &str) -> Option<Vec<String>> {
        let domain = domain.trim_end_matches('.').to_lowercase();
        if domain.is_empty() || domain.split('.').any(str::is_empty) {
            return None;
        }
        Some(domain.split('.').map(str::to_string).collect())
    }

    /// The public suffix of `domain` (e.g. `co.uk` for `www.example.co.uk`)
    pub fn public_suffix(&self, domain: &str) -> Option<String> {
        let labels = Self::labels(domain)?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
        let count = self.suffix_label_count(&labels);
        Some(labels[labels.len() - count..].join("."))
    }

    /// The registrable domain (eTLD+1), or `None` when `domain` is itself a public suffix
    pub fn registrable_domain(&self, domain: &str) -> Option<String> {
        let labels = Self::labels(domain)?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
        let count = self.suffix_label_count(&labels);
        if labels.len() <= count {
            return None;
        }
        Some(labels[labels.len() - count - 1..].join("."))
    }
}

fn ascii_name(name: &str) -> Option<String> {
    if name.is_ascii() {
        return Some(name.to_string());
    }
    idna::domain_to_ascii(name).ok().filter(|ascii| !ascii.is_empty())
}
