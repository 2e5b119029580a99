//! Hostname aliases
//!
//! Maps alternate hostnames onto the canonical hostname a site is
//! registered under. Configured as `canon=alias1,alias2;canon2=alias3`.

/// Ordered canonical host -> alias hosts mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: Vec<(String, Vec<String>)>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; entries are scanned in insertion order
    pub fn with_entry<I, S>(mut self, canonical: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.push((
            canonical.into().to_lowercase(),
            aliases.into_iter().map(|a| a.into().to_lowercase()).collect(),
        ));
        self
    }

    /// Parse the `canon=alias1,alias2;canon2=alias3` format
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut map = Self::new();
        for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (canonical, aliases) = entry
                .split_once('=')
                .ok_or_else(|| format!("entry '{}' is missing '='", entry))?;
            let canonical = canonical.trim();
            if canonical.is_empty() {
                return Err(format!("entry '{}' has an empty canonical host", entry));
            }
            let aliases: Vec<&str> = aliases
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .collect();
            map = map.with_entry(canonical, aliases);
        }
        Ok(map)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical host for `host`: the first entry whose alias set contains
    /// it, or `host` itself
    pub fn canonical<'a>(&'a self, host: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| a == host))
            .map(|(canonical, _)| canonical.as_str())
            .unwrap_or(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let map = AliasMap::parse("canon.example = alt.example, www.alt.example ; other.example=o.example")
            .unwrap();
        assert_eq!(map.canonical("alt.example"), "canon.example");
        assert_eq!(map.canonical("www.alt.example"), "canon.example");
        assert_eq!(map.canonical("o.example"), "other.example");
        assert_eq!(map.canonical("canon.example"), "canon.example");
        assert_eq!(map.canonical("unknown.example"), "unknown.example");
    }

    #[test]
    fn test_first_entry_wins() {
        let map = AliasMap::new()
            .with_entry("first.example", ["shared.example"])
            .with_entry("second.example", ["shared.example"]);
        assert_eq!(map.canonical("shared.example"), "first.example");
    }

    #[test]
    fn test_parse_errors() {
        assert!(AliasMap::parse("").unwrap().is_empty());
        assert!(AliasMap::parse("no-equals-sign").is_err());
        assert!(AliasMap::parse("=alias.example").is_err());
    }
}
