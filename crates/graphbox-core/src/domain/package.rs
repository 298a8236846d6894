//! Package specifiers as the caller writes them (`name` or `name@version`).

use regex::Regex;
use std::sync::OnceLock;

fn spec_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Optional leading `@scope/`, then everything up to the next `@` is the name.
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<name>@?[^@\s]+)(?:@(?P<version>\S*))?$").expect("static regex is valid")
    })
}

/// A single dependency request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageSpec {
    /// Package name, including any `@scope/` prefix.
    pub name: String,
    /// Requested version or tag, when one was given.
    pub version: Option<String>,
}

impl PackageSpec {
    /// Parse a specifier. Returns `None` for blank or malformed input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let caps = spec_pattern().captures(trimmed)?;
        let name = caps.name("name")?.as_str().to_string();
        if name == "@" || name.ends_with('/') {
            return None;
        }
        let version = caps
            .name("version")
            .map(|m| m.as_str().to_string())
            .filter(|v| !v.is_empty());
        Some(Self { name, version })
    }

    /// Version to write into the manifest for a non-baseline package.
    pub fn version_or_latest(&self) -> &str {
        self.version.as_deref().unwrap_or("latest")
    }
}
