//! Version routing for frontend symbols
//!
//! A frontend may register several implementations of one symbol, each
//! tagged with the library versions it serves:
//!
//! - `name_v_1p11_and_below`
//! - `name_v_1p12_and_above`
//! - `name_v_1p9_to_1p11`
//!
//! where `p` stands for the version dot. The canonical `name` binds to the
//! first tagged symbol, in registration order, whose range holds the
//! detected version. Tagged symbols stay callable under their full name.
//!
//! Versions compare as integers: build metadata after `+` is dropped and
//! the dots are removed, so `1.12` becomes `112`. Tags and detected
//! versions of one library must therefore carry the same number of
//! components.

use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::RwLock;

use crate::error::{Error, Result};

static OVERRIDES: LazyLock<RwLock<HashMap<&'static str, String>>> = LazyLock::new(Default::default);

/// Parse a version string to its comparable integer form
pub fn parse_version(version: &str) -> Result<u64> {
    let release = version.split('+').next().unwrap_or_default().trim();
    let digits: String = release.chars().filter(|&c| c != '.').collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_argument("version", format!("cannot parse version '{version}'")));
    }
    digits
        .parse()
        .map_err(|_| Error::invalid_argument("version", format!("version '{version}' is out of range")))
}

/// Versions a tagged symbol serves
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VersionRange {
    /// `_v_X_to_Y`, inclusive at both ends
    Between(u64, u64),
    /// `_v_X_and_above`
    AndAbove(u64),
    /// `_v_X_and_below`
    AndBelow(u64),
}

impl VersionRange {
    /// Whether `version` lies in the range
    pub fn contains(self, version: u64) -> bool {
        match self {
            Self::Between(lo, hi) => (lo..=hi).contains(&version),
            Self::AndAbove(lo) => version >= lo,
            Self::AndBelow(hi) => version <= hi,
        }
    }
}

fn tag_version(tag: &str) -> Option<u64> {
    parse_version(&tag.replace('p', ".")).ok()
}

/// Split a tagged symbol into its canonical name and range.
///
/// Returns `None` for untagged names and malformed tags.
pub fn parse_tag(symbol: &str) -> Option<(&str, VersionRange)> {
    let (canonical, tag) = symbol.split_once("_v_")?;
    let range = if let Some(v) = tag.strip_suffix("_and_above") {
        VersionRange::AndAbove(tag_version(v)?)
    } else if let Some(v) = tag.strip_suffix("_and_below") {
        VersionRange::AndBelow(tag_version(v)?)
    } else {
        let (lo, hi) = tag.split_once("_to_")?;
        VersionRange::Between(tag_version(lo)?, tag_version(hi)?)
    };
    Some((canonical, range))
}

/// Canonical aliases for `version`, as `(canonical, tagged)` pairs.
///
/// Symbols are visited in the given order and the first match binds each
/// canonical name; later matches are ignored.
pub fn route<'a>(symbols: impl IntoIterator<Item = &'a str>, version: u64) -> Vec<(&'a str, &'a str)> {
    let mut bound: Vec<(&str, &str)> = Vec::new();
    for symbol in symbols {
        let Some((canonical, range)) = parse_tag(symbol) else {
            continue;
        };
        if range.contains(version) && !bound.iter().any(|(c, _)| *c == canonical) {
            bound.push((canonical, symbol));
        }
    }
    bound
}

/// An emulated library and how its version is detected
#[derive(Debug)]
pub struct Library {
    /// Library name, also the key for [`Library::set_version`]
    pub name: &'static str,
    /// Environment variable holding the version
    pub env: &'static str,
    /// Latest supported version, used when nothing else is set
    pub pinned: &'static str,
}

impl Library {
    /// Detected version: a runtime override, then the environment variable,
    /// then the pinned latest
    pub fn version(&self) -> String {
        if let Some(v) = OVERRIDES.read().get(self.name) {
            return v.clone();
        }
        match std::env::var(self.env) {
            Ok(v) if parse_version(&v).is_ok() => v,
            Ok(v) => {
                tracing::warn!(library = self.name, value = %v, "ignoring unparseable version");
                self.pinned.to_string()
            }
            Err(_) => self.pinned.to_string(),
        }
    }

    /// Emulate `version` from now on; `None` returns to detection
    pub fn set_version(&self, version: Option<&str>) -> Result<()> {
        let mut overrides = OVERRIDES.write();
        match version {
            Some(v) => {
                parse_version(v)?;
                tracing::debug!(library = self.name, version = v, "version override");
                overrides.insert(self.name, v.to_string());
            }
            None => {
                overrides.remove(self.name);
            }
        }
        Ok(())
    }
}

/// Version-tagged implementations of one frontend symbol
#[derive(Debug)]
pub struct Versioned<F: 'static> {
    /// Canonical symbol name
    pub canonical: &'static str,
    /// Library whose version selects the implementation
    pub library: &'static Library,
    /// Tagged implementations in registration order
    pub symbols: &'static [(&'static str, F)],
}

impl<F: Copy> Versioned<F> {
    /// Implementation the canonical name binds to at the detected version
    pub fn resolve(&self) -> Result<F> {
        let version = self.library.version();
        let number = parse_version(&version)?;
        let routed = route(self.symbols.iter().map(|(name, _)| *name), number);
        let tagged = routed
            .iter()
            .find(|(canonical, _)| *canonical == self.canonical)
            .map(|(_, tagged)| *tagged)
            .ok_or_else(|| Error::VersionUnsupported {
                symbol: format!("{}.{}", self.library.name, self.canonical),
                version: version.clone(),
            })?;
        tracing::debug!(library = self.library.name, version = %version, symbol = tagged, "version routing");
        self.get(tagged)
    }

    /// A tagged implementation by its full name, regardless of version
    pub fn get(&self, tagged: &str) -> Result<F> {
        self.symbols
            .iter()
            .find(|(name, _)| *name == tagged)
            .map(|(_, f)| *f)
            .ok_or_else(|| Error::UnknownOperator {
                name: tagged.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("1.12").unwrap(), 112);
        assert_eq!(parse_version("2.1.0+cu118").unwrap(), 210);
        assert_eq!(parse_version("0.4.6").unwrap(), 46);
        assert!(parse_version("latest").is_err());
        assert!(parse_version("").is_err());
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_tag("foo_v_1p11_and_below"), Some(("foo", VersionRange::AndBelow(111))));
        assert_eq!(parse_tag("foo_v_1p12_and_above"), Some(("foo", VersionRange::AndAbove(112))));
        assert_eq!(parse_tag("foo_v_1p9_to_1p11"), Some(("foo", VersionRange::Between(19, 111))));
        assert_eq!(parse_tag("foo"), None);
        assert_eq!(parse_tag("foo_v_1p12_sometimes"), None);
    }

    #[test]
    fn test_route_first_match_binds() {
        let symbols = ["foo_v_1p10_and_above", "foo_v_1p12_and_above", "bar_v_1p0_to_1p11"];
        assert_eq!(route(symbols, 112), vec![("foo", "foo_v_1p10_and_above")]);
        assert_eq!(
            route(symbols, 110),
            vec![("foo", "foo_v_1p10_and_above"), ("bar", "bar_v_1p0_to_1p11")]
        );
        assert!(route(symbols, 19).iter().all(|(c, _)| *c == "bar"));
    }
}
