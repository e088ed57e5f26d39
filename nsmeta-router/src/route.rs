//! Route and cell-address value types (spec §4.2).

use std::fmt;
use std::str::FromStr;

/// The literal domain name that makes a bare cell name match a `Wellknown`
/// route (spec §4.2: "matches when message's domain is the literal string
/// `local`").
pub const LOCAL_DOMAIN: &str = "local";

#[derive(Debug, thiserror::Error)]
#[error("invalid cell address {0:?}: expected \"cell@domain\"")]
pub struct InvalidCellAddress(String);

/// A parsed `cellName@domainName` destination specifier. A bare name with no
/// `@` is treated as addressed to the well-known local domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellAddress {
    pub cell: String,
    pub domain: String,
}

impl CellAddress {
    pub fn new(cell: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            cell: cell.into(),
            domain: domain.into(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.domain == LOCAL_DOMAIN
    }

    fn exact_key(&self) -> String {
        format!("{}@{}", self.cell, self.domain)
    }
}

impl FromStr for CellAddress {
    type Err = InvalidCellAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(InvalidCellAddress(s.to_string()));
        }
        match s.split_once('@') {
            Some((cell, domain)) if !cell.is_empty() && !domain.is_empty() => {
                Ok(Self::new(cell, domain))
            }
            Some(_) => Err(InvalidCellAddress(s.to_string())),
            None => Ok(Self::new(s, LOCAL_DOMAIN)),
        }
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.cell, self.domain)
    }
}

/// The six route kinds (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    Exact,
    Alias,
    Wellknown,
    Domain,
    Topic,
    Default,
    Dumpster,
}

impl RouteKind {
    /// `Default`/`Dumpster` are singletons with no key; the rest are keyed.
    pub fn is_singleton(self) -> bool {
        matches!(self, RouteKind::Default | RouteKind::Dumpster)
    }
}

/// A single routing entry: a kind, the key it was registered under (empty
/// for the two singleton kinds), and the destination gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    pub kind: RouteKind,
    pub key: String,
    pub gateway: String,
}

impl Route {
    pub fn new(kind: RouteKind, key: impl Into<String>, gateway: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            gateway: gateway.into(),
        }
    }

    /// The lookup key this route occupies in its kind's map: `cell@domain`
    /// for EXACT/ALIAS, `cell` for WELLKNOWN/TOPIC, `domain` for DOMAIN, and
    /// empty for the singleton kinds.
    pub fn key_for(kind: RouteKind, address: &CellAddress) -> String {
        match kind {
            RouteKind::Exact | RouteKind::Alias => address.exact_key(),
            RouteKind::Wellknown | RouteKind::Topic => address.cell.clone(),
            RouteKind::Domain => address.domain.clone(),
            RouteKind::Default | RouteKind::Dumpster => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_defaults_to_local_domain() {
        let addr: CellAddress = "foo".parse().unwrap();
        assert_eq!(addr, CellAddress::new("foo", "local"));
        assert!(addr.is_local());
    }

    #[test]
    fn full_address_parses() {
        let addr: CellAddress = "foo@d1".parse().unwrap();
        assert_eq!(addr.cell, "foo");
        assert_eq!(addr.domain, "d1");
        assert!(!addr.is_local());
    }

    #[test]
    fn rejects_malformed_address() {
        assert!("foo@".parse::<CellAddress>().is_err());
        assert!("@d1".parse::<CellAddress>().is_err());
    }
}
