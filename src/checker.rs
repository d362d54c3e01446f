//! URL legitimacy checking.
//!
//! The validation core only depends on the [`UrlChecker`] capability: hand it
//! a candidate URL and it answers "acceptable" or a [`UrlError`] reason. The
//! concrete [`Checker`] here is a small policy engine built from
//! [`CheckRule`]s (scheme allow-list, loopback / raw IP / special-use domain
//! exclusion and forbidden subnets). It never touches the network.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use url::{Host, Url};

/// Why a URL was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum UrlError {
    #[error("url '{url}' is malformed: {reason}")]
    #[diagnostic(code(hookguard::url::malformed))]
    Malformed { url: String, reason: String },

    #[error("url '{url}' has no host")]
    #[diagnostic(code(hookguard::url::missing_host))]
    MissingHost { url: String },

    #[error("scheme '{scheme}' is not allowed")]
    #[diagnostic(code(hookguard::url::scheme))]
    SchemeNotAllowed { scheme: String },

    #[error("loopback host '{host}' is not allowed")]
    #[diagnostic(code(hookguard::url::loopback))]
    Loopback { host: String },

    #[error("ip address host '{host}' is not allowed")]
    #[diagnostic(code(hookguard::url::ip))]
    IpNotAllowed { host: String },

    #[error("special use domain '{host}' is not allowed")]
    #[diagnostic(code(hookguard::url::special_use_domain))]
    SpecialUseDomain { host: String },

    #[error("host '{host}' is in the forbidden subnet {subnet}")]
    #[diagnostic(code(hookguard::url::subnet))]
    ForbiddenSubnet { host: String, subnet: String },

    #[error("host '{host}' is forbidden by '{domain}'")]
    #[diagnostic(code(hookguard::url::domain))]
    ForbiddenDomain { host: String, domain: String },
}

/// Failure to assemble a [`Checker`] from its rules.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum CheckerError {
    #[error("invalid subnet '{value}'")]
    #[diagnostic(
        code(hookguard::config::subnet),
        help("subnets are written in CIDR form, e.g. \"192.168.0.0/16\" or \"fc00::/7\"")
    )]
    InvalidSubnet { value: String },

    #[error("scheme allow-list is empty")]
    #[diagnostic(code(hookguard::config::schemes))]
    EmptySchemes,
}

/// The capability the validation core consumes.
pub trait UrlChecker: fmt::Display + Send + Sync {
    fn check(&self, candidate: &str) -> Result<(), UrlError>;
}

/// Shared handle to a checker; options close over one of these.
pub type SharedChecker = Arc<dyn UrlChecker>;

// ============================================================================
// SUBNETS
// ============================================================================

/// An address range in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet {
    network: IpAddr,
    prefix: u8,
}

impl Subnet {
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = prefix_mask_u32(self.prefix);
                u32::from(net) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = prefix_mask_u128(self.prefix);
                u128::from(net) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}

/// `::ffff:a.b.c.d` is checked as `a.b.c.d`.
fn unmap_ipv4(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        other => other,
    }
}

fn prefix_mask_u32(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

fn prefix_mask_u128(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    }
}

impl FromStr for Subnet {
    type Err = CheckerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CheckerError::InvalidSubnet {
            value: s.to_string(),
        };
        let (addr, prefix) = s.trim().split_once('/').ok_or_else(invalid)?;
        let network: IpAddr = addr.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        let max = if network.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return Err(invalid());
        }
        Ok(Self { network, prefix })
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

// ============================================================================
// RULES
// ============================================================================

/// Host names reserved for special use. Entries wrapped in dots match any
/// label of the host; bare entries match the host or any subdomain of it.
pub const SPECIAL_USE_HOSTS: &[&str] = &[".example.", ".invalid.", ".test.", "localhost"];

fn is_special_use(host: &str) -> bool {
    let dotted = format!(".{host}.");
    SPECIAL_USE_HOSTS.iter().any(|entry| {
        if entry.starts_with('.') {
            dotted.contains(entry)
        } else {
            host == *entry || host.ends_with(&format!(".{entry}"))
        }
    })
}

/// One policy rule of a [`Checker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckRule {
    OnlyAllowSchemes(Vec<String>),
    ForbidLoopback,
    ForbidAnyIps,
    ForbidSpecialUseDomains,
    ForbidSubnets(Vec<String>),
    ForbidDomains(Vec<String>),
}

impl fmt::Display for CheckRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnlyAllowSchemes(schemes) => write!(f, "OnlyAllowSchemes({})", quoted(schemes)),
            Self::ForbidLoopback => f.write_str("ForbidLoopback()"),
            Self::ForbidAnyIps => f.write_str("ForbidAnyIPs()"),
            Self::ForbidSpecialUseDomains => f.write_str("ForbidSpecialUseDomains()"),
            Self::ForbidSubnets(subnets) => write!(f, "ForbidSubnets({})", quoted(subnets)),
            Self::ForbidDomains(domains) => write!(f, "ForbidDomains({})", quoted(domains)),
        }
    }
}

fn quoted(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("'{item}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// CHECKER
// ============================================================================

/// Rule-based [`UrlChecker`]. An empty rule set accepts any parseable URL
/// with a host.
#[derive(Debug, Clone, Default)]
pub struct Checker {
    rules: Vec<CheckRule>,
    schemes: Option<Vec<String>>,
    forbid_loopback: bool,
    forbid_ips: bool,
    forbid_special_use: bool,
    subnets: Vec<Subnet>,
    domains: Vec<String>,
}

impl Checker {
    pub fn new(rules: Vec<CheckRule>) -> Result<Self, CheckerError> {
        let mut checker = Checker::default();
        for rule in &rules {
            match rule {
                CheckRule::OnlyAllowSchemes(schemes) => {
                    if schemes.is_empty() {
                        return Err(CheckerError::EmptySchemes);
                    }
                    let allowed = checker.schemes.get_or_insert_with(Vec::new);
                    allowed.extend(schemes.iter().map(|s| s.to_ascii_lowercase()));
                }
                CheckRule::ForbidLoopback => checker.forbid_loopback = true,
                CheckRule::ForbidAnyIps => checker.forbid_ips = true,
                CheckRule::ForbidSpecialUseDomains => checker.forbid_special_use = true,
                CheckRule::ForbidSubnets(subnets) => {
                    for subnet in subnets {
                        checker.subnets.push(subnet.parse()?);
                    }
                }
                CheckRule::ForbidDomains(domains) => checker.domains.extend(
                    domains
                        .iter()
                        .map(|d| d.trim_matches('.').to_ascii_lowercase())
                        .filter(|d| !d.is_empty()),
                ),
            }
        }
        checker.rules = rules;
        Ok(checker)
    }

    pub fn rules(&self) -> &[CheckRule] {
        &self.rules
    }

    fn check_domain(&self, host: &str) -> Result<(), UrlError> {
        let host = host.trim_end_matches('.').to_ascii_lowercase();

        if self.forbid_loopback && (host == "localhost" || host.ends_with(".localhost")) {
            return Err(UrlError::Loopback { host });
        }

        if self.forbid_special_use && is_special_use(&host) {
            return Err(UrlError::SpecialUseDomain { host });
        }

        for domain in &self.domains {
            if host == *domain || host.ends_with(&format!(".{domain}")) {
                return Err(UrlError::ForbiddenDomain {
                    host,
                    domain: domain.clone(),
                });
            }
        }

        Ok(())
    }

    fn check_ip(&self, original: IpAddr) -> Result<(), UrlError> {
        let ip = unmap_ipv4(original);
        if self.forbid_loopback && ip.is_loopback() {
            return Err(UrlError::Loopback {
                host: original.to_string(),
            });
        }
        if self.forbid_ips {
            return Err(UrlError::IpNotAllowed {
                host: original.to_string(),
            });
        }
        if let Some(subnet) = self.subnets.iter().find(|s| s.contains(ip)) {
            return Err(UrlError::ForbiddenSubnet {
                host: original.to_string(),
                subnet: subnet.to_string(),
            });
        }
        Ok(())
    }
}

impl UrlChecker for Checker {
    fn check(&self, candidate: &str) -> Result<(), UrlError> {
        let url = Url::parse(candidate).map_err(|e| UrlError::Malformed {
            url: candidate.to_string(),
            reason: e.to_string(),
        })?;

        if let Some(schemes) = &self.schemes {
            if !schemes.iter().any(|s| s == url.scheme()) {
                return Err(UrlError::SchemeNotAllowed {
                    scheme: url.scheme().to_string(),
                });
            }
        }

        match url.host() {
            Some(Host::Domain(domain)) => self.check_domain(domain),
            Some(Host::Ipv4(ip)) => self.check_ip(IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => self.check_ip(IpAddr::V6(ip)),
            None => Err(UrlError::MissingHost {
                url: candidate.to_string(),
            }),
        }
    }
}

impl fmt::Display for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rules.is_empty() {
            return f.write_str("Checker{}");
        }
        let rules = self
            .rules
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "Checker{{ {rules} }}")
    }
}
