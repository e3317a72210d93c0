// Canonical firewall model.
//
// These types are what callers see; the wire dialects never leak out of
// the codec. Rule identity is a pure function of the rule's attributes
// (the backend assigns no rule ids), so two descriptions of the same rule
// always collide -- that collision is what makes authorize idempotent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ── Enumerations ─────────────────────────────────────────────────────

/// Direction of traffic a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ingress => "ingress",
            Self::Egress => "egress",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ingress" => Ok(Self::Ingress),
            "egress" => Ok(Self::Egress),
            _ => Err(()),
        }
    }
}

/// What a rule does with matching traffic. The backend only supports
/// ALLOW; DENY exists in the model so callers can be rejected cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Allow,
    Deny,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            _ => Err(()),
        }
    }
}

/// Network protocol a rule matches. Sent lower-cased on the wire.
///
/// ICMP rules carry type/code in the port fields by wire convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Igmp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Icmp => "icmp",
            Self::Igmp => "igmp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ();

    /// Case-insensitive; the wire uses lowercase but decode tolerates
    /// either.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            "icmp" => Ok(Self::Icmp),
            "igmp" => Ok(Self::Igmp),
            _ => Err(()),
        }
    }
}

/// Where matching traffic is routed. The backend supports only global
/// routing; the other variants exist so requests for them can be
/// rejected (or treated as vacuous, for revoke) without a network call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleTarget {
    /// Traffic flows wherever routing already sends it.
    Global,
    /// Traffic confined to a specific virtual network.
    Vlan(String),
    /// Traffic routed to a specific address block.
    Cidr(String),
}

impl RuleTarget {
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }
}

// ── Firewall ─────────────────────────────────────────────────────────

/// A named, region-scoped container of allow-rules.
///
/// In the classic dialect the id is the group name itself; in the modern
/// dialect it is a backend-assigned `sg-…` identifier. A firewall bound
/// to a virtual network (`provider_vlan_id` present) can carry egress
/// rules; an unbound one cannot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firewall {
    pub firewall_id: String,
    pub name: String,
    pub description: String,
    pub region_id: String,
    pub provider_vlan_id: Option<String>,
    /// Always true once fetched; the backend has no draft state.
    pub active: bool,
    pub available: bool,
}

/// Minimal projection of [`Firewall`] for lightweight listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub firewall_id: String,
    pub available: bool,
}

// ── FirewallRule ─────────────────────────────────────────────────────

/// Port value meaning "not present in the wire document".
pub(crate) const UNSET_PORT: i32 = -2;

/// A single allow-rule on a firewall.
///
/// `source` is either a CIDR block or a reference to another firewall,
/// disambiguated purely by syntax (see the codec). Ports are `i32`
/// because ICMP encodes type/code there and `-1` is a live sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub firewall_id: String,
    pub source: String,
    pub direction: Direction,
    pub protocol: Protocol,
    pub permission: Permission,
    pub target: RuleTarget,
    pub start_port: i32,
    pub end_port: i32,
}

impl FirewallRule {
    /// Build a rule. The target is always global today; non-global
    /// targets are rejected long before a rule is constructed for the
    /// wire.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        firewall_id: impl Into<String>,
        source: impl Into<String>,
        direction: Direction,
        protocol: Protocol,
        permission: Permission,
        target: RuleTarget,
        start_port: i32,
        end_port: i32,
    ) -> Self {
        Self {
            firewall_id: firewall_id.into(),
            source: source.into(),
            direction,
            protocol,
            permission,
            target,
            start_port,
            end_port,
        }
    }

    /// Deterministic rule id derived from the rule's own fields.
    ///
    /// The composite is `:`-joined; neither IPv4 CIDRs nor sanitized
    /// group names can contain `:`, so the id parses back unambiguously.
    /// The (always global) target is not encoded.
    pub fn rule_id(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}",
            self.firewall_id,
            self.source,
            self.direction,
            self.permission,
            self.protocol,
            self.start_port,
            self.end_port
        )
    }

    /// Parse a composite rule id back into the rule it denotes.
    pub fn parse_id(rule_id: &str) -> Result<Self, Error> {
        let bad = || Error::InvalidRuleId(rule_id.to_string());
        let parts: Vec<&str> = rule_id.split(':').collect();

        let [firewall_id, source, direction, permission, protocol, start, end] = parts[..] else {
            return Err(bad());
        };
        if firewall_id.is_empty() || source.is_empty() {
            return Err(bad());
        }

        Ok(Self {
            firewall_id: firewall_id.to_string(),
            source: source.to_string(),
            direction: direction.parse().map_err(|()| bad())?,
            permission: permission.parse().map_err(|()| bad())?,
            protocol: protocol.parse().map_err(|()| bad())?,
            target: RuleTarget::Global,
            start_port: start.parse().map_err(|_| bad())?,
            end_port: end.parse().map_err(|_| bad())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Direction, FirewallRule, Permission, Protocol, RuleTarget};

    fn sample(source: &str, start: i32, end: i32) -> FirewallRule {
        FirewallRule::new(
            "sg-1a2b3c4d",
            source,
            Direction::Ingress,
            Protocol::Tcp,
            Permission::Allow,
            RuleTarget::Global,
            start,
            end,
        )
    }

    #[test]
    fn rule_id_is_deterministic() {
        let a = sample("10.0.0.0/24", 80, 80);
        let b = sample("10.0.0.0/24", 80, 80);
        assert_eq!(a.rule_id(), b.rule_id());
    }

    #[test]
    fn rule_id_round_trips() {
        let rule = sample("10.0.0.0/24", 443, 443);
        let parsed = FirewallRule::parse_id(&rule.rule_id()).unwrap();
        assert_eq!(parsed, rule);
    }

    #[test]
    fn rule_id_round_trips_for_group_sources() {
        let rule = FirewallRule::new(
            "sg-1a2b3c4d",
            "sg-9f8e7d6c",
            Direction::Egress,
            Protocol::Icmp,
            Permission::Allow,
            RuleTarget::Global,
            -1,
            -1,
        );
        let parsed = FirewallRule::parse_id(&rule.rule_id()).unwrap();
        assert_eq!(parsed, rule);
    }

    #[test]
    fn distinct_tuples_get_distinct_ids() {
        assert_ne!(
            sample("10.0.0.0/24", 80, 80).rule_id(),
            sample("10.0.0.0/24", 80, 81).rule_id()
        );
        assert_ne!(
            sample("10.0.0.0/24", 80, 80).rule_id(),
            sample("10.0.0.0/16", 80, 80).rule_id()
        );
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for id in [
            "",
            "just-a-name",
            "sg-1:10.0.0.0/24:ingress:allow:tcp:80", // six fields
            "sg-1:10.0.0.0/24:sideways:allow:tcp:80:80",
            "sg-1:10.0.0.0/24:ingress:maybe:tcp:80:80",
            "sg-1:10.0.0.0/24:ingress:allow:gre:80:80",
            "sg-1:10.0.0.0/24:ingress:allow:tcp:eighty:80",
            ":10.0.0.0/24:ingress:allow:tcp:80:80",
        ] {
            assert!(FirewallRule::parse_id(id).is_err(), "accepted: {id}");
        }
    }

    #[test]
    fn protocol_parsing_is_case_insensitive() {
        assert_eq!("TCP".parse::<Protocol>(), Ok(Protocol::Tcp));
        assert_eq!("IcMp".parse::<Protocol>(), Ok(Protocol::Icmp));
        assert!("-1".parse::<Protocol>().is_err());
    }
}
