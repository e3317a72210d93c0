// Rule codec: canonical model <-> wire shapes.
//
// Encoding produces the flat parameter map for a mutation call in either
// dialect. Decoding walks describe-response documents back into canonical
// firewalls and rules. Both halves take the dialect (or, for decoding,
// the direction implied by the containing list) explicitly; nothing here
// touches the network.

use crate::dialect::WireDialect;
use crate::model::{
    Direction, Firewall, FirewallRule, Permission, Protocol, ResourceStatus, RuleTarget, UNSET_PORT,
};
use crate::transport::Params;

use firebridge_xml::Element;

// ── Source classification ────────────────────────────────────────────

/// A rule source, disambiguated by syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// An address block. Bare IPv4 addresses are normalized to `/32`.
    Cidr(String),
    /// A reference to another firewall, by assigned id or by name.
    Group(String),
}

impl SourceSpec {
    /// The string actually sent on the wire (and used for rule ids).
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cidr(s) | Self::Group(s) => s,
        }
    }
}

/// Strict dotted-quad check: exactly four dot-separated integer octets,
/// each 0–255. Anything else -- including near-misses like `999.1.1.1` --
/// fails, and the source falls through to group classification. That
/// fall-through is backend-observable behavior, deliberately not
/// tightened here.
fn is_ipv4(s: &str) -> bool {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 4 {
        return false;
    }
    parts
        .iter()
        .all(|p| p.parse::<i64>().is_ok_and(|x| (0..=255).contains(&x)))
}

/// Classify a free-text rule source.
///
/// Presence of `/` means CIDR as-is; a strict dotted-quad gets `/32`
/// appended; everything else names another firewall.
pub fn classify_source(source: &str) -> SourceSpec {
    if source.contains('/') {
        SourceSpec::Cidr(source.to_string())
    } else if is_ipv4(source) {
        SourceSpec::Cidr(format!("{source}/32"))
    } else {
        SourceSpec::Group(source.to_string())
    }
}

// ── Encoding ─────────────────────────────────────────────────────────

/// Encode one rule into the parameter map for an authorize/revoke call.
///
/// Returns the classified (normalized) source alongside the parameters:
/// the caller derives the rule id from what was actually sent, not from
/// the raw input. An end port of `-1` collapses to the start port before
/// encoding.
pub fn rule_params(
    dialect: WireDialect,
    firewall_id: &str,
    protocol: Protocol,
    start_port: i32,
    end_port: i32,
    source: &str,
) -> (SourceSpec, Params) {
    let spec = classify_source(source);
    let end_port = if end_port == -1 { start_port } else { end_port };
    let mut params = Params::new();

    match dialect {
        WireDialect::Classic => {
            params.insert("GroupName".to_string(), firewall_id.to_string());
            params.insert("IpProtocol".to_string(), protocol.as_str().to_string());
            params.insert("FromPort".to_string(), start_port.to_string());
            params.insert("ToPort".to_string(), end_port.to_string());
            match &spec {
                // Classic group-to-group rules are keyed by group name;
                // the insert replaces the rule-set's own name parameter.
                SourceSpec::Group(name) => {
                    params.insert("GroupName".to_string(), name.clone());
                }
                SourceSpec::Cidr(cidr) => {
                    params.insert("CidrIp".to_string(), cidr.clone());
                }
            }
        }
        WireDialect::Modern => {
            params.insert("GroupId".to_string(), firewall_id.to_string());
            params.insert(
                "IpPermissions.1.IpProtocol".to_string(),
                protocol.as_str().to_string(),
            );
            params.insert("IpPermissions.1.FromPort".to_string(), start_port.to_string());
            params.insert("IpPermissions.1.ToPort".to_string(), end_port.to_string());
            match &spec {
                SourceSpec::Group(group) => {
                    let key = if group.starts_with("sg-") {
                        "IpPermissions.1.Groups.1.GroupId"
                    } else {
                        "IpPermissions.1.Groups.1.GroupName"
                    };
                    params.insert(key.to_string(), group.clone());
                }
                SourceSpec::Cidr(cidr) => {
                    params.insert("IpPermissions.1.IpRanges.1.CidrIp".to_string(), cidr.clone());
                }
            }
        }
    }

    (spec, params)
}

// ── Decoding ─────────────────────────────────────────────────────────

/// Decode every firewall in a describe response.
///
/// The interesting blocks live under `securityGroupInfo` as repeated
/// `item` elements; blocks that decode to nothing are skipped.
pub fn firewalls(region_id: &str, doc: &Element) -> Vec<Firewall> {
    group_items(doc)
        .filter_map(|item| firewall(region_id, item))
        .collect()
}

/// Decode the status projection of every firewall in a describe response.
pub fn statuses(doc: &Element) -> Vec<ResourceStatus> {
    group_items(doc).filter_map(status).collect()
}

/// Decode every rule of the named firewall from a describe response,
/// flattening the ingress and egress permission lists into one
/// collection.
pub fn rules(firewall_id: &str, doc: &Element) -> Vec<FirewallRule> {
    let mut out = Vec::new();
    for item in group_items(doc) {
        for (list, direction) in [
            ("ipPermissions", Direction::Ingress),
            ("ipPermissionsEgress", Direction::Egress),
        ] {
            for attr in item.children_named(list) {
                for block in attr.children_named("item") {
                    out.extend(permission_rules(firewall_id, block, direction));
                }
            }
        }
    }
    out
}

fn group_items<'a>(doc: &'a Element) -> impl Iterator<Item = &'a Element> {
    doc.find_all("securityGroupInfo")
        .into_iter()
        .flat_map(|info| info.children_named("item"))
}

/// Decode one firewall `item` block.
///
/// Field fallbacks mirror the wire contract: id falls back to name (the
/// classic dialect has no separate id), description falls back to name,
/// and a `vpcId` both records VLAN membership and is appended to the
/// display name so callers can see it without another lookup.
fn firewall(region_id: &str, item: &Element) -> Option<Firewall> {
    let name = item.child_text("groupName");
    let id = item.child_text("groupId");
    let description = item.child_text("groupDescription");
    let vpc_id = item.child_text("vpcId");

    let id = id.or(name)?;
    let name = name.unwrap_or(id);
    let description = description.unwrap_or(name);

    let (name, provider_vlan_id) = match vpc_id {
        Some(vpc) => (format!("{name} (VPC {vpc})"), Some(vpc.to_string())),
        None => (name.to_string(), None),
    };

    Some(Firewall {
        firewall_id: id.to_string(),
        name,
        description: description.to_string(),
        region_id: region_id.to_string(),
        provider_vlan_id,
        active: true,
        available: true,
    })
}

fn status(item: &Element) -> Option<ResourceStatus> {
    let id = item
        .child_text("groupId")
        .or_else(|| item.child_text("groupName"))?;
    Some(ResourceStatus {
        firewall_id: id.to_string(),
        available: true,
    })
}

/// Decode one permission block into zero or more rules, one per resolved
/// source. Empty or unrecognized nesting yields no rules rather than an
/// error; the backend omits empty nested lists entirely.
fn permission_rules(firewall_id: &str, block: &Element, direction: Direction) -> Vec<FirewallRule> {
    let protocol = match block.child("ipProtocol") {
        None => Protocol::Tcp,
        Some(el) => match el.text() {
            // `-1` (and an empty protocol field) is the wire's spelling
            // of ICMP in permission listings.
            None | Some("-1") => Protocol::Icmp,
            Some(other) => match other.parse() {
                Ok(p) => p,
                Err(()) => return Vec::new(),
            },
        },
    };

    let port = |tag: &str| {
        block
            .child_text(tag)
            .and_then(|t| t.parse::<i32>().ok())
            .unwrap_or(UNSET_PORT)
    };
    let start_port = port("fromPort");
    let end_port = port("toPort");

    let mut sources: Vec<String> = Vec::new();
    for groups in block.children_named("groups") {
        for entry in groups.children_named("item") {
            // Prefer the assigned id over the display name when both are
            // present.
            if let Some(source) = entry
                .child_text("groupId")
                .or_else(|| entry.child_text("groupName"))
            {
                sources.push(source.to_string());
            }
        }
    }
    for ranges in block.children_named("ipRanges") {
        for entry in ranges.children_named("item") {
            if let Some(cidr) = entry.child_text("cidrIp") {
                sources.push(cidr.to_string());
            }
        }
    }

    sources
        .into_iter()
        .map(|source| {
            FirewallRule::new(
                firewall_id,
                source,
                direction,
                protocol,
                Permission::Allow,
                RuleTarget::Global,
                start_port,
                end_port,
            )
        })
        .collect()
}
