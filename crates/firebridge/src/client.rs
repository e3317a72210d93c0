// Firewall client: transport mechanics shared by every operation.
//
// Lifecycle endpoints are implemented as inherent methods in separate
// files (groups.rs, rules.rs) to keep this module focused on the common
// plumbing: per-call dialect lookup, request dispatch, and the boolean
// `return` element conventions.

use tracing::debug;

use firebridge_xml::Element;

use crate::context::ProviderContext;
use crate::error::Error;
use crate::model::{Direction, Permission, RuleTarget};
use crate::transport::{Params, Transport};

// Query actions this adapter speaks.
pub(crate) const CREATE_SECURITY_GROUP: &str = "CreateSecurityGroup";
pub(crate) const DELETE_SECURITY_GROUP: &str = "DeleteSecurityGroup";
pub(crate) const DESCRIBE_SECURITY_GROUPS: &str = "DescribeSecurityGroups";
pub(crate) const AUTHORIZE_SECURITY_GROUP_INGRESS: &str = "AuthorizeSecurityGroupIngress";
pub(crate) const AUTHORIZE_SECURITY_GROUP_EGRESS: &str = "AuthorizeSecurityGroupEgress";
pub(crate) const REVOKE_SECURITY_GROUP_INGRESS: &str = "RevokeSecurityGroupIngress";
pub(crate) const REVOKE_SECURITY_GROUP_EGRESS: &str = "RevokeSecurityGroupEgress";

/// Provider-neutral firewall operations over an EC2-family backend.
///
/// Holds no mutable state and no cache: every operation is one round
/// trip through the transport, and the wire dialect is looked up from
/// the context on every call. Safe to share across tasks as long as the
/// transport is.
pub struct FirewallClient<T: Transport> {
    ctx: ProviderContext,
    transport: T,
}

impl<T: Transport> FirewallClient<T> {
    pub fn new(ctx: ProviderContext, transport: T) -> Self {
        Self { ctx, transport }
    }

    /// The active session context.
    pub fn context(&self) -> &ProviderContext {
        &self.ctx
    }

    /// Rebind the client to a different session. Subsequent calls pick
    /// up the new region and dialect immediately.
    pub fn set_context(&mut self, ctx: ProviderContext) {
        self.ctx = ctx;
    }

    /// The human noun for the backend resource this adapter manages.
    pub fn provider_term(&self) -> &'static str {
        "security group"
    }

    /// Whether the backend can hold a rule with this shape at all.
    ///
    /// Only ALLOW rules exist; egress needs a VLAN-bound firewall; and
    /// the classic dialect has no VLAN-bound groups in the first place.
    pub fn supports_rules(&self, direction: Direction, permission: Permission, in_vlan: bool) -> bool {
        let classic = self.ctx.mode() == crate::dialect::ProviderMode::Classic;
        permission == Permission::Allow
            && !(in_vlan && classic)
            && (in_vlan || direction == Direction::Ingress)
    }

    /// Rule destinations the backend can route to. Global only.
    pub fn supported_destination_types(&self) -> Vec<RuleTarget> {
        vec![RuleTarget::Global]
    }

    pub(crate) async fn invoke(&self, action: &'static str, params: Params) -> Result<Element, Error> {
        debug!(action, "invoking backend");
        self.transport.invoke(action, &params).await
    }

    /// Check the boolean `return` element on a mutation response.
    ///
    /// Absent means success (several backends omit it); present with
    /// anything but case-insensitive `true` is a failure with no further
    /// detail to offer.
    pub(crate) fn check_return(doc: &Element, action: &'static str) -> Result<(), Error> {
        match doc.find_all("return").into_iter().next() {
            Some(el) if !is_true(el) => Err(Error::MalformedResponse { action }),
            _ => Ok(()),
        }
    }

    /// Like [`Self::check_return`] but the element must be present.
    /// Revoke has no other success signal.
    pub(crate) fn require_return(doc: &Element, action: &'static str) -> Result<(), Error> {
        match doc.find_all("return").into_iter().next() {
            Some(el) if is_true(el) => Ok(()),
            _ => Err(Error::MalformedResponse { action }),
        }
    }
}

fn is_true(el: &Element) -> bool {
    el.text().is_some_and(|t| t.eq_ignore_ascii_case("true"))
}
