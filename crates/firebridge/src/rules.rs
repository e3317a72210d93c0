// Rule mutation and listing: authorize, revoke, get_rules.
//
// Rule identity is derived, never backend-assigned, which is what makes
// authorize idempotent: a duplicate-permission rejection means the rule
// is already there, and its id can be recomputed locally.

use tracing::{debug, error};

use crate::client::{
    AUTHORIZE_SECURITY_GROUP_EGRESS, AUTHORIZE_SECURITY_GROUP_INGRESS, DESCRIBE_SECURITY_GROUPS,
    FirewallClient, REVOKE_SECURITY_GROUP_EGRESS, REVOKE_SECURITY_GROUP_INGRESS,
};
use crate::codec;
use crate::error::Error;
use crate::model::{Direction, FirewallRule, Permission, Protocol, RuleTarget};
use crate::transport::{Params, Transport};

impl<T: Transport> FirewallClient<T> {
    /// Authorize an ingress ALLOW rule routed globally. Convenience for
    /// the common case.
    pub async fn authorize_ingress(
        &self,
        firewall_id: &str,
        source: &str,
        protocol: Protocol,
        begin_port: i32,
        end_port: i32,
    ) -> Result<String, Error> {
        self.authorize(
            firewall_id,
            Direction::Ingress,
            Permission::Allow,
            source,
            protocol,
            &RuleTarget::Global,
            begin_port,
            end_port,
        )
        .await
    }

    /// Add a rule to a firewall, returning the derived rule id.
    ///
    /// DENY permissions and non-global destinations are rejected before
    /// any network call, as is egress on a firewall with no bound
    /// virtual network. A duplicate-permission rejection from the
    /// backend is converted into success: the rule exists, which is what
    /// the caller asked for.
    #[allow(clippy::too_many_arguments)]
    pub async fn authorize(
        &self,
        firewall_id: &str,
        direction: Direction,
        permission: Permission,
        source: &str,
        protocol: Protocol,
        destination: &RuleTarget,
        begin_port: i32,
        end_port: i32,
    ) -> Result<String, Error> {
        if permission == Permission::Deny {
            return Err(Error::Unsupported("the backend has no DENY rules"));
        }
        if !destination.is_global() {
            return Err(Error::Unsupported(
                "the backend does not route rules to discrete destinations",
            ));
        }
        let firewall = self
            .get_firewall(firewall_id)
            .await?
            .ok_or_else(|| Error::NotFound(firewall_id.to_string()))?;
        if direction == Direction::Egress && firewall.provider_vlan_id.is_none() {
            return Err(Error::Unsupported(
                "egress rules require a firewall bound to a virtual network",
            ));
        }

        let dialect = self.context().dialect();
        let (spec, params) =
            codec::rule_params(dialect, firewall_id, protocol, begin_port, end_port, source);
        let rule = FirewallRule::new(
            firewall_id,
            spec.as_str(),
            direction,
            protocol,
            Permission::Allow,
            RuleTarget::Global,
            begin_port,
            end_port,
        );
        let action = match direction {
            Direction::Ingress => AUTHORIZE_SECURITY_GROUP_INGRESS,
            Direction::Egress => AUTHORIZE_SECURITY_GROUP_EGRESS,
        };

        match self.invoke(action, params).await {
            Ok(doc) => {
                Self::check_return(&doc, "authorize security group rule")?;
                Ok(rule.rule_id())
            }
            Err(e) if e.is_duplicate_rule() => {
                // Already present: idempotent success under retry.
                debug!(firewall_id, rule_id = %rule.rule_id(), "rule already authorized");
                Ok(rule.rule_id())
            }
            Err(e) => {
                error!(error = %e, firewall_id, "authorize rejected by backend");
                Err(e)
            }
        }
    }

    /// Revoke an ingress ALLOW rule routed globally.
    pub async fn revoke_ingress(
        &self,
        firewall_id: &str,
        source: &str,
        protocol: Protocol,
        begin_port: i32,
        end_port: i32,
    ) -> Result<(), Error> {
        self.revoke(
            firewall_id,
            Direction::Ingress,
            Permission::Allow,
            source,
            protocol,
            &RuleTarget::Global,
            begin_port,
            end_port,
        )
        .await
    }

    /// Remove a rule from a firewall.
    ///
    /// A DENY permission or non-global destination describes a rule the
    /// backend was never asked to hold, so revoking it is vacuously
    /// satisfied without a network call.
    #[allow(clippy::too_many_arguments)]
    pub async fn revoke(
        &self,
        firewall_id: &str,
        direction: Direction,
        permission: Permission,
        source: &str,
        protocol: Protocol,
        destination: &RuleTarget,
        begin_port: i32,
        end_port: i32,
    ) -> Result<(), Error> {
        if permission == Permission::Deny || !destination.is_global() {
            debug!(firewall_id, "revoke of an inexpressible rule is a no-op");
            return Ok(());
        }

        let dialect = self.context().dialect();
        let (_, params) =
            codec::rule_params(dialect, firewall_id, protocol, begin_port, end_port, source);
        let action = match direction {
            Direction::Ingress => REVOKE_SECURITY_GROUP_INGRESS,
            Direction::Egress => REVOKE_SECURITY_GROUP_EGRESS,
        };

        let doc = match self.invoke(action, params).await {
            Ok(doc) => doc,
            Err(e) => {
                error!(error = %e, firewall_id, "revoke rejected by backend");
                return Err(e);
            }
        };
        Self::require_return(&doc, "revoke security group rule")
    }

    /// Revoke by derived rule id: parse the composite back into its
    /// fields and delegate to the full revoke.
    pub async fn revoke_rule(&self, rule_id: &str) -> Result<(), Error> {
        let rule = FirewallRule::parse_id(rule_id)?;
        self.revoke(
            &rule.firewall_id,
            rule.direction,
            rule.permission,
            &rule.source,
            rule.protocol,
            &rule.target,
            rule.start_port,
            rule.end_port,
        )
        .await
    }

    /// List every rule on a firewall, ingress and egress flattened.
    ///
    /// An `InvalidGroup` rejection yields an empty collection: a deleted
    /// firewall has no rules, which is an answer, not a failure.
    pub async fn get_rules(&self, firewall_id: &str) -> Result<Vec<FirewallRule>, Error> {
        let dialect = self.context().dialect();
        let mut params = Params::new();
        params.insert(dialect.group_filter_key().to_string(), firewall_id.to_string());

        let doc = match self.invoke(DESCRIBE_SECURITY_GROUPS, params).await {
            Ok(doc) => doc,
            Err(e) if e.is_invalid_group() => {
                debug!(firewall_id, "backend reports no such group; no rules");
                return Ok(Vec::new());
            }
            Err(e) => {
                error!(error = %e, firewall_id, "rule listing rejected by backend");
                return Err(e);
            }
        };
        Ok(codec::rules(firewall_id, &doc))
    }
}
