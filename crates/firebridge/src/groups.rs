// Firewall container lifecycle: create, delete, describe, list.
//
// Every operation is a single round trip; the backend is the only source
// of truth and nothing is cached between calls.

use std::collections::HashSet;

use tracing::{debug, error};

use crate::client::{
    CREATE_SECURITY_GROUP, DELETE_SECURITY_GROUP, DESCRIBE_SECURITY_GROUPS, FirewallClient,
};
use crate::codec;
use crate::dialect::WireDialect;
use crate::error::Error;
use crate::model::{Firewall, ResourceStatus};
use crate::name;
use crate::transport::{Params, Transport};

impl<T: Transport> FirewallClient<T> {
    /// Create a firewall, returning its canonical id.
    ///
    /// The display name is first run through the allocator, so the name
    /// actually used may carry a collision suffix. In the classic
    /// dialect the allocated name IS the id; the modern dialect assigns
    /// one, and a response without it is an error rather than a guess.
    pub async fn create(&self, name: &str, description: &str) -> Result<String, Error> {
        let name = self.unique_name(name).await?;
        let mut params = Params::new();
        params.insert("GroupName".to_string(), name.clone());
        params.insert("GroupDescription".to_string(), description.to_string());

        let doc = match self.invoke(CREATE_SECURITY_GROUP, params).await {
            Ok(doc) => doc,
            Err(e) => {
                error!(error = %e, "create rejected by backend");
                return Err(e);
            }
        };

        match self.context().dialect() {
            WireDialect::Classic => Ok(name),
            WireDialect::Modern => assigned_group_id(&doc, "create security group"),
        }
    }

    /// Create a firewall bound to a virtual network.
    ///
    /// This is the only way to produce an egress-capable firewall, and
    /// it always follows the modern response shape: the assigned id is
    /// parsed regardless of session dialect.
    pub async fn create_in_vlan(
        &self,
        name: &str,
        description: &str,
        provider_vlan_id: &str,
    ) -> Result<String, Error> {
        let name = self.unique_name(name).await?;
        let mut params = Params::new();
        params.insert("GroupName".to_string(), name);
        params.insert("GroupDescription".to_string(), description.to_string());
        params.insert("VpcId".to_string(), provider_vlan_id.to_string());

        let doc = match self.invoke(CREATE_SECURITY_GROUP, params).await {
            Ok(doc) => doc,
            Err(e) => {
                error!(error = %e, "create rejected by backend");
                return Err(e);
            }
        };
        assigned_group_id(&doc, "create security group")
    }

    /// Delete a firewall.
    pub async fn delete(&self, firewall_id: &str) -> Result<(), Error> {
        let dialect = self.context().dialect();
        let mut params = Params::new();
        params.insert(dialect.group_key().to_string(), firewall_id.to_string());

        let doc = match self.invoke(DELETE_SECURITY_GROUP, params).await {
            Ok(doc) => doc,
            Err(e) => {
                error!(error = %e, firewall_id, "delete rejected by backend");
                return Err(e);
            }
        };
        Self::check_return(&doc, "delete security group")
    }

    /// Fetch one firewall by id.
    ///
    /// The describe call has no exact-match query in this shape, so the
    /// decoded set is filtered down to the requested id. An
    /// `InvalidGroup` rejection is an explicit "not there", not an
    /// error.
    pub async fn get_firewall(&self, firewall_id: &str) -> Result<Option<Firewall>, Error> {
        let region = self.context().region_id()?.to_string();
        let dialect = self.context().dialect();
        let mut params = Params::new();
        params.insert(dialect.group_filter_key().to_string(), firewall_id.to_string());

        let doc = match self.invoke(DESCRIBE_SECURITY_GROUPS, params).await {
            Ok(doc) => doc,
            Err(e) if e.is_invalid_group() => {
                debug!(firewall_id, "backend reports no such group");
                return Ok(None);
            }
            Err(e) => {
                error!(error = %e, firewall_id, "describe rejected by backend");
                return Err(e);
            }
        };

        Ok(codec::firewalls(&region, &doc)
            .into_iter()
            .find(|fw| fw.firewall_id == firewall_id))
    }

    /// List every firewall in the active region.
    pub async fn list(&self) -> Result<Vec<Firewall>, Error> {
        let region = self.context().region_id()?.to_string();

        let doc = match self.invoke(DESCRIBE_SECURITY_GROUPS, Params::new()).await {
            Ok(doc) => doc,
            Err(e) => {
                error!(error = %e, "list rejected by backend");
                return Err(e);
            }
        };
        Ok(codec::firewalls(&region, &doc))
    }

    /// Lightweight status listing: ids and availability only.
    pub async fn list_status(&self) -> Result<Vec<ResourceStatus>, Error> {
        self.context().region_id()?;

        let doc = match self.invoke(DESCRIBE_SECURITY_GROUPS, Params::new()).await {
            Ok(doc) => doc,
            Err(e) => {
                error!(error = %e, "status listing rejected by backend");
                return Err(e);
            }
        };
        Ok(codec::statuses(&doc))
    }

    /// Allocate a collision-free name: one listing call, then an
    /// in-memory scan of the candidate sequence.
    async fn unique_name(&self, requested: &str) -> Result<String, Error> {
        let existing: HashSet<String> = self
            .list()
            .await?
            .into_iter()
            .map(|fw| fw.firewall_id)
            .collect();
        name::unique_name(requested, |candidate| existing.contains(candidate))
    }
}

/// Pull the assigned group id out of a create response.
fn assigned_group_id(doc: &firebridge_xml::Element, action: &'static str) -> Result<String, Error> {
    doc.find_all("groupId")
        .into_iter()
        .find_map(firebridge_xml::Element::text)
        .map(str::to_string)
        .ok_or(Error::MalformedResponse { action })
}
