// firebridge: provider-neutral firewall operations over the EC2-family
// security group wire dialects (classic + modern/VPC).

pub mod client;
pub mod codec;
pub mod context;
pub mod dialect;
pub mod error;
pub mod groups;
pub mod model;
pub mod name;
pub mod rules;
pub mod transport;

pub use client::FirewallClient;
pub use context::{Credentials, ProviderContext};
pub use dialect::{ProviderMode, WireDialect};
pub use error::Error;
pub use model::{
    Direction, Firewall, FirewallRule, Permission, Protocol, ResourceStatus, RuleTarget,
};
pub use transport::{HttpTransport, Params, Transport};
