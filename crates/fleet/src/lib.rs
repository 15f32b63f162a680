pub mod digitalocean;
pub mod machine;
pub mod resolver;

pub use digitalocean::{DigitalOceanClient, FleetCredentials, DEFAULT_API_URL};
pub use machine::{MachineRecord, RemoteTarget};
pub use resolver::{FleetResolver, ResolveError};

use async_trait::async_trait;

/// Source of the current machine list.
#[async_trait]
pub trait FleetApi: Send + Sync {
    /// Returns every machine the account can see, in provider order.
    async fn list_machines(&self) -> anyhow::Result<Vec<MachineRecord>>;
}
