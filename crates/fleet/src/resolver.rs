use thiserror::Error;
use tracing::info;

use crate::{FleetApi, RemoteTarget};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to list machines: {0:#}")]
    Api(anyhow::Error),
    #[error("{name} not found")]
    NotFound { name: String },
}

/// Maps machine names to addresses using a fresh fleet listing on every call.
pub struct FleetResolver<A> {
    api: A,
}

impl<A: FleetApi> FleetResolver<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// First exact (case-sensitive) name match wins.
    pub async fn resolve(&self, name: &str) -> Result<RemoteTarget, ResolveError> {
        let machines = self.api.list_machines().await.map_err(ResolveError::Api)?;
        info!(event = "fleet.list", machines = machines.len(), "fetched machine list");
        let record = machines
            .into_iter()
            .find(|machine| machine.name == name)
            .ok_or_else(|| ResolveError::NotFound {
                name: name.to_string(),
            })?;
        info!(
            event = "fleet.match",
            machine = %record.name,
            address = %record.address,
            "resolved machine"
        );
        Ok(record.into())
    }
}
