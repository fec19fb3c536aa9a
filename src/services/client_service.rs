// Read access to clients and their service descriptions

use crate::core::errors::{ResourceKind, ServerError};
use crate::core::models::{Client, ClientId, ServiceDescription};
use crate::state::serverconf::ServerConfRepository;
use crate::state::store::ServerConfStore;
use std::sync::Arc;

pub struct ClientService {
    store: Arc<ServerConfStore>,
}

impl ClientService {
    pub fn new(store: Arc<ServerConfStore>) -> Self {
        Self { store }
    }

    /// Malformed identifiers are reported as unknown clients
    pub async fn get_client(&self, id: &str) -> Result<Client, ServerError> {
        let client_id: ClientId = id
            .parse()
            .map_err(|_| ServerError::not_found(ResourceKind::Client, id))?;
        self.store.read(|conf| conf.get_client(&client_id)).await
    }

    pub async fn get_client_service_descriptions(
        &self,
        id: &str,
    ) -> Result<(ClientId, Vec<ServiceDescription>), ServerError> {
        let client = self.get_client(id).await?;
        Ok((client.id, client.service_descriptions))
    }
}
