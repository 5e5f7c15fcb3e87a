use std::sync::Arc;

use comanda_store::DocumentStore;

use crate::auth::Authenticator;
use crate::model::Entity;
use crate::repository::Repository;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub auth: Arc<Authenticator>,
    /// Entity and aggregation routes demand a bearer token.
    pub require_auth: bool,
}

impl AppState {
    pub fn repo<E: Entity>(&self) -> Repository<E> {
        Repository::new(Arc::clone(&self.store))
    }
}
