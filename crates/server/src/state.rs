use std::sync::Arc;

use service::organization::{OrganizationRepository, OrganizationService};

use crate::authorization::AuthorizationClient;

/// Shared by every handler; cheap to clone.
#[derive(Clone)]
pub struct ServerState {
    pub organizations: Arc<OrganizationService<dyn OrganizationRepository>>,
    /// Shared secret peer services present on balance mutations.
    pub interserver_secret_key: Arc<str>,
    /// `None` disables the identity check.
    pub authorization: Option<Arc<dyn AuthorizationClient>>,
}
