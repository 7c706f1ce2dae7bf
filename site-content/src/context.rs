//! Explicit tenant context
//!
//! Every resolver, writer and migration call receives the site it acts on
//! as a value. Host-to-site routing happens outside this crate.

use crate::database::{Site, SiteRepository};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: String,
    pub domain: String,
    /// Recorded in `created_by`/`updated_by` on component writes
    pub actor: Option<String>,
}

impl TenantContext {
    pub fn from_site(site: &Site) -> Self {
        Self {
            tenant_id: site.id.clone(),
            domain: site.domain.clone(),
            actor: None,
        }
    }

    /// Load the site, failing with `TenantNotFound` if it does not exist
    pub async fn load(sites: &SiteRepository, tenant_id: &str) -> Result<Self> {
        let site = sites.get_site(tenant_id).await?;
        Ok(Self::from_site(&site))
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }
}
