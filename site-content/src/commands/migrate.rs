//! Migration command

use crate::app::AppState;
use crate::error::{AppError, Result};
use serde::Serialize;
use std::fmt;

/// A site that did not migrate cleanly
#[derive(Debug, Serialize)]
pub struct TenantFailure {
    pub tenant_id: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct MigrationSummary {
    pub sites: usize,
    pub migrated: usize,
    pub skipped: usize,
    pub failures: Vec<TenantFailure>,
}

impl MigrationSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, tenant_id: String, errors: Vec<String>) {
        self.failures.push(TenantFailure { tenant_id, errors });
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for failure in &self.failures {
            for error in &failure.errors {
                writeln!(f, "FAILED site {}: {}", failure.tenant_id, error)?;
            }
        }
        write!(
            f,
            "Migrated {} blocks across {} sites ({} already migrated, {} sites failed)",
            self.migrated,
            self.sites,
            self.skipped,
            self.failures.len()
        )
    }
}

/// Migrate one site, or every site when `site_id` is `None`
pub async fn migrate(
    state: &AppState,
    site_id: Option<&str>,
    force: bool,
) -> Result<MigrationSummary> {
    let mut summary = MigrationSummary::default();

    let (reports, failed) = match site_id {
        Some(id) => match state.migrations.migrate_tenant(id, force).await {
            Ok(report) => (vec![report], Vec::new()),
            Err(e @ AppError::Database(_)) => return Err(e),
            Err(e) => (Vec::new(), vec![(id.to_string(), e)]),
        },
        None => {
            let bulk = state.migrations.migrate_all(force).await?;
            (bulk.reports, bulk.failed_tenants)
        }
    };

    summary.sites = reports.len() + failed.len();

    for report in reports {
        summary.migrated += report.migrated_count();
        summary.skipped += report.skipped.len();
        if !report.is_success() {
            let errors = report.failures.iter().map(|e| e.to_string()).collect();
            summary.fail(report.tenant_id, errors);
        }
    }

    for (tenant_id, error) in failed {
        summary.fail(tenant_id, vec![error.to_string()]);
    }

    Ok(summary)
}
