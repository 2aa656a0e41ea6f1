use std::net::IpAddr;

use tracing::{info, warn};

use crate::changelog::ChangeLog;
use crate::config::Settings;
use crate::dns::{find_record_id, DnsProvider};
use crate::error::AgentError;
use crate::ip::{self, ResolvedAddress};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Run the update cycle even when the change log matches.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The address matches the change log; the provider was not contacted.
    Unchanged(ResolvedAddress),
    /// Every configured hostname now points at `address`.
    Updated {
        address: ResolvedAddress,
        hostnames: Vec<String>,
    },
}

/// Runs one reconciliation: resolve the address, consult the change log and,
/// if required, point every configured hostname at the new address.
///
/// Once an update is required the zone's records are always listed, even
/// with no hostnames configured. Stops at the first failure; hostnames after
/// a failing one are not touched.
pub async fn run_once(
    settings: &Settings,
    provider: &dyn DnsProvider,
    options: RunOptions,
) -> Result<RunOutcome, AgentError> {
    info!(
        "Reconciling zone {} via {} using {} address",
        settings.zone.name,
        provider.provider_name(),
        settings.ip
    );

    let resolved = ip::resolve(&settings.ip, settings.timeout()).await?;

    let change_log = ChangeLog::new(&settings.agent.change_log);
    let update_required = if options.force {
        info!("Forced run, ignoring change log {}", change_log.path().display());
        change_log.write(resolved.address).await?;
        true
    } else {
        change_log.check_and_update(resolved.address).await?
    };

    if !update_required {
        info!("No update required");
        return Ok(RunOutcome::Unchanged(resolved));
    }

    if let Err(e) = apply(settings, provider, resolved.address).await {
        warn!(
            "Change log already records {}; run with --force to retry the update",
            resolved.address
        );
        return Err(e);
    }

    info!(
        "Updated {} hostnames in zone {} to {}",
        settings.zone.hostnames.len(),
        settings.zone.name,
        resolved.address
    );

    Ok(RunOutcome::Updated {
        address: resolved,
        hostnames: settings.zone.hostnames.clone(),
    })
}

async fn apply(
    settings: &Settings,
    provider: &dyn DnsProvider,
    address: IpAddr,
) -> Result<(), AgentError> {
    let records = provider.list_records().await?;

    if settings.zone.hostnames.is_empty() {
        warn!(
            "No hostnames configured for zone {}, nothing to update",
            settings.zone.name
        );
    }

    for hostname in &settings.zone.hostnames {
        let record_id = find_record_id(&records, hostname)?;
        info!("Record {} has ID {}", hostname, record_id);
        provider.update_record(record_id, hostname, address).await?;
    }

    Ok(())
}
