use std::{collections::BTreeMap, fmt, future::Future};

use k8s_openapi::{ByteString, api::core::v1::Secret};
use kube::api::{Api, Patch, PatchParams, ResourceExt};
use serde_json::json;
use tracing::*;

use crate::{Error, Result, cacert::CaCertRepairer, helper::secret_text};

pub static SECRET_MANAGER_NAME: &str = "openstack-secret-controller";

/// Where repaired clouds.yaml payloads are written back to.
pub trait CloudsSink {
    fn write_clouds(
        &self,
        secret_name: &str,
        key: &str,
        clouds: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl CloudsSink for Api<Secret> {
    async fn write_clouds(&self, secret_name: &str, key: &str, clouds: &str) -> Result<()> {
        let data = BTreeMap::from([(key.to_string(), ByteString(clouds.as_bytes().to_vec()))]);
        let serverside = PatchParams::apply(SECRET_MANAGER_NAME);
        let patch = Patch::Merge(json!({ "data": data }));
        self.patch(secret_name, &serverside, &patch)
            .await
            .map_err(Error::KubeError)?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The secret has no clouds.yaml payload
    MissingKey,
    Unchanged,
    /// Clouds whose `cacert` was rewritten
    Repaired(Vec<String>),
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::MissingKey => write!(f, "missing clouds payload"),
            SyncOutcome::Unchanged => write!(f, "unchanged"),
            SyncOutcome::Repaired(clouds) => write!(f, "repaired {}", clouds.join(", ")),
        }
    }
}

/// Repair the clouds.yaml stored under `key` and write it back when it changed.
pub async fn sync_secret<S: CloudsSink>(
    secret: &Secret,
    repairer: &CaCertRepairer,
    key: &str,
    sink: &S,
) -> Result<SyncOutcome> {
    let name = secret.name_any();
    let Some(clouds) = secret_text(secret, key)? else {
        warn!("Secret {} has no `{}` key, skipping", name, key);
        return Ok(SyncOutcome::MissingKey);
    };

    let outcome = repairer.repair_report(&clouds)?;
    if !outcome.changed() {
        debug!("Secret {} already references {}", name, repairer.cacert_path());
        return Ok(SyncOutcome::Unchanged);
    }

    sink.write_clouds(&name, key, &outcome.document).await?;
    info!(
        "Updated `{}` in Secret {} for clouds {:?}",
        key, name, outcome.corrected
    );
    Ok(SyncOutcome::Repaired(outcome.corrected))
}

#[cfg(test)]
mod tests;
