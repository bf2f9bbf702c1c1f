use clap::Parser;

use crate::cacert::{CaCertRepairer, DEFAULT_CACERT_PATH};

/// Operator settings, read from flags or the environment.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Settings {
    /// Namespace holding the root credentials secret
    #[arg(long, env = "CCO_NAMESPACE", default_value = "kube-system")]
    pub namespace: String,

    /// Name of the root credentials secret
    #[arg(long, env = "CCO_SECRET_NAME", default_value = "openstack-credentials")]
    pub secret_name: String,

    /// Secret data key holding clouds.yaml
    #[arg(long, env = "CCO_CLOUDS_KEY", default_value = "clouds.yaml")]
    pub clouds_key: String,

    /// Path every cloud's `cacert` must point at
    #[arg(long, env = "CCO_CACERT_PATH", default_value = DEFAULT_CACERT_PATH)]
    pub cacert_path: String,

    /// Listen address of the health and diagnostics server
    #[arg(long, env = "CCO_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Delay before retrying a failed reconcile
    #[arg(long, env = "CCO_REQUEUE_SECS", default_value_t = 5 * 60)]
    pub requeue_secs: u64,
}

impl Settings {
    pub fn repairer(&self) -> CaCertRepairer {
        CaCertRepairer::new(self.cacert_path.clone())
    }
}
