use chrono::{DateTime, Utc};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{Api, ResourceExt},
    client::Client,
    runtime::{
        controller::{Action, Controller},
        events::{Recorder, Reporter},
        watcher,
    },
};
use serde::Serialize;
use std::sync::Arc;
use tokio::{sync::RwLock, time::Duration};
use tracing::*;

use super::reconcile::{SyncOutcome, sync_secret};
use crate::{
    Error, Result,
    cacert::CaCertRepairer,
    config::Settings,
    events_helper::{emit_info, emit_warning},
};

// Context for our reconciler
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// Event recorder
    pub recorder: Recorder,
    /// Diagnostics read by the web server
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    /// Rewrites `cacert` references in clouds.yaml
    pub repairer: CaCertRepairer,
    pub settings: Settings,
}

impl Context {
    async fn record(&self, outcome: &Result<SyncOutcome>) {
        let mut diagnostics = self.diagnostics.write().await;
        diagnostics.last_event = Utc::now();
        diagnostics.last_outcome = Some(match outcome {
            Ok(outcome) => outcome.to_string(),
            Err(e) => format!("failed: {e}"),
        });
    }
}

async fn reconcile_secret(secret: Arc<Secret>, ctx: Arc<Context>) -> Result<Action> {
    let ns = secret
        .namespace()
        .unwrap_or_else(|| ctx.settings.namespace.clone());
    let api_secret: Api<Secret> = Api::namespaced(ctx.client.clone(), &ns);

    info!("Reconciling Secret \"{}\" in {}", secret.name_any(), ns);
    let outcome = sync_secret(
        &secret,
        &ctx.repairer,
        &ctx.settings.clouds_key,
        &api_secret,
    )
    .await;
    ctx.record(&outcome).await;

    match &outcome {
        Ok(SyncOutcome::Repaired(clouds)) => {
            emit_info(
                &ctx.recorder,
                &*secret,
                "CACertRepaired",
                "Repaired",
                Some(format!(
                    "Pointed cacert of {} at {}",
                    clouds.join(", "),
                    ctx.repairer.cacert_path()
                )),
            )
            .await;
        }
        Err(e @ Error::ParseError(_)) => {
            emit_warning(
                &ctx.recorder,
                &*secret,
                "InvalidCloudsYaml",
                "Repairing",
                Some(format!("`{}` is not valid YAML: {e}", ctx.settings.clouds_key)),
            )
            .await;
        }
        _ => {}
    }

    outcome.map(|_| Action::await_change())
}

/// Diagnostics to be exposed by the web server
#[derive(Clone, Serialize)]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
    pub last_outcome: Option<String>,
    #[serde(skip)]
    pub reporter: Reporter,
}
impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            last_event: Utc::now(),
            last_outcome: None,
            reporter: "openstack-secret-controller".into(),
        }
    }
}
impl Diagnostics {
    fn recorder(&self, client: Client) -> Recorder {
        Recorder::new(client, self.reporter.clone())
    }
}

/// State shared between the controller and the web server
#[derive(Clone, Default)]
pub struct State {
    /// Diagnostics populated by the reconciler
    diagnostics: Arc<RwLock<Diagnostics>>,
}

impl State {
    /// State getter
    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }

    // Create a Controller Context that can update State
    pub async fn to_context(&self, client: Client, settings: Settings) -> Arc<Context> {
        Arc::new(Context {
            client: client.clone(),
            recorder: self.diagnostics.read().await.recorder(client),
            diagnostics: self.diagnostics.clone(),
            repairer: settings.repairer(),
            settings,
        })
    }
}

fn secret_error_policy(_: Arc<Secret>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!("reconcile failed: {:?}", error);
    Action::requeue(Duration::from_secs(ctx.settings.requeue_secs))
}

/// Watch the root credentials secret until a shutdown signal arrives.
pub async fn run_secret(state: State, client: Client, settings: Settings) {
    let api_secret = Api::<Secret>::namespaced(client.clone(), &settings.namespace);
    let wc = watcher::Config::default()
        .fields(&format!("metadata.name={}", settings.secret_name))
        .any_semantic();
    info!(
        "Watching Secret \"{}\" in {} for cacert references",
        settings.secret_name, settings.namespace
    );
    Controller::new(api_secret, wc)
        .shutdown_on_signal()
        .run(
            reconcile_secret,
            secret_error_policy,
            state.to_context(client, settings).await,
        )
        .filter_map(async |x| std::result::Result::ok(x))
        .for_each(async |_| ())
        .await;
}
