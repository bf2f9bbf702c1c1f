use super::*;
use crate::cacert::DEFAULT_CACERT_PATH;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::sync::Mutex;

const CLOUDS_KEY: &str = "clouds.yaml";

#[derive(Default)]
struct RecordingSink {
    writes: Mutex<Vec<(String, String, String)>>,
}

impl CloudsSink for RecordingSink {
    async fn write_clouds(&self, secret_name: &str, key: &str, clouds: &str) -> Result<()> {
        self.writes.lock().unwrap().push((
            secret_name.to_string(),
            key.to_string(),
            clouds.to_string(),
        ));
        Ok(())
    }
}

fn root_secret(clouds: Option<&str>) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some("openstack-credentials".into()),
            namespace: Some("kube-system".into()),
            ..ObjectMeta::default()
        },
        data: clouds.map(|c| {
            BTreeMap::from([(CLOUDS_KEY.to_string(), ByteString(c.as_bytes().to_vec()))])
        }),
        ..Secret::default()
    }
}

fn clouds_with_cacert(path: &str) -> String {
    format!(
        "clouds:\n  openstack:\n    auth:\n      auth_url: http://1.2.3.4:5000\n    cacert: {path}\n    region_name: regionOne\n"
    )
}

#[tokio::test]
async fn repaired_clouds_are_written_back() {
    let sink = RecordingSink::default();
    let secret = root_secret(Some(&clouds_with_cacert("/incorrect/path/to/ca-bundle.pem")));

    let outcome = sync_secret(&secret, &CaCertRepairer::default(), CLOUDS_KEY, &sink)
        .await
        .expect("sync");
    assert_eq!(outcome, SyncOutcome::Repaired(vec!["openstack".into()]));

    let writes = sink.writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    let (name, key, clouds) = &writes[0];
    assert_eq!(name, "openstack-credentials");
    assert_eq!(key, CLOUDS_KEY);
    let written: serde_yaml::Value = serde_yaml::from_str(clouds).unwrap();
    assert_eq!(
        written["clouds"]["openstack"]["cacert"].as_str(),
        Some(DEFAULT_CACERT_PATH)
    );
}

#[tokio::test]
async fn correct_clouds_are_not_written() {
    let sink = RecordingSink::default();
    let secret = root_secret(Some(&clouds_with_cacert(DEFAULT_CACERT_PATH)));

    let outcome = sync_secret(&secret, &CaCertRepairer::default(), CLOUDS_KEY, &sink)
        .await
        .expect("sync");
    assert_eq!(outcome, SyncOutcome::Unchanged);
    assert!(sink.writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_key_is_skipped() {
    let sink = RecordingSink::default();
    let outcome = sync_secret(&root_secret(None), &CaCertRepairer::default(), CLOUDS_KEY, &sink)
        .await
        .expect("sync");
    assert_eq!(outcome, SyncOutcome::MissingKey);
    assert!(sink.writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_yaml_surfaces_parse_error() {
    let sink = RecordingSink::default();
    let err = sync_secret(&root_secret(Some("\"")), &CaCertRepairer::default(), CLOUDS_KEY, &sink)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ParseError(_)), "got {err:?}");
    assert!(sink.writes.lock().unwrap().is_empty());
}

#[test]
fn outcome_display() {
    assert_eq!(SyncOutcome::Unchanged.to_string(), "unchanged");
    assert_eq!(
        SyncOutcome::Repaired(vec!["a".into(), "b".into()]).to_string(),
        "repaired a, b"
    );
}
