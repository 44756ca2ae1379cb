//! In-memory resource client for testing
//!
//! Behaves like a tiny API server for namespaced custom resources:
//! applied objects are stored with server-populated metadata, statuses can
//! be written as a controller would, and errors can be injected per verb.

use async_trait::async_trait;
use crdform_core::ApiMeta;
use kube::core::ErrorResponse;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::client::{ApplyParams, ResourceClient};
use crate::error::ApiVerb;

/// Location of one stored object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub gvr: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(api: &ApiMeta, namespace: &str, name: &str) -> Self {
        Self {
            gvr: api.gvr(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

/// One call received by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub verb: ApiVerb,
    pub key: ObjectKey,
    /// Body and options of an apply
    pub apply: Option<(Value, ApplyParams)>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub applies: usize,
    pub deletes: usize,
}

#[derive(Debug)]
struct ScheduledStatus {
    key: ObjectKey,
    remaining_gets: usize,
    status: Value,
}

#[derive(Debug, Default)]
struct MockState {
    objects: BTreeMap<ObjectKey, Value>,
    calls: Vec<RecordedCall>,
    counts: OperationCounts,
    failures: HashMap<ApiVerb, (u16, String)>,
    scheduled: Vec<ScheduledStatus>,
    next_uid: u64,
}

/// In-memory [`ResourceClient`]
#[derive(Clone, Default)]
pub struct MockResourceClient {
    state: Arc<RwLock<MockState>>,
}

impl MockResourceClient {
    /// Create a new empty mock client
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object as if it already existed in the cluster
    pub fn insert(&self, api: &ApiMeta, namespace: &str, name: &str, object: Value) {
        let mut state = self.write();
        let key = ObjectKey::new(api, namespace, name);
        state.objects.insert(key, object);
    }

    /// Current stored object
    pub fn object(&self, api: &ApiMeta, namespace: &str, name: &str) -> Option<Value> {
        let state = self.read();
        state.objects.get(&ObjectKey::new(api, namespace, name)).cloned()
    }

    /// Overwrite the status of a stored object, as a controller would
    pub fn set_status(&self, api: &ApiMeta, namespace: &str, name: &str, status: Value) {
        let mut state = self.write();
        if let Some(Value::Object(object)) = state.objects.get_mut(&ObjectKey::new(api, namespace, name)) {
            object.insert("status".to_string(), status);
        }
    }

    /// Write `status` once the object has been read `after_gets` more times
    pub fn set_status_after(&self, api: &ApiMeta, namespace: &str, name: &str, after_gets: usize, status: Value) {
        let mut state = self.write();
        state.scheduled.push(ScheduledStatus {
            key: ObjectKey::new(api, namespace, name),
            remaining_gets: after_gets,
            status,
        });
    }

    /// Fail every call of `verb` with an API error of the given HTTP code
    pub fn fail(&self, verb: ApiVerb, code: u16, message: impl Into<String>) {
        let mut state = self.write();
        state.failures.insert(verb, (code, message.into()));
    }

    /// Remove injected failures
    pub fn clear_failures(&self) {
        self.write().failures.clear();
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.read().calls.clone()
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.read().counts.clone()
    }

    /// Reset operation counts and recorded calls
    pub fn reset_counts(&self) {
        let mut state = self.write();
        state.counts = OperationCounts::default();
        state.calls.clear();
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        self.read().objects.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MockState {
    fn record(&mut self, verb: ApiVerb, key: &ObjectKey, apply: Option<(Value, ApplyParams)>) -> Result<(), kube::Error> {
        match verb {
            ApiVerb::Get => self.counts.gets += 1,
            ApiVerb::Apply => self.counts.applies += 1,
            ApiVerb::Delete => self.counts.deletes += 1,
        }
        self.calls.push(RecordedCall {
            verb,
            key: key.clone(),
            apply,
        });

        match self.failures.get(&verb) {
            Some((code, message)) => Err(api_error(*code, message)),
            None => Ok(()),
        }
    }

    fn run_scheduled(&mut self, key: &ObjectKey) {
        let mut due = Vec::new();
        self.scheduled.retain_mut(|scheduled| {
            if &scheduled.key != key {
                return true;
            }
            if scheduled.remaining_gets == 0 {
                due.push(scheduled.status.clone());
                return false;
            }
            scheduled.remaining_gets -= 1;
            true
        });

        if let Some(Value::Object(object)) = self.objects.get_mut(key) {
            for status in due {
                object.insert("status".to_string(), status);
            }
        }
    }
}

#[async_trait]
impl ResourceClient for MockResourceClient {
    async fn get(&self, api: &ApiMeta, namespace: &str, name: &str) -> Result<Value, kube::Error> {
        let key = ObjectKey::new(api, namespace, name);
        let mut state = self.write();
        state.record(ApiVerb::Get, &key, None)?;
        state.run_scheduled(&key);

        state
            .objects
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found(api, name))
    }

    async fn apply(
        &self,
        api: &ApiMeta,
        namespace: &str,
        name: &str,
        object: &Value,
        params: &ApplyParams,
    ) -> Result<Value, kube::Error> {
        let key = ObjectKey::new(api, namespace, name);
        let mut state = self.write();
        state.record(ApiVerb::Apply, &key, Some((object.clone(), params.clone())))?;

        let Value::Object(applied) = object else {
            return Err(api_error(400, "apply body must be an object"));
        };

        let existing = state.objects.get(&key).cloned();
        let mut stored = applied.clone();

        // Server-populated metadata, kept stable across applies
        let mut metadata = match stored.remove("metadata") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        metadata.insert("name".to_string(), Value::String(name.to_string()));
        metadata.insert("namespace".to_string(), Value::String(namespace.to_string()));

        let prior_meta = existing.as_ref().and_then(|o| o.get("metadata"));
        let generation = prior_meta
            .and_then(|m| m.get("generation"))
            .and_then(Value::as_i64)
            .unwrap_or(0)
            + 1;
        let uid = match prior_meta.and_then(|m| m.get("uid")).cloned() {
            Some(uid) => uid,
            None => {
                state.next_uid += 1;
                Value::String(format!("00000000-0000-0000-0000-{:012}", state.next_uid))
            }
        };
        metadata.insert("uid".to_string(), uid);
        metadata.insert("generation".to_string(), json!(generation));
        metadata.insert("resourceVersion".to_string(), Value::String(generation.to_string()));
        metadata.insert(
            "managedFields".to_string(),
            json!([{ "manager": params.field_manager, "operation": "Apply" }]),
        );
        stored.insert("metadata".to_string(), Value::Object(metadata));

        if let Some(status) = existing.as_ref().and_then(|o| o.get("status")) {
            stored.insert("status".to_string(), status.clone());
        }

        let stored = Value::Object(stored);
        state.objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, api: &ApiMeta, namespace: &str, name: &str) -> Result<(), kube::Error> {
        let key = ObjectKey::new(api, namespace, name);
        let mut state = self.write();
        state.record(ApiVerb::Delete, &key, None)?;

        match state.objects.remove(&key) {
            Some(_) => Ok(()),
            None => Err(not_found(api, name)),
        }
    }
}

/// Build a kube API error as the API server would return it
pub fn api_error(code: u16, message: impl Into<String>) -> kube::Error {
    let reason = match code {
        400 => "BadRequest",
        403 => "Forbidden",
        404 => "NotFound",
        409 => "Conflict",
        422 => "Invalid",
        _ => "InternalError",
    };
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.into(),
        reason: reason.to_string(),
        code,
    })
}

fn not_found(api: &ApiMeta, name: &str) -> kube::Error {
    api_error(
        404,
        format!("{}.{} \"{}\" not found", api.plural, api.group, name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listener() -> ApiMeta {
        ApiMeta::new("getambassador.io", "v3alpha1", "Listener", "listeners")
    }

    fn body(port: i64) -> Value {
        json!({
            "apiVersion": "getambassador.io/v3alpha1",
            "kind": "Listener",
            "metadata": {"name": "https", "namespace": "emissary"},
            "spec": {"port": port}
        })
    }

    #[tokio::test]
    async fn test_apply_then_get() {
        let mock = MockResourceClient::new();
        let api = listener();
        let params = ApplyParams::new("crdform", false);

        let created = mock.apply(&api, "emissary", "https", &body(8443), &params).await.unwrap();
        assert_eq!(created["metadata"]["generation"], 1);
        assert_eq!(created["spec"]["port"], 8443);

        let updated = mock.apply(&api, "emissary", "https", &body(443), &params).await.unwrap();
        assert_eq!(updated["metadata"]["generation"], 2);
        assert_eq!(updated["metadata"]["uid"], created["metadata"]["uid"]);

        let fetched = mock.get(&api, "emissary", "https").await.unwrap();
        assert_eq!(fetched, updated);

        assert_eq!(
            mock.operation_counts(),
            OperationCounts {
                gets: 1,
                applies: 2,
                deletes: 0
            }
        );
    }

    #[tokio::test]
    async fn test_missing_object_is_404() {
        let mock = MockResourceClient::new();
        let err = mock.get(&listener(), "emissary", "nope").await.unwrap_err();
        assert!(matches!(err, kube::Error::Api(ref r) if r.code == 404));

        let err = mock.delete(&listener(), "emissary", "nope").await.unwrap_err();
        assert!(matches!(err, kube::Error::Api(ref r) if r.code == 404));
    }

    #[tokio::test]
    async fn test_status_survives_apply() {
        let mock = MockResourceClient::new();
        let api = listener();
        let params = ApplyParams::new("crdform", false);

        mock.apply(&api, "emissary", "https", &body(8443), &params).await.unwrap();
        mock.set_status(&api, "emissary", "https", json!({"ready": true}));

        let updated = mock.apply(&api, "emissary", "https", &body(443), &params).await.unwrap();
        assert_eq!(updated["status"]["ready"], true);
    }

    #[tokio::test]
    async fn test_scheduled_status() {
        let mock = MockResourceClient::new();
        let api = listener();
        mock.insert(&api, "emissary", "https", body(8443));
        mock.set_status_after(&api, "emissary", "https", 2, json!({"phase": "Ready"}));

        for _ in 0..2 {
            let object = mock.get(&api, "emissary", "https").await.unwrap();
            assert!(object.get("status").is_none());
        }
        let object = mock.get(&api, "emissary", "https").await.unwrap();
        assert_eq!(object["status"]["phase"], "Ready");
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let mock = MockResourceClient::new();
        mock.fail(ApiVerb::Apply, 409, "conflict with manager kubectl");

        let err = mock
            .apply(&listener(), "emissary", "https", &body(1), &ApplyParams::new("crdform", false))
            .await
            .unwrap_err();
        assert!(matches!(err, kube::Error::Api(ref r) if r.code == 409 && r.reason == "Conflict"));
        assert_eq!(mock.object_count(), 0);

        mock.clear_failures();
        assert!(
            mock.apply(&listener(), "emissary", "https", &body(1), &ApplyParams::new("crdform", false))
                .await
                .is_ok()
        );
        assert_eq!(mock.calls().len(), 2);
    }
}
