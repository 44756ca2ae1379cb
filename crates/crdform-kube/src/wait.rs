//! Post-apply `wait_for` polling
//!
//! Each entry re-fetches the object until a JSONPath expression yields the
//! expected value. Entries run in order, each under its own timeout; the
//! in-flight poll is dropped when the timeout elapses.

use crdform_core::{ApiMeta, keys};
use serde_json::Value;
use std::time::Duration;

use crate::client::ResourceClient;
use crate::error::{AdapterError, ApiVerb, Result};

/// One `wait_for` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitCondition {
    /// Expression as written by the user
    pub jsonpath: String,
    /// Expected string form of the selected value
    pub value: String,
    /// Entry timeout; the provider default applies when unset
    pub timeout: Option<Duration>,
}

impl WaitCondition {
    pub fn new(jsonpath: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            jsonpath: jsonpath.into(),
            value: value.into(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read the `wait_for` list of a plan or state
    pub fn from_state(state: &Value) -> Result<Vec<Self>> {
        let Some(entries) = state.get(keys::WAIT_FOR).and_then(Value::as_array) else {
            return Ok(Vec::new());
        };

        entries.iter().map(Self::from_entry).collect()
    }

    fn from_entry(entry: &Value) -> Result<Self> {
        let field = |key: &str| entry.get(key).and_then(Value::as_str);

        let jsonpath = field(keys::JSONPATH).ok_or_else(|| AdapterError::InvalidWaitCondition {
            jsonpath: String::new(),
            message: "missing 'jsonpath'".to_string(),
        })?;
        let invalid = |message: String| AdapterError::InvalidWaitCondition {
            jsonpath: jsonpath.to_string(),
            message,
        };

        let value = field(keys::VALUE).ok_or_else(|| invalid("missing 'value'".to_string()))?;
        let mut condition = Self::new(jsonpath, value);

        if let Some(timeout) = field(keys::TIMEOUT) {
            let timeout = humantime::parse_duration(timeout)
                .map_err(|e| invalid(format!("invalid timeout '{}': {}", timeout, e)))?;
            condition = condition.with_timeout(timeout);
        }

        condition.check()?;
        Ok(condition)
    }

    /// JSONPath with a `$` root, accepting `.a.b`, `a.b` and `{.a.b}`
    pub fn normalized_path(&self) -> String {
        let path = self.jsonpath.trim();
        let path = path
            .strip_prefix('{')
            .and_then(|p| p.strip_suffix('}'))
            .unwrap_or(path)
            .trim();

        if path.starts_with('$') {
            path.to_string()
        } else if path.starts_with('.') || path.starts_with('[') {
            format!("${}", path)
        } else {
            format!("$.{}", path)
        }
    }

    /// Fail early on expressions that do not compile
    pub fn check(&self) -> Result<()> {
        self.select(&Value::Object(Default::default())).map(|_| ())
    }

    /// String forms of every value the expression selects
    pub fn select(&self, object: &Value) -> Result<Vec<String>> {
        let selected = jsonpath_lib::select(object, &self.normalized_path()).map_err(|e| {
            AdapterError::InvalidWaitCondition {
                jsonpath: self.jsonpath.clone(),
                message: format!("{:?}", e),
            }
        })?;
        Ok(selected.into_iter().map(string_form).collect())
    }

    /// Whether the object satisfies the condition
    pub fn is_met(&self, object: &Value) -> Result<bool> {
        Ok(self.select(object)?.iter().any(|v| v == &self.value))
    }
}

fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Where and how to poll
#[derive(Debug, Clone, Copy)]
pub struct WaitTarget<'a> {
    pub api: &'a ApiMeta,
    pub namespace: &'a str,
    pub name: &'a str,
    pub default_timeout: Duration,
    pub interval: Duration,
}

/// Run every condition in order; returns the last object fetched
pub async fn wait_for_conditions(
    client: &dyn ResourceClient,
    target: WaitTarget<'_>,
    conditions: &[WaitCondition],
) -> Result<Option<Value>> {
    let mut latest = None;

    for condition in conditions {
        let timeout = condition.timeout.unwrap_or(target.default_timeout);
        tracing::info!(
            kind = %target.api.kind,
            namespace = target.namespace,
            name = target.name,
            jsonpath = %condition.jsonpath,
            expected = %condition.value,
            timeout = %humantime::format_duration(timeout),
            "waiting for condition"
        );

        let mut last_seen: Option<String> = None;
        let polled = tokio::time::timeout(
            timeout,
            poll_until_met(client, &target, condition, &mut last_seen),
        )
        .await;

        match polled {
            Ok(result) => latest = Some(result?),
            Err(_) => {
                return Err(AdapterError::WaitTimeout {
                    kind: target.api.kind.clone(),
                    namespace: target.namespace.to_string(),
                    name: target.name.to_string(),
                    jsonpath: condition.jsonpath.clone(),
                    expected: condition.value.clone(),
                    timeout: humantime::format_duration(timeout).to_string(),
                    last: last_seen.unwrap_or_else(|| "<none>".to_string()),
                });
            }
        }
    }

    Ok(latest)
}

async fn poll_until_met(
    client: &dyn ResourceClient,
    target: &WaitTarget<'_>,
    condition: &WaitCondition,
    last_seen: &mut Option<String>,
) -> Result<Value> {
    loop {
        let object = client
            .get(target.api, target.namespace, target.name)
            .await
            .map_err(|e| AdapterError::from_api(ApiVerb::Get, &target.api.kind, target.namespace, target.name, e))?;

        let values = condition.select(&object)?;
        if values.iter().any(|v| v == &condition.value) {
            tracing::debug!(jsonpath = %condition.jsonpath, "condition met");
            return Ok(object);
        }

        *last_seen = Some(match values.as_slice() {
            [] => "<none>".to_string(),
            [single] => single.clone(),
            many => many.join(", "),
        });
        tokio::time::sleep(target.interval).await;
    }
}
