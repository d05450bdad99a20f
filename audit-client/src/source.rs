//! Record sources and the retrieval fan-out
//!
//! A [`RecordSource`] answers "which records exist for this identifier" for
//! both upstream collections. [`fetch_snapshot`] queries both collections
//! concurrently, each with its own cap on in-flight requests, and only
//! returns once every identifier has been answered.

use crate::config::FetchLimits;
use crate::{ClientError, ClientResult};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use shared::{CrmEventWire, OrderDetailWire, OrderKey};
use std::collections::{HashMap, HashSet};
use std::future::Future;

/// Upstream collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    OrderDetails,
    CrmEvents,
}

impl Endpoint {
    /// Path below the service base URL
    pub fn path(&self) -> &'static str {
        match self {
            Self::OrderDetails => "controladoria-pedido-detalhado",
            Self::CrmEvents => "controle-andamento-crm",
        }
    }
}

/// Source of raw records, one identifier at a time
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn order_details(&self, id: &str) -> ClientResult<Vec<OrderDetailWire>>;
    async fn crm_events(&self, id: &str) -> ClientResult<Vec<CrmEventWire>>;
}

/// Identifier that could not be fetched from one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub endpoint: Endpoint,
    pub id: String,
    pub attempts: u32,
    pub error: String,
}

/// Both collections for a request list, in request order
#[derive(Debug, Clone, Default)]
pub struct FetchedRecords {
    pub order_details: Vec<OrderDetailWire>,
    pub crm_events: Vec<CrmEventWire>,
    /// Failed identifiers; they contribute no records
    pub failures: Vec<FetchFailure>,
}

/// Fetch both collections for every identifier.
///
/// Failures never abort the run: the identifier simply contributes no
/// records from that endpoint and is listed in [`FetchedRecords::failures`].
pub async fn fetch_snapshot<S>(source: &S, ids: &[OrderKey], limits: &FetchLimits) -> FetchedRecords
where
    S: RecordSource + ?Sized,
{
    tracing::info!(
        ids = ids.len(),
        max_in_flight = limits.max_in_flight,
        max_attempts = limits.max_attempts,
        "Fetching records"
    );

    let ((order_details, mut failures), (crm_events, crm_failures)) = tokio::join!(
        fetch_endpoint(ids, limits, Endpoint::OrderDetails, |id| source.order_details(id)),
        fetch_endpoint(ids, limits, Endpoint::CrmEvents, |id| source.crm_events(id)),
    );
    failures.extend(crm_failures);

    tracing::info!(
        order_details = order_details.len(),
        crm_events = crm_events.len(),
        failures = failures.len(),
        "Records fetched"
    );

    FetchedRecords {
        order_details,
        crm_events,
        failures,
    }
}

/// Query one endpoint for every identifier, keeping request order
async fn fetch_endpoint<'a, T, F, Fut>(
    ids: &'a [OrderKey],
    limits: &FetchLimits,
    endpoint: Endpoint,
    fetch: F,
) -> (Vec<T>, Vec<FetchFailure>)
where
    F: Fn(&'a str) -> Fut,
    Fut: Future<Output = ClientResult<Vec<T>>> + 'a,
{
    let fetch = &fetch;
    let results: Vec<_> = stream::iter(ids.iter().map(OrderKey::as_str))
        .map(|id| async move { (id, with_retry(id, endpoint, limits, fetch).await) })
        .buffered(limits.max_in_flight.max(1))
        .collect()
        .await;

    let mut records = Vec::new();
    let mut failures = Vec::new();
    for (id, result) in results {
        match result {
            Ok(batch) => records.extend(batch),
            Err((attempts, e)) => {
                tracing::warn!(
                    endpoint = endpoint.path(),
                    id,
                    attempts,
                    timeout = e.is_timeout(),
                    "Fetch failed, identifier has no records: {e}"
                );
                failures.push(FetchFailure {
                    endpoint,
                    id: id.to_string(),
                    attempts,
                    error: e.to_string(),
                });
            }
        }
    }
    (records, failures)
}

async fn with_retry<'a, T, F, Fut>(
    id: &'a str,
    endpoint: Endpoint,
    limits: &FetchLimits,
    fetch: &F,
) -> Result<Vec<T>, (u32, ClientError)>
where
    F: Fn(&'a str) -> Fut,
    Fut: Future<Output = ClientResult<Vec<T>>> + 'a,
{
    let mut attempt = 1;
    loop {
        match fetch(id).await {
            Ok(records) => return Ok(records),
            Err(e) if attempt < limits.max_attempts && e.is_retryable() => {
                let pause = limits.retry_backoff * 2u32.saturating_pow(attempt - 1);
                tracing::debug!(endpoint = endpoint.path(), id, attempt, "Retrying in {pause:?}: {e}");
                tokio::time::sleep(pause).await;
                attempt += 1;
            }
            Err(e) => return Err((attempt, e)),
        }
    }
}

/// In-memory source, keyed by canonical order key.
///
/// Used to replay snapshot files through the same path as live retrieval.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    order_details: HashMap<OrderKey, Vec<OrderDetailWire>>,
    crm_events: HashMap<OrderKey, Vec<CrmEventWire>>,
    failing: HashSet<(Endpoint, String)>,
}

impl StaticSource {
    pub fn from_records(order_details: Vec<OrderDetailWire>, crm_events: Vec<CrmEventWire>) -> Self {
        let mut source = Self::default();
        for record in order_details {
            if let Some(key) = record.order_key.as_deref().and_then(OrderKey::canonical) {
                source.order_details.entry(key).or_default().push(record);
            }
        }
        for record in crm_events {
            if let Some(key) = record.order_key.as_deref().and_then(OrderKey::canonical) {
                source.crm_events.entry(key).or_default().push(record);
            }
        }
        source
    }

    /// Make every request for `id` on `endpoint` fail
    pub fn fail(mut self, endpoint: Endpoint, id: &str) -> Self {
        self.failing.insert((endpoint, id.to_string()));
        self
    }

    fn check(&self, endpoint: Endpoint, id: &str) -> ClientResult<()> {
        if self.failing.contains(&(endpoint, id.to_string())) {
            return Err(ClientError::Status {
                endpoint: endpoint.path(),
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordSource for StaticSource {
    async fn order_details(&self, id: &str) -> ClientResult<Vec<OrderDetailWire>> {
        self.check(Endpoint::OrderDetails, id)?;
        Ok(self.order_details.get(id).cloned().unwrap_or_default())
    }

    async fn crm_events(&self, id: &str) -> ClientResult<Vec<CrmEventWire>> {
        self.check(Endpoint::CrmEvents, id)?;
        Ok(self.crm_events.get(id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::time::Duration;

    fn detail(key: &str, value: i64) -> OrderDetailWire {
        serde_json::from_value(json!({"pedido_normalizado": key, "valor_normalizado": value})).unwrap()
    }

    fn event(key: &str, desc: &str) -> CrmEventWire {
        serde_json::from_value(json!({"pedido_normalizado": key, "andamento_descricao": desc})).unwrap()
    }

    fn keys(ids: &[&str]) -> Vec<OrderKey> {
        ids.iter().filter_map(|id| OrderKey::canonical(id)).collect()
    }

    #[tokio::test]
    async fn test_fetch_keeps_request_order() {
        let source = StaticSource::from_records(
            vec![detail("2", 20), detail("1", 10), detail("1", 11)],
            vec![event("2", "FINALIZADO")],
        );
        let fetched = fetch_snapshot(&source, &keys(&["1", "2", "3"]), &FetchLimits::default()).await;

        let order: Vec<_> = fetched
            .order_details
            .iter()
            .map(|r| r.order_key.as_deref().unwrap())
            .collect();
        assert_eq!(order, vec!["1", "1", "2"]);
        assert_eq!(fetched.crm_events.len(), 1);
        assert!(fetched.failures.is_empty());
    }

    #[tokio::test]
    async fn test_failure_means_no_records() {
        let source = StaticSource::from_records(vec![detail("1", 10), detail("2", 20)], vec![])
            .fail(Endpoint::OrderDetails, "2");
        let fetched = fetch_snapshot(&source, &keys(&["1", "2"]), &FetchLimits::default()).await;

        assert_eq!(fetched.order_details.len(), 1);
        assert_eq!(fetched.failures.len(), 1);
        assert_eq!(fetched.failures[0].endpoint, Endpoint::OrderDetails);
        assert_eq!(fetched.failures[0].id, "2");
        assert_eq!(fetched.failures[0].attempts, 1);
    }

    struct Flaky {
        calls: AtomicU32,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl RecordSource for Flaky {
        async fn order_details(&self, id: &str) -> ClientResult<Vec<OrderDetailWire>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ClientError::Status {
                    endpoint: Endpoint::OrderDetails.path(),
                    status: 502,
                    body: String::new(),
                });
            }
            Ok(vec![detail(id, 1)])
        }

        async fn crm_events(&self, _id: &str) -> ClientResult<Vec<CrmEventWire>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_retry_and_in_flight_cap() {
        let source = Flaky {
            calls: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let limits = FetchLimits {
            max_in_flight: 2,
            max_attempts: 2,
            retry_backoff: Duration::from_millis(1),
        };
        let fetched = fetch_snapshot(&source, &keys(&["A", "B", "C", "D"]), &limits).await;

        assert!(fetched.failures.is_empty());
        assert_eq!(fetched.order_details.len(), 4);
        assert_eq!(source.calls.load(Ordering::SeqCst), 5);
        assert!(source.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_without_retry_the_first_error_is_final() {
        let source = Flaky {
            calls: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let fetched = fetch_snapshot(&source, &keys(&["A"]), &FetchLimits::default()).await;
        assert!(fetched.order_details.is_empty());
        assert_eq!(fetched.failures.len(), 1);
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::OrderDetails.path(), "controladoria-pedido-detalhado");
        assert_eq!(Endpoint::CrmEvents.path(), "controle-andamento-crm");
    }
}
