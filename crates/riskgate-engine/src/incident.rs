//! Incident persistence and alerting
//!
//! Incidents are queued to a background writer task so persistence can
//! never block the decision that was already made; a store failure is
//! logged and swallowed. High-severity incidents additionally trigger a
//! fire-and-forget alert dispatch.

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use riskgate_core::{Decision, FraudIncident};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;

/// User risk profile read back from persisted history
#[derive(Debug, Clone, Default)]
pub struct UserRiskProfile {
    /// Historical return rate in [0, 1]
    pub return_rate: f64,

    /// Lifetime chargeback count
    pub chargeback_count: u32,
}

/// Relational store collaborator for incidents.
///
/// `record` inserts the immutable evaluation record;
/// `update_disposition` is the only later mutation and touches nothing
/// but decision, notes, and updated_at (append-mostly audit trail).
#[async_trait]
pub trait IncidentStore: Send + Sync {
    async fn record(&self, incident: &FraudIncident) -> Result<()>;

    async fn update_disposition(
        &self,
        incident_id: &str,
        decision: Decision,
        notes: Option<String>,
    ) -> Result<()>;

    /// Read back a user's risk profile for context enrichment
    async fn user_profile(&self, user_id: &str) -> Result<Option<UserRiskProfile>>;
}

/// In-memory incident store for tests and development
pub struct MemoryIncidentStore {
    incidents: RwLock<HashMap<String, FraudIncident>>,
    profiles: RwLock<HashMap<String, UserRiskProfile>>,
}

impl MemoryIncidentStore {
    pub fn new() -> Self {
        Self {
            incidents: RwLock::new(HashMap::new()),
            profiles: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a user profile
    pub fn set_profile(&self, user_id: impl Into<String>, profile: UserRiskProfile) {
        if let Ok(mut profiles) = self.profiles.write() {
            profiles.insert(user_id.into(), profile);
        }
    }

    /// Fetch a stored incident
    pub fn get(&self, incident_id: &str) -> Option<FraudIncident> {
        self.incidents
            .read()
            .ok()
            .and_then(|incidents| incidents.get(incident_id).cloned())
    }

    pub fn len(&self) -> usize {
        self.incidents.read().map(|i| i.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryIncidentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IncidentStore for MemoryIncidentStore {
    async fn record(&self, incident: &FraudIncident) -> Result<()> {
        self.incidents
            .write()
            .map_err(|e| EngineError::Persistence(format!("lock poisoned: {}", e)))?
            .insert(incident.id.clone(), incident.clone());
        Ok(())
    }

    async fn update_disposition(
        &self,
        incident_id: &str,
        decision: Decision,
        notes: Option<String>,
    ) -> Result<()> {
        let mut incidents = self
            .incidents
            .write()
            .map_err(|e| EngineError::Persistence(format!("lock poisoned: {}", e)))?;

        let incident = incidents
            .get_mut(incident_id)
            .ok_or_else(|| EngineError::Persistence(format!("unknown incident {}", incident_id)))?;

        incident.decision = decision;
        incident.notes = notes;
        incident.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn user_profile(&self, user_id: &str) -> Result<Option<UserRiskProfile>> {
        let profiles = self
            .profiles
            .read()
            .map_err(|e| EngineError::Persistence(format!("lock poisoned: {}", e)))?;
        Ok(profiles.get(user_id).cloned())
    }
}

/// Postgres incident store
#[cfg(feature = "sqlx")]
pub struct PgIncidentStore {
    pool: sqlx::PgPool,
}

#[cfg(feature = "sqlx")]
impl PgIncidentStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "sqlx")]
#[async_trait]
impl IncidentStore for PgIncidentStore {
    async fn record(&self, incident: &FraudIncident) -> Result<()> {
        let rule_results = serde_json::to_value(&incident.rule_results)
            .map_err(|e| EngineError::Persistence(format!("serialize rule_results: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO fraud_incidents (
                id, user_id, email, ip, user_agent, action,
                amount_minor, currency, rule_results, rules_fired,
                heuristic_score, model_score, final_score, decision,
                notes, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&incident.id)
        .bind(incident.user_id.as_deref())
        .bind(incident.email.as_deref())
        .bind(incident.ip.as_deref())
        .bind(incident.user_agent.as_deref())
        .bind(&incident.action)
        .bind(incident.amount_minor)
        .bind(&incident.currency)
        .bind(&rule_results)
        .bind(&incident.rules_fired)
        .bind(incident.heuristic_score)
        .bind(incident.model_score)
        .bind(incident.final_score)
        .bind(incident.decision.as_str())
        .bind(incident.notes.as_deref())
        .bind(incident.created_at)
        .bind(incident.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Persistence(format!("insert fraud_incident: {}", e)))?;

        Ok(())
    }

    async fn update_disposition(
        &self,
        incident_id: &str,
        decision: Decision,
        notes: Option<String>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE fraud_incidents
            SET decision = $2, notes = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(incident_id)
        .bind(decision.as_str())
        .bind(notes.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Persistence(format!("update fraud_incident: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(EngineError::Persistence(format!(
                "unknown incident {}",
                incident_id
            )));
        }
        Ok(())
    }

    async fn user_profile(&self, user_id: &str) -> Result<Option<UserRiskProfile>> {
        use sqlx::Row;

        let row = sqlx::query(
            r#"
            SELECT return_rate, chargeback_count
            FROM user_risk_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| EngineError::Persistence(format!("query user_risk_profiles: {}", e)))?;

        Ok(row.map(|row| UserRiskProfile {
            return_rate: row.get::<f64, _>("return_rate"),
            chargeback_count: row.get::<i32, _>("chargeback_count") as u32,
        }))
    }
}

/// Async incident writer that queues writes to a background task so
/// persistence never blocks the protected transaction
#[derive(Clone)]
pub struct IncidentWriter {
    sender: mpsc::UnboundedSender<FraudIncident>,
}

impl IncidentWriter {
    /// Spawn the background writer over the given store
    pub fn new(store: Arc<dyn IncidentStore>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(Self::process_incidents(receiver, store));
        Self { sender }
    }

    /// Queue an incident for persistence. Failures are logged, never
    /// surfaced: recording completeness is traded for availability.
    pub fn record(&self, incident: FraudIncident) {
        if let Err(e) = self.sender.send(incident) {
            tracing::error!(error = %e, "incident writer channel closed, dropping incident");
        }
    }

    async fn process_incidents(
        mut receiver: mpsc::UnboundedReceiver<FraudIncident>,
        store: Arc<dyn IncidentStore>,
    ) {
        tracing::debug!("incident writer background task started");

        while let Some(incident) = receiver.recv().await {
            match store.record(&incident).await {
                Ok(()) => {
                    tracing::debug!(incident_id = %incident.id, "incident persisted");
                }
                Err(e) => {
                    tracing::error!(
                        incident_id = %incident.id,
                        error = %e,
                        "failed to persist incident"
                    );
                }
            }
        }

        tracing::warn!("incident writer background task ended (channel closed)");
    }
}

/// Alert dispatcher collaborator for high-severity incidents
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    async fn dispatch(&self, incident: &FraudIncident) -> Result<()>;
}

/// Dispatcher that drops alerts (default wiring)
pub struct NoopAlertDispatcher;

#[async_trait]
impl AlertDispatcher for NoopAlertDispatcher {
    async fn dispatch(&self, _incident: &FraudIncident) -> Result<()> {
        Ok(())
    }
}

/// Webhook alert dispatcher with a short timeout
pub struct WebhookAlertDispatcher {
    client: reqwest::Client,
    url: String,
}

impl WebhookAlertDispatcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl AlertDispatcher for WebhookAlertDispatcher {
    async fn dispatch(&self, incident: &FraudIncident) -> Result<()> {
        let payload = serde_json::json!({
            "incident_id": incident.id,
            "score": incident.final_score,
            "decision": incident.decision.as_str(),
            "rules_fired": incident.rules_fired,
            "action": incident.action,
            "created_at": incident.created_at,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EngineError::Lookup(format!("alert webhook failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(EngineError::Lookup(format!(
                "alert webhook returned status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Counting dispatcher for tests
pub struct MockAlertDispatcher {
    dispatched: std::sync::atomic::AtomicUsize,
}

impl MockAlertDispatcher {
    pub fn new() -> Self {
        Self {
            dispatched: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.dispatched.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Default for MockAlertDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertDispatcher for MockAlertDispatcher {
    async fn dispatch(&self, _incident: &FraudIncident) -> Result<()> {
        self.dispatched
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap as StdHashMap;

    fn incident(id: &str, score: f64) -> FraudIncident {
        let now = Utc::now();
        FraudIncident {
            id: id.to_string(),
            user_id: Some("u_1".to_string()),
            email: None,
            ip: None,
            user_agent: None,
            action: "checkout".to_string(),
            amount_minor: 1_000,
            currency: "USD".to_string(),
            rule_results: StdHashMap::new(),
            rules_fired: Vec::new(),
            heuristic_score: score,
            model_score: None,
            final_score: score,
            decision: Decision::Allow,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_memory_store_record_and_get() {
        let store = MemoryIncidentStore::new();
        store.record(&incident("inc_1", 0.5)).await.unwrap();

        let stored = store.get("inc_1").unwrap();
        assert_eq!(stored.final_score, 0.5);
    }

    #[tokio::test]
    async fn test_update_disposition_touches_only_disposition() {
        let store = MemoryIncidentStore::new();
        store.record(&incident("inc_1", 0.7)).await.unwrap();

        store
            .update_disposition("inc_1", Decision::Deny, Some("confirmed dispute".to_string()))
            .await
            .unwrap();

        let stored = store.get("inc_1").unwrap();
        assert_eq!(stored.decision, Decision::Deny);
        assert_eq!(stored.notes.as_deref(), Some("confirmed dispute"));
        // scores never mutate
        assert_eq!(stored.final_score, 0.7);
    }

    #[tokio::test]
    async fn test_update_unknown_incident_errors() {
        let store = MemoryIncidentStore::new();
        let result = store
            .update_disposition("missing", Decision::Deny, None)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_user_profile_read_back() {
        let store = MemoryIncidentStore::new();
        store.set_profile(
            "u_9",
            UserRiskProfile {
                return_rate: 0.4,
                chargeback_count: 2,
            },
        );

        let profile = store.user_profile("u_9").await.unwrap().unwrap();
        assert_eq!(profile.chargeback_count, 2);
        assert!(store.user_profile("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_writer_persists_in_background() {
        let store = Arc::new(MemoryIncidentStore::new());
        let writer = IncidentWriter::new(store.clone());

        writer.record(incident("inc_bg", 0.3));

        // give the background task a moment
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.get("inc_bg").is_some());
    }

    #[tokio::test]
    async fn test_writer_swallows_store_failure() {
        struct FailingStore;

        #[async_trait]
        impl IncidentStore for FailingStore {
            async fn record(&self, _incident: &FraudIncident) -> Result<()> {
                Err(EngineError::Persistence("outage".to_string()))
            }

            async fn update_disposition(
                &self,
                _incident_id: &str,
                _decision: Decision,
                _notes: Option<String>,
            ) -> Result<()> {
                Err(EngineError::Persistence("outage".to_string()))
            }

            async fn user_profile(&self, _user_id: &str) -> Result<Option<UserRiskProfile>> {
                Err(EngineError::Persistence("outage".to_string()))
            }
        }

        let writer = IncidentWriter::new(Arc::new(FailingStore));
        // must not panic or propagate
        writer.record(incident("inc_fail", 0.9));
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_mock_dispatcher_counts() {
        let dispatcher = MockAlertDispatcher::new();
        dispatcher.dispatch(&incident("inc_a", 0.95)).await.unwrap();
        dispatcher.dispatch(&incident("inc_b", 0.99)).await.unwrap();
        assert_eq!(dispatcher.count(), 2);
    }
}
