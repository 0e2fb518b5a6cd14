//! Pluggable anomaly detection seam
//!
//! **[DQA-DET-010]** Detection heuristics are external collaborators; the
//! pipeline only consumes `RawAnomaly` values in detection order. A single
//! erroring detector is logged and skipped, never aborting the run.

use async_trait::async_trait;
use dqa_common::Severity;
use sqlx::SqlitePool;

use crate::db::records::{self, SchemaRegistry};

/// A raw detected anomaly, before classification
#[derive(Debug, Clone)]
pub struct RawAnomaly {
    pub entity_type: String,
    pub entity_id: String,
    pub description: String,
    pub severity: Severity,
    pub suggested_fix: Option<String>,
}

/// Domain-specific validation rules are pluggable behind this trait
#[async_trait]
pub trait AnomalyDetector: Send + Sync {
    /// Detector name for logging and events
    fn name(&self) -> &'static str;

    /// Scan the dataset and return anomalies in detection order
    async fn detect(&self, pool: &SqlitePool) -> anyhow::Result<Vec<RawAnomaly>>;
}

/// Reference detector: required fields absent or empty on a record
///
/// Kept deliberately simple; production deployments register their own
/// detectors alongside or instead of this one.
pub struct MissingFieldDetector {
    registry: SchemaRegistry,
}

impl MissingFieldDetector {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl AnomalyDetector for MissingFieldDetector {
    fn name(&self) -> &'static str {
        "missing_field"
    }

    async fn detect(&self, pool: &SqlitePool) -> anyhow::Result<Vec<RawAnomaly>> {
        let mut anomalies = Vec::new();

        for entity_type in ["candidate", "company"] {
            let Some(fields) = self.registry.fields_for(entity_type) else {
                continue;
            };
            let mut fields: Vec<&String> = fields.iter().collect();
            fields.sort();

            for record in records::list_records(pool, entity_type).await? {
                let Some(object) = record.payload.as_object() else {
                    continue;
                };
                for field in &fields {
                    let missing = match object.get(field.as_str()) {
                        None | Some(serde_json::Value::Null) => true,
                        Some(serde_json::Value::String(s)) => s.trim().is_empty(),
                        Some(_) => false,
                    };
                    if missing {
                        anomalies.push(RawAnomaly {
                            entity_type: entity_type.to_string(),
                            entity_id: record.entity_id.clone(),
                            description: format!(
                                "{} {} is missing required field '{}'",
                                entity_type, record.entity_id, field
                            ),
                            severity: Severity::Warning,
                            suggested_fix: Some(format!(
                                "Populate '{}' from the source of record",
                                field
                            )),
                        });
                    }
                }
            }
        }

        Ok(anomalies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::records::EntityRecord;
    use serde_json::json;

    #[tokio::test]
    async fn detects_missing_and_empty_required_fields() {
        let pool = dqa_common::db::init_memory_pool().await.unwrap();
        db::init_tables(&pool).await.unwrap();

        records::upsert_record(
            &pool,
            &EntityRecord {
                entity_type: "candidate".to_string(),
                entity_id: "c-1".to_string(),
                payload: json!({
                    "full_name": "Ada Quinn",
                    "email": "  ",
                    "phone": "555-0100",
                    "current_title": "Engineer",
                    "years_experience": "7",
                    "location": "Lisbon",
                }),
                updated_at: chrono::Utc::now(),
            },
        )
        .await
        .unwrap();

        let detector = MissingFieldDetector::new(SchemaRegistry::default_registry());
        let anomalies = detector.detect(&pool).await.unwrap();

        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].entity_id, "c-1");
        assert!(anomalies[0].description.contains("email"));
        assert_eq!(anomalies[0].severity, Severity::Warning);
    }

    #[tokio::test]
    async fn complete_record_yields_no_anomalies() {
        let pool = dqa_common::db::init_memory_pool().await.unwrap();
        db::init_tables(&pool).await.unwrap();

        records::upsert_record(
            &pool,
            &EntityRecord {
                entity_type: "company".to_string(),
                entity_id: "co-1".to_string(),
                payload: json!({
                    "name": "Acme",
                    "industry": "Robotics",
                    "domain": "acme.example",
                    "headcount": "120",
                    "location": "Berlin",
                }),
                updated_at: chrono::Utc::now(),
            },
        )
        .await
        .unwrap();

        let detector = MissingFieldDetector::new(SchemaRegistry::default_registry());
        let anomalies = detector.detect(&pool).await.unwrap();
        assert!(anomalies.is_empty());
    }
}
