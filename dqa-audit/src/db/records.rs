//! Entity record store and fix application
//!
//! **[DQA-REC-010]** The underlying business records the pipeline audits.
//! Records are JSON documents keyed by (entity_type, entity_id). Only the
//! Remediation Engine (auto-fix) and the Queue Manager (apply-AI-suggestion)
//! mutate them, always inside the caller's transaction.

use crate::models::ProposedFix;
use chrono::{DateTime, Utc};
use dqa_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::{HashMap, HashSet};

/// One persisted business record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub entity_type: String,
    pub entity_id: String,
    pub payload: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// **[DQA-REM-050]** Per-entity-type schema constraints
///
/// Maps entity type to the set of writable field names. A proposed fix
/// naming an unknown entity type or field does not validate and cannot be
/// auto-applied.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    allowed: HashMap<String, HashSet<String>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register writable fields for an entity type
    pub fn register(&mut self, entity_type: &str, fields: &[&str]) {
        self.allowed
            .entry(entity_type.to_string())
            .or_default()
            .extend(fields.iter().map(|f| f.to_string()));
    }

    pub fn is_known_type(&self, entity_type: &str) -> bool {
        self.allowed.contains_key(entity_type)
    }

    pub fn is_allowed(&self, entity_type: &str, field: &str) -> bool {
        self.allowed
            .get(entity_type)
            .map(|fields| fields.contains(field))
            .unwrap_or(false)
    }

    /// Required fields for the reference detector, per entity type
    pub fn fields_for(&self, entity_type: &str) -> Option<&HashSet<String>> {
        self.allowed.get(entity_type)
    }

    /// Validate a fix against the registry
    pub fn validate_fix(&self, entity_type: &str, fix: &ProposedFix) -> Result<()> {
        let Some(field) = fix.target_field() else {
            return Ok(()); // NoOp writes nothing
        };
        if !self.is_known_type(entity_type) {
            return Err(Error::InvalidInput(format!(
                "Unknown entity type: {}",
                entity_type
            )));
        }
        if !self.is_allowed(entity_type, field) {
            return Err(Error::InvalidInput(format!(
                "Field '{}' is not writable on entity type '{}'",
                field, entity_type
            )));
        }
        Ok(())
    }

    /// Demo business domain: sourcing records
    pub fn default_registry() -> Self {
        let mut registry = Self::new();
        registry.register(
            "candidate",
            &["full_name", "email", "phone", "current_title", "years_experience", "location"],
        );
        registry.register(
            "company",
            &["name", "industry", "domain", "headcount", "location"],
        );
        registry
    }
}

/// Insert or replace a record
pub async fn upsert_record(pool: &SqlitePool, record: &EntityRecord) -> Result<()> {
    let payload = serde_json::to_string(&record.payload)
        .map_err(|e| Error::Internal(format!("Failed to serialize payload: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO entity_records (entity_type, entity_id, payload, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(entity_type, entity_id) DO UPDATE SET
            payload = excluded.payload,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&record.entity_type)
    .bind(&record.entity_id)
    .bind(payload)
    .bind(record.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<EntityRecord> {
    let payload: String = row.get("payload");
    let updated_at: String = row.get("updated_at");

    Ok(EntityRecord {
        entity_type: row.get("entity_type"),
        entity_id: row.get("entity_id"),
        payload: serde_json::from_str(&payload)
            .map_err(|e| Error::Internal(format!("Failed to deserialize payload: {}", e)))?,
        updated_at: super::parse_ts(&updated_at, "updated_at")?,
    })
}

/// Load a record by key
pub async fn load_record(
    pool: &SqlitePool,
    entity_type: &str,
    entity_id: &str,
) -> Result<Option<EntityRecord>> {
    let row = sqlx::query("SELECT * FROM entity_records WHERE entity_type = ? AND entity_id = ?")
        .bind(entity_type)
        .bind(entity_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// All records of one entity type
pub async fn list_records(pool: &SqlitePool, entity_type: &str) -> Result<Vec<EntityRecord>> {
    let rows = sqlx::query("SELECT * FROM entity_records WHERE entity_type = ? ORDER BY entity_id")
        .bind(entity_type)
        .fetch_all(pool)
        .await?;

    rows.iter().map(record_from_row).collect()
}

/// **[DQA-REM-060]** Apply one fix to a record, inside the caller's transaction
///
/// Read-modify-write of the JSON payload. NoOp fixes write nothing.
pub async fn apply_fix(
    conn: &mut SqliteConnection,
    entity_type: &str,
    entity_id: &str,
    fix: &ProposedFix,
) -> Result<()> {
    let (Some(field), Some(value)) = (fix.target_field(), fix.target_value()) else {
        return Ok(());
    };

    let payload: Option<String> = sqlx::query_scalar(
        "SELECT payload FROM entity_records WHERE entity_type = ? AND entity_id = ?",
    )
    .bind(entity_type)
    .bind(entity_id)
    .fetch_optional(&mut *conn)
    .await?;

    let payload = payload.ok_or_else(|| {
        Error::NotFound(format!("Entity record not found: {}/{}", entity_type, entity_id))
    })?;

    let mut document: serde_json::Value = serde_json::from_str(&payload)
        .map_err(|e| Error::Internal(format!("Failed to deserialize payload: {}", e)))?;

    let object = document.as_object_mut().ok_or_else(|| {
        Error::Internal(format!(
            "Entity record payload is not an object: {}/{}",
            entity_type, entity_id
        ))
    })?;
    object.insert(
        field.to_string(),
        serde_json::Value::String(value.to_string()),
    );

    let updated = serde_json::to_string(&document)
        .map_err(|e| Error::Internal(format!("Failed to serialize payload: {}", e)))?;

    sqlx::query(
        "UPDATE entity_records SET payload = ?, updated_at = ? WHERE entity_type = ? AND entity_id = ?",
    )
    .bind(updated)
    .bind(Utc::now().to_rfc3339())
    .bind(entity_type)
    .bind(entity_id)
    .execute(conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_rejects_unknown_field() {
        let registry = SchemaRegistry::default_registry();
        let fix = ProposedFix::SetMissing {
            field: "ssn".to_string(),
            value: "000".to_string(),
        };
        assert!(registry.validate_fix("candidate", &fix).is_err());
    }

    #[test]
    fn registry_rejects_unknown_entity_type() {
        let registry = SchemaRegistry::default_registry();
        let fix = ProposedFix::SetMissing {
            field: "email".to_string(),
            value: "a@b.c".to_string(),
        };
        assert!(registry.validate_fix("invoice", &fix).is_err());
    }

    #[test]
    fn registry_accepts_known_field_and_noop() {
        let registry = SchemaRegistry::default_registry();
        let fix = ProposedFix::Normalize {
            field: "email".to_string(),
            normalized: "a@b.c".to_string(),
        };
        assert!(registry.validate_fix("candidate", &fix).is_ok());
        assert!(registry.validate_fix("candidate", &ProposedFix::NoOp).is_ok());
    }
}
