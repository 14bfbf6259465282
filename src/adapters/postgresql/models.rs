//! Row and value conversions for PostgreSQL
//!
//! Target records are read as `row_to_json(t)` documents and converted field
//! by field according to each field's declared kind. Writes bind one typed
//! parameter per column with an explicit cast.

use crate::core::accessor::EntityDescriptor;
use crate::domain::{
    Anonymizer, AnonymizerLine, CustodianError, EntityType, FieldName, FieldValue, ProcessingLog,
    ProcessingRegister, ProcessingRule, RegisterId, RegisterStatus, Result, TargetRecord,
};
use serde_json::Value;
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;

/// Boxed statement parameter
pub type SqlParam = Box<dyn ToSql + Sync + Send>;

fn column<'a, T: tokio_postgres::types::FromSql<'a>>(row: &'a Row, name: &str) -> Result<T> {
    row.try_get(name)
        .map_err(|e| CustodianError::Database(format!("Failed to read column '{name}': {e}")))
}

/// Register row without rules or anonymizer lines
pub fn register_from_row(row: &Row) -> Result<ProcessingRegister> {
    let id = RegisterId::new(column(row, "id")?).map_err(CustodianError::Database)?;
    let status: String = column(row, "status")?;
    let retention: i32 = column(row, "retention_period_months")?;
    let anonymizer_id: Option<i64> = column(row, "anonymizer_id")?;
    let anonymizer_name: Option<String> = column(row, "anonymizer_name")?;

    Ok(ProcessingRegister {
        id,
        name: column(row, "name")?,
        status: status
            .parse::<RegisterStatus>()
            .map_err(CustodianError::Database)?,
        retention_period_months: u32::try_from(retention).map_err(|_| {
            CustodianError::Database(format!(
                "Register {id} has a negative retention period ({retention})"
            ))
        })?,
        anonymizer: anonymizer_id.map(|anonymizer_id| Anonymizer {
            id: anonymizer_id,
            name: anonymizer_name.unwrap_or_default(),
            lines: Vec::new(),
        }),
        rules: Vec::new(),
    })
}

/// `(register_id, rule)`
pub fn rule_from_row(row: &Row) -> Result<(i64, ProcessingRule)> {
    let entity: String = column(row, "entity_type")?;
    Ok((
        column(row, "register_id")?,
        ProcessingRule::new(
            EntityType::new(entity).map_err(CustodianError::Database)?,
            column::<String>(row, "age_fields")?,
        ),
    ))
}

/// `(anonymizer_id, line)`
pub fn line_from_row(row: &Row) -> Result<(i64, AnonymizerLine)> {
    let entity: String = column(row, "entity_type")?;
    let field: String = column(row, "field_name")?;
    Ok((
        column(row, "anonymizer_id")?,
        AnonymizerLine {
            entity_type: EntityType::new(entity).map_err(CustodianError::Database)?,
            field: FieldName::new(field).map_err(CustodianError::Database)?,
            strategy: column(row, "strategy")?,
        },
    ))
}

pub fn log_from_row(row: &Row) -> Result<ProcessingLog> {
    let count: i64 = column(row, "processed_count")?;
    Ok(ProcessingLog {
        register_id: RegisterId::new(column(row, "register_id")?)
            .map_err(CustodianError::Database)?,
        processed_at: column(row, "processed_at")?,
        processed_count: u64::try_from(count).unwrap_or_default(),
    })
}

/// Builds a record from a `row_to_json` document
///
/// Only fields declared on the descriptor are read; JSON `null` means null.
pub fn record_from_json(entity: &EntityDescriptor, id: i64, doc: &Value) -> Result<TargetRecord> {
    let archived = match doc.get(&entity.archived_column) {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(other) => {
            return Err(CustodianError::Database(format!(
                "Column {}.{} is not a boolean: {other}",
                entity.table, entity.archived_column
            )))
        }
    };

    let mut record = TargetRecord::new(entity.name.clone(), id).with_archived(archived);
    for field in entity.fields() {
        let raw = match doc.get(&field.column) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        let value = FieldValue::parse_as(field.kind, &raw).map_err(|e| {
            CustodianError::Database(format!(
                "{}.{} of {} #{id}: {e}",
                entity.table, field.column, entity.name
            ))
        })?;
        record = record.with_value(field.name.clone(), value);
    }
    Ok(record)
}

/// Bound parameter and SQL cast for a field value
pub fn value_param(value: &FieldValue) -> (SqlParam, &'static str) {
    match value {
        FieldValue::Text(s) => (Box::new(s.clone()), "text"),
        FieldValue::Integer(i) => (Box::new(*i), "bigint"),
        FieldValue::Decimal(d) => (Box::new(*d), "double precision"),
        FieldValue::Boolean(b) => (Box::new(*b), "boolean"),
        FieldValue::Date(d) => (Box::new(*d), "date"),
        FieldValue::DateTime(dt) => (Box::new(*dt), "timestamp"),
    }
}

/// `UPDATE` statement and parameters persisting `fields` and the archived flag
///
/// Fields that are null on the record are written as `NULL`.
pub fn update_statement(
    entity: &EntityDescriptor,
    record: &TargetRecord,
    fields: &[FieldName],
) -> Result<(String, Vec<SqlParam>)> {
    let mut assignments = vec![format!("\"{}\" = $1::boolean", entity.archived_column)];
    let mut params: Vec<SqlParam> = vec![Box::new(record.archived)];

    for name in fields {
        let field = entity.field(name)?;
        match record.get(name) {
            Some(value) => {
                let (param, cast) = value_param(value);
                params.push(param);
                assignments.push(format!("\"{}\" = ${}::{cast}", field.column, params.len()));
            }
            None => assignments.push(format!("\"{}\" = NULL", field.column)),
        }
    }

    params.push(Box::new(record.id));
    let statement = format!(
        "UPDATE \"{}\" SET {} WHERE \"{}\" = ${}::bigint",
        entity.table,
        assignments.join(", "),
        entity.id_column,
        params.len()
    );
    Ok((statement, params))
}

/// `SELECT` statement loading one record as a JSON document
pub fn load_statement(entity: &EntityDescriptor) -> String {
    format!(
        "SELECT row_to_json(t)::jsonb AS doc FROM \"{}\" t WHERE \"{}\" = $1::bigint",
        entity.table, entity.id_column
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::accessor::FieldDescriptor;
    use crate::domain::FieldKind;
    use chrono::NaiveDate;
    use serde_json::json;

    fn field(name: &str) -> FieldName {
        FieldName::new(name).unwrap()
    }

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(EntityType::new("Contact").unwrap(), "base_contact")
            .with_descriptor(FieldDescriptor {
                name: field("fullName"),
                column: "full_name".into(),
                kind: FieldKind::Text,
                selection: None,
            })
            .with_descriptor(FieldDescriptor {
                name: field("lastActivityDate"),
                column: "last_activity_date".into(),
                kind: FieldKind::Date,
                selection: None,
            })
            .with_field(field("age"), FieldKind::Integer)
            .with_field(field("createdOn"), FieldKind::DateTime)
    }

    #[test]
    fn test_record_from_json() {
        let doc = json!({
            "id": 5,
            "archived": null,
            "full_name": "Jane Doe",
            "last_activity_date": "2020-01-31",
            "age": 41,
            "createdOn": "2019-03-04T10:00:00",
            "unrelated": "ignored"
        });
        let record = record_from_json(&descriptor(), 5, &doc).unwrap();

        assert_eq!(record.archived, None);
        assert_eq!(
            record.get(&field("fullName")),
            Some(&FieldValue::Text("Jane Doe".into()))
        );
        assert_eq!(
            record.get(&field("lastActivityDate")),
            Some(&FieldValue::Date(NaiveDate::from_ymd_opt(2020, 1, 31).unwrap()))
        );
        assert_eq!(record.get(&field("age")), Some(&FieldValue::Integer(41)));
        assert!(matches!(
            record.get(&field("createdOn")),
            Some(FieldValue::DateTime(_))
        ));
    }

    #[test]
    fn test_record_from_json_nulls_absent() {
        let doc = json!({ "id": 5, "archived": false, "full_name": null });
        let record = record_from_json(&descriptor(), 5, &doc).unwrap();
        assert_eq!(record.archived, Some(false));
        assert!(record.get(&field("fullName")).is_none());
    }

    #[test]
    fn test_record_from_json_bad_archived() {
        let doc = json!({ "id": 5, "archived": "yes" });
        assert!(record_from_json(&descriptor(), 5, &doc).is_err());
    }

    #[test]
    fn test_update_statement() {
        let record = TargetRecord::new(EntityType::new("Contact").unwrap(), 9)
            .with_archived(Some(true))
            .with_value(field("fullName"), FieldValue::Text("Anon".into()))
            .with_value(field("age"), FieldValue::Integer(3));

        let (sql, params) =
            update_statement(&descriptor(), &record, &[field("fullName"), field("age")]).unwrap();
        assert_eq!(
            sql,
            "UPDATE \"base_contact\" SET \"archived\" = $1::boolean, \"full_name\" = $2::text, \
             \"age\" = $3::bigint WHERE \"id\" = $4::bigint"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_update_statement_unknown_field() {
        let record = TargetRecord::new(EntityType::new("Contact").unwrap(), 9);
        assert!(update_statement(&descriptor(), &record, &[field("iban")]).is_err());
    }

    #[test]
    fn test_load_statement() {
        assert_eq!(
            load_statement(&descriptor()),
            "SELECT row_to_json(t)::jsonb AS doc FROM \"base_contact\" t WHERE \"id\" = $1::bigint"
        );
    }
}
