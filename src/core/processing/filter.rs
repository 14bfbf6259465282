//! Rule filter compiler
//!
//! Turns a rule's raw field list into a [`RecordFilter`] selecting records that
//! are not archived and whose every listed age field is older than the cutoff:
//!
//! ```text
//! (self.archived IS NULL OR self.archived = FALSE)
//!   AND self.lastActivityDate < :minDate AND self.createdOn < :minDate
//! ```
//!
//! The same filter renders to parameterized SQL and evaluates in memory.

use crate::core::accessor::EntityDescriptor;
use crate::domain::{CustodianError, EntityType, FieldName, ProcessingRule, Result, TargetRecord};
use chrono::{Months, NaiveDate};

/// Name of the bound cutoff parameter in the textual predicate
pub const MIN_DATE_PARAM: &str = "minDate";

/// `today` minus `months` calendar months, clamped to the end of shorter months
///
/// # Errors
///
/// Returns a validation error when the result falls outside the supported date range.
pub fn retention_cutoff(today: NaiveDate, months: u32) -> Result<NaiveDate> {
    today.checked_sub_months(Months::new(months)).ok_or_else(|| {
        CustodianError::Validation(format!(
            "Retention period of {months} months before {today} is out of range"
        ))
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AgeField {
    name: FieldName,
    column: String,
}

/// Compiled eligibility filter for one rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    entity: EntityType,
    table: String,
    id_column: String,
    archived_column: String,
    age_fields: Vec<AgeField>,
    cutoff: NaiveDate,
}

/// Compiles `rule` against the entity's metadata
///
/// # Errors
///
/// - [`CustodianError::Validation`] for an empty field list, a malformed name,
///   or a field that is not a date/datetime
/// - [`CustodianError::UnknownField`] for a field the entity does not declare
pub fn compile(
    rule: &ProcessingRule,
    descriptor: &EntityDescriptor,
    cutoff: NaiveDate,
) -> Result<RecordFilter> {
    if rule.entity_type != descriptor.name {
        return Err(CustodianError::Validation(format!(
            "Rule targets '{}' but was compiled against '{}'",
            rule.entity_type, descriptor.name
        )));
    }

    let names = rule.field_names().map_err(CustodianError::Validation)?;

    let mut age_fields: Vec<AgeField> = Vec::with_capacity(names.len());
    for name in names {
        if age_fields.iter().any(|f| f.name == name) {
            continue;
        }
        let field = descriptor.field(&name)?;
        if !field.kind.is_temporal() {
            return Err(CustodianError::Validation(format!(
                "Age-check field {}.{} must be a date or datetime, found {}",
                descriptor.name, name, field.kind
            )));
        }
        age_fields.push(AgeField {
            name,
            column: field.column.clone(),
        });
    }

    Ok(RecordFilter {
        entity: descriptor.name.clone(),
        table: descriptor.table.clone(),
        id_column: descriptor.id_column.clone(),
        archived_column: descriptor.archived_column.clone(),
        age_fields,
        cutoff,
    })
}

fn quote(ident: &str) -> String {
    format!("\"{ident}\"")
}

impl RecordFilter {
    pub fn entity(&self) -> &EntityType {
        &self.entity
    }

    pub fn cutoff(&self) -> NaiveDate {
        self.cutoff
    }

    pub fn field_names(&self) -> impl Iterator<Item = &FieldName> {
        self.age_fields.iter().map(|f| &f.name)
    }

    /// Textual predicate over entity field names, with `:minDate` as the cutoff
    pub fn predicate(&self) -> String {
        let mut clauses = vec!["(self.archived IS NULL OR self.archived = FALSE)".to_string()];
        clauses.extend(
            self.age_fields
                .iter()
                .map(|f| format!("self.{} < :{}", f.name, MIN_DATE_PARAM)),
        );
        clauses.join(" AND ")
    }

    /// SQL `WHERE` body over quoted column names, with `$1` bound to the cutoff
    pub fn sql_where(&self) -> String {
        let archived = quote(&self.archived_column);
        let mut clauses = vec![format!("({archived} IS NULL OR {archived} = FALSE)")];
        clauses.extend(
            self.age_fields
                .iter()
                .map(|f| format!("{} < $1::date", quote(&f.column))),
        );
        clauses.join(" AND ")
    }

    /// Full id selection statement, ordered by id; ids are returned as `bigint`
    pub fn select_ids_sql(&self) -> String {
        let id = quote(&self.id_column);
        format!(
            "SELECT {id}::bigint FROM {} WHERE {} ORDER BY {id}",
            quote(&self.table),
            self.sql_where()
        )
    }

    /// In-memory evaluation with SQL null semantics: a null age field never matches
    pub fn matches(&self, record: &TargetRecord) -> bool {
        if record.entity != self.entity || record.is_archived() {
            return false;
        }
        self.age_fields.iter().all(|f| {
            record
                .get(&f.name)
                .and_then(|v| v.as_date())
                .is_some_and(|d| d < self.cutoff)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::accessor::FieldDescriptor;
    use crate::domain::{FieldKind, FieldValue};
    use test_case::test_case;

    fn entity() -> EntityType {
        EntityType::new("Contact").unwrap()
    }

    fn field(name: &str) -> FieldName {
        FieldName::new(name).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(entity(), "base_contact")
            .with_descriptor(FieldDescriptor {
                name: field("lastActivityDate"),
                column: "last_activity_date".into(),
                kind: FieldKind::Date,
                selection: None,
            })
            .with_field(field("createdOn"), FieldKind::DateTime)
            .with_field(field("fullName"), FieldKind::Text)
    }

    fn rule(fields: &str) -> ProcessingRule {
        ProcessingRule::new(entity(), fields)
    }

    #[test_case(date(2025, 3, 31), 1 => date(2025, 2, 28) ; "clamps to month end")]
    #[test_case(date(2024, 3, 31), 1 => date(2024, 2, 29) ; "leap year")]
    #[test_case(date(2025, 6, 15), 12 => date(2024, 6, 15) ; "one year")]
    #[test_case(date(2025, 6, 15), 0 => date(2025, 6, 15) ; "zero months")]
    fn test_retention_cutoff(today: NaiveDate, months: u32) -> NaiveDate {
        retention_cutoff(today, months).unwrap()
    }

    #[test]
    fn test_predicate_single_field() {
        let filter = compile(&rule("lastActivityDate"), &descriptor(), date(2024, 1, 1)).unwrap();
        assert_eq!(
            filter.predicate(),
            "(self.archived IS NULL OR self.archived = FALSE) AND self.lastActivityDate < :minDate"
        );
    }

    #[test]
    fn test_predicate_multiple_fields_whitespace() {
        let filter = compile(
            &rule(" lastActivityDate ,\n createdOn "),
            &descriptor(),
            date(2024, 1, 1),
        )
        .unwrap();
        assert_eq!(
            filter.predicate(),
            "(self.archived IS NULL OR self.archived = FALSE) \
             AND self.lastActivityDate < :minDate AND self.createdOn < :minDate"
        );
    }

    #[test]
    fn test_sql_uses_columns_and_parameter() {
        let filter = compile(
            &rule("lastActivityDate,createdOn"),
            &descriptor(),
            date(2024, 1, 1),
        )
        .unwrap();
        assert_eq!(
            filter.select_ids_sql(),
            "SELECT \"id\"::bigint FROM \"base_contact\" WHERE (\"archived\" IS NULL OR \"archived\" = FALSE) \
             AND \"last_activity_date\" < $1::date AND \"createdOn\" < $1::date ORDER BY \"id\""
        );
    }

    #[test_case("" ; "empty")]
    #[test_case(" , ,, " ; "only separators")]
    #[test_case("fullName" ; "text field")]
    #[test_case("lastActivityDate OR 1=1" ; "injection attempt")]
    fn test_compile_rejects(fields: &str) {
        let err = compile(&rule(fields), &descriptor(), date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, CustodianError::Validation(_)), "{err}");
    }

    #[test]
    fn test_compile_unknown_field() {
        let err = compile(&rule("deletedOn"), &descriptor(), date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, CustodianError::UnknownField { .. }));
    }

    #[test]
    fn test_compile_dedupes_fields() {
        let filter = compile(
            &rule("lastActivityDate,lastActivityDate"),
            &descriptor(),
            date(2024, 1, 1),
        )
        .unwrap();
        assert_eq!(filter.field_names().count(), 1);
    }

    #[test]
    fn test_matches_excludes_archived() {
        let filter = compile(&rule("lastActivityDate"), &descriptor(), date(2024, 1, 1)).unwrap();
        let old = TargetRecord::new(entity(), 1)
            .with_value(field("lastActivityDate"), FieldValue::Date(date(2020, 1, 1)));

        assert!(filter.matches(&old));
        assert!(filter.matches(&old.clone().with_archived(Some(false))));
        assert!(!filter.matches(&old.with_archived(Some(true))));
    }

    #[test]
    fn test_matches_all_fields_must_be_old() {
        let filter = compile(
            &rule("lastActivityDate,createdOn"),
            &descriptor(),
            date(2024, 1, 1),
        )
        .unwrap();
        let created_recently = date(2023, 12, 31).and_hms_opt(23, 0, 0).unwrap();
        let created_on_cutoff = date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap();

        let record = TargetRecord::new(entity(), 1)
            .with_value(field("lastActivityDate"), FieldValue::Date(date(2020, 1, 1)))
            .with_value(field("createdOn"), FieldValue::DateTime(created_recently));
        assert!(filter.matches(&record));

        let record = record.with_value(field("createdOn"), FieldValue::DateTime(created_on_cutoff));
        assert!(!filter.matches(&record));
    }

    #[test]
    fn test_matches_null_age_field() {
        let filter = compile(&rule("lastActivityDate"), &descriptor(), date(2024, 1, 1)).unwrap();
        assert!(!filter.matches(&TargetRecord::new(entity(), 1)));
    }

    #[test]
    fn test_matches_boundary_is_exclusive() {
        let filter = compile(&rule("lastActivityDate"), &descriptor(), date(2024, 1, 1)).unwrap();
        let on_cutoff = TargetRecord::new(entity(), 1)
            .with_value(field("lastActivityDate"), FieldValue::Date(date(2024, 1, 1)));
        assert!(!filter.matches(&on_cutoff));
    }
}
