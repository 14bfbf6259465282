//! End-to-end register runs against the in-memory backend

use chrono::NaiveDate;
use custodian::adapters::database::RegisterRepository;
use custodian::adapters::memory::InMemoryStore;
use custodian::anonymization::{AuditTrail, FakerMaskingService, StaticSelectionCatalog};
use custodian::core::accessor::{EntityDescriptor, FieldAccessorRegistry, FieldDescriptor};
use custodian::core::processing::{PassState, RegisterRunner, RunnerConfig, SkipReason};
use custodian::domain::{
    Anonymizer, AnonymizerLine, CustodianError, EntityType, ExecutionContext, FieldKind,
    FieldName, FieldValue, FixedClock, Locale, ProcessingRegister, ProcessingRule, RegisterId,
    RegisterStatus, TargetRecord, UserRef,
};
use custodian::notification::MemoryNotifier;
use std::sync::Arc;
use tempfile::tempdir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

fn months_ago(months: u32) -> NaiveDate {
    today()
        .checked_sub_months(chrono::Months::new(months))
        .unwrap()
}

fn contact() -> EntityType {
    EntityType::new("Contact").unwrap()
}

fn field(name: &str) -> FieldName {
    FieldName::new(name).unwrap()
}

fn registry() -> FieldAccessorRegistry {
    FieldAccessorRegistry::new()
        .with_entity(
            EntityDescriptor::new(contact(), "base_contact")
                .with_field(field("lastActivityDate"), FieldKind::Date)
                .with_field(field("consentExpiry"), FieldKind::Date)
                .with_field(field("fullName"), FieldKind::Text)
                .with_field(field("email"), FieldKind::Text)
                .with_descriptor(FieldDescriptor {
                    name: field("gender"),
                    column: "gender".to_string(),
                    kind: FieldKind::Text,
                    selection: Some("contact.gender".to_string()),
                }),
        )
        .unwrap()
}

fn anonymizer() -> Anonymizer {
    Anonymizer {
        id: 1,
        name: "Contact anonymizer".to_string(),
        lines: vec![
            AnonymizerLine {
                entity_type: contact(),
                field: field("fullName"),
                strategy: Some("fake-name".to_string()),
            },
            AnonymizerLine {
                entity_type: contact(),
                field: field("email"),
                strategy: Some("fake-email".to_string()),
            },
            AnonymizerLine {
                entity_type: contact(),
                field: field("gender"),
                strategy: None,
            },
        ],
    }
}

fn register(id: i64) -> ProcessingRegister {
    ProcessingRegister {
        id: RegisterId::new(id).unwrap(),
        name: "Inactive contacts".to_string(),
        status: RegisterStatus::Active,
        retention_period_months: 12,
        anonymizer: Some(anonymizer()),
        rules: vec![ProcessingRule::new(contact(), "lastActivityDate")],
    }
}

fn contact_record(id: i64, last_activity: NaiveDate) -> TargetRecord {
    TargetRecord::new(contact(), id)
        .with_archived(Some(false))
        .with_value(field("lastActivityDate"), FieldValue::Date(last_activity))
        .with_value(field("fullName"), FieldValue::Text("Jane Doe".to_string()))
        .with_value(
            field("email"),
            FieldValue::Text("jane.doe@example.com".to_string()),
        )
        .with_value(field("gender"), FieldValue::Text("female".to_string()))
}

fn ctx() -> ExecutionContext {
    ExecutionContext::new(
        UserRef::new("admin"),
        Locale::En,
        Arc::new(FixedClock::on(today())),
    )
}

struct Harness {
    store: Arc<InMemoryStore>,
    notifier: Arc<MemoryNotifier>,
    runner: RegisterRunner,
}

fn harness(config: RunnerConfig) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let selections = StaticSelectionCatalog::new().with_selection(
        "contact.gender",
        vec!["unknown".to_string(), "female".to_string(), "male".to_string()],
    );
    let runner = RegisterRunner::new(
        store.clone(),
        store.clone(),
        Arc::new(registry()),
        Arc::new(FakerMaskingService::seeded(7)),
        Arc::new(selections),
        notifier.clone(),
        config,
    );
    Harness {
        store,
        notifier,
        runner,
    }
}

#[tokio::test]
async fn test_anonymizes_records_past_retention_only() {
    let h = harness(RunnerConfig::default());
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();
    h.store.insert_record(contact_record(1, months_ago(13))).unwrap();
    h.store.insert_record(contact_record(2, months_ago(6))).unwrap();

    let processed = h.runner.run(&[reg], &ctx()).await.unwrap();
    assert_eq!(processed.len(), 1);

    let old = h.store.record(&contact(), 1).unwrap();
    assert!(old.is_archived());
    assert_ne!(
        old.get(&field("fullName")),
        Some(&FieldValue::Text("Jane Doe".to_string()))
    );
    assert_ne!(
        old.get(&field("email")),
        Some(&FieldValue::Text("jane.doe@example.com".to_string()))
    );
    // Age fields are not anonymized
    assert_eq!(
        old.get(&field("lastActivityDate")),
        Some(&FieldValue::Date(months_ago(13)))
    );

    let recent = h.store.record(&contact(), 2).unwrap();
    assert_eq!(recent, contact_record(2, months_ago(6)));
}

#[tokio::test]
async fn test_fake_name_produces_non_empty_text() {
    let h = harness(RunnerConfig::default());
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();
    h.store.insert_record(contact_record(1, months_ago(24))).unwrap();

    h.runner.run(&[reg], &ctx()).await.unwrap();

    match h.store.record(&contact(), 1).unwrap().get(&field("fullName")) {
        Some(FieldValue::Text(name)) => {
            assert!(!name.trim().is_empty());
            assert_ne!(name, "Jane Doe");
        }
        other => panic!("unexpected fullName: {other:?}"),
    }
}

#[tokio::test]
async fn test_selection_field_takes_first_option() {
    let h = harness(RunnerConfig::default());
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();
    h.store.insert_record(contact_record(1, months_ago(24))).unwrap();

    h.runner.run(&[reg], &ctx()).await.unwrap();

    assert_eq!(
        h.store.record(&contact(), 1).unwrap().get(&field("gender")),
        Some(&FieldValue::Text("unknown".to_string()))
    );
}

#[tokio::test]
async fn test_null_fields_stay_null() {
    let h = harness(RunnerConfig::default());
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();
    h.store
        .insert_record(
            TargetRecord::new(contact(), 1)
                .with_value(field("lastActivityDate"), FieldValue::Date(months_ago(24)))
                .with_value(field("fullName"), FieldValue::Text("Jane Doe".to_string())),
        )
        .unwrap();

    h.runner.run(&[reg], &ctx()).await.unwrap();

    let stored = h.store.record(&contact(), 1).unwrap();
    assert!(stored.is_archived());
    assert!(stored.get(&field("email")).is_none());
    assert!(stored.get(&field("gender")).is_none());
}

#[tokio::test]
async fn test_archived_records_are_excluded() {
    let h = harness(RunnerConfig::default());
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();
    let archived = contact_record(1, months_ago(24)).with_archived(Some(true));
    h.store.insert_record(archived.clone()).unwrap();

    let summary = h.runner.run_with_summary(&[reg], &ctx()).await.unwrap();

    assert_eq!(summary.total_processed(), 0);
    assert_eq!(h.store.record(&contact(), 1).unwrap(), archived);
}

#[tokio::test]
async fn test_record_with_null_age_field_is_not_selected() {
    let h = harness(RunnerConfig::default());
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();
    h.store
        .insert_record(
            TargetRecord::new(contact(), 1)
                .with_value(field("fullName"), FieldValue::Text("Jane Doe".to_string())),
        )
        .unwrap();

    let summary = h.runner.run_with_summary(&[reg], &ctx()).await.unwrap();
    assert_eq!(summary.total_processed(), 0);
    assert!(!h.store.record(&contact(), 1).unwrap().is_archived());
}

#[tokio::test]
async fn test_rerun_processes_nothing() {
    let h = harness(RunnerConfig::default());
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();
    h.store.insert_record(contact_record(1, months_ago(13))).unwrap();

    let first = h.runner.run_with_summary(&[reg.clone()], &ctx()).await.unwrap();
    let second = h.runner.run_with_summary(&[reg], &ctx()).await.unwrap();

    assert_eq!(first.total_processed(), 1);
    assert_eq!(second.total_processed(), 0);
    assert_eq!(second.outcomes[0].state, PassState::LoggedEmpty);
}

#[tokio::test]
async fn test_processing_log_only_when_records_processed() {
    let h = harness(RunnerConfig::default());
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();

    h.runner.run(&[reg.clone()], &ctx()).await.unwrap();
    assert!(h.store.list_processing_logs(Some(reg.id)).await.unwrap().is_empty());

    for id in 1..=3 {
        h.store.insert_record(contact_record(id, months_ago(18))).unwrap();
    }
    let summary = h.runner.run_with_summary(&[reg.clone()], &ctx()).await.unwrap();

    let logs = h.store.list_processing_logs(Some(reg.id)).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].processed_count, 3);
    assert_eq!(logs[0].processed_at, ctx().now());
    assert_eq!(summary.outcomes[0].state, PassState::Logged);
    assert_eq!(summary.outcomes[0].log.as_ref(), Some(&logs[0]));
}

#[tokio::test]
async fn test_success_notification_per_register() {
    let h = harness(RunnerConfig::default());
    for id in [1, 2] {
        h.store.insert_register(register(id)).unwrap();
    }

    h.runner
        .run(&[register(1), register(2)], &ctx())
        .await
        .unwrap();

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].title, "Processing register - Archiving");
    assert_eq!(sent[0].body, "Processed finished");
    assert_eq!(sent[0].recipient, UserRef::new("admin"));
    let related = sent[1].related.as_ref().unwrap();
    assert_eq!(related.id, 2);
    assert_eq!(related.entity_type, "ProcessingRegister");
}

#[tokio::test]
async fn test_notifications_follow_locale() {
    let h = harness(RunnerConfig::default());
    h.store.insert_register(register(1)).unwrap();

    let french = ExecutionContext::new(
        UserRef::new("admin"),
        Locale::Fr,
        Arc::new(FixedClock::on(today())),
    );
    h.runner.run(&[register(1)], &french).await.unwrap();

    let sent = h.notifier.sent();
    assert_eq!(sent[0].title, "Registre de traitement - Archivage");
    assert_eq!(sent[0].body, "Traitement terminé");
}

#[tokio::test]
async fn test_session_cleared_every_flush_interval() {
    let h = harness(RunnerConfig::default());
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();
    for id in 1..=25 {
        h.store.insert_record(contact_record(id, months_ago(30))).unwrap();
    }

    let summary = h.runner.run_with_summary(&[reg], &ctx()).await.unwrap();

    assert_eq!(summary.total_processed(), 25);
    // After records 10 and 20, then once at the end of the rule
    assert_eq!(h.store.session_clears(), 3);
    assert_eq!(h.store.writes(), 25);
}

#[tokio::test]
async fn test_flush_cadence_counts_across_rules() {
    let h = harness(RunnerConfig::default());
    let mut reg = register(1);
    reg.rules.push(ProcessingRule::new(contact(), "consentExpiry"));
    h.store.insert_register(reg.clone()).unwrap();
    for id in 1..=6 {
        h.store.insert_record(contact_record(id, months_ago(30))).unwrap();
    }
    for id in 7..=10 {
        h.store
            .insert_record(
                contact_record(id, months_ago(2))
                    .with_value(field("consentExpiry"), FieldValue::Date(months_ago(30))),
            )
            .unwrap();
    }

    let summary = h.runner.run_with_summary(&[reg], &ctx()).await.unwrap();

    assert_eq!(summary.total_processed(), 10);
    // End of the first rule, the tenth record of the register, end of the second rule
    assert_eq!(h.store.session_clears(), 3);
}

#[tokio::test]
async fn test_shared_anonymizer_line_for_other_entity_is_ignored() {
    let h = harness(RunnerConfig::default());
    let mut reg = register(1);
    if let Some(anonymizer) = reg.anonymizer.as_mut() {
        anonymizer.lines.push(AnonymizerLine {
            entity_type: EntityType::new("Invoice").unwrap(),
            field: field("customerName"),
            strategy: Some("fake-name".to_string()),
        });
    }
    h.store.insert_register(reg.clone()).unwrap();
    h.store.insert_record(contact_record(1, months_ago(24))).unwrap();

    let processed = h.runner.run(&[reg], &ctx()).await.unwrap();

    assert_eq!(processed.len(), 1);
    let stored = h.store.record(&contact(), 1).unwrap();
    assert!(stored.is_archived());
    assert_ne!(
        stored.get(&field("fullName")),
        Some(&FieldValue::Text("Jane Doe".to_string()))
    );
    assert_eq!(h.notifier.sent()[0].body, "Processed finished");
}

#[tokio::test]
async fn test_failed_pass_error_survives_failed_release() {
    let h = harness(RunnerConfig::default());
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();
    h.store.insert_record(contact_record(1, months_ago(24))).unwrap();
    h.store.inject_write_failure(contact(), 1).unwrap();
    h.store.inject_release_failure(reg.id).unwrap();

    let err = h.runner.run(&[reg.clone()], &ctx()).await.unwrap_err();

    assert!(matches!(&err, CustodianError::Database(msg) if msg.contains("Write rejected")));
    assert!(h.store.is_running(reg.id));
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_locked_register_is_skipped() {
    let h = harness(RunnerConfig::default());
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();
    h.store.insert_record(contact_record(1, months_ago(24))).unwrap();
    h.store.hold_run_lock(reg.id).unwrap();

    let summary = h.runner.run_with_summary(&[reg.clone()], &ctx()).await.unwrap();

    assert!(summary.outcomes.is_empty());
    assert_eq!(summary.skipped[0].reason, SkipReason::Locked);
    assert!(!h.store.record(&contact(), 1).unwrap().is_archived());
    assert!(h.notifier.sent().is_empty());
    // Lock held by the other run stays in place
    assert!(h.store.is_running(reg.id));
}

#[tokio::test]
async fn test_run_lock_released_after_pass() {
    let h = harness(RunnerConfig::default());
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();

    h.runner.run(&[reg.clone()], &ctx()).await.unwrap();
    assert!(!h.store.is_running(reg.id));
}

#[tokio::test]
async fn test_failure_sends_one_notification_and_propagates() {
    let h = harness(RunnerConfig::default());
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();
    h.store.insert_register(register(2)).unwrap();
    for id in 1..=3 {
        h.store.insert_record(contact_record(id, months_ago(24))).unwrap();
    }
    h.store.inject_write_failure(contact(), 2).unwrap();

    let err = h
        .runner
        .run(&[reg.clone(), register(2)], &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, CustodianError::Database(_)));

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body, "Error occurred");
    assert!(sent[0].related.is_none());

    // Record 1 was persisted before the failure and stays archived
    assert!(h.store.record(&contact(), 1).unwrap().is_archived());
    assert!(!h.store.record(&contact(), 2).unwrap().is_archived());
    assert!(!h.store.record(&contact(), 3).unwrap().is_archived());
    assert!(h.store.list_processing_logs(None).await.unwrap().is_empty());
    assert!(!h.store.is_running(reg.id));
}

#[tokio::test]
async fn test_unknown_entity_type_aborts_run() {
    let h = harness(RunnerConfig::default());
    let mut reg = register(1);
    reg.rules = vec![ProcessingRule::new(
        EntityType::new("Invoice").unwrap(),
        "dueDate",
    )];
    h.store.insert_register(reg.clone()).unwrap();

    let err = h.runner.run(&[reg], &ctx()).await.unwrap_err();
    assert!(matches!(err, CustodianError::ClassResolution(_)));
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_empty_rule_field_list_is_rejected() {
    let h = harness(RunnerConfig::default());
    let mut reg = register(1);
    reg.rules = vec![ProcessingRule::new(contact(), "")];
    h.store.insert_register(reg.clone()).unwrap();
    h.store.insert_record(contact_record(1, months_ago(24))).unwrap();

    let err = h.runner.run(&[reg], &ctx()).await.unwrap_err();
    assert!(matches!(err, CustodianError::Validation(_)));
    assert!(!h.store.record(&contact(), 1).unwrap().is_archived());
}

#[tokio::test]
async fn test_register_without_anonymizer_only_archives() {
    let h = harness(RunnerConfig::default());
    let mut reg = register(1);
    reg.anonymizer = None;
    h.store.insert_register(reg.clone()).unwrap();
    h.store.insert_record(contact_record(1, months_ago(24))).unwrap();

    h.runner.run(&[reg], &ctx()).await.unwrap();

    let expected = contact_record(1, months_ago(24)).with_archived(Some(true));
    assert_eq!(h.store.record(&contact(), 1).unwrap(), expected);
}

#[tokio::test]
async fn test_dry_run_mutates_nothing() {
    let h = harness(RunnerConfig {
        dry_run: true,
        ..RunnerConfig::default()
    });
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();
    h.store.insert_record(contact_record(1, months_ago(13))).unwrap();
    h.store.insert_record(contact_record(2, months_ago(2))).unwrap();

    let summary = h.runner.run_with_summary(&[reg.clone()], &ctx()).await.unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.total_processed(), 1);
    assert_eq!(summary.outcomes[0].state, PassState::Pending);
    assert_eq!(
        h.store.record(&contact(), 1).unwrap(),
        contact_record(1, months_ago(13))
    );
    assert_eq!(h.store.writes(), 0);
    assert!(h.store.list_processing_logs(None).await.unwrap().is_empty());
    assert!(h.notifier.sent().is_empty());
    assert!(!h.store.is_running(reg.id));
}

#[tokio::test]
async fn test_inactive_and_vanished_registers_are_skipped() {
    let h = harness(RunnerConfig::default());
    let mut inactive = register(1);
    inactive.status = RegisterStatus::Inactive;
    h.store.insert_register(inactive.clone()).unwrap();
    // Register 2 was selected but deleted before the run reached it
    let vanished = register(2);
    h.store.insert_record(contact_record(1, months_ago(24))).unwrap();

    let summary = h
        .runner
        .run_with_summary(&[inactive, vanished], &ctx())
        .await
        .unwrap();

    assert!(summary.outcomes.is_empty());
    let reasons: Vec<SkipReason> = summary.skipped.iter().map(|s| s.reason.clone()).collect();
    assert_eq!(reasons, vec![SkipReason::Inactive, SkipReason::Vanished]);
    assert!(!h.store.record(&contact(), 1).unwrap().is_archived());
}

#[tokio::test]
async fn test_register_is_reloaded_before_processing() {
    let h = harness(RunnerConfig::default());
    let stale = register(1);
    let mut current = register(1);
    current.status = RegisterStatus::Inactive;
    h.store.insert_register(current).unwrap();
    h.store.insert_record(contact_record(1, months_ago(24))).unwrap();

    let summary = h.runner.run_with_summary(&[stale], &ctx()).await.unwrap();

    assert_eq!(summary.skipped[0].reason, SkipReason::Inactive);
    assert!(!h.store.record(&contact(), 1).unwrap().is_archived());
}

#[tokio::test]
async fn test_failed_success_notification_fails_the_run() {
    let h = harness(RunnerConfig::default());
    let reg = register(1);
    h.store.insert_register(reg.clone()).unwrap();
    h.notifier.set_failing(true);

    let err = h.runner.run(&[reg], &ctx()).await.unwrap_err();
    assert!(matches!(err, CustodianError::Notification(_)));
}

#[tokio::test]
async fn test_audit_trail_records_masked_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let trail = AuditTrail::new(path.clone(), true, true).unwrap();

    let h = harness(RunnerConfig::default());
    let runner = RegisterRunner::new(
        h.store.clone(),
        h.store.clone(),
        Arc::new(registry()),
        Arc::new(FakerMaskingService::seeded(1)),
        Arc::new(StaticSelectionCatalog::new().with_selection(
            "contact.gender",
            vec!["unknown".to_string()],
        )),
        h.notifier.clone(),
        RunnerConfig::default(),
    )
    .with_audit_trail(trail);

    let reg = register(9);
    h.store.insert_register(reg.clone()).unwrap();
    h.store.insert_record(contact_record(5, months_ago(24))).unwrap();

    runner.run(&[reg], &ctx()).await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let entry: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
    assert_eq!(entry["register_id"], 9);
    assert_eq!(entry["record_id"], 5);
    assert_eq!(entry["fields"].as_array().unwrap().len(), 3);
    assert!(!content.contains("jane.doe@example.com"));
}
