//! Tests for the formula store pipeline

use metricula::prelude::*;
use metricula::{ParseErrorKind, StoreError};
use pretty_assertions::assert_eq;

/// Fields offered by the sales data source
fn dashboard_schema() -> Schema {
    Schema::new(vec![
        Field::number("revenue").with_description("Total revenue"),
        Field::number("costs").with_description("Total costs"),
        Field::number("currentRevenue").with_description("Current period revenue"),
        Field::number("previousRevenue").with_description("Previous period revenue"),
        Field::number("customers").with_description("Customer count"),
        Field::number("newCustomers").with_description("New customer count"),
        Field::number("marketingSpend").with_description("Marketing expenditure"),
        Field::string("region"),
    ])
}

fn record(values: &[(&str, f64)]) -> Record {
    values.iter().copied().collect()
}

fn q1() -> Record {
    record(&[
        ("revenue", 200.0),
        ("costs", 150.0),
        ("currentRevenue", 1125.0),
        ("previousRevenue", 1000.0),
        ("marketingSpend", 500.0),
        ("newCustomers", 20.0),
    ])
}

#[test]
fn test_store_evaluates_on_edit() {
    let mut store = FormulaStore::new(dashboard_schema());
    store.recompute_all(q1());

    let id = store.create();
    store
        .set_source_text(&id, "(revenue - costs) / revenue * 100")
        .unwrap();

    let formula = store.get(&id).unwrap();
    assert!(formula.compiled_expression().is_some());
    assert!(formula.validated().is_some());
    assert_eq!(formula.last_result(), Some(25.0));
    assert!(formula.last_error().is_none());
}

#[test]
fn test_empty_formula_keeps_null_result() {
    let mut store = FormulaStore::new(dashboard_schema());
    let id = store.create();

    store.set_source_text(&id, "").unwrap();

    let formula = store.get(&id).unwrap();
    assert_eq!(formula.last_result(), None);
    assert!(formula.compiled_expression().is_none());
    match formula.last_error() {
        Some(FormulaError::Parse(err)) => assert_eq!(err.kind, ParseErrorKind::EmptyFormula),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_parse_failure_clears_result() {
    let mut store = FormulaStore::new(dashboard_schema());
    store.recompute_all(q1());
    let id = store.create_with("Margin", "", "revenue - costs").unwrap();
    assert_eq!(store.get(&id).unwrap().last_result(), Some(50.0));

    store.set_source_text(&id, "revenue - ").unwrap();

    let formula = store.get(&id).unwrap();
    assert_eq!(formula.source_text(), "revenue - ");
    assert!(formula.compiled_expression().is_none());
    assert_eq!(formula.last_result(), None);
    assert!(matches!(formula.last_error(), Some(FormulaError::Parse(_))));
}

#[test]
fn test_validation_failure_keeps_stale_result() {
    let mut store = FormulaStore::new(dashboard_schema());
    store.recompute_all(q1());
    let id = store.create_with("Margin", "", "revenue - costs").unwrap();

    store.set_source_text(&id, "revenue - cost + region").unwrap();

    let formula = store.get(&id).unwrap();
    assert_eq!(formula.last_result(), Some(50.0));
    assert!(formula.compiled_expression().is_some());
    assert!(formula.validated().is_none());
    match formula.last_error() {
        Some(FormulaError::Validation(errors)) => {
            let names: Vec<_> = errors.iter().map(ValidationError::name).collect();
            assert_eq!(names, vec!["cost", "region"]);
        }
        other => panic!("expected validation errors, got {other:?}"),
    }

    // Corrected text clears the error
    store.set_source_text(&id, "revenue - costs * 2").unwrap();
    let formula = store.get(&id).unwrap();
    assert_eq!(formula.last_result(), Some(-100.0));
    assert!(formula.last_error().is_none());
}

#[test]
fn test_recompute_all_is_idempotent() {
    let mut store = FormulaStore::new(dashboard_schema());
    store
        .create_with("Growth", "", "(currentRevenue - previousRevenue) / previousRevenue * 100")
        .unwrap();
    store
        .create_with("CAC", "", "marketingSpend / newCustomers")
        .unwrap();
    store.create_with("Broken", "", "revenue / 0").unwrap();
    store.create_with("Unknown", "", "profit * 2").unwrap();

    store.recompute_all(q1());
    let first = store.results();
    store.recompute_all(q1());
    let second = store.results();

    assert_eq!(first, second);
    assert_eq!(first[0].value, Some(12.5));
    assert_eq!(first[1].value, Some(25.0));
}

#[test]
fn test_errors_are_isolated_per_formula() {
    let mut store = FormulaStore::new(dashboard_schema());
    let growth = store
        .create_with("Growth", "", "currentRevenue / previousRevenue")
        .unwrap();
    let cac = store
        .create_with("CAC", "", "marketingSpend / newCustomers")
        .unwrap();

    let stats = store.recompute_all(record(&[
        ("currentRevenue", 10.0),
        ("previousRevenue", 0.0),
        ("marketingSpend", 300.0),
        ("newCustomers", 3.0),
    ]));

    assert_eq!(stats.formulas, 2);
    assert_eq!(stats.errors, 1);
    assert_eq!(
        store.get(&growth).unwrap().last_error(),
        Some(&FormulaError::Evaluation(EvaluationError::DivisionByZero))
    );
    assert_eq!(store.get(&growth).unwrap().last_result(), None);
    assert_eq!(store.get(&cac).unwrap().last_result(), Some(100.0));
    assert!(store.get(&cac).unwrap().last_error().is_none());
}

#[test]
fn test_missing_value_against_record() {
    let mut store = FormulaStore::new(dashboard_schema());
    let id = store.create_with("Total", "", "revenue + costs").unwrap();

    store.recompute_all(record(&[("revenue", 5.0)]));

    assert_eq!(
        store.get(&id).unwrap().last_error(),
        Some(&FormulaError::Evaluation(EvaluationError::MissingValue {
            name: "costs".into()
        }))
    );
}

#[test]
fn test_update_fields_recomputes_dependents_only() {
    let mut store = FormulaStore::new(dashboard_schema());
    store.recompute_all(q1());
    let margin = store
        .create_with("Margin", "", "(revenue - costs) / revenue * 100")
        .unwrap();
    let cac = store
        .create_with("CAC", "", "marketingSpend / newCustomers")
        .unwrap();

    let stats = store.update_fields(&record(&[("costs", 100.0), ("revenue", 200.0)]));

    // revenue is unchanged, costs changed; only the margin formula reads costs
    assert_eq!(stats.formulas, 1);
    assert_eq!(store.get(&margin).unwrap().last_result(), Some(50.0));
    assert_eq!(store.get(&cac).unwrap().last_result(), Some(25.0));
    assert_eq!(store.record().get("costs"), Some(100.0));

    let stats = store.update_fields(&record(&[("costs", 100.0)]));
    assert_eq!(stats.formulas, 0);
}

#[test]
fn test_refresh_schema_revalidates() {
    let registry = SharedSchema::new(dashboard_schema());
    let mut store = FormulaStore::new(registry.clone());
    store.recompute_all(record(&[("revenue", 10.0), ("profit", 4.0)]));

    let id = store.create_with("Profit share", "", "profit / revenue").unwrap();
    assert!(matches!(
        store.get(&id).unwrap().last_error(),
        Some(FormulaError::Validation(_))
    ));

    let mut fields = dashboard_schema().fields().to_vec();
    fields.push(Field::number("profit"));
    registry.replace(Schema::new(fields));

    let stats = store.refresh_schema();
    assert_eq!(stats.errors, 0);
    assert_eq!(store.get(&id).unwrap().last_result(), Some(0.4));
}

#[test]
fn test_duplicate_schema_fields_resolve_to_unknown() {
    let schema = Schema::new(vec![Field::number("revenue"), Field::number("revenue")]);
    let mut store = FormulaStore::new(schema);

    let id = store.create_with("Revenue", "", "revenue * 2").unwrap();

    assert_eq!(
        store.get(&id).unwrap().last_error(),
        Some(&FormulaError::Validation(vec![ValidationError::UnknownField {
            name: "revenue".into()
        }]))
    );
}

#[test]
fn test_rename_delete_and_results() {
    let mut store = FormulaStore::new(dashboard_schema());
    store.recompute_all(q1());
    let a = store.create_with("A", "", "revenue").unwrap();
    let b = store.create_with("B", "", "costs / 0").unwrap();

    store.rename(&a, "Revenue").unwrap();
    store.set_description(&a, "Total revenue").unwrap();

    let results = store.results();
    assert_eq!(
        results,
        vec![
            MetricResult {
                name: "Revenue".into(),
                value: Some(200.0),
                error: None,
            },
            MetricResult {
                name: "B".into(),
                value: None,
                error: Some("Evaluation error: Division by zero".into()),
            },
        ]
    );
    assert!(results[0].is_displayable());
    assert!(!results[1].is_displayable());

    let removed = store.delete(&b).unwrap();
    assert_eq!(removed.name(), "B");
    assert_eq!(store.len(), 1);
    assert!(store.result(&b).is_none());
    assert_eq!(store.iter().next().unwrap().description(), "Total revenue");
}

#[test]
fn test_save_and_load() {
    let mut store = FormulaStore::new(dashboard_schema());
    let mut repo = MemoryRepository::new();

    let empty = store.create();
    assert!(matches!(
        store.save(&empty, &mut repo),
        Err(StoreError::SourceRequired)
    ));
    store.rename(&empty, "  ").unwrap();
    store.set_source_text(&empty, "revenue").unwrap();
    assert!(matches!(
        store.save(&empty, &mut repo),
        Err(StoreError::NameRequired)
    ));

    let id = store
        .create_with("Margin", "Profit margin", "(revenue - costs) / revenue * 100")
        .unwrap();
    store.save(&id, &mut repo).unwrap();

    let mut restored = FormulaStore::new(dashboard_schema());
    restored.recompute_all(q1());
    restored.load(&id, &repo).unwrap();

    let formula = restored.get(&id).unwrap();
    assert_eq!(formula.name(), "Margin");
    assert_eq!(formula.description(), "Profit margin");
    assert_eq!(formula.last_result(), Some(25.0));

    assert!(matches!(
        restored.load(&FormulaId::from("nope"), &repo),
        Err(StoreError::UnknownFormula(_))
    ));
}
