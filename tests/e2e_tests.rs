//! End-to-end pipeline tests
//!
//! Builds workbooks in memory, runs every phase, and checks the generated
//! class against the values the evaluator computes for the same cells.

use cellforge::core::{Evaluator, Value};
use cellforge::formula::parse_formula;
use cellforge::{compile, CellId, Cell, CompileError, CompileOptions, Literal, Workbook};
use pretty_assertions::assert_eq;

fn id(a1: &str) -> CellId {
    CellId::parse(a1, "Sheet1").unwrap()
}

fn formula(text: &str) -> Cell {
    Cell::formula(text, parse_formula(text, "Sheet1").unwrap())
}

fn simple_sum() -> Workbook {
    let mut wb = Workbook::new("book");
    wb.insert(id("A1"), Cell::value(Literal::Integer(2)));
    wb.insert(id("A2"), Cell::value(Literal::Integer(3)));
    wb.insert(id("A3"), formula("=A1+A2"));
    wb
}

// ═══════════════════════════════════════════════════════════════════════════
// SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_simple_sum_exposes_accessor() {
    let wb = simple_sum();
    let output = compile(&wb, &CompileOptions::default()).unwrap();

    assert_eq!(output.class_name, "BookModel");
    assert_eq!(output.order, vec![id("A3")]);
    assert_eq!(output.outputs, vec![id("A3")]);

    let source = &output.source;
    assert!(source.contains("public sealed class BookModel"));
    assert!(source.contains("long sheet1_A1 = 2,"));
    assert!(source.contains("long sheet1_A2 = 3)"));
    assert!(source.contains("sheet1_A3 = (double)sheet1_A1 + (double)sheet1_A2;"));
    assert!(source.contains("public double GetSheet1_A3() => sheet1_A3;"));

    let value = Evaluator::new(&wb).evaluate(&id("A3")).unwrap();
    assert_eq!(value, Value::Number(5.0));
}

#[test]
fn test_self_reference_is_cyclic() {
    let mut wb = Workbook::new("book");
    wb.insert(id("A1"), formula("=A1+1"));

    let err = compile(&wb, &CompileOptions::default()).unwrap_err();

    match err {
        CompileError::CyclicDependency { chain } => assert_eq!(chain, vec![id("A1")]),
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn test_two_cell_cycle_names_both_cells() {
    let mut wb = Workbook::new("book");
    wb.insert(id("A1"), formula("=B1*2"));
    wb.insert(id("B1"), formula("=A1+1"));
    wb.insert(id("C1"), Cell::value(Literal::Integer(1)));

    let err = compile(&wb, &CompileOptions::default()).unwrap_err();

    assert_eq!(
        err.to_string(),
        "Circular dependency detected: Sheet1!A1 → Sheet1!B1 → Sheet1!A1"
    );
}

#[test]
fn test_unsupported_function_produces_no_output() {
    let mut wb = simple_sum();
    wb.insert(id("A4"), formula("=XIRR(A1:A2)"));

    let err = compile(&wb, &CompileOptions::default()).unwrap_err();

    match err {
        CompileError::UnsupportedFunction { function, cell } => {
            assert_eq!(function, "XIRR");
            assert_eq!(cell, id("A4"));
        }
        other => panic!("expected an unsupported function, got {other:?}"),
    }
}

#[test]
fn test_constant_division_by_zero_fails() {
    let mut wb = Workbook::new("book");
    wb.insert(id("A1"), formula("=1/0"));

    let err = compile(&wb, &CompileOptions::default()).unwrap_err();

    assert!(matches!(err, CompileError::DivisionByZero { cell } if cell == id("A1")));
}

#[test]
fn test_runtime_division_is_checked() {
    let mut wb = simple_sum();
    wb.insert(id("A4"), formula("=A3/A1"));

    let output = compile(&wb, &CompileOptions::default()).unwrap();

    assert!(output.source.contains(
        "sheet1_A4 = new XlValue<double>(() => XlRuntime.Divide(sheet1_A3, (double)sheet1_A1));"
    ));
    assert!(output.source.contains("private readonly XlValue<double> sheet1_A4;"));
    assert!(output.source.contains("public double GetSheet1_A4() => sheet1_A4.Value;"));
    assert!(output.source.contains("internal static class XlRuntime"));
}

#[test]
fn test_iferror_catches_error_from_referenced_cell() {
    let mut wb = Workbook::new("book");
    wb.insert(id("A1"), Cell::value(Literal::Integer(10)));
    wb.insert(id("B1"), Cell::value(Literal::Integer(0)));
    wb.insert(id("A2"), formula("=A1/B1"));
    wb.insert(id("A3"), formula("=IFERROR(A2,0)"));
    wb.insert(id("A4"), formula("=A1*2"));

    let output = compile(&wb, &CompileOptions::default()).unwrap();
    let source = &output.source;

    // The division error is held in the field until A3 reads it.
    assert!(source.contains(
        "sheet1_A2 = new XlValue<double>(() => XlRuntime.Divide((double)sheet1_A1, (double)sheet1_B1));"
    ));
    assert!(source.contains("XlRuntime.IfError(() => sheet1_A2.Value, () => 0.0)"));
    assert!(source.contains("private readonly XlValue<double> sheet1_A3;"));
    // Formulas that cannot raise stay plain fields.
    assert!(source.contains("sheet1_A4 = (double)sheet1_A1 * 2.0;"));
    assert!(source.contains("private readonly double sheet1_A4;"));

    let value = Evaluator::new(&wb).evaluate(&id("A3")).unwrap();
    assert_eq!(value, Value::Number(0.0));
}

#[test]
fn test_formulas_follow_their_dependencies_in_source() {
    let mut wb = Workbook::new("book");
    wb.insert(id("A1"), formula("=A2*2"));
    wb.insert(id("A2"), formula("=A3+1"));
    wb.insert(id("A3"), Cell::value(Literal::Number(1.5)));

    let output = compile(&wb, &CompileOptions::default()).unwrap();

    assert_eq!(output.order, vec![id("A2"), id("A1")]);
    let a2 = output.source.find("        sheet1_A2 = ").unwrap();
    let a1 = output.source.find("        sheet1_A1 = ").unwrap();
    assert!(a2 < a1);

    let value = Evaluator::new(&wb).evaluate(&id("A1")).unwrap();
    assert_eq!(value, Value::Number(5.0));
}

#[test]
fn test_cross_sheet_references() {
    let mut wb = Workbook::new("book");
    wb.insert(CellId::parse("Rates!A1", "Rates").unwrap(), Cell::value(Literal::Number(0.2)));
    wb.insert(
        CellId::parse("Main!A1", "Main").unwrap(),
        Cell::formula("=Rates!A1*100", parse_formula("=Rates!A1*100", "Main").unwrap()),
    );

    let output = compile(&wb, &CompileOptions::default()).unwrap();

    assert!(output.source.contains("double rates_A1 = 0.2)"));
    assert!(output.source.contains("main_A1 = rates_A1 * 100.0;"));
}

#[test]
fn test_missing_reference_becomes_zero_input() {
    let mut wb = Workbook::new("book");
    wb.insert(id("A1"), formula("=B9+1"));

    let output = compile(&wb, &CompileOptions::default()).unwrap();

    assert!(output.source.contains("long sheet1_B9 = 0)"));
    assert_eq!(
        Evaluator::new(&wb).evaluate(&id("A1")).unwrap(),
        Value::Number(1.0)
    );
}

#[test]
fn test_inline_values_drops_inputs() {
    let options = CompileOptions {
        inline_values: true,
        ..CompileOptions::default()
    };

    let output = compile(&simple_sum(), &options).unwrap();

    assert!(output.source.contains("sheet1_A3 = 2.0 + 3.0;"));
    assert!(output.source.contains("public BookModel()"));
}

// ═══════════════════════════════════════════════════════════════════════════
// LITERAL ROUND TRIP
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_literal_only_workbook_reproduces_every_literal() {
    let literals = [
        ("A1", Literal::Integer(7), "private const long sheet1_A1 = 7;"),
        ("B1", Literal::Number(2.5), "private const double sheet1_B1 = 2.5;"),
        ("C1", Literal::Boolean(true), "private const bool sheet1_C1 = true;"),
        (
            "D1",
            Literal::Text("say \"hi\"".to_string()),
            r#"private const string sheet1_D1 = "say \"hi\"";"#,
        ),
    ];
    let mut wb = Workbook::new("literals");
    for (address, literal, _) in &literals {
        wb.insert(id(address), Cell::value(literal.clone()));
    }

    let output = compile(&wb, &CompileOptions::default()).unwrap();

    assert!(output.order.is_empty());
    for (address, literal, declaration) in &literals {
        assert!(
            output.source.contains(declaration),
            "missing declaration for {address}: {declaration}"
        );
        let value = Evaluator::new(&wb).evaluate(&id(address)).unwrap();
        assert_eq!(value, Value::from(literal));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RENAMING
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_labels_name_fields_and_collisions_get_suffixes() {
    let mut wb = Workbook::new("book");
    wb.insert(id("A1"), Cell::value(Literal::Integer(2)).with_label("Total"));
    wb.insert(id("A2"), Cell::value(Literal::Integer(3)).with_label("Total"));
    wb.insert(id("A3"), formula("=A1*A2").with_label("class"));

    let output = compile(&wb, &CompileOptions::default()).unwrap();

    assert_eq!(output.mapping.get("Sheet1_A1"), Some("total"));
    assert_eq!(output.mapping.get("Sheet1_A2"), Some("total2"));
    assert_eq!(output.mapping.get("Sheet1_A3"), Some("class2"));
    assert!(output.source.contains("class2 = (double)total * (double)total2;"));
    assert!(output.source.contains("public double GetClass2() => class2;"));
}

#[test]
fn test_compilation_is_deterministic() {
    let wb = simple_sum();
    let first = compile(&wb, &CompileOptions::default()).unwrap();
    let second = compile(&wb, &CompileOptions::default()).unwrap();

    assert_eq!(first.source, second.source);
    assert_eq!(first.mapping, second.mapping);
}
