//! Schema validation
//!
//! Checks every field reference in a tree against a [`Schema`]. All
//! operators are numeric, so every referenced field must be a number field.

use metricula_core::{FieldType, Schema};

use crate::ast::Expr;
use crate::error::ValidationError;

/// An expression whose field references all resolve to numeric fields
///
/// Only [`validate`] constructs this type, so the evaluator never runs on an
/// unchecked tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedExpr {
    expr: Expr,
    fields: Vec<String>,
}

impl ValidatedExpr {
    /// The underlying tree
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Distinct referenced field names, in first-occurrence order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn into_inner(self) -> Expr {
        self.expr
    }
}

/// Validate a tree against a schema
///
/// Does not stop at the first problem: every offending field name is
/// reported once, in the order it first appears in the formula.
///
/// # Example
/// ```rust
/// use metricula_core::{Field, Schema};
/// use metricula_formula::{parse_formula, validate, ValidationError};
///
/// let schema = Schema::new(vec![Field::number("a")]);
/// let ast = parse_formula("a + unknownField").unwrap();
/// let errors = validate(&ast, &schema).unwrap_err();
/// assert_eq!(errors, vec![ValidationError::UnknownField { name: "unknownField".into() }]);
/// ```
pub fn validate(expr: &Expr, schema: &Schema) -> Result<ValidatedExpr, Vec<ValidationError>> {
    let fields = expr.field_refs();
    let mut errors = Vec::new();

    for &name in &fields {
        match schema.lookup(name) {
            None => errors.push(ValidationError::UnknownField {
                name: name.to_string(),
            }),
            Some(field) if field.field_type != FieldType::Number => {
                errors.push(ValidationError::TypeMismatch {
                    name: name.to_string(),
                    expected: FieldType::Number,
                    actual: field.field_type,
                })
            }
            Some(_) => {}
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidatedExpr {
        fields: fields.into_iter().map(str::to_string).collect(),
        expr: expr.clone(),
    })
}
