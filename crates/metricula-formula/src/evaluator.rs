//! Formula evaluator
//!
//! Evaluates validated formula trees against a [`Record`].
//!
//! Every intermediate value is a finite double. An operation that would
//! leave that range is reported as an [`EvaluationError`] instead of flowing
//! on as NaN or an infinity.

use metricula_core::Record;

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::error::EvaluationError;
use crate::validator::ValidatedExpr;

/// Evaluate a validated formula against a record
///
/// Pure: the same tree and record always produce the same outcome.
///
/// # Example
/// ```rust
/// use metricula_core::{Field, Record, Schema};
/// use metricula_formula::{evaluate, parse_formula, validate, EvaluationError};
///
/// let schema = Schema::new(vec![Field::number("a"), Field::number("b")]);
/// let ast = validate(&parse_formula("a / b").unwrap(), &schema).unwrap();
///
/// let record: Record = [("a", 10.0), ("b", 4.0)].into_iter().collect();
/// assert_eq!(evaluate(&ast, &record), Ok(2.5));
///
/// let record: Record = [("a", 10.0), ("b", 0.0)].into_iter().collect();
/// assert_eq!(evaluate(&ast, &record), Err(EvaluationError::DivisionByZero));
/// ```
pub fn evaluate(expr: &ValidatedExpr, record: &Record) -> Result<f64, EvaluationError> {
    evaluate_expr(expr.expr(), record)
}

fn evaluate_expr(expr: &Expr, record: &Record) -> Result<f64, EvaluationError> {
    match expr {
        Expr::Literal(n) => Ok(*n),

        Expr::FieldRef(name) => {
            let value = record
                .get(name)
                .ok_or_else(|| EvaluationError::MissingValue { name: name.clone() })?;
            if !value.is_finite() {
                return Err(EvaluationError::NonFiniteValue { name: name.clone() });
            }
            Ok(value)
        }

        Expr::BinaryOp { op, left, right } => {
            // Operands first, left to right
            let l = evaluate_expr(left, record)?;
            let r = evaluate_expr(right, record)?;
            evaluate_binary_op(*op, l, r)
        }

        Expr::UnaryOp { op, operand } => {
            let n = evaluate_expr(operand, record)?;
            match op {
                UnaryOperator::Negate => Ok(-n),
            }
        }

        Expr::Grouping(inner) => evaluate_expr(inner, record),
    }
}

/// Apply a binary operator to two finite operands
fn evaluate_binary_op(op: BinaryOperator, l: f64, r: f64) -> Result<f64, EvaluationError> {
    let result = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => {
            if r == 0.0 {
                return Err(EvaluationError::DivisionByZero);
            }
            l / r
        }
        BinaryOperator::Power => return evaluate_power(l, r),
    };

    finite(result)
}

fn evaluate_power(base: f64, exponent: f64) -> Result<f64, EvaluationError> {
    if base == 0.0 && exponent < 0.0 {
        return Err(EvaluationError::DivisionByZero);
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(EvaluationError::InvalidOperation { base, exponent });
    }

    let result = base.powf(exponent);
    if result.is_nan() {
        return Err(EvaluationError::InvalidOperation { base, exponent });
    }
    finite(result)
}

fn finite(value: f64) -> Result<f64, EvaluationError> {
    if value.is_infinite() {
        Err(EvaluationError::Overflow)
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;
    use crate::validator::validate;
    use metricula_core::{Field, Schema};

    fn schema() -> Schema {
        Schema::new(vec![
            Field::number("a"),
            Field::number("b"),
            Field::number("currentRevenue"),
            Field::number("previousRevenue"),
        ])
    }

    fn eval_with(formula: &str, record: &[(&str, f64)]) -> Result<f64, EvaluationError> {
        let ast = parse_formula(formula).unwrap();
        let validated = validate(&ast, &schema()).unwrap();
        let record: Record = record.iter().copied().collect();
        evaluate(&validated, &record)
    }

    fn eval(formula: &str) -> Result<f64, EvaluationError> {
        eval_with(formula, &[])
    }

    #[test]
    fn test_evaluate_number() {
        assert_eq!(eval("42"), Ok(42.0));
        assert_eq!(eval("3.14"), Ok(3.14));
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("1+2"), Ok(3.0));
        assert_eq!(eval("10-3"), Ok(7.0));
        assert_eq!(eval("4*5"), Ok(20.0));
        assert_eq!(eval("20/4"), Ok(5.0));
        assert_eq!(eval("2^10"), Ok(1024.0));
    }

    #[test]
    fn test_evaluate_precedence() {
        assert_eq!(eval("2+3*4"), Ok(14.0));
        assert_eq!(eval("(2+3)*4"), Ok(20.0));
        assert_eq!(eval("2^3^2"), Ok(512.0));
        assert_eq!(eval("2+3*4-5"), Ok(9.0));
        assert_eq!(eval("10-4-3"), Ok(3.0));
        assert_eq!(eval("64/4/2"), Ok(8.0));
    }

    #[test]
    fn test_evaluate_unary() {
        assert_eq!(eval("-5"), Ok(-5.0));
        assert_eq!(eval("--5"), Ok(5.0));
        assert_eq!(eval("-2^2"), Ok(-4.0));
        assert_eq!(eval("(-2)^2"), Ok(4.0));
        assert_eq!(eval("2^-1"), Ok(0.5));
        assert_eq!(eval("3*-2"), Ok(-6.0));
    }

    #[test]
    fn test_evaluate_fields() {
        assert_eq!(
            eval_with(
                "(currentRevenue - previousRevenue) / previousRevenue * 100",
                &[("currentRevenue", 1125.0), ("previousRevenue", 1000.0)]
            ),
            Ok(12.5)
        );
    }

    #[test]
    fn test_evaluate_division_by_zero() {
        assert_eq!(
            eval_with("a/b", &[("a", 10.0), ("b", 0.0)]),
            Err(EvaluationError::DivisionByZero)
        );
        assert_eq!(eval("1/(2-2)"), Err(EvaluationError::DivisionByZero));
        assert_eq!(eval("0^-1"), Err(EvaluationError::DivisionByZero));
    }

    #[test]
    fn test_evaluate_missing_value() {
        assert_eq!(
            eval_with("a+b", &[("a", 5.0)]),
            Err(EvaluationError::MissingValue { name: "b".into() })
        );
    }

    #[test]
    fn test_evaluate_non_finite_value() {
        assert_eq!(
            eval_with("a+b", &[("a", 5.0), ("b", f64::NAN)]),
            Err(EvaluationError::NonFiniteValue { name: "b".into() })
        );
    }

    #[test]
    fn test_evaluate_invalid_power() {
        assert_eq!(
            eval("(-4)^0.5"),
            Err(EvaluationError::InvalidOperation {
                base: -4.0,
                exponent: 0.5
            })
        );
        assert_eq!(eval("(-2)^3"), Ok(-8.0));
        assert_eq!(eval("0^0"), Ok(1.0));
    }

    #[test]
    fn test_evaluate_overflow() {
        assert_eq!(eval("10^400"), Err(EvaluationError::Overflow));
        assert_eq!(
            eval_with("a*a", &[("a", 1e200)]),
            Err(EvaluationError::Overflow)
        );
        assert_eq!(
            eval_with("a/b", &[("a", 1e300), ("b", 1e-300)]),
            Err(EvaluationError::Overflow)
        );
    }

    #[test]
    fn test_evaluate_referentially_transparent() {
        let record = [("a", 3.0), ("b", 7.0)];
        assert_eq!(eval_with("a*b-a", &record), eval_with("a*b-a", &record));
    }
}
