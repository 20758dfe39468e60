//! Formula expression tree

use std::fmt;

/// Formula expression
///
/// Nodes own their children; a tree never shares subtrees.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Literal(f64),
    /// Reference to a schema field
    FieldRef(String),
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    /// Parenthesized expression, kept so rendering reproduces the source grouping
    Grouping(Box<Expr>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
}

impl BinaryOperator {
    pub fn symbol(&self) -> char {
        match self {
            BinaryOperator::Add => '+',
            BinaryOperator::Subtract => '-',
            BinaryOperator::Multiply => '*',
            BinaryOperator::Divide => '/',
            BinaryOperator::Power => '^',
        }
    }

    /// Binding strength; higher binds tighter
    fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Add | BinaryOperator::Subtract => 1,
            BinaryOperator::Multiply | BinaryOperator::Divide => 2,
            BinaryOperator::Power => 4,
        }
    }

    fn is_right_associative(&self) -> bool {
        matches!(self, BinaryOperator::Power)
    }
}

/// Unary minus sits between `* /` and `^`
const UNARY_PRECEDENCE: u8 = 3;

impl Expr {
    pub fn literal(value: f64) -> Self {
        Expr::Literal(value)
    }

    pub fn field(name: impl Into<String>) -> Self {
        Expr::FieldRef(name.into())
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn negate(operand: Expr) -> Self {
        Expr::UnaryOp {
            op: UnaryOperator::Negate,
            operand: Box::new(operand),
        }
    }

    pub fn grouping(inner: Expr) -> Self {
        Expr::Grouping(Box::new(inner))
    }

    /// Distinct field names referenced by the tree, in first-occurrence order
    pub fn field_refs(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.visit_field_refs(&mut |name| {
            if !names.contains(&name) {
                names.push(name);
            }
        });
        names
    }

    /// Call `f` for every field reference, left to right, including repeats
    pub fn visit_field_refs<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Expr::Literal(_) => {}
            Expr::FieldRef(name) => f(name),
            Expr::BinaryOp { left, right, .. } => {
                left.visit_field_refs(f);
                right.visit_field_refs(f);
            }
            Expr::UnaryOp { operand, .. } => operand.visit_field_refs(f),
            Expr::Grouping(inner) => inner.visit_field_refs(f),
        }
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        match self {
            Expr::Literal(_) | Expr::FieldRef(_) => 1,
            Expr::BinaryOp { left, right, .. } => 1 + left.depth().max(right.depth()),
            Expr::UnaryOp { operand, .. } => 1 + operand.depth(),
            Expr::Grouping(inner) => 1 + inner.depth(),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::BinaryOp { op, .. } => op.precedence(),
            Expr::UnaryOp { .. } => UNARY_PRECEDENCE,
            Expr::Literal(_) | Expr::FieldRef(_) | Expr::Grouping(_) => u8::MAX,
        }
    }
}

/// Renders formula text that parses back to the same tree
///
/// Parentheses appear for [`Expr::Grouping`] nodes and wherever a
/// hand-built tree would otherwise read back differently. Literals are
/// expected to be non-negative, as the parser produces them.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(n) => write!(f, "{n}"),
            Expr::FieldRef(name) => f.write_str(name),
            Expr::Grouping(inner) => write!(f, "({inner})"),
            Expr::UnaryOp { op, operand } => {
                let UnaryOperator::Negate = op;
                f.write_str("-")?;
                write_operand(f, operand, operand.precedence() < UNARY_PRECEDENCE)
            }
            Expr::BinaryOp { op, left, right } => {
                let prec = op.precedence();
                let left_parens = if op.is_right_associative() {
                    // `(-a) ^ b` and `(a ^ b) ^ c` need explicit grouping
                    left.precedence() <= prec
                } else {
                    left.precedence() < prec
                };
                let right_parens = if op.is_right_associative() {
                    right.precedence() < UNARY_PRECEDENCE
                } else {
                    right.precedence() <= prec
                };
                write_operand(f, left, left_parens)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right, right_parens)
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_refs() {
        let expr = Expr::binary(
            BinaryOperator::Divide,
            Expr::grouping(Expr::binary(
                BinaryOperator::Subtract,
                Expr::field("currentRevenue"),
                Expr::field("previousRevenue"),
            )),
            Expr::field("previousRevenue"),
        );

        assert_eq!(expr.field_refs(), vec!["currentRevenue", "previousRevenue"]);
        assert_eq!(expr.depth(), 4);
    }

    #[test]
    fn test_display_keeps_grouping() {
        let expr = Expr::binary(
            BinaryOperator::Multiply,
            Expr::grouping(Expr::binary(
                BinaryOperator::Add,
                Expr::literal(2.0),
                Expr::literal(3.0),
            )),
            Expr::literal(4.5),
        );
        assert_eq!(expr.to_string(), "(2 + 3) * 4.5");
    }

    #[test]
    fn test_display_inserts_required_parens() {
        // a - (b - c) built without a Grouping node
        let expr = Expr::binary(
            BinaryOperator::Subtract,
            Expr::field("a"),
            Expr::binary(BinaryOperator::Subtract, Expr::field("b"), Expr::field("c")),
        );
        assert_eq!(expr.to_string(), "a - (b - c)");

        // (a ^ b) ^ c versus a ^ b ^ c
        let left = Expr::binary(
            BinaryOperator::Power,
            Expr::binary(BinaryOperator::Power, Expr::field("a"), Expr::field("b")),
            Expr::field("c"),
        );
        assert_eq!(left.to_string(), "(a ^ b) ^ c");
        let right = Expr::binary(
            BinaryOperator::Power,
            Expr::field("a"),
            Expr::binary(BinaryOperator::Power, Expr::field("b"), Expr::field("c")),
        );
        assert_eq!(right.to_string(), "a ^ b ^ c");
    }

    #[test]
    fn test_display_unary() {
        assert_eq!(Expr::negate(Expr::field("x")).to_string(), "-x");
        assert_eq!(
            Expr::negate(Expr::binary(
                BinaryOperator::Power,
                Expr::literal(2.0),
                Expr::literal(2.0)
            ))
            .to_string(),
            "-2 ^ 2"
        );
        assert_eq!(
            Expr::binary(
                BinaryOperator::Power,
                Expr::negate(Expr::literal(2.0)),
                Expr::literal(2.0)
            )
            .to_string(),
            "(-2) ^ 2"
        );
        assert_eq!(
            Expr::negate(Expr::binary(
                BinaryOperator::Add,
                Expr::literal(1.0),
                Expr::field("y")
            ))
            .to_string(),
            "-(1 + y)"
        );
    }
}
