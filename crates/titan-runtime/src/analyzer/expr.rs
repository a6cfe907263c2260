//! Expression typing

use crate::analyzer::Analyzer;
use crate::ast::*;
use crate::diagnostic::error_codes;
use crate::span::Span;
use crate::symbol::SymbolKind;
use crate::types::{BaseType, Vtd};

impl Analyzer {
    /// Compute the type of an expression, reporting anything invalid
    ///
    /// A failed expression yields [`Vtd::undef`]; callers treat that as
    /// "already reported" and skip further checks on it.
    pub fn analyze_expression(&mut self, expr: &Expr) -> Vtd {
        match expr {
            Expr::Id { name, span } => self.analyze_id(name, *span),
            Expr::Call { callee, args, span } => self.analyze_call(callee, args, *span),
            Expr::ArrayIndex { array, index, span } => {
                let array_type = self.analyze_expression(array);
                let index_type = self.analyze_expression(index);
                if index_type == Vtd::undef() || array_type == Vtd::undef() {
                    return Vtd::undef();
                }
                if index_type.is_array() || !index_type.base.is_integer() {
                    self.report(
                        error_codes::INVALID_ARRAY_IDX,
                        format!(
                            "Given type indexing into array is of a non-integer type '{}'",
                            index_type
                        ),
                        *span,
                    );
                    return Vtd::undef();
                }
                if array_type.depth == 0 {
                    self.report(
                        error_codes::INVALID_ARRAY_IDX,
                        format!("Unable to index into non-array type '{}'", array_type),
                        *span,
                    );
                    return Vtd::undef();
                }
                array_type.element()
            }
            Expr::Infix {
                op,
                left,
                right,
                span,
            } if op.is_assignment() => self.analyze_assign_expr(left, right, *span),
            Expr::Infix {
                left, right, span, ..
            } => self.analyze_infix(left, right, *span),
            Expr::Prefix { right, .. } => self.analyze_expression(right),
            Expr::RawInt(raw) => match raw.classify() {
                Some(class) => Vtd::scalar(class.kind),
                None => {
                    self.report(
                        error_codes::INTERNAL_ANALYZER_FAILURE,
                        format!("Unable to determine integer type from value \"{}\"", raw.text),
                        raw.span,
                    );
                    Vtd::undef()
                }
            },
            Expr::RawFloat { .. } => Vtd::scalar(BaseType::Float),
            Expr::RawString { .. } => Vtd::scalar(BaseType::String),
            Expr::ArrayLiteral { elements, .. } => {
                for element in elements {
                    self.analyze_expression(element);
                }
                Vtd {
                    base: BaseType::Array,
                    depth: elements.len() as u64,
                    segments: Vec::new(),
                }
            }
        }
    }

    fn analyze_id(&mut self, name: &str, span: Span) -> Vtd {
        let found = self.table.lookup(name, false).map(|symbol| symbol.vtd().cloned());
        match found {
            Some(Some(vtd)) => vtd,
            Some(None) => {
                self.report(
                    error_codes::EXPECTED_VARIABLE,
                    format!("Item \"{}\" is not a variable", name),
                    span,
                );
                Vtd::undef()
            }
            None => {
                self.report(
                    error_codes::UNKNOWN_ID,
                    format!("Unknown variable \"{}\"", name),
                    span,
                );
                Vtd::undef()
            }
        }
    }

    fn analyze_call(&mut self, callee: &Expr, args: &[Expr], span: Span) -> Vtd {
        let Expr::Id { name, .. } = callee else {
            self.report(
                error_codes::UNMATCHED_CALL,
                "Call target is not a function name",
                span,
            );
            return Vtd::undef();
        };

        let kind = self.table.lookup(name, false).map(|symbol| symbol.kind.clone());
        let signature = match kind {
            None => {
                self.report(
                    error_codes::UNKNOWN_ID,
                    format!("Unable to locate item \"{}\"", name),
                    span,
                );
                return Vtd::undef();
            }
            Some(SymbolKind::External) => {
                for arg in args {
                    self.analyze_expression(arg);
                }
                return Vtd::scalar(BaseType::I64);
            }
            Some(SymbolKind::Function(signature)) => signature,
            Some(_) => {
                self.report(
                    error_codes::UNMATCHED_CALL,
                    format!("Call to non-function type \"{}\"", name),
                    span,
                );
                return Vtd::undef();
            }
        };

        if signature.parameters.len() != args.len() {
            self.report(
                error_codes::PARAM_SIZE_MISMATCH,
                format!(
                    "Expected {} parameters to function {} but received {} parameters.",
                    signature.parameters.len(),
                    name,
                    args.len()
                ),
                span,
            );
            return Vtd::undef();
        }

        for (param, arg) in signature.parameters.iter().zip(args) {
            let actual = self.analyze_expression(arg);
            if !self.check_implicit_cast(&param.vtd, &actual, error_codes::PARAM_TYPE_MISMATCH, arg.span())
                && actual != Vtd::undef()
            {
                return Vtd::undef();
            }
        }

        signature.return_type
    }

    fn analyze_assign_expr(&mut self, left: &Expr, right: &Expr, span: Span) -> Vtd {
        if !matches!(left, Expr::Id { .. } | Expr::ArrayIndex { .. }) {
            self.report(
                error_codes::EXPECTED_VARIABLE,
                "Left side of assignment must be a variable or array element",
                span,
            );
            return Vtd::undef();
        }

        let target = self.analyze_expression(left);
        let value = self.analyze_expression(right);
        if target == Vtd::undef() {
            return target;
        }
        self.check_implicit_cast(&target, &value, error_codes::IMPLICIT_CAST_FAIL, right.span());
        target
    }

    fn analyze_infix(&mut self, left: &Expr, right: &Expr, span: Span) -> Vtd {
        let lhs = self.analyze_expression(left);
        let rhs = self.analyze_expression(right);
        if lhs == Vtd::undef() || rhs == Vtd::undef() {
            return Vtd::undef();
        }

        if lhs.depth != rhs.depth {
            self.report(
                error_codes::INVALID_EXPRESSION,
                "Unable to combine items of mismatched depth",
                span,
            );
            return Vtd::undef();
        }

        if lhs.base == rhs.base {
            return rhs;
        }

        if lhs.base == BaseType::Array || rhs.base == BaseType::Array {
            self.report(
                error_codes::INVALID_EXPRESSION,
                "Unable to combine mismatched array types",
                span,
            );
            return Vtd::undef();
        }

        match lhs.base.wider(rhs.base) {
            Some(base) => Vtd {
                base,
                ..rhs
            },
            None => {
                self.report(
                    error_codes::INVALID_EXPRESSION,
                    format!("Unable to combine types '{}' and '{}'", lhs, rhs),
                    span,
                );
                Vtd::undef()
            }
        }
    }
}
