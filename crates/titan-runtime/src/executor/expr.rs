//! Expression evaluation

use super::{ops, Executor, RuntimeError};
use crate::ast::Expr;
use crate::object::Object;
use crate::span::Span;
use crate::token::TokenKind;
use std::ops::Range;

impl Executor {
    /// Evaluate an expression in the current space
    pub(super) fn eval(&mut self, expr: &Expr) -> Result<Object, RuntimeError> {
        match expr {
            Expr::Id { name, span } => self
                .memory
                .get_variable(&self.current_space, name)
                .map(|object| object.inner().clone())
                .ok_or_else(|| RuntimeError::UndefinedVariable {
                    name: name.clone(),
                    span: *span,
                }),
            Expr::RawInt(raw) => raw
                .classify()
                .and_then(|class| Object::from_int(class.kind, class.value))
                .ok_or_else(|| {
                    RuntimeError::type_error(
                        format!("Invalid integer literal '{}'", raw.text),
                        raw.span,
                    )
                }),
            Expr::RawFloat { text, span } => text.parse::<f64>().map(Object::Float).map_err(|_| {
                RuntimeError::type_error(format!("Invalid float literal '{}'", text), *span)
            }),
            Expr::RawString { text, .. } => Ok(Object::String(text.clone())),
            Expr::ArrayLiteral { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element)?);
                }
                Ok(Object::array_from(values))
            }
            Expr::Prefix { op, right, span } => {
                let operand = self.eval(right)?;
                ops::unary(*op, &operand, *span)
            }
            Expr::Infix {
                op,
                left,
                right,
                span,
            } => match op {
                op if op.is_assignment() => self.eval_assignment(*op, left, right, *span),
                TokenKind::AmpAmp => {
                    if !self.eval(left)?.is_truthy() {
                        return Ok(Object::boolean(false));
                    }
                    Ok(Object::boolean(self.eval(right)?.is_truthy()))
                }
                TokenKind::PipePipe => {
                    if self.eval(left)?.is_truthy() {
                        return Ok(Object::boolean(true));
                    }
                    Ok(Object::boolean(self.eval(right)?.is_truthy()))
                }
                _ => {
                    let lhs = self.eval(left)?;
                    let rhs = self.eval(right)?;
                    ops::binary(*op, &lhs, &rhs, *span)
                }
            },
            Expr::Call { callee, args, span } => self.eval_call(callee, args, *span),
            Expr::ArrayIndex { array, index, span } => {
                let array = self.eval(array)?;
                let index = self.eval_index(index)?;
                let Object::Array { segments, items } = &array else {
                    return Err(RuntimeError::type_error(
                        format!("Cannot index a '{}' value", array.base_type()),
                        *span,
                    ));
                };
                let (range, rest) = locate(segments, &[index], *span)?;
                Ok(slice_object(&items[range], rest))
            }
        }
    }

    fn eval_index(&mut self, index: &Expr) -> Result<i128, RuntimeError> {
        let value = self.eval(index)?;
        value.as_i128().ok_or_else(|| RuntimeError::InvalidIndex {
            msg: format!("expected an integer, found '{}'", value.base_type()),
            span: index.span(),
        })
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], span: Span) -> Result<Object, RuntimeError> {
        let Expr::Id { name, .. } = callee else {
            return Err(RuntimeError::unsupported(
                "Only named functions can be called",
                callee.span(),
            ));
        };

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?);
        }

        if self.functions.contains_key(name) {
            return self.call_function(name, values, span);
        }
        match self.xfuncs.call(name, values, self.out.as_mut()) {
            Some(Ok(result)) => Ok(result),
            Some(Err(e)) => Err(RuntimeError::XFuncFailure {
                name: name.clone(),
                msg: e.message,
                span,
            }),
            None => Err(RuntimeError::UnknownFunction {
                name: name.clone(),
                span,
            }),
        }
    }

    /// Evaluate an assignment-family operator and store the result
    ///
    /// The value of the expression is the value as stored, after coercion
    /// into the target's kind.
    fn eval_assignment(
        &mut self,
        op: TokenKind,
        target: &Expr,
        value: &Expr,
        span: Span,
    ) -> Result<Object, RuntimeError> {
        let (name, indices) = self.resolve_target(target)?;
        let rhs = self.eval(value)?;
        let value = match ops::compound_base(op) {
            Some(base) => {
                let current = self.read_target(&name, &indices, target.span())?;
                ops::binary(base, &current, &rhs, span)?
            }
            None if op == TokenKind::TildeEqual => ops::unary(TokenKind::Tilde, &rhs, span)?,
            None => rhs,
        };
        self.write_target(&name, &indices, &value, span)
    }

    /// Variable name and evaluated index path of an assignment target
    fn resolve_target(&mut self, target: &Expr) -> Result<(String, Vec<i128>), RuntimeError> {
        let mut index_exprs = Vec::new();
        let mut node = target;
        let name = loop {
            match node {
                Expr::Id { name, .. } => break name.clone(),
                Expr::ArrayIndex { array, index, .. } => {
                    index_exprs.push(index.as_ref());
                    node = array;
                }
                other => {
                    return Err(RuntimeError::type_error(
                        "Left side of an assignment must be a variable or an array element",
                        other.span(),
                    ))
                }
            }
        };

        let mut indices = Vec::with_capacity(index_exprs.len());
        for index in index_exprs.into_iter().rev() {
            indices.push(self.eval_index(index)?);
        }
        Ok((name, indices))
    }

    fn read_target(&self, name: &str, indices: &[i128], span: Span) -> Result<Object, RuntimeError> {
        let object = self
            .memory
            .get_variable(&self.current_space, name)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
                span,
            })?
            .inner();
        if indices.is_empty() {
            return Ok(object.clone());
        }
        let Object::Array { segments, items } = object else {
            return Err(RuntimeError::type_error(
                format!("Cannot index a '{}' value", object.base_type()),
                span,
            ));
        };
        let (range, rest) = locate(segments, indices, span)?;
        Ok(slice_object(&items[range], rest))
    }

    fn write_target(
        &mut self,
        name: &str,
        indices: &[i128],
        value: &Object,
        span: Span,
    ) -> Result<Object, RuntimeError> {
        let slot = self
            .memory
            .get_variable_mut(&self.current_space, name)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
                span,
            })?
            .inner_mut();

        if indices.is_empty() {
            if !slot.copy_to(value) {
                return Err(store_error(value, &slot.vtd().to_string(), name, span));
            }
            return Ok(slot.clone());
        }

        let kind = slot.base_type();
        let Object::Array { segments, items } = slot else {
            return Err(RuntimeError::type_error(
                format!("Cannot index a '{}' value", kind),
                span,
            ));
        };
        let (range, rest) = locate(segments, indices, span)?;
        let mut target = slice_object(&items[range.clone()], rest);
        if !target.copy_to(value) {
            return Err(store_error(value, &target.vtd().to_string(), name, span));
        }
        match &target {
            Object::Array { items: leaves, .. } => items[range].clone_from_slice(leaves),
            leaf => items[range.start] = leaf.clone(),
        }
        Ok(target)
    }
}

/// Leaf range and remaining shape addressed by an index path
fn locate(
    segments: &[u64],
    indices: &[i128],
    span: Span,
) -> Result<(Range<usize>, Vec<u64>), RuntimeError> {
    if indices.len() > segments.len() {
        return Err(RuntimeError::InvalidIndex {
            msg: format!(
                "{} indices applied to an array of {} dimensions",
                indices.len(),
                segments.len()
            ),
            span,
        });
    }
    let mut start = 0usize;
    let mut width = segments.iter().product::<u64>() as usize;
    for (&index, &len) in indices.iter().zip(segments) {
        if index < 0 || index >= len as i128 {
            return Err(RuntimeError::OutOfBounds { index, len, span });
        }
        width /= len as usize;
        start += index as usize * width;
    }
    Ok((start..start + width, segments[indices.len()..].to_vec()))
}

/// A single leaf, or the leaves reshaped as a sub-array
fn slice_object(leaves: &[Object], rest: Vec<u64>) -> Object {
    if rest.is_empty() {
        return leaves.first().cloned().unwrap_or(Object::Nil);
    }
    Object::Array {
        segments: rest,
        items: leaves.to_vec(),
    }
}

fn store_error(value: &Object, target: &str, name: &str, span: Span) -> RuntimeError {
    RuntimeError::type_error(
        format!(
            "Unable to store '{}' value in \"{}\" of type '{}'",
            value.base_type(),
            name,
            target
        ),
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Program, GLOBAL_SCOPE};
    use crate::diagnostic::error_codes;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::xfunc::{XFunc, XFuncContext, XFuncError, XFuncRegistry};
    use rstest::rstest;

    fn parse(source: &str) -> Program {
        let (tokens, _) = Lexer::new(source).tokenize();
        let (program, diagnostics) = Parser::new(tokens).parse();
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        program
    }

    fn quiet_executor() -> Executor {
        Executor::new().with_output(Box::new(std::io::sink()))
    }

    /// Run `source` and read back the global `r`
    fn result_of(source: &str) -> Object {
        let mut executor = quiet_executor();
        executor.run(&parse(source)).unwrap();
        executor
            .memory()
            .get_variable(GLOBAL_SCOPE, "r")
            .cloned()
            .unwrap()
    }

    #[rstest]
    #[case("let r: u8 = 10;\nr += 5;", Object::U8(15))]
    #[case("let r: u8 = 10;\nr -= 11;", Object::U8(255))]
    #[case("let r: i32 = 3;\nr *= -2;", Object::I32(-6))]
    #[case("let r: u16 = 17;\nr %= 5;", Object::U16(2))]
    #[case("let r: u32 = 3;\nr **= 3;", Object::U32(27))]
    #[case("let r: u8 = 1;\nr <<= 4;", Object::U8(16))]
    #[case("let r: u8 = 12;\nr &= 10;", Object::U8(8))]
    #[case("let r: u8 = 0;\nr ~= 5;", Object::U8(250))]
    #[case("let r: float = 1;\nr /= 4;", Object::Float(0.25))]
    #[case("let r: string = \"a\";\nr += 1;", Object::String("a1".into()))]
    fn test_compound_assignment(#[case] source: &str, #[case] expected: Object) {
        assert_eq!(result_of(source), expected);
    }

    #[test]
    fn test_assignment_value_is_stored_value() {
        let source = "let a: u8 = 0;\nlet r: i32 = (a = 300);";
        assert_eq!(result_of(source), Object::I32(44));
    }

    #[test]
    fn test_element_and_row_assignment() {
        let source = r#"
            let r: u8[2][2] = {{1, 2}, {3, 4}};
            r[0][1] += 40;
            r[1] = {7, 8};
        "#;
        assert_eq!(
            result_of(source),
            Object::Array {
                segments: vec![2, 2],
                items: vec![Object::U8(1), Object::U8(42), Object::U8(7), Object::U8(8)],
            }
        );
    }

    #[test]
    fn test_index_paths_are_bounds_checked() {
        let mut executor = quiet_executor();
        let err = executor
            .run(&parse("let g: u8[2][3] = {{1, 2, 3}, {4, 5, 6}};\ng[0][3] = 1;"))
            .unwrap_err();
        assert_eq!(err.code(), error_codes::INDEX_OUT_OF_BOUNDS);
        assert_eq!(
            err.to_string(),
            "Array index 3 out of bounds for length 3"
        );

        let mut executor = quiet_executor();
        let err = executor
            .run(&parse("let g: u8[2] = {1, 2};\ng[0][0] = 1;"))
            .unwrap_err();
        assert_eq!(err.code(), error_codes::INVALID_INDEX);
    }

    #[test]
    fn test_short_circuit_skips_right_side() {
        assert_eq!(result_of("let r: u8 = 0 && missing;"), Object::U8(0));
        assert_eq!(result_of("let r: u8 = 1 || missing;"), Object::U8(1));
        assert_eq!(result_of("let r: u8 = 2 && 3;"), Object::U8(1));
    }

    #[test]
    fn test_literals() {
        assert_eq!(result_of("let r: i64 = -200;"), Object::I64(-200));
        assert_eq!(result_of("let r: float = 2.5;"), Object::Float(2.5));
        assert_eq!(result_of("let r: u64 = 255;"), Object::U64(255));
    }

    #[test]
    fn test_undefined_variable() {
        let mut executor = quiet_executor();
        let err = executor.run(&parse("ghost = 1;")).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::UndefinedVariable { ref name, .. } if name == "ghost"
        ));
    }

    struct Fail;

    impl XFunc for Fail {
        fn name(&self) -> &str {
            "fail"
        }

        fn execute(&mut self, _ctx: &mut XFuncContext<'_>) -> Result<(), XFuncError> {
            Err(XFuncError::new("refused"))
        }
    }

    #[test]
    fn test_xfunc_results_and_failures() {
        let mut registry = XFuncRegistry::with_builtins();
        registry.add_xfunc(Box::new(Fail));
        let mut executor = quiet_executor().with_xfuncs(registry);

        executor.run(&parse("let r: i64 = puts(\"\");")).unwrap();
        assert_eq!(
            executor.memory().get_variable(GLOBAL_SCOPE, "r"),
            Some(&Object::I64(1))
        );

        let err = executor.run(&parse("fail();")).unwrap_err();
        assert_eq!(err.code(), error_codes::XFUNC_FAILURE);
        assert_eq!(err.to_string(), "xfunc fail failed: refused");
    }

    #[test]
    fn test_user_function_shadows_xfunc() {
        let source = "fn puts(v: u8) -> u8 { return v + 1; }\nlet r: u8 = puts(1);";
        assert_eq!(result_of(source), Object::U8(2));
    }
}
