//! Lexer and parser integration tests

mod common;

use common::*;
use common::assert_eq;
use rstest::rstest;
use titan_runtime::diagnostic::error_codes;
use titan_runtime::imports::{ImportContext, MemoryLoader};
use titan_runtime::{Expr, Instruction, Lexer, Parser, TokenKind, GLOBAL_SCOPE};

/// Render an expression tree with explicit grouping
fn render(expr: &Expr) -> String {
    match expr {
        Expr::Id { name, .. } => name.clone(),
        Expr::RawInt(raw) => raw.text.clone(),
        Expr::RawFloat { text, .. } => text.clone(),
        Expr::RawString { text, .. } => format!("{:?}", text),
        Expr::Prefix { op, right, .. } => format!("({}{})", op.as_str(), render(right)),
        Expr::Infix {
            op, left, right, ..
        } => format!("({} {} {})", render(left), op.as_str(), render(right)),
        Expr::Call { callee, args, .. } => {
            let args: Vec<String> = args.iter().map(render).collect();
            format!("{}({})", render(callee), args.join(", "))
        }
        Expr::ArrayIndex { array, index, .. } => format!("{}[{}]", render(array), render(index)),
        Expr::ArrayLiteral { elements, .. } => {
            let elements: Vec<String> = elements.iter().map(render).collect();
            format!("{{{}}}", elements.join(", "))
        }
    }
}

fn render_statement(source: &str) -> String {
    let program = parse(source);
    match &program.items[0] {
        Instruction::Expression(expr) => render(expr),
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

// ============================================================================
// Tokenization
// ============================================================================

#[test]
fn test_tokenization_round_trip() {
    let forms = [
        (TokenKind::Integer, "42"),
        (TokenKind::Float, "3.25"),
        (TokenKind::String, "\"text\""),
        (TokenKind::Identifier, "name_1"),
        (TokenKind::Fn, "fn"),
        (TokenKind::Let, "let"),
        (TokenKind::If, "if"),
        (TokenKind::Else, "else"),
        (TokenKind::While, "while"),
        (TokenKind::For, "for"),
        (TokenKind::Return, "return"),
        (TokenKind::Import, "import"),
        (TokenKind::Break, "break"),
        (TokenKind::Plus, "+"),
        (TokenKind::Minus, "-"),
        (TokenKind::Star, "*"),
        (TokenKind::Slash, "/"),
        (TokenKind::Percent, "%"),
        (TokenKind::StarStar, "**"),
        (TokenKind::Ampersand, "&"),
        (TokenKind::Pipe, "|"),
        (TokenKind::Tilde, "~"),
        (TokenKind::Caret, "^"),
        (TokenKind::LessLess, "<<"),
        (TokenKind::GreaterGreater, ">>"),
        (TokenKind::Bang, "!"),
        (TokenKind::EqualEqual, "=="),
        (TokenKind::BangEqual, "!="),
        (TokenKind::Less, "<"),
        (TokenKind::LessEqual, "<="),
        (TokenKind::Greater, ">"),
        (TokenKind::GreaterEqual, ">="),
        (TokenKind::AmpAmp, "&&"),
        (TokenKind::PipePipe, "||"),
        (TokenKind::Equal, "="),
        (TokenKind::PlusEqual, "+="),
        (TokenKind::MinusEqual, "-="),
        (TokenKind::StarEqual, "*="),
        (TokenKind::SlashEqual, "/="),
        (TokenKind::PercentEqual, "%="),
        (TokenKind::StarStarEqual, "**="),
        (TokenKind::AmpEqual, "&="),
        (TokenKind::PipeEqual, "|="),
        (TokenKind::TildeEqual, "~="),
        (TokenKind::CaretEqual, "^="),
        (TokenKind::LessLessEqual, "<<="),
        (TokenKind::GreaterGreaterEqual, ">>="),
        (TokenKind::LeftParen, "("),
        (TokenKind::RightParen, ")"),
        (TokenKind::LeftBrace, "{"),
        (TokenKind::RightBrace, "}"),
        (TokenKind::LeftBracket, "["),
        (TokenKind::RightBracket, "]"),
        (TokenKind::Colon, ":"),
        (TokenKind::Semicolon, ";"),
        (TokenKind::Comma, ","),
        (TokenKind::Dot, "."),
        (TokenKind::Arrow, "->"),
    ];
    let source: Vec<&str> = forms.iter().map(|(_, text)| *text).collect();
    let (tokens, diagnostics) = Lexer::new(source.join(" ")).tokenize();
    assert!(diagnostics.is_empty());

    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    let mut expected: Vec<TokenKind> = forms.iter().map(|(kind, _)| *kind).collect();
    expected.push(TokenKind::Eof);
    assert_eq!(kinds, expected);

    for (token, (kind, text)) in tokens.iter().zip(forms.iter()) {
        if !kind.carries_data() {
            continue;
        }
        let expected_text = text.trim_matches('"');
        assert_eq!(token.lexeme, expected_text, "lexeme of {:?}", kind);
    }
}

#[test]
fn test_unterminated_string() {
    let (_, diagnostics) = Lexer::new("let s: string = \"open;").tokenize();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, error_codes::UNTERMINATED_STRING);
}

// ============================================================================
// Expressions
// ============================================================================

#[rstest]
#[case("1 + 2 * 3;", "(1 + (2 * 3))")]
#[case("1 * 2 + 3;", "((1 * 2) + 3)")]
#[case("10 - 4 - 3;", "((10 - 4) - 3)")]
#[case("2 ** 3 ** 2;", "(2 ** (3 ** 2))")]
#[case("a = b = 1;", "(a = (b = 1))")]
#[case("a += b * 2;", "(a += (b * 2))")]
#[case("1 < 2 && 3 >= 2;", "((1 < 2) && (3 >= 2))")]
#[case("a == b | c;", "((a == b) | c)")]
#[case("1 << 2 + 3;", "(1 << (2 + 3))")]
#[case("!a && ~b;", "((!a) && (~b))")]
#[case("(1 + 2) * 3;", "((1 + 2) * 3)")]
#[case("-200 + x;", "(-200 + x)")]
#[case("-x;", "(-x)")]
#[case("f(1, g(2)) + a[0][1];", "(f(1, g(2)) + a[0][1])")]
#[case("v = {1, {2, 3}};", "(v = {1, {2, 3}})")]
fn test_expression_shapes(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(render_statement(source), expected);
}

#[test]
fn test_precedence_snapshot() {
    insta::assert_snapshot!(
        render_statement("x = 1 + 2 * 3 ** 2 - f(y) % 4 == 0 || z;"),
        @"(x = ((((1 + (2 * (3 ** 2))) - (f(y) % 4)) == 0) || z))"
    );
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_program_shape() {
    let program = parse(
        r#"
        let limit: u32 = 10;
        fn count(n: u32) -> u32 {
            let total: u32 = 0;
            for (let i: u32 = 0; i < n; i += 1) {
                if (i % 2 == 0) { total += i; } else { continue_marker(); }
            }
            while (total > 100) { break; }
            return total;
        }
        "#,
    );
    assert_eq!(program.items.len(), 2);
    assert!(matches!(program.items[0], Instruction::Assignment(_)));
    let count = program.function("count").unwrap();
    assert_eq!(count.parameters.len(), 1);
    assert_eq!(count.body.len(), 4);
    assert!(matches!(count.body[1], Instruction::For(_)));
    assert!(matches!(count.body[3], Instruction::Return { value: Some(_), .. }));
}

#[test]
fn test_else_becomes_always_true_segment() {
    let program = parse("if (a) { } else if (b) { } else { }");
    let Instruction::If(chain) = &program.items[0] else {
        panic!("expected if");
    };
    assert_eq!(chain.segments.len(), 3);
    assert_eq!(render(&chain.segments[2].condition), "1");
}

#[rstest]
#[case("fn", error_codes::UNEXPECTED_TOKEN)]
#[case("} ", error_codes::INVALID_TOP_LEVEL_ITEM)]
#[case("if x { }", error_codes::EXPECTED_CONDITIONAL)]
#[case("while () { }", error_codes::EXPECTED_CONDITIONAL)]
#[case("for (i = 0; i < 2; i += 1) { }", error_codes::EXPECTED_ASSIGNMENT)]
#[case("let x: u8 = 1", error_codes::UNEXPECTED_TOKEN)]
#[case("let x: u8 = ;", error_codes::INTERNAL_NO_FN_FOR_TOKEN)]
#[case("fn f(a: u8[n]) { }", error_codes::INTERNAL_NON_NUMERIC_REACHED)]
#[case("import \"nowhere.tn\";", error_codes::UNABLE_TO_LOCATE_IMPORT)]
#[case("import \"nowhere.tn\"", error_codes::UNEXPECTED_TOKEN)]
#[case("let a: u8[0] = {};", error_codes::INTERNAL_NON_NUMERIC_REACHED)]
#[case("fn f(a: u8[2][0]) { }", error_codes::INTERNAL_NON_NUMERIC_REACHED)]
#[case("a ~ b;", error_codes::UNEXPECTED_TOKEN)]
fn test_parse_error_codes(#[case] source: &str, #[case] code: u32) {
    let diagnostics = parse_errors(source);
    assert_eq!(diagnostics.len(), 1, "{:?}", diagnostics);
    assert_eq!(diagnostics[0].code, code);
}

// ============================================================================
// Imports
// ============================================================================

#[test]
fn test_import_through_include_dir() {
    let loader = MemoryLoader::new().with_file("lib/util/strings.tn", "fn greet() { }");
    let mut imports =
        ImportContext::new(Box::new(loader)).with_include_dirs(vec!["lib".into()]);
    let (tokens, _) = Lexer::new("import \"util/strings.tn\";").tokenize();
    let (program, diagnostics) = Parser::new(tokens).with_imports(&mut imports).parse();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let scopes: Vec<&str> = program
        .items
        .iter()
        .filter_map(|item| match item {
            Instruction::ScopeChange { scope, .. } => Some(scope.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(scopes, vec!["util::strings", GLOBAL_SCOPE]);
    assert!(program.function("greet").is_some());
}
