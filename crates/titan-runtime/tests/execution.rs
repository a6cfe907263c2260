//! End-to-end execution tests

mod common;

use common::*;
use common::assert_eq;
use std::path::Path;
use titan_runtime::diagnostic::error_codes;
use titan_runtime::{
    MemoryLoader, Object, RunOptions, Titan, XFunc, XFuncContext, XFuncError,
};

#[test]
fn test_add_then_main() {
    let (mut titan, _) = runtime(RunOptions::batch(true, true));
    let source = r#"
        fn add(a: i32, b: i32) -> i32 { return a + b; }
        let x: i32 = add(2, 3);
        fn main() -> u8 { return x; }
    "#;
    assert_eq!(titan.run_source("add.tn", source), Ok(Some(Object::U8(5))));
    assert_eq!(global(&titan, "x"), Some(Object::I32(5)));
}

#[test]
fn test_for_loop_output() {
    let (_, out) = run_ok(
        r#"
        fn main() -> u8 {
            for (let i: u8 = 0; i < 3; i += 1) { puts("line ", i); }
            return 0;
        }
        "#,
    );
    assert_eq!(out, "line 0\nline 1\nline 2\n");
}

#[test]
fn test_bubble_sort() {
    let (_, out) = run_ok(
        r#"
        fn main() -> u8 {
            let data: i32[5] = {5, -1, 4, 0, 2};
            for (let i: u8 = 0; i < 5; i += 1) {
                for (let j: u8 = 0; j < 4 - i; j += 1) {
                    if (data[j] > data[j + 1]) {
                        let t: i32 = data[j];
                        data[j] = data[j + 1];
                        data[j + 1] = t;
                    }
                }
            }
            puts(data);
            return 0;
        }
        "#,
    );
    assert_eq!(out, "[-1, 0, 2, 4, 5]\n");
}

#[test]
fn test_iterative_fibonacci_with_break() {
    let (mut titan, _) = runtime(RunOptions::batch(true, true));
    let source = r#"
        fn fib(n: u32) -> u64 {
            let a: u64 = 0;
            let b: u64 = 1;
            while (1) {
                if (n == 0) { break; }
                let t: u64 = a + b;
                a = b;
                b = t;
                n -= 1;
            }
            return a;
        }
        fn main() -> u64 { return fib(50); }
    "#;
    assert_eq!(
        titan.run_source("fib.tn", source),
        Ok(Some(Object::U64(12_586_269_025)))
    );
}

#[test]
fn test_string_concatenation() {
    let (_, out) = run_ok(
        r#"
        let name: string = "titan";
        fn main() -> u8 {
            let s: string = name + " v" + 2;
            puts(s);
            return 0;
        }
        "#,
    );
    assert_eq!(out, "titan v2\n");
}

/// Doubles its single integer argument
struct Double;

impl XFunc for Double {
    fn name(&self) -> &str {
        "double"
    }

    fn execute(&mut self, ctx: &mut XFuncContext<'_>) -> Result<(), XFuncError> {
        let value = ctx
            .parameters
            .first()
            .and_then(Object::as_i128)
            .ok_or_else(|| XFuncError::new("expected an integer"))?;
        ctx.result = Object::I64((value * 2) as i64);
        Ok(())
    }
}

#[test]
fn test_host_function() {
    let (mut titan, _) = runtime(RunOptions::batch(true, true));
    assert!(titan.add_xfunc(Box::new(Double)));
    assert!(!titan.add_xfunc(Box::new(Double)));

    let result = titan.run_source("host.tn", "fn main() -> i64 { return double(21); }");
    assert_eq!(result, Ok(Some(Object::I64(42))));

    let errors = titan
        .run_source("host.tn", "let s: string = double(\"x\");")
        .unwrap_err();
    assert_eq!(errors[0].code, error_codes::XFUNC_FAILURE);
}

#[test]
fn test_imported_state_lives_in_its_own_space() {
    let loader = MemoryLoader::new()
        .with_file(
            "main.tn",
            "import \"lib/counter.tn\";\nfn main() -> u32 { bump(); return bump(); }",
        )
        .with_file(
            "lib/counter.tn",
            "let count: u32 = 10;\nfn bump() -> u32 { count += 1; return count; }",
        );
    let mut titan = Titan::new()
        .with_output(Box::new(std::io::sink()))
        .with_loader(Box::new(loader))
        .with_options(RunOptions::batch(true, true));

    assert_eq!(
        titan.run_file(Path::new("main.tn")),
        Ok(Some(Object::U32(12)))
    );
    let memory = titan.executor().memory();
    assert_eq!(memory.get_variable("lib::counter", "count"), Some(&Object::U32(12)));
    assert_eq!(global(&titan, "count"), None);
}

#[test]
fn test_runtime_error_reports_file_and_code() {
    let (mut titan, _) = runtime(RunOptions::batch(true, true));
    let source = "fn main() -> u8 {\n  let a: u8[2] = {1, 2};\n  let i: u8 = 2;\n  return a[i];\n}";
    let errors = titan.run_source("bounds.tn", source).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, error_codes::INDEX_OUT_OF_BOUNDS);
    assert_eq!(errors[0].file, "bounds.tn");
    assert_eq!(errors[0].line, 4);
}

#[test]
fn test_interactive_state_persists() {
    let (mut titan, out) = runtime(RunOptions::interactive(true));
    assert_eq!(titan.run_source("<repl>", "let a: u8 = 2;"), Ok(None));
    assert_eq!(titan.run_source("<repl>", "fn main() -> u8 { return a; }"), Ok(None));
    assert_eq!(titan.run_source("<repl>", "puts(a * 3);"), Ok(None));
    assert_eq!(out.contents(), "6\n");

    let errors = titan.run_source("<repl>", "let a: u8 = 4;").unwrap_err();
    assert_eq!(errors[0].code, error_codes::DUPLICATE_VARIABLE_DEF);
}

#[test]
fn test_execution_without_analysis() {
    let (mut titan, out) = runtime(RunOptions::default());
    let errors = titan.run_source("raw.tn", "puts(1);\nputs(missing);").unwrap_err();
    assert_eq!(errors[0].code, error_codes::UNDEFINED_VARIABLE);
    assert_eq!(out.contents(), "1\n");
}

#[test]
fn test_run_file_with_include_dir() {
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("lib");
    std::fs::create_dir_all(lib.join("text")).unwrap();
    std::fs::write(
        lib.join("text/banner.tn"),
        "fn banner(n: u8) { puts(\"== \", n, \" ==\"); }",
    )
    .unwrap();
    let main = dir.path().join("main.tn");
    std::fs::write(
        &main,
        "import \"text/banner.tn\";\nfn main() -> u8 { banner(7); return 0; }",
    )
    .unwrap();

    let (titan, out) = runtime(RunOptions::batch(true, true));
    let mut titan = titan.with_include_dirs(vec![lib]);
    assert_eq!(titan.run_file(&main), Ok(Some(Object::U8(0))));
    assert_eq!(out.contents(), "== 7 ==\n");
}

#[test]
fn test_block_locals_survive_calls() {
    let (_, out) = run_ok(
        r#"
        fn one() -> u8 { return 1; }
        fn main() -> u8 {
            let flag: u8 = 1;
            if (flag == 1) {
                let a: u8 = 5;
                one();
                puts("if ", a);
            }
            let i: u8 = 0;
            while (i < 2) {
                let y: u8 = 7;
                one();
                puts("while ", y, i);
                i += 1;
            }
            for (let j: u8 = 0; j < 3; j += 1) {
                let x: u8 = one();
                puts("for ", x + j);
            }
            return 0;
        }
        "#,
    );
    assert_eq!(
        out,
        "if 5\nwhile 70\nwhile 71\nfor 1\nfor 2\nfor 3\n"
    );
}

#[test]
fn test_frames_released_after_loops_with_calls() {
    let (mut titan, _) = runtime(RunOptions::batch(true, true));
    let source = r#"
        fn id(v: u8) -> u8 { return v; }
        let total: u8 = 0;
        for (let i: u8 = 0; i < 4; i += 1) {
            if (id(i) % 2 == 0) { let t: u8 = id(i); total += t; }
        }
    "#;
    assert_eq!(titan.run_source("loops.tn", source), Ok(None));
    assert_eq!(global(&titan, "total"), Some(Object::U8(2)));

    let space = titan.executor().memory().space(titan_runtime::GLOBAL_SCOPE).unwrap();
    assert_eq!(space.frame_count(), 1);
    assert!(space.is_global_active());
}

const COUNTDOWN: &str = r#"
    fn down(n: i32) -> i32 {
        if (n == 0) { return 0; }
        return down(n - 1);
    }
"#;

#[test]
fn test_deep_recursion_below_call_limit() {
    let (mut titan, _) = runtime(RunOptions::batch(true, true));
    let source = format!("{}\nfn main() -> i32 {{ return down(500); }}", COUNTDOWN);
    assert_eq!(titan.run_source("down.tn", &source), Ok(Some(Object::I32(0))));
}

#[test]
fn test_call_limit_reported() {
    let (mut titan, _) = runtime(RunOptions::batch(true, true));
    let source = format!("{}\nfn main() -> i32 {{ return down(600); }}", COUNTDOWN);
    let errors = titan.run_source("down.tn", &source).unwrap_err();
    assert_eq!(errors[0].code, error_codes::UNSUPPORTED);
    assert!(errors[0].message.contains("Maximum call depth of 512"));
}
