use std::path::Path;

use anyhow::{Context, Result, ensure};

use lumos::fixtures::{Case, CaseClass, load_cases, normalize_output};
use lumos::runtime;

fn expected_error(case: &Case) -> Result<String> {
    let file = case
        .spec
        .expected
        .error_contains_file
        .as_deref()
        .with_context(|| format!("Missing error expectation file in {}", case.name))?;
    Ok(case.read_text(file)?.trim().to_string())
}

#[test]
fn runs_fixture_programs() -> Result<()> {
    let cases = load_cases(Path::new("tests/programs"))?;

    for case in cases {
        let source = case.read_source()?;
        match case.spec.class {
            CaseClass::RuntimeSuccess => {
                let stdout_file = case
                    .spec
                    .expected
                    .stdout_file
                    .as_deref()
                    .with_context(|| format!("Missing stdout_file in {}", case.name))?;
                let expected = case.read_text(stdout_file)?;
                let result = runtime::execute(&source);
                ensure!(
                    result.success,
                    "Execution failed for {}: {:?}",
                    case.name,
                    result.error
                );
                assert_eq!(
                    normalize_output(&result.output),
                    normalize_output(&expected),
                    "Output mismatch for {}",
                    case.name
                );
            }
            CaseClass::FrontendError => {
                let expected = expected_error(&case)?;
                let result = runtime::execute(&source);
                ensure!(
                    !result.success,
                    "Expected frontend error in {}, but execution succeeded",
                    case.name
                );
                let actual = result.error.unwrap_or_default();
                ensure!(
                    actual.contains(&expected),
                    "Expected error containing '{expected}' in {}, got '{actual}'",
                    case.name
                );
                // Frontend failures also abort analysis, with the same error.
                let analysis = runtime::analyze(&source);
                ensure!(!analysis.success, "analyze succeeded for {}", case.name);
            }
            CaseClass::RuntimeError => {
                let expected = expected_error(&case)?;
                let result = runtime::execute(&source);
                ensure!(
                    !result.success,
                    "Expected runtime error in {}, but execution succeeded",
                    case.name
                );
                let actual = result.error.unwrap_or_default();
                ensure!(
                    actual.contains(&expected),
                    "Expected error containing '{expected}' in {}, got '{actual}'",
                    case.name
                );
                // Output produced before the failing statement is preserved.
                if let Some(stdout_file) = case.spec.expected.stdout_file.as_deref() {
                    let expected_stdout = case.read_text(stdout_file)?;
                    assert_eq!(
                        normalize_output(&result.output),
                        normalize_output(&expected_stdout),
                        "Partial output mismatch for {}",
                        case.name
                    );
                }
            }
        }
    }

    Ok(())
}

#[test]
fn compiles_fixture_programs_for_every_target() -> Result<()> {
    let cases = load_cases(Path::new("tests/programs"))?;

    for case in cases {
        if !matches!(case.spec.class, CaseClass::RuntimeSuccess) {
            continue;
        }
        let source = case.read_source()?;
        for target in runtime::list_targets() {
            let result = runtime::compile(&source, target.name());
            ensure!(
                result.success,
                "Compile to {} failed for {}: {:?}",
                target,
                case.name,
                result.error
            );
            ensure!(
                !result.code.is_empty(),
                "Empty {} output for {}",
                target,
                case.name
            );
            // Syntactic closure: re-lexing rendered output must not crash.
            // Some targets use characters outside the lexer's alphabet, so
            // an Err is acceptable; a panic is not.
            let _ = lumos::lexer::tokenize(&result.code);
        }
    }

    Ok(())
}

#[test]
fn analyze_matches_statement_structure() -> Result<()> {
    let cases = load_cases(Path::new("tests/programs"))?;

    for case in cases {
        if !matches!(case.spec.class, CaseClass::RuntimeSuccess) {
            continue;
        }
        let source = case.read_source()?;
        let analysis = runtime::analyze(&source);
        ensure!(
            analysis.success,
            "Analyze failed for {}: {:?}",
            case.name,
            analysis.error
        );
        ensure!(
            analysis.token_count > 0,
            "No tokens reported for {}",
            case.name
        );
        ensure!(
            analysis.ast_dump.contains("Program"),
            "AST dump missing root for {}",
            case.name
        );
        // Re-analyzing the same immutable source is byte-identical: no
        // hidden lexer or parser state leaks between calls.
        let again = runtime::analyze(&source);
        assert_eq!(analysis.ast_dump, again.ast_dump, "case {}", case.name);
        assert_eq!(analysis.token_count, again.token_count);
    }

    Ok(())
}
