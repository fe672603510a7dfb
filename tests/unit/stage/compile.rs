use super::*;
use crate::job::layout::ScratchLayout;
use crate::job::materialize::Materializer;
use crate::test_support::{COPYING_COMPILER, sh_compiler, write_script};
use tempfile::TempDir;

fn job_in(dir: &TempDir, source: &[u8]) -> ScratchJob {
    let scratch = dir.path().join("scratch");
    std::fs::create_dir_all(&scratch).unwrap();
    Materializer::new(ScratchLayout::in_dir(scratch))
        .materialize(source)
        .unwrap()
}

#[test]
fn default_invocation_is_non_interactive_and_fail_fast() {
    let cfg = CompilerConfig::default();
    assert!(cfg.args.iter().any(|a| a == "-interaction=nonstopmode"));
    assert!(cfg.args.iter().any(|a| a == "-halt-on-error"));
    assert!(cfg.args.iter().any(|a| a == "{source}"));
    cfg.validate().unwrap();
}

#[cfg(unix)]
#[test]
fn success_reports_conventional_artifact() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(dir.path(), "fake-tex", COPYING_COMPILER);
    let job = job_in(&dir, b"\\documentclass{article}");

    let result = ProcessCompiler::new(sh_compiler(&script)).compile(&job);
    assert_eq!(
        result,
        CompileResult::Compiled {
            artifact: job.artifact.clone()
        }
    );
    assert_eq!(std::fs::read(&job.artifact).unwrap(), b"\\documentclass{article}");
}

#[cfg(unix)]
#[test]
fn non_zero_exit_returns_combined_output() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(dir.path(), "fake-tex", COPYING_COMPILER);
    let job = job_in(&dir, b"\\broken");

    let CompileResult::Failed { diagnostics } =
        ProcessCompiler::new(sh_compiler(&script)).compile(&job)
    else {
        panic!("expected compile failure");
    };
    let text = String::from_utf8_lossy(&diagnostics);
    assert!(text.contains("! Undefined control sequence."), "{text}");
    assert!(text.contains("l.1 \\broken"), "stderr missing: {text}");
    assert!(!job.artifact.exists());
}

#[test]
fn missing_binary_is_a_compile_failure() {
    let dir = TempDir::new().expect("temp dir");
    let job = job_in(&dir, b"x");
    let cfg = CompilerConfig {
        program: dir.path().join("no-such-compiler"),
        args: vec!["{source}".to_string()],
    };

    let CompileResult::Failed { diagnostics } = ProcessCompiler::new(cfg).compile(&job) else {
        panic!("expected compile failure");
    };
    let text = String::from_utf8_lossy(&diagnostics);
    assert!(text.contains("no-such-compiler"), "{text}");
}

#[cfg(unix)]
#[test]
fn clean_exit_without_artifact_is_a_compile_failure() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(dir.path(), "fake-tex", "echo 'nothing written'");
    let job = job_in(&dir, b"x");

    let CompileResult::Failed { diagnostics } =
        ProcessCompiler::new(sh_compiler(&script)).compile(&job)
    else {
        panic!("expected compile failure");
    };
    let text = String::from_utf8_lossy(&diagnostics);
    assert!(text.starts_with("nothing written\n"), "{text}");
    assert!(text.contains("produced no output"), "{text}");
}

#[cfg(unix)]
#[test]
fn runs_inside_the_output_directory() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(dir.path(), "fake-tex", "pwd -P; exit 1");
    let job = job_in(&dir, b"x");

    let CompileResult::Failed { diagnostics } =
        ProcessCompiler::new(sh_compiler(&script)).compile(&job)
    else {
        panic!("expected compile failure");
    };
    let cwd = String::from_utf8_lossy(&diagnostics);
    let expected = job.output_dir.canonicalize().unwrap();
    assert_eq!(cwd.trim(), expected.display().to_string());
}
