use super::*;
use crate::test_support::{FAKE_PNG_PRINTF, sh_rasterizer, write_script};
use tempfile::TempDir;

fn artifact_in(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("job.pdf");
    std::fs::write(&path, b"%PDF-1.5 fake").unwrap();
    path
}

#[test]
fn default_invocation_is_batch_and_sandboxed() {
    let cfg = RasterizerConfig::default();
    for flag in ["-dBATCH", "-dNOPAUSE", "-dSAFER", "-sOutputFile=-", "-sDEVICE=png16m"] {
        assert!(cfg.args.iter().any(|a| a == flag), "missing {flag}");
    }
    // Ghostscript's own stdout chatter must not mix into the image stream.
    assert!(cfg.args.iter().any(|a| a == "-sstdout=%stderr"));
    cfg.validate().unwrap();
}

#[test]
fn unknown_expected_format_is_a_config_error() {
    let cfg = RasterizerConfig {
        expected_format: Some("nope".to_string()),
        ..RasterizerConfig::default()
    };
    assert!(matches!(cfg.validate(), Err(WorkerError::Config(_))));
    assert!(ProcessRasterizer::new(cfg).is_err());
}

#[test]
fn source_placeholder_is_rejected() {
    let mut cfg = RasterizerConfig::default();
    cfg.args.push("-sInputFile={source}".to_string());
    assert!(matches!(cfg.validate(), Err(WorkerError::Config(_))));
    assert!(ProcessRasterizer::new(cfg).is_err());
}

#[cfg(unix)]
#[test]
fn stdout_is_forwarded_verbatim() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(
        dir.path(),
        "fake-gs",
        &format!("echo 'warning: font substituted' >&2\n{FAKE_PNG_PRINTF}"),
    );
    let mut cfg = sh_rasterizer(&script, RasterDiagnostics::Capture);
    cfg.expected_format = Some("png".to_string());

    let result = ProcessRasterizer::new(cfg).unwrap().rasterize(&artifact_in(&dir));
    let RasterResult::Rasterized { image } = result else {
        panic!("expected image");
    };
    assert_eq!(image, b"\x89PNG\r\n\x1a\nIMAGEDATA");
}

#[cfg(unix)]
#[test]
fn failure_captures_stderr_under_capture_policy() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(
        dir.path(),
        "fake-gs",
        "echo 'partial' ; echo 'Error: /undefined in showpage' >&2; exit 1",
    );
    let cfg = sh_rasterizer(&script, RasterDiagnostics::Capture);

    let result = ProcessRasterizer::new(cfg).unwrap().rasterize(&artifact_in(&dir));
    let RasterResult::Failed {
        diagnostics: Some(diagnostics),
    } = result
    else {
        panic!("expected captured failure");
    };
    let text = String::from_utf8_lossy(&diagnostics);
    assert!(text.contains("/undefined in showpage"), "{text}");
    // Partial stdout is never treated as image data or diagnostics.
    assert!(!text.contains("partial"), "{text}");
}

#[cfg(unix)]
#[test]
fn failure_discards_stderr_under_discard_policy() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(dir.path(), "fake-gs", "echo 'boom' >&2; exit 2");
    let cfg = sh_rasterizer(&script, RasterDiagnostics::Discard);

    let result = ProcessRasterizer::new(cfg).unwrap().rasterize(&artifact_in(&dir));
    assert_eq!(result, RasterResult::Failed { diagnostics: None });
}

#[test]
fn missing_binary_is_a_raster_failure() {
    let dir = TempDir::new().expect("temp dir");
    let cfg = RasterizerConfig {
        program: dir.path().join("no-such-gs"),
        args: vec!["{artifact}".to_string()],
        diagnostics: RasterDiagnostics::Capture,
        expected_format: None,
    };

    let result = ProcessRasterizer::new(cfg).unwrap().rasterize(&artifact_in(&dir));
    let RasterResult::Failed {
        diagnostics: Some(diagnostics),
    } = result
    else {
        panic!("expected failure");
    };
    assert!(String::from_utf8_lossy(&diagnostics).contains("no-such-gs"));
}

#[cfg(unix)]
#[test]
fn empty_output_is_a_raster_failure() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(dir.path(), "fake-gs", "true");
    let cfg = sh_rasterizer(&script, RasterDiagnostics::Capture);

    let result = ProcessRasterizer::new(cfg).unwrap().rasterize(&artifact_in(&dir));
    assert!(matches!(result, RasterResult::Failed { .. }));
}

#[cfg(unix)]
#[test]
fn format_mismatch_is_a_raster_failure() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(dir.path(), "fake-gs", "printf 'not an image'");
    let mut cfg = sh_rasterizer(&script, RasterDiagnostics::Capture);
    cfg.expected_format = Some("png".to_string());

    let result = ProcessRasterizer::new(cfg).unwrap().rasterize(&artifact_in(&dir));
    let RasterResult::Failed {
        diagnostics: Some(diagnostics),
    } = result
    else {
        panic!("expected failure");
    };
    assert!(String::from_utf8_lossy(&diagnostics).contains("Png"));
}

#[cfg(unix)]
#[test]
fn large_image_and_stderr_do_not_deadlock() {
    let dir = TempDir::new().expect("temp dir");
    let script = write_script(
        dir.path(),
        "fake-gs",
        "head -c 2097152 /dev/zero >&2; head -c 2097152 /dev/zero",
    );
    let cfg = sh_rasterizer(&script, RasterDiagnostics::Capture);

    let result = ProcessRasterizer::new(cfg).unwrap().rasterize(&artifact_in(&dir));
    let RasterResult::Rasterized { image } = result else {
        panic!("expected image");
    };
    assert_eq!(image.len(), 2_097_152);
}
