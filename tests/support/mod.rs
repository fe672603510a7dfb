#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// PNG signature followed by placeholder data.
pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nIMAGEDATA";

pub const COMPILER: &str = r#"
if grep -q 'broken' "$1"; then
  echo "! Undefined control sequence."
  echo "l.1 \broken" >&2
  exit 1
fi
if grep -q 'slow' "$1"; then
  sleep 3
fi
cp "$1" "$3"
"#;

pub const RASTERIZER: &str = r"printf '\211PNG\r\n\032\nIMAGEDATA'";

pub fn worker_exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_texrender")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "texrender.exe"
            } else {
                "texrender"
            });
            p
        })
}

/// Scratch dir, fake toolchain and a config file wiring them together.
pub struct Sandbox {
    pub dir: TempDir,
    pub config: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::with_rasterizer(Some(RASTERIZER))
    }

    /// `None` points the rasterizer at a path that does not exist.
    pub fn with_rasterizer(rasterizer: Option<&str>) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let scratch = dir.path().join("scratch");
        std::fs::create_dir_all(&scratch).unwrap();

        let compiler = write_script(dir.path(), "fake-tex", COMPILER);
        let (raster_program, raster_args) = match rasterizer {
            Some(body) => {
                let script = write_script(dir.path(), "fake-gs", body);
                (
                    "/bin/sh".to_string(),
                    vec![script.display().to_string(), "{artifact}".to_string()],
                )
            }
            None => (
                dir.path().join("missing-gs").display().to_string(),
                vec!["{artifact}".to_string()],
            ),
        };

        let cfg = serde_json::json!({
            "scratch": { "dir": scratch },
            "compiler": {
                "program": "/bin/sh",
                "args": [compiler.display().to_string(), "{source}", "{output_dir}", "{artifact}"],
            },
            "rasterizer": {
                "program": raster_program,
                "args": raster_args,
                "expected_format": "png",
            },
        });
        let config = dir.path().join("worker.json");
        std::fs::write(&config, serde_json::to_vec_pretty(&cfg).unwrap()).unwrap();

        Self { dir, config }
    }
}

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("set -eu\n{body}\n")).expect("write script");
    path
}

pub fn frame(head: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = head.to_be_bytes().to_vec();
    out.extend((payload.len() as u32).to_be_bytes());
    out.extend(payload);
    out
}
