use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const ENV_PREFIX: &str = "RIG_INGEST_";

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_rs_files(&path, out)?;
        } else if path.extension().and_then(|ext| ext.to_str()) == Some("rs") {
            out.push(path);
        }
    }
    Ok(())
}

/// Variables are only ever read through string literals such as
/// `"RIG_INGEST_HOME"`, so only whole quoted names count. Identifiers and
/// prose mentioning the prefix are ignored.
fn collect_env_literals(source: &str, out: &mut BTreeSet<String>) {
    let needle = format!("\"{ENV_PREFIX}");
    let mut rest = source;
    while let Some(start) = rest.find(&needle) {
        let candidate = &rest[start + 1..];
        let len = candidate
            .find(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'))
            .unwrap_or(candidate.len());
        if len > ENV_PREFIX.len() && candidate[len..].starts_with('"') {
            out.insert(candidate[..len].to_string());
        }
        rest = &candidate[len..];
    }
}

fn write_generated_allowlist(files: &[PathBuf]) -> std::io::Result<()> {
    let mut keys = BTreeSet::new();
    for file in files {
        collect_env_literals(&fs::read_to_string(file)?, &mut keys);
    }

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let mut f = fs::File::create(Path::new(&out_dir).join("rig_ingest_env_allowlist.rs"))?;
    writeln!(f, "pub const GENERATED_RIG_INGEST_ENV_ALLOWLIST: &[&str] = &[")?;
    for key in &keys {
        writeln!(f, "    {key:?},")?;
    }
    writeln!(f, "];")
}

fn main() {
    let mut files = Vec::new();
    collect_rs_files(Path::new("src"), &mut files).expect("failed to walk src");
    files.sort();
    write_generated_allowlist(&files).expect("failed to generate RIG_INGEST env allowlist");

    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    println!(
        "cargo:rustc-env=BUILD_UUID={:x}-{:x}",
        now.as_secs(),
        now.subsec_nanos()
    );
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
    for file in &files {
        println!("cargo:rerun-if-changed={}", file.display());
    }
}
