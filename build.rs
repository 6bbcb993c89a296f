use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Dependencies whose resolved versions `finderdrive-cli about` prints
const TRACKED_DEPS: &[&str] = &[
    "tokio",
    "serde",
    "serde_json",
    "thiserror",
    "tracing",
    "chrono",
    "reqwest",
    "rusqlite",
    "secrecy",
    "clap",
];

fn main() {
    // A missing lock file only means the versions print as "unknown"
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let lock_path = Path::new(&manifest_dir).join("Cargo.lock");
    let versions = parse_lock_versions(&fs::read_to_string(&lock_path).unwrap_or_default());

    for dep in TRACKED_DEPS {
        let key = format!("DEP_VERSION_{}", dep.to_uppercase().replace('-', "_"));
        let version = versions.get(*dep).map(String::as_str).unwrap_or("unknown");
        println!("cargo:rustc-env={key}={version}");
    }
    println!("cargo:rerun-if-changed=Cargo.lock");

    // "rustc 1.84.0 (...)" -> "1.84.0"
    let rustc = std::process::Command::new("rustc")
        .arg("--version")
        .output()
        .ok()
        .and_then(|out| {
            String::from_utf8_lossy(&out.stdout)
                .split_whitespace()
                .nth(1)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=RUSTC_VERSION={rustc}");
}

/// Highest locked version per package name. A crate can be locked more than
/// once (direct plus transitive); the newest one is the direct dependency.
fn parse_lock_versions(lock: &str) -> HashMap<String, String> {
    let mut versions: HashMap<String, String> = HashMap::new();
    let mut name: Option<&str> = None;

    for line in lock.lines().map(str::trim) {
        if let Some(value) = quoted_value(line, "name") {
            name = Some(value);
        } else if let (Some(version), Some(package)) = (quoted_value(line, "version"), name.take()) {
            let newer = versions
                .get(package)
                .map_or(true, |known| numeric_parts(version) > numeric_parts(known));
            if newer {
                versions.insert(package.to_string(), version.to_string());
            }
        }
    }
    versions
}

fn quoted_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.strip_prefix(key)?
        .trim_start()
        .strip_prefix("= \"")?
        .strip_suffix('"')
}

fn numeric_parts(version: &str) -> Vec<u64> {
    version.split('.').filter_map(|p| p.parse().ok()).collect()
}
