//! Build script for cert-preflight.
//!
//! Stamps version information from git and the toolchain into the binary.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");

    println!(
        "cargo:rustc-env=TARGET={}",
        env::var("TARGET").unwrap_or_else(|_| "unknown".to_string())
    );

    if let Some(hash) = get_git_hash() {
        println!("cargo:rustc-env=PREFLIGHT_GIT_HASH={}", hash);
    }

    if let Some(date) = get_build_date() {
        println!("cargo:rustc-env=PREFLIGHT_BUILD_DATE={}", date);
    }

    if let Some(version) = get_rustc_version() {
        println!("cargo:rustc-env=PREFLIGHT_RUSTC_VERSION={}", version);
    }
}

/// Get the current git commit hash (short form)
fn get_git_hash() -> Option<String> {
    run_trimmed("git", &["rev-parse", "--short", "HEAD"])
}

/// Get the current build date in ISO 8601 format
fn get_build_date() -> Option<String> {
    run_trimmed("date", &["-u", "+%Y-%m-%dT%H:%M:%SZ"])
}

/// Get the rustc version ("rustc 1.75.0 (..." -> "1.75.0")
fn get_rustc_version() -> Option<String> {
    run_trimmed("rustc", &["--version"])
        .and_then(|s| s.split_whitespace().nth(1).map(|v| v.to_string()))
}

fn run_trimmed(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
            } else {
                None
            }
        })
}
