//! Build script for vidshield-client
//!
//! Exposes build identification to the binary's startup banner:
//! - `VIDSHIELD_GIT_HASH` - short commit hash, `unknown` outside a checkout
//! - `VIDSHIELD_BUILD_TIMESTAMP` - RFC 3339 local time of the build
//! - `VIDSHIELD_BUILD_PROFILE` - cargo profile (debug/release)

use std::process::Command;

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string())
}

fn main() {
    let git_hash = git_short_hash().unwrap_or_else(|| "unknown".to_string());
    let build_timestamp =
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=VIDSHIELD_GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=VIDSHIELD_BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=VIDSHIELD_BUILD_PROFILE={}", profile);

    // Only the commit moves the hash; the timestamp follows source changes
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=src");
}
