use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

// Stamp git revision and build time into the binary for `easel --version`.
fn main() {
    let rev = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=EASEL_GIT_REV={}", rev);

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    println!("cargo:rustc-env=EASEL_BUILD_UNIX={}", ts);
}
