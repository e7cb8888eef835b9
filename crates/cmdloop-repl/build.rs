//! Stamps the `cmdloop` binary with its git revision and build date, shown
//! by `--version`.

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=build.rs");

    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let build_date = chrono::Utc::now().format("%Y-%m-%d").to_string();

    println!("cargo:rustc-env=CMDLOOP_GIT_HASH={git_hash}");
    println!("cargo:rustc-env=CMDLOOP_BUILD_DATE={build_date}");
}
