use std::process::Command;

fn main() {
    // Use semantic version from Cargo.toml
    let version = env!("CARGO_PKG_VERSION");

    // Generate compilation timestamp for additional build info
    let timestamp = Command::new("date")
        .args(["+%Y-%m-%d %H:%M:%S UTC"])
        .env("TZ", "UTC")
        .output()
        .ok()
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    println!("cargo:rustc-env=BUILD_VERSION={}", version);

    if timestamp.is_empty() {
        println!("cargo:rustc-env=BUILD_TIMESTAMP=Unknown");
    } else {
        println!("cargo:rustc-env=BUILD_TIMESTAMP={}", timestamp);
    }
}
