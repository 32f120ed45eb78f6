use std::env;

fn main() {
    // Version string baked into the binary and the HTTP user agent
    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".to_string());
    let version = match env::var("SPLITFETCH_BUILD_TAG") {
        Ok(tag) if !tag.is_empty() => format!("{version}+{tag}"),
        _ => version,
    };
    println!("cargo:rustc-env=SPLITFETCH_VERSION={version}");

    println!("cargo:rerun-if-env-changed=SPLITFETCH_BUILD_TAG");
    println!("cargo:rerun-if-changed=src/");
    println!("cargo:rerun-if-changed=Cargo.toml");
}
