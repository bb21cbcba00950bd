use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    // Copy the default config next to the built executable
    copy_config();
}

/// Locates target/release (or target/debug) from OUT_DIR.
fn target_dir() -> PathBuf {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    // OUT_DIR is something like target/release/build/poweroff-detector-xxx/out
    Path::new(&out_dir)
        .ancestors()
        .nth(3) // Go up 3 levels: out -> hash -> build -> release
        .expect("Could not find target directory")
        .to_path_buf()
}

/// Copies config.json to the target directory.
fn copy_config() {
    let config_src = Path::new("config.json");
    let config_dst = target_dir().join("config.json");

    if config_src.exists() {
        let _ = fs::copy(config_src, &config_dst);
    }
    println!("cargo:rerun-if-changed=config.json");
}
