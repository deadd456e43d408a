use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    // Only the bare-metal firmware needs the linker script; host test
    // builds skip it.
    if env::var_os("CARGO_FEATURE_EFM32").is_none() {
        return;
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::copy("memory.x", out_dir.join("memory.x")).expect("memory.x must exist at the crate root");
    println!("cargo:rustc-link-search={}", out_dir.display());
}
