use std::env;
use std::path::{Path, PathBuf};

/// Directories searched when `LIBACL_LIB_DIR` is not set.
const SYSTEM_DIRS: &[&str] = &["/usr/lib64", "/lib64", "/usr/lib", "/lib", "/usr/local/lib"];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=LIBACL_LIB_DIR");

    let dirs = search_dirs();

    // development symlink present: plain `-lacl`
    if let Some(dir) = dirs.iter().find(|dir| dir.join("libacl.so").exists()) {
        println!("cargo:rustc-link-search=native={}", dir.display());
        println!("cargo:rustc-link-lib=dylib=acl");
        return;
    }

    // runtime package only: link the soname directly
    if let Some(dir) = dirs.iter().find(|dir| dir.join("libacl.so.1").exists()) {
        println!("cargo:rustc-link-search=native={}", dir.display());
        println!("cargo:rustc-link-lib=dylib:+verbatim=libacl.so.1");
        return;
    }

    println!("cargo:warning=libacl not found; set LIBACL_LIB_DIR or install the libacl development package");
    println!("cargo:rustc-link-lib=dylib=acl");
}

fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(dir) = env::var_os("LIBACL_LIB_DIR") {
        dirs.push(PathBuf::from(dir));
    }
    if let Ok(arch) = env::var("CARGO_CFG_TARGET_ARCH") {
        for root in ["/usr/lib", "/lib"] {
            dirs.push(Path::new(root).join(format!("{arch}-linux-gnu")));
        }
    }
    dirs.extend(SYSTEM_DIRS.iter().map(PathBuf::from));
    dirs
}
