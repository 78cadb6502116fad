fn main() {
    #[cfg(feature = "blas")]
    {
        // cblas only declares the symbols; link the system OpenBLAS.
        if let Ok(dir) = std::env::var("OPENBLAS_LIB_DIR") {
            println!("cargo:rustc-link-search=native={dir}");
        } else if cfg!(target_os = "macos") {
            println!("cargo:rustc-link-search=native=/opt/homebrew/opt/openblas/lib");
            println!("cargo:rustc-link-search=native=/usr/local/opt/openblas/lib");
        }
        println!("cargo:rustc-link-lib=openblas");
        println!("cargo:rerun-if-env-changed=OPENBLAS_LIB_DIR");
    }
}
