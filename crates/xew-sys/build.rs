fn main() {
    // Only link the vendor library when the `vendor` feature is enabled.
    #[cfg(feature = "vendor")]
    {
        use std::env;

        let lib_dir =
            env::var("XEW_VENDOR_LIB_DIR").unwrap_or_else(|_| "/opt/xpu/lib".to_string());
        println!("cargo:rustc-link-search=native={lib_dir}");
        println!("cargo:rustc-link-lib=dylib=xew_vendor");
        println!("cargo:rerun-if-env-changed=XEW_VENDOR_LIB_DIR");
    }
}
