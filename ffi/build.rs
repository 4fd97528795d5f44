use std::path::PathBuf;

/// Generate `cities_ffi.h` into `OUT_DIR`. A cbindgen failure is reported as
/// a warning so it never blocks building the library itself.
fn main() {
    println!("cargo:rerun-if-changed=src");

    let (Ok(crate_dir), Ok(out_dir)) = (std::env::var("CARGO_MANIFEST_DIR"), std::env::var("OUT_DIR")) else {
        return;
    };

    match cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("CITIES_FFI_H")
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(PathBuf::from(out_dir).join("cities_ffi.h"));
        }
        Err(err) => println!("cargo:warning=cbindgen: {err}"),
    }
}
