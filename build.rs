use anyhow::Result;

#[cfg(feature = "tflite")]
const LIBS: &[&str] = &["tensorflowlite_c"];

#[cfg(feature = "tflite")]
fn generate_bindings() -> Result<()> {
    use anyhow::{anyhow, Context};
    use std::path::PathBuf;

    let mut bindings = bindgen::Builder::default()
        .header("wrapper.h")
        .parse_callbacks(Box::new(bindgen::CargoCallbacks))
        .allowlist_function("TfLite.*")
        .allowlist_type("TfLite.*")
        .rustfmt_bindings(true)
        .newtype_enum(".+")
        .derive_debug(true)
        .size_t_is_usize(true)
        .opaque_type("max_align_t");

    for lib in LIBS {
        let library = pkg_config::Config::new()
            .probe(lib)
            .with_context(|| format!("failed to locate {} with pkg-config", lib))?;
        for include_path in library.include_paths {
            bindings = bindings.clang_arg(format!("-I{}", include_path.display()));
        }
    }

    bindings
        .generate()
        .map_err(|_| anyhow!("unable to generate bindings"))?
        .write_to_file(
            PathBuf::from(
                std::env::var("OUT_DIR").context("OUT_DIR environment variable not defined")?,
            )
            .join("bindings.rs"),
        )
        .context("failed to write bindings to file")?;

    println!("cargo:rerun-if-changed=wrapper.h");
    Ok(())
}

fn main() -> Result<()> {
    #[cfg(feature = "tflite")]
    generate_bindings()?;

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
