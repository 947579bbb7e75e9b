use anyhow::Result;
use vergen::EmitBuilder;

// Exposes VERGEN_GIT_SHA to the CLI's long version string
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=build.rs");
    EmitBuilder::builder().git_sha(true).emit()?;
    Ok(())
}
