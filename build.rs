use vergen::EmitBuilder;

fn main() {
    // Builds from a source tarball have no git metadata; the binary falls
    // back to "unknown" then.
    if let Err(e) = EmitBuilder::builder()
        .build_timestamp()
        .git_sha(true)
        .emit()
    {
        println!("cargo:warning=vergen: {}", e);
    }
}
