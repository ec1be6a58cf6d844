pub fn main() {
    emit_git_version();
}

/// Emit `VERGEN_GIT_DESCRIBE` and `VERGEN_GIT_SHA` for the binary's version string.
///
/// Outside a git checkout vergen emits placeholders; the binary then reports
/// the Cargo package version instead.
fn emit_git_version() {
    use vergen_git2::{Emitter, Git2Builder};

    let git2 = match Git2Builder::default()
        .describe(true, true, None)
        .sha(true)
        .build()
    {
        Ok(git2) => git2,
        Err(e) => {
            println!("cargo:warning=git version info unavailable: {e}");
            return;
        }
    };

    let emitted = Emitter::default()
        .add_instructions(&git2)
        .and_then(|emitter| emitter.emit());
    if let Err(e) = emitted {
        println!("cargo:warning=git version info unavailable: {e}");
    }
}
