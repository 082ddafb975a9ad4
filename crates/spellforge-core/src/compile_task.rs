//! Background compilation
//!
//! Validation and generation compiles are dispatched to a blocking worker
//! thread so a slow in-process build cannot stall the cooperative loop.
//! Callers await the result and touch shared state only from their own
//! task; the worker never sees the registry or any other shared map.

use spellforge_compile::{CompileError, CompiledUnit, ReferenceSet, SourceCompiler};

/// Compile on a blocking worker thread and await the result.
///
/// A worker that dies before answering is surfaced as the distinct
/// toolchain fault class, since retrying is pointless.
pub async fn compile_in_background(
    compiler: SourceCompiler,
    source: String,
    references: ReferenceSet,
) -> Result<CompiledUnit, CompileError> {
    match tokio::task::spawn_blocking(move || compiler.compile(&source, &references)).await {
        Ok(result) => result,
        Err(e) => Err(CompileError::Toolchain(format!("compile worker failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn background_compile_returns_the_unit() {
        let unit = compile_in_background(
            SourceCompiler::new(),
            "pub struct S;".to_string(),
            ReferenceSet::new(),
        )
        .await
        .unwrap();

        assert_eq!(unit.type_names(), vec!["S"]);
    }

    #[tokio::test]
    async fn background_compile_reports_diagnostics() {
        let err = compile_in_background(
            SourceCompiler::new(),
            "pub struct Broken {".to_string(),
            ReferenceSet::new(),
        )
        .await
        .unwrap_err();

        assert!(!err.diagnostics().is_empty());
        assert!(!err.is_toolchain());
    }
}
