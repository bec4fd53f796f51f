//! Sandboxed LaTeX compilation.
//!
//! Each compile copies a template directory into a fresh, uniquely named
//! working directory, writes the generated source next to it and runs the
//! engine confined to that directory under a timeout. The directory is
//! handed back as a [`Sandbox`] whatever the outcome.
//!
//! # Example
//!
//! ```no_run
//! use texpipe::compile::{compile_with_options, CompileOptions, Isolation};
//!
//! let options = CompileOptions::new().with_isolation(Isolation::Host);
//! let compilation = compile_with_options(
//!     "\\documentclass{article}\\begin{document}Hi\\end{document}",
//!     "/srv/templates/article",
//!     &options,
//! )?;
//! match compilation.pdf_path() {
//!     Some(pdf) => println!("{}", pdf.display()),
//!     None => eprintln!("{}", compilation.result().error_log.unwrap_or_default()),
//! }
//! compilation.sandbox.release()?;
//! # Ok::<(), texpipe::Error>(())
//! ```

mod compiler;
mod options;
mod sandbox;

#[cfg(feature = "async")]
pub use compiler::compile_async;
pub use compiler::{
    compile, compile_many, compile_with_options, Compilation, CompilationResult, CompileJob,
    CompileOutcome,
};
pub use options::{CompileOptions, Isolation, DEFAULT_IMAGE};
pub use sandbox::Sandbox;
