//! Formula recognition seam.
//!
//! Turning a formula image into LaTeX is done by an external model. The
//! pipeline only fixes the contract: one reference in, one LaTeX string out.

use crate::error::Result;
use crate::model::FormulaReference;
use rayon::prelude::*;
use serde::Serialize;

/// Converts a formula image into LaTeX source.
///
/// The reference is passed as extracted. Resolving a bare filename against
/// an image directory is the implementation's job.
pub trait Recognizer: Send + Sync {
    /// Recognize one formula.
    fn recognize(&self, reference: &FormulaReference) -> Result<String>;
}

/// A reference paired with the LaTeX recognized for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizedFormula {
    #[serde(flatten)]
    pub reference: FormulaReference,
    pub latex: String,
}

/// Recognize every reference in parallel.
///
/// The output lines up with `references`; a failure for one formula does not
/// stop the others.
pub fn recognize_all<R: Recognizer + ?Sized>(
    recognizer: &R,
    references: &[FormulaReference],
) -> Vec<Result<RecognizedFormula>> {
    references
        .par_iter()
        .map(|reference| {
            recognizer.recognize(reference).map(|latex| RecognizedFormula {
                reference: reference.clone(),
                latex,
            })
        })
        .collect()
}
