use std::future::Future;

use crate::classification::Classification;
use crate::error::ClassifierError;

/// Something that turns one sanitized post into a [`Classification`].
///
/// The batch runner is generic over this so tests can substitute a scripted
/// classifier for the HTTP one.
pub trait Classifier {
    /// Classify `text`, asking for fields keyed by `prefix`.
    fn classify(
        &self,
        text: &str,
        prefix: &str,
    ) -> impl Future<Output = Result<Classification, ClassifierError>>;
}
