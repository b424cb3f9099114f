/// Builds a Markdown permission report from a generated manifest.
pub mod report;
/// Atomic writes of the manifest and report.
pub mod writer;
