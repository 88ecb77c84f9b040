//! Document identity of a map task.
//!
//! The hosting pipeline exports the path of the shard being processed in one
//! of two environment variables. The document id is the base file name up to
//! its first `.`, so `/data/alice.txt.gz` becomes `alice`.

use crate::DocId;
use std::path::Path;

/// Variables checked in order; the first one present wins.
pub const INPUT_FILE_VARS: [&str; 2] = ["mapreduce_map_input_file", "map_input_file"];

/// Identity used when the pipeline does not report an input file.
pub const UNKNOWN_DOC: &str = "unknown_doc";

/// Resolve the document id from the process environment.
pub fn from_env() -> DocId {
    resolve_with(|name| std::env::var(name).ok())
}

/// Resolve the document id through an arbitrary variable lookup.
pub fn resolve_with<F>(lookup: F) -> DocId
where
    F: Fn(&str) -> Option<String>,
{
    for var in INPUT_FILE_VARS {
        if let Some(path) = lookup(var) {
            let id = doc_id_from_path(&path);
            tracing::debug!(var, path, doc = %id, "resolved document identity");
            return id;
        }
    }
    tracing::warn!("no input file reported by the pipeline, using {UNKNOWN_DOC}");
    UNKNOWN_DOC.to_string()
}

/// Base file name of `path`, cut at the first `.`.
pub fn doc_id_from_path(path: &str) -> DocId {
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => name,
    }
}
