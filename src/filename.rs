//! Client filename handling.
//!
//! Uploaded filenames become object keys, so they are reduced to a flat,
//! ASCII-only name before use: accents are decomposed (NFKD) and the
//! combining marks dropped, `/` folds directory components into the name,
//! whitespace runs become `_`, anything outside `[A-Za-z0-9_.-]` (including
//! `\`) is dropped, and leading/trailing `.`/`_` are trimmed.

use unicode_normalization::UnicodeNormalization;

/// Extension every uploaded file must carry. Matched case-sensitively.
pub const CSV_EXTENSION: &str = ".csv";

/// Whether `filename` has the accepted upload extension.
pub fn is_csv(filename: &str) -> bool {
    filename.ends_with(CSV_EXTENSION)
}

/// Reduce a client-supplied filename to a safe, flat object key.
///
/// The result may be empty (e.g. for `"../.."`); callers must check.
pub fn sanitize_filename(filename: &str) -> String {
    let separated: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' { ' ' } else { c })
        .collect();

    let joined = separated.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}
