//! Content classification
//!
//! Best-effort guess of an entry's type from its text. Only consulted
//! when the caller did not declare a type.

use crate::store::EntryType;

const LINK_SCHEMES: [&str; 3] = ["http://", "https://", "ftp://"];
const CODE_MARKERS: [char; 9] = ['{', '}', '[', ']', '(', ')', ';', '=', '>'];

/// Infer the type of `content`.
///
/// - URL scheme prefix → [`EntryType::Link`]
/// - multi-line with bracket/operator characters → [`EntryType::Code`]
/// - anything else → [`EntryType::Text`]
pub fn classify(content: &str) -> EntryType {
    let trimmed = content.trim();

    if LINK_SCHEMES.iter().any(|scheme| trimmed.starts_with(scheme)) {
        return EntryType::Link;
    }

    if trimmed.contains('\n') && trimmed.contains(CODE_MARKERS) {
        return EntryType::Code;
    }

    EntryType::Text
}
