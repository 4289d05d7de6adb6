//! Opaque identifier generation

use uuid::Uuid;

/// Random 32-character token, a v4 UUID rendered without hyphens.
///
/// Used for everything opaque the server hands out: state tokens, session
/// ids, authorization codes, bearer tokens, avatar filenames.
pub fn opaque_token() -> String {
    Uuid::new_v4().simple().to_string()
}
