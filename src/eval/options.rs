//! The three-bit write-option policy threaded through the write/unset walks.

/// Governs container creation and overwriting during a `set`/`unset` walk.
/// All three default to `true`; `DeepWildcard` descent forces
/// `create_missing` to `false` for its own recursion — a `**` write only
/// ever touches structure that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub create_missing: bool,
    pub create_filter_match: bool,
    pub overwrite_incompatible: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            create_missing: true,
            create_filter_match: true,
            overwrite_incompatible: true,
        }
    }
}

impl WriteOptions {
    pub(crate) fn for_deep_wildcard_descent(self) -> Self {
        WriteOptions {
            create_missing: false,
            ..self
        }
    }
}
