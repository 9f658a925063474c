/// Type word used when an effect has no type of its own.
pub const DEFAULT_SOURCE_TYPE: &str = "effect";
/// Method word used when an effect has no method of its own.
pub const DEFAULT_SOURCE_METHOD: &str = "change";

/// Build the ledger key identifying which effect path touched `quantity`.
pub fn source_key(effect_type: Option<&str>, method: Option<&str>, quantity: &str) -> String {
    [
        effect_type.unwrap_or(DEFAULT_SOURCE_TYPE),
        method.unwrap_or(DEFAULT_SOURCE_METHOD),
        quantity,
    ]
    .join(":")
}
