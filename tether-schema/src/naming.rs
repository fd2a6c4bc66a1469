/// Maps a foreign `snake_case` name to the destination's `lowerCamelCase`.
///
/// Leading underscores are kept as-is, any run of inner underscores
/// capitalizes the next lowercase letter, and a trailing underscore survives.
#[must_use]
pub fn to_destination_name(foreign: &str) -> String {
    let mut result = String::with_capacity(foreign.len());
    let mut next_cap = false;
    let mut casing_active = false;
    let mut prev = None;

    for c in foreign.chars() {
        if c == '_' && casing_active {
            next_cap = true;
        } else {
            if c != '_' {
                casing_active = true;
            }
            if next_cap && c.is_ascii_lowercase() {
                result.push(c.to_ascii_uppercase());
            } else {
                result.push(c);
            }
            next_cap = false;
        }
        prev = Some(c);
    }
    if prev == Some('_') && casing_active {
        result.push('_');
    }
    result
}
