//! Identifier → canonical key conversion
//!
//! Model files live under `app/Models/<canonical_key>.rs`, where the key is the
//! snake_case form of the type identifier. The conversion runs two
//! non-overlapping left-to-right passes over the identifier:
//!
//! 1. insert `_` before every Titlecase run (`[A-Z][a-z]+`) that is preceded
//!    by any character (`HTTPLoader` → `HTTP_Loader`)
//! 2. insert `_` between a lowercase letter or digit and an uppercase letter
//!    (`myModel` → `my_Model`)
//!
//! and then lowercases the result. The output never contains an uppercase
//! ASCII letter, so re-applying the conversion is a no-op.

/// Convert an identifier into its canonical lookup key.
///
/// # Examples
///
/// ```rust
/// use taller::naming::canonicalize;
///
/// assert_eq!(canonicalize("MyClassifier"), "my_classifier");
/// assert_eq!(canonicalize("HTTPLoader"), "http_loader");
/// assert_eq!(canonicalize("already_snake"), "already_snake");
/// ```
#[must_use]
pub fn canonicalize(identifier: &str) -> String {
    let split = split_lower_upper(&split_titlecase(identifier));
    split.to_lowercase()
}

/// Pass 1: `(.)([A-Z][a-z]+)` → `\1_\2`.
fn split_titlecase(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);
    let mut i = 0;

    while i < chars.len() {
        let starts_titlecase = chars[i] != '\n'
            && chars.get(i + 1).is_some_and(char::is_ascii_uppercase)
            && chars.get(i + 2).is_some_and(char::is_ascii_lowercase);

        if starts_titlecase {
            out.push(chars[i]);
            out.push('_');
            out.push(chars[i + 1]);
            let mut j = i + 2;
            while j < chars.len() && chars[j].is_ascii_lowercase() {
                out.push(chars[j]);
                j += 1;
            }
            i = j;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    out
}

/// Pass 2: `([a-z0-9])([A-Z])` → `\1_\2`.
fn split_lower_upper(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let boundary = (c.is_ascii_lowercase() || c.is_ascii_digit())
            && chars.get(i + 1).is_some_and(char::is_ascii_uppercase);

        out.push(c);
        if boundary {
            out.push('_');
            out.push(chars[i + 1]);
            i += 2;
        } else {
            i += 1;
        }
    }

    out
}
