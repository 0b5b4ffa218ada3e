//! Column-name sanitisation for XML element names.
//!
//! Source tables carry arbitrary column names (`"Date of birth"`,
//! `"2nd-place"`, `"xml_payload"`). Feed cells use the name as the local part
//! of a `d:` element, so it must start with a letter, must not start with the
//! reserved `xml` prefix and must not contain punctuation that XML rejects.
//!
//! # Examples
//! ```
//! use odata_feed_core::sanitize_identifier;
//!
//! assert_eq!(sanitize_identifier("date of birth"), "dateOfBirth");
//! assert_eq!(sanitize_identifier("2nd-place"), "x2ndPlace");
//! assert_eq!(sanitize_identifier("XmlPayload"), "xXmlPayload");
//! ```

/// Characters that split words; the following character is capitalised.
const SEPARATORS: &[char] = &[
    ' ', '-', '_', '=', '(', ')', '[', ']', '{', '}', '|', '+', '&', '/', '\\',
];

/// Characters removed outright without affecting capitalisation.
const DROPPED: &[char] = &['"', '\''];

/// Map a raw column name to a name usable as an XML element local part.
///
/// The function is total: every input yields a non-empty result. Distinct
/// inputs may map to the same output (`"a b"` and `"aB"` both become
/// `"aB"`); callers that need unique names must detect collisions
/// themselves.
#[must_use]
pub fn sanitize_identifier(raw: &str) -> String {
    let mut safe = String::with_capacity(raw.len() + 1);
    if needs_prefix(raw) {
        safe.push('x');
    }

    let mut capitalise_next = false;
    for ch in raw.chars() {
        if SEPARATORS.contains(&ch) {
            capitalise_next = true;
        } else if DROPPED.contains(&ch) {
            continue;
        } else if capitalise_next {
            safe.extend(ch.to_uppercase());
            capitalise_next = false;
        } else {
            safe.push(ch);
        }
    }
    safe
}

fn needs_prefix(raw: &str) -> bool {
    let starts_with_letter = raw.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic());
    let reserved = raw
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("xml"));
    !starts_with_letter || reserved
}
