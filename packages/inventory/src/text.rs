//! Text normalization for values extracted from Inventory documents.

use std::borrow::Cow;

use quick_xml::escape::resolve_html5_entity;

/// Longest entity name worth looking up (`&CounterClockwiseContourIntegral;`).
const MAX_ENTITY_LEN: usize = 32;

/// Decode HTML character references in text, exactly once.
///
/// Publishers frequently HTML-encode descriptions before placing them in
/// the XML, so after the XML parser has resolved its own entities the text
/// may still contain `&amp;`, `&lt;p&gt;`, `&#163;` and the like. Named
/// HTML5 entities and decimal/hex numeric references are decoded; unknown
/// or unterminated references are left as they are.
///
/// # Examples
/// ```
/// use inventory_harvester::text::decode_html_entities;
///
/// assert_eq!(decode_html_entities("Fish &amp; Chips"), "Fish & Chips");
/// assert_eq!(decode_html_entities("&lt;p&gt;Costs &#163;5&lt;/p&gt;"), "<p>Costs £5</p>");
/// // Decoding happens once: an encoded entity stays an entity
/// assert_eq!(decode_html_entities("&amp;amp;"), "&amp;");
/// // Unknown references are kept
/// assert_eq!(decode_html_entities("R&D &bogus; done"), "R&D &bogus; done");
/// ```
pub fn decode_html_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp + 1..];

        match decode_reference(candidate) {
            Some((decoded, consumed)) => {
                out.push_str(&decoded);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('&');
                rest = candidate;
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

/// Decode the reference at the start of `input` (the text after `&`).
///
/// Returns the replacement and the number of bytes consumed, including
/// the terminating `;`.
fn decode_reference(input: &str) -> Option<(Cow<'static, str>, usize)> {
    let end = input
        .char_indices()
        .take(MAX_ENTITY_LEN + 1)
        .find(|(_, c)| *c == ';')
        .map(|(i, _)| i)?;
    let name = &input[..end];

    let decoded = if let Some(number) = name.strip_prefix('#') {
        Cow::Owned(decode_numeric(number)?.to_string())
    } else {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Cow::Borrowed(resolve_html5_entity(name)?)
    };

    Some((decoded, end + 1))
}

/// Decode the digits of a numeric character reference.
///
/// Code points that are not valid characters (NUL, surrogates, out of
/// range) become U+FFFD, as browsers do.
fn decode_numeric(number: &str) -> Option<char> {
    let code = match number.strip_prefix(['x', 'X']) {
        Some(hex) if !hex.is_empty() => u32::from_str_radix(hex, 16).ok()?,
        Some(_) => return None,
        None if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) => {
            number.parse::<u32>().unwrap_or(u32::MAX)
        }
        None => return None,
    };

    if code == 0 {
        return Some(char::REPLACEMENT_CHARACTER);
    }
    Some(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
}
