/// Return `true` when a raw field carries no value: blank after trimming, or the
/// case-insensitive `NULL` token used by database exports.
pub fn is_null_token(field: &str) -> bool {
    let field = field.trim();
    field.is_empty() || field.eq_ignore_ascii_case("null")
}

/// Parse a floating point field
///
/// Arguments
/// ---------------
/// * `field`: raw field content
///
/// Return
/// ----------
/// * `Some(value)` for any text accepted as a floating point number after trimming
///   (including exponents), `None` for blank, `NULL` or unparsable input.
pub fn parse_float(field: &str) -> Option<f64> {
    if is_null_token(field) {
        return None;
    }
    field.trim().parse::<f64>().ok()
}

/// Parse an integer field through its floating point value
///
/// Arguments
/// ---------------
/// * `field`: raw field content, e.g. `"3"`, `"3.0"` or `"2000433.0"`
///
/// Return
/// ----------
/// * The value truncated toward zero, `None` when [`parse_float`] fails or the value is not
///   finite or does not fit an `i64`.
pub fn parse_int(field: &str) -> Option<i64> {
    let value = parse_float(field)?;
    if !value.is_finite() {
        return None;
    }
    let truncated = value.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return None;
    }
    Some(truncated as i64)
}

/// Trimmed text, `None` when blank or `NULL`
pub fn norm_text(field: &str) -> Option<String> {
    if is_null_token(field) {
        return None;
    }
    Some(field.trim().to_string())
}

/// Normalize a yes/no flag to `'Y'` or `'N'`.
///
/// Only the first non-blank character matters; anything other than `y`/`Y` is `'N'`.
pub fn norm_flag(field: &str) -> char {
    match field.trim().chars().next() {
        Some(c) if c.eq_ignore_ascii_case(&'y') => 'Y',
        _ => 'N',
    }
}

/// Keep at most `max_chars` characters of `text`, cutting on a character boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// [`norm_text`] followed by [`truncate_chars`]
pub fn norm_text_max(field: &str, max_chars: usize) -> Option<String> {
    norm_text(field).map(|text| truncate_chars(&text, max_chars))
}
