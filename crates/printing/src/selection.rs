//! Data URLs carrying a copied selection as a standalone document.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

const DATA_URL_PREFIX: &str = "data:text/html;charset=utf-8,";

/// Bytes escaped in a query parameter value: everything except ASCII
/// alphanumerics and `-_.!~*'()`.
const QUERY_PARAM_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Escapes `value` the way a URL query parameter value is escaped: every
/// byte outside the unreserved set becomes `%XX`, including spaces.
pub fn escape_query_param_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_PARAM_VALUE).to_string()
}

/// `data:` URL that loads `markup` as an HTML document.
/// 將選取內容的標記包裝為可載入的 `data:` URL。
pub fn selection_data_url(markup: &str) -> String {
    let mut url = String::from(DATA_URL_PREFIX);
    url.push_str(&escape_query_param_value(markup));
    url
}

/// Recovers the markup from a URL built by [`selection_data_url`].
///
/// Returns `None` for other URLs and for payloads that do not decode to
/// UTF-8. Malformed escapes are kept as written.
pub fn decode_data_url(url: &str) -> Option<String> {
    let payload = url.strip_prefix(DATA_URL_PREFIX)?;
    percent_decode_str(payload)
        .decode_utf8()
        .ok()
        .map(|markup| markup.into_owned())
}
