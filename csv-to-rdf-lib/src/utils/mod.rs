use std::sync::OnceLock;

use regex::Regex;

use crate::ProcessorError;

pub const DATE_FORMATS: [&str; 9] = [
    "%Y-%m-%d",  // 2024-06-17
    "%Y/%m/%d",  // 2024/06/17
    "%m-%d-%Y",  // 06-17-2024
    "%m/%d/%Y",  // 06/17/2024
    "%d-%m-%Y",  // 17-06-2024
    "%d/%m/%Y",  // 17/06/2024
    "%d.%m.%Y",  // 17.06.2024
    "%b %d, %Y", // Jun 17, 2024
    "%B %d, %Y", // June 17, 2024
];

pub const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

fn non_word() -> &'static Regex {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    NON_WORD.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]+").expect("static regex"))
}

fn fold_diacritic(c: char) -> Option<char> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => 'A',
        'ç' | 'ć' | 'č' => 'c',
        'Ç' | 'Ć' | 'Č' => 'C',
        'ď' => 'd',
        'Ď' => 'D',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ė' | 'Ę' | 'Ě' => 'E',
        'ğ' => 'g',
        'Ğ' => 'G',
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' | 'Į' | 'İ' => 'I',
        'ľ' | 'ĺ' => 'l',
        'Ľ' | 'Ĺ' => 'L',
        'ñ' | 'ń' | 'ň' => 'n',
        'Ñ' | 'Ń' | 'Ň' => 'N',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ō' | 'ő' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ō' | 'Ő' => 'O',
        'ŕ' | 'ř' => 'r',
        'Ŕ' | 'Ř' => 'R',
        'ś' | 'š' | 'ş' => 's',
        'Ś' | 'Š' | 'Ş' => 'S',
        'ť' | 'ţ' => 't',
        'Ť' | 'Ţ' => 'T',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' | 'Ů' | 'Ű' | 'Ų' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' | 'Ÿ' => 'Y',
        'ź' | 'ż' | 'ž' => 'z',
        'Ź' | 'Ż' | 'Ž' => 'Z',
        c if c.is_ascii() => c,
        _ => return None,
    };
    Some(folded)
}

/// Normalize free text into a slug-safe label: ASCII only, every run of
/// non-word characters collapsed to `_`, no leading or trailing `_`.
pub fn safe(text: &str) -> String {
    let ascii: String = text.trim().chars().filter_map(fold_diacritic).collect();
    non_word()
        .replace_all(&ascii, "_")
        .trim_matches('_')
        .to_string()
}

/// Percent-encode a value for use as a single IRI path segment.
pub fn encode_segment(value: &str) -> String {
    urlencoding::encode(value.trim()).into_owned()
}

pub fn is_absolute_iri(term: &str) -> bool {
    match term.split_once(':') {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                && (rest.starts_with("//") || scheme == "urn" || scheme == "mailto")
        }
        None => false,
    }
}

pub fn is_http_iri(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Validate a base IRI and make sure it ends with `/` or `#`.
pub fn normalize_base_iri(base: &str, field: &str) -> Result<String, ProcessorError> {
    let trimmed = base.trim();
    url::Url::parse(trimmed).map_err(|e| {
        ProcessorError::InvalidMapping(format!("'{}' is not a valid IRI ({}): {}", field, trimmed, e))
    })?;
    if trimmed.ends_with('/') || trimmed.ends_with('#') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{}/", trimmed))
    }
}

/// Split an IRI so the local part is the longest suffix that is a valid XML
/// element name. Leading digits of a segment stay in the namespace, so
/// `…/column/2019_Impact` splits into `…/column/2019` and `_Impact`.
pub fn split_xml_name(iri: &str) -> Option<(&str, &str)> {
    let tail = iri
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .last()
        .map(|(i, _)| i)?;
    let start = tail + iri[tail..].find(|c: char| c.is_ascii_alphabetic() || c == '_')?;
    Some((&iri[..start], &iri[start..]))
}

/// Whether a local name can be written as the local part of a prefixed name
/// (Turtle) or an XML element name.
pub fn is_simple_local_name(local: &str) -> bool {
    let mut chars = local.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
