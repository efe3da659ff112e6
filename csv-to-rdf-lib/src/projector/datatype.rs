use chrono::{NaiveDate, NaiveDateTime};

use crate::utils::{DATETIME_FORMATS, DATE_FORMATS};

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
pub const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
pub const XSD_GYEAR: &str = "http://www.w3.org/2001/XMLSchema#gYear";

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn is_integer(value: &str) -> bool {
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_decimal(value: &str) -> bool {
    let unsigned = value.strip_prefix(['-', '+']).unwrap_or(value);
    match unsigned.split_once('.') {
        Some((whole, fraction)) => {
            !(whole.is_empty() && fraction.is_empty())
                && whole.chars().all(|c| c.is_ascii_digit())
                && fraction.chars().all(|c| c.is_ascii_digit())
        }
        None => is_integer(unsigned),
    }
}

fn is_double(value: &str) -> bool {
    if matches!(value, "INF" | "+INF" | "-INF" | "NaN") {
        return true;
    }
    match value.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => is_decimal(mantissa) && is_integer(exponent),
        None => is_decimal(value),
    }
}

fn is_gyear(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    digits.len() >= 4 && digits.chars().all(|c| c.is_ascii_digit())
}

/// Check `value` against a datatype and return its lexical form for that
/// datatype. Datatypes outside the XSD subset below are passed through
/// unchecked.
pub fn conform(value: &str, datatype: &str) -> Result<String, String> {
    let trimmed = value.trim();
    let Some(local) = datatype.strip_prefix(XSD) else {
        return Ok(value.to_string());
    };
    let invalid = || format!("Invalid xsd:{} value: {:?}", local, value);
    match local {
        "integer" | "int" | "long" | "nonNegativeInteger" => is_integer(trimmed)
            .then(|| trimmed.trim_start_matches('+').to_string())
            .ok_or_else(invalid),
        "decimal" => is_decimal(trimmed)
            .then(|| trimmed.to_string())
            .ok_or_else(invalid),
        "double" | "float" => is_double(trimmed)
            .then(|| trimmed.to_string())
            .ok_or_else(invalid),
        "boolean" => match trimmed.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok("true".to_string()),
            "false" | "0" | "no" => Ok("false".to_string()),
            _ => Err(invalid()),
        },
        "gYear" => is_gyear(trimmed)
            .then(|| trimmed.to_string())
            .ok_or_else(invalid),
        "date" => parse_date(trimmed)
            .map(|date| date.format("%Y-%m-%d").to_string())
            .ok_or_else(invalid),
        "dateTime" => parse_datetime(trimmed)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            .ok_or_else(invalid),
        _ => Ok(value.to_string()),
    }
}

/// Guess a datatype from the shape of a value.
pub fn infer(value: &str) -> Option<&'static str> {
    let value = value.trim();
    if is_integer(value) {
        Some(XSD_INTEGER)
    } else if is_decimal(value) && value.contains('.') {
        Some(XSD_DECIMAL)
    } else if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        Some(XSD_BOOLEAN)
    } else if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        Some(XSD_DATE)
    } else if parse_datetime(value).is_some() {
        Some(XSD_DATETIME)
    } else {
        None
    }
}

/// Inferred datatype together with the value's lexical form for it, e.g.
/// `TRUE` becomes `"true"^^xsd:boolean`.
pub fn infer_typed(value: &str) -> Option<(String, &'static str)> {
    let datatype = infer(value)?;
    conform(value, datatype).ok().map(|lexical| (lexical, datatype))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gyear() {
        assert_eq!(conform("2021", XSD_GYEAR), Ok("2021".to_string()));
        assert_eq!(conform(" 2021 ", XSD_GYEAR), Ok("2021".to_string()));
        assert!(conform("21", XSD_GYEAR).is_err());
        assert!(conform("2021-05", XSD_GYEAR).is_err());
    }

    #[test]
    fn test_date_is_normalized() {
        assert_eq!(conform("2024/06/17", XSD_DATE), Ok("2024-06-17".to_string()));
        assert_eq!(conform("Jun 17, 2024", XSD_DATE), Ok("2024-06-17".to_string()));
        assert!(conform("someday", XSD_DATE).is_err());
    }

    #[test]
    fn test_numbers_and_booleans() {
        assert_eq!(conform("+42", XSD_INTEGER), Ok("42".to_string()));
        assert!(conform("4.2", XSD_INTEGER).is_err());
        assert_eq!(conform("4.2", XSD_DECIMAL), Ok("4.2".to_string()));
        assert!(conform(".", XSD_DECIMAL).is_err());
        assert_eq!(conform("Yes", XSD_BOOLEAN), Ok("true".to_string()));
        assert!(conform("maybe", XSD_BOOLEAN).is_err());
    }

    #[test]
    fn test_double_accepts_exponents() {
        let double = "http://www.w3.org/2001/XMLSchema#double";
        let float = "http://www.w3.org/2001/XMLSchema#float";
        assert_eq!(conform("1e5", double), Ok("1e5".to_string()));
        assert_eq!(conform("-2.5E-3", float), Ok("-2.5E-3".to_string()));
        assert_eq!(conform("INF", double), Ok("INF".to_string()));
        assert_eq!(conform("3.25", double), Ok("3.25".to_string()));
        assert!(conform("1e", double).is_err());
        assert!(conform("e5", double).is_err());
        assert!(conform("1e5", XSD_DECIMAL).is_err());
    }

    #[test]
    fn test_unknown_datatype_passes_through() {
        assert_eq!(
            conform("<b>x</b>", "http://www.w3.org/1999/02/22-rdf-syntax-ns#HTML"),
            Ok("<b>x</b>".to_string())
        );
    }

    #[test]
    fn test_infer() {
        assert_eq!(infer("12"), Some(XSD_INTEGER));
        assert_eq!(infer("-1.5"), Some(XSD_DECIMAL));
        assert_eq!(infer("TRUE"), Some(XSD_BOOLEAN));
        assert_eq!(infer("2024-06-17"), Some(XSD_DATE));
        assert_eq!(infer("2024-06-17T10:00:00"), Some(XSD_DATETIME));
        assert_eq!(infer("Graphs"), None);
    }

    #[test]
    fn test_inferred_lexical_forms_are_canonical() {
        assert_eq!(infer_typed("TRUE"), Some(("true".to_string(), XSD_BOOLEAN)));
        assert_eq!(infer_typed("False"), Some(("false".to_string(), XSD_BOOLEAN)));
        assert_eq!(infer_typed("+7"), Some(("7".to_string(), XSD_INTEGER)));
        assert_eq!(
            infer_typed("2024-06-17 10:00:00"),
            Some(("2024-06-17T10:00:00".to_string(), XSD_DATETIME))
        );
        assert_eq!(
            infer_typed("2024-06-17T10:00:00.250"),
            Some(("2024-06-17T10:00:00.250".to_string(), XSD_DATETIME))
        );
        assert_eq!(infer_typed("Graphs"), None);
    }
}
