//! Expected-failure classification
//!
//! A `do` action may declare `catch: <category>`. When the client raises,
//! the category is tested against the error; a match means the test got
//! the failure it asked for. The table below is shared with every other
//! runner of the same test corpus, so its order and tokens are fixed.

use regex::Regex;

use crate::client::{ClientError, ErrorKind};

/// Strip the slashes of a `/regex/` literal
fn regex_literal(category: &str) -> &str {
    let trimmed = category.trim();
    trimmed
        .strip_prefix('/')
        .and_then(|s| s.strip_suffix('/'))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Search `pattern` in `message` as a regex, or as plain text if it is not one
fn message_matches(pattern: &str, message: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(message),
        Err(_) => message.contains(pattern),
    }
}

/// Whether `error` is the failure described by `category`
pub fn is_expected_failure(category: &str, error: &ClientError) -> bool {
    let kind = error.kind;
    let message = error.message.as_str();

    match category {
        "request_timeout" => kind == ErrorKind::RequestTimeout,
        c if c == "missing" || c.contains("resource_not_found_exception") => {
            kind == ErrorKind::NotFound
        }
        "conflict" => kind == ErrorKind::Conflict,
        "request" => kind == ErrorKind::InternalServerError,
        "bad_request" => kind == ErrorKind::BadRequest,
        "param" => kind == ErrorKind::Argument,
        "unauthorized" => kind == ErrorKind::Unauthorized,
        "forbidden" => kind == ErrorKind::Forbidden,
        c if c.contains("error parsing field") || c.contains("illegal_argument_exception") => {
            message.contains("[400]") || kind == ErrorKind::BadRequest
        }
        c if c.contains("NullPointerException") => message.contains("[400]"),
        c if c.contains("status_exception") => message.contains("[409]"),
        other => message_matches(regex_literal(other), message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(kind: ErrorKind, message: &str) -> ClientError {
        ClientError::new(kind, message)
    }

    #[test]
    fn test_named_categories() {
        assert!(is_expected_failure("missing", &err(ErrorKind::NotFound, "[404]")));
        assert!(!is_expected_failure("conflict", &err(ErrorKind::NotFound, "[404]")));
        assert!(is_expected_failure("conflict", &err(ErrorKind::Conflict, "[409]")));
        assert!(is_expected_failure("request_timeout", &err(ErrorKind::RequestTimeout, "")));
        assert!(is_expected_failure("request", &err(ErrorKind::InternalServerError, "[500]")));
        assert!(is_expected_failure("bad_request", &err(ErrorKind::BadRequest, "[400]")));
        assert!(is_expected_failure("param", &err(ErrorKind::Argument, "missing index")));
        assert!(is_expected_failure("unauthorized", &err(ErrorKind::Unauthorized, "[401]")));
        assert!(is_expected_failure("forbidden", &err(ErrorKind::Forbidden, "[403]")));
        assert!(!is_expected_failure("forbidden", &err(ErrorKind::Unauthorized, "[401]")));
    }

    #[test]
    fn test_resource_not_found_is_missing() {
        let e = err(ErrorKind::NotFound, "[404] resource_not_found_exception");
        assert!(is_expected_failure("/resource_not_found_exception/", &e));
        assert!(!is_expected_failure(
            "/resource_not_found_exception/",
            &err(ErrorKind::BadRequest, "resource_not_found_exception")
        ));
    }

    #[test]
    fn test_bad_request_by_message_or_kind() {
        assert!(is_expected_failure(
            "/illegal_argument_exception/",
            &err(ErrorKind::Other(499), "[400] whatever")
        ));
        assert!(is_expected_failure(
            "/error parsing field/",
            &err(ErrorKind::BadRequest, "no code here")
        ));
        assert!(!is_expected_failure(
            "/illegal_argument_exception/",
            &err(ErrorKind::Conflict, "[409] illegal_argument_exception")
        ));
    }

    #[test]
    fn test_status_code_categories() {
        assert!(is_expected_failure(
            "/NullPointerException/",
            &err(ErrorKind::BadRequest, "[400] boom")
        ));
        assert!(!is_expected_failure(
            "/NullPointerException/",
            &err(ErrorKind::InternalServerError, "[500] NullPointerException")
        ));
        assert!(is_expected_failure(
            "/status_exception/",
            &err(ErrorKind::Conflict, "[409] status_exception")
        ));
    }

    #[test]
    fn test_fallback_searches_message() {
        let e = err(ErrorKind::BadRequest, "[400] index_closed_exception: index [books] closed");
        assert!(is_expected_failure("/index_closed_exception/", &e));
        assert!(is_expected_failure("/index \\[books\\]/", &e));
        assert!(!is_expected_failure("/Index_Closed/", &e));
        // Not a valid regex: plain substring search
        assert!(is_expected_failure("[books", &e));
    }
}
