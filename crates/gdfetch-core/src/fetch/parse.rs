//! Parse HTTP response header lines into a `ResponseHead`.

use crate::error::ProtocolError;

/// Headers of one HTTP response that the download flow cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ResponseHead {
    /// Status code from the `HTTP/x y reason` line, if one was seen.
    pub status: Option<u32>,
    /// Raw `Content-Range` value.
    pub content_range: Option<String>,
    /// `(name, value)` of every `Set-Cookie` header, in order.
    pub cookies: Vec<(String, String)>,
}

impl ResponseHead {
    /// Value of the first cookie whose name starts with `prefix`.
    pub fn confirm_token(&self, prefix: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(name, _)| name.starts_with(prefix))
            .map(|(_, value)| value.as_str())
    }

    /// Total resource size from `Content-Range`.
    pub fn total_size(&self) -> Result<u64, ProtocolError> {
        match &self.content_range {
            Some(value) => content_range_total(value),
            None => Err(ProtocolError::MissingContentRange),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(code) if (200..300).contains(&code))
    }
}

/// Parse collected header lines (status line included) into `ResponseHead`.
pub(crate) fn parse_head(lines: &[String]) -> ResponseHead {
    let mut head = ResponseHead::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            head.status = line
                .split_whitespace()
                .nth(1)
                .and_then(|code| code.parse::<u32>().ok());
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-range") {
                head.content_range = Some(value.to_string());
            }
            if name.eq_ignore_ascii_case("set-cookie") {
                if let Some(cookie) = parse_set_cookie(value) {
                    head.cookies.push(cookie);
                }
            }
        }
    }

    head
}

/// `name=value; Path=/; ...` -> `(name, value)`. Attributes are ignored.
fn parse_set_cookie(value: &str) -> Option<(String, String)> {
    let pair = value.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().trim_matches('"').to_string()))
}

/// Total from `<unit> <start>-<end>/<total>`: the component after the last `/`.
pub(crate) fn content_range_total(value: &str) -> Result<u64, ProtocolError> {
    value
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse::<u64>().ok())
        .ok_or_else(|| ProtocolError::MalformedContentRange(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_head_status_and_content_range() {
        let head = parse_head(&lines(&[
            "HTTP/1.1 206 Partial Content",
            "Content-Range: bytes 0-99/100",
            "Content-Length: 100",
        ]));
        assert_eq!(head.status, Some(206));
        assert!(head.is_success());
        assert_eq!(head.content_range.as_deref(), Some("bytes 0-99/100"));
        assert_eq!(head.total_size(), Ok(100));
    }

    #[test]
    fn parse_head_http2_status_line() {
        let head = parse_head(&lines(&["HTTP/2 302", "location: /elsewhere"]));
        assert_eq!(head.status, Some(302));
        assert!(!head.is_success());
    }

    #[test]
    fn confirm_token_from_prefixed_cookie() {
        let head = parse_head(&lines(&[
            "HTTP/1.1 200 OK",
            "Set-Cookie: NID=511=abc; expires=Thu, 01-Jan-2099 00:00:00 GMT; path=/",
            "Set-Cookie: download_warning_13058876669334088843_1Xyz=Zk9_; Domain=.example.com; Path=/uc",
        ]));
        assert_eq!(head.cookies.len(), 2);
        assert_eq!(head.confirm_token("download_warning"), Some("Zk9_"));
    }

    #[test]
    fn no_token_without_prefixed_cookie() {
        let head = parse_head(&lines(&["HTTP/1.1 200 OK", "Set-Cookie: session=1"]));
        assert_eq!(head.confirm_token("download_warning"), None);
    }

    #[test]
    fn missing_content_range() {
        let head = parse_head(&lines(&["HTTP/1.1 200 OK", "Content-Length: 5"]));
        assert_eq!(head.total_size(), Err(ProtocolError::MissingContentRange));
    }

    #[test]
    fn content_range_total_variants() {
        assert_eq!(content_range_total("bytes 0-32767/1048576"), Ok(1_048_576));
        assert_eq!(content_range_total("bytes 0-0/1"), Ok(1));
        assert!(matches!(
            content_range_total("bytes */*"),
            Err(ProtocolError::MalformedContentRange(_))
        ));
        assert!(matches!(
            content_range_total("bytes 0-10"),
            Err(ProtocolError::MalformedContentRange(_))
        ));
    }

    #[test]
    fn set_cookie_without_value_is_ignored() {
        assert_eq!(parse_set_cookie("flag; Path=/"), None);
        assert_eq!(
            parse_set_cookie("a=\"quoted\"; Path=/"),
            Some(("a".to_string(), "quoted".to_string()))
        );
    }
}
