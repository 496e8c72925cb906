/// Position of the request path after splitting a `ui_short` line on single spaces
///
/// Lines start with `1.196.116.32 -  - [...]`; the double space yields an empty
/// token at index 2, which puts the path on index 7.
const URL_FIELD: usize = 7;

/// Outcome of parsing a single access log line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedLine<'a> {
    Valid { url: &'a str, request_time: f64 },
    Invalid(InvalidReason),
}

/// Why a line was left out of the aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    TooFewFields,
    EmptyUrl,
    BadRequestTime,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::TooFewFields => "too few fields",
            InvalidReason::EmptyUrl => "empty url",
            InvalidReason::BadRequestTime => "request time is not a non-negative number",
        }
    }
}

impl<'a> ParsedLine<'a> {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedLine::Valid { .. })
    }
}

/// Extract the request path and request time from a raw log line
///
/// Splitting is done on every single space without collapsing runs, so the
/// field positions stay fixed. The request time is the last token.
pub fn parse_line(line: &str) -> ParsedLine<'_> {
    let line = line.trim_end_matches(['\n', '\r']);

    let Some(url) = line.split(' ').nth(URL_FIELD) else {
        return ParsedLine::Invalid(InvalidReason::TooFewFields);
    };

    let url = url.trim();
    if url.is_empty() {
        return ParsedLine::Invalid(InvalidReason::EmptyUrl);
    }

    let last = line.rsplit(' ').next().unwrap_or_default().trim();
    // A request time of exactly 0.0 is kept as a valid observation.
    match last.parse::<f64>() {
        Ok(request_time) if request_time.is_finite() && request_time >= 0.0 => {
            ParsedLine::Valid { url, request_time }
        }
        _ => ParsedLine::Invalid(InvalidReason::BadRequestTime),
    }
}
