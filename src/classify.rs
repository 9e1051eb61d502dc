//! Response body sniffing.
//!
//! The CSV export endpoint answers a private or unpublished sheet with a
//! regular `200 OK` and an HTML sign-in page, so the status code alone
//! cannot tell the two apart. We look for HTML markers in the body instead.
//!
//! This is a heuristic: a legitimate CSV that contains one of the markers
//! as cell text is misclassified as [`Classification::PermissionDenied`].

/// Verdict on a downloaded body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Looks like CSV; go ahead and persist it.
    Continue,
    /// An HTML page was served instead of the sheet.
    PermissionDenied,
}

const DOCTYPE_MARKER: &[u8] = b"<!doctype html>";
const TAG_MARKERS: [&[u8]; 2] = [b"<head>", b"<style>"];

/// Classifies a response body as CSV payload or HTML access wall.
///
/// # Example
///
/// ```
/// use sheetsync::{classify, Classification};
///
/// assert_eq!(classify(b"id,name\n1,sword\n"), Classification::Continue);
/// assert_eq!(
///     classify(b"<!DOCTYPE html><html><head></head></html>"),
///     Classification::PermissionDenied
/// );
/// ```
pub fn classify(body: &[u8]) -> Classification {
    let is_html = contains_ignore_ascii_case(body, DOCTYPE_MARKER)
        || TAG_MARKERS.iter().any(|marker| contains(body, marker));

    if is_html {
        Classification::PermissionDenied
    } else {
        Classification::Continue
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn contains_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle))
}
