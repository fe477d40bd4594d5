/// Destination filename derivation from a download URL.
use url::Url;

use crate::error::{DownloadError, DownloadResult};

/// Name the destination file after the URL's trailing path segment.
///
/// Query and fragment are ignored and the segment is percent-decoded. A URL
/// whose last segment is empty (`http://host/dir/`) has no usable name.
pub fn filename_from_url(url: &str) -> DownloadResult<String> {
    let parsed = Url::parse(url).map_err(|e| DownloadError::invalid_url(url, e.to_string()))?;

    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .ok_or_else(|| DownloadError::invalid_url(url, "URL has no path"))?;

    let decoded = urlencoding::decode(segment)
        .map_err(|_| DownloadError::invalid_url(url, "file name is not valid UTF-8"))?;

    if decoded.is_empty() {
        return Err(DownloadError::invalid_url(url, "URL does not end in a file name"));
    }
    if decoded == "." || decoded == ".." {
        return Err(DownloadError::invalid_url(url, "file name is a relative path"));
    }
    if decoded.contains('/') || decoded.contains('\\') || decoded.contains('\0') {
        return Err(DownloadError::invalid_url(url, "file name contains a path separator"));
    }

    Ok(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_segment() {
        assert_eq!(filename_from_url("http://example.com/a.zip").unwrap(), "a.zip");
        assert_eq!(
            filename_from_url("https://example.com/pub/iso/debian.iso").unwrap(),
            "debian.iso"
        );
    }

    #[test]
    fn test_query_and_fragment_ignored() {
        assert_eq!(
            filename_from_url("http://example.com/dl/report.pdf?token=abc#page=2").unwrap(),
            "report.pdf"
        );
    }

    #[test]
    fn test_percent_decoded() {
        assert_eq!(
            filename_from_url("http://example.com/my%20file.txt").unwrap(),
            "my file.txt"
        );
    }

    #[test]
    fn test_rejects_directory_url() {
        assert!(filename_from_url("http://example.com/").is_err());
        assert!(filename_from_url("http://example.com/files/").is_err());
    }

    #[test]
    fn test_rejects_traversal() {
        assert!(filename_from_url("http://example.com/a/%2E%2E").is_err());
        assert!(filename_from_url("http://example.com/a%2F..%2Fetc").is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            filename_from_url("not a url"),
            Err(DownloadError::InvalidUrl { .. })
        ));
        assert!(filename_from_url("mailto:someone@example.com").is_err());
    }
}
