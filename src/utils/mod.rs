//! Utility functions and helpers.

pub mod http;
pub mod render;
#[cfg(test)]
pub mod testing;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Whether `href` already carries an http(s) scheme.
pub fn is_absolute(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://")
}

/// Prefix a site-relative link with `base`, leaving absolute links alone.
///
/// This is plain concatenation: the federation pages link relative to the
/// `cgi-bin/` directory.
pub fn complete_link(base: &str, href: &str) -> String {
    if is_absolute(href) {
        href.to_string()
    } else {
        format!("{base}{href}")
    }
}

/// Decode an ISO-8859-1 body.
///
/// Every byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Whether the path of `url` ends in `.pdf`, ignoring query and case.
pub fn has_pdf_path(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    };
    path.to_lowercase().ends_with(".pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "page.html"),
            "https://example.com/path/page.html"
        );
        assert_eq!(
            resolve_url(&base, "/root.html"),
            "https://example.com/root.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_complete_link() {
        let base = "https://www.o-l.ch/cgi-bin/";
        assert_eq!(
            complete_link(base, "results?rl_id=7"),
            "https://www.o-l.ch/cgi-bin/results?rl_id=7"
        );
        assert_eq!(
            complete_link(base, "https://entry.picoevents.ch/x"),
            "https://entry.picoevents.ch/x"
        );
    }

    #[test]
    fn test_decode_latin1() {
        assert_eq!(decode_latin1(b"Z\xfcrich"), "Zürich");
        assert_eq!(decode_latin1(b"M\xe4nnedorf;"), "Männedorf;");
    }

    #[test]
    fn test_has_pdf_path() {
        assert!(has_pdf_path("https://club.ch/docs/Weisungen.PDF"));
        assert!(has_pdf_path("https://club.ch/w.pdf?download=1"));
        assert!(!has_pdf_path("https://club.ch/pdf/index.html"));
        assert!(!has_pdf_path("https://club.ch/download?file=w.pdf"));
    }
}
