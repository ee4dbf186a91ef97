//! Same-origin link extraction from an HTML document.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

static ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("anchor pattern is valid")
});

/// Absolute URLs of every `<a href>` in `html` whose origin (scheme, host,
/// port) matches `base`. Relative hrefs are resolved against `base`;
/// malformed ones are skipped. Results are unique, in document order, with
/// fragments removed.
pub fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    let origin = base.origin();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for caps in ANCHOR_HREF.captures_iter(html) {
        let Some(raw) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
            continue;
        };
        let href = raw.as_str().trim().replace("&amp;", "&");
        if href.is_empty() {
            continue;
        }

        let Ok(mut url) = base.join(&href) else {
            continue;
        };
        if url.origin() != origin {
            continue;
        }
        url.set_fragment(None);

        if seen.insert(url.as_str().to_string()) {
            links.push(url);
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com").unwrap()
    }

    fn strings(links: &[Url]) -> Vec<&str> {
        links.iter().map(Url::as_str).collect()
    }

    #[test]
    fn keeps_same_origin_only() {
        let html = r#"
          <html><body>
            <a href="/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="https://external.com">External</a>
            <a href="https://example.com/page3">Page 3</a>
          </body></html>
        "#;
        let links = extract_links(html, &base());
        assert_eq!(
            strings(&links),
            vec![
                "https://example.com/page1",
                "https://example.com/page2",
                "https://example.com/page3",
            ]
        );
    }

    #[test]
    fn different_scheme_or_port_is_foreign() {
        let html = r#"
          <a href="http://example.com/a">http</a>
          <a href="https://example.com:8443/b">port</a>
          <a href="https://sub.example.com/c">sub</a>
          <a href="mailto:someone@example.com">mail</a>
          <a href="javascript:void(0)">js</a>
        "#;
        assert!(extract_links(html, &base()).is_empty());
    }

    #[test]
    fn malformed_hrefs_are_skipped() {
        let html = r#"
          <a href="http://[::1">broken</a>
          <a href="https://exa mple.com:99999/">bad port</a>
          <a href="">empty</a>
          <a href="/ok">ok</a>
        "#;
        assert_eq!(strings(&extract_links(html, &base())), vec!["https://example.com/ok"]);
    }

    #[test]
    fn quoting_styles_and_attributes() {
        let html = r#"
          <A class="nav" HREF='/single'>s</A>
          <a data-x="1" href=/bare>b</a>
          <a
             href = "/spaced"
          >multi-line</a>
          <link href="/style.css">
          <area href="/map">
        "#;
        assert_eq!(
            strings(&extract_links(html, &base())),
            vec![
                "https://example.com/single",
                "https://example.com/bare",
                "https://example.com/spaced",
            ]
        );
    }

    #[test]
    fn dedupes_and_strips_fragments() {
        let html = r#"
          <a href="/about">a</a>
          <a href="/about#team">b</a>
          <a href="https://example.com/about">c</a>
          <a href="/search?q=1&amp;p=2">d</a>
        "#;
        assert_eq!(
            strings(&extract_links(html, &base())),
            vec![
                "https://example.com/about",
                "https://example.com/search?q=1&p=2",
            ]
        );
    }

    #[test]
    fn relative_to_nested_base() {
        let base = Url::parse("http://localhost:3000/docs/index.html").unwrap();
        let html = r#"<a href="intro.html">i</a><a href="../top">t</a>"#;
        assert_eq!(
            strings(&extract_links(html, &base)),
            vec![
                "http://localhost:3000/docs/intro.html",
                "http://localhost:3000/top",
            ]
        );
    }
}
