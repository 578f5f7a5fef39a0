// src/extract.rs
//! HTML → plain policy text.
//!
//! Steps:
//! 1) drop `script`, `style`, `nav`, `header`, `footer` elements with their content
//! 2) replace remaining tags with a space
//! 3) decode HTML entities
//! 4) fold typographic quotes to ASCII
//! 5) collapse whitespace and trim

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Elements removed together with everything inside them.
pub const BOILERPLATE_ELEMENTS: &[&str] = &["script", "style", "nav", "header", "footer"];

static RE_BOILERPLATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    BOILERPLATE_ELEMENTS
        .iter()
        .map(|el| {
            Regex::new(&format!(r"(?is)<{el}\b[^>]*>.*?</{el}\s*>")).expect("boilerplate regex")
        })
        .collect()
});
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Extracted policy text, as handed to the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub normalized_text: String,
    pub word_count: usize,
}

impl PolicyDocument {
    pub fn from_html(html: &str) -> Self {
        Self::from_text(extract_text(html))
    }

    /// Wrap already-extracted text; whitespace is still collapsed.
    pub fn from_text(text: impl AsRef<str>) -> Self {
        let normalized_text = collapse_whitespace(text.as_ref());
        let word_count = count_words(&normalized_text);
        Self {
            normalized_text,
            word_count,
        }
    }
}

pub fn extract_text(html: &str) -> String {
    let mut out = html.to_string();
    for re in RE_BOILERPLATE.iter() {
        out = re.replace_all(&out, " ").into_owned();
    }
    out = RE_TAGS.replace_all(&out, " ").into_owned();
    out = html_escape::decode_html_entities(&out).into_owned();
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    collapse_whitespace(&out)
}

fn collapse_whitespace(s: &str) -> String {
    RE_WS.replace_all(s, " ").trim().to_string()
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_boilerplate_elements_with_content() {
        let html = r#"<html><head><style>p { color: red }</style>
            <script type="text/javascript">var sell = "your data";</script></head>
            <body><header class="top">Menu</header><nav>Home | About</nav>
            <main><h1>Privacy</h1><p>We do not sell your data.</p></main>
            <footer>© 2024</footer></body></html>"#;
        assert_eq!(extract_text(html), "Privacy We do not sell your data.");
    }

    #[test]
    fn head_is_not_mistaken_for_header() {
        let html = "<head><title>Policy</title></head><p>Body</p>";
        assert_eq!(extract_text(html), "Policy Body");
    }

    #[test]
    fn decodes_entities_after_tag_removal() {
        let html = "<p>Tom&nbsp;&amp;&nbsp;Jerry &lt;b&gt; &quot;ok&quot; &#39;x&#39;</p>";
        assert_eq!(extract_text(html), r#"Tom & Jerry <b> "ok" 'x'"#);
    }

    #[test]
    fn folds_curly_quotes() {
        assert_eq!(extract_text("we don\u{2019}t \u{201C}sell\u{201D}"), "we don't \"sell\"");
    }

    #[test]
    fn word_count_of_empty_document_is_zero() {
        let doc = PolicyDocument::from_html("<div>  </div>");
        assert_eq!(doc.normalized_text, "");
        assert_eq!(doc.word_count, 0);
    }

    #[test]
    fn tags_become_word_breaks() {
        let doc = PolicyDocument::from_html("<p>one</p><p>two</p><br/>three");
        assert_eq!(doc.normalized_text, "one two three");
        assert_eq!(doc.word_count, 3);
    }
}
