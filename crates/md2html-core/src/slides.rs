//! Slide decks
//!
//! A deck is one Markdown document with slides separated by lines of
//! exactly five dashes.

use md_parser::ParseResult;

use crate::pipeline::{DialectRef, Options, to_html};

const SLIDE_SEPARATOR: &str = "-----";

/// Split a deck into slide sources
///
/// The separator line itself is dropped; the line breaks around it stay
/// with the neighbouring slides.
pub fn split_slides(text: &str) -> Vec<&str> {
    let mut slides = Vec::new();
    let mut start = 0;
    let mut line_start = 0;
    for line in text.split_inclusive('\n') {
        let content = line.strip_suffix('\n').unwrap_or(line);
        let content = content.strip_suffix('\r').unwrap_or(content);
        if content == SLIDE_SEPARATOR {
            slides.push(&text[start..line_start]);
            start = line_start + content.len();
        }
        line_start += line.len();
    }
    slides.push(&text[start..]);
    slides
}

/// Render every slide of a deck on its own, each in a `div.slide`
pub fn slides_to_html<'d>(
    text: &str,
    dialect: impl Into<DialectRef<'d>>,
    options: &Options,
) -> ParseResult<String> {
    let dialect = dialect.into().resolve()?;
    let slides = split_slides(text)
        .into_iter()
        .map(|slide| {
            to_html(slide, dialect, options).map(|html| format!("<div class=\"slide\">{html}</div>"))
        })
        .collect::<ParseResult<Vec<_>>>()?;
    Ok(slides.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_slides() {
        assert_eq!(split_slides("a\n-----\nb"), vec!["a\n", "\nb"]);
        assert_eq!(split_slides("no slides"), vec!["no slides"]);
        assert_eq!(split_slides("-----\nb"), vec!["", "\nb"]);
    }

    #[test]
    fn test_longer_rules_do_not_split() {
        assert_eq!(split_slides("a\n------\nb"), vec!["a\n------\nb"]);
        assert_eq!(split_slides("a ----- b"), vec!["a ----- b"]);
    }

    #[test]
    fn test_slides_render_separately() {
        let html = slides_to_html("# One\n-----\nTwo", "default", &Options::default()).unwrap();
        insta::assert_snapshot!(
            html,
            @r#"
        <div class="slide"><h1>One</h1></div>

        <div class="slide"><p>Two</p></div>
        "#
        );
    }
}
