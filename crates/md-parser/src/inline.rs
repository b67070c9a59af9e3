//! Inline handlers of the Gruber dialect
//!
//! Each handler is invoked with the cursor on its trigger and reports how
//! many bytes it consumed. A handler that cannot make sense of what follows
//! its trigger consumes the trigger as literal text.

use std::sync::LazyLock;

use jsonml::{Element, Node, text_content};
use regex::Regex;

use crate::parser::{Close, Cursor, FailedOpen, Parser, Step};

static IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^!\[(.*?)\][ \t]*\([ \t]*([^")]*?)(?:[ \t]+(?:"(.*?)"|'(.*?)'))?[ \t]*\)"#)
        .unwrap()
});

static IMAGE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!\[(.*?)\][ \t]*\[(.*?)\]").unwrap());

static LINK_INLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*\([ \t]*([^"']*)(?:[ \t]+(?:"(.*?)"|'(.*?)'))?[ \t]*\)"#).unwrap()
});

static LINK_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\[(.*?)\]").unwrap());

static AUTOLINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<(?:((https?|ftp|mailto):[^>]+)|(.*?@.*?\.[a-zA-Z]+))>").unwrap()
});

/// Emit the trigger as text
pub(crate) fn literal(_: &mut Parser<'_>, _: Cursor<'_>, _: &mut Vec<Node>) -> Option<Step> {
    None
}

pub(crate) fn escaped(p: &mut Parser<'_>, cursor: Cursor<'_>, _: &mut Vec<Node>) -> Option<Step> {
    match cursor.rest()[1..].chars().next() {
        Some(c) if p.dialect().is_escapable(c) => Some(Step::node(1 + c.len_utf8(), c.to_string())),
        _ => Some(Step::text("\\")),
    }
}

fn strip_angle(url: &str) -> &str {
    if url.len() >= 2 && url.starts_with('<') && url.ends_with('>') {
        &url[1..url.len() - 1]
    } else {
        url
    }
}

/// Alt text is plain text; no other inline elements are allowed in it
pub(crate) fn image(p: &mut Parser<'_>, cursor: Cursor<'_>, _: &mut Vec<Node>) -> Option<Step> {
    let rest = cursor.rest();

    // ![Alt text](/path/to/img.jpg "Optional title")
    if let Some(m) = IMAGE.captures(rest) {
        let href = p.unescape(strip_angle(&m[2]));
        let mut img = Element::new("img")
            .with_attr("alt", &m[1])
            .with_attr("href", href);
        if let Some(title) = m.get(3).or_else(|| m.get(4)) {
            img.attrs.insert("title", title.as_str());
        }
        return Some(Step::node(m[0].len(), img));
    }

    // ![Alt text][id]; whether the id exists is only known after parsing
    if let Some(m) = IMAGE_REF.captures(rest) {
        let img = Element::new("img_ref")
            .with_attr("alt", &m[1])
            .with_attr("ref", m[2].to_lowercase())
            .with_attr("original", &m[0]);
        return Some(Step::node(m[0].len(), img));
    }

    Some(Step::text("!["))
}

/// Byte index of the `)` that closes an already open parenthesis
fn closing_paren(url: &str) -> Option<usize> {
    let mut open = 1;
    for (i, c) in url.char_indices() {
        match c {
            '(' => open += 1,
            ')' => {
                open -= 1;
                if open == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Link text is parsed for inline content up to the matching `]`
pub(crate) fn link(p: &mut Parser<'_>, cursor: Cursor<'_>, _: &mut Vec<Node>) -> Option<Step> {
    let rest = cursor.rest();
    if !p.enter_inline() {
        return Some(Step::text("["));
    }
    let saved = p.emphasis.clone();
    let found = p.inline_until_char(cursor.src(), cursor.pos() + 1, ']');
    p.leave_inline();

    let Some((inner_len, children)) = found else {
        // An emphasis close inside the brackets must not stay consumed
        p.emphasis = saved;
        return Some(Step::text("["));
    };
    let mut consumed = 1 + inner_len;
    let after = &rest[consumed..];

    // [link text](/path/to/page "Optional title")
    if let Some(m) = LINK_INLINE.captures(after) {
        consumed += m[0].len();
        let mut url = m.get(1).map_or("", |u| u.as_str());
        let title = m.get(2).or_else(|| m.get(3)).map(|t| t.as_str());

        // Without a title the url runs to the last `)`; pull back to the
        // one that balances
        if title.is_none_or(str::is_empty) {
            if let Some(close) = closing_paren(url) {
                consumed -= url.len() - close;
                url = &url[..close];
            }
        }

        let mut link = Element::new("link").with_attr("href", p.unescape(strip_angle(url)));
        if let Some(title) = title {
            link.attrs.insert("title", title);
        }
        link.children = children;
        return Some(Step::node(consumed, link));
    }

    // [link text][id] or [link text] [id]; [link text][] uses the text
    if let Some(m) = LINK_REF.captures(after) {
        consumed += m[0].len();
        let id = if m[1].is_empty() {
            text_content(&children)
        } else {
            m[1].to_string()
        };
        let link = Element::new("link_ref")
            .with_attr("ref", id.to_lowercase())
            .with_attr("original", &rest[..consumed])
            .with_children(children);
        return Some(Step::node(consumed, link));
    }

    // [id], only when the id is plain text
    if let [Node::Text(id)] = children.as_slice() {
        let link = Element::new("link_ref")
            .with_attr("ref", id.to_lowercase())
            .with_attr("original", &rest[..consumed])
            .with_children(children.clone());
        return Some(Step::node(consumed, link));
    }

    Some(Step::text("["))
}

pub(crate) fn autolink(_: &mut Parser<'_>, cursor: Cursor<'_>, _: &mut Vec<Node>) -> Option<Step> {
    let Some(m) = AUTOLINK.captures(cursor.rest()) else {
        return Some(Step::text("<"));
    };
    let len = m[0].len();

    let link = if let Some(email) = m.get(3) {
        Element::new("link")
            .with_attr("href", format!("mailto:{}", email.as_str()))
            .with_children(vec![Node::text(email.as_str())])
    } else if &m[2] == "mailto" {
        Element::new("link")
            .with_attr("href", &m[1])
            .with_children(vec![Node::text(&m[1]["mailto:".len()..])])
    } else {
        Element::new("link")
            .with_attr("href", &m[1])
            .with_children(vec![Node::text(&m[1])])
    };
    Some(Step::node(len, link))
}

/// Opened by any number of backticks, closed by the same number
pub(crate) fn inline_code(_: &mut Parser<'_>, cursor: Cursor<'_>, _: &mut Vec<Node>) -> Option<Step> {
    let rest = cursor.rest();
    let ticks = rest.len() - rest.trim_start_matches('`').len();

    for n in (1..=ticks).rev() {
        let fence = &rest[..n];
        if let Some(i) = rest[n..].find(fence) {
            let code = Node::element("inlinecode", vec![Node::text(&rest[n..n + i])]);
            return Some(Step::node(n + i + n, code));
        }
    }
    Some(Step::text("`"))
}

pub(crate) fn line_break(_: &mut Parser<'_>, _: Cursor<'_>, _: &mut Vec<Node>) -> Option<Step> {
    Some(Step::node(3, Node::element("linebreak", vec![])))
}

pub(crate) fn strong_star(p: &mut Parser<'_>, cursor: Cursor<'_>, _: &mut Vec<Node>) -> Option<Step> {
    Some(emphasis(p, cursor, "**"))
}

pub(crate) fn strong_underscore(
    p: &mut Parser<'_>,
    cursor: Cursor<'_>,
    _: &mut Vec<Node>,
) -> Option<Step> {
    Some(emphasis(p, cursor, "__"))
}

pub(crate) fn em_star(p: &mut Parser<'_>, cursor: Cursor<'_>, _: &mut Vec<Node>) -> Option<Step> {
    Some(emphasis(p, cursor, "*"))
}

pub(crate) fn em_underscore(
    p: &mut Parser<'_>,
    cursor: Cursor<'_>,
    _: &mut Vec<Node>,
) -> Option<Step> {
    Some(emphasis(p, cursor, "_"))
}

/// Open or close `marker`
///
/// A marker closes when it is the most recently opened marker of its kind
/// and follows non-whitespace. Otherwise, if followed by non-whitespace, it
/// speculatively opens: the rest of the input is parsed with the marker
/// pushed, and if that run ends on this marker's close the content becomes
/// an `em`/`strong` node. If not, both marker stacks are restored and the
/// marker is plain text.
fn emphasis(p: &mut Parser<'_>, cursor: Cursor<'_>, marker: &'static str) -> Step {
    let strong = marker.len() == 2;
    let rest = cursor.rest();

    let stack = if strong {
        &mut p.emphasis.strong
    } else {
        &mut p.emphasis.em
    };
    if stack.last() == Some(&marker) && cursor.before().is_some_and(|c| !c.is_whitespace()) {
        stack.pop();
        return Step::Close(Close {
            marker,
            remaining: rest.len() - marker.len(),
        });
    }

    let opens = rest[marker.len()..]
        .chars()
        .next()
        .is_some_and(|c| !c.is_whitespace());
    if !opens {
        return Step::text(marker);
    }

    let attempt = FailedOpen {
        remaining: rest.len(),
        marker,
        depth: p.inline_depth,
        state: p.emphasis.clone(),
    };
    if p.failed_opens.contains(&attempt) || !p.enter_inline() {
        return Step::text(marker);
    }

    let saved = attempt.state.clone();
    if strong {
        p.emphasis.strong.push(marker);
    } else {
        p.emphasis.em.push(marker);
    }
    let (nodes, close) = p.inline_run(cursor.src(), cursor.pos() + marker.len());
    p.leave_inline();

    match close {
        Some(close) if close.marker == marker => {
            let tag = if strong { "strong" } else { "em" };
            Step::node(rest.len() - close.remaining, Node::element(tag, nodes))
        }
        _ => {
            // The speculative parse may hold wrong contexts; discard it
            p.emphasis = saved;
            p.failed_opens.insert(attempt);
            Step::text(marker)
        }
    }
}
