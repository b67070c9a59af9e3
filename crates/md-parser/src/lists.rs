//! List blocks
//!
//! Tight lists (no blank line between items) hold their text directly in
//! the list items; loose lists wrap item content in paragraphs.
//!
//! Nesting follows markdown.pl rather than its syntax page:
//! - nested lists are supposed to be indented four columns per level, but a
//!   shallower indent that matches no open list still nests, one level
//!   deeper than it naively deserves
//! - the list type (bullet or number) is decided by the first item at an
//!   indent; later items at that indent never change it

use std::collections::VecDeque;
use std::sync::LazyLock;

use jsonml::Node;
use regex::Regex;

use crate::block::Block;
use crate::gruber;
use crate::parser::Parser;

static IS_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^( {0,3})([*+-]|\d+\.)[ \t]+").unwrap());

static TAB_INDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {0,3}\t").unwrap());

type ListId = usize;

/// Item content while the list is being assembled
#[derive(Debug)]
enum Piece {
    Node(Node),
    List(ListId),
    Para(Vec<Piece>),
}

#[derive(Debug)]
struct ListDraft {
    tag: &'static str,
    items: Vec<Vec<Piece>>,
}

/// An open list and the indent that opened it
#[derive(Debug)]
struct Frame {
    list: ListId,
    indent: String,
}

/// Lists under construction, addressed by id, plus the stack of open ones
#[derive(Debug, Default)]
struct Lists {
    drafts: Vec<ListDraft>,
    stack: Vec<Frame>,
}

impl Lists {
    fn open(&mut self, bullet: bool, indent: String) -> ListId {
        let tag = if bullet { "bulletlist" } else { "numberlist" };
        self.drafts.push(ListDraft {
            tag,
            items: Vec::new(),
        });
        let id = self.drafts.len() - 1;
        self.stack.push(Frame { list: id, indent });
        id
    }

    /// Open a list inside the current item
    fn nest(&mut self, bullet: bool, indent: String) -> ListId {
        let id = self.open(bullet, indent);
        let parent = self.stack.len().checked_sub(2).map(|i| self.stack[i].list);
        if let Some(parent) = parent {
            let items = &mut self.drafts[parent].items;
            if items.is_empty() {
                items.push(Vec::new());
            }
            if let Some(item) = items.last_mut() {
                item.push(Piece::List(id));
            }
        }
        id
    }

    fn new_item(&mut self, list: ListId) {
        self.drafts[list].items.push(Vec::new());
    }

    /// The newest item, which always belongs to the innermost open list
    fn last_item(&mut self) -> Option<&mut Vec<Piece>> {
        let list = self.stack.last()?.list;
        self.drafts[list].items.last_mut()
    }

    /// Add inline content to the current item
    fn add(&mut self, loose: bool, mut inline: Vec<Node>, nl: &str) {
        let Some(item) = self.last_item() else {
            return;
        };
        if loose {
            item.push(Piece::Para(inline.into_iter().map(Piece::Node).collect()));
            return;
        }

        if !nl.is_empty() && !item.is_empty() {
            inline.insert(0, Node::text(nl));
        }
        match item.last_mut() {
            Some(Piece::Para(children)) => append_pieces(children, inline),
            Some(Piece::Node(Node::Element(para))) if para.tag == "para" => {
                append_nodes(&mut para.children, inline)
            }
            _ => append_pieces(item, inline),
        }
    }

    /// Turn the content of every open item into a paragraph
    fn paragraphify(&mut self) {
        let depth = self.stack.len();
        for (i, frame) in self.stack.iter().enumerate() {
            if let Some(item) = self.drafts[frame.list].items.last_mut() {
                paragraphify(item, i + 1 == depth);
            }
        }
    }

    fn build(&mut self, id: ListId) -> Node {
        let items = std::mem::take(&mut self.drafts[id].items);
        let children = items
            .into_iter()
            .map(|item| Node::element("listitem", self.build_pieces(item)))
            .collect();
        Node::element(self.drafts[id].tag, children)
    }

    fn build_pieces(&mut self, pieces: Vec<Piece>) -> Vec<Node> {
        pieces
            .into_iter()
            .map(|piece| match piece {
                Piece::Node(node) => node,
                Piece::List(id) => self.build(id),
                Piece::Para(children) => Node::element("para", self.build_pieces(children)),
            })
            .collect()
    }
}

fn append_pieces(target: &mut Vec<Piece>, inline: Vec<Node>) {
    for node in inline {
        match (node, target.last_mut()) {
            (Node::Text(s), Some(Piece::Node(Node::Text(prev)))) => prev.push_str(&s),
            (node, _) => target.push(Piece::Node(node)),
        }
    }
}

fn append_nodes(target: &mut Vec<Node>, inline: Vec<Node>) {
    for node in inline {
        match (node, target.last_mut()) {
            (Node::Text(s), Some(Node::Text(prev))) => prev.push_str(&s),
            (node, _) => target.push(node),
        }
    }
}

fn is_para(piece: &Piece) -> bool {
    match piece {
        Piece::Para(_) => true,
        Piece::Node(node) => node.is_tag("para"),
        Piece::List(_) => false,
    }
}

/// Wrap an item's content in a paragraph, keeping a trailing sublist
/// outside it unless this is the innermost item
fn paragraphify(item: &mut Vec<Piece>, innermost: bool) {
    if item.first().is_some_and(is_para) {
        return;
    }
    let sublist = if innermost { None } else { item.pop() };
    let content = std::mem::take(item);
    item.push(Piece::Para(content));
    item.extend(sublist);
}

/// Leading indent units (`{0,3}\t` or four spaces), at most `max` of them
///
/// Returns the number of units and their byte length.
fn indent_units(line: &str, max: usize) -> (usize, usize) {
    let mut pos = 0;
    let mut count = 0;
    while count < max {
        let spaces = line[pos..].bytes().take(4).take_while(|&b| b == b' ').count();
        if spaces == 4 {
            pos += 4;
        } else if line[pos + spaces..].starts_with('\t') {
            pos += spaces + 1;
        } else {
            break;
        }
        count += 1;
    }
    (count, pos)
}

fn leading_spaces(s: &str, max: usize) -> usize {
    s.bytes().take(max).take_while(|&b| b == b' ').count()
}

/// How a line relates to the open lists
#[derive(Debug, PartialEq, Eq)]
struct LineMatch {
    /// Bytes of marker and indent to strip
    len: usize,
    /// For item lines: the raw indent and whether the marker is a bullet
    item: Option<(String, bool)>,
}

/// Match a line against the open list depth
///
/// An item line is up to `depth` indent units, up to three spaces, a
/// marker and whitespace. Anything else is a continuation line with up to
/// `depth - 1` indent units and four spaces stripped.
fn match_line(line: &str, depth: usize) -> LineMatch {
    let (_, units) = indent_units(line, depth);
    let indent_end = units + leading_spaces(&line[units..], 3);
    let marker = &line[indent_end..];

    let marker_len = match marker.bytes().next() {
        Some(b'*' | b'+' | b'-') => Some(1),
        Some(b'0'..=b'9') => {
            let digits = marker.bytes().take_while(u8::is_ascii_digit).count();
            (marker.as_bytes().get(digits) == Some(&b'.')).then_some(digits + 1)
        }
        _ => None,
    };
    if let Some(marker_len) = marker_len {
        let after = &marker[marker_len..];
        let ws = after.len() - after.trim_start().len();
        if ws > 0 {
            return LineMatch {
                len: indent_end + marker_len + ws,
                item: Some((
                    line[..indent_end].to_string(),
                    marker_len == 1 && !marker.starts_with(|c: char| c.is_ascii_digit()),
                )),
            };
        }
    }

    let (_, units) = indent_units(line, depth.saturating_sub(1));
    LineMatch {
        len: units + leading_spaces(&line[units..], 4),
        item: None,
    }
}

fn expand_tab(indent: &str) -> String {
    TAB_INDENT.replace_all(indent, "    ").into_owned()
}

/// Following blocks with every line indented `depth` units, de-indented
fn contained_blocks(depth: usize, next: &mut VecDeque<Block>) -> Vec<Block> {
    let mut contained = Vec::new();
    while next.front().is_some_and(|b| all_lines_indented(b, depth)) {
        let Some(b) = next.pop_front() else { break };
        let text = b
            .split('\n')
            .map(|line| {
                let (count, len) = indent_units(line, depth);
                if count == depth { &line[len..] } else { line }
            })
            .collect::<Vec<_>>()
            .join("\n");
        contained.push(Block::new(text, b.trailing.as_str(), b.line_number));
    }
    contained
}

fn all_lines_indented(text: &str, depth: usize) -> bool {
    let lines: Vec<&str> = text.split('\n').collect();
    let last = lines.len() - 1;
    lines.iter().enumerate().all(|(i, line)| {
        (i == last && i > 0 && line.is_empty()) || indent_units(line, depth).0 == depth
    })
}

pub(crate) fn lists(p: &mut Parser<'_>, block: &Block, next: &mut VecDeque<Block>) -> Option<Vec<Node>> {
    let m = IS_LIST.captures(block)?;
    let mut lists = Lists::default();
    let root = lists.open(
        m[2].starts_with(['*', '+', '-']),
        m[1].to_string(),
    );

    let mut block = block.clone();
    let mut loose = false;
    let mut tail = Vec::new();

    loop {
        // Text for one item is processed in one go: inline spans can cross lines
        let mut accumulated = String::new();
        let mut nl = "";

        for (i, line) in block.split('\n').enumerate() {
            nl = if i == 0 { "" } else { "\n" };
            let lm = match_line(line, lists.stack.len());

            if let Some((indent, bullet)) = &lm.item {
                if !accumulated.is_empty() {
                    let inline = p.process_inline(&accumulated);
                    lists.add(loose, inline, nl);
                    loose = false;
                    accumulated.clear();
                }

                let indent = expand_tab(indent);
                let mut wanted_depth = indent.len() / 4 + 1;
                if wanted_depth > lists.stack.len() {
                    // Deep enough for a nested list outright
                    let list = lists.nest(*bullet, indent);
                    lists.new_item(list);
                } else if let Some(level) = lists.stack.iter().position(|f| f.indent == indent) {
                    lists.stack.truncate(level + 1);
                    lists.new_item(lists.stack[level].list);
                } else {
                    // No open list has this indent: go one deeper
                    wanted_depth += 1;
                    if wanted_depth <= lists.stack.len() {
                        lists.stack.truncate(wanted_depth);
                        lists.new_item(lists.stack[wanted_depth - 1].list);
                    } else {
                        let list = lists.nest(*bullet, indent);
                        lists.new_item(list);
                    }
                }
                nl = "";
            }

            if line.len() > lm.len {
                accumulated.push_str(nl);
                accumulated.push_str(&line[lm.len..]);
            }
        }

        if !accumulated.is_empty() {
            let inline = p.process_inline(&accumulated);
            lists.add(loose, inline, nl);
        }

        // Indented blocks that follow are paragraphs, code or sublists of
        // the current item
        let contained = contained_blocks(lists.stack.len(), next);
        if !contained.is_empty() {
            lists.paragraphify();
            let nodes = p.nested_nodes(contained);
            if let Some(item) = lists.last_item() {
                item.extend(nodes.into_iter().map(Piece::Node));
            }
        }

        // A following item or indented line means a loose list
        let continues = next
            .front()
            .is_some_and(|b| IS_LIST.is_match(b) || b.starts_with(' '));
        if !continues {
            break;
        }
        let Some(following) = next.pop_front() else {
            break;
        };

        let rule = p
            .dialect()
            .block_rule("horiz_rule")
            .unwrap_or(gruber::horiz_rule);
        if let Some(nodes) = rule(p, &following, next) {
            tail = nodes;
            break;
        }

        lists.paragraphify();
        loose = true;
        block = following;
    }

    let mut nodes = vec![lists.build(root)];
    nodes.extend(tail);
    Some(nodes)
}
