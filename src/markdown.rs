//! Markdown subset to HTML fragment.
//!
//! Rendering runs in two passes. The first classifies each source line
//! (heading, list item, plain text) and parses its inline spans into a
//! typed tree; newlines become explicit [`Token::Break`]s. The second pass
//! groups list items into lists, drops breaks that sit against block
//! elements, and writes HTML.
//!
//! Supported syntax:
//!
//! | Source | HTML |
//! |--------|------|
//! | `## x` / `### x` at line start | `<h2>` / `<h3>` |
//! | `**x**` then `*x*` | `<strong>` / `<em>` |
//! | `* x` after optional indentation | `<li>` inside `<ul>` |
//! | `` `x` `` | `<code>` |
//! | newline | `<br />` |
//!
//! Source text is passed through unescaped unless
//! [`RenderOptions::escape_html`] is set.

use std::sync::OnceLock;

use regex::Regex;

/// List items separated by at most this many line breaks share one `<ul>`.
const MAX_BREAKS_WITHIN_LIST: usize = 2;

static BOLD_RE: OnceLock<Regex> = OnceLock::new();
static ITALIC_RE: OnceLock<Regex> = OnceLock::new();
static CODE_RE: OnceLock<Regex> = OnceLock::new();

fn bold_re() -> &'static Regex {
    BOLD_RE.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid literal regex"))
}

fn italic_re() -> &'static Regex {
    ITALIC_RE.get_or_init(|| Regex::new(r"\*(.*?)\*").expect("valid literal regex"))
}

fn code_re() -> &'static Regex {
    CODE_RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("valid literal regex"))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Escape `&`, `<`, `>` and `"` in source text.
    pub escape_html: bool,
}

/// Inline span inside a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
}

/// A classified source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Heading { level: u8, content: Vec<Inline> },
    ListItem(Vec<Inline>),
    Text(Vec<Inline>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Line(Line),
    Break,
}

/// Output of the grouping pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    List(Vec<Vec<Inline>>),
    Text(Vec<Inline>),
    Break,
}

impl Block {
    fn is_structural(&self) -> bool {
        matches!(self, Block::Heading { .. } | Block::List(_))
    }
}

/// Render with default options (no escaping).
pub fn render(text: &str) -> String {
    render_with(text, RenderOptions::default())
}

pub fn render_with(text: &str, options: RenderOptions) -> String {
    let blocks = trim_breaks(group(tokenize(text)));
    let mut out = String::with_capacity(text.len() + text.len() / 2);
    for block in &blocks {
        write_block(&mut out, block, options);
    }
    out
}

/// First pass: one [`Token::Line`] per non-empty line, a [`Token::Break`]
/// for every newline.
pub fn tokenize(text: &str) -> Vec<Token> {
    let text = text.replace("\r\n", "\n");
    let mut tokens = Vec::new();

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            tokens.push(Token::Break);
        }
        if !line.is_empty() {
            tokens.push(Token::Line(classify(line)));
        }
    }

    tokens
}

pub fn classify(line: &str) -> Line {
    if let Some(body) = after_marker(line, "###") {
        return Line::Heading {
            level: 3,
            content: parse_inline(body),
        };
    }
    if let Some(body) = after_marker(line, "##") {
        return Line::Heading {
            level: 2,
            content: parse_inline(body),
        };
    }
    if let Some(body) = after_marker(line.trim_start(), "*") {
        return Line::ListItem(parse_inline(body));
    }
    Line::Text(parse_inline(line))
}

/// `line` minus `marker` and the whitespace after it. At least one
/// whitespace character must follow the marker.
fn after_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(marker)?;
    let body = rest.trim_start();
    (body.len() < rest.len()).then_some(body)
}

/// Bold spans first, italic inside and between them, code in what is left.
pub fn parse_inline(text: &str) -> Vec<Inline> {
    split_spans(text, bold_re(), parse_emphasis, |inner| {
        Inline::Strong(parse_emphasis(inner))
    })
}

fn parse_emphasis(text: &str) -> Vec<Inline> {
    split_spans(text, italic_re(), parse_code, |inner| {
        Inline::Emphasis(parse_code(inner))
    })
}

fn parse_code(text: &str) -> Vec<Inline> {
    split_spans(
        text,
        code_re(),
        |plain| vec![Inline::Text(plain.to_owned())],
        |inner| Inline::Code(inner.to_owned()),
    )
}

/// Split `text` on matches of `re`. Text between matches goes through
/// `between`; the first capture group of each match through `on_match`.
fn split_spans(
    text: &str,
    re: &Regex,
    between: impl Fn(&str) -> Vec<Inline>,
    on_match: impl Fn(&str) -> Inline,
) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            out.extend(between(&text[last..whole.start()]));
        }
        out.push(on_match(inner.as_str()));
        last = whole.end();
    }
    if last < text.len() {
        out.extend(between(&text[last..]));
    }

    out
}

/// Second pass: wrap runs of list items in a single list.
///
/// Items stay in the same list when no more than
/// [`MAX_BREAKS_WITHIN_LIST`] breaks (and nothing else) separate them.
/// Breaks swallowed inside a list are not emitted.
pub fn group(tokens: Vec<Token>) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut open: Option<Vec<Vec<Inline>>> = None;
    let mut pending_breaks = 0usize;

    for token in tokens {
        match token {
            Token::Break if open.is_some() => pending_breaks += 1,
            Token::Break => blocks.push(Block::Break),
            Token::Line(Line::ListItem(item)) => {
                match open.as_mut() {
                    Some(items) if pending_breaks <= MAX_BREAKS_WITHIN_LIST => items.push(item),
                    _ => {
                        close_list(&mut blocks, &mut open, pending_breaks);
                        open = Some(vec![item]);
                    }
                }
                pending_breaks = 0;
            }
            Token::Line(line) => {
                close_list(&mut blocks, &mut open, pending_breaks);
                pending_breaks = 0;
                blocks.push(match line {
                    Line::Heading { level, content } => Block::Heading { level, content },
                    Line::Text(content) | Line::ListItem(content) => Block::Text(content),
                });
            }
        }
    }
    close_list(&mut blocks, &mut open, pending_breaks);

    blocks
}

fn close_list(blocks: &mut Vec<Block>, open: &mut Option<Vec<Vec<Inline>>>, breaks: usize) {
    if let Some(items) = open.take() {
        blocks.push(Block::List(items));
    }
    blocks.extend(std::iter::repeat_n(Block::Break, breaks));
}

/// Drop every break directly before or after a heading or list.
pub fn trim_breaks(blocks: Vec<Block>) -> Vec<Block> {
    let keep: Vec<bool> = (0..blocks.len())
        .map(|i| {
            if blocks[i] != Block::Break {
                return true;
            }
            let before = i.checked_sub(1).and_then(|p| blocks.get(p));
            let after = blocks.get(i + 1);
            !before.is_some_and(Block::is_structural) && !after.is_some_and(Block::is_structural)
        })
        .collect();

    blocks
        .into_iter()
        .zip(keep)
        .filter_map(|(b, k)| k.then_some(b))
        .collect()
}

fn write_block(out: &mut String, block: &Block, options: RenderOptions) {
    match block {
        Block::Heading { level, content } => {
            out.push_str(&format!("<h{level}>"));
            write_inlines(out, content, options);
            out.push_str(&format!("</h{level}>"));
        }
        Block::List(items) => {
            out.push_str("<ul>");
            for item in items {
                out.push_str("<li>");
                write_inlines(out, item, options);
                out.push_str("</li>");
            }
            out.push_str("</ul>");
        }
        Block::Text(content) => write_inlines(out, content, options),
        Block::Break => out.push_str("<br />"),
    }
}

fn write_inlines(out: &mut String, inlines: &[Inline], options: RenderOptions) {
    for inline in inlines {
        match inline {
            Inline::Text(s) => push_text(out, s, options),
            Inline::Code(s) => {
                out.push_str("<code>");
                push_text(out, s, options);
                out.push_str("</code>");
            }
            Inline::Strong(children) => {
                out.push_str("<strong>");
                write_inlines(out, children, options);
                out.push_str("</strong>");
            }
            Inline::Emphasis(children) => {
                out.push_str("<em>");
                write_inlines(out, children, options);
                out.push_str("</em>");
            }
        }
    }
}

fn push_text(out: &mut String, s: &str, options: RenderOptions) {
    if options.escape_html {
        out.push_str(&escape_html(s));
    } else {
        out.push_str(s);
    }
}

/// Escape `&`, `<`, `>` and `"`.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
