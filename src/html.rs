use once_cell::sync::Lazy;
use ratatui::layout::Alignment;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use regex::{Captures, Regex};

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)([^>]*)>").expect("tag regex compiles")
});
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("entity regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("space regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Open { name: String, attrs: &'a str },
    Close(String),
    Text(&'a str),
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for caps in TAG_RE.captures_iter(input) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            tokens.push(Token::Text(&input[last..whole.start()]));
        }
        let name = caps[2].to_ascii_lowercase();
        if &caps[1] == "/" {
            tokens.push(Token::Close(name));
        } else {
            let attrs = caps.get(3).map(|m| m.as_str()).unwrap_or("");
            tokens.push(Token::Open { name, attrs });
        }
        last = whole.end();
    }
    if last < input.len() {
        tokens.push(Token::Text(&input[last..]));
    }
    tokens
}

/// Decodes the named entities post content uses plus numeric references.
pub fn decode_entities(input: &str) -> String {
    ENTITY_RE
        .replace_all(input, |caps: &Captures<'_>| {
            let raw = &caps[1];
            let decoded = if let Some(hex) = raw.strip_prefix("#x").or(raw.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = raw.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match raw {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "rsquo" | "lsquo" => Some('\''),
                    "rdquo" | "ldquo" => Some('"'),
                    "mdash" => Some('—'),
                    "ndash" => Some('–'),
                    "hellip" => Some('…'),
                    "times" => Some('×'),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Readable text of an HTML fragment: tags dropped, entities decoded and
/// whitespace collapsed. Used as narration input.
pub fn plain_text(input: &str) -> String {
    let stripped = TAG_RE.replace_all(input, " ");
    let decoded = decode_entities(&stripped);
    SPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

#[derive(Default)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, input: &str) -> Text<'static> {
        let mut writer = HtmlWriter::default();
        writer.render(tokenize(input));
        writer.into_text()
    }
}

#[derive(Default)]
struct HtmlWriter {
    lines: Vec<RenderLine>,
    buffer: String,
    list_stack: Vec<ListState>,
    current_item: Option<ListMeta>,
    case_study_depth: usize,
    div_stack: Vec<bool>,
    heading_level: Option<u8>,
}

#[derive(Clone, Copy)]
struct ListState {
    ordered: bool,
    index: usize,
}

#[derive(Clone)]
struct ListMeta {
    indent: usize,
    marker: String,
}

#[derive(Clone)]
enum RenderLine {
    Text(String),
    Heading { level: u8, text: String },
    Bullet { indent: usize, marker: String, text: String },
    CaseStudy { depth: usize, text: String },
    Separator,
}

impl HtmlWriter {
    fn render(&mut self, tokens: Vec<Token<'_>>) {
        for token in tokens {
            match token {
                Token::Open { name, attrs } => self.start_tag(&name, attrs),
                Token::Close(name) => self.end_tag(&name),
                Token::Text(text) => self.text(text),
            }
        }
        self.flush_buffer();
    }

    fn start_tag(&mut self, name: &str, attrs: &str) {
        match name {
            "p" => self.flush_buffer(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush_buffer();
                self.heading_level = name[1..].parse().ok();
            }
            "ul" | "ol" => {
                self.flush_buffer();
                self.list_stack.push(ListState {
                    ordered: name == "ol",
                    index: 1,
                });
            }
            "li" => {
                self.flush_buffer();
                let indent = self.list_stack.len().saturating_sub(1);
                let marker = match self.list_stack.last() {
                    Some(state) if state.ordered => format!("{}.", state.index),
                    _ => "•".to_string(),
                };
                self.current_item = Some(ListMeta { indent, marker });
            }
            "div" => {
                self.flush_buffer();
                let case_study = attrs.contains("case-study");
                if case_study {
                    self.case_study_depth += 1;
                }
                self.div_stack.push(case_study);
            }
            "br" => {
                self.flush_buffer();
            }
            "hr" => {
                self.flush_buffer();
                self.lines.push(RenderLine::Text("―".repeat(20)));
                self.lines.push(RenderLine::Separator);
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, name: &str) {
        match name {
            "p" => {
                self.flush_buffer();
                self.lines.push(RenderLine::Separator);
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                if let Some(level) = self.heading_level.take() {
                    let text = self.consume_buffer();
                    if !text.is_empty() {
                        self.lines.push(RenderLine::Heading { level, text });
                        self.lines.push(RenderLine::Separator);
                    }
                }
            }
            "ul" | "ol" => {
                self.flush_buffer();
                self.list_stack.pop();
                self.lines.push(RenderLine::Separator);
            }
            "li" => {
                self.flush_buffer();
                if let Some(state) = self.list_stack.last_mut() {
                    state.index += 1;
                }
                self.current_item = None;
            }
            "div" => {
                self.flush_buffer();
                if self.div_stack.pop() == Some(true) {
                    self.case_study_depth = self.case_study_depth.saturating_sub(1);
                    self.lines.push(RenderLine::Separator);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        let decoded = decode_entities(text);
        let collapsed = SPACE_RE.replace_all(&decoded, " ");
        if collapsed.trim().is_empty() && self.buffer.is_empty() {
            return;
        }
        self.buffer.push_str(&collapsed);
    }

    fn flush_buffer(&mut self) {
        let text = self.consume_buffer();
        if text.is_empty() {
            return;
        }

        if let Some(level) = self.heading_level {
            self.lines.push(RenderLine::Heading { level, text });
            return;
        }

        if let Some(item) = &self.current_item {
            self.lines.push(RenderLine::Bullet {
                indent: item.indent,
                marker: item.marker.clone(),
                text,
            });
            return;
        }

        if self.case_study_depth > 0 {
            self.lines.push(RenderLine::CaseStudy {
                depth: self.case_study_depth,
                text,
            });
            return;
        }

        self.lines.push(RenderLine::Text(text));
    }

    fn consume_buffer(&mut self) -> String {
        let text = self.buffer.trim().to_string();
        self.buffer.clear();
        text
    }

    fn into_text(mut self) -> Text<'static> {
        while matches!(self.lines.last(), Some(RenderLine::Separator)) {
            self.lines.pop();
        }

        let mut styled_lines = Vec::with_capacity(self.lines.len());
        for line in self.lines {
            match line {
                RenderLine::Text(content) => styled_lines.push(Line::from(Span::raw(content))),
                RenderLine::Heading { level, text } => {
                    styled_lines.push(Line::from(Span::styled(text, heading_style(level))));
                }
                RenderLine::Bullet {
                    indent,
                    marker,
                    text,
                } => {
                    styled_lines.push(Line::from(vec![
                        Span::raw("  ".repeat(indent)),
                        Span::styled(format!("{} ", marker), Style::default().fg(Color::Yellow)),
                        Span::raw(text),
                    ]));
                }
                RenderLine::CaseStudy { depth, text } => {
                    let prefix = "│ ".repeat(depth.max(1));
                    styled_lines.push(Line::from(vec![
                        Span::styled(prefix, Style::default().fg(Color::Green)),
                        Span::raw(text),
                    ]));
                }
                RenderLine::Separator => styled_lines.push(Line::default()),
            }
        }

        if styled_lines.is_empty() {
            styled_lines.push(Line::from(Span::raw("")));
        }

        Text {
            lines: styled_lines,
            alignment: Some(Alignment::Left),
            style: Style::default(),
        }
    }
}

fn heading_style(level: u8) -> Style {
    match level {
        1 => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        2 => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        3 => Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
        _ => Style::default().fg(Color::Magenta),
    }
}
