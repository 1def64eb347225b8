//! Mermaid diagram normalization and fragment assembly.
//!
//! LLM output reaches the client parser more or less intact; normalization
//! only repairs the failure patterns models actually produce: unicode
//! arrows, smart quotes, bare `->` connectors in flowcharts and whole
//! diagrams emitted on a single line.

use std::sync::OnceLock;

use regex::Regex;

use crate::fragment::{disclosure, escape_html, short_hash, stable_key};

fn bare_arrow_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The leading capture keeps `-->` (already long enough) and dotted
    // `-.->` connectors out of the rewrite.
    RE.get_or_init(|| Regex::new(r"([^-.>])-{1,2}>").expect("valid regex"))
}

fn flow_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^\s*((?:flowchart|graph)\s+\w+)\s+(.*)$").expect("valid regex")
    })
}

/// Repair common LLM output problems so the client parser accepts the
/// diagram.
pub fn normalize_diagram(code: &str) -> String {
    if code.is_empty() {
        return String::new();
    }
    let mut code = code
        .replace('→', "-->")
        .replace('⇒', "-->")
        .replace("—>", "-->")
        .replace('“', "\"")
        .replace('”', "\"")
        .replace('‘', "'")
        .replace('’', "'");

    if is_flow_diagram(&code) {
        code = bare_arrow_re().replace_all(&code, "${1}-->").into_owned();
        if !code.trim().contains('\n') {
            code = split_single_line_flow(&code);
        }
    }
    code
}

fn is_flow_diagram(code: &str) -> bool {
    let head = code.trim_start();
    head.starts_with("flowchart") || head.starts_with("graph")
}

/// A whole flowchart on one line parses only with statement separators.
/// Split it: header on its own line, then one statement per line. A new
/// statement begins at an identifier that does not follow a connector.
fn split_single_line_flow(code: &str) -> String {
    let trimmed = code.trim();
    let Some(caps) = flow_header_re().captures(trimmed) else {
        return code.to_string();
    };
    let header = &caps[1];

    let mut lines: Vec<String> = Vec::new();
    let mut prev_connector = false;
    for token in flow_tokens(&caps[2]) {
        let starts_statement = token.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        match lines.last_mut() {
            Some(line) if !(starts_statement && !prev_connector) => {
                line.push(' ');
                line.push_str(&token);
            }
            _ => lines.push(token.clone()),
        }
        prev_connector = is_connector_token(&token);
    }

    let mut out = header.to_string();
    for line in lines {
        out.push('\n');
        out.push_str(&line);
    }
    out
}

/// Whitespace tokenization that keeps bracketed node labels (which may
/// contain spaces) together, and cuts glued `]Next[...]` sequences apart.
fn flow_tokens(rest: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut chars = rest.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '[' | '(' | '{' => {
                depth += 1;
                current.push(ch);
            }
            ']' | ')' | '}' => {
                depth = (depth - 1).max(0);
                current.push(ch);
                if depth == 0 && chars.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Connectors and edge labels continue the current statement: arrows in
/// every direction, `==` thick links, `|label|` segments and `&` fan-outs.
fn is_connector_token(token: &str) -> bool {
    matches!(token.chars().next(), Some('-' | '=' | '<' | '|' | '&')) || token.ends_with('|')
}

/// Build the diagram fragment: client-rendered container plus disclosure.
/// The container id and the stable key both derive from content, so
/// identical diagrams render identically across snapshots.
pub fn render_diagram(body: &str) -> String {
    let normalized = normalize_diagram(body.trim());
    let id = format!("mermaid_{}", short_hash(body));
    let key = stable_key(&normalized);
    let source = escape_html(&normalized);
    let details = disclosure("mermaid", &normalized);
    format!(
        r#"<div class="diagram-container" id="{id}">
    <div class="mermaid" data-diagram-key="{key}">{source}</div>
{details}
</div>"#
    )
}
