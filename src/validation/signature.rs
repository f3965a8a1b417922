//! Structural signatures for indicator source.
//!
//! A signature captures the shape of the code, not its names: the token
//! kind sequence, per-kind counts, and a canonical count string used as a
//! cheap equality hash. Similarity is LCS over kind sequences, which
//! survives renames and constant tweaks but not restructuring.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Token kind codes forming the signature alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Keyword = 0,
    Identifier = 1,
    Number = 2,
    Str = 3,
    Operator = 4,
    Arrow = 5,
    OpenBrace = 6,
    CloseBrace = 7,
    OpenParen = 8,
    CloseParen = 9,
    OpenBracket = 10,
    CloseBracket = 11,
    Separator = 12,
}

impl TokenKind {
    fn code(self) -> u32 {
        self as u32
    }

    fn name(self) -> &'static str {
        match self {
            TokenKind::Keyword => "keyword",
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
            TokenKind::Str => "string",
            TokenKind::Operator => "operator",
            TokenKind::Arrow => "arrow",
            TokenKind::OpenBrace => "open_brace",
            TokenKind::CloseBrace => "close_brace",
            TokenKind::OpenParen => "open_paren",
            TokenKind::CloseParen => "close_paren",
            TokenKind::OpenBracket => "open_bracket",
            TokenKind::CloseBracket => "close_bracket",
            TokenKind::Separator => "separator",
        }
    }
}

const KEYWORDS: &[&str] = &[
    "function", "const", "let", "var", "return", "if", "else", "for", "while", "import",
    "export", "class", "new", "true", "false", "null", "async", "await",
];

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    text: String,
}

/// Structural identity of a piece of source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralSignature {
    pub node_kinds: Vec<u32>,
    pub kind_counts: BTreeMap<String, usize>,
    pub total_nodes: usize,
    /// Canonical `kind:count` pairs, sorted, joined with `|`.
    pub hash: String,
}

impl StructuralSignature {
    fn from_tokens(tokens: &[Token]) -> Self {
        let node_kinds: Vec<u32> = tokens.iter().map(|t| t.kind.code()).collect();
        let mut kind_counts: BTreeMap<String, usize> = BTreeMap::new();
        for token in tokens {
            *kind_counts.entry(token.kind.name().to_string()).or_insert(0) += 1;
        }
        let hash = kind_counts
            .iter()
            .map(|(kind, count)| format!("{}:{}", kind, count))
            .collect::<Vec<_>>()
            .join("|");
        Self {
            total_nodes: node_kinds.len(),
            node_kinds,
            kind_counts,
            hash,
        }
    }

    pub fn empty() -> Self {
        Self::from_tokens(&[])
    }
}

/// Signature of a whole source text.
pub fn signature_from_source(source: &str) -> StructuralSignature {
    StructuralSignature::from_tokens(&tokenize(source))
}

/// Similarity decision thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityDecision {
    /// ≥ 0.8: structural duplicate.
    Reject,
    /// 0.5 ≤ s < 0.8: record a SIMILAR_TO edge and warn.
    Warn,
    /// < 0.5: unrelated.
    Pass,
}

impl SimilarityDecision {
    pub fn from_similarity(similarity: f64) -> Self {
        if similarity >= 0.8 {
            SimilarityDecision::Reject
        } else if similarity >= 0.5 {
            SimilarityDecision::Warn
        } else {
            SimilarityDecision::Pass
        }
    }
}

/// LCS-ratio similarity between two kind sequences: `LCS / max(len)`.
pub fn lcs_similarity(a: &[u32], b: &[u32]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let lcs = lcs_length(a, b) as f64;
    lcs / a.len().max(b.len()) as f64
}

/// Two-row dynamic-programming LCS, O(min(m, n)) space.
fn lcs_length(a: &[u32], b: &[u32]) -> usize {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];

    for &x in long {
        for (j, &y) in short.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}

/// Signature similarity: equal hashes short-circuit to 1, empty
/// signatures to 0, everything else through the LCS ratio.
pub fn similarity(a: &StructuralSignature, b: &StructuralSignature) -> f64 {
    if a.hash == b.hash {
        return 1.0;
    }
    if a.total_nodes == 0 || b.total_nodes == 0 {
        return 0.0;
    }
    lcs_similarity(&a.node_kinds, &b.node_kinds)
}

/// Signatures of the computational cores: top-level function bodies and
/// top-level arrow-initialized variables.
pub fn extract_cores(source: &str) -> Vec<StructuralSignature> {
    let tokens = tokenize(source);
    let mut cores = Vec::new();
    let mut depth = 0usize;
    let mut i = 0usize;

    while i < tokens.len() {
        let token = &tokens[i];
        match token.kind {
            TokenKind::OpenBrace => depth += 1,
            TokenKind::CloseBrace => depth = depth.saturating_sub(1),
            TokenKind::Keyword if depth == 0 && token.text == "function" => {
                if let Some((body, next)) = capture_brace_block(&tokens, i) {
                    cores.push(StructuralSignature::from_tokens(body));
                    i = next;
                    continue;
                }
            }
            TokenKind::Keyword
                if depth == 0 && matches!(token.text.as_str(), "const" | "let" | "var") =>
            {
                if let Some((body, next)) = capture_arrow_initializer(&tokens, i) {
                    cores.push(StructuralSignature::from_tokens(body));
                    i = next;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }
    cores
}

/// Max pairwise similarity across the two sources' computational cores,
/// falling back to whole-source comparison when either side has none.
pub fn core_similarity(a_source: &str, b_source: &str) -> f64 {
    let cores_a = extract_cores(a_source);
    let cores_b = extract_cores(b_source);
    if cores_a.is_empty() || cores_b.is_empty() {
        return similarity(
            &signature_from_source(a_source),
            &signature_from_source(b_source),
        );
    }
    let mut best = 0.0f64;
    for a in &cores_a {
        for b in &cores_b {
            best = best.max(similarity(a, b));
        }
    }
    best
}

/// Capture the token slice inside the first brace block after `start`.
/// Returns the body slice and the index just past the closing brace.
fn capture_brace_block(tokens: &[Token], start: usize) -> Option<(&[Token], usize)> {
    let open = tokens[start..]
        .iter()
        .position(|t| t.kind == TokenKind::OpenBrace)?
        + start;
    let mut depth = 0usize;
    for (offset, token) in tokens[open..].iter().enumerate() {
        match token.kind {
            TokenKind::OpenBrace => depth += 1,
            TokenKind::CloseBrace => {
                depth -= 1;
                if depth == 0 {
                    let close = open + offset;
                    return Some((&tokens[open + 1..close], close + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// Capture the body of `const name = (…) => …` starting at the
/// declaration keyword. Brace bodies capture the block; expression bodies
/// capture through the statement-terminating separator.
fn capture_arrow_initializer(tokens: &[Token], start: usize) -> Option<(&[Token], usize)> {
    // The arrow must appear before the statement ends at depth zero.
    let mut depth = 0usize;
    let mut arrow = None;
    for (offset, token) in tokens[start..].iter().enumerate() {
        match token.kind {
            TokenKind::OpenBrace | TokenKind::OpenParen | TokenKind::OpenBracket => depth += 1,
            TokenKind::CloseBrace | TokenKind::CloseParen | TokenKind::CloseBracket => {
                depth = depth.saturating_sub(1)
            }
            TokenKind::Arrow if depth == 0 => {
                arrow = Some(start + offset);
                break;
            }
            TokenKind::Separator if depth == 0 && token.text == ";" => return None,
            _ => {}
        }
    }
    let arrow = arrow?;

    if tokens.get(arrow + 1).map(|t| t.kind) == Some(TokenKind::OpenBrace) {
        return capture_brace_block(tokens, arrow);
    }
    // Expression body: through the depth-zero semicolon or end of input.
    let mut depth = 0usize;
    for (offset, token) in tokens[arrow + 1..].iter().enumerate() {
        match token.kind {
            TokenKind::OpenBrace | TokenKind::OpenParen | TokenKind::OpenBracket => depth += 1,
            TokenKind::CloseBrace | TokenKind::CloseParen | TokenKind::CloseBracket => {
                depth = depth.saturating_sub(1)
            }
            TokenKind::Separator if depth == 0 && token.text == ";" => {
                let end = arrow + 1 + offset;
                return Some((&tokens[arrow + 1..end], end + 1));
            }
            _ => {}
        }
    }
    Some((&tokens[arrow + 1..], tokens.len()))
}

fn tokenize(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        // Line and block comments carry no structure.
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                i += 1;
            }
            i = (i + 2).min(chars.len());
            continue;
        }

        if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let kind = if KEYWORDS.contains(&text.as_str()) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            };
            tokens.push(Token { kind, text });
            continue;
        }
        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == '_')
            {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Number,
                text: chars[start..i].iter().collect(),
            });
            continue;
        }
        if c == '"' || c == '\'' || c == '`' {
            let quote = c;
            let start = i;
            i += 1;
            while i < chars.len() && chars[i] != quote {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            i = (i + 1).min(chars.len());
            tokens.push(Token {
                kind: TokenKind::Str,
                text: chars[start..i.min(chars.len())].iter().collect(),
            });
            continue;
        }
        if c == '=' && chars.get(i + 1) == Some(&'>') {
            tokens.push(Token {
                kind: TokenKind::Arrow,
                text: "=>".to_string(),
            });
            i += 2;
            continue;
        }

        let (kind, text) = match c {
            '{' => (TokenKind::OpenBrace, "{"),
            '}' => (TokenKind::CloseBrace, "}"),
            '(' => (TokenKind::OpenParen, "("),
            ')' => (TokenKind::CloseParen, ")"),
            '[' => (TokenKind::OpenBracket, "["),
            ']' => (TokenKind::CloseBracket, "]"),
            ',' => (TokenKind::Separator, ","),
            ';' => (TokenKind::Separator, ";"),
            ':' => (TokenKind::Separator, ":"),
            _ => (TokenKind::Operator, ""),
        };
        let text = if text.is_empty() {
            c.to_string()
        } else {
            text.to_string()
        };
        tokens.push(Token { kind, text });
        i += 1;
    }
    tokens
}
