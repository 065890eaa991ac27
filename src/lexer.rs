use logos::Logos;

/// Token classes for a single word of a command line. A word is one class or
/// it is nothing: `classify` only reports a kind that spans the whole word.
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    #[token("=")]
    Assign,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    #[token("==")]
    EqualEqual,
    #[token("!=")]
    BangEqual,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,

    #[regex(r"-?[0-9]+")]
    Int,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    // Quoted text: naive double-quoted without escapes
    #[regex(r#""[^"]*""#)]
    Str,

    #[error]
    Error,
}

/// Classify one word. Returns `TokenKind::Error` unless a single token covers
/// the entire word.
pub fn classify(word: &str) -> TokenKind {
    let mut lex = TokenKind::lexer(word);
    match lex.next() {
        Some(kind) if lex.span().end == word.len() => kind,
        _ => TokenKind::Error,
    }
}

/// Parse a word as an integer literal. Identifiers and out-of-range literals
/// both come back as `None`.
pub fn parse_int(word: &str) -> Option<i32> {
    if classify(word) == TokenKind::Int {
        word.parse().ok()
    } else {
        None
    }
}

pub fn is_ident(word: &str) -> bool {
    classify(word) == TokenKind::Ident
}

/// One non-blank source line: the original 1-based line number plus the
/// space-separated words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    pub words: Vec<String>,
}

/// Split program text into trimmed, numbered lines. Blank lines are dropped
/// but keep their slot in the numbering so diagnostics match the source.
/// Each line splits on single spaces; quoted text is not protected from the
/// split (WRITE re-joins its trailing words).
pub fn lex(source: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    for (i, raw) in source.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        lines.push(Line {
            number: i + 1,
            words: trimmed.split(' ').map(str::to_string).collect(),
        });
    }
    lines
}
