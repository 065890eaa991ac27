use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::lexer::{classify, is_ident, lex, parse_int, TokenKind};
use crate::surface::{Color, PALETTE};

/// Commands that only touch cursor/pen/fill/drawing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicCmd {
    Move,
    Draw,
    Clear,
    Reset,
    Rectangle,
    Circle,
    Triangle,
    Color,
    Fill,
    Write,
}

impl BasicCmd {
    pub fn from_word(word: &str) -> Option<BasicCmd> {
        match word {
            "MOVE" => Some(BasicCmd::Move),
            "DRAW" => Some(BasicCmd::Draw),
            "CLEAR" => Some(BasicCmd::Clear),
            "RESET" => Some(BasicCmd::Reset),
            "RECTANGLE" => Some(BasicCmd::Rectangle),
            "CIRCLE" => Some(BasicCmd::Circle),
            "TRIANGLE" => Some(BasicCmd::Triangle),
            "COLOR" => Some(BasicCmd::Color),
            "FILL" => Some(BasicCmd::Fill),
            "WRITE" => Some(BasicCmd::Write),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            BasicCmd::Move => "MOVE",
            BasicCmd::Draw => "DRAW",
            BasicCmd::Clear => "CLEAR",
            BasicCmd::Reset => "RESET",
            BasicCmd::Rectangle => "RECTANGLE",
            BasicCmd::Circle => "CIRCLE",
            BasicCmd::Triangle => "TRIANGLE",
            BasicCmd::Color => "COLOR",
            BasicCmd::Fill => "FILL",
            BasicCmd::Write => "WRITE",
        }
    }
}

/// Commands that touch the control-flow stack, the program counter, the
/// variable store, or the method table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCmd {
    If,
    EndIf,
    While,
    EndWhile,
    Method,
    EndMethod,
}

impl SpecialCmd {
    pub fn from_word(word: &str) -> Option<SpecialCmd> {
        match word {
            "IF" => Some(SpecialCmd::If),
            "ENDIF" => Some(SpecialCmd::EndIf),
            "WHILE" => Some(SpecialCmd::While),
            "ENDWHILE" => Some(SpecialCmd::EndWhile),
            "METHOD" => Some(SpecialCmd::Method),
            "ENDMETHOD" => Some(SpecialCmd::EndMethod),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SpecialCmd::If => "IF",
            SpecialCmd::EndIf => "ENDIF",
            SpecialCmd::While => "WHILE",
            SpecialCmd::EndWhile => "ENDWHILE",
            SpecialCmd::Method => "METHOD",
            SpecialCmd::EndMethod => "ENDMETHOD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn from_word(word: &str) -> Option<CmpOp> {
        match word {
            "<" => Some(CmpOp::Lt),
            ">" => Some(CmpOp::Gt),
            "<=" => Some(CmpOp::Le),
            ">=" => Some(CmpOp::Ge),
            "==" => Some(CmpOp::Eq),
            "!=" => Some(CmpOp::Ne),
            _ => None,
        }
    }

    pub fn apply(self, a: i32, b: i32) -> bool {
        match self {
            CmpOp::Lt => a < b,
            CmpOp::Gt => a > b,
            CmpOp::Le => a <= b,
            CmpOp::Ge => a >= b,
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn from_word(word: &str) -> Option<ArithOp> {
        match word {
            "+" => Some(ArithOp::Add),
            "-" => Some(ArithOp::Sub),
            "*" => Some(ArithOp::Mul),
            "/" => Some(ArithOp::Div),
            _ => None,
        }
    }
}

/// How a line is dispatched. A first word of the shape `Name(...)` counts as
/// a method call even though it is not a fixed keyword; a second word `=`
/// makes the line an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Basic(BasicCmd),
    Special(SpecialCmd),
    Assignment,
    Call,
    Unknown,
}

pub fn classify_command(words: &[String]) -> CommandKind {
    let Some(first) = words.first() else {
        return CommandKind::Unknown;
    };
    if let Some(cmd) = BasicCmd::from_word(first) {
        return CommandKind::Basic(cmd);
    }
    if let Some(cmd) = SpecialCmd::from_word(first) {
        return CommandKind::Special(cmd);
    }
    if words.len() >= 2 && words[1] == "=" {
        return CommandKind::Assignment;
    }
    if first.contains('(') {
        return CommandKind::Call;
    }
    CommandKind::Unknown
}

/// A parsed `Name(p1,...,pn)` method signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<String>,
}

pub fn parse_signature(word: &str) -> Option<Signature> {
    let (name, inner) = split_parens(word)?;
    let mut params = Vec::new();
    if !inner.is_empty() {
        for p in inner.split(',') {
            if !is_ident(p) {
                return None;
            }
            params.push(p.to_string());
        }
    }
    Some(Signature { name: name.to_string(), params })
}

/// Split a `Name(arg,arg)` call token into the name and raw argument words.
/// Arguments are not validated here; an empty list parses as zero arguments.
pub fn parse_call(word: &str) -> Option<(String, Vec<String>)> {
    let (name, inner) = split_parens(word)?;
    let args = if inner.is_empty() {
        Vec::new()
    } else {
        inner.split(',').map(str::to_string).collect()
    };
    Some((name.to_string(), args))
}

fn split_parens(word: &str) -> Option<(&str, &str)> {
    let open = word.find('(')?;
    let rest = &word[open..];
    if !rest.ends_with(')') || rest.len() < 2 {
        return None;
    }
    let name = &word[..open];
    if !is_ident(name) {
        return None;
    }
    Some((name, &rest[1..rest.len() - 1]))
}

/// A failed validation, split by what the failure means for the caller: a
/// malformed line shape, a literal outside its allowed range, or a token
/// that is neither an integer literal nor a known variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Shape(String),
    Range(String),
    Value(String),
}

impl Violation {
    pub fn detail(self) -> String {
        match self {
            Violation::Shape(d) | Violation::Range(d) | Violation::Value(d) => d,
        }
    }
}

type Validation = std::result::Result<(), Violation>;

fn check_value(word: &str, known: &dyn Fn(&str) -> bool) -> Validation {
    if parse_int(word).is_some() || known(word) {
        Ok(())
    } else if is_ident(word) {
        Err(Violation::Value(format!("undefined variable '{}'", word)))
    } else {
        Err(Violation::Value(format!("'{}' is not an integer", word)))
    }
}

fn check_size(word: &str, known: &dyn Fn(&str) -> bool, what: &str) -> Validation {
    check_value(word, known)?;
    if let Some(v) = parse_int(word) {
        if v < 0 {
            return Err(Violation::Range(format!("{} must be non-negative, got {}", what, v)));
        }
    }
    Ok(())
}

/// WRITE's argument split: an optional leading point size, then the text
/// words. `WRITE 20 "hi"` has a size; `WRITE "20"` does not.
pub fn split_write<'a>(
    words: &'a [String],
    known: &dyn Fn(&str) -> bool,
) -> (Option<&'a str>, &'a [String]) {
    if words.len() >= 3 && (parse_int(&words[1]).is_some() || known(&words[1])) {
        (Some(&words[1]), &words[2..])
    } else {
        (None, &words[1..])
    }
}

/// Re-join WRITE's text words and strip the surrounding quotes.
pub fn unquote_text(text_words: &[String]) -> Option<String> {
    let joined = text_words.join(" ");
    if joined.len() < 2 || !joined.starts_with('"') || !joined.ends_with('"') {
        return None;
    }
    Some(joined[1..joined.len() - 1].to_string())
}

/// Validate a basic command's argument count and per-argument constraints.
/// `known` answers whether an identifier names an in-scope variable.
pub fn validate_basic(cmd: BasicCmd, words: &[String], known: &dyn Fn(&str) -> bool) -> Validation {
    let args = &words[1..];
    match cmd {
        BasicCmd::Move => {
            if args.len() != 2 {
                return Err(Violation::Shape("expected MOVE X Y".into()));
            }
            check_value(&args[0], known)?;
            check_value(&args[1], known)
        }
        BasicCmd::Draw => {
            if args.is_empty() || args.len() > 2 {
                return Err(Violation::Shape("expected DRAW X [Y]".into()));
            }
            for a in args {
                check_value(a, known)?;
            }
            Ok(())
        }
        BasicCmd::Clear | BasicCmd::Reset => {
            if !args.is_empty() {
                return Err(Violation::Shape(format!("{} takes no arguments", cmd.keyword())));
            }
            Ok(())
        }
        BasicCmd::Rectangle => {
            if args.len() != 2 {
                return Err(Violation::Shape("expected RECTANGLE WIDTH HEIGHT".into()));
            }
            check_size(&args[0], known, "width")?;
            check_size(&args[1], known, "height")
        }
        BasicCmd::Circle => {
            if args.len() != 1 {
                return Err(Violation::Shape("expected CIRCLE RADIUS".into()));
            }
            check_size(&args[0], known, "radius")
        }
        BasicCmd::Triangle => {
            if args.len() != 2 {
                return Err(Violation::Shape("expected TRIANGLE BASE HEIGHT".into()));
            }
            check_size(&args[0], known, "base")?;
            check_size(&args[1], known, "height")
        }
        BasicCmd::Color => {
            if args.len() != 1 {
                return Err(Violation::Shape("expected COLOR NAME".into()));
            }
            if Color::pen(&args[0]).is_none() {
                return Err(Violation::Shape(format!(
                    "unknown color '{}' (valid colors are: {})",
                    args[0],
                    PALETTE.join(", ")
                )));
            }
            Ok(())
        }
        BasicCmd::Fill => {
            if args.len() != 1 || (args[0] != "ON" && args[0] != "OFF") {
                return Err(Violation::Shape("expected FILL ON|OFF".into()));
            }
            Ok(())
        }
        BasicCmd::Write => {
            if args.is_empty() {
                return Err(Violation::Shape("expected WRITE [SIZE] \"TEXT\"".into()));
            }
            let (size, text) = split_write(words, known);
            if let Some(s) = size {
                if let Some(v) = parse_int(s) {
                    if v < 1 {
                        return Err(Violation::Range(format!("text size must be positive, got {}", v)));
                    }
                }
            }
            if unquote_text(text).is_none() {
                return Err(Violation::Shape("text must be enclosed in double quotes".into()));
            }
            Ok(())
        }
    }
}

/// Validate a control-flow keyword line: `IF/WHILE VALUE OP VALUE`, bare end
/// keywords, and `METHOD Name(p1,...)`.
pub fn validate_special(cmd: SpecialCmd, words: &[String], known: &dyn Fn(&str) -> bool) -> Validation {
    match cmd {
        SpecialCmd::If | SpecialCmd::While => {
            if words.len() != 4 {
                return Err(Violation::Shape(format!(
                    "expected {} VALUE OP VALUE",
                    cmd.keyword()
                )));
            }
            if CmpOp::from_word(&words[2]).is_none() {
                return Err(Violation::Shape(format!(
                    "unknown comparison operator '{}'",
                    words[2]
                )));
            }
            check_value(&words[1], known)?;
            check_value(&words[3], known)
        }
        SpecialCmd::EndIf | SpecialCmd::EndWhile | SpecialCmd::EndMethod => {
            if words.len() != 1 {
                return Err(Violation::Shape(format!("{} takes no arguments", cmd.keyword())));
            }
            Ok(())
        }
        SpecialCmd::Method => {
            if words.len() != 2 {
                return Err(Violation::Shape("expected METHOD Name(p1,...,pn)".into()));
            }
            if parse_signature(&words[1]).is_none() {
                return Err(Violation::Shape(format!(
                    "malformed method signature '{}'",
                    words[1]
                )));
            }
            Ok(())
        }
    }
}

/// Validate `NAME = VALUE` or `NAME = VALUE OP VALUE`. The target may be a
/// fresh name; right-hand-side values must resolve.
pub fn validate_assignment(words: &[String], known: &dyn Fn(&str) -> bool) -> Validation {
    if words.len() != 3 && words.len() != 5 {
        return Err(Violation::Shape("expected NAME = VALUE or NAME = VALUE OP VALUE".into()));
    }
    if classify(&words[0]) != TokenKind::Ident {
        return Err(Violation::Shape(format!("invalid variable name '{}'", words[0])));
    }
    if words[1] != "=" {
        return Err(Violation::Shape("expected '=' after the variable name".into()));
    }
    check_value(&words[2], known)?;
    if words.len() == 5 {
        if ArithOp::from_word(&words[3]).is_none() {
            return Err(Violation::Shape(format!("unknown operator '{}'", words[3])));
        }
        check_value(&words[4], known)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    If,
    While,
    Method,
}

impl BlockKind {
    fn keyword(self) -> &'static str {
        match self {
            BlockKind::If => "IF",
            BlockKind::While => "WHILE",
            BlockKind::Method => "METHOD",
        }
    }
}

/// Standalone syntax check: validates every line without executing anything,
/// failing fast on the first offending line. Assignment targets and method
/// declarations seen earlier in the walk count as known for later lines.
pub fn check(source: &str) -> Result<()> {
    let lines = lex(source);
    let mut vars: HashSet<String> = HashSet::new();
    let mut methods: HashMap<String, usize> = HashMap::new();
    let mut blocks: Vec<(BlockKind, usize)> = Vec::new();

    for line in &lines {
        let number = line.number;
        let words = &line.words;
        let known = |w: &str| vars.contains(w);
        match classify_command(words) {
            CommandKind::Unknown => {
                return Err(Error::Unsupported { line: number, word: words[0].clone() });
            }
            CommandKind::Basic(cmd) => {
                validate_basic(cmd, words, &known).map_err(|v| Error::Syntax {
                    line: number,
                    command: cmd.keyword().to_string(),
                    detail: v.detail(),
                })?;
            }
            CommandKind::Assignment => {
                validate_assignment(words, &known).map_err(|v| Error::Syntax {
                    line: number,
                    command: words[0].clone(),
                    detail: v.detail(),
                })?;
                vars.insert(words[0].clone());
            }
            CommandKind::Call => {
                check_call(words, number, &known, &methods)?;
            }
            CommandKind::Special(cmd) => {
                validate_special(cmd, words, &known).map_err(|v| Error::Syntax {
                    line: number,
                    command: cmd.keyword().to_string(),
                    detail: v.detail(),
                })?;
                check_block(cmd, words, number, &mut vars, &mut methods, &mut blocks)?;
            }
        }
    }

    if let Some((kind, number)) = blocks.last() {
        return Err(Error::Syntax {
            line: *number,
            command: kind.keyword().to_string(),
            detail: format!("unterminated {} block", kind.keyword()),
        });
    }
    Ok(())
}

fn check_call(
    words: &[String],
    number: usize,
    known: &dyn Fn(&str) -> bool,
    methods: &HashMap<String, usize>,
) -> Result<()> {
    let Some((name, args)) = parse_call(&words[0]) else {
        return Err(Error::Syntax {
            line: number,
            command: words[0].clone(),
            detail: "malformed method call".into(),
        });
    };
    if words.len() != 1 {
        return Err(Error::Syntax {
            line: number,
            command: name,
            detail: "a method call takes no further arguments".into(),
        });
    }
    let Some(&arity) = methods.get(&name) else {
        return Err(Error::Syntax {
            line: number,
            command: name.clone(),
            detail: format!("call to undeclared method '{}'", name),
        });
    };
    if args.len() != arity {
        return Err(Error::Syntax {
            line: number,
            command: name.clone(),
            detail: format!("method '{}' expects {} arguments, got {}", name, arity, args.len()),
        });
    }
    for a in &args {
        check_value(a, known).map_err(|v| Error::Syntax {
            line: number,
            command: name.clone(),
            detail: v.detail(),
        })?;
    }
    Ok(())
}

fn check_block(
    cmd: SpecialCmd,
    words: &[String],
    number: usize,
    vars: &mut HashSet<String>,
    methods: &mut HashMap<String, usize>,
    blocks: &mut Vec<(BlockKind, usize)>,
) -> Result<()> {
    let close = |blocks: &mut Vec<(BlockKind, usize)>, expect: BlockKind, end: &str| match blocks.pop() {
        Some((kind, _)) if kind == expect => Ok(()),
        Some((kind, _)) => Err(Error::Syntax {
            line: number,
            command: end.to_string(),
            detail: format!("{} closes an open {} block", end, kind.keyword()),
        }),
        None => Err(Error::Syntax {
            line: number,
            command: end.to_string(),
            detail: format!("{} without an open block", end),
        }),
    };
    match cmd {
        SpecialCmd::If => blocks.push((BlockKind::If, number)),
        SpecialCmd::While => blocks.push((BlockKind::While, number)),
        SpecialCmd::Method => {
            // validate_special guarantees the signature parses
            if let Some(sig) = parse_signature(&words[1]) {
                methods.insert(sig.name, sig.params.len());
                for p in &sig.params {
                    vars.insert(format!("{}_METHOD", p));
                }
            }
            blocks.push((BlockKind::Method, number));
        }
        SpecialCmd::EndIf => close(blocks, BlockKind::If, "ENDIF")?,
        SpecialCmd::EndWhile => close(blocks, BlockKind::While, "ENDWHILE")?,
        SpecialCmd::EndMethod => close(blocks, BlockKind::Method, "ENDMETHOD")?,
    }
    Ok(())
}
