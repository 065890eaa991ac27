use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::lexer::{is_ident, lex, parse_int, Line};
use crate::parser::{
    classify_command, parse_call, parse_signature, split_write, unquote_text, validate_assignment,
    validate_basic, validate_special, ArithOp, BasicCmd, CmpOp, CommandKind, SpecialCmd, Violation,
};
use crate::surface::{Color, Surface, BACKGROUND};

/// Cursor, pen and fill state reported after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FinalState {
    pub x: i32,
    pub y: i32,
    pub pen: Color,
    pub fill: bool,
}

#[derive(Debug, Clone)]
struct MethodDef {
    params: Vec<String>,
    start: usize,
    end: Option<usize>,
}

/// One open block. A suppressed frame's body lines execute no side effects;
/// if any frame is suppressed, every frame above it is suppressed too.
#[derive(Debug)]
enum Frame {
    If {
        skip: bool,
    },
    // cond keeps the raw condition words so ENDWHILE can re-evaluate them
    // against the current variables; body is the line after WHILE.
    While {
        skip: bool,
        cond: Option<[String; 3]>,
        body: usize,
    },
    // A declaration pass never executes its body; name is None when the
    // declaration sits in a dead branch and was not recorded.
    MethodDecl {
        name: Option<String>,
    },
    MethodCall {
        return_to: usize,
    },
}

impl Frame {
    fn skip(&self) -> bool {
        match self {
            Frame::If { skip } | Frame::While { skip, .. } => *skip,
            Frame::MethodDecl { .. } => true,
            Frame::MethodCall { .. } => false,
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            Frame::If { .. } => "IF",
            Frame::While { .. } => "WHILE",
            Frame::MethodDecl { .. } | Frame::MethodCall { .. } => "METHOD",
        }
    }
}

/// The interpreter for one program run: cursor/pen/fill state, the variable
/// store, the method table and the control-flow stack. The drawing surface
/// is borrowed per call and never owned.
pub struct Interpreter {
    x: i32,
    y: i32,
    pen: Color,
    fill: bool,
    vars: HashMap<String, i32>,
    methods: HashMap<String, MethodDef>,
    stack: Vec<Frame>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter {
            x: 0,
            y: 0,
            pen: Color::Black,
            fill: false,
            vars: HashMap::new(),
            methods: HashMap::new(),
            stack: Vec::new(),
        }
    }

    pub fn state(&self) -> FinalState {
        FinalState { x: self.x, y: self.y, pen: self.pen, fill: self.fill }
    }

    pub fn variable(&self, name: &str) -> Option<i32> {
        self.vars.get(name).copied()
    }

    /// Run a whole program: resets all state, clears the surface, then steps
    /// line by line until the counter runs off the end or a fatal error.
    /// Prior mutations and drawn primitives are not rolled back on error.
    pub fn run(&mut self, source: &str, surface: &mut dyn Surface) -> Result<FinalState> {
        self.x = 0;
        self.y = 0;
        self.pen = Color::Black;
        self.fill = false;
        self.vars.clear();
        self.methods.clear();
        self.stack.clear();
        surface.clear(BACKGROUND);

        let program = lex(source);
        let mut pc = 0;
        while pc < program.len() {
            let jump = self.step(&program, pc, surface)?;
            pc = jump.unwrap_or(pc + 1);
        }
        if let Some(frame) = self.stack.last() {
            let line = program.last().map(|l| l.number).unwrap_or(0);
            return Err(Error::Runtime {
                line,
                detail: format!("unterminated {} block at end of program", frame.keyword()),
            });
        }
        Ok(self.state())
    }

    /// Apply a single command against the current state. Control flow and
    /// method calls need a surrounding program and are rejected here.
    pub fn execute_line(&mut self, text: &str, surface: &mut dyn Surface) -> Result<()> {
        let lines = lex(text);
        let Some(line) = lines.first() else {
            return Ok(());
        };
        if let Some(extra) = lines.get(1) {
            return Err(Error::Syntax {
                line: extra.number,
                command: extra.words[0].clone(),
                detail: "expected a single command".into(),
            });
        }
        let words = &line.words;
        match classify_command(words) {
            CommandKind::Unknown => Err(Error::Unsupported {
                line: line.number,
                word: words[0].clone(),
            }),
            CommandKind::Special(cmd) => Err(Error::Syntax {
                line: line.number,
                command: cmd.keyword().to_string(),
                detail: "control flow is not available in single-command mode".into(),
            }),
            CommandKind::Call => Err(Error::Syntax {
                line: line.number,
                command: words[0].clone(),
                detail: "method calls are not available in single-command mode".into(),
            }),
            CommandKind::Basic(cmd) => {
                let known = |w: &str| self.vars.contains_key(w);
                validate_basic(cmd, words, &known).map_err(|v| match v {
                    Violation::Shape(d) | Violation::Range(d) => Error::Syntax {
                        line: line.number,
                        command: cmd.keyword().to_string(),
                        detail: d,
                    },
                    Violation::Value(d) => Error::Runtime { line: line.number, detail: d },
                })?;
                let words = self.resolve(words);
                self.exec_basic(cmd, &words, line.number, surface)
            }
            CommandKind::Assignment => {
                let words = self.resolve(words);
                self.exec_assignment(&words, line.number)
            }
        }
    }

    fn step(&mut self, program: &[Line], pc: usize, surface: &mut dyn Surface) -> Result<Option<usize>> {
        let line = &program[pc];
        if self.stack.last().map(Frame::skip).unwrap_or(false) {
            return self.step_suppressed(line, pc);
        }
        let words = self.resolve(&line.words);
        match classify_command(&words) {
            CommandKind::Unknown => Err(Error::Unsupported {
                line: line.number,
                word: words[0].clone(),
            }),
            CommandKind::Basic(cmd) => {
                self.exec_basic(cmd, &words, line.number, surface)?;
                Ok(None)
            }
            CommandKind::Special(cmd) => self.exec_special(cmd, line, &words, pc),
            CommandKind::Assignment => {
                self.exec_assignment(&words, line.number)?;
                Ok(None)
            }
            CommandKind::Call => self.exec_call(&words, line.number, pc),
        }
    }

    // A suppressed line runs no side effects, but block keywords still
    // push/pop so nesting depth stays correct. Only the end keyword matching
    // the open kind is meaningful; a mismatch is fatal even in a dead branch.
    fn step_suppressed(&mut self, line: &Line, pc: usize) -> Result<Option<usize>> {
        let Some(cmd) = SpecialCmd::from_word(&line.words[0]) else {
            return Ok(None);
        };
        match cmd {
            SpecialCmd::If => self.stack.push(Frame::If { skip: true }),
            SpecialCmd::While => {
                let cond = (line.words.len() == 4).then(|| cond_triple(&line.words));
                self.stack.push(Frame::While { skip: true, cond, body: pc + 1 });
            }
            SpecialCmd::Method => self.stack.push(Frame::MethodDecl { name: None }),
            SpecialCmd::EndIf => match self.stack.pop() {
                Some(Frame::If { .. }) => {}
                Some(frame) => return Err(unbalanced("ENDIF", &frame, line.number)),
                None => return Err(underflow("ENDIF", line.number)),
            },
            SpecialCmd::EndWhile => match self.stack.pop() {
                // a suppressed loop falls through without re-evaluating
                Some(Frame::While { .. }) => {}
                Some(frame) => return Err(unbalanced("ENDWHILE", &frame, line.number)),
                None => return Err(underflow("ENDWHILE", line.number)),
            },
            SpecialCmd::EndMethod => match self.stack.pop() {
                Some(Frame::MethodDecl { name }) => {
                    if let Some(name) = name {
                        if let Some(def) = self.methods.get_mut(&name) {
                            def.end = Some(pc);
                        }
                    }
                }
                Some(frame) => return Err(unbalanced("ENDMETHOD", &frame, line.number)),
                None => return Err(underflow("ENDMETHOD", line.number)),
            },
        }
        Ok(None)
    }

    fn exec_special(
        &mut self,
        cmd: SpecialCmd,
        line: &Line,
        words: &[String],
        pc: usize,
    ) -> Result<Option<usize>> {
        validate_special(cmd, words, &|w| self.vars.contains_key(w)).map_err(|v| match v {
            Violation::Shape(d) => Error::Syntax {
                line: line.number,
                command: cmd.keyword().to_string(),
                detail: d,
            },
            Violation::Range(d) | Violation::Value(d) => Error::Runtime { line: line.number, detail: d },
        })?;
        match cmd {
            SpecialCmd::If => {
                let enter = self.eval_condition(&cond_triple(&line.words), line.number)?;
                self.stack.push(Frame::If { skip: !enter });
                Ok(None)
            }
            SpecialCmd::While => {
                let cond = cond_triple(&line.words);
                let enter = self.eval_condition(&cond, line.number)?;
                self.stack.push(Frame::While { skip: !enter, cond: Some(cond), body: pc + 1 });
                Ok(None)
            }
            SpecialCmd::EndIf => match self.stack.pop() {
                Some(Frame::If { .. }) => Ok(None),
                Some(frame) => Err(unbalanced("ENDIF", &frame, line.number)),
                None => Err(underflow("ENDIF", line.number)),
            },
            SpecialCmd::EndWhile => match self.stack.pop() {
                Some(Frame::While { skip: false, cond: Some(cond), body }) => {
                    let again = self.eval_condition(&cond, line.number)?;
                    self.stack.push(Frame::While { skip: !again, cond: Some(cond), body });
                    Ok(Some(body))
                }
                Some(Frame::While { .. }) => Ok(None),
                Some(frame) => Err(unbalanced("ENDWHILE", &frame, line.number)),
                None => Err(underflow("ENDWHILE", line.number)),
            },
            SpecialCmd::Method => {
                let sig = parse_signature(&line.words[1]).ok_or_else(|| Error::Syntax {
                    line: line.number,
                    command: "METHOD".into(),
                    detail: format!("malformed method signature '{}'", line.words[1]),
                })?;
                self.methods.insert(
                    sig.name.clone(),
                    MethodDef { params: sig.params, start: pc, end: None },
                );
                self.stack.push(Frame::MethodDecl { name: Some(sig.name) });
                Ok(None)
            }
            SpecialCmd::EndMethod => match self.stack.pop() {
                Some(Frame::MethodCall { return_to }) => Ok(Some(return_to + 1)),
                Some(frame) => Err(unbalanced("ENDMETHOD", &frame, line.number)),
                None => Err(underflow("ENDMETHOD", line.number)),
            },
        }
    }

    fn exec_call(&mut self, words: &[String], line: usize, pc: usize) -> Result<Option<usize>> {
        let Some((name, args)) = parse_call(&words[0]) else {
            return Err(Error::Syntax {
                line,
                command: words[0].clone(),
                detail: "malformed method call".into(),
            });
        };
        if words.len() != 1 {
            return Err(Error::Syntax {
                line,
                command: name,
                detail: "a method call takes no further arguments".into(),
            });
        }
        let def = match self.methods.get(&name) {
            Some(def) => def.clone(),
            None => {
                return Err(Error::Runtime {
                    line,
                    detail: format!("call to undeclared method '{}'", name),
                })
            }
        };
        if def.end.is_none() {
            return Err(Error::Runtime {
                line,
                detail: format!("method '{}' is missing its ENDMETHOD", name),
            });
        }
        if args.len() != def.params.len() {
            return Err(Error::Runtime {
                line,
                detail: format!(
                    "method '{}' expects {} arguments, got {}",
                    name,
                    def.params.len(),
                    args.len()
                ),
            });
        }
        for (param, arg) in def.params.iter().zip(&args) {
            let value = self.eval_value(arg, line)?;
            self.vars.insert(format!("{}_METHOD", param), value);
        }
        self.stack.push(Frame::MethodCall { return_to: pc });
        Ok(Some(def.start + 1))
    }

    fn exec_assignment(&mut self, words: &[String], line: usize) -> Result<()> {
        validate_assignment(words, &|_| false).map_err(|v| match v {
            Violation::Shape(d) => Error::Syntax { line, command: words[0].clone(), detail: d },
            Violation::Range(d) | Violation::Value(d) => Error::Runtime { line, detail: d },
        })?;
        let value = if words.len() == 3 {
            self.eval_value(&words[2], line)?
        } else {
            let op = ArithOp::from_word(&words[3]).ok_or_else(|| Error::Syntax {
                line,
                command: words[0].clone(),
                detail: format!("unknown operator '{}'", words[3]),
            })?;
            let a = self.eval_value(&words[2], line)?;
            let b = self.eval_value(&words[4], line)?;
            apply_arith(op, a, b, line)?
        };
        self.vars.insert(words[0].clone(), value);
        Ok(())
    }

    fn exec_basic(
        &mut self,
        cmd: BasicCmd,
        words: &[String],
        line: usize,
        surface: &mut dyn Surface,
    ) -> Result<()> {
        validate_basic(cmd, words, &|_| false).map_err(|v| match v {
            Violation::Shape(d) => Error::Syntax {
                line,
                command: cmd.keyword().to_string(),
                detail: d,
            },
            Violation::Range(d) | Violation::Value(d) => Error::Runtime { line, detail: d },
        })?;
        match cmd {
            BasicCmd::Move => {
                let x = self.eval_value(&words[1], line)?;
                let y = self.eval_value(&words[2], line)?;
                self.x = x;
                self.y = y;
                surface.move_to(x, y);
            }
            BasicCmd::Draw => {
                let x = self.eval_value(&words[1], line)?;
                let y = match words.get(2) {
                    Some(w) => self.eval_value(w, line)?,
                    None => self.y,
                };
                surface.line_to(x, y);
                self.x = x;
                self.y = y;
            }
            BasicCmd::Clear => surface.clear(BACKGROUND),
            BasicCmd::Reset => {
                self.x = 0;
                self.y = 0;
                self.pen = Color::Black;
                self.fill = false;
                surface.clear(BACKGROUND);
            }
            BasicCmd::Rectangle => {
                let w = self.eval_value(&words[1], line)?;
                let h = self.eval_value(&words[2], line)?;
                surface.rectangle(self.x, self.y, w, h, self.fill, self.pen);
            }
            BasicCmd::Circle => {
                let r = self.eval_value(&words[1], line)?;
                surface.ellipse(self.x, self.y, r, self.fill, self.pen);
            }
            BasicCmd::Triangle => {
                let base = self.eval_value(&words[1], line)?;
                let height = self.eval_value(&words[2], line)?;
                let right = self.x.checked_add(base).ok_or_else(|| overflow(line))?;
                let apex_x = self.x.checked_add(base / 2).ok_or_else(|| overflow(line))?;
                let apex_y = self.y.checked_sub(height).ok_or_else(|| overflow(line))?;
                surface.polygon(
                    &[(self.x, self.y), (right, self.y), (apex_x, apex_y)],
                    self.fill,
                    self.pen,
                );
            }
            BasicCmd::Color => {
                self.pen = Color::pen(&words[1]).ok_or_else(|| Error::Runtime {
                    line,
                    detail: format!("unknown color '{}'", words[1]),
                })?;
            }
            BasicCmd::Fill => self.fill = words[1] == "ON",
            BasicCmd::Write => {
                let (size_word, text_words) = split_write(words, &|_| false);
                let size = match size_word {
                    Some(w) => self.eval_value(w, line)?,
                    None => 12,
                };
                let text = unquote_text(text_words).ok_or_else(|| Error::Syntax {
                    line,
                    command: "WRITE".into(),
                    detail: "text must be enclosed in double quotes".into(),
                })?;
                surface.text(self.x, self.y, &text, size, self.pen);
            }
        }
        Ok(())
    }

    // Substitute known variables into argument tokens, one pass, left to
    // right. The command word (token 0, also the assignment target) is
    // never substituted.
    fn resolve(&self, words: &[String]) -> Vec<String> {
        words
            .iter()
            .enumerate()
            .map(|(i, w)| {
                if i > 0 {
                    if let Some(v) = self.vars.get(w) {
                        return v.to_string();
                    }
                }
                w.clone()
            })
            .collect()
    }

    fn eval_value(&self, word: &str, line: usize) -> Result<i32> {
        if let Some(v) = self.vars.get(word) {
            return Ok(*v);
        }
        parse_int(word).ok_or_else(|| {
            let detail = if is_ident(word) {
                format!("undefined variable '{}'", word)
            } else {
                format!("'{}' is not an integer", word)
            };
            Error::Runtime { line, detail }
        })
    }

    fn eval_condition(&self, cond: &[String; 3], line: usize) -> Result<bool> {
        let op = CmpOp::from_word(&cond[1]).ok_or_else(|| Error::Runtime {
            line,
            detail: format!("unknown comparison operator '{}'", cond[1]),
        })?;
        let lhs = self.eval_value(&cond[0], line)?;
        let rhs = self.eval_value(&cond[2], line)?;
        Ok(op.apply(lhs, rhs))
    }
}

fn cond_triple(words: &[String]) -> [String; 3] {
    [words[1].clone(), words[2].clone(), words[3].clone()]
}

fn apply_arith(op: ArithOp, a: i32, b: i32, line: usize) -> Result<i32> {
    let out = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        ArithOp::Div => {
            if b == 0 {
                return Err(Error::Runtime { line, detail: "division by zero".into() });
            }
            a.checked_div(b)
        }
    };
    out.ok_or_else(|| overflow(line))
}

fn overflow(line: usize) -> Error {
    Error::Runtime { line, detail: "arithmetic overflow".into() }
}

fn unbalanced(end: &str, frame: &Frame, line: usize) -> Error {
    Error::Runtime {
        line,
        detail: format!("unbalanced {}: open block is {}", end, frame.keyword()),
    }
}

fn underflow(end: &str, line: usize) -> Error {
    Error::Runtime { line, detail: format!("{} without an open block", end) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::check;
    use crate::surface::{Op, RecordingSurface};

    fn run_ok(src: &str) -> (FinalState, Vec<Op>, Interpreter) {
        let mut interp = Interpreter::new();
        let mut surface = RecordingSurface::new();
        let state = interp.run(src, &mut surface).expect("program should run");
        (state, surface.ops, interp)
    }

    fn run_err(src: &str) -> Error {
        Interpreter::new().run(src, &mut RecordingSurface::new()).unwrap_err()
    }

    fn ellipses(ops: &[Op]) -> usize {
        ops.iter().filter(|op| matches!(op, Op::Ellipse { .. })).count()
    }

    #[test]
    fn run_clears_the_surface_first() {
        let (_, ops, _) = run_ok("");
        assert_eq!(ops, vec![Op::Clear { background: BACKGROUND }]);
    }

    #[test]
    fn reset_restores_defaults_regardless_of_prior_state() {
        let (state, ops, _) = run_ok("MOVE 10 20\nCOLOR RED\nFILL ON\nRESET");
        assert_eq!(state, FinalState { x: 0, y: 0, pen: Color::Black, fill: false });
        // run start plus RESET both clear
        assert_eq!(ops.iter().filter(|op| matches!(op, Op::Clear { .. })).count(), 2);
    }

    #[test]
    fn move_and_draw_set_the_cursor_exactly() {
        let (state, ops, _) = run_ok("MOVE 10 20\nDRAW 30 40");
        assert_eq!((state.x, state.y), (30, 40));
        assert_eq!(
            ops,
            vec![
                Op::Clear { background: BACKGROUND },
                Op::MoveTo { x: 10, y: 20 },
                Op::LineTo { x: 30, y: 40 },
            ]
        );
    }

    #[test]
    fn draw_with_one_argument_keeps_y() {
        let (state, ops, _) = run_ok("MOVE 10 20\nDRAW 50");
        assert_eq!((state.x, state.y), (50, 20));
        assert!(ops.contains(&Op::LineTo { x: 50, y: 20 }));
    }

    #[test]
    fn negative_coordinates_are_valid_for_move_and_draw() {
        let (state, _, _) = run_ok("x = -5\nMOVE x x\nDRAW -7 -8");
        assert_eq!((state.x, state.y), (-7, -8));
    }

    #[test]
    fn fill_toggle_is_deterministic_and_honored_by_shapes() {
        let (state, ops, _) = run_ok("FILL ON\nRECTANGLE 10 20");
        assert!(state.fill);
        assert!(ops.contains(&Op::Rectangle { x: 0, y: 0, w: 10, h: 20, filled: true, color: Color::Black }));
        let (state, _, _) = run_ok("FILL ON\nFILL OFF");
        assert!(!state.fill);
    }

    #[test]
    fn color_applies_to_later_shapes() {
        let (state, ops, _) = run_ok("COLOR GREEN\nCIRCLE 5");
        assert_eq!(state.pen, Color::Green);
        assert!(ops.contains(&Op::Ellipse { x: 0, y: 0, r: 5, filled: false, color: Color::Green }));
    }

    #[test]
    fn triangle_draws_base_at_cursor_apex_above() {
        let (_, ops, _) = run_ok("MOVE 10 30\nTRIANGLE 20 15");
        assert!(ops.contains(&Op::Polygon {
            points: vec![(10, 30), (30, 30), (20, 15)],
            filled: false,
            color: Color::Black,
        }));
    }

    #[test]
    fn write_draws_text_with_size_and_default() {
        let (_, ops, _) = run_ok("WRITE 20 \"Hello there\"");
        assert!(ops.contains(&Op::Text {
            x: 0,
            y: 0,
            text: "Hello there".into(),
            size: 20,
            color: Color::Black,
        }));
        let (_, ops, _) = run_ok("WRITE \"Hi\"");
        assert!(ops.contains(&Op::Text { x: 0, y: 0, text: "Hi".into(), size: 12, color: Color::Black }));
    }

    #[test]
    fn if_true_executes_body_once_with_no_residual_frame() {
        let (state, ops, _) = run_ok("x = 5\nIF x > 1\nMOVE 7 8\nENDIF\nMOVE 1 1");
        assert_eq!(ops.iter().filter(|op| **op == Op::MoveTo { x: 7, y: 8 }).count(), 1);
        assert_eq!((state.x, state.y), (1, 1));
    }

    #[test]
    fn if_false_executes_no_body_line() {
        let (state, ops, _) = run_ok("IF 1 > 2\nMOVE 7 8\nENDIF");
        assert_eq!((state.x, state.y), (0, 0));
        assert!(!ops.contains(&Op::MoveTo { x: 7, y: 8 }));
    }

    #[test]
    fn suppressed_block_mutates_and_draws_nothing() {
        // the inner IF's condition is true, but its ancestor is dead
        let src = "IF 1 > 2\nIF 2 > 1\nMOVE 9 9\nCIRCLE 3\nENDIF\nx = 1\nENDIF";
        let (state, ops, interp) = run_ok(src);
        assert_eq!((state.x, state.y), (0, 0));
        assert_eq!(ops, vec![Op::Clear { background: BACKGROUND }]);
        assert_eq!(interp.variable("x"), None);
    }

    #[test]
    fn while_runs_exactly_the_remaining_iterations() {
        let src = "x = 5\nWHILE x < 10\nCIRCLE 1\nx = x + 1\nENDWHILE";
        let (_, ops, interp) = run_ok(src);
        assert_eq!(ellipses(&ops), 5);
        assert_eq!(interp.variable("x"), Some(10));
    }

    #[test]
    fn while_with_false_condition_runs_zero_iterations() {
        let src = "x = 12\nWHILE x < 10\nCIRCLE 1\nx = x + 1\nENDWHILE\nMOVE 2 2";
        let (state, ops, interp) = run_ok(src);
        assert_eq!(ellipses(&ops), 0);
        assert_eq!(interp.variable("x"), Some(12));
        assert_eq!((state.x, state.y), (2, 2));
    }

    #[test]
    fn nested_while_loops_multiply() {
        let src = "\
row = 0
WHILE row < 3
col = 0
WHILE col < 2
CIRCLE 1
col = col + 1
ENDWHILE
row = row + 1
ENDWHILE";
        let (_, ops, _) = run_ok(src);
        assert_eq!(ellipses(&ops), 6);
    }

    #[test]
    fn method_body_runs_only_when_called() {
        let src = "\
METHOD Jump(a,b)
MOVE a_METHOD b_METHOD
ENDMETHOD
MOVE 1 1
Jump(20,30)
DRAW 5 5";
        let (state, ops, interp) = run_ok(src);
        assert_eq!(
            ops,
            vec![
                Op::Clear { background: BACKGROUND },
                Op::MoveTo { x: 1, y: 1 },
                Op::MoveTo { x: 20, y: 30 },
                Op::LineTo { x: 5, y: 5 },
            ]
        );
        assert_eq!((state.x, state.y), (5, 5));
        // temporaries persist after the call returns
        assert_eq!(interp.variable("a_METHOD"), Some(20));
        assert_eq!(interp.variable("b_METHOD"), Some(30));
    }

    #[test]
    fn method_arguments_resolve_variables_at_the_call() {
        let src = "\
x = 30
METHOD Dot(r)
CIRCLE r_METHOD
ENDMETHOD
Dot(x)";
        let (_, ops, _) = run_ok(src);
        assert!(ops.contains(&Op::Ellipse { x: 0, y: 0, r: 30, filled: false, color: Color::Black }));
    }

    #[test]
    fn method_calls_inside_a_loop_repeat_the_body() {
        let src = "\
METHOD Step()
DRAW 1
ENDMETHOD
i = 0
WHILE i < 3
Step()
i = i + 1
ENDWHILE";
        let (_, ops, _) = run_ok(src);
        assert_eq!(ops.iter().filter(|op| matches!(op, Op::LineTo { .. })).count(), 3);
    }

    #[test]
    fn call_before_declaration_is_a_runtime_error() {
        let err = run_err("Box(1)");
        assert!(matches!(err, Error::Runtime { line: 1, .. }));
        let err = run_err("Box()\nMETHOD Box()\nENDMETHOD");
        assert!(matches!(err, Error::Runtime { line: 1, ref detail } if detail.contains("undeclared")));
    }

    #[test]
    fn unknown_keyword_is_unsupported() {
        let err = run_err("FOO 1 2");
        assert!(matches!(err, Error::Unsupported { line: 1, ref word } if word == "FOO"));
    }

    #[test]
    fn division_by_zero_aborts_and_suppresses_the_write() {
        let src = "x = 10\ny = 0\nx = x / y\nMOVE 1 1";
        let mut interp = Interpreter::new();
        let mut surface = RecordingSurface::new();
        let err = interp.run(src, &mut surface).unwrap_err();
        assert!(matches!(err, Error::Runtime { line: 3, ref detail } if detail.contains("division by zero")));
        // prior mutations are retained, the failed write is not applied
        assert_eq!(interp.variable("x"), Some(10));
        // nothing after the failing line ran
        assert!(!surface.ops.contains(&Op::MoveTo { x: 1, y: 1 }));
    }

    #[test]
    fn division_truncates_toward_zero() {
        let (_, _, interp) = run_ok("x = 7 / 2\ny = 0 - 7\nz = y / 2");
        assert_eq!(interp.variable("x"), Some(3));
        assert_eq!(interp.variable("z"), Some(-3));
    }

    #[test]
    fn undefined_variable_in_numeric_context_is_a_runtime_error() {
        let err = run_err("CIRCLE nope");
        assert!(matches!(err, Error::Runtime { line: 1, ref detail } if detail.contains("undefined variable")));
    }

    #[test]
    fn negative_size_from_a_variable_is_a_runtime_error() {
        let err = run_err("r = 0 - 4\nCIRCLE r");
        assert!(matches!(err, Error::Runtime { line: 2, .. }));
    }

    #[test]
    fn unterminated_blocks_are_fatal_at_end_of_program() {
        let err = run_err("IF 1 > 0");
        assert!(matches!(err, Error::Runtime { ref detail, .. } if detail.contains("unterminated IF")));
        let err = run_err("METHOD Box()\nCIRCLE 1");
        assert!(matches!(err, Error::Runtime { ref detail, .. } if detail.contains("unterminated METHOD")));
    }

    #[test]
    fn unbalanced_end_keywords_are_fatal() {
        let err = run_err("ENDWHILE");
        assert!(matches!(err, Error::Runtime { line: 1, .. }));
        let err = run_err("IF 1 > 0\nENDWHILE");
        assert!(matches!(err, Error::Runtime { line: 2, ref detail } if detail.contains("unbalanced ENDWHILE")));
        // mismatches are fatal in dead branches too
        let err = run_err("IF 1 > 2\nENDWHILE");
        assert!(matches!(err, Error::Runtime { line: 2, .. }));
    }

    #[test]
    fn checked_program_runs_without_syntax_errors() {
        let src = "\
size = 10
MOVE 20 20
COLOR BLUE
FILL ON
METHOD Square(side)
RECTANGLE side_METHOD side_METHOD
ENDMETHOD
WHILE size < 40
Square(size)
size = size + 10
ENDWHILE
WRITE \"done\"";
        assert!(check(src).is_ok());
        let (state, ops, _) = run_ok(src);
        assert_eq!(ops.iter().filter(|op| matches!(op, Op::Rectangle { .. })).count(), 3);
        assert_eq!(state.pen, Color::Blue);
        assert!(state.fill);
    }

    #[test]
    fn execute_line_applies_against_current_state() {
        let mut interp = Interpreter::new();
        let mut surface = RecordingSurface::new();
        interp.execute_line("r = 5", &mut surface).unwrap();
        interp.execute_line("MOVE 3 4", &mut surface).unwrap();
        interp.execute_line("CIRCLE r", &mut surface).unwrap();
        assert!(surface.ops.contains(&Op::Ellipse { x: 3, y: 4, r: 5, filled: false, color: Color::Black }));
        // state persists between single commands, there is no implicit reset
        assert_eq!(interp.variable("r"), Some(5));
        assert_eq!((interp.state().x, interp.state().y), (3, 4));
    }

    #[test]
    fn execute_line_rejects_control_flow_and_unknown_words() {
        let mut interp = Interpreter::new();
        let mut surface = RecordingSurface::new();
        assert!(matches!(
            interp.execute_line("IF 1 > 0", &mut surface),
            Err(Error::Syntax { .. })
        ));
        assert!(matches!(
            interp.execute_line("FOO 1", &mut surface),
            Err(Error::Unsupported { .. })
        ));
        assert!(matches!(
            interp.execute_line("CIRCLE -1", &mut surface),
            Err(Error::Syntax { .. })
        ));
        assert!(matches!(
            interp.execute_line("CIRCLE nope", &mut surface),
            Err(Error::Runtime { .. })
        ));
    }
}
