use serde::Serialize;

/// The fixed pen palette plus the canvas background. COLOR only accepts the
/// four pen names; the background is reserved for CLEAR and RESET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    Blue,
    Red,
    Green,
    LightGray,
}

/// Background color used by CLEAR and RESET.
pub const BACKGROUND: Color = Color::LightGray;

/// Pen color names accepted by COLOR, in the order they are reported.
pub const PALETTE: [&str; 4] = ["BLACK", "BLUE", "RED", "GREEN"];

impl Color {
    /// Look up a pen color by its (uppercase) command argument.
    pub fn pen(word: &str) -> Option<Color> {
        match word {
            "BLACK" => Some(Color::Black),
            "BLUE" => Some(Color::Blue),
            "RED" => Some(Color::Red),
            "GREEN" => Some(Color::Green),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::Blue => "blue",
            Color::Red => "red",
            Color::Green => "green",
            Color::LightGray => "lightgray",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Drawing backend borrowed by the interpreter for the duration of a run.
/// The interpreter only issues these primitives; it never reads pixels back.
pub trait Surface {
    fn move_to(&mut self, x: i32, y: i32);
    fn line_to(&mut self, x: i32, y: i32);
    fn rectangle(&mut self, x: i32, y: i32, w: i32, h: i32, filled: bool, color: Color);
    fn ellipse(&mut self, x: i32, y: i32, r: i32, filled: bool, color: Color);
    fn polygon(&mut self, points: &[(i32, i32)], filled: bool, color: Color);
    fn text(&mut self, x: i32, y: i32, text: &str, size: i32, color: Color);
    fn clear(&mut self, background: Color);
}

/// One recorded primitive call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    MoveTo { x: i32, y: i32 },
    LineTo { x: i32, y: i32 },
    Rectangle { x: i32, y: i32, w: i32, h: i32, filled: bool, color: Color },
    Ellipse { x: i32, y: i32, r: i32, filled: bool, color: Color },
    Polygon { points: Vec<(i32, i32)>, filled: bool, color: Color },
    Text { x: i32, y: i32, text: String, size: i32, color: Color },
    Clear { background: Color },
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn fill(filled: bool) -> &'static str {
            if filled {
                "filled"
            } else {
                "outline"
            }
        }
        match self {
            Op::MoveTo { x, y } => write!(f, "move_to {} {}", x, y),
            Op::LineTo { x, y } => write!(f, "line_to {} {}", x, y),
            Op::Rectangle { x, y, w, h, filled, color } => {
                write!(f, "rectangle {} {} {}x{} {} {}", x, y, w, h, fill(*filled), color)
            }
            Op::Ellipse { x, y, r, filled, color } => {
                write!(f, "ellipse {} {} r={} {} {}", x, y, r, fill(*filled), color)
            }
            Op::Polygon { points, filled, color } => {
                write!(f, "polygon")?;
                for (x, y) in points {
                    write!(f, " {},{}", x, y)?;
                }
                write!(f, " {} {}", fill(*filled), color)
            }
            Op::Text { x, y, text, size, color } => {
                write!(f, "text {} {} {:?} size={} {}", x, y, text, size, color)
            }
            Op::Clear { background } => write!(f, "clear {}", background),
        }
    }
}

/// Headless surface that records every primitive call instead of drawing.
/// The default backend for the CLI and the test double for the interpreter.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<Op>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Surface for RecordingSurface {
    fn move_to(&mut self, x: i32, y: i32) {
        self.ops.push(Op::MoveTo { x, y });
    }

    fn line_to(&mut self, x: i32, y: i32) {
        self.ops.push(Op::LineTo { x, y });
    }

    fn rectangle(&mut self, x: i32, y: i32, w: i32, h: i32, filled: bool, color: Color) {
        self.ops.push(Op::Rectangle { x, y, w, h, filled, color });
    }

    fn ellipse(&mut self, x: i32, y: i32, r: i32, filled: bool, color: Color) {
        self.ops.push(Op::Ellipse { x, y, r, filled, color });
    }

    fn polygon(&mut self, points: &[(i32, i32)], filled: bool, color: Color) {
        self.ops.push(Op::Polygon { points: points.to_vec(), filled, color });
    }

    fn text(&mut self, x: i32, y: i32, text: &str, size: i32, color: Color) {
        self.ops.push(Op::Text { x, y, text: text.to_string(), size, color });
    }

    fn clear(&mut self, background: Color) {
        self.ops.push(Op::Clear { background });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let mut s = RecordingSurface::new();
        s.clear(BACKGROUND);
        s.move_to(1, 2);
        s.line_to(3, 4);
        assert_eq!(
            s.ops,
            vec![
                Op::Clear { background: Color::LightGray },
                Op::MoveTo { x: 1, y: 2 },
                Op::LineTo { x: 3, y: 4 },
            ]
        );
    }

    #[test]
    fn pen_lookup_is_uppercase_only() {
        assert_eq!(Color::pen("RED"), Some(Color::Red));
        assert_eq!(Color::pen("red"), None);
        assert_eq!(Color::pen("LIGHTGRAY"), None);
    }
}
