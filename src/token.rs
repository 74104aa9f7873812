use crate::source::SourcePosition;

#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub position: SourcePosition,
    pub kind: Kind,
}

impl Token {
    pub fn new(kind: Kind, position: SourcePosition) -> Self {
        Self { position, kind }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Kind {
    // Layout
    LineBreak,
    CreateScope, // indentation increase
    LeaveScope,  // indentation decrease

    // Literals
    Integer(i32),
    Float(f32),
    String { value: String, translatable: bool },
    Identifier(String),

    // Quick dialogue lines
    Dialogue { character: Option<String>, content: String },

    // Commands (;xxx)
    Language(String), // ;lang
    If,               // ;if
    ElseIf,           // ;elseif
    Else,             // ;else
    While,            // ;while
    Return,           // ;return
    Call,             // ;call
    Import,           // ;import
    Export,           // ;export
    Scene,            // ;scene

    // Operators
    Plus,           // +
    Minus,          // -
    Multiply,       // *
    Divide,         // /
    Assign,         // =
    AddAssign,      // +=
    SubtractAssign, // -=
    MultiplyAssign, // *=
    DivideAssign,   // /=
    Greater,        // >
    GreaterEqual,   // >=
    Lesser,         // <
    LesserEqual,    // <=
    LogicEqual,     // ==
    LogicNotEqual,  // !=
    LogicNot,       // !
    PickChild,      // ->

    // Separators
    LeftParenthesis,  // (
    RightParenthesis, // )
    LeftBracket,      // [
    RightBracket,     // ]
    VariablePrefix,   // @
    ConstantPrefix,   // @#
}

impl Kind {
    /// True for tokens after which a `-` is a binary operator rather than a sign.
    pub fn ends_operand(&self) -> bool {
        matches!(
            self,
            Kind::Integer(_)
                | Kind::Float(_)
                | Kind::String { .. }
                | Kind::Identifier(_)
                | Kind::RightParenthesis
                | Kind::RightBracket
        )
    }

    pub fn describe(&self) -> String {
        match self {
            Kind::LineBreak => "line break".to_string(),
            Kind::CreateScope => "indented block".to_string(),
            Kind::LeaveScope => "end of block".to_string(),
            Kind::Integer(value) => format!("integer {}", value),
            Kind::Float(value) => format!("float {}", value),
            Kind::String { value, .. } => format!("string {:?}", value),
            Kind::Identifier(name) => format!("identifier {:?}", name),
            Kind::Dialogue { .. } => "dialogue".to_string(),
            Kind::Language(_) => ";lang".to_string(),
            Kind::If => ";if".to_string(),
            Kind::ElseIf => ";elseif".to_string(),
            Kind::Else => ";else".to_string(),
            Kind::While => ";while".to_string(),
            Kind::Return => ";return".to_string(),
            Kind::Call => ";call".to_string(),
            Kind::Import => ";import".to_string(),
            Kind::Export => ";export".to_string(),
            Kind::Scene => ";scene".to_string(),
            other => format!("{:?}", other.operator_text().unwrap_or("?")),
        }
    }

    fn operator_text(&self) -> Option<&'static str> {
        let text = match self {
            Kind::Plus => "+",
            Kind::Minus => "-",
            Kind::Multiply => "*",
            Kind::Divide => "/",
            Kind::Assign => "=",
            Kind::AddAssign => "+=",
            Kind::SubtractAssign => "-=",
            Kind::MultiplyAssign => "*=",
            Kind::DivideAssign => "/=",
            Kind::Greater => ">",
            Kind::GreaterEqual => ">=",
            Kind::Lesser => "<",
            Kind::LesserEqual => "<=",
            Kind::LogicEqual => "==",
            Kind::LogicNotEqual => "!=",
            Kind::LogicNot => "!",
            Kind::PickChild => "->",
            Kind::LeftParenthesis => "(",
            Kind::RightParenthesis => ")",
            Kind::LeftBracket => "[",
            Kind::RightBracket => "]",
            Kind::VariablePrefix => "@",
            Kind::ConstantPrefix => "@#",
            _ => return None,
        };
        Some(text)
    }
}

/// Immutable token sequence with a read cursor.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    cursor: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, cursor: 0 }
    }

    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    pub fn has_next(&self) -> bool {
        self.cursor < self.tokens.len()
    }

    pub fn move_to_next(&mut self) {
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Position of the current token, or of the last token once the stream is exhausted.
    pub fn position(&self) -> SourcePosition {
        self.current()
            .or_else(|| self.tokens.last())
            .map(|token| token.position)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: Kind) -> Token {
        Token::new(kind, SourcePosition::default())
    }

    #[test]
    fn test_stream_cursor() {
        let mut stream = TokenStream::new(vec![token(Kind::Integer(1)), token(Kind::LineBreak)]);
        assert!(stream.has_next());
        assert_eq!(stream.current().map(|t| &t.kind), Some(&Kind::Integer(1)));

        stream.move_to_next();
        stream.move_to_next();
        assert!(!stream.has_next());
        assert!(stream.current().is_none());

        stream.move_to_next();
        assert!(!stream.has_next());

        stream.reset();
        assert_eq!(stream.current().map(|t| &t.kind), Some(&Kind::Integer(1)));
    }

    #[test]
    fn test_ends_operand() {
        assert!(Kind::Integer(3).ends_operand());
        assert!(Kind::RightParenthesis.ends_operand());
        assert!(!Kind::Plus.ends_operand());
        assert!(!Kind::LeftParenthesis.ends_operand());
    }
}
