use crate::error::CompileError;
use crate::source::{Identifier, SourcePosition};
use crate::token::{Kind, Token};
use crate::translation::DEFAULT_LANGUAGE;

/// Command keywords recognized after `;`, matched by longest prefix.
const COMMANDS: [&str; 10] = [
    "lang", "if", "elseif", "else", "while ", "return", "call", "import", "export", "scene",
];

pub struct Lexer<'a> {
    source_code: &'a str,
    identifier: &'a Identifier,
    /// (cumulative width, pushed delta) for every open indentation level.
    indentation: Vec<(usize, usize)>,
    language: String,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, identifier: &'a Identifier) -> Self {
        Self {
            source_code: input,
            identifier,
            indentation: Vec::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, CompileError> {
        let mut line_count = 0;
        for (index, line) in self.source_code.split('\n').enumerate() {
            self.lex_line(index as u32, line)?;
            line_count = index as u32 + 1;
        }

        let end = SourcePosition::new(line_count, 0);
        while self.indentation.pop().is_some() {
            self.push(Kind::LeaveScope, end);
        }

        log::debug!(
            "{}: lexed {} token(s), active language {}",
            self.identifier.name,
            self.tokens.len(),
            self.language
        );
        Ok(self.tokens)
    }

    fn error(&self, position: SourcePosition, message: impl Into<String>) -> CompileError {
        CompileError::new(self.identifier, position, message)
    }

    fn push(&mut self, kind: Kind, position: SourcePosition) {
        self.tokens.push(Token::new(kind, position));
    }

    fn current_width(&self) -> usize {
        self.indentation.last().map(|(width, _)| *width).unwrap_or(0)
    }

    fn lex_line(&mut self, line: u32, text: &str) -> Result<(), CompileError> {
        let chars: Vec<char> = text.chars().collect();
        let indent = chars.iter().take_while(|c| **c == ' ' || **c == '\t').count();
        let rest = &chars[indent..];

        if rest.iter().all(|c| c.is_whitespace()) || rest.starts_with(&['/', '/']) {
            return Ok(());
        }
        if let Some(column) = chars[..indent].iter().position(|c| *c == '\t') {
            return Err(self.error(
                SourcePosition::new(line, column as u32),
                "tab characters are not allowed in indentation",
            ));
        }

        self.indent_to(line, indent)?;

        let start = SourcePosition::new(line, indent as u32);
        match rest[0] {
            '#' => self.lex_speaker_dialogue(start, &rest[1..])?,
            ';' => self.lex_command(line, &chars, indent)?,
            '[' | ']' | '@' | '\'' | '"' | '(' | ')' | '!' => self.lex_code(line, &chars, indent)?,
            c if c.is_ascii_digit() => self.lex_code(line, &chars, indent)?,
            '\\' => {
                let content: String = rest[1..].iter().collect();
                let content = content.trim_end().to_string();
                if content.is_empty() {
                    return Err(self.error(start, "dialogue content is empty"));
                }
                self.push(Kind::Dialogue { character: None, content }, start);
            }
            _ => {
                let content: String = rest.iter().collect();
                let content = content.trim_end().to_string();
                self.push(Kind::Dialogue { character: None, content }, start);
            }
        }

        self.push(Kind::LineBreak, SourcePosition::new(line, chars.len() as u32));
        Ok(())
    }

    fn indent_to(&mut self, line: u32, width: usize) -> Result<(), CompileError> {
        let position = SourcePosition::new(line, 0);
        let current = self.current_width();

        if width > current {
            self.indentation.push((width, width - current));
            self.push(Kind::CreateScope, position);
        } else if width < current {
            while let Some(&(level, _)) = self.indentation.last() {
                if level <= width {
                    break;
                }
                self.indentation.pop();
                self.push(Kind::LeaveScope, position);
            }

            let nearest = self.current_width();
            if nearest != width {
                return Err(self.error(
                    position,
                    format!(
                        "indentation of {} spaces does not match any enclosing block (nearest valid width is {})",
                        width, nearest
                    ),
                ));
            }
        }

        Ok(())
    }

    fn lex_speaker_dialogue(&mut self, start: SourcePosition, body: &[char]) -> Result<(), CompileError> {
        let speaker_length = body.iter().take_while(|c| !c.is_whitespace()).count();
        if speaker_length == 0 {
            return Err(self.error(start, "dialogue speaker after '#' is empty"));
        }

        let character: String = body[..speaker_length].iter().collect();
        let content: String = body[speaker_length..].iter().collect();
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(self.error(
                start,
                format!("dialogue content for speaker {:?} is empty", character),
            ));
        }

        self.push(
            Kind::Dialogue {
                character: Some(character),
                content,
            },
            start,
        );
        Ok(())
    }

    fn lex_command(&mut self, line: u32, chars: &[char], indent: usize) -> Result<(), CompileError> {
        let start = SourcePosition::new(line, indent as u32);
        let text: String = chars[indent + 1..].iter().collect();

        let keyword = COMMANDS
            .iter()
            .copied()
            .filter(|keyword| text.starts_with(keyword))
            .max_by_key(|keyword| keyword.len());

        let keyword = match keyword {
            Some(keyword) => keyword,
            None => {
                return Err(self.error(
                    start,
                    format!(
                        "unknown command {:?} (active language: {})",
                        text.trim(),
                        self.language
                    ),
                ))
            }
        };

        let kind = match keyword {
            "lang" => {
                let value = text[keyword.len()..].trim().to_string();
                if value.is_empty() {
                    return Err(self.error(start, "missing language name after ;lang"));
                }
                self.language = value.clone();
                self.push(Kind::Language(value), start);
                return Ok(());
            }
            "if" => Kind::If,
            "elseif" => Kind::ElseIf,
            "else" => Kind::Else,
            "while " => Kind::While,
            "return" => Kind::Return,
            "call" => Kind::Call,
            "import" => Kind::Import,
            "export" => Kind::Export,
            _ => Kind::Scene,
        };
        self.push(kind, start);

        let keyword_length = keyword.chars().count();
        self.lex_code(line, chars, indent + 1 + keyword_length)
    }

    fn lex_code(&mut self, line: u32, chars: &[char], from: usize) -> Result<(), CompileError> {
        let mut i = from;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();
            let position = SourcePosition::new(line, i as u32);

            match c {
                ' ' | '\t' => i += 1,
                '/' if next == Some('/') => break,
                '\'' | '"' => {
                    let (value, end) = self.lex_string(line, chars, i)?;
                    self.push(
                        Kind::String {
                            value,
                            translatable: c == '"',
                        },
                        position,
                    );
                    i = end;
                }
                c if c.is_ascii_digit() => {
                    let (kind, end) = self.lex_number(line, chars, i, false)?;
                    self.push(kind, position);
                    i = end;
                }
                '-' if next.map_or(false, |n| n.is_ascii_digit()) && !self.previous_ends_operand() => {
                    let (kind, end) = self.lex_number(line, chars, i, true)?;
                    self.push(kind, position);
                    i = end;
                }
                c if c.is_alphabetic() || c == '_' => {
                    let length = chars[i..]
                        .iter()
                        .take_while(|c| c.is_alphanumeric() || **c == '_')
                        .count();
                    let name: String = chars[i..i + length].iter().collect();
                    self.push(Kind::Identifier(name), position);
                    i += length;
                }
                _ => {
                    let (kind, width) = match (c, next) {
                        ('-', Some('>')) => (Kind::PickChild, 2),
                        ('+', Some('=')) => (Kind::AddAssign, 2),
                        ('-', Some('=')) => (Kind::SubtractAssign, 2),
                        ('*', Some('=')) => (Kind::MultiplyAssign, 2),
                        ('/', Some('=')) => (Kind::DivideAssign, 2),
                        ('>', Some('=')) => (Kind::GreaterEqual, 2),
                        ('<', Some('=')) => (Kind::LesserEqual, 2),
                        ('=', Some('=')) => (Kind::LogicEqual, 2),
                        ('!', Some('=')) => (Kind::LogicNotEqual, 2),
                        ('@', Some('#')) => (Kind::ConstantPrefix, 2),
                        ('+', _) => (Kind::Plus, 1),
                        ('-', _) => (Kind::Minus, 1),
                        ('*', _) => (Kind::Multiply, 1),
                        ('/', _) => (Kind::Divide, 1),
                        ('=', _) => (Kind::Assign, 1),
                        ('>', _) => (Kind::Greater, 1),
                        ('<', _) => (Kind::Lesser, 1),
                        ('!', _) => (Kind::LogicNot, 1),
                        ('(', _) => (Kind::LeftParenthesis, 1),
                        (')', _) => (Kind::RightParenthesis, 1),
                        ('[', _) => (Kind::LeftBracket, 1),
                        (']', _) => (Kind::RightBracket, 1),
                        ('@', _) => (Kind::VariablePrefix, 1),
                        _ => {
                            return Err(self.error(
                                position,
                                format!("unrecognized character {:?}", c),
                            ))
                        }
                    };
                    self.push(kind, position);
                    i += width;
                }
            }
        }

        Ok(())
    }

    fn previous_ends_operand(&self) -> bool {
        self.tokens
            .last()
            .map_or(false, |token| token.kind.ends_operand())
    }

    fn lex_string(&self, line: u32, chars: &[char], start: usize) -> Result<(String, usize), CompileError> {
        let quote = chars[start];
        let mut value = String::new();
        let mut i = start + 1;

        loop {
            let c = match chars.get(i) {
                Some(c) => *c,
                None => {
                    return Err(self.error(
                        SourcePosition::new(line, start as u32),
                        "unterminated string literal",
                    ))
                }
            };

            if c == quote {
                return Ok((value, i + 1));
            }

            if c == '\\' {
                i += 1;
                match chars.get(i) {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('s') => value.push(' '),
                    Some(other) => value.push(*other),
                    None => {
                        return Err(self.error(
                            SourcePosition::new(line, start as u32),
                            "unterminated string literal",
                        ))
                    }
                }
            } else {
                value.push(c);
            }
            i += 1;
        }
    }

    fn lex_number(
        &self,
        line: u32,
        chars: &[char],
        start: usize,
        negative: bool,
    ) -> Result<(Kind, usize), CompileError> {
        let position = SourcePosition::new(line, start as u32);
        let mut i = if negative { start + 1 } else { start };

        // `0x` introduces binary digits and `0b` hexadecimal ones.
        if chars[i] == '0' && matches!(chars.get(i + 1), Some('x') | Some('b')) {
            let (radix, name) = if chars[i + 1] == 'x' {
                (2, "binary")
            } else {
                (16, "hexadecimal")
            };
            i += 2;
            let length = chars[i..]
                .iter()
                .take_while(|c| c.is_alphanumeric() || **c == '_')
                .count();
            let digits: String = chars[i..i + length].iter().collect();
            if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
                return Err(self.error(
                    position,
                    format!("invalid {} literal {:?}", name, digits),
                ));
            }
            let value = u32::from_str_radix(&digits, radix).map_err(|_| {
                self.error(position, format!("{} literal {:?} is out of range", name, digits))
            })? as i32;
            let value = if negative { value.wrapping_neg() } else { value };
            return Ok((Kind::Integer(value), i + length));
        }

        let digits_start = i;
        let mut is_float = false;
        while chars.get(i).map_or(false, |c| c.is_ascii_digit()) {
            i += 1;
        }

        if chars.get(i) == Some(&'.') && chars.get(i + 1) != Some(&'.') {
            if !chars.get(i + 1).map_or(false, |c| c.is_ascii_digit()) {
                return Err(self.error(position, "expected digits after decimal point"));
            }
            is_float = true;
            i += 1;
            while chars.get(i).map_or(false, |c| c.is_ascii_digit()) {
                i += 1;
            }
            if chars.get(i) == Some(&'.') {
                return Err(self.error(position, "numeric literal has more than one decimal point"));
            }
        }

        if matches!(chars.get(i), Some('e') | Some('E')) {
            is_float = true;
            i += 1;
            if matches!(chars.get(i), Some('+') | Some('-')) {
                i += 1;
            }
            if !chars.get(i).map_or(false, |c| c.is_ascii_digit()) {
                return Err(self.error(position, "expected digits in exponent"));
            }
            while chars.get(i).map_or(false, |c| c.is_ascii_digit()) {
                i += 1;
            }
        }

        if chars.get(i).map_or(false, |c| c.is_alphanumeric() || *c == '_') {
            let length = chars[i..]
                .iter()
                .take_while(|c| c.is_alphanumeric() || **c == '_')
                .count();
            let text: String = chars[start..i + length].iter().collect();
            return Err(self.error(position, format!("invalid numeric literal {:?}", text)));
        }

        let digits: String = chars[digits_start..i].iter().collect();
        let text = if negative { format!("-{}", digits) } else { digits };

        let kind = if is_float {
            let value = text
                .parse::<f32>()
                .map_err(|_| self.error(position, format!("invalid float literal {:?}", text)))?;
            if !value.is_finite() {
                return Err(self.error(position, format!("float literal {:?} is out of range", text)));
            }
            Kind::Float(value)
        } else {
            let value = text.parse::<i32>().map_err(|_| {
                self.error(position, format!("integer literal {} is out of range", text))
            })?;
            Kind::Integer(value)
        };

        Ok((kind, i))
    }
}
