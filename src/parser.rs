use crate::ast::{BinaryOperator, ConditionBranch, Expression, ExpressionKind};
use crate::error::CompileError;
use crate::source::{Identifier, SourcePosition};
use crate::token::{Kind, Token, TokenStream};

pub struct Parser<'a> {
    tokens: TokenStream,
    identifier: &'a Identifier,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, identifier: &'a Identifier) -> Self {
        Self {
            tokens: TokenStream::new(tokens),
            identifier,
        }
    }

    /// Parses the whole file as one implicit top-level block.
    pub fn parse(&mut self) -> Result<Expression, CompileError> {
        self.tokens.reset();
        let mut content = Vec::new();

        while self.tokens.has_next() {
            content.push(self.parse_statement()?);
        }

        log::debug!(
            "{}: parsed {} top-level statement(s)",
            self.identifier.name,
            content.len()
        );
        Ok(Expression::new(
            ExpressionKind::Scope { content },
            SourcePosition::default(),
        ))
    }

    fn error(&self, position: SourcePosition, message: impl Into<String>) -> CompileError {
        CompileError::new(self.identifier, position, message)
    }

    fn at(&self) -> Result<&Token, CompileError> {
        self.tokens
            .current()
            .ok_or_else(|| self.error(self.tokens.position(), "unexpected end of file"))
    }

    fn is_at(&self, kind: &Kind) -> bool {
        self.tokens.current().map_or(false, |token| &token.kind == kind)
    }

    fn next_token(&mut self) -> Result<Token, CompileError> {
        let token = self.at()?.clone();
        self.tokens.move_to_next();
        Ok(token)
    }

    fn eat(&mut self, expecting: Kind, context: &str) -> Result<Token, CompileError> {
        let found = match self.tokens.current() {
            Some(token) => token,
            None => {
                return Err(self.error(
                    self.tokens.position(),
                    format!(
                        "expected {} after {} but reached the end of file",
                        expecting.describe(),
                        context
                    ),
                ))
            }
        };

        if found.kind != expecting {
            return Err(self.error(
                found.position,
                format!(
                    "expected {} after {} but found {}",
                    expecting.describe(),
                    context,
                    found.kind.describe()
                ),
            ));
        }

        self.next_token()
    }

    fn parse_statement(&mut self) -> Result<Expression, CompileError> {
        let token = self.at()?.clone();

        match &token.kind {
            Kind::CreateScope => {
                self.tokens.move_to_next();
                return self.parse_block(token.position);
            }
            Kind::If => return self.parse_condition(),
            Kind::While => return self.parse_loop(),
            Kind::Scene => return self.parse_function(),
            Kind::Else | Kind::ElseIf => {
                return Err(self.error(
                    token.position,
                    format!("{} without a matching ;if", token.kind.describe()),
                ))
            }
            Kind::RightBracket | Kind::RightParenthesis => {
                return Err(self.error(
                    token.position,
                    format!("unexpected {} with nothing to close", token.kind.describe()),
                ))
            }
            Kind::LeaveScope => {
                return Err(self.error(token.position, "unexpected end of block"));
            }
            _ => {}
        }

        let expression = match token.kind {
            Kind::Language(value) => {
                self.tokens.move_to_next();
                Expression::new(ExpressionKind::Language { value }, token.position)
            }
            Kind::Dialogue { character, content } => {
                self.tokens.move_to_next();
                let character = character.map(|name| {
                    Expression::boxed(
                        ExpressionKind::String {
                            value: name,
                            translatable: false,
                        },
                        token.position,
                    )
                });
                let content = Expression::boxed(
                    ExpressionKind::String {
                        value: content,
                        translatable: true,
                    },
                    token.position,
                );
                Expression::new(ExpressionKind::Dialogue { character, content }, token.position)
            }
            Kind::Call => self.parse_function_call()?,
            Kind::Return => self.parse_return()?,
            Kind::Import => self.parse_import()?,
            Kind::Export => self.parse_export()?,
            _ => self.parse_expression(None)?,
        };

        self.eat(Kind::LineBreak, "statement")?;
        Ok(expression)
    }

    /// Parses statements until the `LeaveScope` matching an already consumed `CreateScope`.
    fn parse_block(&mut self, position: SourcePosition) -> Result<Expression, CompileError> {
        let mut content = Vec::new();

        loop {
            match self.tokens.current() {
                Some(token) if token.kind == Kind::LeaveScope => {
                    self.tokens.move_to_next();
                    break;
                }
                Some(_) => content.push(self.parse_statement()?),
                None => {
                    return Err(self.error(
                        self.tokens.position(),
                        "unexpected end of file inside block",
                    ))
                }
            }
        }

        Ok(Expression::new(ExpressionKind::Scope { content }, position))
    }

    fn parse_body(&mut self, context: &str) -> Result<Expression, CompileError> {
        let start = self.eat(Kind::CreateScope, context)?;
        self.parse_block(start.position)
    }

    fn parse_condition(&mut self) -> Result<Expression, CompileError> {
        let start = self.next_token()?;
        let mut branches = Vec::new();

        let condition = self.parse_expression(None)?;
        self.eat(Kind::LineBreak, ";if condition")?;
        let body = self.parse_body(";if")?;
        branches.push(ConditionBranch { condition, body });

        loop {
            if self.is_at(&Kind::ElseIf) {
                self.tokens.move_to_next();
                let condition = self.parse_expression(None)?;
                self.eat(Kind::LineBreak, ";elseif condition")?;
                let body = self.parse_body(";elseif")?;
                branches.push(ConditionBranch { condition, body });
            } else if self.is_at(&Kind::Else) {
                let token = self.next_token()?;
                self.eat(Kind::LineBreak, ";else")?;
                let body = self.parse_body(";else")?;
                let condition = Expression::new(
                    ExpressionKind::Constant {
                        name: "true".to_string(),
                    },
                    token.position,
                );
                branches.push(ConditionBranch { condition, body });
                break;
            } else {
                break;
            }
        }

        Ok(Expression::new(
            ExpressionKind::Condition { branches },
            start.position,
        ))
    }

    fn parse_loop(&mut self) -> Result<Expression, CompileError> {
        let start = self.next_token()?;
        let condition = self.parse_expression(None)?;
        self.eat(Kind::LineBreak, ";while condition")?;
        let body = self.parse_body(";while")?;

        Ok(Expression::new(
            ExpressionKind::Loop {
                condition: Box::new(condition),
                body: Box::new(body),
            },
            start.position,
        ))
    }

    fn parse_function(&mut self) -> Result<Expression, CompileError> {
        let start = self.next_token()?;
        let name = match self.next_token()? {
            Token {
                kind: Kind::Identifier(name),
                ..
            } => name,
            other => {
                return Err(self.error(
                    other.position,
                    format!("expected scene name but found {}", other.kind.describe()),
                ))
            }
        };

        let mut parameters = Vec::new();
        while self.tokens.has_next() && !self.is_at(&Kind::LineBreak) {
            parameters.push(self.parse_parameter(true)?);
        }
        self.eat(Kind::LineBreak, ";scene declaration")?;
        let body = self.parse_body(";scene")?;

        Ok(Expression::new(
            ExpressionKind::Function {
                name,
                parameters,
                body: Box::new(body),
            },
            start.position,
        ))
    }

    /// `name=value`. The name is parsed as an expression that stops at `=`.
    fn parse_parameter(&mut self, allow_missing_value: bool) -> Result<Expression, CompileError> {
        let name_expression = self.parse_expression(Some(Kind::Assign))?;
        let position = name_expression.position;
        let name = match name_expression.kind {
            ExpressionKind::Variable { name } => name,
            ExpressionKind::String {
                value,
                translatable: false,
            } => value,
            _ => return Err(self.error(position, "invalid parameter name")),
        };

        let value = if self.is_at(&Kind::Assign) {
            self.tokens.move_to_next();
            if self.is_at(&Kind::LineBreak) {
                return Err(self.error(
                    self.tokens.position(),
                    format!("missing value for parameter {:?}", name),
                ));
            }
            self.parse_expression(None)?
        } else if allow_missing_value {
            Expression::new(ExpressionKind::Empty, position)
        } else {
            return Err(self.error(
                position,
                format!("parameter {:?} requires a value", name),
            ));
        };

        Ok(Expression::new(
            ExpressionKind::Parameter {
                name,
                value: Box::new(value),
            },
            position,
        ))
    }

    fn parse_function_call(&mut self) -> Result<Expression, CompileError> {
        let start = self.next_token()?;
        let target = match self.at()?.clone() {
            Token {
                kind: Kind::Identifier(name),
                position,
            } => {
                self.tokens.move_to_next();
                Expression::new(ExpressionKind::Variable { name }, position)
            }
            _ => self.parse_operand()?,
        };

        let mut parameters = Vec::new();
        while self.tokens.has_next() && !self.is_at(&Kind::LineBreak) {
            parameters.push(self.parse_parameter(false)?);
        }

        Ok(Expression::new(
            ExpressionKind::FunctionCall {
                target: Box::new(target),
                parameters,
            },
            start.position,
        ))
    }

    fn parse_plugin_call(&mut self) -> Result<Expression, CompileError> {
        let start = self.next_token()?;
        let target = match self.at()?.clone() {
            Token {
                kind: Kind::Identifier(name),
                position,
            } => {
                self.tokens.move_to_next();
                Expression::new(
                    ExpressionKind::String {
                        value: name,
                        translatable: false,
                    },
                    position,
                )
            }
            _ => self.parse_operand()?,
        };

        let mut parameters = Vec::new();
        loop {
            match self.tokens.current().map(|token| &token.kind) {
                Some(Kind::RightBracket) => break,
                Some(Kind::LineBreak) | None => {
                    return Err(self.error(
                        self.tokens.position(),
                        "expected \"]\" to close plugin call",
                    ))
                }
                Some(_) => parameters.push(self.parse_parameter(true)?),
            }
        }
        self.eat(Kind::RightBracket, "plugin call")?;

        Ok(Expression::new(
            ExpressionKind::Call {
                target: Box::new(target),
                parameters,
            },
            start.position,
        ))
    }

    fn parse_return(&mut self) -> Result<Expression, CompileError> {
        let start = self.next_token()?;
        let value = if self.is_at(&Kind::LineBreak) {
            Expression::new(ExpressionKind::Empty, start.position)
        } else {
            self.parse_expression(None)?
        };

        Ok(Expression::new(
            ExpressionKind::Return {
                value: Box::new(value),
            },
            start.position,
        ))
    }

    fn parse_import(&mut self) -> Result<Expression, CompileError> {
        let start = self.next_token()?;
        let target = self.parse_expression(None)?;

        Ok(Expression::new(
            ExpressionKind::Import {
                target: Box::new(target),
            },
            start.position,
        ))
    }

    fn parse_export(&mut self) -> Result<Expression, CompileError> {
        let start = self.next_token()?;
        let (name, name_position) = match self.next_token()? {
            Token {
                kind: Kind::Identifier(name),
                position,
            } => (name, position),
            other => {
                return Err(self.error(
                    other.position,
                    format!("expected export name but found {}", other.kind.describe()),
                ))
            }
        };

        let value = if self.is_at(&Kind::LineBreak) {
            Expression::new(ExpressionKind::Variable { name: name.clone() }, name_position)
        } else {
            self.parse_expression(None)?
        };

        Ok(Expression::new(
            ExpressionKind::Export {
                name,
                value: Box::new(value),
            },
            start.position,
        ))
    }

    /// Parses a binary expression. `terminator`, when found, ends the expression without
    /// being consumed.
    pub(crate) fn parse_expression(&mut self, terminator: Option<Kind>) -> Result<Expression, CompileError> {
        let left = self.parse_unary()?;
        self.parse_binary(0, left, terminator.as_ref())
    }

    fn binary_operator(&self, terminator: Option<&Kind>) -> Option<BinaryOperator> {
        let token = self.tokens.current()?;
        if terminator == Some(&token.kind) {
            return None;
        }
        BinaryOperator::from_token(&token.kind)
    }

    fn parse_binary(
        &mut self,
        threshold: u8,
        mut left: Expression,
        terminator: Option<&Kind>,
    ) -> Result<Expression, CompileError> {
        loop {
            let operator = match self.binary_operator(terminator) {
                Some(operator) if operator.precedence() >= threshold => operator,
                _ => return Ok(left),
            };
            let operator_token = self.next_token()?;

            if self.is_at(&Kind::LineBreak) {
                return Err(self.error(
                    self.tokens.position(),
                    format!(
                        "line break after binary operator {}",
                        operator_token.kind.describe()
                    ),
                ));
            }

            let mut right = self.parse_unary()?;
            while let Some(next) = self.binary_operator(terminator) {
                if next.precedence() <= operator.precedence() {
                    break;
                }
                right = self.parse_binary(operator.precedence() + 1, right, terminator)?;
            }

            left = Expression::new(
                ExpressionKind::Binary {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                operator_token.position,
            );
        }
    }

    /// `!x` negates; two or more `!` collapse into a single boolean coercion.
    fn parse_unary(&mut self) -> Result<Expression, CompileError> {
        if !self.is_at(&Kind::LogicNot) {
            return self.parse_operand();
        }

        let position = self.at()?.position;
        let mut count = 0;
        while self.is_at(&Kind::LogicNot) {
            self.tokens.move_to_next();
            count += 1;
        }

        let operand = Box::new(self.parse_operand()?);
        let kind = if count == 1 {
            ExpressionKind::LogicNot { content: operand }
        } else {
            ExpressionKind::ToBoolean { value: operand }
        };
        Ok(Expression::new(kind, position))
    }

    fn parse_operand(&mut self) -> Result<Expression, CompileError> {
        let token = self.at()?.clone();
        let position = token.position;

        let kind = match token.kind {
            Kind::Integer(value) => ExpressionKind::Integer { value },
            Kind::Float(value) => ExpressionKind::Float { value },
            Kind::String {
                value,
                translatable,
            } => ExpressionKind::String {
                value,
                translatable,
            },
            Kind::Identifier(name) => match name.as_str() {
                "true" | "false" | "null" => ExpressionKind::Constant { name },
                _ => ExpressionKind::String {
                    value: name,
                    translatable: false,
                },
            },
            Kind::VariablePrefix => {
                self.tokens.move_to_next();
                let name = self.expect_name("variable name after \"@\"")?;
                return Ok(Expression::new(ExpressionKind::Variable { name }, position));
            }
            Kind::ConstantPrefix => {
                self.tokens.move_to_next();
                let name = self.expect_name("constant name after \"@#\"")?;
                return Ok(Expression::new(ExpressionKind::Constant { name }, position));
            }
            Kind::LeftParenthesis => {
                self.tokens.move_to_next();
                let expression = self.parse_expression(None)?;
                self.eat(Kind::RightParenthesis, "parenthesized expression")?;
                return Ok(expression);
            }
            Kind::LeftBracket => return self.parse_plugin_call(),
            Kind::LineBreak => {
                return Err(self.error(position, "expected an expression before line break"))
            }
            other => {
                return Err(self.error(
                    position,
                    format!("unexpected {}", other.describe()),
                ))
            }
        };

        self.tokens.move_to_next();
        Ok(Expression::new(kind, position))
    }

    fn expect_name(&mut self, what: &str) -> Result<String, CompileError> {
        match self.next_token()? {
            Token {
                kind: Kind::Identifier(name),
                ..
            } => Ok(name),
            other => Err(self.error(
                other.position,
                format!("expected {} but found {}", what, other.kind.describe()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use pretty_assertions::assert_eq;

    fn identifier() -> Identifier {
        Identifier::new("parser.vns", 7)
    }

    fn parse(source: &str) -> Result<Expression, CompileError> {
        let id = identifier();
        let tokens = Lexer::new(source, &id).tokenize()?;
        Parser::new(tokens, &id).parse()
    }

    /// Renders an expression as an s-expression so tests can ignore positions.
    fn show(expression: &Expression) -> String {
        let list = |items: &[Expression]| {
            items.iter().map(show).collect::<Vec<_>>().join(" ")
        };
        match &expression.kind {
            ExpressionKind::Scope { content } => format!("{{{}}}", list(content)),
            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => format!("({:?} {} {})", operator, show(left), show(right)),
            ExpressionKind::Call { target, parameters } => {
                format!("[call {} {}]", show(target), list(parameters))
            }
            ExpressionKind::FunctionCall { target, parameters } => {
                format!("[fcall {} {}]", show(target), list(parameters))
            }
            ExpressionKind::Condition { branches } => format!(
                "(cond {})",
                branches
                    .iter()
                    .map(|b| format!("({} {})", show(&b.condition), show(&b.body)))
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
            ExpressionKind::Constant { name } => format!("#{}", name),
            ExpressionKind::Variable { name } => format!("@{}", name),
            ExpressionKind::Dialogue { character, content } => match character {
                Some(character) => format!("(say {} {})", show(character), show(content)),
                None => format!("(say {})", show(content)),
            },
            ExpressionKind::Empty => "empty".to_string(),
            ExpressionKind::Integer { value } => value.to_string(),
            ExpressionKind::Float { value } => format!("{:?}", value),
            ExpressionKind::String {
                value,
                translatable,
            } => {
                if *translatable {
                    format!("{:?}", value)
                } else {
                    format!("'{}'", value)
                }
            }
            ExpressionKind::Language { value } => format!("(lang {})", value),
            ExpressionKind::LogicNot { content } => format!("(not {})", show(content)),
            ExpressionKind::ToBoolean { value } => format!("(bool {})", show(value)),
            ExpressionKind::Loop { condition, body } => {
                format!("(while {} {})", show(condition), show(body))
            }
            ExpressionKind::Function {
                name,
                parameters,
                body,
            } => format!("(scene {} ({}) {})", name, list(parameters), show(body)),
            ExpressionKind::Parameter { name, value } => format!("{}={}", name, show(value)),
            ExpressionKind::Return { value } => format!("(return {})", show(value)),
            ExpressionKind::Import { target } => format!("(import {})", show(target)),
            ExpressionKind::Export { name, value } => format!("(export {} {})", name, show(value)),
        }
    }

    fn parse_show(source: &str) -> String {
        show(&parse(source).unwrap())
    }

    #[test]
    fn test_precedence_climbing() {
        assert_eq!(parse_show("1 + 2 * 3"), "{(Add 1 (Multiply 2 3))}");
        assert_eq!(parse_show("1 * 2 + 3"), "{(Add (Multiply 1 2) 3)}");
        assert_eq!(parse_show("1 - 2 - 3"), "{(Subtract (Subtract 1 2) 3)}");
        assert_eq!(
            parse_show("@a = 1 + 2 > 3"),
            "{(Assign @a (Greater (Add 1 2) 3))}"
        );
        assert_eq!(
            parse_show("@a -> b -> c"),
            "{(PickChild (PickChild @a 'b') 'c')}"
        );
        assert_eq!(
            parse_show("(1 + 2) * 3 == 9"),
            "{(Multiply (Add 1 2) (LogicEqual 3 9))}"
        );
    }

    #[test]
    fn test_logic_not_flattening() {
        assert_eq!(parse_show("!@x"), "{(not @x)}");
        assert_eq!(parse_show("!!@x"), "{(bool @x)}");
        assert_eq!(parse_show("!!!!@x"), "{(bool @x)}");
    }

    #[test]
    fn test_condition_branches() {
        let source = ";if @a > 1\n  'a'\n;elseif @a > 0\n  'b'\n;else\n  'c'\n'd'";
        assert_eq!(
            parse_show(source),
            "{(cond ((Greater @a 1) {'a'}) ((Greater @a 0) {'b'}) (#true {'c'})) 'd'}"
        );
    }

    #[test]
    fn test_loop_and_nested_scope() {
        assert_eq!(
            parse_show(";while @i < 3\n  @i += 1\n    'nested'"),
            "{(while (Lesser @i 3) {(AddAssign @i 1) {'nested'}})}"
        );
    }

    #[test]
    fn test_scene_declaration() {
        assert_eq!(
            parse_show(";scene greet @name @times=2\n  #Bob \"Hi!\"\n  ;return @times"),
            "{(scene greet (name=empty times=2) {(say 'Bob' \"\\\"Hi!\\\"\") (return @times)})}"
        );
    }

    #[test]
    fn test_plugin_and_function_calls() {
        assert_eq!(
            parse_show("[show image='bg.png' fade]"),
            "{[call 'show' image='bg.png' fade=empty]}"
        );
        assert_eq!(
            parse_show("@r = [random max=3]"),
            "{(Assign @r [call 'random' max=3])}"
        );
        assert_eq!(
            parse_show(";call greet name='Ann' times=1 + 1"),
            "{[fcall @greet name='Ann' times=(Add 1 1)]}"
        );
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            parse_show(";lang en\n;import 'common'\n;export hero\n;export level 3\n;return"),
            "{(lang en) (import 'common') (export hero @hero) (export level 3) (return empty)}"
        );
    }

    #[test]
    fn test_dialogue_and_symbols() {
        assert_eq!(
            parse_show("Hello.\n#Amy Bye.\n[move to=left]\n@#flag == null"),
            "{(say \"Hello.\") (say 'Amy' \"Bye.\") [call 'move' to='left'] (LogicEqual #flag #null)}"
        );
    }

    #[test]
    fn test_function_call_requires_values() {
        let error = parse(";call greet name").unwrap_err();
        assert_eq!(error.message, "parameter \"name\" requires a value");
    }

    #[test]
    fn test_stray_control_tokens() {
        let error = parse(";else\n  1").unwrap_err();
        assert_eq!(error.message, ";else without a matching ;if");

        let error = parse("1\n;elseif 2\n  3").unwrap_err();
        assert_eq!(error.message, ";elseif without a matching ;if");

        let error = parse("1 ]").unwrap_err();
        assert!(error.message.contains("expected line break"), "{}", error);

        let error = parse("[show]\n]").unwrap_err();
        assert_eq!(error.message, "unexpected \"]\" with nothing to close");
        assert_eq!(error.position, SourcePosition::new(1, 0));

        let error = parse(";if @a\n    1\n    )").unwrap_err();
        assert_eq!(error.message, "unexpected \")\" with nothing to close");
    }

    #[test]
    fn test_line_break_after_operator() {
        let error = parse("@a = 1 +\n2").unwrap_err();
        assert_eq!(error.message, "line break after binary operator \"+\"");
        assert_eq!(error.position, SourcePosition::new(0, 8));
    }

    #[test]
    fn test_missing_tokens() {
        let error = parse("[show a=1").unwrap_err();
        assert_eq!(error.message, "expected \"]\" to close plugin call");

        let error = parse(";if 1\n2").unwrap_err();
        assert_eq!(
            error.message,
            "expected indented block after ;if but found integer 2"
        );

        let error = parse("(1 + 2").unwrap_err();
        assert!(error.message.starts_with("expected \")\" after parenthesized expression"));
    }

    #[test]
    fn test_unexpected_token() {
        let error = parse("@a = )").unwrap_err();
        assert_eq!(error.message, "unexpected \")\"");

        let error = parse("@ 1").unwrap_err();
        assert_eq!(
            error.message,
            "expected variable name after \"@\" but found integer 1"
        );
    }
}
