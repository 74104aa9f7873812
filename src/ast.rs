use crate::source::SourcePosition;
use crate::token::Kind;

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub position: SourcePosition,
    pub kind: ExpressionKind,
}

impl Expression {
    pub fn new(kind: ExpressionKind, position: SourcePosition) -> Self {
        Self { position, kind }
    }

    pub fn boxed(kind: ExpressionKind, position: SourcePosition) -> Box<Self> {
        Box::new(Self::new(kind, position))
    }

    /// Compile-time directives emit no code and leave nothing on the stack.
    pub fn produces_value(&self) -> bool {
        !matches!(self.kind, ExpressionKind::Language { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Scope {
        content: Vec<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Plugin invocation: `[name key=value ...]`.
    Call {
        target: Box<Expression>,
        parameters: Vec<Expression>,
    },
    /// Scene invocation: `;call name key=value ...`.
    FunctionCall {
        target: Box<Expression>,
        parameters: Vec<Expression>,
    },
    Condition {
        branches: Vec<ConditionBranch>,
    },
    Constant {
        name: String,
    },
    Variable {
        name: String,
    },
    Dialogue {
        character: Option<Box<Expression>>,
        content: Box<Expression>,
    },
    Empty,
    Integer {
        value: i32,
    },
    Float {
        value: f32,
    },
    String {
        value: String,
        translatable: bool,
    },
    Language {
        value: String,
    },
    LogicNot {
        content: Box<Expression>,
    },
    ToBoolean {
        value: Box<Expression>,
    },
    Loop {
        condition: Box<Expression>,
        body: Box<Expression>,
    },
    Function {
        name: String,
        parameters: Vec<Expression>,
        body: Box<Expression>,
    },
    Parameter {
        name: String,
        value: Box<Expression>,
    },
    Return {
        value: Box<Expression>,
    },
    Import {
        target: Box<Expression>,
    },
    Export {
        name: String,
        value: Box<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionBranch {
    pub condition: Expression,
    pub body: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Greater,
    GreaterEqual,
    Lesser,
    LesserEqual,
    LogicEqual,
    LogicNotEqual,
    PickChild,
}

impl BinaryOperator {
    pub fn from_token(kind: &Kind) -> Option<Self> {
        let operator = match kind {
            Kind::Assign => BinaryOperator::Assign,
            Kind::AddAssign => BinaryOperator::AddAssign,
            Kind::SubtractAssign => BinaryOperator::SubtractAssign,
            Kind::MultiplyAssign => BinaryOperator::MultiplyAssign,
            Kind::DivideAssign => BinaryOperator::DivideAssign,
            Kind::Plus => BinaryOperator::Add,
            Kind::Minus => BinaryOperator::Subtract,
            Kind::Multiply => BinaryOperator::Multiply,
            Kind::Divide => BinaryOperator::Divide,
            Kind::Greater => BinaryOperator::Greater,
            Kind::GreaterEqual => BinaryOperator::GreaterEqual,
            Kind::Lesser => BinaryOperator::Lesser,
            Kind::LesserEqual => BinaryOperator::LesserEqual,
            Kind::LogicEqual => BinaryOperator::LogicEqual,
            Kind::LogicNotEqual => BinaryOperator::LogicNotEqual,
            Kind::PickChild => BinaryOperator::PickChild,
            _ => return None,
        };
        Some(operator)
    }

    /// Lower binds looser.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Assign => 0,
            BinaryOperator::Greater
            | BinaryOperator::GreaterEqual
            | BinaryOperator::Lesser
            | BinaryOperator::LesserEqual => 1,
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::AddAssign
            | BinaryOperator::SubtractAssign => 2,
            BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::MultiplyAssign
            | BinaryOperator::DivideAssign => 3,
            BinaryOperator::LogicEqual | BinaryOperator::LogicNotEqual => 4,
            BinaryOperator::PickChild => 5,
        }
    }

    /// The arithmetic operator a compound assignment applies before storing.
    pub fn compound_operator(self) -> Option<BinaryOperator> {
        match self {
            BinaryOperator::AddAssign => Some(BinaryOperator::Add),
            BinaryOperator::SubtractAssign => Some(BinaryOperator::Subtract),
            BinaryOperator::MultiplyAssign => Some(BinaryOperator::Multiply),
            BinaryOperator::DivideAssign => Some(BinaryOperator::Divide),
            _ => None,
        }
    }

    pub fn is_assignment(self) -> bool {
        self == BinaryOperator::Assign || self.compound_operator().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_table() {
        assert_eq!(BinaryOperator::Assign.precedence(), 0);
        assert_eq!(BinaryOperator::Lesser.precedence(), 1);
        assert_eq!(BinaryOperator::AddAssign.precedence(), 2);
        assert_eq!(BinaryOperator::DivideAssign.precedence(), 3);
        assert_eq!(BinaryOperator::LogicNotEqual.precedence(), 4);
        assert_eq!(BinaryOperator::PickChild.precedence(), 5);
    }

    #[test]
    fn test_assignment_classification() {
        assert!(BinaryOperator::Assign.is_assignment());
        assert!(BinaryOperator::MultiplyAssign.is_assignment());
        assert!(!BinaryOperator::Multiply.is_assignment());
        assert_eq!(
            BinaryOperator::SubtractAssign.compound_operator(),
            Some(BinaryOperator::Subtract)
        );
        assert_eq!(BinaryOperator::from_token(&Kind::LogicNot), None);
    }
}
