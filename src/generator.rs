use crate::ast::{BinaryOperator, ConditionBranch, Expression, ExpressionKind};
use crate::bytecode::OperationCode;
use crate::error::CompileError;
use crate::source::{Identifier, SourcePosition};
use crate::translation::TranslationTable;
use crate::writer::BinaryWriter;

/// Output of one compile: the artifact bytes and the translatable literals found in it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledScript {
    pub binary: Vec<u8>,
    pub translations: TranslationTable,
}

/// Whether an expression is evaluated for its value or used as an assignment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    Load,
    Store,
}

pub struct BytecodeGenerator<'a> {
    identifier: &'a Identifier,
    writer: BinaryWriter,
}

impl<'a> BytecodeGenerator<'a> {
    pub fn new(identifier: &'a Identifier) -> Self {
        Self {
            identifier,
            writer: BinaryWriter::new(identifier),
        }
    }

    pub fn generate(mut self, ast: &Expression) -> Result<CompiledScript, CompileError> {
        self.emit(ast, EmitMode::Load)?;
        let (binary, translations) = self.writer.finish(self.identifier.hash)?;
        Ok(CompiledScript {
            binary,
            translations,
        })
    }

    fn error(&self, position: SourcePosition, message: impl Into<String>) -> CompileError {
        CompileError::new(self.identifier, position, message)
    }

    fn op(&mut self, operation: OperationCode, position: SourcePosition) {
        self.writer.write_op(operation, position);
    }

    fn op_with_index(&mut self, operation: OperationCode, index: u32, position: SourcePosition) {
        self.writer.write_op(operation, position);
        self.writer.write_index(index);
    }

    fn emit(&mut self, expression: &Expression, mode: EmitMode) -> Result<(), CompileError> {
        if mode == EmitMode::Store {
            return self.emit_store(expression);
        }

        let position = expression.position;
        match &expression.kind {
            ExpressionKind::Scope { content } => {
                self.op(OperationCode::ScopeEnter, position);
                self.emit_sequence(content, position)?;
                self.op(OperationCode::ScopeLeave, position);
            }
            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => self.emit_binary(*operator, left, right, position)?,
            ExpressionKind::Call { target, parameters } => {
                self.emit_call(target, parameters, OperationCode::PluginCall, position)?
            }
            ExpressionKind::FunctionCall { target, parameters } => {
                self.emit_call(target, parameters, OperationCode::FunctionCall, position)?
            }
            ExpressionKind::Condition { branches } => self.emit_condition(branches, position)?,
            ExpressionKind::Constant { name } => match name.as_str() {
                "true" => self.op(OperationCode::PushTrue, position),
                "false" => self.op(OperationCode::PushFalse, position),
                "null" => self.op(OperationCode::PushNull, position),
                _ => {
                    let index = self.writer.add_string(name);
                    self.op_with_index(OperationCode::LoadConstant, index, position);
                }
            },
            ExpressionKind::Variable { name } => {
                let index = self.writer.add_string(name);
                self.op_with_index(OperationCode::LoadVariable, index, position);
            }
            ExpressionKind::Dialogue { character, content } => {
                self.emit(content, EmitMode::Load)?;
                match character {
                    Some(character) => self.emit(character, EmitMode::Load)?,
                    None => self.op(OperationCode::PushNull, position),
                }
                self.op(OperationCode::Dialogue, position);
            }
            ExpressionKind::Empty => self.op(OperationCode::PushNull, position),
            ExpressionKind::Integer { value } => self.emit_integer(*value, position),
            ExpressionKind::Float { value } => match OperationCode::immediate_float(*value) {
                Some(operation) => self.op(operation, position),
                None => {
                    self.op(OperationCode::PushFloat, position);
                    self.writer.write_float(*value);
                }
            },
            ExpressionKind::String {
                value,
                translatable: true,
            } => {
                let key = self.writer.add_translation(value, position)?;
                self.op(OperationCode::LoadTranslation, position);
                self.writer.write_key(key);
            }
            ExpressionKind::String {
                value,
                translatable: false,
            } => {
                let index = self.writer.add_string(value);
                self.op_with_index(OperationCode::PushString, index, position);
            }
            ExpressionKind::Language { value } => self.writer.set_language(value),
            ExpressionKind::LogicNot { content } => {
                self.emit(content, EmitMode::Load)?;
                self.op(OperationCode::LogicNot, position);
            }
            ExpressionKind::ToBoolean { value } => {
                self.emit(value, EmitMode::Load)?;
                self.op(OperationCode::ToBoolean, position);
            }
            ExpressionKind::Loop { condition, body } => self.emit_loop(condition, body, position)?,
            ExpressionKind::Function {
                name,
                parameters,
                body,
            } => self.emit_function(name, parameters, body, position)?,
            ExpressionKind::Parameter { name, .. } => {
                return Err(self.error(
                    position,
                    format!("parameter {:?} used outside of a call", name),
                ))
            }
            ExpressionKind::Return { value } => {
                self.emit(value, EmitMode::Load)?;
                self.op(OperationCode::Return, position);
            }
            ExpressionKind::Import { target } => {
                self.emit(target, EmitMode::Load)?;
                self.op(OperationCode::ScriptImport, position);
            }
            ExpressionKind::Export { name, value } => {
                self.emit(value, EmitMode::Load)?;
                let index = self.writer.add_string(name);
                self.op_with_index(OperationCode::ScriptExport, index, position);
            }
        }
        Ok(())
    }

    fn emit_store(&mut self, target: &Expression) -> Result<(), CompileError> {
        match &target.kind {
            ExpressionKind::Variable { name } => {
                let index = self.writer.add_string(name);
                self.op_with_index(OperationCode::StoreVariable, index, target.position);
            }
            ExpressionKind::Constant { name } => {
                return Err(self.error(
                    target.position,
                    format!("cannot assign to constant {:?}", name),
                ))
            }
            _ => {
                self.emit(target, EmitMode::Load)?;
                self.op(OperationCode::StoreMemory, target.position);
            }
        }
        Ok(())
    }

    fn emit_integer(&mut self, value: i32, position: SourcePosition) {
        match OperationCode::immediate_integer(value) {
            Some(operation) => self.op(operation, position),
            None => {
                self.op(OperationCode::PushInteger, position);
                self.writer.write_integer(value);
            }
        }
    }

    /// Every value but the last is popped. Directives produce none, so a sequence
    /// without values pushes null.
    fn emit_sequence(
        &mut self,
        content: &[Expression],
        position: SourcePosition,
    ) -> Result<(), CompileError> {
        let last_value = content.iter().rposition(Expression::produces_value);

        for (index, expression) in content.iter().enumerate() {
            self.emit(expression, EmitMode::Load)?;
            if expression.produces_value() && Some(index) != last_value {
                self.op(OperationCode::Pop, expression.position);
            }
        }

        if last_value.is_none() {
            self.op(OperationCode::PushNull, position);
        }
        Ok(())
    }

    fn emit_binary(
        &mut self,
        operator: BinaryOperator,
        left: &Expression,
        right: &Expression,
        position: SourcePosition,
    ) -> Result<(), CompileError> {
        self.emit(right, EmitMode::Load)?;

        if operator == BinaryOperator::Assign {
            return self.emit(left, EmitMode::Store);
        }
        if let Some(arithmetic) = operator.compound_operator() {
            self.emit(left, EmitMode::Load)?;
            self.op(binary_operation(arithmetic), position);
            return self.emit(left, EmitMode::Store);
        }

        self.emit(left, EmitMode::Load)?;
        self.op(binary_operation(operator), position);
        Ok(())
    }

    fn emit_call(
        &mut self,
        target: &Expression,
        parameters: &[Expression],
        operation: OperationCode,
        position: SourcePosition,
    ) -> Result<(), CompileError> {
        for parameter in parameters {
            let (name, value) = match &parameter.kind {
                ExpressionKind::Parameter { name, value } => (name, value),
                _ => return Err(self.error(parameter.position, "expected a named parameter")),
            };
            self.emit(value, EmitMode::Load)?;
            let index = self.writer.add_string(name);
            self.op_with_index(OperationCode::PushString, index, parameter.position);
        }

        self.emit_integer(parameters.len() as i32, position);
        self.emit(target, EmitMode::Load)?;
        self.op(operation, position);
        Ok(())
    }

    fn emit_condition(
        &mut self,
        branches: &[ConditionBranch],
        position: SourcePosition,
    ) -> Result<(), CompileError> {
        let end = self.writer.create_label(position);

        for (index, branch) in branches.iter().enumerate() {
            let is_final = index + 1 == branches.len();
            let next = if is_unconditional(&branch.condition) {
                None
            } else {
                let next = self.writer.create_label(branch.condition.position);
                self.emit(&branch.condition, EmitMode::Load)?;
                self.op(OperationCode::ToBoolean, branch.condition.position);
                self.op_with_index(OperationCode::BranchIfFalse, next, branch.condition.position);
                Some(next)
            };

            self.emit(&branch.body, EmitMode::Load)?;

            match next {
                Some(next) => {
                    self.op_with_index(OperationCode::Branch, end, branch.body.position);
                    self.writer.define_label(next)?;
                    if is_final {
                        self.op(OperationCode::PushNull, position);
                    }
                }
                None => {
                    if !is_final {
                        self.op_with_index(OperationCode::Branch, end, branch.body.position);
                    }
                }
            }

            // Branches after an `else` are unreachable.
            if next.is_none() {
                break;
            }
        }

        self.writer.define_label(end)
    }

    fn emit_loop(
        &mut self,
        condition: &Expression,
        body: &Expression,
        position: SourcePosition,
    ) -> Result<(), CompileError> {
        let top = self.writer.create_label(position);
        let end = self.writer.create_label(position);

        self.writer.define_label(top)?;
        self.emit(condition, EmitMode::Load)?;
        self.op(OperationCode::ToBoolean, condition.position);
        self.op_with_index(OperationCode::BranchIfFalse, end, condition.position);

        self.emit(body, EmitMode::Load)?;
        self.op(OperationCode::Pop, body.position);
        self.op_with_index(OperationCode::Branch, top, position);

        self.writer.define_label(end)?;
        self.op(OperationCode::PushNull, position);
        Ok(())
    }

    fn emit_function(
        &mut self,
        name: &str,
        parameters: &[Expression],
        body: &Expression,
        position: SourcePosition,
    ) -> Result<(), CompileError> {
        let skip = self.writer.create_label(position);
        let entry = self.writer.create_label(position);

        self.op_with_index(OperationCode::Branch, skip, position);
        self.writer.define_label(entry)?;

        for parameter in parameters {
            let (parameter_name, default) = match &parameter.kind {
                ExpressionKind::Parameter { name, value } => (name, value),
                _ => return Err(self.error(parameter.position, "expected a scene parameter")),
            };
            if default.kind == ExpressionKind::Empty {
                continue;
            }

            let at = parameter.position;
            let provided = self.writer.create_label(at);
            let index = self.writer.add_string(parameter_name);
            self.op_with_index(OperationCode::LoadVariable, index, at);
            self.op(OperationCode::PushNull, at);
            self.op(OperationCode::LogicEqual, at);
            self.op_with_index(OperationCode::BranchIfFalse, provided, at);
            self.emit(default, EmitMode::Load)?;
            self.op_with_index(OperationCode::StoreVariable, index, at);
            self.op(OperationCode::Pop, at);
            self.writer.define_label(provided)?;
        }

        match &body.kind {
            ExpressionKind::Scope { content } => self.emit_sequence(content, body.position)?,
            _ => self.emit(body, EmitMode::Load)?,
        }
        self.op(OperationCode::Return, body.position);
        self.writer.define_label(skip)?;

        self.op_with_index(OperationCode::LoadFunction, entry, position);
        let index = self.writer.add_string(name);
        self.op_with_index(OperationCode::StoreVariable, index, position);
        Ok(())
    }
}

fn is_unconditional(condition: &Expression) -> bool {
    matches!(&condition.kind, ExpressionKind::Constant { name } if name == "true")
}

fn binary_operation(operator: BinaryOperator) -> OperationCode {
    match operator {
        BinaryOperator::Add | BinaryOperator::AddAssign => OperationCode::Add,
        BinaryOperator::Subtract | BinaryOperator::SubtractAssign => OperationCode::Subtract,
        BinaryOperator::Multiply | BinaryOperator::MultiplyAssign => OperationCode::Multiply,
        BinaryOperator::Divide | BinaryOperator::DivideAssign => OperationCode::Divide,
        BinaryOperator::Greater => OperationCode::Greater,
        BinaryOperator::GreaterEqual => OperationCode::GreaterEqual,
        BinaryOperator::Lesser => OperationCode::Lesser,
        BinaryOperator::LesserEqual => OperationCode::LesserEqual,
        BinaryOperator::LogicEqual => OperationCode::LogicEqual,
        BinaryOperator::LogicNotEqual => OperationCode::LogicNotEqual,
        BinaryOperator::PickChild => OperationCode::PickChild,
        // handled by the store path before reaching here
        BinaryOperator::Assign => OperationCode::StoreMemory,
    }
}
