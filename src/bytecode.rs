/// One-byte opcodes of the VNS stack machine. Discriminants are part of the binary format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OperationCode {
    PushNull = 0,
    PushTrue = 1,
    PushFalse = 2,
    PushInteger = 3, // i32 LE operand
    PushInteger0 = 4,
    PushInteger1 = 5,
    PushInteger2 = 6,
    PushInteger3 = 7,
    PushInteger4 = 8,
    PushInteger5 = 9,
    PushInteger6 = 10,
    PushInteger7 = 11,
    PushInteger8 = 12,
    PushFloat = 13, // f32 LE operand
    PushFloat0_00 = 14,
    PushFloat0_25 = 15,
    PushFloat0_50 = 16,
    PushFloat0_75 = 17,
    PushFloat1_00 = 18,
    PushFloat1_25 = 19,
    PushFloat1_50 = 20,
    PushFloat1_75 = 21,
    PushFloat2_00 = 22,
    PushFloat2_25 = 23,
    PushFloat2_50 = 24,
    PushFloat2_75 = 25,
    PushFloat3_00 = 26,
    PushFloat3_25 = 27,
    PushFloat3_50 = 28,
    PushFloat3_75 = 29,
    PushFloat4_00 = 30,
    PushFloat4_25 = 31,
    PushFloat4_50 = 32,
    PushFloat4_75 = 33,
    PushFloat5_00 = 34,
    PushFloat5_25 = 35,
    PushFloat5_50 = 36,
    PushFloat5_75 = 37,
    PushString = 38, // 7-bit string pool index
    LoadTranslation = 39, // u32 LE translation key
    LoadVariable = 40, // 7-bit name index
    StoreVariable = 41, // 7-bit name index, keeps the value on the stack
    LoadConstant = 42, // 7-bit name index
    StoreMemory = 43, // pops a reference, stores the value below it
    Add = 44,
    Subtract = 45,
    Multiply = 46,
    Divide = 47,
    Greater = 48,
    GreaterEqual = 49,
    Lesser = 50,
    LesserEqual = 51,
    LogicEqual = 52,
    LogicNotEqual = 53,
    LogicNot = 54,
    ToBoolean = 55,
    PickChild = 56,
    Branch = 57, // 7-bit label id
    BranchIfTrue = 58, // 7-bit label id
    BranchIfFalse = 59, // 7-bit label id
    ScopeEnter = 60,
    ScopeLeave = 61,
    Pop = 62,
    LoadFunction = 63, // 7-bit entry label id
    FunctionCall = 64,
    PluginCall = 65,
    Return = 66,
    ScriptImport = 67,
    ScriptExport = 68, // 7-bit name index
    Dialogue = 69,
}

const ALL: [OperationCode; 70] = [
    OperationCode::PushNull,
    OperationCode::PushTrue,
    OperationCode::PushFalse,
    OperationCode::PushInteger,
    OperationCode::PushInteger0,
    OperationCode::PushInteger1,
    OperationCode::PushInteger2,
    OperationCode::PushInteger3,
    OperationCode::PushInteger4,
    OperationCode::PushInteger5,
    OperationCode::PushInteger6,
    OperationCode::PushInteger7,
    OperationCode::PushInteger8,
    OperationCode::PushFloat,
    OperationCode::PushFloat0_00,
    OperationCode::PushFloat0_25,
    OperationCode::PushFloat0_50,
    OperationCode::PushFloat0_75,
    OperationCode::PushFloat1_00,
    OperationCode::PushFloat1_25,
    OperationCode::PushFloat1_50,
    OperationCode::PushFloat1_75,
    OperationCode::PushFloat2_00,
    OperationCode::PushFloat2_25,
    OperationCode::PushFloat2_50,
    OperationCode::PushFloat2_75,
    OperationCode::PushFloat3_00,
    OperationCode::PushFloat3_25,
    OperationCode::PushFloat3_50,
    OperationCode::PushFloat3_75,
    OperationCode::PushFloat4_00,
    OperationCode::PushFloat4_25,
    OperationCode::PushFloat4_50,
    OperationCode::PushFloat4_75,
    OperationCode::PushFloat5_00,
    OperationCode::PushFloat5_25,
    OperationCode::PushFloat5_50,
    OperationCode::PushFloat5_75,
    OperationCode::PushString,
    OperationCode::LoadTranslation,
    OperationCode::LoadVariable,
    OperationCode::StoreVariable,
    OperationCode::LoadConstant,
    OperationCode::StoreMemory,
    OperationCode::Add,
    OperationCode::Subtract,
    OperationCode::Multiply,
    OperationCode::Divide,
    OperationCode::Greater,
    OperationCode::GreaterEqual,
    OperationCode::Lesser,
    OperationCode::LesserEqual,
    OperationCode::LogicEqual,
    OperationCode::LogicNotEqual,
    OperationCode::LogicNot,
    OperationCode::ToBoolean,
    OperationCode::PickChild,
    OperationCode::Branch,
    OperationCode::BranchIfTrue,
    OperationCode::BranchIfFalse,
    OperationCode::ScopeEnter,
    OperationCode::ScopeLeave,
    OperationCode::Pop,
    OperationCode::LoadFunction,
    OperationCode::FunctionCall,
    OperationCode::PluginCall,
    OperationCode::Return,
    OperationCode::ScriptImport,
    OperationCode::ScriptExport,
    OperationCode::Dialogue,
];

const IMMEDIATE_INTEGERS: [OperationCode; 9] = [
    OperationCode::PushInteger0,
    OperationCode::PushInteger1,
    OperationCode::PushInteger2,
    OperationCode::PushInteger3,
    OperationCode::PushInteger4,
    OperationCode::PushInteger5,
    OperationCode::PushInteger6,
    OperationCode::PushInteger7,
    OperationCode::PushInteger8,
];

/// Floats on the 0.25 grid from 0.0 to 5.75, in grid order.
const IMMEDIATE_FLOATS: [OperationCode; 24] = [
    OperationCode::PushFloat0_00,
    OperationCode::PushFloat0_25,
    OperationCode::PushFloat0_50,
    OperationCode::PushFloat0_75,
    OperationCode::PushFloat1_00,
    OperationCode::PushFloat1_25,
    OperationCode::PushFloat1_50,
    OperationCode::PushFloat1_75,
    OperationCode::PushFloat2_00,
    OperationCode::PushFloat2_25,
    OperationCode::PushFloat2_50,
    OperationCode::PushFloat2_75,
    OperationCode::PushFloat3_00,
    OperationCode::PushFloat3_25,
    OperationCode::PushFloat3_50,
    OperationCode::PushFloat3_75,
    OperationCode::PushFloat4_00,
    OperationCode::PushFloat4_25,
    OperationCode::PushFloat4_50,
    OperationCode::PushFloat4_75,
    OperationCode::PushFloat5_00,
    OperationCode::PushFloat5_25,
    OperationCode::PushFloat5_50,
    OperationCode::PushFloat5_75,
];

/// Shape of the bytes that follow an opcode in the code segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    /// 7-bit encoded index or label id.
    Index,
    Integer,
    Float,
    /// u32 LE translation key.
    Key,
}

impl OperationCode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        ALL.get(byte as usize).copied()
    }

    /// Dedicated single-byte opcode for integers 0 through 8.
    pub fn immediate_integer(value: i32) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|index| IMMEDIATE_INTEGERS.get(index).copied())
    }

    /// Dedicated single-byte opcode for floats exactly on the 0.25 grid from 0.0 to 5.75.
    pub fn immediate_float(value: f32) -> Option<Self> {
        let scaled = value * 4.0;
        if !(0.0..24.0).contains(&scaled) || scaled.fract() != 0.0 {
            return None;
        }
        IMMEDIATE_FLOATS.get(scaled as usize).copied()
    }

    pub fn operand(self) -> Operand {
        match self {
            OperationCode::PushInteger => Operand::Integer,
            OperationCode::PushFloat => Operand::Float,
            OperationCode::LoadTranslation => Operand::Key,
            OperationCode::PushString
            | OperationCode::LoadVariable
            | OperationCode::StoreVariable
            | OperationCode::LoadConstant
            | OperationCode::Branch
            | OperationCode::BranchIfTrue
            | OperationCode::BranchIfFalse
            | OperationCode::LoadFunction
            | OperationCode::ScriptExport => Operand::Index,
            _ => Operand::None,
        }
    }

    pub fn is_branch(self) -> bool {
        matches!(
            self,
            OperationCode::Branch | OperationCode::BranchIfTrue | OperationCode::BranchIfFalse
        )
    }
}
