use thiserror::Error;

/// Typed runtime errors. The rendered messages are the diagnostic contract;
/// the fixture harness matches on substrings of them. Operand-type errors
/// name the operation only; the index errors embed the offending numbers,
/// and the condition error reports the type via `Value::type_name`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Variable '{name}' is undefined")]
    UndefinedValue { name: String },
    #[error("Variable '{name}' is not a list")]
    NotAList { name: String },
    #[error("List index must be an integer")]
    IndexNotInteger,
    #[error("List index cannot be negative (index: {index})")]
    NegativeIndex { index: i64 },
    #[error("List index out of range (index: {index}, size: {len})")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("{operation} requires integer operands")]
    IntegerOperands { operation: &'static str },
    #[error("Logical {operation} requires boolean operands")]
    BooleanOperands { operation: &'static str },
    #[error("Unary minus requires integer operand")]
    NegOperand,
    #[error("Logical not requires boolean operand")]
    NotOperand,
    #[error("Equality comparison requires same types")]
    MixedEquality,
    #[error("Cannot compare lists")]
    ListComparison,
    #[error("Expected boolean condition in '{construct}', got {got}")]
    NonBooleanCondition {
        construct: &'static str,
        got: &'static str,
    },
    #[error("'break' outside loop")]
    BreakOutsideLoop,
    #[error("'continue' outside loop")]
    ContinueOutsideLoop,
    #[error("Failed to write output: {message}")]
    Output { message: String },
}
