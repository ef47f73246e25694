/// Runtime value model. Lists own their elements, so `Clone` gives the deep
/// copy that assignment semantics require: mutating one binding never shows
/// through another.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    List(Vec<Value>),
    Undefined,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Boolean(_) => "bool",
            Value::List(_) => "list",
            Value::Undefined => "undefined",
        }
    }

    /// Rendering used by `print`: `True`/`False` for booleans, base-10 for
    /// integers, `[a, b, c]` for lists.
    pub fn to_output(&self) -> String {
        match self {
            Value::Integer(value) => value.to_string(),
            Value::Boolean(true) => "True".to_string(),
            Value::Boolean(false) => "False".to_string(),
            Value::List(values) => {
                let rendered = values
                    .iter()
                    .map(Value::to_output)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{rendered}]")
            }
            Value::Undefined => "undefined".to_string(),
        }
    }
}
