//! Tree-walking evaluator.
//!
//! Executes the AST directly: statements mutate the flat variable
//! environment, expressions produce `Value`s, and `break`/`continue`
//! propagate upward as `Flow` sentinels caught by the innermost `while`.

use std::collections::HashMap;
use std::io::Write;

use crate::ast::{BinaryOperator, Block, Expression, Program, Statement, UnaryOperator};

mod error;
mod value;

pub use error::RuntimeError;
pub use value::Value;

/// Control-flow marker for statement execution.
enum Flow {
    Normal,
    Break,
    Continue,
}

pub struct Interpreter<W> {
    variables: HashMap<String, Value>,
    in_loop: bool,
    out: W,
}

impl<W: Write> Interpreter<W> {
    pub fn new(out: W) -> Self {
        Self {
            variables: HashMap::new(),
            in_loop: false,
            out,
        }
    }

    /// Returns the output sink, consuming the interpreter.
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        match self.exec_statements(&program.statements)? {
            Flow::Normal => Ok(()),
            Flow::Break => Err(RuntimeError::BreakOutsideLoop),
            Flow::Continue => Err(RuntimeError::ContinueOutsideLoop),
        }
    }

    fn exec_statements(&mut self, statements: &[Statement]) -> Result<Flow, RuntimeError> {
        // Execute in order until a break/continue sentinel, then bubble it up.
        for statement in statements {
            match self.exec_statement(statement)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_block(&mut self, block: &Block) -> Result<Flow, RuntimeError> {
        self.exec_statements(&block.statements)
    }

    fn exec_statement(&mut self, statement: &Statement) -> Result<Flow, RuntimeError> {
        match statement {
            Statement::Assign { name, value } => {
                let value = self.eval_expression(value)?;
                self.variables.insert(name.clone(), value);
                Ok(Flow::Normal)
            }
            Statement::NewList { name } => {
                self.variables.insert(name.clone(), Value::List(Vec::new()));
                Ok(Flow::Normal)
            }
            Statement::AssignIndex { name, index, value } => {
                // The target is validated and the index bounds-checked before
                // the value expression runs; the list is never extended.
                let len = self.list_len(name)?;
                let idx = self.eval_index(index, len)?;
                let value = self.eval_expression(value)?;
                match self.variables.get_mut(name) {
                    Some(Value::List(items)) => items[idx] = value,
                    _ => return Err(RuntimeError::NotAList { name: name.clone() }),
                }
                Ok(Flow::Normal)
            }
            Statement::Append { name, value } => {
                self.list_len(name)?;
                let value = self.eval_expression(value)?;
                match self.variables.get_mut(name) {
                    Some(Value::List(items)) => items.push(value),
                    _ => return Err(RuntimeError::NotAList { name: name.clone() }),
                }
                Ok(Flow::Normal)
            }
            Statement::Print(expr) => {
                let value = self.eval_expression(expr)?;
                writeln!(self.out, "{}", value.to_output()).map_err(|error| {
                    RuntimeError::Output {
                        message: error.to_string(),
                    }
                })?;
                Ok(Flow::Normal)
            }
            Statement::Break => {
                if !self.in_loop {
                    return Err(RuntimeError::BreakOutsideLoop);
                }
                Ok(Flow::Break)
            }
            Statement::Continue => {
                if !self.in_loop {
                    return Err(RuntimeError::ContinueOutsideLoop);
                }
                Ok(Flow::Continue)
            }
            Statement::If {
                condition,
                then_block,
                elif_clauses,
                else_block,
            } => {
                if self.eval_condition(condition, "if")? {
                    return self.exec_block(then_block);
                }
                for clause in elif_clauses {
                    if self.eval_condition(&clause.condition, "elif")? {
                        return self.exec_block(&clause.block);
                    }
                }
                if let Some(block) = else_block {
                    return self.exec_block(block);
                }
                Ok(Flow::Normal)
            }
            Statement::While { condition, body } => {
                // The loop flag is restored on every exit path, including
                // error propagation out of the body.
                let was_in_loop = self.in_loop;
                self.in_loop = true;
                let result = self.run_loop(condition, body);
                self.in_loop = was_in_loop;
                result?;
                Ok(Flow::Normal)
            }
        }
    }

    fn run_loop(&mut self, condition: &Expression, body: &Block) -> Result<(), RuntimeError> {
        while self.eval_condition(condition, "while")? {
            match self.exec_block(body)? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => break,
            }
        }
        Ok(())
    }

    fn eval_condition(
        &mut self,
        expr: &Expression,
        construct: &'static str,
    ) -> Result<bool, RuntimeError> {
        // Conditions are strictly boolean: integers and lists are never truthy.
        match self.eval_expression(expr)? {
            Value::Boolean(value) => Ok(value),
            other => Err(RuntimeError::NonBooleanCondition {
                construct,
                got: other.type_name(),
            }),
        }
    }

    fn eval_expression(&mut self, expr: &Expression) -> Result<Value, RuntimeError> {
        match expr {
            Expression::Integer(value) => Ok(Value::Integer(*value)),
            Expression::Boolean(value) => Ok(Value::Boolean(*value)),
            Expression::Identifier(name) => match self.variables.get(name) {
                None => Err(RuntimeError::UndefinedVariable { name: name.clone() }),
                Some(Value::Undefined) => Err(RuntimeError::UndefinedValue { name: name.clone() }),
                Some(value) => Ok(value.clone()),
            },
            Expression::Index { name, index } => {
                let len = self.list_len(name)?;
                let idx = self.eval_index(index, len)?;
                match self.variables.get(name) {
                    Some(Value::List(items)) => Ok(items[idx].clone()),
                    _ => Err(RuntimeError::NotAList { name: name.clone() }),
                }
            }
            Expression::UnaryOp { op, operand } => {
                let operand = self.eval_expression(operand)?;
                match op {
                    UnaryOperator::Neg => match operand {
                        Value::Integer(value) => Ok(Value::Integer(value.wrapping_neg())),
                        _ => Err(RuntimeError::NegOperand),
                    },
                    UnaryOperator::Not => match operand {
                        Value::Boolean(value) => Ok(Value::Boolean(!value)),
                        _ => Err(RuntimeError::NotOperand),
                    },
                }
            }
            Expression::BinaryOp { left, op, right } => match op {
                BinaryOperator::And => {
                    let left = bool_operand(self.eval_expression(left)?, "AND")?;
                    if !left {
                        return Ok(Value::Boolean(false));
                    }
                    let right = bool_operand(self.eval_expression(right)?, "AND")?;
                    Ok(Value::Boolean(right))
                }
                BinaryOperator::Or => {
                    let left = bool_operand(self.eval_expression(left)?, "OR")?;
                    if left {
                        return Ok(Value::Boolean(true));
                    }
                    let right = bool_operand(self.eval_expression(right)?, "OR")?;
                    Ok(Value::Boolean(right))
                }
                _ => {
                    let left = self.eval_expression(left)?;
                    let right = self.eval_expression(right)?;
                    apply_binary(left, *op, right)
                }
            },
        }
    }

    /// Validates that `name` is bound to a list and returns its length.
    fn list_len(&self, name: &str) -> Result<usize, RuntimeError> {
        match self.variables.get(name) {
            None => Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
            }),
            Some(Value::List(items)) => Ok(items.len()),
            Some(_) => Err(RuntimeError::NotAList {
                name: name.to_string(),
            }),
        }
    }

    /// Evaluates an index expression and checks it against `0..len`.
    fn eval_index(&mut self, expr: &Expression, len: usize) -> Result<usize, RuntimeError> {
        let index = match self.eval_expression(expr)? {
            Value::Integer(value) => value,
            _ => return Err(RuntimeError::IndexNotInteger),
        };
        if index < 0 {
            return Err(RuntimeError::NegativeIndex { index });
        }
        if index as usize >= len {
            return Err(RuntimeError::IndexOutOfRange { index, len });
        }
        Ok(index as usize)
    }
}

fn int_operands(
    left: Value,
    right: Value,
    operation: &'static str,
) -> Result<(i64, i64), RuntimeError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Ok((a, b)),
        _ => Err(RuntimeError::IntegerOperands { operation }),
    }
}

fn bool_operand(value: Value, operation: &'static str) -> Result<bool, RuntimeError> {
    match value {
        Value::Boolean(value) => Ok(value),
        _ => Err(RuntimeError::BooleanOperands { operation }),
    }
}

fn equality(left: &Value, right: &Value) -> Result<bool, RuntimeError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Ok(a == b),
        (Value::Boolean(a), Value::Boolean(b)) => Ok(a == b),
        (Value::List(_), Value::List(_)) => Err(RuntimeError::ListComparison),
        _ => Err(RuntimeError::MixedEquality),
    }
}

fn apply_binary(left: Value, op: BinaryOperator, right: Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOperator::Add => {
            let (a, b) = int_operands(left, right, "Addition")?;
            Ok(Value::Integer(a.wrapping_add(b)))
        }
        BinaryOperator::Sub => {
            let (a, b) = int_operands(left, right, "Subtraction")?;
            Ok(Value::Integer(a.wrapping_sub(b)))
        }
        BinaryOperator::Mul => {
            let (a, b) = int_operands(left, right, "Multiplication")?;
            Ok(Value::Integer(a.wrapping_mul(b)))
        }
        BinaryOperator::FloorDiv => {
            let (a, b) = int_operands(left, right, "Division")?;
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Integer(a.wrapping_div(b)))
        }
        BinaryOperator::Less => {
            let (a, b) = int_operands(left, right, "Comparison")?;
            Ok(Value::Boolean(a < b))
        }
        BinaryOperator::LessEqual => {
            let (a, b) = int_operands(left, right, "Comparison")?;
            Ok(Value::Boolean(a <= b))
        }
        BinaryOperator::Greater => {
            let (a, b) = int_operands(left, right, "Comparison")?;
            Ok(Value::Boolean(a > b))
        }
        BinaryOperator::GreaterEqual => {
            let (a, b) = int_operands(left, right, "Comparison")?;
            Ok(Value::Boolean(a >= b))
        }
        BinaryOperator::Equal => Ok(Value::Boolean(equality(&left, &right)?)),
        BinaryOperator::NotEqual => Ok(Value::Boolean(!equality(&left, &right)?)),
        BinaryOperator::And | BinaryOperator::Or => {
            unreachable!("logical operators are evaluated with short-circuit")
        }
    }
}
