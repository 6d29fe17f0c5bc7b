//! Arithmetic tools: `add`, `subtract`, `multiply`, `divide`, `squareRoot`.
//!
//! Each reports `Result: <expression> = <value>`. Division by zero and the
//! square root of a negative number fail.

use async_trait::async_trait;
use reagent_core::error::ToolError;
use reagent_core::tool::{Tool, ToolSet};
use serde_json::{Value, json};

/// The math family as a single provider.
pub fn math_tools() -> ToolSet {
    ToolSet::new()
        .with(BinaryOpTool::new(BinaryOp::Add))
        .with(BinaryOpTool::new(BinaryOp::Subtract))
        .with(BinaryOpTool::new(BinaryOp::Multiply))
        .with(BinaryOpTool::new(BinaryOp::Divide))
        .with(SquareRootTool)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "×",
            Self::Divide => "÷",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Add => "Add two numbers.",
            Self::Subtract => "Subtract b from a.",
            Self::Multiply => "Multiply two numbers.",
            Self::Divide => "Divide a by b. b must not be 0.",
        }
    }

    fn apply(self, a: f64, b: f64) -> Result<f64, ToolError> {
        match self {
            Self::Add => Ok(a + b),
            Self::Subtract => Ok(a - b),
            Self::Multiply => Ok(a * b),
            Self::Divide if b == 0.0 => Err(ToolError::execution("divide", "Division by zero")),
            Self::Divide => Ok(a / b),
        }
    }
}

/// Two-operand arithmetic over `a` and `b`.
pub struct BinaryOpTool {
    op: BinaryOp,
}

impl BinaryOpTool {
    pub fn new(op: BinaryOp) -> Self {
        Self { op }
    }
}

#[async_trait]
impl Tool for BinaryOpTool {
    fn name(&self) -> &str {
        self.op.name()
    }

    fn description(&self) -> &str {
        self.op.description()
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": { "type": "number", "description": "First operand" },
                "b": { "type": "number", "description": "Second operand" }
            },
            "required": ["a", "b"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let a = number_arg(self.op.name(), &arguments, "a")?;
        let b = number_arg(self.op.name(), &arguments, "b")?;
        let value = self.op.apply(a, b)?;
        Ok(format!(
            "Result: {} {} {} = {}",
            format_number(a),
            self.op.symbol(),
            format_number(b),
            format_number(value)
        ))
    }
}

pub struct SquareRootTool;

#[async_trait]
impl Tool for SquareRootTool {
    fn name(&self) -> &str {
        "squareRoot"
    }

    fn description(&self) -> &str {
        "Compute the square root of a non-negative number."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "number": { "type": "number", "description": "A non-negative number" }
            },
            "required": ["number"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<String, ToolError> {
        let number = number_arg("squareRoot", &arguments, "number")?;
        if number < 0.0 {
            return Err(ToolError::execution(
                "squareRoot",
                "Cannot take the square root of a negative number",
            ));
        }
        Ok(format!("Result: √{} = {}", format_number(number), format_number(number.sqrt())))
    }
}

/// Read a numeric argument. Numeric strings are accepted too.
fn number_arg(tool: &str, arguments: &Value, key: &str) -> Result<f64, ToolError> {
    let value = &arguments[key];
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| ToolError::invalid_arguments(tool, format!("'{key}' must be a number, got {value}")))
}

/// Integral values print without a fractional part.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
