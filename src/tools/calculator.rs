//! Basic arithmetic tool.

use async_trait::async_trait;
use serde_json::json;

use crate::error::{Error, Result};
use crate::mcp::handler::{get_number_arg, get_string_arg, json_content, ToolHandler};
use crate::mcp::protocol::{Arguments, ContentBlock, Tool};

/// Arithmetic operation supported by the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "subtract" => Ok(Self::Subtract),
            "multiply" => Ok(Self::Multiply),
            "divide" => Ok(Self::Divide),
            _ => Err(Error::InvalidToolArguments(format!(
                "Unsupported operation: {}",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }

    /// Apply the operation. Division by zero is an error, never infinity.
    pub fn apply(&self, a: f64, b: f64) -> Result<f64> {
        match self {
            Self::Add => Ok(a + b),
            Self::Subtract => Ok(a - b),
            Self::Multiply => Ok(a * b),
            Self::Divide if b == 0.0 => Err(Error::ToolExecutionFailed(
                "Division by zero is not allowed".to_string(),
            )),
            Self::Divide => Ok(a / b),
        }
    }
}

/// Calculator tool.
#[derive(Debug, Default)]
pub struct CalculatorTool;

impl CalculatorTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolHandler for CalculatorTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "calculator".to_string(),
            description: "Perform basic mathematical calculations (addition, subtraction, multiplication, division)".to_string(),
            input_schema: crate::tool_schema!(
                required: ["operation", "a", "b"],
                "operation": {
                    "type": "string",
                    "description": "Mathematical operation to perform",
                    "enum": ["add", "subtract", "multiply", "divide"]
                },
                "a": {
                    "type": "number",
                    "description": "First operand"
                },
                "b": {
                    "type": "number",
                    "description": "Second operand"
                }
            ),
        }
    }

    async fn execute(&self, args: Arguments) -> Result<Vec<ContentBlock>> {
        let operation = Operation::parse(&get_string_arg(&args, "operation")?)?;
        let a = get_number_arg(&args, "a")?;
        let b = get_number_arg(&args, "b")?;

        let result = operation.apply(a, b)?;
        tracing::info!("Calculator: {} {} {} = {}", a, operation.as_str(), b, result);

        Ok(vec![json_content(&json!({
            "operation": operation.as_str(),
            "operands": { "a": a, "b": b },
            "result": result,
            "expression": format!("{:.2} {} {:.2} = {:.2}", a, operation.symbol(), b, result),
        }))?])
    }
}
