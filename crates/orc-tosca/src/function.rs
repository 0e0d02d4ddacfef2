//! Value assignments and intrinsic functions
//!
//! A value assignment is either a literal [`Value`] or a function call such
//! as `{ get_operation_output: [SELF, Standard, create, ip] }`. Functions
//! may nest: `{ concat: ["http://", { get_attribute: [HOST, public_address] }] }`.

use crate::value::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// `get_operation_output` operator
pub const GET_OPERATION_OUTPUT: &str = "get_operation_output";
/// `get_attribute` operator
pub const GET_ATTRIBUTE: &str = "get_attribute";
/// `get_property` operator
pub const GET_PROPERTY: &str = "get_property";
/// `get_input` operator
pub const GET_INPUT: &str = "get_input";
/// `concat` operator
pub const CONCAT: &str = "concat";

/// Every recognized operator
pub const OPERATORS: &[&str] = &[GET_OPERATION_OUTPUT, GET_ATTRIBUTE, GET_PROPERTY, GET_INPUT, CONCAT];

/// Entity keyword designating the node or relationship itself
pub const SELF: &str = "SELF";
/// Entity keyword designating the relationship source
pub const SOURCE: &str = "SOURCE";
/// Entity keyword designating the relationship target
pub const TARGET: &str = "TARGET";
/// Entity keyword designating the hosting node
pub const HOST: &str = "HOST";

/// Operand of a function call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Literal text
    Literal(String),
    /// Nested call
    Function(Function),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => f.write_str(s),
            Self::Function(func) => write!(f, "{func}"),
        }
    }
}

/// Function call: operator plus ordered operands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Operator name
    pub operator: String,
    /// Ordered operands
    pub operands: Vec<Operand>,
}

impl Function {
    /// Create function with literal operands
    #[must_use]
    pub fn new<I, S>(operator: impl Into<String>, operands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operator: operator.into(),
            operands: operands
                .into_iter()
                .map(|s| Operand::Literal(s.into()))
                .collect(),
        }
    }

    /// Every call with `operator`, this one included, depth first
    #[must_use]
    pub fn functions_by_operator(&self, operator: &str) -> Vec<&Function> {
        let mut found = Vec::new();
        self.collect(operator, &mut found);
        found
    }

    fn collect<'a>(&'a self, operator: &str, found: &mut Vec<&'a Function>) {
        if self.operator == operator {
            found.push(self);
        }
        for operand in &self.operands {
            if let Operand::Function(nested) = operand {
                nested.collect(operator, found);
            }
        }
    }

    /// Operand rendered as text
    #[must_use]
    pub fn operand(&self, index: usize) -> Option<String> {
        self.operands.get(index).map(ToString::to_string)
    }

    /// Encode as a single-entry map value
    #[must_use]
    pub fn to_value(&self) -> Value {
        let operands = self
            .operands
            .iter()
            .map(|op| match op {
                Operand::Literal(s) => Value::Scalar(s.clone()),
                Operand::Function(nested) => nested.to_value(),
            })
            .collect();
        let mut map = BTreeMap::new();
        map.insert(self.operator.clone(), Value::List(operands));
        Value::Map(map)
    }

    /// Decode a single-entry map whose key is a known operator
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let Value::Map(map) = value else {
            return None;
        };
        if map.len() != 1 {
            return None;
        }
        let (operator, args) = map.iter().next()?;
        if !OPERATORS.contains(&operator.as_str()) {
            return None;
        }

        let operands = match args {
            Value::List(items) => items.iter().map(operand_from_value).collect(),
            Value::Null => Vec::new(),
            other => vec![operand_from_value(other)],
        };
        Some(Self {
            operator: operator.clone(),
            operands,
        })
    }
}

fn operand_from_value(value: &Value) -> Operand {
    match Function::from_value(value) {
        Some(nested) => Operand::Function(nested),
        None => Operand::Literal(value.to_string()),
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [", self.operator)?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{operand}")?;
        }
        f.write_str("]")
    }
}

/// Literal value or function call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueAssignment {
    /// Literal value
    Literal(Value),
    /// Function call
    Function(Function),
}

impl ValueAssignment {
    /// Create literal scalar assignment
    #[inline]
    #[must_use]
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(Value::Scalar(s.into()))
    }

    /// Function call, if this is one
    #[inline]
    #[must_use]
    pub fn function(&self) -> Option<&Function> {
        match self {
            Self::Function(f) => Some(f),
            Self::Literal(_) => None,
        }
    }

    /// Literal value, if this is one
    #[inline]
    #[must_use]
    pub fn literal_value(&self) -> Option<&Value> {
        match self {
            Self::Literal(v) => Some(v),
            Self::Function(_) => None,
        }
    }

    /// Classify a raw value
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match Function::from_value(&value) {
            Some(f) => Self::Function(f),
            None => Self::Literal(value),
        }
    }

    /// Encode as a raw value
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Literal(v) => v.clone(),
            Self::Function(f) => f.to_value(),
        }
    }
}

impl From<Function> for ValueAssignment {
    fn from(f: Function) -> Self {
        Self::Function(f)
    }
}

impl From<Value> for ValueAssignment {
    fn from(v: Value) -> Self {
        Self::from_value(v)
    }
}

impl Serialize for ValueAssignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValueAssignment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_function_from_yaml() {
        let va: ValueAssignment =
            serde_yaml::from_str("{ get_operation_output: [SELF, Standard, create, ip] }").unwrap();
        let f = va.function().unwrap();
        assert_eq!(f.operator, GET_OPERATION_OUTPUT);
        assert_eq!(f.operands.len(), 4);
        assert_eq!(f.operand(3).as_deref(), Some("ip"));
    }

    #[test]
    fn unknown_single_key_map_is_literal() {
        let va: ValueAssignment = serde_yaml::from_str("{ size: 10 }").unwrap();
        assert!(va.literal_value().is_some());
    }

    #[test]
    fn finds_nested_functions() {
        let va: ValueAssignment = serde_yaml::from_str(
            "concat: [\"http://\", { get_operation_output: [HOST, Standard, start, url] }, { get_operation_output: [SELF, Standard, create, port] }]",
        )
        .unwrap();
        let f = va.function().unwrap();
        let outputs = f.functions_by_operator(GET_OPERATION_OUTPUT);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].operand(0).as_deref(), Some(HOST));
        assert!(f.functions_by_operator(GET_ATTRIBUTE).is_empty());
    }

    #[test]
    fn json_round_trip_keeps_function() {
        let f = Function::new(GET_ATTRIBUTE, ["HOST", "private_address"]);
        let va = ValueAssignment::from(f.clone());
        let json = serde_json::to_string(&va).unwrap();
        let back: ValueAssignment = serde_json::from_str(&json).unwrap();
        assert_eq!(back.function(), Some(&f));
    }

    #[test]
    fn display() {
        let f = Function::new(GET_OPERATION_OUTPUT, ["SELF", "Standard", "create", "ip"]);
        assert_eq!(f.to_string(), "get_operation_output: [SELF, Standard, create, ip]");
    }
}
