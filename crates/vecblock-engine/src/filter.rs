//! Metadata filter evaluation.
//!
//! A filter is a JSON object mapping field names to operator objects:
//!
//! ```json
//! { "year": { "$gte": 2020, "$lt": 2024 }, "tags": { "$in": "rust" } }
//! ```
//!
//! A record passes only when every field of the filter is present in its
//! metadata and every operator on that field holds. A missing field excludes
//! the record without evaluating anything.

use serde_json::Value;
use vecblock_types::{Metadata, VecBlockError};

/// One comparison applied to a metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(f64),
    Lt(f64),
    Gte(f64),
    Lte(f64),
    /// Metadata array contains the operand
    In(Value),
    /// Metadata array does not contain the operand
    Nin(Value),
}

impl Condition {
    /// Parse one `{operator: operand}` pair.
    pub fn parse(operator: &str, operand: &Value) -> Result<Self, VecBlockError> {
        match operator {
            "$eq" | "$ne" => {
                if !is_comparable(operand) {
                    return Err(VecBlockError::input(format!(
                        "Filter operation {} failed. Input should be one of string, number, array, bool",
                        operator
                    )));
                }
                Ok(if operator == "$eq" {
                    Condition::Eq(operand.clone())
                } else {
                    Condition::Ne(operand.clone())
                })
            }
            "$gt" | "$lt" | "$gte" | "$lte" => {
                let bound = operand.as_f64().ok_or_else(|| {
                    VecBlockError::input(format!(
                        "Filter operation {} failed. Inputs should be number",
                        operator
                    ))
                })?;
                Ok(match operator {
                    "$gt" => Condition::Gt(bound),
                    "$lt" => Condition::Lt(bound),
                    "$gte" => Condition::Gte(bound),
                    _ => Condition::Lte(bound),
                })
            }
            "$in" | "$nin" => {
                if scalar_type(operand).is_none() {
                    return Err(VecBlockError::input(format!(
                        "Filter operation {} failed. The supported data types are string, number and bool only",
                        operator
                    )));
                }
                Ok(if operator == "$in" {
                    Condition::In(operand.clone())
                } else {
                    Condition::Nin(operand.clone())
                })
            }
            other => Err(VecBlockError::input(format!(
                "Unknown filter operator '{}'. Supported: $eq, $ne, $gt, $lt, $gte, $lte, $in, $nin",
                other
            ))),
        }
    }

    pub fn operator(&self) -> &'static str {
        match self {
            Condition::Eq(_) => "$eq",
            Condition::Ne(_) => "$ne",
            Condition::Gt(_) => "$gt",
            Condition::Lt(_) => "$lt",
            Condition::Gte(_) => "$gte",
            Condition::Lte(_) => "$lte",
            Condition::In(_) => "$in",
            Condition::Nin(_) => "$nin",
        }
    }

    /// Evaluate against the metadata value of the filtered field.
    ///
    /// A value of the wrong type for the operator is an input error.
    pub fn evaluate(&self, value: &Value) -> Result<bool, VecBlockError> {
        match self {
            Condition::Eq(operand) => {
                self.require_comparable(value)?;
                Ok(values_equal(value, operand))
            }
            Condition::Ne(operand) => {
                self.require_comparable(value)?;
                Ok(!values_equal(value, operand))
            }
            Condition::Gt(bound) => Ok(self.require_number(value)? > *bound),
            Condition::Lt(bound) => Ok(self.require_number(value)? < *bound),
            Condition::Gte(bound) => Ok(self.require_number(value)? >= *bound),
            Condition::Lte(bound) => Ok(self.require_number(value)? <= *bound),
            Condition::In(operand) => self.array_contains(value, operand),
            Condition::Nin(operand) => Ok(!self.array_contains(value, operand)?),
        }
    }

    fn require_comparable(&self, value: &Value) -> Result<(), VecBlockError> {
        if is_comparable(value) {
            Ok(())
        } else {
            Err(VecBlockError::input(format!(
                "Filter operation {} failed. Metadata value should be one of string, number, array, bool, got {}",
                self.operator(),
                value
            )))
        }
    }

    fn require_number(&self, value: &Value) -> Result<f64, VecBlockError> {
        value.as_f64().ok_or_else(|| {
            VecBlockError::input(format!(
                "Filter operation {} failed. Metadata value should be a number, got {}",
                self.operator(),
                value
            ))
        })
    }

    fn array_contains(&self, value: &Value, operand: &Value) -> Result<bool, VecBlockError> {
        let items = value.as_array().ok_or_else(|| {
            VecBlockError::input(format!(
                "Filter operation {} failed. The metadata value should be an array, got {}",
                self.operator(),
                value
            ))
        })?;
        if items.is_empty() {
            return Ok(false);
        }

        let element_type = uniform_scalar_type(items).ok_or_else(|| {
            VecBlockError::input(format!(
                "Filter operation {} failed. Array should have elements of one scalar type",
                self.operator()
            ))
        })?;
        // Operands are checked to be scalars when parsed
        let operand_type = scalar_type(operand).unwrap_or("unknown");
        if element_type != operand_type {
            return Err(VecBlockError::input(format!(
                "Filter operation {} failed. The type of elements in the array ({}) does not match the type of the value ({})",
                self.operator(),
                element_type,
                operand_type
            )));
        }

        Ok(items.iter().any(|item| values_equal(item, operand)))
    }
}

/// Conditions on one metadata field, all of which must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub conditions: Vec<Condition>,
}

/// A conjunction of per-field predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    /// A filter that passes every record.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a filter from its JSON form. `null` is the empty filter.
    pub fn from_json(value: &Value) -> Result<Self, VecBlockError> {
        let fields = match value {
            Value::Null => return Ok(Self::empty()),
            Value::Object(fields) => fields,
            other => {
                return Err(VecBlockError::input(format!(
                    "Where filter should be an object, got {}",
                    other
                )))
            }
        };

        let mut predicates = Vec::with_capacity(fields.len());
        for (field, conditions) in fields {
            let ops = conditions.as_object().ok_or_else(|| {
                VecBlockError::input(format!(
                    "Condition for field '{}' should be an object of operators, got {}",
                    field, conditions
                ))
            })?;
            let conditions = ops
                .iter()
                .map(|(op, operand)| Condition::parse(op, operand))
                .collect::<Result<Vec<_>, _>>()?;
            predicates.push(Predicate {
                field: field.clone(),
                conditions,
            });
        }

        Ok(Self { predicates })
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether `metadata` passes every predicate.
    ///
    /// Every condition on a present field is evaluated before the results
    /// are combined, so a type error surfaces regardless of field order or
    /// of other conditions failing. A missing field fails the record.
    pub fn matches(&self, metadata: &Metadata) -> Result<bool, VecBlockError> {
        let mut passed = true;
        for predicate in &self.predicates {
            let Some(value) = metadata.get(&predicate.field) else {
                passed = false;
                continue;
            };
            for condition in &predicate.conditions {
                passed &= condition.evaluate(value)?;
            }
        }
        Ok(passed)
    }
}

fn is_comparable(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Array(_)
    )
}

fn scalar_type(value: &Value) -> Option<&'static str> {
    match value {
        Value::String(_) => Some("string"),
        Value::Number(_) => Some("number"),
        Value::Bool(_) => Some("bool"),
        _ => None,
    }
}

fn uniform_scalar_type(items: &[Value]) -> Option<&'static str> {
    let first = scalar_type(items.first()?)?;
    items
        .iter()
        .all(|item| scalar_type(item) == Some(first))
        .then_some(first)
}

/// Deep equality where numbers compare by value (`1 == 1.0`).
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}
