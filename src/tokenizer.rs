//! Expression tokenizer and validator.
//!
//! Scans the raw text left to right. Each `+ - * /` becomes an operator and
//! each ASCII digit becomes its own single-digit operand; `"12"` is two
//! operands, not twelve. Every other character is skipped without complaint.
//! Both behaviours are known limitations kept for compatibility with existing
//! clients, since changing either would change results for inputs such as
//! `"12+3"`.

use crate::error::CalcError;
use crate::types::task::Operator;

/// Validated operand and operator sequences.
///
/// Construction through [`tokenize`] guarantees
/// `operands().len() == operators().len() + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tokens {
    operands: Vec<f64>,
    operators: Vec<Operator>,
}

impl Tokens {
    /// Operands in source order.
    pub fn operands(&self) -> &[f64] {
        &self.operands
    }

    /// Operators in source order.
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// Consumes the tokens, yielding `(operands, operators)`.
    pub fn into_parts(self) -> (Vec<f64>, Vec<Operator>) {
        (self.operands, self.operators)
    }
}

/// Tokenizes and validates `expression`.
///
/// Fails with [`CalcError::MalformedExpression`] when the operand count is not
/// the operator count plus one.
///
/// # Examples
///
/// ```
/// use dcalc::{tokenize, Operator};
///
/// let tokens = tokenize("3+4*2").unwrap();
/// assert_eq!(tokens.operands(), &[3.0, 4.0, 2.0]);
/// assert_eq!(tokens.operators(), &[Operator::Add, Operator::Mul]);
///
/// assert!(tokenize("5+").is_err());
/// ```
pub fn tokenize(expression: &str) -> Result<Tokens, CalcError> {
    let mut operands = Vec::new();
    let mut operators = Vec::new();

    for ch in expression.chars() {
        if let Some(op) = Operator::from_symbol(ch) {
            operators.push(op);
        } else if let Some(digit) = ch.to_digit(10) {
            operands.push(f64::from(digit));
        }
    }

    if operands.len() != operators.len() + 1 {
        return Err(CalcError::MalformedExpression {
            operands: operands.len(),
            operators: operators.len(),
        });
    }

    Ok(Tokens {
        operands,
        operators,
    })
}
