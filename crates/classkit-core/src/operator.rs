//! Operator hooks.
//!
//! A class overrides an operator by defining a method under the hook's reserved
//! name (e.g. `__add`). The set is closed: [`Operator::ALL`] enumerates every
//! hook, and [`Operator::from_method_name`] is the only way a method name is
//! recognised as one.

use std::fmt;

/// Operator hook kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // === Arithmetic ===
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
    /// `a % b`
    Mod,
    /// `a ^ b`
    Pow,
    /// `-a`
    Unm,

    // === Sequence ===
    /// `a .. b`
    Concat,
    /// `#a`
    Len,

    // === Comparison ===
    /// `a == b`
    Eq,
    /// `a < b`
    Lt,
    /// `a <= b`
    Le,

    // === Call and conversion ===
    /// `a(...)`
    Call,
    /// String conversion
    ToString,

    // === Catch-all access ===
    /// Read of a name that resolves nowhere else
    Index,
    /// Write of a name that is not yet a field
    NewIndex,
}

impl Operator {
    /// Every operator hook, in a stable order.
    pub const ALL: [Operator; 16] = [
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::Mod,
        Operator::Pow,
        Operator::Unm,
        Operator::Concat,
        Operator::Len,
        Operator::Eq,
        Operator::Lt,
        Operator::Le,
        Operator::Call,
        Operator::ToString,
        Operator::Index,
        Operator::NewIndex,
    ];

    /// Get the reserved method name for this hook.
    pub const fn method_name(&self) -> &'static str {
        match self {
            Operator::Add => "__add",
            Operator::Sub => "__sub",
            Operator::Mul => "__mul",
            Operator::Div => "__div",
            Operator::Mod => "__mod",
            Operator::Pow => "__pow",
            Operator::Unm => "__unm",
            Operator::Concat => "__concat",
            Operator::Len => "__len",
            Operator::Eq => "__eq",
            Operator::Lt => "__lt",
            Operator::Le => "__le",
            Operator::Call => "__call",
            Operator::ToString => "__tostring",
            Operator::Index => "__index",
            Operator::NewIndex => "__newindex",
        }
    }

    /// Look up the hook a method name reserves, if any.
    pub fn from_method_name(name: &str) -> Option<Operator> {
        Self::ALL.into_iter().find(|op| op.method_name() == name)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_method_name(op.method_name()), Some(op));
        }
    }

    #[test]
    fn plain_names_are_not_hooks() {
        assert_eq!(Operator::from_method_name("add"), None);
        assert_eq!(Operator::from_method_name("__init"), None);
    }
}
