//! The closed set of binary elementwise operators.

use crate::{Result, XewError};

/// Binary elementwise operator with NumPy-style broadcasting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperatorKind {
    Add,
    Sub,
    Mul,
    Div,
    Max,
    Min,
    Mod,
    FloorDiv,
    Pow,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 9] = [
        OperatorKind::Add,
        OperatorKind::Sub,
        OperatorKind::Mul,
        OperatorKind::Div,
        OperatorKind::Max,
        OperatorKind::Min,
        OperatorKind::Mod,
        OperatorKind::FloorDiv,
        OperatorKind::Pow,
    ];

    /// Short operator name, also the suffix of the device primitive
    /// (`broadcast_<short_name>`).
    pub fn short_name(self) -> &'static str {
        match self {
            OperatorKind::Add => "add",
            OperatorKind::Sub => "sub",
            OperatorKind::Mul => "mul",
            OperatorKind::Div => "div",
            OperatorKind::Max => "max",
            OperatorKind::Min => "min",
            OperatorKind::Mod => "mod",
            OperatorKind::FloorDiv => "floordiv",
            OperatorKind::Pow => "pow",
        }
    }

    /// Registry name, e.g. `elementwise_add`.
    pub fn name(self) -> &'static str {
        match self {
            OperatorKind::Add => "elementwise_add",
            OperatorKind::Sub => "elementwise_sub",
            OperatorKind::Mul => "elementwise_mul",
            OperatorKind::Div => "elementwise_div",
            OperatorKind::Max => "elementwise_max",
            OperatorKind::Min => "elementwise_min",
            OperatorKind::Mod => "elementwise_mod",
            OperatorKind::FloorDiv => "elementwise_floordiv",
            OperatorKind::Pow => "elementwise_pow",
        }
    }

    /// Parse either the registry name or the short name.
    pub fn from_name(name: &str) -> Result<Self> {
        let short = name.strip_prefix("elementwise_").unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|op| op.short_name() == short)
            .ok_or_else(|| XewError::UnknownOperator(name.to_string()))
    }
}

impl std::fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for OperatorKind {
    type Err = XewError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for op in OperatorKind::ALL {
            assert_eq!(OperatorKind::from_name(op.name()).unwrap(), op);
            assert_eq!(OperatorKind::from_name(op.short_name()).unwrap(), op);
        }
    }

    #[test]
    fn test_floordiv_name() {
        assert_eq!(OperatorKind::FloorDiv.name(), "elementwise_floordiv");
        assert_eq!(
            "floordiv".parse::<OperatorKind>().unwrap(),
            OperatorKind::FloorDiv
        );
    }

    #[test]
    fn test_unknown_operator() {
        let err = OperatorKind::from_name("elementwise_xor").unwrap_err();
        assert_eq!(err, XewError::UnknownOperator("elementwise_xor".into()));
    }
}
