//! The fixed set of supported built-in spreadsheet functions.

/// A supported built-in function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sum,
    Average,
    Min,
    Max,
    Count,
    Product,
    Npv,
    If,
    IfError,
    And,
    Or,
    Not,
    Abs,
    Round,
    RoundUp,
    RoundDown,
    Int,
    Sqrt,
    Power,
    Mod,
    Concatenate,
    Len,
    Upper,
    Lower,
    Trim,
    Index,
    Match,
    VLookup,
    Choose,
}

impl Function {
    /// Look up an upper-case function name.
    pub fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "SUM" => Self::Sum,
            "AVERAGE" => Self::Average,
            "MIN" => Self::Min,
            "MAX" => Self::Max,
            "COUNT" => Self::Count,
            "PRODUCT" => Self::Product,
            "NPV" => Self::Npv,
            "IF" => Self::If,
            "IFERROR" => Self::IfError,
            "AND" => Self::And,
            "OR" => Self::Or,
            "NOT" => Self::Not,
            "ABS" => Self::Abs,
            "ROUND" => Self::Round,
            "ROUNDUP" => Self::RoundUp,
            "ROUNDDOWN" => Self::RoundDown,
            "INT" => Self::Int,
            "SQRT" => Self::Sqrt,
            "POWER" => Self::Power,
            "MOD" => Self::Mod,
            "CONCATENATE" => Self::Concatenate,
            "LEN" => Self::Len,
            "UPPER" => Self::Upper,
            "LOWER" => Self::Lower,
            "TRIM" => Self::Trim,
            "INDEX" => Self::Index,
            "MATCH" => Self::Match,
            "VLOOKUP" => Self::VLookup,
            "CHOOSE" => Self::Choose,
            _ => return None,
        })
    }

    /// Accepted argument count as `(min, max)`; `None` max means variadic.
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            Self::Sum
            | Self::Average
            | Self::Min
            | Self::Max
            | Self::Count
            | Self::Product
            | Self::And
            | Self::Or
            | Self::Concatenate => (1, None),
            Self::Npv | Self::Choose => (2, None),
            Self::If => (2, Some(3)),
            Self::IfError | Self::Round | Self::RoundUp | Self::RoundDown => (2, Some(2)),
            Self::Power | Self::Mod => (2, Some(2)),
            Self::Not
            | Self::Abs
            | Self::Int
            | Self::Sqrt
            | Self::Len
            | Self::Upper
            | Self::Lower
            | Self::Trim => (1, Some(1)),
            Self::Index | Self::Match => (2, Some(3)),
            Self::VLookup => (3, Some(4)),
        }
    }

    /// Validate an argument count, describing the mismatch on failure.
    pub fn check_arity(self, name: &str, count: usize) -> Result<(), String> {
        let (min, max) = self.arity();
        let ok = count >= min && max.map_or(true, |max| count <= max);
        if ok {
            return Ok(());
        }
        let expected = match max {
            Some(max) if max == min => format!("{min}"),
            Some(max) => format!("{min} to {max}"),
            None => format!("at least {min}"),
        };
        Err(format!("{name} expects {expected} arguments, got {count}"))
    }

    /// Functions whose arguments may be ranges, consumed as flat sequences.
    pub fn accepts_sequences(self) -> bool {
        matches!(
            self,
            Self::Sum
                | Self::Average
                | Self::Min
                | Self::Max
                | Self::Count
                | Self::Product
                | Self::Npv
                | Self::And
                | Self::Or
        )
    }
}
