//! SQL Server data types.
//!
//! These types describe the column surface the sync engine can diff. The
//! engine never parses T-SQL type syntax at runtime; providers and readers
//! hand over structured values and [`SqlType::type_name`] renders the
//! canonical spelling when DDL is emitted.

use serde::{Deserialize, Serialize};

/// Length of a variable-width character or binary type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextLength {
    /// Fixed declared width, in characters (or bytes for binary types).
    Chars(u16),
    /// Unbounded (`max`).
    Max,
}

impl TextLength {
    /// Renders the length as it appears inside a type's parentheses.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Chars(n) => n.to_string(),
            Self::Max => "max".to_string(),
        }
    }
}

/// Broad family a type belongs to.
///
/// An in-place `ALTER COLUMN` is only attempted within one family; crossing
/// families always falls back to drop-and-recreate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeFamily {
    /// `tinyint`, `smallint`, `int`, `bigint`.
    Integer,
    /// `decimal`, `money`.
    Exact,
    /// `float`, `real`.
    Approximate,
    /// `nvarchar`, `nchar`.
    UnicodeText,
    /// `varchar`, `char`.
    AnsiText,
    /// `varbinary`.
    Binary,
    /// `date`, `time`, `datetime2`, `datetimeoffset`.
    DateTime,
    /// `uniqueidentifier`.
    Guid,
    /// `bit`.
    Boolean,
    /// `xml`.
    Xml,
    /// Provider fallback types the engine does not model structurally.
    Other,
}

/// A SQL Server column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    BigInt,
    /// 16-bit integer.
    SmallInt,
    /// 8-bit unsigned integer.
    TinyInt,
    /// Boolean stored as 0/1.
    Bit,
    /// Exact numeric with precision and scale.
    Decimal(u8, u8),
    /// Double-precision float.
    Float,
    /// Single-precision float.
    Real,
    /// Currency.
    Money,
    /// Variable-length Unicode text.
    NVarChar(TextLength),
    /// Variable-length single-byte text.
    VarChar(TextLength),
    /// Fixed-length Unicode text.
    NChar(u16),
    /// Fixed-length single-byte text.
    Char(u16),
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Date and time.
    DateTime2,
    /// Date and time with offset.
    DateTimeOffset,
    /// GUID.
    UniqueIdentifier,
    /// Variable-length binary.
    VarBinary(TextLength),
    /// XML document.
    Xml,
    /// Any type the provider could not map; rendered verbatim.
    ///
    /// Providers fall back to `nvarchar(max)` when no explicit type is
    /// declared, so this variant is reserved for user-defined or exotic
    /// catalog types.
    Other(String),
}

impl SqlType {
    /// The provider fallback for fields with no declared SQL type.
    #[must_use]
    pub fn fallback() -> Self {
        Self::NVarChar(TextLength::Max)
    }

    /// Canonical T-SQL spelling, including length/precision parameters.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Self::Int => "int".to_string(),
            Self::BigInt => "bigint".to_string(),
            Self::SmallInt => "smallint".to_string(),
            Self::TinyInt => "tinyint".to_string(),
            Self::Bit => "bit".to_string(),
            Self::Decimal(p, s) => format!("decimal({p}, {s})"),
            Self::Float => "float".to_string(),
            Self::Real => "real".to_string(),
            Self::Money => "money".to_string(),
            Self::NVarChar(len) => format!("nvarchar({})", len.render()),
            Self::VarChar(len) => format!("varchar({})", len.render()),
            Self::NChar(n) => format!("nchar({n})"),
            Self::Char(n) => format!("char({n})"),
            Self::Date => "date".to_string(),
            Self::Time => "time".to_string(),
            Self::DateTime2 => "datetime2".to_string(),
            Self::DateTimeOffset => "datetimeoffset".to_string(),
            Self::UniqueIdentifier => "uniqueidentifier".to_string(),
            Self::VarBinary(len) => format!("varbinary({})", len.render()),
            Self::Xml => "xml".to_string(),
            Self::Other(name) => name.clone(),
        }
    }

    /// Type name without length/precision parameters (`nvarchar(50)` →
    /// `nvarchar`). This is the key the safety oracle answers width
    /// questions for.
    #[must_use]
    pub fn base_name(&self) -> String {
        let full = self.type_name();
        match full.find('(') {
            Some(idx) => full[..idx].trim().to_string(),
            None => full,
        }
    }

    /// The family used to decide whether in-place alteration is possible.
    #[must_use]
    pub const fn family(&self) -> TypeFamily {
        match self {
            Self::Int | Self::BigInt | Self::SmallInt | Self::TinyInt => TypeFamily::Integer,
            Self::Decimal(_, _) | Self::Money => TypeFamily::Exact,
            Self::Float | Self::Real => TypeFamily::Approximate,
            Self::NVarChar(_) | Self::NChar(_) => TypeFamily::UnicodeText,
            Self::VarChar(_) | Self::Char(_) => TypeFamily::AnsiText,
            Self::VarBinary(_) => TypeFamily::Binary,
            Self::Date | Self::Time | Self::DateTime2 | Self::DateTimeOffset => {
                TypeFamily::DateTime
            }
            Self::UniqueIdentifier => TypeFamily::Guid,
            Self::Bit => TypeFamily::Boolean,
            Self::Xml => TypeFamily::Xml,
            Self::Other(_) => TypeFamily::Other,
        }
    }

    /// Statically known byte width of one indexed value of this type.
    ///
    /// `None` means the width is unbounded or unknown, in which case the
    /// differ asks the safety oracle and finally falls back to a
    /// conservative estimate when sizing index keys.
    #[must_use]
    pub const fn fixed_byte_width(&self) -> Option<u32> {
        match self {
            Self::TinyInt | Self::Bit => Some(1),
            Self::SmallInt => Some(2),
            Self::Date => Some(3),
            Self::Int | Self::Real => Some(4),
            Self::Time => Some(5),
            Self::BigInt | Self::Float | Self::Money | Self::DateTime2 => Some(8),
            Self::DateTimeOffset => Some(10),
            Self::UniqueIdentifier => Some(16),
            Self::Decimal(p, _) => Some(match *p {
                0..=9 => 5,
                10..=19 => 9,
                20..=28 => 13,
                _ => 17,
            }),
            Self::NVarChar(TextLength::Chars(n)) | Self::NChar(n) => Some(*n as u32 * 2),
            Self::VarChar(TextLength::Chars(n))
            | Self::Char(n)
            | Self::VarBinary(TextLength::Chars(n)) => Some(*n as u32),
            Self::NVarChar(TextLength::Max)
            | Self::VarChar(TextLength::Max)
            | Self::VarBinary(TextLength::Max)
            | Self::Xml
            | Self::Other(_) => None,
        }
    }

    /// Whether this is a character type (unicode or single-byte).
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(
            self.family(),
            TypeFamily::UnicodeText | TypeFamily::AnsiText
        )
    }

    /// Whether this type has no declared upper bound (`max` or similar).
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        matches!(
            self,
            Self::NVarChar(TextLength::Max)
                | Self::VarChar(TextLength::Max)
                | Self::VarBinary(TextLength::Max)
                | Self::Xml
        )
    }

    /// Returns this type narrowed to the given character width, if it is a
    /// variable-width text type; other types are returned unchanged.
    #[must_use]
    pub fn narrowed_to(&self, chars: u16) -> Self {
        match self {
            Self::NVarChar(_) => Self::NVarChar(TextLength::Chars(chars)),
            Self::VarChar(_) => Self::VarChar(TextLength::Chars(chars)),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(SqlType::Int.type_name(), "int");
        assert_eq!(
            SqlType::NVarChar(TextLength::Chars(100)).type_name(),
            "nvarchar(100)"
        );
        assert_eq!(
            SqlType::NVarChar(TextLength::Max).type_name(),
            "nvarchar(max)"
        );
        assert_eq!(SqlType::Decimal(10, 2).type_name(), "decimal(10, 2)");
    }

    #[test]
    fn test_base_name_strips_parameters() {
        assert_eq!(SqlType::NVarChar(TextLength::Chars(50)).base_name(), "nvarchar");
        assert_eq!(SqlType::Decimal(18, 4).base_name(), "decimal");
        assert_eq!(SqlType::BigInt.base_name(), "bigint");
    }

    #[test]
    fn test_families() {
        assert_eq!(SqlType::Int.family(), SqlType::BigInt.family());
        assert_eq!(
            SqlType::NVarChar(TextLength::Max).family(),
            SqlType::NChar(10).family()
        );
        assert_ne!(
            SqlType::NVarChar(TextLength::Max).family(),
            SqlType::VarChar(TextLength::Max).family()
        );
        assert_ne!(SqlType::Int.family(), SqlType::Decimal(10, 0).family());
    }

    #[test]
    fn test_byte_widths() {
        assert_eq!(SqlType::Int.fixed_byte_width(), Some(4));
        assert_eq!(
            SqlType::NVarChar(TextLength::Chars(500)).fixed_byte_width(),
            Some(1000)
        );
        assert_eq!(SqlType::VarChar(TextLength::Chars(500)).fixed_byte_width(), Some(500));
        assert_eq!(SqlType::NVarChar(TextLength::Max).fixed_byte_width(), None);
        assert_eq!(SqlType::Decimal(18, 2).fixed_byte_width(), Some(9));
    }

    #[test]
    fn test_narrowed_to() {
        assert_eq!(
            SqlType::NVarChar(TextLength::Max).narrowed_to(450),
            SqlType::NVarChar(TextLength::Chars(450))
        );
        assert_eq!(SqlType::Int.narrowed_to(450), SqlType::Int);
    }

    #[test]
    fn test_fallback_is_unbounded_text() {
        let fallback = SqlType::fallback();
        assert!(fallback.is_text());
        assert!(fallback.is_unbounded());
    }
}
