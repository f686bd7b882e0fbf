//! Column metadata and type information

use arrow::datatypes::{DataType as ArrowType, Field, TimeUnit};
use serde::{Deserialize, Serialize};

/// Inferred cell type for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    Null,
    Bool,
    Int,
    Float,
    String,
    Date,
    DateTime,
    Mixed,
}

impl Default for CellType {
    fn default() -> Self {
        CellType::Null
    }
}

impl CellType {
    /// Widen the type to accommodate another type
    pub fn widen(self, other: CellType) -> CellType {
        if self == other {
            return self;
        }

        match (self, other) {
            (CellType::Null, t) | (t, CellType::Null) => t,
            (CellType::Int, CellType::Float) | (CellType::Float, CellType::Int) => CellType::Float,
            (CellType::Date, CellType::DateTime) | (CellType::DateTime, CellType::Date) => {
                CellType::DateTime
            }
            _ => CellType::Mixed,
        }
    }

    /// Whether values of this type participate in numeric aggregation
    pub fn is_numeric(self) -> bool {
        matches!(self, CellType::Int | CellType::Float)
    }

    /// The Arrow type this column serializes as.
    ///
    /// `Null` and `Mixed` columns degrade to Utf8: Parquet has no useful
    /// encoding for either, and the display string round-trips for
    /// packaging purposes.
    pub fn to_arrow(self) -> ArrowType {
        match self {
            CellType::Bool => ArrowType::Boolean,
            CellType::Int => ArrowType::Int64,
            CellType::Float => ArrowType::Float64,
            CellType::Date => ArrowType::Date32,
            CellType::DateTime => ArrowType::Timestamp(TimeUnit::Microsecond, None),
            CellType::Null | CellType::String | CellType::Mixed => ArrowType::Utf8,
        }
    }

    /// Map an Arrow type onto a cell type when reading Parquet
    pub fn from_arrow(arrow_type: &ArrowType) -> CellType {
        match arrow_type {
            ArrowType::Null => CellType::Null,
            ArrowType::Boolean => CellType::Bool,
            ArrowType::Int8
            | ArrowType::Int16
            | ArrowType::Int32
            | ArrowType::Int64
            | ArrowType::UInt8
            | ArrowType::UInt16
            | ArrowType::UInt32
            | ArrowType::UInt64 => CellType::Int,
            ArrowType::Float16 | ArrowType::Float32 | ArrowType::Float64 => CellType::Float,
            ArrowType::Utf8 | ArrowType::LargeUtf8 => CellType::String,
            ArrowType::Date32 | ArrowType::Date64 => CellType::Date,
            ArrowType::Timestamp(_, _) => CellType::DateTime,
            _ => CellType::String, // Fallback to string for complex types
        }
    }
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellType::Null => write!(f, "null"),
            CellType::Bool => write!(f, "bool"),
            CellType::Int => write!(f, "int"),
            CellType::Float => write!(f, "float"),
            CellType::String => write!(f, "string"),
            CellType::Date => write!(f, "date"),
            CellType::DateTime => write!(f, "datetime"),
            CellType::Mixed => write!(f, "mixed"),
        }
    }
}

/// Column metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name (from header)
    pub name: String,
    /// Column index (0-based position)
    pub index: usize,
    /// Inferred type from data
    pub inferred_type: CellType,
}

impl Column {
    /// Create a new column with name and index
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            inferred_type: CellType::Null,
        }
    }

    /// Create a column with a specified type
    pub fn with_type(name: impl Into<String>, index: usize, cell_type: CellType) -> Self {
        Self {
            name: name.into(),
            index,
            inferred_type: cell_type,
        }
    }

    /// The Arrow field this column serializes as (always nullable)
    pub fn to_arrow_field(&self) -> Field {
        Field::new(&self.name, self.inferred_type.to_arrow(), true)
    }
}
