//! The scalar/array type language used by `comb` function signatures and,
//! after inference, by every synthesizer [`crate::Signal`].

use std::fmt;

/// A C99 scalar kind. `Custom` covers a user-defined typedef spelled
/// verbatim in the XML (e.g. a struct name) that the compiler never
/// looks inside.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    Bool,
    Void,
    Custom(String),
}

impl fmt::Display for PrimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PrimKind::*;
        let s = match self {
            Int8 => "int8_t",
            Int16 => "int16_t",
            Int32 => "int32_t",
            Int64 => "int64_t",
            UInt8 => "uint8_t",
            UInt16 => "uint16_t",
            UInt32 => "uint32_t",
            UInt64 => "uint64_t",
            Float => "float",
            Double => "double",
            Bool => "bool",
            Void => "void",
            Custom(name) => name.as_str(),
        };
        write!(f, "{s}")
    }
}

impl PrimKind {
    /// Parse a type token as it appears in `port type="..."` or in a
    /// C prototype string. Unknown tokens become `Custom` rather than an
    /// error: the compiler never interprets a custom type's layout.
    pub fn parse(token: &str) -> Self {
        match token.trim() {
            "int8_t" | "char" | "int8" => PrimKind::Int8,
            "int16_t" | "short" | "int16" => PrimKind::Int16,
            "int32_t" | "int" | "int32" => PrimKind::Int32,
            "int64_t" | "long" | "int64" => PrimKind::Int64,
            "uint8_t" | "uint8" | "unsigned char" => PrimKind::UInt8,
            "uint16_t" | "uint16" | "unsigned short" => PrimKind::UInt16,
            "uint32_t" | "uint32" | "unsigned int" | "unsigned" => {
                PrimKind::UInt32
            }
            "uint64_t" | "uint64" | "unsigned long" => PrimKind::UInt64,
            "float" => PrimKind::Float,
            "double" => PrimKind::Double,
            "bool" | "boolean" => PrimKind::Bool,
            "void" => PrimKind::Void,
            other => PrimKind::Custom(other.to_string()),
        }
    }
}

/// A port or signal data type: primitive kind plus the array/const/pointer
/// qualifiers §3 requires. Array size is resolved lazily by the
/// synthesizer's size-propagation pass (§4.4 Step 8); `None` is legal
/// until that point.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DataType {
    pub kind: PrimKind,
    pub is_array: bool,
    pub array_size: Option<u64>,
    pub is_const: bool,
    pub is_pointer: bool,
}

impl DataType {
    pub fn scalar(kind: PrimKind) -> Self {
        DataType {
            kind,
            is_array: false,
            array_size: None,
            is_const: false,
            is_pointer: false,
        }
    }

    pub fn array(kind: PrimKind, size: Option<u64>) -> Self {
        DataType {
            kind,
            is_array: true,
            array_size: size,
            is_const: false,
            is_pointer: false,
        }
    }

    pub fn with_const(mut self, is_const: bool) -> Self {
        self.is_const = is_const;
        self
    }

    pub fn with_pointer(mut self, is_pointer: bool) -> Self {
        self.is_pointer = is_pointer;
        self
    }

    pub fn with_array_size(mut self, size: u64) -> Self {
        self.array_size = Some(size);
        self
    }

    /// Two types are "element-compatible" when kind and array-ness agree,
    /// ignoring `const`/`pointer`/size — used by chain-coalescing (§4.2.4)
    /// and by emit-time assignment checks (§4.4 Step 11).
    pub fn compatible_with(&self, other: &DataType) -> bool {
        self.kind == other.kind && self.is_array == other.is_array
    }

    /// The element type of an array type (same kind, scalar, same constness).
    pub fn element_type(&self) -> DataType {
        DataType {
            kind: self.kind.clone(),
            is_array: false,
            array_size: None,
            is_const: self.is_const,
            is_pointer: false,
        }
    }

    /// C declarator spelling for a parameter or local, e.g. `const int32_t*`.
    pub fn c_spelling(&self) -> String {
        let mut s = String::new();
        if self.is_const {
            s.push_str("const ");
        }
        s.push_str(&self.kind.to_string());
        if self.is_array || self.is_pointer {
            s.push('*');
        }
        s
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.c_spelling())
    }
}
