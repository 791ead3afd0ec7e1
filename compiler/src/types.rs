// types.rs — Element types, tensor types and literal tensors
//
// Values are dense, row-major tensors. Elements are stored as f64 regardless
// of dtype; the dtype is carried as type metadata for the backend.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    F32,
    F64,
}

impl DType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "f32" => Some(DType::F32),
            "f64" => Some(DType::F64),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Upper bound on the element count of a materialized tensor.
pub const MAX_ELEMENTS: usize = 1 << 28;

/// Element type plus dimensions. Rank 0 (no dims) is a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TensorType {
    pub dtype: DType,
    pub dims: Vec<usize>,
}

impl TensorType {
    pub fn new(dtype: DType, dims: Vec<usize>) -> Self {
        Self { dtype, dims }
    }

    pub fn scalar(dtype: DType) -> Self {
        Self::new(dtype, Vec::new())
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Number of elements; 1 for scalars. `None` if the product overflows.
    pub fn element_count(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |n, &d| n.checked_mul(d))
    }

    /// Whether a value of this type can be held in memory
    /// (at most `MAX_ELEMENTS` elements).
    pub fn is_materializable(&self) -> bool {
        matches!(self.element_count(), Some(n) if n <= MAX_ELEMENTS)
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.dtype)?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// A concrete tensor value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Literal {
    pub ty: TensorType,
    pub data: Vec<f64>,
}

impl Literal {
    pub fn scalar(dtype: DType, value: f64) -> Self {
        Self {
            ty: TensorType::scalar(dtype),
            data: vec![value],
        }
    }

    pub fn vector(dtype: DType, data: Vec<f64>) -> Self {
        Self {
            ty: TensorType::new(dtype, vec![data.len()]),
            data,
        }
    }

    /// Zero-filled value of `ty`, or `None` if `ty` is not materializable.
    pub fn zeros(ty: &TensorType) -> Option<Self> {
        if !ty.is_materializable() {
            return None;
        }
        Some(Self {
            data: vec![0.0; ty.element_count()?],
            ty: ty.clone(),
        })
    }

    /// The single element of a rank-0 literal.
    pub fn as_scalar(&self) -> Option<f64> {
        if self.ty.rank() == 0 {
            self.data.first().copied()
        } else {
            None
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = self.as_scalar() {
            return write!(f, "{v:?}");
        }
        write!(f, "[")?;
        for (i, v) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v:?}")?;
        }
        write!(f, "]")
    }
}
