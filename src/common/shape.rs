use std::fmt;

use super::DType;

/// Ordered extents of a tensor, outermost first.
#[derive(Clone, Default, Hash, PartialEq, Eq)]
pub struct Shape(Vec<usize>);

impl<T: AsRef<[usize]>> From<T> for Shape {
    fn from(value: T) -> Self {
        Self(value.as_ref().to_vec())
    }
}

impl std::ops::Index<usize> for Shape {
    type Output = usize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.0.first() else { return write!(f, "[]") };

        write!(f, "{first}")?;

        for x in self.0.iter().skip(1) {
            write!(f, "x{x}")?;
        }

        Ok(())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Shape {
    pub fn scalar() -> Self {
        Self(Vec::new())
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of elements, 1 for a scalar.
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }

    pub fn checked_size(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Row-major strides in elements.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.rank()];

        for i in (0..self.rank().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.0[i + 1];
        }

        strides
    }
}

/// Static type of a tensor.
#[derive(Clone, Hash, PartialEq, Eq)]
pub struct TType {
    shape: Shape,
    dtype: DType,
}

impl fmt::Debug for TType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}[{:?}]", self.dtype, self.shape)
    }
}

impl TType {
    pub fn new(shape: impl Into<Shape>, dtype: DType) -> Self {
        Self { shape: shape.into(), dtype }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn size(&self) -> usize {
        self.shape.size()
    }
}
