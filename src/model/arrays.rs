//! Array storage for model entities.
//!
//! [`NumericArray`] holds key and value data at either single or double
//! precision. [`TypedArray`] is an ordered sequence that either owns its
//! buffer or borrows one from the caller; writing to a borrowed array takes
//! a private copy first.

use std::borrow::Cow;
use std::fmt;

/// Element precision of a [`NumericArray`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NumericType {
    /// 32-bit floating point
    #[default]
    Float,
    /// 64-bit floating point
    Double,
}

impl NumericType {
    /// Size in bytes of one element.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Float => 4,
            Self::Double => 8,
        }
    }

    /// Name as used in COLLADA source arrays.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// Parse from a name; anything unrecognised is `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            _ => None,
        }
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric values at one of two precisions.
#[derive(Clone, Debug, PartialEq)]
pub enum NumericArray {
    /// Single precision values
    Float(Vec<f32>),
    /// Double precision values
    Double(Vec<f64>),
}

impl Default for NumericArray {
    fn default() -> Self {
        NumericArray::Float(Vec::new())
    }
}

impl From<Vec<f32>> for NumericArray {
    fn from(values: Vec<f32>) -> Self {
        NumericArray::Float(values)
    }
}

impl From<Vec<f64>> for NumericArray {
    fn from(values: Vec<f64>) -> Self {
        NumericArray::Double(values)
    }
}

impl NumericArray {
    /// Empty array of the given precision.
    pub fn new(element_type: NumericType) -> Self {
        match element_type {
            NumericType::Float => NumericArray::Float(Vec::new()),
            NumericType::Double => NumericArray::Double(Vec::new()),
        }
    }

    /// Active precision.
    pub fn element_type(&self) -> NumericType {
        match self {
            NumericArray::Float(_) => NumericType::Float,
            NumericArray::Double(_) => NumericType::Double,
        }
    }

    /// Number of values.
    pub fn count(&self) -> usize {
        match self {
            NumericArray::Float(v) => v.len(),
            NumericArray::Double(v) => v.len(),
        }
    }

    /// Check if the array holds no values.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Values as `f32`, if that is the active precision.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            NumericArray::Float(v) => Some(v),
            NumericArray::Double(_) => None,
        }
    }

    /// Values as `f64`, if that is the active precision.
    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            NumericArray::Double(v) => Some(v),
            NumericArray::Float(_) => None,
        }
    }

    /// Mutable `f32` storage, if that is the active precision.
    pub fn as_f32_mut(&mut self) -> Option<&mut Vec<f32>> {
        match self {
            NumericArray::Float(v) => Some(v),
            NumericArray::Double(_) => None,
        }
    }

    /// Mutable `f64` storage, if that is the active precision.
    pub fn as_f64_mut(&mut self) -> Option<&mut Vec<f64>> {
        match self {
            NumericArray::Double(v) => Some(v),
            NumericArray::Float(_) => None,
        }
    }

    /// Value at `index`, widened to `f64`.
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            NumericArray::Float(v) => v.get(index).map(|&x| f64::from(x)),
            NumericArray::Double(v) => v.get(index).copied(),
        }
    }

    /// Append a value, narrowed to the active precision.
    pub fn push(&mut self, value: f64) {
        match self {
            NumericArray::Float(v) => v.push(value as f32),
            NumericArray::Double(v) => v.push(value),
        }
    }

    /// Switch precision, converting the current contents.
    pub fn set_type(&mut self, element_type: NumericType) {
        if self.element_type() == element_type {
            return;
        }
        *self = match self {
            NumericArray::Float(v) => NumericArray::Double(v.iter().map(|&x| f64::from(x)).collect()),
            NumericArray::Double(v) => NumericArray::Float(v.iter().map(|&x| x as f32).collect()),
        };
    }

    /// Remove every value, keeping the precision.
    pub fn clear(&mut self) {
        match self {
            NumericArray::Float(v) => v.clear(),
            NumericArray::Double(v) => v.clear(),
        }
    }

    /// Iterate over the values widened to `f64`.
    pub fn iter_f64(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.count()).filter_map(move |i| self.get(i))
    }
}

/// Who is responsible for a [`TypedArray`]'s buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// The array owns its buffer
    Exclusive,
    /// The array views a buffer owned elsewhere
    Borrowed,
}

/// Ordered sequence that owns its buffer or borrows one.
///
/// A borrowed buffer is never written: the first mutation copies it and the
/// array becomes [`Ownership::Exclusive`].
#[derive(Debug, PartialEq)]
pub struct TypedArray<'a, T: Clone> {
    data: Cow<'a, [T]>,
}

impl<'a, T: Clone> Default for TypedArray<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: Clone> From<Vec<T>> for TypedArray<'a, T> {
    fn from(values: Vec<T>) -> Self {
        Self {
            data: Cow::Owned(values),
        }
    }
}

impl<'a, T: Clone> TypedArray<'a, T> {
    /// Empty, exclusively owned array.
    pub fn new() -> Self {
        Self {
            data: Cow::Owned(Vec::new()),
        }
    }

    /// View over a caller-owned buffer.
    pub fn borrowed(values: &'a [T]) -> Self {
        Self {
            data: Cow::Borrowed(values),
        }
    }

    /// Whether the buffer is owned or borrowed.
    pub fn ownership(&self) -> Ownership {
        match self.data {
            Cow::Owned(_) => Ownership::Exclusive,
            Cow::Borrowed(_) => Ownership::Borrowed,
        }
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.data.len()
    }

    /// Check if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    /// Iterate over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Owned storage, copying a borrowed buffer first.
    pub fn to_mut(&mut self) -> &mut Vec<T> {
        self.data.to_mut()
    }

    /// Append an element.
    pub fn push(&mut self, value: T) {
        self.to_mut().push(value);
    }

    /// Drop all elements. A borrowed view is replaced by an empty owned buffer.
    pub fn clear(&mut self) {
        self.data = Cow::Owned(Vec::new());
    }

    /// Owned elements, copying a borrowed buffer.
    pub fn into_owned(self) -> Vec<T> {
        self.data.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_default_is_empty_float() {
        let array = NumericArray::default();
        assert_eq!(array.element_type(), NumericType::Float);
        assert!(array.is_empty());
    }

    #[test]
    fn test_numeric_push_and_get() {
        let mut array = NumericArray::new(NumericType::Double);
        array.push(0.1);
        array.push(2.5);
        assert_eq!(array.count(), 2);
        assert_eq!(array.get(0), Some(0.1));
        assert_eq!(array.get(2), None);
        assert_eq!(array.as_f64(), Some(&[0.1, 2.5][..]));
        assert!(array.as_f32().is_none());
    }

    #[test]
    fn test_set_type_converts_contents() {
        let mut array = NumericArray::from(vec![1.0f32, 2.5, -4.0]);
        array.set_type(NumericType::Double);
        assert_eq!(array.element_type(), NumericType::Double);
        assert_eq!(array.as_f64(), Some(&[1.0, 2.5, -4.0][..]));

        array.set_type(NumericType::Float);
        assert_eq!(array.iter_f64().collect::<Vec<_>>(), vec![1.0, 2.5, -4.0]);
    }

    #[test]
    fn test_clear_keeps_precision() {
        let mut array = NumericArray::from(vec![1.0f64]);
        array.clear();
        assert!(array.is_empty());
        assert_eq!(array.element_type(), NumericType::Double);
    }

    #[test]
    fn test_numeric_type_names() {
        assert_eq!(NumericType::from_name("double"), Some(NumericType::Double));
        assert_eq!(NumericType::from_name("int"), None);
        assert_eq!(NumericType::Float.num_bytes(), 4);
        assert_eq!(NumericType::Double.to_string(), "double");
    }

    #[test]
    fn test_borrowed_array_copies_on_write() {
        let source = vec![1u8, 2, 3];
        let mut array = TypedArray::borrowed(&source);
        assert_eq!(array.ownership(), Ownership::Borrowed);
        assert_eq!(array.count(), 3);
        assert_eq!(array.get(1), Some(&2));

        array.push(4);
        assert_eq!(array.ownership(), Ownership::Exclusive);
        assert_eq!(array.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(source, vec![1, 2, 3]);
    }

    #[test]
    fn test_owned_array() {
        let mut array: TypedArray<'_, u32> = TypedArray::new();
        assert_eq!(array.ownership(), Ownership::Exclusive);
        assert!(array.is_empty());

        array.push(7);
        array.push(9);
        assert_eq!(array.iter().copied().collect::<Vec<_>>(), vec![7, 9]);
        assert_eq!(array.into_owned(), vec![7, 9]);
    }

    #[test]
    fn test_clear_borrowed_leaves_source() {
        let source = [5u16, 6];
        let mut array = TypedArray::borrowed(&source);
        array.clear();
        assert!(array.is_empty());
        assert_eq!(array.ownership(), Ownership::Exclusive);
        assert_eq!(source, [5, 6]);
    }
}
