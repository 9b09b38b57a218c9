//! Key-framed animation curves.
//!
//! A curve maps key inputs (usually times) to output values of a fixed
//! dimension. Setters are plain field writes; [`AnimationCurve::check_shape`]
//! is the place where the cross-field rules are verified.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use super::arrays::{NumericArray, TypedArray};
use super::entity::EntityId;

/// How values between two keys are computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InterpolationType {
    /// Not specified
    #[default]
    Unknown,
    /// Straight line between keys
    Linear,
    /// Cubic Bezier using the tangent arrays
    Bezier,
    /// Cardinal spline
    Cardinal,
    /// Hermite spline using the tangent arrays
    Hermite,
    /// Uniform B-spline
    BSpline,
    /// Hold the previous key
    Step,
    /// Per-segment kinds come from the interpolation array
    Mixed,
}

impl InterpolationType {
    /// Parse a COLLADA `INTERPOLATION` source name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "LINEAR" => Self::Linear,
            "BEZIER" => Self::Bezier,
            "CARDINAL" => Self::Cardinal,
            "HERMITE" => Self::Hermite,
            "BSPLINE" => Self::BSpline,
            "STEP" => Self::Step,
            "MIXED" => Self::Mixed,
            _ => Self::Unknown,
        }
    }

    /// COLLADA `INTERPOLATION` source name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Linear => "LINEAR",
            Self::Bezier => "BEZIER",
            Self::Cardinal => "CARDINAL",
            Self::Hermite => "HERMITE",
            Self::BSpline => "BSPLINE",
            Self::Step => "STEP",
            Self::Mixed => "MIXED",
        }
    }

    /// Check if segments of this kind read tangent values.
    pub const fn uses_tangents(self) -> bool {
        matches!(self, Self::Bezier | Self::Hermite | Self::Cardinal)
    }
}

impl fmt::Display for InterpolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which tangent array a defect refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TangentSide {
    /// Incoming tangents
    In,
    /// Outgoing tangents
    Out,
}

impl fmt::Display for TangentSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TangentSide::In => f.write_str("in"),
            TangentSide::Out => f.write_str("out"),
        }
    }
}

/// A broken rule found by [`AnimationCurve::check_shape`].
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum CurveDefect {
    /// Output count is not keys times dimension
    #[error("expected {expected} output values, found {actual}")]
    OutputCountMismatch {
        /// keys × dimension
        expected: usize,
        /// Actual output count
        actual: usize,
    },

    /// Mixed curve without one interpolation entry per key
    #[error("expected {expected} interpolation entries, found {actual}")]
    InterpolationCountMismatch {
        /// Key count
        expected: usize,
        /// Actual entry count
        actual: usize,
    },

    /// Interpolation entries on a curve that is not mixed
    #[error("{count} interpolation entries on a {kind} curve")]
    UnexpectedInterpolations {
        /// Curve-wide interpolation type
        kind: InterpolationType,
        /// Entry count
        count: usize,
    },

    /// Tangent count differs from the output count
    #[error("expected {expected} {side}-tangent values, found {actual}")]
    TangentCountMismatch {
        /// Which tangent array
        side: TangentSide,
        /// Output count
        expected: usize,
        /// Actual tangent count
        actual: usize,
    },

    /// Tangent values on a curve whose interpolation never reads them
    #[error("{side}-tangent values on a curve that does not use tangents")]
    UnexpectedTangents {
        /// Which tangent array
        side: TangentSide,
    },

    /// Input at `key` does not exceed the previous one
    #[error("input value at key {key} is not greater than the previous key")]
    InputsNotIncreasing {
        /// First offending key
        key: usize,
    },

    /// Keys are present but the output dimension is 0
    #[error("curve has keys but output dimension 0")]
    ZeroDimension,
}

/// Key-framed animation curve.
///
/// Arrays are exposed by reference for in-place editing. Not `Clone`: the
/// interpolation array may borrow a buffer the caller owns.
#[derive(Debug)]
pub struct AnimationCurve<'a> {
    id: EntityId,
    out_dimension: usize,
    interpolation_type: InterpolationType,
    input_values: NumericArray,
    output_values: NumericArray,
    interpolations: TypedArray<'a, InterpolationType>,
    in_tangent_values: NumericArray,
    out_tangent_values: NumericArray,
}

impl<'a> AnimationCurve<'a> {
    /// Empty curve: unknown interpolation, dimension 0, no keys.
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            out_dimension: 0,
            interpolation_type: InterpolationType::Unknown,
            input_values: NumericArray::default(),
            output_values: NumericArray::default(),
            interpolations: TypedArray::new(),
            in_tangent_values: NumericArray::default(),
            out_tangent_values: NumericArray::default(),
        }
    }

    /// Entity identifier
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Components per output value, e.g. 1 for a scalar, 3 for a position
    pub fn out_dimension(&self) -> usize {
        self.out_dimension
    }

    /// Set the components per output value
    pub fn set_out_dimension(&mut self, dimension: usize) {
        self.out_dimension = dimension;
    }

    /// Curve-wide interpolation type
    pub fn interpolation_type(&self) -> InterpolationType {
        self.interpolation_type
    }

    /// Set the curve-wide interpolation type
    pub fn set_interpolation_type(&mut self, interpolation: InterpolationType) {
        self.interpolation_type = interpolation;
    }

    /// Key inputs
    pub fn input_values(&self) -> &NumericArray {
        &self.input_values
    }

    /// Key inputs, mutably
    pub fn input_values_mut(&mut self) -> &mut NumericArray {
        &mut self.input_values
    }

    /// Replace the key inputs
    pub fn set_input_values(&mut self, values: NumericArray) {
        self.input_values = values;
    }

    /// Packed output values
    pub fn output_values(&self) -> &NumericArray {
        &self.output_values
    }

    /// Packed output values, mutably
    pub fn output_values_mut(&mut self) -> &mut NumericArray {
        &mut self.output_values
    }

    /// Replace the output values
    pub fn set_output_values(&mut self, values: NumericArray) {
        self.output_values = values;
    }

    /// Per-segment interpolation kinds
    pub fn interpolations(&self) -> &TypedArray<'a, InterpolationType> {
        &self.interpolations
    }

    /// Per-segment interpolation kinds, mutably
    pub fn interpolations_mut(&mut self) -> &mut TypedArray<'a, InterpolationType> {
        &mut self.interpolations
    }

    /// Replace the per-segment interpolation kinds
    pub fn set_interpolations(&mut self, interpolations: TypedArray<'a, InterpolationType>) {
        self.interpolations = interpolations;
    }

    /// Incoming tangents
    pub fn in_tangent_values(&self) -> &NumericArray {
        &self.in_tangent_values
    }

    /// Incoming tangents, mutably
    pub fn in_tangent_values_mut(&mut self) -> &mut NumericArray {
        &mut self.in_tangent_values
    }

    /// Outgoing tangents
    pub fn out_tangent_values(&self) -> &NumericArray {
        &self.out_tangent_values
    }

    /// Outgoing tangents, mutably
    pub fn out_tangent_values_mut(&mut self) -> &mut NumericArray {
        &mut self.out_tangent_values
    }

    /// Number of keys
    pub fn key_count(&self) -> usize {
        self.input_values.count()
    }

    /// Interpolation of the segment from key `index` to key `index + 1`.
    ///
    /// The last key starts no segment, so its interpolation entry is never
    /// consulted.
    pub fn segment_interpolation(&self, index: usize) -> Option<InterpolationType> {
        if index >= self.key_count().saturating_sub(1) {
            return None;
        }
        match self.interpolation_type {
            InterpolationType::Mixed => self.interpolations.get(index).copied(),
            kind => Some(kind),
        }
    }

    /// Check if any segment reads tangent values
    pub fn uses_tangents(&self) -> bool {
        match self.interpolation_type {
            InterpolationType::Mixed => (0..self.key_count())
                .filter_map(|i| self.segment_interpolation(i))
                .any(InterpolationType::uses_tangents),
            kind => kind.uses_tangents(),
        }
    }

    /// Verify the cross-field rules, reporting every defect found.
    pub fn check_shape(&self) -> Result<(), Vec<CurveDefect>> {
        let mut defects = Vec::new();
        let keys = self.key_count();
        let outputs = self.output_values.count();

        if keys > 0 && self.out_dimension == 0 {
            defects.push(CurveDefect::ZeroDimension);
        }

        match keys.checked_mul(self.out_dimension) {
            Some(expected) if expected == outputs => {}
            // an overflowing product matches no array length
            expected => defects.push(CurveDefect::OutputCountMismatch {
                expected: expected.unwrap_or(usize::MAX),
                actual: outputs,
            }),
        }

        let entries = self.interpolations.count();
        if self.interpolation_type == InterpolationType::Mixed {
            if entries != keys {
                defects.push(CurveDefect::InterpolationCountMismatch {
                    expected: keys,
                    actual: entries,
                });
            }
        } else if entries > 0 {
            defects.push(CurveDefect::UnexpectedInterpolations {
                kind: self.interpolation_type,
                count: entries,
            });
        }

        let uses_tangents = self.uses_tangents();
        let tangents = [
            (TangentSide::In, &self.in_tangent_values),
            (TangentSide::Out, &self.out_tangent_values),
        ];
        for (side, values) in tangents {
            if values.is_empty() {
                continue;
            }
            if !uses_tangents {
                defects.push(CurveDefect::UnexpectedTangents { side });
            } else if values.count() != outputs {
                defects.push(CurveDefect::TangentCountMismatch {
                    side,
                    expected: outputs,
                    actual: values.count(),
                });
            }
        }

        let inputs: Vec<f64> = self.input_values.iter_f64().collect();
        if let Some(key) = inputs
            .windows(2)
            .position(|pair| pair[1].partial_cmp(&pair[0]) != Some(Ordering::Greater))
        {
            defects.push(CurveDefect::InputsNotIncreasing { key: key + 1 });
        }

        if defects.is_empty() {
            Ok(())
        } else {
            log::debug!("curve {}: {} shape defects", self.id, defects.len());
            Err(defects)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::arrays::{NumericType, Ownership};

    fn curve() -> AnimationCurve<'static> {
        AnimationCurve::new(EntityId::allocate())
    }

    #[test]
    fn test_new_curve_defaults() {
        let c = curve();
        assert_eq!(c.out_dimension(), 0);
        assert_eq!(c.interpolation_type(), InterpolationType::Unknown);
        assert_eq!(c.key_count(), 0);
        assert_eq!(c.input_values().element_type(), NumericType::Float);
        assert_eq!(c.interpolations().ownership(), Ownership::Exclusive);
        assert_eq!(c.check_shape(), Ok(()));
    }

    #[test]
    fn test_position_curve_is_well_formed() {
        let mut c = curve();
        c.set_out_dimension(3);
        c.set_interpolation_type(InterpolationType::Linear);
        c.set_input_values(vec![0.0f32, 1.0, 2.0, 3.0].into());
        c.set_output_values(NumericArray::from(vec![0.0f32; 12]));

        assert_eq!(c.check_shape(), Ok(()));
        assert_eq!(c.segment_interpolation(0), Some(InterpolationType::Linear));
        assert_eq!(c.segment_interpolation(3), None);
    }

    #[test]
    fn test_output_mismatch_detected() {
        let mut c = curve();
        c.set_out_dimension(3);
        c.set_input_values(vec![0.0f32, 1.0, 2.0, 3.0].into());
        c.set_output_values(NumericArray::from(vec![0.0f32; 11]));

        assert_eq!(
            c.check_shape(),
            Err(vec![CurveDefect::OutputCountMismatch {
                expected: 12,
                actual: 11
            }])
        );
    }

    #[test]
    fn test_mixed_curve_segments() {
        let kinds = [
            InterpolationType::Step,
            InterpolationType::Linear,
            InterpolationType::Bezier,
        ];
        let mut c = AnimationCurve::new(EntityId::allocate());
        c.set_out_dimension(1);
        c.set_interpolation_type(InterpolationType::Mixed);
        c.set_input_values(vec![0.0f64, 0.5, 1.0].into());
        c.set_output_values(vec![1.0f64, 2.0, 3.0].into());
        c.set_interpolations(TypedArray::borrowed(&kinds));

        assert_eq!(c.interpolations().ownership(), Ownership::Borrowed);
        assert_eq!(c.segment_interpolation(0), Some(InterpolationType::Step));
        assert_eq!(c.segment_interpolation(1), Some(InterpolationType::Linear));
        // no segment follows the last key
        assert_eq!(c.segment_interpolation(2), None);
        // the trailing BEZIER entry governs no segment
        assert!(!c.uses_tangents());
        assert_eq!(c.check_shape(), Ok(()));
    }

    #[test]
    fn test_mixed_interpolation_count_checked() {
        let mut c = curve();
        c.set_out_dimension(1);
        c.set_interpolation_type(InterpolationType::Mixed);
        c.set_input_values(vec![0.0f32, 1.0].into());
        c.set_output_values(vec![0.0f32, 1.0].into());
        c.interpolations_mut().push(InterpolationType::Linear);

        assert_eq!(
            c.check_shape(),
            Err(vec![CurveDefect::InterpolationCountMismatch {
                expected: 2,
                actual: 1
            }])
        );
    }

    #[test]
    fn test_tangent_rules() {
        let mut c = curve();
        c.set_out_dimension(1);
        c.set_interpolation_type(InterpolationType::Bezier);
        c.set_input_values(vec![0.0f32, 1.0].into());
        c.set_output_values(vec![0.0f32, 1.0].into());
        *c.in_tangent_values_mut() = vec![0.0f32, 0.5].into();
        *c.out_tangent_values_mut() = vec![0.5f32].into();

        assert_eq!(
            c.check_shape(),
            Err(vec![CurveDefect::TangentCountMismatch {
                side: TangentSide::Out,
                expected: 2,
                actual: 1
            }])
        );

        c.set_interpolation_type(InterpolationType::Linear);
        let defects = c.check_shape().unwrap_err();
        assert!(defects.contains(&CurveDefect::UnexpectedTangents { side: TangentSide::In }));
        assert!(defects.contains(&CurveDefect::UnexpectedTangents { side: TangentSide::Out }));
    }

    #[test]
    fn test_non_increasing_inputs_reported_not_rejected() {
        let mut c = curve();
        c.set_out_dimension(1);
        c.set_input_values(vec![0.0f32, 2.0, 2.0, 1.0].into());
        c.set_output_values(vec![0.0f32; 4].into());

        assert_eq!(
            c.check_shape(),
            Err(vec![CurveDefect::InputsNotIncreasing { key: 2 }])
        );
    }

    #[test]
    fn test_every_defect_collected() {
        let mut c = curve();
        c.set_input_values(vec![1.0f32, 0.0].into());
        c.set_output_values(vec![0.0f32].into());
        c.interpolations_mut().push(InterpolationType::Step);

        let defects = c.check_shape().unwrap_err();
        assert_eq!(defects.len(), 4);
        assert_eq!(defects[0], CurveDefect::ZeroDimension);
        assert_eq!(defects[0].to_string(), "curve has keys but output dimension 0");
    }

    #[test]
    fn test_huge_dimension_does_not_overflow() {
        let mut c = curve();
        c.set_out_dimension(usize::MAX);
        c.set_input_values(vec![0.0f32, 1.0].into());
        c.set_output_values(vec![0.0f32, 0.0].into());

        let defects = c.check_shape().unwrap_err();
        assert_eq!(
            defects,
            vec![CurveDefect::OutputCountMismatch {
                expected: usize::MAX,
                actual: 2
            }]
        );
    }

    #[test]
    fn test_segment_index_at_usize_max() {
        let mut c = curve();
        c.set_interpolation_type(InterpolationType::Linear);
        c.set_input_values(vec![0.0f32, 1.0].into());
        assert_eq!(c.segment_interpolation(0), Some(InterpolationType::Linear));
        assert_eq!(c.segment_interpolation(usize::MAX), None);

        let empty = curve();
        assert_eq!(empty.segment_interpolation(0), None);
    }

    #[test]
    fn test_interpolation_names() {
        assert_eq!(InterpolationType::from_name("BEZIER"), InterpolationType::Bezier);
        assert_eq!(InterpolationType::from_name("bezier"), InterpolationType::Unknown);
        assert_eq!(InterpolationType::BSpline.to_string(), "BSPLINE");
        assert!(InterpolationType::Hermite.uses_tangents());
        assert!(!InterpolationType::Step.uses_tangents());
    }
}
