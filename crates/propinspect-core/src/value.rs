//! Typed property values and their classification from host data.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, SecondsFormat, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// A property value as stored in the indexes.
///
/// Equality is exact per variant: `Integer(1)` and `Real(1.0)` are different
/// values. Values of different variants order by rank
/// `Text < Integer < Real < Boolean < None`. Reals use the IEEE total order
/// after folding `-0.0` into `0.0`, so `NaN` has a fixed place in sorted
/// output and both zeros are one value.
#[derive(Debug, Clone, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Value {
    Text(CompactString),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    None,
}

impl Value {
    /// Create a text value.
    pub fn text(s: impl Into<CompactString>) -> Self {
        Self::Text(s.into())
    }

    /// Classify a raw host value. Never fails; unknown shapes become `None`.
    pub fn classify(raw: &RawValue) -> Self {
        match raw {
            RawValue::DisplayString(s) | RawValue::IdentifierString(s) => Self::Text(s.clone()),
            RawValue::NamedConstant { display_name, .. } => Self::Text(display_name.clone()),
            RawValue::Int32(i) => Self::Integer(i64::from(*i)),
            RawValue::Int64(i) => Self::Integer(*i),
            RawValue::Double(d)
            | RawValue::DoubleLength(d)
            | RawValue::DoubleAngle(d)
            | RawValue::DoubleArea(d)
            | RawValue::DoubleVolume(d) => Self::Real(unsigned_zero(*d)),
            RawValue::Boolean(b) => Self::Boolean(*b),
            RawValue::DateTime(t) => {
                Self::Text(t.to_rfc3339_opts(SecondsFormat::Secs, true).into())
            }
            RawValue::Point3D { .. } | RawValue::Empty | RawValue::Other { .. } => Self::None,
        }
    }

    /// Name of this value's variant (e.g. "text", "real").
    pub fn type_name(&self) -> &'static str {
        self.into()
    }

    /// Check if this is the `None` value.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Text(_) => 0,
            Self::Integer(_) => 1,
            Self::Real(_) => 2,
            Self::Boolean(_) => 3,
            Self::None => 4,
        }
    }
}

impl From<&RawValue> for Value {
    fn from(raw: &RawValue) -> Self {
        Self::classify(raw)
    }
}

/// Map `-0.0` to `0.0`, leaving every other value (NaN included) as is.
fn unsigned_zero(r: f64) -> f64 {
    r + 0.0
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Real(a), Self::Real(b)) => unsigned_zero(*a).total_cmp(&unsigned_zero(*b)),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Text(s) => s.hash(state),
            Self::Integer(i) => i.hash(state),
            // Equal reals have equal bits once the zero sign is folded.
            Self::Real(r) => unsigned_zero(*r).to_bits().hash(state),
            Self::Boolean(b) => b.hash(state),
            Self::None => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            // Debug keeps the fractional part so 1.0 and 1 stay distinguishable.
            Self::Real(r) => write!(f, "{r:?}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::None => f.write_str("(none)"),
        }
    }
}

/// A property value in the shape the host supplies it.
///
/// Mirrors the variant data types a review application exposes; the set is
/// open-ended on the host side, so anything unrecognized arrives as `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RawValue {
    DisplayString(CompactString),
    IdentifierString(CompactString),
    NamedConstant {
        id: i64,
        display_name: CompactString,
    },
    Int32(i32),
    Int64(i64),
    Double(f64),
    DoubleLength(f64),
    DoubleAngle(f64),
    DoubleArea(f64),
    DoubleVolume(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    #[serde(rename = "point3d")]
    Point3D {
        x: f64,
        y: f64,
        z: f64,
    },
    Empty,
    Other {
        tag: CompactString,
    },
}
