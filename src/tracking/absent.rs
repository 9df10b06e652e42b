//! The "absent" sentinel of each field type.
//!
//! Partial-update payloads arrive with untouched fields left at their
//! default. A field whose value is its type's sentinel is treated as
//! "not supplied" by `merge_from`. The convention cannot tell "cleared on
//! purpose" from "never touched"; a field at its sentinel never overwrites
//! stored data.

use crate::core::{Timestamp, epoch};
use chrono::NaiveDate;

pub trait Absent {
    fn is_absent(&self) -> bool;
}

impl Absent for String {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl Absent for &str {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! zero_is_absent {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Absent for $ty {
                fn is_absent(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

zero_is_absent!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Absent for f32 {
    fn is_absent(&self) -> bool {
        *self == 0.0
    }
}

impl Absent for f64 {
    fn is_absent(&self) -> bool {
        *self == 0.0
    }
}

/// `false` is the default of a boolean flag, so a partial can only ever
/// raise a flag, never lower it.
impl Absent for bool {
    fn is_absent(&self) -> bool {
        !*self
    }
}

impl Absent for Timestamp {
    fn is_absent(&self) -> bool {
        *self == epoch()
    }
}

impl Absent for NaiveDate {
    fn is_absent(&self) -> bool {
        *self == epoch().date_naive()
    }
}

impl<T> Absent for Option<T> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }
}
