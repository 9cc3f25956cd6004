use std::fmt::Debug;

use num_traits::{Bounded, Num, NumCast, ToPrimitive};

/// A trait for types that can be used as coordinates of points stored in a
/// [`KdTree`][crate::kdtree::KdTree].
///
/// Coordinates are compared in their own type (split planes, range boxes, exact lookup) but every
/// distance is accumulated in `f64`, so integer coordinates never overflow when squared.
///
/// This trait is sealed and cannot be implemented for external types.
pub trait CoordNum:
    private::Sealed
    + Num
    + NumCast
    + ToPrimitive
    + PartialOrd
    + Copy
    + Debug
    + Send
    + Sync
    + Bounded
{
    /// Widen this coordinate to `f64` for distance computations.
    #[inline]
    fn as_f64(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }
}

macro_rules! impl_coord_num {
    ($($t:ty),* $(,)?) => {
        $(
            impl CoordNum for $t {}

            impl private::Sealed for $t {}
        )*
    };
}

impl_coord_num!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

// https://rust-lang.github.io/api-guidelines/future-proofing.html#sealed-traits-protect-against-downstream-implementations-c-sealed
mod private {
    pub trait Sealed {}
}
