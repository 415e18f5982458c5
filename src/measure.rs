//! Simple zero-overhead unit of measure types
//!
//! A poor man's version of F#'s units of measure, in order to keep units
//! correct by construction.  Newtypes rather than the popular `uom` crate
//! because the latter obscures the actual storage unit and numeric type.

use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign, Div, Mul, Sub};

use approx::{AbsDiffEq, RelativeEq, relative_eq};
use num_traits::{Float, Num};

pub trait IntoDimBase {
    type DimBase;

    fn into_dim_base(self) -> Self::DimBase;
}

pub trait FromUnit<U> {
    fn from_unit(u: U) -> Self;
}

pub trait IntoUnit<U> {
    fn into_unit(self) -> U;
}

macro_rules! unit_of_measure {
    ($u:ident) => {
        #[derive(Clone, Copy, Default, PartialEq, PartialOrd, Debug)]
        pub struct $u<N: Num>(pub N);

        impl<N> Add for $u<N>
        where
            N: Num + Add,
        {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl<N> AddAssign for $u<N>
        where
            N: Num + AddAssign,
        {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl<N> Sub for $u<N>
        where
            N: Num + Sub,
        {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl<N> Mul<N> for $u<N>
        where
            N: Num + Mul,
        {
            type Output = Self;

            fn mul(self, rhs: N) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl<N> Div<N> for $u<N>
        where
            N: Num + Div,
        {
            type Output = Self;

            fn div(self, rhs: N) -> Self {
                Self(self.0 / rhs)
            }
        }

        // Relative equality traits for approx support

        impl<N> AbsDiffEq for $u<N>
        where
            N: Num + Float + AbsDiffEq<N, Epsilon = N>,
        {
            type Epsilon = N;

            fn default_epsilon() -> Self::Epsilon {
                N::epsilon()
            }

            fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
                self.0.abs_diff_eq(&other.0, epsilon)
            }
        }

        impl<N> RelativeEq for $u<N>
        where
            N: Num + Float + AbsDiffEq<N, Epsilon = N> + RelativeEq<N>,
        {
            fn default_max_relative() -> Self::Epsilon {
                N::epsilon()
            }

            fn relative_eq(
                &self,
                other: &Self,
                epsilon: Self::Epsilon,
                max_relative: Self::Epsilon,
            ) -> bool {
                relative_eq!(
                    self.0,
                    other.0,
                    epsilon = epsilon,
                    max_relative = max_relative
                )
            }
        }
    };

    ($u:ident, $coeff:tt * $base:ident) => {
        unit_of_measure!($u);
        unit_conversion!($u, $coeff, $base);
    };

    ($u:ident, $base:ident * $coeff:tt) => {
        unit_of_measure!($u);
        unit_conversion!($u, $coeff, $base);
    };

    ($u:ident, $base:ident / $coeff:tt) => {
        unit_of_measure!($u);
        unit_conversion!($u, 1.0 / ($coeff as f64), $base);
    };
}

macro_rules! unit_conversion {
    ($u:ident, $coeff:expr, $base:ident) => {
        impl<N> FromUnit<$u<N>> for $base<f64>
        where
            N: Num,
            f64: From<N>,
        {
            fn from_unit(value: $u<N>) -> Self {
                Self(<f64 as From<N>>::from(value.0) * ($coeff as f64))
            }
        }

        impl<N> FromUnit<$base<N>> for $u<f64>
        where
            N: Num,
            f64: From<N>,
        {
            fn from_unit(value: $base<N>) -> Self {
                Self(<f64 as From<N>>::from(value.0) / ($coeff as f64))
            }
        }

        impl<N> IntoDimBase for $u<N>
        where
            N: Num,
            f64: From<N>,
        {
            type DimBase = $base<f64>;

            fn into_dim_base(self) -> Self::DimBase {
                Self::DimBase::from_unit(self)
            }
        }
    };
}

impl<U, V> FromUnit<V> for U
where
    U: FromUnit<V::DimBase>,
    V: IntoDimBase,
{
    fn from_unit(v: V) -> Self {
        U::from_unit(v.into_dim_base())
    }
}

impl<U, V> IntoUnit<U> for V
where
    U: FromUnit<V>,
{
    fn into_unit(self) -> U {
        U::from_unit(self)
    }
}

macro_rules! unit_ratio_impl {
    ($ratio:ident, $num:ident, $denom:ident) => {
        impl<N> Div<$denom<N>> for $num<N>
        where
            N: Num + Div,
        {
            type Output = $ratio<N>;

            fn div(self, rhs: $denom<N>) -> Self::Output {
                $ratio(self.0 / rhs.0)
            }
        }

        impl<N> Mul<$denom<N>> for $ratio<N>
        where
            N: Num + Mul,
        {
            type Output = $num<N>;

            fn mul(self, rhs: $denom<N>) -> Self::Output {
                $num(self.0 * rhs.0)
            }
        }
    };
}

macro_rules! unit_ratio {
    ($ratio:ident, $num:ident, $denom:ident) => {
        unit_ratio_impl!($ratio, $num, $denom);
        unit_ratio_impl!($denom, $num, $ratio);
    };
}

// Time units:
unit_of_measure![Seconds];
unit_of_measure![Minutes, 60 * Seconds];
unit_of_measure![Hours, 3600 * Seconds];

// Distance units:
unit_of_measure![Meters];
unit_of_measure![Kilometers, 1000 * Meters];

// Angular units:
unit_of_measure![Degrees];

// Velocity / speed units:
unit_of_measure![MetersPerSecond];
unit_of_measure![KilometersPerHour];

impl<N> From<KilometersPerHour<N>> for MetersPerSecond<N>
where
    N: Num + From<u8>,
{
    fn from(value: KilometersPerHour<N>) -> Self {
        MetersPerSecond(value.0 * N::from(5u8) / N::from(18u8))
    }
}

unit_ratio![MetersPerSecond, Meters, Seconds];

impl Seconds<f64> {
    /// Convert to a `chrono` duration, rounding to whole milliseconds.
    pub fn to_chrono(self) -> chrono::Duration {
        chrono::Duration::milliseconds((self.0 * 1000.0).round() as i64)
    }
}

impl<T> Display for Meters<T>
where
    T: Num + Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}m", self.0)
    }
}

impl<T> Display for Seconds<T>
where
    T: Num + Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl<T> Display for Degrees<T>
where
    T: Num + Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.0)
    }
}
