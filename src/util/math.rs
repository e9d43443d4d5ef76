use num::{Complex, Num};
use num_traits::NumCast;
use std::f64::consts::PI;

const TWO_PI: f64 = 2.0 * PI;

/// Casts a Complex<T> to a Complex<U>. All of the normal caveats with using
/// the `as` keyword apply here for the conversion.
pub fn cast_complex<T, U>(input: &Complex<T>) -> Option<Complex<U>>
where
    T: Clone + Num + NumCast,
    U: Clone + Num + NumCast,
{
    let re = U::from(input.re.clone())?;
    let im = U::from(input.im.clone())?;
    Some(Complex::new(re, im))
}

/// Removes whole turns from `phase` until it lies in (-2π, 2π].
///
/// Values already inside the interval are returned untouched, including
/// exactly 2π.
pub fn wrap_phase(phase: f64) -> f64 {
    if phase > TWO_PI || phase <= -TWO_PI {
        let wrapped = phase % TWO_PI;
        if wrapped <= -TWO_PI {
            wrapped + TWO_PI
        } else {
            wrapped
        }
    } else {
        phase
    }
}

/// Limits `x` to [-clip, clip] without branching.
///
/// The sum and difference can round past `clip`, so the result is pinned to
/// the interval afterwards.
pub fn branchless_clip(x: f64, clip: f64) -> f64 {
    (0.5 * ((x + clip).abs() - (x - clip).abs())).max(-clip).min(clip)
}
