use super::error::Error;
use crate::model::gradient::GradientBuffer;

/// Largest `|num − ana|` over every atom and axis.
///
/// # Errors
///
/// [`Error::AtomCountMismatch`] if the buffers cover different atom sets.
pub fn max_abs_deviation(
    numerical: &GradientBuffer,
    analytic: &GradientBuffer,
) -> Result<f64, Error> {
    numerical.ensure_same_shape(analytic)?;
    Ok(numerical
        .iter()
        .zip(analytic.iter())
        .flat_map(|(n, a)| (0..3).map(move |k| (n[k] - a[k]).abs()))
        .fold(0.0, nan_max))
}

/// Largest absolute component of `buffer`.
pub fn max_abs(buffer: &GradientBuffer) -> f64 {
    buffer
        .iter()
        .flat_map(|r| r.iter().map(|v| v.abs()))
        .fold(0.0, nan_max)
}

// NaN is sticky so a broken evaluator can never look like a perfect match.
fn nan_max(acc: f64, v: f64) -> f64 {
    if acc.is_nan() || v.is_nan() {
        f64::NAN
    } else {
        acc.max(v)
    }
}

/// Signed `num − ana` for every component, in atom order.
pub fn signed_deviations(
    numerical: &GradientBuffer,
    analytic: &GradientBuffer,
) -> Result<GradientBuffer, Error> {
    numerical.ensure_same_shape(analytic)?;
    Ok(GradientBuffer::from_rows(
        numerical
            .iter()
            .zip(analytic.iter())
            .map(|(n, a)| [n[0] - a[0], n[1] - a[1], n[2] - a[2]])
            .collect(),
    ))
}

/// Mixed absolute/relative closeness, `|a − b| ≤ atol + rtol·|b|`, for each
/// component. Returns the first failing `(atom, axis)` if any; NaN is never
/// close to anything.
pub fn first_not_close(
    a: &GradientBuffer,
    b: &GradientBuffer,
    rtol: f64,
    atol: f64,
) -> Result<Option<(usize, usize)>, Error> {
    a.ensure_same_shape(b)?;
    for (i, (ra, rb)) in a.iter().zip(b.iter()).enumerate() {
        for k in 0..3 {
            let close = (ra[k] - rb[k]).abs() <= atol + rtol * rb[k].abs();
            if !close {
                return Ok(Some((i, k)));
            }
        }
    }
    Ok(None)
}
