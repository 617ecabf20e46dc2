//! Field weaving
//!
//! Fields are numbered absolutely: field `2n` is the first field of source
//! frame `n` and field `2n + 1` its second, following the frame's field order.

use crate::error::{Error, Result};
use crate::source::FrameSource;
use crate::util::{FieldOrder, Pixel, PlanarFrame};
use std::sync::Arc;

/// Frame with even rows from `top` and odd rows from `bottom`
pub fn weave_fields<T: Pixel>(
    top: &PlanarFrame<T>,
    bottom: &PlanarFrame<T>,
) -> Result<PlanarFrame<T>> {
    top.ensure_same_geometry(bottom)?;
    let mut dst = top.clone();
    for p in 0..3 {
        let src = bottom.plane(p);
        let plane = dst.plane_mut(p);
        for y in (1..plane.height()).step_by(2) {
            plane.row_mut(y).copy_from_slice(src.row(y));
        }
    }
    Ok(dst)
}

/// Copy of `src` whose rows of `parity` are averaged with `rf`
pub fn weave_three<T: Pixel>(
    src: &PlanarFrame<T>,
    rf: &PlanarFrame<T>,
    parity: usize,
) -> Result<PlanarFrame<T>> {
    src.ensure_same_geometry(rf)?;
    let mut dst = src.clone();
    for p in 0..3 {
        let other = rf.plane(p);
        let plane = dst.plane_mut(p);
        for y in (parity..plane.height()).step_by(2) {
            let row = other.row(y);
            for (d, r) in plane.row_mut(y).iter_mut().zip(row) {
                *d = T::from_i32((d.to_i32() + r.to_i32() + 1) >> 1);
            }
        }
    }
    Ok(dst)
}

/// Weave second field of `first` with first field of `next`
fn weave_across<T: Pixel>(
    first: &PlanarFrame<T>,
    next: &PlanarFrame<T>,
    order: FieldOrder,
) -> Result<PlanarFrame<T>> {
    match order {
        FieldOrder::TopFieldFirst => weave_fields(next, first),
        FieldOrder::BottomFieldFirst => weave_fields(first, next),
    }
}

/// Progressive frame from `num_fields` fields starting at absolute field
/// `field_start`
///
/// Two fields are woven as they are. With three, the repeated field is
/// averaged with its copy. With four, the middle pair is woven.
pub fn create_weave_frame<T: Pixel, S: FrameSource<T> + ?Sized>(
    source: &S,
    field_start: i64,
    num_fields: i32,
) -> Result<Arc<PlanarFrame<T>>> {
    let n = field_start.div_euclid(2);
    let phase = field_start.rem_euclid(2);
    let order = source.field_order(n);

    let frame = match (num_fields, phase) {
        (2, 0) => return source.get_frame(n),
        (2, _) | (4, 0) => {
            let (a, b) = (source.get_frame(n)?, source.get_frame(n + 1)?);
            weave_across(&a, &b, order)?
        }
        (3, 0) => {
            let (a, b) = (source.get_frame(n)?, source.get_frame(n + 1)?);
            weave_three(&a, &b, order.first_field_parity())?
        }
        (3, _) => {
            let (a, b) = (source.get_frame(n)?, source.get_frame(n + 1)?);
            weave_three(&b, &a, order.second_field_parity())?
        }
        (4, _) => return source.get_frame(n + 1),
        _ => {
            return Err(Error::pattern_table(format!(
                "cannot weave {} fields at field {}",
                num_fields, field_start
            )))
        }
    };
    Ok(Arc::new(frame))
}
