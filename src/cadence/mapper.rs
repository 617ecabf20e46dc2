//! 24p / 60-field index mapping
//!
//! Both walks scan a 14-field pattern window. The first split point only marks
//! the end of the leading context; every later split closes one output frame.
//! Field positions reported here are relative to the cycle start, so the two
//! context fields make `field_start` range over `-2..`.

use super::pattern::{PatternField, CYCLE_FIELDS, CYCLE_FRAMES};
use crate::error::{Error, Result};
use serde::Serialize;

/// Field span of one 24p frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Frame24Info {
    /// Cadence cycle
    pub cycle_index: i64,
    /// Frame within the cycle; may leave `0..4` for 60-domain lookups
    pub frame_index: i32,
    /// First field relative to the cycle start
    pub field_start: i32,
    /// Number of fields (2, 3 or 4 for film cadences)
    pub num_fields: i32,
    /// Field shift of the pattern that produced this span
    pub field_shift: i32,
}

impl Frame24Info {
    /// First field as an absolute field number
    pub fn absolute_field_start(&self) -> i64 {
        self.cycle_index * CYCLE_FIELDS as i64 + self.field_start as i64
    }

    /// Absolute 24p frame number
    pub fn frame24(&self) -> i64 {
        self.cycle_index * CYCLE_FRAMES as i64 + self.frame_index as i64
    }

    /// Whether `frame_index` lies inside its own cycle
    pub fn is_within_cycle(&self) -> bool {
        (0..CYCLE_FRAMES as i32).contains(&self.frame_index)
    }
}

/// Locate the fields of 24p frame `n24`
pub fn get_frame24(window: &[PatternField], field_shift: i32, n24: i64) -> Result<Frame24Info> {
    let cycle_index = n24.div_euclid(CYCLE_FRAMES as i64);
    let frame_index = n24.rem_euclid(CYCLE_FRAMES as i64) as i32;

    let mut fldstart = 0;
    let mut nframes = 0;
    for (i, field) in window.iter().enumerate() {
        if !field.split {
            continue;
        }
        if fldstart >= 1 {
            if nframes == frame_index {
                return Ok(Frame24Info {
                    cycle_index,
                    frame_index,
                    field_start: fldstart - 2,
                    num_fields: i as i32 + 1 - fldstart,
                    field_shift,
                });
            }
            nframes += 1;
        }
        fldstart = i as i32 + 1;
    }

    Err(Error::pattern_table(format!(
        "no split point for frame {} of cycle {}",
        frame_index, cycle_index
    )))
}

/// Locate the 24p frame whose fields contain native field position `n60`
///
/// `frame_index` is -1 when the position falls before the first frame of the
/// cycle and 4 (or more) when it falls after the last one.
pub fn get_frame60(window: &[PatternField], field_shift: i32, n60: i64) -> Frame24Info {
    let cycle_index = n60.div_euclid(CYCLE_FIELDS as i64);
    let findex = n60.rem_euclid(CYCLE_FIELDS as i64) as i32;

    let mut fldstart = 0;
    let mut nframes = -1;
    for (i, field) in window.iter().enumerate() {
        if !field.split {
            continue;
        }
        if fldstart >= 1 {
            nframes += 1;
        }
        let next = i as i32 + 1;
        if findex < next - 2 {
            return Frame24Info {
                cycle_index,
                frame_index: nframes,
                field_start: fldstart - 2,
                num_fields: next - fldstart,
                field_shift,
            };
        }
        fldstart = next;
    }

    Frame24Info {
        cycle_index,
        frame_index: nframes + 1,
        field_start: fldstart - 2,
        num_fields: window.len() as i32 - fldstart,
        field_shift,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::pattern::{catalog, PulldownPattern};

    #[test]
    fn test_frame24_spans_2323() {
        let cat = catalog();
        // phase 2 window starts on a cycle boundary
        let spans: Vec<(i32, i32)> = (0..4)
            .map(|k| {
                let info = cat.get_frame24(2, k).unwrap();
                (info.field_start, info.num_fields)
            })
            .collect();
        assert_eq!(spans, vec![(0, 3), (3, 2), (5, 3), (8, 2)]);
    }

    #[test]
    fn test_frame24_cycle_arithmetic() {
        let info = catalog().get_frame24(0, 9).unwrap();
        assert_eq!(info.cycle_index, 2);
        assert_eq!(info.frame_index, 1);
        let info = catalog().get_frame24(0, -1).unwrap();
        assert_eq!(info.cycle_index, -1);
        assert_eq!(info.frame_index, 3);
    }

    #[test]
    fn test_round_trip_every_entry() {
        let cat = catalog();
        for index in 0..cat.len() {
            for k in 0..4 {
                let f24 = cat.get_frame24(index, k).unwrap();
                if !cat.is_progressive(index) {
                    assert!((2..=4).contains(&f24.num_fields), "entry {} frame {}", index, k);
                }
                let n60 = f24.cycle_index * 10 + f24.field_start.max(0) as i64;
                let f60 = cat.get_frame60(index, n60).unwrap();
                assert_eq!(f60.frame_index as i64, k, "entry {} frame {}", index, k);
            }
        }
    }

    #[test]
    fn test_round_trip_shifted_pattern() {
        for shift in [-3, 1, 4] {
            let pattern = PulldownPattern::new(&[2, 2, 3, 3])
                .unwrap()
                .with_field_shift(shift)
                .unwrap();
            for phase in 0..10 {
                let window = pattern.window(phase).unwrap();
                for k in 0..4 {
                    let f24 = get_frame24(window, shift, k).unwrap();
                    assert_eq!(f24.field_shift, shift);
                    let n60 = f24.cycle_index * 10 + f24.field_start.max(0) as i64;
                    assert_eq!(get_frame60(window, shift, n60).frame24(), k);
                }
            }
        }
    }

    #[test]
    fn test_frame60_outside_cycle() {
        let cat = catalog();
        // 2-3-2-3 phase 4 opens with the tail of the previous cycle's last frame
        let head = cat.get_frame60(4, 0).unwrap();
        assert_eq!(head.frame_index, -1);
        assert!(!head.is_within_cycle());
        assert_eq!(cat.get_frame60(4, 1).unwrap().frame_index, 0);
        // phase 1 ends with the head of the next cycle's first frame
        let tail = cat.get_frame60(1, 9).unwrap();
        assert_eq!(tail.frame_index, 4);
        assert_eq!(cat.get_frame60(0, 9).unwrap().frame_index, 3);
        // 2-2-2-4 phase 8 starts two fields early
        assert_eq!(cat.get_frame60(23, 11).unwrap().frame_index, -1);
        assert_eq!(cat.get_frame60(23, 11).unwrap().cycle_index, 1);
    }

    #[test]
    fn test_no_split_is_pattern_table_error() {
        let window = [PatternField::default(); 14];
        let err = get_frame24(&window, 0, 0).unwrap_err();
        assert!(matches!(err, Error::PatternTable(_)));
        assert_eq!(get_frame60(&window, 0, 3).frame_index, 0);
    }
}
