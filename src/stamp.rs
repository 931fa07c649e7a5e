//! Filename stems derived from the RTC.
//!
//! Each deployment names its datafile after the moment the logger came up:
//! twelve digits, `YYMMDDHHmmss`, two zero-padded digits per field. The
//! stem is built in a fixed [`heapless::String`]; nothing here allocates.
//!
//! FAT short names cap base names at eight characters, so the full stem is
//! longer than an 8.3 filename allows. Deployments on short-name volumes
//! record the stem in the datafile header and truncate for the name.

use crate::clock::{Clock, TimeFields};

/// Stem length in bytes: six fields, two digits each.
pub const STEM_LEN: usize = 12;

/// A fully built stem, e.g. `230327140509` for 2023-03-27 14:05:09.
pub type FilenameStem = heapless::String<STEM_LEN>;

/// Append `value` as exactly two ASCII digits, zero-padded.
///
/// Values above 99 clamp to 99; RTC fields never exceed two digits, so a
/// larger value means the caller read garbage and the stem stays parseable.
/// Fails with no partial append when fewer than two bytes remain.
pub fn push_two_digits<const N: usize>(
    out: &mut heapless::String<N>,
    value: u8,
) -> Result<(), &'static str> {
    let v = value.min(99);
    let pair = [b'0' + v / 10, b'0' + v % 10];
    let s = core::str::from_utf8(&pair).unwrap_or("00");
    out.push_str(s).map_err(|_| "stem full")
}

/// Build the `YYMMDDHHmmss` stem from one snapshot of RTC fields.
pub fn stem_from_fields(fields: TimeFields) -> FilenameStem {
    let mut stem = FilenameStem::new();
    let ordered = [
        fields.year,
        fields.month,
        fields.day,
        fields.hours,
        fields.minutes,
        fields.seconds,
    ];
    // six two-digit pairs exactly fill the stem
    for value in ordered {
        let _ = push_two_digits(&mut stem, value);
    }
    stem
}

/// Read the clock once and build the stem for this deployment.
pub fn filename_stem<C>(clock: &C) -> FilenameStem
where
    C: Clock,
{
    stem_from_fields(clock.fields())
}
