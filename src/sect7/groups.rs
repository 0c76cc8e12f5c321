use std::iter;

use log::trace;

use crate::error::{PackError, Result};
use crate::sect5::GroupDefinition;
use crate::utils::{ilog2_ceil, ilog2_ceil64, put_bits, BitwiseIterator};

pub(crate) const MINPK: usize = 10;
pub(crate) const LENGTH_INCREMENT: u8 = 1;
// amortized descriptor cost of opening one more group
const GROUP_OVERHEAD_BITS: usize = 31;

pub(crate) fn decode<'a>(
    num_bits: usize,
    groups: &'a GroupDefinition,
    slice: &'a [u8],
) -> Result<(impl Iterator<Item = (i64, usize, usize)> + 'a, usize)> {
    if groups.num_groups == 0 {
        return Err(PackError::InvalidTemplate(String::from("no groups to decode")));
    }

    fn octet_length(num_bits: usize, num_groups: usize) -> usize {
        (num_bits * num_groups + 7) / 8
    }

    let references_end = octet_length(num_bits, groups.num_groups);
    let widths_end = references_end + octet_length(groups.group_widths_num_bits, groups.num_groups);
    let lengths_end = widths_end + octet_length(groups.group_scaled_lengths_num_bits, groups.num_groups);

    if lengths_end > slice.len() {
        return Err(PackError::BufferOverrun(lengths_end * 8, slice.len() * 8));
    }

    let references_iter = BitwiseIterator::<u64>::new(&slice[..references_end], num_bits)
        .take(groups.num_groups);

    let widths_iter = BitwiseIterator::<u64>::new(&slice[references_end..widths_end], groups.group_widths_num_bits)
        .map(|v| u64::from(groups.group_widths_reference) + v)
        .take(groups.num_groups);

    let lengths_iter = BitwiseIterator::<u64>::new(&slice[widths_end..lengths_end], groups.group_scaled_lengths_num_bits)
        .take(groups.num_groups - 1)
        .map(|v| u64::from(groups.group_lengths_reference) + u64::from(groups.group_lengths_increment) * v)
        .chain(iter::once(u64::from(groups.group_lengths_last)));

    let groups = GroupsIterator::new(references_iter, widths_iter, lengths_iter);

    Ok((groups, lengths_end))
}

pub(crate) struct GroupsIterator<I: Iterator<Item = u64>, J: Iterator<Item = u64>, K: Iterator<Item = u64>> {
    references_iter: I,
    widths_iter: J,
    lengths_iter: K,
}

impl<I: Iterator<Item = u64>, J: Iterator<Item = u64>, K: Iterator<Item = u64>> GroupsIterator<I, J, K> {
    fn new(references_iter: I, widths_iter: J, lengths_iter: K) -> Self {
        Self {
            references_iter,
            widths_iter,
            lengths_iter,
        }
    }
}

impl<I: Iterator<Item = u64>, J: Iterator<Item = u64>, K: Iterator<Item = u64>> Iterator for GroupsIterator<I, J, K> {
    type Item = (i64, usize, usize);

    fn next(&mut self) -> Option<(i64, usize, usize)> {
        match (self.references_iter.next(), self.widths_iter.next(), self.lengths_iter.next()) {
            (Some(reference_value), Some(width), Some(length)) => {
                Some((reference_value as i64, width as usize, length as usize))
            }
            _ => None,
        }
    }
}

pub(crate) struct GroupSplit {
    // lengths reduced by novref; callers add it back
    pub glen: Vec<usize>,
    pub novref: usize,
}

pub(crate) fn split_groups(
    ifld: &[i64],
    missopt: u8,
    minpk: usize,
    inc: usize,
    miss1: i64,
    miss2: i64,
) -> GroupSplit {
    debug_assert_eq!(inc, 1, "scaled group lengths assume a unit increment");

    let n = ifld.len();
    let is_miss = |v: i64| missopt != 0 && (v == miss1 || (missopt == 2 && v == miss2));

    let mut glen: Vec<usize> = Vec::with_capacity(n / minpk + 1);
    let mut s = 0;
    while s < n {
        if is_miss(ifld[s]) {
            let mut e = s + 1;
            while e < n && is_miss(ifld[e]) {
                e += 1;
            }
            if e - s >= minpk {
                glen.push(e - s);
                s = e;
                continue;
            }
        }

        let mut e = s;
        let mut lo = i64::MAX;
        let mut hi = i64::MIN;
        while e < n && e - s < minpk {
            if is_miss(ifld[e]) {
                let mut r = e + 1;
                while r < n && is_miss(ifld[r]) {
                    r += 1;
                }
                // a long run starting inside the window closes the group
                // ahead of it; a short run is absorbed whole
                if r - e >= minpk {
                    break;
                }
                e = r;
                continue;
            }
            lo = lo.min(ifld[e]);
            hi = hi.max(ifld[e]);
            e += 1;
        }

        while e < n {
            let v = ifld[e];
            if is_miss(v) {
                let mut r = e + 1;
                while r < n && is_miss(ifld[r]) {
                    r += 1;
                }
                if r - e >= minpk {
                    break;
                }
                e = r;
                continue;
            }
            if lo > hi {
                lo = v;
                hi = v;
                e += 1;
                continue;
            }
            let width = ilog2_ceil64((hi - lo) as u64);
            let grown = ilog2_ceil64((hi.max(v) - lo.min(v)) as u64);
            if grown > width && (grown - width) as usize * (e - s) > GROUP_OVERHEAD_BITS {
                break;
            }
            lo = lo.min(v);
            hi = hi.max(v);
            e += 1;
        }

        glen.push(e - s);
        s = e;
    }

    let novref = glen.iter().min().copied().unwrap_or(0);
    for l in glen.iter_mut() {
        *l -= novref;
    }

    trace!("split {} points into {} groups (novref {})", n, glen.len(), novref);

    GroupSplit { glen, novref }
}

pub(crate) fn fixed_groups(ndpts: usize) -> Vec<usize> {
    let mut glen = vec![MINPK; ndpts / MINPK];
    if ndpts % MINPK != 0 {
        glen.push(ndpts % MINPK);
    }
    glen
}

pub(crate) fn encode_meta(
    buf: &mut Vec<u8>,
    iofst: &mut usize,
    gref: &[i64],
    nbits_ref: usize,
    gwidth: &[usize],
    glen: &[usize],
) -> GroupDefinition {
    let ngroups = glen.len();

    if nbits_ref > 0 {
        for &r in gref {
            put_bits(buf, r as u32, *iofst, nbits_ref);
            *iofst += nbits_ref;
        }
        pad_octet(buf, iofst);
    }

    let width_ref = *gwidth.iter().min().unwrap();
    let width_max = *gwidth.iter().max().unwrap();
    let nbits_width = if width_max != width_ref {
        ilog2_ceil((width_max - width_ref) as u32) as usize
    } else {
        0
    };
    if nbits_width > 0 {
        for &w in gwidth {
            put_bits(buf, (w - width_ref) as u32, *iofst, nbits_width);
            *iofst += nbits_width;
        }
        pad_octet(buf, iofst);
    }

    // the last group's true length lives in the template, not the array
    let length_last = glen[ngroups - 1];
    let head = &glen[..ngroups - 1];
    let length_ref = head.iter().min().copied().unwrap_or(length_last);
    let length_max = head.iter().max().copied().unwrap_or(length_last);
    let nbits_len = if length_max != length_ref {
        ilog2_ceil64((length_max - length_ref) as u64) as usize
    } else {
        0
    };
    if nbits_len > 0 {
        for &l in head {
            put_bits(buf, (l - length_ref) as u32, *iofst, nbits_len);
            *iofst += nbits_len;
        }
        put_bits(buf, 0, *iofst, nbits_len);
        *iofst += nbits_len;
        pad_octet(buf, iofst);
    }

    GroupDefinition {
        num_groups: ngroups,
        group_widths_reference: width_ref as u8,
        group_widths_num_bits: nbits_width,
        group_lengths_reference: length_ref as u32,
        group_lengths_increment: LENGTH_INCREMENT,
        group_lengths_last: length_last as u32,
        group_scaled_lengths_num_bits: nbits_len,
    }
}

pub(crate) fn pad_octet(buf: &mut Vec<u8>, iofst: &mut usize) {
    if *iofst % 8 != 0 {
        let left = 8 - *iofst % 8;
        put_bits(buf, 0, *iofst, left);
        *iofst += left;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lengths(split: &GroupSplit) -> Vec<usize> {
        split.glen.iter().map(|l| l + split.novref).collect()
    }

    #[test]
    fn split_covers_every_point() {
        let ifld: Vec<i64> = (0..1000).map(|j| (j * 37 % 211) as i64).collect();
        let split = split_groups(&ifld, 0, MINPK, 1, 0, 0);
        assert_eq!(lengths(&split).iter().sum::<usize>(), 1000);
        assert!(lengths(&split).iter().all(|l| *l >= 1));
    }

    #[test]
    fn constant_sequence_is_one_group() {
        let ifld = vec![0i64; 500];
        let split = split_groups(&ifld, 0, MINPK, 1, 0, 0);
        assert_eq!(lengths(&split), vec![500]);
        assert_eq!(split.novref, 500);
    }

    #[test]
    fn groups_meet_minimum_size() {
        let ifld: Vec<i64> = (0..97).map(|j| if j % 20 < 10 { 0 } else { 1 << 16 }).collect();
        let split = split_groups(&ifld, 0, MINPK, 1, 0, 0);
        let lens = lengths(&split);
        assert_eq!(lens.iter().sum::<usize>(), 97);
        for l in &lens[..lens.len() - 1] {
            assert!(*l >= MINPK, "group of {} below minimum", l);
        }
    }

    #[test]
    fn long_missing_run_stands_alone() {
        let mut ifld: Vec<i64> = (0..30).map(|j| j as i64).collect();
        ifld.extend(vec![-1i64; 15]);
        ifld.extend((0..30).map(|j| j as i64));
        let split = split_groups(&ifld, 1, MINPK, 1, -1, -2);
        let lens = lengths(&split);
        assert_eq!(lens.iter().sum::<usize>(), 75);
        assert!(lens.contains(&15), "missing run not isolated: {:?}", lens);
    }

    #[test]
    fn missing_run_starting_mid_window_stands_alone() {
        let mut ifld: Vec<i64> = (0..3).map(|j| j as i64).collect();
        ifld.extend(vec![-1i64; 12]);
        ifld.extend((0..30).map(|j| j as i64));
        let split = split_groups(&ifld, 1, MINPK, 1, -1, -2);
        let lens = lengths(&split);
        assert_eq!(lens.iter().sum::<usize>(), 45);
        assert_eq!(lens[0], 3, "group ahead of the run not closed: {:?}", lens);
        assert_eq!(lens[1], 12, "missing run not isolated: {:?}", lens);
    }

    #[test]
    fn short_missing_run_rides_along() {
        let mut ifld: Vec<i64> = (0..20).map(|j| j as i64).collect();
        ifld.splice(10..10, vec![-1i64; 3]);
        let split = split_groups(&ifld, 1, MINPK, 1, -1, -2);
        assert_eq!(lengths(&split).iter().sum::<usize>(), 23);
        assert!(!lengths(&split).contains(&3));
    }

    #[test]
    fn fixed_groups_partition() {
        assert_eq!(fixed_groups(25), vec![10, 10, 5]);
        assert_eq!(fixed_groups(1), vec![1]);
        assert!(fixed_groups(0).is_empty());
    }

    #[test]
    fn meta_round_trip() {
        let gref = [3i64, 0, 7];
        let gwidth = [2usize, 0, 5];
        let glen = [10usize, 12, 7];

        let mut buf = Vec::new();
        let mut iofst = 0;
        let def = encode_meta(&mut buf, &mut iofst, &gref, 3, &gwidth, &glen);
        assert_eq!(iofst % 8, 0);
        assert_eq!(def.num_groups, 3);
        assert_eq!(def.group_widths_reference, 0);
        assert_eq!(def.group_lengths_reference, 10);
        assert_eq!(def.group_lengths_last, 7);

        let (iter, consumed) = decode(3, &def, &buf).unwrap();
        assert_eq!(consumed, buf.len());
        let triples: Vec<(i64, usize, usize)> = iter.collect();
        assert_eq!(triples, vec![(3, 2, 10), (0, 0, 12), (7, 5, 7)]);
    }

    #[test]
    fn meta_single_group_needs_no_arrays() {
        let mut buf = Vec::new();
        let mut iofst = 0;
        let def = encode_meta(&mut buf, &mut iofst, &[0], 0, &[4], &[10]);
        assert!(buf.is_empty());
        assert_eq!(def.group_widths_reference, 4);
        assert_eq!(def.group_lengths_last, 10);

        let (iter, consumed) = decode(0, &def, &buf).unwrap();
        assert_eq!(consumed, 0);
        let triples: Vec<(i64, usize, usize)> = iter.collect();
        assert_eq!(triples, vec![(0, 4, 10)]);
    }
}
