use log::debug;

use crate::error::{PackError, Result};
use crate::sect5::{Data2, Data3, GroupDefinition};
use crate::sect7::groups;
use crate::sect7::scaling::{descale, Quantizer, ScaleIterator};
use crate::sect7::spacial_diff;
use crate::utils::{ilog2_ceil64, put_bits, BitwiseIterator};

pub(crate) fn decode(data: &Data2, slice: &[u8], ndpts: usize) -> Result<Box<[f32]>> {
    if data.group_definition.num_groups == 0 {
        // constant field, carried entirely by the reference value
        let value = descale(0, data.reference_value as f64, data.binary_scale_factor, data.decimal_scale_factor);
        return Ok(vec![value; ndpts].into_boxed_slice());
    }

    let (group_iter, groups_num_bytes) = groups::decode(data.num_bits, &data.group_definition, slice)?;
    let group_list: Vec<(i64, usize, usize)> = group_iter.collect();

    let total: usize = group_list.iter().map(|(_, _, l)| *l).sum();
    if total != ndpts {
        return Err(PackError::DecodeError(format!("group lengths cover {} of {} points", total, ndpts)));
    }
    let residual_bits: usize = group_list.iter().map(|(_, w, l)| w * l).sum();
    let available = (slice.len() - groups_num_bytes) * 8;
    if residual_bits > available {
        return Err(PackError::BufferOverrun(residual_bits, available));
    }

    let decoded: Vec<f32> = ScaleIterator::new(
        ComplexPackingDecoderIterator::new(&slice[groups_num_bytes..], group_list.into_iter()).flatten(),
        data.reference_value as f64,
        data.binary_scale_factor,
        data.decimal_scale_factor,
    )
    .collect();

    if decoded.len() != ndpts {
        return Err(PackError::DecodeError(String::from("Length Mismatch")));
    }

    Ok(decoded.into_boxed_slice())
}

pub(crate) struct ComplexPackingDecoderIterator<'a, I: Iterator<Item = (i64, usize, usize)>> {
    slice: &'a [u8],
    groups_iter: I,
    pos: usize,
    start_offset_num_bits: usize,
}

impl<'a, I: Iterator<Item = (i64, usize, usize)>> ComplexPackingDecoderIterator<'a, I> {
    pub(crate) fn new(slice: &'a [u8], groups_iter: I) -> Self {
        Self {
            slice,
            groups_iter,
            pos: 0,
            start_offset_num_bits: 0,
        }
    }
}

impl<'a, I: Iterator<Item = (i64, usize, usize)>> Iterator for ComplexPackingDecoderIterator<'a, I> {
    type Item = Vec<i64>;

    fn next(&mut self) -> Option<Vec<i64>> {
        match self.groups_iter.next() {
            Some((reference_value, width, length)) => {
                let total_num_bits = width * length + self.start_offset_num_bits;
                let (pos_end, offset_num_bits) = (self.pos + total_num_bits / 8, total_num_bits % 8);
                let offset_byte = if offset_num_bits > 0 { 1 } else { 0 };
                if pos_end + offset_byte > self.slice.len() {
                    return None;
                }
                let group_values =
                    BitwiseIterator::<u64>::new(&self.slice[self.pos..pos_end + offset_byte], width)
                        .with_offset(self.start_offset_num_bits)
                        .take(length)
                        .map(|v| reference_value + v as i64)
                        .collect::<Vec<i64>>();
                self.pos = pos_end;
                self.start_offset_num_bits = offset_num_bits;
                Some(group_values)
            }
            _ => None,
        }
    }
}

pub(crate) fn encode(fld: &[f32], drt_num: u16, tmpl: &mut [i32]) -> Result<Vec<u8>> {
    let binary_scale_factor = tmpl[1] as i16;
    let decimal_scale_factor = tmpl[2] as i16;

    let mut rmin = fld[0];
    let mut rmax = fld[0];
    for v in &fld[1..] {
        if *v < rmin {
            rmin = *v;
        }
        if *v > rmax {
            rmax = *v;
        }
    }

    let quantizer = Quantizer::new(rmin, binary_scale_factor, decimal_scale_factor);

    if rmin == rmax {
        write_tmpl(tmpl, drt_num, &quantizer, binary_scale_factor, decimal_scale_factor, 0, constant_definition(), resolve_order(tmpl), 0);
        return Ok(Vec::new());
    }

    let mut ifld: Vec<i64> = fld.iter().map(|v| quantizer.apply(*v)).collect();

    let mut buf = Vec::new();
    let mut iofst = 0;

    let order = resolve_order(tmpl);
    let mut nbitsd = 0;
    if drt_num == 3 {
        let header = spacial_diff::encode_diff(&mut ifld, order);
        if header.nbitsd > 32 {
            return Err(PackError::InvalidTemplate(format!("spacial difference values need {} bits", header.nbitsd)));
        }
        spacial_diff::write_header(&mut buf, &mut iofst, &header, order);
        nbitsd = header.nbitsd;
    }

    let split = groups::split_groups(&ifld, 0, groups::MINPK, 1, 0, 0);
    let glen: Vec<usize> = split.glen.iter().map(|l| l + split.novref).collect();
    let ngroups = glen.len();

    let mut gref = Vec::with_capacity(ngroups);
    let mut gwidth = Vec::with_capacity(ngroups);
    let mut n = 0;
    for &length in &glen {
        let group = &mut ifld[n..n + length];
        let lo = *group.iter().min().unwrap();
        let hi = *group.iter().max().unwrap();
        let width = if hi != lo { ilog2_ceil64((hi - lo) as u64) as usize } else { 0 };
        if width > 32 {
            return Err(PackError::InvalidTemplate(format!("group needs {} bits per value", width)));
        }
        for v in group.iter_mut() {
            *v -= lo;
        }
        gref.push(lo);
        gwidth.push(width);
        n += length;
    }

    let igmax = *gref.iter().max().unwrap();
    let nbits_ref = if igmax > 0 { ilog2_ceil64(igmax as u64) as usize } else { 0 };
    if nbits_ref > 32 {
        return Err(PackError::InvalidTemplate(format!("group references need {} bits", nbits_ref)));
    }

    let group_definition = groups::encode_meta(&mut buf, &mut iofst, &gref, nbits_ref, &gwidth, &glen);

    let mut n = 0;
    for (g, &length) in glen.iter().enumerate() {
        let width = gwidth[g];
        if width != 0 {
            for &v in &ifld[n..n + length] {
                put_bits(&mut buf, v as u32, iofst, width);
                iofst += width;
            }
        }
        n += length;
    }
    groups::pad_octet(&mut buf, &mut iofst);

    debug!("packed {} points into {} groups, {} bytes", fld.len(), ngroups, buf.len());

    write_tmpl(tmpl, drt_num, &quantizer, binary_scale_factor, decimal_scale_factor, nbits_ref, group_definition, order, nbitsd);

    Ok(buf)
}

fn resolve_order(tmpl: &[i32]) -> u8 {
    match tmpl.get(16).copied() {
        Some(1) => 1,
        _ => 2,
    }
}

fn constant_definition() -> GroupDefinition {
    GroupDefinition {
        num_groups: 0,
        group_widths_reference: 0,
        group_widths_num_bits: 0,
        group_lengths_reference: 0,
        group_lengths_increment: groups::LENGTH_INCREMENT,
        group_lengths_last: 0,
        group_scaled_lengths_num_bits: 0,
    }
}

#[allow(clippy::too_many_arguments)]
fn write_tmpl(
    tmpl: &mut [i32],
    drt_num: u16,
    quantizer: &Quantizer,
    binary_scale_factor: i16,
    decimal_scale_factor: i16,
    nbits_ref: usize,
    group_definition: GroupDefinition,
    order: u8,
    nbitsd: usize,
) {
    if drt_num == 3 {
        Data3 {
            reference_value: quantizer.reference(),
            binary_scale_factor,
            decimal_scale_factor,
            num_bits: nbits_ref,
            values_type: 0,
            group_method: 1,
            missing_value: 0,
            missing_substitute_primary: 0,
            missing_substitute_secondary: 0,
            group_definition,
            spacial_difference_order: order,
            spacial_difference_size: (nbitsd / 8) as u8,
        }
        .write_tmpl(tmpl);
    } else {
        Data2 {
            reference_value: quantizer.reference(),
            binary_scale_factor,
            decimal_scale_factor,
            num_bits: nbits_ref,
            values_type: 0,
            group_method: 1,
            missing_value: 0,
            missing_substitute_primary: 0,
            missing_substitute_secondary: 0,
            group_definition,
        }
        .write_tmpl(tmpl);
    }
}
