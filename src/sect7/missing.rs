use log::debug;

use crate::error::{PackError, Result};
use crate::sect5::{Data2, Data3, GroupDefinition};
use crate::sect7::groups;
use crate::sect7::scaling::{descale, Quantizer};
use crate::sect7::spacial_diff::{self, SpacialDiffDecodeIterator, SpacialDiffHeader};
use crate::utils::{get_bits, ilog2_ceil64, put_bits, read_ieee};

pub(crate) fn encode(fld: &[f32], drt_num: u16, tmpl: &mut [i32], missopt: u8) -> Result<Vec<u8>> {
    let binary_scale_factor = tmpl[1] as i16;
    let decimal_scale_factor = tmpl[2] as i16;
    let rmissp = read_ieee(tmpl[7] as u32);
    let rmisss = read_ieee(tmpl[8] as u32);

    let ndpts = fld.len();

    // classify each sample and find the minimum of what remains
    let mut ifldmiss = vec![0u8; ndpts];
    let mut rmin = f32::MAX;
    let mut nonmiss = 0usize;
    for (j, &v) in fld.iter().enumerate() {
        if v == rmissp {
            ifldmiss[j] = 1;
        } else if missopt == 2 && v == rmisss {
            ifldmiss[j] = 2;
        } else {
            if nonmiss == 0 || v < rmin {
                rmin = v;
            }
            nonmiss += 1;
        }
    }
    if nonmiss == 0 {
        rmin = rmissp;
    }

    let quantizer = Quantizer::new(rmin, binary_scale_factor, decimal_scale_factor);
    let mut jfld: Vec<i64> = fld
        .iter()
        .zip(&ifldmiss)
        .filter(|(_, m)| **m == 0)
        .map(|(v, _)| quantizer.apply(*v))
        .collect();

    let mut buf = Vec::new();
    let mut iofst = 0;

    let order = resolve_order(tmpl);
    let mut nbitsd = 0;
    if drt_num == 3 {
        let header = spacial_diff::encode_diff(&mut jfld, order);
        if header.nbitsd > 32 {
            return Err(PackError::InvalidTemplate(format!("spacial difference values need {} bits", header.nbitsd)));
        }
        spacial_diff::write_header(&mut buf, &mut iofst, &header, order);
        nbitsd = header.nbitsd;
    }

    // re-expand with sentinel codes just below the value range
    let (miss1, miss2) = match jfld.iter().min() {
        Some(min) => (min - 1, min - 2),
        _ => (0, -1),
    };
    let mut ifld = Vec::with_capacity(ndpts);
    let mut values = jfld.iter();
    for m in &ifldmiss {
        ifld.push(match m {
            0 => *values.next().expect("one scaled value per non-missing sample"),
            1 => miss1,
            _ => miss2,
        });
    }

    let glen: Vec<usize> = if ndpts < 2 {
        groups::fixed_groups(ndpts)
    } else {
        let split = groups::split_groups(&ifld, missopt, groups::MINPK, 1, miss1, miss2);
        split.glen.iter().map(|l| l + split.novref).collect()
    };
    let ngroups = glen.len();

    // per-group reduction; the group maximum is raised by the miss-mgmt
    // value to reserve the top codepoint(s) for the sentinels
    let mut gref = vec![0i64; ngroups];
    let mut gwidth = vec![0usize; ngroups];
    let mut n = 0;
    for g in 0..ngroups {
        let length = glen[g];
        let vals = &mut ifld[n..n + length];
        let miss = &ifldmiss[n..n + length];

        let num0 = miss.iter().filter(|m| **m == 0).count();
        if num0 == 0 {
            let num2 = miss.iter().filter(|m| **m == 2).count();
            if num2 == 0 {
                gref[g] = -1;
            } else if num2 == length {
                gref[g] = -2;
            } else {
                gref[g] = 0;
                gwidth[g] = 1;
                for (v, m) in vals.iter_mut().zip(miss) {
                    *v = if *m == 1 { 1 } else { 0 };
                }
            }
        } else {
            let mut lo = i64::MAX;
            let mut hi = i64::MIN;
            for (v, m) in vals.iter().zip(miss) {
                if *m == 0 {
                    lo = lo.min(*v);
                    hi = hi.max(*v);
                }
            }
            let hi = hi + missopt as i64;
            let width = ilog2_ceil64((hi - lo) as u64) as usize;
            if width > 32 {
                return Err(PackError::InvalidTemplate(format!("group needs {} bits per value", width)));
            }
            let top = 1i64 << width;
            for (v, m) in vals.iter_mut().zip(miss) {
                match m {
                    0 => *v -= lo,
                    1 => *v = top - 1,
                    _ => *v = top - 2,
                }
            }
            gref[g] = lo;
            gwidth[g] = width;
        }
        n += length;
    }

    // size the reference field, then rewrite sentinel references into the
    // top codepoints of that range
    let igmax = *gref.iter().max().unwrap() + missopt as i64;
    let mut nbits_ref = if igmax > 0 { ilog2_ceil64(igmax as u64) as usize } else { 0 };
    if missopt == 2 && nbits_ref == 0 && gref.iter().any(|r| *r == -2) {
        nbits_ref = 1;
    }
    if nbits_ref > 32 {
        return Err(PackError::InvalidTemplate(format!("group references need {} bits", nbits_ref)));
    }
    let top = 1i64 << nbits_ref;
    for r in gref.iter_mut() {
        if *r == -1 {
            *r = top - 1;
        } else if *r == -2 {
            *r = top - 2;
        }
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

    debug!(
        "packed {} points ({} missing) into {} groups, {} bytes",
        ndpts,
        ndpts - nonmiss,
        ngroups,
        buf.len()
    );

    let substitute_primary = tmpl[7] as u32;
    let substitute_secondary = tmpl[8] as u32;
    if drt_num == 3 {
        Data3 {
            reference_value: quantizer.reference(),
            binary_scale_factor,
            decimal_scale_factor,
            num_bits: nbits_ref,
            values_type: 0,
            group_method: 1,
            missing_value: missopt,
            missing_substitute_primary: substitute_primary,
            missing_substitute_secondary: substitute_secondary,
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
            missing_value: missopt,
            missing_substitute_primary: substitute_primary,
            missing_substitute_secondary: substitute_secondary,
            group_definition,
        }
        .write_tmpl(tmpl);
    }

    Ok(buf)
}

fn resolve_order(tmpl: &[i32]) -> u8 {
    match tmpl.get(16).copied() {
        Some(1) => 1,
        _ => 2,
    }
}

pub(crate) fn decode2(data: &Data2, slice: &[u8], ndpts: usize) -> Result<Box<[f32]>> {
    decode_groups(
        data.num_bits,
        &data.group_definition,
        data.reference_value,
        data.binary_scale_factor,
        data.decimal_scale_factor,
        data.missing_value,
        read_ieee(data.missing_substitute_primary),
        read_ieee(data.missing_substitute_secondary),
        None,
        slice,
        0,
        ndpts,
    )
}

pub(crate) fn decode3(data: &Data3, slice: &[u8], ndpts: usize) -> Result<Box<[f32]>> {
    if data.group_definition.num_groups == 0 {
        let value = descale(0, data.reference_value as f64, data.binary_scale_factor, data.decimal_scale_factor);
        return Ok(vec![value; ndpts].into_boxed_slice());
    }
    let (header, cpt) = spacial_diff::read_header(slice, data.spacial_difference_order, data.spacial_difference_size)?;
    decode_groups(
        data.num_bits,
        &data.group_definition,
        data.reference_value,
        data.binary_scale_factor,
        data.decimal_scale_factor,
        data.missing_value,
        read_ieee(data.missing_substitute_primary),
        read_ieee(data.missing_substitute_secondary),
        Some((data.spacial_difference_order, header)),
        slice,
        cpt,
        ndpts,
    )
}

#[allow(clippy::too_many_arguments)]
fn decode_groups(
    num_bits: usize,
    group_definition: &GroupDefinition,
    reference_value: f32,
    binary_scale_factor: i16,
    decimal_scale_factor: i16,
    missopt: u8,
    rmissp: f32,
    rmisss: f32,
    spacial: Option<(u8, SpacialDiffHeader)>,
    slice: &[u8],
    offset: usize,
    ndpts: usize,
) -> Result<Box<[f32]>> {
    if group_definition.num_groups == 0 {
        let value = descale(0, reference_value as f64, binary_scale_factor, decimal_scale_factor);
        return Ok(vec![value; ndpts].into_boxed_slice());
    }

    let (group_iter, groups_num_bytes) = groups::decode(num_bits, group_definition, &slice[offset..])?;
    let group_list: Vec<(i64, usize, usize)> = group_iter.collect();

    let total: usize = group_list.iter().map(|(_, _, l)| *l).sum();
    if total != ndpts {
        return Err(PackError::DecodeError(format!("group lengths cover {} of {} points", total, ndpts)));
    }

    // sentinel codepoints at the top of the reference range
    let msng1 = (1i64 << num_bits) - 1;
    let msng2 = msng1 - 1;

    let mut ifldmiss = Vec::with_capacity(ndpts);
    let mut jfld = Vec::with_capacity(ndpts);
    let mut pos = (offset + groups_num_bytes) * 8;
    for (reference, width, length) in group_list {
        if width == 0 {
            if missopt >= 1 && reference == msng1 {
                ifldmiss.resize(ifldmiss.len() + length, 1u8);
            } else if missopt == 2 && reference == msng2 {
                ifldmiss.resize(ifldmiss.len() + length, 2u8);
            } else {
                for _ in 0..length {
                    ifldmiss.push(0);
                    jfld.push(reference);
                }
            }
        } else {
            let vals = get_bits(slice, pos, width, 0, length)?;
            pos += width * length;
            let top = (1i64 << width) - 1;
            for v in vals {
                let v = v as i64;
                if v == top {
                    ifldmiss.push(1);
                } else if missopt == 2 && v == top - 1 {
                    ifldmiss.push(2);
                } else {
                    ifldmiss.push(0);
                    jfld.push(reference + v);
                }
            }
        }
    }

    if let Some((order, header)) = spacial {
        jfld = SpacialDiffDecodeIterator::new(jfld.into_iter(), &header, order).collect();
    }

    let mut decoded = Vec::with_capacity(ndpts);
    let mut values = jfld.iter();
    for m in &ifldmiss {
        decoded.push(match m {
            0 => descale(
                *values.next().expect("one scaled value per non-missing sample"),
                reference_value as f64,
                binary_scale_factor,
                decimal_scale_factor,
            ),
            1 => rmissp,
            _ => rmisss,
        });
    }

    Ok(decoded.into_boxed_slice())
}
