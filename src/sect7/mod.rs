use crate::error::{PackError, Result};
use crate::sect5::Data;

pub(crate) mod complex;
pub(crate) mod groups;
pub(crate) mod missing;
pub(crate) mod scaling;
pub(crate) mod spacial_diff;
pub(crate) mod spectral;

pub fn complex_pack(fld: &[f32], drt_num: u16, tmpl: &mut [i32]) -> Result<Vec<u8>> {
    let need = match drt_num {
        2 => 16,
        3 => 18,
        n => {
            return Err(PackError::InvalidTemplate(format!("complex packing expects template 5.2 or 5.3 : {}", n)));
        }
    };
    if tmpl.len() < need {
        return Err(PackError::InvalidTemplate(format!("template 5.{} needs {} values", drt_num, need)));
    }
    if fld.is_empty() {
        return Err(PackError::InvalidTemplate(String::from("empty field")));
    }

    match tmpl[6] {
        0 => complex::encode(fld, drt_num, tmpl),
        1 | 2 => missing::encode(fld, drt_num, tmpl, tmpl[6] as u8),
        n => Err(PackError::InvalidMissMgmt(n)),
    }
}

pub fn complex_unpack(payload: &[u8], tmpl: &[i32], ndpts: usize, drt_num: u16) -> Result<Box<[f32]>> {
    match Data::from_tmpl(drt_num, tmpl)? {
        Data::Data2(data) => {
            if data.missing_value == 0 {
                complex::decode(&data, payload, ndpts)
            } else {
                missing::decode2(&data, payload, ndpts)
            }
        }
        Data::Data3(data) => {
            if data.missing_value == 0 {
                spacial_diff::decode(&data, payload, ndpts)
            } else {
                missing::decode3(&data, payload, ndpts)
            }
        }
        _ => Err(PackError::InvalidTemplate(String::from("not a complex packing template"))),
    }
}

pub fn spec_unpack(payload: &[u8], tmpl: &[i32], ndpts: usize, jj: i32, kk: i32, mm: i32) -> Result<Box<[f32]>> {
    match Data::from_tmpl(51, tmpl)? {
        Data::Data51(data) => spectral::decode(&data, payload, ndpts, jj, kk, mm),
        _ => Err(PackError::InvalidTemplate(String::from("not a spectral packing template"))),
    }
}
