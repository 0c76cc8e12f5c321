use crate::error::{PackError, Result};
use crate::utils::{read_ieee, write_ieee};

pub enum Data {
    Data2(Data2),
    Data3(Data3),
    Data51(Data51),
}

pub struct GroupDefinition {
    pub num_groups: usize,
    pub group_widths_reference: u8,
    pub group_widths_num_bits: usize,
    pub group_lengths_reference: u32,
    pub group_lengths_increment: u8,
    pub group_lengths_last: u32,
    pub group_scaled_lengths_num_bits: usize,
}

pub struct Data2 {
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub num_bits: usize,
    pub values_type: u8,
    pub group_method: u8,
    pub missing_value: u8,
    pub missing_substitute_primary: u32,
    pub missing_substitute_secondary: u32,
    pub group_definition: GroupDefinition,
}

pub struct Data3 {
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub num_bits: usize,
    pub values_type: u8,
    pub group_method: u8,
    pub missing_value: u8,
    pub missing_substitute_primary: u32,
    pub missing_substitute_secondary: u32,
    pub group_definition: GroupDefinition,
    pub spacial_difference_order: u8,
    pub spacial_difference_size: u8,
}

pub struct Data51 {
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub num_bits: usize,
    pub laplacian_scale: i32,
    pub js: i32,
    pub ks: i32,
    pub ms: i32,
    pub ts: usize,
    pub precision: u8,
}

const TMPL_LEN_5_2: usize = 16;
const TMPL_LEN_5_3: usize = 18;
const TMPL_LEN_5_51: usize = 10;

fn slot_nonneg(tmpl: &[i32], idx: usize, what: &str) -> Result<i32> {
    let v = tmpl[idx];
    if v < 0 {
        return Err(PackError::InvalidTemplate(format!("negative {} : {}", what, v)));
    }
    Ok(v)
}

fn slot_bits(tmpl: &[i32], idx: usize, what: &str) -> Result<usize> {
    let v = slot_nonneg(tmpl, idx, what)?;
    if v > 32 {
        return Err(PackError::InvalidTemplate(format!("{} exceeds 32 bits : {}", what, v)));
    }
    Ok(v as usize)
}

fn group_definition(tmpl: &[i32]) -> Result<GroupDefinition> {
    Ok(GroupDefinition {
        num_groups: slot_nonneg(tmpl, 9, "group count")? as usize,
        group_widths_reference: slot_bits(tmpl, 10, "group width reference")? as u8,
        group_widths_num_bits: slot_bits(tmpl, 11, "group width size")?,
        group_lengths_reference: slot_nonneg(tmpl, 12, "group length reference")? as u32,
        group_lengths_increment: slot_nonneg(tmpl, 13, "group length increment")? as u8,
        group_lengths_last: slot_nonneg(tmpl, 14, "last group length")? as u32,
        group_scaled_lengths_num_bits: slot_bits(tmpl, 15, "group length size")?,
    })
}

impl Data {
    pub fn from_tmpl(drt_num: u16, tmpl: &[i32]) -> Result<Self> {
        match drt_num {
            2 => {
                if tmpl.len() < TMPL_LEN_5_2 {
                    return Err(PackError::InvalidTemplate(format!("template 5.2 needs {} values", TMPL_LEN_5_2)));
                }
                Ok(Data::Data2(Data2 {
                    reference_value: read_ieee(tmpl[0] as u32),
                    binary_scale_factor: tmpl[1] as i16,
                    decimal_scale_factor: tmpl[2] as i16,
                    num_bits: slot_bits(tmpl, 3, "reference size")?,
                    values_type: tmpl[4] as u8,
                    group_method: tmpl[5] as u8,
                    missing_value: miss_mgmt(tmpl[6])?,
                    missing_substitute_primary: tmpl[7] as u32,
                    missing_substitute_secondary: tmpl[8] as u32,
                    group_definition: group_definition(tmpl)?,
                }))
            }
            3 => {
                if tmpl.len() < TMPL_LEN_5_3 {
                    return Err(PackError::InvalidTemplate(format!("template 5.3 needs {} values", TMPL_LEN_5_3)));
                }
                let order = tmpl[16];
                if order != 1 && order != 2 {
                    return Err(PackError::InvalidTemplate(format!("spacial difference order : {}", order)));
                }
                Ok(Data::Data3(Data3 {
                    reference_value: read_ieee(tmpl[0] as u32),
                    binary_scale_factor: tmpl[1] as i16,
                    decimal_scale_factor: tmpl[2] as i16,
                    num_bits: slot_bits(tmpl, 3, "reference size")?,
                    values_type: tmpl[4] as u8,
                    group_method: tmpl[5] as u8,
                    missing_value: miss_mgmt(tmpl[6])?,
                    missing_substitute_primary: tmpl[7] as u32,
                    missing_substitute_secondary: tmpl[8] as u32,
                    group_definition: group_definition(tmpl)?,
                    spacial_difference_order: order as u8,
                    spacial_difference_size: slot_nonneg(tmpl, 17, "spacial difference size")? as u8,
                }))
            }
            51 => {
                if tmpl.len() < TMPL_LEN_5_51 {
                    return Err(PackError::InvalidTemplate(format!("template 5.51 needs {} values", TMPL_LEN_5_51)));
                }
                Ok(Data::Data51(Data51 {
                    reference_value: read_ieee(tmpl[0] as u32),
                    binary_scale_factor: tmpl[1] as i16,
                    decimal_scale_factor: tmpl[2] as i16,
                    num_bits: slot_bits(tmpl, 3, "coefficient size")?,
                    laplacian_scale: tmpl[4],
                    js: slot_nonneg(tmpl, 5, "subset J")?,
                    ks: slot_nonneg(tmpl, 6, "subset K")?,
                    ms: slot_nonneg(tmpl, 7, "subset M")?,
                    ts: slot_nonneg(tmpl, 8, "unpacked count")? as usize,
                    precision: tmpl[9] as u8,
                }))
            }
            n => Err(PackError::InvalidTemplate(format!("unknown data representation template : {}", n))),
        }
    }
}

fn miss_mgmt(flag: i32) -> Result<u8> {
    match flag {
        0 | 1 | 2 => Ok(flag as u8),
        n => Err(PackError::InvalidMissMgmt(n)),
    }
}

impl Data2 {
    pub fn write_tmpl(&self, tmpl: &mut [i32]) {
        tmpl[0] = write_ieee(self.reference_value) as i32;
        tmpl[1] = self.binary_scale_factor as i32;
        tmpl[2] = self.decimal_scale_factor as i32;
        tmpl[3] = self.num_bits as i32;
        tmpl[4] = self.values_type as i32;
        tmpl[5] = self.group_method as i32;
        tmpl[6] = self.missing_value as i32;
        tmpl[7] = self.missing_substitute_primary as i32;
        tmpl[8] = self.missing_substitute_secondary as i32;
        self.group_definition.write_tmpl(tmpl);
    }
}

impl Data3 {
    pub fn write_tmpl(&self, tmpl: &mut [i32]) {
        tmpl[0] = write_ieee(self.reference_value) as i32;
        tmpl[1] = self.binary_scale_factor as i32;
        tmpl[2] = self.decimal_scale_factor as i32;
        tmpl[3] = self.num_bits as i32;
        tmpl[4] = self.values_type as i32;
        tmpl[5] = self.group_method as i32;
        tmpl[6] = self.missing_value as i32;
        tmpl[7] = self.missing_substitute_primary as i32;
        tmpl[8] = self.missing_substitute_secondary as i32;
        self.group_definition.write_tmpl(tmpl);
        tmpl[16] = self.spacial_difference_order as i32;
        tmpl[17] = self.spacial_difference_size as i32;
    }
}

impl GroupDefinition {
    fn write_tmpl(&self, tmpl: &mut [i32]) {
        tmpl[9] = self.num_groups as i32;
        tmpl[10] = self.group_widths_reference as i32;
        tmpl[11] = self.group_widths_num_bits as i32;
        tmpl[12] = self.group_lengths_reference as i32;
        tmpl[13] = self.group_lengths_increment as i32;
        tmpl[14] = self.group_lengths_last as i32;
        tmpl[15] = self.group_scaled_lengths_num_bits as i32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_5_3_round_trip() {
        let src = Data3 {
            reference_value: -12.5,
            binary_scale_factor: -1,
            decimal_scale_factor: 3,
            num_bits: 11,
            values_type: 0,
            group_method: 1,
            missing_value: 1,
            missing_substitute_primary: write_ieee(9.999e20),
            missing_substitute_secondary: 0,
            group_definition: GroupDefinition {
                num_groups: 17,
                group_widths_reference: 4,
                group_widths_num_bits: 3,
                group_lengths_reference: 10,
                group_lengths_increment: 1,
                group_lengths_last: 23,
                group_scaled_lengths_num_bits: 6,
            },
            spacial_difference_order: 2,
            spacial_difference_size: 1,
        };

        let mut tmpl = [0i32; 18];
        src.write_tmpl(&mut tmpl);

        match Data::from_tmpl(3, &tmpl).unwrap() {
            Data::Data3(out) => {
                assert_eq!(out.reference_value, -12.5);
                assert_eq!(out.binary_scale_factor, -1);
                assert_eq!(out.decimal_scale_factor, 3);
                assert_eq!(out.num_bits, 11);
                assert_eq!(out.missing_value, 1);
                assert_eq!(read_ieee(out.missing_substitute_primary), 9.999e20);
                assert_eq!(out.group_definition.num_groups, 17);
                assert_eq!(out.group_definition.group_lengths_last, 23);
                assert_eq!(out.spacial_difference_order, 2);
                assert_eq!(out.spacial_difference_size, 1);
            }
            _ => panic!("wrong template"),
        }
    }

    #[test]
    fn rejects_bad_miss_mgmt() {
        let mut tmpl = [0i32; 18];
        tmpl[6] = 3;
        assert!(matches!(Data::from_tmpl(2, &tmpl), Err(PackError::InvalidMissMgmt(3))));
    }

    #[test]
    fn rejects_unknown_template() {
        let tmpl = [0i32; 18];
        assert!(Data::from_tmpl(40, &tmpl).is_err());
    }

    #[test]
    fn rejects_bad_order() {
        let mut tmpl = [0i32; 18];
        tmpl[16] = 3;
        assert!(Data::from_tmpl(3, &tmpl).is_err());
    }
}
