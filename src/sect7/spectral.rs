use crate::error::{PackError, Result};
use crate::sect5::Data51;
use crate::utils::{get_bits, read_ieee};

pub(crate) struct WaveIterator {
    jj: i32,
    kk: i32,
    mm: i32,
    m: i32,
    n: i32,
}

impl WaveIterator {
    pub(crate) fn new(jj: i32, kk: i32, mm: i32) -> Self {
        Self { jj, kk, mm, m: 0, n: 0 }
    }

    fn nm(&self, m: i32) -> i32 {
        if self.kk == self.jj + self.mm {
            self.jj + m
        } else {
            self.jj
        }
    }
}

impl Iterator for WaveIterator {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<(i32, i32)> {
        while self.m <= self.mm {
            if self.n <= self.nm(self.m) {
                let out = (self.m, self.n);
                self.n += 1;
                return Some(out);
            }
            self.m += 1;
            self.n = self.m;
        }
        None
    }
}

pub(crate) fn decode(data: &Data51, slice: &[u8], ndpts: usize, jj: i32, kk: i32, mm: i32) -> Result<Box<[f32]>> {
    if data.precision != 1 {
        return Err(PackError::UnsupportedPrecision(data.precision as i32));
    }
    if jj < 0 || kk < 0 || mm < 0 {
        return Err(PackError::InvalidTemplate(format!("truncation ({}, {}, {})", jj, kk, mm)));
    }
    if data.ts > ndpts {
        return Err(PackError::InvalidTemplate(format!("{} unpacked values but {} points", data.ts, ndpts)));
    }

    let unpk: Vec<f32> = get_bits(slice, 0, 32, 0, data.ts)?
        .into_iter()
        .map(read_ieee)
        .collect();
    let packed = get_bits(slice, 32 * data.ts, data.num_bits, 0, ndpts - data.ts)?;

    let tscale = data.laplacian_scale as f64 * 1e-6;
    let pscale: Vec<f64> = (data.js..=jj + mm).map(|n| laplacian(n, tscale)).collect();

    let reference = data.reference_value as f64;
    let bscale = 2_f64.powi(data.binary_scale_factor as i32);
    let dscale = 10_f64.powi(-(data.decimal_scale_factor as i32));

    let rhomboidal_subset = data.ks == data.js + data.ms;

    let mut fld = Vec::with_capacity(ndpts);
    let mut unpk_iter = unpk.iter();
    let mut packed_iter = packed.iter();
    for (m, n) in WaveIterator::new(jj, kk, mm) {
        let ns = if rhomboidal_subset { data.js + m } else { data.js };
        if data.ts > 0 && n <= ns && m <= data.ms {
            for _ in 0..2 {
                let v = unpk_iter
                    .next()
                    .ok_or_else(|| PackError::DecodeError(String::from("unpacked subset exhausted")))?;
                fld.push(*v);
            }
        } else {
            let p = if n >= data.js {
                pscale.get((n - data.js) as usize).copied().unwrap_or(1.0)
            } else {
                1.0
            };
            for _ in 0..2 {
                let v = packed_iter
                    .next()
                    .ok_or_else(|| PackError::DecodeError(String::from("packed coefficients exhausted")))?;
                fld.push(((*v as f64 * bscale + reference) * dscale * p) as f32);
            }
        }
    }

    if fld.len() != ndpts {
        return Err(PackError::DecodeError(format!("traversal yields {} of {} points", fld.len(), ndpts)));
    }

    Ok(fld.into_boxed_slice())
}

fn laplacian(n: i32, tscale: f64) -> f64 {
    let base = (n as f64) * (n as f64 + 1.0);
    if base > 0.0 {
        base.powf(-tscale)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangular_traversal_count() {
        // T5 truncation holds 21 coefficient pairs
        let pairs: Vec<(i32, i32)> = WaveIterator::new(5, 5, 5).collect();
        assert_eq!(pairs.len(), 21);
        assert_eq!(pairs[0], (0, 0));
        assert_eq!(pairs[5], (0, 5));
        assert_eq!(pairs[6], (1, 1));
        assert_eq!(*pairs.last().unwrap(), (5, 5));
    }

    #[test]
    fn rhomboidal_traversal_count() {
        // KK == JJ + MM switches the upper bound to JJ + m
        let pairs: Vec<(i32, i32)> = WaveIterator::new(10, 15, 5).collect();
        assert_eq!(pairs.len(), 66);
        assert_eq!(pairs[10], (0, 10));
        assert_eq!(pairs[11], (1, 1));
        assert_eq!(*pairs.last().unwrap(), (5, 15));
    }

    #[test]
    fn laplacian_scale_is_identity_without_exponent() {
        assert_eq!(laplacian(4, 0.0), 1.0);
        assert_eq!(laplacian(0, 0.5), 1.0);
        let p = laplacian(2, 1.0);
        assert!((p - 1.0 / 6.0).abs() < 1e-12);
    }
}
