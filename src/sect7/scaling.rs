use num::ToPrimitive;

// X_int = round((X_real * 10^D - R) * 2^E), reference kept in the scaled domain
pub(crate) struct Quantizer {
    reference: f64,
    dscale: f64,
    bscale: f64,
    binary: bool,
}

impl Quantizer {
    pub(crate) fn new(rmin: f32, binary_scale_factor: i16, decimal_scale_factor: i16) -> Self {
        let dscale = 10f64.powi(decimal_scale_factor as i32);
        let binary = binary_scale_factor != 0;
        let reference = if binary {
            rmin as f64 * dscale
        } else {
            (rmin as f64 * dscale).round()
        };
        Self {
            reference,
            dscale,
            bscale: 2f64.powi(binary_scale_factor as i32),
            binary,
        }
    }

    pub(crate) fn reference(&self) -> f32 {
        self.reference as f32
    }

    pub(crate) fn apply(&self, value: f32) -> i64 {
        if self.binary {
            let scaled = ((value as f64 * self.dscale - self.reference) * self.bscale).round();
            scaled.max(0.0) as i64
        } else {
            (value as f64 * self.dscale).round() as i64 - self.reference as i64
        }
    }
}

pub(crate) struct ScaleIterator<I: Iterator<Item = N>, N: ToPrimitive> {
    iter: I,
    reference_value: f64,
    binary_scale: f64,
    decimal_scale: f64,
}

impl<I: Iterator<Item = N>, N: ToPrimitive> ScaleIterator<I, N> {
    pub(crate) fn new(iter: I, reference_value: f64, binary_scale_factor: i16, decimal_scale_factor: i16) -> Self {
        Self {
            iter,
            reference_value,
            binary_scale: 2_f64.powi(-(binary_scale_factor as i32)),
            decimal_scale: 10_f64.powi(-(decimal_scale_factor as i32)),
        }
    }
}

impl<I: Iterator<Item = N>, N: ToPrimitive> Iterator for ScaleIterator<I, N> {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        match self.iter.next() {
            Some(encoded) => {
                let value = (self.reference_value + encoded.to_f64().unwrap() * self.binary_scale) * self.decimal_scale;
                Some(value as f32)
            }
            _ => None,
        }
    }
}

pub(crate) fn descale(encoded: i64, reference_value: f64, binary_scale_factor: i16, decimal_scale_factor: i16) -> f32 {
    let binary_scale = 2_f64.powi(-(binary_scale_factor as i32));
    let decimal_scale = 10_f64.powi(-(decimal_scale_factor as i32));
    ((reference_value + encoded as f64 * binary_scale) * decimal_scale) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_scaling_round_trips_exactly() {
        let fld = [3.0f32, 8.0, 5.0, 21.0];
        let q = Quantizer::new(3.0, 0, 0);
        let ints: Vec<i64> = fld.iter().map(|v| q.apply(*v)).collect();
        assert_eq!(ints, vec![0, 5, 2, 18]);
        assert_eq!(q.reference(), 3.0);

        let back: Vec<f32> =
            ScaleIterator::new(ints.into_iter(), q.reference() as f64, 0, 0).collect();
        assert_eq!(back, fld);
    }

    #[test]
    fn decimal_scaling_bounds_error() {
        let fld = [0.1234f32, -0.92, 4.5678];
        let rmin = -0.92;
        let q = Quantizer::new(rmin, 0, 3);
        let ints: Vec<i64> = fld.iter().map(|v| q.apply(*v)).collect();
        assert!(ints.iter().all(|v| *v >= 0));

        for (orig, int) in fld.iter().zip(ints) {
            let back = descale(int, q.reference() as f64, 0, 3);
            assert!((back - orig).abs() <= 1e-3, "{} vs {}", back, orig);
        }
    }

    #[test]
    fn binary_scaling_bounds_error() {
        let fld = [1.0f32, 1.25, 7.75, 2.5];
        let q = Quantizer::new(1.0, 2, 0);
        let ints: Vec<i64> = fld.iter().map(|v| q.apply(*v)).collect();
        assert!(ints.iter().all(|v| *v >= 0));

        for (orig, int) in fld.iter().zip(ints) {
            let back = descale(int, q.reference() as f64, 2, 0);
            assert!((back - orig).abs() <= 0.25, "{} vs {}", back, orig);
        }
    }
}
