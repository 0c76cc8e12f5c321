use gribpack::utils::write_ieee;
use gribpack::{complex_pack, complex_unpack};

#[test]
fn ramp_of_ten_template_5_2() {
    let fld: Vec<f32> = (0..10).map(|j| j as f32).collect();
    let mut tmpl = [0i32; 16];

    let payload = complex_pack(&fld, 2, &mut tmpl).unwrap();

    // one group of ten values, four bits each : the nibbles 0..9
    assert_eq!(payload, vec![0x01, 0x23, 0x45, 0x67, 0x89]);

    assert_eq!(tmpl[0], write_ieee(0.0) as i32);
    assert_eq!(tmpl[3], 0, "references take no bits");
    assert_eq!(tmpl[5], 1, "general group splitting");
    assert_eq!(tmpl[6], 0, "no missing value management");
    assert_eq!(tmpl[9], 1, "group count");
    assert_eq!(tmpl[10], 4, "group width reference");
    assert_eq!(tmpl[11], 0, "group widths take no bits");
    assert_eq!(tmpl[12], 10, "group length reference");
    assert_eq!(tmpl[13], 1, "length increment");
    assert_eq!(tmpl[14], 10, "last group length");
    assert_eq!(tmpl[15], 0, "group lengths take no bits");

    let decoded = complex_unpack(&payload, &tmpl, 10, 2).unwrap();
    assert_eq!(&decoded[..], &fld[..]);
}

#[test]
fn ramp_of_thousand_template_5_3() {
    let fld: Vec<f32> = (0..1000).map(|j| j as f32).collect();
    let mut tmpl = [0i32; 18];
    tmpl[16] = 2;

    let payload = complex_pack(&fld, 3, &mut tmpl).unwrap();

    // second differences of a linear ramp vanish; the payload is just the
    // three extra descriptors v1 = 0, v2 = 1, min = 0 in one octet each
    assert_eq!(payload, vec![0x00, 0x01, 0x00]);

    assert_eq!(tmpl[0], write_ieee(0.0) as i32);
    assert_eq!(tmpl[3], 0);
    assert_eq!(tmpl[9], 1);
    assert_eq!(tmpl[10], 0, "all residuals are zero-width");
    assert_eq!(tmpl[12], 1000);
    assert_eq!(tmpl[14], 1000);
    assert_eq!(tmpl[16], 2, "second-order differencing");
    assert_eq!(tmpl[17], 1, "extra descriptors use one octet");

    let decoded = complex_unpack(&payload, &tmpl, 1000, 3).unwrap();
    assert_eq!(&decoded[..], &fld[..]);
}

#[test]
fn constant_field_has_no_groups() {
    let fld = [5.0f32; 100];
    let mut tmpl = [0i32; 16];

    let payload = complex_pack(&fld, 2, &mut tmpl).unwrap();

    assert!(payload.is_empty());
    assert_eq!(tmpl[0], write_ieee(5.0) as i32);
    assert_eq!(tmpl[3], 0);
    assert_eq!(tmpl[9], 0, "constant fields carry no groups");

    let decoded = complex_unpack(&payload, &tmpl, 100, 2).unwrap();
    assert_eq!(&decoded[..], &fld[..]);
}

#[test]
fn first_order_differencing_vector() {
    // a staircase collapses to constant first differences
    let fld: Vec<f32> = (0..40).map(|j| (100 + 3 * j) as f32).collect();
    let mut tmpl = [0i32; 18];
    tmpl[16] = 1;

    let payload = complex_pack(&fld, 3, &mut tmpl).unwrap();

    // the scaled first value (0 after the reference subtraction) and the
    // difference minimum (3) in one octet each, residuals all zero
    assert_eq!(payload, vec![0x00, 0x03]);
    assert_eq!(tmpl[9], 1);
    assert_eq!(tmpl[16], 1);
    assert_eq!(tmpl[17], 1);

    let decoded = complex_unpack(&payload, &tmpl, 40, 3).unwrap();
    assert_eq!(&decoded[..], &fld[..]);
}
