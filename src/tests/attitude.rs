use rstest::rstest;

use crate::attitude::{
    angles_from_rotation, heading_diff_deg, rotation_from_angles, wrap_360,
};
use crate::tests::init_logger;

#[rstest]
#[case(0.0, 0.0, 0.0)]
#[case(5.0, 1.0, 0.5)]
#[case(45.0, -10.0, 20.0)]
#[case(90.0, 30.0, -30.0)]
#[case(135.0, -45.0, 60.0)]
#[case(180.0, 60.0, -90.0)]
#[case(225.0, -60.0, 120.0)]
#[case(270.0, 80.0, -150.0)]
#[case(315.0, -80.0, 179.0)]
#[case(359.9, 0.1, -0.1)]
#[case(0.1, -0.1, 0.1)]
#[case(10.0, 89.0, 0.0)]
#[case(10.0, -89.0, 0.0)]
#[case(200.0, 89.9, 5.0)]
#[case(200.0, -89.9, -5.0)]
#[case(33.3, 89.99, 0.0)]
#[case(120.0, 45.0, 45.0)]
#[case(300.0, -45.0, -45.0)]
#[case(60.0, 15.0, 165.0)]
#[case(240.0, -15.0, -165.0)]
fn euler_round_trip(#[case] heading: f64, #[case] pitch: f64, #[case] roll: f64) {
    init_logger();

    let rotation = rotation_from_angles(heading, pitch, roll);
    let (h, p, r) = angles_from_rotation(&rotation);

    // near gimbal lock heading and roll degenerate into one degree of
    // freedom: compare the recomposed rotation instead of the angles
    if pitch.abs() > 89.5 {
        let recomposed = rotation_from_angles(h, p, r);
        assert!(
            (recomposed - rotation).norm() < 1e-6,
            "rotation not reproduced near gimbal lock ({}, {}, {})",
            heading,
            pitch,
            roll
        );
        return;
    }

    assert!(
        heading_diff_deg(h, heading).abs() < 1e-9,
        "heading {} != {}",
        h,
        heading
    );
    assert!((p - pitch).abs() < 1e-9, "pitch {} != {}", p, pitch);
    assert!(
        heading_diff_deg(r, roll).abs() < 1e-9,
        "roll {} != {}",
        r,
        roll
    );
}

#[test]
fn heading_always_wrapped() {
    init_logger();

    for heading in [-720.5, -90.0, 0.0, 359.999, 360.0, 1234.5] {
        let rotation = rotation_from_angles(heading, 3.0, -2.0);
        let (h, _, _) = angles_from_rotation(&rotation);
        assert!((0.0..360.0).contains(&h), "heading {} out of range", h);
    }
}

#[test]
fn near_north_circular_difference() {
    init_logger();

    // two rotations either side of north differ by 0.2°, not 359.8°
    let (h1, _, _) = angles_from_rotation(&rotation_from_angles(359.9, 0.0, 0.0));
    let (h2, _, _) = angles_from_rotation(&rotation_from_angles(0.1, 0.0, 0.0));

    let diff = heading_diff_deg(h2, h1);
    assert!((diff - 0.2).abs() < 1e-9, "circular diff {}", diff);
}

#[test]
fn wrap_and_diff_consistency() {
    for (a, b) in [(350.0, 10.0), (10.0, 350.0), (180.0, 180.0)] {
        let diff = heading_diff_deg(a, b);
        assert!((-180.0..=180.0).contains(&diff));
        assert!((wrap_360(b + diff) - wrap_360(a)).abs() < 1e-9);
    }
}
