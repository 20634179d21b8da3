use std::io::Write;
use std::path::PathBuf;

use hifitime::Unit;

use crate::error::Error;
use crate::reader::{read_ins_log, read_pos_file, read_split_ins_logs, SignConvention};
use crate::solution::Quality;
use crate::tests::init_logger;

struct Fixture {
    path: PathBuf,
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn fixture(tag: &str, contents: &str) -> Fixture {
    let path = std::env::temp_dir().join(format!(
        "gnss-attitude-{}-{}-{:?}",
        tag,
        std::process::id(),
        std::thread::current().id()
    ));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    Fixture { path }
}

const POS_HEADER: &str = "\
% program   : RTKLIB ver.2.4.3
% inp file  : rover.obs
% obs start : 2025/07/16 01:00:00.0 GPST
%  (e/n/u-baseline=WGS84,Q=1:fix,2:float,3:sbas,4:dgps,5:single,6:ppp)
%   Date       Time        e-baseline(m)  n-baseline(m)  u-baseline(m)   Q  ns   sdn(m)   sde(m)   sdu(m)  sdne(m)  sdeu(m)  sdun(m) age(s)  ratio
";

#[test]
fn pos_file_nominal() {
    init_logger();

    let file = fixture(
        "nominal",
        &format!(
            "{}\
2025/07/16 01:00:00.000   -9.3470   36.2760    2.6030   1  14   0.0030   0.0031   0.0080  -0.0001   0.0002  -0.0001   0.0  4.5
2025/07/16 01:00:01.000   -9.3471   36.2762    2.6033   2  13   0.0050   0.0052   0.0110  -0.0001   0.0002  -0.0001   0.0  2.1
2025/07/16 01:00:02.000   -9.3469   36.2759    2.6029   1  14   0.0030   0.0031   0.0081  -0.0001   0.0002  -0.0001   0.0  4.6
",
            POS_HEADER
        ),
    );

    let series = read_pos_file(&file.path, 0.1).unwrap();

    assert_eq!(series.len(), 3);
    assert_eq!(series.skipped_rows, 0);
    assert_eq!(series.filtered_epochs, 0);
    assert_eq!(series.records[0].quality, Quality::Fix);
    assert_eq!(series.records[1].quality, Quality::Float);
    assert!((series.records[0].enu[1] - 36.276).abs() < 1e-9);
    assert_eq!(series.duration(), 2.0 * Unit::Second);

    let tally = series.quality_tally();
    assert!(tally.contains(&(Quality::Fix, 2)));
    assert!(tally.contains(&(Quality::Float, 1)));
}

#[test]
fn pos_file_sigma_filtering() {
    init_logger();

    let file = fixture(
        "sigma",
        &format!(
            "{}\
2025/07/16 01:00:00.000   -9.3470   36.2760    2.6030   1  14   0.0030   0.0031   0.0080  -0.0001   0.0002  -0.0001   0.0  4.5
2025/07/16 01:00:01.000   -9.3471   36.2762    2.6033   5   6   0.8000   0.9000   2.1000  -0.0001   0.0002  -0.0001   0.0  0.0
",
            POS_HEADER
        ),
    );

    let series = read_pos_file(&file.path, 0.1).unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series.filtered_epochs, 1);
}

#[test]
fn pos_file_all_filtered_is_insufficient() {
    init_logger();

    let file = fixture(
        "allfiltered",
        &format!(
            "{}\
2025/07/16 01:00:00.000   -9.3470   36.2760    2.6030   5   6   0.8000   0.9000   2.1000  -0.0001   0.0002  -0.0001   0.0  0.0
",
            POS_HEADER
        ),
    );

    let result = read_pos_file(&file.path, 0.1);
    assert!(matches!(result, Err(Error::InsufficientData)));
}

#[test]
fn pos_file_malformed_row_skipped() {
    init_logger();

    let file = fixture(
        "malformed",
        &format!(
            "{}\
2025/07/16 01:00:00.000   -9.3470   36.2760    2.6030   1  14   0.0030   0.0031   0.0080  -0.0001   0.0002  -0.0001   0.0  4.5
2025/07/16 01:00:01.000   -9.3471   not-a-number
2025/07/16 01:00:02.000   -9.3469   36.2759    xyz      1  14   0.0030   0.0031   0.0081  -0.0001   0.0002  -0.0001   0.0  4.6
",
            POS_HEADER
        ),
    );

    let series = read_pos_file(&file.path, 0.1).unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series.skipped_rows, 2);
}

#[test]
fn pos_file_header_never_ends() {
    init_logger();

    let file = fixture("headeronly", POS_HEADER);
    let result = read_pos_file(&file.path, 0.1);
    assert!(matches!(result, Err(Error::HeaderNotTerminated(_))));
}

#[test]
fn ins_log_semicolon_delimited() {
    init_logger();

    let file = fixture(
        "ins",
        "Time;Heading;Pitch;Roll
2025-07-16 01:00:00.000;5.1;0.9;0.4
2025-07-16 01:00:01.000;5.2;1.1;0.6
2025-07-16 01:00:02.000;365.0;1.0;-190.0
",
    );

    let series = read_ins_log(&file.path, SignConvention::default()).unwrap();

    assert_eq!(series.len(), 3);
    assert_eq!(series.skipped_rows, 0);
    assert!((series.records[0].heading_deg - 5.1).abs() < 1e-9);
    // normalization: heading wrapped, roll folded into ±180
    assert!((series.records[2].heading_deg - 5.0).abs() < 1e-9);
    assert!((series.records[2].roll_deg - 170.0).abs() < 1e-9);
}

#[test]
fn ins_log_sign_convention() {
    init_logger();

    let file = fixture(
        "signs",
        "Time,Heading,Pitch,Roll
2025-07-16 01:00:00.000,10.0,2.0,1.0
",
    );

    let convention = SignConvention {
        heading: 1.0,
        pitch: -1.0,
        roll: -1.0,
    };

    let series = read_ins_log(&file.path, convention).unwrap();
    assert!((series.records[0].pitch_deg + 2.0).abs() < 1e-9);
    assert!((series.records[0].roll_deg + 1.0).abs() < 1e-9);
}

#[test]
fn ins_log_missing_column() {
    init_logger();

    let file = fixture(
        "nocolumn",
        "Time,Heading,Pitch
2025-07-16 01:00:00.000,10.0,2.0
",
    );

    let result = read_ins_log(&file.path, SignConvention::default());
    assert!(matches!(result, Err(Error::MissingColumn(_))));
}

#[test]
fn split_ins_logs_merge() {
    init_logger();

    let heading = fixture(
        "heading",
        "Time;Heading
2025-07-16 01:00:00.000;5.1
2025-07-16 01:00:01.000;5.2
2025-07-16 01:00:05.000;5.3
",
    );

    let pitchroll = fixture(
        "pitchroll",
        "Time;Pitch;Roll
2025-07-16 01:00:00.100;0.9;0.4
2025-07-16 01:00:01.100;1.1;0.6
",
    );

    let series = read_split_ins_logs(
        &heading.path,
        &pitchroll.path,
        SignConvention::default(),
        0.5 * Unit::Second,
    )
    .unwrap();

    // the 01:00:05 heading row has no pitch/roll partner
    assert_eq!(series.len(), 2);
    assert_eq!(series.unmerged_rows, 1);
    assert!((series.records[0].heading_deg - 5.1).abs() < 1e-9);
    assert!((series.records[0].pitch_deg - 0.9).abs() < 1e-9);
}
