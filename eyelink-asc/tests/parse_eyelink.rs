use std::io::Write;
use std::path::PathBuf;

use ::test_case::test_case;
use chrono::NaiveDate;
use eyelink_asc::{
    parse_eyelink, parse_eyelink_str, AscParserError, Calibration, MountConfiguration,
    ParseOptions, ParseWarning, PatternMapping, PatternSpec, RecordingConfig, Validation,
};
use gazeframe::{DataType, TimeColumn, Value};
use tempfile::NamedTempFile;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/patterns_example.asc")
}

fn fixture_options() -> ParseOptions {
    ParseOptions {
        patterns: vec![
            PatternMapping::new("START_A").column("task").value("A").into(),
            PatternMapping::new("START_B").column("task").value("B").into(),
            PatternMapping::new(vec!["STOP_A", "STOP_B"])
                .column("task")
                .value(Value::Null)
                .into(),
            r"START_TRIAL_(?P<trial_id>\d+)".into(),
            PatternMapping::new("STOP_TRIAL")
                .column("trial_id")
                .value(Value::Null)
                .into(),
        ],
        metadata_patterns: vec![
            r"METADATA_1 (?P<metadata_1>\d+)".into(),
            PatternMapping::new(r"METADATA_2 (?P<metadata_2>\w+)").into(),
            PatternMapping::new("METADATA_3")
                .key("metadata_3")
                .value(true)
                .into(),
            PatternMapping::new("METADATA_4")
                .key("metadata_4")
                .value(true)
                .into(),
        ],
        ..ParseOptions::default()
    }
}

fn parse_text(text: &str) -> eyelink_asc::Metadata {
    let (_, _, metadata) = parse_eyelink_str(text, &ParseOptions::default()).unwrap();
    metadata
}

fn strs(values: &[Option<&str>]) -> Vec<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}

#[test]
fn test_parse_eyelink_samples() {
    let (samples, _, _) = parse_eyelink(fixture(), &fixture_options()).unwrap();

    assert_eq!(samples.len(), 11);
    assert_eq!(
        samples.time(),
        &[
            10000000.0, 10000002.0, 10000004.0, 10000006.0, 10000008.0, 10000011.0, 10000014.0,
            10000017.0, 10000019.0, 10000020.0, 10000021.0,
        ]
    );

    let x = samples.channel("x_pix").unwrap();
    assert!(x[..9].iter().all(|&v| v == 850.7));
    assert!(x[9].is_nan() && x[10].is_nan());
    let pupil = samples.channel("pupil").unwrap();
    assert!(pupil[8].is_nan());
    assert_eq!(pupil[9], 0.0);

    assert_eq!(
        samples.column("task").unwrap(),
        strs(&[None, Some("A"), None, Some("B"), Some("B"), Some("B"), Some("B"), None, None, None, None])
            .as_slice()
    );
    assert_eq!(
        samples.column("trial_id").unwrap(),
        strs(&[None, None, None, None, Some("1"), Some("2"), Some("3"), None, None, None, None])
            .as_slice()
    );
}

#[test]
fn test_parse_eyelink_events() {
    let (_, events, _) = parse_eyelink(fixture(), &fixture_options()).unwrap();

    assert_eq!(
        events.names(),
        &[
            "fixation_eyelink".to_string(),
            "blink_eyelink".to_string(),
            "saccade_eyelink".to_string()
        ]
    );
    assert_eq!(
        events.onsets(),
        &TimeColumn::Float(vec![10000000.0, 10000020.0, 10000011.0])
    );
    assert_eq!(
        events.offsets(),
        &TimeColumn::Float(vec![10000008.0, 10000022.0, 10000022.0])
    );
    assert_eq!(
        events.column("task").unwrap(),
        strs(&[None, None, Some("B")]).as_slice()
    );
    assert_eq!(
        events.column("trial_id").unwrap(),
        strs(&[None, None, Some("2")]).as_slice()
    );
    assert_eq!(
        events.column("eye").unwrap(),
        strs(&[Some("right"), Some("right"), Some("right")]).as_slice()
    );
}

#[test]
fn test_parse_eyelink_metadata() {
    let (_, _, metadata) = parse_eyelink(fixture(), &fixture_options()).unwrap();

    assert_eq!(metadata.weekday.as_deref(), Some("Wed"));
    assert_eq!(metadata.month.as_deref(), Some("Mar"));
    assert_eq!(metadata.day, Some(8));
    assert_eq!(metadata.year, Some(2023));
    assert_eq!(metadata.time.as_deref(), Some("09:25:20"));
    assert_eq!(
        metadata.datetime,
        Some(NaiveDate::from_ymd_opt(2023, 3, 8).unwrap().and_hms_opt(9, 25, 20).unwrap())
    );
    assert_eq!(metadata.version_1.as_deref(), Some("EYELINK II 1"));
    assert_eq!(
        metadata.version_2.as_deref(),
        Some("EYELINK II CL v6.12 Feb  1 2018 (EyeLink Portable Duo)")
    );
    assert_eq!(metadata.version_number, "6.12");
    assert_eq!(metadata.model, "EyeLink Portable Duo");
    assert_eq!(metadata.vendor.as_deref(), Some("SR Research"));
    assert_eq!(metadata.sampling_rate, Some(1000.0));
    assert_eq!(metadata.tracked_eye.as_deref(), Some("L"));
    assert_eq!(metadata.recorded_eye.as_deref(), Some("L"));
    assert_eq!(metadata.pupil_data_type.as_deref(), Some("AREA"));
    assert_eq!(metadata.resolution, Some((1280.0, 1024.0)));
    assert_eq!(metadata.display_coords, Some(vec![0.0, 0.0, 1279.0, 1023.0]));
    assert!(metadata.calibrations.is_empty());
    assert!(metadata.validations.is_empty());
    assert_eq!(
        metadata.mount_configuration,
        Some(MountConfiguration::from_code("BTABLER"))
    );
    assert_eq!(
        metadata.recording_config,
        vec![RecordingConfig {
            timestamp: 2154555.0,
            tracking_mode: "CR".into(),
            sampling_rate: 1000.0,
            file_sample_filter: 2,
            link_sample_filter: 1,
            tracked_eye: "L".into(),
            resolution: Some((1280.0, 1024.0)),
        }]
    );

    assert_eq!(metadata.total_recording_duration_ms, 12.0);
    assert_eq!(metadata.num_expected_samples, 12);
    assert_eq!(metadata.data_loss_ratio_blinks, 3.0 / 12.0);
    assert_eq!(metadata.data_loss_ratio, 4.0 / 12.0);

    assert_eq!(metadata.get("metadata_1"), Some(&Value::from("123")));
    assert_eq!(metadata.get("metadata_2"), Some(&Value::from("abc")));
    assert_eq!(metadata.get("metadata_3"), Some(&Value::Bool(true)));
    assert_eq!(metadata.get("metadata_4"), Some(&Value::Null));
    assert_eq!(metadata.extra.len(), 4);
    assert!(metadata.warnings.is_empty(), "{:?}", metadata.warnings);
}

#[test]
fn test_schema_override() {
    let mut options = fixture_options();
    options.schema.insert("trial_id".into(), DataType::Int);
    let (samples, events, _) = parse_eyelink(fixture(), &options).unwrap();

    assert_eq!(samples.column("trial_id").unwrap()[4], Value::Int(1));
    assert_eq!(events.column("trial_id").unwrap()[2], Value::Int(2));
}

#[test]
fn test_metadata_pattern_not_found() {
    let options = ParseOptions {
        metadata_patterns: vec![r"inexistent pattern (?P<value>-?\d+)".into()],
        ..ParseOptions::default()
    };
    let (_, _, metadata) = parse_eyelink(fixture(), &options).unwrap();
    assert_eq!(metadata.get("value"), Some(&Value::Null));
}

#[test]
fn test_metadata_patterns_on_same_line() {
    let options = ParseOptions {
        metadata_patterns: vec![
            r"SYNC (?P<sync>\d+)".into(),
            PatternMapping::new("SYNC")
                .key("has_sync")
                .value(true)
                .into(),
        ],
        ..ParseOptions::default()
    };
    let (_, _, metadata) = parse_eyelink_str("MSG 1 SYNC 5\n", &options).unwrap();
    assert_eq!(metadata.get("sync"), Some(&Value::from("5")));
    assert_eq!(metadata.get("has_sync"), Some(&Value::Bool(true)));
}

#[test]
fn test_invalid_pattern_from_settings() {
    let value: toml::Value = toml::from_str("pattern = 1").unwrap();
    let err = PatternSpec::try_from(&value).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("invalid pattern"), "{}", msg);
    assert!(msg.contains('1'), "{}", msg);
}

#[test]
fn test_invalid_regex_is_fatal() {
    let options = ParseOptions {
        patterns: vec!["START_(".into()],
        ..ParseOptions::default()
    };
    match parse_eyelink(fixture(), &options) {
        Err(AscParserError::Regex(_)) => (),
        other => panic!("Should have failed, got {:?}", other.map(|r| r.0.len())),
    }
}

#[test_case("** VERSION: EYELINK II 1\n** EYELINK II CL v6.12 Feb  1 2018 (EyeLink Portable Duo)", "6.12", "EyeLink Portable Duo"; "eye link portable duo")]
#[test_case("** VERSION: EYELINK II 1\n** EYELINK II CL v5.12 Feb  1 2018\n", "5.12", "EyeLink 1000 Plus"; "eye link 1000 plus")]
#[test_case("** VERSION: EYELINK II 1\n** EYELINK II CL v4.12 Feb  1 2018", "4.12", "EyeLink 1000"; "eye link 1000 1")]
#[test_case("** VERSION: EYELINK II 1\n** EYELINK II CL v3.12 Feb  1 2018", "3.12", "EyeLink 1000"; "eye link 1000 2")]
#[test_case("** VERSION: EYELINK II 1\n** EYELINK II CL v2.12 Feb  1 2018", "2.12", "EyeLink II"; "eye link ii")]
#[test_case("** VERSION: EYELINK REVISION 2.00 (Aug 12 1997)", "2.00", "EyeLink I"; "eye link i")]
#[test_case("** VERSION: nothing\n", "unknown", "unknown"; "unknown version 1")]
#[test_case("** VERSION: EYELINK II 1\n** EYELINK II CL Feb  1 2018 (EyeLink Portable Duo)", "unknown", "unknown"; "unknown version 2")]
#[test_case("** TYPE: EDF_FILE BINARY EVENT SAMPLE TAGGED", "unknown", "unknown"; "unknown version 3")]
fn test_parse_eyelink_version(text: &str, version: &str, model: &str) {
    let metadata = parse_text(text);
    assert_eq!(metadata.version_number, version);
    assert_eq!(metadata.model, model);
}

#[test_case("MSG\t2154555 RECCFG CR 1000 2 1 L\n", "No metadata found. Please check the file for errors."; "no metadata")]
#[test_case("** DATE: Wed Mar  8 09:25:20 2023\n", "No recording configuration found."; "no reccfg")]
#[test_case(
    "MSG\t2154555 RECCFG CR 1000 2 1 L\nMSG\t2154556 RECCFG CR 2000 2 1 L\n",
    "Found inconsistent values for 'sampling_rate': [1000, 2000]";
    "inconsistent sampling rate"
)]
#[test_case(
    "MSG\t2154555 RECCFG CR 1000 2 1 L\n\
     MSG\t2154555 GAZE_COORDS 0 0 1919 1079\n\
     MSG\t2154556 RECCFG CR 1000 2 1 L\n\
     MSG\t2154556 GAZE_COORDS 0 0 1023 767\n",
    "Found inconsistent values for 'resolution': [(1024.0, 768.0), (1920.0, 1080.0)]";
    "inconsistent resolution"
)]
fn test_metadata_warnings(text: &str, expected: &str) {
    let metadata = parse_text(text);
    let messages: Vec<String> = metadata.warnings.iter().map(|w| w.to_string()).collect();
    assert!(
        messages.iter().any(|m| m == expected),
        "{:?} not in {:?}",
        expected,
        messages
    );
}

#[test]
fn test_inconsistent_values_are_none() {
    let metadata = parse_text(
        "MSG\t2154555 RECCFG CR 1000 2 1 L\n\
         MSG\t2154555 GAZE_COORDS 0 0 1919 1079\n\
         MSG\t2154556 RECCFG CR 2000 2 1 R\n\
         MSG\t2154556 GAZE_COORDS 0 0 1023 767\n",
    );
    assert_eq!(metadata.sampling_rate, None);
    assert_eq!(metadata.tracked_eye, None);
    assert_eq!(metadata.resolution, None);
    assert!(metadata.warnings.contains(&ParseWarning::Inconsistent {
        key: "tracked_eye".into(),
        values: vec!["L".into(), "R".into()],
    }));
}

#[test]
fn test_samples_config_takes_precedence() {
    let metadata = parse_text(
        "MSG\t2154555 RECCFG CR 1000 2 1 LR\n\
         SAMPLES\tGAZE\tLEFT\tRATE\t 500.00\tTRACKING\tCR\tFILTER\t2\n",
    );
    assert_eq!(metadata.sampling_rate, Some(500.0));
    assert_eq!(metadata.tracked_eye.as_deref(), Some("L"));
    assert_eq!(metadata.recorded_eye.as_deref(), Some("LR"));
    assert!(metadata.warnings.contains(&ParseWarning::SamplingRateMismatch {
        samples: 500.0,
        recording: 1000.0
    }));
    assert!(metadata.warnings.contains(&ParseWarning::TrackedEyeMismatch {
        recorded: "LR".into(),
        tracked: "L".into()
    }));
}

fn calibration(num_points: Option<u32>, kind: Option<&str>, eye: Option<&str>) -> Calibration {
    Calibration {
        timestamp: 7045618.0,
        num_points,
        calibration_type: kind.map(String::from),
        tracked_eye: eye.map(String::from),
    }
}

#[test]
fn test_calibration_and_validation() {
    let metadata = parse_text(
        "MSG\t7045618 !CAL \n\
         >>>>>>> CALIBRATION (HV9,P-CR) FOR LEFT: <<<<<<<<<\n\
         MSG\t7045618 !CAL Calibration points:  \n\
         MSG\t1076158 !CAL VALIDATION HV9 R RIGHT POOR ERROR 2.40 avg. 6.03 max  OFFSET 0.19 deg. 4.2,6.3 pix.\n",
    );
    assert_eq!(
        metadata.calibrations,
        vec![calibration(Some(9), Some("P-CR"), Some("LEFT"))]
    );
    assert_eq!(
        metadata.validations,
        vec![Validation {
            timestamp: 1076158.0,
            num_points: 9,
            tracked_eye: "RIGHT".into(),
            error: "POOR ERROR".into(),
            validation_score_avg: 2.40,
            validation_score_max: 6.03,
        }]
    );
}

#[test]
fn test_calibration_without_validation() {
    let metadata = parse_text(
        "MSG\t7045618 !CAL\n\
         >>>>>>> CALIBRATION (HV9,P-CR) FOR LEFT: <<<<<<<<<\n",
    );
    assert_eq!(
        metadata.calibrations,
        vec![calibration(Some(9), Some("P-CR"), Some("LEFT"))]
    );
    assert!(metadata.validations.is_empty());
}

#[test]
fn test_calibration_timestamp_only() {
    let metadata = parse_text("MSG\t7045618 !CAL\nMSG\t7045618 !CAL\n");
    assert_eq!(metadata.calibrations, vec![calibration(None, None, None)]);
    assert!(metadata.validations.is_empty());
}

#[test_case(
    "MSG\t0 RECCFG CR 1000 2 1 R\n\
     START\t0 \tRIGHT\tSAMPLES\tEVENTS\n\
     SBLINK R 5\n\
     EBLINK R 5\t6\t2\n\
     END\t12 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    2.0 / 12.0, 1.0; "short blink without samples")]
#[test_case(
    "MSG\t2154555 RECCFG CR 1000 2 1 L\n\
     START\t10000018 \tRIGHT\tSAMPLES\tEVENTS\n\
     SBLINK R 10000019\n\
     10000019\t   .\t   .\t    0.0\t    0.0\t...\n\
     10000020\t   .\t   .\t    0.0\t    0.0\t...\n\
     EBLINK R 10000019\t10000020\t2\n\
     END\t10000020 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    1.0, 1.0; "only blinks")]
#[test_case(
    "MSG\t2154555 RECCFG CR 1000 2 1 L\n\
     START\t10000018 \tRIGHT\tSAMPLES\tEVENTS\n\
     SBLINK R 10000019\n\
     10000019\t   .\t   .\t    0.0\t...\n\
     10000020\t   .\t   .\t    0.0\t...\n\
     EBLINK R 10000019\t10000020\t2\n\
     END\t10000020 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    1.0, 1.0; "only blinks no dummy")]
#[test_case(
    "MSG\t2154555 RECCFG CR 1000 2 1 L\n\
     START\t10000018 \tRIGHT\tSAMPLES\tEVENTS\n\
     10000019\t   .\t   .\t    0.0\t    0.0\t...\n\
     END\t10000019 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    0.0, 1.0; "lost samples no blinks")]
#[test_case(
    "MSG\t2154555 RECCFG CR 1000 2 1 L\n\
     START\t10000018 \tRIGHT\tSAMPLES\tEVENTS\n\
     SBLINK R 10000019\n\
     10000019\t   .\t   .\t    0.0\t    0.0\t...\n\
     EBLINK R 10000019\t10000019\t1\n\
     10000020\t   .\t   .\t    0.0\t    0.0\t...\n\
     END\t10000020 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    0.5, 1.0; "blinks and lost samples")]
#[test_case(
    "MSG\t2154555 RECCFG CR 1000 2 1 L\n\
     START\t10000018 \tRIGHT\tSAMPLES\tEVENTS\n\
     10000019\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     10000020\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     10000022\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     END\t10000022 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    0.0, 0.25; "missing timestamps")]
#[test_case(
    "MSG\t2154555 RECCFG CR 1000 2 1 L\n\
     START\t10000018 \tRIGHT\tSAMPLES\tEVENTS\n\
     10000019\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     10000020\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     10000022\t   .\t   .\t    0.0\t    0.0\t...\n\
     END\t10000022 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    0.0, 0.5; "missing timestamps lost samples")]
#[test_case(
    "MSG\t2154555 RECCFG CR 1000 2 1 L\n\
     START\t10000020 \tRIGHT\tSAMPLES\tEVENTS\n\
     10000020\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     10000022\t   .\t   .\t    0.0\t    0.0\t...\n\
     SBLINK R 10000024\n\
     10000024\t   .\t   .\t    0.0\t    0.0\t...\n\
     EBLINK R 10000024\t10000024\t1\n\
     END\t10000024 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    0.25, 0.75; "missing timestamps lost samples blink")]
#[test_case(
    "MSG\t2154555 RECCFG CR 1000 2 1 L\n\
     START\t10000020 \tRIGHT\tSAMPLES\tEVENTS\n\
     END\t10000021 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    0.0, 1.0; "no samples")]
#[test_case(
    "MSG\t10000018.0 RECCFG CR 1000 2 1 L\n\
     START\t10000018.0 \tRIGHT\tSAMPLES\tEVENTS\n\
     10000019.0\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     10000020.0\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     END\t10000020.0 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n\
     MSG\t10000021.0 RECCFG CR 2000 2 1 L\n\
     START\t10000021.0 \tRIGHT\tSAMPLES\tEVENTS\n\
     END\t10000023.0 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    0.0, 2.0 / 3.0; "varying sampling rate")]
#[test_case(
    "MSG\t10000018.0 RECCFG CR 1000 2 1 L\n\
     START\t10000018.0 \tRIGHT\tSAMPLES\tEVENTS\n\
     10000019.0\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     10000020.0\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     END\t10000020.0 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n\
     MSG\t10000021.0 RECCFG CR 2000 2 1 L\n\
     START\t10000021.0 \tRIGHT\tSAMPLES\tEVENTS\n\
     SBLINK R 10000020.0\n\
     10000020.0\t   .\t   .\t    0.0\t    0.0\t...\n\
     10000021.0\t   .\t   .\t    0.0\t    0.0\t...\n\
     EBLINK R 10000020.0\t10000021.5\t2.0\n\
     END\t10000023.0 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    2.0 / 3.0, 2.0 / 3.0; "varying sampling rate blink")]
fn test_data_loss_ratio(text: &str, blink_ratio: f64, overall_ratio: f64) {
    let metadata = parse_text(text);
    assert_eq!(metadata.data_loss_ratio_blinks, blink_ratio);
    assert_eq!(metadata.data_loss_ratio, overall_ratio);
}

#[test_case(
    "MSG\t0 RECCFG CR 1000 2 1 R\n\
     START\t0 \tRIGHT\tSAMPLES\tEVENTS\n\
     SBLINK R 0\n\
     EBLINK R 0\t50\t51\n\
     END\t10 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    1.0, 1.0; "blink longer than recording")]
#[test_case(
    "MSG\t0 RECCFG CR 1000 2 1 R\n\
     START\t0 \tRIGHT\tSAMPLES\tEVENTS\n\
     0\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     1\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     2\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     3\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     4\t   850.7\t  717.5\t  714.0\t    0.0\t...\n\
     END\t2 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    0.0, 0.0; "more samples than expected")]
fn test_data_loss_ratio_is_bounded(text: &str, blink_ratio: f64, overall_ratio: f64) {
    let metadata = parse_text(text);
    for ratio in [metadata.data_loss_ratio, metadata.data_loss_ratio_blinks] {
        assert!((0.0..=1.0).contains(&ratio), "ratio {} out of bounds", ratio);
    }
    assert_eq!(metadata.data_loss_ratio_blinks, blink_ratio);
    assert_eq!(metadata.data_loss_ratio, overall_ratio);
}

#[test]
fn test_blink_only_block() {
    let metadata = parse_text(
        "MSG\t2154555 RECCFG CR 1000 2 1 L\n\
         START\t10000000 \tRIGHT\tSAMPLES\tEVENTS\n\
         SBLINK R 10000000\n\
         10000000\t   .\t   .\t    0.0\t    0.0\t...\n\
         10000001\t   .\t   .\t    0.0\t    0.0\t...\n\
         10000002\t   .\t   .\t    0.0\t    0.0\t...\n\
         EBLINK R 10000000\t10000002\t3\n\
         END\t10000003 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    );
    assert_eq!(metadata.num_expected_samples, 3);
    assert_eq!(metadata.num_blink_samples, 3);
    assert_eq!(metadata.data_loss_ratio_blinks, 1.0);
    assert_eq!(metadata.data_loss_ratio, 1.0);
}

#[test]
fn test_dangling_end() {
    let metadata = parse_text(
        "MSG\t2154555 RECCFG CR 1000 2 1 L\n\
         START\t10000000 \tRIGHT\tSAMPLES\tEVENTS\n\
         10000000\t  850.7\t  717.5\t  714.0\t    0.0\t...\n\
         END\t10000001 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n\
         END\t10000005 \tSAMPLES\tEVENTS\tRES\t  38.54\t  31.12\n",
    );
    assert_eq!(metadata.total_recording_duration_ms, 1.0);
    assert_eq!(metadata.num_expected_samples, 1);
    assert!(metadata
        .warnings
        .iter()
        .any(|w| w.to_string().contains("without associated START")));
}

#[test]
fn test_parse_eyelink_datetime() {
    let metadata = parse_text("** DATE: Wed Mar  8 09:25:20 2023\n");
    assert_eq!(
        metadata.datetime,
        Some(NaiveDate::from_ymd_opt(2023, 3, 8).unwrap().and_hms_opt(9, 25, 20).unwrap())
    );
}

#[test_case("BTABLER", "Desktop", "binocular / monocular", None; "desktop stabilized binocular")]
#[test_case("MLRR", "Long-Range Mount", "monocular", Some("level"); "long range level monocular")]
#[test_case("XXXXX", "unknown", "unknown", Some("unknown"); "unknown mount config")]
fn test_parse_eyelink_mount_config(code: &str, mount_type: &str, eyes: &str, camera: Option<&str>) {
    let metadata = parse_text(&format!(
        "MSG\t2154555 RECCFG CR 1000 2 1 L\nMSG\t2154555 ELCLCFG {}\n",
        code
    ));
    let mount = metadata.mount_configuration.unwrap();
    assert_eq!(mount.mount_type, mount_type);
    assert_eq!(mount.eyes_recorded, eyes);
    assert_eq!(mount.camera_position.as_deref(), camera);
    assert_eq!(mount.short_name, code);
}

#[test_case(b"MSG\t2154555 H\xe4user\n", "latin1"; "latin1")]
#[test_case(b"MSG\t2154555 H\xc3\xa4user\n", "utf-8"; "utf8")]
fn test_parse_eyelink_encoding(bytes: &[u8], encoding: &str) {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();

    let options = ParseOptions {
        encoding: Some(encoding.to_string()),
        metadata_patterns: vec![r"(?P<text>.+)".into()],
        ..ParseOptions::default()
    };
    let (_, _, metadata) = parse_eyelink(file.path(), &options).unwrap();
    assert_eq!(metadata.get("text"), Some(&Value::from("Häuser")));
}
