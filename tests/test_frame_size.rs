use mtgn::env::EnvironmentalSample;
use mtgn::gnss::GeodeticFix;
use mtgn::protocol::*;

fn worst_case_sample() -> EnvironmentalSample {
    EnvironmentalSample {
        temperature_c: Field::Available(-40.55),
        pressure_hpa: Field::Available(1084.75),
        humidity_pct: Field::Available(100.0),
        altitude_m: Field::Available(-1013.25),
    }
}

fn worst_case_fix() -> GeodeticFix {
    GeodeticFix {
        longitude_deg: Field::Available(-179.999_999),
        latitude_deg: Field::Available(-89.999_999),
        altitude_m: Field::Available(18_287.4),
        dop: Field::Available(99.9),
        epoch_seconds: Field::Available(4_102_444_800),
        satellites_in_use: Field::Available(255),
        satellites_visible: Field::Available(1530),
    }
}

#[test]
fn test_worst_case_data_line_fits_the_buffer() {
    let mut encoder = MessageEncoder::new();
    let line = encoder
        .encode_data(&worst_case_sample(), &worst_case_fix())
        .unwrap();

    assert!(line.len() <= MAX_LINE_SIZE);
    assert!(line.ends_with('\n'));
}

#[test]
fn test_data_line_always_carries_eleven_fields() {
    let mut encoder = MessageEncoder::new();

    let full = encoder
        .encode_data(&worst_case_sample(), &worst_case_fix())
        .unwrap()
        .to_string();
    let empty = encoder
        .encode_data(&EnvironmentalSample::default(), &GeodeticFix::default())
        .unwrap()
        .to_string();

    // Prefix plus eleven data fields, present or sentineled.
    assert_eq!(full.trim_end().split(',').count(), 12);
    assert_eq!(empty.trim_end().split(',').count(), 12);
}

#[test]
fn test_all_sentinel_line_is_minimal() {
    let mut encoder = MessageEncoder::new();
    let line = encoder
        .encode_data(&EnvironmentalSample::default(), &GeodeticFix::default())
        .unwrap();

    assert_eq!(line, "$MTGNO,NAN,NAN,NAN,NAN,NAN,NAN,NAN,NAN,NAN,NAN,NAN\n");
    assert_eq!(line.len(), 51);
}

#[test]
fn test_status_lines_fit_the_buffer() {
    let mut encoder = MessageEncoder::new();

    let sensor = encoder
        .encode_status(StatusMessage::SensorFailure)
        .unwrap()
        .to_string();
    let receiver = encoder
        .encode_status(StatusMessage::ReceiverSilent)
        .unwrap()
        .to_string();
    let interval = encoder
        .encode_status(StatusMessage::IntervalChanged(u32::MAX))
        .unwrap()
        .to_string();

    assert_eq!(sensor, "$MTGNS,ERR,BME\n");
    assert_eq!(receiver, "$MTGNS,ERR,GNSS\n");
    assert_eq!(interval, format!("$MTGNS,INTERVAL,{}\n", u32::MAX));
    assert!(interval.len() <= MAX_LINE_SIZE);
}

#[test]
fn test_longest_valid_command_fits_its_buffer() {
    let longest = format!("$MTGNI,{},{}", CMD_SET_INTERVAL, i32::MAX);
    assert!(longest.len() < MAX_COMMAND_SIZE);

    let request = parse_command(&longest).unwrap();
    assert_eq!(request.code, CMD_SET_INTERVAL);
    assert_eq!(request.option, i32::MAX);
}
