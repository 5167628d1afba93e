//! Property tests for frame decoding and line formatting.

use chrono::NaiveDate;
use proptest::prelude::*;
use qcm_logger::protocol::{decode, ProtocolVariant, FREQUENCY_OFFSET_BASE};
use qcm_logger::reading::{format_line, format_timestamp, millis_field};
use qcm_logger::source::MockSource;
use qcm_logger::storage::{BufferedWriter, MemorySink};
use qcm_logger::{Pipeline, PollOutcome};

fn variant() -> impl Strategy<Value = ProtocolVariant> {
    prop_oneof![Just(ProtocolVariant::Offset), Just(ProtocolVariant::Direct)]
}

proptest! {
    /// Any well-formed frame decodes to the variant's transform and renders
    /// the temperature as t/10 with one decimal.
    #[test]
    fn valid_frames_decode_and_format(
        f in 0i64..40_000_000,
        t in -1000i64..2000,
        v in variant(),
    ) {
        let reading = decode(&format!("RAWMONITOR{f}_{t}"), v).unwrap();
        let expected_freq = match v {
            ProtocolVariant::Offset => FREQUENCY_OFFSET_BASE - f,
            ProtocolVariant::Direct => f,
        };
        prop_assert_eq!(reading.frequency, expected_freq);

        let now = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let line = format_line(&reading, &now);
        let fields: Vec<&str> = line.trim_end().split(',').collect();
        prop_assert_eq!(fields.len(), 4);
        prop_assert_eq!(fields[2].parse::<i64>().unwrap(), expected_freq);
        let expected_temp = format!("{:.1}", t as f64 / 10.0);
        prop_assert_eq!(fields[3], expected_temp.as_str());
    }

    /// Text without the tag never decodes.
    #[test]
    fn untagged_text_is_invalid(text in "[a-zA-Z0-9_ ]{0,40}") {
        prop_assume!(!text.contains("RAWMONITOR"));
        prop_assert!(decode(&text, ProtocolVariant::Offset).is_err());
    }

    /// Payloads with a single field never decode.
    #[test]
    fn single_field_is_invalid(n in any::<i64>()) {
        let frame = format!("RAWMONITOR{n}");
        prop_assert!(decode(&frame, ProtocolVariant::Direct).is_err());
    }

    /// Non-numeric fields never decode.
    #[test]
    fn non_numeric_fields_are_invalid(word in "[a-z]{1,8}", n in 0i64..1000) {
        let word_first = format!("RAWMONITOR{word}_{n}");
        let word_last = format!("RAWMONITOR{n}_{word}");
        prop_assert!(decode(&word_first, ProtocolVariant::Direct).is_err());
        prop_assert!(decode(&word_last, ProtocolVariant::Direct).is_err());
    }

    /// Invalid frames never reach the buffer.
    #[test]
    fn invalid_frames_append_nothing(text in "[A-Z]{0,20}") {
        prop_assume!(!text.contains("RAWMONITOR"));
        let mut bytes = text.into_bytes();
        bytes.push(0xFF);
        let mut p = Pipeline::new(
            MockSource::new().with_bytes(&bytes),
            BufferedWriter::new(MemorySink::new(), 1),
            ProtocolVariant::Offset,
        );
        let outcome = p.poll_once().unwrap();
        prop_assert!(matches!(outcome, PollOutcome::Dropped(_)));
        prop_assert_eq!(p.pending(), 0);
        prop_assert!(p.sink().writes().is_empty());
    }

    /// The millisecond field is always three digits in 0..=999.
    #[test]
    fn millis_field_stays_in_range(micros in 0u32..1_000_000) {
        let time = NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_micro_opt(12, 0, 0, micros)
            .unwrap();
        prop_assert!(millis_field(&time) <= 999);
        let stamp = format_timestamp(&time);
        prop_assert_eq!(stamp.len(), "2024.06.30,12:00:00:000".len());
    }
}
