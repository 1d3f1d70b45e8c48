/*!
 * Tests for track validation rules and statistics
 */

use subfit::app_config::ConstraintConfig;
use subfit::subtitle_processor::{SubtitleCollection, SubtitleEntry};
use subfit::timing::TimeRange;
use subfit::validation::{Rule, Severity, TrackStats, Validator};

fn entry(seq: usize, start: u64, end: u64, text: &str) -> SubtitleEntry {
    SubtitleEntry::new(seq, start, end, text.to_string())
}

// 42 characters, the default line limit
fn full_line() -> String {
    format!("{} {}", "a".repeat(20), "b".repeat(21))
}

/// Test that the accepted excess turns a hard-max error into a warning
#[test]
fn test_validate_withAcceptableExcess_shouldDowngradeToWarning() {
    // 42 characters in 2 seconds = 21 CPS
    let entries = vec![entry(1, 0, 2000, &full_line())];

    let strict = Validator::new(&ConstraintConfig::default()).validate(&entries, None, None);
    let tolerant = Validator::new(&ConstraintConfig {
        cps_acceptable_excess: 2.0,
        ..ConstraintConfig::default()
    })
    .validate(&entries, None, None);

    assert!(!strict.is_valid());
    assert!(strict
        .diagnostics
        .iter()
        .any(|d| d.rule == Rule::CpsAboveHardMax && d.severity == Severity::Error));
    assert!(tolerant.is_valid());
    assert!(tolerant
        .diagnostics
        .iter()
        .any(|d| d.rule == Rule::CpsAboveHardMax && d.severity == Severity::Warning));
}

/// Test that an unbounded final line may run past the maximum duration
#[test]
fn test_validate_withUnboundedFinalLine_shouldAcceptLongEnding() {
    let entries = vec![
        entry(1, 0, 3000, "A calm opening line."),
        entry(2, 3500, 12_500, "A calm closing line."),
    ];

    let bounded = Validator::new(&ConstraintConfig::default()).validate(&entries, None, None);
    let unbounded = Validator::new(&ConstraintConfig {
        final_block_unbounded: true,
        ..ConstraintConfig::default()
    })
    .validate(&entries, None, None);

    assert!(bounded.diagnostics.iter().any(|d| d.rule == Rule::DurationTooLong && d.block == Some(2)));
    assert!(unbounded.is_valid());
    assert!(unbounded.diagnostics.is_empty());
}

/// Test that a track far away from the speech is flagged at both ends
#[test]
fn test_validate_withDistantSpeechRange_shouldWarnTwice() {
    let entries = vec![entry(1, 0, 2000, "Too early.")];

    let report = Validator::new(&ConstraintConfig::default()).validate(
        &entries,
        None,
        Some(TimeRange::new(5000, 6000)),
    );

    let range_warnings: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.rule == Rule::SpeechRange)
        .collect();
    assert_eq!(range_warnings.len(), 2);
    assert!(range_warnings.iter().all(|d| d.severity == Severity::Warning));
    assert!(report.is_valid());
}

/// Test that numbering and ordering problems are reported on the later line
#[test]
fn test_validate_withOutOfOrderLines_shouldReportOrderAndNumbering() {
    let entries = vec![
        entry(1, 5000, 7000, "Second in time."),
        entry(3, 1000, 3000, "First in time."),
    ];

    let report = Validator::new(&ConstraintConfig::default()).validate(&entries, None, None);

    assert!(report.diagnostics.iter().any(|d| d.rule == Rule::Numbering && d.block == Some(3)));
    assert!(report.diagnostics.iter().any(|d| d.rule == Rule::OutOfOrder && d.block == Some(3)));
}

/// Test that a backwards final entry read from SRT text is reported, not dropped
#[test]
fn test_validate_withBackwardsFinalEntry_shouldReportInvalidTimeRange() {
    let srt = "1\n00:00:01,000 --> 00:00:03,000\nA calm first line.\n\n2\n00:00:09,000 --> 00:00:05,000\nA broken last line.\n";
    let entries = SubtitleCollection::parse_srt_unchecked(srt).expect("structurally valid SRT");

    let report = Validator::new(&ConstraintConfig::default()).validate(&entries, None, None);

    assert_eq!(report.stats.block_count, 2);
    assert!(!report.is_valid());
    let invalid = report
        .diagnostics
        .iter()
        .find(|d| d.rule == Rule::InvalidTimeRange)
        .expect("backwards entry reported");
    assert_eq!(invalid.block, Some(2));
    assert_eq!(invalid.severity, Severity::Error);
}

/// Test that an entry without text is an error of its own
#[test]
fn test_validate_withEmptyEntry_shouldReportEmptyText() {
    let srt = "1\n00:00:01,000 --> 00:00:03,000\n\n2\n00:00:04,000 --> 00:00:06,000\nStill here.\n";
    let entries = SubtitleCollection::parse_srt_unchecked(srt).expect("structurally valid SRT");

    let report = Validator::new(&ConstraintConfig::default()).validate(&entries, None, None);

    assert!(report.diagnostics.iter().any(|d| d.rule == Rule::EmptyText && d.block == Some(1)));
    assert!(!report.is_valid());
}

/// Test that a dropped word is reported as a text mismatch error
#[test]
fn test_validate_withMissingWord_shouldReportTextMismatch() {
    let entries = vec![
        entry(1, 0, 2000, "We walked home"),
        entry(2, 2100, 4000, "after dark."),
    ];

    let report = Validator::new(&ConstraintConfig::default()).validate(
        &entries,
        Some("We walked home slowly after dark."),
        None,
    );

    let mismatch = report
        .diagnostics
        .iter()
        .find(|d| d.rule == Rule::TextMismatch)
        .expect("mismatch reported");
    assert_eq!(mismatch.block, Some(2));
    assert!(mismatch.message.contains("word 4"));
}

/// Test the statistics of a small track
#[test]
fn test_track_stats_withOverlap_shouldCountIt() {
    let constraints = ConstraintConfig::default();
    let entries = vec![
        entry(1, 0, 2000, "Ten chars!"),
        entry(2, 1500, 3500, &full_line()),
        entry(3, 3550, 5550, "Ten chars!"),
    ];

    let stats = TrackStats::compute(&entries, &constraints);

    assert_eq!(stats.block_count, 3);
    assert_eq!(stats.max_cpl, 42);
    assert_eq!(stats.overlaps, 1);
    assert_eq!(stats.small_gaps, 1);
    assert_eq!(stats.above_hard_max, 1);
    assert_eq!(stats.median_cps, 5.0);
    assert!(stats.to_string().contains("1 overlaps"));
}
