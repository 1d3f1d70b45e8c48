/*!
 * End-to-end optimizer scenarios and track-wide properties
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use subfit::app_config::{Config, ConstraintConfig};
use subfit::optimizer::{OptimizedTrack, Optimizer};
use subfit::timing::TimedText;
use subfit::validation::Rule;
use crate::common;

fn config_with(constraints: ConstraintConfig) -> Config {
    Config {
        constraints,
        ..Config::default()
    }
}

fn optimize(config: &Config, input: &TimedText) -> OptimizedTrack {
    common::init_logging();
    Optimizer::new(config).run(input).expect("input is aligned")
}

fn unresolvable_at(track: &OptimizedTrack, block: usize) -> bool {
    track
        .diagnostics
        .iter()
        .any(|d| d.rule == Rule::ConstraintUnresolvable && d.block == Some(block))
}

fn words_of(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// A comfortable sentence keeps the boundaries of its speech
#[test]
fn test_optimize_withComfortableLongSentence_shouldKeepBoundaries() {
    let sentence = "The city council finally approved the budget after debates.";
    assert_eq!(sentence.chars().count(), 59);
    let config = config_with(ConstraintConfig {
        max_chars_per_line: 60,
        max_duration_ms: 8000,
        ..ConstraintConfig::default()
    });

    let track = optimize(&config, &common::timed_text(&[(sentence, 80_100, 87_800)]));

    assert_eq!(track.entries.len(), 1);
    let entry = &track.entries[0];
    assert_eq!((entry.start_time_ms, entry.end_time_ms), (80_100, 87_800));
    assert_eq!(entry.text, sentence);
    assert!(track.diagnostics.is_empty(), "{:?}", track.diagnostics);
    assert!((track.stats.max_cps - 7.66).abs() < 0.01);
}

/// A long sentence with a central comma is split there
#[test]
fn test_optimize_withLongSentenceAndComma_shouldSplitAtComma() {
    let first = "After a long and rather tiring day at a lab,";
    let second = "we sat down together and shared a tasty meal.";
    let sentence = format!("{} {}", first, second);
    assert_eq!(sentence.chars().count(), 90);
    let config = config_with(ConstraintConfig {
        max_chars_per_line: 50,
        ..ConstraintConfig::default()
    });

    let track = optimize(&config, &common::timed_text(&[(sentence.as_str(), 0, 4000)]));

    assert_eq!(track.entries.len(), 2);
    assert_eq!(track.entries[0].text, first);
    assert_eq!(track.entries[1].text, second);
    let rejoined = track.entries.iter().map(|e| e.text.as_str()).collect::<Vec<_>>().join(" ");
    assert_eq!(rejoined, sentence);

    // The first line starts with the first word, the second covers the last word
    assert_eq!(track.entries[0].start_time_ms, 0);
    assert!(track.entries[1].end_time_ms >= 4000);
    let gap = track.entries[1].start_time_ms as i64 - track.entries[0].end_time_ms as i64;
    assert!(gap >= config.constraints.min_gap_ms as i64 || unresolvable_at(&track, 1));
}

/// A 30 ms gap is widened to exactly the minimum gap by trimming the earlier line
#[test]
fn test_optimize_withTinyGap_shouldTrimEarlierLine() {
    let config = Config::default();
    let input = common::timed_text(&[
        ("First calm sentence here", 1000, 3970),
        ("Second calm sentence here", 4000, 7000),
    ]);

    let track = optimize(&config, &input);

    assert_eq!(track.entries.len(), 2);
    assert_eq!(track.entries[0].end_time_ms, 4000 - config.constraints.min_gap_ms);
    assert_eq!(track.entries[1].start_time_ms, 4000);
    assert!(track.is_valid());
}

/// A very short line grows into the silence after it up to the minimum duration
#[test]
fn test_optimize_withShortLineAndSilence_shouldExtendToMinimumDuration() {
    let config = Config::default();
    let input = common::timed_text(&[
        ("Hello there.", 1000, 1400),
        ("Another calm sentence follows now.", 3400, 6400),
    ]);

    let track = optimize(&config, &input);

    assert_eq!(track.entries.len(), 2);
    assert_eq!(
        (track.entries[0].start_time_ms, track.entries[0].end_time_ms),
        (1000, 1000 + config.constraints.min_duration_ms)
    );
    assert_eq!(
        (track.entries[1].start_time_ms, track.entries[1].end_time_ms),
        (3400, 6400)
    );
    assert!(track.is_valid());
    assert!(track.diagnostics.is_empty(), "{:?}", track.diagnostics);
}

const DENSE: &str = "Це дуже швидке речення яке треба прочитати вчасно.";

/// A dense line borrows time from a slow previous neighbour
#[test]
fn test_optimize_withDenseLineAfterSlowNeighbour_shouldBorrowTime() {
    let config = config_with(ConstraintConfig {
        max_chars_per_line: 50,
        ..ConstraintConfig::default()
    });
    let input = common::timed_text(&[
        ("Так.", 0, 3000),
        (DENSE, 3080, 5080),
        ("Наступне речення без паузи тут", 5160, 7160),
    ]);

    let track = optimize(&config, &input);

    assert_eq!(track.entries.len(), 3);
    assert_eq!(track.entries[0].end_time_ms, 1666);
    assert_eq!(track.entries[1].start_time_ms, 1746);
    assert!(track.entries[0].duration_ms() >= config.constraints.min_duration_ms);
    assert!(!track.diagnostics.iter().any(|d| d.rule == Rule::ConstraintUnresolvable));
    assert!(track.is_valid());
}

/// Without any spare time the dense line is reported and the track still produced
#[test]
fn test_optimize_withNoSpareTime_shouldReportUnresolvable() {
    let config = config_with(ConstraintConfig {
        max_chars_per_line: 50,
        last_block_pad_ms: 0,
        ..ConstraintConfig::default()
    });
    let input = common::timed_text(&[
        ("Так.", 1800, 3000),
        (DENSE, 3080, 5080),
        ("Наступне речення без паузи тут", 5160, 7160),
    ]);

    let track = optimize(&config, &input);

    assert_eq!(track.entries.len(), 3);
    assert!(unresolvable_at(&track, 2));
    assert!(track.diagnostics.iter().any(|d| d.rule == Rule::CpsAboveHardMax && d.block == Some(2)));
    assert!(!track.is_valid());
    assert!(track.report().starts_with("Result: FAIL"));
}

/// A dense line reaches the free time after the last line through a chain of lines
#[test]
fn test_optimize_withSpareTimeTwoLinesAhead_shouldShiftChain() {
    let config = config_with(ConstraintConfig {
        max_chars_per_line: 50,
        ..ConstraintConfig::default()
    });
    let input = common::timed_text(&[
        (DENSE, 0, 2500),
        ("Так.", 2580, 3780),
        ("Так.", 3860, 5060),
    ]);

    let track = optimize(&config, &input);

    let times: Vec<(u64, u64)> = track.entries.iter().map(|e| (e.start_time_ms, e.end_time_ms)).collect();
    assert_eq!(times, vec![(0, 3334), (3414, 4614), (4694, 5894)]);
    assert!(!track.diagnostics.iter().any(|d| d.rule == Rule::ConstraintUnresolvable));
    assert!(track.is_valid());
}

/// A gap that only a shorter line could open is reported, the next line keeps its start
#[test]
fn test_optimize_withGapNeedingShorterLine_shouldKeepNextStart() {
    let config = Config::default();
    let input = common::timed_text(&[
        ("Hi there.", 1000, 2200),
        ("Another calm line.", 2230, 4230),
    ]);

    let track = optimize(&config, &input);

    assert_eq!(track.entries.len(), 2);
    assert_eq!(track.entries[0].end_time_ms, 2200);
    assert_eq!(track.entries[1].start_time_ms, 2230);
    assert!(unresolvable_at(&track, 1));
    assert!(track.diagnostics.iter().any(|d| d.rule == Rule::GapTooSmall && d.block == Some(2)));
    assert!(!track.is_valid());
}

/// A single word spoken longer than the maximum duration is cut at the maximum
#[test]
fn test_optimize_withOneWordPastMaxDuration_shouldCutAtMaximum() {
    let config = Config::default();
    let input = common::timed_text(&[("Hmmmmmmmmmmmm.", 0, 9000)]);

    let track = optimize(&config, &input);

    assert_eq!(track.entries.len(), 1);
    assert_eq!(
        (track.entries[0].start_time_ms, track.entries[0].end_time_ms),
        (0, config.constraints.max_duration_ms)
    );
    assert!(track.is_valid());
}

/// The last line may outlast the maximum duration only when configured to
#[test]
fn test_optimize_withUnboundedFinalLine_shouldKeepLongEnding() {
    let input = common::timed_text(&[("Slowly, we walked home.", 0, 9000)]);
    let bounded = Config::default();
    let unbounded = config_with(ConstraintConfig {
        final_block_unbounded: true,
        ..ConstraintConfig::default()
    });

    let split = optimize(&bounded, &input);
    let kept = optimize(&unbounded, &input);

    assert_eq!(split.entries.len(), 2);
    assert!(split.entries.iter().all(|e| e.duration_ms() <= bounded.constraints.max_duration_ms));
    assert_eq!(kept.entries.len(), 1);
    assert_eq!((kept.entries[0].start_time_ms, kept.entries[0].end_time_ms), (0, 9000));
    assert!(!kept.diagnostics.iter().any(|d| d.rule == Rule::DurationTooLong));
    assert!(kept.is_valid());
}

/// Running the optimizer twice yields byte-identical tracks
#[test]
fn test_optimize_withSameInputTwice_shouldProduceSameDigest() {
    let config = Config::default();
    let input = common::timed_text(&[
        ("Slowly, we walked home after the long and quiet evening by the river.", 0, 5200),
        ("Nobody said a word.", 5300, 6100),
        ("Then, just before midnight, the first snow started to fall on the roofs.", 9000, 14_000),
    ]);

    let first = optimize(&config, &input);
    let second = optimize(&config, &input);

    assert_eq!(first.digest, second.digest);
    assert_eq!(first.entries, second.entries);
    assert_eq!(first.render_srt(), second.render_srt());
}

const VOCABULARY: [&str; 24] = [
    "we", "walked", "along", "the", "river", "until", "evening", "and", "nobody", "spoke",
    "because", "everything", "had", "already", "been", "said", "річка", "тиха", "вечір",
    "але", "ми", "мовчали", "довго", "разом",
];

fn random_sentence(rng: &mut StdRng) -> String {
    let count = rng.random_range(4..28);
    let mut words: Vec<String> = (0..count)
        .map(|_| VOCABULARY[rng.random_range(0..VOCABULARY.len())].to_string())
        .collect();
    for word in words.iter_mut().take(count - 1) {
        if rng.random_range(0..6) == 0 {
            word.push(',');
        }
    }
    if let Some(last) = words.last_mut() {
        last.push('.');
    }
    words.join(" ")
}

/// Random speech never yields a silent violation of a hard limit
#[test]
fn test_optimize_withRandomSpeech_shouldReportEveryHardViolation() {
    let config = Config::default();
    let c = &config.constraints;
    let mut rng = StdRng::seed_from_u64(0x5EED);

    for round in 0..8 {
        let mut segments = Vec::new();
        let mut clock = rng.random_range(0..2000u64);
        for _ in 0..12 {
            let text = random_sentence(&mut rng);
            let tokens = text.split_whitespace().count() as u64;
            // From slow speech to far faster than anyone can read
            let per_word = rng.random_range(90..450u64);
            let end = clock + tokens * per_word;
            segments.push((text, clock, end));
            clock = end + rng.random_range(0..900u64);
        }
        let timeline: Vec<(&str, u64, u64)> = segments.iter().map(|(t, s, e)| (t.as_str(), *s, *e)).collect();
        let input = common::timed_text(&timeline);

        let track = optimize(&config, &input);

        let source: Vec<String> = segments.iter().flat_map(|(t, _, _)| words_of(t)).collect();
        let produced: Vec<String> = track.entries.iter().flat_map(|e| words_of(&e.text)).collect();
        assert_eq!(produced, source, "round {} changed the text", round);

        for (i, entry) in track.entries.iter().enumerate() {
            let block = i + 1;
            assert_eq!(entry.seq_num, block);
            assert!(entry.end_time_ms > entry.start_time_ms, "round {} block {}", round, block);
            assert!(
                entry.char_count() <= c.max_chars_per_line || unresolvable_at(&track, block),
                "round {} block {} is too long",
                round,
                block
            );
            let cps = entry.char_count() as f64 * 1000.0 / entry.duration_ms() as f64;
            assert!(
                cps <= c.cps_hard_max || unresolvable_at(&track, block),
                "round {} block {} reads at {:.1} CPS without a diagnostic",
                round,
                block,
                cps
            );
            if let Some(next) = track.entries.get(i + 1) {
                assert!(
                    next.start_time_ms >= entry.end_time_ms + c.min_gap_ms || unresolvable_at(&track, block),
                    "round {} gap after block {} is too small",
                    round,
                    block
                );
            }
        }
    }
}
