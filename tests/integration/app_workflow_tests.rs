/*!
 * Integration tests for controller workflows on real files
 */

use std::fs;
use anyhow::Result;

use subfit::app_config::Config;
use subfit::app_controller::{Controller, OptimizeJob};
use subfit::file_utils::{FileManager, InputKind};
use subfit::subtitle_processor::SubtitleCollection;
use subfit::validation::Rule;
use crate::common;

const TALK_SRT: &str = "1
00:00:01,000 --> 00:00:04,000
Good evening, and welcome to the last lecture of this long winter term.

2
00:00:04,500 --> 00:00:06,000
Let us begin.

3
00:00:09,000 --> 00:00:12,500
Tonight we talk about attention.
";

const WHISPER_JSON: &str = r#"{
  "segments": [
    {
      "start": 1.0, "end": 2.4, "text": " Good evening everyone.",
      "words": [
        {"word": " Good", "start": 1.0, "end": 1.3},
        {"word": " evening", "start": 1.3, "end": 1.8},
        {"word": " everyone.", "start": 1.8, "end": 2.4}
      ]
    },
    {
      "start": 4.0, "end": 6.0, "text": " Tonight we talk about attention.",
      "words": []
    }
  ]
}"#;

/// Test that one job writes a track and a report with its digest
#[test]
fn test_run_job_withSrtInput_shouldPublishTrackAndReport() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "talk.srt", TALK_SRT)?;
    let job = OptimizeJob::for_batch(input.clone(), &temp_dir.path().join("out"));
    let controller = Controller::new_for_test()?;

    let outcome = controller.run_job(&job)?;

    let track = SubtitleCollection::from_srt_file(&outcome.output)?;
    assert!(track.entries.len() >= 4, "long first record should be split");
    assert!(track.entries.iter().all(|e| e.char_count() <= 42));
    let report = fs::read_to_string(job.report.as_ref().unwrap())?;
    assert!(report.contains(&outcome.digest));
    assert!(report.contains("subfit report:"));
    assert_eq!(outcome.valid, outcome.errors == 0);
    Ok(())
}

/// Test that a Whisper-style document is read with its own word timings
#[test]
fn test_load_input_withWhisperJson_shouldUseWordsAndSegments() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "talk.json", WHISPER_JSON)?;

    let timed = Controller::load_input(&input, None)?;

    assert_eq!(timed.segments.len(), 2);
    assert_eq!(timed.segments[0].text, "Good evening everyone.");
    assert_eq!(timed.time_source.words()[0].start_ms, 1000);
    // Five uniform words fill the second segment
    assert_eq!(timed.time_source.len(), 8);
    assert_eq!(timed.time_source.reference_track().len(), 2);
    Ok(())
}

/// Test that a forced format overrides detection
#[test]
fn test_load_input_withForcedMapping_shouldParseRows() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(
        temp_dir.path(),
        "talk.srt",
        "1 | 00:00:01,000 | 00:00:03,000 | Hello there, friend.\n",
    )?;

    assert!(Controller::load_input(&input, None).is_err());
    let timed = Controller::load_input(&input, Some(InputKind::Mapping))?;

    assert_eq!(timed.segments.len(), 1);
    assert_eq!(timed.time_source.len(), 3);
    Ok(())
}

/// Test that a batch processes every input and isolates the broken one
#[tokio::test]
async fn test_run_batch_withBrokenInput_shouldFinishOthers() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_file(dir, "a_talk.srt", TALK_SRT)?;
    common::create_test_subtitle(dir, "b_sample.srt")?;
    common::create_test_file(dir, "c_broken.srt", "this is not a subtitle file\n")?;
    common::create_test_file(dir, "d_whisper.json", WHISPER_JSON)?;
    let out_dir = dir.join("out");

    let mut config = Config::default();
    config.batch.concurrent_jobs = 2;
    let controller = Controller::with_config(config)?;

    let summary = controller.run_batch(dir, Some(&out_dir)).await?;

    assert_eq!(summary.results.len(), 4);
    let names: Vec<String> = summary
        .results
        .iter()
        .map(|(p, _)| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a_talk.srt", "b_sample.srt", "c_broken.srt", "d_whisper.json"]);
    assert_eq!(summary.failed(), 1);
    assert!(summary.results[2].1.is_err());
    assert!(!summary.is_success());
    assert!(FileManager::file_exists(out_dir.join("a_talk.optimized.srt")));
    assert!(FileManager::file_exists(out_dir.join("b_sample.report.txt")));
    assert!(FileManager::file_exists(out_dir.join("d_whisper.optimized.srt")));
    assert!(!FileManager::file_exists(out_dir.join("c_broken.optimized.srt")));
    Ok(())
}

/// Test that a second batch run over the same inputs reproduces every digest
#[tokio::test]
async fn test_run_batch_withRepeatedRun_shouldReproduceDigests() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_file(dir, "talk.srt", TALK_SRT)?;
    common::create_test_subtitle(dir, "sample.srt")?;
    let controller = Controller::new_for_test()?;

    let first = controller.run_batch(dir, Some(&dir.join("one"))).await?;
    let second = controller.run_batch(dir, Some(&dir.join("two"))).await?;

    let digests = |summary: &subfit::app_controller::BatchSummary| -> Vec<String> {
        summary
            .results
            .iter()
            .map(|(_, r)| r.as_ref().map(|o| o.digest.clone()).unwrap_or_default())
            .collect()
    };
    assert_eq!(digests(&first), digests(&second));
    assert_eq!(
        fs::read(dir.join("one").join("talk.optimized.srt"))?,
        fs::read(dir.join("two").join("talk.optimized.srt"))?
    );
    Ok(())
}

/// Test that a missing batch directory is an error
#[test]
fn test_run_batch_withMissingDirectory_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::new_for_test()?;

    // Rejected before any worker is spawned, so no runtime is needed
    let result = tokio_test::block_on(controller.run_batch(&temp_dir.path().join("nowhere"), None));

    assert!(result.is_err());
    Ok(())
}

/// Test that validating a hand-made file reports its numbering and overlap
#[test]
fn test_validate_file_withBrokenTrack_shouldReportAndWriteReport() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let srt = common::create_test_file(
        temp_dir.path(),
        "broken.srt",
        "1\n00:00:01,000 --> 00:00:04,000\nFirst line\n\n3\n00:00:03,500 --> 00:00:06,000\nSecond line\n",
    )?;
    let transcript = common::create_test_file(temp_dir.path(), "talk.txt", "First line Second line")?;
    let report_path = temp_dir.path().join("validation.txt");
    let controller = Controller::new_for_test()?;

    let report = controller.validate_file(&srt, Some(&transcript), None, Some(&report_path))?;

    assert!(!report.is_valid());
    assert!(report.diagnostics.iter().any(|d| d.rule == Rule::Numbering));
    assert!(report.diagnostics.iter().any(|d| d.rule == Rule::Overlap));
    assert!(!report.diagnostics.iter().any(|d| d.rule == Rule::TextMismatch));
    assert!(fs::read_to_string(&report_path)?.contains("overlap"));
    Ok(())
}

/// Test that a file whose last entry runs backwards fails validation
#[test]
fn test_validate_file_withBackwardsLastEntry_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let srt = common::create_test_file(
        temp_dir.path(),
        "backwards.srt",
        "1\n00:00:01,000 --> 00:00:03,000\nA calm first line.\n\n2\n00:00:09,000 --> 00:00:05,000\nA broken last line.\n",
    )?;
    let report_path = temp_dir.path().join("validation.txt");
    let controller = Controller::new_for_test()?;

    let report = controller.validate_file(&srt, None, None, Some(&report_path))?;

    assert!(!report.is_valid());
    assert_eq!(report.stats.block_count, 2);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.rule == Rule::InvalidTimeRange && d.block == Some(2)));
    assert!(fs::read_to_string(&report_path)?.contains("invalid-time-range"));
    Ok(())
}

/// Test that an offset applied to a file is detected back from the files
#[test]
fn test_offset_withAppliedShift_shouldBeDetectedFromFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let original = common::create_test_file(temp_dir.path(), "talk.srt", TALK_SRT)?;
    let shifted = temp_dir.path().join("shifted.srt");
    let controller = Controller::new_for_test()?;

    let written = controller.apply_offset(&original, 12_345, &shifted)?;

    assert_eq!(written, 3);
    assert_eq!(controller.detect_offset(&original, &shifted)?, 12_345);
    assert_eq!(controller.detect_offset(&shifted, &original)?, -12_345);
    assert!(controller.apply_offset(&original, -2_000, &temp_dir.path().join("bad.srt")).is_err());
    Ok(())
}

/// Test that text export splits paragraphs on long pauses
#[test]
fn test_export_text_withPauses_shouldWriteParagraphs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let srt = common::create_test_file(temp_dir.path(), "talk.srt", TALK_SRT)?;
    let output = temp_dir.path().join("talk.txt");
    let controller = Controller::new_for_test()?;

    controller.export_text(&srt, &output, 2000, true)?;

    let text = fs::read_to_string(&output)?;
    assert_eq!(
        text,
        "Good evening, and welcome to the last lecture of this long winter term. Let us begin.\n\nTonight we talk about attention.\n"
    );
    Ok(())
}
