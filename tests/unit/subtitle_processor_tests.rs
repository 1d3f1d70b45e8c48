/*!
 * Tests for SRT and mapping file parsing
 */

use anyhow::Result;
use subfit::errors::InputParseError;
use subfit::subtitle_processor::{SubtitleCollection, SubtitleEntry};
use crate::common;

const UNORDERED_SRT: &str = "\u{feff}2
00:00:05,000 --> 00:00:07,000
Second line

1
00:00:01,000 --> 00:00:03,000
First line

7
00:00:09,000 --> 00:00:08,000
Backwards entry

3
00:00:10.500 --> 00:00:12.000
Dot separated
";

/// Test that normalized parsing sorts, renumbers and skips invalid entries
#[test]
fn test_parse_srt_string_withUnorderedEntries_shouldSortAndRenumber() -> Result<()> {
    let entries = SubtitleCollection::parse_srt_string(UNORDERED_SRT)?;

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].text, "First line");
    assert_eq!(entries[2].start_time_ms, 10_500);
    assert_eq!(
        entries.iter().map(|e| e.seq_num).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    Ok(())
}

/// Test that raw parsing keeps file order and original numbers
#[test]
fn test_parse_srt_raw_withUnorderedEntries_shouldKeepFileOrder() -> Result<()> {
    let entries = SubtitleCollection::parse_srt_raw(UNORDERED_SRT)?;

    assert_eq!(
        entries.iter().map(|e| e.seq_num).collect::<Vec<_>>(),
        vec![2, 1, 3]
    );
    assert_eq!(entries[0].text, "Second line");
    Ok(())
}

/// Test that content without any entry is an empty-input error
#[test]
fn test_parse_srt_string_withNoEntries_shouldFailAsEmpty() {
    let error = SubtitleCollection::parse_srt_string("just some text\n").unwrap_err();

    assert!(matches!(
        error.downcast_ref::<InputParseError>(),
        Some(InputParseError::Empty)
    ));
}

/// Test that rendering and parsing agree on every field
#[test]
fn test_write_to_srt_withMultilineEntry_shouldReadBackIdentically() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out.srt");
    let entries = vec![
        SubtitleEntry::new(1, 61_001, 62_500, "Two\nlines".to_string()),
        SubtitleEntry::new(2, 3_600_000, 3_601_200, "After an hour".to_string()),
    ];

    SubtitleCollection::new(path.clone(), entries.clone()).write_to_srt(&path)?;
    let loaded = SubtitleCollection::from_srt_file(&path)?;

    assert_eq!(loaded.entries, entries);
    assert!(loaded.to_srt_string().contains("01:00:00,000 --> 01:00:01,200"));
    Ok(())
}

/// Test that a mapping row without text fails the whole file
#[test]
fn test_parse_mapping_string_withEmptyText_shouldFail() {
    let result = SubtitleCollection::parse_mapping_string("1 | 00:00:01,000 | 00:00:02,000 |\n");

    assert!(matches!(result, Err(InputParseError::MappingRow { line: 1, .. })));
}

/// Test that mapping rows are sorted by start time
#[test]
fn test_from_mapping_file_withUnorderedRows_shouldSort() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "talk.txt",
        "# index | start | end | text\n2 | 00:00:04,000 | 00:00:06,000 | later\n\n1 | 00:00:01,000 | 00:00:03,000 | a | b\n",
    )?;

    let collection = SubtitleCollection::from_mapping_file(&path)?;

    assert_eq!(collection.entries.len(), 2);
    assert_eq!(collection.entries[0].text, "a | b");
    assert_eq!(collection.entries[1].text, "later");
    Ok(())
}
