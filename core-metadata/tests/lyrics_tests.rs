//! Active-line lookup as the player drives it.

use core_metadata::{active_line_index, lookup_candidate, words, LyricCursor, LyricLine, LyricSheet};

fn song() -> Vec<LyricLine> {
    vec![
        LyricLine::new(0.0, "Guten Morgen, Sonne!").with_translation("Good morning, sun!"),
        LyricLine::new(5.0, "Wie geht es dir?").with_translation("How are you?"),
        LyricLine::new(10.0, "Mir geht es gut.").with_translation("I am fine."),
    ]
}

#[test]
fn test_three_line_song() {
    let lines = song();
    assert_eq!(active_line_index(&lines, 3.0), Some(0));
    assert_eq!(active_line_index(&lines, 5.0), Some(1));
    assert_eq!(active_line_index(&lines, 12.0), Some(2));
    assert_eq!(active_line_index(&lines, -1.0), None);
}

#[test]
fn test_sheet_matches_raw_scan_on_sorted_input() {
    let lines = song();
    let sheet = LyricSheet::new(lines.clone()).unwrap();
    for tenth in -10..150 {
        let t = tenth as f64 / 10.0;
        assert_eq!(sheet.active_index(t), active_line_index(&lines, t), "t = {}", t);
    }
}

#[test]
fn test_playback_sweep_moves_cursor_three_times() {
    let sheet = LyricSheet::new(song()).unwrap();
    let mut cursor = LyricCursor::new();

    let changes = (0..60)
        .map(|quarter| quarter as f64 * 0.25)
        .filter(|t| cursor.update(sheet.lines(), *t))
        .count();

    assert_eq!(changes, 3);
    assert_eq!(cursor.current(), Some(2));
}

#[test]
fn test_tapping_words_of_a_line() {
    let lines = song();
    let candidates: Vec<String> = words(&lines[1]).filter_map(lookup_candidate).collect();
    assert_eq!(candidates, vec!["Wie", "geht", "dir"]);
}
