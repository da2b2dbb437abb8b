// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript windowing.
//!
//! Windows start at positions `0, S, 2S, …` while the start position is
//! strictly less than the transcript length, so the union of windows covers
//! every turn whenever `stride <= window_size`. The last window may be
//! shorter than `window_size`.

use strata_core::{ConversationTurn, ConversationWindow};

/// Deterministic window id derived from the session file and turn indexes.
pub fn window_id(session_file: &str, start_index: usize, end_index: usize) -> String {
    format!("{session_file}#{start_index}-{end_index}")
}

/// Slice a transcript into (possibly overlapping) windows.
///
/// Overlap between consecutive windows is exactly `window_size - stride`
/// turns. An empty transcript yields zero windows. Entropy and the
/// processing decision are left unset; the filter fills them in.
pub fn create_windows(
    turns: &[ConversationTurn],
    window_size: usize,
    stride: usize,
    session_file: &str,
) -> Vec<ConversationWindow> {
    if turns.is_empty() || window_size == 0 || stride == 0 {
        return Vec::new();
    }

    let mut windows = Vec::new();
    let mut start = 0;
    while start < turns.len() {
        let end = (start + window_size).min(turns.len()) - 1;
        windows.push(ConversationWindow {
            id: window_id(session_file, start, end),
            turns: turns[start..=end].to_vec(),
            start_index: start,
            end_index: end,
            entropy: None,
            should_process: false,
            processed_at: None,
            source_session_file: Some(session_file.to_string()),
        });
        start += stride;
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns(n: usize) -> Vec<ConversationTurn> {
        (0..n)
            .map(|i| ConversationTurn {
                speaker: if i % 2 == 0 { "user" } else { "assistant" }.to_string(),
                content: format!("turn {i}"),
                timestamp: None,
            })
            .collect()
    }

    #[test]
    fn empty_input_yields_zero_windows() {
        assert!(create_windows(&[], 10, 5, "s").is_empty());
    }

    #[test]
    fn non_overlapping_windows_partition_the_transcript() {
        let windows = create_windows(&turns(4), 2, 2, "s");
        assert_eq!(windows.len(), 2);
        assert_eq!((windows[0].start_index, windows[0].end_index), (0, 1));
        assert_eq!((windows[1].start_index, windows[1].end_index), (2, 3));
        assert_eq!(windows[0].turns[0].content, "turn 0");
        assert_eq!(windows[1].turns[0].content, "turn 2");
    }

    #[test]
    fn overlapping_windows_share_window_minus_stride_turns() {
        let windows = create_windows(&turns(5), 3, 2, "s");
        assert_eq!((windows[0].start_index, windows[0].end_index), (0, 2));
        assert_eq!((windows[1].start_index, windows[1].end_index), (2, 4));
        // Overlap is exactly window_size - stride = 1 turn.
        assert_eq!(windows[0].turns.last().unwrap().content, windows[1].turns[0].content);
    }

    #[test]
    fn last_window_may_be_shorter() {
        let windows = create_windows(&turns(5), 2, 2, "s");
        assert_eq!(windows.len(), 3);
        assert_eq!((windows[2].start_index, windows[2].end_index), (4, 4));
        assert_eq!(windows[2].turns.len(), 1);
    }

    #[test]
    fn windows_cover_every_turn_when_stride_at_most_window() {
        for (n, w, s) in [(1, 10, 5), (7, 3, 2), (10, 10, 5), (23, 4, 4), (9, 5, 1)] {
            let windows = create_windows(&turns(n), w, s, "s");
            let mut covered = vec![false; n];
            for window in &windows {
                for flag in covered[window.start_index..=window.end_index].iter_mut() {
                    *flag = true;
                }
            }
            assert!(covered.iter().all(|&c| c), "gap with n={n} w={w} s={s}");
        }
    }

    #[test]
    fn ids_are_deterministic_per_session() {
        let a = create_windows(&turns(5), 3, 2, "sess.jsonl");
        let b = create_windows(&turns(5), 3, 2, "sess.jsonl");
        assert_eq!(
            a.iter().map(|w| w.id.clone()).collect::<Vec<_>>(),
            b.iter().map(|w| w.id.clone()).collect::<Vec<_>>()
        );
        assert_eq!(a[0].id, "sess.jsonl#0-2");
    }
}
