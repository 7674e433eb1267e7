// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Splits a conversation into overlapping, size-bounded windows.
//!
//! Sizes are approximated at four characters per budget unit rather than
//! with a real tokenizer. Each message also costs its role length plus a
//! fixed per-line overhead.

use cortex_core::ConversationMessage;

/// Characters counted as one budget unit.
pub const CHARS_PER_UNIT: usize = 4;

/// Per-message framing cost in characters.
const MESSAGE_OVERHEAD: usize = 10;

fn message_size(message: &ConversationMessage) -> usize {
    message.content.chars().count() + message.role.chars().count() + MESSAGE_OVERHEAD
}

/// Splits `messages` into contiguous windows of at most `chunk_size` units.
///
/// When a window is closed, the next one starts with the longest tail of the
/// closed window that fits in `overlap` units and still leaves room for the
/// message that caused the split. A message larger than the whole budget is
/// emitted as its own window. Chunks borrow from the input.
pub fn chunk_messages(
    messages: &[ConversationMessage],
    chunk_size: usize,
    overlap: usize,
) -> Vec<&[ConversationMessage]> {
    let max_chars = chunk_size.saturating_mul(CHARS_PER_UNIT);
    let overlap_chars = overlap.saturating_mul(CHARS_PER_UNIT);

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut size = 0;

    for (i, message) in messages.iter().enumerate() {
        let msg_size = message_size(message);

        if i > start && size + msg_size > max_chars {
            chunks.push(&messages[start..i]);

            let mut new_start = i;
            let mut carried = 0;
            while new_start > start {
                let candidate = message_size(&messages[new_start - 1]);
                if carried + candidate > overlap_chars || carried + candidate + msg_size > max_chars {
                    break;
                }
                carried += candidate;
                new_start -= 1;
            }
            start = new_start;
            size = carried;
        }

        size += msg_size;
    }

    if start < messages.len() {
        chunks.push(&messages[start..]);
    }
    chunks
}
