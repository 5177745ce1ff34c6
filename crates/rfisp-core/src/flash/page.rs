//! Flash page boundary tracking
//!
//! The ATmega328P programs flash 64 words at a time. Words are loaded into
//! a page buffer and the whole buffer is written with a single command, so
//! the programmer must notice when the incoming word stream leaves the page
//! it has been filling.

/// Words per flash page
pub const PAGE_WORDS: u32 = 64;
/// Mask selecting the word offset inside a page
pub const PAGE_WORD_MASK: u32 = PAGE_WORDS - 1;
/// Bytes per flash page
pub const PAGE_BYTES: usize = PAGE_WORDS as usize * 2;

/// Page (as a word address) containing `word_addr`
pub const fn page_of(word_addr: u32) -> u32 {
    word_addr & !PAGE_WORD_MASK
}

/// Tracks the page currently open in the target's page buffer
///
/// The tracker starts at page 0. Crossing detection only ever commits the
/// page being left, never the one being entered, so the final page of an
/// image has to be flushed explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageTracker {
    cursor: u32,
}

impl PageTracker {
    /// Create a tracker positioned at page 0
    pub const fn new() -> Self {
        Self { cursor: 0 }
    }

    /// Page the cursor sits on, i.e. the page that will be committed next
    pub fn last_committed_page(&self) -> u32 {
        self.cursor
    }

    /// Move to the page of `word_addr`
    ///
    /// Returns the page that must be committed before `word_addr` is loaded,
    /// if the word lies outside the current page.
    pub fn advance(&mut self, word_addr: u32) -> Option<u32> {
        let page = page_of(word_addr);
        if page == self.cursor {
            return None;
        }
        let previous = self.cursor;
        self.cursor = page;
        Some(previous)
    }

    /// The page to commit when the stream ends
    pub fn flush(&self) -> u32 {
        self.cursor
    }
}
