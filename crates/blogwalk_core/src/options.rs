use crate::model::Cursor;

/// Caller options for one walk over a blog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOptions {
    pub start_page: u32,
    pub start_offset: u64,
    pub auto_advance: bool,
    /// Highest page number that may be fetched.
    pub max_pages: Option<u32>,
    /// Maximum number of pages fetched by this walk.
    pub max_index: Option<u32>,
    /// Post identifiers at which the walk stops without emitting them.
    pub until_post_ids: Vec<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            start_page: 1,
            start_offset: 0,
            auto_advance: true,
            max_pages: None,
            max_index: None,
            until_post_ids: Vec::new(),
        }
    }
}

impl WalkOptions {
    pub fn start_cursor(&self) -> Cursor {
        Cursor::start(self.start_page.max(1), self.start_offset)
    }
}
