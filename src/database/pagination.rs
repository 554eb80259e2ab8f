use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageContext<T> {
    #[serde(rename = "count")]
    pub total_rows: i64,
    pub page_size: i64,
    pub offset: i64,
    #[serde(rename = "next")]
    pub next_offset: Option<i64>,
    #[serde(rename = "previous")]
    pub prev_offset: Option<i64>,
    #[serde(rename = "results")]
    pub rows: Vec<T>,
}

impl<T> PageContext<T> {
    /// Envelope for one page. An offset past the end keeps the real total
    /// and links back to the last page that has rows.
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        let last_offset = if total_rows > 0 {
            (total_rows - 1) / page_size * page_size
        } else {
            0
        };

        let next_offset = Some(current_offset + page_size).filter(|next| *next < total_rows);
        let prev_offset = if current_offset > 0 {
            Some((current_offset - page_size).min(last_offset).max(0))
        } else {
            None
        };

        Self {
            total_rows,
            page_size,
            offset: current_offset,
            next_offset,
            prev_offset,
            rows,
        }
    }

    pub fn map<U, F>(self, f: F) -> PageContext<U>
    where
        F: FnMut(T) -> U,
    {
        PageContext {
            total_rows: self.total_rows,
            page_size: self.page_size,
            offset: self.offset,
            next_offset: self.next_offset,
            prev_offset: self.prev_offset,
            rows: self.rows.into_iter().map(f).collect(),
        }
    }
}
