use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::check_len;

pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const MAX_PAGE_LIMIT: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub text: String,
    pub owner: String,
    pub create_time: u64,
    pub update_time: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PutPostRequest {
    pub title: String,
    pub text: String,
}

impl PutPostRequest {
    pub fn validate(&self) -> Result<()> {
        check_len("title", &self.title, 3, 40)?;
        check_len("text", &self.text, 5, 700)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchPostRequest {
    pub title: Option<String>,
    pub text: Option<String>,
}

impl PatchPostRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.is_none() && self.text.is_none() {
            bail!("nothing to update");
        }
        if let Some(title) = self.title.as_ref() {
            check_len("title", title, 3, 40)?;
        }
        if let Some(text) = self.text.as_ref() {
            check_len("text", text, 5, 700)?;
        }
        Ok(())
    }
}

/// Pagination for `/v1/posts/paging`. `page` is 1-based.
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    #[serde(default = "PageQuery::default_page")]
    pub page: u64,

    #[serde(default = "PageQuery::default_limit")]
    pub limit: u64,
}

impl PageQuery {
    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            bail!("page starts from 1");
        }
        if self.limit == 0 || self.limit > MAX_PAGE_LIMIT {
            bail!("limit should be in range [1, {MAX_PAGE_LIMIT}]");
        }
        match self.checked_offset() {
            Some(offset) if offset <= i64::MAX as u64 => Ok(()),
            _ => bail!("page is too large"),
        }
    }

    /// Rows to skip. Only meaningful after [`PageQuery::validate`] passed.
    pub fn offset(&self) -> u64 {
        self.checked_offset().unwrap_or(0)
    }

    fn checked_offset(&self) -> Option<u64> {
        self.page.checked_sub(1)?.checked_mul(self.limit)
    }

    fn default_page() -> u64 {
        1
    }

    fn default_limit() -> u64 {
        DEFAULT_PAGE_LIMIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_validate() {
        let req = PutPostRequest {
            title: String::from("Hi"),
            text: String::from("some text"),
        };
        assert!(req.validate().is_err());

        let req = PutPostRequest {
            title: String::from("Hello"),
            text: "x".repeat(701),
        };
        assert!(req.validate().is_err());

        let req = PutPostRequest {
            title: String::from("Hello"),
            text: String::from("first post"),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_page_query() {
        let query = PageQuery { page: 3, limit: 10 };
        assert!(query.validate().is_ok());
        assert_eq!(query.offset(), 20);

        assert!(PageQuery { page: 0, limit: 10 }.validate().is_err());
        assert!(PageQuery { page: 1, limit: 0 }.validate().is_err());
        assert!(PageQuery { page: 1, limit: 101 }.validate().is_err());

        let huge = PageQuery {
            page: u64::MAX,
            limit: MAX_PAGE_LIMIT,
        };
        assert!(huge.validate().is_err());
        let huge = PageQuery {
            page: i64::MAX as u64,
            limit: 2,
        };
        assert!(huge.validate().is_err());
        let last = PageQuery {
            page: i64::MAX as u64 + 1,
            limit: 1,
        };
        assert!(last.validate().is_ok());
        assert_eq!(last.offset(), i64::MAX as u64);
    }
}
