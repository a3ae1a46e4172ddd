//! Loop behavior tests for the paginated listing variants.

use std::cell::RefCell;

use drive_shell::error::{DriveError, Result};
use drive_shell::listing::{print_listing, timed_listing, FetchPage};
use drive_shell::models::{FileListPage, FileRecord};

/// Serves a scripted sequence of pages and records each continuation token
/// it was asked for.
struct ScriptedPages {
    pages: RefCell<Vec<FileListPage>>,
    requested_tokens: RefCell<Vec<Option<String>>>,
}

impl ScriptedPages {
    fn new(pages: Vec<FileListPage>) -> Self {
        Self {
            pages: RefCell::new(pages),
            requested_tokens: RefCell::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<Option<String>> {
        self.requested_tokens.borrow().clone()
    }
}

impl FetchPage for ScriptedPages {
    async fn fetch_page(&self, page_token: Option<&str>) -> Result<FileListPage> {
        self.requested_tokens
            .borrow_mut()
            .push(page_token.map(str::to_string));
        let mut pages = self.pages.borrow_mut();
        if pages.is_empty() {
            return Err(DriveError::ApiError {
                status: 500,
                message: "no more scripted pages".to_string(),
            });
        }
        Ok(pages.remove(0))
    }
}

fn page(count: usize, next: Option<&str>) -> FileListPage {
    FileListPage {
        files: (0..count)
            .map(|i| FileRecord {
                id: format!("id{}", i),
                name: format!("file{}.txt", i),
                mime_type: None,
                size: None,
                parents: vec!["parent".to_string()],
            })
            .collect(),
        next_page_token: next.map(str::to_string),
    }
}

#[tokio::test]
async fn test_timed_listing_visits_each_token_once() {
    let source = ScriptedPages::new(vec![
        page(100, Some("t0")),
        page(100, Some("t1")),
        page(47, None),
    ]);

    let report = timed_listing(&source).await.unwrap();

    assert_eq!(report.cycles, 3);
    assert_eq!(report.total_files, 247);
    assert!(report.runtime_secs.is_some());
    assert_eq!(
        source.requested(),
        vec![None, Some("t0".to_string()), Some("t1".to_string())]
    );
}

#[tokio::test]
async fn test_timed_listing_single_page() {
    let source = ScriptedPages::new(vec![page(3, None)]);

    let report = timed_listing(&source).await.unwrap();

    assert_eq!(report.cycles, 1);
    assert_eq!(report.total_files, 3);
    assert_eq!(source.requested(), vec![None]);
}

#[tokio::test]
async fn test_timed_listing_continues_through_empty_pages() {
    // The timing variant only stops when a page has no continuation token.
    let source = ScriptedPages::new(vec![
        page(3, Some("t0")),
        page(0, Some("t1")),
        page(2, None),
    ]);

    let report = timed_listing(&source).await.unwrap();

    assert_eq!(report.cycles, 3);
    assert_eq!(report.total_files, 5);
}

#[tokio::test]
async fn test_print_listing_stops_on_empty_page() {
    // The second page is empty but still carries a token; the listing must
    // warn and stop without requesting it.
    let source = ScriptedPages::new(vec![page(3, Some("A")), page(0, Some("B"))]);

    let report = print_listing(&source).await.unwrap();

    assert_eq!(report.total_files, 3);
    assert_eq!(
        source.requested(),
        vec![None, Some("A".to_string())]
    );
}

#[tokio::test]
async fn test_print_listing_normal_termination() {
    let source = ScriptedPages::new(vec![page(2, Some("A")), page(1, None)]);

    let report = print_listing(&source).await.unwrap();

    assert_eq!(report.cycles, 2);
    assert_eq!(report.total_files, 3);
    assert!(report.runtime_secs.is_none());
    assert_eq!(
        source.requested(),
        vec![None, Some("A".to_string())]
    );
}

#[tokio::test]
async fn test_timed_listing_propagates_fetch_errors() {
    // The script runs dry after page 1, so the second fetch fails.
    let source = ScriptedPages::new(vec![page(2, Some("A"))]);

    assert!(timed_listing(&source).await.is_err());
}

#[tokio::test]
async fn test_print_listing_propagates_fetch_errors() {
    let source = ScriptedPages::new(vec![page(2, Some("A"))]);

    assert!(print_listing(&source).await.is_err());
}
