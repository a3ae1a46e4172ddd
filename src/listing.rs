//! Paginated listing loops over the shared drive.
//!
//! Two variants share the continuation-token walk: [`timed_listing`] times
//! each cycle and reports totals, [`print_listing`] prints every file record.

use std::time::Instant;

use crate::client::DriveClient;
use crate::error::Result;
use crate::models::FileListPage;

/// A source of listing pages addressed by continuation token.
#[allow(async_fn_in_trait)]
pub trait FetchPage {
    /// Fetch the page identified by `page_token`, or the first page for
    /// `None`.
    async fn fetch_page(&self, page_token: Option<&str>) -> Result<FileListPage>;
}

impl FetchPage for DriveClient {
    async fn fetch_page(&self, page_token: Option<&str>) -> Result<FileListPage> {
        self.list_page(page_token).await
    }
}

/// Totals from a completed listing loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingReport {
    /// Number of pages requested.
    pub cycles: u32,
    /// Number of file records seen across all pages.
    pub total_files: usize,
    /// Sum of the per-cycle durations, rounded to 2 decimal places.
    /// `None` for the print variant, which does not time its cycles.
    pub runtime_secs: Option<f64>,
}

/// Round `value` to `digits` decimal places.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Sum already-rounded per-cycle durations and round the total to 2 decimal
/// places. This is the accumulated call time, not end-to-end wall time.
pub fn total_runtime(cycle_times: &[f64]) -> f64 {
    round_to(cycle_times.iter().sum(), 2)
}

/// Walk every page of the listing, timing each cycle.
///
/// Prints a per-cycle summary line and final totals, and returns them.
pub async fn timed_listing<C: FetchPage>(source: &C) -> Result<ListingReport> {
    let mut page_token: Option<String> = None;
    let mut cycle: u32 = 1;
    let mut total_files: usize = 0;
    let mut cycle_times: Vec<f64> = Vec::new();

    loop {
        let started = Instant::now();
        let page = source.fetch_page(page_token.as_deref()).await?;
        total_files += page.files.len();
        let elapsed = round_to(started.elapsed().as_secs_f64(), 4);
        cycle_times.push(elapsed);

        println!(
            "Loop #{:02} ({:.4} sec) ... got {} files...",
            cycle,
            elapsed,
            page.files.len()
        );

        match page.next_page_token {
            Some(token) => {
                page_token = Some(token);
                cycle += 1;
            }
            None => {
                println!("All pages downloaded, exiting the loop now ...");
                break;
            }
        }
    }

    let runtime = total_runtime(&cycle_times);
    println!("\nTotal files retrieved: {}", total_files);
    println!("Total app runtime: {}", runtime);

    Ok(ListingReport {
        cycles: cycle,
        total_files,
        runtime_secs: Some(runtime),
    })
}

/// Walk the pages of the listing, printing every file record.
///
/// A page with zero records stops the walk with a warning, even when a
/// continuation token is present.
pub async fn print_listing<C: FetchPage>(source: &C) -> Result<ListingReport> {
    let mut page_token: Option<String> = None;
    let mut cycle: u32 = 1;
    let mut total_files: usize = 0;

    loop {
        let page = source.fetch_page(page_token.as_deref()).await?;
        println!("Loop #{:02} got {} files...", cycle, page.files.len());

        if page.files.is_empty() {
            println!(
                "WARNING: Found no files in results we retrieved. Exiting loop now for safety!"
            );
            break;
        }

        total_files += page.files.len();
        for file in &page.files {
            println!("{}", file);
        }

        match page.next_page_token {
            Some(token) => {
                page_token = Some(token);
                cycle += 1;
            }
            None => {
                println!("All pages downloaded, exiting the loop now ...");
                break;
            }
        }
    }

    Ok(ListingReport {
        cycles: cycle,
        total_files,
        runtime_secs: None,
    })
}
