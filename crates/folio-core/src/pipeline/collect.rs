//! Page outcomes and their reassembly into reading order.

use crate::types::{PageFailure, PageStage};

/// What one worker produced for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    pub page_index: usize,
    pub result: Result<String, PageFailure>,
    /// The engine itself could not run; no later page can succeed either
    pub engine_unavailable: bool,
}

impl PageOutcome {
    pub fn recognized(page_index: usize, text: String) -> Self {
        Self {
            page_index,
            result: Ok(text),
            engine_unavailable: false,
        }
    }

    pub fn failed(page_index: usize, stage: PageStage, message: impl Into<String>) -> Self {
        Self {
            page_index,
            result: Err(PageFailure {
                page_index,
                stage,
                message: message.into(),
            }),
            engine_unavailable: false,
        }
    }

    /// A recognition failure caused by the engine being unable to run at all.
    pub fn engine_unavailable(page_index: usize, message: impl Into<String>) -> Self {
        Self {
            engine_unavailable: true,
            ..Self::failed(page_index, PageStage::Recognize, message)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Order outcomes by page index and fill every slot in `0..page_count`.
///
/// Failed pages, and pages with no outcome at all, get `sentinel` as their
/// text and an entry in the returned failure list (sorted by page index).
/// Outcomes outside the range and duplicates of an already filled page are
/// discarded.
pub fn assemble_pages(
    mut outcomes: Vec<PageOutcome>,
    page_count: usize,
    sentinel: &str,
) -> (Vec<String>, Vec<PageFailure>) {
    outcomes.sort_by_key(|o| o.page_index);

    let mut slots: Vec<Option<String>> = vec![None; page_count];
    let mut failures = Vec::new();

    for outcome in outcomes {
        let index = outcome.page_index;
        let Some(slot) = slots.get_mut(index) else {
            tracing::warn!("Discarding result for page {index}: document has {page_count} pages");
            continue;
        };
        if slot.is_some() {
            tracing::warn!("Discarding duplicate result for page {index}");
            continue;
        }
        match outcome.result {
            Ok(text) => *slot = Some(text),
            Err(failure) => {
                *slot = Some(sentinel.to_string());
                failures.push(failure);
            }
        }
    }

    let pages = slots
        .into_iter()
        .enumerate()
        .map(|(page_index, slot)| {
            slot.unwrap_or_else(|| {
                failures.push(PageFailure {
                    page_index,
                    stage: PageStage::Worker,
                    message: "no result collected".to_string(),
                });
                sentinel.to_string()
            })
        })
        .collect();

    failures.sort_by_key(|f| f.page_index);
    (pages, failures)
}
