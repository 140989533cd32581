//! Keeps the number of live (unsuspended) tabs within the configured budget.
//!
//! Each call corrects by at most one tab: the least recently used background
//! tab that is still live. Repeated adds/activations converge on the budget.

use lectern_core::TabId;

use crate::tab::DocumentTab;

pub fn unsuspended_count(tabs: &[DocumentTab]) -> usize {
    tabs.iter().filter(|tab| !tab.is_suspended).count()
}

/// Index of the tab that should be suspended next, if the budget is exceeded.
pub fn pick_suspension_candidate(tabs: &[DocumentTab], max_active_tabs: usize) -> Option<usize> {
    if tabs.len() <= max_active_tabs {
        return None;
    }
    if unsuspended_count(tabs) <= max_active_tabs {
        return None;
    }

    // min_by_key keeps the first of equal keys, so ties go to tab-bar order.
    tabs.iter()
        .enumerate()
        .filter(|(_, tab)| !tab.is_active && !tab.is_suspended)
        .min_by_key(|(_, tab)| tab.last_accessed)
        .map(|(index, _)| index)
}

/// Suspends at most one tab and returns its id.
pub fn enforce(tabs: &mut [DocumentTab], max_active_tabs: usize) -> Option<TabId> {
    let index = pick_suspension_candidate(tabs, max_active_tabs)?;
    let tab = &mut tabs[index];
    tab.is_suspended = true;
    tracing::debug!(
        tab = %tab.id,
        last_accessed = tab.last_accessed,
        max_active_tabs,
        "suspended least recently used tab"
    );
    Some(tab.id.clone())
}
