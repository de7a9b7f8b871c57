//! Result reconciliation
//!
//! A payload only reaches the view when it still describes the current
//! query. Main results must match the full signature; previews ignore
//! filters and only need the same term.

use crate::controller::channel::Channel;
use crate::controller::gateway::ChannelPayload;
use crate::controller::view::SearchView;
use crate::query::QuerySignature;

/// Whether a payload fetched for `origin` is still relevant to `current`
pub fn is_current(channel: Channel, origin: &QuerySignature, current: &QuerySignature) -> bool {
    match channel {
        Channel::Main => origin == current,
        Channel::Suggest | Channel::Instant => origin.term == current.term,
    }
}

/// Merge `payload` into `view` if it is still relevant. Returns false and
/// counts a discard otherwise.
pub fn reconcile(
    view: &mut SearchView,
    current: &QuerySignature,
    channel: Channel,
    origin: QuerySignature,
    payload: ChannelPayload,
) -> bool {
    if !is_current(channel, &origin, current) {
        log::debug!("Discarding stale {} response for {}", channel, origin);
        view.status_mut(channel).discarded += 1;
        return false;
    }

    match payload {
        ChannelPayload::Results(response) => {
            view.show_results(origin, response.products, response.pagination);
        }
        ChannelPayload::Suggestions(suggestions) => {
            view.suggestions = suggestions;
            view.suggest.error = None;
        }
        ChannelPayload::Preview(products) => {
            view.previews = products;
            view.instant.error = None;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PageInfo, SearchResponse, Suggestion};

    fn results(total: u64) -> ChannelPayload {
        ChannelPayload::Results(SearchResponse {
            success: true,
            products: Vec::new(),
            pagination: PageInfo {
                current_page: 1,
                total_pages: 1,
                total_products: total,
                has_next: false,
                has_prev: false,
            },
            query: None,
            filters: None,
            message: None,
        })
    }

    #[test]
    fn test_stale_main_response_is_discarded() {
        let mut view = SearchView::default();
        let current = QuerySignature::for_term("chair");

        assert!(!reconcile(
            &mut view,
            &current,
            Channel::Main,
            QuerySignature::for_term("cha"),
            results(3)
        ));
        assert!(view.results_for.is_none());
        assert_eq!(view.main.discarded, 1);

        assert!(reconcile(&mut view, &current, Channel::Main, current.clone(), results(7)));
        assert_eq!(view.summary().as_deref(), Some("Found 7 products"));
    }

    #[test]
    fn test_filter_change_makes_main_response_stale() {
        let origin = QuerySignature::for_term("lamp");
        let mut current = origin.clone();
        current.in_stock = true;

        assert!(!is_current(Channel::Main, &origin, &current));
        // Previews ignore filters
        assert!(is_current(Channel::Instant, &origin, &current));
        assert!(is_current(Channel::Suggest, &origin, &current));
    }

    #[test]
    fn test_suggestions_replace_previous_list() {
        let mut view = SearchView::default();
        let current = QuerySignature::for_term("ch");
        view.suggestions = vec![Suggestion {
            id: "old".into(),
            name: "old".into(),
        }];

        let payload = ChannelPayload::Suggestions(vec![Suggestion {
            id: "s1".into(),
            name: "chair".into(),
        }]);
        assert!(reconcile(&mut view, &current, Channel::Suggest, current.clone(), payload));
        assert_eq!(view.suggestions.len(), 1);
        assert_eq!(view.suggestions[0].name, "chair");
    }
}
