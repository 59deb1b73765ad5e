use std::sync::Arc;
use std::time::Duration;

use crate::models::records::CatalogRecord;
use crate::models::task_scope::TaskScope;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum SortOrder {
    /// Keep the order of the catalog file
    #[default]
    Source,
    Name,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FilterQuery {
    pub search: String,
    pub category: Option<String>,
    pub sort: SortOrder,
}

impl FilterQuery {
    #[cfg(test)]
    pub fn search<S: Into<String>>(search: S) -> Self {
        Self {
            search: search.into(),
            ..Self::default()
        }
    }

    fn matches<R: CatalogRecord>(&self, record: &R) -> bool {
        let needle = self.search.trim().to_lowercase();

        let search_hit = needle.is_empty()
            || record
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));

        let category_hit = match &self.category {
            Some(category) => record
                .categories()
                .iter()
                .any(|c| c.eq_ignore_ascii_case(category)),
            None => true,
        };

        search_hit && category_hit
    }
}

pub fn apply_filter<R: CatalogRecord>(records: &[R], query: &FilterQuery) -> Vec<R> {
    let mut filtered = records
        .iter()
        .filter(|r| query.matches(*r))
        .cloned()
        .collect::<Vec<_>>();

    if query.sort == SortOrder::Name {
        filtered.sort_by_key(|r| r.name().to_lowercase());
    }

    filtered
}

/// Recomputes the filtered list once the query or the source list has been
/// quiet for [`SEARCH_DEBOUNCE`]. A newer update cancels the pending one.
pub struct DebouncedFilter<R> {
    scope: TaskScope,
    on_result: Arc<dyn Fn(Vec<R>) + Send + Sync>,
}

impl<R: CatalogRecord> DebouncedFilter<R> {
    pub fn new<F>(on_result: F) -> Self
    where
        F: Fn(Vec<R>) + Send + Sync + 'static,
    {
        Self {
            scope: TaskScope::new(),
            on_result: Arc::new(on_result),
        }
    }

    pub fn update(&mut self, records: Arc<Vec<R>>, query: FilterQuery) {
        self.scope.cancel_all();

        let on_result = self.on_result.clone();

        self.scope.spawn(async move {
            tokio::time::sleep(SEARCH_DEBOUNCE).await;
            on_result(apply_filter(&records, &query));
        });
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::models::records::hero::{Hero, HeroRole};

    fn heroes() -> Vec<Hero> {
        vec![
            Hero::new("1", "Saber", HeroRole::Assassin, "u1"),
            Hero::new("2", "Layla", HeroRole::Marksman, "u2"),
            Hero::new("3", "Tigreal", HeroRole::Tank, "u3"),
            Hero::new("4", "Assassin's Creed", HeroRole::Mage, "u4"),
            Hero::new("5", "Hayabusa", HeroRole::Assassin, "u5"),
            Hero::new("6", "Estes", HeroRole::Support, "u6"),
            Hero::new("7", "Chou", HeroRole::Fighter, "u7"),
        ]
    }

    fn names(heroes: &[Hero]) -> Vec<&str> {
        heroes.iter().map(|h| h.name.as_str()).collect()
    }

    #[test]
    fn search_matches_name_or_role_case_insensitively() {
        let found = apply_filter(&heroes(), &FilterQuery::search("assassin"));

        assert_eq!(names(&found), vec!["Saber", "Assassin's Creed", "Hayabusa"]);
    }

    #[test]
    fn category_filter_is_equality() {
        let query = FilterQuery {
            category: Some("marksman".to_owned()),
            ..FilterQuery::default()
        };

        assert_eq!(names(&apply_filter(&heroes(), &query)), vec!["Layla"]);
    }

    #[test]
    fn empty_query_keeps_everything_and_can_sort() {
        let query = FilterQuery {
            sort: SortOrder::Name,
            ..FilterQuery::default()
        };

        let sorted = apply_filter(&heroes(), &query);

        assert_eq!(sorted.len(), 7);
        assert_eq!(sorted[0].name, "Assassin's Creed");
        assert_eq!(sorted[6].name, "Tigreal");
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_last_update_is_delivered() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debounced = DebouncedFilter::new(move |found: Vec<Hero>| {
            let _ = tx.send(found);
        });
        let records = Arc::new(heroes());

        debounced.update(records.clone(), FilterQuery::search("lay"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        debounced.update(records, FilterQuery::search("tig"));

        let found = rx.recv().await.unwrap();
        assert_eq!(names(&found), vec!["Tigreal"]);

        tokio::time::sleep(SEARCH_DEBOUNCE * 2).await;
        assert!(rx.try_recv().is_err());
    }
}
