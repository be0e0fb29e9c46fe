//! Read-side filtering and ordering of the stored feed.

use crate::models::{Category, NewsItem, Platform, Tool};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::str::FromStr;

/// A category filter, including the favorites pseudo-category which selects
/// by membership in the starred-id set instead of by item field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryChoice {
    Favorites,
    Is(Category),
}

impl FromStr for CategoryChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if tag.eq_ignore_ascii_case("favorites") || tag.eq_ignore_ascii_case("favourites") {
            return Ok(Self::Favorites);
        }
        Category::from_str(tag).map(Self::Is)
    }
}

/// How far back a view reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecencyWindow {
    Day,
    Week,
    Month,
    HalfYear,
}

impl RecencyWindow {
    /// Window sizes in days, padded past their nominal length so an item
    /// published "exactly a week ago" survives publisher clock skew.
    pub fn max_age_days(self) -> f64 {
        match self {
            Self::Day => 1.2,
            Self::Week => 7.5,
            Self::Month => 31.5,
            Self::HalfYear => 186.0,
        }
    }
}

impl FromStr for RecencyWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "half-year" | "6m" => Ok(Self::HalfYear),
            other => Err(format!("unknown recency window: {other}")),
        }
    }
}

/// The full set of view filters. All present filters must hold at once.
#[derive(Debug, Clone, Default)]
pub struct FeedFilters {
    pub category: Option<CategoryChoice>,
    pub tool: Option<Tool>,
    pub platform: Option<Platform>,
    pub search: Option<String>,
    pub window: Option<RecencyWindow>,
}

fn age_in_days(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - published_at).num_seconds() as f64 / 86_400.0
}

/// Filter and order the feed for display.
///
/// Unseen items come first, then newest-to-oldest by publication date. The
/// sort is stable, so items that tie keep their stored order.
pub fn present(
    items: &[NewsItem],
    filters: &FeedFilters,
    favorites: &HashSet<String>,
    now: DateTime<Utc>,
) -> Vec<NewsItem> {
    let needle = filters
        .search
        .as_deref()
        .map(str::to_lowercase)
        .filter(|s| !s.is_empty());

    let mut shown: Vec<NewsItem> = items
        .iter()
        .filter(|item| match filters.category {
            None => true,
            Some(CategoryChoice::Favorites) => favorites.contains(&item.id),
            Some(CategoryChoice::Is(category)) => item.category == category,
        })
        .filter(|item| filters.tool.is_none_or(|tool| item.tool == tool))
        .filter(|item| {
            filters
                .platform
                .is_none_or(|platform| item.platform == platform)
        })
        .filter(|item| {
            needle.as_deref().is_none_or(|needle| {
                item.title.to_lowercase().contains(needle)
                    || item.snippet.to_lowercase().contains(needle)
            })
        })
        .filter(|item| {
            filters
                .window
                .is_none_or(|window| age_in_days(item.published_at, now) <= window.max_age_days())
        })
        .cloned()
        .collect();

    shown.sort_by(|a, b| {
        b.is_new
            .cmp(&a.is_new)
            .then_with(|| b.published_at.cmp(&a.published_at))
    });

    shown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::derive_id;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn item(url: &str, title: &str) -> NewsItem {
        NewsItem {
            id: derive_id(url),
            title: title.to_string(),
            snippet: "snippet".to_string(),
            source: "src".to_string(),
            platform: Platform::News,
            url: url.to_string(),
            category: Category::Community,
            tool: Tool::GeneralAi,
            published_at: now() - Duration::days(1),
            is_new: false,
        }
    }

    #[test]
    fn test_no_filters_returns_everything() {
        let items = vec![item("https://a.io/1", "One"), item("https://a.io/2", "Two")];
        assert_eq!(present(&items, &FeedFilters::default(), &HashSet::new(), now()).len(), 2);
    }

    #[test]
    fn test_category_filter() {
        let mut official = item("https://a.io/1", "Official one");
        official.category = Category::Official;
        let items = vec![official, item("https://a.io/2", "Community one")];

        let filters = FeedFilters {
            category: Some(CategoryChoice::Is(Category::Official)),
            ..Default::default()
        };
        let shown = present(&items, &filters, &HashSet::new(), now());
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Official one");
    }

    #[test]
    fn test_favorites_pseudo_category() {
        let starred = item("https://a.io/starred", "Starred");
        let other = item("https://a.io/other", "Other");
        let favorites: HashSet<String> = [starred.id.clone()].into();
        let items = vec![starred, other];

        let filters = FeedFilters {
            category: Some(CategoryChoice::Favorites),
            ..Default::default()
        };
        let shown = present(&items, &filters, &favorites, now());
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Starred");
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let mut both = item("https://a.io/1", "Cursor official");
        both.category = Category::Official;
        both.tool = Tool::Cursor;
        let mut wrong_tool = item("https://a.io/2", "Aider official");
        wrong_tool.category = Category::Official;
        wrong_tool.tool = Tool::Aider;
        let items = vec![both, wrong_tool];

        let filters = FeedFilters {
            category: Some(CategoryChoice::Is(Category::Official)),
            tool: Some(Tool::Cursor),
            ..Default::default()
        };
        let shown = present(&items, &filters, &HashSet::new(), now());
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Cursor official");
    }

    #[test]
    fn test_search_matches_title_or_snippet_case_insensitive() {
        let mut in_snippet = item("https://a.io/1", "Plain headline");
        in_snippet.snippet = "mentions MCP support".to_string();
        let items = vec![in_snippet, item("https://a.io/2", "Other")];

        let filters = FeedFilters {
            search: Some("mcp".to_string()),
            ..Default::default()
        };
        let shown = present(&items, &filters, &HashSet::new(), now());
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Plain headline");
    }

    #[test]
    fn test_week_window_boundary() {
        // 7.4 and 7.6 days, straddling the padded week threshold of 7.5.
        let mut inside = item("https://a.io/in", "Inside");
        inside.published_at = now() - Duration::minutes(10_656);
        let mut outside = item("https://a.io/out", "Outside");
        outside.published_at = now() - Duration::minutes(10_944);

        let filters = FeedFilters {
            window: Some(RecencyWindow::Week),
            ..Default::default()
        };
        let shown = present(&[inside, outside], &filters, &HashSet::new(), now());
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Inside");
    }

    #[test]
    fn test_unseen_items_sort_first_then_newest() {
        let mut old_new = item("https://a.io/1", "Old but unseen");
        old_new.published_at = now() - Duration::days(10);
        old_new.is_new = true;
        let mut fresh_seen = item("https://a.io/2", "Fresh but seen");
        fresh_seen.published_at = now() - Duration::hours(1);
        let mut stale_seen = item("https://a.io/3", "Stale and seen");
        stale_seen.published_at = now() - Duration::days(5);

        let shown = present(
            &[stale_seen, fresh_seen, old_new],
            &FeedFilters::default(),
            &HashSet::new(),
            now(),
        );
        let titles: Vec<&str> = shown.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Old but unseen", "Fresh but seen", "Stale and seen"]
        );
    }

    #[test]
    fn test_window_parsing() {
        assert_eq!("week".parse::<RecencyWindow>().unwrap(), RecencyWindow::Week);
        assert_eq!("6m".parse::<RecencyWindow>().unwrap(), RecencyWindow::HalfYear);
        assert!("fortnight".parse::<RecencyWindow>().is_err());
    }

    #[test]
    fn test_category_choice_parsing() {
        assert_eq!(
            "favorites".parse::<CategoryChoice>().unwrap(),
            CategoryChoice::Favorites
        );
        assert_eq!(
            "release".parse::<CategoryChoice>().unwrap(),
            CategoryChoice::Is(Category::Release)
        );
        assert!("nonsense".parse::<CategoryChoice>().is_err());
    }
}
