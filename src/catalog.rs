//! Channel catalog: the parsed channel list, search term and selection
//!
//! Pure in-memory state. Fetching and playback are driven by the caller from
//! the transitions made here.

use crate::models::{Channel, LoadState};

#[derive(Debug, Default)]
pub struct ChannelCatalog {
    channels: Vec<Channel>,
    search_term: String,
    selected_url: Option<String>,
    load_state: LoadState,
}

impl ChannelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the channel list wholesale and mark the catalog ready
    pub fn set_channels(&mut self, channels: Vec<Channel>) {
        self.channels = channels;
        self.load_state = LoadState::Ready;
    }

    /// Record a failed load, keeping the last known channels
    pub fn set_load_failed(&mut self, reason: impl Into<String>) {
        self.load_state = LoadState::Failed(reason.into());
    }

    /// Mark a re-fetch in progress, keeping the last known channels
    pub fn set_loading(&mut self) {
        self.load_state = LoadState::Loading;
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    /// Select a stream by URL. The URL does not have to belong to the list.
    pub fn select(&mut self, url: impl Into<String>) {
        self.selected_url = Some(url.into());
    }

    pub fn clear_selection(&mut self) {
        self.selected_url = None;
    }

    /// Channels whose name contains the search term, case-insensitively, in
    /// their original order
    pub fn filtered_channels(&self) -> Vec<&Channel> {
        if self.search_term.is_empty() {
            return self.channels.iter().collect();
        }

        let needle = self.search_term.to_lowercase();
        self.channels
            .iter()
            .filter(|channel| channel.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn selected_url(&self) -> Option<&str> {
        self.selected_url.as_deref()
    }

    pub fn is_selected(&self, url: &str) -> bool {
        self.selected_url.as_deref() == Some(url)
    }

    /// First channel carrying the selected URL, if it is still in the list
    pub fn selected_channel(&self) -> Option<&Channel> {
        let url = self.selected_url.as_deref()?;
        self.channels.iter().find(|channel| channel.url == url)
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Channel> {
        vec![
            Channel::new("BBC One", "http://example.com/bbc1"),
            Channel::new("CNN International", "http://example.com/cnn"),
            Channel::new("bbc news", "http://example.com/bbcnews"),
            Channel::new("Euronews", "http://example.com/euronews"),
        ]
    }

    fn names<'a>(channels: &[&'a Channel]) -> Vec<&'a str> {
        channels.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_new_catalog_is_loading_and_empty() {
        let catalog = ChannelCatalog::new();
        assert_eq!(catalog.load_state(), &LoadState::Loading);
        assert!(catalog.channels().is_empty());
        assert!(catalog.filtered_channels().is_empty());
        assert_eq!(catalog.selected_url(), None);
        assert_eq!(catalog.search_term(), "");
    }

    #[test]
    fn test_empty_search_returns_everything_in_order() {
        let mut catalog = ChannelCatalog::new();
        catalog.set_channels(sample());
        let filtered: Vec<Channel> = catalog.filtered_channels().into_iter().cloned().collect();
        assert_eq!(filtered, sample());
    }

    #[test]
    fn test_search_is_case_insensitive_and_ordered() {
        let mut catalog = ChannelCatalog::new();
        catalog.set_channels(sample());
        catalog.set_search_term("BBC");
        assert_eq!(names(&catalog.filtered_channels()), vec!["BBC One", "bbc news"]);

        catalog.set_search_term("news");
        assert_eq!(names(&catalog.filtered_channels()), vec!["bbc news", "Euronews"]);
    }

    #[test]
    fn test_search_matches_anywhere_and_unicode() {
        let mut catalog = ChannelCatalog::new();
        catalog.set_channels(vec![
            Channel::new("Первый канал", "http://example.com/1"),
            Channel::new("Arte", "http://example.com/2"),
        ]);
        catalog.set_search_term("ПЕРВЫЙ");
        assert_eq!(names(&catalog.filtered_channels()), vec!["Первый канал"]);

        catalog.set_search_term("rt");
        assert_eq!(names(&catalog.filtered_channels()), vec!["Arte"]);
    }

    #[test]
    fn test_search_term_is_not_trimmed() {
        let mut catalog = ChannelCatalog::new();
        catalog.set_channels(sample());
        catalog.set_search_term(" one");
        assert_eq!(catalog.search_term(), " one");
        assert_eq!(names(&catalog.filtered_channels()), vec!["BBC One"]);

        catalog.set_search_term("one ");
        assert!(catalog.filtered_channels().is_empty());
    }

    #[test]
    fn test_filtering_keeps_selection() {
        let mut catalog = ChannelCatalog::new();
        catalog.set_channels(sample());
        catalog.select("http://example.com/cnn");
        catalog.set_search_term("bbc");

        assert!(catalog.filtered_channels().iter().all(|c| c.url != "http://example.com/cnn"));
        assert_eq!(catalog.selected_url(), Some("http://example.com/cnn"));
        assert_eq!(catalog.selected_channel().map(|c| c.name.as_str()), Some("CNN International"));
    }

    #[test]
    fn test_select_does_not_validate() {
        let mut catalog = ChannelCatalog::new();
        catalog.select("http://elsewhere.example/stream");
        assert!(catalog.is_selected("http://elsewhere.example/stream"));
        assert!(catalog.selected_channel().is_none());

        catalog.clear_selection();
        assert_eq!(catalog.selected_url(), None);
    }

    #[test]
    fn test_set_channels_keeps_search_and_selection() {
        let mut catalog = ChannelCatalog::new();
        catalog.set_search_term("bbc");
        catalog.select("http://example.com/bbc1");
        catalog.set_channels(sample());

        assert_eq!(catalog.load_state(), &LoadState::Ready);
        assert_eq!(catalog.search_term(), "bbc");
        assert_eq!(catalog.selected_url(), Some("http://example.com/bbc1"));
    }

    #[test]
    fn test_failure_keeps_last_known_channels() {
        let mut catalog = ChannelCatalog::new();
        catalog.set_channels(sample());
        catalog.set_loading();
        assert!(catalog.load_state().is_loading());
        assert_eq!(catalog.channels().len(), 4);

        catalog.set_load_failed("HTTP error! status: 503");
        assert_eq!(catalog.load_state().failure(), Some("HTTP error! status: 503"));
        assert_eq!(catalog.channels().len(), 4);

        // Retry succeeds
        catalog.set_channels(vec![Channel::new("Only", "http://example.com/only")]);
        assert_eq!(catalog.load_state(), &LoadState::Ready);
        assert_eq!(catalog.channels().len(), 1);
    }

    #[test]
    fn test_duplicate_urls_share_selection() {
        let mut catalog = ChannelCatalog::new();
        catalog.set_channels(vec![
            Channel::new("Feed A", "http://example.com/same"),
            Channel::new("Feed B", "http://example.com/same"),
        ]);
        catalog.select("http://example.com/same");
        let selected: Vec<bool> = catalog
            .filtered_channels()
            .iter()
            .map(|c| catalog.is_selected(&c.url))
            .collect();
        assert_eq!(selected, vec![true, true]);
    }
}
