use std::time::{SystemTime, UNIX_EPOCH};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "mov", "mkv", "m3u8"];
const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// A display-ready media reference. `url` is fixed at construction; an item
/// is replaced, never edited, when its location changes.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewItem {
    pub url: String,
    pub kind: Option<MediaKind>,
    pub title: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<u64>,
    pub download_url: Option<String>,
    /// Backing persisted-media record, when there is one. Its presence is
    /// what enables the delete affordance; the actual delete call lives in
    /// the app layer so this type stays free of I/O.
    pub delete_media_id: Option<i64>,
}

impl PreviewItem {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: None,
            title: None,
            mime_type: None,
            size_bytes: None,
            download_url: None,
            delete_media_id: None,
        }
    }

    pub fn display_kind(&self) -> MediaKind {
        self.kind.unwrap_or_else(|| guess_kind(&self.url))
    }

    /// Preferred target for "copy link" and "open original".
    pub fn link_target(&self) -> &str {
        self.download_url.as_deref().unwrap_or(&self.url)
    }

    pub fn can_delete(&self) -> bool {
        self.delete_media_id.is_some()
    }
}

/// Navigable, mutable view over a resolved item list. Holds no textures and
/// performs no I/O, so index math is testable on its own. The app keeps it
/// in an `Option`; `None` means the gallery is closed and the previous
/// working list is gone.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryState {
    items: Vec<PreviewItem>,
    index: usize,
}

impl GalleryState {
    pub fn open(items: Vec<PreviewItem>, start_index: usize) -> Self {
        let index = if items.is_empty() {
            0
        } else {
            start_index.min(items.len() - 1)
        };
        Self { items, index }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&PreviewItem> {
        self.items.get(self.index)
    }

    /// Cyclic forward step; no-op for lists of length <= 1.
    pub fn next(&mut self) {
        let len = self.items.len();
        if len > 1 {
            self.index = (self.index + 1) % len;
        }
    }

    /// Cyclic backward step; no-op for lists of length <= 1.
    pub fn previous(&mut self) {
        let len = self.items.len();
        if len > 1 {
            self.index = (self.index + len - 1) % len;
        }
    }

    /// Removes the item backed by the given persisted media id, wherever it
    /// now sits, and repairs the index. Deletes complete asynchronously, so
    /// the cursor may have moved since the delete was invoked: removing
    /// behind the cursor shifts it so the displayed item is unchanged,
    /// removing the current last item moves the cursor to the new last item,
    /// and removing a middle item keeps the cursor on whatever slid into
    /// its position.
    pub fn remove_by_media_id(&mut self, media_id: i64) -> Option<PreviewItem> {
        let position = self
            .items
            .iter()
            .position(|item| item.delete_media_id == Some(media_id))?;
        let removed = self.items.remove(position);
        if self.items.is_empty() {
            self.index = 0;
        } else if position < self.index {
            self.index -= 1;
        } else {
            self.index = self.index.min(self.items.len() - 1);
        }
        Some(removed)
    }
}

/// Classifies a URL as image or video from its path suffix alone, ignoring
/// query and fragment. Unknown extensions default to image.
pub fn guess_kind(url: &str) -> MediaKind {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let lowered = path.to_ascii_lowercase();
    let is_video = VIDEO_EXTENSIONS
        .iter()
        .any(|extension| lowered.ends_with(&format!(".{extension}")));
    if is_video {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

/// Appends a request-time freshness token so recently replaced media is not
/// served from stale caches.
pub fn cache_busted(url: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    with_freshness_token(url, millis)
}

pub fn with_freshness_token(url: &str, millis: u128) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}t={millis}")
}

pub fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = match path.rfind('/') {
        Some(slash_index) => &path[slash_index + 1..],
        None => path,
    };
    percent_decode_lossy(name)
}

pub fn human_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit_index = 0usize;
    while value >= 1024.0 && unit_index < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }
    format!("{value:.1} {}", SIZE_UNITS[unit_index])
}

// Decodes on raw bytes; slicing the str here would panic on multibyte
// characters following a malformed escape.
fn percent_decode_lossy(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                decoded.push(high * 16 + low);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|digit| digit as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str) -> PreviewItem {
        PreviewItem::from_url(url)
    }

    #[test]
    fn next_wraps_from_last_to_first() {
        let mut gallery = GalleryState::open(vec![item("a"), item("b"), item("c")], 2);
        gallery.next();
        assert_eq!(gallery.current_index(), 0);
    }

    #[test]
    fn previous_wraps_from_first_to_last() {
        let mut gallery = GalleryState::open(vec![item("a"), item("b"), item("c")], 0);
        gallery.previous();
        assert_eq!(gallery.current_index(), 2);
    }

    #[test]
    fn navigation_is_noop_for_short_lists() {
        let mut single = GalleryState::open(vec![item("only")], 0);
        single.next();
        single.previous();
        assert_eq!(single.current_index(), 0);

        let mut empty = GalleryState::open(Vec::new(), 0);
        empty.next();
        empty.previous();
        assert_eq!(empty.current_index(), 0);
        assert!(empty.current().is_none());
    }

    #[test]
    fn remove_last_item_moves_cursor_to_new_last() {
        let mut gallery = GalleryState::open(
            vec![deletable("a", 1), deletable("b", 2), deletable("c", 3)],
            2,
        );
        let removed = gallery
            .remove_by_media_id(3)
            .expect("item should be removed");
        assert_eq!(removed.url, "c");
        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery.current_index(), 1);
        assert_eq!(gallery.current().map(|i| i.url.as_str()), Some("b"));
    }

    #[test]
    fn remove_first_item_keeps_cursor_on_slid_in_item() {
        let mut gallery = GalleryState::open(
            vec![deletable("a", 1), deletable("b", 2), deletable("c", 3)],
            0,
        );
        gallery.remove_by_media_id(1);
        assert_eq!(gallery.current_index(), 0);
        assert_eq!(gallery.current().map(|i| i.url.as_str()), Some("b"));
    }

    fn deletable(url: &str, media_id: i64) -> PreviewItem {
        let mut item = PreviewItem::from_url(url);
        item.delete_media_id = Some(media_id);
        item
    }

    #[test]
    fn remove_by_media_id_targets_invoked_item_after_navigation() {
        // Delete invoked on "a", cursor moved to "c" before it completed.
        let mut gallery = GalleryState::open(
            vec![deletable("a", 1), deletable("b", 2), deletable("c", 3)],
            0,
        );
        gallery.next();
        gallery.next();
        let removed = gallery
            .remove_by_media_id(1)
            .expect("item should be removed");
        assert_eq!(removed.url, "a");
        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery.current_index(), 1);
        assert_eq!(gallery.current().map(|i| i.url.as_str()), Some("c"));
    }

    #[test]
    fn remove_by_media_id_clamps_when_current_is_removed_last() {
        let mut gallery = GalleryState::open(vec![deletable("a", 1), deletable("b", 2)], 1);
        gallery.remove_by_media_id(2);
        assert_eq!(gallery.current_index(), 0);
        assert_eq!(gallery.current().map(|i| i.url.as_str()), Some("a"));
    }

    #[test]
    fn remove_by_media_id_is_noop_for_unknown_id() {
        let mut gallery = GalleryState::open(vec![deletable("a", 1)], 0);
        assert!(gallery.remove_by_media_id(99).is_none());
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.current_index(), 0);
    }

    #[test]
    fn remove_only_item_leaves_empty_gallery() {
        let mut gallery = GalleryState::open(vec![deletable("a", 1)], 0);
        gallery.remove_by_media_id(1);
        assert!(gallery.is_empty());
        assert!(gallery.current().is_none());
        assert!(gallery.remove_by_media_id(1).is_none());
    }

    #[test]
    fn reopen_replaces_working_list_without_residue() {
        let first = GalleryState::open(vec![item("x"), item("y")], 1);
        assert_eq!(first.current().map(|i| i.url.as_str()), Some("y"));

        let second = GalleryState::open(vec![item("z")], 0);
        assert_eq!(second.len(), 1);
        assert_eq!(second.current_index(), 0);
        assert_eq!(second.current().map(|i| i.url.as_str()), Some("z"));
    }

    #[test]
    fn open_clamps_out_of_range_start_index() {
        let gallery = GalleryState::open(vec![item("a"), item("b")], 9);
        assert_eq!(gallery.current_index(), 1);
    }

    #[test]
    fn guess_kind_matches_video_extensions_ignoring_query() {
        assert_eq!(guess_kind("https://x.com/v.mp4?x=1"), MediaKind::Video);
        assert_eq!(guess_kind("https://x.com/v.MOV#frag"), MediaKind::Video);
        assert_eq!(guess_kind("https://x.com/stream.m3u8"), MediaKind::Video);
        assert_eq!(guess_kind("https://x.com/p.png"), MediaKind::Image);
        assert_eq!(guess_kind("https://x.com/p"), MediaKind::Image);
        assert_eq!(guess_kind("https://x.com/clip.mp4.png"), MediaKind::Image);
    }

    #[test]
    fn explicit_kind_wins_over_inference() {
        let mut video = item("https://x.com/p.png");
        video.kind = Some(MediaKind::Video);
        assert_eq!(video.display_kind(), MediaKind::Video);
    }

    #[test]
    fn link_target_prefers_download_url() {
        let mut preview = item("https://x.com/local-copy.png");
        assert_eq!(preview.link_target(), "https://x.com/local-copy.png");
        preview.download_url = Some("https://cdn.x.com/original.png".to_string());
        assert_eq!(preview.link_target(), "https://cdn.x.com/original.png");
    }

    #[test]
    fn freshness_token_uses_correct_separator() {
        assert_eq!(
            with_freshness_token("https://x.com/a.png", 17),
            "https://x.com/a.png?t=17"
        );
        assert_eq!(
            with_freshness_token("https://x.com/a.png?w=2", 17),
            "https://x.com/a.png?w=2&t=17"
        );
    }

    #[test]
    fn file_name_from_url_strips_query_and_decodes() {
        assert_eq!(
            file_name_from_url("https://x.com/uploads/photo%20one.png?t=5"),
            "photo one.png"
        );
        assert_eq!(file_name_from_url("/uploads/previews/abc.jpg"), "abc.jpg");
        assert_eq!(file_name_from_url("plain.png"), "plain.png");
    }

    #[test]
    fn file_name_from_url_keeps_malformed_percent_sequences() {
        assert_eq!(file_name_from_url("https://x.com/a%zé.png"), "a%zé.png");
        assert_eq!(file_name_from_url("https://x.com/é%41%.png"), "éA%.png");
        assert_eq!(file_name_from_url("https://x.com/trailing%2"), "trailing%2");
    }

    #[test]
    fn human_size_picks_sensible_units() {
        assert_eq!(human_size(512), "512.0 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
