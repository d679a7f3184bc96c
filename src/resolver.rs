use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::api::ProductMedia;
use crate::gallery::{MediaKind, PreviewItem};

/// Outcome of the backend remote-fetch-and-normalize call for one URL.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPreview {
    pub local_url: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<u64>,
}

/// Splits the freeform "one URL per line" text area: trimmed, blanks dropped.
pub fn split_media_urls(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

pub fn persisted_media_item(media: &ProductMedia) -> PreviewItem {
    let kind = if media.media_type.as_deref() == Some("VIDEO") {
        MediaKind::Video
    } else {
        MediaKind::Image
    };
    PreviewItem {
        url: media.media_url.clone(),
        kind: Some(kind),
        title: media.description.clone(),
        mime_type: None,
        size_bytes: None,
        download_url: None,
        delete_media_id: Some(media.id),
    }
}

pub fn local_file_item(path: &Path) -> PreviewItem {
    PreviewItem::from_url(path.display().to_string())
}

/// Builds the gallery's working list in the fixed group order: persisted
/// media first (so the delete affordance is visible without navigating),
/// then locally selected files, then remote-fetched URLs.
///
/// Each pasted URL is resolved independently on its own scoped worker
/// thread; a failed fetch degrades that one URL to a raw item and never
/// aborts the batch. Outcomes land in index-addressed slots so the final
/// order is unaffected by fetch completion order.
pub fn assemble_preview_items<F>(
    persisted: &[ProductMedia],
    local_files: &[PathBuf],
    url_text: &str,
    fetch: F,
) -> Vec<PreviewItem>
where
    F: Fn(&str) -> Result<FetchedPreview> + Sync,
{
    let mut items = persisted
        .iter()
        .map(persisted_media_item)
        .collect::<Vec<_>>();
    items.extend(local_files.iter().map(|path| local_file_item(path)));

    let urls = split_media_urls(url_text);
    let mut outcomes = (0..urls.len())
        .map(|_| None::<PreviewItem>)
        .collect::<Vec<_>>();

    std::thread::scope(|scope| {
        let fetch = &fetch;
        let mut jobs = Vec::with_capacity(urls.len());
        for (index, url) in urls.iter().enumerate() {
            jobs.push((
                index,
                scope.spawn(move || resolve_url(url, fetch)),
            ));
        }
        for (index, job) in jobs {
            if let Ok(item) = job.join() {
                outcomes[index] = Some(item);
            }
        }
    });

    for (outcome, url) in outcomes.into_iter().zip(urls) {
        // A panicked worker degrades to the raw URL, same as a failed fetch.
        items.push(outcome.unwrap_or_else(|| PreviewItem::from_url(url)));
    }
    items
}

fn resolve_url<F>(url: &str, fetch: &F) -> PreviewItem
where
    F: Fn(&str) -> Result<FetchedPreview>,
{
    match fetch(url) {
        Ok(preview) => PreviewItem {
            url: preview.local_url,
            kind: None,
            title: None,
            mime_type: preview.mime_type,
            size_bytes: preview.size_bytes,
            download_url: None,
            delete_media_id: None,
        },
        Err(err) => {
            log::warn!("Preview fetch failed for {url}: {err:#}");
            PreviewItem::from_url(url)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::bail;

    use super::*;

    fn persisted(id: i64, url: &str, media_type: &str) -> ProductMedia {
        ProductMedia {
            id,
            media_url: url.to_string(),
            media_type: Some(media_type.to_string()),
            description: Some(format!("media {id}")),
        }
    }

    #[test]
    fn split_media_urls_trims_and_drops_blanks() {
        let text = "  https://x.com/a.png  \n\n https://x.com/b.mp4\n   \n";
        assert_eq!(
            split_media_urls(text),
            vec![
                "https://x.com/a.png".to_string(),
                "https://x.com/b.mp4".to_string(),
            ]
        );
        assert!(split_media_urls("").is_empty());
    }

    #[test]
    fn persisted_media_maps_type_title_and_delete_id() {
        let video = persisted_media_item(&persisted(7, "https://x.com/v", "VIDEO"));
        assert_eq!(video.kind, Some(MediaKind::Video));
        assert_eq!(video.title.as_deref(), Some("media 7"));
        assert_eq!(video.delete_media_id, Some(7));

        let image = persisted_media_item(&persisted(8, "https://x.com/i", "IMAGE"));
        assert_eq!(image.kind, Some(MediaKind::Image));
        assert!(image.can_delete());
    }

    #[test]
    fn group_order_is_fixed_regardless_of_fetch_completion_order() {
        let persisted_media = vec![persisted(1, "A", "IMAGE"), persisted(2, "B", "IMAGE")];
        let files = vec![PathBuf::from("C")];

        // D sleeps so E finishes first; order must still be A B C D E.
        let items = assemble_preview_items(&persisted_media, &files, "D\nE\n", |url| {
            if url == "D" {
                std::thread::sleep(Duration::from_millis(40));
            }
            Ok(FetchedPreview {
                local_url: format!("/uploads/previews/{url}"),
                mime_type: None,
                size_bytes: None,
            })
        });

        let urls = items.iter().map(|item| item.url.as_str()).collect::<Vec<_>>();
        assert_eq!(
            urls,
            vec![
                "A",
                "B",
                "C",
                "/uploads/previews/D",
                "/uploads/previews/E",
            ]
        );
    }

    #[test]
    fn failed_fetch_degrades_to_raw_url_without_aborting_batch() {
        let items = assemble_preview_items(&[], &[], "D\nE\n", |url| {
            if url == "D" {
                bail!("upstream returned 502");
            }
            Ok(FetchedPreview {
                local_url: "/uploads/previews/E".to_string(),
                mime_type: Some("image/png".to_string()),
                size_bytes: Some(1234),
            })
        });

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "D");
        assert!(items[0].mime_type.is_none());
        assert_eq!(items[1].url, "/uploads/previews/E");
        assert_eq!(items[1].mime_type.as_deref(), Some("image/png"));
        assert_eq!(items[1].size_bytes, Some(1234));
    }

    #[test]
    fn fetched_items_carry_metadata_but_no_delete_action() {
        let items = assemble_preview_items(&[], &[], "https://remote/x.png", |_| {
            Ok(FetchedPreview {
                local_url: "/uploads/previews/x.png".to_string(),
                mime_type: Some("image/png".to_string()),
                size_bytes: Some(99),
            })
        });
        assert_eq!(items.len(), 1);
        assert!(!items[0].can_delete());
    }

    #[test]
    fn empty_inputs_produce_empty_list() {
        let items = assemble_preview_items(&[], &[], "", |_| bail!("must not be called"));
        assert!(items.is_empty());
    }
}
