use url::Url;

use mm_client::media_download_url;
use mm_types::{MediaContent, MessageContent};

/// Text written into a message artifact, without the trailing newline.
/// `None` for content that is not materialized.
pub fn render(content: &MessageContent, homeserver: &Url) -> Option<String> {
    match content {
        MessageContent::Text { body }
        | MessageContent::Notice { body }
        | MessageContent::Emote { body } => Some(body.clone()),
        MessageContent::Image(media) | MessageContent::Video(media) => {
            Some(render_media(media, homeserver, true))
        }
        MessageContent::Audio(media) | MessageContent::File(media) => {
            Some(render_media(media, homeserver, false))
        }
        MessageContent::Location { body, geo_uri } => Some(format!("{} {}", body, geo_uri)),
        MessageContent::Unknown => None,
    }
}

/// `<download url> (<mime>[ <h>x<w>] <KiB>KiB)`
fn render_media(media: &MediaContent, homeserver: &Url, dimensions: bool) -> String {
    let info = media.info.clone().unwrap_or_default();
    let mut s = format!(
        "{} ({}",
        media_download_url(homeserver, &media.url),
        info.mimetype.as_deref().unwrap_or("")
    );
    if dimensions {
        s.push_str(&format!(
            " {}x{}",
            info.height.unwrap_or(0),
            info.width.unwrap_or(0)
        ));
    }
    s.push_str(&format!(" {}KiB)", info.size.unwrap_or(0) >> 10));
    s
}
