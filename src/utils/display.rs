//! Short labels for URLs, used in notifications and log lines.

use url::Url;

const MAX_LABEL_CHARS: usize = 30;

/// A compact label for `url`.
///
/// YouTube links become `[VIDEO_ID]`, playlists `[list PLAYLIST_ID]`, other
/// links their last path segment. Anything longer than 30 characters is cut
/// with an ellipsis.
pub fn short_url_label(url: &str) -> String {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return ellipsize(url.trim());
    };

    if let Some(id) = youtube_video_id(&parsed) {
        return format!("[{}]", id);
    }

    if let Some(list) = query_value(&parsed, "list") {
        return ellipsize(&format!("[list {}]", list));
    }

    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string);

    match segment {
        Some(segment) => ellipsize(&segment),
        None => ellipsize(parsed.host_str().unwrap_or(url)),
    }
}

fn youtube_video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
    let id = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" => match url.path() {
            "/watch" => query_value(url, "v"),
            path => path
                .strip_prefix("/shorts/")
                .or_else(|| path.strip_prefix("/live/"))
                .map(|rest| rest.trim_end_matches('/').to_string()),
        },
        _ => None,
    }?;
    (!id.is_empty()).then_some(id)
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

fn ellipsize(text: &str) -> String {
    if text.chars().count() <= MAX_LABEL_CHARS {
        return text.to_string();
    }
    let kept: String = text.chars().take(MAX_LABEL_CHARS - 3).collect();
    format!("{}...", kept)
}
