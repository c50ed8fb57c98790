//! Playlist URL parsing.

use anyhow::Result;
use regex::Regex;

/// Extract the playlist id from a watch/playlist URL.
///
/// Accepts anything carrying a `list=` query parameter, e.g.
/// `https://music.youtube.com/playlist?list=PLxyz` or a watch URL with a
/// `list=` parameter attached.
pub fn parse_playlist_url(url: &str) -> Result<String> {
    let re = Regex::new(r"list=([A-Za-z0-9_-]+)")?;

    if let Some(caps) = re.captures(url) {
        return Ok(caps.get(1).unwrap().as_str().to_string());
    }

    anyhow::bail!("no playlist id found in URL: {}", url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_list_parameter() {
        let id = parse_playlist_url(
            "https://music.youtube.com/playlist?list=PLUdUiRdpouHqNxa2792wQUZnhafK6xPqE",
        )
        .unwrap();
        assert_eq!(id, "PLUdUiRdpouHqNxa2792wQUZnhafK6xPqE");
    }

    #[test]
    fn extracts_from_watch_url() {
        let id =
            parse_playlist_url("https://www.youtube.com/watch?v=abc123&list=PLfoo_bar-1&index=2")
                .unwrap();
        assert_eq!(id, "PLfoo_bar-1");
    }

    #[test]
    fn rejects_url_without_playlist() {
        assert!(parse_playlist_url("https://www.youtube.com/watch?v=abc123").is_err());
    }
}
