use std::fmt::Write;

use crate::classifier::Buckets;
use crate::playlist::PlaylistDraft;
use crate::spotify::{Artist, RecommendedTrack, TimeRange, Track, UserProfile};

const HOME_LINK: &str = r#"<p><a href="/profile">Home</a></p>"#;

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}

fn track_line(track: &Track) -> String {
    format!(
        "<li>{} by {} -&gt; {}</li>",
        escape(&track.name),
        escape(&track.artist),
        track.popularity
    )
}

fn track_items(tracks: &[Track]) -> String {
    let mut list = String::from("<ul>");
    for track in tracks {
        list.push_str(&track_line(track));
    }
    list.push_str("</ul>");
    list
}

fn range_selector(path: &str, current: TimeRange) -> String {
    let mut links = String::from("<p>");
    for (i, range) in TimeRange::ALL.iter().enumerate() {
        if i > 0 {
            links.push_str(" | ");
        }
        if *range == current {
            let _ = write!(links, "<strong>{}</strong>", range.label());
        } else {
            let _ = write!(
                links,
                r#"<a href="{}?time_range={}">{}</a>"#,
                path,
                range,
                range.label()
            );
        }
    }
    links.push_str("</p>");
    links
}

pub fn login_page() -> String {
    page(
        "Popfilter",
        r#"<h1>Popfilter</h1>
<p>See how mainstream your listening is and build playlists by popularity.</p>
<p><a href="/login">Log in with Spotify</a></p>"#,
    )
}

pub fn profile_page(user: &UserProfile) -> String {
    let mut body = format!("<h1>Welcome, {}</h1>\n", escape(&user.display_name));

    if let Some(url) = &user.image_url {
        let _ = writeln!(
            body,
            r#"<img src="{}" alt="Profile picture" width="160">"#,
            escape(url)
        );
    }
    let _ = writeln!(body, "<p>Spotify id: {}</p>", escape(&user.id));

    body.push_str(
        r#"<ul>
<li><a href="/top-tracks">Top tracks</a></li>
<li><a href="/top-artists">Top artists</a></li>
<li><a href="/recent-tracks">Tracks by popularity</a></li>
<li><a href="/recently-played">Recently played</a></li>
<li><a href="/average_popularity">Average popularity</a></li>
<li><a href="/create_playlist">Create a playlist</a></li>
<li><a href="/recommendation">Recommendations</a></li>
<li><a href="/logout">Log out</a></li>
</ul>"#,
    );

    page("Profile", &body)
}

pub fn top_tracks_page(tracks: &[Track], time_range: TimeRange) -> String {
    let body = format!(
        "<h2>Your Top Tracks</h2>\n{}\n{}\n{}",
        range_selector("/top-tracks", time_range),
        track_items(tracks),
        HOME_LINK
    );
    page("Top Tracks", &body)
}

pub fn recently_played_page(tracks: &[Track]) -> String {
    let body = format!(
        "<h2>Recently Played</h2>\n{}\n{}",
        track_items(tracks),
        HOME_LINK
    );
    page("Recently Played", &body)
}

pub fn top_artists_page(artists: &[Artist], time_range: TimeRange) -> String {
    let mut list = String::from("<ul>");
    for artist in artists {
        let _ = write!(
            list,
            "<li>{} -&gt; {} -&gt; {}</li>",
            escape(&artist.name),
            escape(&artist.genres.join(", ")),
            artist.popularity
        );
    }
    list.push_str("</ul>");

    let body = format!(
        "<h2>Your Top Artists</h2>\n{}\n{}\n{}",
        range_selector("/top-artists", time_range),
        list,
        HOME_LINK
    );
    page("Top Artists", &body)
}

pub fn buckets_page(buckets: &Buckets, time_range: TimeRange) -> String {
    let mut body = range_selector("/recent-tracks", time_range);

    for (bucket, tracks) in buckets.iter() {
        let _ = write!(
            body,
            "\n<h2>{} Tracks</h2>\n{}",
            escape(&bucket.to_string()),
            track_items(tracks)
        );
    }
    body.push('\n');
    body.push_str(HOME_LINK);

    page("Tracks by Popularity", &body)
}

pub fn average_page(average: f64, time_range: TimeRange) -> String {
    let body = format!(
        "<h2>Balanced Average Popularity of Your Top Songs is {:.2}</h2>\n{}\n{}",
        average,
        range_selector("/average_popularity", time_range),
        HOME_LINK
    );
    page("Average Popularity", &body)
}

pub fn playlist_form_page(preview: &[Track]) -> String {
    let mut options = String::new();
    for range in TimeRange::ALL {
        let _ = write!(
            options,
            r#"<option value="{}">{}</option>"#,
            range,
            range.label()
        );
    }

    let body = format!(
        r#"<h2>Create a Playlist</h2>
<form method="post" action="/create_playlist">
<label>Name <input name="playlist_name" value="Playlist" required></label><br>
<label>Popularity above <input name="min_pop" type="number" min="0" max="100" value="0"></label><br>
<label>Popularity below <input name="max_pop" type="number" min="0" max="100" value="100"></label><br>
<label>Time range <select name="time_range">{}</select></label><br>
<label>Number of songs <input name="max_songs" type="number" min="1" value="20"></label><br>
<button type="submit">Create</button>
</form>
<h3>Your current top tracks</h3>
{}
{}"#,
        options,
        track_items(preview),
        HOME_LINK
    );
    page("Create a Playlist", &body)
}

pub fn playlist_created_page(draft: &PlaylistDraft) -> String {
    let body = format!(
        "<h2>Created {}</h2>\n<p>{} tracks added.</p>\n{}\n{}",
        escape(&draft.name),
        draft.accepted_count(),
        track_items(&draft.accepted),
        HOME_LINK
    );
    page("Playlist Created", &body)
}

pub fn recommendation_page(tracks: &[RecommendedTrack], playlist_name: Option<&str>) -> String {
    let lines: Vec<String> = tracks
        .iter()
        .map(|t| format!("{} by {}", escape(&t.name), escape(&t.artists.join(", "))))
        .collect();

    let status = match playlist_name {
        Some(name) => format!("<p>Saved the latest batch to {}.</p>", escape(name)),
        None => "<p>Not enough listening history for recommendations yet.</p>".to_string(),
    };

    let body = format!(
        "<h2>Recommendations</h2>\n{}\n<p>{}</p>\n{}",
        status,
        lines.join("<br>"),
        HOME_LINK
    );
    page("Recommendations", &body)
}

pub fn error_page(title: &str, message: &str) -> String {
    let body = format!(
        "<h2>{}</h2>\n<p>{}</p>\n<p><a href=\"/\">Back</a></p>",
        escape(title),
        escape(message)
    );
    page(title, &body)
}
