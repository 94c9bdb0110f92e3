// Mapping from ABS DTOs to domain models

use super::models::{AudioTrack, Author, Book, Chapter, Library, Series};
use crate::abs_client::{
    AbsClient, AudioTrackEntry, ChapterEntry, LibraryEntry, LibraryItem, SeriesEntry,
};

pub fn map_library(l: &LibraryEntry) -> Library {
    Library {
        id: l.id.clone(),
        name: l.name.clone(),
        cover: l.cover.clone().filter(|c| !c.is_empty()),
        item_count: l.media_count.unwrap_or(0),
    }
}

fn map_series(s: &SeriesEntry) -> Series {
    Series {
        id: s.id.clone().unwrap_or_default(),
        name: s.name.clone(),
        sequence: s.sequence,
    }
}

pub fn map_item_to_book(server_url: &str, item: &LibraryItem) -> Book {
    let media = &item.media;
    let metadata = &media.metadata;
    let title = metadata.title.clone().unwrap_or_else(|| "Untitled".into());
    let authors = metadata
        .authors
        .as_ref()
        .map(|arr| {
            arr.iter()
                .map(|a| Author {
                    id: a.id.clone().unwrap_or_default(),
                    name: a.name.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    let series = metadata
        .series
        .as_ref()
        .and_then(|s| s.first())
        .map(map_series);

    let cover = media
        .cover_path
        .as_ref()
        .filter(|p| !p.is_empty())
        .map(|_| AbsClient::item_cover_path(server_url, &item.id));

    Book {
        id: item.id.clone(),
        title,
        authors,
        series,
        cover,
        description: metadata.description.clone(),
        duration: media.duration.unwrap_or(0.0),
        progress: item
            .progress
            .as_ref()
            .and_then(|p| p.progress)
            .unwrap_or(0.0),
        narrators: metadata.narrators.clone(),
        published_year: metadata.published_year,
        genres: metadata.genres.clone(),
        path: media.path.clone(),
    }
}

pub fn map_chapters(entries: &[ChapterEntry]) -> Vec<Chapter> {
    entries
        .iter()
        .enumerate()
        .map(|(index, c)| Chapter {
            id: c.id.clone().unwrap_or_else(|| format!("chapter-{}", index)),
            title: c
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| format!("Chapter {}", index + 1)),
            start: c.start,
            end: c.end,
        })
        .collect()
}

/// Track paths are addressed by position, not by the server-reported index.
pub fn map_tracks(server_url: &str, item_id: &str, entries: &[AudioTrackEntry]) -> Vec<AudioTrack> {
    entries
        .iter()
        .enumerate()
        .map(|(i, t)| AudioTrack {
            id: t.id.clone().unwrap_or_else(|| format!("track-{}", i)),
            index: t.index.filter(|idx| *idx != 0).unwrap_or(i as u32),
            path: AbsClient::audio_track_path(server_url, item_id, i),
            duration: t.duration.unwrap_or(0.0),
            start_offset: t.start_offset.unwrap_or(0.0),
        })
        .collect()
}
