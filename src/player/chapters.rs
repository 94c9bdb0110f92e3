// Active chapter lookup over ordered, non-overlapping half-open ranges

use crate::domain::models::Chapter;

/// First chapter whose `[start, end)` contains `time`.
pub fn chapter_at(chapters: &[Chapter], time: f64) -> Option<usize> {
    chapters.iter().position(|c| c.contains(time))
}

/// Tracks the selected chapter across time updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterCursor {
    current: Option<usize>,
}

impl ChapterCursor {
    pub fn index(&self) -> Option<usize> {
        self.current
    }

    pub fn current<'a>(&self, chapters: &'a [Chapter]) -> Option<&'a Chapter> {
        self.current.and_then(|i| chapters.get(i))
    }

    /// Re-resolve for `time`. Returns true only when the selection changed; a
    /// time outside every chapter keeps the previous selection.
    pub fn update(&mut self, chapters: &[Chapter], time: f64) -> bool {
        match chapter_at(chapters, time) {
            Some(found) if self.current != Some(found) => {
                self.current = Some(found);
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cover(bounds: &[f64]) -> Vec<Chapter> {
        bounds
            .windows(2)
            .enumerate()
            .map(|(i, w)| Chapter {
                id: format!("c{i}"),
                title: format!("Chapter {}", i + 1),
                start: w[0],
                end: w[1],
            })
            .collect()
    }

    #[test]
    fn every_time_in_range_selects_exactly_the_containing_chapter() {
        let chapters = cover(&[0.0, 12.5, 300.0, 301.0, 4000.0]);
        let mut t = 0.0;
        while t < 4000.0 {
            let matching: Vec<usize> = chapters
                .iter()
                .enumerate()
                .filter(|(_, c)| c.contains(t))
                .map(|(i, _)| i)
                .collect();
            assert_eq!(matching.len(), 1, "t={t}");
            assert_eq!(chapter_at(&chapters, t), Some(matching[0]));
            t += 0.25;
        }
    }

    #[test]
    fn boundaries_belong_to_the_later_chapter() {
        let chapters = cover(&[0.0, 100.0, 200.0]);
        assert_eq!(chapter_at(&chapters, 99.999), Some(0));
        assert_eq!(chapter_at(&chapters, 100.0), Some(1));
        assert_eq!(chapter_at(&chapters, 200.0), None);
    }

    #[test]
    fn cursor_reports_changes_only() {
        let chapters = cover(&[0.0, 100.0, 200.0]);
        let mut cursor = ChapterCursor::default();
        assert!(cursor.update(&chapters, 5.0));
        assert!(!cursor.update(&chapters, 50.0));
        assert!(cursor.update(&chapters, 150.0));
        assert_eq!(cursor.current(&chapters).unwrap().id, "c1");

        // past the end keeps the last selection
        assert!(!cursor.update(&chapters, 250.0));
        assert_eq!(cursor.index(), Some(1));
    }

    #[test]
    fn empty_chapter_list_selects_nothing() {
        let mut cursor = ChapterCursor::default();
        assert!(!cursor.update(&[], 10.0));
        assert_eq!(cursor.index(), None);
    }
}
