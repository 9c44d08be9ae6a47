use crate::model::{CandidateFile, Playlist, PlaylistId, Track, TrackId};

const UNTITLED: &str = "Untitled";

/// Owns every playlist and which one is selected.
///
/// The store never becomes empty. Anything it removes is handed back to the
/// caller, so a dropped track releases its source handle immediately.
#[derive(Debug)]
pub struct PlaylistStore {
    playlists: Vec<Playlist>,
    selected: PlaylistId,
}

impl PlaylistStore {
    pub fn new(default_name: &str) -> Self {
        let first = Playlist {
            id: PlaylistId::new(),
            name: playlist_name(default_name),
            tracks: Vec::new(),
        };
        Self {
            selected: first.id,
            playlists: vec![first],
        }
    }

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn len(&self) -> usize {
        self.playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }

    pub fn get(&self, id: PlaylistId) -> Option<&Playlist> {
        self.playlists.iter().find(|playlist| playlist.id == id)
    }

    pub fn position_of(&self, id: PlaylistId) -> Option<usize> {
        self.playlists.iter().position(|playlist| playlist.id == id)
    }

    pub fn selected_id(&self) -> PlaylistId {
        self.selected
    }

    pub fn selected(&self) -> Option<&Playlist> {
        self.get(self.selected)
    }

    pub fn create_playlist(&mut self, name: &str, select: bool) -> PlaylistId {
        let id = PlaylistId::new();
        self.playlists.push(Playlist {
            id,
            name: playlist_name(name),
            tracks: Vec::new(),
        });
        if select {
            self.selected = id;
        }
        id
    }

    /// Returns false if `id` is unknown or already selected.
    pub fn select_playlist(&mut self, id: PlaylistId) -> bool {
        if self.selected == id || self.get(id).is_none() {
            return false;
        }
        self.selected = id;
        true
    }

    /// Removes a playlist unless it is the last one left.
    ///
    /// Deleting the selected playlist moves the selection to the first
    /// remaining playlist.
    pub fn delete_playlist(&mut self, id: PlaylistId) -> Option<Playlist> {
        if self.playlists.len() <= 1 {
            return None;
        }
        let position = self.position_of(id)?;
        let removed = self.playlists.remove(position);
        if self.selected == id {
            self.selected = self.playlists[0].id;
        }
        Some(removed)
    }

    /// Appends every supported candidate in order; returns how many were kept.
    pub fn add_tracks(
        &mut self,
        id: PlaylistId,
        candidates: impl IntoIterator<Item = CandidateFile>,
    ) -> usize {
        let Some(playlist) = self.playlist_mut(id) else {
            return 0;
        };
        let before = playlist.tracks.len();
        playlist.tracks.extend(
            candidates
                .into_iter()
                .filter(CandidateFile::is_supported)
                .map(|candidate| Track {
                    id: TrackId::new(),
                    name: candidate.name,
                    source: candidate.source,
                }),
        );
        playlist.tracks.len() - before
    }

    pub fn remove_track(&mut self, id: PlaylistId, index: usize) -> Option<Track> {
        let playlist = self.playlist_mut(id)?;
        (index < playlist.tracks.len()).then(|| playlist.tracks.remove(index))
    }

    /// Moves a track with remove-then-insert semantics.
    pub fn reorder_track(&mut self, id: PlaylistId, from: usize, to: usize) -> bool {
        let Some(playlist) = self.playlist_mut(id) else {
            return false;
        };
        let len = playlist.tracks.len();
        if from == to || from >= len || to >= len {
            return false;
        }
        let moved = playlist.tracks.remove(from);
        playlist.tracks.insert(to, moved);
        true
    }

    fn playlist_mut(&mut self, id: PlaylistId) -> Option<&mut Playlist> {
        self.playlists.iter_mut().find(|playlist| playlist.id == id)
    }
}

/// Where `current` points after the track at `removed` is taken out.
/// `None` if `current` was the removed track.
pub fn index_after_removal(current: Option<usize>, removed: usize) -> Option<usize> {
    let current = current?;
    match current.cmp(&removed) {
        std::cmp::Ordering::Equal => None,
        std::cmp::Ordering::Greater => Some(current - 1),
        std::cmp::Ordering::Less => Some(current),
    }
}

/// Where `current` points after moving the track at `from` to `to`.
pub fn index_after_reorder(current: usize, from: usize, to: usize) -> usize {
    if current == from {
        to
    } else if from < current && current <= to {
        current - 1
    } else if to <= current && current < from {
        current + 1
    } else {
        current
    }
}

fn playlist_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        String::from(UNTITLED)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceHandle;
    use proptest::prop_assert;
    use proptest::prop_assert_eq;

    fn candidate(name: &str) -> CandidateFile {
        CandidateFile::new(name, SourceHandle::from_path(name))
    }

    fn names(store: &PlaylistStore, id: PlaylistId) -> Vec<String> {
        store
            .get(id)
            .expect("playlist")
            .tracks
            .iter()
            .map(|track| track.name.clone())
            .collect()
    }

    #[test]
    fn blank_names_become_untitled() {
        let mut store = PlaylistStore::new("All Tracks");
        let id = store.create_playlist("   ", false);
        assert_eq!(store.get(id).expect("created").name, "Untitled");

        let id = store.create_playlist("  Road Trip ", false);
        assert_eq!(store.get(id).expect("created").name, "Road Trip");
    }

    #[test]
    fn create_only_selects_when_asked() {
        let mut store = PlaylistStore::new("All Tracks");
        let first = store.selected_id();

        store.create_playlist("quiet", false);
        assert_eq!(store.selected_id(), first);

        let loud = store.create_playlist("loud", true);
        assert_eq!(store.selected_id(), loud);
    }

    #[test]
    fn last_playlist_cannot_be_deleted() {
        let mut store = PlaylistStore::new("All Tracks");
        let only = store.selected_id();
        assert!(store.delete_playlist(only).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn deleting_selected_moves_selection_to_first() {
        let mut store = PlaylistStore::new("All Tracks");
        let first = store.selected_id();
        let second = store.create_playlist("b", true);
        store.create_playlist("c", false);

        assert!(store.delete_playlist(second).is_some());
        assert_eq!(store.selected_id(), first);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn add_tracks_keeps_supported_files_in_order() {
        let mut store = PlaylistStore::new("All Tracks");
        let id = store.selected_id();
        let added = store.add_tracks(
            id,
            ["b.MP3", "cover.jpg", "a.wav", "notes.txt", "c.aac"].map(candidate),
        );

        assert_eq!(added, 3);
        assert_eq!(names(&store, id), vec!["b.MP3", "a.wav", "c.aac"]);
    }

    #[test]
    fn remove_out_of_bounds_is_a_no_op() {
        let mut store = PlaylistStore::new("All Tracks");
        let id = store.selected_id();
        store.add_tracks(id, ["a.mp3"].map(candidate));
        assert!(store.remove_track(id, 3).is_none());
        assert_eq!(names(&store, id), vec!["a.mp3"]);
    }

    #[test]
    fn removed_track_releases_its_source() {
        let mut store = PlaylistStore::new("All Tracks");
        let id = store.selected_id();
        let file = candidate("a.mp3");
        let watch = file.source.watch();
        store.add_tracks(id, [file]);

        assert!(!watch.is_released());
        drop(store.remove_track(id, 0));
        assert!(watch.is_released());
    }

    #[test]
    fn reorder_uses_splice_semantics() {
        let mut store = PlaylistStore::new("All Tracks");
        let id = store.selected_id();
        store.add_tracks(id, ["a.mp3", "b.mp3", "c.mp3", "d.mp3"].map(candidate));

        assert!(store.reorder_track(id, 0, 2));
        assert_eq!(names(&store, id), vec!["b.mp3", "c.mp3", "a.mp3", "d.mp3"]);
        assert!(!store.reorder_track(id, 1, 1));
        assert!(!store.reorder_track(id, 1, 4));
    }

    #[test]
    fn removal_index_tracking() {
        assert_eq!(index_after_removal(Some(2), 1), Some(1));
        assert_eq!(index_after_removal(Some(1), 1), None);
        assert_eq!(index_after_removal(Some(0), 1), Some(0));
        assert_eq!(index_after_removal(None, 0), None);
    }

    #[test]
    fn reorder_index_tracking_follows_the_same_track() {
        assert_eq!(index_after_reorder(1, 1, 3), 3);
        assert_eq!(index_after_reorder(2, 1, 3), 1);
        assert_eq!(index_after_reorder(2, 3, 0), 3);
        assert_eq!(index_after_reorder(0, 1, 3), 0);
    }

    proptest::proptest! {
        #[test]
        fn reorder_then_reverse_restores_order(len in 1usize..12, from in 0usize..12, to in 0usize..12) {
            let mut store = PlaylistStore::new("All Tracks");
            let id = store.selected_id();
            let files: Vec<CandidateFile> = (0..len).map(|n| candidate(&format!("{n}.mp3"))).collect();
            store.add_tracks(id, files);
            let original = names(&store, id);

            store.reorder_track(id, from, to);
            store.reorder_track(id, to, from);
            prop_assert_eq!(names(&store, id), original);
        }

        #[test]
        fn reorder_tracking_points_at_same_track(len in 2usize..12, from in 0usize..12, to in 0usize..12, current in 0usize..12) {
            let from = from % len;
            let to = to % len;
            let current = current % len;
            let mut store = PlaylistStore::new("All Tracks");
            let id = store.selected_id();
            let files: Vec<CandidateFile> = (0..len).map(|n| candidate(&format!("{n}.mp3"))).collect();
            store.add_tracks(id, files);
            let before = names(&store, id)[current].clone();

            if store.reorder_track(id, from, to) {
                let after = index_after_reorder(current, from, to);
                prop_assert_eq!(&names(&store, id)[after], &before);
            }
        }

        #[test]
        fn deletes_never_drop_below_one(ops in proptest::collection::vec(0u8..3, 1..100)) {
            let mut store = PlaylistStore::new("All Tracks");
            for op in ops {
                match op {
                    0 => {
                        store.create_playlist("x", false);
                    }
                    1 => {
                        let id = store.selected_id();
                        store.delete_playlist(id);
                    }
                    _ => {
                        if let Some(last) = store.playlists().last().map(|playlist| playlist.id) {
                            store.delete_playlist(last);
                        }
                    }
                }
                prop_assert!(store.len() >= 1);
                prop_assert!(store.selected().is_some());
            }
        }
    }
}
