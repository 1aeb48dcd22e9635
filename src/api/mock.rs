use super::PlaylistService;
use crate::error::{ReorderError, Result};
use crate::models::{PlaylistPage, PlaylistSummary, TrackMove, TrackPage, TrackUri};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

/// Which remote operation a scripted failure or recorded call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListPlaylists,
    ListTracks,
    Create,
    Append,
    Move,
}

/// A call as the service received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListPlaylists { next: Option<String> },
    ListTracks { playlist_id: String, offset: usize, limit: usize },
    Create { name: String, description: String },
    Append { playlist_id: String, uris: Vec<String> },
    Move { playlist_id: String, mv: TrackMove, snapshot_id: Option<String> },
}

#[derive(Debug, Clone)]
struct Playlist {
    id: String,
    name: String,
    tracks: Vec<String>,
    version: u64,
}

impl Playlist {
    fn snapshot(&self) -> String {
        format!("{}-snap-{}", self.id, self.version)
    }

    fn summary(&self) -> PlaylistSummary {
        PlaylistSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            track_count: self.tracks.len(),
            snapshot_id: self.snapshot(),
        }
    }
}

#[derive(Default)]
struct State {
    playlists: Vec<Playlist>,
    next_id: u64,
    failures: HashMap<Op, VecDeque<Option<ReorderError>>>,
    calls: Vec<Call>,
}

/// In-memory stand-in for the remote playlist service.
///
/// Track order changes follow the remote API: a move takes
/// `range_length` items out at `range_start` and inserts them before the
/// item that was at `insert_before` prior to the removal. Every write bumps
/// the playlist's snapshot id; a write carrying an older snapshot id is
/// rejected with `ConcurrencyConflict`.
pub struct MockService {
    state: Mutex<State>,
    page_delays: Mutex<HashMap<usize, Duration>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_delays: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a playlist with raw track URIs (local tracks allowed) and return its id.
    pub fn add_playlist(&self, name: &str, tracks: &[&str]) -> String {
        let mut st = self.lock();
        st.next_id += 1;
        let id = format!("pl{}", st.next_id);
        st.playlists.push(Playlist {
            id: id.clone(),
            name: name.to_string(),
            tracks: tracks.iter().map(|s| s.to_string()).collect(),
            version: 1,
        });
        id
    }

    pub fn summary(&self, playlist_id: &str) -> Option<PlaylistSummary> {
        self.lock()
            .playlists
            .iter()
            .find(|p| p.id == playlist_id)
            .map(Playlist::summary)
    }

    pub fn tracks(&self, playlist_id: &str) -> Vec<String> {
        self.lock()
            .playlists
            .iter()
            .find(|p| p.id == playlist_id)
            .map(|p| p.tracks.clone())
            .unwrap_or_default()
    }

    pub fn playlist_named(&self, name: &str) -> Option<PlaylistSummary> {
        self.lock()
            .playlists
            .iter()
            .find(|p| p.name == name)
            .map(Playlist::summary)
    }

    /// Queue an error to be returned by the next call of `op`.
    pub fn fail_next(&self, op: Op, err: ReorderError) {
        self.lock().failures.entry(op).or_default().push_back(Some(err));
    }

    /// Let the next `n` calls of `op` through before any queued failure.
    pub fn pass_next(&self, op: Op, n: usize) {
        let mut st = self.lock();
        let queue = st.failures.entry(op).or_default();
        for _ in 0..n {
            queue.push_back(None);
        }
    }

    /// Queue `n` transient failures for `op`.
    pub fn fail_times(&self, op: Op, n: usize) {
        for _ in 0..n {
            self.fail_next(
                op,
                ReorderError::RemoteApi { status: 502, message: "Bad Gateway".into() },
            );
        }
    }

    /// Delay the track page at `offset`, to make pages resolve out of order.
    pub fn delay_page(&self, offset: usize, delay: Duration) {
        self.page_delays
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(offset, delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| match c {
                Call::ListPlaylists { .. } => op == Op::ListPlaylists,
                Call::ListTracks { .. } => op == Op::ListTracks,
                Call::Create { .. } => op == Op::Create,
                Call::Append { .. } => op == Op::Append,
                Call::Move { .. } => op == Op::Move,
            })
            .count()
    }

    /// Record the call and pop a scripted failure for it, if any.
    fn enter(&self, op: Op, call: Call) -> Result<()> {
        let mut st = self.lock();
        st.calls.push(call);
        match st.failures.get_mut(&op).and_then(|q| q.pop_front()) {
            Some(Some(err)) => Err(err),
            _ => Ok(()),
        }
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(playlist_id: &str) -> ReorderError {
    ReorderError::RemoteApi {
        status: 404,
        message: format!("Not Found playlist {}", playlist_id),
    }
}

#[async_trait]
impl PlaylistService for MockService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn playlists_page(&self, _token: &str, next: Option<&str>, limit: usize) -> Result<PlaylistPage> {
        self.enter(Op::ListPlaylists, Call::ListPlaylists { next: next.map(String::from) })?;
        let offset = match next {
            None => 0,
            Some(n) => n
                .strip_prefix("offset=")
                .and_then(|s| s.parse::<usize>().ok())
                .ok_or_else(|| ReorderError::Decode(format!("bad page cursor {}", n)))?,
        };
        let st = self.lock();
        let items: Vec<PlaylistSummary> = st
            .playlists
            .iter()
            .skip(offset)
            .take(limit)
            .map(Playlist::summary)
            .collect();
        let end = offset + items.len();
        let next = (end < st.playlists.len()).then(|| format!("offset={}", end));
        Ok(PlaylistPage { items, next })
    }

    async fn tracks_page(&self, _token: &str, playlist_id: &str, offset: usize, limit: usize) -> Result<TrackPage> {
        self.enter(
            Op::ListTracks,
            Call::ListTracks { playlist_id: playlist_id.to_string(), offset, limit },
        )?;
        let delay = self
            .page_delays
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&offset)
            .copied();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        let st = self.lock();
        let pl = st
            .playlists
            .iter()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| missing(playlist_id))?;
        let uris = pl.tracks.iter().skip(offset).take(limit).cloned().collect();
        Ok(TrackPage { uris })
    }

    async fn create_playlist(&self, _token: &str, name: &str, description: &str) -> Result<String> {
        self.enter(
            Op::Create,
            Call::Create { name: name.to_string(), description: description.to_string() },
        )?;
        info!("MockService: create_playlist {}", name);
        Ok(self.add_playlist(name, &[]))
    }

    async fn add_tracks(&self, _token: &str, playlist_id: &str, uris: &[TrackUri]) -> Result<Option<String>> {
        self.enter(
            Op::Append,
            Call::Append {
                playlist_id: playlist_id.to_string(),
                uris: uris.iter().map(|u| u.as_str().to_string()).collect(),
            },
        )?;
        if uris.len() > 100 {
            return Err(ReorderError::RemoteApi {
                status: 400,
                message: "Bad Request You can add a maximum of 100 tracks per request.".into(),
            });
        }
        let mut st = self.lock();
        let pl = st
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| missing(playlist_id))?;
        pl.tracks.extend(uris.iter().map(|u| u.as_str().to_string()));
        pl.version += 1;
        Ok(Some(pl.snapshot()))
    }

    async fn move_tracks(
        &self,
        _token: &str,
        playlist_id: &str,
        mv: TrackMove,
        snapshot_id: Option<&str>,
    ) -> Result<String> {
        self.enter(
            Op::Move,
            Call::Move {
                playlist_id: playlist_id.to_string(),
                mv,
                snapshot_id: snapshot_id.map(String::from),
            },
        )?;
        let mut st = self.lock();
        let pl = st
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| missing(playlist_id))?;
        if let Some(s) = snapshot_id {
            if s != pl.snapshot() {
                return Err(ReorderError::ConcurrencyConflict {
                    message: format!("snapshot {} is not current ({})", s, pl.snapshot()),
                });
            }
        }
        let len = pl.tracks.len();
        let end = mv.range_start + mv.range_length;
        if mv.range_length == 0 || end > len || mv.insert_before > len {
            return Err(ReorderError::RemoteApi {
                status: 400,
                message: format!("Bad Request Index out of bounds: {:?} (len {})", mv, len),
            });
        }
        if mv.insert_before < mv.range_start || mv.insert_before > end {
            let moved: Vec<String> = pl.tracks.drain(mv.range_start..end).collect();
            let at = if mv.insert_before > end {
                mv.insert_before - mv.range_length
            } else {
                mv.insert_before
            };
            pl.tracks.splice(at..at, moved);
        }
        pl.version += 1;
        Ok(pl.snapshot())
    }
}
