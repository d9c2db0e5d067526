//! Shared playback state
//!
//! The per-room last-writer-wins cache of the video's play/pause/seek/url
//! status. The server never advances `current_time` on its own clock; it
//! records whatever the most recent accepted command reported, so a late
//! joiner can start from the room's last-known position instead of 0.

/// Last-known playback status for a room's shared video
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    /// Whether the last accepted command left the video playing
    pub is_playing: bool,
    /// Client-reported position in seconds at the last accepted command
    pub current_time: f64,
    /// Currently selected video URL; empty means no video selected
    pub video_url: String,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time: 0.0,
            video_url: String::new(),
        }
    }
}

impl PlaybackState {
    /// Accept a play command at the reported position
    pub fn play(&mut self, current_time: f64) {
        self.is_playing = true;
        self.current_time = current_time;
    }

    /// Accept a pause command at the reported position
    pub fn pause(&mut self, current_time: f64) {
        self.is_playing = false;
        self.current_time = current_time;
    }

    /// Accept a seek; play/pause status is unchanged
    pub fn seek(&mut self, current_time: f64) {
        self.current_time = current_time;
    }

    /// Replace the video URL
    ///
    /// `current_time` is deliberately left alone: resetting position on a
    /// URL change is the client's job, the server just caches what it is
    /// told.
    pub fn set_url(&mut self, video_url: String) {
        self.video_url = video_url;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = PlaybackState::default();
        assert!(!state.is_playing);
        assert_eq!(state.current_time, 0.0);
        assert!(state.video_url.is_empty());
    }

    #[test]
    fn test_play_pause_transitions() {
        let mut state = PlaybackState::default();

        state.play(12.5);
        assert!(state.is_playing);
        assert_eq!(state.current_time, 12.5);

        state.pause(13.0);
        assert!(!state.is_playing);
        assert_eq!(state.current_time, 13.0);
    }

    #[test]
    fn test_seek_keeps_play_status() {
        let mut state = PlaybackState::default();
        state.play(5.0);

        state.seek(42.0);
        assert!(state.is_playing);
        assert_eq!(state.current_time, 42.0);

        state.pause(42.0);
        state.seek(1.0);
        assert!(!state.is_playing);
        assert_eq!(state.current_time, 1.0);
    }

    #[test]
    fn test_seek_idempotent() {
        let mut state = PlaybackState::default();
        state.seek(7.25);
        let after_first = state.clone();
        state.seek(7.25);
        assert_eq!(state, after_first);
    }

    #[test]
    fn test_url_change_keeps_position() {
        let mut state = PlaybackState::default();
        state.play(30.0);

        state.set_url("https://example.com/video.mp4".to_string());
        assert_eq!(state.video_url, "https://example.com/video.mp4");
        // position is the client's responsibility to reset
        assert_eq!(state.current_time, 30.0);
        assert!(state.is_playing);
    }
}
