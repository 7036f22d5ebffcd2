//! Interactive multi-select for candidate tracks.
//!
//! Raw-mode terminal list with vi-style movement, space to toggle, and an
//! mpv audio preview bound to `p`. Tracks already present in the library
//! arrive pre-deselected and dimmed; everything else is pre-selected.

use std::collections::HashSet;
use std::io::{self, IsTerminal, Write};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};

use reprise_core::model::CandidateTrack;

/// Indices selected before any interaction: everything not already local.
pub fn initial_selection(candidates: &[CandidateTrack]) -> HashSet<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_local())
        .map(|(i, _)| i)
        .collect()
}

/// Let the user pick tracks to download.
///
/// Falls back to the initial selection without any UI when stdout is not a
/// terminal, so piped invocations behave like `--yes` minus the local
/// duplicates. An empty return means the user aborted or deselected
/// everything.
pub fn select_tracks(
    candidates: Vec<CandidateTrack>,
    show_artist: bool,
) -> io::Result<Vec<CandidateTrack>> {
    if candidates.is_empty() {
        return Ok(candidates);
    }

    if !io::stdout().is_terminal() {
        let keep = initial_selection(&candidates);
        return Ok(filter_selected(candidates, &keep));
    }

    let mut selector = Selector::new(&candidates, show_artist);
    let picked = selector.run()?;
    Ok(filter_selected(candidates, &picked))
}

fn filter_selected(
    candidates: Vec<CandidateTrack>,
    selected: &HashSet<usize>,
) -> Vec<CandidateTrack> {
    candidates
        .into_iter()
        .enumerate()
        .filter(|(i, _)| selected.contains(i))
        .map(|(_, c)| c)
        .collect()
}

struct Selector<'a> {
    candidates: &'a [CandidateTrack],
    selected: HashSet<usize>,
    cursor: usize,
    offset: usize,
    show_artist: bool,
    preview: Option<(usize, Child)>,
}

impl<'a> Selector<'a> {
    fn new(candidates: &'a [CandidateTrack], show_artist: bool) -> Self {
        Self {
            candidates,
            selected: initial_selection(candidates),
            cursor: 0,
            offset: 0,
            show_artist,
            preview: None,
        }
    }

    fn run(&mut self) -> io::Result<HashSet<usize>> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, Hide)?;

        let outcome = self.event_loop();

        self.stop_preview();
        execute!(io::stdout(), Show, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        outcome
    }

    fn event_loop(&mut self) -> io::Result<HashSet<usize>> {
        loop {
            // Reap a preview that finished on its own.
            if let Some((_, child)) = &mut self.preview {
                if child.try_wait()?.is_some() {
                    self.preview = None;
                }
            }

            self.render()?;

            if !event::poll(Duration::from_millis(200))? {
                continue;
            }
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(HashSet::new()),
                KeyCode::Enter => return Ok(self.selected.clone()),
                KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
                KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
                KeyCode::Home => self.cursor = 0,
                KeyCode::End => self.cursor = self.candidates.len() - 1,
                KeyCode::Char(' ') => {
                    self.toggle(self.cursor);
                    self.move_cursor(1);
                }
                KeyCode::Char('a') => self.selected = (0..self.candidates.len()).collect(),
                KeyCode::Char('n') => self.selected.clear(),
                KeyCode::Char('p') => self.toggle_preview(),
                KeyCode::Char('s') => self.stop_preview(),
                _ => {}
            }
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let last = self.candidates.len() - 1;
        self.cursor = self
            .cursor
            .saturating_add_signed(delta)
            .min(last);
    }

    fn toggle(&mut self, index: usize) {
        if !self.selected.remove(&index) {
            self.selected.insert(index);
        }
    }

    fn toggle_preview(&mut self) {
        if matches!(self.preview, Some((playing, _)) if playing == self.cursor) {
            self.stop_preview();
            return;
        }
        self.stop_preview();

        let track = &self.candidates[self.cursor];
        let query = format!("ytsearch1:{} {} official audio", track.artist, track.name);
        let child = Command::new("mpv")
            .arg("--no-video")
            .arg("--really-quiet")
            .arg("--start=30")
            .arg("--length=30")
            .arg(format!("ytdl://{query}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        // mpv not being installed just means no preview.
        if let Ok(child) = child {
            self.preview = Some((self.cursor, child));
        }
    }

    fn stop_preview(&mut self) {
        if let Some((_, mut child)) = self.preview.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn render(&mut self) -> io::Result<()> {
        let mut out = io::stdout();
        let (width, height) = terminal::size()?;
        let width = width as usize;
        let list_start = 3usize;
        let list_height = (height as usize).saturating_sub(list_start + 1).max(1);

        // Keep the cursor visible.
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + list_height {
            self.offset = self.cursor - list_height + 1;
        }

        queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
        queue!(
            out,
            SetAttribute(Attribute::Bold),
            Print(clip("Select tracks to download", width)),
            SetAttribute(Attribute::Reset),
        )?;
        queue!(
            out,
            MoveTo(0, 1),
            Print(clip(
                "j/k:move  SPACE:toggle  a:all  n:none  p:preview  ENTER:confirm  q:quit",
                width,
            )),
            MoveTo(0, 2),
            Print("-".repeat(width.min(70))),
        )?;

        for (row, index) in (self.offset..self.candidates.len())
            .take(list_height)
            .enumerate()
        {
            let candidate = &self.candidates[index];
            let playing = matches!(self.preview, Some((p, _)) if p == index);
            let line = render_line(candidate, self.selected.contains(&index), playing, self.show_artist);

            queue!(out, MoveTo(0, (list_start + row) as u16))?;
            if index == self.cursor {
                queue!(out, SetAttribute(Attribute::Reverse))?;
            }
            if candidate.is_local() {
                queue!(out, SetAttribute(Attribute::Dim))?;
            }
            queue!(out, Print(clip(&line, width)), SetAttribute(Attribute::Reset))?;
        }

        let local = self.candidates.iter().filter(|c| c.is_local()).count();
        let status = format!(
            " {} selected, {} local | Track {}/{}",
            self.selected.len(),
            local,
            self.cursor + 1,
            self.candidates.len()
        );
        queue!(
            out,
            MoveTo(0, height.saturating_sub(1)),
            SetAttribute(Attribute::Reverse),
            Print(clip(&status, width)),
            SetAttribute(Attribute::Reset),
        )?;

        out.flush()
    }
}

/// One list row: marker, clipped title, mode-dependent detail, and the local
/// album directory when the track is already owned.
fn render_line(
    candidate: &CandidateTrack,
    selected: bool,
    playing: bool,
    show_artist: bool,
) -> String {
    let marker = if playing {
        " > "
    } else if selected {
        "[*]"
    } else {
        "[ ]"
    };

    let name: String = candidate.name.chars().take(35).collect();
    let suffix = crate::commands::fetch::candidate_suffix(candidate, show_artist);

    match &candidate.local_match {
        Some(found) => {
            let album = found
                .path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let album: String = album.chars().take(18).collect();
            format!("{marker} {name:<36} {suffix:<20} [{album}]")
        }
        None => format!("{marker} {name:<36} {suffix}"),
    }
}

fn clip(text: &str, width: usize) -> String {
    text.chars().take(width.saturating_sub(1).max(1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reprise_core::model::MatchResult;

    fn candidate(name: &str, local: bool) -> CandidateTrack {
        let mut c = CandidateTrack::new(name, "Daft Punk", Some(100));
        if local {
            c.local_match = Some(MatchResult {
                path: "/music/Discovery/track.mp3".into(),
                artist: "Daft Punk".to_string(),
                title: name.to_string(),
                score: 1.0,
            });
        }
        c
    }

    #[test]
    fn test_initial_selection_skips_local_tracks() {
        let candidates = vec![
            candidate("One More Time", false),
            candidate("Aerodynamic", true),
            candidate("Digital Love", false),
        ];
        let selected = initial_selection(&candidates);
        assert!(selected.contains(&0));
        assert!(!selected.contains(&1));
        assert!(selected.contains(&2));
    }

    #[test]
    fn test_filter_selected_preserves_order() {
        let candidates = vec![
            candidate("A", false),
            candidate("B", false),
            candidate("C", false),
        ];
        let keep: HashSet<usize> = [2, 0].into_iter().collect();
        let kept = filter_selected(candidates, &keep);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].name, "A");
        assert_eq!(kept[1].name, "C");
    }

    #[test]
    fn test_render_line_shows_local_album() {
        let line = render_line(&candidate("Aerodynamic", true), false, false, false);
        assert!(line.starts_with("[ ]"));
        assert!(line.contains("Aerodynamic"));
        assert!(line.contains("[Discovery]"));

        let line = render_line(&candidate("Aerodynamic", false), true, false, false);
        assert!(line.starts_with("[*]"));
        assert!(!line.contains("[Discovery]"));
    }

    #[test]
    fn test_toggle_and_cursor_bounds() {
        let candidates = vec![candidate("A", false), candidate("B", false)];
        let mut selector = Selector::new(&candidates, false);

        assert_eq!(selector.selected.len(), 2);
        selector.toggle(0);
        assert!(!selector.selected.contains(&0));
        selector.toggle(0);
        assert!(selector.selected.contains(&0));

        selector.move_cursor(-1);
        assert_eq!(selector.cursor, 0);
        selector.move_cursor(1);
        selector.move_cursor(1);
        assert_eq!(selector.cursor, 1);
    }
}
