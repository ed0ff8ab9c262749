// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Live timer and manual entries.
//!
//! A session moves `Idle → Running → Terminated`. Starting fixes the
//! `last_*` variables and appends an empty entry slot. Each tick re-renders
//! `format_entry` into that slot and redraws it. When the cancellation flag
//! is seen the session ticks once more, writes the file and terminates.
//! A process killed without a signal loses the in-progress entry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::clock::{self, Clock};
use crate::display::LineDisplay;
use crate::error::{Error, Result};
use crate::options::{Options, Overrides};
use crate::store::{self, TrackedFile};
use crate::template::Template;

/// Longest single sleep between cancellation checks.
const POLL_SLICE: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Terminated,
}

/// Template variables for an entry that started at `start` and is observed at `now`.
pub fn variables(
    options: &Options,
    start: &DateTime<Local>,
    now: &DateTime<Local>,
) -> HashMap<String, String> {
    let elapsed = now.timestamp() - start.timestamp();
    let mut vars = HashMap::new();
    vars.insert("curr_date".to_string(), clock::format_instant(now, &options.format_date));
    vars.insert("curr_time".to_string(), clock::format_instant(now, &options.format_time));
    vars.insert("curr_secs".to_string(), now.timestamp().to_string());
    vars.insert("last_date".to_string(), clock::format_instant(start, &options.format_date));
    vars.insert("last_time".to_string(), clock::format_instant(start, &options.format_time));
    vars.insert("last_secs".to_string(), start.timestamp().to_string());
    vars.insert(
        "duration".to_string(),
        clock::format_duration(elapsed, &options.format_duration),
    );
    vars
}

/// Sleeps for `total` in short slices. Returns true as soon as `cancel` is set.
fn sleep_unless_cancelled(total: Duration, cancel: &AtomicBool) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if cancel.load(Ordering::SeqCst) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(POLL_SLICE.min(deadline - now));
    }
}

pub struct TimerSession<C: Clock, D: LineDisplay> {
    file: TrackedFile,
    clock: C,
    display: D,
    template: Template,
    interval: Duration,
    started: Option<DateTime<Local>>,
    phase: Phase,
}

impl<C: Clock, D: LineDisplay> TimerSession<C, D> {
    /// Fails if `refresh_time` is not a usable interval.
    pub fn new(file: TrackedFile, clock: C, display: D) -> Result<Self> {
        let interval = file.options.refresh_interval()?;
        let template = Template::parse(&file.options.format_entry);
        Ok(TimerSession {
            file,
            clock,
            display,
            template,
            interval,
            started: None,
            phase: Phase::Idle,
        })
    }

    /// `Idle → Running`. Has no effect in any other phase.
    pub fn start(&mut self) {
        if self.phase != Phase::Idle {
            return;
        }
        let now = self.clock.now();
        debug!(path = %self.file.path.display(), start = now.timestamp(), "timer started");
        self.started = Some(now);
        self.file.entries.push(String::new());
        self.phase = Phase::Running;
    }

    /// Re-renders the running entry and redraws it.
    pub fn tick(&mut self) -> Result<()> {
        if self.phase != Phase::Running {
            return Ok(());
        }
        self.redraw()
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(started) = self.started else {
            return Ok(());
        };
        let now = self.clock.now();
        let vars = variables(&self.file.options, &started, &now);
        let line = self.template.render(&vars);
        if let Some(last) = self.file.entries.last_mut() {
            last.clone_from(&line);
        }
        self.display.replace(&line).map_err(Error::Output)
    }

    /// `Running → Terminated`: one last redraw, then a full write of the file.
    pub fn finish(&mut self) -> Result<()> {
        if self.phase != Phase::Running {
            return Ok(());
        }
        let drawn = self.redraw();
        self.phase = Phase::Terminated;
        if let Err(e) = drawn.and(self.display.finish().map_err(Error::Output)) {
            debug!(error = %e, "final redraw failed");
        }
        store::write(&self.file)?;
        info!(
            path = %self.file.path.display(),
            entry = self.file.entries.last().map(String::as_str).unwrap_or(""),
            "saved entry"
        );
        Ok(())
    }

    /// Starts, ticks every `refresh_time` until `cancel` is set, then finishes.
    pub fn run(&mut self, cancel: &AtomicBool) -> Result<()> {
        self.start();
        while !cancel.load(Ordering::SeqCst) {
            if let Err(e) = self.tick() {
                debug!(error = %e, "redraw failed");
            }
            if sleep_unless_cancelled(self.interval, cancel) {
                break;
            }
        }
        debug!("cancellation observed");
        self.finish()
    }
}

/// Appends `text` verbatim as a new entry and writes the file. No timer runs.
pub fn append_entry(path: &Path, chain: &[Overrides], text: &str) -> Result<TrackedFile> {
    let mut file = store::open(path, chain)?;
    file.entries.push(text.to_string());
    store::write(&file)?;
    info!(path = %path.display(), entry = text, "appended manual entry");
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::Cell;
    use std::fs;
    use std::io;
    use std::rc::Rc;

    /// Advances by `step` seconds on every reading.
    struct StepClock {
        next: Cell<i64>,
        step: i64,
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Local> {
            let t = self.next.get();
            self.next.set(t + self.step);
            Local.timestamp_opt(t, 0).single().unwrap()
        }
    }

    /// Records every redraw; trips `cancel` after `trip_after` redraws.
    struct Recorder<'a> {
        lines: Rc<std::cell::RefCell<Vec<String>>>,
        cancel: &'a AtomicBool,
        trip_after: usize,
        finished: Rc<Cell<bool>>,
    }

    impl LineDisplay for Recorder<'_> {
        fn replace(&mut self, line: &str) -> io::Result<()> {
            let mut lines = self.lines.borrow_mut();
            lines.push(line.to_string());
            if lines.len() >= self.trip_after {
                self.cancel.store(true, Ordering::SeqCst);
            }
            Ok(())
        }

        fn finish(&mut self) -> io::Result<()> {
            self.finished.set(true);
            Ok(())
        }
    }

    fn clock_at(start: i64) -> StepClock {
        StepClock {
            next: Cell::new(start),
            step: 1,
        }
    }

    const T0: i64 = 1_704_099_600;

    #[test]
    fn test_variables() {
        let o = Options::default();
        let start = Local.timestamp_opt(T0, 0).single().unwrap();
        let now = Local.timestamp_opt(T0 + 5400, 0).single().unwrap();
        let v = variables(&o, &start, &now);
        assert_eq!(v["duration"], "01:30:00");
        assert_eq!(v["last_secs"], T0.to_string());
        assert_eq!(v["curr_secs"], (T0 + 5400).to_string());
        assert_eq!(v["last_time"], start.format("%H:%M:%S").to_string());
        assert_eq!(v["curr_date"], now.format("%a %b %d %Y").to_string());
        assert_eq!(v.len(), 7);
    }

    #[test]
    fn test_phases() {
        let dir = tempfile::tempdir().unwrap();
        let file = store::open(&dir.path().join("log.tt"), &[]).unwrap();
        let cancel = AtomicBool::new(false);
        let display = Recorder {
            lines: Rc::default(),
            cancel: &cancel,
            trip_after: usize::MAX,
            finished: Rc::default(),
        };
        let mut s = TimerSession::new(file, clock_at(T0), display).unwrap();
        assert_eq!(s.phase, Phase::Idle);
        s.tick().unwrap();
        assert!(s.file.entries.is_empty());
        s.start();
        s.start();
        assert_eq!(s.phase, Phase::Running);
        assert_eq!(s.file.entries, vec![String::new()]);
        s.tick().unwrap();
        assert!(s.file.entries[0].starts_with("  00:00:01 | "));
        s.finish().unwrap();
        assert_eq!(s.phase, Phase::Terminated);
        s.finish().unwrap();
        s.tick().unwrap();
        assert_eq!(s.file.entries.len(), 1);
    }

    #[test]
    fn test_interrupt_after_two_ticks_saves_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.tt");
        let mut file = store::open(&path, &[]).unwrap();
        file.entries.push("older".to_string());
        store::write(&file).unwrap();
        let file = store::open(&path, &[]).unwrap();
        assert_eq!(file.options.refresh_time, "0.2");

        let cancel = AtomicBool::new(false);
        let lines = Rc::new(std::cell::RefCell::new(Vec::new()));
        let finished = Rc::new(Cell::new(false));
        let display = Recorder {
            lines: Rc::clone(&lines),
            cancel: &cancel,
            trip_after: 2,
            finished: Rc::clone(&finished),
        };
        let mut s = TimerSession::new(file, clock_at(T0), display).unwrap();
        s.run(&cancel).unwrap();
        assert_eq!(s.phase, Phase::Terminated);
        assert!(finished.get());
        // start reads T0, two ticks, then the final tick at T0 + 3.
        assert_eq!(lines.borrow().len(), 3);

        let saved = store::load(&path, &[]).unwrap();
        assert_eq!(saved.entries.len(), 2);
        assert_eq!(saved.entries[0], "older");
        let inv = Template::parse(&saved.options.format_entry)
            .invert("duration")
            .unwrap();
        assert_eq!(inv.extract(&saved.entries[1]), Some("00:00:03"));
    }

    #[test]
    fn test_run_with_cancel_already_set_still_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.tt");
        let file = store::open(&path, &[]).unwrap();
        let cancel = AtomicBool::new(true);
        let display = Recorder {
            lines: Rc::default(),
            cancel: &cancel,
            trip_after: usize::MAX,
            finished: Rc::default(),
        };
        let mut s = TimerSession::new(file, clock_at(T0), display).unwrap();
        s.run(&cancel).unwrap();
        let saved = store::load(&path, &[]).unwrap();
        assert_eq!(saved.entries.len(), 1);
        assert!(saved.entries[0].starts_with("  00:00:01 | "));
    }

    #[test]
    fn test_invalid_refresh_time_rejected() {
        let mut file = TrackedFile::empty(Path::new("x"), &[]);
        file.options.refresh_time = "fast".to_string();
        let cancel = AtomicBool::new(false);
        let display = Recorder {
            lines: Rc::default(),
            cancel: &cancel,
            trip_after: usize::MAX,
            finished: Rc::default(),
        };
        let err = TimerSession::new(file, clock_at(T0), display).err().unwrap();
        assert!(matches!(err, Error::InvalidOption { .. }));
    }

    #[test]
    fn test_save_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone").join("log.tt");
        let file = TrackedFile::empty(&path, &[]);
        let cancel = AtomicBool::new(true);
        let display = Recorder {
            lines: Rc::default(),
            cancel: &cancel,
            trip_after: usize::MAX,
            finished: Rc::default(),
        };
        let mut s = TimerSession::new(file, clock_at(T0), display).unwrap();
        assert!(matches!(s.run(&cancel), Err(Error::Io { .. })));
        assert_eq!(s.phase, Phase::Terminated);
    }

    #[test]
    fn test_manual_entry_appends_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("log.tt");
        append_entry(&path, &[], "  first").unwrap();
        let file = append_entry(&path, &[], "lunch").unwrap();
        assert_eq!(file.entries, vec!["  first".to_string(), "lunch".to_string()]);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#tt\n"));
        assert!(content.ends_with("entries:\n  first\nlunch\n"));
    }

    #[test]
    fn test_manual_entry_preserves_header_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.tt");
        fs::write(&path, "#tt\n# project alpha\nformat_total=\"sum %H\"\n\nentries:\nx\n").unwrap();
        let file = append_entry(&path, &[], "lunch").unwrap();
        assert_eq!(file.header, vec!["# project alpha".to_string()]);
        assert_eq!(file.options.format_total, "sum %H");
        let again = store::load(&path, &[]).unwrap();
        assert_eq!(again, file);
    }
}
