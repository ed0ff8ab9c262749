// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Where the live entry is shown while the timer runs.

use std::io::{self, Write};

pub trait LineDisplay {
    /// Replaces the previously shown line with `line`.
    fn replace(&mut self, line: &str) -> io::Result<()>;

    /// Leaves the last line in place and moves past it.
    fn finish(&mut self) -> io::Result<()>;
}

/// Redraws in place using carriage return and erase-line.
pub struct Terminal<W: Write> {
    out: W,
    shown: bool,
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W) -> Self {
        Terminal { out, shown: false }
    }
}

impl<W: Write> LineDisplay for Terminal<W> {
    fn replace(&mut self, line: &str) -> io::Result<()> {
        write!(self.out, "\r\x1b[2K{}", line)?;
        self.shown = true;
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.shown {
            writeln!(self.out)?;
            self.shown = false;
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_redraws_in_place() {
        let mut buf = Vec::new();
        {
            let mut t = Terminal::new(&mut buf);
            t.replace("a").unwrap();
            t.replace("bb").unwrap();
            t.finish().unwrap();
            t.finish().unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "\r\x1b[2Ka\r\x1b[2Kbb\n");
    }
}
