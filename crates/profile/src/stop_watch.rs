use std::time::{Duration, Instant};

pub struct StopWatch {
    start: Instant,
}

pub struct StopWatchSpan {
    pub time: Duration,
}

impl StopWatch {
    pub fn start() -> StopWatch {
        StopWatch { start: Instant::now() }
    }

    pub fn elapsed(self) -> StopWatchSpan {
        StopWatchSpan { time: self.start.elapsed() }
    }
}
