//! Progress reporting for long running transformations.
//!
//! The caller supplies an optional callback that receives a percentage in 0..=100.
//! The pipeline divides the range among its stages, each stage ticks once per element,
//! and the callback only fires every `interval` elements so it cannot dominate the runtime.
//! Nothing here feeds back into the codecs.

pub struct Progress<'a> {
    callback: Option<&'a mut dyn FnMut(f64)>,
    interval: usize,
    start: f64,
    end: f64
}

impl<'a> Progress<'a> {
    pub fn create(callback: Option<&'a mut dyn FnMut(f64)>,interval: usize) -> Self {
        Self {
            callback,
            interval: interval.max(1),
            start: 0.0,
            end: 100.0
        }
    }
    /// progress that is never reported
    pub fn silent() -> Self {
        Self::create(None,usize::MAX)
    }
    /// select the part of the range that the next stage maps into
    pub fn stage(&mut self,start: f64,end: f64) {
        self.start = start;
        self.end = end;
    }
    /// `done` out of `total` elements of the current stage are finished
    pub fn tick(&mut self,done: usize,total: usize) {
        if total == 0 || done % self.interval != 0 {
            return;
        }
        let percent = self.start + (self.end - self.start) * done as f64 / total as f64;
        self.report(percent);
    }
    /// the current stage is finished
    pub fn finish(&mut self) {
        let percent = self.end;
        self.report(percent);
    }
    fn report(&mut self,percent: f64) {
        if let Some(callback) = &mut self.callback {
            callback(percent);
        }
    }
}

#[test]
fn stages_and_rate() {
    let mut seen: Vec<f64> = Vec::new();
    let mut record = |p: f64| seen.push(p);
    let mut progress = Progress::create(Some(&mut record),4);
    progress.stage(0.0,50.0);
    for i in 0..10 {
        progress.tick(i,10);
    }
    progress.finish();
    progress.stage(50.0,100.0);
    progress.tick(0,2);
    progress.finish();
    drop(progress);
    assert_eq!(seen,vec![0.0,20.0,40.0,50.0,50.0,100.0]);
}

#[test]
fn silent_progress() {
    let mut progress = Progress::silent();
    progress.stage(0.0,50.0);
    progress.tick(0,0);
    progress.tick(0,10);
    progress.finish();
}
