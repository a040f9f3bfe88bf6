use std::io;
use std::io::Write;
use std::time;


pub trait ProgressSink {
	fn update(&mut self, inow: usize);
	fn finish(&mut self, inow: Option<usize>);
}


/// Row counter and rate on stderr, redrawn in place.
pub struct ProgressMeter {
	t0: time::Instant,
	tprev: time::Instant,
	iprev: usize,
	n: Option<usize>,
}

impl ProgressMeter {
	pub fn start(n: Option<usize>) -> Self {
		let now = time::Instant::now();
		match n {
			Some(_) => eprint!("{:6.0}% [{:6.2}/s]\r", 0.0, 0),
			None => eprint!("{:12} [{:6.2}/s]\r", 0, 0),
		}
		let _ = io::stderr().flush();
		Self{
			t0: now,
			tprev: now,
			iprev: 0,
			n,
		}
	}
}

impl ProgressSink for ProgressMeter {
	fn update(&mut self, inow: usize) {
		let now = time::Instant::now();
		let dt = (now - self.tprev).as_secs_f64();
		let rate = inow.saturating_sub(self.iprev) as f64 / dt;
		match self.n {
			Some(n) => {
				let done = (inow as f64) / (n as f64);
				eprint!("{:6.0}% [{:6.2}/s]\r", done * 100.0, rate);
			},
			None => {
				eprint!("{:12} [{:6.2}/s]\r", inow, rate);
			},
		}
		let _ = io::stderr().flush();
		self.iprev = inow;
		self.tprev = now;
	}

	fn finish(&mut self, inow: Option<usize>) {
		let (inow, tnow) = match inow.or(self.n) {
			Some(inow) => (inow, time::Instant::now()),
			None => (self.iprev, self.tprev),
		};
		let dt = (tnow - self.t0).as_secs_f64();
		let rate = inow as f64 / dt;
		match self.n {
			Some(_) => {
				eprintln!("{:6.0}% [{:6.2}/s]", 100.0, rate);
			},
			None => {
				eprintln!("{:12} [{:6.2}/s]", inow, rate);
			},
		}
		self.t0 = tnow;
		self.tprev = tnow;
		self.iprev = 0;
	}
}


/// Discards all progress.
pub struct NullSink;

impl ProgressSink for NullSink {
	fn update(&mut self, _inow: usize) {}

	fn finish(&mut self, _inow: Option<usize>) {}
}


/// Reports every `step`th row of a stream of unknown length.
pub struct CountMeter<'s, S: ProgressSink + ?Sized> {
	sink: &'s mut S,
	step: usize,
}

impl<'s, S: ProgressSink + ?Sized> CountMeter<'s, S> {
	pub fn new(sink: &'s mut S) -> Self {
		Self::with_step(sink, 10000)
	}

	pub fn with_step(sink: &'s mut S, step: usize) -> Self {
		Self{sink, step: step.max(1)}
	}

	pub fn update(&mut self, inow: usize) {
		if inow % self.step == 0 {
			self.sink.update(inow);
		}
	}

	pub fn finish(self, inow: usize) {
		self.sink.finish(Some(inow));
	}
}


/// A live meter when stderr is a terminal, nothing otherwise.
pub fn default_output() -> Box<dyn ProgressSink> {
	if isatty::stderr_isatty() {
		Box::new(ProgressMeter::start(None))
	} else {
		Box::new(NullSink)
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Default)]
	struct Recorder {
		updates: Vec<usize>,
		finished: Option<usize>,
	}

	impl ProgressSink for Recorder {
		fn update(&mut self, inow: usize) {
			self.updates.push(inow);
		}

		fn finish(&mut self, inow: Option<usize>) {
			self.finished = inow;
		}
	}

	#[test]
	fn count_meter_reports_steps() {
		let mut rec = Recorder::default();
		{
			let mut pm = CountMeter::with_step(&mut rec, 2);
			for i in 1..=5 {
				pm.update(i);
			}
			pm.finish(5);
		}
		assert_eq!(rec.updates, vec![2, 4]);
		assert_eq!(rec.finished, Some(5));
	}
}
