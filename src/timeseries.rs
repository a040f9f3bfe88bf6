use std::collections::HashMap;
use std::hash::Hash;

use num_traits::Zero;

use chrono::NaiveDate;

use super::error::{Error, Result};


pub trait TimeSeriesKey: Hash + Eq + Clone + std::fmt::Debug {}
impl<T: Hash + Eq + Clone + std::fmt::Debug> TimeSeriesKey for T {}


/// Per-key daily observations, each key's observations kept sorted by date
/// with at most one observation per day.
///
/// Feeds skip days, so a series is sparse: the predecessor of an
/// observation is whatever was observed last before it, not the calendar
/// day before.
#[derive(Debug, Clone)]
pub struct TimeSeries<K: Hash + Eq, V> {
	keys: HashMap<K, usize>,
	time_series: Vec<Vec<(NaiveDate, V)>>,
}

impl<K: TimeSeriesKey, V> TimeSeries<K, V> {
	pub fn new() -> Self {
		Self{
			keys: HashMap::new(),
			time_series: Vec::new(),
		}
	}

	pub fn from_records<I: IntoIterator<Item = (K, NaiveDate, V)>>(records: I) -> Result<Self> {
		let mut result = Self::new();
		for (k, date, v) in records {
			result.insert(k, date, v)?;
		}
		Ok(result)
	}

	fn get_index_or_create(&mut self, k: K) -> usize {
		match self.keys.get(&k) {
			Some(v) => *v,
			None => {
				let v = self.time_series.len();
				self.time_series.push(Vec::new());
				self.keys.insert(k, v);
				v
			},
		}
	}

	pub fn insert(&mut self, k: K, date: NaiveDate, v: V) -> Result<()> {
		let index = self.get_index_or_create(k);
		let vec = &mut self.time_series[index];
		match vec.binary_search_by_key(&date, |(d, _)| *d) {
			Ok(_) => Err(Error::DuplicateDate{
				key: format!("{:?}", self.reverse_index(index)),
				date,
			}),
			Err(at) => {
				vec.insert(at, (date, v));
				Ok(())
			},
		}
	}

	pub fn get(&self, k: &K) -> Option<&[(NaiveDate, V)]> {
		let index = *self.keys.get(k)?;
		Some(&self.time_series[index][..])
	}

	pub fn get_mut(&mut self, k: &K) -> Option<&mut [(NaiveDate, V)]> {
		let index = *self.keys.get(k)?;
		Some(&mut self.time_series[index][..])
	}

	pub fn get_value(&self, k: &K, date: NaiveDate) -> Option<&V> {
		let vec = self.get(k)?;
		let i = vec.binary_search_by_key(&date, |(d, _)| *d).ok()?;
		Some(&vec[i].1)
	}

	pub fn keys(&self) -> std::collections::hash_map::Keys<'_, K, usize> {
		self.keys.keys()
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	fn reverse_index(&self, i: usize) -> Option<&K> {
		for (k, v) in self.keys.iter() {
			if *v == i {
				return Some(k)
			}
		}
		None
	}
}

impl<K: TimeSeriesKey, V> Default for TimeSeries<K, V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<K: TimeSeriesKey, V: Copy + Zero> TimeSeries<K, V> {
	/// Sum the series in `kin` date by date into `kout`.
	///
	/// Days on which `kout` already has an observation keep it.
	pub fn synthesize(&mut self, kin: &[&K], kout: K) {
		let mut sums: Vec<(NaiveDate, V)> = Vec::new();
		for k in kin {
			let tsin = match self.get(k) {
				Some(ts) => ts,
				None => continue,
			};
			for (date, v) in tsin.iter() {
				match sums.binary_search_by_key(date, |(d, _)| *d) {
					Ok(i) => sums[i].1 = sums[i].1 + *v,
					Err(i) => sums.insert(i, (*date, V::zero() + *v)),
				}
			}
		}
		let index = self.get_index_or_create(kout);
		let vec = &mut self.time_series[index];
		for (date, v) in sums {
			if let Err(at) = vec.binary_search_by_key(&date, |(d, _)| *d) {
				vec.insert(at, (date, v));
			}
		}
	}
}
