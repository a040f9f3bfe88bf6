use std::collections::HashSet;
use std::ops::Add;

use num_traits::Zero;

use serde::{Serialize, Deserialize};

use smartstring::alias::{String as SmartString};

use chrono::NaiveDate;

use super::daily::signed_delta;
use super::sources::{flexible_date, count_opt};
use super::timeseries::TimeSeries;


/// Vaccination rows are keyed by the upper-cased name with accents folded
/// away ("São Paulo" -> "SAO PAULO").
pub fn vaccination_key(name: &str) -> SmartString {
	unidecode::unidecode(name.trim()).to_uppercase().into()
}


fn add_opt(a: Option<u64>, b: Option<u64>) -> Option<u64> {
	match (a, b) {
		(None, None) => None,
		(a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
	}
}

/// Counters reported for one geography on one day. Any of them may be
/// missing from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VaccinationCounts {
	pub first_dose: Option<u64>,
	pub second_dose: Option<u64>,
	pub doses_received: Option<u64>,
	pub population: Option<u64>,
}

impl Add for VaccinationCounts {
	type Output = Self;

	fn add(self, other: Self) -> Self {
		Self{
			first_dose: add_opt(self.first_dose, other.first_dose),
			second_dose: add_opt(self.second_dose, other.second_dose),
			doses_received: add_opt(self.doses_received, other.doses_received),
			population: add_opt(self.population, other.population),
		}
	}
}

impl Zero for VaccinationCounts {
	fn zero() -> Self {
		Self::default()
	}

	fn is_zero(&self) -> bool {
		*self == Self::default()
	}
}


#[derive(Debug, Clone, Deserialize)]
pub struct VaccinationRecord {
	#[serde(rename = "data", deserialize_with = "flexible_date")]
	pub date: NaiveDate,
	#[serde(rename = "municipio")]
	pub municipality: SmartString,
	#[serde(rename = "doses_recebidas", default, deserialize_with = "count_opt")]
	pub doses_received: Option<u64>,
	#[serde(rename = "1a_dose", default, deserialize_with = "count_opt")]
	pub first_dose: Option<u64>,
	#[serde(rename = "2a_dose", default, deserialize_with = "count_opt")]
	pub second_dose: Option<u64>,
	#[serde(rename = "populacao", default, deserialize_with = "count_opt")]
	pub population: Option<u64>,
}

impl VaccinationRecord {
	pub fn counts(&self) -> VaccinationCounts {
		VaccinationCounts{
			first_dose: self.first_dose,
			second_dose: self.second_dose,
			doses_received: self.doses_received,
			population: self.population,
		}
	}
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VaccinationDay {
	pub date: NaiveDate,
	pub first_dose: u64,
	pub second_dose: u64,
	pub total_doses: u64,
	pub doses_received: Option<u64>,
	pub population: Option<u64>,
	pub pct_first_dose: Option<f64>,
	pub pct_second_dose: Option<f64>,
	pub pct_applied: Option<f64>,
	/// Doses applied since the previous report. Negative when the feed
	/// corrected itself downwards.
	pub daily_applied: i64,
}


fn ratio_pct(part: u64, whole: Option<u64>) -> Option<f64> {
	match whole {
		Some(whole) if whole > 0 => Some(part as f64 / whole as f64 * 100.0),
		_ => None,
	}
}

/// Turn the cumulative counters of one geography into per-day figures.
///
/// Days without a delivery count reuse the last non-zero count seen before
/// them. The first day counts all of its doses as applied that day.
pub fn derive_vaccination(observations: &[(NaiveDate, VaccinationCounts)]) -> Vec<VaccinationDay> {
	let mut sorted = observations.to_vec();
	sorted.sort_by_key(|(date, _)| *date);

	let mut result: Vec<VaccinationDay> = Vec::with_capacity(sorted.len());
	let mut last_received: Option<u64> = None;
	for (date, counts) in sorted {
		let first_dose = counts.first_dose.unwrap_or(0);
		let second_dose = counts.second_dose.unwrap_or(0);
		let total_doses = first_dose + second_dose;
		let doses_received = match counts.doses_received {
			Some(n) if n > 0 => {
				last_received = Some(n);
				Some(n)
			},
			_ => last_received,
		};
		let daily_applied = match result.last() {
			Some(prev) => signed_delta(total_doses, prev.total_doses),
			None => total_doses as i64,
		};
		result.push(VaccinationDay{
			date,
			first_dose,
			second_dose,
			total_doses,
			doses_received,
			population: counts.population,
			pct_first_dose: ratio_pct(first_dose, counts.population),
			pct_second_dose: ratio_pct(second_dose, counts.population),
			pct_applied: ratio_pct(total_doses, doses_received),
			daily_applied,
		});
	}
	result
}


/// Fill the days on which `total` has no row with the sum of every other
/// key.
///
/// Synthesized days take `population` when it is given, since the sum of
/// the reporting municipalities can undercount the state.
pub fn synthesize_total(series: &mut TimeSeries<SmartString, VaccinationCounts>, total: &str, population: Option<u64>) {
	let total = vaccination_key(total);
	let members: Vec<SmartString> = series.keys().filter(|k| **k != total).cloned().collect();
	let existing: HashSet<NaiveDate> = match series.get(&total) {
		Some(ts) => ts.iter().map(|(date, _)| *date).collect(),
		None => HashSet::new(),
	};
	let member_refs: Vec<&SmartString> = members.iter().collect();
	series.synthesize(&member_refs[..], total.clone());

	if population.is_none() {
		return
	}
	if let Some(ts) = series.get_mut(&total) {
		for (date, counts) in ts.iter_mut() {
			if !existing.contains(&*date) {
				counts.population = population;
			}
		}
	}
}
