use serde::Deserialize;

use smartstring::alias::{String as SmartString};

use chrono::NaiveDate;

use super::error::Result;
use super::sources::{flexible_date, percent};
use super::timeseries::TimeSeries;


const LOWERCASE_PARTICLES: [&str; 5] = ["da", "de", "do", "das", "dos"];


/// Title-case a municipality name, keeping the Portuguese contractions
/// between words in lower case ("SÃO JOSÉ DOS CAMPOS" -> "São José dos Campos").
pub fn normalize_municipality(name: &str) -> SmartString {
	let mut titled = String::with_capacity(name.len());
	let mut in_word = false;
	for ch in name.trim().chars() {
		if ch.is_alphabetic() {
			if in_word {
				titled.extend(ch.to_lowercase());
			} else {
				titled.extend(ch.to_uppercase());
			}
			in_word = true;
		} else {
			titled.push(ch);
			in_word = false;
		}
	}

	let words: Vec<&str> = titled.split(' ').collect();
	let last = words.len().saturating_sub(1);
	let mut result = String::with_capacity(titled.len());
	for (i, word) in words.iter().enumerate() {
		if i > 0 {
			result.push(' ');
		}
		let lower = word.to_lowercase();
		if i > 0 && i < last && LOWERCASE_PARTICLES.contains(&lower.as_str()) {
			result.push_str(&lower);
		} else {
			result.push_str(word);
		}
	}
	result.into()
}


#[derive(Debug, Clone, Deserialize)]
pub struct IsolationRecord {
	#[serde(rename = "município", alias = "municipio")]
	pub municipality: SmartString,
	#[serde(rename = "data", deserialize_with = "flexible_date")]
	pub date: NaiveDate,
	#[serde(rename = "isolamento", deserialize_with = "percent")]
	pub index_pct: f64,
}


/// Index the records by normalized municipality name.
pub fn isolation_series(records: &[IsolationRecord]) -> Result<TimeSeries<SmartString, f64>> {
	TimeSeries::from_records(records.iter().map(|rec| {
		(normalize_municipality(&rec.municipality), rec.date, rec.index_pct)
	}))
}

pub fn isolation_points(series: &TimeSeries<SmartString, f64>, municipality: &str) -> Option<Vec<(NaiveDate, Option<f64>)>> {
	let ts = series.get(&normalize_municipality(municipality))?;
	Some(ts.iter().map(|(date, v)| (*date, Some(*v))).collect())
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn contractions_stay_lowercase() {
		assert_eq!(normalize_municipality("SÃO JOSÉ DOS CAMPOS"), "São José dos Campos");
		assert_eq!(normalize_municipality("santa bárbara d'oeste"), "Santa Bárbara D'Oeste");
		assert_eq!(normalize_municipality("ESTADO DE SÃO PAULO"), "Estado de São Paulo");
		assert_eq!(normalize_municipality("  são paulo "), "São Paulo");
	}

	#[test]
	fn leading_and_trailing_particles_are_titled() {
		assert_eq!(normalize_municipality("DO LADO DA"), "Do Lado Da");
	}

	#[test]
	fn series_is_keyed_by_normalized_name() {
		let d = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap();
		let records = vec![
			IsolationRecord{municipality: "SÃO PAULO".into(), date: d, index_pct: 47.0},
			IsolationRecord{municipality: "Estado de São Paulo".into(), date: d, index_pct: 45.0},
		];
		let series = isolation_series(&records).unwrap();
		assert_eq!(isolation_points(&series, "são paulo").unwrap(), vec![(d, Some(47.0))]);
		assert_eq!(isolation_points(&series, "ESTADO DE SÃO PAULO").unwrap(), vec![(d, Some(45.0))]);
		assert!(isolation_points(&series, "Campinas").is_none());
	}
}
