use std::env;
use std::path::PathBuf;

use enum_map::{enum_map, EnumMap};

use smartstring::alias::{String as SmartString};

use super::daily::Geography;
use super::error::{Error, Result};
use super::weekly::{AggregateOptions, ZeroWeeks, MAX_LAG_DAYS};


/// How a geography is called in each upstream feed.
#[derive(Debug, Clone)]
pub struct GeographyNames {
	/// `nome_munic` in the municipality bulletin. Unused for the state,
	/// which has a feed of its own.
	pub municipality: SmartString,
	pub isolation: SmartString,
	pub drs: SmartString,
	pub vaccination: SmartString,
}

impl GeographyNames {
	pub fn default_for(geography: Geography) -> Self {
		match geography {
			Geography::City => Self{
				municipality: "São Paulo".into(),
				isolation: "São Paulo".into(),
				drs: "Município de São Paulo".into(),
				vaccination: "SAO PAULO".into(),
			},
			Geography::State => Self{
				municipality: "Estado de São Paulo".into(),
				isolation: "Estado de São Paulo".into(),
				drs: "Estado de São Paulo".into(),
				vaccination: "ESTADO DE SAO PAULO".into(),
			},
		}
	}
}


#[derive(Debug, Clone)]
pub struct Config {
	pub data_dir: PathBuf,
	pub output_dir: PathBuf,
	pub aggregate: AggregateOptions,
	pub names: EnumMap<Geography, GeographyNames>,
}

impl Config {
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| env::var(key).ok())
	}

	pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
		let data_dir = lookup("COVIDSP_DATA_DIR").unwrap_or_else(|| "dados".into());
		let output_dir = lookup("COVIDSP_OUTPUT_DIR").unwrap_or_else(|| data_dir.clone());
		let zero_weeks = match lookup("COVIDSP_ZERO_WEEKS") {
			Some(s) => s.parse::<ZeroWeeks>()?,
			None => ZeroWeeks::default(),
		};
		let isolation_lag_days = match lookup("COVIDSP_ISOLATION_LAG_DAYS") {
			Some(s) => {
				let days = s.trim().parse::<i64>().map_err(|e| {
					Error::Config(format!("COVIDSP_ISOLATION_LAG_DAYS={:?}: {}", s, e))
				})?;
				if days < 0 || days > MAX_LAG_DAYS {
					return Err(Error::Config(format!(
						"COVIDSP_ISOLATION_LAG_DAYS={:?}: must be between 0 and {}", s, MAX_LAG_DAYS,
					)))
				}
				days
			},
			None => AggregateOptions::default().isolation_lag_days,
		};
		Ok(Self{
			data_dir: data_dir.into(),
			output_dir: output_dir.into(),
			aggregate: AggregateOptions{
				zero_weeks,
				isolation_lag_days,
			},
			names: enum_map! {
				Geography::City => GeographyNames::default_for(Geography::City),
				Geography::State => GeographyNames::default_for(Geography::State),
			},
		})
	}
}

impl Default for Config {
	fn default() -> Self {
		Self{
			data_dir: "dados".into(),
			output_dir: "dados".into(),
			aggregate: AggregateOptions::default(),
			names: enum_map! {
				Geography::City => GeographyNames::default_for(Geography::City),
				Geography::State => GeographyNames::default_for(Geography::State),
			},
		}
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	use std::collections::HashMap;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
		move |key| vars.get(key).cloned()
	}

	#[test]
	fn defaults() {
		let config = Config::from_lookup(lookup(&[])).unwrap();
		assert_eq!(config.data_dir, PathBuf::from("dados"));
		assert_eq!(config.output_dir, PathBuf::from("dados"));
		assert_eq!(config.aggregate.zero_weeks, ZeroWeeks::AsMissing);
		assert_eq!(config.aggregate.isolation_lag_days, 14);
		assert_eq!(config.names[Geography::City].drs, "Município de São Paulo");
	}

	#[test]
	fn overrides() {
		let config = Config::from_lookup(lookup(&[
			("COVIDSP_DATA_DIR", "/srv/in"),
			("COVIDSP_OUTPUT_DIR", "/srv/out"),
			("COVIDSP_ZERO_WEEKS", "keep"),
			("COVIDSP_ISOLATION_LAG_DAYS", "7"),
		])).unwrap();
		assert_eq!(config.data_dir, PathBuf::from("/srv/in"));
		assert_eq!(config.output_dir, PathBuf::from("/srv/out"));
		assert_eq!(config.aggregate.zero_weeks, ZeroWeeks::Keep);
		assert_eq!(config.aggregate.isolation_lag_days, 7);
	}

	#[test]
	fn bad_values_are_config_errors() {
		match Config::from_lookup(lookup(&[("COVIDSP_ISOLATION_LAG_DAYS", "two weeks")])) {
			Err(Error::Config(_)) => (),
			other => panic!("unexpected {:?}", other.map(|_| ())),
		}
		assert!(Config::from_lookup(lookup(&[("COVIDSP_ZERO_WEEKS", "zero")])).is_err());
	}

	#[test]
	fn lag_outside_range_is_rejected() {
		for value in ["-7", "367", "9223372036854775807"].iter() {
			match Config::from_lookup(lookup(&[("COVIDSP_ISOLATION_LAG_DAYS", value)])) {
				Err(Error::Config(_)) => (),
				other => panic!("{}: unexpected {:?}", value, other.map(|_| ())),
			}
		}
		let config = Config::from_lookup(lookup(&[("COVIDSP_ISOLATION_LAG_DAYS", "0")])).unwrap();
		assert_eq!(config.aggregate.isolation_lag_days, 0);
		let config = Config::from_lookup(lookup(&[("COVIDSP_ISOLATION_LAG_DAYS", "366")])).unwrap();
		assert_eq!(config.aggregate.isolation_lag_days, 366);
	}
}
