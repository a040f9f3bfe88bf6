use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Serialize, Deserialize};

use smartstring::alias::{String as SmartString};

use enum_map::Enum;

use chrono::NaiveDate;

use super::daily::round2;
use super::sources::{count_opt, flexible_date, float_opt, pt_decimal_opt};


/// One row of the regional health department (DRS) hospitalization feed.
///
/// Values named `*_mm7d` are seven day moving averages; `*_last_day` are
/// the raw figures of the row's date.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HospitalizationRecord {
	#[serde(rename = "datahora", deserialize_with = "flexible_date")]
	pub date: NaiveDate,
	#[serde(rename = "nome_drs")]
	pub drs: SmartString,
	#[serde(rename = "pacientes_uti_mm7d", default, deserialize_with = "pt_decimal_opt")]
	pub icu_patients_mm7d: Option<f64>,
	#[serde(rename = "total_covid_uti_mm7d", default, deserialize_with = "pt_decimal_opt")]
	pub icu_beds_mm7d: Option<f64>,
	#[serde(rename = "ocupacao_leitos", default, deserialize_with = "pt_decimal_opt")]
	pub occupancy_mm7d: Option<f64>,
	#[serde(rename = "pop", default, deserialize_with = "pt_decimal_opt")]
	pub population: Option<f64>,
	#[serde(rename = "leitos_pc", default, deserialize_with = "pt_decimal_opt")]
	pub beds_per_capita: Option<f64>,
	#[serde(rename = "internacoes_7d", default, deserialize_with = "pt_decimal_opt")]
	pub admissions_7d: Option<f64>,
	#[serde(rename = "internacoes_7d_l", default, deserialize_with = "pt_decimal_opt")]
	pub admissions_7d_prev: Option<f64>,
	/// Change of `admissions_7d` against the seven days before, in percent.
	#[serde(rename = "internacoes_7v7", default, deserialize_with = "pt_decimal_opt")]
	pub admissions_trend: Option<f64>,
	#[serde(rename = "pacientes_uti_ultimo_dia", default, deserialize_with = "pt_decimal_opt")]
	pub icu_patients_last_day: Option<f64>,
	#[serde(rename = "total_covid_uti_ultimo_dia", default, deserialize_with = "pt_decimal_opt")]
	pub icu_beds_last_day: Option<f64>,
	#[serde(rename = "ocupacao_leitos_ultimo_dia", default, deserialize_with = "pt_decimal_opt")]
	pub occupancy_last_day: Option<f64>,
}


/// Daily occupancy of the state's COVID beds, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedOccupancyRecord {
	#[serde(rename = "data", deserialize_with = "flexible_date")]
	pub date: NaiveDate,
	#[serde(rename = "sp_uti", default, deserialize_with = "float_opt")]
	pub state_icu: Option<f64>,
	#[serde(rename = "sp_enfermaria", default, deserialize_with = "float_opt")]
	pub state_ward: Option<f64>,
	#[serde(rename = "rmsp_uti", default, deserialize_with = "float_opt")]
	pub metro_icu: Option<f64>,
	#[serde(rename = "rmsp_enfermaria", default, deserialize_with = "float_opt")]
	pub metro_ward: Option<f64>,
}

impl BedOccupancyRecord {
	fn placeholder(date: NaiveDate) -> Self {
		Self{
			date,
			state_icu: None,
			state_ward: None,
			metro_icu: None,
			metro_ward: None,
		}
	}
}


/// Departments that make up the São Paulo metropolitan region.
fn is_metro_drs(name: &str, city_drs: &str) -> bool {
	name.contains("SP") || name == city_drs
}

/// Fill the state bed series from the DRS feed.
///
/// A row is appended for the newest DRS date if the bed series ends
/// earlier. On every date the DRS feed covers, `state_icu` is replaced by
/// the last-day occupancy of `state_drs`, and `metro_icu` is recomputed as
/// the patient share of the metropolitan departments' ICU beds.
pub fn reconcile_bed_occupancy(
		beds: &[BedOccupancyRecord],
		drs: &[HospitalizationRecord],
		state_drs: &str,
		city_drs: &str,
		) -> Vec<BedOccupancyRecord>
{
	let mut result = beds.to_vec();
	result.sort_by_key(|rec| rec.date);

	let last_drs = drs.iter().map(|rec| rec.date).max();
	let last_beds = result.last().map(|rec| rec.date);
	if let Some(last_drs) = last_drs {
		if last_beds.map(|d| last_drs > d).unwrap_or(true) {
			result.push(BedOccupancyRecord::placeholder(last_drs));
		}
	}

	for rec in result.iter_mut() {
		let date = rec.date;
		let same_day = drs.iter().filter(|h| h.date == date);
		let mut patients = 0.0;
		let mut icu_beds = 0.0;
		for h in same_day {
			if h.drs.as_str() == state_drs {
				if let Some(occupancy) = h.occupancy_last_day {
					rec.state_icu = Some(occupancy);
				}
			}
			if is_metro_drs(&h.drs, city_drs) {
				patients += h.icu_patients_last_day.unwrap_or(0.0);
				icu_beds += h.icu_beds_last_day.unwrap_or(0.0);
			}
		}
		if icu_beds > 0.0 {
			rec.metro_icu = Some(round2(patients / icu_beds * 100.0));
		}
	}
	result
}


/// Extract one field of one department as a point list.
pub fn drs_points<F: Fn(&HospitalizationRecord) -> Option<f64>>(
		records: &[HospitalizationRecord],
		drs: &str,
		field: F,
		) -> Vec<(NaiveDate, Option<f64>)>
{
	records.iter()
		.filter(|rec| rec.drs.as_str() == drs)
		.map(|rec| (rec.date, field(rec)))
		.collect()
}


/// The municipal hospital networks reported by the city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
pub enum BedNetwork {
	Public,
	Private,
	/// Both networks together.
	Total,
}

impl BedNetwork {
	pub fn all() -> [BedNetwork; 3] {
		[Self::Public, Self::Private, Self::Total]
	}
}

impl fmt::Display for BedNetwork {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Public => f.write_str("public"),
			Self::Private => f.write_str("private"),
			Self::Total => f.write_str("total"),
		}
	}
}


/// One day of the city's COVID hospital figures for one network.
///
/// The three city files share their layout; only the column suffix
/// (`_publico`, `_privado`, `_total`) differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityBedRecord {
	#[serde(rename = "data", deserialize_with = "flexible_date")]
	pub date: NaiveDate,
	#[serde(rename = "ocupacao_uti_covid", alias = "ocupacao_uti_covid_publico", alias = "ocupacao_uti_covid_privado", alias = "ocupacao_uti_covid_total", default, deserialize_with = "float_opt")]
	pub icu_occupancy: Option<f64>,
	#[serde(rename = "uti_covid", alias = "uti_covid_publico", alias = "uti_covid_privado", alias = "uti_covid_total", default, deserialize_with = "count_opt")]
	pub icu_beds: Option<u64>,
	#[serde(rename = "internados_uti", alias = "internados_uti_publico", alias = "internados_uti_privado", alias = "internados_uti_total", default, deserialize_with = "count_opt")]
	pub icu_patients: Option<u64>,
	#[serde(rename = "ventilacao", alias = "ventilacao_publico", alias = "ventilacao_privado", alias = "ventilacao_total", default, deserialize_with = "count_opt")]
	pub ventilated: Option<u64>,
	#[serde(rename = "internados", alias = "internados_publico", alias = "internados_privado", alias = "internados_total", default, deserialize_with = "count_opt")]
	pub hospitalized: Option<u64>,
	#[serde(rename = "respiratorio", alias = "respiratorio_publico", alias = "respiratorio_privado", alias = "respiratorio_total", default, deserialize_with = "count_opt")]
	pub respiratory: Option<u64>,
	#[serde(rename = "suspeitos", alias = "suspeitos_publico", alias = "suspeitos_privado", alias = "suspeitos_total", default, deserialize_with = "count_opt")]
	pub suspected: Option<u64>,
}

fn sum_opt(a: Option<u64>, b: Option<u64>) -> Option<u64> {
	match (a, b) {
		(Some(a), Some(b)) => Some(a + b),
		_ => None,
	}
}

fn occupancy(patients: Option<u64>, beds: Option<u64>) -> Option<f64> {
	match (patients, beds) {
		(Some(patients), Some(beds)) if beds > 0 => Some(patients as f64 / beds as f64 * 100.0),
		_ => None,
	}
}

impl CityBedRecord {
	/// Both networks of one day. A figure is only summed if both report it.
	fn combined(public: &CityBedRecord, private: &CityBedRecord) -> Self {
		let icu_beds = sum_opt(public.icu_beds, private.icu_beds);
		let icu_patients = sum_opt(public.icu_patients, private.icu_patients);
		Self{
			date: public.date,
			icu_occupancy: occupancy(icu_patients, icu_beds),
			icu_beds,
			icu_patients,
			ventilated: sum_opt(public.ventilated, private.ventilated),
			hospitalized: sum_opt(public.hospitalized, private.hospitalized),
			respiratory: sum_opt(public.respiratory, private.respiratory),
			suspected: sum_opt(public.suspected, private.suspected),
		}
	}
}

/// Build the combined city bed series.
///
/// Days missing from `total` are filled with the sum of `public` and
/// `private` when both networks reported that day. A blank ICU occupancy
/// is derived from patients and beds.
pub fn reconcile_city_beds(
		public: &[CityBedRecord],
		private: &[CityBedRecord],
		total: &[CityBedRecord],
		) -> Vec<CityBedRecord>
{
	let known: HashSet<NaiveDate> = total.iter().map(|rec| rec.date).collect();
	let private: BTreeMap<NaiveDate, &CityBedRecord> = private.iter().map(|rec| (rec.date, rec)).collect();

	let mut result = total.to_vec();
	for rec in public.iter() {
		if known.contains(&rec.date) {
			continue
		}
		if let Some(other) = private.get(&rec.date) {
			result.push(CityBedRecord::combined(rec, other));
		}
	}
	result.sort_by_key(|rec| rec.date);
	result.dedup_by_key(|rec| rec.date);

	for rec in result.iter_mut() {
		if rec.icu_occupancy.is_none() {
			rec.icu_occupancy = occupancy(rec.icu_patients, rec.icu_beds);
		}
	}
	result
}


/// One day of one municipal field hospital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldHospitalRecord {
	#[serde(rename = "data", deserialize_with = "flexible_date")]
	pub date: NaiveDate,
	pub hospital: SmartString,
	#[serde(rename = "comum", default, deserialize_with = "count_opt")]
	pub ward_beds: Option<u64>,
	#[serde(rename = "ocupação_comum", alias = "ocupacao_comum", default, deserialize_with = "count_opt")]
	pub ward_patients: Option<u64>,
	/// Stabilization beds, reported as `uti`.
	#[serde(rename = "uti", default, deserialize_with = "count_opt")]
	pub stabilization_beds: Option<u64>,
	#[serde(rename = "ocupação_uti", alias = "ocupacao_uti", default, deserialize_with = "count_opt")]
	pub stabilization_patients: Option<u64>,
	#[serde(rename = "altas", default, deserialize_with = "count_opt")]
	pub discharges: Option<u64>,
	#[serde(rename = "óbitos", alias = "obitos", default, deserialize_with = "count_opt")]
	pub deaths: Option<u64>,
	#[serde(rename = "transferidos", default, deserialize_with = "count_opt")]
	pub transferred: Option<u64>,
	#[serde(rename = "chegando", default, deserialize_with = "count_opt")]
	pub arriving: Option<u64>,
}

impl FieldHospitalRecord {
	pub fn ward_occupancy(&self) -> Option<f64> {
		occupancy(self.ward_patients, self.ward_beds)
	}

	pub fn stabilization_occupancy(&self) -> Option<f64> {
		occupancy(self.stabilization_patients, self.stabilization_beds)
	}
}

/// The newest record of every field hospital up to `last`, ordered by
/// hospital name.
pub fn latest_field_hospitals(records: &[FieldHospitalRecord], last: NaiveDate) -> Vec<FieldHospitalRecord> {
	let mut latest: BTreeMap<&str, &FieldHospitalRecord> = BTreeMap::new();
	for rec in records.iter().filter(|rec| rec.date <= last) {
		let entry = latest.entry(rec.hospital.as_str()).or_insert(rec);
		if rec.date > entry.date {
			*entry = rec;
		}
	}
	latest.into_iter().map(|(_, rec)| rec.clone()).collect()
}
