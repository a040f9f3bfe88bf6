use enum_map::EnumMap;

use super::table::WideWeeklyTable;
use super::weekly::Metric;


/// Rendering of a variation that cannot be computed.
pub const UNAVAILABLE: &str = "indisponível";


/// Relative change in percent. Undefined unless both values are present
/// and the previous one is positive.
pub fn pct_change(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
	match (current, previous) {
		(Some(cur), Some(prev)) if prev > 0.0 => Some((cur / prev - 1.0) * 100.0),
		_ => None,
	}
}

/// Fill in the week-over-week variations of every row.
///
/// Each row is compared with the row before it in the table. The first row
/// has no variations.
pub fn compute_variations(mut table: WideWeeklyTable) -> WideWeeklyTable {
	let rows = table.rows_mut();
	for row in rows.iter_mut() {
		row.variations = EnumMap::default();
	}
	for i in 1..rows.len() {
		let (before, after) = rows.split_at_mut(i);
		let prev = &before[i - 1];
		let cur = &mut after[0];
		for metric in Metric::all().iter().filter(|m| m.has_variation()) {
			cur.variations[*metric] = pct_change(cur.values[*metric], prev.values[*metric]);
		}
	}
	table
}


/// `+12.5%`, `-3.0%` or [`UNAVAILABLE`].
pub fn format_variation(v: Option<f64>) -> String {
	match v {
		Some(v) => format!("{:+.1}%", v),
		None => UNAVAILABLE.into(),
	}
}

/// Like [`format_variation`] with a decimal comma.
pub fn format_variation_pt(v: Option<f64>) -> String {
	match v {
		Some(_) => format_variation(v).replace('.', ","),
		None => UNAVAILABLE.into(),
	}
}
