use std::io;
use std::io::{Read, Write};
use std::fs;
use std::path::{Path, PathBuf};

use flate2;


fn is_gzip(path: &Path) -> bool {
	match path.extension() {
		Some(x) => x == "gz",
		None => false,
	}
}


pub fn magic_open<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Read>> {
	let path = path.as_ref();
	if is_gzip(path) {
		Ok(Box::new(flate2::read::GzDecoder::new(fs::File::open(path)?)))
	} else {
		Ok(Box::new(fs::File::open(path)?))
	}
}


pub fn magic_create<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Write>> {
	let path = path.as_ref();
	let f = io::BufWriter::new(fs::File::create(path)?);
	if is_gzip(path) {
		Ok(Box::new(flate2::write::GzEncoder::new(f, flate2::Compression::default())))
	} else {
		Ok(Box::new(f))
	}
}


/// `path` if it exists, else `path` with `.gz` appended if that exists.
pub fn find_input<P: AsRef<Path>>(path: P) -> Option<PathBuf> {
	let path = path.as_ref();
	if path.exists() {
		return Some(path.to_path_buf())
	}
	let mut gz = path.as_os_str().to_os_string();
	gz.push(".gz");
	let gz = PathBuf::from(gz);
	if gz.exists() {
		Some(gz)
	} else {
		None
	}
}
