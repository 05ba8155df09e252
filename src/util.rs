use crate::error::{CropResizeError, Result};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use std::fs::{File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path};

/// Writes `data` as raw little-endian `f32`s.
pub fn dump_to_file(path: &Path, data: &[f32]) -> Result<()> {
  let mut writer = BufWriter::new(File::create(path)?);
  write_f32s(&mut writer, data)?;
  writer.flush()?;
  Ok(())
}

/// Reads a file written by `dump_to_file`.
pub fn load_from_file(path: &Path) -> Result<Vec<f32>> {
  let file = File::open(path)?;
  let nbytes = file.metadata()?.len();
  if nbytes % 4 != 0 {
    return Err(CropResizeError::InvalidDim(format!(
        "{}: {} bytes is not a whole number of f32s", path.display(), nbytes)));
  }
  let len = (nbytes / 4) as usize;
  let mut reader = BufReader::new(file);
  read_f32s(&mut reader, len)
}

pub fn write_f32s<W>(writer: &mut W, data: &[f32]) -> Result<()> where W: Write {
  for &x in data {
    writer.write_f32::<LittleEndian>(x)?;
  }
  Ok(())
}

pub fn read_f32s<R>(reader: &mut R, len: usize) -> Result<Vec<f32>> where R: Read {
  let mut data = vec![0.0; len];
  reader.read_f32_into::<LittleEndian>(&mut data)?;
  Ok(data)
}
