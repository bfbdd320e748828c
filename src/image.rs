//! Image loader.
//!
//! An image is a text file of signed decimal integers separated by commas
//! and/or whitespace, produced by the Forth cross-compiler. Values are
//! stored from cell 0 upward; the count becomes the machine's load size.

use std::fs;
use std::path::Path;

use crate::core::{VmError, VmResult, MEMORY_SIZE};

/// Load an image file into a cell vector.
pub fn load_image(path: &Path) -> VmResult<Vec<u16>> {
    let text = fs::read_to_string(path).map_err(|source| VmError::ImageRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_image(&text)
}

/// Parse image text into cells. Each value must fit in `-32768..=32767`
/// and is stored as its two's-complement 16-bit representation. Anything
/// between values other than commas and whitespace is an error.
///
/// An image with more values than the machine has cells keeps loading:
/// the store index wraps modulo the memory size, overwriting cells from
/// the bottom up. The returned vector never exceeds one full address
/// space, so the load size is the cell count after wrapping.
pub fn parse_image(text: &str) -> VmResult<Vec<u16>> {
    let mut cells = Vec::new();
    let mut position = 0usize;
    for token in text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        let value: i64 = token.parse().map_err(|_| VmError::ImageToken {
            position,
            token: token.to_string(),
        })?;
        if !(i64::from(i16::MIN)..=i64::from(i16::MAX)).contains(&value) {
            return Err(VmError::ImageRange { position, value });
        }
        if position < MEMORY_SIZE {
            cells.push(value as i16 as u16);
        } else {
            cells[position % MEMORY_SIZE] = value as i16 as u16;
        }
        position += 1;
    }
    Ok(cells)
}
