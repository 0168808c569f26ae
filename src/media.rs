//! Header inspection for media files added to a project.

use crate::error::{ProjectError, Result};
use regex::Regex;
use std::io::Cursor;
use std::sync::OnceLock;
use xmltree::Element;

pub const DEFAULT_COSTUME_SVG: &str =
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1" viewBox="0 0 1 1"></svg>"##;
const DEFAULT_SVG_SIZE: f64 = 64.0;
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Rotation centre of an SVG: the middle of its viewBox, or of its
/// `width`/`height` when no viewBox is present.
pub fn svg_rotation_center(data: &[u8], source_name: &str) -> Result<(f64, f64)> {
    let root = Element::parse(Cursor::new(data)).map_err(|e| {
        ProjectError::validation("svg", format!("'{}' is not valid SVG: {}", source_name, e))
    })?;
    let (width, height) = svg_size(&root, source_name)?;
    Ok((width / 2.0, height / 2.0))
}

fn svg_size(root: &Element, source_name: &str) -> Result<(f64, f64)> {
    if let Some(view_box) = root.attributes.get("viewBox") {
        let parts = view_box
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(str::parse::<f64>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| {
                ProjectError::validation(
                    "svg viewBox",
                    format!("'{}' in '{}' is not four numbers", view_box, source_name),
                )
            })?;
        if parts.len() == 4 {
            if parts[2] <= 0.0 || parts[3] <= 0.0 {
                return Err(ProjectError::validation(
                    "svg viewBox",
                    format!("'{}' must have positive width/height in '{}'", view_box, source_name),
                ));
            }
            return Ok((parts[2], parts[3]));
        }
    }
    let width = svg_length(root.attributes.get("width").map(String::as_str));
    let height = svg_length(root.attributes.get("height").map(String::as_str));
    match (width, height) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Ok((DEFAULT_SVG_SIZE, DEFAULT_SVG_SIZE)),
    }
}

/// Leading positive number of an SVG length such as `"64px"` or `"12.5"`.
fn svg_length(value: Option<&str>) -> Option<f64> {
    static LENGTH_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = LENGTH_RE
        .get_or_init(|| Regex::new(r"^\s*\+?(\d+(?:\.\d*)?|\.\d+)").ok())
        .as_ref()?;
    let caps = re.captures(value?)?;
    let n = caps.get(1)?.as_str().parse::<f64>().ok()?;
    (n > 0.0).then_some(n)
}

pub fn png_size(data: &[u8], source_name: &str) -> Result<(u32, u32)> {
    if data.len() < 24 || &data[..8] != PNG_SIGNATURE || &data[12..16] != b"IHDR" {
        return Err(ProjectError::validation(
            "png",
            format!("'{}' does not start with a PNG IHDR header", source_name),
        ));
    }
    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    Ok((width, height))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub rate: u32,
    pub sample_count: u64,
}

/// Reads the sample rate and frame count from a RIFF/WAVE file.
pub fn wav_info(data: &[u8], source_name: &str) -> Result<WavInfo> {
    let invalid = |message: &str| {
        ProjectError::validation("wav", format!("'{}': {}", source_name, message))
    };
    if data.len() < 12 || &data[..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(invalid("missing RIFF/WAVE header"));
    }
    let mut offset = 12usize;
    let mut format: Option<(u32, u16)> = None;
    let mut data_len: Option<u64> = None;
    while offset + 8 <= data.len() {
        let chunk_id = &data[offset..offset + 4];
        let size = u32::from_le_bytes([
            data[offset + 4],
            data[offset + 5],
            data[offset + 6],
            data[offset + 7],
        ]) as usize;
        let body = offset + 8;
        match chunk_id {
            b"fmt " => {
                if body + 14 > data.len() {
                    return Err(invalid("truncated fmt chunk"));
                }
                let rate = u32::from_le_bytes([data[body + 4], data[body + 5], data[body + 6], data[body + 7]]);
                let block_align = u16::from_le_bytes([data[body + 12], data[body + 13]]);
                format = Some((rate, block_align));
            }
            b"data" => data_len = Some(size.min(data.len().saturating_sub(body)) as u64),
            _ => {}
        }
        offset = body + size + (size & 1);
    }
    let (rate, block_align) = format.ok_or_else(|| invalid("missing fmt chunk"))?;
    let data_len = data_len.ok_or_else(|| invalid("missing data chunk"))?;
    if block_align == 0 {
        return Err(invalid("block align is zero"));
    }
    Ok(WavInfo {
        rate,
        sample_count: data_len / u64::from(block_align),
    })
}

#[cfg(test)]
pub(crate) fn test_wav(rate: u32, frames: u32) -> Vec<u8> {
    let data_len = frames * 2;
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&rate.to_le_bytes());
    out.extend_from_slice(&(rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.resize(out.len() + data_len as usize, 0);
    out
}
