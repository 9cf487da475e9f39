// THEORY:
// `mat_file` is a reader for MATLAB Level-5 MAT files, the format MATLAB writes
// with `save` (both the uncompressed v6 layout and the zlib-compressed v7 layout).
// It turns a file into a `MatContainer`: the header plus an ordered list of named
// variables, in the order they appear in the file.
//
// Layout of a Level-5 file:
// 1.  **Header**: 128 bytes. 116 bytes of descriptive text, an 8-byte subsystem
//     offset, a 2-byte version and a 2-byte endian indicator (`IM` when the file
//     was written little-endian, `MI` when big-endian).
// 2.  **Data Elements**: a sequence of tagged elements. A tag is normally 8 bytes
//     (type, byte count) followed by the payload padded to 8 bytes. When the
//     upper half of the first word is non-zero the element is "small": type and
//     byte count share the first word and up to 4 payload bytes follow inline.
// 3.  **Matrices**: each variable is an `miMATRIX` element whose payload is itself
//     a sequence of sub-elements: array flags, dimensions, name, then the real
//     (and optionally imaginary) data. Data is stored column-major.
// 4.  **Compression**: an `miCOMPRESSED` element wraps a zlib stream that inflates
//     to one or more ordinary elements. Compression never nests, and the total
//     inflated size of a file is capped so a small file cannot demand unbounded
//     memory.
//
// Only numeric and logical payloads are decoded. Cells, structs, objects, char
// arrays and sparse matrices are still listed by name so callers see every
// variable in the file, but their contents are skipped.

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;
use thiserror::Error;
use tracing::debug;

const HEADER_LEN: usize = 128;
const HEADER_TEXT_LEN: usize = 116;

/// Default ceiling on the total size compressed elements of one file may
/// inflate to.
pub const MAX_INFLATED_LEN: u64 = 256 * 1024 * 1024;

const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_INT64: u32 = 12;
const MI_UINT64: u32 = 13;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;
const MI_UTF8: u32 = 16;

const FLAG_COMPLEX: u8 = 0x08;
const FLAG_GLOBAL: u8 = 0x04;
const FLAG_LOGICAL: u8 = 0x02;

#[derive(Debug, Error)]
pub enum MatError {
    #[error("failed to read MAT file: {0}")]
    Io(#[from] std::io::Error),
    #[error("file is too short to hold a MAT header ({0} bytes)")]
    TooShort(usize),
    #[error("not a Level-5 MAT file (endian indicator {0:?})")]
    NotLevel5([u8; 2]),
    #[error("MAT v7.3 (HDF5) files are not supported")]
    Hdf5Unsupported,
    #[error("truncated data element at byte {offset}")]
    Truncated { offset: usize },
    #[error("failed to inflate compressed element: {0}")]
    Inflate(#[source] std::io::Error),
    #[error("compressed data inflates past the {limit}-byte limit")]
    InflateLimit { limit: u64 },
    #[error("malformed matrix element: {0}")]
    Malformed(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn u16(self, b: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes(b),
            ByteOrder::Big => u16::from_be_bytes(b),
        }
    }

    fn u32(self, b: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(b),
            ByteOrder::Big => u32::from_be_bytes(b),
        }
    }

    fn u64(self, b: [u8; 8]) -> u64 {
        match self {
            ByteOrder::Little => u64::from_le_bytes(b),
            ByteOrder::Big => u64::from_be_bytes(b),
        }
    }
}

/// MATLAB array class, from the low byte of the array flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatClass {
    Cell,
    Struct,
    Object,
    Char,
    Sparse,
    Double,
    Single,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Unknown(u8),
}

impl MatClass {
    fn from_code(code: u8) -> Self {
        match code {
            1 => MatClass::Cell,
            2 => MatClass::Struct,
            3 => MatClass::Object,
            4 => MatClass::Char,
            5 => MatClass::Sparse,
            6 => MatClass::Double,
            7 => MatClass::Single,
            8 => MatClass::Int8,
            9 => MatClass::UInt8,
            10 => MatClass::Int16,
            11 => MatClass::UInt16,
            12 => MatClass::Int32,
            13 => MatClass::UInt32,
            14 => MatClass::Int64,
            15 => MatClass::UInt64,
            other => MatClass::Unknown(other),
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            MatClass::Double
                | MatClass::Single
                | MatClass::Int8
                | MatClass::UInt8
                | MatClass::Int16
                | MatClass::UInt16
                | MatClass::Int32
                | MatClass::UInt32
                | MatClass::Int64
                | MatClass::UInt64
        )
    }
}

impl fmt::Display for MatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatClass::Unknown(code) => write!(f, "class {code}"),
            other => write!(f, "{}", format!("{other:?}").to_lowercase()),
        }
    }
}

/// Decoded element values, widened to the largest type of their family.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericData {
    Int(Vec<i64>),
    UInt(Vec<u64>),
    Float(Vec<f64>),
}

impl NumericData {
    pub fn len(&self) -> usize {
        match self {
            NumericData::Int(v) => v.len(),
            NumericData::UInt(v) => v.len(),
            NumericData::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Narrows every element to a byte: integers wrap modulo 256, floats are
    /// truncated toward zero and then wrap modulo 256 at any magnitude. NaN and
    /// the infinities become 0.
    pub fn to_u8_wrapping(&self) -> Vec<u8> {
        match self {
            NumericData::Int(v) => v.iter().map(|&x| x as u8).collect(),
            NumericData::UInt(v) => v.iter().map(|&x| x as u8).collect(),
            NumericData::Float(v) => v
                .iter()
                .map(|&x| {
                    if x.is_finite() {
                        x.trunc().rem_euclid(256.0) as u8
                    } else {
                        0
                    }
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatPayload {
    /// Real part of a numeric or logical array, column-major.
    Numeric(NumericData),
    /// A variable whose contents this reader does not decode.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatVariable {
    pub name: String,
    pub class: MatClass,
    pub dims: Vec<usize>,
    pub complex: bool,
    pub global: bool,
    pub logical: bool,
    pub payload: MatPayload,
}

impl MatVariable {
    /// Names starting with a double underscore are metadata, not data.
    pub fn is_metadata(&self) -> bool {
        self.name.starts_with("__")
    }

    /// `(rows, cols)` when the variable is a 2-D array, allowing trailing
    /// singleton dimensions.
    pub fn shape_2d(&self) -> Option<(usize, usize)> {
        match self.dims.as_slice() {
            [] => None,
            [n] => Some((*n, 1)),
            [rows, cols, rest @ ..] if rest.iter().all(|&d| d == 1) => Some((*rows, *cols)),
            _ => None,
        }
    }

    /// Numeric or logical, non-empty, and image-shaped.
    pub fn is_array_valued(&self) -> bool {
        match &self.payload {
            MatPayload::Numeric(data) => {
                !data.is_empty()
                    && self
                        .shape_2d()
                        .is_some_and(|(rows, cols)| rows * cols == data.len())
            }
            MatPayload::Skipped => false,
        }
    }

    pub fn numeric(&self) -> Option<&NumericData> {
        match &self.payload {
            MatPayload::Numeric(data) => Some(data),
            MatPayload::Skipped => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatHeader {
    pub description: String,
    pub version: u16,
    pub byte_order: ByteOrder,
}

/// A loaded MAT file: header and variables in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct MatContainer {
    pub header: MatHeader,
    pub variables: Vec<MatVariable>,
}

impl MatContainer {
    pub fn open(path: &Path) -> Result<Self, MatError> {
        Self::open_with_limit(path, MAX_INFLATED_LEN)
    }

    pub fn open_with_limit(path: &Path, max_inflated: u64) -> Result<Self, MatError> {
        let bytes = fs::read(path)?;
        let container = Self::from_bytes_with_limit(&bytes, max_inflated)?;
        debug!(
            path = %path.display(),
            variables = container.variables.len(),
            "loaded MAT container"
        );
        Ok(container)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MatError> {
        Self::from_bytes_with_limit(bytes, MAX_INFLATED_LEN)
    }

    /// Like `from_bytes`, failing with `MatError::InflateLimit` once compressed
    /// elements inflate to more than `max_inflated` bytes in total.
    pub fn from_bytes_with_limit(bytes: &[u8], max_inflated: u64) -> Result<Self, MatError> {
        if bytes.len() < HEADER_LEN {
            return Err(MatError::TooShort(bytes.len()));
        }
        let text = &bytes[..HEADER_TEXT_LEN];
        if text.starts_with(b"MATLAB 7.3") {
            return Err(MatError::Hdf5Unsupported);
        }
        let indicator = [bytes[126], bytes[127]];
        let byte_order = match &indicator {
            b"IM" => ByteOrder::Little,
            b"MI" => ByteOrder::Big,
            _ => return Err(MatError::NotLevel5(indicator)),
        };
        let description = String::from_utf8_lossy(text)
            .trim_end_matches(['\0', ' '])
            .to_string();
        let header = MatHeader {
            description,
            version: byte_order.u16([bytes[124], bytes[125]]),
            byte_order,
        };

        let mut variables = Vec::new();
        read_top_level(&bytes[HEADER_LEN..], byte_order, max_inflated, &mut variables)?;
        Ok(Self { header, variables })
    }

    /// Non-metadata variables, in file order.
    pub fn usable(&self) -> impl Iterator<Item = &MatVariable> {
        self.variables.iter().filter(|v| !v.is_metadata())
    }

    pub fn usable_names(&self) -> Vec<String> {
        self.usable().map(|v| v.name.clone()).collect()
    }

    /// The first non-metadata variable that holds an image-shaped array.
    pub fn first_array(&self) -> Option<&MatVariable> {
        self.usable().find(|v| v.is_array_valued())
    }
}

struct Element<'a> {
    kind: u32,
    data: &'a [u8],
}

/// Reads one element starting at `*pos`, advancing past it and its padding.
fn next_element<'a>(
    buf: &'a [u8],
    pos: &mut usize,
    order: ByteOrder,
) -> Result<Element<'a>, MatError> {
    let start = *pos;
    let word = |at: usize| -> Result<u32, MatError> {
        let bytes = buf
            .get(at..at + 4)
            .ok_or(MatError::Truncated { offset: start })?;
        Ok(order.u32([bytes[0], bytes[1], bytes[2], bytes[3]]))
    };

    let first = word(start)?;
    let small_len = (first >> 16) as usize;
    if small_len != 0 {
        if small_len > 4 {
            return Err(MatError::Malformed("small element longer than 4 bytes"));
        }
        let data = buf
            .get(start + 4..start + 4 + small_len)
            .ok_or(MatError::Truncated { offset: start })?;
        *pos = start + 8;
        return Ok(Element {
            kind: first & 0xffff,
            data,
        });
    }

    let len = word(start + 4)? as usize;
    let body = start + 8;
    let data = buf
        .get(body..body + len)
        .ok_or(MatError::Truncated { offset: start })?;
    // Compressed elements are not padded.
    *pos = if first == MI_COMPRESSED {
        body + len
    } else {
        body + len.div_ceil(8) * 8
    };
    Ok(Element { kind: first, data })
}

fn read_top_level(
    buf: &[u8],
    order: ByteOrder,
    max_inflated: u64,
    out: &mut Vec<MatVariable>,
) -> Result<(), MatError> {
    let mut budget = InflateBudget {
        limit: max_inflated,
        remaining: max_inflated,
    };
    let mut pos = 0;
    while let Some(element) = next_top_level(buf, &mut pos, order)? {
        if element.kind != MI_COMPRESSED {
            push_element(element, order, out)?;
            continue;
        }
        let inflated = budget.inflate(element.data)?;
        let mut inner_pos = 0;
        while let Some(inner) = next_top_level(&inflated, &mut inner_pos, order)? {
            if inner.kind == MI_COMPRESSED {
                return Err(MatError::Malformed("nested compressed element"));
            }
            push_element(inner, order, out)?;
        }
    }
    Ok(())
}

fn next_top_level<'a>(
    buf: &'a [u8],
    pos: &mut usize,
    order: ByteOrder,
) -> Result<Option<Element<'a>>, MatError> {
    if *pos >= buf.len() {
        return Ok(None);
    }
    // Some writers pad the end of the file with fewer than 8 zero bytes.
    if buf.len() - *pos < 8 && buf[*pos..].iter().all(|&b| b == 0) {
        return Ok(None);
    }
    next_element(buf, pos, order).map(Some)
}

fn push_element(
    element: Element<'_>,
    order: ByteOrder,
    out: &mut Vec<MatVariable>,
) -> Result<(), MatError> {
    match element.kind {
        MI_MATRIX if !element.data.is_empty() => out.push(parse_matrix(element.data, order)?),
        MI_MATRIX => {}
        other => debug!(kind = other, "skipping top-level MAT element"),
    }
    Ok(())
}

/// Bytes all compressed elements of one file may still inflate to.
struct InflateBudget {
    limit: u64,
    remaining: u64,
}

impl InflateBudget {
    fn inflate(&mut self, data: &[u8]) -> Result<Vec<u8>, MatError> {
        let mut inflated = Vec::new();
        ZlibDecoder::new(data)
            .take(self.remaining.saturating_add(1))
            .read_to_end(&mut inflated)
            .map_err(MatError::Inflate)?;
        let len = inflated.len() as u64;
        if len > self.remaining {
            return Err(MatError::InflateLimit { limit: self.limit });
        }
        self.remaining -= len;
        Ok(inflated)
    }
}

fn parse_matrix(buf: &[u8], order: ByteOrder) -> Result<MatVariable, MatError> {
    let mut pos = 0;

    let flags = next_element(buf, &mut pos, order)?;
    if flags.kind != MI_UINT32 || flags.data.len() < 8 {
        return Err(MatError::Malformed("array flags"));
    }
    let flag_word = order.u32([flags.data[0], flags.data[1], flags.data[2], flags.data[3]]);
    let class = MatClass::from_code((flag_word & 0xff) as u8);
    let flag_bits = ((flag_word >> 8) & 0xff) as u8;

    let dims_el = next_element(buf, &mut pos, order)?;
    if dims_el.kind != MI_INT32 {
        return Err(MatError::Malformed("dimensions"));
    }
    let dims = decode(dims_el.kind, dims_el.data, order)?
        .to_dims()
        .ok_or(MatError::Malformed("negative dimension"))?;

    let name_el = next_element(buf, &mut pos, order)?;
    if name_el.kind != MI_INT8 && name_el.kind != MI_UTF8 {
        return Err(MatError::Malformed("array name"));
    }
    let name = String::from_utf8_lossy(name_el.data).into_owned();

    let logical = flag_bits & FLAG_LOGICAL != 0;
    let payload = if class.is_numeric() {
        let real = next_element(buf, &mut pos, order)?;
        MatPayload::Numeric(decode(real.kind, real.data, order)?)
    } else {
        MatPayload::Skipped
    };

    Ok(MatVariable {
        name,
        class,
        dims,
        complex: flag_bits & FLAG_COMPLEX != 0,
        global: flag_bits & FLAG_GLOBAL != 0,
        logical,
        payload,
    })
}

impl NumericData {
    fn to_dims(&self) -> Option<Vec<usize>> {
        match self {
            NumericData::Int(v) => v.iter().map(|&d| usize::try_from(d).ok()).collect(),
            NumericData::UInt(v) => v.iter().map(|&d| usize::try_from(d).ok()).collect(),
            NumericData::Float(_) => None,
        }
    }
}

fn decode(kind: u32, data: &[u8], order: ByteOrder) -> Result<NumericData, MatError> {
    fn chunks<const N: usize>(data: &[u8]) -> impl Iterator<Item = [u8; N]> + '_ {
        data.chunks_exact(N).map(|c| {
            let mut arr = [0u8; N];
            arr.copy_from_slice(c);
            arr
        })
    }

    let decoded = match kind {
        MI_INT8 => NumericData::Int(data.iter().map(|&b| b as i8 as i64).collect()),
        MI_UINT8 => NumericData::UInt(data.iter().map(|&b| b as u64).collect()),
        MI_INT16 => NumericData::Int(chunks::<2>(data).map(|b| order.u16(b) as i16 as i64).collect()),
        MI_UINT16 => NumericData::UInt(chunks::<2>(data).map(|b| order.u16(b) as u64).collect()),
        MI_INT32 => NumericData::Int(chunks::<4>(data).map(|b| order.u32(b) as i32 as i64).collect()),
        MI_UINT32 => NumericData::UInt(chunks::<4>(data).map(|b| order.u32(b) as u64).collect()),
        MI_INT64 => NumericData::Int(chunks::<8>(data).map(|b| order.u64(b) as i64).collect()),
        MI_UINT64 => NumericData::UInt(chunks::<8>(data).map(|b| order.u64(b)).collect()),
        MI_SINGLE => NumericData::Float(
            chunks::<4>(data)
                .map(|b| f32::from_bits(order.u32(b)) as f64)
                .collect(),
        ),
        MI_DOUBLE => NumericData::Float(
            chunks::<8>(data)
                .map(|b| f64::from_bits(order.u64(b)))
                .collect(),
        ),
        _ => return Err(MatError::Malformed("unsupported numeric storage type")),
    };
    Ok(decoded)
}
