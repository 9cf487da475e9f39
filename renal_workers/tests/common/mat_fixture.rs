// Builds MATLAB Level-5 files in memory, little-endian.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;

pub const MI_INT8: u32 = 1;
pub const MI_UINT8: u32 = 2;
pub const MI_INT32: u32 = 5;
pub const MI_UINT32: u32 = 6;
pub const MI_DOUBLE: u32 = 9;
pub const MI_MATRIX: u32 = 14;
pub const MI_COMPRESSED: u32 = 15;
pub const MI_UTF16: u32 = 17;

pub const CLASS_CHAR: u8 = 4;
pub const CLASS_DOUBLE: u8 = 6;
pub const CLASS_UINT8: u8 = 9;

pub struct MatBuilder {
    bytes: Vec<u8>,
}

impl Default for MatBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MatBuilder {
    pub fn new() -> Self {
        let mut bytes = vec![b' '; 128];
        let text = b"MATLAB 5.0 MAT-file, Platform: test";
        bytes[..text.len()].copy_from_slice(text);
        bytes[116..124].fill(0);
        bytes[124..126].copy_from_slice(&0x0100u16.to_le_bytes());
        bytes[126..128].copy_from_slice(b"IM");
        Self { bytes }
    }

    /// A 2-D double array; `column_major` holds `rows * cols` values.
    pub fn doubles(mut self, name: &str, rows: i32, cols: i32, column_major: &[f64]) -> Self {
        let data: Vec<u8> = column_major.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.bytes
            .extend(matrix(CLASS_DOUBLE, &[rows, cols], name, tagged(MI_DOUBLE, &data)));
        self
    }

    pub fn bytes_u8(mut self, name: &str, rows: i32, cols: i32, column_major: &[u8]) -> Self {
        self.bytes
            .extend(matrix(CLASS_UINT8, &[rows, cols], name, tagged(MI_UINT8, column_major)));
        self
    }

    /// A char array, which is never array-valued for mask purposes.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        let data: Vec<u8> = value.encode_utf16().flat_map(|c| c.to_le_bytes()).collect();
        let len = value.encode_utf16().count() as i32;
        self.bytes
            .extend(matrix(CLASS_CHAR, &[1, len], name, tagged(MI_UTF16, &data)));
        self
    }

    /// A 2-D double array stored inside a zlib-compressed element.
    pub fn compressed_doubles(mut self, name: &str, rows: i32, cols: i32, column_major: &[f64]) -> Self {
        let data: Vec<u8> = column_major.iter().flat_map(|v| v.to_le_bytes()).collect();
        let element = matrix(CLASS_DOUBLE, &[rows, cols], name, tagged(MI_DOUBLE, &data));
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&element).expect("deflate");
        let packed = encoder.finish().expect("deflate");
        self.bytes.extend_from_slice(&MI_COMPRESSED.to_le_bytes());
        self.bytes.extend_from_slice(&(packed.len() as u32).to_le_bytes());
        self.bytes.extend_from_slice(&packed);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

fn tagged(kind: u32, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    while out.len() % 8 != 0 {
        out.push(0);
    }
    out
}

fn matrix(class: u8, dims: &[i32], name: &str, real: Vec<u8>) -> Vec<u8> {
    let mut body = Vec::new();
    let mut flags = u32::from(class).to_le_bytes().to_vec();
    flags.extend_from_slice(&[0; 4]);
    body.extend(tagged(MI_UINT32, &flags));
    let dim_bytes: Vec<u8> = dims.iter().flat_map(|d| d.to_le_bytes()).collect();
    body.extend(tagged(MI_INT32, &dim_bytes));
    body.extend(tagged(MI_INT8, name.as_bytes()));
    body.extend(real);
    tagged(MI_MATRIX, &body)
}
