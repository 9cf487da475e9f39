#![allow(dead_code)]

pub mod mat_fixture;
pub mod process;

use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;
use image::{GrayImage, Luma, Rgb, RgbImage};

/// Writes a `width` x `height` RGB gradient.
pub fn write_gradient(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |x, y| Rgb([(x * 7) as u8, (y * 11) as u8, 128]))
        .save(path)
        .expect("write gradient fixture");
}

pub fn write_gray(path: &Path, width: u32, height: u32, value: u8) {
    GrayImage::from_pixel(width, height, Luma([value]))
        .save(path)
        .expect("write gray fixture");
}

pub fn read_gray(path: &Path) -> GrayImage {
    image::open(path).expect("read output image").to_luma8()
}

/// Inflated content of every `FlateDecode` stream in a PDF, in file order.
pub fn pdf_streams(bytes: &[u8]) -> Vec<String> {
    let mut streams = Vec::new();
    let mut rest = bytes;
    while let Some(start) = find(rest, b"stream\n") {
        let body = &rest[start + 7..];
        let Some(end) = find(body, b"\nendstream") else { break };
        let mut text = String::new();
        ZlibDecoder::new(&body[..end])
            .read_to_string(&mut text)
            .expect("inflate PDF stream");
        streams.push(text);
        rest = &body[end + 10..];
    }
    streams
}

pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
