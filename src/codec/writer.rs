//! A growable byte buffer paired with the grammar's primitive write helpers.

use crate::util;

#[derive(Default)]
pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub(crate) fn u8(&mut self, b: u8) {
        self.buf.push(b);
    }

    pub(crate) fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    pub(crate) fn varuint(&mut self, value: u64) {
        util::write_varuint(value, &mut self.buf);
    }

    pub(crate) fn varbytes(&mut self, b: &[u8]) {
        self.varuint(b.len() as u64);
        self.bytes(b);
    }
}
