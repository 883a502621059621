//! A cursor over an immutable byte slice, used to decode the `.ots` grammar.

use crate::error::CodecError;
use crate::util;

pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    max_varbytes: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8], max_varbytes: usize) -> Self {
        Self {
            data,
            pos: 0,
            max_varbytes,
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn peek_u8(&self) -> Result<u8, CodecError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(CodecError::UnexpectedEnd)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, CodecError> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Ok(b)
    }

    pub(crate) fn bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(CodecError::UnexpectedEnd)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn fixed<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let slice = self.bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub(crate) fn varuint(&mut self) -> Result<u64, CodecError> {
        Ok(util::read_varuint(self.data, &mut self.pos)?)
    }

    /// `len || bytes`, capped by `max_varbytes`.
    pub(crate) fn varbytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.varuint()?;
        if len as usize > self.max_varbytes {
            return Err(CodecError::VarbytesTooLarge(len, self.max_varbytes));
        }
        Ok(self.bytes(len as usize)?.to_vec())
    }
}
