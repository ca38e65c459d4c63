use anyhow::{Context, Result, bail, ensure};
use serde::Serialize;

/// Upper bound on the output buffer reserved per packed byte; headers are
/// untrusted, so larger outputs grow on demand.
const MAX_RESERVED_RATIO: usize = 8;

/// Compression tag stored in a volume header ahead of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMethod {
    None,
    Lzw,
    Huffman,
    Stacpack,
}

impl CompressionMethod {
    pub fn from_tag(tag: u16) -> Result<Self> {
        match tag {
            0 => Ok(CompressionMethod::None),
            1 => Ok(CompressionMethod::Lzw),
            2 => Ok(CompressionMethod::Huffman),
            32 => Ok(CompressionMethod::Stacpack),
            other => bail!("unsupported compression method {other}"),
        }
    }

    pub fn tag(self) -> u16 {
        match self {
            CompressionMethod::None => 0,
            CompressionMethod::Lzw => 1,
            CompressionMethod::Huffman => 2,
            CompressionMethod::Stacpack => 32,
        }
    }
}

fn initial_capacity(packed: &[u8], unpacked_size: usize) -> usize {
    unpacked_size.min(packed.len().saturating_mul(MAX_RESERVED_RATIO))
}

/// Expands `packed` into exactly `unpacked_size` bytes.
pub fn decompress(method: CompressionMethod, packed: &[u8], unpacked_size: usize) -> Result<Vec<u8>> {
    let output = match method {
        CompressionMethod::None => {
            ensure!(
                packed.len() == unpacked_size,
                "stored payload is {} bytes but header declares {}",
                packed.len(),
                unpacked_size
            );
            packed.to_vec()
        }
        CompressionMethod::Lzw => unpack_lzw(packed, unpacked_size).context("LZW payload")?,
        CompressionMethod::Huffman => {
            unpack_huffman(packed, unpacked_size).context("Huffman payload")?
        }
        CompressionMethod::Stacpack => {
            unpack_stacpack(packed, unpacked_size).context("STACpack payload")?
        }
    };

    ensure!(
        output.len() == unpacked_size,
        "decompressed {} bytes but header declares {}",
        output.len(),
        unpacked_size
    );
    Ok(output)
}

struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() * 8 - self.bit_pos
    }

    /// Low bit of each byte first; the first bit read is the value's bit 0.
    fn read_lsb(&mut self, count: u32) -> Result<u32> {
        ensure!(self.remaining() >= count as usize, "bitstream exhausted");
        let mut value = 0u32;
        for i in 0..count as usize {
            let index = self.bit_pos + i;
            let bit = (self.data[index / 8] >> (index % 8)) & 1;
            value |= (bit as u32) << i;
        }
        self.bit_pos += count as usize;
        Ok(value)
    }

    /// High bit of each byte first; the first bit read is the value's top bit.
    fn read_msb(&mut self, count: u32) -> Result<u32> {
        ensure!(self.remaining() >= count as usize, "bitstream exhausted");
        let mut value = 0u32;
        for i in 0..count as usize {
            let index = self.bit_pos + i;
            let bit = (self.data[index / 8] >> (7 - index % 8)) & 1;
            value = (value << 1) | bit as u32;
        }
        self.bit_pos += count as usize;
        Ok(value)
    }
}

const LZW_RESET: u32 = 0x100;
const LZW_END: u32 = 0x101;
const LZW_FIRST_TOKEN: u32 = 0x102;

fn unpack_lzw(packed: &[u8], unpacked_size: usize) -> Result<Vec<u8>> {
    let mut reader = BitReader::new(packed);
    let mut out: Vec<u8> = Vec::with_capacity(initial_capacity(packed, unpacked_size));
    let mut token_start = vec![0usize; 4096];
    let mut token_len = vec![0usize; 4096];

    let mut num_bits = 9u32;
    let mut end_token = 0x1FFu32;
    let mut cur_token = LZW_FIRST_TOKEN;

    while out.len() < unpacked_size {
        let token = reader.read_lsb(num_bits)?;
        if token == LZW_END {
            break;
        }
        if token == LZW_RESET {
            num_bits = 9;
            end_token = 0x1FF;
            cur_token = LZW_FIRST_TOKEN;
            continue;
        }

        let last_len = if token > 0xFF {
            ensure!(token < cur_token, "bad token {token:#x}");
            let start = token_start[token as usize];
            let len = token_len[token as usize] + 1;
            // Tokens may run past the declared size; the tail is dropped.
            for i in 0..len {
                if out.len() == unpacked_size {
                    break;
                }
                out.push(out[start + i]);
            }
            len
        } else {
            out.push(token as u8);
            1
        };

        if cur_token > end_token && num_bits < 12 {
            num_bits += 1;
            end_token = (end_token << 1) + 1;
        }
        if cur_token <= end_token {
            token_start[cur_token as usize] = out.len().saturating_sub(last_len);
            token_len[cur_token as usize] = last_len;
            cur_token += 1;
        }
    }

    Ok(out)
}

fn unpack_huffman(packed: &[u8], unpacked_size: usize) -> Result<Vec<u8>> {
    ensure!(packed.len() >= 2, "missing Huffman tree header");
    let node_count = packed[0] as usize;
    let terminator = packed[1] as u32 | 0x100;
    let tree_end = 2 + node_count * 2;
    ensure!(packed.len() >= tree_end, "Huffman tree truncated");
    let nodes = &packed[2..tree_end];
    let mut reader = BitReader::new(&packed[tree_end..]);
    let mut out = Vec::with_capacity(initial_capacity(packed, unpacked_size));

    while out.len() < unpacked_size {
        let symbol = next_huffman_symbol(nodes, &mut reader)?;
        if symbol == terminator {
            break;
        }
        out.push(symbol as u8);
    }

    Ok(out)
}

fn next_huffman_symbol(nodes: &[u8], reader: &mut BitReader<'_>) -> Result<u32> {
    let mut node = 0usize;
    loop {
        ensure!(node + 1 < nodes.len(), "Huffman walk left the tree");
        let links = nodes[node + 1];
        if links == 0 {
            return Ok(nodes[node] as u32);
        }
        let next = if reader.read_msb(1)? == 1 {
            let next = links & 0x0F;
            if next == 0 {
                return Ok(reader.read_msb(8)? | 0x100);
            }
            next
        } else {
            links >> 4
        };
        node += (next as usize) << 1;
    }
}

fn unpack_stacpack(packed: &[u8], unpacked_size: usize) -> Result<Vec<u8>> {
    let mut reader = BitReader::new(packed);
    let mut out: Vec<u8> = Vec::with_capacity(initial_capacity(packed, unpacked_size));

    while out.len() < unpacked_size {
        if reader.read_msb(1)? == 0 {
            out.push(reader.read_msb(8)? as u8);
            continue;
        }

        let offset = if reader.read_msb(1)? == 1 {
            let offset = reader.read_msb(7)? as usize;
            if offset == 0 {
                break;
            }
            offset
        } else {
            reader.read_msb(11)? as usize
        };
        let length = stacpack_length(&mut reader)?;
        ensure!(
            offset > 0 && offset <= out.len(),
            "back reference {offset} before start of output"
        );

        let mut source = out.len() - offset;
        for _ in 0..length {
            if out.len() == unpacked_size {
                break;
            }
            out.push(out[source]);
            source += 1;
        }
    }

    Ok(out)
}

fn stacpack_length(reader: &mut BitReader<'_>) -> Result<usize> {
    match reader.read_msb(2)? {
        0 => return Ok(2),
        1 => return Ok(3),
        2 => return Ok(4),
        _ => {}
    }
    match reader.read_msb(2)? {
        0 => return Ok(5),
        1 => return Ok(6),
        2 => return Ok(7),
        _ => {}
    }
    let mut length = 8usize;
    loop {
        let nibble = reader.read_msb(4)? as usize;
        length += nibble;
        if nibble != 0x0F {
            return Ok(length);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct BitWriter {
        bytes: Vec<u8>,
        bit_pos: usize,
    }

    impl BitWriter {
        fn push_bit(&mut self, bit: u32, msb_first: bool) {
            if self.bit_pos % 8 == 0 {
                self.bytes.push(0);
            }
            let shift = if msb_first {
                7 - self.bit_pos % 8
            } else {
                self.bit_pos % 8
            };
            let last = self.bytes.len() - 1;
            self.bytes[last] |= ((bit & 1) as u8) << shift;
            self.bit_pos += 1;
        }

        fn lsb(&mut self, value: u32, count: u32) {
            for i in 0..count {
                self.push_bit(value >> i, false);
            }
        }

        fn msb(&mut self, value: u32, count: u32) {
            for i in (0..count).rev() {
                self.push_bit(value >> i, true);
            }
        }
    }

    #[test]
    fn stored_payload_is_returned_verbatim() {
        let out = decompress(CompressionMethod::None, b"hello", 5).unwrap();
        assert_eq!(out, b"hello");
        assert!(decompress(CompressionMethod::None, b"hello", 4).is_err());
    }

    #[test]
    fn lzw_expands_back_references() {
        // "AB" then token 0x102 which was registered as "AB".
        let mut writer = BitWriter::default();
        writer.lsb(b'A' as u32, 9);
        writer.lsb(b'B' as u32, 9);
        writer.lsb(0x102, 9);
        writer.lsb(LZW_END, 9);

        let out = decompress(CompressionMethod::Lzw, &writer.bytes, 4).unwrap();
        assert_eq!(out, b"ABAB");
    }

    #[test]
    fn lzw_rejects_unknown_tokens() {
        let mut writer = BitWriter::default();
        writer.lsb(b'A' as u32, 9);
        writer.lsb(0x150, 9);
        assert!(decompress(CompressionMethod::Lzw, &writer.bytes, 4).is_err());
    }

    #[test]
    fn huffman_walks_tree_and_escapes_literals() {
        // Root (node 0) branches to node 1 ('x') on 0 and node 2 ('y') on 1.
        // The terminator is an escaped literal 0x00.
        let mut packed = vec![3u8, 0x00];
        packed.extend_from_slice(&[0, 0x12, b'x', 0, b'y', 0]);
        let mut writer = BitWriter::default();
        writer.msb(0, 1);
        writer.msb(1, 1);
        writer.msb(0, 1);
        packed.extend_from_slice(&writer.bytes);

        let out = decompress(CompressionMethod::Huffman, &packed, 3).unwrap();
        assert_eq!(out, b"xyx");
    }

    #[test]
    fn stacpack_handles_literals_and_overlapping_copies() {
        let mut writer = BitWriter::default();
        writer.msb(0, 1);
        writer.msb(b'a' as u32, 8);
        writer.msb(0, 1);
        writer.msb(b'b' as u32, 8);
        // 7-bit offset 2, length 5 -> "ababa"
        writer.msb(1, 1);
        writer.msb(1, 1);
        writer.msb(2, 7);
        writer.msb(3, 2);
        writer.msb(0, 2);
        // end marker
        writer.msb(1, 1);
        writer.msb(1, 1);
        writer.msb(0, 7);

        let out = decompress(CompressionMethod::Stacpack, &writer.bytes, 7).unwrap();
        assert_eq!(out, b"abababa");
    }

    #[test]
    fn stacpack_length_mismatch_is_an_error() {
        let mut writer = BitWriter::default();
        writer.msb(0, 1);
        writer.msb(b'a' as u32, 8);
        writer.msb(1, 1);
        writer.msb(1, 1);
        writer.msb(0, 7);
        assert!(decompress(CompressionMethod::Stacpack, &writer.bytes, 4).is_err());
    }

    #[test]
    fn oversized_header_does_not_reserve_the_claimed_size() {
        assert_eq!(initial_capacity(&[0; 4], u32::MAX as usize), 32);
        assert_eq!(initial_capacity(&[0; 4], 10), 10);
        assert!(decompress(CompressionMethod::Stacpack, &[0, 0], u32::MAX as usize).is_err());
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert!(CompressionMethod::from_tag(18).is_err());
        assert_eq!(CompressionMethod::from_tag(32).unwrap(), CompressionMethod::Stacpack);
    }
}
