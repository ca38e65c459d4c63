use std::io::Cursor;

use anyhow::{Context, Result, ensure};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Marks a runtime save as opposed to an interpreter save, whose first bytes
/// are the player's description text.
pub const SAVE_MAGIC: u16 = 0xFFFF;
pub const SAVE_VERSION: u16 = 1;

enum Mode<'a> {
    Save(&'a mut Vec<u8>),
    Load(Cursor<&'a [u8]>),
}

/// Two-way field syncer: the same sequence of `sync_*` calls writes a save
/// or reads one back, so field order and widths always agree.
pub struct Serializer<'a> {
    mode: Mode<'a>,
}

impl<'a> Serializer<'a> {
    pub fn saver(out: &'a mut Vec<u8>) -> Self {
        Self {
            mode: Mode::Save(out),
        }
    }

    pub fn loader(data: &'a [u8]) -> Self {
        Self {
            mode: Mode::Load(Cursor::new(data)),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.mode, Mode::Load(_))
    }

    pub fn sync_as_byte(&mut self, value: &mut u8) -> Result<()> {
        match &mut self.mode {
            Mode::Save(out) => out.write_u8(*value)?,
            Mode::Load(cursor) => *value = cursor.read_u8().context("reading byte field")?,
        }
        Ok(())
    }

    pub fn sync_bool(&mut self, value: &mut bool) -> Result<()> {
        let mut byte = *value as u8;
        self.sync_as_byte(&mut byte)?;
        *value = byte != 0;
        Ok(())
    }

    pub fn sync_as_u16_le(&mut self, value: &mut u16) -> Result<()> {
        match &mut self.mode {
            Mode::Save(out) => out.write_u16::<LittleEndian>(*value)?,
            Mode::Load(cursor) => {
                *value = cursor
                    .read_u16::<LittleEndian>()
                    .context("reading u16 field")?
            }
        }
        Ok(())
    }

    pub fn sync_as_i32_le(&mut self, value: &mut i32) -> Result<()> {
        match &mut self.mode {
            Mode::Save(out) => out.write_i32::<LittleEndian>(*value)?,
            Mode::Load(cursor) => {
                *value = cursor
                    .read_i32::<LittleEndian>()
                    .context("reading i32 field")?
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveHeader {
    pub magic: u16,
    pub version: u16,
}

impl Default for SaveHeader {
    fn default() -> Self {
        Self {
            magic: SAVE_MAGIC,
            version: SAVE_VERSION,
        }
    }
}

impl SaveHeader {
    pub fn sync(&mut self, s: &mut Serializer<'_>) -> Result<()> {
        s.sync_as_u16_le(&mut self.magic)?;
        s.sync_as_u16_le(&mut self.version)?;
        if s.is_loading() {
            ensure!(self.magic == SAVE_MAGIC, "not a runtime save (magic {:#06x})", self.magic);
            ensure!(
                self.version <= SAVE_VERSION,
                "save version {} is newer than supported {}",
                self.version,
                SAVE_VERSION
            );
        }
        Ok(())
    }

    /// Cheap check used when listing save slots.
    pub fn detect(data: &[u8]) -> bool {
        data.len() >= 2 && u16::from_le_bytes([data[0], data[1]]) == SAVE_MAGIC
    }
}
