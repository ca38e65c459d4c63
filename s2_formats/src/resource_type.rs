use std::fmt;

use serde::Serialize;

/// Resource categories in SCI numbering order. The discriminant is the type
/// byte stored in maps, volume headers and patch files (without the 0x80 bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ResourceType {
    View = 0,
    Pic = 1,
    Script = 2,
    Text = 3,
    Sound = 4,
    Memory = 5,
    Vocab = 6,
    Font = 7,
    Cursor = 8,
    Patch = 9,
    Bitmap = 10,
    Palette = 11,
    CdAudio = 12,
    Audio = 13,
    Sync = 14,
    Message = 15,
    Map = 16,
    Heap = 17,
    Audio36 = 18,
    Sync36 = 19,
    Translation = 20,
    Robot = 21,
    Vmd = 22,
    Chunk = 23,
    Animation = 24,
    Etc = 25,
    Duck = 26,
    Clut = 27,
    Tga = 28,
    Zzz = 29,
}

const ALL_TYPES: [ResourceType; 30] = [
    ResourceType::View,
    ResourceType::Pic,
    ResourceType::Script,
    ResourceType::Text,
    ResourceType::Sound,
    ResourceType::Memory,
    ResourceType::Vocab,
    ResourceType::Font,
    ResourceType::Cursor,
    ResourceType::Patch,
    ResourceType::Bitmap,
    ResourceType::Palette,
    ResourceType::CdAudio,
    ResourceType::Audio,
    ResourceType::Sync,
    ResourceType::Message,
    ResourceType::Map,
    ResourceType::Heap,
    ResourceType::Audio36,
    ResourceType::Sync36,
    ResourceType::Translation,
    ResourceType::Robot,
    ResourceType::Vmd,
    ResourceType::Chunk,
    ResourceType::Animation,
    ResourceType::Etc,
    ResourceType::Duck,
    ResourceType::Clut,
    ResourceType::Tga,
    ResourceType::Zzz,
];

impl ResourceType {
    /// Decodes a raw type byte; the high bit used by maps and patch files is
    /// ignored.
    pub fn from_byte(value: u8) -> Option<Self> {
        ALL_TYPES.get((value & 0x7F) as usize).copied()
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            ResourceType::View => "view",
            ResourceType::Pic => "pic",
            ResourceType::Script => "script",
            ResourceType::Text => "text",
            ResourceType::Sound => "sound",
            ResourceType::Memory => "memory",
            ResourceType::Vocab => "vocab",
            ResourceType::Font => "font",
            ResourceType::Cursor => "cursor",
            ResourceType::Patch => "patch",
            ResourceType::Bitmap => "bitmap",
            ResourceType::Palette => "palette",
            ResourceType::CdAudio => "cdaudio",
            ResourceType::Audio => "audio",
            ResourceType::Sync => "sync",
            ResourceType::Message => "message",
            ResourceType::Map => "map",
            ResourceType::Heap => "heap",
            ResourceType::Audio36 => "audio36",
            ResourceType::Sync36 => "sync36",
            ResourceType::Translation => "xlate",
            ResourceType::Robot => "robot",
            ResourceType::Vmd => "vmd",
            ResourceType::Chunk => "chunk",
            ResourceType::Animation => "animation",
            ResourceType::Etc => "etc",
            ResourceType::Duck => "duck",
            ResourceType::Clut => "clut",
            ResourceType::Tga => "tga",
            ResourceType::Zzz => "zzz",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        ALL_TYPES.iter().copied().find(|kind| kind.name() == lowered)
    }

    /// File extension used by SCI1.1+ external patch files (`4.pat`).
    pub fn patch_extension(self) -> Option<&'static str> {
        let ext = match self {
            ResourceType::View => "v56",
            ResourceType::Pic => "p56",
            ResourceType::Script => "scr",
            ResourceType::Text => "tex",
            ResourceType::Sound => "snd",
            ResourceType::Vocab => "voc",
            ResourceType::Font => "fon",
            ResourceType::Cursor => "cur",
            ResourceType::Patch => "pat",
            ResourceType::Bitmap => "bit",
            ResourceType::Palette => "pal",
            ResourceType::CdAudio => "cda",
            ResourceType::Audio => "aud",
            ResourceType::Sync => "syn",
            ResourceType::Message => "msg",
            ResourceType::Map => "map",
            ResourceType::Heap => "hep",
            _ => return None,
        };
        Some(ext)
    }

    pub fn from_patch_extension(ext: &str) -> Option<Self> {
        let lowered = ext.to_ascii_lowercase();
        ALL_TYPES
            .iter()
            .copied()
            .find(|kind| kind.patch_extension() == Some(lowered.as_str()))
    }

    pub fn all() -> &'static [ResourceType] {
        &ALL_TYPES
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Address of a resource. `tuple` packs the extra addressing used by
/// Audio36/Sync36 packages and is `None` for every other type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResourceKey {
    pub kind: ResourceType,
    pub number: u16,
    pub tuple: Option<u32>,
}

impl ResourceKey {
    pub const fn new(kind: ResourceType, number: u16) -> Self {
        Self {
            kind,
            number,
            tuple: None,
        }
    }

    pub const fn with_tuple(kind: ResourceType, number: u16, tuple: u32) -> Self {
        Self {
            kind,
            number,
            tuple: Some(tuple),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tuple {
            Some(tuple) => write!(f, "{}.{} ({:08x})", self.kind, self.number, tuple),
            None => write!(f, "{}.{}", self.kind, self.number),
        }
    }
}
