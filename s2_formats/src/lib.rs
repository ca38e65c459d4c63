pub mod decompress;
pub mod gm_patch;
pub mod mac_fork;
pub mod midi_stream;
pub mod patch_file;
pub mod resource_map;
pub mod resource_type;
pub mod savegame;
pub mod volume;

pub use decompress::{CompressionMethod, decompress};
pub use gm_patch::GmPatch;
pub use mac_fork::{ForkEntry, MacResourceFork};
pub use midi_stream::{MidiCommand, parse_midi_commands};
pub use patch_file::{PatchFile, patch_key_from_file_name, scan_patch_dir};
pub use resource_map::{MapEntry, parse_resource_map};
pub use resource_type::{ResourceKey, ResourceType};
pub use savegame::{SaveHeader, Serializer};
pub use volume::{VolumeFile, VolumeHeader, read_volume_entry};
