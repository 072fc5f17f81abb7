pub mod change;
pub mod content_pack;
pub mod dictionary;
pub mod meta;
pub mod str_format;
pub mod utils;

// 重新导出主要结构
pub use change::{Action, ChangeEntry, Entries, EntryValue, LeafVisitor, SubstituteMode, WalkOptions};
pub use content_pack::{ContentPack, LanguageFilter, SourceTable};
pub use dictionary::{
    pair_dictionaries, read_entries_file, read_string_map, write_entries_file, write_string_map, Dictionary,
};
pub use meta::{CharacterMeta, FolderMeta, Meta};
pub use str_format::{FormatOptions, FormattedString, Indent, StrFormat};
pub use utils::CpError;

// 常量定义

/// 不含文本的 EditData 目标
pub const NON_TEXT_TARGETS: &[&str] = &[
    "AnimationDescriptions",
    "Blueprints",
    "CustomWeddingGuestPositions",
    "CustomNPCExclusions",
    "CraftingRecipes",
    "Locations",
    "ObjectInformation",
    "ObjectContextTags",
    "Characters/Schedules",
];

/// Entries 中不含文本的保留键
pub const RESERVED_ENTRY_KEY: &str = "set-up";

/// Load 文件翻译副本的文件名后缀
pub const TRANSLATED_SUFFIX: &str = "-translated";

/// 生成标识符时忽略的条件键
pub const LANGUAGE_CONDITION: &str = "language";
