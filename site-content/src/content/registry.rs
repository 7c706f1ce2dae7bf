//! Block registry
//!
//! The one table that maps content-block names to their storage
//! destinations and item schemas. The resolver, the ReplaceSet writer and
//! the migration engine all read it; nothing else keeps a copy.

use crate::database::EntityKind;
use serde::{Deserialize, Serialize};

/// Component type tags stored in `components.type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    HeroCarousel,
    HeadlineMarquee,
    MessageFrom,
    FacultiesCarousel,
    WelcomeSection,
    CampusLife,
    AtAGlance,
    DynamicNews,
    DynamicEvents,
    DynamicNotices,
    TopPublication,
    Footer,
}

impl ContentType {
    pub const ALL: [ContentType; 12] = [
        ContentType::HeroCarousel,
        ContentType::HeadlineMarquee,
        ContentType::MessageFrom,
        ContentType::FacultiesCarousel,
        ContentType::WelcomeSection,
        ContentType::CampusLife,
        ContentType::AtAGlance,
        ContentType::DynamicNews,
        ContentType::DynamicEvents,
        ContentType::DynamicNotices,
        ContentType::TopPublication,
        ContentType::Footer,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ContentType::HeroCarousel => "hero_carousel",
            ContentType::HeadlineMarquee => "headline_marquee",
            ContentType::MessageFrom => "message_from",
            ContentType::FacultiesCarousel => "faculties_carousel",
            ContentType::WelcomeSection => "welcome_section",
            ContentType::CampusLife => "campus_life",
            ContentType::AtAGlance => "at_a_glance",
            ContentType::DynamicNews => "dynamic_news",
            ContentType::DynamicEvents => "dynamic_events",
            ContentType::DynamicNotices => "dynamic_notices",
            ContentType::TopPublication => "top_publication",
            ContentType::Footer => "footer",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ct| ct.tag() == tag)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// JSON shape of a block's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockShape {
    /// An ordered array of item objects
    List,
    /// A single object
    Object,
}

/// Per-item validation rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSchema {
    Menu,
    HeroSlide,
    Headline,
    Faculty,
    Welcome,
    Entity(EntityKind),
    Free,
}

/// One known content block
#[derive(Debug)]
pub struct BlockSpec {
    /// Key in the legacy settings document, also the public block name
    pub name: &'static str,
    pub content_type: Option<ContentType>,
    pub entity: Option<EntityKind>,
    /// Whether the migration engine moves this block out of legacy settings
    pub migrates: bool,
    pub shape: BlockShape,
    pub schema: ItemSchema,
}

impl BlockSpec {
    /// Blocks with no newer home stay in the legacy settings document
    pub fn is_legacy_resident(&self) -> bool {
        self.content_type.is_none() && self.entity.is_none()
    }
}

const fn migrated(
    name: &'static str,
    content_type: ContentType,
    entity: Option<EntityKind>,
    shape: BlockShape,
    schema: ItemSchema,
) -> BlockSpec {
    BlockSpec {
        name,
        content_type: Some(content_type),
        entity,
        migrates: true,
        shape,
        schema,
    }
}

pub static BLOCKS: &[BlockSpec] = &[
    migrated("heroSlides", ContentType::HeroCarousel, None, BlockShape::List, ItemSchema::HeroSlide),
    migrated("headlines", ContentType::HeadlineMarquee, None, BlockShape::List, ItemSchema::Headline),
    migrated("messageFromItems", ContentType::MessageFrom, None, BlockShape::List, ItemSchema::Free),
    migrated("facultyItems", ContentType::FacultiesCarousel, None, BlockShape::List, ItemSchema::Faculty),
    migrated("welcomeItems", ContentType::WelcomeSection, None, BlockShape::List, ItemSchema::Welcome),
    migrated("campusLifeItems", ContentType::CampusLife, None, BlockShape::List, ItemSchema::Free),
    migrated("glanceItems", ContentType::AtAGlance, None, BlockShape::List, ItemSchema::Free),
    migrated(
        "newsItems",
        ContentType::DynamicNews,
        Some(EntityKind::News),
        BlockShape::List,
        ItemSchema::Entity(EntityKind::News),
    ),
    migrated(
        "eventItems",
        ContentType::DynamicEvents,
        Some(EntityKind::Events),
        BlockShape::List,
        ItemSchema::Entity(EntityKind::Events),
    ),
    migrated(
        "noticeItems",
        ContentType::DynamicNotices,
        Some(EntityKind::Notices),
        BlockShape::List,
        ItemSchema::Entity(EntityKind::Notices),
    ),
    migrated(
        "publicationItems",
        ContentType::TopPublication,
        Some(EntityKind::Publications),
        BlockShape::List,
        ItemSchema::Entity(EntityKind::Publications),
    ),
    migrated("footerData", ContentType::Footer, None, BlockShape::Object, ItemSchema::Free),
    BlockSpec {
        name: "tenderItems",
        content_type: None,
        entity: Some(EntityKind::Tenders),
        migrates: false,
        shape: BlockShape::List,
        schema: ItemSchema::Entity(EntityKind::Tenders),
    },
    BlockSpec {
        name: "teacherItems",
        content_type: None,
        entity: Some(EntityKind::Teachers),
        migrates: false,
        shape: BlockShape::List,
        schema: ItemSchema::Entity(EntityKind::Teachers),
    },
    // Never migrated: the menu lives in legacy settings in every version
    BlockSpec {
        name: "menuItems",
        content_type: None,
        entity: None,
        migrates: false,
        shape: BlockShape::List,
        schema: ItemSchema::Menu,
    },
];

/// Look up a block by name
pub fn lookup(name: &str) -> Option<&'static BlockSpec> {
    BLOCKS.iter().find(|spec| spec.name == name)
}

/// The block whose component records carry this type
pub fn for_content_type(content_type: ContentType) -> Option<&'static BlockSpec> {
    BLOCKS
        .iter()
        .find(|spec| spec.content_type == Some(content_type))
}

/// Blocks moved by the migration engine, in table order
pub fn migration_blocks() -> impl Iterator<Item = &'static BlockSpec> {
    BLOCKS.iter().filter(|spec| spec.migrates)
}
